//! Shell Options
//!
//! The `set -o` option set and the `shopt` feature set, plus the letter and
//! name tables used by `set`, `shopt`, and command-line parsing.

/// Options controlled by `set` (single letters and `-o name`).
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// set -e: exit on non-zero status outside conditional contexts
    pub errexit: bool,
    /// set -u: reading an unset variable is an error
    pub nounset: bool,
    /// set -x: trace commands to stderr prefixed with PS4
    pub xtrace: bool,
    /// set -o pipefail: pipeline status is the rightmost non-zero stage
    pub pipefail: bool,
    /// set -n: parse but do not execute
    pub noexec: bool,
    /// set -f: disable pathname expansion
    pub noglob: bool,
    /// set -C: > refuses to overwrite existing regular files
    pub noclobber: bool,
    /// set -b: report background job completion immediately
    pub notify: bool,
    /// set -a: every assignment exports
    pub allexport: bool,
    /// set -h: remember command locations
    pub hashcmds: bool,
    /// set -m: job control (process groups, terminal handoff)
    pub monitor: bool,
    /// set -v: echo input lines as read
    pub verbose: bool,
    /// set -o ignoreeof: interactive shell does not exit on EOF
    pub ignoreeof: bool,
    /// set -o nolog: do not record function definitions in history
    pub nolog: bool,
    /// set -o posix: POSIX behavior (special builtin failures are fatal)
    pub posix: bool,
    /// set -o braceexpand: enable {a,b} expansion
    pub braceexpand: bool,
    /// set -o histexpand: enable ! history expansion (interactive only)
    pub histexpand: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            errexit: false,
            nounset: false,
            xtrace: false,
            pipefail: false,
            noexec: false,
            noglob: false,
            noclobber: false,
            notify: false,
            allexport: false,
            hashcmds: true,
            monitor: false,
            verbose: false,
            ignoreeof: false,
            nolog: false,
            posix: false,
            braceexpand: true,
            histexpand: false,
        }
    }
}

/// (letter, -o name) pairs for the letter-mapped options.
pub const OPTION_LETTERS: &[(char, &str)] = &[
    ('e', "errexit"),
    ('u', "nounset"),
    ('x', "xtrace"),
    ('n', "noexec"),
    ('f', "noglob"),
    ('C', "noclobber"),
    ('b', "notify"),
    ('a', "allexport"),
    ('h', "hashcmds"),
    ('m', "monitor"),
    ('v', "verbose"),
];

/// All `-o` names, in listing order.
pub const OPTION_NAMES: &[&str] = &[
    "allexport",
    "braceexpand",
    "errexit",
    "hashcmds",
    "histexpand",
    "ignoreeof",
    "monitor",
    "noclobber",
    "noexec",
    "noglob",
    "nolog",
    "notify",
    "nounset",
    "pipefail",
    "posix",
    "verbose",
    "xtrace",
];

impl ShellOptions {
    pub fn get(&self, name: &str) -> Option<bool> {
        Some(match name {
            "errexit" => self.errexit,
            "nounset" => self.nounset,
            "xtrace" => self.xtrace,
            "pipefail" => self.pipefail,
            "noexec" => self.noexec,
            "noglob" => self.noglob,
            "noclobber" => self.noclobber,
            "notify" => self.notify,
            "allexport" => self.allexport,
            "hashcmds" => self.hashcmds,
            "monitor" => self.monitor,
            "verbose" => self.verbose,
            "ignoreeof" => self.ignoreeof,
            "nolog" => self.nolog,
            "posix" => self.posix,
            "braceexpand" => self.braceexpand,
            "histexpand" => self.histexpand,
            _ => return None,
        })
    }

    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match name {
            "errexit" => self.errexit = value,
            "nounset" => self.nounset = value,
            "xtrace" => self.xtrace = value,
            "pipefail" => self.pipefail = value,
            "noexec" => self.noexec = value,
            "noglob" => self.noglob = value,
            "noclobber" => self.noclobber = value,
            "notify" => self.notify = value,
            "allexport" => self.allexport = value,
            "hashcmds" => self.hashcmds = value,
            "monitor" => self.monitor = value,
            "verbose" => self.verbose = value,
            "ignoreeof" => self.ignoreeof = value,
            "nolog" => self.nolog = value,
            "posix" => self.posix = value,
            "braceexpand" => self.braceexpand = value,
            "histexpand" => self.histexpand = value,
            _ => return false,
        }
        true
    }

    pub fn set_letter(&mut self, letter: char, value: bool) -> bool {
        match OPTION_LETTERS.iter().find(|(l, _)| *l == letter) {
            Some((_, name)) => self.set(name, value),
            None => false,
        }
    }

    /// The value of `$-`: one letter per enabled letter-mapped option.
    pub fn flag_string(&self, interactive: bool) -> String {
        let mut flags = String::new();
        for (letter, name) in OPTION_LETTERS {
            if self.get(name) == Some(true) {
                flags.push(*letter);
            }
        }
        if interactive {
            flags.push('i');
        }
        flags
    }
}

/// Feature toggles controlled by `shopt`.
#[derive(Debug, Clone)]
pub struct ShoptOptions {
    /// Include dotfiles in pathname expansion
    pub dotglob: bool,
    /// Non-matching patterns expand to nothing instead of themselves
    pub nullglob: bool,
    /// Non-matching patterns are an error
    pub failglob: bool,
    /// Extended glob operators @() *() +() ?() !()
    pub extglob: bool,
    /// Case-insensitive pathname expansion
    pub nocaseglob: bool,
    /// Case-insensitive matching in case and [[ ]]
    pub nocasematch: bool,
    /// ** matches across directory separators
    pub globstar: bool,
    /// Alias expansion
    pub expand_aliases: bool,
}

impl Default for ShoptOptions {
    fn default() -> Self {
        Self {
            dotglob: false,
            nullglob: false,
            failglob: false,
            extglob: false,
            nocaseglob: false,
            nocasematch: false,
            globstar: false,
            expand_aliases: true,
        }
    }
}

pub const SHOPT_NAMES: &[&str] = &[
    "dotglob",
    "expand_aliases",
    "extglob",
    "failglob",
    "globstar",
    "nocaseglob",
    "nocasematch",
    "nullglob",
];

impl ShoptOptions {
    pub fn get(&self, name: &str) -> Option<bool> {
        Some(match name {
            "dotglob" => self.dotglob,
            "nullglob" => self.nullglob,
            "failglob" => self.failglob,
            "extglob" => self.extglob,
            "nocaseglob" => self.nocaseglob,
            "nocasematch" => self.nocasematch,
            "globstar" => self.globstar,
            "expand_aliases" => self.expand_aliases,
            _ => return None,
        })
    }

    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match name {
            "dotglob" => self.dotglob = value,
            "nullglob" => self.nullglob = value,
            "failglob" => self.failglob = value,
            "extglob" => self.extglob = value,
            "nocaseglob" => self.nocaseglob = value,
            "nocasematch" => self.nocasematch = value,
            "globstar" => self.globstar = value,
            "expand_aliases" => self.expand_aliases = value,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_names() {
        let mut opts = ShellOptions::default();
        assert!(opts.set_letter('e', true));
        assert!(opts.errexit);
        assert!(opts.set_letter('C', true));
        assert!(opts.noclobber);
        assert!(!opts.set_letter('z', true));
    }

    #[test]
    fn flag_string_reflects_enabled_letters() {
        let mut opts = ShellOptions::default();
        opts.errexit = true;
        opts.xtrace = true;
        let flags = opts.flag_string(false);
        assert!(flags.contains('e'));
        assert!(flags.contains('x'));
        assert!(flags.contains('h'));
        assert!(!flags.contains('i'));
    }

    #[test]
    fn shopt_round_trip() {
        let mut shopt = ShoptOptions::default();
        assert_eq!(shopt.get("nullglob"), Some(false));
        assert!(shopt.set("nullglob", true));
        assert_eq!(shopt.get("nullglob"), Some(true));
        assert_eq!(shopt.get("bogus"), None);
    }
}
