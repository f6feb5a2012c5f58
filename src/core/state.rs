//! Shell State
//!
//! The mutable state a shell process carries: scopes, functions, aliases,
//! positional parameters, options, and the bookkeeping behind the special
//! variables ($?, $!, $SECONDS, ...). Forked children inherit all of it via
//! copy-on-write; mutations never travel back.

use std::collections::HashMap;
use std::time::Instant;

use indexmap::IndexMap;

use crate::ast::types::FunctionDefNode;
use crate::core::options::{ShellOptions, ShoptOptions};
use crate::core::scope::ScopeManager;
use crate::core::variables::Variable;

/// Default IFS: space, tab, newline.
pub const DEFAULT_IFS: &str = " \t\n";

#[derive(Debug)]
pub struct ShellState {
    pub scopes: ScopeManager,
    pub functions: HashMap<String, FunctionDefNode>,
    pub aliases: IndexMap<String, String>,

    /// $0
    pub script_name: String,
    /// $1..$N
    pub positional: Vec<String>,

    pub options: ShellOptions,
    pub shopt: ShoptOptions,

    /// $?
    pub last_exit_code: i32,
    /// $!
    pub last_background_pid: Option<i32>,
    /// $_ — last argument of the previous command
    pub last_arg: String,
    /// $LINENO source line currently executing
    pub current_line: usize,
    /// PIPESTATUS of the last pipeline
    pub pipe_status: Vec<i32>,
    /// Exit status of the most recent command substitution in the current
    /// command's expansions, if any.
    pub last_cmdsub_status: Option<i32>,
    /// Capture groups from the last successful `[[ =~ ]]`
    pub rematch: Vec<String>,

    /// FUNCNAME stack, innermost first
    pub func_stack: Vec<String>,
    /// Nesting depth of `source`d scripts (return is legal inside)
    pub source_depth: u32,

    pub is_interactive: bool,
    /// Set in every forked child before it runs anything.
    pub in_forked_child: bool,

    /// Shell start instant, for $SECONDS.
    pub start_time: Instant,

    /// PATH lookup cache (`set -h` / the hash builtin would manage this).
    pub hashed_commands: HashMap<String, String>,
}

impl ShellState {
    /// Fresh state seeded from the process environment.
    pub fn new() -> Self {
        let mut scopes = ScopeManager::new();
        for (name, value) in std::env::vars() {
            let _ = scopes.set_var(&name, Variable::exported(value), false);
        }
        if scopes.get("IFS").is_none() {
            let _ = scopes.set_scalar("IFS", DEFAULT_IFS, false);
        }
        if scopes.get("PS1").is_none() {
            let _ = scopes.set_scalar("PS1", "$ ", false);
        }
        if scopes.get("PS2").is_none() {
            let _ = scopes.set_scalar("PS2", "> ", false);
        }
        if scopes.get("PS3").is_none() {
            let _ = scopes.set_scalar("PS3", "#? ", false);
        }
        if scopes.get("PS4").is_none() {
            let _ = scopes.set_scalar("PS4", "+ ", false);
        }
        let _ = scopes.set_scalar("OPTIND", "1", false);
        if let Ok(cwd) = std::env::current_dir() {
            let _ = scopes.set_scalar("PWD", cwd.to_string_lossy(), false);
        }

        ShellState {
            scopes,
            functions: HashMap::new(),
            aliases: IndexMap::new(),
            script_name: "oxsh".to_string(),
            positional: Vec::new(),
            options: ShellOptions::default(),
            shopt: ShoptOptions::default(),
            last_exit_code: 0,
            last_background_pid: None,
            last_arg: String::new(),
            current_line: 0,
            pipe_status: Vec::new(),
            last_cmdsub_status: None,
            rematch: Vec::new(),
            func_stack: Vec::new(),
            source_depth: 0,
            is_interactive: false,
            in_forked_child: false,
            start_time: Instant::now(),
            hashed_commands: HashMap::new(),
        }
    }

    /// The IFS characters currently in effect.
    pub fn ifs(&self) -> String {
        self.scopes
            .get_string("IFS")
            .unwrap_or_else(|| DEFAULT_IFS.to_string())
    }

    /// First IFS character, used to join `$*`.
    pub fn ifs_join(&self) -> String {
        match self.scopes.get("IFS") {
            Some(var) => var.as_string().chars().next().map(String::from).unwrap_or_default(),
            None => " ".to_string(),
        }
    }

    pub fn in_function(&self) -> bool {
        !self.func_stack.is_empty()
    }

    /// Positional parameter by number (1-based). 0 is the script name.
    pub fn positional_get(&self, n: usize) -> Option<String> {
        if n == 0 {
            Some(self.script_name.clone())
        } else {
            self.positional.get(n - 1).cloned()
        }
    }

    /// Seconds since shell start, for $SECONDS.
    pub fn seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifs_defaults_to_whitespace() {
        let state = ShellState::new();
        assert_eq!(state.ifs(), DEFAULT_IFS);
        assert_eq!(state.ifs_join(), " ");
    }

    #[test]
    fn ifs_join_uses_first_char() {
        let mut state = ShellState::new();
        state.scopes.set_scalar("IFS", ":;", false).unwrap();
        assert_eq!(state.ifs_join(), ":");
    }

    #[test]
    fn positional_lookup() {
        let mut state = ShellState::new();
        state.script_name = "script".into();
        state.positional = vec!["a".into(), "b".into()];
        assert_eq!(state.positional_get(0), Some("script".to_string()));
        assert_eq!(state.positional_get(1), Some("a".to_string()));
        assert_eq!(state.positional_get(3), None);
    }
}
