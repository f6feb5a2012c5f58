//! getopts - POSIX option parsing
//!
//! getopts optstring name [args...]
//!
//! State lives in OPTIND (plus an intra-word offset the shell keeps);
//! OPTARG carries option arguments. A leading `:` in optstring selects
//! silent error reporting.

use crate::core::errors::ExecError;
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_getopts(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let (optstring, name) = match (args.first(), args.get(1)) {
        (Some(optstring), Some(name)) => (optstring.clone(), name.clone()),
        _ => {
            write_stderr(&format!(
                "{}: getopts: usage: getopts optstring name [arg...]\n",
                shell.state.script_name
            ));
            return Ok(2);
        }
    };
    let silent = optstring.starts_with(':');
    let optstring = optstring.trim_start_matches(':').to_string();

    let words: Vec<String> = if args.len() > 2 {
        args[2..].to_vec()
    } else {
        shell.state.positional.clone()
    };

    let mut optind: usize = shell
        .state
        .scopes
        .get_string("OPTIND")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    if optind < 1 {
        optind = 1;
    }
    // An externally rewound OPTIND resets the intra-word offset.
    if optind != shell.getopts_optind {
        shell.getopts_offset = 1;
    }

    let done = |shell: &mut Shell, optind: usize| -> Result<i32, ExecError> {
        shell.state.scopes.set_scalar(&name, "?", false)?;
        shell.state.scopes.set_scalar("OPTIND", optind.to_string(), false)?;
        shell.getopts_optind = optind;
        Ok(1)
    };

    let word = match words.get(optind - 1) {
        Some(word) => word.clone(),
        None => return done(shell, optind),
    };
    if !word.starts_with('-') || word == "-" {
        return done(shell, optind);
    }
    if word == "--" {
        return done(shell, optind + 1);
    }

    let chars: Vec<char> = word.chars().collect();
    let offset = shell.getopts_offset.max(1);
    let opt = match chars.get(offset) {
        Some(c) => *c,
        None => return done(shell, optind + 1),
    };

    let spec_index = optstring.find(opt);
    let takes_arg = spec_index
        .map(|i| optstring[i + 1..].starts_with(':'))
        .unwrap_or(false);

    // Advance position bookkeeping first.
    let at_word_end = offset + 1 >= chars.len();

    if spec_index.is_none() || opt == ':' {
        // Unknown option.
        if silent {
            shell.state.scopes.set_scalar(&name, "?", false)?;
            shell.state.scopes.set_scalar("OPTARG", opt.to_string(), false)?;
        } else {
            shell.state.scopes.set_scalar(&name, "?", false)?;
            shell.state.scopes.unset("OPTARG").ok();
            write_stderr(&format!(
                "{}: illegal option -- {}\n",
                shell.state.script_name, opt
            ));
        }
        advance(shell, &mut optind, at_word_end);
        shell.state.scopes.set_scalar("OPTIND", optind.to_string(), false)?;
        shell.getopts_optind = optind;
        return Ok(0);
    }

    if takes_arg {
        let arg = if !at_word_end {
            let value: String = chars[offset + 1..].iter().collect();
            optind += 1;
            shell.getopts_offset = 1;
            Some(value)
        } else {
            optind += 1;
            let value = words.get(optind - 1).cloned();
            if value.is_some() {
                optind += 1;
            }
            shell.getopts_offset = 1;
            value
        };
        match arg {
            Some(value) => {
                shell.state.scopes.set_scalar(&name, opt.to_string(), false)?;
                shell.state.scopes.set_scalar("OPTARG", value, false)?;
            }
            None => {
                // Missing required argument.
                if silent {
                    shell.state.scopes.set_scalar(&name, ":", false)?;
                    shell
                        .state
                        .scopes
                        .set_scalar("OPTARG", opt.to_string(), false)?;
                } else {
                    shell.state.scopes.set_scalar(&name, "?", false)?;
                    shell.state.scopes.unset("OPTARG").ok();
                    write_stderr(&format!(
                        "{}: option requires an argument -- {}\n",
                        shell.state.script_name, opt
                    ));
                }
            }
        }
        shell.state.scopes.set_scalar("OPTIND", optind.to_string(), false)?;
        shell.getopts_optind = optind;
        return Ok(0);
    }

    shell.state.scopes.set_scalar(&name, opt.to_string(), false)?;
    shell.state.scopes.unset("OPTARG").ok();
    advance(shell, &mut optind, at_word_end);
    shell.state.scopes.set_scalar("OPTIND", optind.to_string(), false)?;
    shell.getopts_optind = optind;
    Ok(0)
}

fn advance(shell: &mut Shell, optind: &mut usize, at_word_end: bool) {
    if at_word_end {
        *optind += 1;
        shell.getopts_offset = 1;
    } else {
        shell.getopts_offset += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(shell: &mut Shell, optstring: &str, words: &[&str]) -> (i32, String, Option<String>) {
        let mut args = vec![optstring.to_string(), "opt".to_string()];
        args.extend(words.iter().map(|s| s.to_string()));
        let status = handle_getopts(shell, &args).unwrap();
        let opt = shell.state.scopes.get_string("opt").unwrap_or_default();
        let optarg = shell.state.scopes.get_string("OPTARG");
        (status, opt, optarg)
    }

    #[test]
    fn parses_flags_in_sequence() {
        let mut shell = Shell::new();
        let (s, opt, _) = run(&mut shell, "ab", &["-a", "-b", "rest"]);
        assert_eq!((s, opt.as_str()), (0, "a"));
        let (s, opt, _) = run(&mut shell, "ab", &["-a", "-b", "rest"]);
        assert_eq!((s, opt.as_str()), (0, "b"));
        let (s, _, _) = run(&mut shell, "ab", &["-a", "-b", "rest"]);
        assert_eq!(s, 1);
        assert_eq!(
            shell.state.scopes.get_string("OPTIND"),
            Some("3".to_string())
        );
    }

    #[test]
    fn bundled_flags() {
        let mut shell = Shell::new();
        let (_, opt, _) = run(&mut shell, "ab", &["-ab"]);
        assert_eq!(opt, "a");
        let (_, opt, _) = run(&mut shell, "ab", &["-ab"]);
        assert_eq!(opt, "b");
        let (s, _, _) = run(&mut shell, "ab", &["-ab"]);
        assert_eq!(s, 1);
    }

    #[test]
    fn option_with_argument() {
        let mut shell = Shell::new();
        let (_, opt, optarg) = run(&mut shell, "o:", &["-o", "value"]);
        assert_eq!(opt, "o");
        assert_eq!(optarg, Some("value".to_string()));

        let mut shell = Shell::new();
        let (_, opt, optarg) = run(&mut shell, "o:", &["-ovalue"]);
        assert_eq!(opt, "o");
        assert_eq!(optarg, Some("value".to_string()));
    }

    #[test]
    fn silent_mode_missing_argument() {
        let mut shell = Shell::new();
        let (s, opt, optarg) = run(&mut shell, ":o:", &["-o"]);
        assert_eq!(s, 0);
        assert_eq!(opt, ":");
        assert_eq!(optarg, Some("o".to_string()));
    }

    #[test]
    fn unknown_option_silent() {
        let mut shell = Shell::new();
        let (s, opt, optarg) = run(&mut shell, ":ab", &["-z"]);
        assert_eq!(s, 0);
        assert_eq!(opt, "?");
        assert_eq!(optarg, Some("z".to_string()));
    }

    #[test]
    fn double_dash_stops() {
        let mut shell = Shell::new();
        let (s, _, _) = run(&mut shell, "ab", &["--", "-a"]);
        assert_eq!(s, 1);
        assert_eq!(
            shell.state.scopes.get_string("OPTIND"),
            Some("2".to_string())
        );
    }
}
