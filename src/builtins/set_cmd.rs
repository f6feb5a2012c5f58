//! set - shell options and positional parameters
//!
//! set [-abCefhmnuvx] [-o name] [+...] [--] [args...]
//!
//! With no arguments, lists variables. `set --` replaces the positional
//! parameters; `set -o` alone lists the option states.

use crate::core::errors::ExecError;
use crate::core::options::OPTION_NAMES;
use crate::exec::{write_stderr, write_stdout};
use crate::shell::Shell;

pub fn handle_set(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    if args.is_empty() {
        list_variables(shell);
        return Ok(0);
    }

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--" => {
                shell.state.positional = args[i + 1..].to_vec();
                return Ok(0);
            }
            "-o" | "+o" => {
                let enable = arg.starts_with('-');
                match args.get(i + 1) {
                    None => {
                        list_options(shell, enable);
                        i += 1;
                    }
                    Some(name) => {
                        if !shell.state.options.set(name, enable) {
                            write_stderr(&format!(
                                "{}: set: {}: invalid option name\n",
                                shell.state.script_name, name
                            ));
                            return Ok(2);
                        }
                        i += 2;
                    }
                }
            }
            _ if arg.starts_with('-') && arg.len() > 1 => {
                for letter in arg[1..].chars() {
                    if !shell.state.options.set_letter(letter, true) {
                        write_stderr(&format!(
                            "{}: set: -{}: invalid option\n",
                            shell.state.script_name, letter
                        ));
                        return Ok(2);
                    }
                }
                i += 1;
            }
            _ if arg.starts_with('+') && arg.len() > 1 => {
                for letter in arg[1..].chars() {
                    if !shell.state.options.set_letter(letter, false) {
                        write_stderr(&format!(
                            "{}: set: +{}: invalid option\n",
                            shell.state.script_name, letter
                        ));
                        return Ok(2);
                    }
                }
                i += 1;
            }
            _ => {
                // First non-option argument: the rest replace $1...
                shell.state.positional = args[i..].to_vec();
                return Ok(0);
            }
        }
    }
    Ok(0)
}

fn list_variables(shell: &Shell) {
    let mut entries: Vec<(String, String)> = shell
        .state
        .scopes
        .visible()
        .into_iter()
        .map(|(name, var)| (name, var.as_string()))
        .collect();
    entries.sort();
    for (name, value) in entries {
        write_stdout(&format!("{}='{}'\n", name, value.replace('\'', "'\\''")));
    }
}

fn list_options(shell: &Shell, plus_format: bool) {
    for name in OPTION_NAMES {
        let on = shell.state.options.get(name) == Some(true);
        if plus_format {
            write_stdout(&format!("{:<15} {}\n", name, if on { "on" } else { "off" }));
        } else {
            write_stdout(&format!("set {}o {}\n", if on { "-" } else { "+" }, name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_letters_toggle() {
        let mut shell = Shell::new();
        handle_set(&mut shell, &["-ex".to_string()]).unwrap();
        assert!(shell.state.options.errexit);
        assert!(shell.state.options.xtrace);
        handle_set(&mut shell, &["+e".to_string()]).unwrap();
        assert!(!shell.state.options.errexit);
    }

    #[test]
    fn set_o_name() {
        let mut shell = Shell::new();
        handle_set(&mut shell, &["-o".to_string(), "pipefail".to_string()]).unwrap();
        assert!(shell.state.options.pipefail);
        handle_set(&mut shell, &["+o".to_string(), "pipefail".to_string()]).unwrap();
        assert!(!shell.state.options.pipefail);
    }

    #[test]
    fn set_dash_dash_replaces_positional() {
        let mut shell = Shell::new();
        handle_set(
            &mut shell,
            &["--".to_string(), "x".to_string(), "y".to_string()],
        )
        .unwrap();
        assert_eq!(shell.state.positional, vec!["x", "y"]);
    }

    #[test]
    fn set_bad_option_is_status_2() {
        let mut shell = Shell::new();
        assert_eq!(handle_set(&mut shell, &["-Z".to_string()]).unwrap(), 2);
    }
}
