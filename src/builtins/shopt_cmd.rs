//! shopt - bash-style feature toggles
//!
//! shopt [-s|-u|-q] [name...]

use crate::core::errors::ExecError;
use crate::core::options::SHOPT_NAMES;
use crate::exec::{write_stderr, write_stdout};
use crate::shell::Shell;

pub fn handle_shopt(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let mut set_mode: Option<bool> = None;
    let mut quiet = false;
    let mut names = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-s" => set_mode = Some(true),
            "-u" => set_mode = Some(false),
            "-q" => quiet = true,
            _ => names.push(arg.clone()),
        }
    }

    if names.is_empty() {
        match set_mode {
            None => {
                for name in SHOPT_NAMES {
                    let on = shell.state.shopt.get(name) == Some(true);
                    write_stdout(&format!("{:<16}{}\n", name, if on { "on" } else { "off" }));
                }
                Ok(0)
            }
            Some(enable) => {
                for name in SHOPT_NAMES {
                    if shell.state.shopt.get(name) == Some(enable) {
                        write_stdout(&format!(
                            "{:<16}{}\n",
                            name,
                            if enable { "on" } else { "off" }
                        ));
                    }
                }
                Ok(0)
            }
        }
    } else {
        let mut status = 0;
        for name in &names {
            match set_mode {
                Some(enable) => {
                    if !shell.state.shopt.set(name, enable) {
                        write_stderr(&format!(
                            "{}: shopt: {}: invalid shell option name\n",
                            shell.state.script_name, name
                        ));
                        status = 1;
                    }
                }
                None => match shell.state.shopt.get(name) {
                    Some(on) => {
                        if !quiet {
                            write_stdout(&format!(
                                "{:<16}{}\n",
                                name,
                                if on { "on" } else { "off" }
                            ));
                        }
                        if !on {
                            status = 1;
                        }
                    }
                    None => {
                        write_stderr(&format!(
                            "{}: shopt: {}: invalid shell option name\n",
                            shell.state.script_name, name
                        ));
                        status = 1;
                    }
                },
            }
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shopt_sets_and_unsets() {
        let mut shell = Shell::new();
        handle_shopt(&mut shell, &["-s".to_string(), "nullglob".to_string()]).unwrap();
        assert!(shell.state.shopt.nullglob);
        handle_shopt(&mut shell, &["-u".to_string(), "nullglob".to_string()]).unwrap();
        assert!(!shell.state.shopt.nullglob);
    }

    #[test]
    fn shopt_unknown_name_fails() {
        let mut shell = Shell::new();
        let status =
            handle_shopt(&mut shell, &["-s".to_string(), "bogus".to_string()]).unwrap();
        assert_eq!(status, 1);
    }

    #[test]
    fn shopt_query_status() {
        let mut shell = Shell::new();
        shell.state.shopt.dotglob = true;
        let status = handle_shopt(
            &mut shell,
            &["-q".to_string(), "dotglob".to_string()],
        )
        .unwrap();
        assert_eq!(status, 0);
        let status = handle_shopt(
            &mut shell,
            &["-q".to_string(), "nullglob".to_string()],
        )
        .unwrap();
        assert_eq!(status, 1);
    }
}
