//! shift - shift positional parameters left
//!
//! shift [n]
//!
//! A count past $# is an error; in posix mode that error is fatal.

use crate::core::errors::ExecError;
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_shift(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let n = match args.first() {
        None => 1usize,
        Some(arg) => match arg.parse::<i64>() {
            Ok(n) if n >= 0 => n as usize,
            _ => {
                write_stderr(&format!(
                    "{}: shift: {}: numeric argument required\n",
                    shell.state.script_name, arg
                ));
                if shell.state.options.posix {
                    return Err(ExecError::PosixFatal(1));
                }
                return Ok(1);
            }
        },
    };

    if n > shell.state.positional.len() {
        write_stderr(&format!(
            "{}: shift: shift count out of range\n",
            shell.state.script_name
        ));
        if shell.state.options.posix {
            return Err(ExecError::PosixFatal(1));
        }
        return Ok(1);
    }
    shell.state.positional.drain(..n);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_with_params(params: &[&str]) -> Shell {
        let mut shell = Shell::new();
        shell.state.positional = params.iter().map(|s| s.to_string()).collect();
        shell
    }

    #[test]
    fn shift_default_one() {
        let mut shell = shell_with_params(&["a", "b", "c"]);
        assert_eq!(handle_shift(&mut shell, &[]).unwrap(), 0);
        assert_eq!(shell.state.positional, vec!["b", "c"]);
    }

    #[test]
    fn shift_by_n() {
        let mut shell = shell_with_params(&["a", "b", "c", "d"]);
        assert_eq!(handle_shift(&mut shell, &["2".to_string()]).unwrap(), 0);
        assert_eq!(shell.state.positional, vec!["c", "d"]);
    }

    #[test]
    fn shift_out_of_range() {
        let mut shell = shell_with_params(&["a"]);
        assert_eq!(handle_shift(&mut shell, &["3".to_string()]).unwrap(), 1);
        assert_eq!(shell.state.positional, vec!["a"]);
    }

    #[test]
    fn shift_out_of_range_fatal_in_posix_mode() {
        let mut shell = shell_with_params(&["a"]);
        shell.state.options.posix = true;
        assert!(matches!(
            handle_shift(&mut shell, &["3".to_string()]),
            Err(ExecError::PosixFatal(1))
        ));
    }

    #[test]
    fn shift_rejects_negative() {
        let mut shell = shell_with_params(&["a", "b"]);
        assert_eq!(handle_shift(&mut shell, &["-1".to_string()]).unwrap(), 1);
    }
}
