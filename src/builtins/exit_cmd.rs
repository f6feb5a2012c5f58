//! exit - terminate the shell
//!
//! exit [n]
//!
//! The EXIT trap runs as the shell unwinds.

use crate::core::errors::ExecError;
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_exit(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let code = match args.first() {
        None => shell.state.last_exit_code,
        Some(arg) => match arg.parse::<i32>() {
            Ok(code) => code & 0xff,
            Err(_) => {
                write_stderr(&format!(
                    "{}: exit: {}: numeric argument required\n",
                    shell.state.script_name, arg
                ));
                2
            }
        },
    };
    Err(ExecError::Exit(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_uses_last_status_by_default() {
        let mut shell = Shell::new();
        shell.state.last_exit_code = 3;
        match handle_exit(&mut shell, &[]) {
            Err(ExecError::Exit(3)) => {}
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn exit_code_wraps_to_byte() {
        let mut shell = Shell::new();
        match handle_exit(&mut shell, &["300".to_string()]) {
            Err(ExecError::Exit(44)) => {}
            other => panic!("{:?}", other),
        }
    }
}
