//! exec - apply redirections permanently or replace the shell
//!
//! exec [cmd args...]
//!
//! The dispatcher applies exec's redirections without save/restore; with a
//! command the shell process is replaced outright.

use crate::core::errors::ExecError;
use crate::shell::Shell;

pub fn handle_exec(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let name = match args.first() {
        None => return Ok(0),
        Some(name) => name.clone(),
    };
    let rest: Vec<String> = args[1..].to_vec();

    let path = match shell.find_in_path(&name) {
        Some(path) => path,
        None => {
            crate::exec::write_stderr(&format!(
                "{}: exec: {}: not found\n",
                shell.state.script_name, name
            ));
            if shell.state.is_interactive {
                return Ok(127);
            }
            return Err(ExecError::Exit(127));
        }
    };

    let status = shell.exec_image(&path, &name, &rest);
    // Reaching here means exec failed; a non-interactive shell exits.
    if shell.state.is_interactive {
        Ok(status)
    } else {
        Err(ExecError::Exit(status))
    }
}
