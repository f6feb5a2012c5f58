//! let - arithmetic evaluation of each argument
//!
//! let expr...
//!
//! Status 0 when the last expression is non-zero.

use crate::core::errors::ExecError;
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_let(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    if args.is_empty() {
        write_stderr(&format!(
            "{}: let: expression expected\n",
            shell.state.script_name
        ));
        return Ok(1);
    }
    let mut value = 0;
    for arg in args {
        match crate::arith::eval_arith_string(&mut shell.state, arg) {
            Ok(v) => value = v,
            Err(err) => {
                write_stderr(&format!("{}: let: {}\n", shell.state.script_name, err));
                return Ok(1);
            }
        }
    }
    Ok(if value != 0 { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn let_assigns_and_reports_status() {
        let mut shell = Shell::new();
        assert_eq!(handle_let(&mut shell, &["x = 3 + 4".to_string()]).unwrap(), 0);
        assert_eq!(shell.state.scopes.get_string("x"), Some("7".to_string()));
        assert_eq!(handle_let(&mut shell, &["x - 7".to_string()]).unwrap(), 1);
    }
}
