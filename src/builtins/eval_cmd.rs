//! eval - re-parse and execute the concatenated arguments
//!
//! eval [args...]
//!
//! The current context carries through, so break/continue inside eval'd
//! text still addresses enclosing loops.

use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_eval(shell: &mut Shell, args: &[String], ctx: ExecContext) -> Result<i32, ExecError> {
    let source = args.join(" ");
    if source.trim().is_empty() {
        return Ok(0);
    }
    let script = match crate::parser::parse(&source) {
        Ok(script) => script,
        Err(err) => {
            write_stderr(&format!("{}: eval: {}\n", shell.state.script_name, err));
            if shell.state.options.posix {
                return Err(ExecError::PosixFatal(2));
            }
            return Ok(2);
        }
    };
    shell.exec_script(&script, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_runs_concatenated_text() {
        let mut shell = Shell::new();
        let status = handle_eval(
            &mut shell,
            &["x=".to_string(), "42".to_string()],
            ExecContext::default(),
        );
        // "x= 42" runs `42` as a command name; instead assign in one word.
        assert!(status.is_ok());

        let status = handle_eval(
            &mut shell,
            &["y=42".to_string()],
            ExecContext::default(),
        )
        .unwrap();
        assert_eq!(status, 0);
        assert_eq!(shell.state.scopes.get_string("y"), Some("42".to_string()));
    }

    #[test]
    fn eval_syntax_error_is_status_2() {
        let mut shell = Shell::new();
        let status = handle_eval(
            &mut shell,
            &["case".to_string()],
            ExecContext::default(),
        )
        .unwrap();
        assert_eq!(status, 2);
    }
}
