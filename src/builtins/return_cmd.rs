//! return - unwind the innermost function or sourced script
//!
//! return [n]

use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_return(
    shell: &mut Shell,
    args: &[String],
    ctx: ExecContext,
) -> Result<i32, ExecError> {
    if ctx.function_depth == 0 && shell.state.source_depth == 0 {
        write_stderr(&format!(
            "{}: return: can only `return' from a function or sourced script\n",
            shell.state.script_name
        ));
        return Ok(1);
    }
    let code = match args.first() {
        None => shell.state.last_exit_code,
        Some(arg) => match arg.parse::<i32>() {
            Ok(code) => code & 0xff,
            Err(_) => {
                write_stderr(&format!(
                    "{}: return: {}: numeric argument required\n",
                    shell.state.script_name, arg
                ));
                2
            }
        },
    };
    Err(ExecError::Return(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_outside_function_is_an_error() {
        let mut shell = Shell::new();
        assert_eq!(
            handle_return(&mut shell, &[], ExecContext::default()).unwrap(),
            1
        );
    }

    #[test]
    fn return_in_function_unwinds() {
        let mut shell = Shell::new();
        let ctx = ExecContext::default().in_function();
        match handle_return(&mut shell, &["5".to_string()], ctx) {
            Err(ExecError::Return(5)) => {}
            other => panic!("{:?}", other),
        }
    }
}
