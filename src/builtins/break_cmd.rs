//! break / continue - unwind loops
//!
//! break [n] / continue [n]
//!
//! The level clamps to the current loop depth, the way bash does when
//! asked to break out of more loops than exist.

use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::exec::write_stderr;
use crate::shell::Shell;

fn parse_level(shell: &Shell, which: &str, args: &[String]) -> Result<u32, i32> {
    match args.first() {
        None => Ok(1),
        Some(arg) => match arg.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n.min(u32::MAX as i64) as u32),
            Ok(_) => {
                write_stderr(&format!(
                    "{}: {}: {}: loop count out of range\n",
                    shell.state.script_name, which, arg
                ));
                Err(1)
            }
            Err(_) => {
                write_stderr(&format!(
                    "{}: {}: {}: numeric argument required\n",
                    shell.state.script_name, which, arg
                ));
                Err(1)
            }
        },
    }
}

pub fn handle_break(shell: &mut Shell, args: &[String], ctx: ExecContext) -> Result<i32, ExecError> {
    let level = match parse_level(shell, "break", args) {
        Ok(level) => level,
        Err(status) => return Ok(status),
    };
    if ctx.loop_depth == 0 {
        write_stderr(&format!(
            "{}: break: only meaningful in a `for', `while', or `until' loop\n",
            shell.state.script_name
        ));
        return Ok(0);
    }
    Err(ExecError::Break(level.min(ctx.loop_depth)))
}

pub fn handle_continue(
    shell: &mut Shell,
    args: &[String],
    ctx: ExecContext,
) -> Result<i32, ExecError> {
    let level = match parse_level(shell, "continue", args) {
        Ok(level) => level,
        Err(status) => return Ok(status),
    };
    if ctx.loop_depth == 0 {
        write_stderr(&format!(
            "{}: continue: only meaningful in a `for', `while', or `until' loop\n",
            shell.state.script_name
        ));
        return Ok(0);
    }
    Err(ExecError::Continue(level.min(ctx.loop_depth)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_outside_loop_reports() {
        let mut shell = Shell::new();
        assert_eq!(
            handle_break(&mut shell, &[], ExecContext::default()).unwrap(),
            0
        );
    }

    #[test]
    fn break_level_clamps_to_depth() {
        let mut shell = Shell::new();
        let ctx = ExecContext::default().in_loop().in_loop();
        match handle_break(&mut shell, &["5".to_string()], ctx) {
            Err(ExecError::Break(2)) => {}
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn continue_zero_is_an_error() {
        let mut shell = Shell::new();
        let ctx = ExecContext::default().in_loop();
        assert_eq!(
            handle_continue(&mut shell, &["0".to_string()], ctx).unwrap(),
            1
        );
    }
}
