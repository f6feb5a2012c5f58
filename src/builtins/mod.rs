//! Builtin Commands
//!
//! The POSIX special builtins plus the shell-essential set. Special
//! builtins take precedence over functions, and their failures are fatal
//! under `set -o posix`.

pub mod alias_cmd;
pub mod break_cmd;
pub mod cd_cmd;
pub mod colon_cmd;
pub mod declare_cmd;
pub mod echo_cmd;
pub mod eval_cmd;
pub mod exec_cmd;
pub mod exit_cmd;
pub mod export_cmd;
pub mod getopts_cmd;
pub mod jobs_cmd;
pub mod let_cmd;
pub mod printf_cmd;
pub mod read_cmd;
pub mod return_cmd;
pub mod set_cmd;
pub mod shift_cmd;
pub mod shopt_cmd;
pub mod source_cmd;
pub mod test_cmd;
pub mod trap_cmd;
pub mod type_cmd;
pub mod unset_cmd;

use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::shell::Shell;

/// POSIX special builtins: found before functions, fatal-on-error in posix
/// mode, and prefix assignments before them persist.
pub const SPECIAL_BUILTINS: &[&str] = &[
    ":", ".", "break", "continue", "eval", "exec", "exit", "export", "readonly", "return", "set",
    "shift", "source", "trap", "unset",
];

const REGULAR_BUILTINS: &[&str] = &[
    "alias", "bg", "cd", "command", "declare", "disown", "echo", "false", "fg", "getopts", "jobs",
    "kill", "let", "local", "printf", "pwd", "read", "shopt", "test", "true", "type", "typeset",
    "unalias", "wait", "[",
];

pub fn is_special_builtin(name: &str) -> bool {
    SPECIAL_BUILTINS.contains(&name)
}

pub fn is_builtin(name: &str) -> bool {
    is_special_builtin(name) || REGULAR_BUILTINS.contains(&name)
}

/// Dispatch a builtin by name. Callers have already applied redirections.
pub fn run_builtin(
    shell: &mut Shell,
    name: &str,
    args: &[String],
    ctx: ExecContext,
) -> Result<i32, ExecError> {
    let result = match name {
        ":" | "true" => colon_cmd::handle_colon(shell, args),
        "false" => Ok(1),
        "exit" => exit_cmd::handle_exit(shell, args),
        "return" => return_cmd::handle_return(shell, args, ctx),
        "break" => break_cmd::handle_break(shell, args, ctx),
        "continue" => break_cmd::handle_continue(shell, args, ctx),
        "exec" => exec_cmd::handle_exec(shell, args),
        "eval" => eval_cmd::handle_eval(shell, args, ctx),
        "set" => set_cmd::handle_set(shell, args),
        "shopt" => shopt_cmd::handle_shopt(shell, args),
        "shift" => shift_cmd::handle_shift(shell, args),
        "trap" => trap_cmd::handle_trap(shell, args),
        "export" => export_cmd::handle_export(shell, args),
        "readonly" => export_cmd::handle_readonly(shell, args),
        "declare" | "typeset" => declare_cmd::handle_declare(shell, args, false),
        "local" => declare_cmd::handle_local(shell, args),
        "unset" => unset_cmd::handle_unset(shell, args),
        "." | "source" => source_cmd::handle_source(shell, args, ctx),
        "cd" => cd_cmd::handle_cd(shell, args),
        "pwd" => cd_cmd::handle_pwd(shell, args),
        "echo" => echo_cmd::handle_echo(shell, args),
        "printf" => printf_cmd::handle_printf(shell, args),
        "read" => read_cmd::handle_read(shell, args),
        "test" | "[" => test_cmd::handle_test(shell, name, args),
        "getopts" => getopts_cmd::handle_getopts(shell, args),
        "alias" => alias_cmd::handle_alias(shell, args),
        "unalias" => alias_cmd::handle_unalias(shell, args),
        "type" => type_cmd::handle_type(shell, args),
        "command" => type_cmd::handle_command(shell, args, ctx),
        "jobs" => jobs_cmd::handle_jobs(shell, args),
        "fg" => jobs_cmd::handle_fg(shell, args),
        "bg" => jobs_cmd::handle_bg(shell, args),
        "wait" => jobs_cmd::handle_wait(shell, args),
        "disown" => jobs_cmd::handle_disown(shell, args),
        "kill" => jobs_cmd::handle_kill(shell, args),
        "let" => let_cmd::handle_let(shell, args),
        _ => {
            return Err(ExecError::CommandNotFound(name.to_string()));
        }
    };

    match result {
        Ok(status) => Ok(status),
        Err(err) if err.is_control_flow() || matches!(err, ExecError::Exit(_) | ExecError::PosixFatal(_)) => {
            Err(err)
        }
        Err(err) => {
            // Builtin-level errors report and become an exit status;
            // special builtins are fatal in posix mode.
            crate::exec::write_stderr(&format!(
                "{}: {}: {}\n",
                shell.state.script_name, name, err
            ));
            let status = err.exit_code();
            if shell.state.options.posix && is_special_builtin(name) {
                return Err(ExecError::PosixFatal(status));
            }
            Ok(status)
        }
    }
}
