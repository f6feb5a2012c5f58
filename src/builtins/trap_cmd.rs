//! trap - set and list signal handlers
//!
//! trap 'action' target...  /  trap - target...  /  trap -l  /  trap -p

use crate::core::errors::ExecError;
use crate::exec::{write_stderr, write_stdout};
use crate::shell::Shell;
use crate::traps::{parse_trap_target, signal_name, TrapTarget, SIGNAL_NAMES};

pub fn handle_trap(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    if args.is_empty() {
        print_traps(shell);
        return Ok(0);
    }
    match args[0].as_str() {
        "-l" => {
            for (num, name) in SIGNAL_NAMES {
                write_stdout(&format!("{:>2}) SIG{}\n", num, name));
            }
            return Ok(0);
        }
        "-p" => {
            print_traps(shell);
            return Ok(0);
        }
        _ => {}
    }

    // `trap TARGET` with a single valid target resets it (obsolete POSIX
    // form); otherwise the first argument is the action.
    if args.len() == 1 {
        if let Some(target) = parse_trap_target(&args[0]) {
            shell.traps.reset(target);
            return Ok(0);
        }
    }

    let (action, targets) = (args[0].clone(), &args[1..]);
    if targets.is_empty() {
        write_stderr(&format!(
            "{}: trap: usage: trap [action] [signal...]\n",
            shell.state.script_name
        ));
        return Ok(2);
    }

    let mut status = 0;
    for spec in targets {
        match parse_trap_target(spec) {
            Some(target) => {
                if action == "-" {
                    shell.traps.reset(target);
                } else {
                    shell.traps.set(target, action.clone());
                }
            }
            None => {
                write_stderr(&format!(
                    "{}: trap: {}: invalid signal specification\n",
                    shell.state.script_name, spec
                ));
                status = 1;
            }
        }
    }
    Ok(status)
}

fn print_traps(shell: &Shell) {
    for (target, action) in shell.traps.list() {
        let name = match target {
            TrapTarget::Signal(sig) => signal_name(*sig),
            TrapTarget::Exit => "EXIT".to_string(),
            TrapTarget::Debug => "DEBUG".to_string(),
            TrapTarget::Err => "ERR".to_string(),
        };
        write_stdout(&format!("trap -- '{}' {}\n", action.replace('\'', "'\\''"), name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trap_sets_and_resets_exit() {
        let mut shell = Shell::new();
        handle_trap(
            &mut shell,
            &["echo bye".to_string(), "EXIT".to_string()],
        )
        .unwrap();
        assert_eq!(shell.traps.exit_action(), Some("echo bye".to_string()));
        handle_trap(&mut shell, &["-".to_string(), "EXIT".to_string()]).unwrap();
        assert_eq!(shell.traps.exit_action(), None);
    }

    #[test]
    fn trap_invalid_signal() {
        let mut shell = Shell::new();
        let status = handle_trap(
            &mut shell,
            &[":".to_string(), "NOSUCHSIG".to_string()],
        )
        .unwrap();
        assert_eq!(status, 1);
    }

    #[test]
    fn trap_single_target_resets() {
        let mut shell = Shell::new();
        shell
            .traps
            .set(TrapTarget::Exit, "echo x".to_string());
        handle_trap(&mut shell, &["EXIT".to_string()]).unwrap();
        assert!(shell.traps.get(TrapTarget::Exit).is_none());
    }
}
