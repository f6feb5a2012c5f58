//! Subshells and Substitutions
//!
//! `( ... )` forks a shell child; command substitution captures a child's
//! stdout through a pipe, stripping trailing newlines only; process
//! substitution hands the consumer a `/dev/fd/N` path wired to a shell
//! child. Variable mutations in any of these children never reach the
//! parent.

use std::os::fd::IntoRawFd;

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, pipe, read, ForkResult};

use crate::ast::types::{ProcessSubDirection, ProcessSubPart, ScriptNode, SubshellNode};
use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::exec::fork_flushed;
use crate::jobs::signals::{apply_child_signal_policy, ChildKind};
use crate::shell::Shell;

impl Shell {
    /// Mark this process as a forked shell child.
    fn become_shell_child(&mut self) {
        apply_child_signal_policy(ChildKind::ShellProcess);
        self.state.in_forked_child = true;
        self.jobs.job_control = false;
        // Traps are not inherited by subshell children.
        self.traps = crate::traps::TrapManager::new();
    }

    /// `( ... )`: run the body in a forked child, wait for it.
    pub fn exec_subshell(&mut self, node: &SubshellNode, ctx: ExecContext) -> Result<i32, ExecError> {
        match unsafe { fork_flushed() } {
            Ok(ForkResult::Child) => {
                self.become_shell_child();
                let status = match self.exec_statements(&node.body, ctx.in_subshell()) {
                    Ok(status) => status,
                    Err(ExecError::Exit(code)) => code,
                    Err(err) => self.report_error(&err),
                };
                self.run_exit_trap_in_child();
                self.child_exit(status)
            }
            Ok(ForkResult::Parent { child }) => Ok(wait_status(child)),
            Err(e) => Err(ExecError::expansion(format!("fork failed: {}", e))),
        }
    }

    /// `$( ... )`: capture the child's stdout; trailing newlines stripped.
    pub fn command_substitution(&mut self, body: &ScriptNode) -> Result<String, ExecError> {
        let (read_end, write_end) = pipe().map_err(|e| ExecError::expansion(e.to_string()))?;
        let read_fd = read_end.into_raw_fd();
        let write_fd = write_end.into_raw_fd();

        match unsafe { fork_flushed() } {
            Ok(ForkResult::Child) => {
                self.become_shell_child();
                let _ = close(read_fd);
                let _ = dup2(write_fd, 1);
                let _ = close(write_fd);
                let status = match self.exec_script(body, ExecContext::default()) {
                    Ok(status) => status,
                    Err(ExecError::Exit(code)) => code,
                    Err(err) => self.report_error(&err),
                };
                self.child_exit(status)
            }
            Ok(ForkResult::Parent { child }) => {
                let _ = close(write_fd);
                let mut output = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    match read(read_fd, &mut buf) {
                        Ok(0) => break,
                        Ok(n) => output.extend_from_slice(&buf[..n]),
                        Err(nix::errno::Errno::EINTR) => continue,
                        Err(_) => break,
                    }
                }
                let _ = close(read_fd);
                let status = wait_status(child);
                self.state.last_cmdsub_status = Some(status);

                let mut text = String::from_utf8_lossy(&output).into_owned();
                while text.ends_with('\n') {
                    text.pop();
                }
                Ok(text)
            }
            Err(e) => {
                let _ = close(read_fd);
                let _ = close(write_fd);
                Err(ExecError::expansion(format!("fork failed: {}", e)))
            }
        }
    }

    /// `<(cmd)` / `>(cmd)`: expand to a /dev/fd path connected to a shell
    /// child running cmd. The parent-side fd stays open until the current
    /// command finishes.
    pub fn process_substitution(&mut self, part: &ProcessSubPart) -> Result<String, ExecError> {
        let (read_end, write_end) = pipe().map_err(|e| ExecError::expansion(e.to_string()))?;
        let read_fd = read_end.into_raw_fd();
        let write_fd = write_end.into_raw_fd();

        let (child_fd, child_target, keep_fd) = match part.direction {
            // <(cmd): cmd writes into the pipe, the consumer reads.
            ProcessSubDirection::Read => (write_fd, 1, read_fd),
            // >(cmd): cmd reads from the pipe, the consumer writes.
            ProcessSubDirection::Write => (read_fd, 0, write_fd),
        };

        match unsafe { fork_flushed() } {
            Ok(ForkResult::Child) => {
                self.become_shell_child();
                let _ = close(keep_fd);
                let _ = dup2(child_fd, child_target);
                let _ = close(child_fd);
                let status = match self.exec_script(&part.body, ExecContext::default()) {
                    Ok(status) => status,
                    Err(ExecError::Exit(code)) => code,
                    Err(err) => self.report_error(&err),
                };
                self.child_exit(status)
            }
            Ok(ForkResult::Parent { .. }) => {
                let _ = close(child_fd);
                // The consumer resolves the path through /dev/fd.
                self.procsub_fds.push(keep_fd);
                Ok(format!("/dev/fd/{}", keep_fd))
            }
            Err(e) => {
                let _ = close(read_fd);
                let _ = close(write_fd);
                Err(ExecError::expansion(format!("fork failed: {}", e)))
            }
        }
    }

    /// Close the parent ends of process substitutions after the consuming
    /// command finished.
    pub fn close_procsub_fds(&mut self) {
        for fd in std::mem::take(&mut self.procsub_fds) {
            let _ = close(fd);
        }
    }

    /// EXIT trap inside subshell children (they exit through child_exit).
    fn run_exit_trap_in_child(&mut self) {
        if let Some(action) = self.traps.exit_action() {
            self.run_trap_action(&action);
        }
    }
}

/// Wait for one direct child, decoding signal deaths as 128+N.
pub fn wait_status(child: nix::unistd::Pid) -> i32 {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(WaitStatus::Signaled(_, sig, _)) => return 128 + sig as i32,
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => return 1,
        }
    }
}
