//! Pipelines
//!
//! `a | b | c`: one pipe per junction, one forked child per stage, all in
//! a process group led by the first child. The parent hands the terminal
//! to the group for foreground jobs, waits, and computes the exit status
//! (last stage, or the rightmost failure under pipefail). `!` negates.

use std::os::fd::IntoRawFd;
use std::time::Instant;

use nix::unistd::{close, dup2, setpgid, ForkResult, Pid};

use crate::ast::types::{CommandNode, PipelineNode};
use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::exec::{fork_flushed, write_stderr};
use crate::jobs::signals::{apply_child_signal_policy, ChildKind};
use crate::shell::Shell;

impl Shell {
    pub fn exec_pipeline(&mut self, node: &PipelineNode, ctx: ExecContext) -> Result<i32, ExecError> {
        let started = node.timed.then(Instant::now);

        let status = if node.commands.len() == 1 {
            self.exec_command(&node.commands[0], ctx)?
        } else {
            self.run_stages(node, ctx)?
        };

        if let Some(started) = started {
            let elapsed = started.elapsed();
            write_stderr(&format!(
                "\nreal\t{}m{:.3}s\n",
                elapsed.as_secs() / 60,
                (elapsed.as_secs_f64()) % 60.0
            ));
        }

        let status = if node.negated {
            if status == 0 {
                1
            } else {
                0
            }
        } else {
            status
        };
        self.state.last_exit_code = status;
        Ok(status)
    }

    fn run_stages(&mut self, node: &PipelineNode, ctx: ExecContext) -> Result<i32, ExecError> {
        let n = node.commands.len();
        let mut pipes: Vec<(i32, i32)> = Vec::with_capacity(n - 1);
        for _ in 0..n - 1 {
            let (read_end, write_end) = nix::unistd::pipe()
                .map_err(|e| ExecError::expansion(format!("pipe failed: {}", e)))?;
            pipes.push((read_end.into_raw_fd(), write_end.into_raw_fd()));
        }

        let mut pgid: Option<i32> = None;
        let mut pids: Vec<i32> = Vec::with_capacity(n);
        let job_control = self.jobs.job_control;

        for (i, command) in node.commands.iter().enumerate() {
            match unsafe { fork_flushed() } {
                Ok(ForkResult::Child) => {
                    apply_child_signal_policy(ChildKind::ShellProcess);
                    // Race-safe group assignment: both sides set it. Only
                    // monitor mode moves children out of the shell's group.
                    if job_control {
                        let group = pgid.map(Pid::from_raw).unwrap_or_else(|| Pid::from_raw(0));
                        let _ = setpgid(Pid::from_raw(0), group);
                    }

                    self.state.in_forked_child = true;
                    self.jobs.job_control = false;
                    self.traps = crate::traps::TrapManager::new();

                    if i > 0 {
                        let _ = dup2(pipes[i - 1].0, 0);
                    }
                    if i < n - 1 {
                        let _ = dup2(pipes[i].1, 1);
                    }
                    for (read_fd, write_fd) in &pipes {
                        let _ = close(*read_fd);
                        let _ = close(*write_fd);
                    }

                    let child_ctx = ctx.in_pipeline().in_subshell();
                    let status = match self.exec_command(command, child_ctx) {
                        Ok(status) => status,
                        Err(ExecError::Exit(code)) => code,
                        Err(err) => self.report_error(&err),
                    };
                    self.child_exit(status)
                }
                Ok(ForkResult::Parent { child }) => {
                    let group = pgid.unwrap_or_else(|| child.as_raw());
                    pgid = Some(group);
                    if job_control {
                        let _ = setpgid(child, Pid::from_raw(group));
                    }
                    pids.push(child.as_raw());
                }
                Err(e) => {
                    for (read_fd, write_fd) in &pipes {
                        let _ = close(*read_fd);
                        let _ = close(*write_fd);
                    }
                    return Err(ExecError::expansion(format!("fork failed: {}", e)));
                }
            }
        }

        for (read_fd, write_fd) in &pipes {
            let _ = close(*read_fd);
            let _ = close(*write_fd);
        }

        let pgid = pgid.unwrap_or(0);
        let id = self
            .jobs
            .add_job(pgid, pids, describe_pipeline(node), true);
        self.jobs.give_terminal_to(pgid);
        let status = self.jobs.wait_for_job(id);
        self.state.pipe_status = self.jobs.last_pipe_statuses.clone();

        if self.state.options.pipefail {
            let failed = self
                .state
                .pipe_status
                .iter()
                .rev()
                .find(|s| **s != 0)
                .copied();
            return Ok(failed.unwrap_or(0));
        }
        Ok(status)
    }
}

/// A short description of a pipeline for job listings.
pub fn describe_pipeline(node: &PipelineNode) -> String {
    let mut parts = Vec::new();
    for command in &node.commands {
        parts.push(describe_command(command));
    }
    parts.join(" | ")
}

fn describe_command(command: &CommandNode) -> String {
    match command {
        CommandNode::Simple(simple) => {
            let mut words = Vec::new();
            if let Some(name) = &simple.name {
                words.push(name.as_literal().unwrap_or_else(|| "?".to_string()));
            }
            for arg in &simple.args {
                words.push(arg.as_literal().unwrap_or_else(|| "?".to_string()));
            }
            words.join(" ")
        }
        CommandNode::Compound(_) => "(compound)".to_string(),
        CommandNode::FunctionDef(def) => format!("{}()", def.name),
    }
}
