//! Executor
//!
//! A visitor over the AST. Every visit method returns `Result<i32,
//! ExecError>`; control flow (break/continue/return/exit) travels through
//! the error channel and is consumed by the construct it addresses.

pub mod command;
pub mod conditional;
pub mod context;
pub mod control_flow;
pub mod function;
pub mod pipeline;
pub mod redirect;
pub mod subshell;

use nix::unistd::ForkResult;

use crate::ast::types::*;
use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::shell::Shell;

/// Fork with stdio flushed first, so the child does not replay buffered
/// parent output.
///
/// # Safety
/// Same contract as `nix::unistd::fork`.
pub unsafe fn fork_flushed() -> nix::Result<ForkResult> {
    use std::io::Write;
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    nix::unistd::fork()
}

/// Write to the shell's stdout (fd 1), honoring active redirections.
pub fn write_stdout(text: &str) {
    use std::io::Write;
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

/// Write to the shell's stderr (fd 2).
pub fn write_stderr(text: &str) {
    use std::io::Write;
    let mut err = std::io::stderr();
    let _ = err.write_all(text.as_bytes());
    let _ = err.flush();
}

impl Shell {
    /// Execute a parsed script; the entry point for scripts, `-c`, eval,
    /// source, and substitution children.
    pub fn exec_script(&mut self, script: &ScriptNode, ctx: ExecContext) -> Result<i32, ExecError> {
        self.exec_statements(&script.statements, ctx)
    }

    pub fn exec_statements(
        &mut self,
        statements: &[StatementNode],
        ctx: ExecContext,
    ) -> Result<i32, ExecError> {
        let mut status = 0;
        for statement in statements {
            match self.exec_statement(statement, ctx) {
                Ok(s) => status = s,
                // Arithmetic failures abort the command, not the shell.
                Err(ExecError::Arith(err)) => {
                    write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                    status = 1;
                    self.state.last_exit_code = 1;
                    if self.state.options.errexit && !ctx.in_condition {
                        return Err(ExecError::Exit(1));
                    }
                }
                Err(err) => return Err(err),
            }
            self.run_pending_traps();
        }
        Ok(status)
    }

    /// One and-or list, possibly backgrounded.
    pub fn exec_statement(
        &mut self,
        statement: &StatementNode,
        ctx: ExecContext,
    ) -> Result<i32, ExecError> {
        if statement.line > 0 {
            self.state.current_line = statement.line;
        }
        if self.state.options.noexec {
            return Ok(0);
        }
        if statement.background {
            return self.exec_background_statement(statement, ctx);
        }

        let mut status = 0;
        let mut last_ran = true;
        let mut last_negated = false;
        for (i, pipe_node) in statement.pipelines.iter().enumerate() {
            if i > 0 {
                let short_circuit = match statement.operators[i - 1] {
                    AndOrOperator::And => status != 0,
                    AndOrOperator::Or => status == 0,
                };
                if short_circuit {
                    last_ran = false;
                    continue;
                }
            }
            // Every pipeline but the last runs in condition position for
            // errexit purposes.
            let pipe_ctx = if i + 1 < statement.pipelines.len() {
                ctx.in_condition()
            } else {
                ctx
            };
            status = self.exec_pipeline(pipe_node, pipe_ctx)?;
            last_ran = true;
            last_negated = pipe_node.negated;
        }

        self.state.last_exit_code = status;
        if status != 0 && last_ran && !last_negated && !ctx.in_condition {
            self.fire_err_trap();
            if self.state.options.errexit {
                return Err(ExecError::Exit(status));
            }
        }
        Ok(status)
    }

    fn exec_background_statement(
        &mut self,
        statement: &StatementNode,
        ctx: ExecContext,
    ) -> Result<i32, ExecError> {
        use crate::jobs::signals::{apply_child_signal_policy, ChildKind};

        let command_text = format!("job @ line {}", statement.line.max(1));
        match unsafe { fork_flushed() } {
            Ok(ForkResult::Child) => {
                apply_child_signal_policy(ChildKind::ShellProcess);
                let pid = nix::unistd::getpid();
                let _ = nix::unistd::setpgid(pid, pid);
                self.state.in_forked_child = true;
                self.jobs.job_control = false;
                let mut foreground = statement.clone();
                foreground.background = false;
                let status = match self.exec_statement(&foreground, ctx.in_subshell()) {
                    Ok(status) => status,
                    Err(err) => self.report_error(&err),
                };
                self.child_exit(status)
            }
            Ok(ForkResult::Parent { child }) => {
                let pid = child.as_raw();
                let _ = nix::unistd::setpgid(child, child);
                self.jobs
                    .add_job(pid, vec![pid], command_text, false);
                self.state.last_background_pid = Some(pid);
                if self.state.is_interactive {
                    let id = self.jobs.current_job().unwrap_or(0);
                    write_stderr(&format!("[{}] {}\n", id, pid));
                }
                self.state.last_exit_code = 0;
                Ok(0)
            }
            Err(e) => Err(ExecError::expansion(format!("fork failed: {}", e))),
        }
    }

    pub fn exec_command(&mut self, command: &CommandNode, ctx: ExecContext) -> Result<i32, ExecError> {
        match command {
            CommandNode::Simple(simple) => self.exec_simple_command(simple, ctx),
            CommandNode::Compound(compound) => self.exec_compound(compound, ctx),
            CommandNode::FunctionDef(def) => {
                self.state
                    .functions
                    .insert(def.name.clone(), def.clone());
                self.state.last_exit_code = 0;
                Ok(0)
            }
        }
    }

    pub fn exec_compound(
        &mut self,
        compound: &CompoundCommandNode,
        ctx: ExecContext,
    ) -> Result<i32, ExecError> {
        let plans = redirect::plan_redirections(self, compound.redirections())?;
        let saved = if plans.is_empty() {
            None
        } else {
            Some(redirect::apply_plans_with_save(&plans)?)
        };

        let result = match compound {
            CompoundCommandNode::If(node) => self.exec_if(node, ctx),
            CompoundCommandNode::While(node) => self.exec_while(node, ctx),
            CompoundCommandNode::Until(node) => self.exec_until(node, ctx),
            CompoundCommandNode::For(node) => self.exec_for(node, ctx),
            CompoundCommandNode::CStyleFor(node) => self.exec_c_style_for(node, ctx),
            CompoundCommandNode::Case(node) => self.exec_case(node, ctx),
            CompoundCommandNode::Select(node) => self.exec_select(node, ctx),
            CompoundCommandNode::Subshell(node) => self.exec_subshell(node, ctx),
            CompoundCommandNode::Group(node) => self.exec_statements(&node.body, ctx),
            CompoundCommandNode::Arithmetic(node) => self.exec_arith_command(node),
            CompoundCommandNode::Conditional(node) => self.exec_conditional(node),
        };

        if let Some(saved) = saved {
            saved.restore();
        }
        let status = result?;
        self.state.last_exit_code = status;
        Ok(status)
    }

    fn exec_arith_command(&mut self, node: &ArithmeticCommandNode) -> Result<i32, ExecError> {
        match crate::arith::eval_arith(&mut self.state, &node.expression) {
            Ok(value) => Ok(if value != 0 { 0 } else { 1 }),
            Err(err) => {
                write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                Ok(1)
            }
        }
    }

    /// Run any trap actions for signals that arrived, then reap background
    /// children.
    pub fn run_pending_traps(&mut self) {
        if !self.in_trap {
            let actions = self.traps.take_pending_actions();
            for action in actions {
                self.run_trap_action(&action);
            }
        }
        if crate::jobs::signals::SIGCHLD_PENDING.swap(false, std::sync::atomic::Ordering::SeqCst) {
            self.jobs.reap_background();
            if self.state.options.notify || self.state.is_interactive {
                for note in self.jobs.take_notifications() {
                    write_stderr(&format!("{}\n", note));
                }
            }
        }
    }

    pub fn run_trap_action(&mut self, action: &str) {
        let saved_status = self.state.last_exit_code;
        let was_in_trap = std::mem::replace(&mut self.in_trap, true);
        match crate::parser::parse(action) {
            Ok(script) => {
                let _ = self.exec_script(&script, ExecContext::default());
            }
            Err(err) => {
                write_stderr(&format!("{}: trap: {}\n", self.state.script_name, err));
            }
        }
        self.in_trap = was_in_trap;
        self.state.last_exit_code = saved_status;
    }

    pub fn fire_err_trap(&mut self) {
        if self.in_trap {
            return;
        }
        if let Some(action) = self.traps.err_action() {
            self.run_trap_action(&action);
        }
    }

    pub fn fire_debug_trap(&mut self) {
        if self.in_trap {
            return;
        }
        if let Some(action) = self.traps.debug_action() {
            self.run_trap_action(&action);
        }
    }

    /// Print an escaped error and map it to its exit status.
    pub fn report_error(&mut self, err: &ExecError) -> i32 {
        match err {
            ExecError::Exit(code) | ExecError::Return(code) | ExecError::PosixFatal(code) => *code,
            ExecError::Break(_) | ExecError::Continue(_) => {
                write_stderr(&format!(
                    "{}: {}: only meaningful in a loop\n",
                    self.state.script_name, err
                ));
                1
            }
            _ => {
                write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                err.exit_code()
            }
        }
    }

    /// Terminate a forked child without running parent-side cleanups.
    pub fn child_exit(&mut self, status: i32) -> ! {
        use std::io::Write;
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        unsafe { libc::_exit(status & 0xff) }
    }
}
