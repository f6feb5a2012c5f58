//! Control Flow
//!
//! if/elif/else, while, until, for, C-style for, case (with its three
//! terminators), and select. Loops consume the break/continue escapes
//! addressed to them and re-throw the rest of a multi-level unwind.

use crate::ast::types::{
    CStyleForNode, CaseNode, CaseTerminator, ForNode, IfNode, SelectNode, UntilNode, WhileNode,
};
use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::exec::{write_stderr};
use crate::expansion::pattern::{match_pattern, MatchOptions};
use crate::expansion::{expand_word_pattern, expand_word_raw, expand_words};
use crate::jobs::signals::take_sigint;
use crate::shell::Shell;

/// What a loop body iteration asked its loop to do.
enum LoopSignal {
    Normal(i32),
    Break,
    Continue,
}

impl Shell {
    /// Run one loop-body iteration, consuming break/continue for this
    /// level and re-throwing outer levels.
    fn loop_body(
        &mut self,
        body: &[crate::ast::types::StatementNode],
        ctx: ExecContext,
    ) -> Result<LoopSignal, ExecError> {
        match self.exec_statements(body, ctx) {
            Ok(status) => Ok(LoopSignal::Normal(status)),
            Err(ExecError::Break(levels)) => {
                if levels > 1 {
                    Err(ExecError::Break(levels - 1))
                } else {
                    Ok(LoopSignal::Break)
                }
            }
            Err(ExecError::Continue(levels)) => {
                if levels > 1 {
                    Err(ExecError::Continue(levels - 1))
                } else {
                    Ok(LoopSignal::Continue)
                }
            }
            Err(err) => Err(err),
        }
    }

    pub fn exec_if(&mut self, node: &IfNode, ctx: ExecContext) -> Result<i32, ExecError> {
        for clause in &node.clauses {
            let cond_status = self.exec_statements(&clause.condition, ctx.in_condition())?;
            if cond_status == 0 {
                return self.exec_statements(&clause.body, ctx);
            }
        }
        match &node.else_body {
            Some(body) => self.exec_statements(body, ctx),
            None => Ok(0),
        }
    }

    pub fn exec_while(&mut self, node: &WhileNode, ctx: ExecContext) -> Result<i32, ExecError> {
        let body_ctx = ctx.in_loop();
        let mut status = 0;
        loop {
            if take_sigint() {
                return Ok(130);
            }
            let cond = self.exec_statements(&node.condition, ctx.in_condition())?;
            if cond != 0 {
                break;
            }
            match self.loop_body(&node.body, body_ctx)? {
                LoopSignal::Normal(s) => status = s,
                LoopSignal::Break => break,
                LoopSignal::Continue => continue,
            }
        }
        Ok(status)
    }

    pub fn exec_until(&mut self, node: &UntilNode, ctx: ExecContext) -> Result<i32, ExecError> {
        let body_ctx = ctx.in_loop();
        let mut status = 0;
        loop {
            if take_sigint() {
                return Ok(130);
            }
            let cond = self.exec_statements(&node.condition, ctx.in_condition())?;
            if cond == 0 {
                break;
            }
            match self.loop_body(&node.body, body_ctx)? {
                LoopSignal::Normal(s) => status = s,
                LoopSignal::Break => break,
                LoopSignal::Continue => continue,
            }
        }
        Ok(status)
    }

    pub fn exec_for(&mut self, node: &ForNode, ctx: ExecContext) -> Result<i32, ExecError> {
        let items = match &node.words {
            Some(words) => expand_words(self, words)?,
            None => self.state.positional.clone(),
        };
        let body_ctx = ctx.in_loop();
        let mut status = 0;
        for item in items {
            if take_sigint() {
                return Ok(130);
            }
            self.state.scopes.set_scalar(&node.variable, item, false)?;
            match self.loop_body(&node.body, body_ctx)? {
                LoopSignal::Normal(s) => status = s,
                LoopSignal::Break => break,
                LoopSignal::Continue => continue,
            }
        }
        Ok(status)
    }

    pub fn exec_c_style_for(
        &mut self,
        node: &CStyleForNode,
        ctx: ExecContext,
    ) -> Result<i32, ExecError> {
        if let Some(init) = &node.init {
            crate::arith::eval_arith(&mut self.state, init)?;
        }
        let body_ctx = ctx.in_loop();
        let mut status = 0;
        loop {
            if take_sigint() {
                return Ok(130);
            }
            if let Some(condition) = &node.condition {
                if crate::arith::eval_arith(&mut self.state, condition)? == 0 {
                    break;
                }
            }
            let signal = self.loop_body(&node.body, body_ctx)?;
            // The update runs at the loop tail and on continue, not break.
            if !matches!(signal, LoopSignal::Break) {
                if let Some(update) = &node.update {
                    crate::arith::eval_arith(&mut self.state, update)?;
                }
            }
            match signal {
                LoopSignal::Normal(s) => status = s,
                LoopSignal::Break => break,
                LoopSignal::Continue => continue,
            }
        }
        Ok(status)
    }

    pub fn exec_case(&mut self, node: &CaseNode, ctx: ExecContext) -> Result<i32, ExecError> {
        let scrutinee = expand_word_raw(self, &node.word)?;
        let opts = MatchOptions {
            extglob: self.state.shopt.extglob,
            nocase: self.state.shopt.nocasematch,
        };

        let mut status = 0;
        let mut fall_through = false;
        for item in &node.items {
            let selected = fall_through
                || item.patterns.iter().try_fold(false, |acc, pattern| {
                    if acc {
                        return Ok::<bool, ExecError>(true);
                    }
                    let pattern = expand_word_pattern(self, pattern)?;
                    Ok(match_pattern(&pattern, &scrutinee, opts))
                })?;
            if !selected {
                continue;
            }
            status = self.exec_statements(&item.body, ctx)?;
            match item.terminator {
                CaseTerminator::Break => return Ok(status),
                CaseTerminator::FallThrough => {
                    fall_through = true;
                }
                CaseTerminator::Continue => {
                    fall_through = false;
                }
            }
        }
        Ok(status)
    }

    pub fn exec_select(&mut self, node: &SelectNode, ctx: ExecContext) -> Result<i32, ExecError> {
        let items = match &node.words {
            Some(words) => expand_words(self, words)?,
            None => self.state.positional.clone(),
        };
        let body_ctx = ctx.in_loop();
        let mut status = 0;
        loop {
            if take_sigint() {
                return Ok(130);
            }
            // Menu and prompt on stderr.
            for (i, item) in items.iter().enumerate() {
                write_stderr(&format!("{}) {}\n", i + 1, item));
            }
            let ps3 = self
                .state
                .scopes
                .get_string("PS3")
                .unwrap_or_else(|| "#? ".to_string());
            write_stderr(&ps3);

            let line = match read_line_fd0() {
                Some(line) => line,
                None => break, // EOF ends select
            };
            let reply = line.trim().to_string();
            self.state.scopes.set_scalar("REPLY", reply.clone(), false)?;
            let selection = reply
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1 && *n <= items.len())
                .map(|n| items[n - 1].clone())
                .unwrap_or_default();
            self.state.scopes.set_scalar(&node.variable, selection, false)?;

            match self.loop_body(&node.body, body_ctx)? {
                LoopSignal::Normal(s) => status = s,
                LoopSignal::Break => break,
                LoopSignal::Continue => continue,
            }
        }
        Ok(status)
    }
}

/// Read one line from fd 0, byte at a time so no input beyond the newline
/// is consumed. None on EOF with nothing read.
pub fn read_line_fd0() -> Option<String> {
    let mut line = Vec::new();
    let mut buf = [0u8; 1];
    loop {
        match nix::unistd::read(0, &mut buf) {
            Ok(0) => {
                if line.is_empty() {
                    return None;
                }
                break;
            }
            Ok(_) => {
                if buf[0] == b'\n' {
                    break;
                }
                line.push(buf[0]);
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => {
                if line.is_empty() {
                    return None;
                }
                break;
            }
        }
    }
    Some(String::from_utf8_lossy(&line).into_owned())
}
