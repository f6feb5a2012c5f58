//! Simple Commands
//!
//! Expansion, temporary assignments, command resolution (special builtin,
//! function, alias, builtin, PATH search), xtrace, the DEBUG trap, and
//! external execution with fork/exec. Builtins and functions observe their
//! redirections through fd save/restore; externals apply them after fork.

use std::ffi::CString;

use nix::unistd::{execve, setpgid, ForkResult, Pid};

use crate::ast::types::{AssignmentNode, RedirectionNode, SimpleCommandNode};
use crate::core::errors::ExecError;
use crate::core::variables::{VarValue, Variable};
use crate::exec::context::ExecContext;
use crate::exec::redirect::{apply_plans, apply_plans_with_save, plan_redirections, RedirPlan};
use crate::exec::{fork_flushed, write_stderr};
use crate::expansion::{expand_word_fields, expand_word_raw};
use crate::jobs::signals::{apply_child_signal_policy, ChildKind};
use crate::shell::Shell;

impl Shell {
    pub fn exec_simple_command(
        &mut self,
        node: &SimpleCommandNode,
        ctx: ExecContext,
    ) -> Result<i32, ExecError> {
        if node.line > 0 {
            self.state.current_line = node.line;
        }
        self.state.last_cmdsub_status = None;

        if let Some(status) = self.try_alias(node, ctx)? {
            return Ok(status);
        }

        let mut fields = Vec::new();
        if let Some(name) = &node.name {
            fields.extend(expand_word_fields(self, name)?);
        }
        for arg in &node.args {
            fields.extend(expand_word_fields(self, arg)?);
        }

        if fields.is_empty() {
            return self.assignments_only(node);
        }

        self.fire_debug_trap();
        if self.state.options.xtrace {
            self.xtrace(&fields);
        }

        let name = fields[0].clone();
        let args: Vec<String> = fields[1..].to_vec();

        // Temporary assignments: saved, applied exported, restored after —
        // except for exec, where they become permanent.
        let is_exec = name == "exec";
        let mut saved: Vec<(String, Option<Variable>)> = Vec::new();
        for assignment in &node.assignments {
            if !is_exec {
                saved.push((
                    assignment.name.clone(),
                    self.state.scopes.get(&assignment.name).cloned(),
                ));
            }
            self.apply_assignment(assignment, true)?;
        }

        let result = self.dispatch_command(&name, &args, &node.redirections, ctx, false, is_exec);

        if !is_exec {
            for (name, old) in saved.into_iter().rev() {
                self.state.scopes.restore(&name, old);
            }
        }
        self.close_procsub_fds();
        self.state.last_arg = fields.last().cloned().unwrap_or_default();

        let status = result?;
        self.state.last_exit_code = status;
        Ok(status)
    }

    /// A command line with no command word: assignments apply permanently.
    fn assignments_only(&mut self, node: &SimpleCommandNode) -> Result<i32, ExecError> {
        for assignment in &node.assignments {
            if let Err(err) = self.apply_assignment(assignment, false) {
                if err.is_control_flow() || matches!(err, ExecError::Exit(_)) {
                    return Err(err);
                }
                write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                self.state.last_exit_code = 1;
                return Ok(1);
            }
        }
        // Redirections still open their files.
        if !node.redirections.is_empty() {
            let applied = plan_redirections(self, &node.redirections)
                .and_then(|plans| apply_plans_with_save(&plans));
            match applied {
                Ok(saved) => saved.restore(),
                Err(err) => {
                    write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                    self.state.last_exit_code = 1;
                    return Ok(1);
                }
            }
        }
        let status = self.state.last_cmdsub_status.unwrap_or(0);
        self.state.last_exit_code = status;
        Ok(status)
    }

    /// Apply one assignment. `temp_export` marks the prefix-assignment
    /// form, which exports for the command's environment.
    pub fn apply_assignment(
        &mut self,
        node: &AssignmentNode,
        temp_export: bool,
    ) -> Result<(), ExecError> {
        let export = temp_export || self.state.options.allexport;

        // name[sub]=value
        if let Some(subscript) = &node.subscript {
            let sub_text = expand_word_raw(self, subscript)?;
            let value = match &node.value {
                Some(word) => expand_word_raw(self, word)?,
                None => String::new(),
            };
            return self.assign_element(&node.name, &sub_text, &value, node.append);
        }

        // name=(elements)
        if let Some(elements) = &node.array {
            return self.assign_array(node, elements);
        }

        // Plain scalar.
        let mut value = match &node.value {
            Some(word) => expand_word_raw(self, word)?,
            None => String::new(),
        };
        let integer = self
            .state
            .scopes
            .get(&node.name)
            .map(|var| var.attrs.integer)
            .unwrap_or(false);
        if integer {
            let current = crate::arith::eval_arith_string(&mut self.state, &value)?;
            value = if node.append {
                let old = self
                    .state
                    .scopes
                    .get_string(&node.name)
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(0);
                (old + current).to_string()
            } else {
                current.to_string()
            };
            self.state.scopes.set_scalar(&node.name, value, false)?;
        } else if node.append {
            self.state.scopes.append_scalar(&node.name, &value, false)?;
        } else {
            self.state.scopes.set_scalar(&node.name, value, false)?;
        }
        if export {
            self.state.scopes.apply_attrs(
                &node.name,
                crate::core::variables::VarAttrs {
                    exported: true,
                    ..Default::default()
                },
                false,
            )?;
        }
        Ok(())
    }

    fn assign_element(
        &mut self,
        name: &str,
        sub_text: &str,
        value: &str,
        append: bool,
    ) -> Result<(), ExecError> {
        let is_assoc = matches!(
            self.state.scopes.get(name).map(|v| &v.value),
            Some(VarValue::Assoc(_))
        );
        if is_assoc {
            let new = if append {
                let old = match self.state.scopes.get(name).map(|v| &v.value) {
                    Some(VarValue::Assoc(map)) => map.get(sub_text).cloned().unwrap_or_default(),
                    _ => String::new(),
                };
                format!("{}{}", old, value)
            } else {
                value.to_string()
            };
            self.state.scopes.set_assoc(name, sub_text, new)
        } else {
            let index = crate::arith::eval_arith_string(&mut self.state, sub_text)?;
            let new = if append {
                let old = self
                    .state
                    .scopes
                    .get(name)
                    .and_then(|v| v.index_get(index))
                    .unwrap_or_default();
                format!("{}{}", old, value)
            } else {
                value.to_string()
            };
            self.state.scopes.set_index(name, index, new)
        }
    }

    fn assign_array(
        &mut self,
        node: &AssignmentNode,
        elements: &[crate::ast::types::ArrayElementNode],
    ) -> Result<(), ExecError> {
        let existing = self.state.scopes.get(&node.name).cloned();
        let is_assoc = matches!(
            existing.as_ref().map(|v| &v.value),
            Some(VarValue::Assoc(_))
        );

        if is_assoc {
            let mut map = if node.append {
                match existing.map(|v| v.value) {
                    Some(VarValue::Assoc(map)) => map,
                    _ => indexmap::IndexMap::new(),
                }
            } else {
                indexmap::IndexMap::new()
            };
            for element in elements {
                let key = match &element.key {
                    Some(key) => expand_word_raw(self, key)?,
                    None => {
                        return Err(ExecError::expansion(format!(
                            "{}: associative array assignments need [key]=value",
                            node.name
                        )))
                    }
                };
                let value = expand_word_raw(self, &element.value)?;
                map.insert(key, value);
            }
            let attrs = self
                .state
                .scopes
                .get(&node.name)
                .map(|v| v.attrs)
                .unwrap_or_default();
            return self.state.scopes.set_var(
                &node.name,
                Variable {
                    value: VarValue::Assoc(map),
                    attrs,
                },
                false,
            );
        }

        let mut map = if node.append {
            match existing.as_ref().map(|v| &v.value) {
                Some(VarValue::Indexed(map)) => map.clone(),
                Some(VarValue::Scalar(s)) if !s.is_empty() => {
                    let mut map = std::collections::BTreeMap::new();
                    map.insert(0, s.clone());
                    map
                }
                _ => std::collections::BTreeMap::new(),
            }
        } else {
            std::collections::BTreeMap::new()
        };
        let mut next_index: i64 = map.keys().next_back().map(|k| k + 1).unwrap_or(0);

        for element in elements {
            match &element.key {
                Some(key) => {
                    let key_text = expand_word_raw(self, key)?;
                    let index = crate::arith::eval_arith_string(&mut self.state, &key_text)?;
                    let value = expand_word_raw(self, &element.value)?;
                    map.insert(index, value);
                    next_index = next_index.max(index + 1);
                }
                None => {
                    // Bare elements word-split and glob elementwise.
                    for field in expand_word_fields(self, &element.value)? {
                        map.insert(next_index, field);
                        next_index += 1;
                    }
                }
            }
        }
        let attrs = self
            .state
            .scopes
            .get(&node.name)
            .map(|v| v.attrs)
            .unwrap_or_default();
        self.state.scopes.set_var(
            &node.name,
            Variable {
                value: VarValue::Indexed(map),
                attrs,
            },
            false,
        )
    }

    fn xtrace(&mut self, fields: &[String]) {
        let ps4 = self
            .state
            .scopes
            .get_string("PS4")
            .unwrap_or_else(|| "+ ".to_string());
        write_stderr(&format!("{}{}\n", ps4, fields.join(" ")));
    }

    // -------------------------------------------------------------------------
    // resolution & dispatch
    // -------------------------------------------------------------------------

    /// Resolve and run a named command. `skip_functions` is the `command`
    /// builtin's bypass.
    pub fn dispatch_command(
        &mut self,
        name: &str,
        args: &[String],
        redirections: &[RedirectionNode],
        ctx: ExecContext,
        skip_functions: bool,
        permanent_redirects: bool,
    ) -> Result<i32, ExecError> {
        let plans = match plan_redirections(self, redirections) {
            Ok(plans) => plans,
            Err(err) => return self.redirect_failure(name, err),
        };

        // Special builtins take precedence over functions.
        if crate::builtins::is_special_builtin(name) {
            if permanent_redirects {
                if let Err(err) = apply_plans(&plans) {
                    return self.redirect_failure(name, err);
                }
                return crate::builtins::run_builtin(self, name, args, ctx);
            }
            return self.run_with_saved_fds(&plans, name, |shell| {
                crate::builtins::run_builtin(shell, name, args, ctx)
            });
        }

        if !skip_functions {
            if let Some(def) = self.state.functions.get(name).cloned() {
                return self.run_with_saved_fds(&plans, name, |shell| {
                    shell.call_function(&def, args, ctx)
                });
            }
        }

        if crate::builtins::is_builtin(name) {
            return self.run_with_saved_fds(&plans, name, |shell| {
                crate::builtins::run_builtin(shell, name, args, ctx)
            });
        }

        self.exec_external(name, args, &plans, ctx)
    }

    fn redirect_failure(&mut self, name: &str, err: ExecError) -> Result<i32, ExecError> {
        write_stderr(&format!("{}: {}: {}\n", self.state.script_name, name, err));
        if self.state.options.posix && crate::builtins::is_special_builtin(name) {
            return Err(ExecError::PosixFatal(1));
        }
        Ok(1)
    }

    fn run_with_saved_fds(
        &mut self,
        plans: &[RedirPlan],
        name: &str,
        run: impl FnOnce(&mut Shell) -> Result<i32, ExecError>,
    ) -> Result<i32, ExecError> {
        let saved = if plans.is_empty() {
            None
        } else {
            match apply_plans_with_save(plans) {
                Ok(saved) => Some(saved),
                Err(err) => return self.redirect_failure(name, err),
            }
        };
        let result = run(self);
        if let Some(saved) = saved {
            saved.restore();
        }
        result
    }

    // -------------------------------------------------------------------------
    // aliases
    // -------------------------------------------------------------------------

    /// Expand an alias on the command name. Returns the executed status
    /// when an alias fired.
    fn try_alias(
        &mut self,
        node: &SimpleCommandNode,
        ctx: ExecContext,
    ) -> Result<Option<i32>, ExecError> {
        if !self.state.shopt.expand_aliases {
            return Ok(None);
        }
        let name = match node.name.as_ref().and_then(|w| w.as_literal()) {
            Some(name) => name,
            None => return Ok(None),
        };
        // A quoted name suppresses alias lookup; as_literal collapses
        // quotes, so check the raw shape.
        if !matches!(
            node.name.as_ref().map(|w| w.parts.as_slice()),
            Some([crate::ast::types::WordPart::Literal(_)])
        ) {
            return Ok(None);
        }
        if self.expanding_aliases.contains(&name) {
            return Ok(None);
        }
        let value = match self.state.aliases.get(&name) {
            Some(value) => value.clone(),
            None => return Ok(None),
        };

        let script = crate::parser::parse(&value)
            .map_err(|e| ExecError::Syntax(format!("alias {}: {}", name, e)))?;

        self.expanding_aliases.push(name.clone());
        let result = (|| {
            // The common shape: the alias is one simple command; merge the
            // call site's arguments and redirections into it.
            if let Some(mut merged) = single_simple_command(&script) {
                merged.assignments = node
                    .assignments
                    .iter()
                    .cloned()
                    .chain(merged.assignments)
                    .collect();
                merged.args.extend(node.args.iter().cloned());
                merged.redirections.extend(node.redirections.iter().cloned());
                merged.line = node.line;
                return self.exec_simple_command(&merged, ctx);
            }
            if node.args.is_empty() && node.assignments.is_empty() && node.redirections.is_empty() {
                return self.exec_script(&script, ctx);
            }
            write_stderr(&format!(
                "{}: {}: alias with complex value cannot take arguments\n",
                self.state.script_name, name
            ));
            Ok(1)
        })();
        self.expanding_aliases.pop();
        result.map(Some)
    }

    // -------------------------------------------------------------------------
    // externals
    // -------------------------------------------------------------------------

    /// Locate a command on PATH (or as a path). Caches under hashcmds.
    pub fn find_in_path(&mut self, name: &str) -> Option<String> {
        if name.contains('/') {
            return std::fs::metadata(name).ok().map(|_| name.to_string());
        }
        if self.state.options.hashcmds {
            if let Some(cached) = self.state.hashed_commands.get(name) {
                if std::fs::metadata(cached).is_ok() {
                    return Some(cached.clone());
                }
            }
        }
        let path = self.state.scopes.get_string("PATH").unwrap_or_default();
        for dir in path.split(':') {
            let dir = if dir.is_empty() { "." } else { dir };
            let candidate = format!("{}/{}", dir, name);
            if let Ok(meta) = std::fs::metadata(&candidate) {
                if meta.is_file()
                    && nix::unistd::access(
                        candidate.as_str(),
                        nix::unistd::AccessFlags::X_OK,
                    )
                    .is_ok()
                {
                    if self.state.options.hashcmds {
                        self.state
                            .hashed_commands
                            .insert(name.to_string(), candidate.clone());
                    }
                    return Some(candidate);
                }
            }
        }
        None
    }

    pub fn exec_external(
        &mut self,
        name: &str,
        args: &[String],
        plans: &[RedirPlan],
        _ctx: ExecContext,
    ) -> Result<i32, ExecError> {
        let path = match self.find_in_path(name) {
            Some(path) => path,
            None => {
                write_stderr(&format!(
                    "{}: {}: command not found\n",
                    self.state.script_name, name
                ));
                return Ok(127);
            }
        };

        // Inside a pipeline stage or other fork, exec in place.
        if self.state.in_forked_child {
            if let Err(err) = apply_plans(plans) {
                write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                self.child_exit(1);
            }
            let status = self.exec_image(&path, name, args);
            self.child_exit(status);
        }

        let job_control = self.jobs.job_control;
        match unsafe { fork_flushed() } {
            Ok(ForkResult::Child) => {
                apply_child_signal_policy(ChildKind::Leaf);
                if job_control {
                    let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
                }
                if let Err(err) = apply_plans(plans) {
                    write_stderr(&format!("{}: {}\n", self.state.script_name, err));
                    unsafe { libc::_exit(1) }
                }
                let status = self.exec_image(&path, name, args);
                unsafe { libc::_exit(status) }
            }
            Ok(ForkResult::Parent { child }) => {
                let pid = child.as_raw();
                if job_control {
                    let _ = setpgid(child, child);
                }
                let description = std::iter::once(name.to_string())
                    .chain(args.iter().cloned())
                    .collect::<Vec<_>>()
                    .join(" ");
                let id = self.jobs.add_job(pid, vec![pid], description, true);
                self.jobs.give_terminal_to(pid);
                let status = self.jobs.wait_for_job(id);
                self.state.pipe_status = self.jobs.last_pipe_statuses.clone();
                Ok(status)
            }
            Err(e) => Err(ExecError::expansion(format!("fork failed: {}", e))),
        }
    }

    /// Replace this process image; returns an exit status only on failure.
    pub fn exec_image(&mut self, path: &str, name: &str, args: &[String]) -> i32 {
        let c_path = match CString::new(path) {
            Ok(c) => c,
            Err(_) => return 127,
        };
        let mut argv: Vec<CString> = Vec::with_capacity(args.len() + 1);
        argv.push(CString::new(name).unwrap_or_default());
        for arg in args {
            match CString::new(arg.as_str()) {
                Ok(c) => argv.push(c),
                Err(_) => return 127,
            }
        }
        let env: Vec<CString> = self
            .state
            .scopes
            .exported_env()
            .into_iter()
            .filter_map(|(k, v)| CString::new(format!("{}={}", k, v)).ok())
            .collect();

        match execve(&c_path, &argv, &env) {
            Ok(_) => unreachable!("execve returned success"),
            Err(nix::errno::Errno::EACCES) => {
                write_stderr(&format!(
                    "{}: {}: permission denied\n",
                    self.state.script_name, name
                ));
                126
            }
            Err(nix::errno::Errno::ENOENT) => {
                write_stderr(&format!(
                    "{}: {}: no such file or directory\n",
                    self.state.script_name, name
                ));
                127
            }
            Err(err) => {
                write_stderr(&format!("{}: {}: {}\n", self.state.script_name, name, err));
                126
            }
        }
    }
}

/// The script's single simple command, when that is its whole shape.
fn single_simple_command(
    script: &crate::ast::types::ScriptNode,
) -> Option<SimpleCommandNode> {
    if script.statements.len() != 1 {
        return None;
    }
    let statement = &script.statements[0];
    if statement.pipelines.len() != 1 || statement.background {
        return None;
    }
    let pipeline = &statement.pipelines[0];
    if pipeline.commands.len() != 1 || pipeline.negated {
        return None;
    }
    match &pipeline.commands[0] {
        crate::ast::types::CommandNode::Simple(simple) => Some(simple.clone()),
        _ => None,
    }
}
