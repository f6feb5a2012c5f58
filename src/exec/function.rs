//! Function Invocation
//!
//! A call pushes a scope named for the function, swaps the positional
//! parameters for the call arguments, and consumes the `return` escape at
//! the call boundary. Locals (and tombstones from `unset`) die with the
//! scope on exit.

use crate::ast::types::FunctionDefNode;
use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::exec::redirect;
use crate::shell::Shell;

const MAX_FUNCTION_DEPTH: u32 = 1000;

impl Shell {
    pub fn call_function(
        &mut self,
        def: &FunctionDefNode,
        args: &[String],
        ctx: ExecContext,
    ) -> Result<i32, ExecError> {
        if ctx.function_depth >= MAX_FUNCTION_DEPTH {
            return Err(ExecError::expansion(format!(
                "{}: maximum function nesting exceeded",
                def.name
            )));
        }

        let plans = redirect::plan_redirections(self, &def.redirections)?;
        let saved_fds = if plans.is_empty() {
            None
        } else {
            Some(redirect::apply_plans_with_save(&plans)?)
        };

        // Swap in the call frame.
        let saved_positional = std::mem::replace(&mut self.state.positional, args.to_vec());
        self.state.scopes.push_scope(&def.name);
        self.state.func_stack.insert(0, def.name.clone());

        let result = self.exec_compound(&def.body, ctx.in_function());

        // Tear the frame down in reverse order.
        self.state.func_stack.remove(0);
        self.state.scopes.pop_scope();
        self.state.positional = saved_positional;
        if let Some(saved) = saved_fds {
            saved.restore();
        }

        match result {
            Ok(status) => Ok(status),
            Err(ExecError::Return(code)) => Ok(code),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn shell_with(source: &str) -> Shell {
        let mut shell = Shell::new();
        let script = parse(source).unwrap();
        shell
            .exec_script(&script, ExecContext::default())
            .unwrap();
        shell
    }

    #[test]
    fn locals_do_not_leak() {
        let shell = shell_with("f() { local x=inner; }; x=outer; f");
        assert_eq!(shell.state.scopes.get_string("x"), Some("outer".into()));
    }

    #[test]
    fn return_status_propagates() {
        let shell = shell_with("f() { return 7; }; f");
        assert_eq!(shell.state.last_exit_code, 7);
    }

    #[test]
    fn positional_params_restored() {
        let mut shell = Shell::new();
        shell.state.positional = vec!["outer1".into(), "outer2".into()];
        let script = parse("f() { :; }; f inner").unwrap();
        shell.exec_script(&script, ExecContext::default()).unwrap();
        assert_eq!(shell.state.positional, vec!["outer1", "outer2"]);
    }

    #[test]
    fn function_args_visible_inside() {
        let shell = shell_with("f() { captured=$1; }; f hello");
        assert_eq!(
            shell.state.scopes.get_string("captured"),
            Some("hello".into())
        );
    }

    #[test]
    fn dynamic_scoping_reads_caller_locals() {
        let shell = shell_with("outer() { local v=seen; inner; }; inner() { got=$v; }; outer");
        assert_eq!(shell.state.scopes.get_string("got"), Some("seen".into()));
    }

    #[test]
    fn unset_tombstone_hides_global_until_exit() {
        let shell = shell_with("x=global; f() { unset x; probe=${x:-hidden}; }; f");
        assert_eq!(shell.state.scopes.get_string("probe"), Some("hidden".into()));
        assert_eq!(shell.state.scopes.get_string("x"), Some("global".into()));
    }
}
