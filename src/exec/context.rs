//! Execution Context
//!
//! A small copy-on-derive struct threaded through the executor's visit
//! methods. Structural constructs derive a child context instead of
//! mutating shared state.

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecContext {
    /// Running inside a pipeline stage child.
    pub in_pipeline: bool,
    /// Running inside a subshell fork.
    pub in_subshell: bool,
    /// Condition position of if/while/until or an &&/|| antecedent:
    /// errexit and the ERR trap do not fire here.
    pub in_condition: bool,
    /// Loop nesting for break/continue level checks.
    pub loop_depth: u32,
    /// Function call nesting.
    pub function_depth: u32,
}

impl ExecContext {
    pub fn in_condition(self) -> Self {
        ExecContext {
            in_condition: true,
            ..self
        }
    }

    pub fn in_loop(self) -> Self {
        ExecContext {
            loop_depth: self.loop_depth + 1,
            ..self
        }
    }

    pub fn in_function(self) -> Self {
        ExecContext {
            function_depth: self.function_depth + 1,
            ..self
        }
    }

    pub fn in_subshell(self) -> Self {
        ExecContext {
            in_subshell: true,
            // break/continue cannot cross a subshell boundary.
            loop_depth: 0,
            ..self
        }
    }

    pub fn in_pipeline(self) -> Self {
        ExecContext {
            in_pipeline: true,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_does_not_mutate_parent() {
        let parent = ExecContext::default();
        let child = parent.in_loop().in_condition();
        assert_eq!(parent.loop_depth, 0);
        assert!(!parent.in_condition);
        assert_eq!(child.loop_depth, 1);
        assert!(child.in_condition);
    }

    #[test]
    fn subshell_resets_loop_depth() {
        let ctx = ExecContext::default().in_loop().in_loop().in_subshell();
        assert_eq!(ctx.loop_depth, 0);
        assert!(ctx.in_subshell);
    }
}
