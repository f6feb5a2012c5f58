//! Error and Control-Flow Taxonomy
//!
//! The executor's visit methods return `Result<i32, ExecError>`. Control
//! flow (`break`, `continue`, `return`, `exit`) travels through the same
//! channel as real errors; loops and function bodies catch and consume the
//! variants addressed to them, everything else propagates.

use thiserror::Error;

/// Arithmetic evaluation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithError {
    #[error("division by 0")]
    DivideByZero,
    #[error("invalid arithmetic base (error token is \"{0}\")")]
    BadBase(String),
    #[error("value too great for base (error token is \"{0}\")")]
    BadDigit(String),
    #[error("exponent less than 0")]
    NegativeExponent,
    #[error("exponent too large")]
    ExponentTooLarge,
    #[error("expression recursion level exceeded")]
    TooDeep,
    #[error("syntax error in expression (error token is \"{0}\")")]
    Syntax(String),
    #[error("attempted assignment to non-variable (error token is \"{0}\")")]
    BadAssignment(String),
}

/// Everything that can escape from an executing AST node.
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    // ---- control flow (not errors) ----
    #[error("break")]
    Break(u32),
    #[error("continue")]
    Continue(u32),
    #[error("return")]
    Return(i32),
    #[error("exit")]
    Exit(i32),

    // ---- errors ----
    #[error("{message}")]
    Expansion { message: String, code: i32 },
    #[error(transparent)]
    Arith(#[from] ArithError),
    #[error("{0}: readonly variable")]
    Readonly(String),
    #[error("{0}: unbound variable")]
    Unbound(String),
    #[error("{0}")]
    Redirect(String),
    #[error("{0}: command not found")]
    CommandNotFound(String),
    #[error("{0}")]
    Syntax(String),
    /// A special builtin failed while `set -o posix` is active; the whole
    /// script exits.
    #[error("fatal builtin error")]
    PosixFatal(i32),
}

impl ExecError {
    pub fn expansion(message: impl Into<String>) -> Self {
        ExecError::Expansion {
            message: message.into(),
            code: 1,
        }
    }

    /// True for the loop/function escapes that a legal nest consumes.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            ExecError::Break(_) | ExecError::Continue(_) | ExecError::Return(_)
        )
    }

    /// The exit status this error produces when it surfaces.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::Break(_) | ExecError::Continue(_) => 0,
            ExecError::Return(code) | ExecError::Exit(code) => *code,
            ExecError::Expansion { code, .. } => *code,
            ExecError::Arith(_) => 1,
            ExecError::Readonly(_) => 1,
            ExecError::Unbound(_) => 1,
            ExecError::Redirect(_) => 1,
            ExecError::CommandNotFound(_) => 127,
            ExecError::Syntax(_) => 2,
            ExecError::PosixFatal(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_flow_classification() {
        assert!(ExecError::Break(1).is_control_flow());
        assert!(ExecError::Continue(2).is_control_flow());
        assert!(ExecError::Return(0).is_control_flow());
        assert!(!ExecError::Exit(0).is_control_flow());
        assert!(!ExecError::expansion("x").is_control_flow());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(ExecError::CommandNotFound("x".into()).exit_code(), 127);
        assert_eq!(ExecError::Syntax("x".into()).exit_code(), 2);
        assert_eq!(ExecError::Exit(42).exit_code(), 42);
        assert_eq!(ExecError::Arith(ArithError::DivideByZero).exit_code(), 1);
    }
}
