//! Core shell state: variables, scopes, options, errors.

pub mod errors;
pub mod options;
pub mod scope;
pub mod state;
pub mod variables;

pub use errors::{ArithError, ExecError};
pub use options::{ShellOptions, ShoptOptions};
pub use scope::ScopeManager;
pub use state::ShellState;
pub use variables::{VarAttrs, VarValue, Variable};
