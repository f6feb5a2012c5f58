//! AST node definitions.

pub mod types;

pub use types::*;
