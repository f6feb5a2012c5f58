//! `:` / `true` — do nothing, successfully.

use crate::core::errors::ExecError;
use crate::shell::Shell;

pub fn handle_colon(_shell: &mut Shell, _args: &[String]) -> Result<i32, ExecError> {
    Ok(0)
}
