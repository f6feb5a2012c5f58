//! unset - remove variables or functions
//!
//! unset [-v] [-f] name...
//!
//! Readonly variables refuse; inside a function an unset of an outer
//! binding leaves a tombstone so the name stays hidden until return.

use crate::core::errors::ExecError;
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_unset(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let mut functions = false;
    let mut names = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-f" => functions = true,
            "-v" => functions = false,
            _ => names.push(arg.clone()),
        }
    }

    let mut status = 0;
    for name in names {
        if functions {
            shell.state.functions.remove(&name);
            continue;
        }
        // name[subscript] removes one element.
        if let Some(open) = name.find('[') {
            if name.ends_with(']') {
                let var_name = name[..open].to_string();
                let sub = name[open + 1..name.len() - 1].to_string();
                if let Err(err) = unset_element(shell, &var_name, &sub) {
                    write_stderr(&format!("{}: unset: {}\n", shell.state.script_name, err));
                    status = 1;
                }
                continue;
            }
        }
        if let Err(err) = shell.state.scopes.unset(&name) {
            write_stderr(&format!("{}: unset: {}\n", shell.state.script_name, err));
            status = 1;
        }
    }
    Ok(status)
}

fn unset_element(shell: &mut Shell, name: &str, sub: &str) -> Result<(), ExecError> {
    use crate::core::variables::VarValue;
    let is_assoc = matches!(
        shell.state.scopes.get(name).map(|v| &v.value),
        Some(VarValue::Assoc(_))
    );
    if is_assoc {
        if let Some(var) = shell.state.scopes.get_mut(name) {
            if let VarValue::Assoc(map) = &mut var.value {
                map.shift_remove(sub);
            }
        }
        return Ok(());
    }
    let index = crate::arith::eval_arith_string(&mut shell.state, sub)?;
    if let Some(var) = shell.state.scopes.get_mut(name) {
        if let VarValue::Indexed(map) = &mut var.value {
            map.remove(&index);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_removes_global() {
        let mut shell = Shell::new();
        shell.state.scopes.set_scalar("x", "1", false).unwrap();
        handle_unset(&mut shell, &["x".to_string()]).unwrap();
        assert!(shell.state.scopes.get("x").is_none());
    }

    #[test]
    fn unset_readonly_fails() {
        let mut shell = Shell::new();
        shell.state.scopes.set_scalar("x", "1", false).unwrap();
        shell
            .state
            .scopes
            .apply_attrs(
                "x",
                crate::core::variables::VarAttrs {
                    readonly: true,
                    ..Default::default()
                },
                false,
            )
            .unwrap();
        assert_eq!(handle_unset(&mut shell, &["x".to_string()]).unwrap(), 1);
        assert!(shell.state.scopes.get("x").is_some());
    }

    #[test]
    fn unset_array_element() {
        let mut shell = Shell::new();
        shell.state.scopes.set_index("a", 0, "x").unwrap();
        shell.state.scopes.set_index("a", 1, "y").unwrap();
        handle_unset(&mut shell, &["a[0]".to_string()]).unwrap();
        let var = shell.state.scopes.get("a").unwrap();
        assert_eq!(var.index_get(0), None);
        assert_eq!(var.index_get(1), Some("y".to_string()));
    }

    #[test]
    fn unset_function() {
        let mut shell = Shell::new();
        let script = crate::parser::parse("f() { :; }").unwrap();
        shell
            .exec_script(&script, crate::exec::context::ExecContext::default())
            .unwrap();
        assert!(shell.state.functions.contains_key("f"));
        handle_unset(&mut shell, &["-f".to_string(), "f".to_string()]).unwrap();
        assert!(!shell.state.functions.contains_key("f"));
    }
}
