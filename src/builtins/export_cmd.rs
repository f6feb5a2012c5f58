//! export / readonly - attribute management
//!
//! export [-n] [name[=value]...] / readonly [name[=value]...]
//! Both list with -p (or no arguments).

use crate::core::errors::ExecError;
use crate::core::variables::{is_valid_name, VarAttrs};
use crate::exec::{write_stderr, write_stdout};
use crate::shell::Shell;

pub fn handle_export(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let mut unexport = false;
    let mut names = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-n" => unexport = true,
            "-p" => {}
            _ => names.push(arg.clone()),
        }
    }

    if names.is_empty() {
        let mut entries: Vec<(String, String)> = shell
            .state
            .scopes
            .exported_env()
            .into_iter()
            .collect();
        entries.sort();
        for (name, value) in entries {
            write_stdout(&format!("declare -x {}=\"{}\"\n", name, value));
        }
        return Ok(0);
    }

    let mut status = 0;
    for spec in names {
        let (name, value) = split_name_value(&spec);
        if !is_valid_name(&name) {
            write_stderr(&format!(
                "{}: export: `{}': not a valid identifier\n",
                shell.state.script_name, spec
            ));
            status = 1;
            continue;
        }
        if let Some(value) = value {
            shell.state.scopes.set_scalar(&name, value, false)?;
        }
        if unexport {
            if let Some(var) = shell.state.scopes.get_mut(&name) {
                var.attrs.exported = false;
            }
        } else {
            shell.state.scopes.apply_attrs(
                &name,
                VarAttrs {
                    exported: true,
                    ..Default::default()
                },
                false,
            )?;
        }
    }
    Ok(status)
}

pub fn handle_readonly(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let names: Vec<String> = args.iter().filter(|a| *a != "-p").cloned().collect();

    if names.is_empty() {
        let mut entries: Vec<(String, String)> = shell
            .state
            .scopes
            .visible()
            .into_iter()
            .filter(|(_, var)| var.attrs.readonly)
            .map(|(name, var)| (name, var.as_string()))
            .collect();
        entries.sort();
        for (name, value) in entries {
            write_stdout(&format!("declare -r {}=\"{}\"\n", name, value));
        }
        return Ok(0);
    }

    let mut status = 0;
    for spec in names {
        let (name, value) = split_name_value(&spec);
        if !is_valid_name(&name) {
            write_stderr(&format!(
                "{}: readonly: `{}': not a valid identifier\n",
                shell.state.script_name, spec
            ));
            status = 1;
            continue;
        }
        if let Some(value) = value {
            // The assignment happens before the attribute locks it.
            shell.state.scopes.set_scalar(&name, value, false)?;
        }
        shell.state.scopes.apply_attrs(
            &name,
            VarAttrs {
                readonly: true,
                ..Default::default()
            },
            false,
        )?;
    }
    Ok(status)
}

pub fn split_name_value(spec: &str) -> (String, Option<String>) {
    match spec.find('=') {
        Some(eq) => (spec[..eq].to_string(), Some(spec[eq + 1..].to_string())),
        None => (spec.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_marks_and_assigns() {
        let mut shell = Shell::new();
        handle_export(&mut shell, &["FOO=bar".to_string()]).unwrap();
        let env = shell.state.scopes.exported_env();
        assert!(env.contains(&("FOO".to_string(), "bar".to_string())));
    }

    #[test]
    fn export_n_removes_export() {
        let mut shell = Shell::new();
        handle_export(&mut shell, &["FOO=bar".to_string()]).unwrap();
        handle_export(&mut shell, &["-n".to_string(), "FOO".to_string()]).unwrap();
        assert!(!shell
            .state
            .scopes
            .exported_env()
            .iter()
            .any(|(n, _)| n == "FOO"));
        // The value survives.
        assert_eq!(shell.state.scopes.get_string("FOO"), Some("bar".into()));
    }

    #[test]
    fn readonly_locks_variable() {
        let mut shell = Shell::new();
        handle_readonly(&mut shell, &["LOCKED=v".to_string()]).unwrap();
        assert!(shell.state.scopes.set_scalar("LOCKED", "w", false).is_err());
    }

    #[test]
    fn invalid_identifier_rejected() {
        let mut shell = Shell::new();
        assert_eq!(
            handle_export(&mut shell, &["1bad=x".to_string()]).unwrap(),
            1
        );
    }
}
