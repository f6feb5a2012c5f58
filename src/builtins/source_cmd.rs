//! source / . - run a file in the current shell
//!
//! source file [args...]
//!
//! Positional parameters are swapped for the call when arguments are
//! given; `return` unwinds to the end of the sourced file.

use crate::core::errors::ExecError;
use crate::exec::context::ExecContext;
use crate::exec::write_stderr;
use crate::shell::Shell;

pub fn handle_source(
    shell: &mut Shell,
    args: &[String],
    ctx: ExecContext,
) -> Result<i32, ExecError> {
    let path = match args.first() {
        Some(path) => path.clone(),
        None => {
            write_stderr(&format!(
                "{}: source: filename argument required\n",
                shell.state.script_name
            ));
            return Ok(2);
        }
    };

    let resolved = resolve_source_path(shell, &path);
    let source = match resolved.and_then(|p| std::fs::read_to_string(p).ok()) {
        Some(source) => source,
        None => {
            write_stderr(&format!(
                "{}: source: {}: unable to read file\n",
                shell.state.script_name, path
            ));
            if shell.state.options.posix {
                return Err(ExecError::PosixFatal(1));
            }
            return Ok(1);
        }
    };

    let script = match crate::parser::parse(&source) {
        Ok(script) => script,
        Err(err) => {
            write_stderr(&format!(
                "{}: source: {}: {}\n",
                shell.state.script_name, path, err
            ));
            return Ok(2);
        }
    };

    let replace_positional = args.len() > 1;
    let saved_positional = if replace_positional {
        Some(std::mem::replace(
            &mut shell.state.positional,
            args[1..].to_vec(),
        ))
    } else {
        None
    };
    shell.state.source_depth += 1;

    let result = shell.exec_script(&script, ctx);

    shell.state.source_depth -= 1;
    if let Some(saved) = saved_positional {
        shell.state.positional = saved;
    }

    match result {
        Ok(status) => Ok(status),
        Err(ExecError::Return(code)) => Ok(code),
        Err(err) => Err(err),
    }
}

/// POSIX searches PATH for a relative name without a slash, then falls
/// back to the working directory.
fn resolve_source_path(shell: &Shell, path: &str) -> Option<String> {
    if path.contains('/') {
        return Some(path.to_string());
    }
    let search = shell.state.scopes.get_string("PATH").unwrap_or_default();
    for dir in search.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = format!("{}/{}", dir, path);
        if std::fs::metadata(&candidate).map(|m| m.is_file()).unwrap_or(false) {
            return Some(candidate);
        }
    }
    Some(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn source_runs_in_current_shell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.sh");
        writeln!(std::fs::File::create(&path).unwrap(), "sourced_var=yes").unwrap();

        let mut shell = Shell::new();
        let status = handle_source(
            &mut shell,
            &[path.to_str().unwrap().to_string()],
            ExecContext::default(),
        )
        .unwrap();
        assert_eq!(status, 0);
        assert_eq!(
            shell.state.scopes.get_string("sourced_var"),
            Some("yes".to_string())
        );
    }

    #[test]
    fn source_swaps_positional_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.sh");
        writeln!(std::fs::File::create(&path).unwrap(), "seen=$1").unwrap();

        let mut shell = Shell::new();
        shell.state.positional = vec!["outer".to_string()];
        handle_source(
            &mut shell,
            &[path.to_str().unwrap().to_string(), "inner".to_string()],
            ExecContext::default(),
        )
        .unwrap();
        assert_eq!(
            shell.state.scopes.get_string("seen"),
            Some("inner".to_string())
        );
        assert_eq!(shell.state.positional, vec!["outer"]);
    }

    #[test]
    fn source_return_stops_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ret.sh");
        writeln!(
            std::fs::File::create(&path).unwrap(),
            "before=1\nreturn 5\nafter=1"
        )
        .unwrap();

        let mut shell = Shell::new();
        let status = handle_source(
            &mut shell,
            &[path.to_str().unwrap().to_string()],
            ExecContext::default(),
        )
        .unwrap();
        assert_eq!(status, 5);
        assert!(shell.state.scopes.get("before").is_some());
        assert!(shell.state.scopes.get("after").is_none());
    }

    #[test]
    fn missing_file_is_status_1() {
        let mut shell = Shell::new();
        let status = handle_source(
            &mut shell,
            &["/no/such/file.sh".to_string()],
            ExecContext::default(),
        )
        .unwrap();
        assert_eq!(status, 1);
    }
}
