//! cd / pwd - working directory
//!
//! cd [-L|-P] [dir | -]
//!
//! `cd -` swaps to $OLDPWD and prints it. PWD and OLDPWD track every
//! change.

use crate::core::errors::ExecError;
use crate::core::variables::VarAttrs;
use crate::exec::{write_stderr, write_stdout};
use crate::shell::Shell;

pub fn handle_cd(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let mut physical = false;
    let mut target: Option<String> = None;
    for arg in args {
        match arg.as_str() {
            "-P" => physical = true,
            "-L" => physical = false,
            _ => {
                target = Some(arg.clone());
                break;
            }
        }
    }

    let mut print_after = false;
    let destination = match target.as_deref() {
        None => match shell.state.scopes.get_string("HOME") {
            Some(home) if !home.is_empty() => home,
            _ => {
                write_stderr(&format!("{}: cd: HOME not set\n", shell.state.script_name));
                return Ok(1);
            }
        },
        Some("-") => match shell.state.scopes.get_string("OLDPWD") {
            Some(oldpwd) if !oldpwd.is_empty() => {
                print_after = true;
                oldpwd
            }
            _ => {
                write_stderr(&format!("{}: cd: OLDPWD not set\n", shell.state.script_name));
                return Ok(1);
            }
        },
        Some(dir) => dir.to_string(),
    };

    let old = std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Err(err) = std::env::set_current_dir(&destination) {
        write_stderr(&format!(
            "{}: cd: {}: {}\n",
            shell.state.script_name, destination, err
        ));
        return Ok(1);
    }

    let new = if physical {
        std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or(destination.clone())
    } else {
        logical_path(&old, &destination)
    };

    let exported = VarAttrs {
        exported: true,
        ..Default::default()
    };
    shell.state.scopes.set_scalar("OLDPWD", old, false)?;
    shell.state.scopes.apply_attrs("OLDPWD", exported, false)?;
    shell.state.scopes.set_scalar("PWD", new.clone(), false)?;
    shell.state.scopes.apply_attrs("PWD", exported, false)?;

    if print_after {
        write_stdout(&format!("{}\n", new));
    }
    Ok(0)
}

pub fn handle_pwd(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    let physical = args.iter().any(|a| a == "-P");
    let path = if physical {
        std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        shell
            .state
            .scopes
            .get_string("PWD")
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| {
                std::env::current_dir()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
    };
    write_stdout(&format!("{}\n", path));
    Ok(0)
}

/// Resolve `.` and `..` textually against the old logical path.
fn logical_path(old: &str, destination: &str) -> String {
    let base = if destination.starts_with('/') {
        String::new()
    } else {
        old.to_string()
    };
    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for piece in destination.split('/') {
        match piece {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(piece),
        }
    }
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_path_resolution() {
        assert_eq!(logical_path("/a/b", "c"), "/a/b/c");
        assert_eq!(logical_path("/a/b", ".."), "/a");
        assert_eq!(logical_path("/a/b", "../c/./d"), "/a/c/d");
        assert_eq!(logical_path("/a/b", "/x/y"), "/x/y");
    }

    #[test]
    fn cd_updates_pwd_and_oldpwd() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new();
        let before = std::env::current_dir().unwrap();
        handle_cd(&mut shell, &[dir.path().to_str().unwrap().to_string()]).unwrap();
        assert_eq!(
            shell.state.scopes.get_string("OLDPWD"),
            Some(before.to_string_lossy().into_owned())
        );
        // Return for other tests.
        std::env::set_current_dir(before).unwrap();
    }

    #[test]
    fn cd_to_missing_directory_fails() {
        let mut shell = Shell::new();
        assert_eq!(
            handle_cd(&mut shell, &["/no/such/dir-zzz".to_string()]).unwrap(),
            1
        );
    }
}
