//! alias / unalias

use crate::core::errors::ExecError;
use crate::exec::{write_stderr, write_stdout};
use crate::shell::Shell;

pub fn handle_alias(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    if args.is_empty() {
        for (name, value) in &shell.state.aliases {
            write_stdout(&format!("alias {}='{}'\n", name, value.replace('\'', "'\\''")));
        }
        return Ok(0);
    }
    let mut status = 0;
    for arg in args {
        match arg.find('=') {
            Some(eq) => {
                let name = arg[..eq].to_string();
                let value = arg[eq + 1..].to_string();
                shell.state.aliases.insert(name, value);
            }
            None => match shell.state.aliases.get(arg) {
                Some(value) => {
                    write_stdout(&format!("alias {}='{}'\n", arg, value.replace('\'', "'\\''")))
                }
                None => {
                    write_stderr(&format!(
                        "{}: alias: {}: not found\n",
                        shell.state.script_name, arg
                    ));
                    status = 1;
                }
            },
        }
    }
    Ok(status)
}

pub fn handle_unalias(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    if args.first().map(|a| a.as_str()) == Some("-a") {
        shell.state.aliases.clear();
        return Ok(0);
    }
    let mut status = 0;
    for name in args {
        if shell.state.aliases.shift_remove(name).is_none() {
            write_stderr(&format!(
                "{}: unalias: {}: not found\n",
                shell.state.script_name, name
            ));
            status = 1;
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_query_remove() {
        let mut shell = Shell::new();
        handle_alias(&mut shell, &["ll=ls -l".to_string()]).unwrap();
        assert_eq!(
            shell.state.aliases.get("ll"),
            Some(&"ls -l".to_string())
        );
        assert_eq!(handle_alias(&mut shell, &["ll".to_string()]).unwrap(), 0);
        assert_eq!(handle_unalias(&mut shell, &["ll".to_string()]).unwrap(), 0);
        assert_eq!(handle_alias(&mut shell, &["ll".to_string()]).unwrap(), 1);
    }

    #[test]
    fn unalias_all() {
        let mut shell = Shell::new();
        handle_alias(&mut shell, &["a=1".to_string(), "b=2".to_string()]).unwrap();
        handle_unalias(&mut shell, &["-a".to_string()]).unwrap();
        assert!(shell.state.aliases.is_empty());
    }
}
