//! declare / typeset / local - attribute management and declarations
//!
//! declare [-aAilnrtux] [+...] [-p] [-f|-F] [name[=value]...]
//!
//! Inside a function, declare and local create bindings in the current
//! scope (bash dynamic scoping); at top level declare writes globals.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::ast::types::{ArrayElementNode, WordNode};
use crate::core::errors::ExecError;
use crate::core::variables::{is_valid_name, VarAttrs, VarValue, Variable};
use crate::exec::{write_stderr, write_stdout};
use crate::parser::word_parser::{parse_array_elements, split_assignment};
use crate::shell::Shell;

#[derive(Default)]
struct DeclareFlags {
    attrs: VarAttrs,
    clear_attrs: VarAttrs,
    indexed: bool,
    assoc: bool,
    print: bool,
    functions: bool,
    function_names: bool,
}

pub fn handle_local(shell: &mut Shell, args: &[String]) -> Result<i32, ExecError> {
    if !shell.state.scopes.in_function() {
        write_stderr(&format!(
            "{}: local: can only be used in a function\n",
            shell.state.script_name
        ));
        return Ok(1);
    }
    handle_declare(shell, args, true)
}

pub fn handle_declare(shell: &mut Shell, args: &[String], force_local: bool) -> Result<i32, ExecError> {
    let mut flags = DeclareFlags::default();
    let mut names = Vec::new();

    for arg in args {
        if let Some(rest) = arg.strip_prefix('-') {
            if !rest.is_empty() && parse_flag_letters(rest, &mut flags, true) {
                continue;
            }
        }
        if let Some(rest) = arg.strip_prefix('+') {
            if !rest.is_empty() && parse_flag_letters(rest, &mut flags, false) {
                continue;
            }
        }
        names.push(arg.clone());
    }

    // Function listing modes.
    if flags.functions || flags.function_names {
        let mut listed: Vec<&String> = shell.state.functions.keys().collect();
        listed.sort();
        for name in listed {
            if names.is_empty() || names.contains(name) {
                if flags.function_names {
                    write_stdout(&format!("declare -f {}\n", name));
                } else {
                    write_stdout(&format!("{} () ...\n", name));
                }
            }
        }
        return Ok(0);
    }

    let local = force_local || shell.state.scopes.in_function();

    if names.is_empty() {
        print_all(shell, &flags);
        return Ok(0);
    }

    let mut status = 0;
    for spec in names {
        if let Err(err) = declare_one(shell, &spec, &flags, local) {
            if matches!(err, ExecError::Readonly(_)) {
                write_stderr(&format!("{}: declare: {}\n", shell.state.script_name, err));
                status = 1;
                continue;
            }
            return Err(err);
        }
    }
    Ok(status)
}

fn parse_flag_letters(letters: &str, flags: &mut DeclareFlags, enable: bool) -> bool {
    let mut parsed = DeclareFlags::default();
    for c in letters.chars() {
        match c {
            'a' => parsed.indexed = true,
            'A' => parsed.assoc = true,
            'i' => parsed.attrs.integer = true,
            'l' => parsed.attrs.lowercase = true,
            'n' => parsed.attrs.nameref = true,
            'r' => parsed.attrs.readonly = true,
            't' => parsed.attrs.trace = true,
            'u' => parsed.attrs.uppercase = true,
            'x' => parsed.attrs.exported = true,
            'p' => parsed.print = true,
            'f' => parsed.functions = true,
            'F' => parsed.function_names = true,
            'g' => {}
            _ => return false,
        }
    }
    if enable {
        flags.attrs.merge(parsed.attrs);
        flags.indexed |= parsed.indexed;
        flags.assoc |= parsed.assoc;
        flags.print |= parsed.print;
        flags.functions |= parsed.functions;
        flags.function_names |= parsed.function_names;
    } else {
        flags.clear_attrs.merge(parsed.attrs);
    }
    true
}

fn declare_one(
    shell: &mut Shell,
    spec: &str,
    flags: &DeclareFlags,
    local: bool,
) -> Result<(), ExecError> {
    if flags.print {
        print_one(shell, spec);
        return Ok(());
    }

    let (name, subscript, append, value_text) = match split_assignment(spec) {
        Some(parts) => {
            let (name, sub, append, value) = parts;
            (name, sub, append, Some(value))
        }
        None => (spec.to_string(), None, false, None),
    };

    if !is_valid_name(&name) {
        write_stderr(&format!(
            "{}: declare: `{}': not a valid identifier\n",
            shell.state.script_name, spec
        ));
        return Ok(());
    }

    // Create the right shape first.
    if flags.assoc && shell.state.scopes.get(&name).is_none() {
        shell.state.scopes.set_var(
            &name,
            Variable {
                value: VarValue::Assoc(IndexMap::new()),
                attrs: flags.attrs,
            },
            local,
        )?;
    } else if flags.indexed && shell.state.scopes.get(&name).is_none() {
        shell.state.scopes.set_var(
            &name,
            Variable {
                value: VarValue::Indexed(BTreeMap::new()),
                attrs: flags.attrs,
            },
            local,
        )?;
    } else if local && shell.state.scopes.get(&name).is_none() {
        shell.state.scopes.set_var(
            &name,
            Variable {
                value: VarValue::Scalar(String::new()),
                attrs: flags.attrs,
            },
            true,
        )?;
    } else {
        shell.state.scopes.apply_attrs(&name, flags.attrs, local)?;
    }

    // Clear the + attributes.
    if flags.clear_attrs != VarAttrs::default() {
        if let Some(var) = shell.state.scopes.get_mut(&name) {
            let clear = flags.clear_attrs;
            if clear.exported {
                var.attrs.exported = false;
            }
            if clear.integer {
                var.attrs.integer = false;
            }
            if clear.lowercase {
                var.attrs.lowercase = false;
            }
            if clear.uppercase {
                var.attrs.uppercase = false;
            }
            if clear.nameref {
                var.attrs.nameref = false;
            }
            if clear.trace {
                var.attrs.trace = false;
            }
        }
    }

    // Assign the value if one was given. The argument was expanded on the
    // way in, so everything here is literal text.
    if let Some(value_text) = value_text {
        let is_array = value_text.starts_with('(') && value_text.ends_with(')');
        let node = crate::ast::types::AssignmentNode {
            name: name.clone(),
            subscript: subscript.map(WordNode::literal),
            value: if is_array {
                None
            } else {
                Some(WordNode::literal(value_text.clone()))
            },
            append,
            array: if is_array {
                Some(literal_array_elements(
                    &value_text[1..value_text.len() - 1],
                )?)
            } else {
                None
            },
        };
        shell.apply_assignment(&node, false)?;
    }
    Ok(())
}

/// Split an already-expanded `(...)` literal into element nodes, honoring
/// `[key]=value` sub-forms, without re-running any expansions.
fn literal_array_elements(inner: &str) -> Result<Vec<ArrayElementNode>, ExecError> {
    let parsed =
        parse_array_elements(inner).map_err(|e| ExecError::Syntax(e.to_string()))?;
    Ok(parsed
        .into_iter()
        .map(|element| ArrayElementNode {
            key: element
                .key
                .map(|key| WordNode::literal(key.as_literal().unwrap_or_default())),
            value: WordNode::literal(element.value.as_literal().unwrap_or_else(|| {
                // Quoted or expanded text inside a declare argument is
                // already literal; flatten whatever parts remain.
                flatten_parts(&element.value)
            })),
        })
        .collect())
}

fn flatten_parts(word: &WordNode) -> String {
    use crate::ast::types::WordPart;
    let mut out = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(s) | WordPart::SingleQuoted(s) | WordPart::Escaped(s) => {
                out.push_str(s)
            }
            WordPart::DoubleQuoted(inner) => {
                for p in inner {
                    if let WordPart::Literal(s) | WordPart::Escaped(s) = p {
                        out.push_str(s);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn print_all(shell: &Shell, flags: &DeclareFlags) {
    let mut entries: Vec<(String, Variable)> =
        shell.state.scopes.visible().into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, var) in entries {
        if flags.assoc && !matches!(var.value, VarValue::Assoc(_)) {
            continue;
        }
        if flags.indexed && !matches!(var.value, VarValue::Indexed(_)) {
            continue;
        }
        write_stdout(&format_declaration(&name, &var));
    }
}

fn print_one(shell: &Shell, name: &str) {
    match shell.state.scopes.get(name) {
        Some(var) => write_stdout(&format_declaration(name, var)),
        None => write_stderr(&format!(
            "{}: declare: {}: not found\n",
            shell.state.script_name, name
        )),
    }
}

fn format_declaration(name: &str, var: &Variable) -> String {
    let flags = var.attrs.flag_string(&var.value);
    match &var.value {
        VarValue::Scalar(s) => format!("declare {} {}=\"{}\"\n", flags, name, s),
        VarValue::Indexed(map) => {
            let body: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("[{}]=\"{}\"", k, v))
                .collect();
            format!("declare {} {}=({})\n", flags, name, body.join(" "))
        }
        VarValue::Assoc(map) => {
            let body: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("[{}]=\"{}\"", k, v))
                .collect();
            format!("declare {} {}=({})\n", flags, name, body.join(" "))
        }
        VarValue::Unset => format!("declare {} {}\n", flags, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_integer_attribute_evaluates() {
        let mut shell = Shell::new();
        handle_declare(&mut shell, &["-i".to_string(), "n=2+3".to_string()], false).unwrap();
        assert_eq!(shell.state.scopes.get_string("n"), Some("5".to_string()));
    }

    #[test]
    fn declare_uppercase_transform() {
        let mut shell = Shell::new();
        handle_declare(&mut shell, &["-u".to_string(), "v=abc".to_string()], false).unwrap();
        assert_eq!(shell.state.scopes.get_string("v"), Some("ABC".to_string()));
    }

    #[test]
    fn declare_assoc_creates_empty_map() {
        let mut shell = Shell::new();
        handle_declare(&mut shell, &["-A".to_string(), "m".to_string()], false).unwrap();
        assert!(matches!(
            shell.state.scopes.get("m").unwrap().value,
            VarValue::Assoc(_)
        ));
    }

    #[test]
    fn declare_array_literal() {
        let mut shell = Shell::new();
        handle_declare(&mut shell, &["-a".to_string(), "arr=(x y z)".to_string()], false)
            .unwrap();
        let var = shell.state.scopes.get("arr").unwrap();
        assert_eq!(var.length(), 3);
        assert_eq!(var.index_get(1), Some("y".to_string()));
    }

    #[test]
    fn plus_x_clears_export() {
        let mut shell = Shell::new();
        handle_declare(&mut shell, &["-x".to_string(), "e=1".to_string()], false).unwrap();
        assert!(shell.state.scopes.get("e").unwrap().attrs.exported);
        handle_declare(&mut shell, &["+x".to_string(), "e".to_string()], false).unwrap();
        assert!(!shell.state.scopes.get("e").unwrap().attrs.exported);
    }

    #[test]
    fn local_outside_function_fails() {
        let mut shell = Shell::new();
        assert_eq!(handle_local(&mut shell, &["x=1".to_string()]).unwrap(), 1);
    }
}
