//! Parameter Expansion
//!
//! `$name`, `${name}` and the whole `${name<op>...}` operator table:
//! defaults, assignment, error-if-unset, alternatives, length, keys,
//! indirection, name-prefix listing, pattern removal and replacement,
//! substrings, and case modification. Operators apply elementwise to
//! `arr[@]` / `arr[*]`; `$@` / `$*` behave as the positional array.

use regex_lite::Regex;

use crate::ast::types::{ParameterOperation, ParameterPart, Subscript, WordNode};
use crate::core::errors::ExecError;
use crate::core::variables::{is_valid_name, VarValue, Variable};
use crate::expansion::pattern::{match_pattern, pattern_to_regex, MatchOptions};
use crate::expansion::words::{expand_word_pattern, expand_word_raw};
use crate::shell::Shell;

/// A parameter's expansion result: one string, or the fields of an
/// `@`/`*`-subscripted array (with the `*` flag controlling quoted joins).
#[derive(Debug, Clone)]
pub enum ParamValue {
    Single(String),
    Fields { values: Vec<String>, star: bool },
}

impl ParamValue {
    pub fn fields(values: Vec<String>, star: bool) -> Self {
        ParamValue::Fields { values, star }
    }

    /// Flat string view; fields join with a space.
    pub fn join(&self, star_sep: &str) -> String {
        match self {
            ParamValue::Single(s) => s.clone(),
            ParamValue::Fields { values, star } => {
                if *star {
                    values.join(star_sep)
                } else {
                    values.join(" ")
                }
            }
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            ParamValue::Single(s) => s.is_empty(),
            ParamValue::Fields { values, .. } => values.iter().all(|v| v.is_empty()) || values.is_empty(),
        }
    }

    fn map(self, f: impl Fn(&str) -> String) -> ParamValue {
        match self {
            ParamValue::Single(s) => ParamValue::Single(f(&s)),
            ParamValue::Fields { values, star } => ParamValue::Fields {
                values: values.iter().map(|v| f(v)).collect(),
                star,
            },
        }
    }
}

struct Resolved {
    exists: bool,
    value: ParamValue,
}

/// Expand a parameter part to its value.
pub fn expand_parameter(shell: &mut Shell, part: &ParameterPart) -> Result<ParamValue, ExecError> {
    // Operators that inspect the name rather than the value.
    match &part.operation {
        Some(ParameterOperation::NamePrefix { star }) => {
            let names = shell.state.scopes.names_with_prefix(&part.name);
            return Ok(ParamValue::fields(names, *star));
        }
        Some(ParameterOperation::Keys { star }) => {
            let keys = match shell.state.scopes.get(&part.name) {
                Some(var) => var.elements().into_iter().map(|(k, _)| k).collect(),
                None => Vec::new(),
            };
            return Ok(ParamValue::fields(keys, *star));
        }
        Some(ParameterOperation::Indirect) => {
            let target = resolve_base(shell, &part.name, &part.subscript)?;
            let target_name = target.value.join(" ");
            return expand_named(shell, &target_name);
        }
        _ => {}
    }

    let resolved = resolve_base(shell, &part.name, &part.subscript)?;

    let handles_unset = matches!(
        part.operation,
        Some(ParameterOperation::Default { .. })
            | Some(ParameterOperation::AssignDefault { .. })
            | Some(ParameterOperation::ErrorIfUnset { .. })
            | Some(ParameterOperation::Alternative { .. })
    );
    if !resolved.exists && !handles_unset {
        nounset_check(shell, &part.name)?;
    }

    let operation = match &part.operation {
        None => return Ok(resolved.value),
        Some(op) => op,
    };

    match operation {
        ParameterOperation::Length => Ok(ParamValue::Single(
            match &resolved.value {
                ParamValue::Single(s) => s.chars().count(),
                ParamValue::Fields { values, .. } => values.len(),
            }
            .to_string(),
        )),

        ParameterOperation::Default { word, check_empty } => {
            if use_fallback(&resolved, *check_empty) {
                Ok(ParamValue::Single(expand_word_raw(shell, word)?))
            } else {
                Ok(resolved.value)
            }
        }

        ParameterOperation::AssignDefault { word, check_empty } => {
            if use_fallback(&resolved, *check_empty) {
                let value = expand_word_raw(shell, word)?;
                if !is_valid_name(&part.name) {
                    return Err(ExecError::expansion(format!(
                        "${{{}}}: cannot assign in this way",
                        part.name
                    )));
                }
                shell.state.scopes.set_scalar(&part.name, value.clone(), false)?;
                Ok(ParamValue::Single(value))
            } else {
                Ok(resolved.value)
            }
        }

        ParameterOperation::ErrorIfUnset { word, check_empty } => {
            if use_fallback(&resolved, *check_empty) {
                let message = match word {
                    Some(word) => expand_word_raw(shell, word)?,
                    None => "parameter null or not set".to_string(),
                };
                Err(ExecError::Expansion {
                    message: format!("{}: {}", part.name, message),
                    code: 1,
                })
            } else {
                Ok(resolved.value)
            }
        }

        ParameterOperation::Alternative { word, check_empty } => {
            if use_fallback(&resolved, *check_empty) {
                Ok(ParamValue::Single(String::new()))
            } else {
                Ok(ParamValue::Single(expand_word_raw(shell, word)?))
            }
        }

        ParameterOperation::RemovePrefix { pattern, greedy } => {
            let pattern = expand_word_pattern(shell, pattern)?;
            let extglob = shell.state.shopt.extglob;
            let greedy = *greedy;
            Ok(resolved
                .value
                .map(|s| remove_prefix(s, &pattern, greedy, extglob)))
        }

        ParameterOperation::RemoveSuffix { pattern, greedy } => {
            let pattern = expand_word_pattern(shell, pattern)?;
            let extglob = shell.state.shopt.extglob;
            let greedy = *greedy;
            Ok(resolved
                .value
                .map(|s| remove_suffix(s, &pattern, greedy, extglob)))
        }

        ParameterOperation::Replace {
            pattern,
            replacement,
            all,
            anchor,
        } => {
            let pattern = expand_word_pattern(shell, pattern)?;
            let replacement = match replacement {
                Some(word) => expand_word_raw(shell, word)?,
                None => String::new(),
            };
            let extglob = shell.state.shopt.extglob;
            let all = *all;
            let anchor = *anchor;
            Ok(resolved
                .value
                .map(|s| replace_pattern(s, &pattern, &replacement, all, anchor, extglob)))
        }

        ParameterOperation::Substring { offset, length } => {
            let offset_text = expand_word_raw(shell, offset)?;
            let offset = crate::arith::eval_arith_string(&mut shell.state, &offset_text)?;
            let length = match length {
                Some(word) => {
                    let text = expand_word_raw(shell, word)?;
                    Some(crate::arith::eval_arith_string(&mut shell.state, &text)?)
                }
                None => None,
            };
            substring(shell, &part.name, resolved.value, offset, length)
        }

        ParameterOperation::CaseMod {
            upper,
            all,
            pattern,
        } => {
            let pattern = match pattern {
                Some(word) => {
                    let p = expand_word_pattern(shell, word)?;
                    if p.is_empty() {
                        None
                    } else {
                        Some(p)
                    }
                }
                None => None,
            };
            let upper = *upper;
            let all = *all;
            Ok(resolved
                .value
                .map(|s| case_modify(s, upper, all, pattern.as_deref())))
        }

        ParameterOperation::Indirect
        | ParameterOperation::Keys { .. }
        | ParameterOperation::NamePrefix { .. } => unreachable!("handled above"),
    }
}

fn use_fallback(resolved: &Resolved, check_empty: bool) -> bool {
    !resolved.exists || (check_empty && resolved.value.is_empty())
}

fn nounset_check(shell: &Shell, name: &str) -> Result<(), ExecError> {
    if !shell.state.options.nounset {
        return Ok(());
    }
    // Special parameters always expand (possibly empty) under nounset.
    if matches!(name, "@" | "*" | "#" | "?" | "$" | "!" | "0" | "-" | "_") {
        return Ok(());
    }
    Err(ExecError::Unbound(name.to_string()))
}

/// Expand a parameter referenced by name text (used by indirection). The
/// text may carry a subscript: `arr[2]`.
fn expand_named(shell: &mut Shell, text: &str) -> Result<ParamValue, ExecError> {
    if text.is_empty() {
        return Ok(ParamValue::Single(String::new()));
    }
    let (name, subscript) = match text.find('[') {
        Some(open) if text.ends_with(']') => {
            let name = text[..open].to_string();
            let inner = &text[open + 1..text.len() - 1];
            let subscript = match inner {
                "@" => Subscript::All,
                "*" => Subscript::Star,
                _ => Subscript::Index(WordNode::literal(inner)),
            };
            (name, Some(subscript))
        }
        _ => (text.to_string(), None),
    };
    let resolved = resolve_base(shell, &name, &subscript)?;
    if !resolved.exists {
        nounset_check(shell, &name)?;
    }
    Ok(resolved.value)
}

// =============================================================================
// base resolution
// =============================================================================

fn resolve_base(
    shell: &mut Shell,
    name: &str,
    subscript: &Option<Subscript>,
) -> Result<Resolved, ExecError> {
    // Positional list.
    if name == "@" || name == "*" {
        return Ok(Resolved {
            exists: true,
            value: ParamValue::fields(shell.state.positional.clone(), name == "*"),
        });
    }
    // Single positional.
    if name.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = name
            .parse()
            .map_err(|_| ExecError::expansion(format!("${{{}}}: bad substitution", name)))?;
        let value = shell.state.positional_get(n);
        return Ok(Resolved {
            exists: value.is_some(),
            value: ParamValue::Single(value.unwrap_or_default()),
        });
    }
    // Other special parameters.
    if let Some(value) = special_scalar(shell, name) {
        return Ok(Resolved {
            exists: true,
            value: ParamValue::Single(value),
        });
    }

    let name = shell.state.scopes.resolve_nameref(name);
    let var = match computed_array(shell, &name) {
        Some(var) => Some(var),
        None => shell.state.scopes.get(&name).cloned(),
    };

    match subscript {
        None => match var {
            Some(var) => Ok(Resolved {
                exists: true,
                value: ParamValue::Single(var.as_string()),
            }),
            None => Ok(Resolved {
                exists: false,
                value: ParamValue::Single(String::new()),
            }),
        },
        Some(Subscript::All) | Some(Subscript::Star) => {
            let star = matches!(subscript, Some(Subscript::Star));
            match var {
                Some(var) => Ok(Resolved {
                    exists: !matches!(var.value, VarValue::Unset),
                    value: ParamValue::fields(var.element_values(), star),
                }),
                None => Ok(Resolved {
                    exists: false,
                    value: ParamValue::fields(Vec::new(), star),
                }),
            }
        }
        Some(Subscript::Index(index_word)) => {
            let index_text = expand_word_raw(shell, index_word)?;
            match var {
                Some(var) => {
                    let element = match &var.value {
                        VarValue::Assoc(map) => map.get(index_text.trim()).cloned(),
                        _ => {
                            let index =
                                crate::arith::eval_arith_string(&mut shell.state, &index_text)?;
                            var.index_get(index)
                        }
                    };
                    Ok(Resolved {
                        exists: element.is_some(),
                        value: ParamValue::Single(element.unwrap_or_default()),
                    })
                }
                None => Ok(Resolved {
                    exists: false,
                    value: ParamValue::Single(String::new()),
                }),
            }
        }
    }
}

fn special_scalar(shell: &Shell, name: &str) -> Option<String> {
    Some(match name {
        "#" => shell.state.positional.len().to_string(),
        "?" => shell.state.last_exit_code.to_string(),
        "$" => std::process::id().to_string(),
        "!" => shell
            .state
            .last_background_pid
            .map(|pid| pid.to_string())
            .unwrap_or_default(),
        "-" => shell.state.options.flag_string(shell.state.is_interactive),
        "_" => shell.state.last_arg.clone(),
        "RANDOM" => (rand::random::<u16>() % 32768).to_string(),
        "SECONDS" => shell.state.seconds().to_string(),
        "LINENO" => shell.state.current_line.to_string(),
        "UID" => nix::unistd::Uid::current().as_raw().to_string(),
        "PPID" => nix::unistd::getppid().as_raw().to_string(),
        _ => return None,
    })
}

/// Arrays maintained by the shell itself rather than the variable store.
fn computed_array(shell: &Shell, name: &str) -> Option<Variable> {
    let values: Vec<String> = match name {
        "FUNCNAME" => shell.state.func_stack.clone(),
        "PIPESTATUS" => shell
            .state
            .pipe_status
            .iter()
            .map(|s| s.to_string())
            .collect(),
        "REMATCH" => shell.state.rematch.clone(),
        _ => return None,
    };
    let mut map = std::collections::BTreeMap::new();
    for (i, v) in values.into_iter().enumerate() {
        map.insert(i as i64, v);
    }
    Some(Variable {
        value: VarValue::Indexed(map),
        attrs: Default::default(),
    })
}

// =============================================================================
// pattern operators
// =============================================================================

fn full_match_regex(pattern: &str, extglob: bool) -> Option<Regex> {
    let frag = pattern_to_regex(pattern, true, extglob);
    Regex::new(&format!("^(?:{})$", frag)).ok()
}

fn remove_prefix(value: &str, pattern: &str, greedy: bool, extglob: bool) -> String {
    let re = match full_match_regex(pattern, extglob) {
        Some(re) => re,
        None => return value.to_string(),
    };
    let boundaries: Vec<usize> = char_boundaries(value);
    let candidates: Box<dyn Iterator<Item = &usize>> = if greedy {
        Box::new(boundaries.iter().rev())
    } else {
        Box::new(boundaries.iter())
    };
    for &end in candidates {
        if re.is_match(&value[..end]) {
            return value[end..].to_string();
        }
    }
    value.to_string()
}

fn remove_suffix(value: &str, pattern: &str, greedy: bool, extglob: bool) -> String {
    let re = match full_match_regex(pattern, extglob) {
        Some(re) => re,
        None => return value.to_string(),
    };
    let boundaries: Vec<usize> = char_boundaries(value);
    let candidates: Box<dyn Iterator<Item = &usize>> = if greedy {
        Box::new(boundaries.iter())
    } else {
        Box::new(boundaries.iter().rev())
    };
    for &start in candidates {
        if re.is_match(&value[start..]) {
            return value[..start].to_string();
        }
    }
    value.to_string()
}

fn char_boundaries(s: &str) -> Vec<usize> {
    let mut out: Vec<usize> = s.char_indices().map(|(i, _)| i).collect();
    out.push(s.len());
    out
}

fn replace_pattern(
    value: &str,
    pattern: &str,
    replacement: &str,
    all: bool,
    anchor: Option<crate::ast::types::ReplaceAnchor>,
    extglob: bool,
) -> String {
    if pattern.is_empty() {
        return value.to_string();
    }
    let frag = pattern_to_regex(pattern, true, extglob);
    let anchored = match anchor {
        Some(crate::ast::types::ReplaceAnchor::Start) => format!("^(?:{})", frag),
        Some(crate::ast::types::ReplaceAnchor::End) => format!("(?:{})$", frag),
        None => format!("(?:{})", frag),
    };
    let re = match Regex::new(&anchored) {
        Ok(re) => re,
        Err(_) => return value.to_string(),
    };
    let rep = |_: &regex_lite::Captures| replacement.to_string();
    if all && anchor.is_none() {
        re.replace_all(value, rep).into_owned()
    } else {
        re.replacen(value, 1, rep).into_owned()
    }
}

fn case_modify(value: &str, upper: bool, all: bool, pattern: Option<&str>) -> String {
    let matches_char = |c: char| -> bool {
        match pattern {
            None => true,
            Some(p) => match_pattern(p, &c.to_string(), MatchOptions::default()),
        }
    };
    let transform = |c: char| -> String {
        if upper {
            c.to_uppercase().to_string()
        } else {
            c.to_lowercase().to_string()
        }
    };
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let eligible = if all { true } else { i == 0 };
        if eligible && matches_char(c) {
            out.push_str(&transform(c));
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// substrings
// =============================================================================

fn substring(
    shell: &Shell,
    name: &str,
    value: ParamValue,
    offset: i64,
    length: Option<i64>,
) -> Result<ParamValue, ExecError> {
    match value {
        ParamValue::Single(s) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let start = if offset < 0 { (len + offset).max(0) } else { offset.min(len) };
            let end = match length {
                None => len,
                Some(l) if l >= 0 => (start + l).min(len),
                Some(l) => {
                    let end = len + l;
                    if end < start {
                        return Err(ExecError::expansion(format!(
                            "{}: substring expression < 0",
                            l
                        )));
                    }
                    end
                }
            };
            let out: String = chars[start as usize..end as usize].iter().collect();
            Ok(ParamValue::Single(out))
        }
        ParamValue::Fields { values, star } => {
            // For $@/$* the script name occupies position 0.
            let list: Vec<String> = if name == "@" || name == "*" {
                let mut list = vec![shell.state.script_name.clone()];
                list.extend(values);
                list
            } else {
                values
            };
            let len = list.len() as i64;
            let start = if offset < 0 { (len + offset).max(0) } else { offset.min(len) };
            let end = match length {
                None => len,
                Some(l) if l >= 0 => (start + l).min(len),
                Some(l) => {
                    return Err(ExecError::expansion(format!(
                        "{}: substring expression < 0",
                        l
                    )))
                }
            };
            Ok(ParamValue::fields(
                list[start as usize..end as usize].to_vec(),
                star,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_prefix_shortest_and_longest() {
        assert_eq!(remove_prefix("a/b/c", "*/", false, false), "b/c");
        assert_eq!(remove_prefix("a/b/c", "*/", true, false), "c");
        assert_eq!(remove_prefix("abc", "x", false, false), "abc");
    }

    #[test]
    fn remove_suffix_shortest_and_longest() {
        assert_eq!(remove_suffix("a.tar.gz", ".*", false, false), "a.tar");
        assert_eq!(remove_suffix("a.tar.gz", ".*", true, false), "a");
    }

    #[test]
    fn replace_first_and_all() {
        assert_eq!(replace_pattern("aaa", "a", "b", false, None, false), "baa");
        assert_eq!(replace_pattern("aaa", "a", "b", true, None, false), "bbb");
    }

    #[test]
    fn replace_anchored() {
        use crate::ast::types::ReplaceAnchor;
        assert_eq!(
            replace_pattern("abcabc", "abc", "X", false, Some(ReplaceAnchor::Start), false),
            "Xabc"
        );
        assert_eq!(
            replace_pattern("abcabc", "abc", "X", false, Some(ReplaceAnchor::End), false),
            "abcX"
        );
    }

    #[test]
    fn replacement_dollar_is_literal() {
        assert_eq!(replace_pattern("x", "x", "$0", false, None, false), "$0");
    }

    #[test]
    fn case_modification_variants() {
        assert_eq!(case_modify("abc", true, false, None), "Abc");
        assert_eq!(case_modify("abc", true, true, None), "ABC");
        assert_eq!(case_modify("ABC", false, true, None), "abc");
        assert_eq!(case_modify("abc abc", true, true, Some("[ab]")), "ABc ABc");
    }
}
