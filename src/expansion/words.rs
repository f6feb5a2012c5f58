//! Word Expansion Orchestrator
//!
//! Runs the full expansion pipeline over words, in phase order: brace
//! expansion, tilde expansion, parameter/command/arithmetic expansion
//! (left-to-right), word splitting, pathname expansion, quote removal.
//! Quoted text travels with its glob characters escaped so later phases
//! treat it literally; the escapes come off at quote removal.

use crate::ast::types::{BraceItem, BracePart, HereDocNode, WordNode, WordPart};
use crate::core::errors::ExecError;
use crate::expansion::brace::expand_braces;
use crate::expansion::glob::{expand_glob, GlobOutcome};
use crate::expansion::parameter::{expand_parameter, ParamValue};
use crate::expansion::pattern::escape_glob_chars;
use crate::expansion::split::{split_fields, Piece, Segment};
use crate::expansion::tilde::expand_tilde;
use crate::parser::word_parser::parse_heredoc_text;
use crate::shell::Shell;

/// Expand a list of words into command fields (the full pipeline).
pub fn expand_words(shell: &mut Shell, words: &[WordNode]) -> Result<Vec<String>, ExecError> {
    let mut fields = Vec::new();
    for word in words {
        fields.extend(expand_word_fields(shell, word)?);
    }
    Ok(fields)
}

/// Expand one word into zero or more fields.
pub fn expand_word_fields(shell: &mut Shell, word: &WordNode) -> Result<Vec<String>, ExecError> {
    let brace_words = if shell.state.options.braceexpand {
        expand_braces(word)
    } else {
        vec![word.clone()]
    };

    let ifs = shell.state.ifs();
    let mut fields = Vec::new();
    for word in &brace_words {
        let pieces = word_pieces(shell, word, true)?;
        for field in split_fields(&pieces, &ifs) {
            if shell.state.options.noglob {
                fields.push(crate::expansion::pattern::unescape_glob_chars(&field));
                continue;
            }
            match expand_glob(&field, &shell.state.shopt)? {
                GlobOutcome::Matches(matches) => fields.extend(matches),
                GlobOutcome::Literal(literal) => fields.push(literal),
                GlobOutcome::Dropped => {}
            }
        }
    }
    Ok(fields)
}

/// Expand one word to a single string: no brace expansion, no splitting,
/// no globbing (assignment values, redirect targets, case scrutinees).
pub fn expand_word_raw(shell: &mut Shell, word: &WordNode) -> Result<String, ExecError> {
    let mut out = String::new();
    expand_raw_parts(shell, &word.parts, false, &mut out)?;
    Ok(out)
}

fn expand_raw_parts(
    shell: &mut Shell,
    parts: &[WordPart],
    _in_quotes: bool,
    out: &mut String,
) -> Result<(), ExecError> {
    for part in parts {
        match part {
            WordPart::Literal(s) | WordPart::SingleQuoted(s) | WordPart::Escaped(s) => {
                out.push_str(s)
            }
            WordPart::DoubleQuoted(inner) => expand_raw_parts(shell, inner, true, out)?,
            WordPart::Parameter(param) => {
                let value = expand_parameter(shell, param)?;
                match value {
                    ParamValue::Single(s) => out.push_str(&s),
                    ParamValue::Fields { ref values, star } => {
                        // In a non-splitting context $* joins with IFS[0],
                        // $@ with a space.
                        let sep = if star {
                            shell.state.ifs_join()
                        } else {
                            " ".to_string()
                        };
                        out.push_str(&values.join(&sep));
                    }
                }
            }
            WordPart::CommandSub(sub) => {
                let output = shell.command_substitution(&sub.body)?;
                out.push_str(&output);
            }
            WordPart::ArithSub(expr) => {
                let value = crate::arith::eval_arith(&mut shell.state, expr)?;
                out.push_str(&value.to_string());
            }
            WordPart::ProcessSub(sub) => {
                let path = shell.process_substitution(sub)?;
                out.push_str(&path);
            }
            WordPart::Tilde(user) => {
                out.push_str(&expand_tilde(&shell.state, user.as_deref()));
            }
            WordPart::Brace(brace) => {
                // Braces are not expanded in these contexts; reconstruct.
                out.push_str(&brace_source_text(brace));
            }
        }
    }
    Ok(())
}

/// Expand one word into a matcher pattern: quoted text is escaped so it
/// matches literally, unquoted expansion results keep their pattern
/// characters live.
pub fn expand_word_pattern(shell: &mut Shell, word: &WordNode) -> Result<String, ExecError> {
    let pieces = word_pieces(shell, word, true)?;
    let mut out = String::new();
    let mut first = true;
    for piece in pieces {
        match piece {
            Piece::Text(segment) => out.push_str(&segment.value),
            Piece::Break => {
                if !first {
                    out.push(' ');
                }
            }
        }
        first = false;
    }
    Ok(out)
}

/// Expand a here-document body (unless its delimiter was quoted).
pub fn expand_heredoc_body(shell: &mut Shell, heredoc: &HereDocNode) -> Result<String, ExecError> {
    if heredoc.quoted {
        return Ok(heredoc.body.clone());
    }
    let word = parse_heredoc_text(&heredoc.body)
        .map_err(|e| ExecError::expansion(e.to_string()))?;
    let mut out = String::new();
    expand_raw_parts(shell, &word.parts, true, &mut out)?;
    Ok(out)
}

// =============================================================================
// piece building
// =============================================================================

/// Expand the parts of one word into split-ready pieces. `escape_quoted`
/// protects quoted text from the glob and pattern phases.
fn word_pieces(
    shell: &mut Shell,
    word: &WordNode,
    escape_quoted: bool,
) -> Result<Vec<Piece>, ExecError> {
    let mut pieces = Vec::new();
    for part in &word.parts {
        push_part(shell, part, false, escape_quoted, &mut pieces)?;
    }
    Ok(pieces)
}

fn push_part(
    shell: &mut Shell,
    part: &WordPart,
    in_quotes: bool,
    escape_quoted: bool,
    pieces: &mut Vec<Piece>,
) -> Result<(), ExecError> {
    let protect = |s: &str| -> String {
        if escape_quoted {
            escape_glob_chars(s)
        } else {
            s.to_string()
        }
    };

    match part {
        WordPart::Literal(s) => {
            if in_quotes {
                pieces.push(Piece::Text(Segment::quoted(protect(s))));
            } else {
                pieces.push(Piece::Text(Segment::literal(s.clone())));
            }
        }
        WordPart::SingleQuoted(s) | WordPart::Escaped(s) => {
            pieces.push(Piece::Text(Segment::quoted(protect(s))));
        }
        WordPart::DoubleQuoted(inner) => {
            // An empty "" still anchors an empty field.
            if inner.is_empty() {
                pieces.push(Piece::Text(Segment::quoted(String::new())));
            }
            for part in inner {
                push_part(shell, part, true, escape_quoted, pieces)?;
            }
        }
        WordPart::Parameter(param) => {
            let value = expand_parameter(shell, param)?;
            match value {
                ParamValue::Single(s) => {
                    if in_quotes {
                        pieces.push(Piece::Text(Segment::quoted(protect(&s))));
                    } else {
                        pieces.push(Piece::Text(Segment::expansion(s)));
                    }
                }
                ParamValue::Fields { values, star } => {
                    if in_quotes && star {
                        // "$*": one field joined with IFS[0].
                        let joined = values.join(&shell.state.ifs_join());
                        pieces.push(Piece::Text(Segment::quoted(protect(&joined))));
                    } else if in_quotes {
                        // "$@": one quoted field per element.
                        for (i, value) in values.iter().enumerate() {
                            if i > 0 {
                                pieces.push(Piece::Break);
                            }
                            pieces.push(Piece::Text(Segment::quoted(protect(value))));
                        }
                        if values.is_empty() {
                            // "$@" with no arguments produces no field at
                            // all, not an empty one; mark with nothing.
                        }
                    } else {
                        // Unquoted list: each element splits separately.
                        for (i, value) in values.iter().enumerate() {
                            if i > 0 {
                                pieces.push(Piece::Break);
                            }
                            pieces.push(Piece::Text(Segment::expansion(value.clone())));
                        }
                    }
                }
            }
        }
        WordPart::CommandSub(sub) => {
            let output = shell.command_substitution(&sub.body)?;
            if in_quotes {
                pieces.push(Piece::Text(Segment::quoted(protect(&output))));
            } else {
                pieces.push(Piece::Text(Segment::expansion(output)));
            }
        }
        WordPart::ArithSub(expr) => {
            let value = crate::arith::eval_arith(&mut shell.state, expr)?;
            let text = value.to_string();
            if in_quotes {
                pieces.push(Piece::Text(Segment::quoted(text)));
            } else {
                pieces.push(Piece::Text(Segment::expansion(text)));
            }
        }
        WordPart::ProcessSub(sub) => {
            let path = shell.process_substitution(sub)?;
            pieces.push(Piece::Text(Segment {
                value: path,
                splittable: false,
                quoted: false,
            }));
        }
        WordPart::Tilde(user) => {
            let home = expand_tilde(&shell.state, user.as_deref());
            pieces.push(Piece::Text(Segment {
                value: protect(&home),
                splittable: false,
                quoted: false,
            }));
        }
        WordPart::Brace(brace) => {
            // Reached only when braceexpand is off: the text is literal.
            pieces.push(Piece::Text(Segment::literal(brace_source_text(brace))));
        }
    }
    Ok(())
}

/// Reconstruct the source text of an unexpanded brace part.
fn brace_source_text(brace: &BracePart) -> String {
    let mut out = String::from("{");
    for (i, item) in brace.items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match item {
            BraceItem::Word(word) => {
                out.push_str(&word.as_literal().unwrap_or_default());
            }
            BraceItem::NumberRange { start, end, step, .. } => {
                if *step != 1 {
                    out.push_str(&format!("{}..{}..{}", start, end, step));
                } else {
                    out.push_str(&format!("{}..{}", start, end));
                }
            }
            BraceItem::CharRange { start, end, step } => {
                if *step != 1 {
                    out.push_str(&format!("{}..{}..{}", start, end, step));
                } else {
                    out.push_str(&format!("{}..{}", start, end));
                }
            }
        }
    }
    out.push('}');
    out
}
