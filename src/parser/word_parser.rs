//! Word Parser
//!
//! Turns the raw text of a word token into its typed part list: literals,
//! quoted strings, escapes, parameter expansions (with the full `${...}`
//! operator sub-grammar), command/arithmetic/process substitutions, brace
//! expansion candidates, and a leading tilde. Quote types are preserved so
//! the expansion engine knows what to split and glob.

use crate::ast::types::{
    ArrayElementNode, BraceItem, BracePart, CommandSubPart, ParameterOperation, ParameterPart,
    ProcessSubDirection, ProcessSubPart, ReplaceAnchor, Subscript, WordNode, WordPart,
};
use crate::parser::arith_parser::parse_arith;
use crate::parser::lexer::{assignment_eq_index, tokenize, TokenKind};
use crate::parser::types::ParseError;

/// Parse a word's raw text into a WordNode.
pub fn parse_word(text: &str) -> Result<WordNode, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let (parts, _) = parse_parts(&chars, 0, chars.len(), Mode::Unquoted)?;
    Ok(WordNode { parts })
}

/// Parse here-document body text: only `$`, backtick, and the here-doc
/// backslash escapes are special.
pub fn parse_heredoc_text(text: &str) -> Result<WordNode, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let (parts, _) = parse_parts(&chars, 0, chars.len(), Mode::HereDoc)?;
    Ok(WordNode { parts })
}

/// Parse the elements of an array literal `(...)` into element nodes,
/// honoring `[key]=value` sub-forms.
pub fn parse_array_elements(inner: &str) -> Result<Vec<ArrayElementNode>, ParseError> {
    let mut elements = Vec::new();
    for token in tokenize(inner)? {
        match token.kind {
            TokenKind::Eof | TokenKind::Newline => continue,
            TokenKind::Word
            | TokenKind::Number
            | TokenKind::In
            | TokenKind::AssignmentWord
            | TokenKind::If
            | TokenKind::Then
            | TokenKind::Else
            | TokenKind::Elif
            | TokenKind::Fi
            | TokenKind::For
            | TokenKind::While
            | TokenKind::Until
            | TokenKind::Do
            | TokenKind::Done
            | TokenKind::Case
            | TokenKind::Esac
            | TokenKind::Function
            | TokenKind::Select
            | TokenKind::Time => {
                elements.push(parse_array_element(&token.text)?);
            }
            _ => {
                return Err(ParseError::new(
                    format!("unexpected token in array literal: `{}'", token.text),
                    token.line,
                    token.column,
                ))
            }
        }
    }
    Ok(elements)
}

fn parse_array_element(text: &str) -> Result<ArrayElementNode, ParseError> {
    if text.starts_with('[') {
        // [key]=value
        let chars: Vec<char> = text.chars().collect();
        let mut depth = 0;
        let mut close = None;
        for (i, c) in chars.iter().enumerate() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        if let Some(close) = close {
            if chars.get(close + 1) == Some(&'=') {
                let key: String = chars[1..close].iter().collect();
                let value: String = chars[close + 2..].iter().collect();
                return Ok(ArrayElementNode {
                    key: Some(parse_word(&key)?),
                    value: parse_word(&value)?,
                });
            }
        }
    }
    Ok(ArrayElementNode {
        key: None,
        value: parse_word(text)?,
    })
}

/// Split an assignment word into (name, subscript, append, value-text).
pub fn split_assignment(text: &str) -> Option<(String, Option<String>, bool, String)> {
    let eq = assignment_eq_index(text)?;
    let chars: Vec<char> = text.chars().collect();
    let append = chars[eq - 1] == '+';
    let lhs_end = if append { eq - 1 } else { eq };
    let lhs: String = chars[..lhs_end].iter().collect();
    let value: String = chars[eq + 1..].iter().collect();
    if let Some(bracket) = lhs.find('[') {
        let name = lhs[..bracket].to_string();
        let sub = lhs[bracket + 1..lhs.len() - 1].to_string();
        Some((name, Some(sub), append, value))
    } else {
        Some((lhs, None, append, value))
    }
}

// =============================================================================
// part scanning
// =============================================================================

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Unquoted,
    DoubleQuoted,
    /// Here-doc body: no quote processing, only $ ` and \ escapes.
    HereDoc,
}

fn err_at(msg: &str) -> ParseError {
    ParseError::new(msg, 0, 0)
}

/// Parse parts from `chars[start..end]`; returns (parts, consumed-up-to).
fn parse_parts(chars: &[char], start: usize, end: usize, mode: Mode) -> Result<(Vec<WordPart>, usize), ParseError> {
    let mut parts: Vec<WordPart> = Vec::new();
    let mut literal = String::new();
    let mut i = start;

    macro_rules! flush {
        () => {
            if !literal.is_empty() {
                parts.push(WordPart::Literal(std::mem::take(&mut literal)));
            }
        };
    }

    while i < end {
        let c = chars[i];
        match c {
            '\'' if mode == Mode::Unquoted => {
                flush!();
                let close = chars[i + 1..end]
                    .iter()
                    .position(|&q| q == '\'')
                    .map(|p| i + 1 + p)
                    .ok_or_else(|| err_at("unterminated single quote"))?;
                parts.push(WordPart::SingleQuoted(chars[i + 1..close].iter().collect()));
                i = close + 1;
            }
            '"' if mode == Mode::Unquoted => {
                flush!();
                let close = find_dquote_end(chars, i + 1, end)?;
                let (inner, _) = parse_parts(chars, i + 1, close, Mode::DoubleQuoted)?;
                parts.push(WordPart::DoubleQuoted(inner));
                i = close + 1;
            }
            '"' if mode == Mode::DoubleQuoted => {
                // parse_parts over a dq span never sees the closing quote;
                // defensive stop.
                break;
            }
            '\\' => {
                let next = chars.get(i + 1).copied();
                match mode {
                    Mode::Unquoted => {
                        flush!();
                        match next {
                            Some(n) => {
                                parts.push(WordPart::Escaped(n.to_string()));
                                i += 2;
                            }
                            None => {
                                literal.push('\\');
                                i += 1;
                            }
                        }
                    }
                    Mode::DoubleQuoted | Mode::HereDoc => {
                        // Only \$ \" \\ \` are escapes here; anything else
                        // keeps the backslash (prompt strings rely on it).
                        match next {
                            Some(n @ ('$' | '`' | '\\')) => {
                                flush!();
                                parts.push(WordPart::Escaped(n.to_string()));
                                i += 2;
                            }
                            Some('"') if mode == Mode::DoubleQuoted => {
                                flush!();
                                parts.push(WordPart::Escaped("\"".to_string()));
                                i += 2;
                            }
                            _ => {
                                literal.push('\\');
                                i += 1;
                            }
                        }
                    }
                }
            }
            '$' => {
                flush!();
                let (part, next) = parse_dollar(chars, i, end)?;
                match part {
                    Some(p) => {
                        parts.push(p);
                        i = next;
                    }
                    None => {
                        literal.push('$');
                        i += 1;
                    }
                }
            }
            '`' => {
                flush!();
                let close = find_backquote_end(chars, i + 1, end)?;
                let raw: String = chars[i + 1..close].iter().collect();
                // In backticks, \` \$ \\ lose the backslash.
                let body_text = raw.replace("\\`", "`").replace("\\$", "$").replace("\\\\", "\\");
                let body = crate::parser::parse(&body_text)?;
                parts.push(WordPart::CommandSub(CommandSubPart { body, legacy: true }));
                i = close + 1;
            }
            '<' | '>'
                if mode == Mode::Unquoted
                    && chars.get(i + 1) == Some(&'(') =>
            {
                flush!();
                let close = find_paren_end(chars, i + 2, end)?;
                let body_text: String = chars[i + 2..close].iter().collect();
                let body = crate::parser::parse(&body_text)?;
                let direction = if c == '<' {
                    ProcessSubDirection::Read
                } else {
                    ProcessSubDirection::Write
                };
                parts.push(WordPart::ProcessSub(ProcessSubPart { body, direction }));
                i = close + 1;
            }
            '{' if mode == Mode::Unquoted => {
                match parse_brace(chars, i, end)? {
                    Some((part, next)) => {
                        flush!();
                        parts.push(WordPart::Brace(part));
                        i = next;
                    }
                    None => {
                        literal.push('{');
                        i += 1;
                    }
                }
            }
            '~' if mode == Mode::Unquoted && parts.is_empty() && literal.is_empty() => {
                let mut j = i + 1;
                let mut user = String::new();
                while j < end && chars[j] != '/' && !"\\'\"$`{}".contains(chars[j]) {
                    user.push(chars[j]);
                    j += 1;
                }
                // ~ followed by quoting chars is not a tilde expansion.
                if j < end && "\\'\"$`{".contains(chars[j]) && chars[j] != '/' {
                    literal.push('~');
                    i += 1;
                } else {
                    parts.push(WordPart::Tilde(if user.is_empty() { None } else { Some(user) }));
                    i = j;
                }
            }
            _ => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        parts.push(WordPart::Literal(literal));
    }
    Ok((parts, i))
}

fn find_dquote_end(chars: &[char], mut i: usize, end: usize) -> Result<usize, ParseError> {
    while i < end {
        match chars[i] {
            '"' => return Ok(i),
            '\\' => i += 2,
            '$' if chars.get(i + 1) == Some(&'(') => {
                i = find_paren_end(chars, i + 2, end)? + 1;
            }
            '$' if chars.get(i + 1) == Some(&'{') => {
                i = find_brace_end(chars, i + 2, end)? + 1;
            }
            '`' => {
                i = find_backquote_end(chars, i + 1, end)? + 1;
            }
            _ => i += 1,
        }
    }
    Err(err_at("unterminated double quote"))
}

fn find_backquote_end(chars: &[char], mut i: usize, end: usize) -> Result<usize, ParseError> {
    while i < end {
        match chars[i] {
            '`' => return Ok(i),
            '\\' => i += 2,
            _ => i += 1,
        }
    }
    Err(err_at("unterminated backquote"))
}

/// Find the `)` closing a group that started just before `i`, quote-aware.
fn find_paren_end(chars: &[char], mut i: usize, end: usize) -> Result<usize, ParseError> {
    let mut depth = 1;
    while i < end {
        match chars[i] {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            '\'' => {
                i += 1;
                while i < end && chars[i] != '\'' {
                    i += 1;
                }
            }
            '"' => {
                i += 1;
                while i < end && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            '\\' => i += 1,
            _ => {}
        }
        i += 1;
    }
    Err(err_at("unterminated command substitution"))
}

fn find_brace_end(chars: &[char], mut i: usize, end: usize) -> Result<usize, ParseError> {
    let mut depth = 1;
    while i < end {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            '\'' => {
                i += 1;
                while i < end && chars[i] != '\'' {
                    i += 1;
                }
            }
            '\\' => i += 1,
            _ => {}
        }
        i += 1;
    }
    Err(err_at("unterminated parameter expansion"))
}

// =============================================================================
// $ expansions
// =============================================================================

/// Parse the expansion starting at `$` (chars[i]). Returns None when the $
/// is literal.
fn parse_dollar(chars: &[char], i: usize, end: usize) -> Result<(Option<WordPart>, usize), ParseError> {
    match chars.get(i + 1) {
        Some('(') if chars.get(i + 2) == Some(&'(') => {
            // $(( — arithmetic unless it turns out to be $( (subshell) with
            // a leading paren; decided by the matching delimiters.
            if let Some(close) = find_arith_end(chars, i + 3, end) {
                let expr_text: String = chars[i + 3..close].iter().collect();
                let expr = parse_arith(&expr_text)
                    .map_err(|e| err_at(&format!("arithmetic: {}", e)))?;
                return Ok((Some(WordPart::ArithSub(expr)), close + 2));
            }
            // Fall through to command substitution.
            let close = find_paren_end(chars, i + 2, end)?;
            let body_text: String = chars[i + 2..close].iter().collect();
            let body = crate::parser::parse(&body_text)?;
            Ok((
                Some(WordPart::CommandSub(CommandSubPart { body, legacy: false })),
                close + 1,
            ))
        }
        Some('(') => {
            let close = find_paren_end(chars, i + 2, end)?;
            let body_text: String = chars[i + 2..close].iter().collect();
            let body = crate::parser::parse(&body_text)?;
            Ok((
                Some(WordPart::CommandSub(CommandSubPart { body, legacy: false })),
                close + 1,
            ))
        }
        Some('{') => {
            let close = find_brace_end(chars, i + 2, end)?;
            let content: String = chars[i + 2..close].iter().collect();
            let part = parse_braced_parameter(&content)?;
            Ok((Some(WordPart::Parameter(part)), close + 1))
        }
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
            let mut j = i + 1;
            let mut name = String::new();
            while j < end && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                name.push(chars[j]);
                j += 1;
            }
            Ok((
                Some(WordPart::Parameter(ParameterPart {
                    name,
                    subscript: None,
                    operation: None,
                })),
                j,
            ))
        }
        Some(c) if c.is_ascii_digit() => Ok((
            Some(WordPart::Parameter(ParameterPart {
                name: c.to_string(),
                subscript: None,
                operation: None,
            })),
            i + 2,
        )),
        Some(c @ ('?' | '$' | '!' | '#' | '@' | '*' | '-' | '_')) => Ok((
            Some(WordPart::Parameter(ParameterPart {
                name: c.to_string(),
                subscript: None,
                operation: None,
            })),
            i + 2,
        )),
        _ => Ok((None, i + 1)),
    }
}

/// Find the `))` that closes `$((`, or None when the construct is really a
/// command substitution containing a subshell.
fn find_arith_end(chars: &[char], mut i: usize, end: usize) -> Option<usize> {
    let mut depth = 0;
    while i < end {
        match chars[i] {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    if chars.get(i + 1) == Some(&')') {
                        return Some(i);
                    }
                    return None;
                }
                depth -= 1;
            }
            '\'' => {
                i += 1;
                while i < end && chars[i] != '\'' {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

// =============================================================================
// ${...} operator sub-grammar
// =============================================================================

fn parse_braced_parameter(content: &str) -> Result<ParameterPart, ParseError> {
    let chars: Vec<char> = content.chars().collect();

    // ${#...} — length, unless the name itself is # ($# with operator).
    if content.starts_with('#') && content.len() > 1 {
        let rest = &content[1..];
        let (name, subscript) = parse_param_name(rest)?;
        if name.len() + subscript_text_len(rest, &name) == rest.chars().count() {
            return Ok(ParameterPart {
                name,
                subscript,
                operation: Some(ParameterOperation::Length),
            });
        }
        return Err(err_at(&format!("${{{}}}: bad substitution", content)));
    }

    // ${!...} — indirection family.
    if content.starts_with('!') && content.len() > 1 {
        let rest = &content[1..];
        if let Some(prefix) = rest.strip_suffix('*') {
            if is_name(prefix) {
                return Ok(ParameterPart {
                    name: prefix.to_string(),
                    subscript: None,
                    operation: Some(ParameterOperation::NamePrefix { star: true }),
                });
            }
        }
        if let Some(prefix) = rest.strip_suffix('@') {
            if is_name(prefix) {
                return Ok(ParameterPart {
                    name: prefix.to_string(),
                    subscript: None,
                    operation: Some(ParameterOperation::NamePrefix { star: false }),
                });
            }
        }
        if let Some(arr) = rest.strip_suffix("[@]") {
            if is_name(arr) {
                return Ok(ParameterPart {
                    name: arr.to_string(),
                    subscript: None,
                    operation: Some(ParameterOperation::Keys { star: false }),
                });
            }
        }
        if let Some(arr) = rest.strip_suffix("[*]") {
            if is_name(arr) {
                return Ok(ParameterPart {
                    name: arr.to_string(),
                    subscript: None,
                    operation: Some(ParameterOperation::Keys { star: true }),
                });
            }
        }
        let (name, subscript) = parse_param_name(rest)?;
        if name.len() + subscript_text_len(rest, &name) == rest.chars().count() {
            return Ok(ParameterPart {
                name,
                subscript,
                operation: Some(ParameterOperation::Indirect),
            });
        }
        return Err(err_at(&format!("${{{}}}: bad substitution", content)));
    }

    let (name, subscript) = parse_param_name(content)?;
    if name.is_empty() {
        return Err(err_at(&format!("${{{}}}: bad substitution", content)));
    }
    let consumed = name.chars().count() + subscript_text_len(content, &name);
    if consumed == chars.len() {
        return Ok(ParameterPart {
            name,
            subscript,
            operation: None,
        });
    }

    let rest: String = chars[consumed..].iter().collect();
    let operation = parse_param_operation(&rest)?;
    Ok(ParameterPart {
        name,
        subscript,
        operation: Some(operation),
    })
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_') == Some(true)
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse the parameter name (identifier, digits, or one special char) and an
/// optional [subscript].
fn parse_param_name(s: &str) -> Result<(String, Option<Subscript>), ParseError> {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return Ok((String::new(), None));
    }
    let mut name = String::new();
    let mut i = 0;
    let c = chars[0];
    if c.is_ascii_alphabetic() || c == '_' {
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            name.push(chars[i]);
            i += 1;
        }
    } else if c.is_ascii_digit() {
        while i < chars.len() && chars[i].is_ascii_digit() {
            name.push(chars[i]);
            i += 1;
        }
    } else if "?$!#@*-_".contains(c) {
        name.push(c);
        i += 1;
    } else {
        return Ok((String::new(), None));
    }

    if chars.get(i) == Some(&'[') {
        let mut depth = 0;
        let open = i;
        while i < chars.len() {
            match chars[i] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return Err(err_at("unbalanced array subscript"));
        }
        let inner: String = chars[open + 1..i].iter().collect();
        let subscript = match inner.as_str() {
            "@" => Subscript::All,
            "*" => Subscript::Star,
            _ => Subscript::Index(parse_word(&inner)?),
        };
        return Ok((name, Some(subscript)));
    }
    Ok((name, None))
}

/// Character count of "[...]" following the name, 0 when absent.
fn subscript_text_len(s: &str, name: &str) -> usize {
    let chars: Vec<char> = s.chars().collect();
    let start = name.chars().count();
    if chars.get(start) != Some(&'[') {
        return 0;
    }
    let mut depth = 0;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return i - start + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    0
}

fn parse_param_operation(rest: &str) -> Result<ParameterOperation, ParseError> {
    let chars: Vec<char> = rest.chars().collect();
    let op_word = |from: usize| -> Result<WordNode, ParseError> {
        parse_word(&chars[from..].iter().collect::<String>())
    };

    match chars[0] {
        ':' => match chars.get(1) {
            Some('-') => Ok(ParameterOperation::Default {
                word: op_word(2)?,
                check_empty: true,
            }),
            Some('=') => Ok(ParameterOperation::AssignDefault {
                word: op_word(2)?,
                check_empty: true,
            }),
            Some('?') => Ok(ParameterOperation::ErrorIfUnset {
                word: if chars.len() > 2 { Some(op_word(2)?) } else { None },
                check_empty: true,
            }),
            Some('+') => Ok(ParameterOperation::Alternative {
                word: op_word(2)?,
                check_empty: true,
            }),
            _ => {
                // Substring: offset[:length], split on a top-level colon.
                let rest_str: String = chars[1..].iter().collect();
                let (offset, length) = split_substring_operands(&rest_str);
                Ok(ParameterOperation::Substring {
                    offset: parse_word(&offset)?,
                    length: match length {
                        Some(l) => Some(parse_word(&l)?),
                        None => None,
                    },
                })
            }
        },
        '-' => Ok(ParameterOperation::Default {
            word: op_word(1)?,
            check_empty: false,
        }),
        '=' => Ok(ParameterOperation::AssignDefault {
            word: op_word(1)?,
            check_empty: false,
        }),
        '?' => Ok(ParameterOperation::ErrorIfUnset {
            word: if chars.len() > 1 { Some(op_word(1)?) } else { None },
            check_empty: false,
        }),
        '+' => Ok(ParameterOperation::Alternative {
            word: op_word(1)?,
            check_empty: false,
        }),
        '#' => {
            let greedy = chars.get(1) == Some(&'#');
            let from = if greedy { 2 } else { 1 };
            Ok(ParameterOperation::RemovePrefix {
                pattern: op_word(from)?,
                greedy,
            })
        }
        '%' => {
            let greedy = chars.get(1) == Some(&'%');
            let from = if greedy { 2 } else { 1 };
            Ok(ParameterOperation::RemoveSuffix {
                pattern: op_word(from)?,
                greedy,
            })
        }
        '/' => {
            let (all, anchor, from) = match chars.get(1) {
                Some('/') => (true, None, 2),
                Some('#') => (false, Some(ReplaceAnchor::Start), 2),
                Some('%') => (false, Some(ReplaceAnchor::End), 2),
                _ => (false, None, 1),
            };
            let body: String = chars[from..].iter().collect();
            let (pattern, replacement) = split_replacement(&body);
            Ok(ParameterOperation::Replace {
                pattern: parse_word(&pattern)?,
                replacement: match replacement {
                    Some(r) => Some(parse_word(&r)?),
                    None => None,
                },
                all,
                anchor,
            })
        }
        '^' => {
            let all = chars.get(1) == Some(&'^');
            let from = if all { 2 } else { 1 };
            Ok(ParameterOperation::CaseMod {
                upper: true,
                all,
                pattern: if chars.len() > from { Some(op_word(from)?) } else { None },
            })
        }
        ',' => {
            let all = chars.get(1) == Some(&',');
            let from = if all { 2 } else { 1 };
            Ok(ParameterOperation::CaseMod {
                upper: false,
                all,
                pattern: if chars.len() > from { Some(op_word(from)?) } else { None },
            })
        }
        _ => Err(err_at(&format!("bad substitution operator: `{}'", rest))),
    }
}

/// Split substring operands on the first top-level colon (parens and braces
/// nest; `:-` inside the length stays with the length).
fn split_substring_operands(s: &str) -> (String, Option<String>) {
    let chars: Vec<char> = s.chars().collect();
    let mut depth = 0;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            ':' if depth == 0 && i > 0 => {
                let offset: String = chars[..i].iter().collect();
                let length: String = chars[i + 1..].iter().collect();
                return (offset, Some(length));
            }
            _ => {}
        }
    }
    (s.to_string(), None)
}

/// Split `pattern/replacement` on the first unescaped, unbracketed slash.
fn split_replacement(s: &str) -> (String, Option<String>) {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    let mut depth = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' => depth += 1,
            ']' => depth -= 1,
            '/' if depth == 0 => {
                let pattern: String = chars[..i].iter().collect();
                let replacement: String = chars[i + 1..].iter().collect();
                return (pattern, Some(replacement));
            }
            _ => {}
        }
        i += 1;
    }
    (s.to_string(), None)
}

// =============================================================================
// brace expansion recognition
// =============================================================================

/// Recognize `{...}` as a brace expansion. Returns None when the braces are
/// literal (no top-level comma and no valid range).
fn parse_brace(chars: &[char], i: usize, end: usize) -> Result<Option<(BracePart, usize)>, ParseError> {
    let close = match find_brace_end(chars, i + 1, end) {
        Ok(c) => c,
        Err(_) => return Ok(None),
    };
    let inner: String = chars[i + 1..close].iter().collect();

    // Range form: {x..y} or {x..y..step}
    if let Some(item) = parse_brace_range(&inner) {
        return Ok(Some((BracePart { items: vec![item] }, close + 1)));
    }

    // List form needs at least one top-level comma.
    let mut items: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let inner_chars: Vec<char> = inner.chars().collect();
    let mut j = 0;
    let mut has_comma = false;
    while j < inner_chars.len() {
        let c = inner_chars[j];
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                has_comma = true;
                items.push(std::mem::take(&mut current));
            }
            '\\' => {
                current.push(c);
                if j + 1 < inner_chars.len() {
                    j += 1;
                    current.push(inner_chars[j]);
                }
            }
            '\'' => {
                current.push(c);
                j += 1;
                while j < inner_chars.len() {
                    current.push(inner_chars[j]);
                    if inner_chars[j] == '\'' {
                        break;
                    }
                    j += 1;
                }
            }
            _ => current.push(c),
        }
        j += 1;
    }
    items.push(current);
    if !has_comma {
        return Ok(None);
    }

    let mut brace_items = Vec::new();
    for item in items {
        brace_items.push(BraceItem::Word(parse_word(&item)?));
    }
    Ok(Some((BracePart { items: brace_items }, close + 1)))
}

fn parse_brace_range(inner: &str) -> Option<BraceItem> {
    let pieces: Vec<&str> = inner.split("..").collect();
    if pieces.len() != 2 && pieces.len() != 3 {
        return None;
    }
    let step = if pieces.len() == 3 {
        pieces[2].parse::<i64>().ok()?
    } else {
        1
    };
    let step = if step == 0 { 1 } else { step };

    if let (Ok(start), Ok(end)) = (pieces[0].parse::<i64>(), pieces[1].parse::<i64>()) {
        let width = if (pieces[0].starts_with('0') && pieces[0].len() > 1)
            || (pieces[1].starts_with('0') && pieces[1].len() > 1)
        {
            pieces[0].len().max(pieces[1].len())
        } else {
            0
        };
        return Some(BraceItem::NumberRange {
            start,
            end,
            step: step.abs().max(1),
            width,
        });
    }

    let sc: Vec<char> = pieces[0].chars().collect();
    let ec: Vec<char> = pieces[1].chars().collect();
    if sc.len() == 1 && ec.len() == 1 && sc[0].is_ascii_alphabetic() && ec[0].is_ascii_alphabetic() {
        return Some(BraceItem::CharRange {
            start: sc[0],
            end: ec[0],
            step: step.abs().max(1),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::WordPart;

    #[test]
    fn literal_word() {
        let word = parse_word("hello").unwrap();
        assert_eq!(word.parts, vec![WordPart::Literal("hello".into())]);
    }

    #[test]
    fn quotes_and_literals_mix() {
        let word = parse_word("a'b c'\"d $e\"").unwrap();
        assert_eq!(word.parts.len(), 3);
        assert!(matches!(&word.parts[1], WordPart::SingleQuoted(s) if s == "b c"));
        match &word.parts[2] {
            WordPart::DoubleQuoted(inner) => {
                assert!(matches!(&inner[0], WordPart::Literal(s) if s == "d "));
                assert!(matches!(&inner[1], WordPart::Parameter(p) if p.name == "e"));
            }
            other => panic!("expected double quoted, got {:?}", other),
        }
    }

    #[test]
    fn simple_parameter() {
        let word = parse_word("$HOME/bin").unwrap();
        assert!(matches!(&word.parts[0], WordPart::Parameter(p) if p.name == "HOME"));
        assert!(matches!(&word.parts[1], WordPart::Literal(s) if s == "/bin"));
    }

    #[test]
    fn special_parameters() {
        for name in ["?", "#", "@", "*", "$", "!", "-"] {
            let word = parse_word(&format!("${}", name)).unwrap();
            assert!(matches!(&word.parts[0], WordPart::Parameter(p) if p.name == name));
        }
    }

    #[test]
    fn braced_default() {
        let word = parse_word("${v:-fallback}").unwrap();
        match &word.parts[0] {
            WordPart::Parameter(p) => {
                assert_eq!(p.name, "v");
                assert!(matches!(
                    &p.operation,
                    Some(ParameterOperation::Default { check_empty: true, .. })
                ));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn braced_length_and_keys() {
        let word = parse_word("${#arr[@]}").unwrap();
        match &word.parts[0] {
            WordPart::Parameter(p) => {
                assert_eq!(p.name, "arr");
                assert!(matches!(p.subscript, Some(Subscript::All)));
                assert!(matches!(p.operation, Some(ParameterOperation::Length)));
            }
            other => panic!("{:?}", other),
        }
        let word = parse_word("${!arr[@]}").unwrap();
        match &word.parts[0] {
            WordPart::Parameter(p) => {
                assert!(matches!(p.operation, Some(ParameterOperation::Keys { star: false })));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn pattern_removal_ops() {
        let word = parse_word("${path##*/}").unwrap();
        match &word.parts[0] {
            WordPart::Parameter(p) => match &p.operation {
                Some(ParameterOperation::RemovePrefix { greedy, .. }) => assert!(*greedy),
                other => panic!("{:?}", other),
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn replacement_op() {
        let word = parse_word("${v/a b/c}").unwrap();
        match &word.parts[0] {
            WordPart::Parameter(p) => match &p.operation {
                Some(ParameterOperation::Replace { all, anchor, replacement, .. }) => {
                    assert!(!*all);
                    assert!(anchor.is_none());
                    assert!(replacement.is_some());
                }
                other => panic!("{:?}", other),
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn substring_op() {
        let word = parse_word("${v:1:2}").unwrap();
        match &word.parts[0] {
            WordPart::Parameter(p) => {
                assert!(matches!(
                    &p.operation,
                    Some(ParameterOperation::Substring { length: Some(_), .. })
                ));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn case_modification() {
        let word = parse_word("${v^^}").unwrap();
        match &word.parts[0] {
            WordPart::Parameter(p) => {
                assert!(matches!(
                    p.operation,
                    Some(ParameterOperation::CaseMod { upper: true, all: true, .. })
                ));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn command_substitution() {
        let word = parse_word("$(echo hi)").unwrap();
        assert!(matches!(&word.parts[0], WordPart::CommandSub(c) if !c.legacy));
        let word = parse_word("`echo hi`").unwrap();
        assert!(matches!(&word.parts[0], WordPart::CommandSub(c) if c.legacy));
    }

    #[test]
    fn arithmetic_expansion() {
        let word = parse_word("$((1 + 2))").unwrap();
        assert!(matches!(&word.parts[0], WordPart::ArithSub(_)));
    }

    #[test]
    fn process_substitution() {
        let word = parse_word("<(ls)").unwrap();
        assert!(matches!(
            &word.parts[0],
            WordPart::ProcessSub(p) if p.direction == ProcessSubDirection::Read
        ));
    }

    #[test]
    fn brace_list() {
        let word = parse_word("a{b,c}d").unwrap();
        assert!(matches!(&word.parts[1], WordPart::Brace(b) if b.items.len() == 2));
    }

    #[test]
    fn brace_range_with_step() {
        let word = parse_word("{1..10..2}").unwrap();
        match &word.parts[0] {
            WordPart::Brace(b) => {
                assert!(matches!(
                    b.items[0],
                    BraceItem::NumberRange { start: 1, end: 10, step: 2, .. }
                ));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn literal_braces_without_comma() {
        let word = parse_word("{abc}").unwrap();
        assert!(matches!(&word.parts[0], WordPart::Literal(_)));
    }

    #[test]
    fn tilde_forms() {
        let word = parse_word("~/x").unwrap();
        assert!(matches!(&word.parts[0], WordPart::Tilde(None)));
        let word = parse_word("~alice/x").unwrap();
        assert!(matches!(&word.parts[0], WordPart::Tilde(Some(u)) if u == "alice"));
        // Not at word start: literal.
        let word = parse_word("a~b").unwrap();
        assert!(matches!(&word.parts[0], WordPart::Literal(s) if s == "a~b"));
    }

    #[test]
    fn split_assignment_forms() {
        assert_eq!(
            split_assignment("FOO=bar"),
            Some(("FOO".into(), None, false, "bar".into()))
        );
        assert_eq!(
            split_assignment("FOO+=bar"),
            Some(("FOO".into(), None, true, "bar".into()))
        );
        assert_eq!(
            split_assignment("A[1]=x"),
            Some(("A".into(), Some("1".into()), false, "x".into()))
        );
        assert_eq!(split_assignment("notassign"), None);
    }

    #[test]
    fn array_elements_with_keys() {
        let elements = parse_array_elements("a b [5]=c").unwrap();
        assert_eq!(elements.len(), 3);
        assert!(elements[0].key.is_none());
        assert!(elements[2].key.is_some());
    }

    #[test]
    fn heredoc_text_expands_dollar_only() {
        let word = parse_heredoc_text("line $v 'not quoted'\n").unwrap();
        assert!(word
            .parts
            .iter()
            .any(|p| matches!(p, WordPart::Parameter(pp) if pp.name == "v")));
        // Single quotes stay literal in here-docs.
        assert!(word
            .parts
            .iter()
            .any(|p| matches!(p, WordPart::Literal(s) if s.contains("'not quoted'"))));
    }
}
