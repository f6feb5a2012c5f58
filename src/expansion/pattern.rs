//! Shell Pattern Matching
//!
//! Compiles shell glob patterns (`*`, `?`, `[...]`, POSIX classes, and the
//! extglob operators) to regexes for parameter operators, `case`, and
//! `[[ ]]`. Unclosed character classes fall back to a literal `[`; a
//! top-level `!(...)` is matched positively and inverted, since the regex
//! engine has no lookaround.

use std::collections::HashMap;

use regex_lite::RegexBuilder;

lazy_static::lazy_static! {
    static ref POSIX_CLASSES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("alnum", "a-zA-Z0-9");
        m.insert("alpha", "a-zA-Z");
        m.insert("ascii", "\\x00-\\x7F");
        m.insert("blank", " \\t");
        m.insert("cntrl", "\\x00-\\x1f\\x7f");
        m.insert("digit", "0-9");
        m.insert("graph", "!-~");
        m.insert("lower", "a-z");
        m.insert("print", " -~");
        m.insert("punct", "!-/:-@\\[-`{-~");
        m.insert("space", " \\t\\n\\r\\x0b\\x0c");
        m.insert("upper", "A-Z");
        m.insert("word", "a-zA-Z0-9_");
        m.insert("xdigit", "0-9A-Fa-f");
        m
    };
}

/// Options for pattern compilation and matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    pub extglob: bool,
    pub nocase: bool,
}

/// Convert a shell pattern into a regex fragment. `greedy` selects whether
/// `*` is greedy, which drives shortest/longest prefix and suffix removal.
pub fn pattern_to_regex(pattern: &str, greedy: bool, extglob: bool) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut regex = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if extglob
            && matches!(c, '@' | '*' | '+' | '?' | '!')
            && chars.get(i + 1) == Some(&'(')
        {
            if let Some(close) = find_matching_paren(&chars, i + 1) {
                let content: String = chars[i + 2..close].iter().collect();
                let alternatives = split_alternatives(&content);
                let alt_group = alternatives
                    .iter()
                    .map(|alt| pattern_to_regex(alt, greedy, extglob))
                    .collect::<Vec<_>>()
                    .join("|");
                match c {
                    '@' => regex.push_str(&format!("(?:{})", alt_group)),
                    '*' => regex.push_str(&format!("(?:{})*", alt_group)),
                    '+' => regex.push_str(&format!("(?:{})+", alt_group)),
                    '?' => regex.push_str(&format!("(?:{})?", alt_group)),
                    // No lookaround available: embedded negation matches
                    // like @(...); whole-pattern negation is inverted by
                    // match_pattern.
                    '!' => regex.push_str(&format!("(?:{})", alt_group)),
                    _ => {}
                }
                i = close + 1;
                continue;
            }
        }

        match c {
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    push_literal(&mut regex, next);
                    i += 2;
                } else {
                    regex.push_str("\\\\");
                    i += 1;
                }
            }
            '*' => {
                regex.push_str(if greedy { ".*" } else { ".*?" });
                i += 1;
            }
            '?' => {
                regex.push('.');
                i += 1;
            }
            '[' => match find_class_end(&chars, i) {
                Some(close) => {
                    let content: String = chars[i + 1..close].iter().collect();
                    regex.push_str(&convert_char_class(&content));
                    i = close + 1;
                }
                None => {
                    regex.push_str("\\[");
                    i += 1;
                }
            },
            _ => {
                push_literal(&mut regex, c);
                i += 1;
            }
        }
    }
    regex
}

fn push_literal(regex: &mut String, c: char) {
    if "\\^$.|?*+()[]{}".contains(c) {
        regex.push('\\');
    }
    regex.push(c);
}

fn find_matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 1;
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn split_alternatives(content: &str) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                current.push(c);
                if i + 1 < chars.len() {
                    i += 1;
                    current.push(chars[i]);
                }
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            '|' if depth == 0 => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
        i += 1;
    }
    out.push(current);
    out
}

/// `[` class end: a `]` directly after the opening (or after `!`/`^`) is a
/// literal member.
fn find_class_end(chars: &[char], open: usize) -> Option<usize> {
    let mut i = open + 1;
    if matches!(chars.get(i), Some('!') | Some('^')) {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() {
        match chars[i] {
            ']' => return Some(i),
            '[' if chars.get(i + 1) == Some(&':') => {
                // POSIX class; skip to :]
                let mut j = i + 2;
                while j + 1 < chars.len() {
                    if chars[j] == ':' && chars[j + 1] == ']' {
                        break;
                    }
                    j += 1;
                }
                i = j + 2;
            }
            _ => i += 1,
        }
    }
    None
}

fn convert_char_class(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::from("[");
    let mut i = 0;
    if matches!(chars.first(), Some('!') | Some('^')) {
        out.push('^');
        i = 1;
    }
    while i < chars.len() {
        let c = chars[i];
        if c == '[' && chars.get(i + 1) == Some(&':') {
            let mut j = i + 2;
            let mut name = String::new();
            while j + 1 < chars.len() && !(chars[j] == ':' && chars[j + 1] == ']') {
                name.push(chars[j]);
                j += 1;
            }
            if let Some(expansion) = POSIX_CLASSES.get(name.as_str()) {
                out.push_str(expansion);
            }
            i = j + 2;
            continue;
        }
        match c {
            '\\' => {
                out.push_str("\\\\");
            }
            '^' if i != 0 => out.push_str("\\^"),
            ']' => out.push_str("\\]"),
            _ => out.push(c),
        }
        i += 1;
    }
    out.push(']');
    out
}

/// Whether the whole string matches the shell pattern.
pub fn match_pattern(pattern: &str, text: &str, opts: MatchOptions) -> bool {
    // Whole-pattern negation: !(...)
    if opts.extglob && pattern.starts_with("!(") && pattern.ends_with(')') {
        let chars: Vec<char> = pattern.chars().collect();
        if find_matching_paren(&chars, 1) == Some(chars.len() - 1) {
            let inner: String = chars[2..chars.len() - 1].iter().collect();
            let positive = split_alternatives(&inner)
                .iter()
                .any(|alt| match_pattern(alt, text, opts));
            return !positive;
        }
    }
    let regex = format!("^(?:{})$", pattern_to_regex(pattern, true, opts.extglob));
    match RegexBuilder::new(&regex).case_insensitive(opts.nocase).build() {
        Ok(re) => re.is_match(text),
        Err(_) => pattern == text,
    }
}

/// Does the string contain an unescaped glob character?
pub fn has_glob_char(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '*' | '?' | '[' => return true,
            _ => i += 1,
        }
    }
    false
}

/// Escape glob-special characters so quoted text matches literally.
pub fn escape_glob_chars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Remove the escapes introduced by `escape_glob_chars` (quote removal).
pub fn unescape_glob_chars(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            out.push(chars[i + 1]);
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, text: &str) -> bool {
        match_pattern(pattern, text, MatchOptions::default())
    }

    #[test]
    fn star_and_question() {
        assert!(matches("*.txt", "file.txt"));
        assert!(!matches("*.txt", "file.tar"));
        assert!(matches("a?c", "abc"));
        assert!(!matches("a?c", "abbc"));
        assert!(matches("*", ""));
    }

    #[test]
    fn char_classes() {
        assert!(matches("[abc]", "b"));
        assert!(!matches("[abc]", "d"));
        assert!(matches("[a-z]*", "hello"));
        assert!(matches("[!0-9]", "x"));
        assert!(!matches("[!0-9]", "5"));
        assert!(matches("[]x]", "]"));
    }

    #[test]
    fn posix_classes() {
        assert!(matches("[[:digit:]][[:digit:]]", "42"));
        assert!(matches("[[:alpha:]]*", "word"));
        assert!(!matches("[[:digit:]]", "x"));
    }

    #[test]
    fn literal_specials_escaped() {
        assert!(matches("a.b", "a.b"));
        assert!(!matches("a.b", "aXb"));
        assert!(matches("a+b", "a+b"));
        assert!(matches("\\*", "*"));
        assert!(!matches("\\*", "x"));
    }

    #[test]
    fn unclosed_class_is_literal() {
        assert!(matches("a[b", "a[b"));
    }

    #[test]
    fn extglob_operators() {
        let opts = MatchOptions { extglob: true, nocase: false };
        assert!(match_pattern("@(foo|bar)", "foo", opts));
        assert!(!match_pattern("@(foo|bar)", "baz", opts));
        assert!(match_pattern("+(ab)", "abab", opts));
        assert!(!match_pattern("+(ab)", "", opts));
        assert!(match_pattern("?(x)y", "y", opts));
        assert!(match_pattern("*(a|b)c", "abbac", opts));
        assert!(match_pattern("!(foo)", "bar", opts));
        assert!(!match_pattern("!(foo)", "foo", opts));
    }

    #[test]
    fn nocase_matching() {
        let opts = MatchOptions { extglob: false, nocase: true };
        assert!(match_pattern("*.TXT", "file.txt", opts));
    }

    #[test]
    fn glob_char_detection() {
        assert!(has_glob_char("*.rs"));
        assert!(has_glob_char("a[bc]"));
        assert!(!has_glob_char("plain"));
        assert!(!has_glob_char("\\*escaped"));
    }

    #[test]
    fn escape_round_trip() {
        let original = "a*b?c[d]";
        let escaped = escape_glob_chars(original);
        assert!(!has_glob_char(&escaped));
        assert_eq!(unescape_glob_chars(&escaped), original);
    }
}
