//! Brace Expansion
//!
//! The purely lexical first phase: one word containing brace parts becomes
//! the cartesian product of its alternatives. Number ranges honor step and
//! zero-padding; character ranges walk the ASCII alphabet.

use crate::ast::types::{BraceItem, WordNode, WordPart};

/// Expand every brace part in the word, producing the full product in
/// left-to-right order. Words without brace parts come back unchanged.
pub fn expand_braces(word: &WordNode) -> Vec<WordNode> {
    let position = word
        .parts
        .iter()
        .position(|p| matches!(p, WordPart::Brace(_)));
    let index = match position {
        Some(index) => index,
        None => return vec![word.clone()],
    };

    let brace = match &word.parts[index] {
        WordPart::Brace(brace) => brace,
        _ => unreachable!(),
    };

    let mut results = Vec::new();
    for alternative in brace_alternatives(&brace.items) {
        let mut parts = Vec::with_capacity(word.parts.len() + alternative.parts.len());
        parts.extend_from_slice(&word.parts[..index]);
        parts.extend(alternative.parts);
        parts.extend_from_slice(&word.parts[index + 1..]);
        // The remainder (and the spliced alternative) may hold more braces.
        results.extend(expand_braces(&WordNode { parts }));
    }
    results
}

fn brace_alternatives(items: &[BraceItem]) -> Vec<WordNode> {
    let mut out = Vec::new();
    for item in items {
        match item {
            BraceItem::Word(word) => out.push(word.clone()),
            BraceItem::NumberRange {
                start,
                end,
                step,
                width,
            } => {
                let mut n = *start;
                let ascending = start <= end;
                loop {
                    if ascending && n > *end || !ascending && n < *end {
                        break;
                    }
                    let text = if *width > 0 {
                        format!("{:0width$}", n, width = *width)
                    } else {
                        n.to_string()
                    };
                    out.push(WordNode::literal(text));
                    n = if ascending { n + step } else { n - step };
                }
            }
            BraceItem::CharRange { start, end, step } => {
                let (a, b) = (*start as i64, *end as i64);
                let ascending = a <= b;
                let mut c = a;
                loop {
                    if ascending && c > b || !ascending && c < b {
                        break;
                    }
                    if let Some(ch) = char::from_u32(c as u32) {
                        out.push(WordNode::literal(ch.to_string()));
                    }
                    c = if ascending { c + step } else { c - step };
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::word_parser::parse_word;

    fn expand_to_strings(text: &str) -> Vec<String> {
        expand_braces(&parse_word(text).unwrap())
            .iter()
            .map(|w| w.as_literal().unwrap())
            .collect()
    }

    #[test]
    fn simple_list() {
        assert_eq!(expand_to_strings("a{b,c}d"), vec!["abd", "acd"]);
    }

    #[test]
    fn numeric_range() {
        assert_eq!(expand_to_strings("{1..5}"), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(expand_to_strings("{5..1}"), vec!["5", "4", "3", "2", "1"]);
    }

    #[test]
    fn stepped_range() {
        assert_eq!(expand_to_strings("{1..10..2}"), vec!["1", "3", "5", "7", "9"]);
    }

    #[test]
    fn padded_range() {
        assert_eq!(expand_to_strings("{01..03}"), vec!["01", "02", "03"]);
    }

    #[test]
    fn char_range() {
        assert_eq!(expand_to_strings("{a..e}"), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn nested_braces() {
        assert_eq!(
            expand_to_strings("{a,b{c,d}}"),
            vec!["a", "bc", "bd"]
        );
    }

    #[test]
    fn product_of_two_braces() {
        assert_eq!(
            expand_to_strings("{a,b}{1,2}"),
            vec!["a1", "a2", "b1", "b2"]
        );
    }

    #[test]
    fn word_without_braces_unchanged() {
        assert_eq!(expand_to_strings("plain"), vec!["plain"]);
    }
}
