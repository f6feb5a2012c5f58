//! Word Splitting
//!
//! IFS-driven field splitting over expanded word pieces. Each piece is
//! either text with split/quote flags or a forced field break (produced by
//! `"$@"` and `"${arr[@]}"`). Whitespace IFS characters coalesce;
//! non-whitespace IFS characters each delimit one field.

/// One expanded piece of a word, before field splitting.
#[derive(Debug, Clone)]
pub enum Piece {
    Text(Segment),
    /// Unconditional field boundary.
    Break,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub value: String,
    /// Subject to IFS splitting (unquoted expansion results).
    pub splittable: bool,
    /// Quoted text: never split, anchors empty fields.
    pub quoted: bool,
}

impl Segment {
    pub fn literal(value: impl Into<String>) -> Self {
        Segment {
            value: value.into(),
            splittable: false,
            quoted: false,
        }
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        Segment {
            value: value.into(),
            splittable: false,
            quoted: true,
        }
    }

    pub fn expansion(value: impl Into<String>) -> Self {
        Segment {
            value: value.into(),
            splittable: true,
            quoted: false,
        }
    }
}

/// Split one string by IFS. Whitespace IFS runs coalesce and leading or
/// trailing whitespace delimiters produce no empty fields; non-whitespace
/// IFS characters delimit exactly one field each.
pub fn split_by_ifs(value: &str, ifs: &str) -> SplitResult {
    if ifs.is_empty() {
        return SplitResult {
            fields: if value.is_empty() {
                vec![]
            } else {
                vec![value.to_string()]
            },
            leading_delimiter: false,
            trailing_delimiter: false,
        };
    }

    let ifs_white: Vec<char> = ifs.chars().filter(|c| c.is_whitespace()).collect();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut saw_field = false;
    let chars: Vec<char> = value.chars().collect();
    let leading_delimiter = chars.first().map(|c| ifs.contains(*c)) == Some(true);
    let trailing_delimiter = chars.last().map(|c| ifs.contains(*c)) == Some(true);

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if ifs.contains(c) {
            if ifs_white.contains(&c) {
                // Coalesce a whitespace run (plus at most one adjacent
                // non-whitespace delimiter).
                if saw_field || !current.is_empty() {
                    fields.push(std::mem::take(&mut current));
                }
                saw_field = false;
                while i < chars.len() && ifs_white.contains(&chars[i]) {
                    i += 1;
                }
                if i < chars.len() && ifs.contains(chars[i]) && !ifs_white.contains(&chars[i]) {
                    saw_field = true;
                    i += 1;
                    while i < chars.len() && ifs_white.contains(&chars[i]) {
                        i += 1;
                    }
                }
                continue;
            }
            // Non-whitespace delimiter: one field per occurrence.
            fields.push(std::mem::take(&mut current));
            saw_field = true;
            i += 1;
            while i < chars.len() && ifs_white.contains(&chars[i]) {
                i += 1;
            }
            continue;
        }
        current.push(c);
        saw_field = true;
        i += 1;
    }
    if !current.is_empty() {
        fields.push(current);
    }

    SplitResult {
        fields,
        leading_delimiter,
        trailing_delimiter,
    }
}

#[derive(Debug, Clone)]
pub struct SplitResult {
    pub fields: Vec<String>,
    pub leading_delimiter: bool,
    pub trailing_delimiter: bool,
}

/// Assemble the final fields of one word from its expanded pieces.
///
/// Quoted pieces concatenate without splitting; splittable pieces are
/// IFS-split, with the first fragment joining the current field and the
/// last fragment starting the next. A quoted empty piece anchors an empty
/// field; a word made only of unquoted empty expansions produces nothing.
pub fn split_fields(pieces: &[Piece], ifs: &str) -> Vec<String> {
    let any_splittable = pieces
        .iter()
        .any(|p| matches!(p, Piece::Text(s) if s.splittable));
    let any_break = pieces.iter().any(|p| matches!(p, Piece::Break));

    if !any_splittable && !any_break {
        let mut joined = String::new();
        let mut quoted = false;
        for piece in pieces {
            if let Piece::Text(segment) = piece {
                joined.push_str(&segment.value);
                quoted |= segment.quoted;
            }
        }
        if joined.is_empty() && !quoted {
            return vec![];
        }
        return vec![joined];
    }

    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_live = false; // current holds a real (possibly empty) field
    let mut pending_break = false;

    for piece in pieces {
        match piece {
            Piece::Break => {
                fields.push(std::mem::take(&mut current));
                current_live = false;
                pending_break = false;
            }
            Piece::Text(segment) if !segment.splittable => {
                if pending_break && (!segment.value.is_empty() || segment.quoted) {
                    if current_live {
                        fields.push(std::mem::take(&mut current));
                    }
                    current_live = false;
                    pending_break = false;
                }
                current.push_str(&segment.value);
                current_live = current_live || segment.quoted || !segment.value.is_empty();
            }
            Piece::Text(segment) => {
                let split = split_by_ifs(&segment.value, ifs);
                if split.leading_delimiter && current_live {
                    fields.push(std::mem::take(&mut current));
                    current_live = false;
                }
                if pending_break && !split.fields.is_empty() {
                    if current_live {
                        fields.push(std::mem::take(&mut current));
                    }
                    current_live = false;
                    pending_break = false;
                }
                match split.fields.len() {
                    0 => {
                        if split.trailing_delimiter {
                            pending_break = true;
                        }
                    }
                    1 => {
                        current.push_str(&split.fields[0]);
                        current_live = true;
                        pending_break = split.trailing_delimiter;
                    }
                    _ => {
                        current.push_str(&split.fields[0]);
                        fields.push(std::mem::take(&mut current));
                        for field in &split.fields[1..split.fields.len() - 1] {
                            fields.push(field.clone());
                        }
                        current = split.fields[split.fields.len() - 1].clone();
                        current_live = true;
                        pending_break = split.trailing_delimiter;
                    }
                }
            }
        }
    }
    if current_live {
        fields.push(current);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const WS: &str = " \t\n";

    #[test]
    fn whitespace_ifs_coalesces() {
        let r = split_by_ifs("  a   b  ", WS);
        assert_eq!(r.fields, vec!["a", "b"]);
        assert!(r.leading_delimiter);
        assert!(r.trailing_delimiter);
    }

    #[test]
    fn non_whitespace_ifs_delimits_each() {
        let r = split_by_ifs("a::b:", ":");
        assert_eq!(r.fields, vec!["a", "", "b"]);
        assert!(r.trailing_delimiter);
    }

    #[test]
    fn mixed_ifs() {
        let r = split_by_ifs("a : b", ": ");
        assert_eq!(r.fields, vec!["a", "b"]);
    }

    #[test]
    fn empty_ifs_no_split() {
        let r = split_by_ifs("a b c", "");
        assert_eq!(r.fields, vec!["a b c"]);
    }

    #[test]
    fn plain_literal_is_one_field() {
        let pieces = vec![Piece::Text(Segment::literal("a b"))];
        assert_eq!(split_fields(&pieces, WS), vec!["a b"]);
    }

    #[test]
    fn splittable_expansion_splits() {
        let pieces = vec![Piece::Text(Segment::expansion("a b c"))];
        assert_eq!(split_fields(&pieces, WS), vec!["a", "b", "c"]);
    }

    #[test]
    fn quoted_joins_with_adjacent_field() {
        // $a"$b" with a="1 2", b="3 4" -> ["1", "23 4"]
        let pieces = vec![
            Piece::Text(Segment::expansion("1 2")),
            Piece::Text(Segment::quoted("3 4")),
        ];
        assert_eq!(split_fields(&pieces, WS), vec!["1", "23 4"]);
    }

    #[test]
    fn two_expansions_join_across() {
        let pieces = vec![
            Piece::Text(Segment::expansion("1 2")),
            Piece::Text(Segment::expansion("3 4")),
        ];
        assert_eq!(split_fields(&pieces, WS), vec!["1", "23", "4"]);
    }

    #[test]
    fn empty_unquoted_expansion_vanishes() {
        let pieces = vec![Piece::Text(Segment::expansion(""))];
        assert!(split_fields(&pieces, WS).is_empty());
    }

    #[test]
    fn quoted_empty_survives() {
        let pieces = vec![Piece::Text(Segment::quoted(""))];
        assert_eq!(split_fields(&pieces, WS), vec![""]);
    }

    #[test]
    fn field_break_forces_boundary() {
        let pieces = vec![
            Piece::Text(Segment::quoted("a")),
            Piece::Break,
            Piece::Text(Segment::quoted("b")),
        ];
        assert_eq!(split_fields(&pieces, WS), vec!["a", "b"]);
    }

    #[test]
    fn trailing_delimiter_breaks_next_segment() {
        // "$x"y with x="a " then literal: "a " splits to ["a"] with a
        // trailing delimiter, so y starts a new field.
        let pieces = vec![
            Piece::Text(Segment::expansion("a ")),
            Piece::Text(Segment::literal("y")),
        ];
        assert_eq!(split_fields(&pieces, WS), vec!["a", "y"]);
    }

    #[test]
    fn splitting_already_split_fields_is_identity() {
        let fields = vec!["alpha".to_string(), "beta".to_string()];
        for field in &fields {
            let again = split_fields(
                &[Piece::Text(Segment::expansion(field.clone()))],
                WS,
            );
            assert_eq!(again, vec![field.clone()]);
        }
    }
}
