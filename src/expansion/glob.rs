//! Pathname Expansion
//!
//! Globbing over the filesystem with the shopt knobs: `dotglob`,
//! `nullglob`, `failglob`, `nocaseglob`, `globstar`. A field that matches
//! nothing stays literal unless nullglob/failglob say otherwise.

use glob::MatchOptions;

use crate::core::errors::ExecError;
use crate::core::options::ShoptOptions;
use crate::expansion::pattern::{has_glob_char, unescape_glob_chars};

/// The result of pathname expansion on one field.
pub enum GlobOutcome {
    /// Matches, already sorted.
    Matches(Vec<String>),
    /// No matches; the caller keeps the (quote-removed) literal field.
    Literal(String),
    /// No matches under nullglob: the field disappears.
    Dropped,
}

/// Expand one field against the filesystem. The field may carry backslash
/// escapes protecting quoted characters from matching.
pub fn expand_glob(field: &str, shopt: &ShoptOptions) -> Result<GlobOutcome, ExecError> {
    if !has_glob_char(field) {
        return Ok(GlobOutcome::Literal(unescape_glob_chars(field)));
    }
    // `**` only recurses under globstar; otherwise flatten it to `*`.
    let pattern = if shopt.globstar {
        translate_escapes(field)
    } else {
        flatten_globstar(&translate_escapes(field))
    };

    let options = MatchOptions {
        case_sensitive: !shopt.nocaseglob,
        require_literal_separator: true,
        require_literal_leading_dot: !shopt.dotglob,
    };

    let entries = match glob::glob_with(&pattern, options) {
        Ok(entries) => entries,
        Err(_) => return Ok(GlobOutcome::Literal(unescape_glob_chars(field))),
    };

    let mut matches: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|path| path.to_string_lossy().into_owned())
        .filter(|name| name != "." && name != "..")
        .collect();
    matches.sort();

    if matches.is_empty() {
        if shopt.failglob {
            return Err(ExecError::expansion(format!("no match: {}", unescape_glob_chars(field))));
        }
        if shopt.nullglob {
            return Ok(GlobOutcome::Dropped);
        }
        return Ok(GlobOutcome::Literal(unescape_glob_chars(field)));
    }
    Ok(GlobOutcome::Matches(matches))
}

/// The glob crate has no backslash escape; quoted pattern characters are
/// wrapped in single-member bracket classes instead.
fn translate_escapes(field: &str) -> String {
    let chars: Vec<char> = field.chars().collect();
    let mut out = String::with_capacity(field.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            let c = chars[i + 1];
            if matches!(c, '*' | '?' | '[' | ']') {
                out.push('[');
                out.push(c);
                out.push(']');
            } else {
                out.push(c);
            }
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn flatten_globstar(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' {
            out.push(chars[i]);
            if i + 1 < chars.len() {
                out.push(chars[i + 1]);
            }
            i += 2;
            continue;
        }
        if chars[i] == '*' {
            out.push('*');
            while i < chars.len() && chars[i] == '*' {
                i += 1;
            }
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn literal_when_no_glob_chars() {
        let shopt = ShoptOptions::default();
        match expand_glob("plain.txt", &shopt).unwrap() {
            GlobOutcome::Literal(s) => assert_eq!(s, "plain.txt"),
            _ => panic!("expected literal"),
        }
    }

    #[test]
    fn matches_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.log")).unwrap();
        File::create(dir.path().join("a.log")).unwrap();
        let pattern = format!("{}/*.log", dir.path().display());
        let shopt = ShoptOptions::default();
        match expand_glob(&pattern, &shopt).unwrap() {
            GlobOutcome::Matches(m) => {
                assert_eq!(m.len(), 2);
                assert!(m[0].ends_with("a.log"));
                assert!(m[1].ends_with("b.log"));
            }
            _ => panic!("expected matches"),
        }
    }

    #[test]
    fn dotfiles_hidden_without_dotglob() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        File::create(dir.path().join("shown")).unwrap();
        let pattern = format!("{}/*", dir.path().display());

        let shopt = ShoptOptions::default();
        match expand_glob(&pattern, &shopt).unwrap() {
            GlobOutcome::Matches(m) => assert_eq!(m.len(), 1),
            _ => panic!("expected matches"),
        }

        let shopt = ShoptOptions {
            dotglob: true,
            ..Default::default()
        };
        match expand_glob(&pattern, &shopt).unwrap() {
            GlobOutcome::Matches(m) => assert_eq!(m.len(), 2),
            _ => panic!("expected matches"),
        }
    }

    #[test]
    fn nullglob_drops_and_failglob_errors() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.nomatch", dir.path().display());

        let shopt = ShoptOptions {
            nullglob: true,
            ..Default::default()
        };
        assert!(matches!(
            expand_glob(&pattern, &shopt).unwrap(),
            GlobOutcome::Dropped
        ));

        let shopt = ShoptOptions {
            failglob: true,
            ..Default::default()
        };
        assert!(expand_glob(&pattern, &shopt).is_err());

        let shopt = ShoptOptions::default();
        assert!(matches!(
            expand_glob(&pattern, &shopt).unwrap(),
            GlobOutcome::Literal(_)
        ));
    }

    #[test]
    fn escaped_star_stays_literal() {
        let shopt = ShoptOptions::default();
        match expand_glob("a\\*b", &shopt).unwrap() {
            GlobOutcome::Literal(s) => assert_eq!(s, "a*b"),
            _ => panic!("expected literal"),
        }
    }
}
