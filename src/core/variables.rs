//! Shell Variables
//!
//! Variable values and attributes. A variable is a value (scalar, indexed
//! array, or associative array) plus an orthogonal attribute set. The
//! `Unset` value kind is the tombstone a function scope uses to shadow an
//! outer binding after `unset`.

use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Attributes that can be attached to a variable, mirroring `declare` flags.
///
/// Array-ness is not an attribute here; it is carried by the value kind so
/// that matching on `VarValue` is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarAttrs {
    /// -r: rejects mutation and unset
    pub readonly: bool,
    /// -x: exported to child process environments
    pub exported: bool,
    /// -i: assignments evaluate the RHS as arithmetic
    pub integer: bool,
    /// -l: values are lowercased on assignment
    pub lowercase: bool,
    /// -u: values are uppercased on assignment
    pub uppercase: bool,
    /// -n: name reference; the value names the real variable
    pub nameref: bool,
    /// -t: function tracing
    pub trace: bool,
}

impl VarAttrs {
    /// Merge another attribute set into this one. Lowercase and uppercase
    /// are mutually exclusive; the newer one wins.
    pub fn merge(&mut self, other: VarAttrs) {
        if other.lowercase {
            self.lowercase = true;
            self.uppercase = false;
        }
        if other.uppercase {
            self.uppercase = true;
            self.lowercase = false;
        }
        self.readonly |= other.readonly;
        self.exported |= other.exported;
        self.integer |= other.integer;
        self.nameref |= other.nameref;
        self.trace |= other.trace;
    }

    /// Render as a `declare` flag string, e.g. `-irx`. Used by `declare -p`.
    pub fn flag_string(&self, value: &VarValue) -> String {
        let mut flags = String::new();
        match value {
            VarValue::Indexed(_) => flags.push('a'),
            VarValue::Assoc(_) => flags.push('A'),
            _ => {}
        }
        if self.integer {
            flags.push('i');
        }
        if self.lowercase {
            flags.push('l');
        }
        if self.nameref {
            flags.push('n');
        }
        if self.readonly {
            flags.push('r');
        }
        if self.trace {
            flags.push('t');
        }
        if self.uppercase {
            flags.push('u');
        }
        if self.exported {
            flags.push('x');
        }
        if flags.is_empty() {
            "--".to_string()
        } else {
            format!("-{}", flags)
        }
    }
}

/// The value half of a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Scalar(String),
    /// Sparse indexed array; BTreeMap keeps indices ordered.
    Indexed(BTreeMap<i64, String>),
    /// Associative array; IndexMap preserves insertion order.
    Assoc(IndexMap<String, String>),
    /// Tombstone left in a function scope by `unset`.
    Unset,
}

impl VarValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        VarValue::Scalar(value.into())
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, VarValue::Unset)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, VarValue::Indexed(_) | VarValue::Assoc(_))
    }
}

/// A named binding: value plus attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variable {
    pub value: VarValue,
    pub attrs: VarAttrs,
}

impl Default for VarValue {
    fn default() -> Self {
        VarValue::Scalar(String::new())
    }
}

impl Variable {
    pub fn scalar(value: impl Into<String>) -> Self {
        Variable {
            value: VarValue::Scalar(value.into()),
            attrs: VarAttrs::default(),
        }
    }

    pub fn exported(value: impl Into<String>) -> Self {
        Variable {
            value: VarValue::Scalar(value.into()),
            attrs: VarAttrs {
                exported: true,
                ..Default::default()
            },
        }
    }

    pub fn tombstone() -> Self {
        Variable {
            value: VarValue::Unset,
            attrs: VarAttrs::default(),
        }
    }

    /// The scalar view of the variable. Arrays decay to element 0, the way
    /// `$arr` reads in bash.
    pub fn as_string(&self) -> String {
        match &self.value {
            VarValue::Scalar(s) => s.clone(),
            VarValue::Indexed(map) => map.get(&0).cloned().unwrap_or_default(),
            VarValue::Assoc(map) => map.get("0").cloned().unwrap_or_default(),
            VarValue::Unset => String::new(),
        }
    }

    /// Number of defined elements for arrays, character length for scalars.
    pub fn length(&self) -> usize {
        match &self.value {
            VarValue::Scalar(s) => s.chars().count(),
            VarValue::Indexed(map) => map.len(),
            VarValue::Assoc(map) => map.len(),
            VarValue::Unset => 0,
        }
    }

    /// Apply the case-transforming attributes to a new value.
    pub fn transform(&self, value: &str) -> String {
        if self.attrs.lowercase {
            value.to_lowercase()
        } else if self.attrs.uppercase {
            value.to_uppercase()
        } else {
            value.to_string()
        }
    }

    /// All elements in order, as (key, value) pairs. Scalars appear as a
    /// single element with key "0".
    pub fn elements(&self) -> Vec<(String, String)> {
        match &self.value {
            VarValue::Scalar(s) => vec![("0".to_string(), s.clone())],
            VarValue::Indexed(map) => map
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            VarValue::Assoc(map) => {
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            }
            VarValue::Unset => vec![],
        }
    }

    /// Values only, in element order.
    pub fn element_values(&self) -> Vec<String> {
        self.elements().into_iter().map(|(_, v)| v).collect()
    }

    /// Read one element of an indexed array. Negative indices count from
    /// the logical end (one past the highest defined index).
    pub fn index_get(&self, index: i64) -> Option<String> {
        match &self.value {
            VarValue::Indexed(map) => {
                let index = if index < 0 {
                    let end = map.keys().next_back().map(|k| k + 1).unwrap_or(0);
                    end + index
                } else {
                    index
                };
                map.get(&index).cloned()
            }
            VarValue::Scalar(s) if index == 0 => Some(s.clone()),
            _ => None,
        }
    }

    /// The next index an append (`arr+=(x)`) would use.
    pub fn next_index(&self) -> i64 {
        match &self.value {
            VarValue::Indexed(map) => map.keys().next_back().map(|k| k + 1).unwrap_or(0),
            VarValue::Scalar(_) => 1,
            _ => 0,
        }
    }
}

/// Check whether a string is a valid shell identifier.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trip() {
        let var = Variable::scalar("hello");
        assert_eq!(var.as_string(), "hello");
        assert_eq!(var.length(), 5);
    }

    #[test]
    fn indexed_array_decay_and_length() {
        let mut map = BTreeMap::new();
        map.insert(0, "a".to_string());
        map.insert(5, "b".to_string());
        let var = Variable {
            value: VarValue::Indexed(map),
            attrs: VarAttrs::default(),
        };
        assert_eq!(var.as_string(), "a");
        assert_eq!(var.length(), 2);
        assert_eq!(var.next_index(), 6);
    }

    #[test]
    fn negative_index_reads_from_end() {
        let mut map = BTreeMap::new();
        map.insert(0, "a".to_string());
        map.insert(1, "b".to_string());
        map.insert(2, "c".to_string());
        let var = Variable {
            value: VarValue::Indexed(map),
            attrs: VarAttrs::default(),
        };
        assert_eq!(var.index_get(-1), Some("c".to_string()));
        assert_eq!(var.index_get(-3), Some("a".to_string()));
        assert_eq!(var.index_get(-4), None);
    }

    #[test]
    fn case_attrs_are_exclusive() {
        let mut attrs = VarAttrs {
            lowercase: true,
            ..Default::default()
        };
        attrs.merge(VarAttrs {
            uppercase: true,
            ..Default::default()
        });
        assert!(attrs.uppercase);
        assert!(!attrs.lowercase);
    }

    #[test]
    fn transform_applies_case() {
        let var = Variable {
            value: VarValue::Scalar(String::new()),
            attrs: VarAttrs {
                uppercase: true,
                ..Default::default()
            },
        };
        assert_eq!(var.transform("abc"), "ABC");
    }

    #[test]
    fn valid_names() {
        assert!(is_valid_name("foo"));
        assert!(is_valid_name("_x1"));
        assert!(!is_valid_name("1x"));
        assert!(!is_valid_name("a-b"));
        assert!(!is_valid_name(""));
    }
}
