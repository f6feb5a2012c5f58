//! Variable Scopes
//!
//! Dynamic scoping with an explicit stack of frames. The global frame lives
//! for the whole process; function entry pushes a frame, function exit pops
//! it. Lookup walks from the top; an `Unset` tombstone terminates the walk.
//!
//! Write rules (bash dynamic-scope semantics):
//! - `local`/`declare` inside a function writes the current frame.
//! - A bare assignment writes the nearest enclosing frame that already has
//!   a non-tombstone binding, else the global frame.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::core::errors::ExecError;
use crate::core::variables::{VarAttrs, VarValue, Variable};

/// One frame of the scope stack.
#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub name: String,
    pub vars: IndexMap<String, Variable>,
}

impl ScopeFrame {
    fn new(name: impl Into<String>) -> Self {
        ScopeFrame {
            name: name.into(),
            vars: IndexMap::new(),
        }
    }
}

/// The scope stack. Index 0 is always the global frame.
#[derive(Debug, Clone)]
pub struct ScopeManager {
    stack: Vec<ScopeFrame>,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    pub fn new() -> Self {
        ScopeManager {
            stack: vec![ScopeFrame::new("global")],
        }
    }

    pub fn push_scope(&mut self, name: impl Into<String>) {
        self.stack.push(ScopeFrame::new(name));
    }

    /// Pop the current frame, destroying its locals. The global frame is
    /// never popped.
    pub fn pop_scope(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn in_function(&self) -> bool {
        self.stack.len() > 1
    }

    /// Look a variable up through the scope chain. A tombstone hides any
    /// outer binding and reads as unset.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        for frame in self.stack.iter().rev() {
            if let Some(var) = frame.vars.get(name) {
                if var.value.is_unset() {
                    return None;
                }
                return Some(var);
            }
        }
        None
    }

    /// The scalar string value of a variable, if set.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.as_string())
    }

    /// Whether a readable binding exists.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Index of the frame a bare assignment to `name` targets.
    fn write_frame(&self, name: &str, local: bool) -> usize {
        let top = self.stack.len() - 1;
        if local {
            return top;
        }
        // A tombstone in the current frame is replaced in place.
        if self.stack[top].vars.get(name).map(|v| v.value.is_unset()) == Some(true) {
            return top;
        }
        for (idx, frame) in self.stack.iter().enumerate().rev() {
            if let Some(var) = frame.vars.get(name) {
                if var.value.is_unset() {
                    // Hidden by a tombstone: fall through to global.
                    break;
                }
                return idx;
            }
        }
        0
    }

    fn check_readonly(&self, name: &str) -> Result<(), ExecError> {
        if let Some(var) = self.get(name) {
            if var.attrs.readonly {
                return Err(ExecError::Readonly(name.to_string()));
            }
        }
        Ok(())
    }

    /// Assign a scalar value, honoring readonly and the case attributes.
    /// `local` forces the current frame (the `local`/`declare` path).
    pub fn set_scalar(
        &mut self,
        name: &str,
        value: impl Into<String>,
        local: bool,
    ) -> Result<(), ExecError> {
        self.check_readonly(name)?;
        let idx = self.write_frame(name, local);
        let value = value.into();
        if self.stack[idx].vars.contains_key(name) {
            let var = self.stack[idx].vars.get_mut(name).expect("checked above");
            let transformed = var.transform(&value);
            var.value = VarValue::Scalar(transformed);
        } else {
            self.stack[idx]
                .vars
                .insert(name.to_string(), Variable::scalar(value));
        }
        Ok(())
    }

    /// Append to a scalar (`name+=value`).
    pub fn append_scalar(
        &mut self,
        name: &str,
        value: &str,
        local: bool,
    ) -> Result<(), ExecError> {
        let current = self.get_string(name).unwrap_or_default();
        self.set_scalar(name, format!("{}{}", current, value), local)
    }

    /// Install or replace a whole variable in the write-target frame.
    pub fn set_var(&mut self, name: &str, var: Variable, local: bool) -> Result<(), ExecError> {
        self.check_readonly(name)?;
        let idx = self.write_frame(name, local);
        self.stack[idx].vars.insert(name.to_string(), var);
        Ok(())
    }

    /// Fetch a mutable reference to a visible binding, materializing it in
    /// its owning frame. Returns None when unset or tombstoned.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let mut idx = None;
        for (i, frame) in self.stack.iter().enumerate().rev() {
            if let Some(var) = frame.vars.get(name) {
                if var.value.is_unset() {
                    return None;
                }
                idx = Some(i);
                break;
            }
        }
        idx.map(move |i| self.stack[i].vars.get_mut(name).unwrap())
    }

    /// Set one element of an indexed array, auto-vivifying the array.
    pub fn set_index(
        &mut self,
        name: &str,
        index: i64,
        value: impl Into<String>,
    ) -> Result<(), ExecError> {
        self.check_readonly(name)?;
        let value = value.into();
        if let Some(var) = self.get_mut(name) {
            let value = var.transform(&value);
            match &mut var.value {
                VarValue::Indexed(map) => {
                    let index = if index < 0 {
                        let end = map.keys().next_back().map(|k| k + 1).unwrap_or(0);
                        end + index
                    } else {
                        index
                    };
                    map.insert(index, value);
                }
                VarValue::Assoc(map) => {
                    map.insert(index.to_string(), value);
                }
                VarValue::Scalar(s) => {
                    let mut map = BTreeMap::new();
                    if !s.is_empty() {
                        map.insert(0, s.clone());
                    }
                    map.insert(index, value);
                    var.value = VarValue::Indexed(map);
                }
                VarValue::Unset => unreachable!("get_mut filters tombstones"),
            }
            return Ok(());
        }
        let mut map = BTreeMap::new();
        map.insert(index.max(0), value);
        let var = Variable {
            value: VarValue::Indexed(map),
            attrs: VarAttrs::default(),
        };
        self.set_var(name, var, false)
    }

    /// Set one key of an associative array, auto-vivifying it.
    pub fn set_assoc(
        &mut self,
        name: &str,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), ExecError> {
        self.check_readonly(name)?;
        let value = value.into();
        if let Some(var) = self.get_mut(name) {
            let value = var.transform(&value);
            match &mut var.value {
                VarValue::Assoc(map) => {
                    map.insert(key.to_string(), value);
                    return Ok(());
                }
                VarValue::Indexed(_) | VarValue::Scalar(_) => {
                    return Err(ExecError::expansion(format!(
                        "{}: cannot assign associative key to non-associative variable",
                        name
                    )));
                }
                VarValue::Unset => unreachable!("get_mut filters tombstones"),
            }
        }
        let mut map = IndexMap::new();
        map.insert(key.to_string(), value);
        let var = Variable {
            value: VarValue::Assoc(map),
            attrs: VarAttrs::default(),
        };
        self.set_var(name, var, false)
    }

    /// Remove a variable. In a function, a binding visible from an outer
    /// frame is shadowed with a tombstone instead of touching the outer
    /// frame.
    pub fn unset(&mut self, name: &str) -> Result<(), ExecError> {
        self.check_readonly(name)?;
        let top = self.stack.len() - 1;
        if self.stack[top].vars.contains_key(name) {
            if top == 0 {
                self.stack[0].vars.shift_remove(name);
            } else {
                // Keep hiding outer bindings for the rest of the function.
                self.stack[top]
                    .vars
                    .insert(name.to_string(), Variable::tombstone());
            }
            return Ok(());
        }
        if top > 0 && self.get(name).is_some() {
            self.stack[top]
                .vars
                .insert(name.to_string(), Variable::tombstone());
            return Ok(());
        }
        self.stack[0].vars.shift_remove(name);
        Ok(())
    }

    /// Apply attributes to a variable, creating it (value-less) if needed.
    pub fn apply_attrs(
        &mut self,
        name: &str,
        attrs: VarAttrs,
        local: bool,
    ) -> Result<(), ExecError> {
        if attrs != VarAttrs::default() {
            // Adding readonly is allowed; everything else respects it.
            if !attrs.readonly {
                self.check_readonly(name)?;
            }
        }
        let idx = self.write_frame(name, local);
        if self.stack[idx].vars.contains_key(name) {
            self.stack[idx]
                .vars
                .get_mut(name)
                .expect("checked above")
                .attrs
                .merge(attrs);
            return Ok(());
        }
        if local {
            self.stack[idx].vars.insert(
                name.to_string(),
                Variable {
                    value: VarValue::Scalar(String::new()),
                    attrs,
                },
            );
            return Ok(());
        }
        if self.get(name).is_some() {
            if let Some(var) = self.get_mut(name) {
                var.attrs.merge(attrs);
            }
            return Ok(());
        }
        self.stack[0].vars.insert(
            name.to_string(),
            Variable {
                value: VarValue::Scalar(String::new()),
                attrs,
            },
        );
        Ok(())
    }

    /// Put a binding back exactly as it was (temporary-assignment restore;
    /// bypasses readonly on purpose).
    pub fn restore(&mut self, name: &str, old: Option<Variable>) {
        for frame in self.stack.iter_mut().rev() {
            if frame.vars.contains_key(name) {
                match old {
                    Some(var) => {
                        frame.vars.insert(name.to_string(), var);
                    }
                    None => {
                        frame.vars.shift_remove(name);
                    }
                }
                return;
            }
        }
        if let Some(var) = old {
            self.stack[0].vars.insert(name.to_string(), var);
        }
    }

    /// Names of set variables starting with `prefix`, sorted.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for frame in &self.stack {
            for (name, var) in &frame.vars {
                if name.starts_with(prefix) && !var.value.is_unset() && self.get(name).is_some() {
                    names.push(name.clone());
                }
            }
        }
        names.sort();
        names.dedup();
        names
    }

    /// All visible (name, variable) pairs, innermost binding winning.
    pub fn visible(&self) -> IndexMap<String, Variable> {
        let mut out: IndexMap<String, Variable> = IndexMap::new();
        for frame in &self.stack {
            for (name, var) in &frame.vars {
                out.insert(name.clone(), var.clone());
            }
        }
        out.retain(|_, v| !v.value.is_unset());
        out
    }

    /// The environment to hand to child processes: exported scalars (arrays
    /// export their element 0, matching bash).
    pub fn exported_env(&self) -> Vec<(String, String)> {
        self.visible()
            .into_iter()
            .filter(|(_, v)| v.attrs.exported)
            .map(|(name, var)| (name, var.as_string()))
            .collect()
    }

    /// Resolve a nameref chain to the final variable name.
    pub fn resolve_nameref(&self, name: &str) -> String {
        let mut current = name.to_string();
        for _ in 0..8 {
            match self.get(&current) {
                Some(var) if var.attrs.nameref => {
                    let target = var.as_string();
                    if target.is_empty() || target == current {
                        break;
                    }
                    current = target;
                }
                _ => break,
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_assignment_goes_global_from_function() {
        let mut scopes = ScopeManager::new();
        scopes.push_scope("f");
        scopes.set_scalar("x", "inner", false).unwrap();
        scopes.pop_scope();
        assert_eq!(scopes.get_string("x"), Some("inner".to_string()));
    }

    #[test]
    fn local_assignment_dies_with_scope() {
        let mut scopes = ScopeManager::new();
        scopes.set_scalar("x", "outer", false).unwrap();
        scopes.push_scope("f");
        scopes.set_scalar("x", "inner", true).unwrap();
        assert_eq!(scopes.get_string("x"), Some("inner".to_string()));
        scopes.pop_scope();
        assert_eq!(scopes.get_string("x"), Some("outer".to_string()));
    }

    #[test]
    fn bare_assignment_updates_enclosing_binding() {
        let mut scopes = ScopeManager::new();
        scopes.set_scalar("x", "outer", false).unwrap();
        scopes.push_scope("f");
        scopes.set_scalar("x", "changed", false).unwrap();
        scopes.pop_scope();
        assert_eq!(scopes.get_string("x"), Some("changed".to_string()));
    }

    #[test]
    fn tombstone_hides_outer_binding() {
        let mut scopes = ScopeManager::new();
        scopes.set_scalar("x", "outer", false).unwrap();
        scopes.push_scope("f");
        scopes.set_scalar("x", "inner", true).unwrap();
        scopes.unset("x").unwrap();
        assert_eq!(scopes.get("x"), None);
        // Assignment after unset lands in the function scope.
        scopes.set_scalar("x", "again", false).unwrap();
        assert_eq!(scopes.get_string("x"), Some("again".to_string()));
        scopes.pop_scope();
        assert_eq!(scopes.get_string("x"), Some("outer".to_string()));
    }

    #[test]
    fn unset_without_local_tombstones_in_function() {
        let mut scopes = ScopeManager::new();
        scopes.set_scalar("x", "outer", false).unwrap();
        scopes.push_scope("f");
        scopes.unset("x").unwrap();
        assert_eq!(scopes.get("x"), None);
        scopes.pop_scope();
        assert_eq!(scopes.get_string("x"), Some("outer".to_string()));
    }

    #[test]
    fn readonly_rejects_mutation_and_unset() {
        let mut scopes = ScopeManager::new();
        scopes.set_scalar("x", "v", false).unwrap();
        scopes
            .apply_attrs(
                "x",
                VarAttrs {
                    readonly: true,
                    ..Default::default()
                },
                false,
            )
            .unwrap();
        assert!(matches!(
            scopes.set_scalar("x", "w", false),
            Err(ExecError::Readonly(_))
        ));
        assert!(matches!(scopes.unset("x"), Err(ExecError::Readonly(_))));
        assert_eq!(scopes.get_string("x"), Some("v".to_string()));
    }

    #[test]
    fn index_assignment_auto_vivifies() {
        let mut scopes = ScopeManager::new();
        scopes.set_index("a", 2, "c").unwrap();
        let var = scopes.get("a").unwrap();
        assert!(matches!(var.value, VarValue::Indexed(_)));
        assert_eq!(var.index_get(2), Some("c".to_string()));
    }

    #[test]
    fn exported_env_contains_only_exports() {
        let mut scopes = ScopeManager::new();
        scopes.set_var("a", Variable::exported("1"), false).unwrap();
        scopes.set_scalar("b", "2", false).unwrap();
        let env = scopes.exported_env();
        assert!(env.contains(&("a".to_string(), "1".to_string())));
        assert!(!env.iter().any(|(n, _)| n == "b"));
    }

    #[test]
    fn nameref_resolution() {
        let mut scopes = ScopeManager::new();
        scopes.set_scalar("real", "42", false).unwrap();
        scopes.set_scalar("link", "real", false).unwrap();
        scopes
            .apply_attrs(
                "link",
                VarAttrs {
                    nameref: true,
                    ..Default::default()
                },
                false,
            )
            .unwrap();
        assert_eq!(scopes.resolve_nameref("link"), "real");
    }
}
