//! Scopes - how bindings read data.
//!
//! A binding never sees a concrete data structure, only a [`Scope`]. Plain
//! values, the per-item scopes created by `for`, and the element view model
//! all implement it, so a binding compiled once works against any of them.

use std::rc::Rc;

use super::value::{Computed, Value};
use crate::error::Result;

/// Read access to named data.
pub trait Scope {
    /// Look up a top-level name. Missing names yield `Undefined`.
    fn lookup(&self, key: &str) -> Result<Value>;

    /// Resolve a dotted path: the first segment through [`Scope::lookup`],
    /// the rest by descending into the value.
    fn resolve(&self, path: &str) -> Result<Value> {
        let mut segments = path.split('.');
        let head = match segments.next() {
            Some(first) => self.lookup(first)?,
            None => Value::Undefined,
        };
        Ok(segments.fold(head, |current, segment| current.get(segment)))
    }
}

/// Shared handle to the data an update runs against.
pub type Data = Rc<dyn Scope>;

/// Wrap a plain value as update data.
pub fn data(value: impl Into<Value>) -> Data {
    Rc::new(value.into())
}

impl Scope for Value {
    fn lookup(&self, key: &str) -> Result<Value> {
        Ok(self.get(key))
    }
}

// =============================================================================
// Item scope
// =============================================================================

/// A parent scope with a few names layered on top.
///
/// Used by `for` to expose the current item and its index without copying
/// the parent data.
pub struct ItemScope {
    parent: Data,
    entries: Vec<(String, Value)>,
}

impl ItemScope {
    pub fn new(parent: Data) -> Self {
        Self {
            parent,
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.entries.push((name.into(), value));
        self
    }
}

impl Scope for ItemScope {
    fn lookup(&self, key: &str) -> Result<Value> {
        match self.entries.iter().rev().find(|(name, _)| name == key) {
            Some((_, value)) => Ok(value.clone()),
            None => self.parent.lookup(key),
        }
    }
}

// =============================================================================
// Binding values
// =============================================================================

/// A resolved binding value, tagged by how it produces its effective value.
pub enum BindingValue {
    Static(Value),
    Computed(Computed),
}

impl BindingValue {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Computed(computed) => BindingValue::Computed(computed),
            other => BindingValue::Static(other),
        }
    }

    /// The effective value: static values as-is, computed ones evaluated
    /// against the full scope.
    pub fn evaluate(self, scope: &dyn Scope) -> Result<Value> {
        match self {
            BindingValue::Static(value) => Ok(value),
            BindingValue::Computed(computed) => computed.call(scope),
        }
    }
}

/// Resolve `key` against `data` and evaluate it.
pub fn resolve_binding(data: &Data, key: &str) -> Result<Value> {
    BindingValue::classify(data.resolve(key)?).evaluate(data.as_ref())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_scope_shadows_parent() {
        let parent = data(Value::from(json!({"value": "outer", "title": "T"})));
        let scope = ItemScope::new(parent).with("value", Value::from("inner"));

        assert_eq!(scope.resolve("value").ok().and_then(|v| v.as_str().map(String::from)), Some("inner".into()));
        assert_eq!(scope.resolve("title").ok().and_then(|v| v.as_str().map(String::from)), Some("T".into()));
    }

    #[test]
    fn test_resolve_binding_evaluates_computed() {
        let value = Value::map([
            ("first", Value::from("Ada")),
            (
                "greeting",
                Value::Computed(Computed::new(|scope| {
                    let first = scope.resolve("first")?;
                    Ok(Value::from(format!("Hi {}", first.to_display_string())))
                })),
            ),
        ]);
        let data = data(value);
        let resolved = resolve_binding(&data, "greeting").ok();
        assert_eq!(resolved.and_then(|v| v.as_str().map(String::from)), Some("Hi Ada".into()));
    }
}
