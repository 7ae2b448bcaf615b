//! `id:prefix="key"` - builds `id` from a static prefix and the value.
//!
//! Array values contribute every element; parts are joined with `-`.
//! `null` or `undefined` removes the attribute.

use super::scalar_binding;
use crate::data::Value;
use crate::dom::NodeId;
use crate::error::Result;
use crate::template::{Binding, Compiler};

fn build_id(prefix: &str, value: &Value) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if !prefix.is_empty() {
        parts.push(prefix.to_string());
    }
    match value {
        Value::Undefined | Value::Null => return None,
        Value::Array(items) => parts.extend(items.iter().map(Value::to_display_string)),
        other => parts.push(other.to_display_string()),
    }
    Some(parts.join("-"))
}

pub(super) fn bind(compiler: &Compiler, element: NodeId, name: &str, key: &str) -> Result<Vec<Binding>> {
    let document = compiler.document().clone();
    let prefix = name.to_string();
    let mut last: Option<String> = None;
    Ok(vec![scalar_binding(key, move |_, value| {
        let id = build_id(&prefix, value);
        if id == last {
            return;
        }
        match &id {
            Some(id) => document.set_attribute(element, "id", id),
            None => document.remove_attribute(element, "id"),
        }
        last = id;
    })])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::data;
    use crate::directives::fixture::{compile, first_element};
    use serde_json::json;

    #[test]
    fn test_build_id() {
        assert_eq!(build_id("row", &Value::from(3)), Some("row-3".to_string()));
        assert_eq!(build_id("", &Value::from("x")), Some("x".to_string()));
        assert_eq!(
            build_id("cell", &Value::array([Value::from(1), Value::from(2)])),
            Some("cell-1-2".to_string())
        );
        assert_eq!(build_id("row", &Value::Null), None);
    }

    #[test]
    fn test_id_directive() {
        let (doc, fragment, mut binding) = compile("<tr id:row=\"entry.id\"></tr>");
        let tr = first_element(&doc, fragment);

        let _ = binding.update(&data(json!({"entry": {"id": 12}}))).unwrap();
        assert_eq!(doc.attribute(tr, "id").as_deref(), Some("row-12"));

        let _ = binding.update(&data(json!({"entry": null}))).unwrap();
        assert!(!doc.has_attribute(tr, "id"));
    }
}
