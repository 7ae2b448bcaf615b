//! `class:name` / `.name` - class list.
//!
//! The named form toggles one class on truthiness. The bare form accepts a
//! whitespace-separated string, an array of names, or a mapping of name to
//! flag.

use super::scalar_binding;
use crate::data::{Data, Value, resolve_binding};
use crate::dom::NodeId;
use crate::error::Result;
use crate::template::{Binding, Compiler};

/// Class names a collection value asks for, or `None` when it is not a
/// collection.
fn class_names(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(classes) => Some(classes.split_whitespace().map(String::from).collect()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter(|item| !item.is_nullish())
                .map(Value::to_display_string)
                .filter(|name| !name.is_empty())
                .collect(),
        ),
        Value::Map(map) => Some(
            map.iter()
                .filter(|(_, flag)| flag.is_truthy())
                .map(|(name, _)| name.clone())
                .collect(),
        ),
        _ => None,
    }
}

pub(super) fn bind(compiler: &Compiler, element: NodeId, name: &str, key: &str) -> Result<Vec<Binding>> {
    let document = compiler.document().clone();
    if !name.is_empty() {
        let class = name.to_string();
        return Ok(vec![scalar_binding(key, move |_, value| {
            if value.is_truthy() {
                document.add_class(element, &class);
            } else {
                document.remove_class(element, &class);
            }
        })]);
    }

    let key = key.to_string();
    let mut last: Option<Value> = None;
    let mut applied: Vec<String> = Vec::new();
    let binding: Binding = Box::new(move |data: &Data| {
        let value = resolve_binding(data, &key)?;
        if last.as_ref().is_some_and(|previous| previous.identical(&value)) {
            return Ok(None);
        }
        let wanted = class_names(&value).unwrap_or_default();
        for class in &wanted {
            document.add_class(element, class);
        }
        for class in applied.iter().filter(|class| !wanted.contains(class)) {
            document.remove_class(element, class);
        }
        applied = wanted;
        last = Some(value);
        Ok(None)
    });
    Ok(vec![binding])
}
