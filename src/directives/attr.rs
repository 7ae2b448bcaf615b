//! `attr:name` / `@name` - attributes.
//!
//! `undefined`, `null` and `false` remove the attribute, `true` sets it
//! empty, anything else sets its display string.

use super::{mapping_binding, scalar_binding};
use crate::data::Value;
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::template::{Binding, Compiler};
use crate::util::camel_to_kebab;

fn write(document: &Document, element: NodeId, name: &str, value: Option<&Value>) {
    let text = match value {
        None | Some(Value::Undefined | Value::Null | Value::Bool(false)) => {
            document.remove_attribute(element, name);
            return;
        }
        Some(Value::Bool(true)) => String::new(),
        Some(other) => other.to_display_string(),
    };
    if document.attribute(element, name).as_deref() != Some(text.as_str()) {
        document.set_attribute(element, name, &text);
    }
}

pub(super) fn bind(compiler: &Compiler, element: NodeId, name: &str, key: &str) -> Result<Vec<Binding>> {
    let document = compiler.document().clone();
    if name.is_empty() {
        return Ok(vec![mapping_binding(key, move |attribute, _, next| {
            write(&document, element, &camel_to_kebab(attribute), next);
        })]);
    }

    let name = name.to_string();
    Ok(vec![scalar_binding(key, move |_, value| {
        write(&document, element, &name, Some(value));
    })])
}
