//! `style:name` / `$name` - inline style properties.

use super::{mapping_binding, scalar_binding};
use crate::data::Value;
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::template::{Binding, Compiler};
use crate::util::camel_to_kebab;

fn write(document: &Document, element: NodeId, property: &str, value: Option<&Value>) {
    match value {
        None | Some(Value::Undefined | Value::Null | Value::Bool(false)) => {
            document.remove_style_property(element, property);
        }
        Some(value) => document.set_style_property(element, property, &value.to_display_string()),
    }
}

pub(super) fn bind(compiler: &Compiler, element: NodeId, name: &str, key: &str) -> Result<Vec<Binding>> {
    let document = compiler.document().clone();
    if name.is_empty() {
        return Ok(vec![mapping_binding(key, move |property, _, next| {
            write(&document, element, &camel_to_kebab(property), next);
        })]);
    }

    let property = camel_to_kebab(name);
    Ok(vec![scalar_binding(key, move |_, value| {
        write(&document, element, &property, Some(value));
    })])
}
