//! `prop:name` / `#name` - element properties.

use super::{mapping_binding, scalar_binding};
use crate::data::Value;
use crate::dom::NodeId;
use crate::error::Result;
use crate::template::{Binding, Compiler};
use crate::util::kebab_to_camel;

pub(super) fn bind(compiler: &Compiler, element: NodeId, name: &str, key: &str) -> Result<Vec<Binding>> {
    let document = compiler.document().clone();
    if name.is_empty() {
        return Ok(vec![mapping_binding(key, move |prop, _, next| {
            let value = next.cloned().unwrap_or(Value::Undefined);
            document.set_property(element, &kebab_to_camel(prop), value);
        })]);
    }

    let prop = kebab_to_camel(name);
    Ok(vec![scalar_binding(key, move |_, value| {
        document.set_property(element, &prop, value.clone());
    })])
}

#[cfg(test)]
mod tests {
    use crate::data::data;
    use crate::directives::fixture::{compile, first_element};
    use serde_json::json;

    #[test]
    fn test_named_property() {
        let (doc, fragment, mut binding) = compile("<input #value=\"name\" prop:max-length=\"limit\">");
        let input = first_element(&doc, fragment);
        let _ = binding.update(&data(json!({"name": "Ada", "limit": 8}))).unwrap();

        assert_eq!(doc.property(input, "value").as_str(), Some("Ada"));
        assert_eq!(doc.property(input, "maxLength").as_f64(), Some(8.0));
        assert!(!doc.has_attribute(input, "#value"), "directive attribute consumed");
    }

    #[test]
    fn test_property_mapping_diff() {
        let (doc, fragment, mut binding) = compile("<div #=\"theProps\"></div>");
        let div = first_element(&doc, fragment);

        let _ = binding.update(&data(json!({"theProps": {"a": 1, "b": 2}}))).unwrap();
        assert_eq!(doc.property(div, "a").as_f64(), Some(1.0));
        assert_eq!(doc.property(div, "b").as_f64(), Some(2.0));

        let _ = binding.update(&data(json!({"theProps": {"b": 2}}))).unwrap();
        assert!(doc.property(div, "a").is_undefined());
        assert_eq!(doc.property(div, "b").as_f64(), Some(2.0));

        let _ = binding.update(&data(json!({"theProps": null}))).unwrap();
        assert!(doc.property(div, "b").is_undefined());
    }

    #[test]
    fn test_identical_value_skips_write() {
        let (doc, _, mut binding) = compile("<input #value=\"name\">");
        let snapshot = data(json!({"name": "Ada"}));
        let _ = binding.update(&snapshot).unwrap();
        let before = doc.mutation_count();
        let _ = binding.update(&data(json!({"name": "Ada"}))).unwrap();
        assert_eq!(doc.mutation_count(), before);
    }
}
