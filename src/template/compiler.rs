//! Template Compiler - one walk over a fragment, flattened bindings out.
//!
//! # Node handling
//!
//! - Element matching a tag directive (by tag or `directive` attribute):
//!   handed to the directive, subtree included.
//! - Other elements: attributes first (symbol run, then `prefix:`, then
//!   interpolation), children after.
//! - Text with `{{ }}`: replaced by static text nodes interleaved with empty
//!   dynamic ones. Text without it is left alone and costs nothing.
//!
//! Bindings come back in document order (depth first).

use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::binding::{Binding, TemplateBinding};
use super::interpolate::{Segment, has_interpolation, split};
use super::registry::{Registry, split_symbol};
use crate::data::{Data, resolve_binding};
use crate::dom::{Document, NodeId, NodeKind};
use crate::error::Result;

#[derive(Clone)]
pub struct Compiler {
    document: Document,
    registry: Rc<Registry>,
}

impl Compiler {
    pub fn new(document: Document, registry: Rc<Registry>) -> Self {
        Self { document, registry }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    /// Compile everything under `root`.
    pub fn generate_binding(&self, root: NodeId) -> Result<TemplateBinding> {
        let bindings = self.bind_children(root)?;
        debug!(?root, bindings = bindings.len(), "template compiled");
        Ok(TemplateBinding::new(bindings))
    }

    /// Compile each child of `parent`. The child list is captured up front
    /// since compiling rewrites the tree.
    pub fn bind_children(&self, parent: NodeId) -> Result<Vec<Binding>> {
        let mut bindings = Vec::new();
        for child in self.document.children(parent) {
            bindings.extend(self.bind_node(child)?);
        }
        Ok(bindings)
    }

    pub fn bind_node(&self, node: NodeId) -> Result<Vec<Binding>> {
        match self.document.kind(node) {
            NodeKind::Element => self.bind_element(node),
            NodeKind::Text => Ok(self.bind_text(node)),
            NodeKind::Fragment => self.bind_children(node),
            NodeKind::Comment => Ok(Vec::new()),
        }
    }

    fn bind_element(&self, element: NodeId) -> Result<Vec<Binding>> {
        let directive = self.registry.by_tag(&self.document.tag_name(element)).or_else(|| {
            self.document
                .attribute(element, "directive")
                .and_then(|name| self.registry.by_tag(&name))
        });
        if let Some(bind) = directive {
            trace!(tag = %self.document.tag_name(element), "tag directive");
            return bind(self, element);
        }

        let mut bindings = self.bind_attributes(element)?;
        bindings.extend(self.bind_children(element)?);
        Ok(bindings)
    }

    fn bind_attributes(&self, element: NodeId) -> Result<Vec<Binding>> {
        let mut bindings = Vec::new();
        for name in self.document.attribute_names(element) {
            let value = self.document.attribute(element, &name).unwrap_or_default();

            if let Some((symbol, rest)) = split_symbol(&name) {
                match self.registry.by_symbol(symbol) {
                    Some(bind) => {
                        self.document.remove_attribute(element, &name);
                        bindings.extend(bind(self, element, rest, value.trim())?);
                    }
                    None => warn!(%name, "no directive registered for symbol"),
                }
                continue;
            }

            if let Some((prefix, rest)) = name.split_once(':') {
                if let Some(bind) = self.registry.by_prefix(prefix) {
                    self.document.remove_attribute(element, &name);
                    bindings.extend(bind(self, element, rest, value.trim())?);
                    continue;
                }
            }

            if let Some(binding) = self.bind_attribute_interpolation(element, &name, &value) {
                bindings.push(binding);
            }
        }
        Ok(bindings)
    }

    fn bind_attribute_interpolation(&self, element: NodeId, name: &str, value: &str) -> Option<Binding> {
        if !has_interpolation(value) {
            return None;
        }
        let segments = split(value);
        let initial: String = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Static(text) => Some(text.as_str()),
                Segment::Dynamic(_) => None,
            })
            .collect();
        self.document.set_attribute(element, name, &initial);

        let document = self.document.clone();
        let name = name.to_string();
        let binding: Binding = Box::new(move |data: &Data| {
            let mut rendered = String::new();
            for segment in &segments {
                match segment {
                    Segment::Static(text) => rendered.push_str(text),
                    Segment::Dynamic(path) => {
                        rendered.push_str(&resolve_binding(data, path)?.to_display_string())
                    }
                }
            }
            if document.attribute(element, &name).as_deref() != Some(rendered.as_str()) {
                document.set_attribute(element, &name, &rendered);
            }
            Ok(None)
        });
        Some(binding)
    }

    fn bind_text(&self, node: NodeId) -> Vec<Binding> {
        let text = self.document.text(node);
        if !has_interpolation(&text) {
            return Vec::new();
        }
        let Some(parent) = self.document.parent(node) else {
            return Vec::new();
        };

        let replacement = self.document.create_fragment();
        let mut bindings: Vec<Binding> = Vec::new();
        for segment in split(&text) {
            match segment {
                Segment::Static(content) => {
                    let static_node = self.document.create_text(&content);
                    self.document.append_child(replacement, static_node);
                }
                Segment::Dynamic(path) => {
                    let bound = self.document.create_text("");
                    self.document.append_child(replacement, bound);
                    let document = self.document.clone();
                    bindings.push(Box::new(move |data: &Data| {
                        let value = resolve_binding(data, &path)?.to_display_string();
                        if document.text(bound) != value {
                            document.set_text(bound, &value);
                        }
                        Ok(None)
                    }));
                }
            }
        }
        self.document.replace_child(parent, replacement, node);
        self.document.release(node);
        self.document.release(replacement);
        bindings
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::data::{Computed, Value, data};
    use crate::directives::fixture::compile;
    use serde_json::json;

    #[test]
    fn test_static_markup_has_no_bindings() {
        let markup = "<div class=\"a\"><p>Hello <b>world</b></p><!-- c --></div>";
        let (document, fragment, binding) = compile(markup);
        assert!(binding.is_empty());
        assert_eq!(document.inner_html(fragment), markup);
    }

    #[test]
    fn test_text_interpolation() {
        let (document, fragment, mut binding) = compile("<p>Hello {{person}}</p>");
        let _ = binding.update(&data(json!({"person": "George"}))).unwrap();
        assert_eq!(document.inner_html(fragment), "<p>Hello George</p>");

        let _ = binding.update(&data(json!({"person": 0}))).unwrap();
        assert_eq!(document.inner_html(fragment), "<p>Hello 0</p>");

        let _ = binding.update(&data(json!({}))).unwrap();
        assert_eq!(document.inner_html(fragment), "<p>Hello </p>");
    }

    #[test]
    fn test_text_written_only_on_change() {
        let (document, _, mut binding) = compile("<p>{{a}} and {{b.c}}</p>");
        let snapshot = data(json!({"a": 1, "b": {"c": "x"}}));
        let _ = binding.update(&snapshot).unwrap();
        let before = document.mutation_count();
        let _ = binding.update(&data(json!({"a": 1, "b": {"c": "x"}}))).unwrap();
        assert_eq!(document.mutation_count(), before);
    }

    #[test]
    fn test_attribute_interpolation() {
        let (document, fragment, mut binding) =
            compile("<a href=\"/users/{{user.id}}/edit\" title=\"static\">x</a>");
        let link = document.first_child(fragment).unwrap();
        assert_eq!(document.attribute(link, "href").as_deref(), Some("/users//edit"));

        let _ = binding.update(&data(json!({"user": {"id": 7}}))).unwrap();
        assert_eq!(document.attribute(link, "href").as_deref(), Some("/users/7/edit"));
        assert_eq!(document.attribute(link, "title").as_deref(), Some("static"));
        assert_eq!(binding.len(), 1);
    }

    #[test]
    fn test_computed_values_receive_full_data() {
        let (document, fragment, mut binding) = compile("<span>{{ full }}</span>");
        let value = Value::map([
            ("first", Value::from("Ada")),
            ("last", Value::from("Lovelace")),
            (
                "full",
                Value::Computed(Computed::new(|scope| {
                    Ok(Value::from(format!(
                        "{} {}",
                        scope.resolve("first")?.to_display_string(),
                        scope.resolve("last")?.to_display_string()
                    )))
                })),
            ),
        ]);
        let _ = binding.update(&data(value)).unwrap();
        assert_eq!(document.text_content(fragment), "Ada Lovelace");
    }

    #[test]
    fn test_unknown_symbol_left_in_place() {
        let (document, fragment, binding) = compile("<div ~odd=\"x\"></div>");
        let div = document.first_child(fragment).unwrap();
        assert!(binding.is_empty());
        assert!(document.has_attribute(div, "~odd"));
    }

    #[test]
    fn test_bindings_run_in_document_order() {
        let (document, fragment, mut binding) =
            compile("<div title=\"{{a}}\"><span>{{b}}</span></div><p>{{c}}</p>");
        assert_eq!(binding.len(), 3);
        let _ = binding.update(&data(json!({"a": "A", "b": "B", "c": "C"}))).unwrap();
        assert_eq!(
            document.inner_html(fragment),
            "<div title=\"A\"><span>B</span></div><p>C</p>"
        );
    }
}
