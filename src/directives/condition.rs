//! `if` / `unless` - conditional content.
//!
//! # State machine
//!
//! ```text
//!  Hidden ──truthy──▶ Showing   run bindings, insert before marker, enter
//!  Showing ─falsy───▶ Hidden    exit, detach
//!  Showing ─truthy──▶ Showing   run bindings only
//! ```
//!
//! `unless` inverts the condition. The element form (`<if condition>`)
//! shows its children; the attribute form (`<li directive="if" condition>`)
//! shows a copy of the element itself.
//!
//! Every transition bumps a generation counter. An exit transition that
//! completes after the content was shown again leaves the nodes in place.

use std::cell::Cell;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use tracing::{debug, trace};

use super::animation::{self, AnimationConfig, IF_DEFAULT_DURATION};
use crate::data::{Data, resolve_binding};
use crate::dom::NodeId;
use crate::error::Result;
use crate::template::{Binding, Compiler, Pending};

pub(super) fn bind_if(compiler: &Compiler, element: NodeId) -> Result<Vec<Binding>> {
    bind_condition(compiler, element, false)
}

pub(super) fn bind_unless(compiler: &Compiler, element: NodeId) -> Result<Vec<Binding>> {
    bind_condition(compiler, element, true)
}

fn bind_condition(compiler: &Compiler, element: NodeId, inverted: bool) -> Result<Vec<Binding>> {
    let document = compiler.document().clone();
    let condition = document
        .attribute(element, "condition")
        .unwrap_or_default()
        .trim()
        .to_string();
    let config = AnimationConfig::from_element(&document, element, IF_DEFAULT_DURATION, false);

    let container = if document.has_attribute(element, "directive") {
        let holder = document.create_fragment();
        let copy = document.clone_node(element, true);
        document.remove_attribute(copy, "directive");
        document.remove_attribute(copy, "condition");
        document.append_child(holder, copy);
        holder
    } else {
        element
    };

    let mut content = compiler.generate_binding(container)?;
    let nodes = document.children(container);

    let keyword = if inverted { "unless" } else { "if" };
    let marker = document.create_comment(&format!("{keyword} {condition}"));
    if let Some(parent) = document.parent(element) {
        document.replace_child(parent, marker, element);
    }
    if container != element {
        document.release(element);
    }
    debug!(%condition, nodes = nodes.len(), bindings = content.len(), "{keyword} compiled");

    let showing = Rc::new(Cell::new(false));
    let generation = Rc::new(Cell::new(0u64));

    let binding: Binding = Box::new(move |data: &Data| {
        let truthy = resolve_binding(data, &condition)?.is_truthy() != inverted;
        let mut pending: Vec<Pending> = Vec::new();

        match (truthy, showing.get()) {
            (true, false) => {
                showing.set(true);
                generation.set(generation.get() + 1);
                pending.extend(content.update(data)?.into_pending());

                let Some(parent) = document.parent(marker) else {
                    trace!("marker detached, nothing to show");
                    return Ok(None);
                };
                for &node in &nodes {
                    document.insert_before(parent, node, Some(marker));
                }
                let entering: Vec<LocalBoxFuture<'static, ()>> = nodes
                    .iter()
                    .filter(|&&node| document.is_element(node))
                    .filter_map(|&node| animation::enter(&document, node, config.enter.as_ref()))
                    .collect();
                if !entering.is_empty() {
                    pending.push(Box::pin(join_all(entering).map(|_| Ok(()))));
                }
            }
            (false, true) => {
                showing.set(false);
                generation.set(generation.get() + 1);
                let current = generation.get();

                let mut exiting: Vec<LocalBoxFuture<'static, ()>> = Vec::new();
                for &node in &nodes {
                    if !document.is_element(node) {
                        document.remove(node);
                        continue;
                    }
                    let generation = generation.clone();
                    let still_hidden = move || generation.get() == current;
                    exiting.extend(animation::exit(&document, node, config.exit.as_ref(), still_hidden));
                }
                if !exiting.is_empty() {
                    pending.push(Box::pin(join_all(exiting).map(|_| Ok(()))));
                }
            }
            (true, true) => pending.extend(content.update(data)?.into_pending()),
            (false, false) => {}
        }

        Ok(match pending.len() {
            0 => None,
            1 => pending.pop(),
            _ => Some(Box::pin(join_all(pending).map(|results| results.into_iter().collect::<Result<()>>()))),
        })
    });
    Ok(vec![binding])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::data::data;
    use crate::directives::fixture::compile;
    use crate::dom::{Document, Event, Listener};
    use serde_json::json;

    fn record_events(doc: &Document, node: NodeId, log: &Rc<RefCell<Vec<String>>>) {
        for kind in ["entering", "entered", "exiting", "exited"] {
            let log = log.clone();
            let listener: Listener = Rc::new(move |event: &Event| log.borrow_mut().push(event.kind.clone()));
            doc.add_event_listener(node, kind, listener);
        }
    }

    #[test]
    fn test_if_shows_and_hides() {
        let (doc, fragment, mut binding) = compile("<div><if condition=\"show\"><p>{{msg}}</p></if></div>");
        assert_eq!(doc.inner_html(fragment), "<div><!--if show--></div>");

        let _ = binding.update(&data(json!({"show": true, "msg": "hi"}))).unwrap();
        assert_eq!(doc.inner_html(fragment), "<div><p>hi</p><!--if show--></div>");

        let _ = binding.update(&data(json!({"show": true, "msg": "again"}))).unwrap();
        assert_eq!(doc.inner_html(fragment), "<div><p>again</p><!--if show--></div>");

        let _ = binding.update(&data(json!({"show": false, "msg": "gone"}))).unwrap();
        assert_eq!(doc.inner_html(fragment), "<div><!--if show--></div>");
    }

    #[test]
    fn test_unless_inverts() {
        let (doc, fragment, mut binding) = compile("<unless condition=\"busy\"><b>idle</b></unless>");
        let _ = binding.update(&data(json!({"busy": false}))).unwrap();
        assert_eq!(doc.text_content(fragment), "idle");
        let _ = binding.update(&data(json!({"busy": 1}))).unwrap();
        assert_eq!(doc.text_content(fragment), "");
    }

    #[test]
    fn test_attribute_form_clones_element() {
        let (doc, fragment, mut binding) =
            compile("<ul><li directive=\"if\" condition=\"on\" class=\"x\">{{label}}</li></ul>");
        let _ = binding.update(&data(json!({"on": true, "label": "L"}))).unwrap();
        assert_eq!(doc.inner_html(fragment), "<ul><li class=\"x\">L</li><!--if on--></ul>");
    }

    #[test]
    fn test_unanimated_lifecycle_events() {
        let (doc, fragment, mut binding) = compile("<div><if condition=\"show\"><p>x</p></if></div>");
        let div = doc.first_child(fragment).unwrap();
        let _ = binding.update(&data(json!({"show": true}))).unwrap();
        let p = doc.first_child(div).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        record_events(&doc, p, &log);

        let _ = binding.update(&data(json!({"show": false}))).unwrap();
        let _ = binding.update(&data(json!({"show": true}))).unwrap();
        assert_eq!(*log.borrow(), vec!["exiting", "exited", "entering", "entered"]);
    }

    #[test]
    fn test_animated_exit_waits_for_timeline() {
        let (doc, fragment, mut binding) = compile(
            "<div><if condition=\"show\" animate exit-class=\"out\" animate-duration=\"100\"><p>x</p></if></div>",
        );
        let _ = binding.update(&data(json!({"show": true}))).unwrap();
        let render = binding.update(&data(json!({"show": false}))).unwrap();
        assert!(!render.is_settled());
        assert!(doc.inner_html(fragment).contains("<p class=\"out\">x</p>"));

        doc.advance(100.0);
        assert_eq!(doc.inner_html(fragment), "<div><!--if show--></div>");
    }

    #[test]
    fn test_stale_exit_keeps_reshown_content() {
        let (doc, fragment, mut binding) = compile(
            "<div><if condition=\"show\" animate animate-class=\"fade\"><p>x</p></if></div>",
        );
        let _ = binding.update(&data(json!({"show": true}))).unwrap();
        doc.advance(400.0);

        let _ = binding.update(&data(json!({"show": false}))).unwrap();
        doc.advance(100.0);
        let _ = binding.update(&data(json!({"show": true}))).unwrap();
        doc.advance(400.0);

        assert_eq!(doc.inner_html(fragment), "<div><p>x</p><!--if show--></div>");
    }
}
