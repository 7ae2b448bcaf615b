//! `on:event` / `!event` - event listeners.
//!
//! Only `Handler` values attach. A replaced handler is detached first, and
//! an unchanged handler is never attached twice.

use super::{mapping_binding, scalar_binding};
use crate::data::Value;
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::template::{Binding, Compiler};

fn swap(document: &Document, element: NodeId, event: &str, previous: Option<&Value>, next: Option<&Value>) {
    if let Some(handler) = previous.and_then(Value::as_handler) {
        document.remove_event_listener(element, event, &handler.listener());
    }
    if let Some(handler) = next.and_then(Value::as_handler) {
        document.add_event_listener(element, event, handler.listener());
    }
}

pub(super) fn bind(compiler: &Compiler, element: NodeId, name: &str, key: &str) -> Result<Vec<Binding>> {
    let document = compiler.document().clone();
    if name.is_empty() {
        return Ok(vec![mapping_binding(key, move |event, previous, next| {
            swap(&document, element, event, previous, next);
        })]);
    }

    let event = name.to_string();
    Ok(vec![scalar_binding(key, move |previous, next| {
        swap(&document, element, &event, previous, Some(next));
    })])
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::data::{Handler, Value, data};
    use crate::directives::fixture::{compile, first_element};
    use crate::dom::Event;

    fn counter() -> (Rc<Cell<u32>>, Value) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let handler = Handler::new(move |_| count_clone.set(count_clone.get() + 1));
        (count, Value::Handler(handler))
    }

    #[test]
    fn test_handler_replaced_not_duplicated() {
        let (doc, fragment, mut binding) = compile("<button !click=\"onClick\">x</button>");
        let button = first_element(&doc, fragment);
        let (first_count, first) = counter();
        let (second_count, second) = counter();

        let _ = binding.update(&data(Value::map([("onClick", first.clone())]))).unwrap();
        let _ = binding.update(&data(Value::map([("onClick", first)]))).unwrap();
        assert_eq!(doc.listener_count(button, "click"), 1);

        let _ = binding.update(&data(Value::map([("onClick", second)]))).unwrap();
        doc.dispatch_event(button, Event::new("click"));
        assert_eq!(first_count.get(), 0);
        assert_eq!(second_count.get(), 1);
        assert_eq!(doc.listener_count(button, "click"), 1);

        let _ = binding.update(&data(Value::map([("onClick", Value::Null)]))).unwrap();
        assert_eq!(doc.listener_count(button, "click"), 0);
    }

    #[test]
    fn test_handler_mapping_diff() {
        let (doc, fragment, mut binding) = compile("<div on:=\"handlers\"></div>");
        let div = first_element(&doc, fragment);
        let (_, a) = counter();
        let (_, b) = counter();

        let both = Value::map([("focus", a.clone()), ("blur", b.clone())]);
        let _ = binding.update(&data(Value::map([("handlers", both)]))).unwrap();
        assert_eq!(doc.listener_count(div, "focus"), 1);
        assert_eq!(doc.listener_count(div, "blur"), 1);

        let one = Value::map([("blur", b)]);
        let _ = binding.update(&data(Value::map([("handlers", one)]))).unwrap();
        assert_eq!(doc.listener_count(div, "focus"), 0);
        assert_eq!(doc.listener_count(div, "blur"), 1);

        let _ = binding.update(&data(Value::map([("handlers", Value::Null)]))).unwrap();
        assert_eq!(doc.listener_count(div, "blur"), 0);
    }
}
