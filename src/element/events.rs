//! Handlers that forward DOM events into transforms and actions.

use std::rc::Rc;

use tracing::warn;

use super::definition::HandlerFn;
use super::element::ReactiveElement;
use crate::data::Value;
use crate::dom::Event;

/// Builds a transform/action payload from the triggering event.
pub type PayloadFn = Rc<dyn Fn(&Event) -> Value>;

fn payload(event: &Event, from_event: Option<&PayloadFn>) -> Value {
    match from_event {
        Some(from_event) => from_event(event),
        None => Value::map(Vec::<(String, Value)>::new()),
    }
}

/// Handler running the transform `name` (the event type when `None`).
pub fn event_to_transform(name: Option<&str>, from_event: Option<PayloadFn>) -> HandlerFn {
    let name = name.map(String::from);
    Rc::new(move |event: &Event, element: &ReactiveElement| {
        let transform = name.as_deref().unwrap_or(event.kind.as_str());
        if let Err(err) = element.transform(transform, payload(event, from_event.as_ref())) {
            warn!(%err, "event transform failed");
        }
    })
}

/// Handler scheduling the action `name` (the event type when `None`).
pub fn event_to_action(name: Option<&str>, from_event: Option<PayloadFn>) -> HandlerFn {
    let name = name.map(String::from);
    Rc::new(move |event: &Event, element: &ReactiveElement| {
        let action = name.as_deref().unwrap_or(event.kind.as_str());
        if let Err(err) = element.action(action, payload(event, from_event.as_ref())) {
            warn!(%err, "event action failed");
        }
    })
}
