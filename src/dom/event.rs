//! Events dispatched on document nodes.

use std::rc::Rc;

use super::document::NodeId;
use crate::data::Value;

/// Listener callback. Identity (the `Rc` allocation) is what
/// `remove_event_listener` matches on.
pub type Listener = Rc<dyn Fn(&Event)>;

/// Lifecycle events emitted by structural directives.
pub const ENTERING: &str = "entering";
pub const ENTERED: &str = "entered";
pub const EXITING: &str = "exiting";
pub const EXITED: &str = "exited";

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: String,
    /// Set by `Document::dispatch_event`.
    pub target: Option<NodeId>,
    pub detail: Value,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: None,
            detail: Value::Undefined,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}
