//! Document - arena-backed host DOM.
//!
//! Nodes are indices into a single arena owned by the document, much like
//! components are indices into parallel arrays elsewhere in the code base.
//! A `Document` is a cheap handle (`Rc` inside); clone it freely into
//! bindings and tasks.
//!
//! Detached nodes stay in the arena until [`Document::release`] frees them.
//! Freed slots are reused; a slot's generation changes on release so an
//! old id never reaches the new occupant. Reads through a stale id see an
//! empty detached node and writes are dropped.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use indexmap::IndexMap;
use tracing::{error, trace, warn};

use super::animation::Timeline;
use super::event::{Event, Listener};
use super::style::{StyleRule, parse_declarations, serialize_declarations};
use crate::data::Value;

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Default layout width for documents that never set one.
pub const DEFAULT_VIEWPORT_WIDTH: f32 = 800.0;

// =============================================================================
// Node storage
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Fragment,
}

pub(crate) struct NodeData {
    pub kind: NodeKind,
    /// Lowercase tag name for elements, empty otherwise.
    pub name: String,
    /// Character data for text and comment nodes.
    pub data: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: IndexMap<String, String>,
    pub properties: HashMap<String, Value>,
    pub listeners: Vec<(String, Listener)>,
}

impl NodeData {
    fn new(kind: NodeKind, name: &str, data: &str) -> Self {
        Self {
            kind,
            name: name.to_ascii_lowercase(),
            data: data.to_string(),
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            properties: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    /// What a stale id reads.
    fn vacant() -> Self {
        Self::new(NodeKind::Comment, "", "")
    }
}

pub(crate) struct Slot {
    generation: u32,
    data: NodeData,
}

pub(crate) struct DocumentState {
    pub nodes: Vec<Slot>,
    pub free: Vec<usize>,
    pub mutations: usize,
    pub stylesheet: Vec<StyleRule>,
    pub timeline: Timeline,
    pub viewport_width: f32,
}

impl DocumentState {
    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .map(|slot| &slot.data)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .map(|slot| &mut slot.data)
    }
}

// =============================================================================
// Document
// =============================================================================

#[derive(Clone)]
pub struct Document {
    state: Rc<RefCell<DocumentState>>,
    executor: Rc<RefCell<LocalPool>>,
    spawner: LocalSpawner,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            state: Rc::new(RefCell::new(DocumentState {
                nodes: Vec::new(),
                free: Vec::new(),
                mutations: 0,
                stylesheet: Vec::new(),
                timeline: Timeline::default(),
                viewport_width: DEFAULT_VIEWPORT_WIDTH,
            })),
            executor: Rc::new(RefCell::new(pool)),
            spawner,
        }
    }

    pub(crate) fn state(&self) -> Ref<'_, DocumentState> {
        self.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, DocumentState> {
        self.state.borrow_mut()
    }

    fn node<R>(&self, id: NodeId, f: impl FnOnce(&NodeData) -> R) -> R {
        let state = self.state.borrow();
        match state.get(id) {
            Some(node) => f(node),
            None => f(&NodeData::vacant()),
        }
    }

    fn node_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut NodeData) -> R) -> R {
        let mut state = self.state.borrow_mut();
        let DocumentState { nodes, mutations, .. } = &mut *state;
        match nodes
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
        {
            Some(slot) => {
                *mutations += 1;
                f(&mut slot.data)
            }
            None => {
                trace!(?id, "write to released node dropped");
                f(&mut NodeData::vacant())
            }
        }
    }

    fn push_node(&self, data: NodeData) -> NodeId {
        let mut state = self.state.borrow_mut();
        if let Some(index) = state.free.pop() {
            if let Some(slot) = state.nodes.get_mut(index) {
                slot.data = data;
                return NodeId { index, generation: slot.generation };
            }
        }
        state.nodes.push(Slot { generation: 0, data });
        NodeId { index: state.nodes.len() - 1, generation: 0 }
    }

    /// Nodes currently allocated, attached or not.
    pub fn node_count(&self) -> usize {
        let state = self.state.borrow();
        state.nodes.len() - state.free.len()
    }

    /// Detach `id` and free it along with its whole subtree.
    ///
    /// Listeners and properties go with the nodes, and animations on them
    /// resolve as cancelled and leave the timeline.
    pub fn release(&self, id: NodeId) {
        self.remove(id);
        let mut freed = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            stack.extend(self.children(node));
            freed.push(node);
        }

        let mut dropped = Vec::with_capacity(freed.len());
        {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            for node in &freed {
                let Some(slot) = state
                    .nodes
                    .get_mut(node.index)
                    .filter(|slot| slot.generation == node.generation)
                else {
                    continue;
                };
                slot.generation = slot.generation.wrapping_add(1);
                dropped.push(std::mem::replace(&mut slot.data, NodeData::vacant()));
                state.free.push(node.index);
            }
            state.timeline.forget(&freed);
        }
        trace!(?id, nodes = dropped.len(), "subtree released");
    }

    /// Number of DOM writes performed so far.
    ///
    /// Bindings are expected to skip redundant writes; tests compare this
    /// counter before and after an update.
    pub fn mutation_count(&self) -> usize {
        self.state.borrow().mutations
    }

    pub fn set_viewport_width(&self, width: f32) {
        self.state.borrow_mut().viewport_width = width;
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.push_node(NodeData::new(NodeKind::Element, tag, ""))
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.push_node(NodeData::new(NodeKind::Text, "", text))
    }

    pub fn create_comment(&self, text: &str) -> NodeId {
        self.push_node(NodeData::new(NodeKind::Comment, "", text))
    }

    pub fn create_fragment(&self) -> NodeId {
        self.push_node(NodeData::new(NodeKind::Fragment, "", ""))
    }

    /// Copy a node. Attributes and character data are copied; properties
    /// and listeners are not.
    pub fn clone_node(&self, id: NodeId, deep: bool) -> NodeId {
        let (mut copy, children) = self.node(id, |node| {
            let mut copy = NodeData::new(node.kind, &node.name, &node.data);
            copy.attributes = node.attributes.clone();
            (copy, node.children.clone())
        });
        copy.parent = None;
        let clone = self.push_node(copy);
        if deep {
            for child in children {
                let child_clone = self.clone_node(child, true);
                self.attach(clone, child_clone, None);
            }
        }
        clone
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id, |node| node.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Element
    }

    /// Uppercase tag name, as the DOM reports it.
    pub fn tag_name(&self, id: NodeId) -> String {
        self.node(id, |node| node.name.to_ascii_uppercase())
    }

    pub fn local_name(&self, id: NodeId) -> String {
        self.node(id, |node| node.name.clone())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id, |node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id, |node| node.children.clone())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id, |node| node.children.first().copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.node(parent, |node| {
            let position = node.children.iter().position(|&child| child == id)?;
            node.children.get(position + 1).copied()
        })
    }

    /// Topmost ancestor (the node itself when detached).
    pub fn root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    // -------------------------------------------------------------------------
    // Tree mutation
    // -------------------------------------------------------------------------

    fn detach(&self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        let mut state = self.state.borrow_mut();
        if let Some(node) = state.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = state.get_mut(child) {
            node.parent = None;
        }
    }

    fn attach(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        let mut state = self.state.borrow_mut();
        if state.get(child).is_none() {
            warn!(?parent, ?child, "released node cannot be inserted");
            return;
        }
        let Some(siblings) = state.get_mut(parent).map(|node| &mut node.children) else {
            warn!(?parent, ?child, "insert into released node ignored");
            return;
        };
        let position = reference.and_then(|r| siblings.iter().position(|&c| c == r));
        if reference.is_some() && position.is_none() {
            warn!(?parent, ?reference, "reference node is not a child, appending");
        }
        match position {
            Some(index) => siblings.insert(index, child),
            None => siblings.push(child),
        }
        if let Some(node) = state.get_mut(child) {
            node.parent = Some(parent);
        }
        state.mutations += 1;
    }

    /// Insert `child` before `reference` (append when `None`).
    ///
    /// A fragment is consumed: its children move instead of it.
    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if Some(child) == reference {
            return;
        }
        if self.kind(child) == NodeKind::Fragment {
            for grandchild in self.children(child) {
                self.attach(parent, grandchild, reference);
            }
        } else {
            self.attach(parent, child, reference);
        }
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Detach a node from its parent.
    pub fn remove(&self, child: NodeId) {
        if self.parent(child).is_some() {
            self.detach(child);
            self.state.borrow_mut().mutations += 1;
        }
    }

    pub fn replace_child(&self, parent: NodeId, new_child: NodeId, old_child: NodeId) {
        self.insert_before(parent, new_child, Some(old_child));
        self.remove(old_child);
    }

    // -------------------------------------------------------------------------
    // Character data
    // -------------------------------------------------------------------------

    /// Data of a text or comment node.
    pub fn text(&self, id: NodeId) -> String {
        self.node(id, |node| node.data.clone())
    }

    pub fn set_text(&self, id: NodeId, text: &str) {
        self.node_mut(id, |node| node.data = text.to_string());
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text => self.text(id),
            NodeKind::Comment => String::new(),
            _ => self
                .children(id)
                .into_iter()
                .map(|child| self.text_content(child))
                .collect(),
        }
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.node(id, |node| node.attributes.get(name).cloned())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.node(id, |node| node.attributes.contains_key(name))
    }

    pub fn attribute_names(&self, id: NodeId) -> Vec<String> {
        self.node(id, |node| node.attributes.keys().cloned().collect())
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) {
        self.node_mut(id, |node| {
            node.attributes.insert(name.to_string(), value.to_string());
        });
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) {
        if self.has_attribute(id, name) {
            self.node_mut(id, |node| {
                node.attributes.shift_remove(name);
            });
        }
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    pub fn property(&self, id: NodeId, name: &str) -> Value {
        self.node(id, |node| node.properties.get(name).cloned().unwrap_or_default())
    }

    /// Setting `Undefined` clears the property.
    pub fn set_property(&self, id: NodeId, name: &str, value: Value) {
        self.node_mut(id, |node| {
            if value.is_undefined() {
                node.properties.remove(name);
            } else {
                node.properties.insert(name.to_string(), value);
            }
        });
    }

    // -------------------------------------------------------------------------
    // Class list
    // -------------------------------------------------------------------------

    pub fn class_list(&self, id: NodeId) -> Vec<String> {
        self.attribute(id, "class")
            .map(|classes| classes.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_list(id).iter().any(|c| c == class)
    }

    pub fn add_class(&self, id: NodeId, class: &str) {
        let mut classes = self.class_list(id);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.set_attribute(id, "class", &classes.join(" "));
        }
    }

    pub fn remove_class(&self, id: NodeId, class: &str) {
        let mut classes = self.class_list(id);
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.is_empty() {
            self.remove_attribute(id, "class");
        } else if classes.len() != before {
            self.set_attribute(id, "class", &classes.join(" "));
        }
    }

    // -------------------------------------------------------------------------
    // Inline style
    // -------------------------------------------------------------------------

    pub fn inline_style(&self, id: NodeId) -> IndexMap<String, String> {
        self.attribute(id, "style")
            .map(|style| parse_declarations(&style))
            .unwrap_or_default()
    }

    pub fn style_property(&self, id: NodeId, name: &str) -> Option<String> {
        self.inline_style(id).get(name).cloned()
    }

    pub fn set_style_property(&self, id: NodeId, name: &str, value: &str) {
        let mut style = self.inline_style(id);
        style.insert(name.to_string(), value.to_string());
        self.set_attribute(id, "style", &serialize_declarations(&style));
    }

    pub fn remove_style_property(&self, id: NodeId, name: &str) {
        let mut style = self.inline_style(id);
        if style.shift_remove(name).is_some() {
            if style.is_empty() {
                self.remove_attribute(id, "style");
            } else {
                self.set_attribute(id, "style", &serialize_declarations(&style));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Attach a listener. The same listener is never attached twice for
    /// one event type.
    pub fn add_event_listener(&self, id: NodeId, kind: &str, listener: Listener) {
        let already = self.node(id, |node| {
            node.listeners
                .iter()
                .any(|(k, l)| k == kind && Rc::ptr_eq(l, &listener))
        });
        if !already {
            self.node_mut(id, |node| node.listeners.push((kind.to_string(), listener)));
        }
    }

    pub fn remove_event_listener(&self, id: NodeId, kind: &str, listener: &Listener) {
        let present = self.node(id, |node| {
            node.listeners
                .iter()
                .any(|(k, l)| k == kind && Rc::ptr_eq(l, listener))
        });
        if present {
            self.node_mut(id, |node| {
                node.listeners
                    .retain(|(k, l)| !(k == kind && Rc::ptr_eq(l, listener)))
            });
        }
    }

    pub fn listener_count(&self, id: NodeId, kind: &str) -> usize {
        self.node(id, |node| node.listeners.iter().filter(|(k, _)| k == kind).count())
    }

    /// Call every listener registered for the event's type on `target`.
    pub fn dispatch_event(&self, target: NodeId, mut event: Event) {
        event.target = Some(target);
        let listeners: Vec<Listener> = self.node(target, |node| {
            node.listeners
                .iter()
                .filter(|(k, _)| *k == event.kind)
                .map(|(_, l)| l.clone())
                .collect()
        });
        trace!(kind = %event.kind, ?target, count = listeners.len(), "dispatch");
        for listener in listeners {
            listener(&event);
        }
    }

    // -------------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------------

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text => out.push_str(&escape_text(&self.text(id))),
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&self.text(id));
                out.push_str("-->");
            }
            NodeKind::Fragment => out.push_str(&self.inner_html(id)),
            NodeKind::Element => {
                let name = self.local_name(id);
                out.push('<');
                out.push_str(&name);
                let attributes = self.node(id, |node| node.attributes.clone());
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(&key);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
        }
    }

    // -------------------------------------------------------------------------
    // Executor
    // -------------------------------------------------------------------------

    /// Queue a task on the document's cooperative executor.
    pub fn spawn_local(&self, future: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.spawner.spawn_local(future) {
            error!(%err, "failed to spawn task");
        }
    }

    /// Queue a task and return a future for its output.
    ///
    /// The task runs whether or not the returned future is polled; the
    /// future yields `None` if the task is dropped unfinished.
    pub fn spawn_tracked<T: 'static>(
        &self,
        future: impl Future<Output = T> + 'static,
    ) -> LocalBoxFuture<'static, Option<T>> {
        let (sender, receiver) = oneshot::channel();
        self.spawn_local(async move {
            let _ = sender.send(future.await);
        });
        Box::pin(async move { receiver.await.ok() })
    }

    /// Run queued tasks until none can make progress.
    pub fn run_until_stalled(&self) {
        match self.executor.try_borrow_mut() {
            Ok(mut pool) => pool.run_until_stalled(),
            Err(_) => trace!("executor already running"),
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_insert_before_and_siblings() {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        doc.append_child(ul, b);
        doc.insert_before(ul, a, Some(b));

        assert_eq!(doc.children(ul), vec![a, b]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.next_sibling(b), None);
        assert_eq!(doc.parent(a), Some(ul));
    }

    #[test]
    fn test_fragment_insert_moves_children() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let frag = doc.create_fragment();
        let t1 = doc.create_text("a");
        let t2 = doc.create_text("b");
        doc.append_child(frag, t1);
        doc.append_child(frag, t2);

        doc.append_child(div, frag);
        assert_eq!(doc.children(div), vec![t1, t2]);
        assert!(doc.children(frag).is_empty());
    }

    #[test]
    fn test_moving_node_detaches_from_old_parent() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(a, child);
        doc.append_child(b, child);
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), vec![child]);
    }

    #[test]
    fn test_class_list_and_style() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.add_class(el, "a");
        doc.add_class(el, "b");
        doc.add_class(el, "a");
        assert_eq!(doc.attribute(el, "class").as_deref(), Some("a b"));
        doc.remove_class(el, "a");
        assert_eq!(doc.class_list(el), vec!["b".to_string()]);
        doc.remove_class(el, "b");
        assert!(!doc.has_attribute(el, "class"));

        doc.set_style_property(el, "color", "red");
        doc.set_style_property(el, "font-size", "12px");
        assert_eq!(doc.style_property(el, "color").as_deref(), Some("red"));
        doc.remove_style_property(el, "color");
        assert_eq!(doc.attribute(el, "style").as_deref(), Some("font-size: 12px"));
        doc.remove_style_property(el, "font-size");
        assert!(!doc.has_attribute(el, "style"));
    }

    #[test]
    fn test_listeners_are_not_attached_twice() {
        let doc = Document::new();
        let el = doc.create_element("button");
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let listener: Listener = Rc::new(move |_| calls_clone.set(calls_clone.get() + 1));

        doc.add_event_listener(el, "click", listener.clone());
        doc.add_event_listener(el, "click", listener.clone());
        doc.dispatch_event(el, Event::new("click"));
        assert_eq!(calls.get(), 1);

        doc.remove_event_listener(el, "click", &listener);
        doc.dispatch_event(el, Event::new("click"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_clone_node_deep() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "id", "x");
        doc.set_property(div, "secret", Value::from(1));
        let text = doc.create_text("hi");
        doc.append_child(div, text);

        let copy = doc.clone_node(div, true);
        assert_ne!(copy, div);
        assert_eq!(doc.outer_html(copy), "<div id=\"x\">hi</div>");
        assert!(doc.property(copy, "secret").is_undefined());
    }

    #[test]
    fn test_serialization_escapes() {
        let doc = Document::new();
        let p = doc.create_element("p");
        doc.set_attribute(p, "title", "a \"b\"");
        let text = doc.create_text("1 < 2 & 3");
        doc.append_child(p, text);
        let br = doc.create_element("br");
        doc.append_child(p, br);
        assert_eq!(
            doc.outer_html(p),
            "<p title=\"a &quot;b&quot;\">1 &lt; 2 &amp; 3<br></p>"
        );
    }

    #[test]
    fn test_spawned_tasks_run_when_drained() {
        let doc = Document::new();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        doc.spawn_local(async move { ran_clone.set(true) });
        assert!(!ran.get(), "spawned work is deferred");
        doc.run_until_stalled();
        assert!(ran.get());
    }

    #[test]
    fn test_release_frees_subtree_and_reuses_slots() {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        let li = doc.create_element("li");
        let text = doc.create_text("x");
        doc.append_child(li, text);
        doc.append_child(ul, li);
        let listener: Listener = Rc::new(|_: &Event| {});
        doc.add_event_listener(li, "click", listener);
        assert_eq!(doc.node_count(), 3);

        doc.release(li);
        assert_eq!(doc.node_count(), 1);
        assert!(doc.children(ul).is_empty());

        let reused = doc.create_element("p");
        assert_eq!(doc.node_count(), 2);
        assert_ne!(reused, li);
        assert_ne!(reused, text);
        assert_eq!(doc.listener_count(li, "click"), 0);
    }

    #[test]
    fn test_stale_ids_are_inert() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.release(span);
        let fresh = doc.create_element("b");

        doc.set_attribute(span, "id", "gone");
        doc.append_child(div, span);
        assert!(doc.children(div).is_empty());
        assert!(!doc.is_element(span));
        assert!(doc.attribute(fresh, "id").is_none());
        assert_eq!(doc.local_name(fresh), "b");
    }
}
