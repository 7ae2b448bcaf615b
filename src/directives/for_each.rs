//! `for` - keyed list reconciliation.
//!
//! ```text
//! <for values="items" as="item" index-as="i" key-path="id" animate ...>
//!   <li>{{ i }}: {{ item.name }}</li>
//! </for>
//! ```
//!
//! The inner markup becomes a template fragment; the element is replaced by
//! a start and an end marker. Each rendered item owns a clone of the
//! template (compiled on creation) headed by a placeholder comment. An
//! item's nodes are everything from its placeholder up to the next item's
//! placeholder or the end marker, so content inserted later by nested
//! directives travels with the item.
//!
//! # Update phases
//!
//! 1. Resolve the collection; stop if identical to the previous one.
//! 2. Key every item (key path, key function, or position / mapping key).
//!    A repeated key is warned about and its later occurrence skipped.
//! 3. Sort records into kept, created, deleted and moved.
//! 4. With animation and any change, snapshot kept element rectangles.
//! 5. Remove deleted items, with exit transitions when configured. Those
//!    transitions complete before anything else moves.
//! 6. Walk the targets in reverse, moving each item before its successor
//!    and re-running its bindings with the item and index in scope.
//! 7. Enter created items; FLIP kept items whose rectangle moved.
//!
//! A generation counter stops a continuation from phase 6 onward when a
//! newer update started while exits were running. Items that continuation
//! would have inserted are still waiting in their own fragments, so the
//! newer update treats them as created.
//!
//! Nothing is committed until every item is keyed and instantiated; a
//! failing key function leaves the list as it was. Deleted items are
//! released from the document once they have left it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::animation::{self, AnimationConfig, FOR_DEFAULT_DURATION};
use crate::data::{Computed, Data, ItemScope, Value, get_path, resolve_binding};
use crate::dom::{DomRect, NodeId};
use crate::error::Result;
use crate::template::{Binding, Compiler, Pending, TemplateBinding};

const DEFAULT_ALIAS: &str = "value";
const DEFAULT_INDEX_ALIAS: &str = "index";

// =============================================================================
// Keys
// =============================================================================

/// Identity of a list item across updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Undefined,
    Null,
    Bool(bool),
    /// `f64` bits, with `-0.0` folded into `0.0`.
    Number(u64),
    String(Rc<str>),
    /// Containers key by allocation.
    Reference(usize),
}

impl From<&Value> for ItemKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Undefined => ItemKey::Undefined,
            Value::Null => ItemKey::Null,
            Value::Bool(b) => ItemKey::Bool(*b),
            Value::Number(n) => ItemKey::Number(if *n == 0.0 { 0.0f64.to_bits() } else { n.to_bits() }),
            Value::String(s) => ItemKey::String(s.clone()),
            Value::Array(items) => ItemKey::Reference(Rc::as_ptr(items) as *const () as usize),
            Value::Map(map) => ItemKey::Reference(Rc::as_ptr(map) as *const () as usize),
            Value::Computed(_) | Value::Handler(_) => ItemKey::String(Rc::from(value.to_display_string())),
        }
    }
}

enum KeySource {
    Path(String),
    Function(String),
    Position,
}

// =============================================================================
// State
// =============================================================================

struct ItemRecord {
    position: Option<usize>,
    previous: Option<usize>,
    item: Value,
    /// Array position or mapping key.
    index: Value,
    placeholder: NodeId,
    /// Set once the item has been moved out of its fragment into the list.
    inserted: bool,
    binding: TemplateBinding,
}

#[derive(Default)]
struct ListState {
    records: IndexMap<ItemKey, ItemRecord>,
    last_values: Option<Value>,
    generation: u64,
}

#[derive(Default)]
struct Plan {
    kept: Vec<ItemKey>,
    created: Vec<ItemKey>,
    moved: usize,
    deleted: Vec<ItemRecord>,
}

struct ListDirective {
    compiler: Compiler,
    template: NodeId,
    end: NodeId,
    values: String,
    alias: String,
    index_alias: String,
    key: KeySource,
    animation: AnimationConfig,
    state: RefCell<ListState>,
}

pub(super) fn bind(compiler: &Compiler, element: NodeId) -> Result<Vec<Binding>> {
    let document = compiler.document().clone();
    let attribute = |name: &str| {
        document
            .attribute(element, name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let values = attribute("values").unwrap_or_default();
    let alias = attribute("as").unwrap_or_else(|| DEFAULT_ALIAS.to_string());
    let index_alias = attribute("index-as").unwrap_or_else(|| DEFAULT_INDEX_ALIAS.to_string());
    let key = match (attribute("key-path"), attribute("key-function")) {
        (Some(path), _) => KeySource::Path(path),
        (None, Some(function)) => KeySource::Function(function),
        (None, None) => KeySource::Position,
    };
    let animation = AnimationConfig::from_element(&document, element, FOR_DEFAULT_DURATION, true);

    let template = document.create_fragment();
    for child in document.children(element) {
        document.append_child(template, child);
    }

    let start = document.create_comment(&format!("for {values} as {index_alias}, {alias}"));
    let end = document.create_comment(&format!("endfor {values} as {index_alias}, {alias}"));
    if let Some(parent) = document.parent(element) {
        document.replace_child(parent, end, element);
        document.insert_before(parent, start, Some(end));
    }
    document.release(element);
    debug!(%values, %alias, %index_alias, "for compiled");

    let list = Rc::new(ListDirective {
        compiler: compiler.clone(),
        template,
        end,
        values,
        alias,
        index_alias,
        key,
        animation,
        state: RefCell::new(ListState::default()),
    });
    let binding: Binding = Box::new(move |data: &Data| list.update(data));
    Ok(vec![binding])
}

// =============================================================================
// Reconciliation
// =============================================================================

impl ListDirective {
    fn update(self: &Rc<Self>, data: &Data) -> Result<Option<Pending>> {
        let document = self.compiler.document().clone();
        let values = resolve_binding(data, &self.values)?;

        let (generation, plan, placeholders) = {
            let mut state = self.state.borrow_mut();
            if state.last_values.as_ref().is_some_and(|last| last.identical(&values)) {
                return Ok(None);
            }

            let mut placeholders: HashSet<NodeId> =
                state.records.values().map(|record| record.placeholder).collect();
            let plan = self.plan(&mut state, data, &values)?;
            placeholders.extend(state.records.values().map(|record| record.placeholder));
            state.last_values = Some(values.clone());
            state.generation += 1;
            (state.generation, plan, placeholders)
        };

        debug!(
            values = %self.values,
            kept = plan.kept.len(),
            created = plan.created.len(),
            deleted = plan.deleted.len(),
            moved = plan.moved,
            "list reconciled"
        );

        let animate = self.animation.enabled
            && (!plan.created.is_empty() || !plan.deleted.is_empty() || plan.moved > 0);

        // Rectangles before anything changes.
        let start_rects: HashMap<NodeId, DomRect> = if animate {
            let list_parent = document.parent(self.end);
            let mut kept_nodes = {
                let state = self.state.borrow();
                self.element_nodes(&state, &plan.kept, &placeholders)
            };
            kept_nodes.retain(|&node| document.parent(node) == list_parent);
            let rects = document.bounding_client_rects(&kept_nodes);
            kept_nodes.into_iter().zip(rects).collect()
        } else {
            HashMap::new()
        };

        // Removal.
        let exit = if animate { self.animation.exit.as_ref() } else { None };
        let mut exits: Vec<LocalBoxFuture<'static, ()>> = Vec::new();
        for record in &plan.deleted {
            if !record.inserted {
                document.release(document.root(record.placeholder));
                continue;
            }
            for node in self.item_nodes(record.placeholder, &placeholders) {
                if !document.is_element(node) {
                    document.release(node);
                    continue;
                }
                match animation::exit(&document, node, exit, || true) {
                    Some(leaving) => {
                        let document = document.clone();
                        exits.push(Box::pin(leaving.map(move |_| document.release(node))));
                    }
                    None => document.release(node),
                }
            }
        }

        if exits.is_empty() {
            return self.settle(data, plan, &placeholders, start_rects, animate);
        }

        trace!(exits = exits.len(), "waiting for exit transitions");
        let list = Rc::clone(self);
        let data = data.clone();
        let continuation = document.spawn_tracked(async move {
            join_all(exits).await;
            if list.state.borrow().generation != generation {
                debug!(values = %list.values, "stale list update skipped");
                return Ok(());
            }
            match list.settle(&data, plan, &placeholders, start_rects, animate)? {
                Some(pending) => pending.await,
                None => Ok(()),
            }
        });
        Ok(Some(Box::pin(continuation.map(|result| result.unwrap_or(Ok(()))))))
    }

    /// Key every item and bring the record table up to date.
    ///
    /// Keys and new item templates are produced before the table is
    /// touched, so an error leaves the previous state intact.
    fn plan(&self, state: &mut ListState, data: &Data, values: &Value) -> Result<Plan> {
        let entries: Vec<(Value, Value)> = match values {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(position, item)| (Value::from(position), item.clone()))
                .collect(),
            Value::Map(map) => map
                .iter()
                .map(|(key, item)| (Value::from(key.as_str()), item.clone()))
                .collect(),
            other => {
                if !other.is_nullish() {
                    trace!(values = %self.values, "not a collection, clearing list");
                }
                Vec::new()
            }
        };

        let key_function: Option<Computed> = match &self.key {
            KeySource::Function(path) => match data.resolve(path)? {
                Value::Computed(function) => Some(function),
                _ => {
                    warn!(key_function = %path, "key function is not a function, keying by position");
                    None
                }
            },
            _ => None,
        };

        let mut seen = HashSet::new();
        let mut keyed: Vec<(ItemKey, Value, Value)> = Vec::with_capacity(entries.len());
        for (index, item) in entries {
            let key = match (&self.key, &key_function) {
                (KeySource::Path(path), _) => ItemKey::from(&get_path(&item, path.as_str())),
                (KeySource::Function(_), Some(function)) => {
                    let scope = self.item_scope(data, &item, &index);
                    ItemKey::from(&function.call(&scope)?)
                }
                _ => ItemKey::from(&index),
            };
            if !seen.insert(key.clone()) {
                warn!(values = %self.values, ?key, "duplicate key in list, later item skipped");
                continue;
            }
            keyed.push((key, index, item));
        }

        let mut fresh: HashMap<ItemKey, ItemRecord> = HashMap::new();
        for (position, (key, index, item)) in keyed.iter().enumerate() {
            if state.records.contains_key(key) {
                continue;
            }
            match self.instantiate(item.clone(), index.clone(), position) {
                Ok(record) => {
                    fresh.insert(key.clone(), record);
                }
                Err(err) => {
                    let document = self.compiler.document();
                    for record in fresh.values() {
                        document.release(document.root(record.placeholder));
                    }
                    return Err(err);
                }
            }
        }

        for record in state.records.values_mut() {
            record.previous = record.position.take();
        }
        for (position, (key, index, item)) in keyed.into_iter().enumerate() {
            match state.records.get_mut(&key) {
                Some(record) => {
                    record.position = Some(position);
                    record.item = item;
                    record.index = index;
                }
                None => {
                    if let Some(record) = fresh.remove(&key) {
                        state.records.insert(key, record);
                    }
                }
            }
        }

        let mut plan = Plan::default();
        let mut deleted = Vec::new();
        for (key, record) in &state.records {
            match (record.position, record.previous) {
                (None, _) => deleted.push(key.clone()),
                (Some(now), Some(before)) if record.inserted => {
                    if now != before {
                        plan.moved += 1;
                    }
                    plan.kept.push(key.clone());
                }
                (Some(_), _) => plan.created.push(key.clone()),
            }
        }
        for key in deleted {
            if let Some(record) = state.records.shift_remove(&key) {
                plan.deleted.push(record);
            }
        }
        Ok(plan)
    }

    /// Clone and compile the template for a new item.
    fn instantiate(&self, item: Value, index: Value, position: usize) -> Result<ItemRecord> {
        let document = self.compiler.document();
        let fragment = document.clone_node(self.template, true);
        let binding = match self.compiler.generate_binding(fragment) {
            Ok(binding) => binding,
            Err(err) => {
                document.release(fragment);
                return Err(err);
            }
        };
        let placeholder = document.create_comment("");
        document.insert_before(fragment, placeholder, document.first_child(fragment));
        trace!(?placeholder, position, "list item created");
        Ok(ItemRecord {
            position: Some(position),
            previous: None,
            item,
            index,
            placeholder,
            inserted: false,
            binding,
        })
    }

    fn item_scope(&self, data: &Data, item: &Value, index: &Value) -> ItemScope {
        ItemScope::new(data.clone())
            .with(self.alias.clone(), item.clone())
            .with(self.index_alias.clone(), index.clone())
    }

    /// An item's nodes: its placeholder and every following sibling up to
    /// the next placeholder or the end marker.
    fn item_nodes(&self, placeholder: NodeId, placeholders: &HashSet<NodeId>) -> Vec<NodeId> {
        let document = self.compiler.document();
        let mut nodes = vec![placeholder];
        let mut current = document.next_sibling(placeholder);
        while let Some(node) = current {
            if node == self.end || placeholders.contains(&node) {
                break;
            }
            nodes.push(node);
            current = document.next_sibling(node);
        }
        nodes
    }

    fn element_nodes(&self, state: &ListState, keys: &[ItemKey], placeholders: &HashSet<NodeId>) -> Vec<NodeId> {
        let document = self.compiler.document();
        keys.iter()
            .filter_map(|key| state.records.get(key))
            .flat_map(|record| self.item_nodes(record.placeholder, placeholders))
            .filter(|&node| document.is_element(node))
            .collect()
    }

    /// Reorder, re-bind, then enter and move.
    fn settle(
        &self,
        data: &Data,
        plan: Plan,
        placeholders: &HashSet<NodeId>,
        start_rects: HashMap<NodeId, DomRect>,
        animate: bool,
    ) -> Result<Option<Pending>> {
        let document = self.compiler.document().clone();
        let mut pending: Vec<Pending> = Vec::new();

        let (created_nodes, kept_nodes) = {
            let mut state = self.state.borrow_mut();
            pending.extend(self.reorder(&mut state, data, placeholders)?);
            (
                self.element_nodes(&state, &plan.created, placeholders),
                self.element_nodes(&state, &plan.kept, placeholders),
            )
        };

        let mut transitions: Vec<LocalBoxFuture<'static, ()>> = Vec::new();
        let enter = if animate { self.animation.enter.as_ref() } else { None };
        for node in created_nodes {
            transitions.extend(animation::enter(&document, node, enter));
        }

        if let (true, Some(timing)) = (animate, self.animation.moves.as_ref()) {
            let moving: Vec<NodeId> = kept_nodes
                .into_iter()
                .filter(|node| start_rects.contains_key(node))
                .collect();
            let end_rects = document.bounding_client_rects(&moving);
            for (node, to) in moving.into_iter().zip(end_rects) {
                if let Some(&from) = start_rects.get(&node) {
                    transitions.extend(animation::slide(&document, node, from, to, timing));
                }
            }
        }

        if !transitions.is_empty() {
            pending.push(Box::pin(join_all(transitions).map(|_| Ok(()))));
        }
        if pending.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::pin(
            join_all(pending).map(|results| results.into_iter().collect::<Result<()>>()),
        )))
    }

    /// Place every record in position order before the end marker and run
    /// its bindings.
    fn reorder(&self, state: &mut ListState, data: &Data, placeholders: &HashSet<NodeId>) -> Result<Vec<Pending>> {
        let document = self.compiler.document();
        let Some(parent) = document.parent(self.end) else {
            warn!(values = %self.values, "list end marker is detached");
            return Ok(Vec::new());
        };

        let mut order: Vec<&ItemKey> = state.records.keys().collect();
        order.sort_by_key(|key| state.records.get(*key).and_then(|record| record.position));
        let order: Vec<ItemKey> = order.into_iter().cloned().collect();

        let mut pending = Vec::new();
        let mut anchor = self.end;
        for key in order.iter().rev() {
            let Some(record) = state.records.get_mut(key) else {
                continue;
            };
            if record.inserted {
                let nodes = self.item_nodes(record.placeholder, placeholders);
                let in_place = nodes
                    .last()
                    .and_then(|&last| document.next_sibling(last))
                    .is_some_and(|next| next == anchor);
                if !in_place {
                    for &node in &nodes {
                        document.insert_before(parent, node, Some(anchor));
                    }
                }
            } else if let Some(fragment) = document.parent(record.placeholder) {
                // Still in its own fragment: the whole fragment is the item.
                document.insert_before(parent, fragment, Some(anchor));
                document.release(fragment);
                record.inserted = true;
            }
            anchor = record.placeholder;

            let scope: Data = Rc::new(self.item_scope(data, &record.item, &record.index));
            pending.extend(record.binding.update(&scope)?.into_pending());
        }
        Ok(pending)
    }
}

// =============================================================================
// Tests
// =============================================================================
