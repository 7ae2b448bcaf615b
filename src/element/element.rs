//! Element classes and reactive instances.
//!
//! # Render scheduling
//!
//! ```text
//!  set / transform ──▶ state signal ──▶ effect ──▶ render()
//!                                                   │ (first request only)
//!                                                   ▼
//!                                   spawn_local: render_now() on the next tick
//! ```
//!
//! Any number of state writes between two ticks collapse into one render.
//! Actions are spawned as well, so they never run inside the caller's turn.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use spark_signals::{Signal, effect, signal};
use tracing::{debug, error, trace};

use super::definition::{CalculationFn, ComponentDefinition, HandlerFn};
use super::view_model::ViewModel;
use crate::data::{Data, Handler, Value, get_path, set_path};
use crate::dom::{Document, Event, NodeId};
use crate::error::{Error, Result};
use crate::template::{Compiler, Render, TemplateBinding};
use crate::util::kebab_to_camel;

// =============================================================================
// Component class
// =============================================================================

struct ClassInner {
    name: String,
    tag: String,
    compiler: Compiler,
    /// Parsed once, cloned per instance.
    template: NodeId,
    definition: ComponentDefinition,
    calculations: Rc<IndexMap<String, CalculationFn>>,
}

/// A defined element: the resolved definition plus its parsed template.
#[derive(Clone)]
pub struct ComponentClass {
    inner: Rc<ClassInner>,
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.inner.name)
            .field("tag", &self.inner.tag)
            .finish()
    }
}

impl ComponentClass {
    /// `definition` must already have its mixins resolved.
    pub(crate) fn new(
        name: &str,
        tag: String,
        compiler: Compiler,
        definition: ComponentDefinition,
    ) -> Result<Self> {
        let template = compiler.document().parse_fragment(&definition.template)?;
        let calculations = Rc::new(definition.calculations.clone());
        Ok(Self {
            inner: Rc::new(ClassInner {
                name: name.to_string(),
                tag,
                compiler,
                template,
                definition,
                calculations,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn document(&self) -> &Document {
        self.inner.compiler.document()
    }

    pub fn definition(&self) -> &ComponentDefinition {
        &self.inner.definition
    }

    /// Build a new instance. Its first render is scheduled right away.
    pub fn create(&self) -> Result<ReactiveElement> {
        let document = self.document().clone();
        let definition = self.definition();

        let host = document.create_element(&self.inner.tag);
        let root = document.clone_node(self.inner.template, true);
        let binding = if definition.reactive {
            self.inner.compiler.generate_binding(root)?
        } else {
            TemplateBinding::new(Vec::new())
        };
        document.append_child(host, root);

        let state = signal(definition.initial_state());
        let inner = Rc::new_cyclic(|weak: &Weak<ElementInner>| ElementInner {
            class: self.clone(),
            host,
            state,
            binding: RefCell::new(binding),
            handlers: Rc::new(bind_handlers(&definition.handlers, weak)),
            render_requested: Cell::new(false),
            stop: RefCell::new(None),
        });

        if definition.reactive {
            let weak = Rc::downgrade(&inner);
            let state = inner.state.clone();
            let stop = effect(move || {
                let _ = state.get();
                if let Some(inner) = weak.upgrade() {
                    ReactiveElement { inner }.render();
                }
            });
            *inner.stop.borrow_mut() = Some(Box::new(stop));
        }

        debug!(tag = %self.inner.tag, ?host, "element created");
        Ok(ReactiveElement { inner })
    }
}

/// Wrap each handler so it receives the element it belongs to.
fn bind_handlers(handlers: &IndexMap<String, HandlerFn>, element: &Weak<ElementInner>) -> IndexMap<String, Value> {
    handlers
        .iter()
        .map(|(name, handler)| {
            let handler = Rc::clone(handler);
            let element = element.clone();
            let bound = Handler::new(move |event: &Event| {
                if let Some(inner) = element.upgrade() {
                    handler(event, &ReactiveElement { inner });
                }
            });
            (name.clone(), Value::Handler(bound))
        })
        .collect()
}

// =============================================================================
// Instances
// =============================================================================

struct ElementInner {
    class: ComponentClass,
    host: NodeId,
    state: Signal<Value>,
    binding: RefCell<TemplateBinding>,
    handlers: Rc<IndexMap<String, Value>>,
    render_requested: Cell<bool>,
    stop: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Drop for ElementInner {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.get_mut().take() {
            stop();
        }
    }
}

/// One live element instance. Cloning shares the instance.
#[derive(Clone)]
pub struct ReactiveElement {
    inner: Rc<ElementInner>,
}

impl fmt::Debug for ReactiveElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveElement")
            .field("tag", &self.inner.class.tag())
            .field("host", &self.inner.host)
            .finish()
    }
}

impl ReactiveElement {
    pub fn class(&self) -> &ComponentClass {
        &self.inner.class
    }

    pub fn document(&self) -> &Document {
        self.inner.class.document()
    }

    /// The host element; the rendered template lives under it.
    pub fn host(&self) -> NodeId {
        self.inner.host
    }

    pub fn state(&self) -> Value {
        self.inner.state.get()
    }

    pub fn get(&self, path: &str) -> Value {
        get_path(&self.inner.state.get(), path)
    }

    /// Store `value` at `path`. The state is replaced, never mutated.
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        let next = set_path(&self.inner.state.get(), path, value.into());
        trace!(tag = %self.inner.class.tag(), %path, "state set");
        self.inner.state.set(next);
    }

    /// Run the transform `name` synchronously against the current state.
    pub fn transform(&self, name: &str, payload: Value) -> Result<()> {
        let transform = self
            .inner
            .class
            .definition()
            .transforms
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownTransform(name.to_string()))?;
        let next = transform(&self.inner.state.get(), &payload);
        trace!(tag = %self.inner.class.tag(), transform = name, "state transformed");
        self.inner.state.set(next);
        Ok(())
    }

    /// Schedule the action `name`. It starts on the next executor tick.
    pub fn action(&self, name: &str, payload: Value) -> Result<()> {
        let action = self
            .inner
            .class
            .definition()
            .actions
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownAction(name.to_string()))?;
        let element = self.clone();
        let name = name.to_string();
        self.document().spawn_local(async move {
            let tag = element.inner.class.tag().to_string();
            if let Err(err) = action(element, payload).await {
                error!(%tag, action = %name, %err, "action failed");
            }
        });
        Ok(())
    }

    /// Request a render. Requests coalesce until the render task runs.
    pub fn render(&self) {
        if !self.inner.class.definition().reactive || self.inner.render_requested.replace(true) {
            return;
        }
        let element = Rc::downgrade(&self.inner);
        self.document().spawn_local(async move {
            let Some(inner) = element.upgrade() else {
                return;
            };
            inner.render_requested.set(false);
            let tag = inner.class.tag().to_string();
            let pending = match (ReactiveElement { inner }).render_now() {
                Ok(render) => render.into_pending(),
                Err(err) => {
                    error!(%tag, %err, "render failed");
                    return;
                }
            };
            if let Some(pending) = pending {
                if let Err(err) = pending.await {
                    error!(%tag, %err, "render did not settle");
                }
            }
        });
    }

    /// Apply the current state to the DOM immediately.
    ///
    /// Called while a render is already running (from a lifecycle listener
    /// for instance), this only requests another one.
    pub fn render_now(&self) -> Result<Render> {
        let Ok(mut binding) = self.inner.binding.try_borrow_mut() else {
            self.inner.render_requested.set(false);
            self.render();
            return Ok(Render::settled());
        };
        let view: Data = Rc::new(self.view_model());
        trace!(tag = %self.inner.class.tag(), bindings = binding.len(), "rendering");
        binding.update(&view)
    }

    /// A fresh view model over the current state.
    pub fn view_model(&self) -> ViewModel {
        ViewModel::new(
            self.inner.state.get(),
            Rc::clone(&self.inner.class.inner.calculations),
            Rc::clone(&self.inner.handlers),
        )
    }

    /// Set a prop, coercing through its definition. Unchanged values are
    /// not written.
    pub fn set_prop(&self, name: &str, value: Value) {
        let value = match self.inner.class.definition().props.get(name) {
            Some(prop) => prop.convert(&value),
            None => value,
        };
        if !self.get(name).identical(&value) {
            self.set(name, value);
        }
    }

    /// Set an attribute on the host; if it names a prop, the prop follows.
    pub fn set_attribute(&self, name: &str, value: &str) {
        self.document().set_attribute(self.inner.host, name, value);
        if let Some(prop) = self.prop_for_attribute(name) {
            self.set_prop(&prop, Value::from(value));
        }
    }

    /// Remove a host attribute; a matching prop receives `null`.
    pub fn remove_attribute(&self, name: &str) {
        self.document().remove_attribute(self.inner.host, name);
        if let Some(prop) = self.prop_for_attribute(name) {
            self.set_prop(&prop, Value::Null);
        }
    }

    /// Attribute names are case-insensitive and may be kebab-cased.
    fn prop_for_attribute(&self, attribute: &str) -> Option<String> {
        let camel = kebab_to_camel(attribute);
        self.inner
            .class
            .definition()
            .props
            .keys()
            .find(|prop| prop.eq_ignore_ascii_case(attribute) || prop.eq_ignore_ascii_case(&camel))
            .cloned()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::data::Scope;
    use crate::element::events::{event_to_action, event_to_transform};
    use crate::element::property::{PropDefinition, PropType};
    use crate::element::{ElementRegistry, define};

    fn counter() -> ComponentDefinition {
        ComponentDefinition::new()
            .template("<button !click=\"increment\">{{ count }}</button>")
            .prop("count", PropDefinition::new(PropType::Number))
            .transform("add", |state, payload| {
                let count = state.get("count").as_f64().unwrap_or(0.0);
                let by = payload.get("by").as_f64().unwrap_or(1.0);
                set_path(state, "count", Value::from(count + by))
            })
            .handler("increment", event_to_transform(Some("add"), None))
    }

    fn instance(definition: ComponentDefinition) -> (Document, ReactiveElement) {
        let document = Document::new();
        let registry = ElementRegistry::with_defaults().unwrap();
        let class = define(&document, &registry, "TestElement", definition).unwrap();
        (document, class.create().unwrap())
    }

    #[test]
    fn test_first_render_is_scheduled() {
        let (document, element) = instance(counter());
        assert_eq!(document.text_content(element.host()), "");
        document.run_until_stalled();
        assert_eq!(document.inner_html(element.host()), "<button>0</button>");
        assert_eq!(document.tag_name(element.host()), "TEST-ELEMENT");
    }

    #[test]
    fn test_renders_coalesce() {
        let renders = Rc::new(Cell::new(0));
        let counter_clone = renders.clone();
        let definition = counter().calculation("tick", move |_| {
            counter_clone.set(counter_clone.get() + 1);
            Ok(Value::Undefined)
        });
        let definition = definition.template("<p>{{count}}{{tick}}</p>");
        let (document, element) = instance(definition);
        document.run_until_stalled();
        assert_eq!(renders.get(), 1);

        element.set("count", 1);
        element.set("count", 2);
        element.set("count", 3);
        assert_eq!(document.text_content(element.host()), "0");
        document.run_until_stalled();
        assert_eq!(document.text_content(element.host()), "3");
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn test_event_transform_round_trip() {
        let (document, element) = instance(counter());
        document.run_until_stalled();
        let button = document.first_child(element.host()).unwrap();

        document.dispatch_event(button, Event::new("click"));
        document.dispatch_event(button, Event::new("click"));
        assert_eq!(element.get("count").as_f64(), Some(2.0));
        document.run_until_stalled();
        assert_eq!(document.text_content(button), "2");
    }

    #[test]
    fn test_transform_with_payload() {
        let (_, element) = instance(counter());
        element.transform("add", Value::map([("by", 5)])).unwrap();
        assert_eq!(element.get("count").as_f64(), Some(5.0));
        assert!(matches!(
            element.transform("missing", Value::Undefined),
            Err(Error::UnknownTransform(_))
        ));
    }

    #[test]
    fn test_actions_are_deferred() {
        let definition = counter()
            .prop("loaded", PropDefinition::new(PropType::Boolean))
            .action("load", |element, payload| {
                async move {
                    element.set("loaded", true);
                    element.set("source", payload);
                    Ok::<(), Error>(())
                }
                .boxed_local()
            })
            .handler("load", event_to_action(None, None));
        let (document, element) = instance(definition);

        element.action("load", Value::from("manual")).unwrap();
        assert_eq!(element.get("loaded").as_bool(), Some(false));
        document.run_until_stalled();
        assert_eq!(element.get("loaded").as_bool(), Some(true));
        assert_eq!(element.get("source").as_str(), Some("manual"));
        assert!(matches!(element.action("nope", Value::Undefined), Err(Error::UnknownAction(_))));
    }

    #[test]
    fn test_event_to_action_defaults_to_event_type() {
        let definition = counter()
            .action("refresh", |element, _| {
                async move {
                    element.set("refreshed", true);
                    Ok::<(), Error>(())
                }
                .boxed_local()
            })
            .handler("onRefresh", event_to_action(None, None));
        let (document, element) = instance(definition);

        let handler = element.view_model().lookup("onRefresh").unwrap();
        handler.as_handler().unwrap().call(&Event::new("refresh"));
        assert!(element.get("refreshed").is_undefined());
        document.run_until_stalled();
        assert_eq!(element.get("refreshed").as_bool(), Some(true));
    }

    #[test]
    fn test_attributes_coerce_into_props() {
        let definition = counter()
            .prop("isOpen", PropDefinition::new(PropType::Boolean))
            .prop("tags", PropDefinition::new(PropType::Array));
        let (document, element) = instance(definition);

        element.set_attribute("count", "12");
        element.set_attribute("is-open", "");
        element.set_attribute("tags", "a,b");
        assert_eq!(element.get("count").as_f64(), Some(12.0));
        assert_eq!(element.get("isOpen").as_bool(), Some(true));
        assert_eq!(element.get("tags").as_array().map(<[Value]>::len), Some(2));
        assert_eq!(document.attribute(element.host(), "is-open").as_deref(), Some(""));

        element.remove_attribute("is-open");
        assert_eq!(element.get("isOpen").as_bool(), Some(false));
    }

    #[test]
    fn test_unchanged_prop_does_not_render() {
        let (document, element) = instance(counter());
        document.run_until_stalled();
        let before = document.mutation_count();
        element.set_prop("count", Value::from("0"));
        document.run_until_stalled();
        assert_eq!(document.mutation_count(), before);
    }

    #[test]
    fn test_circular_calculation_surfaces() {
        let definition = ComponentDefinition::new()
            .template("<p>{{a}}</p>")
            .calculation("a", |scope| scope.resolve("b"))
            .calculation("b", |scope| scope.resolve("a"));
        let (_, element) = instance(definition);
        assert!(matches!(element.render_now(), Err(Error::CircularCalculation(_))));
    }

    #[test]
    fn test_non_reactive_template_is_static() {
        let definition = ComponentDefinition::new()
            .template("<p>{{ x }}</p>")
            .reactive(false);
        let (document, element) = instance(definition);
        element.set("x", "ignored");
        document.run_until_stalled();
        assert_eq!(document.inner_html(element.host()), "<p>{{ x }}</p>");
    }
}
