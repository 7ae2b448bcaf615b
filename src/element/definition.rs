//! Component definitions - the declarative half of an element class.

use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use indexmap::IndexMap;

use super::element::ReactiveElement;
use super::property::PropDefinition;
use crate::data::{Scope, Value};
use crate::dom::Event;
use crate::error::Result;

/// Derived value, evaluated against the element's view model.
pub type CalculationFn = Rc<dyn Fn(&dyn Scope) -> Result<Value>>;

/// Event handler exposed to templates; receives the element it is bound to.
pub type HandlerFn = Rc<dyn Fn(&Event, &ReactiveElement)>;

/// Pure state transition: `(state, payload) -> state`.
pub type TransformFn = Rc<dyn Fn(&Value, &Value) -> Value>;

/// Deferred work that may call back into the element.
pub type ActionFn = Rc<dyn Fn(ReactiveElement, Value) -> LocalBoxFuture<'static, Result<()>>>;

/// Builder for an element class.
///
/// ```ignore
/// let counter = ComponentDefinition::new()
///     .template("<button !click=\"increment\">{{ count }}</button>")
///     .prop("count", PropDefinition::new(PropType::Number))
///     .transform("increment", |state, _| set_path(state, "count", ...))
///     .handler("increment", event_to_transform(Some("increment"), None));
/// ```
#[derive(Clone)]
pub struct ComponentDefinition {
    pub(crate) tag: Option<String>,
    pub(crate) template: String,
    pub(crate) styles: Vec<String>,
    pub(crate) props: IndexMap<String, PropDefinition>,
    pub(crate) calculations: IndexMap<String, CalculationFn>,
    pub(crate) handlers: IndexMap<String, HandlerFn>,
    pub(crate) transforms: IndexMap<String, TransformFn>,
    pub(crate) actions: IndexMap<String, ActionFn>,
    pub(crate) register: bool,
    pub(crate) reactive: bool,
    mixins: Vec<ComponentDefinition>,
}

impl Default for ComponentDefinition {
    fn default() -> Self {
        Self {
            tag: None,
            template: String::new(),
            styles: Vec::new(),
            props: IndexMap::new(),
            calculations: IndexMap::new(),
            handlers: IndexMap::new(),
            transforms: IndexMap::new(),
            actions: IndexMap::new(),
            register: true,
            reactive: true,
            mixins: Vec::new(),
        }
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("tag", &self.tag)
            .field("styles", &self.styles.len())
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .field("calculations", &self.calculations.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("register", &self.register)
            .field("reactive", &self.reactive)
            .field("mixins", &self.mixins.len())
            .finish()
    }
}

impl ComponentDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit tag; defaults to the kebab-cased component name.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn template(mut self, markup: impl Into<String>) -> Self {
        self.template = markup.into();
        self
    }

    /// Inline CSS or a filesystem path (`/`, `./`, `../`).
    pub fn style(mut self, source: impl Into<String>) -> Self {
        self.styles.push(source.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, definition: PropDefinition) -> Self {
        self.props.insert(name.into(), definition);
        self
    }

    pub fn calculation(
        mut self,
        name: impl Into<String>,
        calculate: impl Fn(&dyn Scope) -> Result<Value> + 'static,
    ) -> Self {
        self.calculations.insert(name.into(), Rc::new(calculate));
        self
    }

    pub fn handler(mut self, name: impl Into<String>, handler: HandlerFn) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    pub fn transform(
        mut self,
        name: impl Into<String>,
        transform: impl Fn(&Value, &Value) -> Value + 'static,
    ) -> Self {
        self.transforms.insert(name.into(), Rc::new(transform));
        self
    }

    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(ReactiveElement, Value) -> LocalBoxFuture<'static, Result<()>> + 'static,
    {
        self.actions.insert(name.into(), Rc::new(action));
        self
    }

    /// Register the tag with the element registry (default `true`).
    pub fn register(mut self, register: bool) -> Self {
        self.register = register;
        self
    }

    /// Compile and run bindings (default `true`). A non-reactive element
    /// renders its template once, as static markup.
    pub fn reactive(mut self, reactive: bool) -> Self {
        self.reactive = reactive;
        self
    }

    /// Shared behaviour merged underneath this definition.
    pub fn mixin(mut self, mixin: ComponentDefinition) -> Self {
        self.mixins.push(mixin);
        self
    }

    /// Flatten the mixins in declaration order, then lay this definition on
    /// top: its own entries win, styles accumulate, and the template falls
    /// back to the last mixin that has one.
    pub fn resolve(self) -> ComponentDefinition {
        let mut merged = ComponentDefinition {
            tag: None,
            register: self.register,
            reactive: self.reactive,
            ..ComponentDefinition::default()
        };
        for mixin in self.mixins {
            let mixin = mixin.resolve();
            if !mixin.template.is_empty() {
                merged.template = mixin.template;
            }
            merged.styles.extend(mixin.styles);
            merged.props.extend(mixin.props);
            merged.calculations.extend(mixin.calculations);
            merged.handlers.extend(mixin.handlers);
            merged.transforms.extend(mixin.transforms);
            merged.actions.extend(mixin.actions);
        }

        merged.tag = self.tag;
        if !self.template.is_empty() {
            merged.template = self.template;
        }
        merged.styles.extend(self.styles);
        merged.props.extend(self.props);
        merged.calculations.extend(self.calculations);
        merged.handlers.extend(self.handlers);
        merged.transforms.extend(self.transforms);
        merged.actions.extend(self.actions);
        merged
    }

    /// State an instance starts with: every prop at its default.
    pub fn initial_state(&self) -> Value {
        Value::map(
            self.props
                .iter()
                .map(|(name, prop)| (name.clone(), prop.default_value())),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::property::PropType;

    #[test]
    fn test_mixins_merge_under_own_entries() {
        let base = ComponentDefinition::new()
            .template("<p>base</p>")
            .style(".a {}")
            .prop("size", PropDefinition::new(PropType::Number).with_default(1))
            .prop("label", PropDefinition::new(PropType::String))
            .transform("reset", |state, _| state.clone());
        let definition = ComponentDefinition::new()
            .mixin(base)
            .style(".b {}")
            .prop("size", PropDefinition::new(PropType::Number).with_default(2))
            .resolve();

        assert_eq!(definition.template, "<p>base</p>");
        assert_eq!(definition.styles, vec![".a {}".to_string(), ".b {}".to_string()]);
        assert!(definition.transforms.contains_key("reset"));

        let state = definition.initial_state();
        assert_eq!(state.get("size").as_f64(), Some(2.0));
        assert_eq!(state.get("label").as_str(), Some(""));
    }

    #[test]
    fn test_own_template_wins_and_flags_kept() {
        let definition = ComponentDefinition::new()
            .mixin(ComponentDefinition::new().template("<i></i>").reactive(false))
            .template("<b></b>")
            .register(false)
            .resolve();
        assert_eq!(definition.template, "<b></b>");
        assert!(!definition.register);
        assert!(definition.reactive);
    }

    #[test]
    fn test_nested_mixins() {
        let inner = ComponentDefinition::new().calculation("double", |scope| {
            Ok(Value::from(scope.resolve("n")?.as_f64().unwrap_or(0.0) * 2.0))
        });
        let outer = ComponentDefinition::new().mixin(inner);
        let definition = ComponentDefinition::new().mixin(outer).resolve();
        assert!(definition.calculations.contains_key("double"));
    }
}
