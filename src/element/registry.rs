//! Element registry and `define()`.
//!
//! The registry owns everything definitions share: the directive registry
//! their templates compile against, the stylesheet cache, and the table of
//! registered tags.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::definition::ComponentDefinition;
use super::element::{ComponentClass, ReactiveElement};
use super::styles::StyleCache;
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::template::{Compiler, Registry};
use crate::util::camel_to_kebab;

pub struct ElementRegistry {
    directives: Rc<Registry>,
    classes: RefCell<IndexMap<String, ComponentClass>>,
    styles: StyleCache,
}

impl ElementRegistry {
    pub fn new(directives: Rc<Registry>) -> Self {
        Self {
            directives,
            classes: RefCell::new(IndexMap::new()),
            styles: StyleCache::new(),
        }
    }

    /// A registry compiling against the built-in directives.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Rc::new(Registry::with_defaults()?)))
    }

    pub fn directives(&self) -> &Rc<Registry> {
        &self.directives
    }

    pub fn styles(&self) -> &StyleCache {
        &self.styles
    }

    pub fn register(&self, class: ComponentClass) -> Result<()> {
        let tag = class.tag().to_ascii_lowercase();
        let mut classes = self.classes.borrow_mut();
        if classes.contains_key(&tag) {
            return Err(Error::DuplicateElement(tag));
        }
        classes.insert(tag, class);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<ComponentClass> {
        self.classes.borrow().get(&tag.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.classes.borrow().contains_key(&tag.to_ascii_lowercase())
    }

    pub fn tags(&self) -> Vec<String> {
        self.classes.borrow().keys().cloned().collect()
    }

    pub fn create(&self, tag: &str) -> Result<ReactiveElement> {
        self.get(tag)
            .ok_or_else(|| Error::UnknownElement(tag.to_string()))?
            .create()
    }
}

/// Build an element class from `definition` and, unless the definition
/// opts out, register it under its tag.
///
/// Stylesheets that fail to load are logged and skipped.
pub fn define(
    document: &Document,
    registry: &ElementRegistry,
    name: &str,
    definition: ComponentDefinition,
) -> Result<ComponentClass> {
    let definition = definition.resolve();
    let tag = definition
        .tag
        .clone()
        .unwrap_or_else(|| camel_to_kebab(name));
    if definition.register && registry.contains(&tag) {
        return Err(Error::DuplicateElement(tag));
    }

    for source in &definition.styles {
        let applied = registry
            .styles()
            .load(source)
            .and_then(|css| document.add_stylesheet(&css));
        if let Err(err) = applied {
            warn!(%tag, %err, "stylesheet skipped");
        }
    }

    let register = definition.register;
    let compiler = Compiler::new(document.clone(), Rc::clone(registry.directives()));
    let class = ComponentClass::new(name, tag, compiler, definition)?;
    if register {
        registry.register(class.clone())?;
    }
    debug!(%name, tag = class.tag(), register, "element defined");
    Ok(class)
}

// =============================================================================
// Tests
// =============================================================================
