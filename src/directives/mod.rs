//! Built-in directives.
//!
//! # Attribute directives
//!
//! | prefix   | symbol | target                      |
//! |----------|--------|-----------------------------|
//! | `prop:`  | `#`    | element properties          |
//! | `attr:`  | `@`    | attributes                  |
//! | `on:`    | `!`    | event listeners             |
//! | `class:` | `.`    | class list                  |
//! | `style:` | `$`    | inline style                |
//! | `id:`    |        | `id` built from a prefix    |
//!
//! A bare prefix or symbol (`attr:="key"`, `.="key"`) binds a whole mapping.
//!
//! # Tag directives
//!
//! `if`, `unless` and `for`, in tag form or through `directive="..."`.

mod animation;
mod attr;
mod class;
mod condition;
mod for_each;
mod id;
mod on;
mod prop;
mod style;

pub use animation::{
    AnimatePhases, AnimationConfig, DEFAULT_EASING, DEFAULT_PROPERTIES, FOR_DEFAULT_DURATION,
    IF_DEFAULT_DURATION, MOVE_EPSILON, TransitionOptions,
};
pub use for_each::ItemKey;

use crate::data::{Data, Map, Value, resolve_binding};
use crate::error::Result;
use crate::template::{AttributeDirective, Binding, Registry, TagDirective};

/// Register every built-in directive.
pub fn register_defaults(registry: &mut Registry) -> Result<()> {
    registry.register_attribute_directive(AttributeDirective::new("prop", prop::bind).with_symbol("#"))?;
    registry.register_attribute_directive(AttributeDirective::new("attr", attr::bind).with_symbol("@"))?;
    registry.register_attribute_directive(AttributeDirective::new("on", on::bind).with_symbol("!"))?;
    registry.register_attribute_directive(AttributeDirective::new("class", class::bind).with_symbol("."))?;
    registry.register_attribute_directive(AttributeDirective::new("style", style::bind).with_symbol("$"))?;
    registry.register_attribute_directive(AttributeDirective::new("id", id::bind))?;
    registry.register_tag_directive(TagDirective::new("if", condition::bind_if))?;
    registry.register_tag_directive(TagDirective::new("unless", condition::bind_unless))?;
    registry.register_tag_directive(TagDirective::new("for", for_each::bind))?;
    Ok(())
}

// =============================================================================
// Shared binder shapes
// =============================================================================

/// Single-slot binding: resolve `key`, and when the effective value is not
/// identical to the last one applied, call `write(previous, next)`.
pub(crate) fn scalar_binding(
    key: &str,
    mut write: impl FnMut(Option<&Value>, &Value) + 'static,
) -> Binding {
    let key = key.to_string();
    let mut last: Option<Value> = None;
    Box::new(move |data: &Data| {
        let value = resolve_binding(data, &key)?;
        if last.as_ref().is_some_and(|previous| previous.identical(&value)) {
            return Ok(None);
        }
        write(last.as_ref(), &value);
        last = Some(value);
        Ok(None)
    })
}

/// Whole-mapping binding: diff the resolved mapping against the entries
/// applied last time. `write(name, previous, next)` is called for every
/// entry that changed; `next` is `None` for entries that went away.
///
/// Anything other than a mapping clears every applied entry.
pub(crate) fn mapping_binding(
    key: &str,
    mut write: impl FnMut(&str, Option<&Value>, Option<&Value>) + 'static,
) -> Binding {
    let key = key.to_string();
    let mut last: Option<Value> = None;
    let mut applied = Map::new();
    Box::new(move |data: &Data| {
        let value = resolve_binding(data, &key)?;
        if last.as_ref().is_some_and(|previous| previous.identical(&value)) {
            return Ok(None);
        }
        let empty = Map::new();
        let current = value.as_map().unwrap_or(&empty);

        for (name, previous) in &applied {
            if !current.contains_key(name) {
                write(name, Some(previous), None);
            }
        }
        for (name, next) in current {
            let previous = applied.get(name);
            if !previous.is_some_and(|p| p.identical(next)) {
                write(name, previous, Some(next));
            }
        }

        applied = current.clone();
        last = Some(value);
        Ok(None)
    })
}

// =============================================================================
// Test fixture
// =============================================================================
