//! # spark-elements
//!
//! Reactive custom elements for Rust: declare a component (template, typed
//! props, calculations, handlers, transforms, actions, stylesheets) and get
//! an element whose DOM follows its state through one-way bindings.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! state tracking.
//!
//! ## Architecture
//!
//! ```text
//! markup ─▶ Document::parse_fragment ─▶ Compiler::generate_binding ─▶ TemplateBinding
//!                                              │                          │
//!                                         Registry                  update(data)
//!                                   (attribute + tag directives)          │
//!                                                                         ▼
//!                                      ReactiveElement ─ state signal ─▶ live DOM
//! ```
//!
//! Templates use `{{ dotted.path }}` interpolation, attribute directives
//! (`prop:` `#`, `attr:` `@`, `on:` `!`, `class:` `.`, `style:` `$`, `id:`)
//! and the structural tags `<if>`, `<unless>` and `<for>`, with optional
//! enter/exit/move animation.
//!
//! ## Modules
//!
//! - [`data`] - values, dotted paths, scopes
//! - [`dom`] - the host document: tree, parser, styles, layout, animation, executor
//! - [`template`] - directive registry, compiler, bindings
//! - [`directives`] - the built-in directives
//! - [`element`] - definitions, element classes, reactive instances
//! - [`error`] - the crate error type

pub mod data;
pub mod directives;
pub mod dom;
pub mod element;
pub mod error;
pub mod template;
pub mod util;

pub use data::{Computed, Data, Handler, ItemScope, Map, Scope, Value, data, get_path, set_path};
pub use directives::{AnimatePhases, AnimationConfig, ItemKey, register_defaults};
pub use dom::{AnimationTiming, Document, DomRect, Event, NodeId, NodeKind};
pub use element::{
    ComponentClass, ComponentDefinition, ElementRegistry, PropDefinition, PropType, ReactiveElement,
    ViewModel, define, event_to_action, event_to_transform,
};
pub use error::{Error, Result};
pub use template::{AttributeDirective, Compiler, Registry, Render, TagDirective, TemplateBinding};
