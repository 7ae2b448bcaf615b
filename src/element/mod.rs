//! Reactive elements - components defined from a template and a state.
//!
//! ```text
//! ComponentDefinition ──define()──▶ ComponentClass ──create()──▶ ReactiveElement
//!        (builder)                  (parsed template)            (state signal,
//!                                                                 compiled bindings)
//! ```
//!
//! An element's bindings read a [`ViewModel`]: state first, then
//! calculations, then handlers bound to the element.

mod definition;
#[allow(clippy::module_inception)]
mod element;
mod events;
mod property;
mod registry;
mod styles;
mod view_model;

pub use definition::{ActionFn, CalculationFn, ComponentDefinition, HandlerFn, TransformFn};
pub use element::{ComponentClass, ReactiveElement};
pub use events::{PayloadFn, event_to_action, event_to_transform};
pub use property::{Converter, PropDefinition, PropType};
pub use registry::{ElementRegistry, define};
pub use styles::{StyleCache, is_location};
pub use view_model::ViewModel;
