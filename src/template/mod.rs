//! Template compilation.
//!
//! - [`registry`] - directive tables
//! - [`compiler`] - fragment walk producing bindings
//! - [`binding`] - `Binding`, `TemplateBinding`, `Render`
//! - [`interpolate`] - `{{ path }}` splitting

mod binding;
mod compiler;
mod interpolate;
mod registry;

pub use binding::{Binding, Pending, Render, TemplateBinding};
pub use compiler::Compiler;
pub use interpolate::{Segment, has_interpolation, split};
pub use registry::{
    AttributeBind, AttributeDirective, Registry, SYMBOL_CHARS, TagBind, TagDirective, split_symbol,
};
