//! Data model - values, dotted paths and scopes.
//!
//! - [`value`] - `Value`, identity equality, `Computed` and `Handler`
//! - [`path`] - `get_path` / copy-on-write `set_path`
//! - [`scope`] - the `Scope` trait bindings read through

mod path;
mod scope;
mod value;

pub use path::*;
pub use scope::*;
pub use value::*;
