//! Error type shared by the whole crate.

use thiserror::Error;

/// Which registry table a duplicate registration collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveSlot {
    Prefix,
    Symbol,
    Tag,
}

impl std::fmt::Display for DirectiveSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectiveSlot::Prefix => write!(f, "prefix"),
            DirectiveSlot::Symbol => write!(f, "symbol"),
            DirectiveSlot::Tag => write!(f, "tag"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A directive was registered twice without `override_existing`.
    #[error("a directive with the {slot} `{name}` has already been registered")]
    DuplicateDirective { slot: DirectiveSlot, name: String },

    /// A custom element tag was registered twice.
    #[error("an element with the tag `{0}` has already been registered")]
    DuplicateElement(String),

    /// No element class is registered under this tag.
    #[error("no element has been registered with the tag `{0}`")]
    UnknownElement(String),

    /// A calculated property depends on itself.
    #[error("circular calculation detected while resolving `{0}`")]
    CircularCalculation(String),

    #[error("no transform named `{0}` has been defined")]
    UnknownTransform(String),

    #[error("no action named `{0}` has been defined")]
    UnknownAction(String),

    /// Markup that is not valid UTF-8, or a malformed stylesheet.
    #[error("template parse error: {0}")]
    Parse(String),

    #[error("failed to load stylesheet `{source_name}`: {reason}")]
    StylesheetLoad { source_name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
