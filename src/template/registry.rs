//! Directive Registry - prefix, symbol and tag tables.
//!
//! An explicit object rather than process-wide state: build one (usually
//! with [`Registry::with_defaults`]), share it through an `Rc`, and hand it
//! to every [`Compiler`]. Tests build their own.
//!
//! Attribute directives are found by exact prefix (`class:active`) or by
//! the leading run of symbol characters (`.active`). Tag directives are
//! found by uppercase tag name or by a `directive="name"` attribute.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use super::binding::Binding;
use super::compiler::Compiler;
use crate::dom::NodeId;
use crate::error::{DirectiveSlot, Error, Result};

/// Characters that may form a directive symbol.
pub const SYMBOL_CHARS: &str = "~!@#$%^&*?.|";

/// `(compiler, element, name, key)`. `name` is empty when the directive
/// targets a whole mapping of values.
pub type AttributeBind = Rc<dyn Fn(&Compiler, NodeId, &str, &str) -> Result<Vec<Binding>>>;

/// `(compiler, element)`. The directive owns the element and its subtree.
pub type TagBind = Rc<dyn Fn(&Compiler, NodeId) -> Result<Vec<Binding>>>;

// =============================================================================
// Definitions
// =============================================================================

#[derive(Clone)]
pub struct AttributeDirective {
    pub prefix: String,
    pub symbol: Option<String>,
    pub bind: AttributeBind,
    pub override_existing: bool,
}

impl AttributeDirective {
    pub fn new(
        prefix: impl Into<String>,
        bind: impl Fn(&Compiler, NodeId, &str, &str) -> Result<Vec<Binding>> + 'static,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            symbol: None,
            bind: Rc::new(bind),
            override_existing: false,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn overriding(mut self) -> Self {
        self.override_existing = true;
        self
    }
}

#[derive(Clone)]
pub struct TagDirective {
    pub tag: String,
    pub bind: TagBind,
    pub override_existing: bool,
}

impl TagDirective {
    pub fn new(
        tag: impl Into<String>,
        bind: impl Fn(&Compiler, NodeId) -> Result<Vec<Binding>> + 'static,
    ) -> Self {
        Self {
            tag: tag.into(),
            bind: Rc::new(bind),
            override_existing: false,
        }
    }

    pub fn overriding(mut self) -> Self {
        self.override_existing = true;
        self
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct Registry {
    prefixes: HashMap<String, AttributeBind>,
    symbols: HashMap<String, AttributeBind>,
    tags: HashMap<String, TagBind>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in directives.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        crate::directives::register_defaults(&mut registry)?;
        Ok(registry)
    }

    pub fn register_attribute_directive(&mut self, def: AttributeDirective) -> Result<()> {
        if !def.override_existing {
            if self.prefixes.contains_key(&def.prefix) {
                return Err(Error::DuplicateDirective {
                    slot: DirectiveSlot::Prefix,
                    name: def.prefix,
                });
            }
            if let Some(symbol) = &def.symbol {
                if self.symbols.contains_key(symbol) {
                    return Err(Error::DuplicateDirective {
                        slot: DirectiveSlot::Symbol,
                        name: symbol.clone(),
                    });
                }
            }
        }

        debug!(prefix = %def.prefix, symbol = ?def.symbol, "attribute directive registered");
        if let Some(symbol) = def.symbol {
            self.symbols.insert(symbol, def.bind.clone());
        }
        self.prefixes.insert(def.prefix, def.bind);
        Ok(())
    }

    pub fn register_tag_directive(&mut self, def: TagDirective) -> Result<()> {
        let tag = def.tag.to_ascii_uppercase();
        if !def.override_existing && self.tags.contains_key(&tag) {
            return Err(Error::DuplicateDirective {
                slot: DirectiveSlot::Tag,
                name: def.tag,
            });
        }
        debug!(%tag, "tag directive registered");
        self.tags.insert(tag, def.bind);
        Ok(())
    }

    pub fn by_prefix(&self, prefix: &str) -> Option<AttributeBind> {
        self.prefixes.get(prefix).cloned()
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<AttributeBind> {
        self.symbols.get(symbol).cloned()
    }

    /// Look up a tag directive by tag or `directive` attribute value, in
    /// any case.
    pub fn by_tag(&self, tag: &str) -> Option<TagBind> {
        self.tags.get(&tag.to_ascii_uppercase()).cloned()
    }
}

/// Split a leading run of symbol characters from an attribute name.
pub fn split_symbol(name: &str) -> Option<(&str, &str)> {
    let end = name
        .find(|c: char| !SYMBOL_CHARS.contains(c))
        .unwrap_or(name.len());
    (end > 0).then(|| name.split_at(end))
}

// =============================================================================
// Tests
// =============================================================================
