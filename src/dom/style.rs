//! Stylesheets and computed style.
//!
//! Supports the subset components actually use: rules whose selectors are
//! compounds of an optional tag and any number of classes (`li`, `.fade`,
//! `li.fade.out`, `*`), comma-separated selector lists, and plain
//! `property: value` declarations. Later and more specific rules win,
//! inline style wins over every rule.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{trace, warn};

use super::document::{Document, NodeId, NodeKind};
use crate::error::{Error, Result};

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    static ref IDENT: Regex = Regex::new(r"^[A-Za-z0-9_-]*$").unwrap();
}

// =============================================================================
// Declarations
// =============================================================================

/// Parse `a: b; c: d` into an ordered map.
pub fn parse_declarations(text: &str) -> IndexMap<String, String> {
    text.split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

pub fn serialize_declarations(declarations: &IndexMap<String, String>) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Value reported for a property no rule or inline style sets.
pub fn initial_value(property: &str) -> &'static str {
    match property {
        "opacity" => "1",
        "transform" => "none",
        _ => "",
    }
}

// =============================================================================
// Rules
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Selector {
    tag: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('.');
        let tag = parts.next()?;
        let classes: Vec<String> = parts.map(String::from).collect();
        if !IDENT.is_match(tag) && tag != "*" {
            return None;
        }
        if classes.iter().any(|c| c.is_empty() || !IDENT.is_match(c)) {
            return None;
        }
        if tag.is_empty() && classes.is_empty() {
            return None;
        }
        let tag = match tag {
            "" | "*" => None,
            name => Some(name.to_ascii_lowercase()),
        };
        Some(Self { tag, classes })
    }

    fn matches(&self, document: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if document.local_name(node) != *tag {
                return false;
            }
        }
        let classes = document.class_list(node);
        self.classes.iter().all(|c| classes.contains(c))
    }

    fn specificity(&self) -> (usize, usize) {
        (self.classes.len(), usize::from(self.tag.is_some()))
    }
}

#[derive(Debug, Clone)]
pub struct StyleRule {
    selectors: Vec<Selector>,
    declarations: IndexMap<String, String>,
}

impl StyleRule {
    fn specificity_for(&self, document: &Document, node: NodeId) -> Option<(usize, usize)> {
        self.selectors
            .iter()
            .filter(|selector| selector.matches(document, node))
            .map(Selector::specificity)
            .max()
    }
}

/// Parse stylesheet text into rules.
///
/// Rules with unsupported selectors are skipped; an unterminated block is
/// an error.
pub fn parse_stylesheet(css: &str) -> Result<Vec<StyleRule>> {
    let css = COMMENT.replace_all(css, "");
    let mut rules = Vec::new();
    let mut rest = css.as_ref();

    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let Some(close) = rest[open..].find('}') else {
            return Err(Error::Parse(format!("unterminated style rule `{prelude}`")));
        };
        let body = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let selectors: Option<Vec<Selector>> = prelude.split(',').map(Selector::parse).collect();
        match selectors {
            Some(selectors) => rules.push(StyleRule {
                selectors,
                declarations: parse_declarations(body),
            }),
            None => warn!(selector = prelude, "unsupported selector, rule skipped"),
        }
    }

    if !rest.trim().is_empty() {
        return Err(Error::Parse(format!("unexpected stylesheet text `{}`", rest.trim())));
    }
    Ok(rules)
}

// =============================================================================
// Document integration
// =============================================================================

impl Document {
    /// Parse and append a stylesheet to the document.
    pub fn add_stylesheet(&self, css: &str) -> Result<()> {
        let rules = parse_stylesheet(css)?;
        trace!(rules = rules.len(), "stylesheet added");
        self.state_mut().stylesheet.extend(rules);
        Ok(())
    }

    /// Effective value of each requested property on `node`.
    pub fn computed_style(&self, node: NodeId, properties: &[&str]) -> IndexMap<String, String> {
        let resolved = self.cascade(node);
        properties
            .iter()
            .map(|&property| {
                let value = resolved
                    .get(property)
                    .cloned()
                    .unwrap_or_else(|| initial_value(property).to_string());
                (property.to_string(), value)
            })
            .collect()
    }

    pub fn computed_style_property(&self, node: NodeId, property: &str) -> String {
        self.computed_style(node, &[property])
            .shift_remove(property)
            .unwrap_or_default()
    }

    fn cascade(&self, node: NodeId) -> IndexMap<String, String> {
        let mut resolved = IndexMap::new();
        if self.kind(node) != NodeKind::Element {
            return resolved;
        }

        let rules = self.state().stylesheet.clone();
        let mut matching: Vec<((usize, usize), usize, &StyleRule)> = rules
            .iter()
            .enumerate()
            .filter_map(|(order, rule)| {
                rule.specificity_for(self, node)
                    .map(|specificity| (specificity, order, rule))
            })
            .collect();
        matching.sort_by_key(|(specificity, order, _)| (*specificity, *order));

        for (_, _, rule) in matching {
            for (name, value) in &rule.declarations {
                resolved.insert(name.clone(), value.clone());
            }
        }
        resolved.extend(self.inline_style(node));
        resolved
    }
}

// =============================================================================
// Tests
// =============================================================================
