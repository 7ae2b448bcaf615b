//! `{{ path }}` interpolation splitting.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INTERPOLATION: Regex = Regex::new(r"\{\{([^}]+)\}\}").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    /// A trimmed dotted path.
    Dynamic(String),
}

pub fn has_interpolation(text: &str) -> bool {
    INTERPOLATION.is_match(text)
}

/// Split text into static and dynamic segments. Empty static runs are
/// dropped.
pub fn split(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for captures in INTERPOLATION.captures_iter(text) {
        let (Some(whole), Some(path)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Static(text[last..whole.start()].to_string()));
        }
        segments.push(Segment::Dynamic(path.as_str().trim().to_string()));
        last = whole.end();
    }
    if last < text.len() {
        segments.push(Segment::Static(text[last..].to_string()));
    }
    segments
}
