//! Stylesheet sources with a per-source cache.
//!
//! A source is either inline CSS or a location. Locations starting with
//! `/`, `./` or `../` are read from the filesystem; `http:` and `https:`
//! locations are recognised but cannot be fetched and fail to load.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

lazy_static! {
    static ref LOCATION: Regex = Regex::new(r"^(https?:|\.{0,2}/)").unwrap();
}

pub fn is_location(source: &str) -> bool {
    LOCATION.is_match(source)
}

#[derive(Default)]
pub struct StyleCache {
    loaded: RefCell<HashMap<String, Rc<str>>>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// CSS text for `source`, loading it on first use.
    pub fn load(&self, source: &str) -> Result<Rc<str>> {
        if let Some(css) = self.loaded.borrow().get(source) {
            return Ok(css.clone());
        }

        let css: Rc<str> = if !is_location(source) {
            Rc::from(source)
        } else if source.starts_with("http:") || source.starts_with("https:") {
            return Err(Error::StylesheetLoad {
                source_name: source.to_string(),
                reason: "remote stylesheets cannot be fetched".to_string(),
            });
        } else {
            let text = fs::read_to_string(source).map_err(|err| Error::StylesheetLoad {
                source_name: source.to_string(),
                reason: err.to_string(),
            })?;
            debug!(%source, bytes = text.len(), "stylesheet read");
            Rc::from(text)
        };

        self.loaded
            .borrow_mut()
            .insert(source.to_string(), css.clone());
        Ok(css)
    }

    pub fn len(&self) -> usize {
        self.loaded.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.borrow().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_detection() {
        assert!(is_location("/abs.css"));
        assert!(is_location("./rel.css"));
        assert!(is_location("../up.css"));
        assert!(is_location("https://cdn/x.css"));
        assert!(!is_location(".fade { opacity: 0 }"));
        assert!(!is_location("li { color: red }"));
    }

    #[test]
    fn test_inline_css_is_cached() {
        let cache = StyleCache::new();
        let first = cache.load(".a { opacity: 0 }").unwrap();
        let second = cache.load(".a { opacity: 0 }").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remote_sources_fail() {
        let cache = StyleCache::new();
        let err = cache.load("http://example.com/a.css").unwrap_err();
        assert!(matches!(err, Error::StylesheetLoad { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reads_files() {
        let path = std::env::temp_dir().join(format!("spark-elements-{}.css", std::process::id()));
        fs::write(&path, ".x { opacity: 0.5 }").unwrap();
        let cache = StyleCache::new();
        let css = cache.load(path.to_str().unwrap()).unwrap();
        assert_eq!(&*css, ".x { opacity: 0.5 }");
        fs::remove_file(&path).unwrap();

        assert!(cache.load("./definitely/missing.css").is_err());
    }
}
