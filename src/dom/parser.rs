//! Markup parser - html5gum tokens into document nodes.
//!
//! Tree construction is deliberately simple: void elements and
//! self-closing tags never take children, an end tag closes the nearest
//! open element with the same name (and everything opened after it), and
//! stray end tags are ignored. There is no implicit element insertion,
//! which is what template authors expect from a fragment.
//!
//! Tokenizer diagnostics are logged and parsing carries on with the
//! tokenizer's recovery, the way a browser treats the same markup. Only
//! markup that is not valid UTF-8 fails.

use html5gum::{Token, Tokenizer};
use tracing::{debug, trace};

use super::document::{Document, NodeId, VOID_ELEMENTS};
use crate::error::{Error, Result};

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Parse(format!("invalid UTF-8 in markup: {e}")))
}

impl Document {
    /// Parse markup into a new, detached fragment.
    pub fn parse_fragment(&self, markup: &str) -> Result<NodeId> {
        let fragment = self.create_fragment();
        let mut open: Vec<(NodeId, String)> = vec![(fragment, String::new())];
        let mut text = String::new();

        for token in Tokenizer::new(markup).infallible() {
            if let Token::String(s) = &token {
                text.push_str(utf8(&**s)?);
                continue;
            }
            if let Token::Error(e) = &token {
                debug!(error = %e, "markup recovered");
                continue;
            }
            let parent = open.last().map(|(node, _)| *node).unwrap_or(fragment);
            self.flush_text(parent, &mut text);

            match token {
                Token::StartTag(tag) => {
                    let name = utf8(&**tag.name)?.to_ascii_lowercase();
                    let element = self.create_element(&name);
                    for (key, value) in tag.attributes {
                        self.set_attribute(element, utf8(&**key)?, utf8(&**value)?);
                    }
                    self.append_child(parent, element);
                    if !tag.self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
                        open.push((element, name));
                    }
                }
                Token::EndTag(tag) => {
                    let name = utf8(&**tag.name)?.to_ascii_lowercase();
                    match open.iter().skip(1).rposition(|(_, open_name)| *open_name == name) {
                        Some(index) => open.truncate(index + 1),
                        None => trace!(%name, "stray end tag ignored"),
                    }
                }
                Token::Comment(comment) => {
                    let comment = self.create_comment(utf8(&**comment)?);
                    self.append_child(parent, comment);
                }
                Token::Doctype(_) | Token::String(_) | Token::Error(_) => {}
            }
        }

        let parent = open.last().map(|(node, _)| *node).unwrap_or(fragment);
        self.flush_text(parent, &mut text);
        Ok(fragment)
    }

    fn flush_text(&self, parent: NodeId, text: &mut String) {
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(parent, node);
            text.clear();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;

    #[test]
    fn test_round_trip_static_markup() {
        let doc = Document::new();
        let markup = "<div class=\"a\"><p>Hello <b>world</b></p><!-- note --><br></div>";
        let fragment = doc.parse_fragment(markup).ok();
        assert_eq!(fragment.map(|f| doc.inner_html(f)), Some(markup.to_string()));
    }

    #[test]
    fn test_directive_attribute_names_survive() {
        let doc = Document::new();
        let fragment = doc
            .parse_fragment("<input #value=\"name\" @title=\"t\" !click=\"go\" .on=\"x\" $color=\"c\" attr:=\"all\">")
            .ok();
        let input = fragment.and_then(|f| doc.first_child(f));
        let names = input.map(|i| doc.attribute_names(i)).unwrap_or_default();
        for expected in ["#value", "@title", "!click", ".on", "$color", "attr:"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_nesting_and_stray_end_tags() {
        let doc = Document::new();
        let fragment = doc.parse_fragment("<ul><li>a</li></span><li>b</ul>tail").ok();
        let Some(fragment) = fragment else {
            panic!("parse failed");
        };
        let children = doc.children(fragment);
        assert_eq!(children.len(), 2);
        let ul = children[0];
        assert_eq!(doc.children(ul).len(), 2);
        assert_eq!(doc.kind(children[1]), NodeKind::Text);
        assert_eq!(doc.text_content(ul), "ab");
    }

    #[test]
    fn test_custom_tags_and_self_closing() {
        let doc = Document::new();
        let fragment = doc
            .parse_fragment("<for values=\"items\"><x-item /><span>{{value}}</span></for>")
            .ok();
        let for_node = fragment.and_then(|f| doc.first_child(f));
        let Some(for_node) = for_node else {
            panic!("parse failed");
        };
        assert_eq!(doc.tag_name(for_node), "FOR");
        let children = doc.children(for_node);
        assert_eq!(children.len(), 2);
        assert!(doc.children(children[0]).is_empty());
        assert_eq!(doc.text_content(children[1]), "{{value}}");
    }

    #[test]
    fn test_recoverable_markup_still_parses() {
        let doc = Document::new();
        let fragment = doc.parse_fragment("<p>{{a}} < 5</p>").ok();
        let p = fragment.and_then(|f| doc.first_child(f));
        assert_eq!(p.map(|p| doc.text_content(p)), Some("{{a}} < 5".to_string()));

        let fragment = doc.parse_fragment("<input disabled title=\"a\" title=\"b\">").ok();
        let input = fragment.and_then(|f| doc.first_child(f));
        let Some(input) = input else {
            panic!("parse failed");
        };
        assert!(doc.has_attribute(input, "disabled"));
        assert_eq!(doc.attribute(input, "title").as_deref(), Some("a"));
    }
}
