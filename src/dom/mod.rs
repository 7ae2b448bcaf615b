//! Host DOM - the document templates compile against and render into.
//!
//! # Modules
//!
//! - [`document`] - node arena, tree mutation, attributes, listeners, executor
//! - [`parser`] - markup → fragment (html5gum)
//! - [`style`] - stylesheets and computed style
//! - [`layout`] - bounding rectangles (taffy)
//! - [`animation`] - keyframe timeline on a virtual clock
//! - [`event`] - events and listeners

mod animation;
mod document;
mod event;
mod layout;
mod parser;
mod style;

pub use animation::{ANIMATION_HISTORY, Animation, AnimationRecord, AnimationTiming, Keyframe, PlayState};
pub use document::{DEFAULT_VIEWPORT_WIDTH, Document, NodeId, NodeKind, VOID_ELEMENTS};
pub use event::{ENTERED, ENTERING, EXITED, EXITING, Event, Listener};
pub use layout::{CHAR_WIDTH, DomRect, LINE_HEIGHT};
pub use style::{initial_value, parse_declarations, parse_stylesheet, serialize_declarations, StyleRule};
