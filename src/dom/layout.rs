//! Layout - bounding rectangles through Taffy.
//!
//! Elements lay out as flex containers (column by default). Text is
//! measured with a fixed advance per character and a fixed line height,
//! which is all move animations need: stable, deterministic positions that
//! change when siblings are reordered.
//!
//! Recognised style properties: `display` (`none`, `flex`), `flex-direction`,
//! `width`, `height`.

use std::collections::HashMap;

use taffy::{
    AvailableSpace, Dimension, Display, FlexDirection, NodeId as TaffyNodeId, Size, Style,
    TaffyTree,
};
use tracing::trace;

use super::document::{Document, NodeId, NodeKind};

/// Horizontal advance of one character of text.
pub const CHAR_WIDTH: f32 = 8.0;
/// Height of one line of text.
pub const LINE_HEIGHT: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DomRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DomRect {
    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

// =============================================================================
// STYLE CONVERSION
// =============================================================================

fn to_dimension(value: &str) -> Dimension {
    let value = value.trim();
    if let Some(px) = value.strip_suffix("px") {
        if let Ok(length) = px.trim().parse::<f32>() {
            return Dimension::Length(length);
        }
    }
    if let Some(percent) = value.strip_suffix('%') {
        if let Ok(p) = percent.trim().parse::<f32>() {
            return Dimension::Percent(p / 100.0);
        }
    }
    value
        .parse::<f32>()
        .map(Dimension::Length)
        .unwrap_or(Dimension::Auto)
}

fn build_style(document: &Document, node: NodeId) -> Style {
    let computed = document.computed_style(node, &["display", "flex-direction", "width", "height"]);
    let get = |name: &str| computed.get(name).map(String::as_str).unwrap_or("");

    Style {
        display: if get("display") == "none" {
            Display::None
        } else {
            Display::Flex
        },
        flex_direction: match get("flex-direction") {
            "row" => FlexDirection::Row,
            "row-reverse" => FlexDirection::RowReverse,
            "column-reverse" => FlexDirection::ColumnReverse,
            _ => FlexDirection::Column,
        },
        size: Size {
            width: to_dimension(get("width")),
            height: to_dimension(get("height")),
        },
        ..Style::default()
    }
}

// =============================================================================
// TREE BUILDING
// =============================================================================

/// Characters in a text node that occupy space.
struct TextMetrics {
    chars: usize,
}

fn build_node(
    document: &Document,
    tree: &mut TaffyTree<TextMetrics>,
    node: NodeId,
    index: &mut HashMap<NodeId, TaffyNodeId>,
) -> Option<TaffyNodeId> {
    let taffy_node = match document.kind(node) {
        NodeKind::Comment => return None,
        NodeKind::Text => {
            let text = document.text(node);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            let metrics = TextMetrics {
                chars: trimmed.chars().count(),
            };
            tree.new_leaf_with_context(Style::default(), metrics).ok()?
        }
        NodeKind::Element | NodeKind::Fragment => {
            let style = if document.kind(node) == NodeKind::Element {
                build_style(document, node)
            } else {
                Style {
                    flex_direction: FlexDirection::Column,
                    ..Style::default()
                }
            };
            let children: Vec<TaffyNodeId> = document
                .children(node)
                .into_iter()
                .filter_map(|child| build_node(document, tree, child, index))
                .collect();
            tree.new_with_children(style, &children).ok()?
        }
    };
    index.insert(node, taffy_node);
    Some(taffy_node)
}

fn measure_text(
    known_dimensions: Size<Option<f32>>,
    _available_space: Size<AvailableSpace>,
    _node_id: TaffyNodeId,
    context: Option<&mut TextMetrics>,
    _style: &Style,
) -> Size<f32> {
    match context {
        Some(metrics) => Size {
            width: known_dimensions
                .width
                .unwrap_or(metrics.chars as f32 * CHAR_WIDTH),
            height: known_dimensions.height.unwrap_or(LINE_HEIGHT),
        },
        None => Size::ZERO,
    }
}

// =============================================================================
// MAIN ENTRY POINTS
// =============================================================================

impl Document {
    /// Lay out the tree containing `root` and return the rectangle of every
    /// node that takes part in layout.
    pub fn layout_rects(&self, root: NodeId) -> HashMap<NodeId, DomRect> {
        let mut tree: TaffyTree<TextMetrics> = TaffyTree::new();
        let mut index = HashMap::new();
        let Some(root_node) = build_node(self, &mut tree, root, &mut index) else {
            return HashMap::new();
        };

        let available = Size {
            width: AvailableSpace::Definite(self.state().viewport_width),
            height: AvailableSpace::MaxContent,
        };
        if tree
            .compute_layout_with_measure(root_node, available, measure_text)
            .is_err()
        {
            return HashMap::new();
        }

        let mut rects = HashMap::with_capacity(index.len());
        self.collect_rects(&tree, &index, root, 0.0, 0.0, &mut rects);
        trace!(nodes = rects.len(), "layout computed");
        rects
    }

    fn collect_rects(
        &self,
        tree: &TaffyTree<TextMetrics>,
        index: &HashMap<NodeId, TaffyNodeId>,
        node: NodeId,
        offset_x: f32,
        offset_y: f32,
        rects: &mut HashMap<NodeId, DomRect>,
    ) {
        let Some(layout) = index.get(&node).and_then(|&id| tree.layout(id).ok()) else {
            return;
        };
        let rect = DomRect {
            left: offset_x + layout.location.x,
            top: offset_y + layout.location.y,
            width: layout.size.width,
            height: layout.size.height,
        };
        rects.insert(node, rect);
        for child in self.children(node) {
            self.collect_rects(tree, index, child, rect.left, rect.top, rects);
        }
    }

    /// Rectangle of one node relative to the top-left of its root.
    ///
    /// Nodes outside layout (comments, hidden or whitespace-only) report an
    /// empty rectangle.
    pub fn bounding_client_rect(&self, node: NodeId) -> DomRect {
        self.layout_rects(self.root(node))
            .get(&node)
            .copied()
            .unwrap_or_default()
    }

    /// Rectangles for many nodes, laying out each distinct root once.
    pub fn bounding_client_rects(&self, nodes: &[NodeId]) -> Vec<DomRect> {
        let mut by_root: HashMap<NodeId, HashMap<NodeId, DomRect>> = HashMap::new();
        nodes
            .iter()
            .map(|&node| {
                let root = self.root(node);
                by_root
                    .entry(root)
                    .or_insert_with(|| self.layout_rects(root))
                    .get(&node)
                    .copied()
                    .unwrap_or_default()
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
