//! Transition support for structural directives.
//!
//! Configuration comes from attributes on the directive element:
//! `animate` opts in, then `{enter,exit,move}-{class,duration,easing,delay,end-delay,properties}`
//! with `animate-*` as the shared fallback.
//!
//! Enter and exit transitions are class based: the style is sampled with
//! and without the class and the timeline interpolates between the two
//! samples. Moves are FLIP translations from the old rectangle back to the
//! identity transform.

use bitflags::bitflags;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use tracing::trace;

use crate::dom::{
    AnimationTiming, Document, DomRect, ENTERED, ENTERING, EXITED, EXITING, Event, Keyframe,
    NodeId,
};

pub const IF_DEFAULT_DURATION: f64 = 400.0;
pub const FOR_DEFAULT_DURATION: f64 = 200.0;
pub const DEFAULT_EASING: &str = "linear";
pub const DEFAULT_PROPERTIES: &str = "transform,opacity";

/// Centre movement (px) below which a move is not animated.
pub const MOVE_EPSILON: f32 = 0.5;

bitflags! {
    /// Phases an [`AnimationConfig`] will animate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AnimatePhases: u8 {
        const ENTER = 1 << 0;
        const EXIT = 1 << 1;
        const MOVE = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOptions {
    pub class: String,
    pub timing: AnimationTiming,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationConfig {
    pub enabled: bool,
    pub enter: Option<TransitionOptions>,
    pub exit: Option<TransitionOptions>,
    pub moves: Option<AnimationTiming>,
}

fn milliseconds(value: &str) -> f64 {
    let value = value.trim();
    value
        .strip_suffix("ms")
        .unwrap_or(value)
        .trim()
        .parse::<f64>()
        .unwrap_or(0.0)
}

impl AnimationConfig {
    /// Read the configuration from `element`.
    ///
    /// Without an `animate` attribute nothing is animated. `with_moves`
    /// enables move timing (lists only).
    pub fn from_element(document: &Document, element: NodeId, default_duration: f64, with_moves: bool) -> Self {
        if !document.has_attribute(element, "animate") {
            return Self::default();
        }

        let read = |phase: &str, name: &str| -> Option<String> {
            document
                .attribute(element, &format!("{phase}-{name}"))
                .filter(|v| !v.trim().is_empty())
                .or_else(|| {
                    document
                        .attribute(element, &format!("animate-{name}"))
                        .filter(|v| !v.trim().is_empty())
                })
        };
        let timing = |phase: &str| AnimationTiming {
            duration: read(phase, "duration")
                .map(|v| milliseconds(&v))
                .unwrap_or(default_duration),
            delay: read(phase, "delay").map(|v| milliseconds(&v)).unwrap_or(0.0),
            end_delay: read(phase, "end-delay")
                .map(|v| milliseconds(&v))
                .unwrap_or(0.0),
            easing: read(phase, "easing").unwrap_or_else(|| DEFAULT_EASING.to_string()),
        };
        let transition = |phase: &str| {
            read(phase, "class").map(|class| TransitionOptions {
                class: class.trim().to_string(),
                timing: timing(phase),
                properties: read(phase, "properties")
                    .unwrap_or_else(|| DEFAULT_PROPERTIES.to_string())
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect(),
            })
        };

        Self {
            enabled: true,
            enter: transition("enter"),
            exit: transition("exit"),
            moves: with_moves.then(|| timing("move")),
        }
    }

    pub fn phases(&self) -> AnimatePhases {
        let mut phases = AnimatePhases::empty();
        if !self.enabled {
            return phases;
        }
        phases.set(AnimatePhases::ENTER, self.enter.is_some());
        phases.set(AnimatePhases::EXIT, self.exit.is_some());
        phases.set(AnimatePhases::MOVE, self.moves.is_some());
        phases
    }
}

// =============================================================================
// Transitions
// =============================================================================

fn completion(task: LocalBoxFuture<'static, Option<()>>) -> LocalBoxFuture<'static, ()> {
    Box::pin(task.map(|_| ()))
}

pub(crate) fn dispatch(document: &Document, node: NodeId, kind: &str) {
    document.dispatch_event(node, Event::new(kind));
}

fn sample(document: &Document, node: NodeId, properties: &[String]) -> Keyframe {
    let properties: Vec<&str> = properties.iter().map(String::as_str).collect();
    document.computed_style(node, &properties)
}

/// Emit `entering`, play the enter transition if any, emit `entered` when
/// it completes (immediately without one).
pub(crate) fn enter(
    document: &Document,
    node: NodeId,
    options: Option<&TransitionOptions>,
) -> Option<LocalBoxFuture<'static, ()>> {
    dispatch(document, node, ENTERING);
    let Some(options) = options else {
        dispatch(document, node, ENTERED);
        return None;
    };

    document.add_class(node, &options.class);
    let start = sample(document, node, &options.properties);
    document.remove_class(node, &options.class);
    let end = sample(document, node, &options.properties);
    let animation = document.animate(node, vec![start, end], options.timing.clone());

    let tail = document.clone();
    Some(completion(document.spawn_tracked(async move {
        animation.finished().await;
        dispatch(&tail, node, ENTERED);
    })))
}

/// Emit `exiting`, play the exit transition if any, then detach the node
/// and emit `exited`.
///
/// Completion work runs on the document executor, so it happens even if
/// the returned future is dropped.
///
/// With a transition, the detach is skipped when `still_leaving` reports
/// false by the time it completes.
pub(crate) fn exit(
    document: &Document,
    node: NodeId,
    options: Option<&TransitionOptions>,
    still_leaving: impl Fn() -> bool + 'static,
) -> Option<LocalBoxFuture<'static, ()>> {
    dispatch(document, node, EXITING);
    let Some(options) = options else {
        document.remove(node);
        dispatch(document, node, EXITED);
        return None;
    };

    let start = sample(document, node, &options.properties);
    document.add_class(node, &options.class);
    let end = sample(document, node, &options.properties);
    let animation = document.animate(node, vec![start, end], options.timing.clone());

    let tail = document.clone();
    let class = options.class.clone();
    Some(completion(document.spawn_tracked(async move {
        animation.finished().await;
        tail.remove_class(node, &class);
        if still_leaving() {
            tail.remove(node);
            dispatch(&tail, node, EXITED);
        } else {
            trace!(?node, "exit superseded, node kept");
        }
    })))
}

/// Translate `node` from where it was back to where it is now.
///
/// Returns `None` when the centre moved less than [`MOVE_EPSILON`].
pub(crate) fn slide(
    document: &Document,
    node: NodeId,
    from: DomRect,
    to: DomRect,
    timing: &AnimationTiming,
) -> Option<LocalBoxFuture<'static, ()>> {
    let (start_x, start_y) = from.center();
    let (end_x, end_y) = to.center();
    let (dx, dy) = (start_x - end_x, start_y - end_y);
    if dx.abs() <= MOVE_EPSILON && dy.abs() <= MOVE_EPSILON {
        return None;
    }

    let mut first = Keyframe::new();
    first.insert("transform".to_string(), format!("translate({dx}px, {dy}px)"));
    let mut last = Keyframe::new();
    last.insert("transform".to_string(), "none".to_string());
    let animation = document.animate(node, vec![first, last], timing.clone());
    Some(Box::pin(animation.finished()))
}

// =============================================================================
// Tests
// =============================================================================
