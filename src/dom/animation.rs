//! Animation Timeline - keyframe animations on a virtual clock.
//!
//! Animations never interpolate anything here; the timeline records what
//! was requested and tells the caller when it is over. Time only moves when
//! the host calls [`Document::advance`], which keeps animation-driven
//! reconciliation deterministic.
//!
//! # Example
//!
//! ```ignore
//! let animation = doc.animate(node, vec![from, to], AnimationTiming::with_duration(200.0));
//! doc.spawn_local(async move {
//!     animation.finished().await;
//!     // runs once the clock passes 200ms
//! });
//! doc.advance(200.0);
//! ```

use std::collections::{HashMap, VecDeque};

use futures::channel::oneshot;
use indexmap::IndexMap;
use tracing::trace;

use super::document::{Document, NodeId};

/// One keyframe: style property to value.
pub type Keyframe = IndexMap<String, String>;

// =============================================================================
// TIMING
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTiming {
    /// Milliseconds.
    pub duration: f64,
    pub delay: f64,
    pub end_delay: f64,
    pub easing: String,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            duration: 0.0,
            delay: 0.0,
            end_delay: 0.0,
            easing: "linear".to_string(),
        }
    }
}

impl AnimationTiming {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    /// Time from start until the animation reports completion.
    pub fn total(&self) -> f64 {
        (self.delay + self.duration + self.end_delay).max(0.0)
    }
}

// =============================================================================
// TIMELINE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Running,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct AnimationRecord {
    pub id: u64,
    pub target: NodeId,
    pub keyframes: Vec<Keyframe>,
    pub timing: AnimationTiming,
    pub start_time: f64,
    pub state: PlayState,
}

/// Finished and cancelled records kept for [`Document::animations`].
pub const ANIMATION_HISTORY: usize = 256;

#[derive(Default)]
pub(crate) struct Timeline {
    now: f64,
    next_id: u64,
    running: Vec<AnimationRecord>,
    history: VecDeque<AnimationRecord>,
    waiting: HashMap<u64, oneshot::Sender<()>>,
}

impl Timeline {
    fn retire(&mut self, mut record: AnimationRecord, state: PlayState) {
        record.state = state;
        if self.history.len() >= ANIMATION_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// Move due animations to the history and hand back their completion
    /// senders.
    fn finish_due(&mut self, finish_all: bool) -> Vec<oneshot::Sender<()>> {
        let now = self.now;
        let (due, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.running)
            .into_iter()
            .partition(|record| finish_all || record.start_time + record.timing.total() <= now);
        self.running = running;

        let mut senders = Vec::new();
        for record in due {
            if let Some(sender) = self.waiting.remove(&record.id) {
                senders.push(sender);
            }
            self.retire(record, PlayState::Finished);
        }
        senders
    }

    fn cancel(&mut self, id: u64) {
        if let Some(position) = self.running.iter().position(|record| record.id == id) {
            let record = self.running.remove(position);
            self.retire(record, PlayState::Cancelled);
        }
        self.waiting.remove(&id);
    }

    /// Drop every record targeting one of `nodes`. Running ones resolve
    /// as if cancelled.
    pub(crate) fn forget(&mut self, nodes: &[NodeId]) {
        let waiting = &mut self.waiting;
        self.running.retain(|record| {
            let keep = !nodes.contains(&record.target);
            if !keep {
                waiting.remove(&record.id);
            }
            keep
        });
        self.history.retain(|record| !nodes.contains(&record.target));
    }
}

/// Handle to a running animation.
pub struct Animation {
    id: u64,
    document: Document,
    finished: oneshot::Receiver<()>,
}

impl Animation {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the animation. Its `finished` future resolves immediately.
    pub fn cancel(&self) {
        self.document.state_mut().timeline.cancel(self.id);
    }

    /// Resolves when the animation finishes or is cancelled.
    pub async fn finished(self) {
        let _ = self.finished.await;
    }
}

// =============================================================================
// DOCUMENT INTEGRATION
// =============================================================================

impl Document {
    /// Start an animation on `target` at the current clock time.
    pub fn animate(&self, target: NodeId, keyframes: Vec<Keyframe>, timing: AnimationTiming) -> Animation {
        let (sender, receiver) = oneshot::channel();
        let id = {
            let mut state = self.state_mut();
            let timeline = &mut state.timeline;
            let id = timeline.next_id;
            timeline.next_id += 1;
            trace!(id, ?target, duration = timing.duration, "animation started");
            timeline.running.push(AnimationRecord {
                id,
                target,
                keyframes,
                timing,
                start_time: timeline.now,
                state: PlayState::Running,
            });
            timeline.waiting.insert(id, sender);
            id
        };
        Animation {
            id,
            document: self.clone(),
            finished: receiver,
        }
    }

    /// Current clock time in milliseconds.
    pub fn now(&self) -> f64 {
        self.state().timeline.now
    }

    /// Move the clock forward, complete every animation whose end time has
    /// passed and run the tasks waiting on them.
    ///
    /// Animations started by those tasks with zero length also complete.
    pub fn advance(&self, ms: f64) {
        self.state_mut().timeline.now += ms.max(0.0);
        self.settle(false);
    }

    /// Complete every running animation regardless of its end time.
    pub fn finish_animations(&self) {
        self.settle(true);
    }

    fn settle(&self, finish_all: bool) {
        self.run_until_stalled();
        loop {
            let senders = self.state_mut().timeline.finish_due(finish_all);
            if senders.is_empty() {
                break;
            }
            for sender in senders {
                let _ = sender.send(());
            }
            self.run_until_stalled();
        }
    }

    /// Animations started on `target`, oldest first: the running ones plus
    /// whatever the bounded history still holds.
    pub fn animations(&self, target: NodeId) -> Vec<AnimationRecord> {
        let state = self.state();
        let timeline = &state.timeline;
        let mut records: Vec<AnimationRecord> = timeline
            .history
            .iter()
            .chain(&timeline.running)
            .filter(|record| record.target == target)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }

    pub fn running_animation_count(&self) -> usize {
        self.state().timeline.running.len()
    }

    /// Records held by the timeline, running and retired.
    pub fn animation_record_count(&self) -> usize {
        let state = self.state();
        state.timeline.running.len() + state.timeline.history.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
