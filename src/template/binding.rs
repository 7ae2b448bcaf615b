//! Bindings - compiled update closures.

use futures::future::{LocalBoxFuture, join_all};

use crate::data::Data;
use crate::error::Result;

/// Asynchronous tail of an update (animations still running).
pub type Pending = LocalBoxFuture<'static, Result<()>>;

/// Applies one data snapshot to the live DOM.
///
/// Returns `Some(pending)` when part of the work completes later.
pub type Binding = Box<dyn FnMut(&Data) -> Result<Option<Pending>>>;

/// Outcome of one `TemplateBinding::update`.
#[must_use = "dropping a Render discards animation completion"]
pub struct Render {
    pending: Vec<Pending>,
}

impl Render {
    /// A render with nothing left to wait for.
    pub fn settled() -> Self {
        Self { pending: Vec::new() }
    }

    /// True when every binding finished synchronously.
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Collapse into a single future, if anything is still running.
    pub fn into_pending(self) -> Option<Pending> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Box::pin(self.finished()))
    }

    /// Resolves when every pending tail has completed.
    pub async fn finished(self) -> Result<()> {
        for result in join_all(self.pending).await {
            result?;
        }
        Ok(())
    }
}

/// The flattened bindings of one compiled fragment, in document order.
pub struct TemplateBinding {
    bindings: Vec<Binding>,
}

impl TemplateBinding {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn update(&mut self, data: &Data) -> Result<Render> {
        let mut pending = Vec::new();
        for binding in &mut self.bindings {
            if let Some(tail) = binding(data)? {
                pending.push(tail);
            }
        }
        Ok(Render { pending })
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl From<TemplateBinding> for Binding {
    fn from(mut template: TemplateBinding) -> Self {
        Box::new(move |data| Ok(template.update(data)?.into_pending()))
    }
}
