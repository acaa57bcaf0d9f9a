//! Progress reporting while frames load.

use std::sync::Arc;

/// Progress of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    /// Items finished so far.
    pub current: usize,
    pub total: usize,
    pub stage: LoadStage,
}

/// Stage of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Decoding image files.
    Decoding,
    /// Assembling decoded frames into stacks.
    Stacking,
}

/// Optional progress sink; informational only.
pub type ProgressCallback = Option<Arc<dyn Fn(LoadProgress) + Send + Sync>>;

/// Report progress using the callback if set.
pub fn report_progress(callback: &ProgressCallback, current: usize, total: usize, stage: LoadStage) {
    if let Some(f) = callback.as_ref() {
        f(LoadProgress {
            current,
            total,
            stage,
        });
    }
}
