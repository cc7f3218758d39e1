//! Runner configuration.

use serde::{Deserialize, Serialize};

/// How a [`GapsRunner`](crate::runner::GapsRunner) feeds the finder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapsConfig {
    /// Maximum number of blocks handed to `GapFinder::append` at once.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Keep reading after a batch is rejected with a cycle or fork.
    /// The rejected batch stays partially linked.
    #[serde(default)]
    pub continue_on_error: bool,
}

fn default_batch_size() -> usize { 10_000 }

impl Default for GapsConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            continue_on_error: false,
        }
    }
}

impl GapsConfig {
    /// Set the batch size. Zero is bumped to one.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Keep going after rejected batches.
    pub fn keep_going(mut self) -> Self {
        self.continue_on_error = true;
        self
    }
}
