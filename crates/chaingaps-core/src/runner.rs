//! Batch runner — drains a [`BlockSource`] into a [`GapFinder`].
//!
//! Each batch pulled from the source is appended as a unit. A batch rejected
//! with a cycle or fork either stops the run or, with
//! `continue_on_error`, is logged and skipped while reading goes on.

use serde::{Deserialize, Serialize};

use crate::config::GapsConfig;
use crate::error::GapsError;
use crate::finder::GapFinder;
use crate::source::BlockSource;

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Batches pulled from the source.
    pub batches: u64,
    /// Blocks pulled from the source.
    pub blocks: u64,
    /// Batches that failed with a cycle or fork.
    pub rejected_batches: u64,
}

/// Feeds a finder from a block source.
pub struct GapsRunner<S> {
    config: GapsConfig,
    source: S,
    finder: GapFinder,
    stats: RunStats,
}

impl<S: BlockSource> GapsRunner<S> {
    pub fn new(config: GapsConfig, source: S) -> Self {
        Self::with_finder(config, source, GapFinder::new())
    }

    /// Continue feeding an existing finder.
    pub fn with_finder(config: GapsConfig, source: S, finder: GapFinder) -> Self {
        Self {
            config,
            source,
            finder,
            stats: RunStats::default(),
        }
    }

    /// Read the source to the end.
    pub async fn run(&mut self) -> Result<RunStats, GapsError> {
        let batch_size = self.config.batch_size.max(1);
        tracing::info!(batch_size, "Starting block scan");

        while let Some(batch) = self.source.next_batch(batch_size).await? {
            let size = batch.len();
            self.stats.batches += 1;
            self.stats.blocks += size as u64;

            if let Err(e) = self.finder.append(batch) {
                if !self.config.continue_on_error {
                    return Err(e.into());
                }
                self.stats.rejected_batches += 1;
                tracing::warn!(
                    batch = self.stats.batches,
                    error = %e,
                    "Batch rejected, continuing"
                );
                continue;
            }

            tracing::info!(
                batch = self.stats.batches,
                size,
                blocks = self.stats.blocks,
                chains = self.finder.len(),
                "Batch complete"
            );
        }

        tracing::info!(
            blocks = self.stats.blocks,
            chains = self.finder.len(),
            rejected = self.stats.rejected_batches,
            "Scan complete"
        );
        Ok(self.stats)
    }

    /// Counters so far.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn finder(&self) -> &GapFinder {
        &self.finder
    }

    pub fn into_finder(self) -> GapFinder {
        self.finder
    }
}
