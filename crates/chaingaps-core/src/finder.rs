//! Gap finder — rebuilds chains from hash-linked blocks fed in any order.
//!
//! Each chain is stored under its gap, the `prev_hash` of its head block.
//! That is the one hash the chain is waiting for to grow backwards, so a block
//! that fills a gap is found with a single map lookup. Growing forwards is a
//! scan over open chains for a tail the block points at.
//!
//! Only endpoints are kept. Forks and cycles are caught when they touch an
//! endpoint; ones hidden inside a chain go unnoticed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::ChainError;
use crate::result::GapsResult;
use crate::types::{Block, Chain};

/// Incremental index of chain fragments keyed by their outstanding gap.
///
/// Appending takes `&mut self` and runs to completion; callers sharing one
/// finder between tasks must serialise appends behind a lock.
#[derive(Debug, Default)]
pub struct GapFinder {
    /// gap hash (`chain.head.prev_hash`) → chain
    chains: HashMap<String, Chain>,
    /// Blocks handed to `append`, including those of failed batches.
    total_blocks: u64,
    /// Time spent inside `append`.
    took: Duration,
}

impl GapFinder {
    /// Create an empty finder with no open chains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a batch of blocks into the known chains.
    ///
    /// Blocks are linked one by one, then chains whose ends now touch are
    /// merged until none are left. The final set of chains does not depend on
    /// the order of blocks inside the batch.
    ///
    /// On error the remaining blocks of the batch are not linked. Blocks linked
    /// before the failing one stay in place, touching chains are still merged,
    /// and chains found closed into a loop are dropped, so later batches link
    /// as if the offending blocks had never arrived.
    pub fn append(&mut self, blocks: Vec<Block>) -> Result<(), ChainError> {
        if blocks.is_empty() {
            return Ok(());
        }

        self.total_blocks += blocks.len() as u64;
        let start = Instant::now();
        let result = self.link_batch(blocks);
        self.took += start.elapsed();
        result
    }

    /// All open chains, keyed by gap hash.
    pub fn chains(&self) -> &HashMap<String, Chain> {
        &self.chains
    }

    /// Number of open chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Returns `true` if there are no open chains.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Total number of blocks appended so far.
    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    /// Accumulated processing time.
    pub fn took(&self) -> Duration {
        self.took
    }

    /// Read-only report over the current chains.
    pub fn result(&self) -> GapsResult<'_> {
        GapsResult::new(self)
    }

    fn link_batch(&mut self, blocks: Vec<Block>) -> Result<(), ChainError> {
        let batch = blocks.len();
        for block in blocks {
            if let Err(e) = self.link(block) {
                // Loops found here are dropped and already logged.
                let _ = self.merge();
                return Err(e);
            }
        }
        let merged = self.merge()?;

        tracing::debug!(batch, merged, chains = self.chains.len(), "Batch linked");
        Ok(())
    }

    /// Attach one block to a chain, or open a new chain for it.
    fn link(&mut self, block: Block) -> Result<(), ChainError> {
        if block.is_self_linked() {
            return Err(cycle(block.clone(), block));
        }

        // The block is the missing predecessor of a chain's head.
        if let Some(chain) = self.chains.get(&block.hash) {
            if chain.tail.hash == block.hash {
                return Err(cycle(block, chain.tail.clone()));
            }
            // Re-keying would leave two chains waiting for one predecessor.
            if self.chains.contains_key(&block.prev_hash) {
                return Err(fork(block.hash));
            }
            if let Some(mut chain) = self.chains.remove(&block.hash) {
                tracing::trace!(hash = %block.hash, gap = %block.prev_hash, "Extended chain head");
                chain.head = block;
                chain.length += 1;
                self.chains.insert(chain.gap().to_owned(), chain);
            }
            return Ok(());
        }

        // The block continues a chain's tail.
        if let Some(chain) = self.chains.values_mut().find(|c| block.extends(&c.tail)) {
            if block.hash == chain.gap() {
                return Err(cycle(chain.head.clone(), block));
            }
            tracing::trace!(hash = %block.hash, "Extended chain tail");
            chain.tail = block;
            chain.length += 1;
            return Ok(());
        }

        match self.chains.entry(block.prev_hash.clone()) {
            Entry::Occupied(entry) => {
                if entry.get().head.hash != block.hash {
                    return Err(fork(block.hash));
                }
                // Same block as the head already waiting on this gap.
                tracing::trace!(hash = %block.hash, "Repeated chain head ignored");
            }
            Entry::Vacant(entry) => {
                tracing::trace!(hash = %block.hash, gap = %block.prev_hash, "Opened chain");
                entry.insert(Chain::single(block));
            }
        }
        Ok(())
    }

    /// Join chains whose tail is the gap of another chain.
    ///
    /// Returns how many chains were absorbed. No key is ever inserted here, so
    /// a single pass over the gaps reaches the fixed point.
    ///
    /// A chain waiting on its own tail is a closed loop: it is removed and the
    /// pass carries on, then the first such cycle is returned.
    fn merge(&mut self) -> Result<usize, ChainError> {
        let gaps: Vec<String> = self.chains.keys().cloned().collect();
        let mut merged = 0;
        let mut closed = None;

        for gap in gaps {
            loop {
                // Absorbed by an earlier chain in this pass.
                let Some(chain) = self.chains.get(&gap) else {
                    break;
                };
                if chain.tail.hash == gap {
                    if let Some(chain) = self.chains.remove(&gap) {
                        closed.get_or_insert(cycle(chain.head, chain.tail));
                    }
                    break;
                }

                let tail = chain.tail.hash.clone();
                let Some(next) = self.chains.remove(&tail) else {
                    break;
                };
                if let Some(chain) = self.chains.get_mut(&gap) {
                    chain.tail = next.tail;
                    chain.length += next.length;
                    merged += 1;
                }
            }
        }
        match closed {
            Some(e) => Err(e),
            None => Ok(merged),
        }
    }
}

fn cycle(head: Block, tail: Block) -> ChainError {
    tracing::warn!(head = %head.hash, tail = %tail.hash, "Cycled chain found");
    ChainError::Cycle { head, tail }
}

fn fork(hash: String) -> ChainError {
    tracing::warn!(%hash, "Fork block found");
    ChainError::Fork { hash }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(hash: &str, prev: &str) -> Block {
        Block::new(hash, prev)
    }

    fn endpoints(finder: &GapFinder, gap: &str) -> (String, String, u64) {
        let c = &finder.chains()[gap];
        (c.head.hash.clone(), c.tail.hash.clone(), c.length)
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut finder = GapFinder::new();
        finder.append(vec![]).unwrap();
        assert!(finder.is_empty());
        assert_eq!(finder.total_blocks(), 0);
    }

    #[test]
    fn single_block_opens_chain() {
        let mut finder = GapFinder::new();
        finder.append(vec![b("h1", "h0")]).unwrap();
        assert_eq!(finder.len(), 1);
        assert_eq!(endpoints(&finder, "h0"), ("h1".into(), "h1".into(), 1));
    }

    #[test]
    fn head_extension_rekeys_chain() {
        let mut finder = GapFinder::new();
        finder.append(vec![b("h2", "h1")]).unwrap();
        finder.append(vec![b("h1", "h0")]).unwrap();

        assert_eq!(finder.len(), 1);
        assert!(!finder.chains().contains_key("h1"));
        assert_eq!(endpoints(&finder, "h0"), ("h1".into(), "h2".into(), 2));
    }

    #[test]
    fn tail_extension_keeps_key() {
        let mut finder = GapFinder::new();
        finder.append(vec![b("h1", "h0"), b("h2", "h1"), b("h3", "h2")]).unwrap();
        assert_eq!(endpoints(&finder, "h0"), ("h1".into(), "h3".into(), 3));
    }

    #[test]
    fn merge_cascades_through_chains() {
        let mut finder = GapFinder::new();
        // Three disjoint pieces, then the blocks that bridge them.
        finder.append(vec![b("a1", "a0"), b("a3", "a2"), b("a5", "a4")]).unwrap();
        assert_eq!(finder.len(), 3);

        finder.append(vec![b("a4", "a3"), b("a2", "a1")]).unwrap();
        assert_eq!(finder.len(), 1);
        assert_eq!(endpoints(&finder, "a0"), ("a1".into(), "a5".into(), 5));
    }

    #[test]
    fn fork_on_shared_predecessor() {
        let mut finder = GapFinder::new();
        let err = finder.append(vec![b("h1", "h0"), b("h2", "h0")]).unwrap_err();
        assert_eq!(err, ChainError::Fork { hash: "h2".into() });
    }

    #[test]
    fn fork_against_earlier_batch() {
        let mut finder = GapFinder::new();
        finder.append(vec![b("h1", "h0"), b("h2", "h1")]).unwrap();
        let err = finder.append(vec![b("b1", "h0")]).unwrap_err();
        assert!(err.is_fork());
    }

    #[test]
    fn fork_when_rekey_collides() {
        let mut finder = GapFinder::new();
        // x waits on p, z waits on y; then y claims p as well.
        finder.append(vec![b("x", "p"), b("z", "y")]).unwrap();
        let err = finder.append(vec![b("y", "p")]).unwrap_err();
        assert_eq!(err, ChainError::Fork { hash: "y".into() });
        // Nothing was re-keyed.
        assert_eq!(finder.len(), 2);
        assert_eq!(endpoints(&finder, "p"), ("x".into(), "x".into(), 1));
        assert_eq!(endpoints(&finder, "y"), ("z".into(), "z".into(), 1));
    }

    #[test]
    fn repeated_head_is_ignored() {
        let mut finder = GapFinder::new();
        finder.append(vec![b("h1", "h0")]).unwrap();
        finder.append(vec![b("h1", "h0")]).unwrap();
        assert_eq!(finder.len(), 1);
        assert_eq!(finder.total_blocks(), 2);
        assert_eq!(endpoints(&finder, "h0").2, 1);
    }

    #[test]
    fn self_linked_block_is_cycle() {
        let mut finder = GapFinder::new();
        let err = finder.append(vec![b("x", "x")]).unwrap_err();
        assert!(err.is_cycle());
        assert!(finder.is_empty());
    }

    #[test]
    fn three_block_loop_is_cycle_in_any_order() {
        let blocks = [b("h1", "h3"), b("h2", "h1"), b("h3", "h2")];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let batch = order.iter().map(|&i| blocks[i].clone()).collect();
            let mut finder = GapFinder::new();
            let err = finder.append(batch).unwrap_err();
            assert!(err.is_cycle(), "order {order:?} gave {err}");
        }
    }

    #[test]
    fn closed_loop_is_dropped() {
        let mut finder = GapFinder::new();
        let err = finder.append(vec![b("h1", "h2"), b("h2", "h1")]).unwrap_err();
        assert!(err.is_cycle());
        assert!(finder.is_empty());

        // The next batch links as if the loop had never been seen.
        finder.append(vec![b("a1", "a0"), b("a3", "a2"), b("a2", "a1")]).unwrap();
        assert_eq!(finder.len(), 1);
        assert_eq!(endpoints(&finder, "a0"), ("a1".into(), "a3".into(), 3));
    }

    #[test]
    fn merge_finishes_past_a_loop() {
        let blocks = [b("h1", "h2"), b("h2", "h1"), b("a1", "a0"), b("a3", "a2"), b("a2", "a1")];
        for rotate in 0..blocks.len() {
            let mut batch = blocks.to_vec();
            batch.rotate_left(rotate);
            let mut finder = GapFinder::new();
            assert!(finder.append(batch).unwrap_err().is_cycle());
            assert_eq!(finder.len(), 1, "rotation {rotate}");
            assert_eq!(endpoints(&finder, "a0"), ("a1".into(), "a3".into(), 3));
        }
    }

    #[test]
    fn failed_link_still_merges_touching_chains() {
        let mut finder = GapFinder::new();
        let err = finder
            .append(vec![b("a1", "a0"), b("a3", "a2"), b("a2", "a1"), b("x1", "a0")])
            .unwrap_err();
        assert!(err.is_fork());
        assert_eq!(finder.len(), 1);
        assert_eq!(endpoints(&finder, "a0"), ("a1".into(), "a3".into(), 3));
    }

    #[test]
    fn error_leaves_earlier_links_in_place() {
        let mut finder = GapFinder::new();
        let err = finder
            .append(vec![b("h1", "h0"), b("h2", "h1"), b("x1", "h0"), b("c1", "c0")])
            .unwrap_err();
        assert!(err.is_fork());
        assert_eq!(finder.len(), 1);
        assert_eq!(endpoints(&finder, "h0"), ("h1".into(), "h2".into(), 2));
        assert_eq!(finder.total_blocks(), 4);

        // The finder keeps working after a rejected batch.
        finder.append(vec![b("c1", "c0")]).unwrap();
        assert_eq!(finder.len(), 2);
    }
}
