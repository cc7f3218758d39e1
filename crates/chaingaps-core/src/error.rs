//! Error types for the gap finder.

use thiserror::Error;

use crate::types::Block;

/// Structural violations found while linking blocks.
///
/// Both are fatal to the batch being appended. The finder never retries,
/// the input is inconsistent rather than the operation being flaky.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("cycled chain found: head {head}, tail {tail}")]
    Cycle { head: Block, tail: Block },

    #[error("fork block found: {hash}")]
    Fork { hash: String },
}

impl ChainError {
    /// Returns `true` if the error is a cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }

    /// Returns `true` if the error is a fork.
    pub fn is_fork(&self) -> bool {
        matches!(self, Self::Fork { .. })
    }
}

/// Errors raised while feeding the finder from a block source.
#[derive(Debug, Error)]
pub enum GapsError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed block at line {line}: {reason}")]
    Decode { line: u64, reason: String },

    #[error("Source error: {0}")]
    Source(String),
}

impl GapsError {
    /// The chain error behind this error, if any.
    pub fn as_chain(&self) -> Option<&ChainError> {
        match self {
            Self::Chain(e) => Some(e),
            _ => None,
        }
    }
}
