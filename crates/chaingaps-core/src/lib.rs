//! chaingaps-core — incremental chain reconstruction from hash-linked blocks.
//!
//! # Architecture
//!
//! ```text
//! BlockSource ──batches──▶ GapsRunner ──append──▶ GapFinder
//!  (JSON lines,                                     ├── link   (head / tail / new chain)
//!   iterator, stream)                               ├── merge  (join touching chains)
//!                                                   └── result ──▶ GapsResult (table, summary)
//! ```
//!
//! The finder keeps only the two endpoints and the length of each chain, so
//! memory grows with the number of open chains rather than the number of
//! blocks seen.
//!
//! ```
//! use chaingaps_core::{Block, GapFinder};
//!
//! let mut finder = GapFinder::new();
//! finder.append(vec![Block::new("h2", "h1"), Block::new("h3", "h2")]).unwrap();
//! finder.append(vec![Block::new("h1", "h0")]).unwrap();
//!
//! let chain = &finder.chains()["h0"];
//! assert_eq!((chain.head.hash.as_str(), chain.tail.hash.as_str(), chain.length), ("h1", "h3", 3));
//! ```

pub mod config;
pub mod error;
pub mod finder;
pub mod result;
pub mod runner;
pub mod source;
pub mod types;

pub use config::GapsConfig;
pub use error::{ChainError, GapsError};
pub use finder::GapFinder;
pub use result::{ChainSummary, GapsResult, GapsSummary};
pub use runner::{GapsRunner, RunStats};
pub use source::{BlockSource, IterSource, JsonLinesSource, StreamSource};
pub use types::{Block, Chain};
