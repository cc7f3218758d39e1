//! Shared types for the gap finder.

use std::fmt;

use chrono::DateTime;
use serde::{de, Deserialize, Deserializer, Serialize};

// ─── Block ────────────────────────────────────────────────────────────────────

/// A single link in a chain: its own hash plus the hash of its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block hash.
    #[serde(alias = "blockHash", alias = "block_hash")]
    pub hash: String,
    /// Hash of the previous block. It may not have been seen yet.
    #[serde(alias = "prevHash", alias = "parentHash", alias = "parent_hash")]
    pub prev_hash: String,
    /// Unix timestamp of the block (seconds since epoch), used for reporting only.
    #[serde(
        default,
        alias = "time",
        deserialize_with = "de_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<i64>,
}

impl Block {
    /// Create a block without a timestamp.
    pub fn new(hash: impl Into<String>, prev_hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            prev_hash: prev_hash.into(),
            timestamp: None,
        }
    }

    /// Attach a timestamp.
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns `true` if `parent` is the direct predecessor of `self`.
    pub fn extends(&self, parent: &Block) -> bool {
        self.prev_hash == parent.hash
    }

    /// Returns `true` if the block names itself as its predecessor.
    pub fn is_self_linked(&self) -> bool {
        self.hash == self.prev_hash
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (prev {})", self.hash, self.prev_hash)
    }
}

/// Accepts seconds as a number, a decimal or `0x` hex string, or RFC 3339.
fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(d)? {
        None => Ok(None),
        Some(Raw::Secs(secs)) => Ok(Some(secs)),
        Some(Raw::Text(s)) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp {s:?}"))),
    }
}

fn parse_timestamp(s: &str) -> Option<i64> {
    if let Some(hex) = s.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    s.parse()
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|t| t.timestamp()))
}

// ─── Chain ────────────────────────────────────────────────────────────────────

/// A contiguous run of blocks found so far.
///
/// Only the two endpoints are kept, interior blocks are counted but dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Oldest known block. Its `prev_hash` is the chain's outstanding gap.
    pub head: Block,
    /// Newest known block.
    pub tail: Block,
    /// Number of blocks in the chain.
    pub length: u64,
}

impl Chain {
    /// A chain made of a single block.
    pub fn single(block: Block) -> Self {
        Self {
            tail: block.clone(),
            head: block,
            length: 1,
        }
    }

    /// The hash this chain is waiting for on its old side.
    pub fn gap(&self) -> &str {
        &self.head.prev_hash
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_extends_parent() {
        let parent = Block::new("0xaaa", "0x000");
        let child = Block::new("0xbbb", "0xaaa");
        assert!(child.extends(&parent));
        assert!(!parent.extends(&child));
    }

    #[test]
    fn single_chain_endpoints_coincide() {
        let chain = Chain::single(Block::new("h1", "h0").at(1_700_000_000));
        assert_eq!(chain.head, chain.tail);
        assert_eq!(chain.length, 1);
        assert_eq!(chain.gap(), "h0");
    }

    #[test]
    fn block_deserializes_camel_case_keys() {
        let b: Block =
            serde_json::from_str(r#"{"blockHash":"h2","parentHash":"h1","time":12}"#).unwrap();
        assert_eq!(b, Block::new("h2", "h1").at(12));

        let b: Block = serde_json::from_str(r#"{"hash":"h2","prevHash":"h1"}"#).unwrap();
        assert_eq!(b.timestamp, None);
    }

    #[test]
    fn timestamp_formats() {
        let parse = |t: &str| serde_json::from_str::<Block>(&format!(
            r#"{{"hash":"a","prev_hash":"b","timestamp":{t}}}"#
        ));
        assert_eq!(parse("1700000000").unwrap().timestamp, Some(1_700_000_000));
        assert_eq!(parse(r#""0x6553f100""#).unwrap().timestamp, Some(0x6553_f100));
        assert_eq!(parse(r#""42""#).unwrap().timestamp, Some(42));
        assert_eq!(parse(r#""1970-01-01T00:01:00Z""#).unwrap().timestamp, Some(60));
        assert_eq!(parse("null").unwrap().timestamp, None);
        assert!(parse(r#""yesterday""#).is_err());
    }

    #[test]
    fn self_linked_block() {
        assert!(Block::new("x", "x").is_self_linked());
        assert!(!Block::new("x", "y").is_self_linked());
    }
}
