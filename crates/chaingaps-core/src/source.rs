//! Block sources — where a runner pulls its batches from.
//!
//! Large block dumps are read a batch at a time so the whole stream never
//! has to sit in memory.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::error::GapsError;
use crate::types::Block;

/// Something that yields blocks in batches.
#[async_trait]
pub trait BlockSource: Send {
    /// Return up to `max` blocks, or `None` once the source is exhausted.
    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<Block>>, GapsError>;
}

// ─── JSON lines ───────────────────────────────────────────────────────────────

/// Reads one JSON-encoded block per line. Blank lines are skipped.
///
/// ```text
/// {"hash":"0xb2","parentHash":"0xb1","timestamp":1700000012}
/// {"hash":"0xb1","prev_hash":"0xb0"}
/// ```
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line: u64,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> u64 {
        self.line
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a JSON-lines file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, GapsError> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl JsonLinesSource<BufReader<Stdin>> {
    /// Read blocks from standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> BlockSource for JsonLinesSource<R> {
    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<Block>>, GapsError> {
        let mut batch = Vec::new();
        while batch.len() < max {
            let next = self.lines.next_line().await.map_err(|e| match e.kind() {
                io::ErrorKind::InvalidData => GapsError::Decode {
                    line: self.line + 1,
                    reason: e.to_string(),
                },
                _ => GapsError::Io(e),
            })?;
            let Some(text) = next else {
                break;
            };
            self.line += 1;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let block = serde_json::from_str(text).map_err(|e| GapsError::Decode {
                line: self.line,
                reason: e.to_string(),
            })?;
            batch.push(block);
        }
        Ok((!batch.is_empty()).then_some(batch))
    }
}

// ─── In-memory ────────────────────────────────────────────────────────────────

/// Serves blocks from any iterator, `max` at a time.
pub struct IterSource<I> {
    iter: I,
}

impl<I: Iterator<Item = Block> + Send> IterSource<I> {
    pub fn new(blocks: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: blocks.into_iter(),
        }
    }
}

#[async_trait]
impl<I: Iterator<Item = Block> + Send> BlockSource for IterSource<I> {
    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<Block>>, GapsError> {
        let batch: Vec<Block> = self.iter.by_ref().take(max).collect();
        Ok((!batch.is_empty()).then_some(batch))
    }
}

// ─── Stream adapter ───────────────────────────────────────────────────────────

/// Adapts a stream of blocks (e.g. decoded from a subscription) into a source.
pub struct StreamSource<S> {
    stream: S,
}

impl<S> StreamSource<S>
where
    S: Stream<Item = Result<Block, GapsError>> + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> BlockSource for StreamSource<S>
where
    S: Stream<Item = Result<Block, GapsError>> + Unpin + Send,
{
    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<Block>>, GapsError> {
        let mut batch = Vec::new();
        while batch.len() < max {
            match self.stream.next().await {
                Some(block) => batch.push(block?),
                None => break,
            }
        }
        Ok((!batch.is_empty()).then_some(batch))
    }
}
