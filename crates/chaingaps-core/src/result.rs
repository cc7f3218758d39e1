//! Read-only report over the chains a [`GapFinder`] has found.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::finder::GapFinder;
use crate::types::{Block, Chain};

const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Borrowed view of a finder's chains and counters.
#[derive(Debug, Clone, Copy)]
pub struct GapsResult<'a> {
    finder: &'a GapFinder,
}

impl<'a> GapsResult<'a> {
    pub(crate) fn new(finder: &'a GapFinder) -> Self {
        Self { finder }
    }

    /// All chains keyed by their gap hash.
    pub fn chains(&self) -> &'a HashMap<String, Chain> {
        self.finder.chains()
    }

    /// All chains in no particular order.
    pub fn chains_as_vec(&self) -> Vec<&'a Chain> {
        self.finder.chains().values().collect()
    }

    /// Chains ordered by head time. Chains whose head has no timestamp come
    /// first; ties are broken by head hash.
    pub fn chains_sorted(&self) -> Vec<&'a Chain> {
        let mut chains = self.chains_as_vec();
        chains.sort_by(|a, b| {
            a.head
                .timestamp
                .cmp(&b.head.timestamp)
                .then_with(|| a.head.hash.cmp(&b.head.hash))
        });
        chains
    }

    /// The longest chain; the earliest one wins a tie.
    pub fn longest(&self) -> Option<&'a Chain> {
        let mut longest: Option<&'a Chain> = None;
        for c in self.chains_sorted() {
            if longest.map_or(true, |l| l.length < c.length) {
                longest = Some(c);
            }
        }
        longest
    }

    /// Blocks appended to the finder, including those of rejected batches.
    pub fn total_blocks(&self) -> u64 {
        self.finder.total_blocks()
    }

    /// Number of open chains.
    pub fn chain_count(&self) -> usize {
        self.finder.len()
    }

    /// Time spent appending.
    pub fn took(&self) -> Duration {
        self.finder.took()
    }

    /// Serializable snapshot of the report.
    pub fn summary(&self) -> GapsSummary {
        let chains: Vec<ChainSummary> =
            self.chains_sorted().into_iter().map(ChainSummary::from).collect();
        GapsSummary {
            total_blocks: self.total_blocks(),
            chain_count: self.chain_count(),
            took_ms: self.took().as_secs_f64() * 1_000.0,
            longest: self.longest().map(ChainSummary::from),
            chains,
        }
    }

    /// Render the report as an aligned text table.
    pub fn print<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        let mut table = Table::new(["chain", "blocks", "head", "head time", "tail", "tail time"]);
        for (i, c) in self.chains_sorted().into_iter().enumerate() {
            table.row([
                i.to_string(),
                c.length.to_string(),
                c.head.hash.clone(),
                format_time(&c.head),
                c.tail.hash.clone(),
                format_time(&c.tail),
            ]);
        }
        table.write(w)?;

        match self.longest() {
            Some(longest) => {
                let line = format!(
                    "Longest: {} blocks  head {}  tail {}",
                    longest.length, longest.head.hash, longest.tail.hash
                );
                writeln!(w, "{}", "-".repeat(line.len()))?;
                writeln!(w, "{line}")?;
                writeln!(
                    w,
                    "         head time {}  tail time {}",
                    format_time(&longest.head),
                    format_time(&longest.tail)
                )?;
            }
            None => {
                writeln!(w, "{}", "-".repeat(16))?;
                writeln!(w, "Longest: -")?;
            }
        }
        writeln!(w, "Total:   {} blocks", self.total_blocks())?;
        writeln!(w, "Found:   {} chains", self.chain_count())?;
        writeln!(w, "Took:    {:?}", self.took())?;
        Ok(())
    }
}

// ─── Summary types ────────────────────────────────────────────────────────────

/// Snapshot of a finder, suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapsSummary {
    pub total_blocks: u64,
    pub chain_count: usize,
    pub took_ms: f64,
    pub longest: Option<ChainSummary>,
    /// Chains in head-time order.
    pub chains: Vec<ChainSummary>,
}

/// Endpoints and length of one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub length: u64,
    pub head: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_time: Option<i64>,
    pub tail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_time: Option<i64>,
    /// Hash the chain is still missing below its head.
    pub gap: String,
}

impl From<&Chain> for ChainSummary {
    fn from(c: &Chain) -> Self {
        Self {
            length: c.length,
            head: c.head.hash.clone(),
            head_time: c.head.timestamp,
            tail: c.tail.hash.clone(),
            tail_time: c.tail.timestamp,
            gap: c.gap().to_owned(),
        }
    }
}

// ─── Text table ───────────────────────────────────────────────────────────────

fn format_time(block: &Block) -> String {
    block
        .timestamp
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|t| t.format(TIME_LAYOUT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Left-aligned columns separated by two spaces.
struct Table<const N: usize> {
    rows: Vec<[String; N]>,
}

impl<const N: usize> Table<N> {
    fn new(header: [&str; N]) -> Self {
        Self {
            rows: vec![header.map(str::to_string)],
        }
    }

    fn row(&mut self, cells: [String; N]) {
        self.rows.push(cells);
    }

    fn write<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        let mut widths = [0usize; N];
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        for row in &self.rows {
            let line = row
                .iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ");
            writeln!(w, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
