//! `chaingaps scan` — read JSON-lines blocks and report the chains they form.
//!
//! Config file format (YAML, every field optional):
//! ```yaml
//! gaps:
//!   batch_size: 50000
//!   continue_on_error: false
//! log:
//!   level: info
//!   json: false
//!   components:
//!     chaingaps-core: debug
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chaingaps_core::{BlockSource, GapFinder, GapsConfig, GapsRunner, JsonLinesSource, RunStats};

use crate::logging::{self, LogConfig};

/// Contents of the `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub gaps: GapsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Flags of the `scan` subcommand.
#[derive(Debug, Default)]
pub struct ScanArgs {
    pub input: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub keep_going: bool,
    pub json: bool,
    pub config: Option<PathBuf>,
}

impl ScanArgs {
    /// File config with command-line flags applied on top.
    fn resolve(&self, verbose: bool) -> Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::load(path)?,
            None => CliConfig::default(),
        };
        if let Some(n) = self.batch_size {
            config.gaps = config.gaps.batch_size(n);
        }
        if self.keep_going {
            config.gaps.continue_on_error = true;
        }
        if verbose {
            config.log.level = "debug".into();
        }
        Ok(config)
    }
}

#[derive(Serialize)]
struct JsonReport {
    stats: RunStats,
    #[serde(flatten)]
    summary: chaingaps_core::GapsSummary,
}

pub async fn run(args: ScanArgs, verbose: bool) -> Result<()> {
    let config = args.resolve(verbose)?;
    logging::init_tracing(&config.log);

    match args.input.as_deref() {
        Some(path) if path != Path::new("-") => {
            let source = JsonLinesSource::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            scan(config.gaps, source, args.json).await
        }
        _ => scan(config.gaps, JsonLinesSource::stdin(), args.json).await,
    }
}

async fn scan<S: BlockSource>(config: GapsConfig, source: S, json: bool) -> Result<()> {
    let mut runner = GapsRunner::new(config, source);
    let outcome = runner.run().await;

    // A cycle or fork still leaves a consistent index worth reporting;
    // anything else (I/O, bad input) does not.
    if let Err(e) = &outcome {
        if e.as_chain().is_none() {
            return outcome.map(|_| ()).context("reading blocks");
        }
    }

    report(runner.finder(), runner.stats(), json)?;

    let stats = outcome.context("blocks do not form simple chains")?;
    if stats.rejected_batches > 0 {
        eprintln!(
            "warning: {} of {} batches rejected (cycle or fork)",
            stats.rejected_batches, stats.batches
        );
    }
    Ok(())
}

fn report(finder: &GapFinder, stats: RunStats, json: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = finder.result();

    if json {
        let report = JsonReport {
            stats,
            summary: result.summary(),
        };
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        result.print(&mut out)?;
    }
    out.flush()?;
    Ok(())
}
