//! chaingaps CLI — find gaps, forks and cycles in dumps of hash-linked blocks.
//!
//! # Commands
//! ```
//! chaingaps scan --input blocks.jsonl [--batch-size N] [--keep-going] [--json] [--config gaps.yaml]
//! cat blocks.jsonl | chaingaps scan
//! chaingaps info
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd_scan;
mod logging;

#[derive(Parser)]
#[command(
    name = "chaingaps",
    about = "Rebuild chains from hash-linked blocks and report gaps, forks and cycles",
    long_about = "
chaingaps reads blocks as JSON lines ({\"hash\": ..., \"prevHash\": ..., \"timestamp\": ...}),
in any order, and reports the contiguous chains they form: length, head, tail
and the hash still missing below each head.
",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a JSON-lines block dump
    Scan {
        /// Input file, `-` or omitted for stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Blocks per batch (default 10000)
        #[arg(long)]
        batch_size: Option<usize>,
        /// Skip batches rejected with a cycle or fork instead of stopping
        #[arg(long)]
        keep_going: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show version and defaults
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            input,
            batch_size,
            keep_going,
            json,
            config,
        } => {
            let args = cmd_scan::ScanArgs {
                input,
                batch_size,
                keep_going,
                json,
                config,
            };
            cmd_scan::run(args, cli.verbose).await
        }
        Commands::Info => {
            cmd_info();
            Ok(())
        }
    }
}

fn cmd_info() {
    let defaults = chaingaps_core::GapsConfig::default();
    println!("chaingaps v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default batch size: {} blocks", defaults.batch_size);
    println!("  Continue on error: {}", defaults.continue_on_error);
    println!("  Input: JSON lines (hash/blockHash, prevHash/parentHash/prev_hash, timestamp/time)");
    println!("  Detects: forks and cycles touching a chain endpoint");
}
