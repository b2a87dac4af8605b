//! Offline deduplication of a result page.
//!
//! Reads a JSON array of place records, writes the survivors to stdout.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cypress_dedupe::request::DEFAULT_SIZE;
use cypress_dedupe::{DedupeConfig, DedupeMode, Deduplicator, PlaceRecord, RequestContext};

#[derive(Parser, Debug)]
#[command(name = "dedupe")]
#[command(about = "Collapse duplicate places in a geocoding result page")]
struct Args {
    /// JSON array of place records; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Page size
    #[arg(short, long, default_value_t = DEFAULT_SIZE, allow_negative_numbers = true)]
    size: i64,

    /// Query text, for logging only
    #[arg(short, long)]
    text: Option<String>,

    /// Matching mode ("geo" enables proximity merges)
    #[arg(short, long, default_value = "default")]
    dedupe: String,

    /// Dedupe tables (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DedupeConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => DedupeConfig::default(),
    };
    let deduplicator = Deduplicator::new(&config).context("Invalid dedupe config")?;

    let records = read_records(args.input.as_ref())?;
    if records.is_empty() {
        warn!("Input contains no records");
    }

    let mut ctx = RequestContext::new(args.size).with_dedupe(DedupeMode::parse(&args.dedupe));
    if let Some(text) = &args.text {
        ctx = ctx.with_text(text);
    }

    let merged = deduplicator.merge_with_stats(records, &ctx);
    info!(
        "{} records in, {} survivors, {} groups merged, {} returned (mode {})",
        merged.stats.input,
        merged.stats.survivors,
        merged.stats.duplicate_groups,
        merged.stats.returned,
        merged.stats.mode
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut out, &merged.records)?;
    } else {
        serde_json::to_writer(&mut out, &merged.records)?;
    }
    writeln!(out)?;

    Ok(())
}

fn read_records(path: Option<&PathBuf>) -> Result<Vec<PlaceRecord>> {
    let records = match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse records in {:?}", path))?
        }
        None => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            serde_json::from_str(&raw).context("Failed to parse records from stdin")?
        }
    };
    Ok(records)
}
