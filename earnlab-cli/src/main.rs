//! Earnlab CLI — download, run, and cache management commands.
//!
//! Commands:
//! - `download` — fetch daily closes from Yahoo Finance into the close cache
//! - `run` — execute the full pipeline (transcripts → prices → annotate → export)
//! - `cache status` — report cached symbols, date ranges, row counts
//! - `cache clean` — remove symbols not refreshed recently

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use earnlab_core::data::{
    download_closes, CircuitBreaker, CloseCache, HfRowsSource, JsonlSource, StdoutProgress,
    TranscriptSource, YahooProvider,
};
use earnlab_runner::config::{PipelineConfig, TranscriptSourceConfig};
use earnlab_runner::runner::run_pipeline;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "earnlab",
    about = "Earnlab CLI — earnings transcripts joined to pre/post closes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily closes from Yahoo Finance into the close cache.
    Download {
        /// Symbols to download (e.g., AAPL MSFT SPY).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 10 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Run the full pipeline from a TOML config file or inline flags.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Hugging Face dataset id (e.g. glopardo/sp500-earnings-transcripts).
        #[arg(long)]
        dataset: Option<String>,

        /// Local JSONL transcript dump (one row object per line).
        #[arg(long)]
        jsonl: Option<PathBuf>,

        /// Output root for the exported dataset. Defaults to ./dataset.
        #[arg(long, default_value = "dataset")]
        output_root: PathBuf,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Offline mode: no network access for prices.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Force re-download of closes even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, date ranges, and row counts.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Remove cached symbols not refreshed within the given number of days.
    Clean {
        /// Remove symbols not refreshed in this many days.
        #[arg(long)]
        unused_days: u64,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            symbols,
            start,
            end,
            force,
            cache_dir,
        } => run_download(symbols, start, end, force, cache_dir),
        Commands::Run {
            config,
            dataset,
            jsonl,
            output_root,
            cache_dir,
            offline,
            force,
        } => run_pipeline_cmd(config, dataset, jsonl, output_root, cache_dir, offline, force),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clean {
                unused_days,
                cache_dir,
                confirm,
            } => run_cache_clean(&cache_dir, unused_days, confirm),
        },
    }
}

fn run_download(
    symbols: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    force: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    let start_date = start
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive() - chrono::Duration::days(365 * 10));

    let end_date = end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker);
    let cache = CloseCache::new(cache_dir);
    let progress = StdoutProgress;

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();

    let summary = download_closes(
        &provider, &cache, &sym_refs, start_date, end_date, force, &progress,
    );

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            eprintln!("Error for {sym}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_pipeline_cmd(
    config_path: Option<PathBuf>,
    dataset: Option<String>,
    jsonl: Option<PathBuf>,
    output_root: PathBuf,
    cache_dir: PathBuf,
    offline: bool,
    force: bool,
) -> Result<()> {
    if config_path.is_some() && (dataset.is_some() || jsonl.is_some()) {
        bail!("--config is mutually exclusive with --dataset/--jsonl");
    }

    let config = if let Some(path) = config_path {
        PipelineConfig::from_file(&path)?
    } else {
        let source = match (dataset, jsonl) {
            (Some(_), Some(_)) => bail!("--dataset and --jsonl are mutually exclusive"),
            (Some(dataset), None) => TranscriptSourceConfig::HuggingFace {
                dataset,
                config: "default".into(),
                split: "train".into(),
            },
            (None, Some(path)) => TranscriptSourceConfig::Jsonl { path },
            (None, None) => bail!("one of --config, --dataset, or --jsonl is required"),
        };
        PipelineConfig {
            source,
            cache_dir,
            output_root,
            buffer_days: 5,
            offline,
            force,
        }
    };

    let source: Box<dyn TranscriptSource> = match &config.source {
        TranscriptSourceConfig::HuggingFace {
            dataset,
            config: hf_config,
            split,
        } => Box::new(HfRowsSource::new(dataset.clone(), hf_config.clone(), split.clone())),
        TranscriptSourceConfig::Jsonl { path } => Box::new(JsonlSource::new(path.clone())),
    };

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker);
    let provider_ref: Option<&dyn earnlab_core::data::PriceProvider> = if config.offline {
        None
    } else {
        Some(&provider)
    };

    let result = run_pipeline(&config, source.as_ref(), provider_ref, &StdoutProgress)?;

    println!();
    println!("=== Pipeline Result ===");
    println!("Items:            {}", result.annotate.total);
    println!("Resolved closes:  {}", result.annotate.resolved);
    println!("Missing date:     {}", result.annotate.missing_date);
    println!(
        "No price data:    {} items across {} tickers",
        result.annotate.missing_symbol_items,
        result.annotate.missing_symbols.len()
    );
    if !result.annotate.missing_symbols.is_empty() {
        let listed: Vec<&str> = result
            .annotate
            .missing_symbols
            .iter()
            .map(|s| s.as_str())
            .collect();
        println!("Tickers with no price data: {}", listed.join(", "));
    }
    println!();
    println!("Transcripts written: {}", result.export.written);
    println!(
        "Skipped:             {} (no date), {} (empty text)",
        result.export.skipped_no_date, result.export.skipped_empty_text
    );
    for (sym, err) in &result.download_failures {
        println!("WARNING: download failed for {sym}: {err}");
    }
    println!();
    println!("Dataset hash: {}", result.dataset_hash);
    println!("Output root:  {}", result.output_root.display());

    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = CloseCache::new(cache_dir);
    let symbols = cache.symbols();

    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", symbols.len());
    println!();
    println!(
        "{:<8} {:<25} {:<12} {:<20}",
        "Symbol", "Date Range", "Rows", "Cached At"
    );
    println!("{}", "-".repeat(68));
    for symbol in &symbols {
        match cache.read_meta(symbol) {
            Some(meta) => println!(
                "{:<8} {:<25} {:<12} {:<20}",
                symbol,
                format!("{} to {}", meta.start_date, meta.end_date),
                meta.row_count,
                meta.cached_at.format("%Y-%m-%d %H:%M:%S")
            ),
            None => println!("{symbol:<8} (no meta)"),
        }
    }

    Ok(())
}

fn run_cache_clean(cache_dir: &Path, unused_days: u64, confirm: bool) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = CloseCache::new(cache_dir);
    let cutoff = chrono::Local::now().naive_local() - chrono::Duration::days(unused_days as i64);

    let to_remove: Vec<String> = cache
        .symbols()
        .into_iter()
        .filter(|symbol| match cache.read_meta(symbol) {
            Some(meta) => meta.cached_at < cutoff,
            // Don't remove if we can't read metadata
            None => false,
        })
        .collect();

    if to_remove.is_empty() {
        println!("No symbols older than {unused_days} days to remove.");
        return Ok(());
    }

    println!(
        "Found {} symbol(s) not refreshed in {unused_days} days:",
        to_remove.len()
    );
    for symbol in &to_remove {
        println!("  {symbol}");
    }

    if !confirm {
        println!();
        println!("Dry run — pass --confirm to actually delete.");
        return Ok(());
    }

    for symbol in &to_remove {
        cache.remove(symbol)?;
        println!("Removed: {symbol}");
    }

    println!("Done. Removed {} symbol(s).", to_remove.len());
    Ok(())
}
