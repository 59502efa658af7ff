//! End-to-end pipeline: load transcripts, download closes, annotate, export.

use crate::annotate::{annotate_transcripts, AnnotateSummary};
use crate::config::PipelineConfig;
use crate::export::{export_dataset, ExportSummary};
use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use earnlab_core::data::{
    download_closes, CloseCache, FetchProgress, PriceProvider, TranscriptSource,
};
use earnlab_core::domain::PriceSeries;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// Outcome of a full pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    pub annotate: AnnotateSummary,
    pub export: ExportSummary,
    /// Symbols whose close download failed, with the error text.
    pub download_failures: Vec<(String, String)>,
    /// BLAKE3 hash of the exported metadata index, for provenance.
    pub dataset_hash: String,
    pub output_root: PathBuf,
}

/// Run the whole pipeline.
///
/// `provider` is `None` in offline mode: closes then come from the cache
/// only, and uncached symbols simply end up in the missing set. Per-symbol
/// and per-item failures are recorded and skipped; only setup failures
/// (unreadable source, no usable event dates, unwritable output) abort.
pub fn run_pipeline(
    config: &PipelineConfig,
    source: &dyn TranscriptSource,
    provider: Option<&dyn PriceProvider>,
    progress: &dyn FetchProgress,
) -> Result<PipelineResult> {
    let records = source
        .load()
        .with_context(|| format!("failed to load transcripts from {}", source.name()))?;
    println!("Loaded {} transcripts from {}", records.len(), source.name());

    // Universe and date range, ignoring items with missing dates
    let tickers: BTreeSet<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
    let valid_dates: Vec<NaiveDate> = records.iter().filter_map(|r| r.event_date).collect();
    let (Some(&min_date), Some(&max_date)) =
        (valid_dates.iter().min(), valid_dates.iter().max())
    else {
        bail!("no records with a parseable event date");
    };

    let start = min_date - Duration::days(config.buffer_days);
    let end = max_date + Duration::days(config.buffer_days);
    println!(
        "Found {} tickers, events from {min_date} to {max_date}",
        tickers.len()
    );

    let cache = CloseCache::new(&config.cache_dir);
    let symbols: Vec<&str> = tickers.iter().copied().collect();

    let mut download_failures = Vec::new();
    if let Some(provider) = provider {
        let summary = download_closes(
            provider,
            &cache,
            &symbols,
            start,
            end,
            config.force,
            progress,
        );
        download_failures = summary
            .errors
            .into_iter()
            .map(|(symbol, e)| (symbol, e.to_string()))
            .collect();
    }

    // Build the per-symbol series map from the cache. Symbols that are
    // uncached or fail validation fall out here and surface in the
    // annotation summary's missing set.
    let mut series_by_symbol: HashMap<String, PriceSeries> = HashMap::new();
    for symbol in &symbols {
        let points = match cache.load(symbol) {
            Ok(points) => points,
            Err(_) => continue,
        };
        match PriceSeries::new(points) {
            Ok(series) => {
                series_by_symbol.insert((*symbol).to_string(), series);
            }
            Err(e) => {
                eprintln!("WARN: dropping cached series for {symbol}: {e}");
            }
        }
    }

    let (annotated, annotate_summary) = annotate_transcripts(records, &series_by_symbol);
    println!(
        "Annotated {} items: {} resolved, {} missing date, {} with no price data",
        annotate_summary.total,
        annotate_summary.resolved,
        annotate_summary.missing_date,
        annotate_summary.missing_symbol_items
    );

    let export_summary = export_dataset(&annotated, &config.output_root)?;

    let metadata_bytes = std::fs::read(&export_summary.metadata_path).with_context(|| {
        format!(
            "failed to read back {}",
            export_summary.metadata_path.display()
        )
    })?;
    let dataset_hash = blake3::hash(&metadata_bytes).to_hex().to_string();

    Ok(PipelineResult {
        annotate: annotate_summary,
        export: export_summary,
        download_failures,
        dataset_hash,
        output_root: config.output_root.clone(),
    })
}
