//! Dataset export — per-item transcript files plus CSV indexes.
//!
//! Layout under the output root:
//! - `transcripts/{TICKER}/{TICKER}_{YYYY-MM-DD}.txt` — one file per item
//! - `metadata.csv` — one row per exported item, `text_path` relative to
//!   the output root so the directory can be zipped and shared
//! - `merged.csv` — one row per *input* item, including the ones that were
//!   skipped from the flat dataset (no date, empty text); absent pre/post
//!   closes are empty fields, never a numeric placeholder

use crate::annotate::AnnotatedTranscript;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Counts and paths from one export pass.
#[derive(Debug)]
pub struct ExportSummary {
    /// Transcript files written.
    pub written: usize,
    /// Items left out of the flat dataset for lack of an event date.
    pub skipped_no_date: usize,
    /// Items left out of the flat dataset for an empty transcript.
    pub skipped_empty_text: usize,
    pub metadata_path: PathBuf,
    pub merged_path: PathBuf,
}

/// Keep only filename-safe characters.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn field_opt_close(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn field_opt_int(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Strip a UTF-8 BOM and surrounding whitespace from transcript text.
fn clean_text(text: &str) -> &str {
    text.trim_start_matches('\u{feff}').trim()
}

/// Write the flat shareable dataset for a set of annotated transcripts.
pub fn export_dataset(
    items: &[AnnotatedTranscript],
    output_root: &Path,
) -> Result<ExportSummary> {
    let transcripts_dir = output_root.join("transcripts");
    std::fs::create_dir_all(&transcripts_dir)
        .with_context(|| format!("failed to create {}", transcripts_dir.display()))?;

    let metadata_path = output_root.join("metadata.csv");
    let merged_path = output_root.join("merged.csv");

    let mut metadata = csv::Writer::from_path(&metadata_path)
        .with_context(|| format!("failed to create {}", metadata_path.display()))?;
    metadata.write_record([
        "ticker",
        "company",
        "earnings_date",
        "year",
        "quarter",
        "pre_close",
        "post_close",
        "text_path",
    ])?;

    let mut merged = csv::Writer::from_path(&merged_path)
        .with_context(|| format!("failed to create {}", merged_path.display()))?;
    merged.write_record([
        "ticker",
        "company",
        "earnings_date",
        "year",
        "quarter",
        "pre_close",
        "post_close",
    ])?;

    let mut written = 0;
    let mut skipped_no_date = 0;
    let mut skipped_empty_text = 0;

    for item in items {
        let date_field = item
            .event_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        merged.write_record([
            item.ticker.as_str(),
            item.company.as_deref().unwrap_or(""),
            &date_field,
            &field_opt_int(item.year),
            &field_opt_int(item.quarter),
            &field_opt_close(item.pre_close),
            &field_opt_close(item.post_close),
        ])?;

        let Some(date) = item.event_date else {
            skipped_no_date += 1;
            continue;
        };

        let text = clean_text(&item.text);
        if text.is_empty() {
            skipped_empty_text += 1;
            continue;
        }

        let safe_ticker = sanitize(item.ticker.trim());
        let filename = format!("{safe_ticker}_{}.txt", date.format("%Y-%m-%d"));
        let rel_path = Path::new("transcripts").join(&safe_ticker).join(&filename);

        let ticker_dir = transcripts_dir.join(&safe_ticker);
        std::fs::create_dir_all(&ticker_dir)
            .with_context(|| format!("failed to create {}", ticker_dir.display()))?;
        std::fs::write(output_root.join(&rel_path), text)
            .with_context(|| format!("failed to write {}", rel_path.display()))?;

        metadata.write_record([
            item.ticker.as_str(),
            item.company.as_deref().unwrap_or(""),
            &date_field,
            &field_opt_int(item.year),
            &field_opt_int(item.quarter),
            &field_opt_close(item.pre_close),
            &field_opt_close(item.post_close),
            // Forward slashes so the paths work after unzipping anywhere
            &rel_path
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
        ])?;

        written += 1;
    }

    metadata
        .flush()
        .with_context(|| format!("failed to flush {}", metadata_path.display()))?;
    merged
        .flush()
        .with_context(|| format!("failed to flush {}", merged_path.display()))?;

    Ok(ExportSummary {
        written,
        skipped_no_date,
        skipped_empty_text,
        metadata_path,
        merged_path,
    })
}
