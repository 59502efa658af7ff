//! Annotation stage — join transcripts to pre/post closes.
//!
//! The runner owns a map from symbol to validated price series for the
//! duration of one run and passes each series by reference into the
//! alignment engine. The engine is pure and the series are immutable, so
//! the per-item work fans out across rayon workers with no synchronization.

use chrono::NaiveDate;
use earnlab_core::align::{resolve_pre_post, Alignment};
use earnlab_core::domain::{PriceSeries, TranscriptRecord};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// A transcript with its resolved pre/post closes attached.
///
/// `pre_close`/`post_close` stay `None` when no trading day satisfies the
/// relation — because the date is missing, the symbol has no price series,
/// or the event predates the series. Downstream sinks must preserve the
/// absence (an empty CSV field), never substitute a number.
#[derive(Debug, Clone)]
pub struct AnnotatedTranscript {
    pub ticker: String,
    pub company: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub quarter: Option<i32>,
    pub pre_close: Option<f64>,
    pub post_close: Option<f64>,
    pub text: String,
}

/// Counts from one annotation pass.
#[derive(Debug, Default)]
pub struct AnnotateSummary {
    pub total: usize,
    /// Items where a pre close was resolved.
    pub resolved: usize,
    /// Items skipped because the event date was missing or unparseable.
    pub missing_date: usize,
    /// Items skipped because their ticker has no price series.
    pub missing_symbol_items: usize,
    /// Tickers that appeared in the input but have no price series.
    pub missing_symbols: BTreeSet<String>,
}

/// Annotate every transcript with its pre/post closes.
///
/// Output order matches input order. One unresolvable item never affects
/// the others: it simply carries absent values.
pub fn annotate_transcripts(
    records: Vec<TranscriptRecord>,
    series_by_symbol: &HashMap<String, PriceSeries>,
) -> (Vec<AnnotatedTranscript>, AnnotateSummary) {
    let annotated: Vec<AnnotatedTranscript> = records
        .into_par_iter()
        .map(|record| {
            let alignment = match record.event_date {
                None => Alignment::ABSENT,
                Some(event_date) => match series_by_symbol.get(&record.ticker) {
                    None => Alignment::ABSENT,
                    Some(series) => resolve_pre_post(series, event_date),
                },
            };

            AnnotatedTranscript {
                ticker: record.ticker,
                company: record.company,
                event_date: record.event_date,
                year: record.year,
                quarter: record.quarter,
                pre_close: alignment.pre_close,
                post_close: alignment.post_close,
                text: record.text,
            }
        })
        .collect();

    let mut summary = AnnotateSummary {
        total: annotated.len(),
        ..Default::default()
    };
    for item in &annotated {
        if item.event_date.is_none() {
            summary.missing_date += 1;
        } else if !series_by_symbol.contains_key(&item.ticker) {
            summary.missing_symbol_items += 1;
            summary.missing_symbols.insert(item.ticker.clone());
        }
        if item.pre_close.is_some() {
            summary.resolved += 1;
        }
    }

    (annotated, summary)
}
