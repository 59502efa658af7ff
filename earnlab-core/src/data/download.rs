//! Download orchestrator — coordinates multi-symbol close downloads with
//! progress reporting.

use super::cache::CloseCache;
use super::provider::{DataError, FetchProgress, PriceProvider};
use crate::domain::PriceSeries;
use chrono::NaiveDate;

/// Download closes for multiple symbols, canonicalizing and caching each.
///
/// Symbols whose cache already covers the requested range are skipped unless
/// `force` is set. Returns a summary of successes and failures; a failure
/// for one symbol never aborts the rest, except when the provider's circuit
/// breaker trips, which fails all remaining symbols immediately.
pub fn download_closes(
    provider: &dyn PriceProvider,
    cache: &CloseCache,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
    force: bool,
    progress: &dyn FetchProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut succeeded = 0;
    let mut failed = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        if !force && cache.covers(symbol, start, end) {
            progress.on_complete(symbol, i, total, &Ok(()));
            succeeded += 1;
            continue;
        }

        let result = download_single(provider, cache, symbol, start, end);
        progress.on_complete(symbol, i, total, &result);

        match result {
            Ok(()) => succeeded += 1,
            Err(e) => {
                errors.push((symbol.to_string(), e));
                failed += 1;
            }
        }

        // Bail out early if the circuit breaker tripped
        if !provider.is_available() {
            for sym in &symbols[(i + 1)..total] {
                errors.push((sym.to_string(), DataError::CircuitBreakerTripped));
                failed += 1;
            }
            break;
        }
    }

    progress.on_batch_complete(succeeded, failed, total);

    DownloadSummary {
        total,
        succeeded,
        failed,
        errors,
    }
}

/// Download a single symbol: fetch → canonicalize → cache.
fn download_single(
    provider: &dyn PriceProvider,
    cache: &CloseCache,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), DataError> {
    let fetch_result = provider.fetch(symbol, start, end)?;

    let points = fetch_result
        .closes
        .iter()
        .map(|c| crate::domain::ClosePoint {
            date: c.date,
            close: c.close,
        })
        .collect();

    let series = PriceSeries::from_unsorted(points).map_err(|e| DataError::MalformedSeries {
        symbol: symbol.to_string(),
        reason: e.to_string(),
    })?;

    cache.write(symbol, series.points(), provider.name(), start, end)
}

/// Summary of a batch download operation.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{FetchResult, PriceSource, RawClose, SilentProgress};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Scripted provider: returns a fixed three-day series for every symbol,
    /// except symbols starting with "BAD" which fail, and can be switched
    /// unavailable to simulate a tripped breaker.
    struct ScriptedProvider {
        calls: AtomicUsize,
        available: AtomicBool,
        trip_on_bad: bool,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                available: AtomicBool::new(true),
                trip_on_bad: false,
            }
        }
    }

    impl PriceProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if symbol.starts_with("BAD") {
                if self.trip_on_bad {
                    self.available.store(false, Ordering::SeqCst);
                }
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            Ok(FetchResult {
                symbol: symbol.to_string(),
                // Out of order on purpose — the orchestrator canonicalizes.
                closes: vec![
                    RawClose {
                        date: d("2020-01-06"),
                        close: 105.0,
                    },
                    RawClose {
                        date: d("2020-01-02"),
                        close: 100.0,
                    },
                    RawClose {
                        date: d("2020-01-03"),
                        close: 102.0,
                    },
                ],
                source: PriceSource::YahooFinance,
            })
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn downloads_canonicalize_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        let provider = ScriptedProvider::new();

        let summary = download_closes(
            &provider,
            &cache,
            &["SPY"],
            d("2020-01-01"),
            d("2020-01-07"),
            false,
            &SilentProgress,
        );

        assert!(summary.all_succeeded());
        let loaded = cache.load("SPY").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].date, d("2020-01-02"));
        assert_eq!(loaded[2].date, d("2020-01-06"));
    }

    #[test]
    fn covered_symbols_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        let provider = ScriptedProvider::new();

        download_closes(
            &provider,
            &cache,
            &["SPY"],
            d("2020-01-01"),
            d("2020-01-07"),
            false,
            &SilentProgress,
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        // Second run: cache covers the range, no fetch
        let summary = download_closes(
            &provider,
            &cache,
            &["SPY"],
            d("2020-01-01"),
            d("2020-01-07"),
            false,
            &SilentProgress,
        );
        assert!(summary.all_succeeded());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn force_refetches_covered_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        let provider = ScriptedProvider::new();

        for _ in 0..2 {
            download_closes(
                &provider,
                &cache,
                &["SPY"],
                d("2020-01-01"),
                d("2020-01-07"),
                true,
                &SilentProgress,
            );
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn one_bad_symbol_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        let provider = ScriptedProvider::new();

        let summary = download_closes(
            &provider,
            &cache,
            &["BAD1", "SPY"],
            d("2020-01-01"),
            d("2020-01-07"),
            false,
            &SilentProgress,
        );

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(cache.load("SPY").is_ok());
    }

    #[test]
    fn tripped_breaker_fails_remaining_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        let mut provider = ScriptedProvider::new();
        provider.trip_on_bad = true;

        let summary = download_closes(
            &provider,
            &cache,
            &["BAD1", "SPY", "QQQ"],
            d("2020-01-01"),
            d("2020-01-07"),
            false,
            &SilentProgress,
        );

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 3);
        // Only the first symbol was actually fetched
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(summary
            .errors
            .iter()
            .any(|(sym, e)| sym == "QQQ" && matches!(e, DataError::CircuitBreakerTripped)));
    }
}
