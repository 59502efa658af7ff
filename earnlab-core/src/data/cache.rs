//! On-disk close cache.
//!
//! Layout: `{cache_dir}/{SYMBOL}/closes.csv` plus a `meta.json` sidecar.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Range coverage checks via the sidecar, so fresh symbols are not refetched
//! - Integrity hash (BLAKE3 over the CSV bytes) recorded per symbol
//! - Quarantine for corrupt files ({filename}.quarantined)

use super::provider::DataError;
use crate::domain::ClosePoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata sidecar for a cached symbol.
///
/// `start_date`/`end_date` record the range the fetch *requested*, not the
/// first/last trading day observed — coverage checks must not refetch just
/// because a range boundary fell on a weekend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    pub content_hash: String,
    pub source: String,
    pub cached_at: chrono::NaiveDateTime,
}

/// The close cache.
pub struct CloseCache {
    cache_dir: PathBuf,
}

impl CloseCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(symbol)
    }

    fn closes_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("closes.csv")
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Write a symbol's closes to the cache.
    ///
    /// `points` must already be sorted ascending with unique dates (the
    /// download stage canonicalizes before writing). Writes are atomic:
    /// the CSV goes to a .tmp file which is renamed into place.
    pub fn write(
        &self,
        symbol: &str,
        points: &[ClosePoint],
        source: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), DataError> {
        if points.is_empty() {
            return Err(DataError::CacheError("no closes to cache".into()));
        }

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut wtr = csv::Writer::from_writer(Vec::new());
        for point in points {
            wtr.serialize(point)
                .map_err(|e| DataError::CacheError(format!("csv serialize: {e}")))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| DataError::CacheError(format!("csv flush: {e}")))?;

        let path = self.closes_path(symbol);
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, &bytes)
            .map_err(|e| DataError::CacheError(format!("write tmp file: {e}")))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: start,
            end_date: end,
            row_count: points.len(),
            content_hash: blake3::hash(&bytes).to_hex().to_string(),
            source: source.to_string(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Load a symbol's cached closes, sorted ascending as written.
    ///
    /// A file that fails to parse is quarantined (renamed with a
    /// `.quarantined` suffix) and reported as `NoCachedData` so the caller
    /// can refetch.
    pub fn load(&self, symbol: &str) -> Result<Vec<ClosePoint>, DataError> {
        let path = self.closes_path(symbol);
        if !path.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path)
            .map_err(|e| DataError::CacheError(format!("open {}: {e}", path.display())))?;

        let mut points = Vec::new();
        for row in rdr.deserialize::<ClosePoint>() {
            match row {
                Ok(point) => points.push(point),
                Err(e) => {
                    let quarantine = path.with_extension("csv.quarantined");
                    eprintln!(
                        "WARN: corrupt cache file {} ({e}), quarantining to {}",
                        path.display(),
                        quarantine.display()
                    );
                    let _ = fs::rename(&path, &quarantine);
                    return Err(DataError::NoCachedData {
                        symbol: symbol.to_string(),
                    });
                }
            }
        }

        if points.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        Ok(points)
    }

    /// Read the metadata sidecar for a symbol, if present and parseable.
    pub fn read_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether the cached range for `symbol` covers `[start, end]`.
    pub fn covers(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> bool {
        match self.read_meta(symbol) {
            Some(meta) => {
                meta.start_date <= start && meta.end_date >= end && self.closes_path(symbol).exists()
            }
            None => false,
        }
    }

    /// Symbols currently present in the cache, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries
                .flatten()
                .filter(|e| e.path().is_dir())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        symbols.sort();
        symbols
    }

    /// Remove a symbol's cache directory entirely.
    pub fn remove(&self, symbol: &str) -> Result<(), DataError> {
        fs::remove_dir_all(self.symbol_dir(symbol))
            .map_err(|e| DataError::CacheError(format!("remove {symbol}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_points() -> Vec<ClosePoint> {
        vec![
            ClosePoint {
                date: d("2020-01-02"),
                close: 100.0,
            },
            ClosePoint {
                date: d("2020-01-03"),
                close: 102.0,
            },
            ClosePoint {
                date: d("2020-01-06"),
                close: 105.0,
            },
        ]
    }

    #[test]
    fn write_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());

        let points = sample_points();
        cache
            .write("SPY", &points, "test", d("2020-01-01"), d("2020-01-07"))
            .unwrap();

        let loaded = cache.load("SPY").unwrap();
        assert_eq!(loaded, points);
    }

    #[test]
    fn load_missing_symbol_is_no_cached_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        assert!(matches!(
            cache.load("SPY"),
            Err(DataError::NoCachedData { .. })
        ));
    }

    #[test]
    fn covers_respects_requested_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        cache
            .write("SPY", &sample_points(), "test", d("2020-01-01"), d("2020-01-07"))
            .unwrap();

        assert!(cache.covers("SPY", d("2020-01-02"), d("2020-01-06")));
        assert!(cache.covers("SPY", d("2020-01-01"), d("2020-01-07")));
        assert!(!cache.covers("SPY", d("2019-12-01"), d("2020-01-06")));
        assert!(!cache.covers("SPY", d("2020-01-02"), d("2020-02-01")));
        assert!(!cache.covers("QQQ", d("2020-01-02"), d("2020-01-06")));
    }

    #[test]
    fn meta_records_row_count_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        cache
            .write("SPY", &sample_points(), "yahoo_finance", d("2020-01-01"), d("2020-01-07"))
            .unwrap();

        let meta = cache.read_meta("SPY").unwrap();
        assert_eq!(meta.symbol, "SPY");
        assert_eq!(meta.row_count, 3);
        assert_eq!(meta.source, "yahoo_finance");
        assert!(!meta.content_hash.is_empty());
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        cache
            .write("SPY", &sample_points(), "test", d("2020-01-01"), d("2020-01-07"))
            .unwrap();

        // Corrupt the CSV in place
        let path = dir.path().join("SPY").join("closes.csv");
        fs::write(&path, "date,close\nnot-a-date,abc\n").unwrap();

        assert!(matches!(
            cache.load("SPY"),
            Err(DataError::NoCachedData { .. })
        ));
        assert!(!path.exists());
        assert!(path.with_extension("csv.quarantined").exists());
    }

    #[test]
    fn symbols_lists_cached_dirs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CloseCache::new(dir.path());
        cache
            .write("SPY", &sample_points(), "test", d("2020-01-01"), d("2020-01-07"))
            .unwrap();
        cache
            .write("AAPL", &sample_points(), "test", d("2020-01-01"), d("2020-01-07"))
            .unwrap();

        assert_eq!(cache.symbols(), vec!["AAPL".to_string(), "SPY".to_string()]);
    }
}
