//! Transcript sources.
//!
//! Earnings-call transcripts come either from the Hugging Face
//! datasets-server rows API (paginated JSON) or from a local JSONL dump.
//! Both produce the same lenient row shape: every field except the ticker
//! may be missing, numbers may arrive as strings or floats, and dates may
//! carry a time suffix that must be stripped.

use super::provider::DataError;
use crate::domain::TranscriptRecord;
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

/// Trait for transcript sources.
pub trait TranscriptSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Load all transcript records.
    fn load(&self) -> Result<Vec<TranscriptRecord>, DataError>;
}

/// One raw row as found in the dataset, before coercion.
#[derive(Debug, Deserialize)]
struct TranscriptRow {
    ticker: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    earnings_date: Option<String>,
    #[serde(default)]
    year: Option<serde_json::Value>,
    #[serde(default)]
    quarter: Option<serde_json::Value>,
    #[serde(default)]
    transcript: Option<String>,
}

/// Parse a source date string into a calendar date.
///
/// Accepts plain `YYYY-MM-DD` or a longer timestamp whose first ten
/// characters are the date (`2020-01-28T21:30:00`, `2020-01-28 21:30:00`).
/// Anything else coerces to `None` — a missing date, not an error.
fn coerce_date(raw: Option<&str>) -> Option<NaiveDate> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    let candidate = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d").ok()
}

/// Coerce a JSON value that should be an integer but may be a float,
/// a string, or missing entirely.
fn coerce_int(raw: Option<&serde_json::Value>) -> Option<i32> {
    match raw? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|v| i32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i32),
        _ => None,
    }
}

/// Convert a raw row into a record. Rows without a ticker are unusable and
/// yield `None`.
fn row_to_record(row: TranscriptRow) -> Option<TranscriptRecord> {
    let ticker = row.ticker?.trim().to_string();
    if ticker.is_empty() {
        return None;
    }
    Some(TranscriptRecord {
        ticker,
        company: row.company.filter(|c| !c.trim().is_empty()),
        event_date: coerce_date(row.earnings_date.as_deref()),
        year: coerce_int(row.year.as_ref()),
        quarter: coerce_int(row.quarter.as_ref()),
        text: row.transcript.unwrap_or_default(),
    })
}

// ─── Hugging Face datasets-server ───────────────────────────────────

/// Response envelope from the datasets-server `/rows` endpoint.
#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<RowEnvelope>,
    num_rows_total: u64,
}

#[derive(Debug, Deserialize)]
struct RowEnvelope {
    row: TranscriptRow,
}

/// Transcript source backed by the Hugging Face datasets-server rows API.
pub struct HfRowsSource {
    client: reqwest::blocking::Client,
    dataset: String,
    config: String,
    split: String,
    page_size: u64,
    max_retries: u32,
    base_delay: Duration,
}

impl HfRowsSource {
    pub fn new(dataset: impl Into<String>, config: impl Into<String>, split: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            dataset: dataset.into(),
            config: config.into(),
            split: split.into(),
            // The datasets-server caps `length` at 100 per request.
            page_size: 100,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    fn rows_url(&self, offset: u64) -> String {
        format!(
            "https://datasets-server.huggingface.co/rows\
             ?dataset={}&config={}&split={}&offset={offset}&length={}",
            self.dataset, self.config, self.split, self.page_size
        )
    }

    /// Fetch one page, retrying transient failures with exponential backoff.
    fn fetch_page(&self, offset: u64) -> Result<RowsResponse, DataError> {
        let url = self.rows_url(offset);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(DataError::RateLimited { retry_after_secs: 60 });
                        continue;
                    }
                    if !status.is_success() {
                        last_error = Some(DataError::Other(format!(
                            "HTTP {status} from datasets-server for offset {offset}"
                        )));
                        continue;
                    }
                    return resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse rows response at offset {offset}: {e}"
                        ))
                    });
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl TranscriptSource for HfRowsSource {
    fn name(&self) -> &str {
        "hf_datasets_server"
    }

    fn load(&self) -> Result<Vec<TranscriptRecord>, DataError> {
        let mut records = Vec::new();
        let mut offset = 0u64;

        loop {
            let page = self.fetch_page(offset)?;
            let page_len = page.rows.len() as u64;
            records.extend(page.rows.into_iter().filter_map(|env| row_to_record(env.row)));

            offset += page_len;
            if page_len == 0 || offset >= page.num_rows_total {
                break;
            }
        }

        Ok(records)
    }
}

// ─── JSONL file ─────────────────────────────────────────────────────

/// Transcript source backed by a local JSONL file (one JSON object per line).
///
/// The offline ingest path: a dump of the same rows the datasets-server
/// returns, usable without network access.
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TranscriptSource for JsonlSource {
    fn name(&self) -> &str {
        "jsonl_file"
    }

    fn load(&self) -> Result<Vec<TranscriptRecord>, DataError> {
        let file = std::fs::File::open(&self.path)
            .map_err(|e| DataError::Other(format!("open {}: {e}", self.path.display())))?;
        let reader = std::io::BufReader::new(file);

        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| DataError::Other(format!("read {}: {e}", self.path.display())))?;
            if line.trim().is_empty() {
                continue;
            }
            let row: TranscriptRow = serde_json::from_str(&line).map_err(|e| {
                DataError::Other(format!("{}:{}: {e}", self.path.display(), lineno + 1))
            })?;
            if let Some(record) = row_to_record(row) {
                records.push(record);
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn coerces_plain_dates() {
        assert_eq!(
            coerce_date(Some("2020-01-28")),
            NaiveDate::from_ymd_opt(2020, 1, 28)
        );
    }

    #[test]
    fn coerces_timestamps_to_date_only() {
        assert_eq!(
            coerce_date(Some("2020-01-28T21:30:00")),
            NaiveDate::from_ymd_opt(2020, 1, 28)
        );
        assert_eq!(
            coerce_date(Some("2020-01-28 21:30:00")),
            NaiveDate::from_ymd_opt(2020, 1, 28)
        );
    }

    #[test]
    fn unparseable_dates_coerce_to_none() {
        assert_eq!(coerce_date(Some("not a date")), None);
        assert_eq!(coerce_date(Some("")), None);
        assert_eq!(coerce_date(None), None);
    }

    #[test]
    fn coerces_int_from_number_string_and_float() {
        assert_eq!(coerce_int(Some(&serde_json::json!(2020))), Some(2020));
        assert_eq!(coerce_int(Some(&serde_json::json!(2020.0))), Some(2020));
        assert_eq!(coerce_int(Some(&serde_json::json!("3"))), Some(3));
        assert_eq!(coerce_int(Some(&serde_json::json!(null))), None);
        assert_eq!(coerce_int(None), None);
    }

    #[test]
    fn rows_without_ticker_are_dropped() {
        let row: TranscriptRow =
            serde_json::from_str(r#"{"ticker": null, "transcript": "text"}"#).unwrap();
        assert!(row_to_record(row).is_none());

        let row: TranscriptRow =
            serde_json::from_str(r#"{"ticker": "  ", "transcript": "text"}"#).unwrap();
        assert!(row_to_record(row).is_none());
    }

    #[test]
    fn jsonl_source_loads_lenient_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"ticker":"AAPL","company":"Apple Inc.","earnings_date":"2020-01-28","year":2020,"quarter":1,"transcript":"Good afternoon."}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"ticker":"MSFT","earnings_date":"bad date","year":"2020","quarter":2.0,"transcript":"Welcome."}}"#
        )
        .unwrap();
        writeln!(file, r#"{{"ticker":null,"transcript":"orphan"}}"#).unwrap();

        let source = JsonlSource::new(file.path());
        let records = source.load().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ticker, "AAPL");
        assert_eq!(
            records[0].event_date,
            NaiveDate::from_ymd_opt(2020, 1, 28)
        );
        assert_eq!(records[1].ticker, "MSFT");
        assert_eq!(records[1].event_date, None);
        assert_eq!(records[1].year, Some(2020));
        assert_eq!(records[1].quarter, Some(2));
    }

    #[test]
    fn jsonl_source_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let source = JsonlSource::new(file.path());
        assert!(source.load().is_err());
    }

    #[test]
    fn rows_url_is_paginated() {
        let source = HfRowsSource::new("glopardo/sp500-earnings-transcripts", "default", "train");
        let url = source.rows_url(200);
        assert!(url.contains("offset=200"));
        assert!(url.contains("length=100"));
        assert!(url.contains("dataset=glopardo/sp500-earnings-transcripts"));
    }
}
