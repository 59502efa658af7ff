//! Yahoo Finance close provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API. Handles rate limiting,
//! retries with exponential backoff, response parsing, and the circuit
//! breaker. Yahoo Finance has no official API and is subject to unannounced
//! format changes; a local JSONL transcript dump plus a warm close cache is
//! the fallback when Yahoo is unavailable.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, FetchResult, PriceProvider, PriceSource, RawClose};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

/// Yahoo Finance close provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let end_ts = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Parse the chart API response into raw closes.
    ///
    /// Timestamps whose close is null (holidays, halted sessions) are
    /// skipped, so the output only contains actual trading days.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawClose>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut closes = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            if let Some(close) = quote.close.get(i).copied().flatten() {
                closes.push(RawClose { date, close });
            }
        }

        if closes.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(closes)
    }

    /// Execute a single HTTP request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawClose>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        // IP ban — immediately trip the circuit breaker
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let closes = Self::parse_response(symbol, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(closes);
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

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let closes = self.fetch_with_retry(symbol, start, end)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            closes,
            source: PriceSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(symbol: &str, json: &str) -> Result<Vec<RawClose>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response(symbol, resp)
    }

    #[test]
    fn parses_closes_and_skips_nulls() {
        // 2020-01-02, 2020-01-03, 2020-01-06 (the middle null is a holiday)
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1577977200, 1578063600, 1578322800],
                    "indicators": {
                        "quote": [{"close": [100.0, null, 105.0]}]
                    }
                }],
                "error": null
            }
        }"#;

        let closes = parse("SPY", json).unwrap();
        assert_eq!(closes.len(), 2);
        assert_eq!(closes[0].close, 100.0);
        assert_eq!(closes[1].close, 105.0);
        assert!(closes[0].date < closes[1].date);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found"}
            }
        }"#;

        match parse("NOPE", json) {
            Err(DataError::SymbolNotFound { symbol }) => assert_eq!(symbol, "NOPE"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn all_null_closes_is_symbol_not_found() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1577977200],
                    "indicators": {"quote": [{"close": [null]}]}
                }],
                "error": null
            }
        }"#;

        assert!(matches!(
            parse("SPY", json),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn missing_timestamps_is_format_change() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": null,
                    "indicators": {"quote": [{"close": []}]}
                }],
                "error": null
            }
        }"#;

        assert!(matches!(
            parse("SPY", json),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn chart_url_covers_full_days() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap();
        let url = YahooProvider::chart_url("SPY", start, end);
        assert!(url.contains("/v8/finance/chart/SPY"));
        assert!(url.contains("interval=1d"));
        // period2 is end-of-day so the final trading day is included
        assert!(url.contains("period2=1578355199"));
    }
}
