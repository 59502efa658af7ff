//! Transcript record — one earnings-call item from the event source.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One earnings-call transcript as supplied by a transcript source.
///
/// Source data is messy: the company name, event date, fiscal year, and
/// quarter can all be missing, and dates arrive as strings that may fail to
/// parse. A record with `event_date: None` is still carried through the
/// pipeline — it just gets absent pre/post closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub ticker: String,
    pub company: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub quarter: Option<i32>,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_roundtrip() {
        let record = TranscriptRecord {
            ticker: "AAPL".into(),
            company: Some("Apple Inc.".into()),
            event_date: NaiveDate::from_ymd_opt(2020, 1, 28),
            year: Some(2020),
            quarter: Some(1),
            text: "Good afternoon, everyone.".into(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let deser: TranscriptRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.ticker, deser.ticker);
        assert_eq!(record.event_date, deser.event_date);
        assert_eq!(record.text, deser.text);
    }

    #[test]
    fn missing_fields_stay_absent() {
        let json = r#"{"ticker":"MSFT","company":null,"event_date":null,"year":null,"quarter":null,"text":""}"#;
        let record: TranscriptRecord = serde_json::from_str(json).unwrap();
        assert!(record.event_date.is_none());
        assert!(record.year.is_none());
    }
}
