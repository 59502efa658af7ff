//! Domain types: daily close points, validated price series, transcript records.

pub mod series;
pub mod transcript;

pub use series::{ClosePoint, PriceSeries, SeriesError};
pub use transcript::TranscriptRecord;
