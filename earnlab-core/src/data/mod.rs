//! Data layer: price providers, transcript sources, caching, downloads.

pub mod cache;
pub mod circuit_breaker;
pub mod download;
pub mod provider;
pub mod transcripts;
pub mod yahoo;

pub use cache::{CacheMeta, CloseCache};
pub use circuit_breaker::CircuitBreaker;
pub use download::{download_closes, DownloadSummary};
pub use provider::{
    DataError, FetchProgress, FetchResult, PriceProvider, PriceSource, RawClose, SilentProgress,
    StdoutProgress,
};
pub use transcripts::{HfRowsSource, JsonlSource, TranscriptSource};
pub use yahoo::YahooProvider;
