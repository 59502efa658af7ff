//! Earnlab Runner — pipeline orchestration.
//!
//! Wires the data layer to the alignment engine and the dataset exporter:
//! load transcripts, download closes for the universe, annotate each item
//! with pre/post closes, and write the flat shareable dataset.

pub mod annotate;
pub mod config;
pub mod export;
pub mod runner;

pub use annotate::{annotate_transcripts, AnnotateSummary, AnnotatedTranscript};
pub use config::{PipelineConfig, TranscriptSourceConfig};
pub use export::{export_dataset, ExportSummary};
pub use runner::{run_pipeline, PipelineResult};
