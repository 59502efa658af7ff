//! Earnlab Core — domain types, the pre/post close alignment engine, and the data layer.
//!
//! This crate contains:
//! - Domain types (daily close points, validated price series, transcript records)
//! - The trading-day alignment engine (pre/post close resolution)
//! - Data providers (Yahoo Finance daily closes, transcript sources)
//! - The on-disk close cache and the multi-symbol download orchestrator

pub mod align;
pub mod data;
pub mod domain;
