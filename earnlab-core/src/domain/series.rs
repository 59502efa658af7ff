//! Daily close series — the fundamental price data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single daily closing price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Why a close series failed validation.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("series is empty")]
    Empty,

    #[error("series is not sorted ascending by date at index {index}")]
    Unsorted { index: usize },

    #[error("duplicate date in series: {date}")]
    DuplicateDate { date: NaiveDate },

    #[error("close for {date} is not a finite non-negative number: {close}")]
    BadClose { date: NaiveDate, close: f64 },
}

/// A validated daily close series for one symbol.
///
/// Invariants, enforced at construction: non-empty, strictly ascending by
/// date, unique dates, every close finite and non-negative. The alignment
/// engine relies on these invariants and performs no validation of its own.
/// The series is immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<ClosePoint>,
}

impl PriceSeries {
    /// Build a series from points that are already sorted ascending.
    pub fn new(points: Vec<ClosePoint>) -> Result<Self, SeriesError> {
        if points.is_empty() {
            return Err(SeriesError::Empty);
        }
        for (i, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close < 0.0 {
                return Err(SeriesError::BadClose {
                    date: p.date,
                    close: p.close,
                });
            }
            if i > 0 {
                let prev = points[i - 1].date;
                if p.date == prev {
                    return Err(SeriesError::DuplicateDate { date: p.date });
                }
                if p.date < prev {
                    return Err(SeriesError::Unsorted { index: i });
                }
            }
        }
        Ok(Self { points })
    }

    /// Build a series from provider output in arbitrary order.
    ///
    /// Sorts ascending by date and drops duplicate dates, keeping the first
    /// observation for each date.
    pub fn from_unsorted(mut points: Vec<ClosePoint>) -> Result<Self, SeriesError> {
        // Stable sort, so the first observation for a date survives the dedup.
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self::new(points)
    }

    /// The points, sorted ascending by date. Never empty.
    pub fn points(&self) -> &[ClosePoint] {
        &self.points
    }

    /// Date of the first observation.
    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    /// Date of the last observation.
    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }
}
