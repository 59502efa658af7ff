//! Pre/post close alignment.
//!
//! Given one symbol's daily close series and an arbitrary calendar date,
//! resolve the close on the last trading day at or before that date (the
//! "pre" close) and the close on the trading day immediately after the pre
//! date (the "post" close). Either value can be absent: the event may
//! predate the series, and the pre day may be the final observation.

use crate::domain::PriceSeries;
use chrono::NaiveDate;

/// Pre and post closes around an event date.
///
/// `None` means no trading day satisfies the requested relation within the
/// series — an expected outcome, not an error. Callers must propagate the
/// absence rather than substitute a numeric sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub pre_close: Option<f64>,
    pub post_close: Option<f64>,
}

impl Alignment {
    /// Both values absent.
    pub const ABSENT: Alignment = Alignment {
        pre_close: None,
        post_close: None,
    };
}

/// Resolve the pre and post closes for `event_date`.
///
/// The pre close is the close at `event_date` itself when it is a trading
/// day, otherwise the close on the last trading day before it. The post
/// close is the close on the trading day immediately after the resolved pre
/// date — not the first trading day after `event_date`.
///
/// Pure and stateless: the same series and date always produce the same
/// result. The series' sortedness and uniqueness are guaranteed by
/// [`PriceSeries`] construction, so no validation happens here.
pub fn resolve_pre_post(series: &PriceSeries, event_date: NaiveDate) -> Alignment {
    let points = series.points();

    // Lower bound: index of the first entry whose date >= event_date.
    let pos = points.partition_point(|p| p.date < event_date);

    let pre_idx = if pos < points.len() && points[pos].date == event_date {
        // The event date itself is a trading day.
        pos
    } else if pos == 0 {
        // Every entry is after the event date.
        return Alignment::ABSENT;
    } else {
        pos - 1
    };

    Alignment {
        pre_close: Some(points[pre_idx].close),
        post_close: points.get(pre_idx + 1).map(|p| p.close),
    }
}
