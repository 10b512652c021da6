//! Temporal range resolution.
//!
//! Maps a `datetime` search parameter onto an overlap predicate over an
//! item's `[start, end]` acquisition interval:
//!
//! | Input | Matches when |
//! |-------|--------------|
//! | `T` | `start <= T <= end` |
//! | `../T2`, `/T2` | `start <= T2 OR end <= T2` |
//! | `T1/..`, `T1/` | `start >= T1 OR end >= T1` |
//! | `T1/T2` | start in range, end in range, or `start < T1 AND end > T2` |

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_query::{Cond, Expr, IntoColumnRef};

use super::error::CatalogError;

/// Markers for an open interval side.
const OPEN_MARKERS: [&str; 2] = ["..", ""];

/// Resolved temporal constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalFilter {
    /// A single instant contained in the item interval.
    Instant(DateTime<Utc>),
    /// Open start, bounded above.
    Until(DateTime<Utc>),
    /// Open end, bounded below.
    Since(DateTime<Utc>),
    /// Closed range.
    Between {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TemporalFilter {
    /// Build the SQL condition against the given start/end columns.
    pub fn condition<S, E>(&self, start_col: S, end_col: E) -> Cond
    where
        S: IntoColumnRef + Clone,
        E: IntoColumnRef + Clone,
    {
        let start = || Expr::col(start_col.clone());
        let end = || Expr::col(end_col.clone());

        match *self {
            TemporalFilter::Instant(t) => Cond::all().add(start().lte(t)).add(end().gte(t)),
            TemporalFilter::Until(t2) => Cond::any().add(start().lte(t2)).add(end().lte(t2)),
            TemporalFilter::Since(t1) => Cond::any().add(start().gte(t1)).add(end().gte(t1)),
            TemporalFilter::Between { start: t1, end: t2 } => Cond::any()
                .add(Cond::all().add(start().gte(t1)).add(start().lte(t2)))
                .add(Cond::all().add(end().gte(t1)).add(end().lte(t2)))
                .add(Cond::all().add(start().lt(t1)).add(end().gt(t2))),
        }
    }
}

impl FromStr for TemporalFilter {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        let Some((left, right)) = value.split_once('/') else {
            return parse_timestamp(value).map(TemporalFilter::Instant);
        };

        let open_start = OPEN_MARKERS.contains(&left);
        let open_end = OPEN_MARKERS.contains(&right);

        match (open_start, open_end) {
            (true, true) => Err(CatalogError::InvalidDatetime(value.to_string())),
            (true, false) => parse_timestamp(right).map(TemporalFilter::Until),
            (false, true) => parse_timestamp(left).map(TemporalFilter::Since),
            (false, false) => Ok(TemporalFilter::Between {
                start: parse_timestamp(left)?,
                end: parse_timestamp(right)?,
            }),
        }
    }
}

/// Parse an RFC 3339 timestamp, also accepting zone-less timestamps and bare
/// dates (both read as UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CatalogError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CatalogError::InvalidDatetime(value.to_string()))
}
