//! Historical query building and chart series extraction.

use crate::api::HistoricalQuery;
use crate::types::*;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default query range: yesterday to today, as `YYYY-MM-DD` strings.
pub fn default_date_range(today: NaiveDate) -> (String, String) {
    let yesterday = today.pred_opt().unwrap_or(today);
    (
        yesterday.format(DATE_FORMAT).to_string(),
        today.format(DATE_FORMAT).to_string(),
    )
}

/// Default range relative to the current UTC date.
pub fn default_date_range_utc() -> (String, String) {
    default_date_range(Utc::now().date_naive())
}

/// Builds the query for whole days `start_date..=end_date`.
///
/// Dates are `YYYY-MM-DD`; a blank date leaves that end of the range open.
/// When both are given the start must not be after the end.
pub fn build_query(node_id: &str, start_date: &str, end_date: &str) -> Result<HistoricalQuery, String> {
    let start = parse_date(start_date, "start")?;
    let end = parse_date(end_date, "end")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err("Start date must not be after end date".into());
        }
    }
    Ok(HistoricalQuery {
        node_id: node_id.to_string(),
        start_time: start.map(|d| format!("{}T00:00:00", d.format(DATE_FORMAT))),
        end_time: end.map(|d| format!("{}T23:59:59", d.format(DATE_FORMAT))),
    })
}

fn parse_date(raw: &str, which: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| format!("Invalid {which} date \"{raw}\", expected YYYY-MM-DD"))
}

/// Parses the timestamp formats the server produces.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// A chartable series. Runs of numeric samples become segments; a sample
/// without a numeric value ends the current segment.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    /// Legend label
    pub label: String,
    /// Time of the first sample; x values are seconds since this instant
    pub origin: NaiveDateTime,
    /// Contiguous runs of `[seconds, value]` points
    pub segments: Vec<Vec<[f64; 2]>>,
}

impl HistoricalSeries {
    /// Number of plotted points.
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }
}

/// Turns server samples into a series, or `None` when nothing can be plotted.
pub fn build_series(samples: &[HistoricalSample], fallback_label: &str) -> Option<HistoricalSeries> {
    let timed: Vec<(NaiveDateTime, Option<f64>)> = samples
        .iter()
        .filter_map(|s| {
            let Some(at) = parse_timestamp(&s.timestamp) else {
                log::warn!("Skipping sample with unreadable timestamp {:?}", s.timestamp);
                return None;
            };
            Some((at, s.value.as_ref().and_then(NodeValue::as_f64)))
        })
        .collect();

    let origin = timed.first()?.0;
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (at, value) in timed {
        match value {
            Some(v) => {
                let secs = (at - origin).num_milliseconds() as f64 / 1000.0;
                current.push([secs, v]);
            }
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    if segments.is_empty() {
        return None;
    }

    let name = samples
        .iter()
        .find_map(|s| s.node_name.as_deref().or(s.node_ua_id.as_deref()))
        .unwrap_or(fallback_label);
    Some(HistoricalSeries {
        label: format!("Value of {name}"),
        origin,
        segments,
    })
}
