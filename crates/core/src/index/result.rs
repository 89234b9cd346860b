//! Search results and pagination bounds.

use serde::{Serialize, Serializer};
use std::fmt::Write;
use std::time::Duration;

/// Outcome of a single search call. Built fresh per query, never retained by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Outer key that was searched
    pub key: String,
    /// Matching ids, sorted ascending and cut to the requested page
    pub found: Vec<String>,
    /// Number of matches before pagination
    pub count: usize,
    /// Effective (clamped) start of the page
    pub start: usize,
    /// Effective (clamped) end of the page, exclusive
    pub stop: usize,
    /// Wall-clock time spent scanning
    #[serde(serialize_with = "serialize_elapsed")]
    pub elapsed: Duration,
}

impl SearchResult {
    pub fn empty(key: &str) -> Self {
        Self {
            key: key.to_string(),
            found: Vec::new(),
            count: 0,
            start: 0,
            stop: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Human-readable elapsed time, rounded to the millisecond.
    pub fn elapsed_string(&self) -> String {
        format_elapsed(self.elapsed)
    }
}

fn serialize_elapsed<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_elapsed(*elapsed))
}

/// Formats a duration rounded to milliseconds, e.g. `0s`, `12ms`, `1.5s`, `2m3.25s`, `1h0m0s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = (elapsed.as_micros() + 500) / 1000;
    if millis == 0 {
        return "0s".to_string();
    }
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let frac = millis % 1000;
    let total_secs = millis / 1000;
    let (hours, mins, secs) = (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60);

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if hours > 0 || mins > 0 {
        let _ = write!(out, "{}m", mins);
    }
    if frac == 0 {
        let _ = write!(out, "{}s", secs);
    } else {
        let digits = format!("{:03}", frac);
        let _ = write!(out, "{}.{}s", secs, digits.trim_end_matches('0'));
    }
    out
}

/// Pagination window applied to a sorted match list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub start: usize,
    pub stop: usize,
}

impl Page {
    /// Clamps caller-supplied bounds against `total` matches.
    ///
    /// A `stop` of zero (or below) means "no upper bound". A `start` past `stop`
    /// is pulled back to `stop`, and a negative `start` becomes zero. Bounds are
    /// never rejected.
    pub fn clamp(start: i64, stop: i64, total: usize) -> Self {
        let mut start = start;
        let mut stop = stop;

        if start > stop {
            start = stop;
        }
        if start < 0 {
            start = 0;
        }

        let total_bound = i64::try_from(total).unwrap_or(i64::MAX);
        if stop > total_bound || stop <= 0 {
            stop = total_bound;
        }

        let stop = usize::try_from(stop).unwrap_or(total);
        let start = usize::try_from(start).unwrap_or(0).min(stop);

        Self { start, stop }
    }

    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }
}
