//! Turns a language-model reply into the clip list handed to ffmpeg.
//!
//! The pipeline is parse → buffer → sort → merge → filter. Every stage takes
//! the previous stage's output by reference and returns a new `Vec`, so the
//! whole thing is a pure function of `(reply, params)`.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::timecode::{RawMatch, find_range_matches, parse_timestamp, timestamp_to_seconds};

/// Half-open interval `[start, end)` in seconds with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    /// `None` unless both bounds are finite and `end > start`.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if start.is_finite() && end.is_finite() && end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// What to do with a matched timestamp that fails numeric conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Read it as `0.0` seconds and keep going.
    #[default]
    Zero,
    /// Drop the whole match.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeParams {
    pub buffer_seconds: f64,
    pub merge_gap_seconds: f64,
    pub min_duration_seconds: f64,
    pub malformed: MalformedPolicy,
}

impl RangeParams {
    pub const DEFAULT_BUFFER_SECONDS: f64 = 0.5;
    pub const DEFAULT_MERGE_GAP_SECONDS: f64 = 0.5;
    pub const DEFAULT_MIN_DURATION_SECONDS: f64 = 2.0;

    pub fn new(buffer_seconds: f64, merge_gap_seconds: f64, min_duration_seconds: f64) -> Self {
        Self {
            buffer_seconds,
            merge_gap_seconds,
            min_duration_seconds,
            malformed: MalformedPolicy::default(),
        }
    }

    pub fn with_malformed(mut self, malformed: MalformedPolicy) -> Self {
        self.malformed = malformed;
        self
    }

    /// Negative and NaN values become `0.0`.
    pub fn clamped(self) -> Self {
        Self {
            buffer_seconds: non_negative(self.buffer_seconds),
            merge_gap_seconds: non_negative(self.merge_gap_seconds),
            min_duration_seconds: non_negative(self.min_duration_seconds),
            malformed: self.malformed,
        }
    }
}

impl Default for RangeParams {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_BUFFER_SECONDS,
            Self::DEFAULT_MERGE_GAP_SECONDS,
            Self::DEFAULT_MIN_DURATION_SECONDS,
        )
    }
}

fn non_negative(value: f64) -> f64 {
    if value > 0.0 { value } else { 0.0 }
}

/// Why a reply produced no clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmptyReason {
    #[error("the reply contained no HH:MM:SS.mmm - HH:MM:SS.mmm time ranges")]
    NoMatchesFound,

    #[error(
        "{matched} time range(s) found, but none met the minimum duration after buffering and merging"
    )]
    EmptyAfterNormalization { matched: usize },
}

/// Result of [`normalize`]: either clips to cut or the reason there are none.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipPlan {
    Ready(Vec<TimeRange>),
    Empty(EmptyReason),
}

impl ClipPlan {
    pub fn ranges(&self) -> &[TimeRange] {
        match self {
            ClipPlan::Ready(ranges) => ranges,
            ClipPlan::Empty(_) => &[],
        }
    }

    pub fn into_result(self) -> Result<Vec<TimeRange>, EmptyReason> {
        match self {
            ClipPlan::Ready(ranges) => Ok(ranges),
            ClipPlan::Empty(reason) => Err(reason),
        }
    }
}

fn match_seconds(text: &str, policy: MalformedPolicy) -> Option<f64> {
    match policy {
        MalformedPolicy::Zero => Some(timestamp_to_seconds(text)),
        MalformedPolicy::Skip => match parse_timestamp(text) {
            Ok(seconds) => Some(seconds),
            Err(e) => {
                warn!(timestamp = text, error = %e, "malformed timestamp, dropping range");
                None
            }
        },
    }
}

/// Pad each match by `buffer_seconds` on both sides, clamping the start at zero.
///
/// Input order is preserved. Pairs that end up with `end <= start` are dropped.
pub fn buffer_ranges(matches: &[RawMatch], params: &RangeParams) -> Vec<TimeRange> {
    let params = params.clamped();

    matches
        .iter()
        .filter_map(|m| {
            let start = match_seconds(&m.start_text, params.malformed)?;
            let end = match_seconds(&m.end_text, params.malformed)?;
            let buffered = TimeRange::new(
                (start - params.buffer_seconds).max(0.0),
                end + params.buffer_seconds,
            );
            if buffered.is_none() {
                debug!(start = %m.start_text, end = %m.end_text, "dropping empty range");
            }
            buffered
        })
        .collect()
}

/// Stable ascending sort by start time.
pub fn sort_ranges(ranges: &[TimeRange]) -> Vec<TimeRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
    sorted
}

/// Merge ranges that overlap or sit within `merge_gap_seconds` of each other.
///
/// Expects `sorted` ordered by start, as returned by [`sort_ranges`].
pub fn merge_ranges(sorted: &[TimeRange], merge_gap_seconds: f64) -> Vec<TimeRange> {
    let gap = non_negative(merge_gap_seconds);
    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());

    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end + gap => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(*range),
        }
    }

    merged
}

/// Keep ranges lasting at least `min_duration_seconds`.
pub fn filter_short_ranges(ranges: &[TimeRange], min_duration_seconds: f64) -> Vec<TimeRange> {
    let min = non_negative(min_duration_seconds);
    ranges
        .iter()
        .copied()
        .filter(|r| r.duration() >= min)
        .collect()
}

/// Extract, buffer, sort, merge and filter the time ranges in `reply`.
pub fn normalize(reply: &str, params: &RangeParams) -> ClipPlan {
    let params = params.clamped();
    let matches = find_range_matches(reply);
    if matches.is_empty() {
        return ClipPlan::Empty(EmptyReason::NoMatchesFound);
    }

    let buffered = buffer_ranges(&matches, &params);
    let sorted = sort_ranges(&buffered);
    let merged = merge_ranges(&sorted, params.merge_gap_seconds);
    let clips = filter_short_ranges(&merged, params.min_duration_seconds);
    debug!(
        matched = matches.len(),
        buffered = buffered.len(),
        merged = merged.len(),
        kept = clips.len(),
        "normalized reply ranges"
    );

    if clips.is_empty() {
        ClipPlan::Empty(EmptyReason::EmptyAfterNormalization {
            matched: matches.len(),
        })
    } else {
        ClipPlan::Ready(clips)
    }
}
