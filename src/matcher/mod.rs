//! Fuzzy search of a transcript for a spoken line.
//!
//! Scores are computed on normalized text (case-folded, punctuation stripped, whitespace
//! collapsed) as `max(levenshtein_ratio, PARTIAL_WEIGHT * partial_ratio)`:
//!
//! * `levenshtein_ratio = 1 - d(q, t) / max(|q|, |t|)` compares the whole line;
//! * `partial_ratio = 1 - d_sub(q, t) / |q|` uses the cheapest alignment of the query
//!   against any substring of the line, so a quote inside a longer caption still scores.
//!
//! An exact normalized match scores 1.0 and a query contained in a longer line scores
//! [`PARTIAL_WEIGHT`].

use serde::{Deserialize, Serialize};

use crate::transcript::{Segment, Transcript};
use crate::ClipperError;

pub mod similarity;

pub use similarity::{levenshtein, normalize, partial_ratio, ratio, similarity};

pub const DEFAULT_BEFORE_SECONDS: f64 = 5.0;
pub const DEFAULT_AFTER_SECONDS: f64 = 5.0;
pub const DEFAULT_MIN_SCORE: f64 = 0.6;
pub const DEFAULT_MAX_WINDOW: usize = 1;

/// Weight applied to substring matches so that exact matches always rank higher
pub const PARTIAL_WEIGHT: f64 = 0.9;

/// Time range to extract from the source media
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipWindow {
    pub start: f64,
    pub end: f64,
}

impl ClipWindow {
    /// Pad `[start, end]` by `before`/`after` seconds, clamping the start at zero
    pub fn around(start: f64, end: f64, before: f64, after: f64) -> Result<Self, ClipperError> {
        validate_padding(before, after)?;
        Ok(Self {
            start: (start - before).max(0.0),
            end: end + after,
        })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether a segment overlaps this window by a positive amount
    pub fn overlaps(&self, segment: &Segment) -> bool {
        segment.end_time > self.start && segment.start_time < self.end
    }
}

fn validate_padding(before: f64, after: f64) -> Result<(), ClipperError> {
    let valid = |v: f64| v.is_finite() && v >= 0.0;
    if valid(before) && valid(after) {
        Ok(())
    } else {
        Err(ClipperError::InvalidWindowParameters { before, after })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Seconds to include before the matched line
    pub before: f64,

    /// Seconds to include after the matched line
    pub after: f64,

    /// Minimum acceptable similarity in [0, 1]
    pub min_score: f64,

    /// Maximum number of consecutive segments joined into one candidate
    pub max_window: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            before: DEFAULT_BEFORE_SECONDS,
            after: DEFAULT_AFTER_SECONDS,
            min_score: DEFAULT_MIN_SCORE,
            max_window: DEFAULT_MAX_WINDOW,
        }
    }
}

impl MatchOptions {
    pub fn validate(&self) -> Result<(), ClipperError> {
        validate_padding(self.before, self.after)?;
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(ClipperError::InvalidMatchOptions(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }
        if self.max_window == 0 {
            return Err(ClipperError::InvalidMatchOptions(
                "max_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Best-matching run of segments and the clip window around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Index of the first matched segment in the transcript
    pub start_index: usize,

    /// Number of consecutive segments in the match
    pub segment_count: usize,

    /// Matched text as it appears in the transcript
    pub text: String,

    pub start_time: f64,
    pub end_time: f64,

    /// Similarity in [0, 1]
    pub score: f64,

    pub window: ClipWindow,
}

impl MatchResult {
    /// Matched segments, borrowed from the transcript they came from
    pub fn segments<'t>(&self, transcript: &'t Transcript) -> &'t [Segment] {
        &transcript.segments()[self.start_index..self.start_index + self.segment_count]
    }

    /// First matched segment
    pub fn segment<'t>(&self, transcript: &'t Transcript) -> &'t Segment {
        &transcript.segments()[self.start_index]
    }
}

struct Candidate {
    start_index: usize,
    segment_count: usize,
    start_time: f64,
    score: f64,
}

impl Candidate {
    /// Higher score wins, then fewer joined segments, then earlier start
    fn beats(&self, other: &Candidate) -> bool {
        if self.score != other.score {
            return self.score > other.score;
        }
        if self.segment_count != other.segment_count {
            return self.segment_count < other.segment_count;
        }
        self.start_time < other.start_time
    }
}

/// Find the segment (or run of segments) that best matches `query`.
pub fn find_best_match(
    transcript: &Transcript,
    query: &str,
    options: &MatchOptions,
) -> Result<MatchResult, ClipperError> {
    options.validate()?;

    let target = normalize(query);
    if target.is_empty() {
        return Err(ClipperError::EmptyQuery);
    }

    let segments = transcript.segments();
    let normalized: Vec<String> = segments.iter().map(|s| normalize(&s.text)).collect();

    let mut best: Option<Candidate> = None;
    for window in 1..=options.max_window.min(segments.len()) {
        // Segments are sorted by start, so within one window size the first
        // of several equal candidates is also the earliest.
        for start_index in 0..=segments.len() - window {
            let joined = normalized[start_index..start_index + window]
                .iter()
                .filter(|s| !s.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            if joined.is_empty() {
                continue;
            }

            let candidate = Candidate {
                start_index,
                segment_count: window,
                start_time: segments[start_index].start_time,
                score: similarity(&target, &joined),
            };
            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }
    }

    let best_score = best.as_ref().map_or(0.0, |b| b.score);
    let best = match best {
        Some(b) if b.score >= options.min_score => b,
        _ => {
            return Err(ClipperError::NoConfidentMatch {
                best_score,
                min_score: options.min_score,
            })
        }
    };

    let matched = &segments[best.start_index..best.start_index + best.segment_count];
    let start_time = matched[0].start_time;
    let end_time = matched
        .iter()
        .map(|s| s.end_time)
        .fold(f64::NEG_INFINITY, f64::max);
    let text = matched
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    tracing::debug!(
        "Best match at {:.3}s ({} segment(s)) scored {:.3}",
        start_time,
        best.segment_count,
        best.score
    );

    Ok(MatchResult {
        start_index: best.start_index,
        segment_count: best.segment_count,
        text,
        start_time,
        end_time,
        score: best.score,
        window: ClipWindow::around(start_time, end_time, options.before, options.after)?,
    })
}
