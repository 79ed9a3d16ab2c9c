//! Quote Clipper - find a spoken line in a video's subtitles and clip it
//!
//! This library searches a YouTube transcript for a free-text query using fuzzy matching,
//! derives a clip window around the best-matching line and drives `yt-dlp`/`ffmpeg` to cut
//! the clip. When a video has no subtitles, a pluggable speech-to-text provider can produce
//! the transcript instead.

pub mod cli;
pub mod clip;
pub mod config;
pub mod extractors;
pub mod matcher;
pub mod output;
pub mod transcribe;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, ReportFormat};
pub use clip::{ClipOutcome, ClipPipeline, ClipRequest};
pub use config::Config;
pub use extractors::{MediaDownloader, VideoRef};
pub use matcher::{find_best_match, ClipWindow, MatchOptions, MatchResult};
pub use transcribe::{ProviderRegistry, SttProvider};
pub use transcript::{Segment, Transcript, TranscriptOrigin, TranscriptSource};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the clipper
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClipperError {
    #[error("No subtitles available for language '{language}' (manual or automatic)")]
    NoTranscriptAvailable { language: String },

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Malformed transcript: {0}")]
    MalformedTranscript(String),

    #[error("No confident match for the query (best score {best_score:.3}, required {min_score:.3})")]
    NoConfidentMatch { best_score: f64, min_score: f64 },

    #[error("Invalid window parameters: before={before}, after={after} (both must be >= 0)")]
    InvalidWindowParameters { before: f64, after: f64 },

    #[error("Invalid match options: {0}")]
    InvalidMatchOptions(String),

    #[error("Query is empty after normalization")]
    EmptyQuery,

    #[error("Unknown STT provider '{name}'. Available providers: {available}")]
    UnknownProvider { name: String, available: String },

    #[error("Not a YouTube video URL or ID: {0}")]
    InvalidVideo(String),

    #[error("Failed to download clip: {0}")]
    ClipFailed(String),
}

impl ClipperError {
    /// Process exit status the CLI reports for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            ClipperError::NoConfidentMatch { .. } | ClipperError::EmptyQuery => 2,
            ClipperError::ClipFailed(_) => 3,
            _ => 1,
        }
    }
}

/// Exit status for any error surfaced from the application
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ClipperError>())
        .map(ClipperError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ClipperError::EmptyQuery.exit_code(), 2);
        assert_eq!(
            ClipperError::NoConfidentMatch { best_score: 0.2, min_score: 0.6 }.exit_code(),
            2
        );
        assert_eq!(ClipperError::ClipFailed("boom".into()).exit_code(), 3);
        assert_eq!(
            ClipperError::NoTranscriptAvailable { language: "en".into() }.exit_code(),
            1
        );
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err = Err::<(), _>(ClipperError::ClipFailed("ffmpeg".into()))
            .context("while clipping")
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 3);
        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), 1);
    }
}
