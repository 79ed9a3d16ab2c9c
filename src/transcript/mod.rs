use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::extractors::{select_subtitle_track, MediaDownloader, SubtitleKind, VideoRef};
use crate::transcribe::SttProvider;
use crate::ClipperError;

pub mod json3;

pub use json3::parse_json3;

/// One timestamped line of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds
    pub end_time: f64,

    /// Segment text
    pub text: String,
}

impl Segment {
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
        }
    }

    /// Finite, non-negative start and an end that is not before it
    pub fn has_valid_times(&self) -> bool {
        self.start_time.is_finite()
            && self.end_time.is_finite()
            && self.start_time >= 0.0
            && self.end_time >= self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Where a transcript came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TranscriptOrigin {
    /// Human-authored subtitles
    Manual,
    /// Automatically generated captions
    Automatic,
    /// Speech-to-text output of the named provider
    Speech { provider: String },
}

impl std::fmt::Display for TranscriptOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptOrigin::Manual => write!(f, "manual subtitles"),
            TranscriptOrigin::Automatic => write!(f, "automatic captions"),
            TranscriptOrigin::Speech { provider } => write!(f, "speech-to-text ({})", provider),
        }
    }
}

impl From<SubtitleKind> for TranscriptOrigin {
    fn from(kind: SubtitleKind) -> Self {
        match kind {
            SubtitleKind::Manual => TranscriptOrigin::Manual,
            SubtitleKind::Automatic => TranscriptOrigin::Automatic,
        }
    }
}

/// Ordered, non-empty sequence of segments for one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    segments: Vec<Segment>,
    pub origin: TranscriptOrigin,
    pub language: String,
}

impl Transcript {
    /// Build a transcript, ordering segments by start time.
    ///
    /// Fails with [`ClipperError::MalformedTranscript`] when there is nothing usable
    /// or a segment ends before it starts.
    pub fn new(
        mut segments: Vec<Segment>,
        origin: TranscriptOrigin,
        language: impl Into<String>,
    ) -> Result<Self, ClipperError> {
        if segments.is_empty() {
            return Err(ClipperError::MalformedTranscript(
                "no usable segments".to_string(),
            ));
        }
        if let Some(bad) = segments.iter().find(|s| !s.has_valid_times()) {
            return Err(ClipperError::MalformedTranscript(format!(
                "segment '{}' has invalid times {}..{}",
                bad.text, bad.start_time, bad.end_time
            )));
        }
        segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(Self {
            segments,
            origin,
            language: language.into(),
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Raw subtitle document together with the transcript parsed from it
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    pub raw: String,
    pub extension: String,
    pub transcript: Transcript,
}

/// Produces transcripts from subtitle tracks or, as a fallback, from speech-to-text
pub struct TranscriptSource<'a> {
    downloader: &'a dyn MediaDownloader,
}

impl<'a> TranscriptSource<'a> {
    pub fn new(downloader: &'a dyn MediaDownloader) -> Self {
        Self { downloader }
    }

    /// Fetch and parse the subtitle track for `video` in `language`
    pub async fn fetch(
        &self,
        video: &VideoRef,
        language: &str,
        prefer_manual: bool,
    ) -> crate::Result<Transcript> {
        Ok(self.fetch_document(video, language, prefer_manual).await?.transcript)
    }

    /// Like [`fetch`](Self::fetch), but keeps the raw document around
    pub async fn fetch_document(
        &self,
        video: &VideoRef,
        language: &str,
        prefer_manual: bool,
    ) -> crate::Result<SubtitleDocument> {
        let info = self.downloader.video_info(video).await?;

        let track = select_subtitle_track(&info, language, prefer_manual).ok_or_else(|| {
            ClipperError::NoTranscriptAvailable {
                language: language.to_string(),
            }
        })?;

        tracing::info!(
            "Using {} subtitle track '{}' for {}",
            match track.kind {
                SubtitleKind::Manual => "manual",
                SubtitleKind::Automatic => "automatic",
            },
            track.language,
            video.id()
        );

        let raw = self.downloader.fetch_subtitle(&track).await?;
        let segments = parse_json3(&raw)?;
        let transcript = Transcript::new(segments, track.kind.into(), track.language.clone())?;

        Ok(SubtitleDocument {
            raw,
            extension: track.extension,
            transcript,
        })
    }

    /// Transcribe downloaded audio with a speech-to-text provider
    pub async fn transcribe(
        audio_path: &Path,
        language: &str,
        provider_name: &str,
        provider: &dyn SttProvider,
    ) -> crate::Result<Transcript> {
        tracing::info!(
            "Transcribing {} with provider '{}'",
            audio_path.display(),
            provider_name
        );

        let segments = provider
            .transcribe(audio_path, language)
            .await
            .map_err(|e| ClipperError::TranscriptionFailed(format!("{:#}", e)))?;

        // Providers may emit blank lines between utterances
        let segments: Vec<Segment> = segments
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .filter(|s| {
                let usable = s.has_valid_times() && s.end_time > s.start_time;
                if !usable {
                    tracing::debug!(
                        "Dropping speech segment '{}' with times {}..{}",
                        s.text,
                        s.start_time,
                        s.end_time
                    );
                }
                usable
            })
            .collect();

        Ok(Transcript::new(
            segments,
            TranscriptOrigin::Speech {
                provider: provider_name.to_string(),
            },
            language,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::MockMediaDownloader;
    use crate::transcribe::MockSttProvider;
    use serde_json::json;

    const DOC: &str = r#"{"events":[{"tStartMs":0,"dDurationMs":2000,"segs":[{"utf8":"hello world"}]}]}"#;

    fn info_with(manual: bool, automatic: bool) -> serde_json::Value {
        let track = json!([{ "ext": "json3", "url": "https://example.com/track" }]);
        let mut info = json!({ "id": "dQw4w9WgXcQ", "subtitles": {}, "automatic_captions": {} });
        if manual {
            info["subtitles"]["en"] = track.clone();
        }
        if automatic {
            info["automatic_captions"]["en-orig"] = track;
        }
        info
    }

    fn video() -> VideoRef {
        VideoRef::parse("dQw4w9WgXcQ").unwrap()
    }

    #[test]
    fn test_transcript_orders_segments() {
        let t = Transcript::new(
            vec![Segment::new(5.0, 6.0, "b"), Segment::new(1.0, 2.0, "a")],
            TranscriptOrigin::Manual,
            "en",
        )
        .unwrap();
        assert_eq!(t.segments()[0].text, "a");
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_empty_transcript_is_malformed() {
        let err = Transcript::new(Vec::new(), TranscriptOrigin::Manual, "en").unwrap_err();
        assert!(matches!(err, ClipperError::MalformedTranscript(_)));
    }

    #[tokio::test]
    async fn test_fetch_prefers_manual_track() {
        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_video_info()
            .returning(|_| Ok(info_with(true, true)));
        downloader
            .expect_fetch_subtitle()
            .withf(|track| track.kind == SubtitleKind::Manual)
            .times(1)
            .returning(|_| Ok(DOC.to_string()));

        let source = TranscriptSource::new(&downloader);
        let transcript = source.fetch(&video(), "en", true).await.unwrap();
        assert_eq!(transcript.origin, TranscriptOrigin::Manual);
        assert_eq!(transcript.segments()[0].text, "hello world");
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_automatic() {
        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_video_info()
            .returning(|_| Ok(info_with(false, true)));
        downloader
            .expect_fetch_subtitle()
            .returning(|_| Ok(DOC.to_string()));

        let source = TranscriptSource::new(&downloader);
        let transcript = source.fetch(&video(), "en", true).await.unwrap();
        assert_eq!(transcript.origin, TranscriptOrigin::Automatic);
        assert_eq!(transcript.language, "en-orig");
    }

    #[tokio::test]
    async fn test_fetch_without_tracks_fails() {
        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_video_info()
            .returning(|_| Ok(info_with(false, false)));
        downloader.expect_fetch_subtitle().never();

        let source = TranscriptSource::new(&downloader);
        let err = source.fetch(&video(), "en", true).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ClipperError>(),
            Some(&ClipperError::NoTranscriptAvailable { language: "en".into() })
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_unparseable_document() {
        let mut downloader = MockMediaDownloader::new();
        downloader
            .expect_video_info()
            .returning(|_| Ok(info_with(true, false)));
        downloader
            .expect_fetch_subtitle()
            .returning(|_| Ok(r#"{"events":[{"segs":[{"utf8":"no start"}]}]}"#.to_string()));

        let source = TranscriptSource::new(&downloader);
        let err = source.fetch(&video(), "en", true).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClipperError>(),
            Some(ClipperError::MalformedTranscript(_))
        ));
    }

    #[tokio::test]
    async fn test_transcribe_maps_provider_failure() {
        let mut provider = MockSttProvider::new();
        provider
            .expect_transcribe()
            .returning(|_, _| Err(anyhow::anyhow!("quota exceeded")));

        let err = TranscriptSource::transcribe(Path::new("audio.mp3"), "en", "mock", &provider)
            .await
            .unwrap_err();
        match err.downcast_ref::<ClipperError>() {
            Some(ClipperError::TranscriptionFailed(msg)) => assert!(msg.contains("quota")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transcribe_builds_speech_transcript() {
        let mut provider = MockSttProvider::new();
        provider.expect_transcribe().returning(|_, _| {
            Ok(vec![
                Segment::new(3.0, 4.0, "second"),
                Segment::new(0.0, 1.0, " "),
                Segment::new(1.0, 2.0, "first"),
            ])
        });

        let transcript =
            TranscriptSource::transcribe(Path::new("audio.mp3"), "en", "mock", &provider)
                .await
                .unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.segments()[0].text, "first");
        assert_eq!(
            transcript.origin,
            TranscriptOrigin::Speech { provider: "mock".into() }
        );
    }

    #[test]
    fn test_transcript_rejects_inverted_segment() {
        let err = Transcript::new(
            vec![Segment::new(1.0, 2.0, "fine"), Segment::new(5.0, 3.0, "backwards")],
            TranscriptOrigin::Manual,
            "en",
        )
        .unwrap_err();
        assert!(matches!(err, ClipperError::MalformedTranscript(ref msg) if msg.contains("backwards")));

        let err = Transcript::new(
            vec![Segment::new(8.0, f64::NAN, "no end")],
            TranscriptOrigin::Manual,
            "en",
        )
        .unwrap_err();
        assert!(matches!(err, ClipperError::MalformedTranscript(_)));
    }

    #[tokio::test]
    async fn test_transcribe_drops_segments_with_bad_times() {
        let mut provider = MockSttProvider::new();
        provider.expect_transcribe().returning(|_, _| {
            Ok(vec![
                Segment::new(5.0, 3.0, "hello there"),
                Segment::new(8.0, f64::NAN, "general kenobi"),
                Segment::new(9.0, 9.0, "instant"),
                Segment::new(10.0, 12.0, "you are a bold one"),
            ])
        });

        let transcript =
            TranscriptSource::transcribe(Path::new("audio.mp3"), "en", "mock", &provider)
                .await
                .unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.segments()[0].text, "you are a bold one");

        let options = crate::matcher::MatchOptions {
            before: 0.0,
            after: 0.0,
            min_score: 0.0,
            ..Default::default()
        };
        let result = crate::matcher::find_best_match(&transcript, "hello there", &options).unwrap();
        assert!(result.window.end > result.window.start);
    }

    #[tokio::test]
    async fn test_transcribe_with_only_bad_times_is_malformed() {
        let mut provider = MockSttProvider::new();
        provider
            .expect_transcribe()
            .returning(|_, _| Ok(vec![Segment::new(5.0, 3.0, "hello there")]));

        let err = TranscriptSource::transcribe(Path::new("audio.mp3"), "en", "mock", &provider)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClipperError>(),
            Some(ClipperError::MalformedTranscript(_))
        ));
    }

    #[tokio::test]
    async fn test_transcribe_empty_output_is_malformed() {
        let mut provider = MockSttProvider::new();
        provider.expect_transcribe().returning(|_, _| Ok(Vec::new()));

        let err = TranscriptSource::transcribe(Path::new("audio.mp3"), "en", "mock", &provider)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClipperError>(),
            Some(ClipperError::MalformedTranscript(_))
        ));
    }
}
