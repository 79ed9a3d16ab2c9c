use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use url::Url;

pub mod local;
pub mod youtube;

use crate::matcher::ClipWindow;
use crate::{ClipperError, Result};

pub use youtube::YtDlp;

/// Subtitle document format we know how to parse
pub const SUBTITLE_FORMAT: &str = "json3";

/// A YouTube video, identified by its 11-character id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    id: String,
}

impl VideoRef {
    /// Accept a bare video id or any common YouTube URL form
    pub fn parse(input: &str) -> std::result::Result<Self, ClipperError> {
        let input = input.trim();
        if is_video_id(input) {
            return Ok(Self { id: input.to_string() });
        }

        let parsed = validate_url(input).map_err(|_| ClipperError::InvalidVideo(input.to_string()))?;
        let host = parsed
            .host_str()
            .map(|h| h.trim_start_matches("www.").trim_start_matches("m.").to_lowercase())
            .unwrap_or_default();

        let candidate = match host.as_str() {
            "youtu.be" => parsed
                .path_segments()
                .and_then(|mut segments| segments.next())
                .map(str::to_string),
            "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
                let from_query = parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned());
                from_query.or_else(|| {
                    let segments: Vec<&str> = parsed.path_segments()?.collect();
                    match segments.as_slice() {
                        ["shorts" | "embed" | "live" | "v", id, ..] => Some(id.to_string()),
                        _ => None,
                    }
                })
            }
            _ => None,
        };

        candidate
            .filter(|id| is_video_id(id))
            .map(|id| Self { id })
            .ok_or_else(|| ClipperError::InvalidVideo(input.to_string()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical watch URL handed to `yt-dlp`
    pub fn watch_url(&self) -> String {
        format!(
            "https://www.youtube.com/watch?v={}",
            urlencoding::encode(&self.id)
        )
    }
}

impl std::fmt::Display for VideoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Whether a subtitle track was written by a person or generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleKind {
    Manual,
    Automatic,
}

/// A downloadable subtitle document listed in the video metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub kind: SubtitleKind,

    /// Language key as listed by YouTube (e.g. `en`, `en-orig`)
    pub language: String,

    pub extension: String,
    pub url: String,
}

/// Pick a `json3` subtitle track for `language` from `yt-dlp --dump-json` output.
///
/// Manual subtitles live under `subtitles`, generated ones under `automatic_captions`.
pub fn select_subtitle_track(
    info: &Value,
    language: &str,
    prefer_manual: bool,
) -> Option<SubtitleTrack> {
    let order = if prefer_manual {
        [SubtitleKind::Manual, SubtitleKind::Automatic]
    } else {
        [SubtitleKind::Automatic, SubtitleKind::Manual]
    };
    let keys = [
        language.to_string(),
        format!("{}-orig", language),
        format!("{}.orig", language),
    ];

    order.into_iter().find_map(|kind| {
        let field = match kind {
            SubtitleKind::Manual => "subtitles",
            SubtitleKind::Automatic => "automatic_captions",
        };
        let tracks = info.get(field)?.as_object()?;

        keys.iter().find_map(|key| {
            tracks.get(key)?.as_array()?.iter().find_map(|format| {
                if format.get("ext")?.as_str()? != SUBTITLE_FORMAT {
                    return None;
                }
                Some(SubtitleTrack {
                    kind,
                    language: key.clone(),
                    extension: SUBTITLE_FORMAT.to_string(),
                    url: format.get("url")?.as_str()?.to_string(),
                })
            })
        })
    })
}

/// Narrow interface over the external downloader
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Video metadata as reported by the downloader
    async fn video_info(&self, video: &VideoRef) -> Result<Value>;

    /// Fetch a subtitle document's raw text
    async fn fetch_subtitle(&self, track: &SubtitleTrack) -> Result<String>;

    /// Download the audio track as mp3 to `output_path`
    async fn download_audio(&self, video: &VideoRef, output_path: &Path) -> Result<()>;

    /// Download only `window` of the video; returns the produced file
    async fn download_section(
        &self,
        video: &VideoRef,
        window: &ClipWindow,
        output_base: &Path,
        extension: &str,
        format: Option<String>,
    ) -> Result<PathBuf>;

    /// Download the whole video; returns the produced file
    async fn download_full(
        &self,
        video: &VideoRef,
        output_base: &Path,
        extension: &str,
        format: Option<String>,
    ) -> Result<PathBuf>;
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_video_refs() {
        let expected = "dQw4w9WgXcQ";
        for input in [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert_eq!(VideoRef::parse(input).unwrap().id(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_rejects_non_youtube_input() {
        for input in [
            "",
            "not a video",
            "https://vimeo.com/12345678901",
            "https://www.youtube.com/watch?v=short",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert!(VideoRef::parse(input).is_err(), "input: {}", input);
        }
    }

    #[test]
    fn test_watch_url() {
        let video = VideoRef::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    fn info() -> Value {
        json!({
            "subtitles": {
                "en": [
                    { "ext": "vtt", "url": "https://example.com/manual.vtt" },
                    { "ext": "json3", "url": "https://example.com/manual.json3" }
                ],
                "de": [{ "ext": "json3", "url": "https://example.com/de.json3" }]
            },
            "automatic_captions": {
                "en-orig": [{ "ext": "json3", "url": "https://example.com/auto.json3" }],
                "fr": [{ "ext": "srv1", "url": "https://example.com/fr.srv1" }]
            }
        })
    }

    #[test]
    fn test_select_prefers_manual() {
        let track = select_subtitle_track(&info(), "en", true).unwrap();
        assert_eq!(track.kind, SubtitleKind::Manual);
        assert_eq!(track.url, "https://example.com/manual.json3");
    }

    #[test]
    fn test_select_prefers_automatic_when_asked() {
        let track = select_subtitle_track(&info(), "en", false).unwrap();
        assert_eq!(track.kind, SubtitleKind::Automatic);
        assert_eq!(track.language, "en-orig");
    }

    #[test]
    fn test_select_requires_json3() {
        assert!(select_subtitle_track(&info(), "fr", true).is_none());
        assert!(select_subtitle_track(&info(), "ja", true).is_none());
        assert!(select_subtitle_track(&json!({}), "en", true).is_none());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not-a-url").is_err());
    }
}
