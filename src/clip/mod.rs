use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use crate::extractors::{local, MediaDownloader, VideoRef};
use crate::matcher::{find_best_match, normalize, ClipWindow, MatchOptions, MatchResult};
use crate::output;
use crate::transcribe::ProviderRegistry;
use crate::transcript::{SubtitleDocument, Transcript, TranscriptSource};
use crate::utils::default_clip_name;
use crate::ClipperError;

/// Parameters for locating a line in a video's transcript
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub video: VideoRef,
    pub query: String,
    pub options: MatchOptions,
    pub language: String,
    pub prefer_manual: bool,
    pub stt_fallback: bool,
    pub stt_provider: String,
}

/// A search plus what to do with the match
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub search: SearchRequest,

    /// Destination file; generated from the query when absent
    pub output: Option<PathBuf>,

    /// yt-dlp format selector, passed through untouched
    pub format: Option<String>,

    pub write_srt: bool,

    /// Where to save the subtitle document verbatim
    pub save_subtitles: Option<PathBuf>,
}

/// Transcript, match and the raw subtitle document it came from (if any)
#[derive(Debug)]
pub struct SearchOutcome {
    pub transcript: Transcript,
    pub document: Option<SubtitleDocument>,
    pub result: MatchResult,
}

#[derive(Debug)]
pub struct ClipOutcome {
    pub result: MatchResult,
    pub clip_path: PathBuf,
    pub subtitle_path: Option<PathBuf>,
    pub document_path: Option<PathBuf>,
}

/// Transcript lookup, matching and clip extraction, run one step after another
pub struct ClipPipeline<'a> {
    downloader: &'a dyn MediaDownloader,
    providers: &'a ProviderRegistry,
    temp_dir: TempDir,
    default_extension: String,
    verbose: bool,
}

impl<'a> ClipPipeline<'a> {
    pub fn new(
        downloader: &'a dyn MediaDownloader,
        providers: &'a ProviderRegistry,
        temp_root: Option<&Path>,
        default_extension: impl Into<String>,
        verbose: bool,
    ) -> Result<Self> {
        let temp_dir = match temp_root {
            Some(root) => {
                fs_err::create_dir_all(root)?;
                tempfile::Builder::new().prefix("clipper").tempdir_in(root)
            }
            None => TempDir::new(),
        }
        .context("Failed to create temporary directory")?;

        Ok(Self {
            downloader,
            providers,
            temp_dir,
            default_extension: default_extension.into(),
            verbose,
        })
    }

    /// Fetch (or transcribe) the transcript and find the best match in it
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        // Fail on bad input before touching the network
        request.options.validate()?;
        if normalize(&request.query).is_empty() {
            return Err(ClipperError::EmptyQuery.into());
        }
        if request.stt_fallback {
            self.providers.get(&request.stt_provider)?;
        }

        output::status("Fetching transcript...");
        let (transcript, document) = self.load_transcript(request).await?;

        output::status(format!(
            "Loaded {} transcript segments from {}. Searching for best match...",
            transcript.len(),
            transcript.origin
        ));
        let result = find_best_match(&transcript, &request.query, &request.options)?;

        tracing::info!(
            "Matched segment #{} at {:.2}s with score {:.3}",
            result.start_index,
            result.start_time,
            result.score
        );

        Ok(SearchOutcome {
            transcript,
            document,
            result,
        })
    }

    /// Search, download the clip and write its sidecar files
    pub async fn run(&self, request: &ClipRequest) -> Result<ClipOutcome> {
        let found = self.search(&request.search).await?;
        let window = found.result.window;

        let output_path = request.output.clone().unwrap_or_else(|| {
            PathBuf::from(default_clip_name(
                &request.search.query,
                window.start,
                &self.default_extension,
            ))
        });

        let clip_path = self
            .download_clip(&request.search.video, &window, &output_path, request.format.clone())
            .await
            .map_err(|e| ClipperError::ClipFailed(format!("{:#}", e)))?;

        let subtitle_path = if request.write_srt {
            output::status("Writing subtitle file...");
            let path = clip_path.with_extension("srt");
            if output::write_clip_subtitles(&found.transcript, &window, &path)? {
                Some(path)
            } else {
                output::status("No subtitle lines fall inside this clip.");
                None
            }
        } else {
            None
        };

        let document_path = match (&request.save_subtitles, &found.document) {
            (Some(path), Some(document)) => {
                output::save_document(&document.raw, path)?;
                Some(path.clone())
            }
            (Some(_), None) => {
                tracing::warn!("Transcript came from speech-to-text; no subtitle document to save");
                None
            }
            _ => None,
        };

        output::status("Done.");
        Ok(ClipOutcome {
            result: found.result,
            clip_path,
            subtitle_path,
            document_path,
        })
    }

    async fn load_transcript(
        &self,
        request: &SearchRequest,
    ) -> Result<(Transcript, Option<SubtitleDocument>)> {
        let source = TranscriptSource::new(self.downloader);
        let fetched = source
            .fetch_document(&request.video, &request.language, request.prefer_manual)
            .await;

        match fetched {
            Ok(document) => Ok((document.transcript.clone(), Some(document))),
            Err(e)
                if request.stt_fallback
                    && matches!(
                        e.downcast_ref::<ClipperError>(),
                        Some(ClipperError::NoTranscriptAvailable { .. })
                    ) =>
            {
                tracing::warn!("{}; falling back to speech-to-text", e);
                let transcript = self.transcribe_audio(request).await?;
                Ok((transcript, None))
            }
            Err(e) => Err(e),
        }
    }

    async fn transcribe_audio(&self, request: &SearchRequest) -> Result<Transcript> {
        let provider = self.providers.get(&request.stt_provider)?;
        let audio_path = self
            .temp_dir
            .path()
            .join(format!("audio_{}.mp3", &Uuid::new_v4().simple().to_string()[..8]));

        let progress = spinner("Downloading audio for transcription...");
        self.downloader
            .download_audio(&request.video, &audio_path)
            .await
            .map_err(|e| ClipperError::TranscriptionFailed(format!("audio download failed: {:#}", e)))?;
        progress.finish_with_message("Audio downloaded");

        TranscriptSource::transcribe(&audio_path, &request.language, &request.stt_provider, provider.as_ref())
            .await
    }

    /// Download `window` of the video to `output`, trimming locally when needed
    async fn download_clip(
        &self,
        video: &VideoRef,
        window: &ClipWindow,
        output: &Path,
        format: Option<String>,
    ) -> Result<PathBuf> {
        if window.duration() <= 0.0 {
            anyhow::bail!("Clip end must be after clip start");
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }
        if output.exists() {
            fs_err::remove_file(output)?;
        }

        let extension = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&self.default_extension)
            .to_string();
        let base = output.with_extension("");

        let progress = spinner("Downloading clipped video segment with yt-dlp...");
        let section = self
            .downloader
            .download_section(video, window, &base, &extension, format.clone())
            .await;
        progress.finish_and_clear();

        match section {
            Ok(path) => {
                let path = move_into_place(path, output)?;
                match assess_download(&path, window).await {
                    Assessment::Complete => Ok(path),
                    Assessment::NeedsTrim => {
                        output::status("Trimming downloaded file with ffmpeg...");
                        local::trim(&path, window, output, self.verbose).await
                    }
                }
            }
            Err(e) => {
                output::status(format!(
                    "Section download failed ({:#}); falling back to full video download...",
                    e
                ));
                let full_base = PathBuf::from(format!("{}_full", base.display()));

                let progress = spinner("Downloading full video (this may take longer)...");
                let full = self
                    .downloader
                    .download_full(video, &full_base, &extension, format)
                    .await?;
                progress.finish_and_clear();

                output::status("Trimming downloaded file with ffmpeg...");
                let trimmed = local::trim(&full, window, output, self.verbose).await;
                if full != output {
                    if let Err(e) = fs_err::remove_file(&full) {
                        tracing::debug!("Could not remove {}: {}", full.display(), e);
                    }
                }
                trimmed
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Assessment {
    Complete,
    NeedsTrim,
}

/// Accept a section download whose length is close to the requested window
async fn assess_download(path: &Path, window: &ClipWindow) -> Assessment {
    let requested = window.duration();
    match local::probe_duration(path).await {
        None => {
            tracing::warn!("Clip duration is unknown (is ffprobe installed?); keeping download as-is");
            Assessment::Complete
        }
        Some(actual) => assess_duration(actual, requested),
    }
}

fn assess_duration(actual: f64, requested: f64) -> Assessment {
    let tolerance = (requested * 0.1).max(1.0);
    if (actual - requested).abs() <= tolerance {
        output::status(format!(
            "Downloaded ≈{:.2}s clip (target {:.2}s).",
            actual, requested
        ));
        Assessment::Complete
    } else {
        output::status(format!(
            "Downloaded {:.2}s file (target {:.2}s); will trim locally.",
            actual, requested
        ));
        Assessment::NeedsTrim
    }
}

fn move_into_place(produced: PathBuf, output: &Path) -> Result<PathBuf> {
    if produced == output {
        return Ok(produced);
    }
    fs_err::rename(&produced, output)
        .with_context(|| format!("Failed to rename output to {}", output.display()))?;
    Ok(output.to_path_buf())
}

fn spinner(message: &'static str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}
