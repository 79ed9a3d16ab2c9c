use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{MediaDownloader, SubtitleTrack, VideoRef};
use crate::matcher::ClipWindow;
use crate::utils::format_timestamp;
use crate::Result;

/// `yt-dlp` backed downloader
pub struct YtDlp {
    yt_dlp_path: String,
    verbose: bool,
    http: reqwest::Client,
}

impl YtDlp {
    pub fn new(yt_dlp_path: impl Into<String>, verbose: bool) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            verbose,
            http: reqwest::Client::new(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Run yt-dlp, streaming its output to the terminal in verbose mode
    async fn run(&self, args: &[String]) -> Result<()> {
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let mut command = Command::new(&self.yt_dlp_path);
        command.args(args);

        if self.verbose {
            let status = command.status().await?;
            if !status.success() {
                anyhow::bail!("yt-dlp exited with {}", status);
            }
            return Ok(());
        }

        let output = command
            .arg("--quiet")
            .arg("--no-warnings")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        Ok(())
    }

    /// Arguments shared by every video download
    fn download_args(
        &self,
        output_base: &Path,
        extension: &str,
        format: Option<&str>,
    ) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--merge-output-format".to_string(),
            extension.to_string(),
            "--output".to_string(),
            format!("{}.%(ext)s", output_base.display()),
        ];
        if let Some(format) = format {
            args.push("--format".to_string());
            args.push(format.to_string());
        }
        args
    }
}

#[async_trait]
impl MediaDownloader for YtDlp {
    async fn video_info(&self, video: &VideoRef) -> Result<Value> {
        tracing::debug!("Extracting video info for: {}", video);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", "--skip-download"])
            .arg(video.watch_url())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Could not run {} ({}). Please install it: https://github.com/yt-dlp/yt-dlp",
                    self.yt_dlp_path,
                    e
                )
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let info: Value = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }

    async fn fetch_subtitle(&self, track: &SubtitleTrack) -> Result<String> {
        tracing::debug!("Downloading {} subtitles ({})", track.language, track.extension);

        let response = self.http.get(&track.url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to download subtitles: HTTP {}", response.status());
        }

        Ok(response.text().await?)
    }

    async fn download_audio(&self, video: &VideoRef, output_path: &Path) -> Result<()> {
        tracing::debug!("Downloading audio for: {}", video);

        let args: Vec<String> = vec![
            "--output".to_string(),
            output_path.to_string_lossy().into_owned(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            // Lowest quality is plenty for speech recognition
            "--audio-quality".to_string(),
            "9".to_string(),
            "--format".to_string(),
            "worstaudio[acodec^=mp4a]/worstaudio[ext=m4a]/worstaudio[ext=mp3]/worstaudio".to_string(),
            "--no-playlist".to_string(),
            "--concurrent-fragments".to_string(),
            "4".to_string(),
            video.watch_url(),
        ];

        self.run(&args).await
    }

    async fn download_section(
        &self,
        video: &VideoRef,
        window: &ClipWindow,
        output_base: &Path,
        extension: &str,
        format: Option<String>,
    ) -> Result<PathBuf> {
        let mut args = self.download_args(output_base, extension, format.as_deref());
        args.extend([
            "--download-sections".to_string(),
            format!(
                "*{}-{}",
                format_timestamp(window.start),
                format_timestamp(window.end)
            ),
            "--force-keyframes-at-cuts".to_string(),
            video.watch_url(),
        ]);

        self.run(&args).await?;
        produced_file(output_base, extension)
    }

    async fn download_full(
        &self,
        video: &VideoRef,
        output_base: &Path,
        extension: &str,
        format: Option<String>,
    ) -> Result<PathBuf> {
        let mut args = self.download_args(output_base, extension, format.as_deref());
        args.push(video.watch_url());

        self.run(&args).await?;
        produced_file(output_base, extension)
    }
}

/// File yt-dlp wrote for an `<base>.%(ext)s` template
fn produced_file(output_base: &Path, extension: &str) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{}.{}", output_base.display(), extension));
    if !path.exists() {
        anyhow::bail!("yt-dlp finished but {} was not created", path.display());
    }
    Ok(path)
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp", false)
    }
}
