//! Local media operations through `ffprobe` and `ffmpeg`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::matcher::ClipWindow;

/// Media duration in seconds, or `None` when ffprobe is missing or cannot tell
pub async fn probe_duration(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .next()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Cut `window` out of `source` into `output` without re-encoding.
///
/// Writes to `<output>.tmp` first so a failed run never leaves a truncated clip behind.
pub async fn trim(source: &Path, window: &ClipWindow, output: &Path, verbose: bool) -> Result<PathBuf> {
    let duration = window.duration();
    if duration <= 0.0 {
        anyhow::bail!("Clip end must be after clip start");
    }

    let temp_output = temp_path_for(output);
    if temp_output.exists() {
        fs_err::remove_file(&temp_output)?;
    }

    tracing::debug!(
        "Trimming {} [{:.3}s, +{:.3}s] -> {}",
        source.display(),
        window.start,
        duration,
        output.display()
    );

    let mut command = Command::new("ffmpeg");
    command
        .arg("-y")
        .args(["-ss", &format!("{:.3}", window.start)])
        .arg("-i")
        .arg(source)
        .args(["-t", &format!("{:.3}", duration)])
        .args(["-c", "copy"]);
    // ffmpeg cannot guess the container from a `.tmp` suffix
    if let Some(container) = muxer_for(output) {
        command.args(["-f", container]);
    }
    command.arg(&temp_output);

    if verbose {
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        command.stdout(Stdio::null()).stderr(Stdio::piped());
    }

    let result = command
        .output()
        .await
        .context("ffmpeg is required to trim the clip but was not found on PATH")?;

    if !result.status.success() {
        let _ = fs_err::remove_file(&temp_output);
        let error = String::from_utf8_lossy(&result.stderr);
        anyhow::bail!("ffmpeg failed to trim the clip ({}): {}", result.status, error.trim());
    }

    if output.exists() {
        fs_err::remove_file(output)?;
    }
    fs_err::rename(&temp_output, output).context("Failed to finalize trimmed clip")?;

    Ok(output.to_path_buf())
}

fn temp_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn muxer_for(output: &Path) -> Option<&'static str> {
    match output.extension()?.to_str()?.to_lowercase().as_str() {
        "mp4" | "m4v" => Some("mp4"),
        "mkv" => Some("matroska"),
        "webm" => Some("webm"),
        "mov" => Some("mov"),
        "mp3" => Some("mp3"),
        "m4a" => Some("ipod"),
        _ => None,
    }
}
