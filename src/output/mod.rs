use anyhow::Result;
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::ReportFormat;
use crate::matcher::{ClipWindow, MatchResult};
use crate::transcript::{Segment, Transcript};
use crate::utils::{format_duration, format_srt_timestamp, format_timestamp};

/// Print a progress line for the user
pub fn status(message: impl std::fmt::Display) {
    eprintln!("{} {}", style("[clipper]").cyan().bold(), message);
}

/// Render the segments overlapping `window` as SRT, with times relative to the clip start.
///
/// Returns `None` when no segment falls inside the window.
pub fn render_srt(segments: &[Segment], window: &ClipWindow) -> Option<String> {
    let mut out = String::new();
    let mut counter = 0usize;

    for segment in segments.iter().filter(|s| window.overlaps(s)) {
        let start = segment.start_time.max(window.start) - window.start;
        let end = segment.end_time.min(window.end) - window.start;
        if end <= start {
            continue;
        }
        let text = segment.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }

        counter += 1;
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            counter,
            format_srt_timestamp(start),
            format_srt_timestamp(end),
            text
        ));
    }

    (counter > 0).then_some(out)
}

/// Write the clip's SRT sidecar; returns whether anything was written
pub fn write_clip_subtitles(
    transcript: &Transcript,
    window: &ClipWindow,
    destination: &Path,
) -> Result<bool> {
    match render_srt(transcript.segments(), window) {
        Some(content) => {
            fs_err::write(destination, content)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Save a subtitle document exactly as it was downloaded
pub fn save_document(raw: &str, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(destination, raw)?;
    Ok(())
}

/// What `clipper find` reports about a match
#[derive(Debug, Serialize)]
pub struct MatchReport<'a> {
    pub video_id: &'a str,
    pub source: String,
    pub query: &'a str,
    #[serde(flatten)]
    pub result: &'a MatchResult,
}

pub fn print_match(report: &MatchReport<'_>, format: &ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Text => {
            let result = report.result;
            println!("Matched transcript snippet:");
            println!("  {}", result.text);
            println!("Match score         : {:.3}", result.score);
            println!("Transcript source   : {}", report.source);
            println!(
                "Transcript time span: {} - {}",
                format_timestamp(result.start_time),
                format_timestamp(result.end_time)
            );
            println!(
                "Clip time span      : {} - {}",
                format_timestamp(result.window.start),
                format_timestamp(result.window.end)
            );
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }
    Ok(())
}

/// Final summary after a clip was produced
pub fn print_clip_summary(result: &MatchResult, clip: &Path, subtitles: Option<&PathBuf>) {
    let absolute = |p: &Path| fs_err::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());

    println!("Matched transcript snippet:");
    println!("  {}", result.text);
    println!("Match score         : {:.3}", result.score);
    println!(
        "Transcript time span: {} - {}",
        format_timestamp(result.start_time),
        format_timestamp(result.end_time)
    );
    println!(
        "Clip time span      : {} - {}",
        format_timestamp(result.window.start),
        format_timestamp(result.window.end)
    );
    println!("Clip length         : {}", format_duration(result.window.duration()));
    println!("Clip saved to       : {}", absolute(clip).display());
    if let Some(subtitles) = subtitles {
        println!("Subtitles saved to  : {}", absolute(subtitles).display());
    }
}
