use anyhow::{Context, Result};
use aws_sdk_transcribe::types::{TranscriptionJob, TranscriptionJobStatus};
use aws_sdk_transcribe::Client as TranscribeClient;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

use crate::transcript::Segment;

/// Pause longer than this between words starts a new segment
const MAX_WORD_GAP_SECONDS: f64 = 1.0;

/// AWS Transcribe transcript format
#[derive(Debug, Deserialize)]
struct AwsTranscript {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    items: Vec<TranscriptItem>,
}

#[derive(Debug, Deserialize)]
struct TranscriptItem {
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(rename = "type")]
    item_type: String,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    content: String,
}

/// Polls an AWS Transcribe job and turns its result into segments
pub struct TranscriptionProcessor {
    client: TranscribeClient,
    job_id: String,
    max_segment_length: f64,
}

impl TranscriptionProcessor {
    pub fn new(client: TranscribeClient, job_id: String, max_segment_length: f64) -> Self {
        Self { client, job_id, max_segment_length }
    }

    /// Wait for the job to finish and return its segments
    pub async fn wait_for_completion(&self) -> Result<Vec<Segment>> {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress.set_message("Starting transcription job...");

        let start_time = std::time::Instant::now();
        let mut check_count = 0u64;

        let job = loop {
            check_count += 1;
            let job = self.get_transcription_job().await?;

            match job.transcription_job_status() {
                Some(TranscriptionJobStatus::InProgress) | Some(TranscriptionJobStatus::Queued) => {
                    progress.set_message(format!(
                        "Transcribing... ({}s elapsed, check #{})",
                        start_time.elapsed().as_secs(),
                        check_count
                    ));

                    // Back off up to 30 seconds between checks
                    let wait_time = std::cmp::min(5 + (check_count - 1) * 2, 30);
                    sleep(Duration::from_secs(wait_time)).await;
                }
                Some(TranscriptionJobStatus::Completed) => {
                    progress.finish_with_message("Transcription completed!");
                    break job;
                }
                Some(TranscriptionJobStatus::Failed) => {
                    progress.finish_with_message("Transcription failed");
                    let failure_reason = job.failure_reason().unwrap_or("Unknown error");
                    anyhow::bail!("Transcription job failed: {}", failure_reason);
                }
                _ => {
                    progress.finish_with_message("Transcription status unknown");
                    anyhow::bail!("Unexpected transcription job status");
                }
            }
        };

        tracing::info!(
            "Transcription job {} finished in {:.1}s",
            self.job_id,
            start_time.elapsed().as_secs_f64()
        );

        let transcript_uri = job
            .transcript()
            .and_then(|t| t.transcript_file_uri())
            .ok_or_else(|| anyhow::anyhow!("No transcript URI found"))?;

        let transcript_json = download_transcript(transcript_uri).await?;
        parse_transcript(&transcript_json, self.max_segment_length)
    }

    async fn get_transcription_job(&self) -> Result<TranscriptionJob> {
        let response = self
            .client
            .get_transcription_job()
            .transcription_job_name(&self.job_id)
            .send()
            .await
            .context("Failed to get transcription job status")?;

        response
            .transcription_job()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Transcription job not found"))
    }
}

async fn download_transcript(uri: &str) -> Result<String> {
    let response = reqwest::get(uri)
        .await
        .context("Failed to download transcript")?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to download transcript: HTTP {}", response.status());
    }

    response
        .text()
        .await
        .context("Failed to read transcript content")
}

/// Group AWS word items into segments.
///
/// A new segment starts after a pause, when the current one grows past
/// `max_segment_length`, or at a sentence end once it is half that long.
pub fn parse_transcript(json: &str, max_segment_length: f64) -> Result<Vec<Segment>> {
    let transcript: AwsTranscript =
        serde_json::from_str(json).context("Failed to parse transcript JSON")?;

    let mut segments = Vec::new();
    let mut current: Option<Segment> = None;
    let mut ends_sentence = false;

    for item in &transcript.results.items {
        let Some(content) = item.alternatives.first().map(|alt| alt.content.as_str()) else {
            continue;
        };

        if item.item_type == "punctuation" {
            if let Some(segment) = current.as_mut() {
                segment.text.push_str(content);
            }
            ends_sentence = matches!(content, "." | "!" | "?");
            continue;
        }
        if item.item_type != "pronunciation" {
            continue;
        }

        let parse = |value: &Option<String>| value.as_deref().and_then(|s| s.parse::<f64>().ok());
        let (Some(start), Some(end)) = (parse(&item.start_time), parse(&item.end_time)) else {
            continue;
        };

        let split = current.as_ref().map_or(false, |segment| {
            let gap = start - segment.end_time > MAX_WORD_GAP_SECONDS;
            let too_long = start - segment.start_time > max_segment_length;
            let natural_break =
                ends_sentence && start - segment.start_time > max_segment_length / 2.0;
            gap || too_long || natural_break
        });
        ends_sentence = false;

        if split {
            segments.extend(current.take());
        }

        match current.as_mut() {
            Some(segment) => {
                segment.text.push(' ');
                segment.text.push_str(content);
                segment.end_time = end;
            }
            None => current = Some(Segment::new(start, end, content)),
        }
    }

    segments.extend(current);
    Ok(segments)
}
