use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_transcribe::types::{LanguageCode, Media, MediaFormat};
use aws_sdk_transcribe::Client as TranscribeClient;
use std::path::Path;
use uuid::Uuid;

use super::processor::TranscriptionProcessor;
use super::SttProvider;
use crate::config::AwsConfig;
use crate::transcript::Segment;

/// Speech-to-text through AWS Transcribe, staging audio in S3
pub struct AwsTranscribeProvider {
    settings: AwsConfig,
    max_segment_length: f64,
}

struct AwsClients {
    s3: S3Client,
    transcribe: TranscribeClient,
}

impl AwsTranscribeProvider {
    pub const NAME: &'static str = "aws-transcribe";

    pub fn new(settings: AwsConfig, max_segment_length: f64) -> Self {
        Self {
            settings,
            max_segment_length,
        }
    }

    async fn clients(&self) -> AwsClients {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(self.settings.region())
            .load()
            .await;

        AwsClients {
            s3: S3Client::new(&aws_config),
            transcribe: TranscribeClient::new(&aws_config),
        }
    }

    fn object_key(&self, audio: &Path) -> String {
        let extension = audio
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp3");
        format!(
            "{}audio_{}_{}.{}",
            self.settings.s3_key_prefix.as_deref().unwrap_or(""),
            Uuid::new_v4(),
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            extension
        )
    }

    async fn upload(&self, clients: &AwsClients, audio: &Path) -> Result<String> {
        let key = self.object_key(audio);
        tracing::info!("Uploading audio to S3: s3://{}/{}", self.settings.s3_bucket, key);

        let content = fs_err::read(audio)?;
        clients
            .s3
            .put_object()
            .bucket(&self.settings.s3_bucket)
            .key(&key)
            .body(content.into())
            .content_type(mime_type(audio))
            .send()
            .await
            .context("Failed to upload audio to S3")?;

        Ok(key)
    }

    async fn start_job(
        &self,
        clients: &AwsClients,
        s3_key: &str,
        audio: &Path,
        language: &str,
    ) -> Result<String> {
        let job_name = format!("clipper_{}", Uuid::new_v4());
        let media_uri = format!("s3://{}/{}", self.settings.s3_bucket, s3_key);
        let language_code = transcribe_language(language);

        tracing::info!("Starting transcription job {} ({})", job_name, language_code.as_str());

        clients
            .transcribe
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .media_format(media_format(audio))
            .media(Media::builder().media_file_uri(media_uri).build())
            .language_code(language_code)
            .send()
            .await
            .context("Failed to start transcription job")?;

        Ok(job_name)
    }

    async fn cleanup(&self, clients: &AwsClients, s3_key: &str) {
        tracing::debug!("Cleaning up S3 object: {}", s3_key);

        let result = clients
            .s3
            .delete_object()
            .bucket(&self.settings.s3_bucket)
            .key(s3_key)
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!("Failed to clean up s3://{}/{}: {}", self.settings.s3_bucket, s3_key, e);
        }
    }
}

#[async_trait]
impl SttProvider for AwsTranscribeProvider {
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Vec<Segment>> {
        if self.settings.s3_bucket.is_empty() {
            anyhow::bail!("AWS S3 bucket must be configured (aws.s3_bucket) to use '{}'", Self::NAME);
        }

        let clients = self.clients().await;
        let key = self.upload(&clients, audio).await?;

        let result = match self.start_job(&clients, &key, audio, language).await {
            Ok(job_id) => {
                TranscriptionProcessor::new(
                    clients.transcribe.clone(),
                    job_id,
                    self.max_segment_length,
                )
                .wait_for_completion()
                .await
            }
            Err(e) => Err(e),
        };

        self.cleanup(&clients, &key).await;
        result
    }

    fn description(&self) -> &'static str {
        "AWS Transcribe (audio staged in the configured S3 bucket)"
    }
}

/// Map a subtitle language (`en`, `pt.orig`, `de-DE`) to a Transcribe locale
fn transcribe_language(language: &str) -> LanguageCode {
    let base = language
        .trim_end_matches(".orig")
        .trim_end_matches("-orig")
        .to_lowercase();
    let locale = match base.as_str() {
        "en" => "en-US",
        "es" => "es-ES",
        "fr" => "fr-FR",
        "de" => "de-DE",
        "it" => "it-IT",
        "pt" => "pt-BR",
        "ja" => "ja-JP",
        "ko" => "ko-KR",
        "zh" | "zh-hans" => "zh-CN",
        "ar" => "ar-SA",
        "hi" => "hi-IN",
        "ru" => "ru-RU",
        "nl" => "nl-NL",
        // Region-qualified codes are passed through in AWS casing
        other => {
            if let Some((lang, region)) = other.split_once('-') {
                let qualified = format!("{}-{}", lang, region.to_uppercase());
                return LanguageCode::from(qualified.as_str());
            }
            other
        }
    };
    LanguageCode::from(locale)
}

fn extension_of(audio: &Path) -> String {
    audio
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

fn media_format(audio: &Path) -> MediaFormat {
    match extension_of(audio).as_str() {
        "m4a" | "mp4" | "aac" => MediaFormat::Mp4,
        "wav" => MediaFormat::Wav,
        "flac" => MediaFormat::Flac,
        "ogg" => MediaFormat::Ogg,
        "webm" => MediaFormat::Webm,
        _ => MediaFormat::Mp3,
    }
}

fn mime_type(audio: &Path) -> &'static str {
    match extension_of(audio).as_str() {
        "m4a" | "mp4" | "aac" => "audio/mp4",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        _ => "audio/mpeg",
    }
}
