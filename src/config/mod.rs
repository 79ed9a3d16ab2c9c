use anyhow::{Context, Result};
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::matcher::{
    MatchOptions, DEFAULT_AFTER_SECONDS, DEFAULT_BEFORE_SECONDS, DEFAULT_MAX_WINDOW,
    DEFAULT_MIN_SCORE,
};

const LOCAL_CONFIG_FILE: &str = "clipper.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcript search settings
    pub matching: MatchingConfig,

    /// Subtitle track selection
    pub subtitles: SubtitleConfig,

    /// Speech-to-text fallback
    pub stt: SttConfig,

    /// AWS configuration for the `aws-transcribe` provider
    pub aws: AwsConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Seconds to include before the matched line
    pub before: f64,

    /// Seconds to include after the matched line
    pub after: f64,

    /// Minimum similarity score in [0, 1]
    pub min_score: f64,

    /// Maximum number of consecutive subtitle lines joined when searching
    pub max_window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Subtitle language code
    pub language: String,

    /// Prefer human-authored subtitles over automatic captions
    pub prefer_manual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Transcribe the audio when the video has no subtitles
    pub fallback: bool,

    /// Registered provider name
    pub provider: String,

    /// Maximum segment length in seconds for providers that group words
    pub max_segment_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// S3 bucket for temporary audio storage
    pub s3_bucket: String,

    /// Optional S3 key prefix
    pub s3_key_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Temporary directory for downloads
    pub temp_dir: Option<PathBuf>,

    /// Container used for clips when no output path is given
    pub default_extension: String,

    /// Write an SRT file next to each clip
    pub write_srt: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            before: DEFAULT_BEFORE_SECONDS,
            after: DEFAULT_AFTER_SECONDS,
            min_score: DEFAULT_MIN_SCORE,
            max_window: DEFAULT_MAX_WINDOW,
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            prefer_manual: true,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            fallback: false,
            provider: "stub".to_string(),
            max_segment_length: 10.0,
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            s3_bucket: "".to_string(),
            s3_key_prefix: Some("clipper/".to_string()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            temp_dir: None,
            default_extension: "mp4".to_string(),
            write_srt: true,
        }
    }
}

impl AwsConfig {
    pub fn region(&self) -> Region {
        Region::new(self.region.clone())
    }
}

impl MatchingConfig {
    pub fn options(&self) -> MatchOptions {
        MatchOptions {
            before: self.before,
            after: self.after,
            min_score: self.min_score,
            max_window: self.max_window,
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, the usual locations, or create a default file
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let config = Self::load_from(&config_path)?;
            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            let config = Self::default();
            if let Err(e) = config.save_to(&config_path) {
                tracing::warn!("Could not write default config to {}: {:#}", config_path.display(), e);
            }
            Ok(config)
        }
    }

    /// Parse and validate a config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("quote-clipper").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.matching
            .options()
            .validate()
            .context("Invalid [matching] configuration")?;

        if self.subtitles.language.trim().is_empty() {
            anyhow::bail!("subtitles.language must not be empty");
        }

        if !(self.stt.max_segment_length > 0.0) {
            anyhow::bail!("stt.max_segment_length must be positive");
        }

        if self.app.default_extension.trim().is_empty() {
            anyhow::bail!("app.default_extension must not be empty");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Padding: {}s before, {}s after", self.matching.before, self.matching.after);
        println!("  Min Score: {}", self.matching.min_score);
        println!("  Max Window: {}", self.matching.max_window);
        println!(
            "  Subtitles: {} ({})",
            self.subtitles.language,
            if self.subtitles.prefer_manual { "prefer manual" } else { "prefer automatic" }
        );
        println!(
            "  STT Fallback: {} (provider: {})",
            if self.stt.fallback { "on" } else { "off" },
            self.stt.provider
        );
        println!("  AWS Region: {}", self.aws.region);
        if !self.aws.s3_bucket.is_empty() {
            println!("  S3 Bucket: {}", self.aws.s3_bucket);
        }
        println!("  yt-dlp: {}", self.app.yt_dlp_path);
        println!("  SRT Sidecar: {}", self.app.write_srt);
    }
}
