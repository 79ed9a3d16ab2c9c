use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "clipper",
    about = "Quote Clipper - Find a spoken line in a YouTube video's subtitles and clip it",
    version,
    long_about = "Searches a video's subtitle track for a line using fuzzy matching and downloads just the matching part of the video with yt-dlp. Videos without subtitles can be transcribed with a speech-to-text provider."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging and show yt-dlp/ffmpeg output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./clipper.yaml or the user config directory)
    #[arg(long, global = true, value_name = "FILE", env = "CLIPPER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find a line in the transcript and download the matching clip
    Clip {
        #[command(flatten)]
        search: SearchArgs,

        /// Destination file for the clip (default: generated from the query)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// yt-dlp format selector for the clip (e.g. 'bestvideo+bestaudio/best')
        #[arg(short, long, value_name = "FORMAT")]
        format: Option<String>,

        /// Do not write an SRT file next to the clip
        #[arg(long)]
        no_srt: bool,

        /// Also save the downloaded subtitle document unchanged to this file
        #[arg(long, value_name = "FILE")]
        save_subtitles: Option<PathBuf>,
    },

    /// Find a line in the transcript and report the match without downloading
    Find {
        #[command(flatten)]
        search: SearchArgs,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        report: ReportFormat,
    },

    /// List registered speech-to-text providers
    Providers,

    /// Show or create the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Options shared by `clip` and `find`
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// YouTube video URL or ID
    #[arg(value_name = "URL_OR_ID")]
    pub url: String,

    /// Line or phrase to match within the transcript
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Seconds to include before the matched line
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub before: Option<f64>,

    /// Seconds to include after the matched line
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub after: Option<f64>,

    /// Subtitle language code
    #[arg(short, long, value_name = "LANG")]
    pub lang: Option<String>,

    /// Maximum number of consecutive subtitle lines to join when searching
    #[arg(long, value_name = "COUNT")]
    pub max_window: Option<usize>,

    /// Minimum similarity score (0-1) required to accept a match
    #[arg(long, value_name = "SCORE")]
    pub min_score: Option<f64>,

    /// Prefer automatically generated captions over human-authored subtitles
    #[arg(long)]
    pub prefer_auto: bool,

    /// Transcribe the audio when the video has no subtitles
    #[arg(long)]
    pub stt_fallback: bool,

    /// Speech-to-text provider used by the fallback (see `clipper providers`)
    #[arg(long, value_name = "NAME")]
    pub stt_provider: Option<String>,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum ReportFormat {
    /// Human-readable summary
    Text,
    /// JSON object
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_clip_arguments() {
        let cli = Cli::try_parse_from([
            "clipper",
            "clip",
            "dQw4w9WgXcQ",
            "never gonna give you up",
            "--before",
            "3",
            "--after=7.5",
            "--format",
            "bestaudio/best",
            "--stt-fallback",
        ])
        .unwrap();

        match cli.command {
            Commands::Clip { search, format, no_srt, .. } => {
                assert_eq!(search.query, "never gonna give you up");
                assert_eq!(search.before, Some(3.0));
                assert_eq!(search.after, Some(7.5));
                assert!(search.stt_fallback);
                assert_eq!(format.as_deref(), Some("bestaudio/best"));
                assert!(!no_srt);
            }
            _ => panic!("expected clip command"),
        }
    }

    #[test]
    fn test_negative_padding_parses_for_validation() {
        let cli = Cli::try_parse_from(["clipper", "find", "dQw4w9WgXcQ", "hi", "--before", "-2"]).unwrap();
        match cli.command {
            Commands::Find { search, .. } => assert_eq!(search.before, Some(-2.0)),
            _ => panic!("expected find command"),
        }
    }
}
