use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quote_clipper::cli::SearchArgs;
use quote_clipper::clip::SearchRequest;
use quote_clipper::extractors::YtDlp;
use quote_clipper::output::{self, MatchReport};
use quote_clipper::{
    exit_code_for, utils, Cli, ClipPipeline, ClipRequest, Commands, Config, MatchOptions,
    ProviderRegistry, VideoRef,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "quote_clipper=debug,clipper=debug"
    } else {
        "quote_clipper=info,clipper=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let providers = ProviderRegistry::with_defaults(&config);

    match cli.command {
        Commands::Clip {
            search,
            output,
            format,
            no_srt,
            save_subtitles,
        } => {
            let search = search_request(&search, &config)?;
            let downloader = YtDlp::new(&config.app.yt_dlp_path, cli.verbose);
            warn_missing_dependencies(&downloader, &config, true).await;

            let pipeline = ClipPipeline::new(
                &downloader,
                &providers,
                config.app.temp_dir.as_deref(),
                &config.app.default_extension,
                cli.verbose,
            )?;

            tracing::info!("Clipping '{}' from {}", search.query, search.video);

            let outcome = pipeline
                .run(&ClipRequest {
                    search,
                    output,
                    format,
                    write_srt: config.app.write_srt && !no_srt,
                    save_subtitles,
                })
                .await?;

            output::print_clip_summary(
                &outcome.result,
                &outcome.clip_path,
                outcome.subtitle_path.as_ref(),
            );
            if let Some(path) = outcome.document_path {
                println!("Subtitle document   : {}", path.display());
            }
        }
        Commands::Find { search, report } => {
            let search = search_request(&search, &config)?;
            let downloader = YtDlp::new(&config.app.yt_dlp_path, cli.verbose);
            warn_missing_dependencies(&downloader, &config, false).await;

            let pipeline = ClipPipeline::new(
                &downloader,
                &providers,
                config.app.temp_dir.as_deref(),
                &config.app.default_extension,
                cli.verbose,
            )?;

            let found = pipeline.search(&search).await?;
            output::print_match(
                &MatchReport {
                    video_id: search.video.id(),
                    source: found.transcript.origin.to_string(),
                    query: &search.query,
                    result: &found.result,
                },
                &report,
            )?;
        }
        Commands::Providers => {
            println!("Speech-to-text providers:");
            for (name, description) in providers.describe() {
                let marker = if name == config.stt.provider { " (default)" } else { "" };
                println!("  • {}{} - {}", name, marker, description);
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                println!("Configuration file: {}", path.display());
                println!("Edit it to change defaults, or run `clipper config --show`.");
            }
        }
    }

    Ok(())
}

/// Merge command-line overrides into the configured defaults
fn search_request(args: &SearchArgs, config: &Config) -> Result<SearchRequest> {
    let defaults = config.matching.options();
    let options = MatchOptions {
        before: args.before.unwrap_or(defaults.before),
        after: args.after.unwrap_or(defaults.after),
        min_score: args.min_score.unwrap_or(defaults.min_score),
        max_window: args.max_window.unwrap_or(defaults.max_window),
    };
    options.validate()?;

    Ok(SearchRequest {
        video: VideoRef::parse(&args.url)?,
        query: args.query.clone(),
        options,
        language: args
            .lang
            .clone()
            .unwrap_or_else(|| config.subtitles.language.clone()),
        prefer_manual: config.subtitles.prefer_manual && !args.prefer_auto,
        stt_fallback: config.stt.fallback || args.stt_fallback,
        stt_provider: args
            .stt_provider
            .clone()
            .unwrap_or_else(|| config.stt.provider.clone()),
    })
}

/// `clipping` adds the ffmpeg tools needed to cut and measure clips
async fn warn_missing_dependencies(downloader: &YtDlp, config: &Config, clipping: bool) {
    let mut missing = Vec::new();
    if !downloader.check_availability().await {
        missing.push(format!(
            "{} - required for subtitles and downloads",
            config.app.yt_dlp_path
        ));
    }
    if clipping {
        missing.extend(utils::check_dependencies().await);
    }

    if !missing.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing {
            eprintln!("   • {}", dep);
        }
    }
}
