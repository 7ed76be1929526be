use anyhow::Result;
use clap::Parser;
use console::style;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubeframes::cli::{Cli, Commands, MethodArg};
use tubeframes::config::Config;
use tubeframes::{output, resolve_video_id, utils};
use tubeframes::{FrameMethod, FrameOutput, FramesRequest, Pipeline, TranscriptRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = match (&cli.command, cli.config.as_deref()) {
        // `config --init` may target a file that does not exist yet
        (Commands::Config { init: true, .. }, Some(path)) if !path.exists() => Config::default(),
        (_, explicit) => Config::load(explicit)?,
    };
    let show_progress = !cli.quiet;

    match cli.command {
        Commands::Transcript {
            url,
            id,
            languages,
            translate_to,
            remote_api,
            stt,
            output,
            format,
            timestamps,
        } => {
            let video_id = resolve_video_id(url.as_deref(), id.as_deref())?;
            warn_missing_tools(&config).await;

            let pipeline = Pipeline::new(config, show_progress)?;
            let request = TranscriptRequest {
                url,
                video_id: Some(video_id.to_string()),
                languages,
                translate_to,
                allow_remote_api: remote_api,
                allow_stt_fallback: stt,
            };

            let transcript = pipeline.resolve_transcript(&request).await?;
            tracing::info!(
                "Transcript from {} in {} with {} segments",
                transcript.source(),
                transcript.language(),
                transcript.segments().len()
            );

            let content = output::render_transcript(&transcript, &format, timestamps)?;
            match output {
                Some(path) => {
                    output::save_to_file(&content, &path)?;
                    eprintln!("{} {}", style("Transcript saved to:").green(), path.display());
                }
                None => output::print_to_console(&content),
            }
        }
        Commands::Frames {
            url,
            id,
            method,
            interval,
            threshold,
            max_frames,
            zip,
            out_dir,
            format,
            output,
        } => {
            let video_id = resolve_video_id(url.as_deref(), id.as_deref())?;
            warn_missing_tools(&config).await;

            let method = match method {
                MethodArg::Interval => FrameMethod::Interval {
                    interval_seconds: interval.unwrap_or(config.frames.default_interval),
                },
                MethodArg::Scenedetect => FrameMethod::SceneDetect {
                    threshold: threshold.unwrap_or(config.frames.content_threshold),
                },
            };
            let frame_output = match (zip, out_dir) {
                (Some(path), _) => FrameOutput::Archive(
                    path.unwrap_or_else(|| PathBuf::from(utils::generate_unique_filename(video_id.as_str(), "zip"))),
                ),
                (None, Some(dir)) => FrameOutput::Directory(dir),
                (None, None) => FrameOutput::Metadata,
            };
            let request = FramesRequest {
                url,
                video_id: Some(video_id.to_string()),
                method,
                max_frames: max_frames.unwrap_or(config.frames.default_max_frames),
                output: frame_output,
            };

            let pipeline = Pipeline::new(config, show_progress)?;
            let extraction = pipeline.extract_frames(&request).await?;

            let result = extraction.result();
            eprintln!(
                "{} {} frames in {}",
                style("Extracted").green(),
                result.total_frames,
                utils::format_duration(result.extraction_time)
            );
            if let Some(path) = extraction.archive_path() {
                let size = fs_err::metadata(path).map(|m| m.len()).unwrap_or(0);
                eprintln!(
                    "{} {} ({})",
                    style("Archive saved to:").green(),
                    path.display(),
                    utils::format_file_size(size)
                );
            }

            let content = output::render_frames(&extraction, &format)?;
            match output {
                Some(path) => {
                    output::save_to_file(&content, &path)?;
                    eprintln!("{} {}", style("Listing saved to:").green(), path.display());
                }
                None => output::print_to_console(&content),
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = cli
                    .config
                    .clone()
                    .or_else(Config::user_config_path)
                    .ok_or_else(|| anyhow::anyhow!("Could not determine a config directory; pass --config"))?;
                config.save(&path)?;
                println!("{} {}", style("Configuration written to:").green(), path.display());
            }
            if show || !init {
                config.display();
            }
        }
        Commands::Tools => {
            for tool in utils::check_dependencies(&config).await {
                let status = if tool.available { style("ok").green() } else { style("missing").red() };
                println!("  {:<8} {:<8} {}", tool.name, status, tool.path.display());
            }
            println!(
                "  {:<8} {}",
                "whisper",
                if cfg!(feature = "whisper") { style("enabled").green() } else { style("disabled").yellow() }
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "tubeframes=debug" } else { "tubeframes=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn warn_missing_tools(config: &Config) {
    let missing: Vec<_> = utils::check_dependencies(config)
        .await
        .into_iter()
        .filter(|tool| !tool.available)
        .collect();
    if !missing.is_empty() {
        eprintln!("{}", style("Dependency check warnings:").yellow());
        for tool in missing {
            eprintln!("   • {} - {}", tool.path.display(), tool.purpose);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}
