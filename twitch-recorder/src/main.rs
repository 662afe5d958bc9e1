use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use twitch_recorder::cli::Args;
use twitch_recorder::media::{FfmpegToolkit, StreamlinkRecorder};
use twitch_recorder::twitch::TwitchClient;
use twitch_recorder::{AppConfig, SessionRecorder, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let Some(level) = logging::parse_level(&args.log) else {
        eprintln!("Invalid log level: {}", args.log);
        return ExitCode::from(2);
    };

    match run(args, level).await {
        Ok(code) => code,
        Err(e) => {
            error!("Application error: {e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, level: tracing::Level) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(args.config.as_deref()).context("loading configuration")?;
    let _guard = logging::init_logging(&config.logging_dir, &args.username, level)?;

    let missing = process_utils::missing_executables(config.executables());
    if let Some(exe) = missing.first() {
        error!("Could not find executable: {exe}");
        return Ok(ExitCode::FAILURE);
    }

    let cancel = CancellationToken::new();
    logging::start_retention_cleanup(&config.logging_dir, &args.username, cancel.child_token());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for interrupts"),
        }
    });

    let config = Arc::new(config);
    let source = Arc::new(TwitchClient::new(&config)?);
    let recorder = Arc::new(StreamlinkRecorder::new(&config));
    let toolkit = Arc::new(FfmpegToolkit::new(&config));

    let session = SessionRecorder::new(
        Arc::clone(&config),
        args.username,
        source,
        recorder,
        toolkit,
    );
    session.run(cancel).await?;

    info!("Exiting");
    Ok(ExitCode::SUCCESS)
}
