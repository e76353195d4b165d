//! SnapSolve: screenshot a coding problem, get a solution.
//!
//! Module map:
//!   - capture/       screenshot queues and the files behind them
//!   - llm/           model gateway, prompts, response interpretation
//!   - pipeline/      orchestrator: view state, credits, Solve and Debug
//!   - events.rs      notifications to the UI
//!   - commands.rs    text commands for the headless driver
//!   - config.rs      environment configuration and credentials
//!   - preferences.rs language preference and UI readiness
//!
//! `run()` is the headless driver: commands on stdin, JSON lines on stdout.

pub mod capture;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod pipeline;
pub mod preferences;

use capture::{FileSource, ScreenshotStore};
use commands::{Command, Reply};
use config::AppConfig;
use error::AppError;
use events::ChannelSink;
use llm::AnthropicGateway;
use pipeline::{Orchestrator, PipelineSettings};
use preferences::Preferences;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

/// Entry point: called by the binary.
pub fn run() {
    config::load_env_files();
    env_logger::init();

    if let Err(e) = start() {
        log::error!("[STARTUP] {}", e);
        eprintln!("snapsolve: {}", e);
        std::process::exit(1);
    }
}

fn start() -> Result<(), AppError> {
    let config = AppConfig::from_env();
    log::info!(
        "[STARTUP] model={} dir={} max_screenshots={} credits={}",
        config.model,
        config.screenshot_dir.display(),
        config.max_screenshots,
        config.initial_credits
    );

    // Pipelines are cooperative; one thread is enough.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<(), AppError> {
    let gateway = AnthropicGateway::new(
        config.api_key.clone(),
        config.model.clone(),
        config.api_url.clone(),
        config.request_timeout,
    )?;

    let (sink, mut events) = ChannelSink::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_line(&event);
        }
    });

    let preferences = Arc::new(Preferences::new(config.default_language.clone()));
    let mut orchestrator = Orchestrator::new(
        ScreenshotStore::new(&config.screenshot_dir, config.max_screenshots),
        Arc::new(gateway),
        Arc::new(sink),
        preferences.clone(),
        PipelineSettings {
            initial_credits: config.initial_credits,
            sampling: config.sampling,
        },
    );
    if let Some(path) = &config.capture_source {
        log::info!("[CAPTURE] Reading captures from {}", path.display());
        orchestrator = orchestrator.with_source(Arc::new(FileSource::new(path)));
    }
    let orchestrator = Arc::new(orchestrator);

    // No settings UI to wait for here.
    preferences.mark_ready();
    log::info!("[STARTUP] Ready for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match line.parse::<Command>() {
            Ok(command) => commands::dispatch(&orchestrator, command),
            Err(e) => Reply::Error(e.to_string()),
        };
        let quit = matches!(reply, Reply::Quit);
        print_line(&reply);
        if quit {
            break;
        }
    }

    orchestrator.cancel_all();
    // The printer stops once every sender is gone. Pipelines still unwinding
    // hold a clone of the orchestrator, so give them a bounded wait.
    drop(orchestrator);
    if tokio::time::timeout(SHUTDOWN_DRAIN, printer).await.is_err() {
        log::warn!("[STARTUP] Event printer did not drain within {:?}", SHUTDOWN_DRAIN);
    }
    log::info!("[STARTUP] Shutting down");
    Ok(())
}

fn print_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("[EVENT] Failed to serialize output: {}", e),
    }
}
