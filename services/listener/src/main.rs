mod commands;
mod sink;

use crate::commands::Command;
use crate::sink::AudioSink;
use anyhow::{Context, Result};
use bargein_client::types::ServerEvent;
use bargein_client::{Client, PlaybackSurface, SuppressionTimer};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::fmt::time::ChronoLocal;

/// How often simulated playback pulls audio from the buffer.
const PLAYBACK_TICK: Duration = Duration::from_millis(100);

/// Terminal listener for a barge-in coordinator.
///
/// Plays streamed responses into an optional file at a fixed byte rate and
/// turns typed commands into listener signals.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Coordinator websocket root
    #[arg(long, env = "BARGEIN_URL", default_value = "ws://127.0.0.1:3000")]
    url: String,
    /// Channel to join
    #[arg(long, env = "BARGEIN_CHANNEL", default_value = "default")]
    channel: String,
    /// Cooldown after a noise resume during which speech-starts are dropped
    #[arg(long, env = "SUPPRESSION_WINDOW_MS", default_value_t = 2000)]
    suppression_window_ms: u64,
    /// Simulated playback speed in bytes per second
    #[arg(long, env = "PLAYBACK_BYTE_RATE", default_value_t = 16_000)]
    byte_rate: usize,
    /// Write played audio to this file
    #[arg(long, env = "PLAYBACK_OUTPUT")]
    output: Option<PathBuf>,
    #[arg(long, env = "RUST_LOG", default_value = "INFO")]
    log_level: tracing::Level,
}

fn report(event: &ServerEvent) {
    match event {
        ServerEvent::StreamStart(data) => {
            tracing::info!("AI speaking: {} ({})", data.response_id(), data.mime_type())
        }
        ServerEvent::StreamChunk(_) => {}
        ServerEvent::StreamEnd(data) => tracing::debug!("Stream ended: {}", data.response_id()),
        ServerEvent::PauseChanged(data) => tracing::info!(
            "{} {} ({:?})",
            if data.paused() { "Paused" } else { "Resumed" },
            data.response_id(),
            data.reason()
        ),
        ServerEvent::ResponseInterrupted(data) => {
            tracing::info!("Interrupted: {}", data.response_id())
        }
        ServerEvent::StatusChanged(data) => tracing::info!("Status: {:?}", data.status()),
        ServerEvent::UserTurn(data) => tracing::info!("User said: \"{}\"", data.text()),
        ServerEvent::Error(data) => tracing::warn!("Server error: {}", data.message()),
    }
}

async fn run_command(command: Command, client: &Client, surface: &mut PlaybackSurface) -> Result<()> {
    match command {
        Command::Vad => match surface.on_local_speech_start(Instant::now()) {
            Some(event) => client.send_client_event(event).await?,
            None => tracing::info!("Speech start suppressed"),
        },
        Command::Result { confidence, text } => {
            client
                .utterance_result(&text, confidence, surface.paused_response_id())
                .await?
        }
        Command::Audio(path) => {
            let audio = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            client
                .utterance_audio(&audio, surface.paused_response_id())
                .await?
        }
        Command::Say(text) => client.speak(&text).await?,
        Command::Status => tracing::info!(
            "response={:?} paused={} buffered={} status={:?} suppressed={}",
            surface.current_response().map(|id| id.as_str()),
            surface.is_paused(),
            surface.buffered(),
            surface.status(),
            surface.is_suppressed(Instant::now())
        ),
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Connect ---
    let client = bargein_client::connect(&args.url, &args.channel)
        .await
        .with_context(|| format!("Failed to connect to {}", args.url))?;
    let mut events = client.server_events()?;
    tracing::info!("Joined channel '{}'. Commands: vad, result <confidence> [text], audio <file>, say <text>, status, quit", args.channel);

    // --- 4. Playback Setup ---
    let mut surface = PlaybackSurface::new(SuppressionTimer::new(Duration::from_millis(
        args.suppression_window_ms,
    )));
    let mut sink = AudioSink::open(args.output.as_deref()).await?;
    let budget = sink::bytes_per_tick(args.byte_rate, PLAYBACK_TICK);
    let mut ticker = tokio::time::interval(PLAYBACK_TICK);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // --- 5. Event Loop ---
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    report(&event);
                    surface.apply(&event, Instant::now());
                }
                Err(RecvError::Lagged(n)) => tracing::warn!("Dropped {} server events", n),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match commands::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = run_command(command, &client, &mut surface).await {
                            tracing::error!("Command failed: {:?}", e);
                        }
                    }
                    Err(e) => tracing::warn!("{}", e),
                },
                None => break,
            },
            _ = ticker.tick() => {
                let played = surface.drain(budget);
                sink.write(&played.audio).await?;
                if let Some(event) = played.finished {
                    client.send_client_event(event).await?;
                }
            }
            _ = client.closed() => {
                tracing::info!("Connection closed by server");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    tracing::info!("Shutting down... played {} bytes", sink.written());
    Ok(())
}
