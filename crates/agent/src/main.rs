// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use parallax::session::{SpawnConfig, StopOptions};
use parallax::{SessionEvent, Supervisor, SupervisorConfig};

/// Session supervisor for AI coding agents.
#[derive(Debug, Parser)]
#[command(name = "parallax", version, about)]
struct Cli {
    /// Adapter type (claude, codex, gemini, aider).
    #[arg(long, env = "PARALLAX_ADAPTER", default_value = "claude")]
    adapter: String,

    /// Human label for the session.
    #[arg(long, env = "PARALLAX_NAME", default_value = "session")]
    name: String,

    /// Working directory for the child.
    #[arg(long, env = "PARALLAX_WORKDIR")]
    workdir: Option<PathBuf>,

    /// Adapter configuration as inline JSON.
    #[arg(long, env = "PARALLAX_ADAPTER_CONFIG")]
    adapter_config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "PARALLAX_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

/// Spawn one session and mirror its events to stdout until it stops.
async fn run(cli: Cli) -> anyhow::Result<()> {
    let supervisor = Supervisor::with_default_adapters(SupervisorConfig::from_env())?;

    let mut spawn = SpawnConfig::new(cli.name, cli.adapter);
    if let Some(workdir) = cli.workdir {
        spawn = spawn.workdir(workdir);
    }
    if let Some(ref raw) = cli.adapter_config {
        spawn = spawn.adapter_config(serde_json::from_str(raw)?);
    }

    let handle = supervisor.spawn(spawn).await?;
    let mut events = supervisor.subscribe();

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break handle.stop(StopOptions::default()).await?;
            }
            event = events.next() => {
                let Some(event) = event else { continue };
                match event {
                    SessionEvent::SessionOutput { data, .. } => {
                        use std::io::Write;
                        let mut stdout = std::io::stdout().lock();
                        let _ = stdout.write_all(&data);
                        let _ = stdout.flush();
                    }
                    SessionEvent::SessionStatus { kind, reason, .. } => {
                        tracing::info!(state = %kind, reason = reason.as_deref().unwrap_or(""), "status");
                    }
                    SessionEvent::SessionStopped { code, signal, .. } => {
                        tracing::info!(?code, ?signal, "session stopped");
                        break handle.stop(StopOptions::default()).await?;
                    }
                    _ => {}
                }
            }
        }
    };

    std::process::exit(outcome.surfaced_code().max(0));
}
