//! # tardy-agent
//!
//! The tardy bot binary. Loads settings, connects to Slack and Tock, primes
//! the directory, then keeps the RTM stream dispatched until ctrl-c.

#![deny(unsafe_code)]

mod connection;
mod health;
mod server;
mod shutdown;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tardy_chat::{ChatPlatform, EventSource, RtmEventSource, SlackClient};
use tardy_compliance::{ComplianceFeed, TockClient};
use tardy_core::Categorized;
use tardy_messages::MessageRepository;
use tardy_runtime::{BotContext, nag, refresh_directory, refresher};
use tardy_settings::TardySettings;
use tracing::{info, warn};

use crate::connection::{LoopExit, run_connection_loop};
use crate::server::AppState;
use crate::shutdown::{SHUTDOWN_GRACE, ShutdownCoordinator};

/// Nags chat users who are late on their timesheets.
#[derive(Parser, Debug)]
#[command(name = "tardy-agent", about = "Timesheet compliance bot")]
struct Cli {
    /// Settings file (defaults to `~/.tardy/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host for the health endpoint (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port for the health endpoint (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter when `RUST_LOG` is unset (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, settings: &mut TardySettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
    }
}

fn init_logging(settings: &TardySettings) {
    if settings.logging.json {
        tardy_core::logging::init_subscriber_json(&settings.logging.level);
    } else {
        tardy_core::logging::init_subscriber(&settings.logging.level);
    }
}

fn load_settings(cli: &Cli) -> Result<TardySettings> {
    let path = cli.config.clone().unwrap_or_else(tardy_settings::settings_path);
    let mut settings = tardy_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = load_settings(&args)?;
    init_logging(&settings);
    settings.validate().context("Invalid configuration")?;

    let messages = MessageRepository::load(settings.messages.path.as_deref().map(Path::new))
        .context("Failed to load message templates")?;

    let slack = Arc::new(
        SlackClient::new(
            &settings.chat.api_base_url,
            settings.chat.token.clone(),
            Duration::from_millis(settings.chat.request_timeout_ms),
        )
        .context("Failed to build Slack client")?,
    );
    let tock = TockClient::new(
        &settings.compliance.base_url,
        settings.compliance.token.clone(),
        Duration::from_millis(settings.compliance.request_timeout_ms),
    )
    .context("Failed to build Tock client")?;

    let bot_id = slack
        .self_identity()
        .await
        .context("Failed to authenticate with Slack")?;
    info!(%bot_id, "authenticated");

    let (host, port) = (settings.server.host.clone(), settings.server.port);
    let ctx = Arc::new(BotContext::new(
        bot_id,
        Arc::clone(&slack) as Arc<dyn ChatPlatform>,
        Arc::new(tock) as Arc<dyn ComplianceFeed>,
        messages,
        settings,
    ));
    let shutdown = ShutdownCoordinator::for_context(&ctx);

    // A failed first refresh is retried on the next interval.
    if let Err(e) = refresh_directory(&ctx).await {
        warn!(error = %e, category = %e.category(), "initial directory refresh failed");
    }

    drop(ctx.spawn(refresher::run_refresher(
        Arc::clone(&ctx),
        ctx.settings.schedule.refresh_interval(),
    )));
    if let Some(interval) = ctx.settings.schedule.auto_nag_interval() {
        info!(interval_secs = interval.as_secs(), "automatic nag cycles enabled");
        drop(ctx.spawn(nag::run_auto_nag(Arc::clone(&ctx), interval)));
    }

    let state = AppState {
        ctx: Arc::clone(&ctx),
        start_time: Instant::now(),
    };
    let _ = server::listen(state, &host, port)
        .await
        .with_context(|| format!("Failed to bind health endpoint on {host}:{port}"))?;

    let source: Arc<dyn EventSource> = Arc::new(RtmEventSource::new(slack));
    let exit = tokio::select! {
        exit = run_connection_loop(Arc::clone(&ctx), source) => exit,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl-c")?;
            info!("ctrl-c received");
            LoopExit::Shutdown
        }
    };

    info!(?exit, pending = shutdown.pending(), "shutting down");
    if !shutdown.shutdown(SHUTDOWN_GRACE).await {
        warn!("exiting with tasks still running");
    }

    if exit == LoopExit::InvalidAuth {
        bail!("Slack rejected the bot token");
    }
    info!("shutdown complete");
    Ok(())
}
