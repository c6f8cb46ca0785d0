use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};

mod calendar;
mod config;
mod detector;
mod engine;
mod keys;
mod models;
mod notify;

use crate::calendar::{CalendarSink, ServiceAccountKey};
use crate::config::MonitorConfig;
use crate::engine::Monitor;
use crate::keys::Command;
use crate::notify::Notifier;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = MonitorConfig::from_env()?;

    let default_level = if config.debug_mode {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_ansi(true)
        .init();

    let http = reqwest::Client::new();

    // A missing or unparsable credentials file is unrecoverable; a failed
    // token exchange only degrades the calendar sink, probing and
    // detection continue regardless.
    let key = ServiceAccountKey::from_file(&config.credentials_path)?;
    let calendar = CalendarSink::new(http.clone(), config.calendar_id.clone(), key)?;
    if let Err(e) = calendar.authorize().await {
        error!(
            "Failed to authenticate to calendar: {:#}. Continuing; calendar events will fail.",
            e
        );
    }

    info!("Location: {}", config.location);
    if config.tty_mode {
        info!("TTY mode enabled, press \"t\" to push a test event.");
    } else {
        info!("TTY mode disabled, no testing events will be pushed.");
    }

    let notifier = Arc::new(Notifier::new(
        http,
        config.webhook_url.clone(),
        config.location.clone(),
        calendar,
    ));

    let monitor = Monitor::new(config.clone(), Arc::clone(&notifier))?;
    tokio::spawn(async move {
        if let Err(e) = monitor.run().await {
            error!("Monitor engine failed: {:#}", e);
        }
    });

    if config.tty_mode {
        let mut commands = keys::listen()?;
        while let Some(cmd) = commands.recv().await {
            match cmd {
                Command::PushTestEvent => {
                    let notifier = Arc::clone(&notifier);
                    tokio::spawn(async move {
                        notifier.push_test_event().await;
                    });
                }
                Command::Quit => break,
            }
        }
        keys::restore()?;
    } else {
        signal::ctrl_c().await?;
    }

    info!("Shutdown signal received. Closing monitor...");
    Ok(())
}
