use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

/// Runtime configuration, read once from the environment at startup and
/// immutable afterwards. `.env` files are honored via dotenvy before this
/// is built.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Local gateway to probe. Reachable gateway + unreachable internet
    /// host is what counts as an outage.
    pub gateway_addr: String,
    /// External internet host to probe.
    pub internet_addr: String,
    pub poll_interval: Duration,
    pub probe_timeout: Duration,
    /// Consecutive failing ticks required before an outage is confirmed.
    pub fail_threshold: u32,
    pub location: String,
    pub webhook_url: Option<String>,
    pub calendar_id: String,
    pub credentials_path: String,
    pub tty_mode: bool,
    pub debug_mode: bool,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            gateway_addr: env_or("GATEWAY_ADDR", "192.168.1.1"),
            internet_addr: env_or("INTERNET_ADDR", "1.1.1.1"),
            poll_interval: Duration::from_millis(env_parse("PING_INTERVAL_MS", 5000u64)?),
            probe_timeout: Duration::from_millis(env_parse("PROBE_TIMEOUT_MS", 3500u64)?),
            // A threshold of 1 confirms on the first failing tick.
            fail_threshold: env_parse("FAIL_THRESHOLD", 3u32)?.max(1),
            location: env_or("LOCATION", "New Location"),
            webhook_url: std::env::var("DISCORD_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            calendar_id: env_or("CALENDAR_ID", "default"),
            credentials_path: env_or("CREDENTIALS_PATH", "google.json"),
            tty_mode: env_flag("TTY_MODE"),
            debug_mode: env_flag("DEBUG_MODE"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid value {:?} for {}: {}", raw, key, e)),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key).map(|v| v == "true").unwrap_or(false)
}
