use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use surge_ping::{Client as PingClient, Config as PingConfig, PingIdentifier, PingSequence};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::detector::{DetectorEvent, OutageDetector};
use crate::models::ProbeResult;
use crate::notify::Notifier;

/// Tick loop: probe the gateway and the internet host, feed the pair to
/// the detector, hand any finished outage to the notifier.
pub struct Monitor {
    config: MonitorConfig,
    ping_client: PingClient,
    dns_resolver: TokioResolver,
    detector: OutageDetector,
    notifier: Arc<Notifier>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, notifier: Arc<Notifier>) -> Result<Self> {
        let ping_client =
            PingClient::new(&PingConfig::default()).context("Failed to create ping client")?;

        let dns_resolver = TokioResolver::builder_with_config(
            ResolverConfig::cloudflare(),
            TokioConnectionProvider::default(),
        )
        .build();

        let detector = OutageDetector::new(config.fail_threshold);

        Ok(Self {
            config,
            ping_client,
            dns_resolver,
            detector,
            notifier,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        info!(
            "Watching gateway {} and internet host {} every {}ms (threshold: {} ticks)",
            self.config.gateway_addr,
            self.config.internet_addr,
            self.config.poll_interval.as_millis(),
            self.config.fail_threshold,
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        // A slow tick delays the next one rather than letting ticks pile
        // up and race on detector state.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    async fn tick(&mut self) {
        let (gateway, internet) = futures::join!(
            self.probe(&self.config.gateway_addr),
            self.probe(&self.config.internet_addr),
        );

        debug!(
            "Gateway {}: {} {} | Internet {}: {} {}",
            gateway.host,
            gateway.alive,
            format_latency(&gateway),
            internet.host,
            internet.alive,
            format_latency(&internet),
        );

        match self.detector.observe(gateway.alive, internet.alive, Utc::now()) {
            DetectorEvent::Confirmed { start } => {
                warn!("Outage detected! Internet unreachable since {}", start);
            }
            DetectorEvent::Resolved(interval) => {
                info!(
                    "Outage finished: {} to {} ({:.2} minutes)",
                    interval.start,
                    interval.end,
                    interval.duration_minutes(),
                );
                // Fire and forget: delivery must never hold up the next tick.
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    notifier.report_outage(interval).await;
                });
            }
            DetectorEvent::Healthy | DetectorEvent::Pending { .. } | DetectorEvent::Ongoing => {}
        }
    }

    /// Single ICMP echo with a bounded timeout. Unreachable, timed-out,
    /// and unresolvable hosts all come back as `alive = false`.
    async fn probe(&self, host: &str) -> ProbeResult {
        let ip = match self.resolve(host).await {
            Ok(ip) => ip,
            Err(e) => {
                debug!("Could not resolve {}: {}", host, e);
                return ProbeResult {
                    host: host.to_string(),
                    alive: false,
                    latency_ms: None,
                };
            }
        };

        let payload = [0u8; 56];
        let mut pinger = self.ping_client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(self.config.probe_timeout);

        match pinger.ping(PingSequence(0), &payload).await {
            Ok((_, latency)) => ProbeResult {
                host: host.to_string(),
                alive: true,
                latency_ms: Some(latency.as_secs_f64() * 1000.0),
            },
            Err(_) => ProbeResult {
                host: host.to_string(),
                alive: false,
                latency_ms: None,
            },
        }
    }

    async fn resolve(&self, address: &str) -> Result<IpAddr, String> {
        if let Ok(ip) = address.parse::<IpAddr>() {
            return Ok(ip);
        }
        match self.dns_resolver.lookup_ip(address).await {
            Ok(lookup) => lookup.iter().next().ok_or_else(|| "No IP address found".into()),
            Err(e) => Err(format!("DNS resolution failed: {}", e)),
        }
    }
}

fn format_latency(result: &ProbeResult) -> String {
    result
        .latency_ms
        .map_or("-".to_string(), |l| format!("{:.1}ms", l))
}
