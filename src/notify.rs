//! Outage notification fan-out: one calendar entry, one chat message.
//!
//! Delivery is at-most-once per sink. A sink failure is logged and the
//! record is dropped; nothing is retried or re-queued, and detection is
//! never affected.

use chrono::Utc;
use serde_json::json;
use tracing::{error, info};

use crate::calendar::{CalendarEvent, CalendarSink};
use crate::models::OutageInterval;

pub struct Notifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
    location: String,
    calendar: CalendarSink,
}

impl Notifier {
    pub fn new(
        http: reqwest::Client,
        webhook_url: Option<String>,
        location: String,
        calendar: CalendarSink,
    ) -> Self {
        Self {
            http,
            webhook_url,
            location,
            calendar,
        }
    }

    /// Report a completed outage to both sinks. The sinks are independent:
    /// one failing does not stop the other.
    pub async fn report_outage(&self, interval: OutageInterval) {
        futures::join!(self.log_to_calendar(&interval), self.post_to_chat(&interval));
    }

    /// Push a synthetic one-minute calendar event, bypassing outage
    /// accounting entirely. Used to verify sink connectivity.
    pub async fn push_test_event(&self) {
        let event = CalendarEvent::test_event(&self.location, Utc::now());
        match self.calendar.insert_event(&event).await {
            Ok(()) => info!("Pushed test event to calendar."),
            Err(e) => error!("Error pushing test event: {:#}", e),
        }
    }

    async fn log_to_calendar(&self, interval: &OutageInterval) {
        let event = CalendarEvent::outage(&self.location, interval);
        match self.calendar.insert_event(&event).await {
            Ok(()) => info!(
                "Logged outage to calendar: {} to {}",
                interval.start, interval.end
            ),
            Err(e) => error!("Error logging calendar event: {:#}", e),
        }
    }

    async fn post_to_chat(&self, interval: &OutageInterval) {
        let Some(url) = &self.webhook_url else {
            return;
        };
        let payload = outage_embed(&self.location, interval);
        let sent = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());
        match sent {
            Ok(_) => info!("Posted outage notification to chat."),
            Err(e) => error!("Failed to send chat notification: {}", e),
        }
    }
}

fn outage_embed(location: &str, interval: &OutageInterval) -> serde_json::Value {
    json!({
        "username": "uplinkwatch",
        "embeds": [{
            "title": format!("{} Internet Outage", location),
            "color": 0xE74C3C,
            "fields": [
                { "name": "Started", "value": interval.start.to_rfc3339(), "inline": true },
                { "name": "Ended", "value": interval.end.to_rfc3339(), "inline": true },
                {
                    "name": "Duration",
                    "value": format!("{:.2} minutes", interval.duration_minutes()),
                    "inline": true
                },
            ],
            "timestamp": Utc::now().to_rfc3339(),
            "footer": { "text": "uplinkwatch connectivity monitor" }
        }]
    })
}
