use chrono::{DateTime, Utc};

/// Outcome of one reachability check against a single host.
///
/// Unreachable and timed-out probes are ordinary results with
/// `alive = false`, never errors.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub host: String,
    pub alive: bool,
    pub latency_ms: Option<f64>,
}

/// A completed outage episode. Immutable once created; `end` is always
/// strictly later than `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutageInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl OutageInterval {
    pub fn duration_minutes(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 60_000.0
    }
}
