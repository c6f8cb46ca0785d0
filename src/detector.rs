//! Outage detection over paired gateway/internet probes.
//!
//! The detector watches for the one pattern that means "the internet is
//! down": the local gateway answers while the internet host does not.
//! Anything else — everything up, everything down (power or local network
//! loss), gateway down but internet up — is treated as healthy for the
//! purpose of outage accounting.
//!
//! Confirmation is debounced: the failure pattern must hold for a
//! configured number of consecutive ticks before an outage opens, so a
//! single dropped packet never produces a record. Once an outage is
//! confirmed, the first tick where the pattern breaks closes it and yields
//! the completed interval, exactly once per episode.
//!
//! ```text
//!              fail (n < threshold)      fail (n >= threshold)
//!  HEALTHY ─────────────────────────► counting ─────────────► CONFIRMED
//!     ▲                                  │                        │
//!     │              ok                  │          ok            │
//!     └──────────────────────────────────┴◄───────────────────────┘
//!                                             emits interval
//! ```
//!
//! The recorded start is the first tick of the unbroken failing run that
//! led to confirmation, not the tick at which the threshold was crossed.

use chrono::{DateTime, Utc};

use crate::models::OutageInterval;

/// What one tick of observation amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorEvent {
    /// No outage open, failure pattern absent.
    Healthy,
    /// Failure pattern present but still below the confirmation threshold.
    Pending { failures: u32 },
    /// Threshold just reached; an outage opened. Reported exactly once
    /// per episode.
    Confirmed { start: DateTime<Utc> },
    /// Outage already open, pattern still failing.
    Ongoing,
    /// Outage just closed. Carries the completed interval; reported
    /// exactly once per episode.
    Resolved(OutageInterval),
}

/// Debounced state machine tracking at most one outage at a time.
///
/// Total over its inputs: `observe` never fails and is the only writer of
/// the internal counters.
#[derive(Debug)]
pub struct OutageDetector {
    threshold: u32,
    consecutive_failures: u32,
    /// First tick of the current unbroken failing run.
    run_start: Option<DateTime<Utc>>,
    /// Set iff an outage has been confirmed and not yet closed.
    outage_start: Option<DateTime<Utc>>,
}

impl OutageDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: 0,
            run_start: None,
            outage_start: None,
        }
    }

    /// Feed one tick of paired probe results into the state machine.
    ///
    /// `now` is the timestamp of this tick and becomes the interval `end`
    /// when a resolution happens on it.
    pub fn observe(
        &mut self,
        gateway_alive: bool,
        internet_alive: bool,
        now: DateTime<Utc>,
    ) -> DetectorEvent {
        let failing = gateway_alive && !internet_alive;

        if failing {
            self.consecutive_failures += 1;
            let run_start = *self.run_start.get_or_insert(now);

            if self.consecutive_failures < self.threshold {
                return DetectorEvent::Pending {
                    failures: self.consecutive_failures,
                };
            }
            if self.outage_start.is_none() {
                self.outage_start = Some(run_start);
                return DetectorEvent::Confirmed { start: run_start };
            }
            DetectorEvent::Ongoing
        } else {
            self.consecutive_failures = 0;
            self.run_start = None;
            match self.outage_start.take() {
                Some(start) => DetectorEvent::Resolved(OutageInterval { start, end: now }),
                None => DetectorEvent::Healthy,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn fail(d: &mut OutageDetector, at: i64) -> DetectorEvent {
        d.observe(true, false, t(at))
    }

    fn ok(d: &mut OutageDetector, at: i64) -> DetectorEvent {
        d.observe(true, true, t(at))
    }

    #[test]
    fn healthy_ticks_stay_healthy() {
        let mut d = OutageDetector::new(3);
        assert_eq!(ok(&mut d, 0), DetectorEvent::Healthy);
        assert_eq!(ok(&mut d, 5), DetectorEvent::Healthy);
    }

    #[test]
    fn failures_below_threshold_are_pending() {
        let mut d = OutageDetector::new(3);
        assert_eq!(fail(&mut d, 0), DetectorEvent::Pending { failures: 1 });
        assert_eq!(fail(&mut d, 5), DetectorEvent::Pending { failures: 2 });
    }

    #[test]
    fn confirms_at_threshold_with_run_start() {
        let mut d = OutageDetector::new(3);
        fail(&mut d, 5);
        fail(&mut d, 10);
        // Confirmed on the third failing tick, but the outage is dated
        // from the first tick of the run.
        assert_eq!(fail(&mut d, 15), DetectorEvent::Confirmed { start: t(5) });
    }

    #[test]
    fn confirmation_is_one_shot_then_ongoing() {
        let mut d = OutageDetector::new(2);
        fail(&mut d, 0);
        assert_eq!(fail(&mut d, 5), DetectorEvent::Confirmed { start: t(0) });
        assert_eq!(fail(&mut d, 10), DetectorEvent::Ongoing);
        assert_eq!(fail(&mut d, 15), DetectorEvent::Ongoing);
    }

    #[test]
    fn resolution_emits_interval_exactly_once() {
        let mut d = OutageDetector::new(3);
        fail(&mut d, 5);
        fail(&mut d, 10);
        fail(&mut d, 15);
        let resolved = ok(&mut d, 20);
        assert_eq!(
            resolved,
            DetectorEvent::Resolved(OutageInterval {
                start: t(5),
                end: t(20),
            })
        );
        // Next healthy tick is plain healthy, nothing re-emitted.
        assert_eq!(ok(&mut d, 25), DetectorEvent::Healthy);
    }

    #[test]
    fn fifteen_second_outage_lasts_a_quarter_minute() {
        let mut d = OutageDetector::new(3);
        fail(&mut d, 5);
        fail(&mut d, 10);
        fail(&mut d, 15);
        match ok(&mut d, 20) {
            DetectorEvent::Resolved(interval) => {
                assert_eq!(interval.duration_minutes(), 0.25);
            }
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn start_does_not_move_while_outage_is_open() {
        let mut d = OutageDetector::new(1);
        fail(&mut d, 0);
        fail(&mut d, 5);
        fail(&mut d, 10);
        assert_eq!(
            ok(&mut d, 15),
            DetectorEvent::Resolved(OutageInterval {
                start: t(0),
                end: t(15),
            })
        );
    }

    #[test]
    fn end_is_strictly_after_start() {
        let mut d = OutageDetector::new(1);
        fail(&mut d, 0);
        match ok(&mut d, 5) {
            DetectorEvent::Resolved(interval) => assert!(interval.end > interval.start),
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn flapping_below_threshold_never_emits() {
        let mut d = OutageDetector::new(3);
        for cycle in 0..4 {
            let base = cycle * 15;
            assert_eq!(
                fail(&mut d, base),
                DetectorEvent::Pending { failures: 1 }
            );
            assert_eq!(
                fail(&mut d, base + 5),
                DetectorEvent::Pending { failures: 2 }
            );
            assert_eq!(ok(&mut d, base + 10), DetectorEvent::Healthy);
        }
    }

    #[test]
    fn threshold_one_confirms_immediately() {
        let mut d = OutageDetector::new(1);
        assert_eq!(fail(&mut d, 0), DetectorEvent::Confirmed { start: t(0) });
        assert_eq!(
            ok(&mut d, 5),
            DetectorEvent::Resolved(OutageInterval {
                start: t(0),
                end: t(5),
            })
        );
    }

    #[test]
    fn short_run_after_reset_does_not_confirm() {
        let mut d = OutageDetector::new(3);
        fail(&mut d, 0);
        fail(&mut d, 5);
        ok(&mut d, 10);
        // Fresh run restarts the count; two more failures stay pending.
        assert_eq!(fail(&mut d, 15), DetectorEvent::Pending { failures: 1 });
        assert_eq!(fail(&mut d, 20), DetectorEvent::Pending { failures: 2 });
        // Confirmation dates from the current run, not the aborted one.
        assert_eq!(fail(&mut d, 25), DetectorEvent::Confirmed { start: t(15) });
    }

    #[test]
    fn second_episode_gets_fresh_timestamps() {
        let mut d = OutageDetector::new(2);
        fail(&mut d, 0);
        fail(&mut d, 5);
        assert!(matches!(ok(&mut d, 10), DetectorEvent::Resolved(_)));

        fail(&mut d, 30);
        assert_eq!(fail(&mut d, 35), DetectorEvent::Confirmed { start: t(30) });
        assert_eq!(
            ok(&mut d, 40),
            DetectorEvent::Resolved(OutageInterval {
                start: t(30),
                end: t(40),
            })
        );
    }

    #[test]
    fn total_loss_is_not_an_outage() {
        let mut d = OutageDetector::new(2);
        // Both probes dead: power or local network loss, deliberately
        // not flagged.
        assert_eq!(d.observe(false, false, t(0)), DetectorEvent::Healthy);
        assert_eq!(d.observe(false, false, t(5)), DetectorEvent::Healthy);
        assert_eq!(d.observe(false, false, t(10)), DetectorEvent::Healthy);
        assert_eq!(ok(&mut d, 15), DetectorEvent::Healthy);
    }

    #[test]
    fn gateway_down_alone_is_not_an_outage() {
        let mut d = OutageDetector::new(1);
        assert_eq!(d.observe(false, true, t(0)), DetectorEvent::Healthy);
        assert_eq!(d.observe(false, true, t(5)), DetectorEvent::Healthy);
    }

    #[test]
    fn total_loss_during_open_outage_closes_it() {
        // The failure pattern requires the gateway alive; losing the
        // gateway mid-outage breaks the pattern and resolves.
        let mut d = OutageDetector::new(1);
        fail(&mut d, 0);
        assert_eq!(
            d.observe(false, false, t(5)),
            DetectorEvent::Resolved(OutageInterval {
                start: t(0),
                end: t(5),
            })
        );
    }

    #[test]
    fn zero_threshold_behaves_like_one() {
        let mut d = OutageDetector::new(0);
        assert_eq!(fail(&mut d, 0), DetectorEvent::Confirmed { start: t(0) });
    }
}
