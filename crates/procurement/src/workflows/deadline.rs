//! Deadline gate consulted by every mutating bidding operation.
//!
//! The gate only ever compares against the server clock handed to it; timestamps arriving in
//! request bodies are never part of the decision.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::error::BiddingError;

/// Source of "now" for the engines.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used by the running service.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for demos and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Anything that accepts submissions until a cut-off instant.
pub trait SubmissionWindow {
    fn submission_deadline(&self) -> DateTime<Utc>;
}

/// Submissions are accepted strictly before the deadline.
pub fn can_submit<W: SubmissionWindow + ?Sized>(window: &W, now: DateTime<Utc>) -> bool {
    now < window.submission_deadline()
}

pub fn ensure_open<W: SubmissionWindow + ?Sized>(
    window: &W,
    now: DateTime<Utc>,
) -> Result<(), BiddingError> {
    if can_submit(window, now) {
        Ok(())
    } else {
        Err(BiddingError::DeadlinePassed {
            deadline: window.submission_deadline(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Window(DateTime<Utc>);

    impl SubmissionWindow for Window {
        fn submission_deadline(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn deadline() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 17, 0, 0).single().expect("valid")
    }

    #[test]
    fn open_strictly_before_deadline() {
        let window = Window(deadline());
        assert!(can_submit(&window, deadline() - Duration::seconds(1)));
        assert!(!can_submit(&window, deadline()));
        assert!(!can_submit(&window, deadline() + Duration::days(3)));
    }

    #[test]
    fn ensure_open_reports_the_deadline() {
        let window = Window(deadline());
        match ensure_open(&window, deadline()) {
            Err(BiddingError::DeadlinePassed { deadline: reported }) => {
                assert_eq!(reported, deadline())
            }
            other => panic!("expected deadline error, got {other:?}"),
        }
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(deadline());
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), deadline() + Duration::minutes(5));
        clock.set(deadline());
        assert_eq!(clock.now(), deadline());
    }
}
