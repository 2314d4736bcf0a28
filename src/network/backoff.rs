//! Reconnect delays.
//!
//! Delays double from `base` up to `max` while failures repeat with the same
//! cause. A failure with a different cause starts over from `base`, as does a
//! session that stayed up longer than [`STABLE_SESSION`].

use std::time::Duration;

/// A session that lasted this long counts as healthy.
pub const STABLE_SESSION: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base: Duration,
    max: Duration,
    current: Duration,
    last_failure: Option<String>,
    consecutive_failures: u32,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            current: base,
            last_failure: None,
            consecutive_failures: 0,
        }
    }

    /// Forget previous failures.
    pub fn record_success(&mut self) {
        self.current = self.base;
        self.last_failure = None;
        self.consecutive_failures = 0;
    }

    /// Record why the last session ended and how long it lasted; returns the
    /// delay before the next attempt.
    pub fn record_failure(&mut self, cause: &str, session: Duration) -> Duration {
        let repeated = self.last_failure.as_deref() == Some(cause);
        if session >= STABLE_SESSION || !repeated {
            self.current = self.base;
            self.consecutive_failures = 0;
        }

        self.consecutive_failures += 1;
        self.last_failure = Some(cause.to_owned());

        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Delay after an orderly RECONNECT request.
    pub fn requested(&mut self) -> Duration {
        self.record_success();
        Duration::ZERO
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(8))
    }

    #[test]
    fn test_identical_failures_escalate() {
        let mut p = policy();
        let quick = Duration::from_secs(1);
        let delays: Vec<u64> = (0..6)
            .map(|_| p.record_failure("connection refused", quick).as_secs())
            .collect();
        assert_eq!(delays, [1, 2, 4, 8, 8, 8]);
        assert_eq!(p.consecutive_failures(), 6);
    }

    #[test]
    fn test_different_failure_resets() {
        let mut p = policy();
        let quick = Duration::from_secs(1);
        p.record_failure("refused", quick);
        p.record_failure("refused", quick);
        assert_eq!(p.record_failure("eof", quick), Duration::from_secs(1));
        assert_eq!(p.consecutive_failures(), 1);
    }

    #[test]
    fn test_long_session_resets() {
        let mut p = policy();
        p.record_failure("eof", Duration::from_secs(1));
        p.record_failure("eof", Duration::from_secs(1));
        assert_eq!(
            p.record_failure("eof", STABLE_SESSION),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_requested_reconnect_is_immediate() {
        let mut p = policy();
        p.record_failure("eof", Duration::ZERO);
        assert_eq!(p.requested(), Duration::ZERO);
        assert_eq!(p.record_failure("eof", Duration::ZERO), Duration::from_secs(1));
    }
}
