//! Exponential reconnect backoff.

use std::time::Duration;

/// Immutable reconnect timing for one connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect, restored after every successful connect.
    pub initial_interval: Duration,
    /// Cap for the doubling delay.
    pub max_interval: Duration,
}

impl ReconnectPolicy {
    pub fn new(initial_interval: Duration, max_interval: Duration) -> Self {
        Self {
            initial_interval,
            max_interval,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(300))
    }
}

/// Mutable backoff position for a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct BackoffState {
    policy: ReconnectPolicy,
    current: Duration,
}

impl BackoffState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            current: policy.initial_interval,
        }
    }

    /// Delay the next scheduled attempt should wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Take the current delay and double it for next time, capped at the max.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .saturating_mul(2)
            .min(self.policy.max_interval);
        delay
    }

    /// Back to the initial interval after a successful connect.
    pub fn reset(&mut self) {
        self.current = self.policy.initial_interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn doubles_until_capped() {
        let mut backoff = BackoffState::new(ReconnectPolicy::new(ms(1000), ms(8000)));
        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![ms(1000), ms(2000), ms(4000), ms(8000), ms(8000), ms(8000)]
        );
    }

    #[test]
    fn cap_applies_when_max_is_not_a_power_of_two_multiple() {
        let mut backoff = BackoffState::new(ReconnectPolicy::new(ms(15_000), ms(300_000)));
        let mut last = Duration::ZERO;
        for _ in 0..10 {
            last = backoff.next_delay();
        }
        assert_eq!(last, ms(300_000));
    }

    #[test]
    fn reset_restores_initial_interval() {
        let mut backoff = BackoffState::new(ReconnectPolicy::new(ms(1000), ms(8000)));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), ms(4000));
        backoff.reset();
        assert_eq!(backoff.next_delay(), ms(1000));
    }

    #[test]
    fn default_policy_is_fifteen_seconds_to_five_minutes() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_secs(15));
        assert_eq!(policy.max_interval, Duration::from_secs(300));
    }
}
