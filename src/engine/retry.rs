use std::time::Duration;

use crate::config::RelayConfig;

/// Exponential backoff: `max_attempts` tries in total, waiting `initial_delay`
/// after the first failure and multiplying the wait after each further one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier: 2,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.max_attempts, config.initial_retry_delay())
    }

    pub fn start(&self) -> RetryState {
        RetryState {
            policy: *self,
            attempt: 1,
            next_delay: self.initial_delay,
        }
    }
}

/// Position within one retry sequence.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    next_delay: Duration,
}

impl RetryState {
    /// 1-based index of the attempt currently running.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_last(&self) -> bool {
        self.attempt >= self.policy.max_attempts
    }

    /// Record a failed attempt and decide what happens next.
    pub fn on_failure(&mut self) -> RetryDecision {
        if self.is_last() {
            return RetryDecision::GiveUp;
        }
        let delay = self.next_delay;
        self.next_delay = self.next_delay.saturating_mul(self.policy.multiplier);
        self.attempt += 1;
        RetryDecision::RetryAfter(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_sequence() {
        let policy = RetryPolicy::from_config(&RelayConfig::default());
        let mut state = policy.start();
        assert_eq!(state.attempt(), 1);
        assert_eq!(
            state.on_failure(),
            RetryDecision::RetryAfter(Duration::from_secs(5))
        );
        assert_eq!(state.attempt(), 2);
        assert_eq!(
            state.on_failure(),
            RetryDecision::RetryAfter(Duration::from_secs(10))
        );
        assert_eq!(state.attempt(), 3);
        assert!(state.is_last());
        assert_eq!(state.on_failure(), RetryDecision::GiveUp);
        assert_eq!(state.on_failure(), RetryDecision::GiveUp);
    }

    #[test]
    fn test_single_attempt_gives_up_immediately() {
        let mut state = RetryPolicy::new(1, Duration::from_secs(5)).start();
        assert!(state.is_last());
        assert_eq!(state.on_failure(), RetryDecision::GiveUp);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(1));
        assert_eq!(policy.max_attempts, 1);
    }
}
