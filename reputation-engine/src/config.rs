//! Configuration types for the vote coordinator.
use std::str::FromStr;
use std::time::Duration;

/// What happens when a user casts the vote kind they already hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatVotePolicy {
    /// Reject the repeat with a conflict and change nothing.
    #[default]
    Reject,
    /// Remove the existing vote and reverse its effects.
    Retract,
}

impl FromStr for RepeatVotePolicy {
    type Err = String;

    /// Valid values: "reject" or "retract" (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "retract" => Ok(Self::Retract),
            other => Err(format!("unknown repeat vote policy: {other}")),
        }
    }
}

/// Configuration for the [`VoteCoordinator`](crate::VoteCoordinator).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Total attempts for a transaction that loses a race, including the
    /// first one. Values below 2 are raised to 2 so conflicts are always
    /// retried at least once.
    pub max_attempts: usize,

    /// Base of the exponential backoff between attempts, in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Upper bound for a single backoff delay.
    pub retry_max_delay: Duration,

    pub repeat_vote_policy: RepeatVotePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay_ms: 10,
            retry_max_delay: Duration::from_secs(1),
            repeat_vote_policy: RepeatVotePolicy::Reject,
        }
    }
}

impl EngineConfig {
    pub fn with_repeat_vote_policy(mut self, policy: RepeatVotePolicy) -> Self {
        self.repeat_vote_policy = policy;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_base_delay_ms = delay_ms;
        self
    }

    /// Number of retries after the first attempt.
    pub(crate) fn retries(&self) -> usize {
        self.max_attempts.max(2) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeat_vote_policy() {
        assert_eq!("reject".parse(), Ok(RepeatVotePolicy::Reject));
        assert_eq!(" Retract ".parse(), Ok(RepeatVotePolicy::Retract));
        assert!("toggle-ish".parse::<RepeatVotePolicy>().is_err());
    }

    #[test]
    fn conflicts_are_retried_at_least_once() {
        assert_eq!(EngineConfig::default().retries(), 2);
        assert_eq!(EngineConfig::default().with_max_attempts(0).retries(), 1);
        assert_eq!(EngineConfig::default().with_max_attempts(1).retries(), 1);
        assert_eq!(EngineConfig::default().with_max_attempts(5).retries(), 4);
    }
}
