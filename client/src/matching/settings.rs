use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_MS};

/// What happens to a ride that is still unmatched when its controller is disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbandonPolicy {
    /// Leave the ride active on the backend so it can be matched later.
    #[default]
    KeepActive,
    /// Delete the ride on the backend.
    DeleteRide,
}

impl FromStr for AbandonPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_active" => Ok(AbandonPolicy::KeepActive),
            "delete" | "delete_ride" => Ok(AbandonPolicy::DeleteRide),
            other => Err(anyhow::anyhow!("Unknown abandon policy: {}", other)),
        }
    }
}

impl fmt::Display for AbandonPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbandonPolicy::KeepActive => f.write_str("keep_active"),
            AbandonPolicy::DeleteRide => f.write_str("delete_ride"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    pub abandon_policy: AbandonPolicy,
}

impl PollSettings {
    /// Raises the interval to [`MIN_POLL_INTERVAL_MS`] and the budget to one attempt.
    pub fn normalized(self) -> Self {
        Self {
            interval: self.interval.max(Duration::from_millis(MIN_POLL_INTERVAL_MS)),
            max_attempts: self.max_attempts.max(1),
            ..self
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            abandon_policy: AbandonPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_raises_zero_values() {
        let settings = PollSettings {
            interval: Duration::ZERO,
            max_attempts: 0,
            abandon_policy: AbandonPolicy::DeleteRide,
        }
        .normalized();

        assert_eq!(settings.interval, Duration::from_millis(MIN_POLL_INTERVAL_MS));
        assert_eq!(settings.max_attempts, 1);
        assert_eq!(settings.abandon_policy, AbandonPolicy::DeleteRide);
        assert_eq!(PollSettings::default().normalized(), PollSettings::default());
    }

    #[test]
    fn test_abandon_policy_parses_aliases() {
        assert_eq!("keep".parse::<AbandonPolicy>().unwrap(), AbandonPolicy::KeepActive);
        assert_eq!("Delete_Ride".parse::<AbandonPolicy>().unwrap(), AbandonPolicy::DeleteRide);
        assert!("purge".parse::<AbandonPolicy>().is_err());
    }
}
