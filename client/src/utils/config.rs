use anyhow::Result;
use std::env;
use std::time::Duration;
use crate::constants::*;
use crate::matching::{AbandonPolicy, PollSettings};
use crate::services::UserMode;

/// Parses an attempt budget and checks it against `1..=MAX_POLL_ATTEMPTS_LIMIT`.
/// `name` is the variable or flag the value came from, for the error message.
pub fn parse_max_attempts(name: &str, raw: &str) -> Result<u32> {
    let attempts: u32 = raw
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", name, raw, e))?;
    if !(1..=MAX_POLL_ATTEMPTS_LIMIT).contains(&attempts) {
        return Err(anyhow::anyhow!(
            "{} must be between 1 and {}",
            name,
            MAX_POLL_ATTEMPTS_LIMIT
        ));
    }
    Ok(attempts)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: String,
    pub username: Option<String>,
    pub user_mode: Option<UserMode>,
    pub directions_api_key: Option<String>,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub http_timeout_secs: u64,
    pub abandon_policy: AbandonPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_source<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_poll_attempts = match get("MATCH_MAX_ATTEMPTS") {
            Some(raw) => parse_max_attempts("MATCH_MAX_ATTEMPTS", &raw)?,
            None => DEFAULT_MAX_POLL_ATTEMPTS,
        };

        let user_mode = match get("RIDE_USER_MODE").filter(|v| !v.is_empty()) {
            Some(raw) => Some(raw.parse::<UserMode>()?),
            None => None,
        };

        let abandon_policy = match get("ABANDON_POLICY") {
            Some(raw) => raw.parse()?,
            None => AbandonPolicy::default(),
        };

        Ok(Self {
            api_url: get("RIDE_API_URL")
                .ok_or_else(|| anyhow::anyhow!("RIDE_API_URL must be set"))?,
            api_token: get("RIDE_API_TOKEN")
                .ok_or_else(|| anyhow::anyhow!("RIDE_API_TOKEN must be set"))?,
            username: get("RIDE_USERNAME").filter(|v| !v.is_empty()),
            user_mode,
            directions_api_key: get("DIRECTIONS_API_KEY").filter(|v| !v.is_empty()),
            poll_interval_secs: get("MATCH_POLL_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            max_poll_attempts,
            http_timeout_secs: get("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            abandon_policy,
        })
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_poll_attempts,
            abandon_policy: self.abandon_policy,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_source(source(&[
            ("RIDE_API_URL", "http://localhost:8000/api"),
            ("RIDE_API_TOKEN", "abc123"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(config.max_poll_attempts, DEFAULT_MAX_POLL_ATTEMPTS);
        assert_eq!(config.abandon_policy, AbandonPolicy::KeepActive);
        assert!(config.directions_api_key.is_none());
        assert!(config.user_mode.is_none());

        let settings = config.poll_settings();
        assert_eq!(settings.interval, Duration::from_secs(5));
        assert_eq!(settings.max_attempts, 3);
    }

    #[test]
    fn test_missing_required_values() {
        let err = Config::from_source(source(&[("RIDE_API_TOKEN", "abc123")])).unwrap_err();
        assert!(err.to_string().contains("RIDE_API_URL"));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = Config::from_source(source(&[
            ("RIDE_API_URL", "http://localhost:8000/api"),
            ("RIDE_API_TOKEN", "abc123"),
            ("MATCH_MAX_ATTEMPTS", "5"),
            ("MATCH_POLL_INTERVAL_SECS", "not-a-number"),
            ("ABANDON_POLICY", "delete"),
            ("RIDE_USER_MODE", "Driver"),
        ]))
        .unwrap();

        assert_eq!(config.max_poll_attempts, 5);
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(config.abandon_policy, AbandonPolicy::DeleteRide);
        assert_eq!(config.user_mode, Some(UserMode::Driver));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let result = Config::from_source(source(&[
            ("RIDE_API_URL", "http://localhost:8000/api"),
            ("RIDE_API_TOKEN", "abc123"),
            ("MATCH_MAX_ATTEMPTS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_attempt_budget_bounds() {
        assert_eq!(parse_max_attempts("--max-attempts", "1").unwrap(), 1);
        assert_eq!(
            parse_max_attempts("--max-attempts", &MAX_POLL_ATTEMPTS_LIMIT.to_string()).unwrap(),
            MAX_POLL_ATTEMPTS_LIMIT
        );

        let err = parse_max_attempts("--max-attempts", "1000000").unwrap_err();
        assert!(err.to_string().contains("--max-attempts must be between 1 and"));
        assert!(parse_max_attempts("--max-attempts", "0").is_err());
        assert!(parse_max_attempts("--max-attempts", "-3").is_err());

        let result = Config::from_source(source(&[
            ("RIDE_API_URL", "http://localhost:8000/api"),
            ("RIDE_API_TOKEN", "abc123"),
            ("MATCH_MAX_ATTEMPTS", "21"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_user_mode() {
        let result = Config::from_source(source(&[
            ("RIDE_API_URL", "http://localhost:8000/api"),
            ("RIDE_API_TOKEN", "abc123"),
            ("RIDE_USER_MODE", "pilot"),
        ]));
        assert!(result.is_err());
    }
}
