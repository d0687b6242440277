use std::fmt;
use std::str::FromStr;

use crate::constants::AUTH_SCHEME;
use crate::utils::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMode {
    Driver,
    Passenger,
}

impl FromStr for UserMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driver" => Ok(UserMode::Driver),
            "passenger" => Ok(UserMode::Passenger),
            other => Err(anyhow::anyhow!("Unknown user mode: {}", other)),
        }
    }
}

/// Credentials of the signed-in user.
///
/// Built once by whoever owns sign-in and handed to the services that call
/// the backend. Dropping it is the teardown.
#[derive(Clone)]
pub struct Session {
    token: String,
    username: Option<String>,
    mode: Option<UserMode>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: None,
            mode: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut session = Self::new(config.api_token.clone());
        if let Some(username) = &config.username {
            session = session.with_username(username.clone());
        }
        if let Some(mode) = config.user_mode {
            session = session.with_mode(mode);
        }
        session
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_mode(mut self, mode: UserMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn mode(&self) -> Option<UserMode> {
        self.mode
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", AUTH_SCHEME, self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("mode", &self.mode)
            .finish()
    }
}
