pub mod constants;
pub mod error;
pub mod matching;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use error::{BackendError, GeoError, MatchError};
pub use matching::{AbandonPolicy, PollSettings, RideMatchController, RideMatchState};
pub use utils::config::Config;

// Re-export common types
pub use anyhow::Result;
pub use chrono::{DateTime, Utc};
