use thiserror::Error;

/// Errors from the geo estimator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// Errors talking to the ride backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Terminal failures of a ride match request.
///
/// Payloads are rendered strings so the error can live inside the observable
/// (cloneable) controller state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("could not create ride: {0}")]
    CreationFailed(String),

    #[error("match lookup failed: {0}")]
    PollFailed(String),

    #[error(transparent)]
    InvalidCoordinate(#[from] GeoError),

    #[error("ride request already started")]
    AlreadyStarted,
}
