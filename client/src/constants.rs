// =============================================================================
// Ridematch Client Constants
// =============================================================================
// This file contains all constants used throughout the client to enable
// easy tuning and configuration from a single location.

// =============================================================================
// MATCH POLLING
// =============================================================================

/// How often to ask the backend whether a match exists
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Shortest poll interval the timer will run with
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Number of match lookups before a ride is saved for later matching
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 3;

/// Upper bound accepted from configuration for the attempt budget
pub const MAX_POLL_ATTEMPTS_LIMIT: u32 = 20;

/// Message shown once a ride is stored unmatched
pub const SAVED_RIDE_MESSAGE: &str =
    "Your ride has been saved. We'll match you as soon as someone is available.";

// =============================================================================
// GEO ESTIMATION
// =============================================================================

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Assumed average driving speed when no routing result is available
pub const AVERAGE_SPEED_KMH: f64 = 40.0;

/// Maximum cross-track deviation from a driver's route, as a share of route length
pub const MAX_ROUTE_DEVIATION_RATIO: f64 = 0.30;

// =============================================================================
// RIDE BACKEND
// =============================================================================

/// Ride collection path, relative to the API base URL
pub const RIDES_PATH: &str = "rides";

/// Authorization scheme expected by the ride backend
pub const AUTH_SCHEME: &str = "Token";

/// Default per-request timeout for backend calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// DIRECTIONS API
// =============================================================================

/// Directions endpoint used for authoritative durations
pub const DIRECTIONS_API_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Timeout for a single directions lookup
pub const DIRECTIONS_TIMEOUT_SECS: u64 = 5;
