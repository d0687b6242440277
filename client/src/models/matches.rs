use serde::{Deserialize, Serialize};

use super::rides::RideId;
use crate::error::GeoError;
use crate::utils::geo::Coordinate;

/// Response of `GET /rides/{id}/matches/`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(rename = "match", default)]
    pub matched: Option<MatchedRide>,
}

impl MatchResponse {
    pub fn none() -> Self {
        Self { matched: None }
    }

    pub fn with(ride: MatchedRide) -> Self {
        Self {
            matched: Some(ride),
        }
    }
}

/// The counterpart ride chosen by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRide {
    pub id: RideId,
    pub pickup: MatchPoint,
    #[serde(default)]
    pub dropoff: Option<MatchPoint>,
    pub user: MatchUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub name: Option<String>,
}

impl MatchPoint {
    pub fn coordinate(&self) -> Result<Coordinate, GeoError> {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchUser {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}
