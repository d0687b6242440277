use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GeoError;
use crate::utils::geo::Coordinate;

/// Backend-assigned ride identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideId(pub i64);

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideType {
    /// A driver offering seats.
    Offer,
    /// A passenger looking for a driver.
    Request,
    /// A parcel looking for a courier.
    Parcel,
}

impl RideType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideType::Offer => "offer",
            RideType::Request => "request",
            RideType::Parcel => "parcel",
        }
    }
}

impl fmt::Display for RideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offer" | "driver" => Ok(RideType::Offer),
            "request" | "passenger" => Ok(RideType::Request),
            "parcel" => Ok(RideType::Parcel),
            other => Err(anyhow::anyhow!("Unknown ride type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, address: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            address: address.into(),
        }
    }

    pub fn coordinate(&self) -> Result<Coordinate, GeoError> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A ride as supplied by the caller, before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct RideRequest {
    pub ride_type: RideType,
    pub pickup: Location,
    pub dropoff: Location,
    /// `None` lets the backend default to now.
    pub departure_time: Option<DateTime<Utc>>,
}

impl RideRequest {
    pub fn new(ride_type: RideType, pickup: Location, dropoff: Location) -> Self {
        Self {
            ride_type,
            pickup,
            dropoff,
            departure_time: None,
        }
    }

    pub fn departing_at(mut self, departure_time: DateTime<Utc>) -> Self {
        self.departure_time = Some(departure_time);
        self
    }

    pub fn to_body(&self) -> CreateRideBody {
        CreateRideBody {
            ride_type: self.ride_type,
            pickup_name: self.pickup.address.clone(),
            pickup_lat: self.pickup.latitude,
            pickup_lng: self.pickup.longitude,
            dropoff_name: self.dropoff.address.clone(),
            dropoff_lat: self.dropoff.latitude,
            dropoff_lng: self.dropoff.longitude,
            departure_time: self.departure_time,
        }
    }
}

/// Wire body for `POST /rides/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRideBody {
    pub ride_type: RideType,
    pub pickup_name: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_name: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<DateTime<Utc>>,
}

/// The subset of the create response the client keeps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedRide {
    pub id: RideId,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> RideRequest {
        RideRequest::new(
            RideType::Parcel,
            Location::new(51.5074, -0.1278, "Trafalgar Square"),
            Location::new(51.5155, -0.0922, "Bank"),
        )
    }

    #[test]
    fn test_body_omits_missing_departure_time() {
        let body = serde_json::to_value(sample().to_body()).unwrap();

        assert_eq!(body["ride_type"], "parcel");
        assert_eq!(body["pickup_name"], "Trafalgar Square");
        assert_eq!(body["dropoff_lng"], -0.0922);
        assert!(body.get("departure_time").is_none());
    }

    #[test]
    fn test_body_includes_departure_time() {
        let departure = Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap();
        let body = serde_json::to_value(sample().departing_at(departure).to_body()).unwrap();

        assert_eq!(body["departure_time"], "2026-10-16T08:30:00Z");
    }

    #[test]
    fn test_created_ride_ignores_extra_fields() {
        let created: CreatedRide = serde_json::from_str(
            r#"{"id": 42, "ride_type": "offer", "username": "sam", "is_active": true}"#,
        )
        .unwrap();

        assert_eq!(created.id, RideId(42));
        assert_eq!(created.is_active, Some(true));
    }

    #[test]
    fn test_ride_type_parsing() {
        assert_eq!("driver".parse::<RideType>().unwrap(), RideType::Offer);
        assert_eq!("Passenger".parse::<RideType>().unwrap(), RideType::Request);
        assert_eq!("parcel".parse::<RideType>().unwrap(), RideType::Parcel);
        assert!("bike".parse::<RideType>().is_err());
    }
}
