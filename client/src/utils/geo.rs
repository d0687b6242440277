//! Great-circle estimates used when no routing result is available.
//!
//! Distances use the haversine formula on a spherical Earth. Travel time
//! assumes a fixed average speed, which is coarse but always available.

use serde::{Deserialize, Serialize};

use crate::constants::{AVERAGE_SPEED_KMH, EARTH_RADIUS_KM};
use crate::error::GeoError;

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(GeoError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtaSource {
    Directions,
    Haversine,
}

/// Estimated travel duration, with its display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eta {
    pub minutes: u32,
    pub text: String,
    pub source: EtaSource,
}

/// Great-circle distance in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Driving minutes at the assumed average speed, rounded to the nearest minute.
pub fn estimate_minutes(from: Coordinate, to: Coordinate) -> u32 {
    let hours = haversine_km(from, to) / AVERAGE_SPEED_KMH;
    (hours * 60.0).round() as u32
}

/// Renders `45 mins`, `1 hours`, `1 hours 30 mins`.
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{} mins", minutes);
    }

    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{} hours", hours)
    } else {
        format!("{} hours {} mins", hours, rest)
    }
}

pub fn estimate_eta(from: Coordinate, to: Coordinate) -> Eta {
    let minutes = estimate_minutes(from, to);
    Eta {
        minutes,
        text: format_duration(minutes),
        source: EtaSource::Haversine,
    }
}

/// Position of a point relative to a route from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteMetrics {
    /// Length of the route itself.
    pub route_km: f64,
    /// Distance of the point from the route's great circle.
    pub cross_track_km: f64,
    /// Distance from `start` to the point's projection on the route.
    pub along_track_km: f64,
}

fn initial_bearing(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();
    y.atan2(x)
}

pub fn route_metrics(start: Coordinate, end: Coordinate, point: Coordinate) -> RouteMetrics {
    let route_km = haversine_km(start, end);
    let start_to_point_km = haversine_km(start, point);

    let delta_bearing = initial_bearing(start, point) - initial_bearing(start, end);
    let angular = start_to_point_km / EARTH_RADIUS_KM;

    let cross_track = ((angular.sin() * delta_bearing.sin()).clamp(-1.0, 1.0)).asin();
    let along_track = ((angular.cos() / cross_track.cos()).clamp(-1.0, 1.0)).acos();

    RouteMetrics {
        route_km,
        cross_track_km: (cross_track * EARTH_RADIUS_KM).abs(),
        along_track_km: along_track * EARTH_RADIUS_KM,
    }
}

/// Whether `point` lies within `max_deviation_ratio` of the route length from
/// the route, and not past its end.
pub fn is_point_on_route(
    start: Coordinate,
    end: Coordinate,
    point: Coordinate,
    max_deviation_ratio: f64,
) -> bool {
    let metrics = route_metrics(start, end, point);
    let max_deviation_km = metrics.route_km * max_deviation_ratio;

    metrics.cross_track_km <= max_deviation_km
        && metrics.along_track_km >= 0.0
        && metrics.along_track_km <= metrics.route_km
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_ROUTE_DEVIATION_RATIO;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert_eq!(
            Coordinate::new(90.5, 0.0),
            Err(GeoError::InvalidCoordinate {
                latitude: 90.5,
                longitude: 0.0
            })
        );
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_haversine_symmetry_and_identity() {
        let pairs = [
            (coord(51.5074, -0.1278), coord(48.8566, 2.3522)),
            (coord(-33.8688, 151.2093), coord(35.6762, 139.6503)),
            (coord(0.0, 179.9), coord(0.0, -179.9)),
        ];

        for (a, b) in pairs {
            let forward = haversine_km(a, b);
            let backward = haversine_km(b, a);
            assert!((forward - backward).abs() < 1e-9, "{} vs {}", forward, backward);
            assert_eq!(haversine_km(a, a), 0.0);
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // London to Paris is roughly 344 km
        let distance = haversine_km(coord(51.5074, -0.1278), coord(48.8566, 2.3522));
        assert!((distance - 343.5).abs() < 1.5, "distance was {}", distance);
    }

    #[test]
    fn test_forty_km_is_about_an_hour() {
        let delta_degrees = (40.0 / EARTH_RADIUS_KM).to_degrees();
        let minutes = estimate_minutes(coord(10.0, 20.0), coord(10.0 + delta_degrees, 20.0));
        assert!((59..=61).contains(&minutes), "minutes was {}", minutes);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0 mins");
        assert_eq!(format_duration(45), "45 mins");
        assert_eq!(format_duration(59), "59 mins");
        assert_eq!(format_duration(60), "1 hours");
        assert_eq!(format_duration(90), "1 hours 30 mins");
        assert_eq!(format_duration(125), "2 hours 5 mins");
        assert_eq!(format_duration(180), "3 hours");
    }

    #[test]
    fn test_estimate_eta_same_point() {
        let here = coord(40.7128, -74.0060);
        let eta = estimate_eta(here, here);
        assert_eq!(eta.minutes, 0);
        assert_eq!(eta.text, "0 mins");
        assert_eq!(eta.source, EtaSource::Haversine);
    }

    #[test]
    fn test_route_metrics_along_equator() {
        let metrics = route_metrics(coord(0.0, 0.0), coord(0.0, 1.0), coord(0.1, 0.5));

        assert!((metrics.route_km - 111.19).abs() < 0.1);
        assert!((metrics.cross_track_km - 11.12).abs() < 0.1);
        assert!((metrics.along_track_km - 55.6).abs() < 0.2);
    }

    #[test]
    fn test_point_on_route() {
        let start = coord(0.0, 0.0);
        let end = coord(0.0, 1.0);

        assert!(is_point_on_route(start, end, coord(0.1, 0.5), MAX_ROUTE_DEVIATION_RATIO));
        // Too far off the route
        assert!(!is_point_on_route(start, end, coord(1.0, 0.5), MAX_ROUTE_DEVIATION_RATIO));
        // Past the end of the route
        assert!(!is_point_on_route(start, end, coord(0.0, 1.5), MAX_ROUTE_DEVIATION_RATIO));
    }
}
