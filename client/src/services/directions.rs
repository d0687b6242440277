use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::constants::{DIRECTIONS_API_URL, DIRECTIONS_TIMEOUT_SECS};
use crate::error::BackendError;
use crate::utils::geo::{estimate_eta, Coordinate, Eta, EtaSource};

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    duration: Option<LegDuration>,
}

#[derive(Debug, Deserialize)]
struct LegDuration {
    /// Seconds.
    value: u64,
    text: String,
}

/// A routing service that can give an authoritative driving duration.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// `Ok(None)` when the service answered but had no duration.
    async fn driving_eta(&self, from: Coordinate, to: Coordinate) -> Result<Option<Eta>, BackendError>;
}

#[derive(Debug, Clone)]
pub struct DirectionsClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl DirectionsClient {
    pub fn new(api_key: String) -> Result<Self, BackendError> {
        Self::with_endpoint(api_key, DIRECTIONS_API_URL)
    }

    pub fn with_endpoint(api_key: String, endpoint: &str) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DIRECTIONS_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.to_string(),
        })
    }
}

fn first_leg_eta(response: DirectionsResponse) -> Option<Eta> {
    let duration = response
        .routes
        .into_iter()
        .next()?
        .legs
        .into_iter()
        .next()?
        .duration?;

    Some(Eta {
        minutes: ((duration.value as f64) / 60.0).round() as u32,
        text: duration.text,
        source: EtaSource::Directions,
    })
}

#[async_trait]
impl DirectionsProvider for DirectionsClient {
    async fn driving_eta(&self, from: Coordinate, to: Coordinate) -> Result<Option<Eta>, BackendError> {
        let origin = format!("{},{}", from.latitude(), from.longitude());
        let destination = format!("{},{}", to.latitude(), to.longitude());

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origin", origin.as_str()),
                ("destination", destination.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let parsed: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(first_leg_eta(parsed))
    }
}

/// Asks the routing service first and falls back to the haversine estimate
/// when it is absent, fails, or has no duration.
pub async fn eta_with_fallback(
    directions: Option<&dyn DirectionsProvider>,
    from: Coordinate,
    to: Coordinate,
) -> Eta {
    let Some(directions) = directions else {
        return estimate_eta(from, to);
    };

    match directions.driving_eta(from, to).await {
        Ok(Some(eta)) => eta,
        Ok(None) => {
            tracing::debug!("Directions returned no duration, using haversine estimate");
            estimate_eta(from, to)
        }
        Err(e) => {
            tracing::warn!("Failed to fetch directions: {}, falling back to haversine estimate", e);
            estimate_eta(from, to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDirections(Result<Option<Eta>, u16>);

    #[async_trait]
    impl DirectionsProvider for FixedDirections {
        async fn driving_eta(&self, _from: Coordinate, _to: Coordinate) -> Result<Option<Eta>, BackendError> {
            match &self.0 {
                Ok(eta) => Ok(eta.clone()),
                Err(status) => Err(BackendError::Status {
                    status: *status,
                    body: "quota exceeded".to_string(),
                }),
            }
        }
    }

    fn points() -> (Coordinate, Coordinate) {
        let delta = (40.0 / crate::constants::EARTH_RADIUS_KM).to_degrees();
        (
            Coordinate::new(10.0, 20.0).unwrap(),
            Coordinate::new(10.0 + delta, 20.0).unwrap(),
        )
    }

    #[test]
    fn test_first_leg_duration() {
        let response: DirectionsResponse = serde_json::from_str(
            r#"{"routes": [{"legs": [{"duration": {"value": 1500, "text": "25 mins"}}]}], "status": "OK"}"#,
        )
        .unwrap();

        let eta = first_leg_eta(response).unwrap();
        assert_eq!(eta.minutes, 25);
        assert_eq!(eta.text, "25 mins");
        assert_eq!(eta.source, EtaSource::Directions);
    }

    #[test]
    fn test_no_routes() {
        let response: DirectionsResponse =
            serde_json::from_str(r#"{"routes": [], "status": "ZERO_RESULTS"}"#).unwrap();
        assert!(first_leg_eta(response).is_none());
    }

    #[tokio::test]
    async fn test_prefers_directions() {
        let (from, to) = points();
        let directions = FixedDirections(Ok(Some(Eta {
            minutes: 72,
            text: "1 hour 12 mins".to_string(),
            source: EtaSource::Directions,
        })));

        let eta = eta_with_fallback(Some(&directions), from, to).await;
        assert_eq!(eta.text, "1 hour 12 mins");
    }

    #[tokio::test]
    async fn test_falls_back_on_error_and_missing_duration() {
        let (from, to) = points();

        let failing = FixedDirections(Err(429));
        let eta = eta_with_fallback(Some(&failing), from, to).await;
        assert_eq!(eta.source, EtaSource::Haversine);
        assert_eq!(eta.text, "1 hours");

        let empty = FixedDirections(Ok(None));
        let eta = eta_with_fallback(Some(&empty), from, to).await;
        assert_eq!(eta.source, EtaSource::Haversine);

        let eta = eta_with_fallback(None, from, to).await;
        assert_eq!(eta.source, EtaSource::Haversine);
    }
}
