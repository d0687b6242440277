use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::constants::RIDES_PATH;
use crate::error::BackendError;
use crate::models::{CreatedRide, MatchResponse, RideId, RideRequest};
use super::session::Session;

/// The ride endpoints the match flow consumes.
#[async_trait]
pub trait RideBackend: Send + Sync {
    /// `POST /rides/`
    async fn create_ride(&self, ride: &RideRequest) -> Result<CreatedRide, BackendError>;

    /// `GET /rides/{id}/matches/`
    async fn get_matches(&self, ride_id: RideId) -> Result<MatchResponse, BackendError>;

    /// `DELETE /rides/{id}/`
    async fn delete_ride(&self, ride_id: RideId) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpRideBackend {
    client: Client,
    base_url: String,
    session: Session,
}

impl HttpRideBackend {
    pub fn new(base_url: &str, session: Session, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn rides_url(&self) -> String {
        format!("{}/{}/", self.base_url, RIDES_PATH)
    }

    pub fn ride_url(&self, ride_id: RideId) -> String {
        format!("{}/{}/{}/", self.base_url, RIDES_PATH, ride_id)
    }

    pub fn matches_url(&self, ride_id: RideId) -> String {
        format!("{}/{}/{}/matches/", self.base_url, RIDES_PATH, ride_id)
    }
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl RideBackend for HttpRideBackend {
    async fn create_ride(&self, ride: &RideRequest) -> Result<CreatedRide, BackendError> {
        tracing::debug!(
            "Creating {} ride from '{}' to '{}'",
            ride.ride_type,
            ride.pickup.address,
            ride.dropoff.address
        );

        let response = self
            .client
            .post(self.rides_url())
            .header("Authorization", self.session.authorization())
            .json(&ride.to_body())
            .send()
            .await?;

        decode(ensure_success(response).await?).await
    }

    async fn get_matches(&self, ride_id: RideId) -> Result<MatchResponse, BackendError> {
        let response = self
            .client
            .get(self.matches_url(ride_id))
            .header("Authorization", self.session.authorization())
            .send()
            .await?;

        decode(ensure_success(response).await?).await
    }

    async fn delete_ride(&self, ride_id: RideId) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.ride_url(ride_id))
            .header("Authorization", self.session.authorization())
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}
