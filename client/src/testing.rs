//! In-memory ride backend with scripted match responses, for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::BackendError;
use crate::models::{
    CreatedRide, Location, MatchPoint, MatchResponse, MatchUser, MatchedRide, RideId, RideRequest,
    RideType,
};
use crate::services::RideBackend;

/// Ride id handed out by [`ScriptedBackend::create_ride`].
pub const SCRIPTED_RIDE_ID: RideId = RideId(101);

/// One scripted answer to a match lookup.
#[derive(Debug, Clone)]
pub enum Scripted {
    NoMatch,
    Match(MatchedRide),
    /// Backend answers with this HTTP status.
    Fail(u16),
}

#[derive(Debug)]
pub struct ScriptedBackend {
    fail_create: bool,
    script: Mutex<VecDeque<Scripted>>,
    create_delay: Duration,
    lookup_delay: Duration,
    creates: AtomicU32,
    lookups: AtomicU32,
    lookup_times: Mutex<Vec<Instant>>,
    deleted: Mutex<Vec<RideId>>,
}

impl ScriptedBackend {
    /// Lookups answer in script order, then `NoMatch` forever.
    pub fn with_script(script: Vec<Scripted>) -> Self {
        Self {
            fail_create: false,
            script: Mutex::new(script.into()),
            create_delay: Duration::ZERO,
            lookup_delay: Duration::ZERO,
            creates: AtomicU32::new(0),
            lookups: AtomicU32::new(0),
            lookup_times: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn no_match() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::no_match()
        }
    }

    /// The create call takes this long to answer.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    /// Every lookup takes this long to answer.
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn create_count(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn lookup_count(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    /// When each lookup reached the backend.
    pub fn lookup_times(&self) -> Vec<Instant> {
        self.lookup_times.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn deleted(&self) -> Vec<RideId> {
        self.deleted.lock().map(|d| d.clone()).unwrap_or_default()
    }

    fn next_answer(&self) -> Scripted {
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or(Scripted::NoMatch)
    }
}

#[async_trait]
impl RideBackend for ScriptedBackend {
    async fn create_ride(&self, _ride: &RideRequest) -> Result<CreatedRide, BackendError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
        if self.fail_create {
            return Err(BackendError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(CreatedRide {
            id: SCRIPTED_RIDE_ID,
            is_active: Some(true),
        })
    }

    async fn get_matches(&self, _ride_id: RideId) -> Result<MatchResponse, BackendError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut times) = self.lookup_times.lock() {
            times.push(Instant::now());
        }
        let answer = self.next_answer();

        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }

        match answer {
            Scripted::NoMatch => Ok(MatchResponse::none()),
            Scripted::Match(ride) => Ok(MatchResponse::with(ride)),
            Scripted::Fail(status) => Err(BackendError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
        }
    }

    async fn delete_ride(&self, ride_id: RideId) -> Result<(), BackendError> {
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(ride_id);
        }
        Ok(())
    }
}

/// Passenger request picking up at (10.0, 20.0).
pub fn sample_request() -> RideRequest {
    RideRequest::new(
        RideType::Request,
        Location::new(10.0, 20.0, "Market Street"),
        Location::new(10.3, 20.2, "Harbour Road"),
    )
}

/// A driver offer picking up at the given point.
pub fn matched_ride_at(lat: f64, lng: f64) -> MatchedRide {
    MatchedRide {
        id: RideId(202),
        pickup: MatchPoint {
            lat,
            lng,
            name: Some("Depot".to_string()),
        },
        dropoff: None,
        user: MatchUser {
            id: Some(9),
            name: "morgan".to_string(),
            phone: Some("+15550142".to_string()),
        },
    }
}
