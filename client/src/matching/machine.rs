//! Synchronous core of the ride match flow.
//!
//! The machine owns the state and poll counters but performs no I/O and
//! holds no timer. The controller feeds it creation results, timer ticks and
//! lookup responses, and acts on the returned [`Transition`]. Tests drive it
//! tick by tick directly.

use crate::constants::SAVED_RIDE_MESSAGE;
use crate::error::{BackendError, MatchError};
use crate::models::{CreatedRide, MatchResponse, MatchedRide, RideId, RideRequest};
use crate::utils::geo::{estimate_eta, Eta};

/// Who to call or message once matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub ride_id: RideId,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// Our own ride.
    pub ride_id: RideId,
    pub matched: MatchedRide,
    /// `None` when the matched pickup had unusable coordinates.
    pub eta: Option<Eta>,
}

impl MatchOutcome {
    pub fn contact(&self) -> Contact {
        Contact {
            ride_id: self.matched.id,
            name: self.matched.user.name.clone(),
            phone: self.matched.user.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RideMatchState {
    Idle,
    Creating,
    Polling { ride_id: RideId },
    Matched(MatchOutcome),
    /// Stored unmatched on the backend; it will be matched later.
    Saved { ride_id: RideId, message: String },
    Failed(MatchError),
}

impl RideMatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RideMatchState::Matched(_) | RideMatchState::Saved { .. } | RideMatchState::Failed(_)
        )
    }

    pub fn ride_id(&self) -> Option<RideId> {
        match self {
            RideMatchState::Polling { ride_id } | RideMatchState::Saved { ride_id, .. } => Some(*ride_id),
            RideMatchState::Matched(outcome) => Some(outcome.ride_id),
            RideMatchState::Idle | RideMatchState::Creating | RideMatchState::Failed(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RideMatchState::Idle => "idle",
            RideMatchState::Creating => "creating",
            RideMatchState::Polling { .. } => "searching",
            RideMatchState::Matched(_) => "matched",
            RideMatchState::Saved { .. } => "saved",
            RideMatchState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollState {
    /// Responses interpreted so far.
    pub attempt_count: u32,
    /// Lookups started so far; never above the attempt budget.
    pub lookups_issued: u32,
    pub match_found: bool,
    pub exhausted: bool,
}

/// What the driver has to do after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Ride created; start the poll timer.
    StartPolling(RideId),
    /// Still searching; keep the timer running.
    Continue,
    /// Terminal state reached; cancel the timer.
    Stop,
    /// Input arrived in a state that no longer accepts it and was dropped.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct RideMatchMachine {
    request: RideRequest,
    max_attempts: u32,
    state: RideMatchState,
    poll: PollState,
}

impl RideMatchMachine {
    pub fn new(request: RideRequest, max_attempts: u32) -> Self {
        Self {
            request,
            max_attempts: max_attempts.max(1),
            state: RideMatchState::Idle,
            poll: PollState::default(),
        }
    }

    pub fn request(&self) -> &RideRequest {
        &self.request
    }

    pub fn state(&self) -> &RideMatchState {
        &self.state
    }

    pub fn poll_state(&self) -> PollState {
        self.poll
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The ride id while a search is still unresolved.
    pub fn pending_ride(&self) -> Option<RideId> {
        match self.state {
            RideMatchState::Polling { ride_id } => Some(ride_id),
            _ => None,
        }
    }

    /// Moves to `Creating`, or straight to `Failed` when either endpoint of
    /// the request is not a valid coordinate.
    pub fn begin(&mut self) -> Result<(), MatchError> {
        if self.state != RideMatchState::Idle {
            return Err(MatchError::AlreadyStarted);
        }
        if let Err(e) = self
            .request
            .pickup
            .coordinate()
            .and(self.request.dropoff.coordinate())
        {
            let error = MatchError::from(e);
            self.state = RideMatchState::Failed(error.clone());
            return Err(error);
        }
        self.state = RideMatchState::Creating;
        Ok(())
    }

    pub fn on_created(&mut self, result: Result<CreatedRide, BackendError>) -> Transition {
        if self.state != RideMatchState::Creating {
            return Transition::Discarded;
        }

        match result {
            Ok(created) => {
                self.poll = PollState::default();
                self.state = RideMatchState::Polling { ride_id: created.id };
                Transition::StartPolling(created.id)
            }
            Err(e) => {
                self.state = RideMatchState::Failed(MatchError::CreationFailed(e.to_string()));
                Transition::Stop
            }
        }
    }

    /// Returns the ride to look up on this tick, if a lookup is still allowed.
    pub fn on_tick(&mut self) -> Option<RideId> {
        let ride_id = self.pending_ride()?;
        if self.poll.lookups_issued >= self.max_attempts {
            return None;
        }
        self.poll.lookups_issued += 1;
        Some(ride_id)
    }

    pub fn on_lookup(&mut self, result: Result<MatchResponse, BackendError>) -> Transition {
        let Some(ride_id) = self.pending_ride() else {
            return Transition::Discarded;
        };

        self.poll.attempt_count += 1;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.state = RideMatchState::Failed(MatchError::PollFailed(e.to_string()));
                return Transition::Stop;
            }
        };

        if let Some(matched) = response.matched {
            let eta = self.eta_to(&matched);
            self.poll.match_found = true;
            self.state = RideMatchState::Matched(MatchOutcome {
                ride_id,
                matched,
                eta,
            });
            return Transition::Stop;
        }

        if self.poll.attempt_count >= self.max_attempts {
            self.poll.exhausted = true;
            self.state = RideMatchState::Saved {
                ride_id,
                message: SAVED_RIDE_MESSAGE.to_string(),
            };
            return Transition::Stop;
        }

        Transition::Continue
    }

    fn eta_to(&self, matched: &MatchedRide) -> Option<Eta> {
        let from = self.request.pickup.coordinate();
        let to = matched.pickup.coordinate();

        match (from, to) {
            (Ok(from), Ok(to)) => Some(estimate_eta(from, to)),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Cannot estimate ETA for matched ride {}: {}", matched.id, e);
                None
            }
        }
    }
}
