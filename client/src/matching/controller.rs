use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::BackendError;
use crate::models::{CreatedRide, MatchResponse, RideRequest};
use crate::services::RideBackend;
use super::machine::{PollState, RideMatchMachine, RideMatchState, Transition};
use super::settings::{AbandonPolicy, PollSettings};
use super::timer::PollTimer;

#[derive(Debug)]
enum PollEvent {
    Created(Result<CreatedRide, BackendError>),
    Lookup(Result<MatchResponse, BackendError>),
}

enum Wake {
    Event(Option<PollEvent>),
    Tick,
}

/// Drives one ride request from submission to a terminal state.
///
/// The create call and every lookup run as their own tasks and report back on
/// one channel. Whoever is awaiting [`run`](Self::run) applies those results,
/// so state is only ever touched from that task. Timer ticks are coalesced:
/// however long `run` is not awaited, at most one tick is pending.
pub struct RideMatchController {
    backend: Arc<dyn RideBackend>,
    machine: RideMatchMachine,
    settings: PollSettings,
    timer: PollTimer,
    ticks: Arc<Notify>,
    create_task: Option<JoinHandle<()>>,
    in_flight: Vec<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<PollEvent>,
    events_rx: mpsc::UnboundedReceiver<PollEvent>,
    state_tx: watch::Sender<RideMatchState>,
    disposed: bool,
}

impl RideMatchController {
    /// Zero intervals and budgets in `settings` are raised, see
    /// [`PollSettings::normalized`].
    pub fn new(backend: Arc<dyn RideBackend>, request: RideRequest, settings: PollSettings) -> Self {
        let settings = settings.normalized();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(RideMatchState::Idle);

        Self {
            backend,
            machine: RideMatchMachine::new(request, settings.max_attempts),
            timer: PollTimer::new(settings.interval),
            settings,
            ticks: Arc::new(Notify::new()),
            create_task: None,
            in_flight: Vec::new(),
            events_tx,
            events_rx,
            state_tx,
            disposed: false,
        }
    }

    /// Observe state changes, e.g. to render loading / matched / saved.
    pub fn subscribe(&self) -> watch::Receiver<RideMatchState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> RideMatchState {
        self.machine.state().clone()
    }

    pub fn poll_state(&self) -> PollState {
        self.machine.poll_state()
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_active()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Creates the ride if needed and polls until a terminal state.
    ///
    /// Dropping the returned future leaves the request where it was (creating
    /// or searching). Call `run` again to resume, or
    /// [`dispose`](Self::dispose) to tear down. A resumed search restarts the
    /// timer, so the next lookup is one full interval away.
    pub async fn run(&mut self) -> RideMatchState {
        if self.disposed {
            warn!("run() called on a disposed ride match controller");
            return self.state();
        }

        if *self.machine.state() == RideMatchState::Idle {
            self.create();
        }

        if self.machine.pending_ride().is_some() {
            self.start_polling();
        }

        while !self.machine.state().is_terminal() {
            let ticks = self.ticks.clone();
            let wake = tokio::select! {
                event = self.events_rx.recv() => Wake::Event(event),
                _ = ticks.notified() => Wake::Tick,
            };

            match wake {
                Wake::Event(Some(event)) => self.handle(event),
                Wake::Event(None) => break,
                Wake::Tick => self.on_tick(),
            }
        }

        self.state()
    }

    fn create(&mut self) {
        if let Err(e) = self.machine.begin() {
            error!("❌ Cannot create ride: {}", e);
            self.publish();
            return;
        }
        self.publish();

        let request = self.machine.request().clone();
        info!(
            "🚕 Creating {} ride: '{}' -> '{}'",
            request.ride_type, request.pickup.address, request.dropoff.address
        );

        let backend = self.backend.clone();
        let events = self.events_tx.clone();
        self.create_task = Some(tokio::spawn(async move {
            let result = backend.create_ride(&request).await;
            let _ = events.send(PollEvent::Created(result));
        }));
    }

    /// Fresh tick source per start, so a tick left over from an earlier
    /// timer never fires a lookup.
    fn start_polling(&mut self) {
        self.ticks = Arc::new(Notify::new());
        let ticks = self.ticks.clone();
        self.timer.start(move || {
            ticks.notify_one();
            true
        });
    }

    fn handle(&mut self, event: PollEvent) {
        match event {
            PollEvent::Created(result) => self.on_created(result),
            PollEvent::Lookup(result) => self.on_lookup(result),
        }
    }

    fn on_created(&mut self, result: Result<CreatedRide, BackendError>) {
        self.create_task = None;

        match self.machine.on_created(result) {
            Transition::StartPolling(ride_id) => {
                info!(
                    "🔍 Ride {} created, searching for a match (every {:?}, up to {} attempts)",
                    ride_id,
                    self.timer.interval(),
                    self.machine.max_attempts()
                );
                self.start_polling();
            }
            Transition::Discarded => {
                debug!("Discarding creation result received outside of creating state");
                return;
            }
            _ => {
                if let RideMatchState::Failed(e) = self.machine.state() {
                    error!("❌ {}", e);
                }
            }
        }
        self.publish();
    }

    fn on_tick(&mut self) {
        self.in_flight.retain(|handle| !handle.is_finished());

        let Some(ride_id) = self.machine.on_tick() else {
            debug!("Poll budget already issued, waiting for outstanding lookups");
            return;
        };

        let poll = self.machine.poll_state();
        debug!(
            "📡 Match lookup {}/{} for ride {}",
            poll.lookups_issued,
            self.machine.max_attempts(),
            ride_id
        );

        let backend = self.backend.clone();
        let events = self.events_tx.clone();
        self.in_flight.push(tokio::spawn(async move {
            let result = backend.get_matches(ride_id).await;
            // The controller may be gone by now; the result is then moot.
            let _ = events.send(PollEvent::Lookup(result));
        }));
    }

    fn on_lookup(&mut self, result: Result<MatchResponse, BackendError>) {
        match self.machine.on_lookup(result) {
            Transition::Continue => {
                let poll = self.machine.poll_state();
                info!(
                    "⏳ No match yet ({}/{})",
                    poll.attempt_count,
                    self.machine.max_attempts()
                );
            }
            Transition::Stop => {
                self.timer.cancel();
                self.log_outcome();
            }
            Transition::Discarded => {
                debug!("Discarding match response received after resolution");
                return;
            }
            Transition::StartPolling(_) => {}
        }
        self.publish();
    }

    fn log_outcome(&self) {
        match self.machine.state() {
            RideMatchState::Matched(outcome) => {
                let contact = outcome.contact();
                info!(
                    "👫 Ride {} matched with {} (ride {}), ETA {}",
                    outcome.ride_id,
                    contact.name,
                    contact.ride_id,
                    outcome
                        .eta
                        .as_ref()
                        .map(|eta| eta.text.as_str())
                        .unwrap_or("unknown")
                );
            }
            RideMatchState::Saved { ride_id, .. } => {
                info!(
                    "💾 No match for ride {} after {} attempts, saved for later matching",
                    ride_id,
                    self.machine.poll_state().attempt_count
                );
            }
            RideMatchState::Failed(e) => error!("❌ {}", e),
            _ => {}
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.machine.state().clone());
    }

    /// Stops polling and applies the abandon policy to an unresolved ride.
    ///
    /// Safe to call more than once; only the first call does anything.
    pub async fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if self.timer.cancel() {
            debug!("Poll timer cleared");
        }
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }

        // The POST may already have reached the backend; wait for its id
        if let Some(task) = self.create_task.take() {
            if task.await.is_ok() {
                while let Ok(event) = self.events_rx.try_recv() {
                    if let PollEvent::Created(result) = event {
                        self.machine.on_created(result);
                        self.publish();
                    }
                }
            }
        }

        let Some(ride_id) = self.machine.pending_ride() else {
            return;
        };

        match self.settings.abandon_policy {
            AbandonPolicy::KeepActive => {
                warn!("⚠️ Ride {} abandoned while searching; it stays active on the backend", ride_id);
            }
            AbandonPolicy::DeleteRide => match self.backend.delete_ride(ride_id).await {
                Ok(()) => info!("🧹 Deleted abandoned ride {}", ride_id),
                Err(e) => error!("❌ Failed to delete abandoned ride {}: {}", ride_id, e),
            },
        }
    }
}

impl Drop for RideMatchController {
    fn drop(&mut self) {
        if let Some(handle) = self.create_task.take() {
            handle.abort();
        }
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_request, ScriptedBackend};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_progress() {
        let backend = Arc::new(ScriptedBackend::no_match());
        let mut controller = RideMatchController::new(
            backend.clone(),
            sample_request(),
            PollSettings {
                max_attempts: 2,
                ..PollSettings::default()
            },
        );
        let mut states = controller.subscribe();
        assert_eq!(*states.borrow(), RideMatchState::Idle);

        let final_state = controller.run().await;

        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), final_state);
        assert_eq!(final_state.label(), "saved");
        assert_eq!(controller.poll_state().attempt_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_after_dispose_does_nothing() {
        let backend = Arc::new(ScriptedBackend::no_match());
        let mut controller =
            RideMatchController::new(backend.clone(), sample_request(), PollSettings::default());

        controller.dispose().await;
        let state = controller.run().await;

        assert_eq!(state, RideMatchState::Idle);
        assert_eq!(backend.create_count(), 0);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.lookup_count(), 0);
    }
}
