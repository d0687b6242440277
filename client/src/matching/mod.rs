//! Lifecycle of a single ride request: submit, poll for a match, resolve.

pub mod controller;
pub mod machine;
pub mod settings;
pub mod timer;

pub use controller::RideMatchController;
pub use machine::{Contact, MatchOutcome, PollState, RideMatchMachine, RideMatchState, Transition};
pub use settings::{AbandonPolicy, PollSettings};
pub use timer::PollTimer;
