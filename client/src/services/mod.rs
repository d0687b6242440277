pub mod backend;
pub mod directions;
pub mod session;

pub use backend::{HttpRideBackend, RideBackend};
pub use directions::{DirectionsClient, DirectionsProvider, eta_with_fallback};
pub use session::{Session, UserMode};
