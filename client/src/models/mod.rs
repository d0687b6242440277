pub mod matches;
pub mod rides;

pub use matches::{MatchPoint, MatchResponse, MatchUser, MatchedRide};
pub use rides::{CreateRideBody, CreatedRide, Location, RideId, RideRequest, RideType};
