//! User-facing notification texts.

use crate::entities::ride::Ride;

pub fn interest(ride: &Ride) -> String {
    format!("Someone has shown interest in your ride from {}.", ride.route())
}

pub fn accepted(ride: &Ride) -> String {
    format!("You've been accepted for the ride from {}", ride.route())
}

pub fn rejected(ride: &Ride) -> String {
    format!(
        "Your request for the ride from {} was not accepted.",
        ride.route()
    )
}

pub fn started(ride: &Ride) -> String {
    format!("Your ride from {} has started.", ride.route())
}

pub fn completed(ride: &Ride) -> String {
    format!("Your ride from {} has been completed.", ride.route())
}

/// Sent to the creator when an accepted rider pulls out.
pub fn rider_cancelled(ride: &Ride, reason: &str) -> String {
    format!(
        "A rider has cancelled their participation in your ride from {}. Reason: {reason}",
        ride.route()
    )
}

pub fn ride_cancelled(ride: &Ride, by_creator: bool, reason: &str) -> String {
    let by = if by_creator { "Creator" } else { "Rider" };
    format!(
        "Ride from {} was cancelled by {by}. Reason: {reason}",
        ride.route()
    )
}
