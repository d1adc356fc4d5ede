//! Participant bookkeeping on a ride document.
//!
//! These functions only touch the in-memory [`Ride`]; persisting the change
//! is the caller's job, together with whatever else it mutated.

use crate::entities::ParticipantStatus;
use crate::entities::ride::{Participant, Ride};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("the ride creator cannot express interest in their own ride")]
    SelfInterestForbidden,
    #[error("interest already expressed")]
    DuplicateInterest,
}

/// Append an `interested` participant for `user_id`.
pub fn add_interest(
    ride: &mut Ride,
    user_id: Uuid,
    now: OffsetDateTime,
) -> Result<&Participant, RegistryError> {
    if ride.is_creator(user_id) {
        return Err(RegistryError::SelfInterestForbidden);
    }
    if find_by_user(ride, user_id).is_some() {
        return Err(RegistryError::DuplicateInterest);
    }
    ride.participants.push(Participant {
        user: user_id,
        status: ParticipantStatus::Interested,
        joined_at: now,
    });
    Ok(&ride.participants[ride.participants.len() - 1])
}

pub fn find_by_user(ride: &Ride, user_id: Uuid) -> Option<&Participant> {
    ride.participants.iter().find(|p| p.user == user_id)
}

pub fn find_by_user_mut(ride: &mut Ride, user_id: Uuid) -> Option<&mut Participant> {
    ride.participants.iter_mut().find(|p| p.user == user_id)
}

/// Unconditional. The caller has already checked the transition is legal.
pub fn set_status(participant: &mut Participant, status: ParticipantStatus) {
    participant.status = status;
}
