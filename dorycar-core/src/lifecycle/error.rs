use crate::registry::RegistryError;
use crate::store::StoreError;

/// Coarse outcome class, one per HTTP status family the API maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Forbidden,
    Conflict,
    BadRequest,
    /// Retryable.
    Unavailable,
    ServerError,
}

#[derive(Debug, thiserror::Error)]
pub enum RideError {
    #[error("ride not found")]
    NotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    InvalidState(String),
    #[error("you cannot express interest in your own ride")]
    SelfInterestForbidden,
    #[error("you have already expressed interest in this ride")]
    DuplicateInterest,
    #[error("this user has already been accepted")]
    AlreadyAccepted,
    #[error("this user has not expressed interest in the ride")]
    NoSuchInterest,
    #[error("cannot start a ride without accepted riders")]
    NoAcceptedParticipants,
    #[error("please complete your profile before creating a ride")]
    IncompleteProfile { missing_fields: Vec<String> },
    #[error("invalid ride: {0}")]
    InvalidRide(String),
    #[error("rating must be between 1 and 5")]
    InvalidRating,
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("the ride was modified concurrently, please retry")]
    ConcurrentModification,
    #[error("storage did not respond in time, please retry")]
    Timeout,
    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),
}

impl RideError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RideError::NotFound | RideError::UserNotFound | RideError::NoSuchInterest => {
                ErrorClass::NotFound
            }
            RideError::Forbidden(_) => ErrorClass::Forbidden,
            RideError::InvalidState(_)
            | RideError::DuplicateInterest
            | RideError::AlreadyAccepted
            | RideError::ConcurrentModification => ErrorClass::Conflict,
            RideError::SelfInterestForbidden
            | RideError::NoAcceptedParticipants
            | RideError::IncompleteProfile { .. }
            | RideError::InvalidRide(_)
            | RideError::InvalidRating
            | RideError::InvalidMessage(_) => ErrorClass::BadRequest,
            RideError::Timeout => ErrorClass::Unavailable,
            RideError::Storage(_) => ErrorClass::ServerError,
        }
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        RideError::InvalidState(message.into())
    }
}

impl From<StoreError> for RideError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => RideError::Storage(e),
            StoreError::Conflict => RideError::ConcurrentModification,
            StoreError::NotFound => RideError::NotFound,
        }
    }
}

impl From<RegistryError> for RideError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::SelfInterestForbidden => RideError::SelfInterestForbidden,
            RegistryError::DuplicateInterest => RideError::DuplicateInterest,
        }
    }
}
