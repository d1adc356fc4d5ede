pub mod error;
pub mod messages;
pub mod reviews;
pub mod rides;
pub mod ws;

pub use error::ErrorBody;
pub use messages::{PostMessageRequest, RideMessageResponse};
pub use reviews::{ReviewOutcome, SubmitReviewRequest};
pub use rides::{
    CancelRideRequest, CommunicationPreference, CreateRideRequest, MyRidesResponse,
    NotificationResponse, ParticipantResponse, ParticipantStatus, PublicRideResponse, RidePreferences, RideResponse,
    RideSearchQuery, RideStatus,
};
pub use ws::{NotificationKind, WsCloseCode, WsServerMessage};
