pub mod ride;
pub mod user;

use dorycar_sdk::objects::{
    CommunicationPreference as SdkCommunication, ParticipantStatus as SdkParticipantStatus,
    RideStatus as SdkRideStatus,
};
use serde::{Deserialize, Serialize};

/// Ride status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `dorycar_sdk::objects::RideStatus`.
///
/// `Accepted` is the status of the single-acceptor design. Rides written by
/// that design may still carry it, so it is honoured on read, but the
/// lifecycle engine never moves a ride into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase", type_name = "ride_status")]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Pending,
    Accepted,
    Started,
    Completed,
    Cancelled,
}

impl RideStatus {
    /// Completed and cancelled rides never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Whether the lifecycle graph has an edge from `self` to `next`.
    ///
    /// ```text
    /// pending -> accepted -> started -> completed
    ///    |          |           |
    ///    +----------+-----------+----> cancelled
    /// ```
    ///
    /// `pending -> started` is allowed because accepting riders happens on
    /// the participants and leaves the ride itself pending.
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Started)
                | (Accepted, Started)
                | (Started, Completed)
                | (Pending, Cancelled)
                | (Accepted, Cancelled)
                | (Started, Cancelled)
        )
    }

    /// Statuses a ride can still be joined or started from.
    pub fn is_open(self) -> bool {
        matches!(self, RideStatus::Pending | RideStatus::Accepted)
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", SdkRideStatus::from(*self))
    }
}

impl From<RideStatus> for SdkRideStatus {
    fn from(value: RideStatus) -> Self {
        match value {
            RideStatus::Pending => SdkRideStatus::Pending,
            RideStatus::Accepted => SdkRideStatus::Accepted,
            RideStatus::Started => SdkRideStatus::Started,
            RideStatus::Completed => SdkRideStatus::Completed,
            RideStatus::Cancelled => SdkRideStatus::Cancelled,
        }
    }
}

impl From<SdkRideStatus> for RideStatus {
    fn from(value: SdkRideStatus) -> Self {
        match value {
            SdkRideStatus::Pending => RideStatus::Pending,
            SdkRideStatus::Accepted => RideStatus::Accepted,
            SdkRideStatus::Started => RideStatus::Started,
            SdkRideStatus::Completed => RideStatus::Completed,
            SdkRideStatus::Cancelled => RideStatus::Cancelled,
        }
    }
}

/// Status of one user's interest in one ride.
///
/// Participants are stored inside the ride document (JSONB), so this only
/// needs serde, not sqlx::Type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Interested,
    Accepted,
    Started,
    Completed,
    Rejected,
    Cancelled,
}

impl ParticipantStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ParticipantStatus::Completed | ParticipantStatus::Rejected | ParticipantStatus::Cancelled
        )
    }

    /// Accepted riders, whether or not the ride has started or finished.
    pub fn is_acceptor(self) -> bool {
        matches!(
            self,
            ParticipantStatus::Accepted | ParticipantStatus::Started | ParticipantStatus::Completed
        )
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", SdkParticipantStatus::from(*self))
    }
}

impl From<ParticipantStatus> for SdkParticipantStatus {
    fn from(value: ParticipantStatus) -> Self {
        match value {
            ParticipantStatus::Interested => SdkParticipantStatus::Interested,
            ParticipantStatus::Accepted => SdkParticipantStatus::Accepted,
            ParticipantStatus::Started => SdkParticipantStatus::Started,
            ParticipantStatus::Completed => SdkParticipantStatus::Completed,
            ParticipantStatus::Rejected => SdkParticipantStatus::Rejected,
            ParticipantStatus::Cancelled => SdkParticipantStatus::Cancelled,
        }
    }
}

/// How the creator prefers to be contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "communication_preference")]
pub enum CommunicationPreference {
    Chat,
    Call,
    Both,
}

impl From<CommunicationPreference> for SdkCommunication {
    fn from(value: CommunicationPreference) -> Self {
        match value {
            CommunicationPreference::Chat => SdkCommunication::Chat,
            CommunicationPreference::Call => SdkCommunication::Call,
            CommunicationPreference::Both => SdkCommunication::Both,
        }
    }
}

impl From<SdkCommunication> for CommunicationPreference {
    fn from(value: SdkCommunication) -> Self {
        match value {
            SdkCommunication::Chat => CommunicationPreference::Chat,
            SdkCommunication::Call => CommunicationPreference::Call,
            SdkCommunication::Both => CommunicationPreference::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ride_graph_edges() {
        use RideStatus::*;
        let all = [Pending, Accepted, Started, Completed, Cancelled];
        let legal = [
            (Pending, Accepted),
            (Pending, Started),
            (Accepted, Started),
            (Started, Completed),
            (Pending, Cancelled),
            (Accepted, Cancelled),
            (Started, Cancelled),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for status in [RideStatus::Completed, RideStatus::Cancelled] {
            assert!(status.is_terminal());
            assert!(!status.is_open());
        }
        assert!(!RideStatus::Started.is_open());
    }
}
