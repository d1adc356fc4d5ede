//! Lifecycle rules applied to an in-memory ride.
//!
//! Every function validates first and mutates only once all checks have
//! passed, so an error leaves the ride untouched. The returned deliveries
//! are the targeted notifications the change calls for.

use super::RideError;
use crate::entities::ride::{NotificationRecord, Ride, RideMessage};
use crate::entities::{ParticipantStatus, RideStatus};
use crate::notify::{Delivery, notices};
use crate::registry;
use dorycar_sdk::objects::NotificationKind;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_CANCELLATION_REASON: &str = "No reason provided";

/// What a transition asks the fan-out to do once the ride is saved.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Effects {
    pub deliveries: Vec<Delivery>,
    pub chat: Option<RideMessage>,
}

impl From<Vec<Delivery>> for Effects {
    fn from(deliveries: Vec<Delivery>) -> Self {
        Self {
            deliveries,
            chat: None,
        }
    }
}

fn require_creator(ride: &Ride, actor: Uuid, action: &'static str) -> Result<(), RideError> {
    if ride.is_creator(actor) {
        Ok(())
    } else {
        Err(RideError::Forbidden(action))
    }
}

fn require_edge(ride: &Ride, next: RideStatus) -> Result<(), RideError> {
    if ride.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(RideError::invalid_state(format!(
            "cannot move a {} ride to {next}",
            ride.status
        )))
    }
}

/// Only the creator and users holding a participant record may read or
/// write the ride's chat.
pub fn require_party(ride: &Ride, user: Uuid) -> Result<(), RideError> {
    if ride.is_party(user) {
        Ok(())
    } else {
        Err(RideError::Forbidden(
            "only the ride creator and its participants can use the ride chat",
        ))
    }
}

pub fn express_interest(
    ride: &mut Ride,
    user: Uuid,
    now: OffsetDateTime,
) -> Result<Vec<Delivery>, RideError> {
    if ride.status.is_terminal() {
        return Err(RideError::invalid_state(format!(
            "cannot join a {} ride",
            ride.status
        )));
    }
    registry::add_interest(ride, user, now)?;
    Ok(vec![Delivery::new(
        ride.creator,
        NotificationKind::Interest,
        notices::interest(ride),
    )])
}

pub fn accept_participant(
    ride: &mut Ride,
    actor: Uuid,
    target: Uuid,
) -> Result<Vec<Delivery>, RideError> {
    require_creator(ride, actor, "only the ride creator can accept riders")?;
    if !ride.status.is_open() {
        return Err(RideError::invalid_state(format!(
            "cannot accept riders on a {} ride",
            ride.status
        )));
    }
    let accepted = notices::accepted(ride);
    let participant =
        registry::find_by_user_mut(ride, target).ok_or(RideError::NoSuchInterest)?;
    match participant.status {
        ParticipantStatus::Interested => {}
        ParticipantStatus::Accepted => return Err(RideError::AlreadyAccepted),
        other => {
            return Err(RideError::invalid_state(format!(
                "cannot accept a participant who is {other}"
            )));
        }
    }
    registry::set_status(participant, ParticipantStatus::Accepted);
    Ok(vec![Delivery::new(
        target,
        NotificationKind::Accepted,
        accepted,
    )])
}

/// Start the ride. Accepted riders come along; everyone still waiting is
/// turned down.
pub fn start(ride: &mut Ride, actor: Uuid, now: OffsetDateTime) -> Result<Vec<Delivery>, RideError> {
    require_creator(ride, actor, "only the ride creator can start the ride")?;
    require_edge(ride, RideStatus::Started)?;
    if !ride
        .participants
        .iter()
        .any(|p| p.status == ParticipantStatus::Accepted)
    {
        return Err(RideError::NoAcceptedParticipants);
    }

    let (started, rejected) = (notices::started(ride), notices::rejected(ride));
    ride.status = RideStatus::Started;
    ride.started_at = Some(now);

    let mut deliveries = Vec::new();
    for participant in ride.participants.iter_mut() {
        match participant.status {
            ParticipantStatus::Accepted => {
                registry::set_status(participant, ParticipantStatus::Started);
                deliveries.push(Delivery::new(
                    participant.user,
                    NotificationKind::Started,
                    started.clone(),
                ));
            }
            status if status.is_terminal() => {}
            _ => {
                registry::set_status(participant, ParticipantStatus::Rejected);
                deliveries.push(Delivery::new(
                    participant.user,
                    NotificationKind::Rejected,
                    rejected.clone(),
                ));
            }
        }
    }
    Ok(deliveries)
}

pub fn complete(
    ride: &mut Ride,
    actor: Uuid,
    now: OffsetDateTime,
) -> Result<Vec<Delivery>, RideError> {
    require_creator(ride, actor, "only the ride creator can complete the ride")?;
    require_edge(ride, RideStatus::Completed)?;

    let completed = notices::completed(ride);
    ride.status = RideStatus::Completed;
    ride.completed_at = Some(now);

    let mut deliveries = Vec::new();
    for participant in ride.participants.iter_mut() {
        if matches!(
            participant.status,
            ParticipantStatus::Started | ParticipantStatus::Accepted
        ) {
            registry::set_status(participant, ParticipantStatus::Completed);
            deliveries.push(Delivery::new(
                participant.user,
                NotificationKind::Completed,
                completed.clone(),
            ));
        }
    }
    deliveries.push(Delivery::new(
        ride.creator,
        NotificationKind::Completed,
        completed,
    ));
    Ok(deliveries)
}

/// Cancel the ride, by its creator or by an accepted rider.
///
/// A blank `reason` is replaced by [`DEFAULT_CANCELLATION_REASON`].
pub fn cancel(
    ride: &mut Ride,
    actor: Uuid,
    reason: Option<&str>,
    now: OffsetDateTime,
) -> Result<Vec<Delivery>, RideError> {
    let by_creator = ride.is_creator(actor);
    let accepted_rider = registry::find_by_user(ride, actor)
        .is_some_and(|p| p.status == ParticipantStatus::Accepted);
    if !by_creator && !accepted_rider {
        return Err(RideError::Forbidden(
            "only the ride creator or accepted riders can cancel the ride",
        ));
    }
    require_edge(ride, RideStatus::Cancelled)?;

    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_CANCELLATION_REASON)
        .to_string();
    ride.status = RideStatus::Cancelled;
    ride.cancelled_at = Some(now);

    let mut deliveries = Vec::new();
    if !by_creator {
        deliveries.push(Delivery::new(
            ride.creator,
            NotificationKind::Cancelled,
            notices::rider_cancelled(ride, &reason),
        ));
    }
    let message = notices::ride_cancelled(ride, by_creator, &reason);
    for participant in ride.participants.iter_mut() {
        if participant.status != ParticipantStatus::Rejected {
            registry::set_status(participant, ParticipantStatus::Cancelled);
        }
        if participant.user != actor {
            deliveries.push(Delivery::new(
                participant.user,
                NotificationKind::Cancelled,
                message.clone(),
            ));
        }
    }
    ride.cancellation_reason = Some(reason);
    Ok(deliveries)
}

/// Validate and append a chat message.
pub fn post_message(
    ride: &mut Ride,
    sender: Uuid,
    content: &str,
    max_length: usize,
    now: OffsetDateTime,
) -> Result<RideMessage, RideError> {
    require_party(ride, sender)?;
    let content = content.trim();
    if content.is_empty() {
        return Err(RideError::InvalidMessage("message is empty".into()));
    }
    if content.chars().count() > max_length {
        return Err(RideError::InvalidMessage(format!(
            "message is longer than {max_length} characters"
        )));
    }
    let message = RideMessage {
        sender,
        content: content.to_string(),
        sent_at: now,
    };
    ride.messages.push(message.clone());
    Ok(message)
}

/// Append each delivery to the ride's notification log.
pub fn record_notifications(ride: &mut Ride, deliveries: &[Delivery], now: OffsetDateTime) {
    ride.notifications
        .extend(deliveries.iter().map(|d| NotificationRecord {
            user: d.recipient,
            kind: d.kind,
            message: d.message.clone(),
            created_at: now,
        }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ride::NewRide;
    use dorycar_sdk::objects::RidePreferences;
    use rust_decimal::Decimal;

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn ride() -> Ride {
        Ride::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            NewRide {
                origin: "Trondheim".into(),
                destination: "Oslo".into(),
                date: now(),
                seats: 3,
                price: Decimal::new(450, 0),
                preferences: RidePreferences::default(),
                payment_methods: vec!["vipps".into()],
                vehicle_details: None,
                preferred_communication: None,
            },
            now(),
        )
    }

    fn with_participant(ride: &mut Ride, status: ParticipantStatus) -> Uuid {
        let user = Uuid::now_v7();
        registry::add_interest(ride, user, now()).unwrap();
        let p = registry::find_by_user_mut(ride, user).unwrap();
        registry::set_status(p, status);
        user
    }

    fn status_of(ride: &Ride, user: Uuid) -> ParticipantStatus {
        registry::find_by_user(ride, user).unwrap().status
    }

    #[test]
    fn test_illegal_edges_leave_ride_unchanged() {
        let mut pending = ride();
        let creator = pending.creator;
        let before = pending.clone();
        let err = complete(&mut pending, creator, now()).unwrap_err();
        assert!(matches!(err, RideError::InvalidState(_)));
        assert_eq!(pending, before);

        let mut done = ride();
        done.status = RideStatus::Completed;
        let before = done.clone();
        let creator = done.creator;
        assert!(matches!(
            cancel(&mut done, creator, None, now()),
            Err(RideError::InvalidState(_))
        ));
        assert!(matches!(
            start(&mut done, creator, now()),
            Err(RideError::InvalidState(_))
        ));
        assert_eq!(done, before);

        let mut legacy = ride();
        legacy.status = RideStatus::Accepted;
        let creator = legacy.creator;
        assert!(matches!(
            complete(&mut legacy, creator, now()),
            Err(RideError::InvalidState(_))
        ));
        assert_eq!(legacy.status, RideStatus::Accepted);
    }

    #[test]
    fn test_interest_notifies_creator() {
        let mut ride = ride();
        let user = Uuid::now_v7();
        let deliveries = express_interest(&mut ride, user, now()).unwrap();
        assert_eq!(
            deliveries,
            vec![Delivery::new(
                ride.creator,
                NotificationKind::Interest,
                "Someone has shown interest in your ride from Trondheim to Oslo."
            )]
        );

        ride.status = RideStatus::Cancelled;
        assert!(matches!(
            express_interest(&mut ride, Uuid::now_v7(), now()),
            Err(RideError::InvalidState(_))
        ));
    }

    #[test]
    fn test_accept_rules() {
        let mut ride = ride();
        let creator = ride.creator;
        let interested = with_participant(&mut ride, ParticipantStatus::Interested);
        let rejected = with_participant(&mut ride, ParticipantStatus::Rejected);

        assert!(matches!(
            accept_participant(&mut ride, interested, interested),
            Err(RideError::Forbidden(_))
        ));
        assert!(matches!(
            accept_participant(&mut ride, creator, Uuid::now_v7()),
            Err(RideError::NoSuchInterest)
        ));
        assert!(matches!(
            accept_participant(&mut ride, creator, rejected),
            Err(RideError::InvalidState(_))
        ));

        let deliveries = accept_participant(&mut ride, creator, interested).unwrap();
        assert_eq!(deliveries[0].recipient, interested);
        assert_eq!(deliveries[0].kind, NotificationKind::Accepted);
        assert_eq!(ride.status, RideStatus::Pending);
        assert!(matches!(
            accept_participant(&mut ride, creator, interested),
            Err(RideError::AlreadyAccepted)
        ));
    }

    #[test]
    fn test_start_cascade() {
        let mut ride = ride();
        let creator = ride.creator;
        let a = with_participant(&mut ride, ParticipantStatus::Accepted);
        let b = with_participant(&mut ride, ParticipantStatus::Interested);
        let c = with_participant(&mut ride, ParticipantStatus::Cancelled);

        let deliveries = start(&mut ride, creator, now()).unwrap();

        assert_eq!(ride.status, RideStatus::Started);
        assert!(ride.started_at.is_some());
        assert_eq!(status_of(&ride, a), ParticipantStatus::Started);
        assert_eq!(status_of(&ride, b), ParticipantStatus::Rejected);
        assert_eq!(status_of(&ride, c), ParticipantStatus::Cancelled);
        assert_eq!(deliveries.len(), 2);
        assert!(deliveries.contains(&Delivery::new(
            b,
            NotificationKind::Rejected,
            "Your request for the ride from Trondheim to Oslo was not accepted."
        )));
    }

    #[test]
    fn test_start_requires_accepted_rider() {
        let mut ride = ride();
        let creator = ride.creator;
        with_participant(&mut ride, ParticipantStatus::Interested);
        let before = ride.clone();
        assert!(matches!(
            start(&mut ride, creator, now()),
            Err(RideError::NoAcceptedParticipants)
        ));
        assert_eq!(ride, before);
    }

    #[test]
    fn test_complete_notifies_riders_and_creator() {
        let mut ride = ride();
        let creator = ride.creator;
        let a = with_participant(&mut ride, ParticipantStatus::Accepted);
        let b = with_participant(&mut ride, ParticipantStatus::Interested);
        start(&mut ride, creator, now()).unwrap();

        let deliveries = complete(&mut ride, creator, now()).unwrap();
        assert_eq!(ride.status, RideStatus::Completed);
        assert_eq!(status_of(&ride, a), ParticipantStatus::Completed);
        assert_eq!(status_of(&ride, b), ParticipantStatus::Rejected);
        let recipients: Vec<Uuid> = deliveries.iter().map(|d| d.recipient).collect();
        assert_eq!(recipients, vec![a, creator]);
    }

    #[test]
    fn test_cancel_cascade_skips_rejected() {
        let mut ride = ride();
        let creator = ride.creator;
        let a = with_participant(&mut ride, ParticipantStatus::Accepted);
        let b = with_participant(&mut ride, ParticipantStatus::Rejected);

        let deliveries = cancel(&mut ride, creator, Some("  "), now()).unwrap();
        assert_eq!(ride.status, RideStatus::Cancelled);
        assert_eq!(
            ride.cancellation_reason.as_deref(),
            Some(DEFAULT_CANCELLATION_REASON)
        );
        assert_eq!(status_of(&ride, a), ParticipantStatus::Cancelled);
        assert_eq!(status_of(&ride, b), ParticipantStatus::Rejected);
        assert!(deliveries.iter().all(|d| d.recipient != creator));
        assert_eq!(
            deliveries[0].message,
            "Ride from Trondheim to Oslo was cancelled by Creator. Reason: No reason provided"
        );
    }

    #[test]
    fn test_rider_cancel_tells_creator() {
        let mut ride = ride();
        let creator = ride.creator;
        let rider = with_participant(&mut ride, ParticipantStatus::Accepted);
        let other = with_participant(&mut ride, ParticipantStatus::Interested);
        let stranger = Uuid::now_v7();

        assert!(matches!(
            cancel(&mut ride, other, None, now()),
            Err(RideError::Forbidden(_))
        ));
        assert!(matches!(
            cancel(&mut ride, stranger, None, now()),
            Err(RideError::Forbidden(_))
        ));

        let deliveries = cancel(&mut ride, rider, Some("flat tyre"), now()).unwrap();
        assert_eq!(deliveries[0].recipient, creator);
        assert!(deliveries[0].message.ends_with("Reason: flat tyre"));
        let recipients: Vec<Uuid> = deliveries.iter().map(|d| d.recipient).collect();
        assert!(recipients.contains(&other));
        assert!(!recipients.contains(&rider));
    }

    #[test]
    fn test_post_message_rules() {
        let mut ride = ride();
        let creator = ride.creator;
        assert!(matches!(
            post_message(&mut ride, Uuid::now_v7(), "hi", 10, now()),
            Err(RideError::Forbidden(_))
        ));
        assert!(matches!(
            post_message(&mut ride, creator, "   ", 10, now()),
            Err(RideError::InvalidMessage(_))
        ));
        assert!(matches!(
            post_message(&mut ride, creator, "this is far too long", 10, now()),
            Err(RideError::InvalidMessage(_))
        ));
        let message = post_message(&mut ride, creator, " see you at 8 ", 20, now()).unwrap();
        assert_eq!(message.content, "see you at 8");
        assert_eq!(ride.messages.len(), 1);
    }
}
