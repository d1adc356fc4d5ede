use super::transitions::{self, Effects};
use super::{KeyedLocks, RideError};
use crate::config::{ConfigStore, EngineConfig};
use crate::entities::RideStatus;
use crate::entities::ride::{NewRide, Ride, RideFilter, RideMessage};
use crate::entities::user::Rating;
use crate::notify::FanOut;
use crate::store::{RideStore, StoreError, UserStore};
use dorycar_sdk::objects::ReviewOutcome;
use std::future::Future;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Runs lifecycle operations against storage and publishes their outcome.
///
/// Each mutating operation holds the ride's lock from load to publish:
/// load, validate and mutate a copy, append the notification log, save
/// with a version check, then fan out. A failed check or save publishes
/// nothing, and events for one ride leave in commit order.
pub struct RideEngine {
    rides: Arc<dyn RideStore>,
    users: Arc<dyn UserStore>,
    fanout: FanOut,
    ride_locks: KeyedLocks,
    user_locks: KeyedLocks,
    config: ConfigStore<EngineConfig>,
}

impl RideEngine {
    pub fn new(
        rides: Arc<dyn RideStore>,
        users: Arc<dyn UserStore>,
        fanout: FanOut,
        config: ConfigStore<EngineConfig>,
    ) -> Self {
        Self {
            rides,
            users,
            fanout,
            ride_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
            config,
        }
    }

    async fn bounded<T>(
        &self,
        config: &EngineConfig,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, RideError> {
        match tokio::time::timeout(config.storage_timeout, call).await {
            Ok(result) => result.map_err(RideError::from),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = config.storage_timeout.as_millis() as u64,
                    "RideEngine: storage call timed out"
                );
                Err(RideError::Timeout)
            }
        }
    }

    async fn load(&self, config: &EngineConfig, ride_id: Uuid) -> Result<Ride, RideError> {
        self.bounded(config, self.rides.get(ride_id))
            .await?
            .ok_or(RideError::NotFound)
    }

    /// Version-checked save. When the acknowledgement times out the write
    /// may still have landed, so the ride is read back: a stored version of
    /// `expected_version + 1` under the ride lock means this save committed.
    async fn commit(
        &self,
        config: &EngineConfig,
        next: &Ride,
        expected_version: i64,
    ) -> Result<Ride, RideError> {
        match tokio::time::timeout(
            config.storage_timeout,
            self.rides.save(next, expected_version),
        )
        .await
        {
            Ok(result) => result.map_err(RideError::from),
            Err(_) => {
                tracing::warn!(
                    ride_id = %next.id,
                    timeout_ms = config.storage_timeout.as_millis() as u64,
                    "RideEngine: save timed out, checking whether it committed"
                );
                let stored = self.load(config, next.id).await?;
                if stored.version == expected_version + 1 {
                    tracing::info!(ride_id = %next.id, "RideEngine: timed-out save had committed");
                    Ok(stored)
                } else {
                    Err(RideError::Timeout)
                }
            }
        }
    }

    async fn mutate<F>(&self, ride_id: Uuid, op: &'static str, apply: F) -> Result<Ride, RideError>
    where
        F: FnOnce(&mut Ride, OffsetDateTime) -> Result<Effects, RideError>,
    {
        let _guard = self.ride_locks.lock(ride_id).await;
        let config = self.config.snapshot().await;
        let current = self.load(&config, ride_id).await?;

        let now = OffsetDateTime::now_utc();
        let mut next = current.clone();
        let effects = apply(&mut next, now)?;
        transitions::record_notifications(&mut next, &effects.deliveries, now);

        let saved = self.commit(&config, &next, current.version).await?;
        tracing::info!(
            %ride_id,
            op,
            status = %saved.status,
            notified = effects.deliveries.len(),
            "Ride updated"
        );

        match &effects.chat {
            Some(message) => self.fanout.publish_chat(&saved, message).await,
            None => self.fanout.publish(&saved, &effects.deliveries).await,
        }
        Ok(saved)
    }

    /// Publish a new pending ride for `creator`.
    pub async fn create(&self, creator: Uuid, details: NewRide) -> Result<Ride, RideError> {
        let config = self.config.snapshot().await;
        let user = self
            .bounded(&config, self.users.get(creator))
            .await?
            .ok_or(RideError::UserNotFound)?;
        details.validate().map_err(RideError::InvalidRide)?;
        let missing_fields = user.missing_profile_fields();
        if !missing_fields.is_empty() {
            return Err(RideError::IncompleteProfile { missing_fields });
        }

        let ride = Ride::new(Uuid::now_v7(), creator, details, OffsetDateTime::now_utc());
        self.bounded(&config, self.rides.insert(&ride)).await?;
        tracing::info!(ride_id = %ride.id, %creator, "Ride created");
        self.fanout.publish(&ride, &[]).await;
        Ok(ride)
    }

    pub async fn express_interest(&self, ride_id: Uuid, user: Uuid) -> Result<Ride, RideError> {
        self.mutate(ride_id, "express_interest", |ride, now| {
            transitions::express_interest(ride, user, now).map(Effects::from)
        })
        .await
    }

    pub async fn accept_participant(
        &self,
        ride_id: Uuid,
        actor: Uuid,
        target: Uuid,
    ) -> Result<Ride, RideError> {
        self.mutate(ride_id, "accept_participant", |ride, _| {
            transitions::accept_participant(ride, actor, target).map(Effects::from)
        })
        .await
    }

    pub async fn start(&self, ride_id: Uuid, actor: Uuid) -> Result<Ride, RideError> {
        self.mutate(ride_id, "start", |ride, now| {
            transitions::start(ride, actor, now).map(Effects::from)
        })
        .await
    }

    pub async fn complete(&self, ride_id: Uuid, actor: Uuid) -> Result<Ride, RideError> {
        self.mutate(ride_id, "complete", |ride, now| {
            transitions::complete(ride, actor, now).map(Effects::from)
        })
        .await
    }

    pub async fn cancel(
        &self,
        ride_id: Uuid,
        actor: Uuid,
        reason: Option<String>,
    ) -> Result<Ride, RideError> {
        self.mutate(ride_id, "cancel", |ride, now| {
            transitions::cancel(ride, actor, reason.as_deref(), now).map(Effects::from)
        })
        .await
    }

    /// Append a chat message and hand it to the other parties.
    pub async fn post_message(
        &self,
        ride_id: Uuid,
        sender: Uuid,
        content: &str,
    ) -> Result<RideMessage, RideError> {
        let max_length = self.config.read().await.max_message_length;
        let mut posted = None;
        self.mutate(ride_id, "post_message", |ride, now| {
            let message = transitions::post_message(ride, sender, content, max_length, now)?;
            posted = Some(message.clone());
            Ok(Effects {
                deliveries: Vec::new(),
                chat: Some(message),
            })
        })
        .await?;
        posted.ok_or_else(|| RideError::invalid_state("message was not recorded"))
    }

    /// Chat history, visible to the creator and participants only.
    pub async fn messages(&self, ride_id: Uuid, viewer: Uuid) -> Result<Vec<RideMessage>, RideError> {
        let config = self.config.snapshot().await;
        let ride = self.load(&config, ride_id).await?;
        transitions::require_party(&ride, viewer)?;
        Ok(ride.messages)
    }

    /// Record `from`'s rating of `to` for this ride, replacing any earlier
    /// rating `from` gave on the same ride.
    pub async fn submit_review(
        &self,
        ride_id: Uuid,
        from: Uuid,
        to: Uuid,
        rating: u8,
        comment: Option<String>,
    ) -> Result<ReviewOutcome, RideError> {
        let config = self.config.snapshot().await;
        let ride = self.load(&config, ride_id).await?;

        let _guard = self.user_locks.lock(to).await;
        let mut user = self
            .bounded(&config, self.users.get(to))
            .await?
            .ok_or(RideError::UserNotFound)?;
        if !(1..=5).contains(&rating) {
            return Err(RideError::InvalidRating);
        }
        if config.require_completed_ride_for_review && ride.status != RideStatus::Completed {
            return Err(RideError::invalid_state(
                "reviews are only accepted once the ride is completed",
            ));
        }

        let updated = user.upsert_rating(Rating {
            from_user: from,
            ride_id,
            rating,
            comment: comment.filter(|c| !c.trim().is_empty()),
            date: OffsetDateTime::now_utc(),
        });
        self.bounded(
            &config,
            self.users
                .save_ratings(to, &user.ratings, user.average_rating),
        )
        .await
        .map_err(|e| match e {
            RideError::NotFound => RideError::UserNotFound,
            other => other,
        })?;
        tracing::info!(%ride_id, %from, %to, rating, updated, "Review recorded");

        Ok(ReviewOutcome {
            updated,
            average_rating: user.average_rating,
            rating_count: user.ratings.len(),
        })
    }

    pub async fn get(&self, ride_id: Uuid) -> Result<Ride, RideError> {
        let config = self.config.snapshot().await;
        self.load(&config, ride_id).await
    }

    pub async fn search(&self, filter: &RideFilter) -> Result<Vec<Ride>, RideError> {
        let config = self.config.snapshot().await;
        self.bounded(&config, self.rides.find(filter)).await
    }

    pub async fn rides_for_user(&self, user_id: Uuid) -> Result<Vec<Ride>, RideError> {
        let config = self.config.snapshot().await;
        self.bounded(&config, self.rides.for_user(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RealtimeConfig;
    use crate::entities::ParticipantStatus;
    use crate::entities::user::{UserProfile, Vehicle};
    use crate::lifecycle::ErrorClass;
    use crate::notify::{Hub, RideEvent};
    use crate::registry;
    use crate::store::{MemoryRideStore, MemoryUserStore};
    use dorycar_sdk::objects::{NotificationKind, RidePreferences};
    use rust_decimal::Decimal;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct Harness {
        engine: Arc<RideEngine>,
        rides: Arc<MemoryRideStore>,
        users: Arc<MemoryUserStore>,
        hub: Arc<Hub>,
        config: ConfigStore<EngineConfig>,
        creator: Uuid,
    }

    fn complete_profile(id: Uuid) -> UserProfile {
        let mut user = UserProfile::new(id, "Driver");
        user.phone = Some("+47 555 0101".into());
        user.gender = Some("female".into());
        user.emergency_contact = Some("+47 555 0199".into());
        user.vehicle = Vehicle {
            kind: Some("hatchback".into()),
            make: Some("Volkswagen".into()),
            model: Some("e-Golf".into()),
            registration: Some("EL 12345".into()),
            seats: Some(4),
            fuel: Some("electric".into()),
            vin: Some("WVWZZZAUZGW000001".into()),
            color: None,
            year: Some(2019),
        };
        user
    }

    fn details() -> NewRide {
        NewRide {
            origin: "Stavanger".into(),
            destination: "Bergen".into(),
            date: OffsetDateTime::now_utc() + time::Duration::days(2),
            seats: 3,
            price: Decimal::new(300, 0),
            preferences: RidePreferences {
                ac: true,
                ..RidePreferences::default()
            },
            payment_methods: vec!["cash".into()],
            vehicle_details: Some("white e-Golf".into()),
            preferred_communication: None,
        }
    }

    async fn harness_with(rides: Arc<dyn RideStore>, memory: Arc<MemoryRideStore>) -> Harness {
        let users = Arc::new(MemoryUserStore::new());
        let creator = Uuid::now_v7();
        users.insert_user(complete_profile(creator)).await;
        let hub = Arc::new(Hub::new(RealtimeConfig::default()));
        let config = ConfigStore::new(EngineConfig::default());
        let engine = Arc::new(RideEngine::new(
            rides,
            users.clone(),
            FanOut::new(hub.clone()),
            config.clone(),
        ));
        Harness {
            engine,
            rides: memory,
            users,
            hub,
            config,
            creator,
        }
    }

    async fn harness() -> Harness {
        let rides = Arc::new(MemoryRideStore::new());
        harness_with(rides.clone(), rides).await
    }

    impl Harness {
        async fn rider(&self) -> Uuid {
            let id = Uuid::now_v7();
            self.users.insert_user(UserProfile::new(id, "Rider")).await;
            id
        }

        async fn ride(&self) -> Ride {
            self.engine.create(self.creator, details()).await.unwrap()
        }

        async fn stored(&self, ride_id: Uuid) -> Ride {
            self.rides.get(ride_id).await.unwrap().unwrap()
        }
    }

    fn drain(rx: &mut broadcast::Receiver<RideEvent>) -> Vec<RideEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn kinds(events: &[RideEvent]) -> Vec<NotificationKind> {
        events
            .iter()
            .filter_map(|e| match e {
                RideEvent::Notification { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let h = harness().await;
        let x = h.rider().await;
        let mut all = h.hub.subscribe_all();
        let mut creator_room = h.hub.join(h.creator).await;
        let mut x_room = h.hub.join(x).await;

        let ride = h.ride().await;
        assert_eq!(ride.status, RideStatus::Pending);
        h.engine.express_interest(ride.id, x).await.unwrap();
        h.engine
            .accept_participant(ride.id, h.creator, x)
            .await
            .unwrap();
        h.engine.start(ride.id, h.creator).await.unwrap();
        let done = h.engine.complete(ride.id, h.creator).await.unwrap();

        assert_eq!(done.status, RideStatus::Completed);
        assert_eq!(
            registry::find_by_user(&done, x).map(|p| p.status),
            Some(ParticipantStatus::Completed)
        );
        assert!(done.started_at.is_some());
        assert!(done.completed_at.is_some());
        assert!(done.cancelled_at.is_none());
        assert_eq!(done.acceptors(), vec![x]);
        assert_eq!(h.stored(ride.id).await, done);
        assert_eq!(done.version, 4);

        assert_eq!(
            kinds(&drain(&mut x_room)),
            vec![
                NotificationKind::Accepted,
                NotificationKind::Started,
                NotificationKind::Completed
            ]
        );
        assert_eq!(
            kinds(&drain(&mut creator_room)),
            vec![NotificationKind::Interest, NotificationKind::Completed]
        );
        // One broadcast per committed change, create included.
        assert_eq!(drain(&mut all).len(), 5);
        assert_eq!(done.notifications.len(), 5);
    }

    #[tokio::test]
    async fn test_incomplete_profile_persists_nothing() {
        let h = harness().await;
        let mut profile = complete_profile(h.creator);
        profile.vehicle.vin = None;
        profile.phone = Some(" ".into());
        h.users.insert_user(profile).await;
        let mut all = h.hub.subscribe_all();

        let err = h.engine.create(h.creator, details()).await.unwrap_err();
        match err {
            RideError::IncompleteProfile { missing_fields } => {
                assert_eq!(missing_fields, vec!["vehicle.vin", "phone"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.engine.rides_for_user(h.creator).await.unwrap().is_empty());
        assert!(drain(&mut all).is_empty());
    }

    #[tokio::test]
    async fn test_create_checks_creator_and_details() {
        let h = harness().await;
        assert!(matches!(
            h.engine.create(Uuid::now_v7(), details()).await,
            Err(RideError::UserNotFound)
        ));
        let mut bad = details();
        bad.seats = 0;
        assert!(matches!(
            h.engine.create(h.creator, bad).await,
            Err(RideError::InvalidRide(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_interest_leaves_list_unchanged() {
        let h = harness().await;
        let ride = h.ride().await;
        let x = h.rider().await;

        h.engine.express_interest(ride.id, x).await.unwrap();
        let err = h.engine.express_interest(ride.id, x).await.unwrap_err();
        assert!(matches!(err, RideError::DuplicateInterest));
        assert_eq!(h.stored(ride.id).await.participants.len(), 1);

        assert!(matches!(
            h.engine.express_interest(ride.id, h.creator).await,
            Err(RideError::SelfInterestForbidden)
        ));
        assert!(matches!(
            h.engine.express_interest(Uuid::now_v7(), x).await,
            Err(RideError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_start_rejects_waiting_riders() {
        let h = harness().await;
        let ride = h.ride().await;
        let (a, b) = (h.rider().await, h.rider().await);
        let mut b_room = h.hub.join(b).await;

        h.engine.express_interest(ride.id, a).await.unwrap();
        h.engine.express_interest(ride.id, b).await.unwrap();
        h.engine
            .accept_participant(ride.id, h.creator, a)
            .await
            .unwrap();
        assert!(matches!(
            h.engine.start(ride.id, a).await,
            Err(RideError::Forbidden(_))
        ));
        let started = h.engine.start(ride.id, h.creator).await.unwrap();

        assert_eq!(
            registry::find_by_user(&started, a).map(|p| p.status),
            Some(ParticipantStatus::Started)
        );
        assert_eq!(
            registry::find_by_user(&started, b).map(|p| p.status),
            Some(ParticipantStatus::Rejected)
        );
        assert_eq!(kinds(&drain(&mut b_room)), vec![NotificationKind::Rejected]);
        assert!(
            started
                .notifications
                .iter()
                .any(|n| n.user == b && n.kind == NotificationKind::Rejected)
        );
    }

    #[tokio::test]
    async fn test_complete_requires_start() {
        let h = harness().await;
        let ride = h.ride().await;
        let err = h.engine.complete(ride.id, h.creator).await.unwrap_err();
        assert!(matches!(err, RideError::InvalidState(_)));
        let stored = h.stored(ride.id).await;
        assert_eq!(stored.status, RideStatus::Pending);
        assert_eq!(stored.version, ride.version);
    }

    #[tokio::test]
    async fn test_cancel_keeps_rejected_riders() {
        let h = harness().await;
        let ride = h.ride().await;
        let (a, b) = (h.rider().await, h.rider().await);
        h.engine.express_interest(ride.id, a).await.unwrap();
        h.engine.express_interest(ride.id, b).await.unwrap();
        h.engine
            .accept_participant(ride.id, h.creator, a)
            .await
            .unwrap();

        // Put B in `rejected` directly; the engine only rejects on start.
        let mut stored = h.stored(ride.id).await;
        let p = registry::find_by_user_mut(&mut stored, b).unwrap();
        registry::set_status(p, ParticipantStatus::Rejected);
        h.rides.save(&stored, stored.version).await.unwrap();

        let cancelled = h
            .engine
            .cancel(ride.id, h.creator, Some("weather".into()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, RideStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("weather"));
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(
            registry::find_by_user(&cancelled, a).map(|p| p.status),
            Some(ParticipantStatus::Cancelled)
        );
        assert_eq!(
            registry::find_by_user(&cancelled, b).map(|p| p.status),
            Some(ParticipantStatus::Rejected)
        );

        assert!(matches!(
            h.engine.cancel(ride.id, h.creator, None).await,
            Err(RideError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_review_upsert_and_mean() {
        let h = harness().await;
        let ride = h.ride().await;
        let (x, y) = (h.rider().await, h.rider().await);

        let first = h
            .engine
            .submit_review(ride.id, x, h.creator, 2, None)
            .await
            .unwrap();
        assert!(!first.updated);
        h.engine
            .submit_review(ride.id, y, h.creator, 5, Some("smooth".into()))
            .await
            .unwrap();
        let again = h
            .engine
            .submit_review(ride.id, x, h.creator, 4, None)
            .await
            .unwrap();
        assert!(again.updated);
        assert_eq!(again.rating_count, 2);
        assert_eq!(again.average_rating, 4.5);

        let creator = h.users.get(h.creator).await.unwrap().unwrap();
        let from_x: Vec<_> = creator
            .ratings
            .iter()
            .filter(|r| r.from_user == x && r.ride_id == ride.id)
            .collect();
        assert_eq!(from_x.len(), 1);
        assert_eq!(from_x[0].rating, 4);
        assert_eq!(creator.average_rating, 4.5);

        assert!(matches!(
            h.engine.submit_review(ride.id, x, h.creator, 6, None).await,
            Err(RideError::InvalidRating)
        ));
        assert!(matches!(
            h.engine
                .submit_review(ride.id, x, Uuid::now_v7(), 3, None)
                .await,
            Err(RideError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_review_gate_is_configurable() {
        let h = harness().await;
        let ride = h.ride().await;
        let x = h.rider().await;
        h.config
            .update(EngineConfig {
                require_completed_ride_for_review: true,
                ..EngineConfig::default()
            })
            .await;
        assert!(matches!(
            h.engine.submit_review(ride.id, x, h.creator, 5, None).await,
            Err(RideError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_chat_reaches_other_parties_only() {
        let h = harness().await;
        let ride = h.ride().await;
        let x = h.rider().await;
        let outsider = h.rider().await;
        h.engine.express_interest(ride.id, x).await.unwrap();
        let mut creator_room = h.hub.join(h.creator).await;
        let mut x_room = h.hub.join(x).await;

        let message = h
            .engine
            .post_message(ride.id, x, "Can I bring a bike?")
            .await
            .unwrap();
        assert_eq!(message.sender, x);

        let creator_events = drain(&mut creator_room);
        assert!(matches!(
            creator_events.as_slice(),
            [RideEvent::Chat { message, .. }] if message.content == "Can I bring a bike?"
        ));
        assert!(drain(&mut x_room).is_empty());

        assert_eq!(h.engine.messages(ride.id, h.creator).await.unwrap().len(), 1);
        assert!(matches!(
            h.engine.messages(ride.id, outsider).await,
            Err(RideError::Forbidden(_))
        ));
        assert!(matches!(
            h.engine.post_message(ride.id, outsider, "hello").await,
            Err(RideError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_carries_public_view_only() {
        let h = harness().await;
        let ride = h.ride().await;
        let x = h.rider().await;
        h.engine.express_interest(ride.id, x).await.unwrap();
        let mut all = h.hub.subscribe_all();

        h.engine.post_message(ride.id, x, "secret").await.unwrap();
        let events = drain(&mut all);
        let [RideEvent::RideUpdated(public)] = events.as_slice() else {
            panic!("expected a single ride-updated event, got {events:?}");
        };
        let json = serde_json::to_string(public.as_ref()).unwrap();
        assert!(!json.contains("secret"));
    }

    #[tokio::test]
    async fn test_search_defaults_and_rides_for_user() {
        let h = harness().await;
        let open = h.ride().await;
        let closed = h.ride().await;
        h.engine.cancel(closed.id, h.creator, None).await.unwrap();
        let x = h.rider().await;
        h.engine.express_interest(open.id, x).await.unwrap();

        let filter = RideFilter {
            origin: Some("stav".into()),
            statuses: RideFilter::open_statuses(),
            ..RideFilter::default()
        };
        let found = h.engine.search(&filter).await.unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![open.id]);

        let everything = h.engine.search(&RideFilter::default()).await.unwrap();
        assert_eq!(everything.len(), 2);

        let mine = h.engine.rides_for_user(x).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(h.engine.rides_for_user(h.creator).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_accepts_are_serialized() {
        let h = harness().await;
        let ride = h.ride().await;
        let mut riders = Vec::new();
        for _ in 0..6 {
            let r = h.rider().await;
            h.engine.express_interest(ride.id, r).await.unwrap();
            riders.push(r);
        }

        let mut tasks = Vec::new();
        for r in riders.clone() {
            let engine = Arc::clone(&h.engine);
            let creator = h.creator;
            tasks.push(tokio::spawn(async move {
                engine.accept_participant(ride.id, creator, r).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = h.stored(ride.id).await;
        let mut acceptors = stored.acceptors();
        acceptors.sort();
        riders.sort();
        assert_eq!(acceptors, riders);
    }

    /// Bumps the stored version behind the engine's back on every save.
    struct RacingStore {
        inner: Arc<MemoryRideStore>,
    }

    #[async_trait::async_trait]
    impl RideStore for RacingStore {
        async fn get(&self, ride_id: Uuid) -> Result<Option<Ride>, StoreError> {
            self.inner.get(ride_id).await
        }
        async fn insert(&self, ride: &Ride) -> Result<(), StoreError> {
            self.inner.insert(ride).await
        }
        async fn save(&self, ride: &Ride, expected_version: i64) -> Result<Ride, StoreError> {
            if let Some(current) = self.inner.get(ride.id).await? {
                self.inner.save(&current, current.version).await?;
            }
            self.inner.save(ride, expected_version).await
        }
        async fn find(&self, filter: &RideFilter) -> Result<Vec<Ride>, StoreError> {
            self.inner.find(filter).await
        }
        async fn for_user(&self, user_id: Uuid) -> Result<Vec<Ride>, StoreError> {
            self.inner.for_user(user_id).await
        }
    }

    #[tokio::test]
    async fn test_lost_update_is_reported_as_conflict() {
        let memory = Arc::new(MemoryRideStore::new());
        let racing = Arc::new(RacingStore {
            inner: memory.clone(),
        });
        let h = harness_with(racing, memory).await;
        let ride = h.ride().await;
        let x = h.rider().await;
        let mut creator_room = h.hub.join(h.creator).await;

        let err = h.engine.express_interest(ride.id, x).await.unwrap_err();
        assert!(matches!(err, RideError::ConcurrentModification));
        assert!(h.stored(ride.id).await.participants.is_empty());
        assert!(drain(&mut creator_room).is_empty());
    }

    /// Never answers reads.
    struct StalledStore;

    #[async_trait::async_trait]
    impl RideStore for StalledStore {
        async fn get(&self, _ride_id: Uuid) -> Result<Option<Ride>, StoreError> {
            std::future::pending().await
        }
        async fn insert(&self, _ride: &Ride) -> Result<(), StoreError> {
            Ok(())
        }
        async fn save(&self, ride: &Ride, _expected: i64) -> Result<Ride, StoreError> {
            Ok(ride.clone())
        }
        async fn find(&self, _filter: &RideFilter) -> Result<Vec<Ride>, StoreError> {
            std::future::pending().await
        }
        async fn for_user(&self, _user_id: Uuid) -> Result<Vec<Ride>, StoreError> {
            Ok(Vec::new())
        }
    }

    /// Never acknowledges a save. With `commits` set the write lands first.
    struct SlowAckStore {
        inner: Arc<MemoryRideStore>,
        commits: bool,
    }

    #[async_trait::async_trait]
    impl RideStore for SlowAckStore {
        async fn get(&self, ride_id: Uuid) -> Result<Option<Ride>, StoreError> {
            self.inner.get(ride_id).await
        }
        async fn insert(&self, ride: &Ride) -> Result<(), StoreError> {
            self.inner.insert(ride).await
        }
        async fn save(&self, ride: &Ride, expected_version: i64) -> Result<Ride, StoreError> {
            if self.commits {
                self.inner.save(ride, expected_version).await?;
            }
            std::future::pending().await
        }
        async fn find(&self, filter: &RideFilter) -> Result<Vec<Ride>, StoreError> {
            self.inner.find(filter).await
        }
        async fn for_user(&self, user_id: Uuid) -> Result<Vec<Ride>, StoreError> {
            self.inner.for_user(user_id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_committed_save_is_published_despite_ack_timeout() {
        let memory = Arc::new(MemoryRideStore::new());
        let slow = Arc::new(SlowAckStore {
            inner: memory.clone(),
            commits: true,
        });
        let h = harness_with(slow, memory).await;
        h.config
            .update(EngineConfig {
                storage_timeout: Duration::from_millis(50),
                ..EngineConfig::default()
            })
            .await;
        let ride = h.ride().await;
        let x = h.rider().await;
        let mut creator_room = h.hub.join(h.creator).await;

        let saved = h.engine.express_interest(ride.id, x).await.unwrap();
        assert_eq!(saved.version, ride.version + 1);
        assert_eq!(saved.participants.len(), 1);
        assert_eq!(h.stored(ride.id).await.participants.len(), 1);
        assert_eq!(
            kinds(&drain(&mut creator_room)),
            vec![NotificationKind::Interest]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_save_times_out_without_publishing() {
        let memory = Arc::new(MemoryRideStore::new());
        let slow = Arc::new(SlowAckStore {
            inner: memory.clone(),
            commits: false,
        });
        let h = harness_with(slow, memory).await;
        h.config
            .update(EngineConfig {
                storage_timeout: Duration::from_millis(50),
                ..EngineConfig::default()
            })
            .await;
        let ride = h.ride().await;
        let x = h.rider().await;
        let mut creator_room = h.hub.join(h.creator).await;

        let err = h.engine.express_interest(ride.id, x).await.unwrap_err();
        assert!(matches!(err, RideError::Timeout));
        assert!(h.stored(ride.id).await.participants.is_empty());
        assert!(drain(&mut creator_room).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_storage_times_out() {
        let h = harness_with(Arc::new(StalledStore), Arc::new(MemoryRideStore::new())).await;
        h.config
            .update(EngineConfig {
                storage_timeout: Duration::from_millis(50),
                ..EngineConfig::default()
            })
            .await;

        let err = h.engine.start(Uuid::now_v7(), h.creator).await.unwrap_err();
        assert!(matches!(err, RideError::Timeout));
        assert_eq!(err.class(), ErrorClass::Unavailable);
        assert!(matches!(
            h.engine.search(&RideFilter::default()).await,
            Err(RideError::Timeout)
        ));
    }
}
