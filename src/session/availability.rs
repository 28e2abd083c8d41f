use crate::booking::{Court, SlotKey, TimeSlot, WindowError};
use crate::notify::Notification;
use crate::storage::config::FallbackPolicy;
use crate::sync::api::{ApiError, BookingApi};

use super::fallback::{demo_courts, demo_time_slots};
use super::{BookingSession, DataSource, SyncStatus};

/// Ticket for one slot fetch. Only the most recently issued ticket for the
/// current key may change session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery {
    key: SlotKey,
    sequence: u64,
}

impl SlotQuery {
    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    pub async fn run(&self, api: &dyn BookingApi) -> Result<Vec<TimeSlot>, ApiError> {
        api.fetch_time_slots(&self.key.court_id, self.key.date).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Slots replaced; `dropped` lists selected ids that are no longer selectable.
    Applied { dropped: Vec<String> },
    /// Fetch failed and the demo slots are shown instead.
    Fallback,
    /// Fetch failed; state left as it was.
    Failed,
    /// Answer for a superseded request; discarded.
    Stale,
}

impl BookingSession {
    pub(super) fn issue_query(&mut self, key: SlotKey) -> SlotQuery {
        self.last_query += 1;
        self.status = SyncStatus::Syncing;
        tracing::info!("Requesting slots for {} (#{})", key, self.last_query);
        SlotQuery {
            key,
            sequence: self.last_query,
        }
    }

    /// Issues a fetch for the current key without clearing local state.
    pub fn begin_refresh(&mut self) -> Option<SlotQuery> {
        let key = self.current_key()?;
        Some(self.issue_query(key))
    }

    pub fn is_current(&self, query: &SlotQuery) -> bool {
        query.sequence == self.last_query && self.current_key().as_ref() == Some(&query.key)
    }

    fn has_live_slots_for(&self, key: &SlotKey) -> bool {
        self.slots_source == Some(DataSource::Live) && self.slots_key.as_ref() == Some(key)
    }

    pub fn apply_slots(
        &mut self,
        query: SlotQuery,
        result: Result<Vec<TimeSlot>, ApiError>,
    ) -> ApplyOutcome {
        if !self.is_current(&query) {
            tracing::debug!("Dropping stale slot response for {} (#{})", query.key, query.sequence);
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(slots) => {
                let dropped = self.selection.retain_selectable(&slots);
                if !dropped.is_empty() {
                    tracing::info!("Deselected slots no longer bookable: {:?}", dropped);
                }
                tracing::info!("Applied {} slots for {}", slots.len(), query.key);

                self.slots = slots;
                self.slots_key = Some(query.key);
                self.slots_source = Some(DataSource::Live);
                self.status = SyncStatus::Synced;
                ApplyOutcome::Applied { dropped }
            }
            Err(e) => {
                tracing::error!("Failed to load time slots for {}: {}", query.key, e);

                if self.fallback == FallbackPolicy::Demo && !self.has_live_slots_for(&query.key) {
                    tracing::warn!("Showing demo slots for {}", query.key);
                    self.slots = demo_time_slots();
                    self.slots_key = Some(query.key);
                    self.slots_source = Some(DataSource::Fallback);
                    self.selection.clear();
                    self.status = SyncStatus::Offline;
                    self.notifier.notify(
                        Notification::error("Failed to load time slots").with_description(
                            "Showing sample availability. Booking is disabled until the server responds.",
                        ),
                    );
                    return ApplyOutcome::Fallback;
                }

                self.status = SyncStatus::Error(e.to_string());
                self.notifier.notify(
                    Notification::error("Failed to load time slots")
                        .with_description("Unable to fetch available time slots. Please try again."),
                );
                ApplyOutcome::Failed
            }
        }
    }

    /// Replaces the court list and picks a court if none is selected yet.
    pub fn apply_courts(&mut self, result: Result<Vec<Court>, ApiError>) -> Option<SlotQuery> {
        match result {
            Ok(courts) => {
                self.courts = courts;
                self.courts_source = Some(DataSource::Live);
            }
            Err(e) => {
                tracing::error!("Failed to load courts: {}", e);
                self.notifier.notify(
                    Notification::error("Failed to load courts")
                        .with_description("Please refresh the page or try again later."),
                );

                if self.fallback == FallbackPolicy::Demo && self.courts.is_empty() {
                    tracing::warn!("Showing demo courts");
                    self.courts = demo_courts();
                    self.courts_source = Some(DataSource::Fallback);
                } else {
                    return None;
                }
            }
        }

        let selected_missing = self
            .selected_court
            .as_ref()
            .is_some_and(|id| !self.courts.iter().any(|court| &court.id == id));
        if selected_missing {
            tracing::warn!("Selected court is no longer offered");
            self.selected_court = None;
            self.key_changed();
        }

        if self.selected_court.is_some() {
            return None;
        }

        let court_id = self
            .default_court
            .as_ref()
            .filter(|id| self.courts.iter().any(|court| &court.id == *id))
            .or_else(|| self.courts.first().map(|court| &court.id))
            .cloned()?;
        self.choose_court(&court_id)
    }

    pub(super) async fn run_query(&mut self, query: SlotQuery) -> ApplyOutcome {
        let api = self.api();
        let result = query.run(api.as_ref()).await;
        self.apply_slots(query, result)
    }

    pub async fn load_courts(&mut self) -> Option<ApplyOutcome> {
        let result = self.api.fetch_courts().await;
        let query = self.apply_courts(result)?;
        Some(self.run_query(query).await)
    }

    pub async fn refresh(&mut self) -> Option<ApplyOutcome> {
        let query = self.begin_refresh()?;
        Some(self.run_query(query).await)
    }

    pub async fn select_court(&mut self, court_id: &str) -> Option<ApplyOutcome> {
        let query = self.choose_court(court_id)?;
        Some(self.run_query(query).await)
    }

    pub async fn select_date(
        &mut self,
        date: chrono::NaiveDate,
    ) -> Result<Option<ApplyOutcome>, WindowError> {
        match self.choose_date(date)? {
            Some(query) => Ok(Some(self.run_query(query).await)),
            None => Ok(None),
        }
    }

    pub async fn set_base_date(&mut self, date: chrono::NaiveDate) -> Option<ApplyOutcome> {
        let query = self.change_base_date(date)?;
        Some(self.run_query(query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::SlotStatus;
    use crate::notify::{NotificationLevel, ToastQueue};
    use crate::sync::api::MockBookingApi;
    use crate::sync::auth::AuthError;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn slot(id: &str, status: SlotStatus) -> TimeSlot {
        TimeSlot::new(id, id, status)
    }

    fn network_error() -> ApiError {
        ApiError::Auth(AuthError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }

    fn session_with(api: MockBookingApi, queue: Arc<ToastQueue>) -> BookingSession {
        BookingSession::new(Arc::new(api), queue, date(2024, 6, 1))
    }

    fn create_session() -> (BookingSession, Arc<ToastQueue>) {
        let queue = Arc::new(ToastQueue::new());
        (session_with(MockBookingApi::new(), queue.clone()), queue)
    }

    #[test]
    fn refresh_filters_selection_to_selectable_slots() {
        let (mut session, _) = create_session();
        let query = session.choose_court("court-1").unwrap();
        session.apply_slots(
            query,
            Ok(vec![
                slot("08:00", SlotStatus::Available),
                slot("09:00", SlotStatus::Available),
                slot("10:00", SlotStatus::Available),
            ]),
        );
        for id in ["08:00", "09:00", "10:00"] {
            session.toggle_slot(id);
        }

        let query = session.begin_refresh().unwrap();
        let outcome = session.apply_slots(
            query,
            Ok(vec![
                slot("08:00", SlotStatus::BookedYou),
                slot("09:00", SlotStatus::BookedOther),
            ]),
        );

        assert_eq!(
            outcome,
            ApplyOutcome::Applied {
                dropped: vec!["09:00".to_string(), "10:00".to_string()]
            }
        );
        assert_eq!(session.selection().ids(), ["08:00"]);
        assert_eq!(session.status(), &SyncStatus::Synced);
    }

    #[test]
    fn superseded_response_is_discarded() {
        let (mut session, queue) = create_session();
        session.choose_court("court-1");
        let first = session.choose_date(date(2024, 6, 2)).unwrap().unwrap();
        let second = session.choose_date(date(2024, 6, 3)).unwrap().unwrap();

        let applied = session.apply_slots(second, Ok(vec![slot("10:00", SlotStatus::Available)]));
        let stale = session.apply_slots(first, Ok(vec![slot("07:00", SlotStatus::Available)]));

        assert!(matches!(applied, ApplyOutcome::Applied { .. }));
        assert_eq!(stale, ApplyOutcome::Stale);
        assert_eq!(session.slots()[0].id, "10:00");
        assert_eq!(session.active_date(), date(2024, 6, 3));
        assert!(queue.is_empty());
    }

    #[test]
    fn stale_failure_is_not_reported() {
        let (mut session, queue) = create_session();
        let first = session.choose_court("court-1").unwrap();
        let second = session.choose_court("court-2").unwrap();
        session.apply_slots(second, Ok(vec![slot("10:00", SlotStatus::Available)]));

        let outcome = session.apply_slots(first, Err(network_error()));

        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(session.status(), &SyncStatus::Synced);
        assert!(queue.is_empty());
    }

    #[test]
    fn older_request_for_same_key_is_discarded() {
        let (mut session, _) = create_session();
        let first = session.choose_court("court-1").unwrap();
        let second = session.begin_refresh().unwrap();

        assert!(!session.is_current(&first));
        assert!(session.is_current(&second));
        assert_eq!(session.apply_slots(first, Ok(vec![])), ApplyOutcome::Stale);
    }

    #[test]
    fn failed_refresh_keeps_previous_state_and_notifies() {
        let (mut session, queue) = create_session();
        let query = session.choose_court("court-1").unwrap();
        session.apply_slots(query, Ok(vec![slot("10:00", SlotStatus::Available)]));
        session.toggle_slot("10:00");

        let query = session.begin_refresh().unwrap();
        let outcome = session.apply_slots(query, Err(network_error()));

        assert_eq!(outcome, ApplyOutcome::Failed);
        assert_eq!(session.slots().len(), 1);
        assert_eq!(session.selection().ids(), ["10:00"]);
        assert!(matches!(session.status(), SyncStatus::Error(_)));
        let toasts = queue.drain();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].level, NotificationLevel::Error);
    }

    #[test]
    fn demo_policy_substitutes_slots_marked_as_fallback() {
        let queue = Arc::new(ToastQueue::new());
        let mut session =
            session_with(MockBookingApi::new(), queue.clone()).with_fallback(FallbackPolicy::Demo);
        let query = session.choose_court("court-1").unwrap();

        let outcome = session.apply_slots(query, Err(network_error()));

        assert_eq!(outcome, ApplyOutcome::Fallback);
        assert_eq!(session.slots_source(), Some(DataSource::Fallback));
        assert_eq!(session.slots().len(), 16);
        assert_eq!(session.status(), &SyncStatus::Offline);
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn demo_policy_keeps_live_slots_for_same_key() {
        let (session, _) = create_session();
        let mut session = session.with_fallback(FallbackPolicy::Demo);
        let query = session.choose_court("court-1").unwrap();
        session.apply_slots(query, Ok(vec![slot("10:00", SlotStatus::Available)]));

        let query = session.begin_refresh().unwrap();
        let outcome = session.apply_slots(query, Err(network_error()));

        assert_eq!(outcome, ApplyOutcome::Failed);
        assert_eq!(session.slots_source(), Some(DataSource::Live));
        assert_eq!(session.slots().len(), 1);
    }

    #[test]
    fn courts_load_selects_first_court() {
        let (mut session, _) = create_session();

        let query = session
            .apply_courts(Ok(vec![
                Court::new("5", "Centre", "Indoor"),
                Court::new("6", "North", "Clay"),
            ]))
            .unwrap();

        assert_eq!(query.key().court_id, "5");
        assert_eq!(session.selected_court(), Some("5"));
    }

    #[test]
    fn courts_load_prefers_configured_default() {
        let (session, _) = create_session();
        let mut session = session.with_default_court(Some("6".to_string()));

        session.apply_courts(Ok(vec![
            Court::new("5", "Centre", "Indoor"),
            Court::new("6", "North", "Clay"),
        ]));

        assert_eq!(session.selected_court(), Some("6"));
    }

    #[test]
    fn courts_reload_keeps_existing_selection() {
        let (mut session, _) = create_session();
        session.apply_courts(Ok(vec![Court::new("5", "Centre", "Indoor")]));
        session.choose_court("5");

        let query = session.apply_courts(Ok(vec![
            Court::new("4", "West", "Grass"),
            Court::new("5", "Centre", "Indoor"),
        ]));

        assert!(query.is_none());
        assert_eq!(session.selected_court(), Some("5"));
    }

    #[test]
    fn courts_failure_without_policy_keeps_list() {
        let (mut session, queue) = create_session();
        session.apply_courts(Ok(vec![Court::new("5", "Centre", "Indoor")]));

        let query = session.apply_courts(Err(network_error()));

        assert!(query.is_none());
        assert_eq!(session.courts().len(), 1);
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn courts_failure_with_demo_policy_uses_demo_courts() {
        let (session, _) = create_session();
        let mut session = session.with_fallback(FallbackPolicy::Demo);

        let query = session.apply_courts(Err(network_error())).unwrap();

        assert_eq!(session.courts_source(), Some(DataSource::Fallback));
        assert_eq!(session.courts().len(), 4);
        assert_eq!(query.key().court_id, "court-1");
    }

    #[tokio::test]
    async fn load_courts_then_fetches_slots_for_first_court() {
        let mut api = MockBookingApi::new();
        api.expect_fetch_courts()
            .times(1)
            .returning(|| Ok(vec![Court::new("court-2", "Court 2", "Clay Court")]));
        api.expect_fetch_time_slots()
            .withf(|court_id, day| court_id.to_string() == "court-2" && *day == date(2024, 6, 1))
            .times(1)
            .returning(|_, _| Ok(vec![slot("10:00", SlotStatus::Available)]));
        let mut session = session_with(api, Arc::new(ToastQueue::new()));

        let outcome = session.load_courts().await;

        assert_eq!(outcome, Some(ApplyOutcome::Applied { dropped: vec![] }));
        assert_eq!(session.slots().len(), 1);
    }

    #[tokio::test]
    async fn select_date_fetches_new_key() {
        let mut api = MockBookingApi::new();
        api.expect_fetch_time_slots()
            .times(2)
            .returning(|_, day| {
                Ok(vec![slot(&day.format("%d").to_string(), SlotStatus::Available)])
            });
        let mut session = session_with(api, Arc::new(ToastQueue::new()));
        session.select_court("court-1").await;

        session.select_date(date(2024, 6, 4)).await.unwrap();

        assert_eq!(session.slots()[0].id, "04");
    }

    #[tokio::test]
    async fn refresh_without_court_does_nothing() {
        let mut api = MockBookingApi::new();
        api.expect_fetch_time_slots().times(0);
        let mut session = session_with(api, Arc::new(ToastQueue::new()));

        assert_eq!(session.refresh().await, None);
    }

    fn any_status() -> impl Strategy<Value = SlotStatus> {
        prop_oneof![
            Just(SlotStatus::Available),
            Just(SlotStatus::BookedOther),
            Just(SlotStatus::BookedYou),
            Just(SlotStatus::OutsideHours),
        ]
    }

    proptest! {
        #[test]
        fn applied_refresh_leaves_only_selectable_members(
            before in prop::collection::vec(any_status(), 6),
            after in prop::collection::vec(prop::option::of(any_status()), 6),
            toggles in prop::collection::vec(0usize..6, 0..20),
        ) {
            let mut api = MockBookingApi::new();
            let initial: Vec<TimeSlot> = before
                .iter()
                .enumerate()
                .map(|(i, status)| slot(&format!("s{}", i), *status))
                .collect();
            let refreshed: Vec<TimeSlot> = after
                .iter()
                .enumerate()
                .filter_map(|(i, status)| status.map(|s| slot(&format!("s{}", i), s)))
                .collect();
            let responses = std::sync::Mutex::new(vec![refreshed.clone(), initial]);
            api.expect_fetch_time_slots()
                .returning(move |_, _| Ok(responses.lock().unwrap().pop().unwrap_or_default()));
            let mut session = session_with(api, Arc::new(ToastQueue::new()));

            tokio_test::block_on(session.select_court("court-1"));
            for index in toggles {
                session.toggle_slot(&format!("s{}", index));
            }
            tokio_test::block_on(session.refresh());

            for id in session.selection().iter() {
                let found = refreshed.iter().find(|s| s.id == id);
                prop_assert!(found.is_some_and(|s| s.status.is_selectable()));
            }
        }
    }
}
