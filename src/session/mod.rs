pub mod availability;
pub mod fallback;
pub mod submission;

use chrono::NaiveDate;
use std::sync::Arc;

use crate::booking::{
    Court, DateWindow, SelectionSet, SlotKey, TimeSlot, ToggleAction, WindowError, find_court,
};
use crate::notify::{Notification, Notifier};
use crate::storage::config::{Config, FallbackPolicy};
use crate::sync::api::BookingApi;

pub use availability::{ApplyOutcome, SlotQuery};
pub use submission::{BookingError, GENERIC_FAILURE, Submitted};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Offline,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingSummary {
    pub date: NaiveDate,
    pub court_name: Option<String>,
    pub slot_labels: Vec<String>,
    pub total_hours: usize,
}

/// Court, date and slot selection for one signed-in user.
///
/// All state changes happen through `&mut self`; network results are applied
/// through [`SlotQuery`] tickets so that answers for a superseded (court, date)
/// key are dropped instead of merged.
pub struct BookingSession {
    api: Arc<dyn BookingApi>,
    notifier: Arc<dyn Notifier>,
    fallback: FallbackPolicy,
    default_court: Option<String>,
    courts: Vec<Court>,
    courts_source: Option<DataSource>,
    selected_court: Option<String>,
    window: DateWindow,
    slots: Vec<TimeSlot>,
    slots_key: Option<SlotKey>,
    slots_source: Option<DataSource>,
    selection: SelectionSet,
    status: SyncStatus,
    last_query: u64,
}

impl BookingSession {
    pub fn new(api: Arc<dyn BookingApi>, notifier: Arc<dyn Notifier>, today: NaiveDate) -> Self {
        Self {
            api,
            notifier,
            fallback: FallbackPolicy::Disabled,
            default_court: None,
            courts: Vec::new(),
            courts_source: None,
            selected_court: None,
            window: DateWindow::new(today),
            slots: Vec::new(),
            slots_key: None,
            slots_source: None,
            selection: SelectionSet::new(),
            status: SyncStatus::Idle,
            last_query: 0,
        }
    }

    pub fn from_config(
        api: Arc<dyn BookingApi>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
        today: NaiveDate,
    ) -> Self {
        Self::new(api, notifier, today)
            .with_fallback(config.booking.fallback)
            .with_default_court(config.booking.default_court.clone())
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_default_court(mut self, court_id: Option<String>) -> Self {
        self.set_default_court(court_id);
        self
    }

    /// Court to pick when the court list loads and nothing is selected yet.
    pub fn set_default_court(&mut self, court_id: Option<String>) {
        self.default_court = court_id;
    }

    pub fn api(&self) -> Arc<dyn BookingApi> {
        Arc::clone(&self.api)
    }

    pub fn courts(&self) -> &[Court] {
        &self.courts
    }

    pub fn courts_source(&self) -> Option<DataSource> {
        self.courts_source
    }

    pub fn selected_court(&self) -> Option<&str> {
        self.selected_court.as_deref()
    }

    pub fn selected_court_info(&self) -> Option<&Court> {
        self.selected_court
            .as_deref()
            .and_then(|id| find_court(&self.courts, id))
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    pub fn active_date(&self) -> NaiveDate {
        self.window.active()
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn slots_source(&self) -> Option<DataSource> {
        self.slots_source
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn is_selected(&self, slot_id: &str) -> bool {
        self.selection.contains(slot_id)
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn current_key(&self) -> Option<SlotKey> {
        self.selected_court
            .as_ref()
            .map(|court_id| SlotKey::new(court_id.clone(), self.window.active()))
    }

    /// Selects a court. Returns the slot query to run when the key changed.
    pub fn choose_court(&mut self, court_id: &str) -> Option<SlotQuery> {
        if self.selected_court.as_deref() == Some(court_id) {
            return None;
        }
        tracing::info!("Court changed to {}", court_id);
        self.selected_court = Some(court_id.to_string());
        self.key_changed()
    }

    pub fn choose_date(&mut self, date: NaiveDate) -> Result<Option<SlotQuery>, WindowError> {
        if self.window.active() == date {
            return Ok(None);
        }
        self.window.set_active_date(date)?;
        tracing::info!("Active date changed to {}", date);
        Ok(self.key_changed())
    }

    /// Moves the 7-day window. The new base date becomes the active date.
    pub fn change_base_date(&mut self, date: NaiveDate) -> Option<SlotQuery> {
        let previous = self.window.active();
        self.window.set_base_date(date);

        self.notifier.notify(
            Notification::info("Date range updated").with_description(self.window.describe()),
        );

        if previous == self.window.active() {
            return None;
        }
        self.key_changed()
    }

    pub fn toggle_slot(&mut self, slot_id: &str) -> ToggleAction {
        let Some(slot) = self.slots.iter().find(|slot| slot.id == slot_id) else {
            tracing::debug!("Ignoring toggle for unknown slot {}", slot_id);
            return ToggleAction::Ignore;
        };
        self.selection.toggle(slot_id, slot.status)
    }

    pub fn summary(&self) -> BookingSummary {
        let slot_labels = self
            .selection
            .iter()
            .map(|id| {
                self.slots
                    .iter()
                    .find(|slot| slot.id == id)
                    .map(|slot| slot.label.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect();

        BookingSummary {
            date: self.window.active(),
            court_name: self.selected_court_info().map(|court| court.name.clone()),
            slot_labels,
            total_hours: self.selection.len(),
        }
    }

    fn key_changed(&mut self) -> Option<SlotQuery> {
        self.slots.clear();
        self.slots_key = None;
        self.slots_source = None;
        self.selection.clear();

        let key = self.current_key()?;
        Some(self.issue_query(key))
    }
}
