use thiserror::Error;

use crate::booking::{BookingConfirmation, BookingPatch, BookingRequest, UserBooking};
use crate::notify::Notification;
use crate::sync::api::{ApiError, BookingResponse};

use super::{BookingSession, DataSource, SlotQuery};

pub const GENERIC_FAILURE: &str = "Booking failed. Please try again.";
const GENERIC_CANCEL_FAILURE: &str = "Failed to cancel booking. Please try again.";
const GENERIC_UPDATE_FAILURE: &str = "Failed to update booking. Please try again.";

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Please select a court")]
    NoCourtSelected,
    #[error("Please select at least one time slot")]
    EmptySelection,
    #[error("Availability for this court and date has not been confirmed by the server")]
    UnverifiedAvailability,
    #[error("Please choose a booking")]
    MissingBookingId,
    #[error("Nothing to update")]
    EmptyUpdate,
    #[error("{0}")]
    Rejected(String),
    #[error("Booking request failed: {0}")]
    Failed(#[from] ApiError),
}

impl BookingError {
    /// Raised before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::NoCourtSelected
                | BookingError::EmptySelection
                | BookingError::UnverifiedAvailability
                | BookingError::MissingBookingId
                | BookingError::EmptyUpdate
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            BookingError::Rejected(message) => message.clone(),
            BookingError::Failed(e) => e
                .server_message()
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            other => other.to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum BookingChange {
    Cancel,
    Update,
}

impl BookingChange {
    fn verb(self) -> &'static str {
        match self {
            BookingChange::Cancel => "Cancelling",
            BookingChange::Update => "Updating",
        }
    }

    fn success(self) -> &'static str {
        match self {
            BookingChange::Cancel => "Booking cancelled successfully",
            BookingChange::Update => "Booking updated successfully",
        }
    }

    fn generic_failure(self) -> &'static str {
        match self {
            BookingChange::Cancel => GENERIC_CANCEL_FAILURE,
            BookingChange::Update => GENERIC_UPDATE_FAILURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub confirmation: BookingConfirmation,
    /// Refresh to run so newly booked slots show as booked by the user.
    pub refresh: Option<SlotQuery>,
}

impl BookingSession {
    /// Snapshots (court, date, selection) into a request, or fails without I/O.
    pub fn prepare_submission(&self) -> Result<BookingRequest, BookingError> {
        self.validate_submission().map_err(|e| self.reject(e))
    }

    fn reject(&self, error: BookingError) -> BookingError {
        tracing::warn!("Booking request not sent: {}", error);
        self.notifier.notify(Notification::error(error.user_message()));
        error
    }

    fn validate_submission(&self) -> Result<BookingRequest, BookingError> {
        let key = self.current_key().ok_or(BookingError::NoCourtSelected)?;

        if self.selection.is_empty() {
            return Err(BookingError::EmptySelection);
        }

        let live = self.slots_source == Some(DataSource::Live) && self.slots_key.as_ref() == Some(&key);
        if !live {
            return Err(BookingError::UnverifiedAvailability);
        }

        Ok(BookingRequest::new(key.court_id, key.date, self.selection.snapshot()))
    }

    /// Applies the backend's answer for `request`.
    ///
    /// On success the selection is cleared and a refresh is issued, provided the
    /// user is still looking at the request's (court, date). On failure the
    /// selection is left untouched so the user can retry.
    pub fn complete_submission(
        &mut self,
        request: &BookingRequest,
        result: Result<BookingResponse, ApiError>,
    ) -> Result<Submitted, BookingError> {
        let response = match result {
            Ok(response) if response.success => response,
            Ok(response) => {
                let error = BookingError::Rejected(
                    response
                        .message
                        .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
                );
                return Err(self.report_failure(error));
            }
            Err(e) => return Err(self.report_failure(BookingError::Failed(e))),
        };

        tracing::info!(
            "Booked {} slots on {} ({:?})",
            request.time_slots().len(),
            request.key(),
            response.booking_id
        );
        self.notifier.notify(
            Notification::success("Booking successful!")
                .with_description("Your court has been booked successfully."),
        );

        let refresh = if self.current_key().as_ref() == Some(&request.key()) {
            self.selection.clear();
            self.begin_refresh()
        } else {
            tracing::info!("Key changed while booking; skipping refresh");
            None
        };

        Ok(Submitted {
            confirmation: BookingConfirmation {
                booking_id: response.booking_id,
                message: response.message,
            },
            refresh,
        })
    }

    fn report_failure(&self, error: BookingError) -> BookingError {
        tracing::error!("Booking failed: {}", error);
        self.notifier.notify(Notification::error(error.user_message()));
        error
    }

    /// One submission attempt. Never retried automatically.
    pub async fn submit(&mut self) -> Result<BookingConfirmation, BookingError> {
        let request = self.prepare_submission()?;
        let api = self.api();
        let result = api.create_booking(&request).await;

        let submitted = self.complete_submission(&request, result)?;
        if let Some(query) = submitted.refresh {
            self.run_query(query).await;
        }
        Ok(submitted.confirmation)
    }

    pub async fn cancel_booking(&mut self, booking_id: &str) -> Result<BookingConfirmation, BookingError> {
        if booking_id.trim().is_empty() {
            return Err(self.reject(BookingError::MissingBookingId));
        }
        let api = self.api();
        let result = api.cancel_booking(booking_id).await;
        self.finish_change(BookingChange::Cancel, booking_id, result).await
    }

    /// Sends a partial update for an existing booking. One attempt, no retry.
    pub async fn update_booking(
        &mut self,
        booking_id: &str,
        patch: &BookingPatch,
    ) -> Result<BookingConfirmation, BookingError> {
        if booking_id.trim().is_empty() {
            return Err(self.reject(BookingError::MissingBookingId));
        }
        if patch.is_empty() {
            return Err(self.reject(BookingError::EmptyUpdate));
        }
        let api = self.api();
        let result = api.update_booking(booking_id, patch).await;
        self.finish_change(BookingChange::Update, booking_id, result).await
    }

    async fn finish_change(
        &mut self,
        change: BookingChange,
        booking_id: &str,
        result: Result<BookingResponse, ApiError>,
    ) -> Result<BookingConfirmation, BookingError> {
        let response = match result {
            Ok(response) if response.success => response,
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| change.generic_failure().to_string());
                return Err(self.report_failure(BookingError::Rejected(message)));
            }
            Err(e) => {
                let message = e
                    .server_message()
                    .unwrap_or_else(|| change.generic_failure().to_string());
                tracing::error!("{} {} failed: {}", change.verb(), booking_id, e);
                self.notifier.notify(Notification::error(message));
                return Err(BookingError::Failed(e));
            }
        };

        tracing::info!("{} {} done", change.verb(), booking_id);
        self.notifier.notify(Notification::success(change.success()));

        if let Some(query) = self.begin_refresh() {
            self.run_query(query).await;
        }

        Ok(BookingConfirmation {
            booking_id: response.booking_id,
            message: response.message,
        })
    }

    pub async fn user_bookings(&self) -> Result<Vec<UserBooking>, ApiError> {
        let result = self.api.list_user_bookings().await;
        if let Err(e) = &result {
            tracing::error!("Failed to load user bookings: {}", e);
            self.notifier.notify(
                Notification::error("Failed to load your bookings")
                    .with_description("Please try again later."),
            );
        }
        result
    }
}
