use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::booking::{BookingPatch, BookingRequest, BookingState, Court, SlotStatus, TimeSlot, UserBooking};
use crate::sync::auth::{AuthError, AuthProvider};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// The `message` field of a JSON error body, when the server sent one.
    pub fn server_message(&self) -> Option<String> {
        match self {
            ApiError::Auth(AuthError::Status { body, .. }) => serde_json::from_str::<Value>(body)
                .ok()?
                .get("message")?
                .as_str()
                .filter(|message| !message.trim().is_empty())
                .map(str::to_string),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingResponse {
    pub success: bool,
    pub booking_id: Option<String>,
    pub message: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn fetch_courts(&self) -> Result<Vec<Court>, ApiError>;

    async fn fetch_time_slots(
        &self,
        court_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, ApiError>;

    async fn create_booking(&self, request: &BookingRequest) -> Result<BookingResponse, ApiError>;

    async fn list_user_bookings(&self) -> Result<Vec<UserBooking>, ApiError>;

    async fn cancel_booking(&self, booking_id: &str) -> Result<BookingResponse, ApiError>;

    async fn update_booking(
        &self,
        booking_id: &str,
        patch: &BookingPatch,
    ) -> Result<BookingResponse, ApiError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCourt {
    #[serde(default, alias = "primarykey")]
    primary_key: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    court_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    court_desc: Option<String>,
    #[serde(default, rename = "type")]
    court_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CourtsResponse {
    #[serde(default)]
    courts: Vec<WireCourt>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTimeSlot {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    booked_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSlotsResponse {
    #[serde(default)]
    time_slots: Vec<WireTimeSlot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBookingResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    booking_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBooking {
    #[serde(default)]
    id: Option<Value>,
    court_id: Value,
    date: String,
    #[serde(default)]
    time_slots: Vec<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserBookingsResponse {
    #[serde(default)]
    bookings: Vec<WireBooking>,
}

fn key_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub fn parse_courts(body: &str) -> Result<Vec<Court>, ApiError> {
    let response: CourtsResponse = serde_json::from_str(body)?;
    let mut seen = HashSet::new();
    let mut courts = Vec::with_capacity(response.courts.len());

    for (index, wire) in response.courts.into_iter().enumerate() {
        let id = key_to_string(wire.primary_key.as_ref())
            .or_else(|| key_to_string(wire.id.as_ref()))
            .unwrap_or_else(|| format!("court-{}", index + 1));

        if !seen.insert(id.clone()) {
            tracing::warn!("Dropping court with duplicate id {}", id);
            continue;
        }

        let name = non_empty(wire.court_name)
            .or_else(|| non_empty(wire.name))
            .unwrap_or_else(|| format!("Court {}", index + 1));
        let description = non_empty(wire.court_desc)
            .or_else(|| non_empty(wire.court_type))
            .unwrap_or_else(|| "Standard Court".to_string());

        courts.push(Court { id, name, description });
    }

    Ok(courts)
}

pub fn parse_time_slots(body: &str) -> Result<Vec<TimeSlot>, ApiError> {
    let response: TimeSlotsResponse = serde_json::from_str(body)?;
    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(response.time_slots.len());

    for wire in response.time_slots {
        let Some(id) = key_to_string(wire.id.as_ref()) else {
            tracing::warn!("Dropping time slot without an id");
            continue;
        };
        if !seen.insert(id.clone()) {
            tracing::warn!("Dropping duplicate time slot {}", id);
            continue;
        }

        let status = match wire.status.as_deref() {
            Some(raw) => SlotStatus::from_wire(raw).unwrap_or_else(|| {
                tracing::warn!("Unknown slot status '{}' for {}", raw, id);
                SlotStatus::OutsideHours
            }),
            None => {
                tracing::warn!("Time slot {} has no status", id);
                SlotStatus::OutsideHours
            }
        };

        slots.push(TimeSlot {
            label: non_empty(wire.time).unwrap_or_else(|| id.clone()),
            id,
            status,
            owner: non_empty(wire.booked_by),
        });
    }

    Ok(slots)
}

pub fn parse_booking_response(body: &str) -> Result<BookingResponse, ApiError> {
    if body.trim().is_empty() {
        return Ok(BookingResponse {
            success: true,
            booking_id: None,
            message: None,
        });
    }

    let wire: WireBookingResponse = serde_json::from_str(body)?;
    Ok(BookingResponse {
        // A 2xx without an explicit flag counts as accepted.
        success: wire.success.unwrap_or(true),
        booking_id: key_to_string(wire.booking_id.as_ref()).or_else(|| key_to_string(wire.id.as_ref())),
        message: non_empty(wire.message),
    })
}

pub fn parse_user_bookings(body: &str) -> Result<Vec<UserBooking>, ApiError> {
    let response: UserBookingsResponse = serde_json::from_str(body)?;

    let bookings = response
        .bookings
        .into_iter()
        .filter_map(|wire| {
            let date = match NaiveDate::parse_from_str(&wire.date, "%Y-%m-%d") {
                Ok(date) => date,
                Err(e) => {
                    tracing::warn!("Skipping booking with invalid date '{}': {}", wire.date, e);
                    return None;
                }
            };
            let court_id = key_to_string(Some(&wire.court_id))?;
            let state = match wire.status.as_deref() {
                Some("confirmed") => Some(BookingState::Confirmed),
                Some("pending") => Some(BookingState::Pending),
                Some("cancelled") => Some(BookingState::Cancelled),
                _ => None,
            };

            Some(UserBooking {
                id: key_to_string(wire.id.as_ref()),
                court_id,
                date,
                time_slots: wire.time_slots,
                state,
            })
        })
        .collect();

    Ok(bookings)
}

/// Booking backend reached through the auth provider's bearer call primitive.
pub struct HttpBookingApi {
    auth: Arc<dyn AuthProvider>,
}

impl HttpBookingApi {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn fetch_courts(&self) -> Result<Vec<Court>, ApiError> {
        let body = self.auth.call_with_token("/courts", Method::GET, None).await?;
        let courts = parse_courts(&body)?;
        tracing::info!("Fetched {} courts", courts.len());
        Ok(courts)
    }

    async fn fetch_time_slots(
        &self,
        court_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, ApiError> {
        let path = format!(
            "/timeslots?court={}&date={}",
            urlencoding::encode(court_id),
            date.format("%Y-%m-%d")
        );

        tracing::info!("Fetching time slots for {} on {}", court_id, date);

        let body = self.auth.call_with_token(&path, Method::GET, None).await?;
        let slots = parse_time_slots(&body)?;
        tracing::info!("Fetched {} time slots for {} on {}", slots.len(), court_id, date);
        Ok(slots)
    }

    async fn create_booking(&self, request: &BookingRequest) -> Result<BookingResponse, ApiError> {
        let payload = serde_json::to_value(request)?;

        tracing::info!(
            "Creating booking on {} for {} ({} slots)",
            request.court_id(),
            request.date(),
            request.time_slots().len()
        );
        tracing::debug!("POST /bookings with payload: {}", payload);

        let body = self
            .auth
            .call_with_token("/bookings", Method::POST, Some(payload))
            .await?;
        parse_booking_response(&body)
    }

    async fn list_user_bookings(&self) -> Result<Vec<UserBooking>, ApiError> {
        let body = self
            .auth
            .call_with_token("/bookings/user", Method::GET, None)
            .await?;
        parse_user_bookings(&body)
    }

    async fn cancel_booking(&self, booking_id: &str) -> Result<BookingResponse, ApiError> {
        let path = booking_path(booking_id)?;
        tracing::info!("Cancelling booking {}", booking_id);

        let body = self.auth.call_with_token(&path, Method::DELETE, None).await?;
        Ok(with_booking_id(parse_booking_response(&body)?, booking_id))
    }

    async fn update_booking(
        &self,
        booking_id: &str,
        patch: &BookingPatch,
    ) -> Result<BookingResponse, ApiError> {
        let path = booking_path(booking_id)?;
        let payload = serde_json::to_value(patch)?;

        tracing::info!("Updating booking {}", booking_id);
        tracing::debug!("PATCH {} with payload: {}", path, payload);

        let body = self
            .auth
            .call_with_token(&path, Method::PATCH, Some(payload))
            .await?;
        Ok(with_booking_id(parse_booking_response(&body)?, booking_id))
    }
}

fn booking_path(booking_id: &str) -> Result<String, ApiError> {
    if booking_id.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Booking id is empty".to_string()));
    }
    Ok(format!("/bookings/{}", urlencoding::encode(booking_id)))
}

fn with_booking_id(mut response: BookingResponse, booking_id: &str) -> BookingResponse {
    if response.booking_id.is_none() {
        response.booking_id = Some(booking_id.to_string());
    }
    response
}
