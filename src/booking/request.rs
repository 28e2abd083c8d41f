use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The (court, date) pair a slot collection belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub court_id: String,
    pub date: NaiveDate,
}

impl SlotKey {
    pub fn new(court_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            court_id: court_id.into(),
            date,
        }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.court_id, self.date.format("%Y-%m-%d"))
    }
}

/// Snapshot of a selection taken at submit time. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    court_id: String,
    #[serde(with = "wire_date")]
    date: NaiveDate,
    time_slots: Vec<String>,
}

impl BookingRequest {
    pub fn new(court_id: impl Into<String>, date: NaiveDate, time_slots: Vec<String>) -> Self {
        Self {
            court_id: court_id.into(),
            date,
            time_slots,
        }
    }

    pub fn court_id(&self) -> &str {
        &self.court_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time_slots(&self) -> &[String] {
        &self.time_slots
    }

    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.court_id.clone(), self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfirmation {
    pub booking_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    Confirmed,
    Pending,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBooking {
    pub id: Option<String>,
    pub court_id: String,
    pub date: NaiveDate,
    pub time_slots: Vec<String>,
    pub state: Option<BookingState>,
}

/// Partial update of an existing booking. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court_id: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "wire_date::serialize_opt"
    )]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_slots: Option<Vec<String>>,
    #[serde(rename = "status", skip_serializing_if = "Option::is_none")]
    pub state: Option<BookingState>,
}

impl BookingPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_court(mut self, court_id: impl Into<String>) -> Self {
        self.court_id = Some(court_id.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_time_slots(mut self, time_slots: Vec<String>) -> Self {
        self.time_slots = Some(time_slots);
        self
    }

    pub fn with_state(mut self, state: BookingState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.court_id.is_none()
            && self.date.is_none()
            && self.time_slots.is_none()
            && self.state.is_none()
    }
}

pub(crate) mod wire_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn serialize_opt<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
