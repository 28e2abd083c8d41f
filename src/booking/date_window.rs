use chrono::{Days, NaiveDate};
use thiserror::Error;

pub const WINDOW_DAYS: usize = 7;

#[derive(Debug, Error, PartialEq)]
pub enum WindowError {
    #[error("{date} is not within the 7 days starting {base}")]
    OutsideWindow { date: NaiveDate, base: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateOption {
    pub date: NaiveDate,
    pub value: String,
    pub label: String,
}

/// Seven consecutive days starting at a base date, with one of them active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    base: NaiveDate,
    active: NaiveDate,
}

/// Bases later than this would run the window past `NaiveDate::MAX`.
fn clamp_base(date: NaiveDate) -> NaiveDate {
    let latest = NaiveDate::MAX
        .checked_sub_days(Days::new(WINDOW_DAYS as u64 - 1))
        .unwrap_or(NaiveDate::MAX);
    if date > latest {
        tracing::warn!("Base date {} clamped to {}", date, latest);
        return latest;
    }
    date
}

impl DateWindow {
    pub fn new(base: NaiveDate) -> Self {
        let base = clamp_base(base);
        Self { base, active: base }
    }

    pub fn base(&self) -> NaiveDate {
        self.base
    }

    pub fn active(&self) -> NaiveDate {
        self.active
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.base
            .iter_days()
            .take(WINDOW_DAYS)
            .collect()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.base
            .checked_add_days(Days::new(WINDOW_DAYS as u64 - 1))
            .unwrap_or(self.base)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.base && date <= self.last_day()
    }

    /// Moves the window and makes the new base the active day.
    pub fn set_base_date(&mut self, date: NaiveDate) {
        let date = clamp_base(date);
        self.base = date;
        self.active = date;
    }

    pub fn set_active_date(&mut self, date: NaiveDate) -> Result<(), WindowError> {
        if !self.contains(date) {
            return Err(WindowError::OutsideWindow { date, base: self.base });
        }
        self.active = date;
        Ok(())
    }

    pub fn options(&self) -> Vec<DateOption> {
        self.days()
            .into_iter()
            .map(|date| DateOption {
                date,
                value: date.format("%Y-%m-%d").to_string(),
                label: date.format("%a, %b %-d").to_string(),
            })
            .collect()
    }

    pub fn describe(&self) -> String {
        format!(
            "Now showing 7 days starting from {}",
            self.base.format("%b %-d, %Y")
        )
    }
}
