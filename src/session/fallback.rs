//! Sample courts and slots shown when the backend is unreachable and the
//! `demo` fallback policy is configured. Never used for submission.

use crate::booking::{Court, SlotStatus, TimeSlot};

pub fn demo_courts() -> Vec<Court> {
    vec![
        Court::new("court-1", "Court 1", "Hard Court"),
        Court::new("court-2", "Court 2", "Clay Court"),
        Court::new("court-3", "Court 3", "Hard Court"),
        Court::new("court-4", "Court 4", "Grass Court"),
    ]
}

pub fn demo_time_slots() -> Vec<TimeSlot> {
    (6..22)
        .map(|hour| {
            let status = match hour {
                6 | 7 | 20 | 21 => SlotStatus::OutsideHours,
                9 | 15 => SlotStatus::BookedOther,
                12 => SlotStatus::BookedYou,
                _ => SlotStatus::Available,
            };
            TimeSlot::new(format!("{:02}:00", hour), twelve_hour_label(hour), status)
        })
        .collect()
}

fn twelve_hour_label(hour: u32) -> String {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{:02}:00 {}", display, suffix)
}
