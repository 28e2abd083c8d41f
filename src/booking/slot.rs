use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotStatus {
    Available,
    BookedOther,
    BookedYou,
    OutsideHours,
}

impl SlotStatus {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "booked-other" => Some(Self::BookedOther),
            "booked-you" => Some(Self::BookedYou),
            "outside-hours" => Some(Self::OutsideHours),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::BookedOther => "booked-other",
            Self::BookedYou => "booked-you",
            Self::OutsideHours => "outside-hours",
        }
    }

    /// Whether a slot in this status may stay in the selection set after a refresh.
    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Available | Self::BookedYou)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::BookedOther => "Booked by Others",
            Self::BookedYou => "Your Bookings",
            Self::OutsideHours => "Outside Hours",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub label: String,
    pub status: SlotStatus,
    pub owner: Option<String>,
}

impl TimeSlot {
    pub fn new(id: impl Into<String>, label: impl Into<String>, status: SlotStatus) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            status,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Add,
    Remove,
    Ignore,
}

/// Decides what a toggle does to the selection set.
///
/// `BookedYou` only ever removes: a slot the user already holds can be
/// dropped from the pending selection but never re-added by a toggle.
/// `BookedOther` and `OutsideHours` are silent no-ops.
pub fn toggle_action(status: SlotStatus, selected: bool) -> ToggleAction {
    match (status, selected) {
        (SlotStatus::Available, false) => ToggleAction::Add,
        (SlotStatus::Available, true) => ToggleAction::Remove,
        (SlotStatus::BookedYou, true) => ToggleAction::Remove,
        (SlotStatus::BookedYou, false) => ToggleAction::Ignore,
        (SlotStatus::BookedOther, _) | (SlotStatus::OutsideHours, _) => ToggleAction::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [SlotStatus; 4] = [
        SlotStatus::Available,
        SlotStatus::BookedOther,
        SlotStatus::BookedYou,
        SlotStatus::OutsideHours,
    ];

    #[test]
    fn toggle_matches_truth_table() {
        let expected = [
            (SlotStatus::Available, false, ToggleAction::Add),
            (SlotStatus::Available, true, ToggleAction::Remove),
            (SlotStatus::BookedYou, false, ToggleAction::Ignore),
            (SlotStatus::BookedYou, true, ToggleAction::Remove),
            (SlotStatus::BookedOther, false, ToggleAction::Ignore),
            (SlotStatus::BookedOther, true, ToggleAction::Ignore),
            (SlotStatus::OutsideHours, false, ToggleAction::Ignore),
            (SlotStatus::OutsideHours, true, ToggleAction::Ignore),
        ];

        for (status, selected, action) in expected {
            assert_eq!(
                toggle_action(status, selected),
                action,
                "status {:?}, selected {}",
                status,
                selected
            );
        }
    }

    #[test]
    fn only_available_slots_are_ever_added() {
        for status in ALL_STATUSES {
            for selected in [false, true] {
                if toggle_action(status, selected) == ToggleAction::Add {
                    assert_eq!(status, SlotStatus::Available);
                }
            }
        }
    }

    #[test]
    fn wire_names_parse_back() {
        for status in ALL_STATUSES {
            assert_eq!(SlotStatus::from_wire(status.as_wire()), Some(status));
        }
        assert_eq!(SlotStatus::from_wire("maintenance"), None);
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&SlotStatus::BookedOther).unwrap();
        assert_eq!(json, "\"booked-other\"");
    }

    #[test]
    fn selectable_statuses_are_available_and_booked_you() {
        assert!(SlotStatus::Available.is_selectable());
        assert!(SlotStatus::BookedYou.is_selectable());
        assert!(!SlotStatus::BookedOther.is_selectable());
        assert!(!SlotStatus::OutsideHours.is_selectable());
    }
}
