use super::slot::{SlotStatus, TimeSlot, ToggleAction, toggle_action};

/// Slot identifiers the user intends to book, in the order they were picked.
///
/// Only meaningful against the slot collection it was built from; owners
/// clear it whenever the (court, date) key changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, slot_id: &str) -> bool {
        self.ids.iter().any(|id| id == slot_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn toggle(&mut self, slot_id: &str, status: SlotStatus) -> ToggleAction {
        let action = toggle_action(status, self.contains(slot_id));
        match action {
            ToggleAction::Add => self.ids.push(slot_id.to_string()),
            ToggleAction::Remove => self.ids.retain(|id| id != slot_id),
            ToggleAction::Ignore => {}
        }
        action
    }

    /// Keeps only ids present in `slots` with a selectable status.
    /// Returns the ids that were dropped.
    pub fn retain_selectable(&mut self, slots: &[TimeSlot]) -> Vec<String> {
        let (kept, dropped): (Vec<String>, Vec<String>) =
            std::mem::take(&mut self.ids).into_iter().partition(|id| {
                slots
                    .iter()
                    .any(|slot| &slot.id == id && slot.status.is_selectable())
            });
        self.ids = kept;
        dropped
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.ids.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn slot(id: &str, status: SlotStatus) -> TimeSlot {
        TimeSlot::new(id, id, status)
    }

    #[test]
    fn toggle_adds_then_removes_available_slot() {
        let mut selection = SelectionSet::new();

        assert_eq!(selection.toggle("10:00", SlotStatus::Available), ToggleAction::Add);
        assert!(selection.contains("10:00"));

        assert_eq!(selection.toggle("10:00", SlotStatus::Available), ToggleAction::Remove);
        assert!(selection.is_empty());
    }

    #[test]
    fn booked_you_is_never_added() {
        let mut selection = SelectionSet::new();

        selection.toggle("12:00", SlotStatus::BookedYou);

        assert!(selection.is_empty());
    }

    #[test]
    fn booked_you_removes_existing_member() {
        let mut selection = SelectionSet::new();
        selection.toggle("12:00", SlotStatus::Available);

        assert_eq!(selection.toggle("12:00", SlotStatus::BookedYou), ToggleAction::Remove);
        assert!(selection.is_empty());
    }

    #[test]
    fn preserves_insertion_order() {
        let mut selection = SelectionSet::new();
        selection.toggle("14:00", SlotStatus::Available);
        selection.toggle("08:00", SlotStatus::Available);
        selection.toggle("11:00", SlotStatus::Available);

        assert_eq!(selection.ids(), ["14:00", "08:00", "11:00"]);
    }

    #[test]
    fn retain_selectable_drops_missing_and_blocked_ids() {
        let mut selection = SelectionSet::new();
        for id in ["08:00", "09:00", "10:00", "11:00"] {
            selection.toggle(id, SlotStatus::Available);
        }
        let refreshed = vec![
            slot("08:00", SlotStatus::Available),
            slot("09:00", SlotStatus::BookedOther),
            slot("10:00", SlotStatus::BookedYou),
        ];

        let dropped = selection.retain_selectable(&refreshed);

        assert_eq!(selection.ids(), ["08:00", "10:00"]);
        assert_eq!(dropped, vec!["09:00".to_string(), "11:00".to_string()]);
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
        fn blocked_slots_never_enter_selection(
            toggles in prop::collection::vec((0usize..6, any_status()), 0..60)
        ) {
            let mut selection = SelectionSet::new();
            for (index, status) in toggles {
                let id = format!("slot-{}", index);
                let before = selection.contains(&id);
                selection.toggle(&id, status);
                if !before && selection.contains(&id) {
                    prop_assert_eq!(status, SlotStatus::Available);
                }
            }
        }

        #[test]
        fn selection_never_holds_duplicates(
            toggles in prop::collection::vec((0usize..4, any_status()), 0..40)
        ) {
            let mut selection = SelectionSet::new();
            for (index, status) in toggles {
                selection.toggle(&format!("slot-{}", index), status);
            }
            let mut ids = selection.snapshot();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), selection.len());
        }
    }
}
