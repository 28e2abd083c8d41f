pub mod court;
pub mod date_window;
pub mod request;
pub mod selection;
pub mod slot;

pub use court::{Court, find_court};
pub use date_window::{DateOption, DateWindow, WINDOW_DAYS, WindowError};
pub use request::{BookingConfirmation, BookingPatch, BookingRequest, BookingState, SlotKey, UserBooking};
pub use selection::SelectionSet;
pub use slot::{SlotStatus, TimeSlot, ToggleAction, toggle_action};
