pub mod booking;
pub mod notify;
pub mod session;
pub mod storage;
pub mod sync;

pub use booking::{Court, DateWindow, SelectionSet, SlotStatus, TimeSlot, ToggleAction};
pub use session::{BookingError, BookingSession, SyncStatus};
