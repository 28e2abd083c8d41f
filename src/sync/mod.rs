pub mod api;
pub mod auth;

pub use api::{ApiError, BookingApi, BookingResponse, HttpBookingApi};
pub use auth::{AuthError, AuthProvider, AuthState, BearerAuthProvider, TokenInfo, TokenStorage, UserIdentity};
