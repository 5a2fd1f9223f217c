mod auth;
mod client;
mod error;

pub use auth::{StaticToken, TokenProvider};
pub use client::GoogleCalendarClient;
pub use error::CalendarError;
