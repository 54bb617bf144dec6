//! Appointment alert fan-out.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - Email, Telegram, Zulip and browser notifier implementations
//! - Dispatcher that sends one alert through every enabled channel

pub mod browser;
pub mod dispatcher;
pub mod email;
pub mod telegram;
pub mod traits;
pub mod zulip;

pub use dispatcher::{Channel, ChannelState, Dispatcher};
pub use traits::{DispatchResult, Notification, Notifier, NotifyError, Outcome};

/// Booking page linked from every outgoing alert.
pub const APPOINTMENT_URL: &str =
    "https://www.impfportal-niedersachsen.de/portal/#/appointment/public";
