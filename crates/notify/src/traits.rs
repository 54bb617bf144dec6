//! Notifier trait definition and shared error types.

use crate::APPOINTMENT_URL;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Delivery rejected by {channel}: {reason}")]
    Rejected { channel: &'static str, reason: String },

    #[error("Browser launch failed: {0}")]
    Browser(String),
}

/// A notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Notification {
    /// The alert text as handed to [`crate::Dispatcher::alert`].
    pub subject: String,
    /// Always the appointment URL.
    pub body: String,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            subject: message.into(),
            body: APPOINTMENT_URL.to_string(),
        }
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "email", "zulip").
    fn channel_name(&self) -> &str;
}

/// What happened to one channel during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    Failed(String),
    Skipped,
}

/// Result of dispatching a notification to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

impl DispatchResult {
    pub fn attempted(&self) -> bool {
        self.outcome != Outcome::Skipped
    }
}
