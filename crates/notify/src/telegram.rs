//! Telegram Bot API notifier with Markdown formatting.
//!
//! Delivers notifications via the Telegram Bot API `sendMessage` endpoint,
//! one request per configured chat. Chats are served in order and the first
//! failure stops the rest.

use impf_core::config::TelegramConfig;

use crate::traits::{Notification, Notifier, NotifyError};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Render the chat text: bold alert line, then the link.
pub fn format_text(notification: &Notification) -> String {
    format!("*{}*\n{}", notification.subject, notification.body)
}

/// Sends notifications via the Telegram Bot API.
#[derive(Debug)]
pub struct TelegramNotifier {
    bot_token: String,
    chat_ids: Vec<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    /// Creates a new `TelegramNotifier` from configuration values.
    ///
    /// Returns [`NotifyError::Config`] if the token is empty.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, NotifyError> {
        if config.token.trim().is_empty() {
            return Err(NotifyError::Config(
                "Telegram bot token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            bot_token: config.token.trim().to_string(),
            chat_ids: config.chat_ids.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Point the notifier at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn send_to(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        tracing::debug!(chat_id, "Sending Telegram message");

        // The URL embeds the bot token; keep it out of error messages.
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = response.status();
        let resp_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        if resp_body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            tracing::debug!(chat_id, "Telegram message sent");
            return Ok(());
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp_body
                .get("parameters")
                .and_then(|p| p.get("retry_after"))
                .and_then(|v| v.as_u64())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let description = resp_body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Telegram API error");

        Err(NotifyError::Rejected {
            channel: "telegram",
            reason: format!("chat {chat_id}: {description}"),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let text = format_text(notification);
        for chat_id in &self.chat_ids {
            self.send_to(chat_id, &text).await?;
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}
