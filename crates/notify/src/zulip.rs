//! Zulip REST API notifier.
//!
//! Posts to `{site}/api/v1/messages` with HTTP basic auth (bot email + API
//! key). Stream messages carry a topic; direct messages do not.

use impf_core::config::ZulipConfig;
use serde::{Deserialize, Serialize};

use crate::traits::{Notification, Notifier, NotifyError};

/// Form body for `POST /api/v1/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub content: String,
}

impl SendPayload {
    /// Build the payload; `topic` is only set for `"stream"` targets.
    pub fn new(config: &ZulipConfig, content: impl Into<String>) -> Self {
        let topic = (config.target_type == "stream").then(|| config.topic.clone());
        Self {
            kind: config.target_type.clone(),
            to: config.target.clone(),
            topic,
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

/// Authenticated handle on one Zulip realm.
#[derive(Debug)]
pub struct ZulipClient {
    endpoint: url::Url,
    email: String,
    api_key: String,
    http: reqwest::Client,
}

impl ZulipClient {
    /// Validate credentials and resolve the messages endpoint.
    ///
    /// A site without scheme is treated as `https://`.
    pub fn new(
        email: &str,
        site: &str,
        api_key: &str,
        http: reqwest::Client,
    ) -> Result<Self, NotifyError> {
        if email.trim().is_empty() {
            return Err(NotifyError::Config("Zulip email is missing".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(NotifyError::Config("Zulip API key is missing".to_string()));
        }

        let site = site.trim().trim_end_matches('/');
        if site.is_empty() {
            return Err(NotifyError::Config("Zulip site is missing".to_string()));
        }
        let site = if site.contains("://") {
            site.to_string()
        } else {
            format!("https://{site}")
        };

        let endpoint = url::Url::parse(&format!("{site}/api/v1/messages"))
            .map_err(|e| NotifyError::Config(format!("invalid Zulip site '{site}': {e}")))?;

        Ok(Self {
            endpoint,
            email: email.trim().to_string(),
            api_key: api_key.trim().to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Send one message. Anything other than `result: "success"` is a rejection.
    pub async fn send_message(&self, payload: &SendPayload) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .basic_auth(&self.email, Some(&self.api_key))
            .form(payload)
            .send()
            .await?;

        let status = response.status();
        let body: SendResponse = response.json().await.unwrap_or_else(|_| SendResponse {
            result: None,
            msg: Some(format!("unparseable response (HTTP {status})")),
        });

        if body.result.as_deref() == Some("success") {
            return Ok(());
        }

        Err(NotifyError::Rejected {
            channel: "zulip",
            reason: body
                .msg
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP {status}")),
        })
    }
}

/// Sends notifications as Zulip stream or direct messages.
#[derive(Debug)]
pub struct ZulipNotifier {
    config: ZulipConfig,
    http: reqwest::Client,
}

impl ZulipNotifier {
    /// Credentials are checked at send time, not here.
    pub fn from_config(config: &ZulipConfig) -> Self {
        Self {
            config: config.clone(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for ZulipNotifier {
    /// A client that cannot be constructed is logged and the send becomes a no-op.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let client = match ZulipClient::new(
            &self.config.email,
            &self.config.site,
            &self.config.api_key,
            self.http.clone(),
        ) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(channel = "zulip", error = %e, "could not create Zulip client");
                return Ok(());
            }
        };

        let payload = SendPayload::new(&self.config, notification.subject.clone());
        client.send_message(&payload).await?;

        tracing::debug!(
            channel = "zulip",
            kind = %payload.kind,
            to = %payload.to,
            "Zulip message sent"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "zulip"
    }
}
