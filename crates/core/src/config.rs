use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Boolean toggle: `true`, `1`, `yes`, `on` (any case) enable, everything else disables.
fn env_flag(key: &str) -> bool {
    env_opt(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(false)
}

/// Comma separated list, blanks dropped.
fn env_list(key: &str) -> Vec<String> {
    env_opt(key)
        .map(|v| split_list(&v))
        .unwrap_or_default()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Top-level config ──────────────────────────────────────────

/// Channel toggles and credentials. Read once at startup, never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertConfig {
    pub send_email: bool,
    pub send_telegram: bool,
    pub send_zulip: bool,
    pub open_browser: bool,
    pub email: EmailConfig,
    pub telegram: TelegramConfig,
    pub zulip: ZulipConfig,
    pub browser: BrowserConfig,
}

impl AlertConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            send_email: env_flag("SEND_EMAIL"),
            send_telegram: env_flag("SEND_TELEGRAM_MSG"),
            send_zulip: env_flag("SEND_ZULIP"),
            open_browser: env_flag("OPEN_BROWSER"),
            email: EmailConfig::from_env(),
            telegram: TelegramConfig::from_env(),
            zulip: ZulipConfig::from_env(),
            browser: BrowserConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Alert config loaded:");
        tracing::info!(
            "  email:    enabled={}, server={}, port={}, receivers={}",
            self.send_email,
            self.email.server,
            self.email.port,
            self.email.receivers.len()
        );
        tracing::info!(
            "  telegram: enabled={}, chats={}",
            self.send_telegram,
            self.telegram.chat_ids.len()
        );
        tracing::info!(
            "  zulip:    enabled={}, site={}, type={}, target={}",
            self.send_zulip,
            self.zulip.site,
            self.zulip.target_type,
            self.zulip.target
        );
        tracing::info!(
            "  browser:  enabled={}, command={}",
            self.open_browser,
            self.browser.command.as_deref().unwrap_or("(platform default)")
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "email": {
                "enabled": self.send_email,
                "server": self.email.server,
                "port": self.email.port,
                "sender": self.email.sender,
                "receivers": self.email.receivers.len(),
                "configured": self.email.is_configured(),
            },
            "telegram": {
                "enabled": self.send_telegram,
                "chat_ids": self.telegram.chat_ids.len(),
                "configured": self.telegram.is_configured(),
            },
            "zulip": {
                "enabled": self.send_zulip,
                "site": self.zulip.site,
                "type": self.zulip.target_type,
                "target": self.zulip.target,
                "topic": self.zulip.topic,
                "configured": self.zulip.is_configured(),
            },
            "browser": {
                "enabled": self.open_browser,
                "command": self.browser.command,
            },
        })
    }
}

// ── Email / SMTP ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub server: String,
    /// Kept as text: `"465"` selects implicit TLS.
    pub port: String,
    pub sender: String,
    pub password: String,
    /// Blind-copy recipients.
    pub receivers: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: "465".to_string(),
            sender: String::new(),
            password: String::new(),
            receivers: Vec::new(),
        }
    }
}

impl EmailConfig {
    fn from_env() -> Self {
        Self {
            server: env_or("SERVER", ""),
            port: env_or("PORT", "465"),
            sender: env_or("SENDER", ""),
            password: env_or("PASSWORD", ""),
            receivers: env_list("EMAIL_RECEIVERS"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.server.is_empty() && !self.sender.is_empty()
    }
}

// ── Telegram ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_ids: Vec<String>,
}

impl TelegramConfig {
    fn from_env() -> Self {
        Self {
            token: env_or("TOKEN", ""),
            chat_ids: env_list("CHAT_IDS"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.chat_ids.is_empty()
    }
}

// ── Zulip ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZulipConfig {
    pub email: String,
    pub site: String,
    pub api_key: String,
    /// `"stream"` or a direct target type (`"private"`, `"direct"`).
    pub target_type: String,
    pub target: String,
    /// Only sent when `target_type` is `"stream"`.
    pub topic: String,
}

impl Default for ZulipConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            site: String::new(),
            api_key: String::new(),
            target_type: "stream".to_string(),
            target: String::new(),
            topic: String::new(),
        }
    }
}

impl ZulipConfig {
    fn from_env() -> Self {
        Self {
            email: env_or("ZULIP_MAIL", ""),
            site: env_or("ZULIP_URL", ""),
            api_key: env_or("ZULIP_KEY", ""),
            target_type: env_or("ZULIP_TYPE", "stream"),
            target: env_or("ZULIP_TARGET", ""),
            topic: env_or("ZULIP_TOPIC", ""),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.email.is_empty() && !self.site.is_empty() && !self.api_key.is_empty()
    }
}

// ── Browser ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Launcher override from `BROWSER`; platform opener when unset.
    pub command: Option<String>,
}

impl BrowserConfig {
    fn from_env() -> Self {
        Self {
            command: env_opt("BROWSER"),
        }
    }
}
