//! Opens the appointment page in the local browser.
//!
//! `BROWSER` may hold several commands separated by the platform path
//! separator (`:` on Unix, `;` on Windows). They are tried in order until one
//! exits successfully. A `%s` argument is replaced by the URL; without one the
//! URL is appended.

use impf_core::config::BrowserConfig;
use tokio::process::Command;

use crate::traits::{Notification, Notifier, NotifyError};

const URL_PLACEHOLDER: &str = "%s";

#[cfg(windows)]
const COMMAND_SEPARATOR: char = ';';
#[cfg(not(windows))]
const COMMAND_SEPARATOR: char = ':';

/// Program plus argument template for one browser command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    program: String,
    args: Vec<String>,
}

impl Launcher {
    /// The launcher shipped with the OS.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("open", &[])
        } else if cfg!(target_os = "windows") {
            Self::new("cmd", &["/C", "start", ""])
        } else {
            Self::new("xdg-open", &[])
        }
    }

    /// Parse one command (whitespace separated).
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Parse a `BROWSER` value into its commands, blanks dropped.
    pub fn list_from_env_value(value: &str) -> Vec<Self> {
        value
            .split(COMMAND_SEPARATOR)
            .filter_map(Self::from_command_line)
            .collect()
    }

    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Final argument list for `url`.
    pub fn args_for(&self, url: &str) -> Vec<String> {
        if self.args.iter().any(|a| a.contains(URL_PLACEHOLDER)) {
            self.args
                .iter()
                .map(|a| a.replace(URL_PLACEHOLDER, url))
                .collect()
        } else {
            let mut args = self.args.clone();
            args.push(url.to_string());
            args
        }
    }

    async fn open(&self, url: &str) -> Result<(), NotifyError> {
        let status = Command::new(&self.program)
            .args(self.args_for(url))
            .status()
            .await
            .map_err(|e| NotifyError::Browser(format!("{}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::Browser(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}

/// Opens the appointment URL in a new window.
#[derive(Debug)]
pub struct BrowserNotifier {
    launchers: Vec<Launcher>,
}

impl BrowserNotifier {
    pub fn from_config(config: &BrowserConfig) -> Self {
        let launchers = config
            .command
            .as_deref()
            .map(Launcher::list_from_env_value)
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec![Launcher::platform_default()]);
        Self { launchers }
    }

    pub fn with_launchers(launchers: Vec<Launcher>) -> Self {
        Self { launchers }
    }
}

#[async_trait::async_trait]
impl Notifier for BrowserNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut failures = Vec::new();

        for launcher in &self.launchers {
            tracing::debug!(program = %launcher.program, url = %notification.body, "Opening browser");
            match launcher.open(&notification.body).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(program = %launcher.program, error = %e, "browser command failed");
                    failures.push(e.to_string());
                }
            }
        }

        Err(NotifyError::Browser(if failures.is_empty() {
            "no browser command configured".to_string()
        } else {
            failures.join("; ")
        }))
    }

    fn channel_name(&self) -> &str {
        "browser"
    }
}
