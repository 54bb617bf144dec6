//! Fans an alert out to every enabled channel.
//!
//! Channels run one after another in a fixed order: email, Telegram, Zulip,
//! browser. Individual channel failures are logged and don't block other
//! channels; nothing is returned to the caller of [`Dispatcher::alert`].

use impf_core::AlertConfig;
use tracing::{debug, error, info};

use crate::browser::BrowserNotifier;
use crate::email::EmailNotifier;
use crate::telegram::TelegramNotifier;
use crate::traits::{DispatchResult, Notification, Notifier, NotifyError, Outcome};
use crate::zulip::ZulipNotifier;

/// Whether and how a channel can be used.
pub enum ChannelState {
    Disabled,
    Ready(Box<dyn Notifier>),
    /// Enabled, but building the notifier failed. Reported on every alert.
    Misconfigured(NotifyError),
}

/// One entry of the fan-out list.
pub struct Channel {
    name: String,
    state: ChannelState,
}

impl Channel {
    pub fn new(name: impl Into<String>, state: ChannelState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        Self::new(name, ChannelState::Disabled)
    }

    /// Named after the notifier's own [`Notifier::channel_name`].
    pub fn ready(notifier: Box<dyn Notifier>) -> Self {
        let name = notifier.channel_name().to_string();
        Self::new(name, ChannelState::Ready(notifier))
    }

    /// Build the channel only when `enabled`; construction errors are kept.
    fn build<F>(name: &'static str, enabled: bool, build: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn Notifier>, NotifyError>,
    {
        if !enabled {
            return Self::disabled(name);
        }
        match build() {
            Ok(notifier) => Self::ready(notifier),
            Err(e) => {
                error!(channel = name, error = %e, "channel is enabled but misconfigured");
                Self::new(name, ChannelState::Misconfigured(e))
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, ChannelState::Disabled)
    }
}

/// Trace note that only shows up in verbose mode.
fn verbose_info(verbose: bool, channel: &str, note: &str) {
    if verbose {
        info!(channel, "{note}");
    }
}

/// Dispatches alerts to the configured channels.
pub struct Dispatcher {
    channels: Vec<Channel>,
}

impl Dispatcher {
    /// Create a dispatcher over an explicit channel list (kept in order).
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    /// Build the standard four channels from configuration.
    pub fn from_config(config: &AlertConfig) -> Self {
        let channels = vec![
            Channel::build("email", config.send_email, || {
                Ok(Box::new(EmailNotifier::from_config(&config.email)?) as Box<dyn Notifier>)
            }),
            Channel::build("telegram", config.send_telegram, || {
                Ok(Box::new(TelegramNotifier::from_config(&config.telegram)?) as Box<dyn Notifier>)
            }),
            Channel::build("zulip", config.send_zulip, || {
                Ok(Box::new(ZulipNotifier::from_config(&config.zulip)) as Box<dyn Notifier>)
            }),
            Channel::build("browser", config.open_browser, || {
                Ok(Box::new(BrowserNotifier::from_config(&config.browser)) as Box<dyn Notifier>)
            }),
        ];
        Self::new(channels)
    }

    /// Names of the channels that will be attempted.
    pub fn enabled_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.name())
            .collect()
    }

    /// Send `message` through every enabled channel. Never fails.
    pub async fn alert(&self, message: &str, verbose: bool) {
        let notification = Notification::new(message);
        let results = self.dispatch(&notification, verbose).await;
        debug!(
            attempted = results.iter().filter(|r| r.attempted()).count(),
            "alert dispatched"
        );
    }

    /// Deliver a notification and report what each channel did.
    pub async fn dispatch(&self, notification: &Notification, verbose: bool) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let name = channel.name();
            let start = std::time::Instant::now();

            let outcome = match &channel.state {
                ChannelState::Disabled => {
                    verbose_info(verbose, name, "channel is not enabled, skipping");
                    Outcome::Skipped
                }
                ChannelState::Misconfigured(e) => {
                    error!(channel = name, error = %e, "Notification delivery failed");
                    Outcome::Failed(e.to_string())
                }
                ChannelState::Ready(notifier) => {
                    verbose_info(verbose, name, "trying to deliver notification");
                    match notifier.send(notification).await {
                        Ok(()) => {
                            verbose_info(verbose, name, "notification delivered");
                            Outcome::Delivered
                        }
                        Err(e) => {
                            error!(channel = name, error = %e, "Notification delivery failed");
                            Outcome::Failed(e.to_string())
                        }
                    }
                }
            };

            results.push(DispatchResult {
                channel: name.to_string(),
                outcome,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::APPOINTMENT_URL;
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    struct MockNotifier {
        name: &'static str,
        sent: Arc<Mutex<Vec<Notification>>>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notification.clone());
            if self.should_fail {
                Err(NotifyError::Smtp("mock failure".to_string()))
            } else {
                Ok(())
            }
        }
        fn channel_name(&self) -> &str {
            self.name
        }
    }

    const NAMES: [&str; 4] = ["email", "telegram", "zulip", "browser"];

    /// Four mock channels; `enabled[i]` toggles channel i, `failing[i]` makes it error.
    fn mocked(
        enabled: [bool; 4],
        failing: [bool; 4],
    ) -> (Dispatcher, Vec<Arc<Mutex<Vec<Notification>>>>) {
        let mut logs = Vec::new();
        let mut channels = Vec::new();
        for i in 0..4 {
            let sent = Arc::new(Mutex::new(Vec::new()));
            logs.push(sent.clone());
            if enabled[i] {
                channels.push(Channel::ready(Box::new(MockNotifier {
                    name: NAMES[i],
                    sent,
                    should_fail: failing[i],
                })));
            } else {
                channels.push(Channel::disabled(NAMES[i]));
            }
        }
        (Dispatcher::new(channels), logs)
    }

    #[tokio::test]
    async fn attempts_exactly_the_enabled_channels() {
        for mask in 0u8..16 {
            let enabled = [mask & 1 != 0, mask & 2 != 0, mask & 4 != 0, mask & 8 != 0];
            let (dispatcher, logs) = mocked(enabled, [false; 4]);

            let results = dispatcher.dispatch(&Notification::new("x"), true).await;

            assert_eq!(results.len(), 4);
            for i in 0..4 {
                let sends = logs[i].lock().unwrap().len();
                assert_eq!(sends, usize::from(enabled[i]), "mask {mask:#06b}, channel {}", NAMES[i]);
                let expected = if enabled[i] { Outcome::Delivered } else { Outcome::Skipped };
                assert_eq!(results[i].outcome, expected);
            }
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_later_ones() {
        let (dispatcher, logs) = mocked([true, false, true, false], [true, false, false, false]);

        let results = dispatcher.dispatch(&Notification::new("x"), false).await;

        assert!(matches!(results[0].outcome, Outcome::Failed(_)));
        assert_eq!(results[2].outcome, Outcome::Delivered);
        assert_eq!(logs[2].lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn every_channel_failing_still_returns_normally() {
        let (dispatcher, logs) = mocked([true; 4], [true; 4]);
        dispatcher.alert("x", true).await;
        for log in &logs {
            assert_eq!(log.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn channels_run_in_fixed_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        struct Ordered {
            name: &'static str,
            order: Arc<Mutex<Vec<&'static str>>>,
        }

        #[async_trait::async_trait]
        impl Notifier for Ordered {
            async fn send(&self, _n: &Notification) -> Result<(), NotifyError> {
                self.order.lock().unwrap().push(self.name);
                Ok(())
            }
            fn channel_name(&self) -> &str {
                self.name
            }
        }

        let channels = NAMES
            .iter()
            .map(|&name| {
                Channel::ready(Box::new(Ordered {
                    name,
                    order: order.clone(),
                }))
            })
            .collect();

        Dispatcher::new(channels).alert("x", false).await;
        assert_eq!(*order.lock().unwrap(), NAMES.to_vec());
    }

    #[tokio::test]
    async fn only_email_enabled_sends_one_mail() {
        let (dispatcher, logs) = mocked([true, false, false, false], [false; 4]);

        dispatcher.alert("Slot available!", false).await;

        let mails = logs[0].lock().unwrap();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].subject, "Slot available!");
        assert!(mails[0].body.contains(APPOINTMENT_URL));
        for log in &logs[1..] {
            assert!(log.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn all_disabled_does_nothing() {
        let (dispatcher, logs) = mocked([false; 4], [false; 4]);

        dispatcher.alert("x", false).await;

        assert!(dispatcher.enabled_channels().is_empty());
        let calls: usize = logs.iter().map(|log| log.lock().unwrap().len()).sum();
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn misconfigured_channel_is_reported_as_failure() {
        let config = AlertConfig {
            send_email: true,
            email: impf_core::config::EmailConfig {
                server: "smtp.example.com".to_string(),
                sender: "not-an-address".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let dispatcher = Dispatcher::from_config(&config);

        assert_eq!(dispatcher.enabled_channels(), vec!["email"]);
        let results = dispatcher.dispatch(&Notification::new("x"), true).await;
        assert!(matches!(results[0].outcome, Outcome::Failed(_)));
        assert!(results[1..].iter().all(|r| !r.attempted()));
    }

    #[test]
    fn from_config_respects_toggles() {
        let config = AlertConfig {
            send_telegram: true,
            telegram: impf_core::config::TelegramConfig {
                token: "123:ABC".to_string(),
                chat_ids: vec!["1".to_string()],
            },
            open_browser: true,
            ..Default::default()
        };
        let dispatcher = Dispatcher::from_config(&config);
        assert_eq!(dispatcher.enabled_channels(), vec!["telegram", "browser"]);
    }

    #[test]
    fn ready_channel_is_named_by_its_notifier() {
        let channel = Channel::ready(Box::new(MockNotifier {
            name: "zulip",
            sent: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }));
        assert_eq!(channel.name(), "zulip");
        assert!(channel.is_enabled());
    }

    #[tokio::test]
    #[traced_test]
    async fn verbose_logs_skip_try_and_delivery_notes() {
        let (dispatcher, _logs) = mocked([true, false, false, false], [false; 4]);

        dispatcher.alert("x", true).await;

        logs_assert(|lines: &[&str]| {
            let has = |note: &str, channel: &str| {
                lines.iter().any(|l| l.contains(note) && l.contains(channel))
            };
            if !has("trying to deliver notification", "email") {
                return Err("missing trying note for email".to_string());
            }
            if !has("notification delivered", "email") {
                return Err("missing delivered note for email".to_string());
            }
            for channel in ["telegram", "zulip", "browser"] {
                if !has("channel is not enabled, skipping", channel) {
                    return Err(format!("missing skip note for {channel}"));
                }
            }
            Ok(())
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn quiet_mode_emits_no_trace_notes() {
        let (dispatcher, _logs) = mocked([true, false, true, false], [false; 4]);

        dispatcher.alert("x", false).await;

        assert!(!logs_contain("channel is not enabled, skipping"));
        assert!(!logs_contain("trying to deliver notification"));
        assert!(!logs_contain("notification delivered"));
    }

    #[tokio::test]
    #[traced_test]
    async fn failure_is_logged_with_channel_name_even_when_quiet() {
        let (dispatcher, _logs) = mocked([true, false, true, false], [true, false, false, false]);

        dispatcher.alert("x", false).await;

        logs_assert(|lines: &[&str]| {
            let failed: Vec<&&str> = lines
                .iter()
                .filter(|l| l.contains("Notification delivery failed"))
                .collect();
            match failed.as_slice() {
                [line]
                    if line.contains("ERROR")
                        && line.contains("email")
                        && line.contains("mock failure") =>
                {
                    Ok(())
                }
                other => Err(format!("expected one email failure line, got: {other:?}")),
            }
        });
    }
}
