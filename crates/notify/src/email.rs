//! SMTP email notifier via `lettre` with TLS support.
//!
//! The sender mails itself and blind-copies every configured receiver.
//! Port `"465"` uses implicit TLS; any other port starts in plaintext and
//! upgrades with STARTTLS when the server offers it.

use crate::traits::{Notification, Notifier, NotifyError};
use impf_core::config::EmailConfig;
use lettre::{
    message::Mailbox,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// TLS from the first byte (SMTPS).
    Implicit,
    /// Plaintext, upgraded with STARTTLS if advertised.
    Opportunistic,
}

impl SmtpSecurity {
    /// Select the transport from the configured port text.
    pub fn for_port(port: &str) -> Self {
        if port == "465" {
            Self::Implicit
        } else {
            Self::Opportunistic
        }
    }
}

/// Sends notifications as emails via SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    /// Async SMTP transport. Unpooled, so every send opens and closes its own connection.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    security: SmtpSecurity,
    /// Sender mailbox, also used as the visible `To`.
    sender: Mailbox,
    /// Blind-copy recipients.
    bcc: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP configuration.
    ///
    /// Fails with [`NotifyError::Config`] when the sender or a receiver is not
    /// a valid address, or when the port is not a number.
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotifyError> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let bcc: Vec<Mailbox> = config
            .receivers
            .iter()
            .map(|addr| {
                addr.parse()
                    .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let port_text = config.port.trim();
        let port: u16 = port_text
            .parse()
            .map_err(|_| NotifyError::Config(format!("invalid SMTP port: {}", config.port)))?;

        let security = SmtpSecurity::for_port(port_text);
        let builder = match security {
            SmtpSecurity::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
                .map_err(|e| NotifyError::Config(e.to_string()))?,
            SmtpSecurity::Opportunistic => {
                let params = TlsParameters::new(config.server.clone())
                    .map_err(|e| NotifyError::Config(e.to_string()))?;
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
                    .tls(Tls::Opportunistic(params))
            }
        };

        let transport = builder
            .port(port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            security,
            sender,
            bcc,
        })
    }

    pub fn security(&self) -> SmtpSecurity {
        self.security
    }

    /// Assemble the outgoing message: subject is the alert, body is the URL.
    pub fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(self.sender.clone())
            .date_now();

        for recipient in &self.bcc {
            builder = builder.bcc(recipient.clone());
        }

        builder
            .subject(&notification.subject)
            .body(notification.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let email = self.build_message(notification)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::debug!(
            channel = "email",
            subject = %notification.subject,
            bcc = self.bcc.len(),
            "email handed to SMTP server"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}
