//! Outbound mail for email verification
//!
//! Thin wrapper over an async SMTP transport. Sending is fire-and-forget
//! from the API's point of view: handlers spawn the send and log failures
//! instead of surfacing them to the HTTP caller.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::config::MailConfig;
use crate::{Error, Result};

/// SMTP mailer for verification messages
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build a mailer from config
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay or from address is invalid
    pub fn new(config: &MailConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
            .map_err(|e| Error::Mail(format!("invalid SMTP relay: {e}")))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        let from = format!("{} <{}>", config.from_name, config.from)
            .parse()
            .map_err(|e| Error::Mail(format!("invalid from address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Send an email-verification message with the given link
    ///
    /// # Errors
    ///
    /// Returns error if the recipient address is invalid or the SMTP
    /// delivery fails
    pub async fn send_verification(
        &self,
        to: &str,
        username: &str,
        verify_url: &str,
    ) -> Result<()> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| Error::Mail(format!("invalid recipient address: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject("Verify your email address")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Hi {username},\n\n\
                 Welcome to Rolo. Open the link below to verify your email address:\n\n\
                 {verify_url}\n\n\
                 If you did not create this account you can ignore this message.\n"
            ))
            .map_err(|e| Error::Mail(format!("failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Mail(format!("delivery failed: {e}")))?;

        tracing::info!(to, "verification email sent");
        Ok(())
    }
}
