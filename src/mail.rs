use futures_util::future::BoxFuture;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::{error, info, warn};
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("no contact recipient configured")]
    NoRecipient,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContactMessage {
    pub recipient: String,
    pub subject: String,
    pub sender: String,
    pub body: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, message: ContactMessage) -> BoxFuture<'_, Result<(), MailError>>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Option<Mailbox>,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)?
        } else if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
        };
        let mut builder = builder.port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = match &config.username {
            Some(user) => Some(user.parse::<Mailbox>()?),
            None => None,
        };
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, message: &ContactMessage) -> Result<Message, MailError> {
        let visitor: Mailbox = message.sender.parse()?;
        // the relay only accepts its own account as From; the visitor gets Reply-To
        let from = self.from.clone().unwrap_or_else(|| visitor.clone());
        let email = Message::builder()
            .from(from)
            .reply_to(visitor)
            .to(message.recipient.parse()?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())?;
        Ok(email)
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: ContactMessage) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            let email = self.build_message(&message)?;
            self.transport.send(email).await?;
            Ok(())
        })
    }
}

/// Used when no SMTP account is configured: the message only reaches the log.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: ContactMessage) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            info!(
                "contact mail (not relayed) to={} from={} subject={:?}",
                message.recipient, message.sender, message.subject
            );
            Ok(())
        })
    }
}

pub fn mailer_from_config(config: &MailConfig) -> Box<dyn Mailer> {
    if config.username.is_none() || config.password.is_none() {
        warn!("MAIL_USERNAME/MAIL_PASSWORD not set, contact mail will only be logged");
        return Box::new(LogMailer);
    }
    match SmtpMailer::from_config(config) {
        Ok(mailer) => Box::new(mailer),
        Err(e) => {
            error!("smtp setup failed, contact mail will only be logged: {}", e);
            Box::new(LogMailer)
        }
    }
}

/// Sends a contact submission to the fixed recipient. Never fails: delivery
/// problems are only visible in the server log.
pub async fn relay(mailer: &dyn Mailer, recipient: Option<&str>, subject: &str, sender: &str, body: &str) {
    let result = match recipient {
        Some(recipient) => {
            let message = ContactMessage {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                sender: sender.to_string(),
                body: body.to_string(),
            };
            mailer.send(message).await
        }
        None => Err(MailError::NoRecipient),
    };
    match result {
        Ok(()) => info!("contact mail from {} relayed", sender),
        Err(e) => error!("contact mail wasn't sent: {}", e),
    }
}
