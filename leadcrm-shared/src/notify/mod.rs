/// Outgoing notifications
///
/// Email is sent when a lead is created and when an organizer invites an
/// agent. Delivery goes through the [`Notifier`] trait so the HTTP layer does
/// not depend on a transport:
///
/// - [`SmtpNotifier`]: lettre over SMTP with STARTTLS
/// - [`LogNotifier`]: writes the notification to the log, used when no SMTP
///   relay is configured
///
/// Handlers never await delivery. They hand the notification to [`dispatch`],
/// which sends it on a spawned task and logs failures. A failed email never
/// undoes or fails the request that triggered it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use leadcrm_shared::notify::{dispatch, LogNotifier, Notification, Notifier};
///
/// # async fn example() {
/// let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
/// let handle = dispatch(
///     notifier,
///     Notification::lead_created("leads@globalcrm.org", "owner@acme.test", "Jane Roe"),
/// );
/// # handle.await.ok();
/// # }
/// ```

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// Subject of the agent invitation mail
pub const AGENT_INVITATION_SUBJECT: &str = "Global CRM has invited you to be an Agent";

/// Subject of the lead creation mail
pub const LEAD_CREATED_SUBJECT: &str = "A lead has been created";

/// Error type for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// A sender or recipient is not a valid mailbox
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Notification has nobody to send to
    #[error("Notification has no recipients")]
    NoRecipients,

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Relay refused the message or was unreachable
    #[error("Transport error: {0}")]
    Transport(String),
}

/// A plain-text message to one or more recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
    pub from: String,
    pub recipients: Vec<String>,
}

impl Notification {
    /// Invitation for a newly created agent, carrying their initial credential
    pub fn agent_invitation(
        from: &str,
        agent_email: &str,
        username: &str,
        initial_password: &str,
    ) -> Self {
        Self {
            subject: AGENT_INVITATION_SUBJECT.to_string(),
            message: format!(
                "You were added as an agent on Global CRM. Please come and login to start \
                 working with your assigned leads.\n\n\
                 Username: {username}\n\
                 Initial password: {initial_password}\n\n\
                 Please change your password after your first login."
            ),
            from: from.to_string(),
            recipients: vec![agent_email.to_string()],
        }
    }

    /// Notice to an organizer that a lead was added to their organization
    pub fn lead_created(from: &str, organizer_email: &str, lead_name: &str) -> Self {
        Self {
            subject: LEAD_CREATED_SUBJECT.to_string(),
            message: format!("Go to the site to see the new lead: {lead_name}"),
            from: from.to_string(),
            recipients: vec![organizer_email.to_string()],
        }
    }
}

/// Delivers notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sends `notification` on a background task
///
/// The returned handle resolves once delivery finished or failed; callers
/// normally drop it.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.send(&notification).await {
            Ok(()) => tracing::debug!(
                subject = %notification.subject,
                recipients = notification.recipients.len(),
                "Notification sent"
            ),
            Err(e) => tracing::warn!(
                subject = %notification.subject,
                error = %e,
                "Notification failed"
            ),
        }
    })
}

/// SMTP relay settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,

    /// Username and password, if the relay requires authentication
    pub credentials: Option<(String, String)>,
}

/// Notifier backed by an SMTP relay
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Builds a STARTTLS transport for `settings`
    ///
    /// No connection is opened until the first message is sent.
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(settings.port);

        if let Some((username, password)) = &settings.credentials {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::info!(host = %settings.host, port = settings.port, "SMTP notifier configured");

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = build_message(notification)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if notification.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        tracing::info!(
            from = %notification.from,
            to = ?notification.recipients,
            subject = %notification.subject,
            "Notification (not delivered, no SMTP relay configured)"
        );

        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Converts a notification into a plain-text email
pub fn build_message(notification: &Notification) -> Result<Message, NotifyError> {
    if notification.recipients.is_empty() {
        return Err(NotifyError::NoRecipients);
    }

    let mut builder = Message::builder()
        .from(parse_mailbox(&notification.from)?)
        .subject(notification.subject.as_str())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &notification.recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    builder
        .body(notification.message.clone())
        .map_err(|e| NotifyError::Build(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("relay down".to_string()))
        }
    }

    #[test]
    fn test_agent_invitation_contents() {
        let n = Notification::agent_invitation(
            "invite@globalcrm.org",
            "agent@acme.test",
            "agent1",
            "s3cretPassw0rdXY",
        );

        assert_eq!(n.subject, AGENT_INVITATION_SUBJECT);
        assert_eq!(n.from, "invite@globalcrm.org");
        assert_eq!(n.recipients, vec!["agent@acme.test".to_string()]);
        assert!(n.message.starts_with("You were added as an agent on Global CRM."));
        assert!(n.message.contains("agent1"));
        assert!(n.message.contains("s3cretPassw0rdXY"));
    }

    #[test]
    fn test_lead_created_contents() {
        let n = Notification::lead_created("leads@globalcrm.org", "owner@acme.test", "Jane Roe");

        assert_eq!(n.subject, LEAD_CREATED_SUBJECT);
        assert_eq!(n.recipients, vec!["owner@acme.test".to_string()]);
        assert!(n.message.contains("Jane Roe"));
    }

    #[test]
    fn test_build_message() {
        let n = Notification::lead_created("leads@globalcrm.org", "owner@acme.test", "Jane Roe");
        let message = build_message(&n).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: A lead has been created"));
        assert!(raw.contains("owner@acme.test"));
    }

    #[test]
    fn test_build_message_rejects_bad_addresses() {
        let mut n = Notification::lead_created("leads@globalcrm.org", "not-an-address", "Jane Roe");
        assert!(matches!(
            build_message(&n),
            Err(NotifyError::InvalidAddress { address, .. }) if address == "not-an-address"
        ));

        n.recipients.clear();
        assert!(matches!(build_message(&n), Err(NotifyError::NoRecipients)));
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let recorder = Arc::new(RecordingNotifier::default());
        let n = Notification::lead_created("leads@globalcrm.org", "owner@acme.test", "Jane Roe");

        dispatch(recorder.clone(), n.clone()).await.unwrap();

        assert_eq!(recorder.sent.lock().unwrap().as_slice(), &[n]);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let n = Notification::lead_created("leads@globalcrm.org", "owner@acme.test", "Jane Roe");

        // The task must finish normally, not panic
        assert!(dispatch(Arc::new(FailingNotifier), n).await.is_ok());
    }

    #[tokio::test]
    async fn test_log_notifier() {
        let n = Notification::lead_created("leads@globalcrm.org", "owner@acme.test", "Jane Roe");
        assert!(LogNotifier.send(&n).await.is_ok());

        let empty = Notification {
            recipients: Vec::new(),
            ..n
        };
        assert!(matches!(LogNotifier.send(&empty).await, Err(NotifyError::NoRecipients)));
    }

    #[tokio::test]
    async fn test_smtp_notifier_builds_without_connecting() {
        let settings = SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 2525,
            credentials: Some(("user".to_string(), "pass".to_string())),
        };

        assert!(SmtpNotifier::new(&settings).is_ok());
    }
}
