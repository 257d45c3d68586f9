//! Notification delivery for validation state changes
//!
//! Notifications never decide the outcome of an operation: a failed delivery
//! is reported as an event and the transition that triggered it stands.

use async_trait::async_trait;
use relval_errors::{Error, OpsError};
use relval_events::{AppEvent, EventEmitter, FailureContext, NotificationEvent};
use relval_platform::{ProcessRunner, ShellCommand};
use std::sync::Arc;

/// A message to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Delivery channel for notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed over.
    async fn notify(&self, notification: &Notification) -> Result<(), Error>;

    /// Whether notifications are actually delivered
    fn enabled(&self) -> bool {
        true
    }
}

/// Pipes an RFC 5322 message into a `sendmail`-compatible command
pub struct MailNotifier {
    sender: String,
    command: String,
    runner: Arc<dyn ProcessRunner>,
}

impl MailNotifier {
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        command: impl Into<String>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            sender: sender.into(),
            command: command.into(),
            runner,
        }
    }

    /// The message exactly as written to the mail command
    #[must_use]
    pub fn compose(&self, notification: &Notification) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\n\n{}\n",
            self.sender,
            notification.recipients.join(", "),
            notification.subject,
            notification.body
        )
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), Error> {
        let command = ShellCommand::new(&self.command).with_stdin(self.compose(notification));
        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(OpsError::CommandFailed {
                command: self.command.clone(),
                code: output.code,
            }
            .into());
        }
        Ok(())
    }
}

/// Notifier used when mail is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    fn enabled(&self) -> bool {
        false
    }

    async fn notify(&self, _notification: &Notification) -> Result<(), Error> {
        Ok(())
    }
}

/// Deliver `notification` unless `dry_run` or the notifier is disabled,
/// reporting the result as events
///
/// Returns whether the notification was handed over.
pub(crate) async fn deliver(
    emitter: &impl EventEmitter,
    notifier: &dyn Notifier,
    notification: &Notification,
    dry_run: bool,
) -> bool {
    if dry_run || !notifier.enabled() {
        emitter.emit(AppEvent::Notification(NotificationEvent::Suppressed {
            subject: notification.subject.clone(),
        }));
        return false;
    }

    match notifier.notify(notification).await {
        Ok(()) => {
            emitter.emit(AppEvent::Notification(NotificationEvent::Sent {
                recipients: notification.recipients.clone(),
                subject: notification.subject.clone(),
            }));
            true
        }
        Err(e) => {
            emitter.emit(AppEvent::Notification(NotificationEvent::Failed {
                subject: notification.subject.clone(),
                failure: FailureContext::from_error(&e),
            }));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relval_events::channel;
    use relval_platform::ShellRunner;
    use tempfile::TempDir;

    fn notification() -> Notification {
        Notification {
            recipients: vec!["a@localhost".to_string(), "b@localhost".to_string()],
            subject: "[relval] Validation started: v5-05-Rev-01".to_string(),
            body: "The following validation has started:".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mail_message_is_piped_to_command() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("mail.txt");
        let (tx, _rx) = channel();

        let notifier = MailNotifier::new(
            "relval@localhost",
            format!("cat > {}", out.display()),
            Arc::new(ShellRunner::new(tx)),
        );
        notifier.notify(&notification()).await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            written,
            "From: relval@localhost\nTo: a@localhost, b@localhost\n\
             Subject: [relval] Validation started: v5-05-Rev-01\n\n\
             The following validation has started:\n"
        );
    }

    #[tokio::test]
    async fn test_failed_mail_command_is_an_error() {
        let (tx, _rx) = channel();
        let notifier = MailNotifier::new(
            "relval@localhost",
            "cat > /dev/null; exit 75",
            Arc::new(ShellRunner::new(tx)),
        );
        let err = notifier.notify(&notification()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Ops(OpsError::CommandFailed { code: Some(75), .. })
        ));
    }

    #[tokio::test]
    async fn test_deliver_reports_failure_without_propagating() {
        let (tx, mut rx) = channel();
        let notifier = MailNotifier::new(
            "relval@localhost",
            "exit 1",
            Arc::new(ShellRunner::new(tx.clone())),
        );

        assert!(!deliver(&tx, &notifier, &notification(), false).await);
        let failed = std::iter::from_fn(|| rx.try_recv().ok()).any(|m| {
            matches!(
                m.event,
                AppEvent::Notification(NotificationEvent::Failed { .. })
            )
        });
        assert!(failed);
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_suppressed() {
        let (tx, mut rx) = channel();
        assert!(!deliver(&tx, &NullNotifier, &notification(), false).await);
        let message = rx.try_recv().unwrap();
        assert!(matches!(
            message.event,
            AppEvent::Notification(NotificationEvent::Suppressed { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_notifier() {
        let (tx, mut rx) = channel();
        let notifier = MailNotifier::new(
            "relval@localhost",
            "exit 1",
            Arc::new(ShellRunner::new(tx.clone())),
        );

        assert!(!deliver(&tx, &notifier, &notification(), true).await);
        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].event,
            AppEvent::Notification(NotificationEvent::Suppressed { .. })
        ));
    }
}
