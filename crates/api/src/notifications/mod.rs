//! Notifier adapters.
//!
//! [`email::SmtpNotifier`] delivers over SMTP when `SMTP_HOST` is configured;
//! otherwise the server falls back to [`LogNotifier`], which only records
//! the rendered message in the log.

pub mod email;

use std::sync::Arc;

use async_trait::async_trait;
use tourbook_core::notify::{Notification, Notifier, NotifyError};

use self::email::{EmailConfig, SmtpNotifier};

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            template = notification.template.name(),
            body = %notification.render_text(),
            "Notification (log only)",
        );
        Ok(())
    }
}

/// Pick the notifier for this process from the environment.
pub fn notifier_from_env() -> Arc<dyn Notifier> {
    match EmailConfig::from_env() {
        Some(config) => {
            tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP delivery enabled");
            Arc::new(SmtpNotifier::new(config))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    }
}
