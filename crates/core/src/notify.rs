//! Outbound notification port.
//!
//! Delivery is an external collaborator; the auth flows only know a
//! [`Notifier`] that either accepts a message or reports a failure.

use std::collections::BTreeMap;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Welcome,
    PasswordReset,
}

impl Template {
    pub fn name(self) -> &'static str {
        match self {
            Template::Welcome => "welcome",
            Template::PasswordReset => "passwordReset",
        }
    }

    pub fn subject(self) -> &'static str {
        match self {
            Template::Welcome => "Welcome to the Tourbook family!",
            Template::PasswordReset => "Your password reset token (valid for a limited time)",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub to: String,
    pub template: Template,
    /// Template variables, e.g. `firstName` and `url`.
    pub context: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(to: impl Into<String>, template: Template) -> Self {
        Self {
            to: to.into(),
            template,
            context: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Plain-text body rendered from the template and its context.
    pub fn render_text(&self) -> String {
        let name = self.context.get("firstName").map(String::as_str).unwrap_or("there");
        let url = self.context.get("url").map(String::as_str).unwrap_or_default();
        match self.template {
            Template::Welcome => format!(
                "Hi {name},\n\nWelcome aboard! Complete your profile here: {url}\n"
            ),
            Template::PasswordReset => format!(
                "Hi {name},\n\nForgot your password? Submit a PATCH request with your new password \
                 and passwordConfirm to: {url}\nIf you didn't forget your password, please ignore this email.\n"
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification timed out")]
    Timeout,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// First word of a display name, used to greet the recipient.
pub fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or(full_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_body_carries_url() {
        let body = Notification::new("a@b.io", Template::PasswordReset)
            .with("firstName", "Ada")
            .with("url", "http://localhost/reset/abc")
            .render_text();
        assert!(body.starts_with("Hi Ada"));
        assert!(body.contains("http://localhost/reset/abc"));
    }

    #[test]
    fn first_name_takes_leading_word() {
        assert_eq!(first_name("Ada Lovelace"), "Ada");
        assert_eq!(first_name(""), "");
    }
}
