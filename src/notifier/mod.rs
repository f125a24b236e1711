use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::NotifierConfig;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Invalid verification link: {0}")]
    InvalidLink(String),

    #[error("Delivery rejected with status {0}")]
    Rejected(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Outgoing verification email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub link: String,
    /// Raw token, carried for adapters that template their own body.
    #[serde(skip)]
    pub token: String,
}

impl VerificationEmail {
    pub fn new(root_url: &str, email: &str, token: &str, ttl_secs: i64) -> Result<Self, NotifierError> {
        let mut link = url::Url::parse(root_url)
            .and_then(|base| base.join("auth/verify"))
            .map_err(|e| NotifierError::InvalidLink(e.to_string()))?;
        link.query_pairs_mut().append_pair("token", token).append_pair("email", email);

        let hours = (ttl_secs / 3600).max(1);
        let unit = if hours == 1 { "hour" } else { "hours" };
        Ok(Self {
            to: email.to_string(),
            subject: "Verify your email".to_string(),
            text: format!(
                "Please verify your email using the following link (expires in {} {}): {}",
                hours, unit, link
            ),
            link: link.to_string(),
            token: token.to_string(),
        })
    }
}

/// Delivers verification emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), NotifierError>;
}

/// Writes the link to the log instead of sending mail.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), NotifierError> {
        info!(to = %email.to, link = %email.link, "Verification email (log only)");
        Ok(())
    }
}

/// POSTs the email as JSON to a mail relay.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), NotifierError> {
        let response = self.client.post(&self.endpoint).json(email).send().await?;
        if !response.status().is_success() {
            return Err(NotifierError::Rejected(response.status().as_u16()));
        }
        info!(to = %email.to, "Verification email delivered");
        Ok(())
    }
}

/// Pick the adapter for the configured environment.
pub fn from_config(config: &NotifierConfig) -> Box<dyn Notifier> {
    match config.webhook_url {
        Some(ref endpoint) => Box::new(WebhookNotifier::new(endpoint.clone())),
        None => Box::new(LogNotifier),
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Records every email; can be switched to fail delivery.
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<VerificationEmail>>,
        failing: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            let notifier = Self::default();
            notifier.failing.store(true, Ordering::SeqCst);
            notifier
        }

        pub fn sent(&self) -> Vec<VerificationEmail> {
            self.sent.lock().unwrap().clone()
        }

        pub fn last_token_for(&self, to: &str) -> Option<String> {
            self.sent().into_iter().rev().find(|e| e.to == to).map(|e| e.token)
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), NotifierError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotifierError::Rejected(503));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_body_and_link() {
        let email = VerificationEmail::new("https://app.example.com", "a+b@example.com", "abc123", 21_600).unwrap();
        assert_eq!(email.link, "https://app.example.com/auth/verify?token=abc123&email=a%2Bb%40example.com");
        assert_eq!(
            email.text,
            "Please verify your email using the following link (expires in 6 hours): \
             https://app.example.com/auth/verify?token=abc123&email=a%2Bb%40example.com"
        );
    }

    #[test]
    fn test_bad_root_url() {
        assert!(matches!(
            VerificationEmail::new("not a url", "a@example.com", "t", 3600),
            Err(NotifierError::InvalidLink(_))
        ));
    }
}
