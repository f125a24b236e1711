#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use organizer_api::config::AppConfig;
use organizer_api::database::MemoryDatastore;
use organizer_api::notifier::{Notifier, NotifierError, VerificationEmail};
use organizer_api::{app, AppState};

/// Keeps every verification email so tests can follow the link.
#[derive(Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<VerificationEmail>>,
}

impl CapturingNotifier {
    pub fn last_token_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.iter().rev().find(|e| e.to == email).map(|e| e.token.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub notifier: Arc<CapturingNotifier>,
}

/// A signed-in, verified user.
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub profile_id: String,
}

impl Session {
    pub fn header(&self) -> String {
        format!("JWT {}", self.token)
    }
}

impl TestServer {
    /// Serve the real router on an ephemeral port with an in-memory store.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(AppConfig::testing()).await
    }

    pub async fn spawn_with(config: AppConfig) -> Result<Self> {
        let notifier = Arc::new(CapturingNotifier::default());
        let state = AppState::new(config, Arc::new(MemoryDatastore::new()), notifier.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
            notifier,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn signup(&self, email: &str, handle: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/auth"))
            .json(&json!({
                "email": email,
                "password": "hunter22",
                "handle": handle,
                "firstName": "Test",
                "lastName": "User"
            }))
            .send()
            .await?)
    }

    /// Sign up, follow the verification link and log in.
    pub async fn session(&self, email: &str, handle: &str) -> Result<Session> {
        let res = self.signup(email, handle).await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "signup failed: {}", res.text().await?);
        let user_id = res.json::<Value>().await?["user"]["id"]
            .as_str()
            .context("signup response has no user id")?
            .to_string();

        let token = self.notifier.last_token_for(email).context("no verification email captured")?;
        let res = self
            .client
            .get(self.url("/auth/verify"))
            .query(&[("email", email), ("token", token.as_str())])
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::NO_CONTENT, "verification failed: {}", res.status());

        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": "hunter22" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let token = res.json::<Value>().await?["token"]
            .as_str()
            .context("login response has no token")?
            .to_string();

        let profile = self
            .client
            .get(self.url("/profile"))
            .header("Authorization", format!("JWT {}", token))
            .send()
            .await?
            .json::<Value>()
            .await?;
        let profile_id = profile["profile"]["id"].as_str().context("no profile id")?.to_string();

        Ok(Session { token, user_id, profile_id })
    }

    pub async fn create_item(&self, session: &Session, body: Value) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/items"))
            .header("Authorization", session.header())
            .json(&body)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create item failed: {}", res.text().await?);
        Ok(res.json::<Value>().await?["item"].clone())
    }
}
