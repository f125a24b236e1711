use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{require_fields, ServiceError};
use crate::auth::{self, Claims};
use crate::config::{AppConfig, AuthConfig, SecurityConfig};
use crate::database::models::{Contact, EmailVerification, Profile, User, VerificationToken};
use crate::database::Datastore;
use crate::notifier::{Notifier, VerificationEmail};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub handle: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Signup {
    pub user: User,
    pub profile: Profile,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
}

/// Signup, login and email verification.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Datastore>,
    notifier: Arc<dyn Notifier>,
    security: SecurityConfig,
    auth: AuthConfig,
    root_url: String,
    allow_bypass: bool,
}

impl AuthService {
    pub fn new(store: Arc<dyn Datastore>, notifier: Arc<dyn Notifier>, config: &AppConfig) -> Self {
        Self {
            store,
            notifier,
            security: config.security.clone(),
            auth: config.auth.clone(),
            root_url: config.notifier.root_url.clone(),
            allow_bypass: config.auth.verification_bypass && !config.is_production(),
        }
    }

    /// Create the user, their contact card and profile, then send the
    /// verification email. Steps are not rolled back; a failure after the
    /// user exists names the step that failed.
    pub async fn signup(&self, request: &SignupRequest) -> Result<Signup, ServiceError> {
        require_fields(&[
            ("email", request.email.as_deref()),
            ("password", request.password.as_deref()),
            ("handle", request.handle.as_deref()),
            ("firstName", request.first_name.as_deref()),
            ("lastName", request.last_name.as_deref()),
        ])?;
        let email = request.email.as_deref().unwrap_or_default().trim().to_lowercase();
        let password = request.password.as_deref().unwrap_or_default();
        let handle = request.handle.as_deref().unwrap_or_default().trim();

        let (user, raw_token) = self.create_user(&email, password, handle).await?;
        let mut completed = vec!["create user"];
        let partial = |completed: &Vec<&'static str>, failed: &'static str, source: ServiceError| {
            warn!(user_id = %user.id, step = failed, error = %source, "Signup stopped part way");
            ServiceError::PartialFailure {
                user_id: user.id,
                completed: completed.clone(),
                failed,
                source: Box::new(source),
            }
        };

        let now = Utc::now();
        let card = Contact {
            id: Uuid::new_v4(),
            name: format!(
                "{} {}",
                request.first_name.as_deref().unwrap_or_default().trim(),
                request.last_name.as_deref().unwrap_or_default().trim()
            ),
            handle: Some(user.handle.clone()),
            company: None,
            birthday: None,
            phone_number: None,
            notes: None,
            address: None,
            created_at: now,
            updated_at: now,
        };
        let card = match self.store.insert_contact(&card).await {
            Ok(card) => card,
            Err(e) => return Err(partial(&completed, "create contact card", e.into())),
        };
        completed.push("create contact card");

        let profile = Profile::new(user.id, &user.email, Some(card.name.clone()), Some(card.id), now);
        let profile = match self.store.insert_profile(&profile).await {
            Ok(profile) => profile,
            Err(e) => return Err(partial(&completed, "create profile", e.into())),
        };
        completed.push("create profile");

        if let Err(e) = self.send_verification(&user.email, &raw_token).await {
            return Err(partial(&completed, "send verification email", e));
        }

        info!(user_id = %user.id, profile_id = %profile.id, "User signed up");
        Ok(Signup { user, profile })
    }

    /// Insert the user row. Returns the raw verification token, of which
    /// only the digest is stored.
    async fn create_user(&self, email: &str, password: &str, handle: &str) -> Result<(User, String), ServiceError> {
        let raw_token = auth::generate_verification_token();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: auth::hash_password(password)?,
            handle: handle.to_string(),
            email_verification: EmailVerification {
                is_verified: false,
                token: self.fresh_token(&raw_token),
            },
            created_at: now,
            updated_at: now,
        };
        let user = self.store.insert_user(&user).await?;
        Ok((user, raw_token))
    }

    fn fresh_token(&self, raw_token: &str) -> VerificationToken {
        VerificationToken {
            value: auth::hash_token(raw_token),
            expires_at: Utc::now() + Duration::seconds(self.auth.email_token_ttl_secs),
        }
    }

    async fn send_verification(&self, email: &str, raw_token: &str) -> Result<(), ServiceError> {
        let message = VerificationEmail::new(&self.root_url, email, raw_token, self.auth.email_token_ttl_secs)?;
        self.notifier.send_verification_email(&message).await?;
        Ok(())
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<Session, ServiceError> {
        require_fields(&[("email", request.email.as_deref()), ("password", request.password.as_deref())])?;
        let email = request.email.as_deref().unwrap_or_default().trim().to_lowercase();
        let password = request.password.as_deref().unwrap_or_default();

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        if !auth::verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login rejected: incorrect password");
            return Err(ServiceError::IncorrectCredentials);
        }
        if !user.is_verified() {
            return Err(ServiceError::EmailNotVerified);
        }

        let claims = Claims::new(user.id, user.email.clone(), self.security.jwt_expiry_days);
        let token = auth::generate_jwt(&claims, &self.security)?;
        info!(user_id = %user.id, "User logged in");
        Ok(Session { token, claims })
    }

    /// Issue a fresh token and email it. `None` for unknown or already
    /// verified users, otherwise whether delivery succeeded.
    pub async fn request_new_email_token(&self, email: &str) -> Result<Option<bool>, ServiceError> {
        let Some(user) = self.store.find_user_by_email(email.trim()).await? else {
            return Ok(None);
        };
        if user.is_verified() {
            return Ok(None);
        }

        let raw_token = auth::generate_verification_token();
        let verification = EmailVerification {
            is_verified: false,
            token: self.fresh_token(&raw_token),
        };
        self.store.update_user_verification(user.id, &verification).await?;

        match self.send_verification(&user.email, &raw_token).await {
            Ok(()) => Ok(Some(true)),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Verification email not delivered");
                Ok(Some(false))
            }
        }
    }

    /// `None` for an unknown user, `Some(false)` for a wrong or expired
    /// token. Marks both the user and the profile verified.
    pub async fn verify_email(&self, email: &str, token: &str) -> Result<Option<bool>, ServiceError> {
        let Some(user) = self.store.find_user_by_email(email.trim()).await? else {
            return Ok(None);
        };
        if user.is_verified() {
            return Ok(Some(true));
        }

        let stored = &user.email_verification.token;
        if !auth::token_matches(token, &stored.value) {
            if !self.allow_bypass {
                return Ok(Some(false));
            }
            warn!(user_id = %user.id, "Verification token mismatch accepted by bypass");
        }
        if stored.expires_at < Utc::now() {
            return Ok(Some(false));
        }

        let verification = EmailVerification {
            is_verified: true,
            token: stored.clone(),
        };
        self.store.update_user_verification(user.id, &verification).await?;

        if let Some(mut profile) = self.store.find_profile_by_user(user.id).await? {
            profile.email_info.is_verified = true;
            profile.updated_at = Utc::now();
            self.store.save_profile(&profile).await?;
        }

        info!(user_id = %user.id, "Email verified");
        Ok(Some(true))
    }
}
