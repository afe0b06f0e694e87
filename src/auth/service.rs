use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::password::{hash_password_off_thread, verify_password_off_thread};
use crate::auth::rate_limit::{RateLimitConfig, RateLimiter};
use crate::auth::token::{Principal, TokenCodec};
use crate::config::AuthConfig;
use crate::db::models::{NewUser, User};
use crate::db::store::CredentialStore;
use crate::error::{AppError, AuthError, DatabaseError, TokenError};
use crate::Result;

/// Outcome of `POST /users`.
#[derive(Debug)]
pub enum Registration {
    Created(User),
    AlreadyExists,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterParams {
    pub email: String,
    pub password: Option<String>,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

/// Issues session tokens and registers users. Holds no per-session state:
/// a token is the session.
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    token_ttl: Duration,
    lookup_timeout: std::time::Duration,
    rate_limiter: RateLimiter,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        codec: TokenCodec,
        token_ttl: Duration,
        lookup_timeout: std::time::Duration,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            users,
            codec,
            token_ttl,
            lookup_timeout,
            rate_limiter,
        }
    }

    pub fn from_config(users: Arc<dyn CredentialStore>, config: &AuthConfig) -> Self {
        Self::new(
            users,
            TokenCodec::new(config.jwt_secret.as_bytes()),
            config.token_ttl(),
            config.lookup_timeout(),
            RateLimiter::new(RateLimitConfig {
                window_size: Duration::minutes(1),
                max_attempts: config.login_attempts_per_minute,
            }),
        )
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Issues a token for the user registered under `email`.
    ///
    /// Accounts created with a password must present it; accounts created
    /// without one are identified by email alone.
    pub async fn login(&self, email: &str, password: Option<&str>) -> Result<String> {
        // Stored emails are trimmed at registration
        let email = email.trim();
        if !self.rate_limiter.check_rate_limit(email).await {
            warn!(email, "Login rate limit exceeded");
            return Err(AuthError::RateLimited.into());
        }

        let user = self
            .find_user(email)
            .await?
            .ok_or(AppError::AuthError(AuthError::UserNotFound))?;

        if let Some(hash) = user.password_hash.as_deref() {
            let supplied = password.ok_or(AppError::AuthError(AuthError::InvalidCredentials))?;
            if !verify_password_off_thread(supplied.to_string(), hash.to_string()).await? {
                return Err(AuthError::InvalidCredentials.into());
            }
        }

        let principal = Principal {
            subject: user.id.to_string(),
            email: user.email,
        };
        let token = self.codec.issue(&principal, self.token_ttl)?;
        info!(email = %principal.email, "Session token issued");
        Ok(token)
    }

    pub async fn register(&self, params: RegisterParams) -> Result<Registration> {
        let email = params.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::ValidationError("A valid email is required".to_string()));
        }

        let password_hash = match params.password.as_deref() {
            Some("") => {
                return Err(AppError::ValidationError("Password must not be empty".to_string()))
            }
            Some(password) => Some(hash_password_off_thread(password.to_string()).await?),
            None => None,
        };

        let inserted = self
            .users
            .insert_user(NewUser {
                email: email.to_string(),
                name: params.name,
                photo_url: params.photo_url,
                password_hash,
            })
            .await?;

        Ok(match inserted {
            Some(user) => {
                info!(email = %user.email, "User registered");
                Registration::Created(user)
            }
            None => Registration::AlreadyExists,
        })
    }

    pub fn verify_token(&self, token: &str) -> std::result::Result<Principal, TokenError> {
        self.codec.verify(token).map(Principal::from)
    }

    async fn find_user(&self, email: &str) -> Result<Option<User>> {
        match tokio::time::timeout(self.lookup_timeout, self.users.find_by_email(email)).await {
            Ok(found) => Ok(found?),
            Err(_) => Err(DatabaseError::Timeout(self.lookup_timeout.as_millis() as u64).into()),
        }
    }
}
