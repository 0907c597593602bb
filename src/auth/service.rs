use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::store::{PgUserStore, UserStore, UserStoreError};
use crate::auth::{self, JwtError, TokenPair, TokenUse};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::middleware::auth::Identity;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Outbound user representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password, or inactive account. Deliberately one
    /// variant so login responses do not reveal which check failed.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Account is already active")]
    AlreadyActive,

    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Password hashing failed")]
    Hashing,

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error("Storage error: {0}")]
    Storage(sqlx::Error),
}

impl From<UserStoreError> for AuthError {
    fn from(e: UserStoreError) -> Self {
        match e {
            UserStoreError::DuplicateUsername => AuthError::Validation {
                field: "username",
                message: "Username already taken".to_string(),
            },
            UserStoreError::DuplicateEmail => AuthError::Validation {
                field: "email",
                message: "Email already registered".to_string(),
            },
            UserStoreError::Sqlx(e) => AuthError::Storage(e),
        }
    }
}

/// Delivery seam for activation emails. The transport is external; in
/// development the token is only logged.
pub trait ActivationMailer: Send + Sync {
    fn send_activation(&self, email: &str, username: &str, token: &str);
}

pub struct LogMailer;

impl ActivationMailer for LogMailer {
    fn send_activation(&self, email: &str, username: &str, token: &str) {
        tracing::info!(email, username, "queued activation email");
        tracing::debug!(token, "activation token (development only)");
    }
}

/// Account lifecycle: register (inactive) -> activate -> login/refresh
pub struct AuthService {
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn ActivationMailer>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            mailer: Arc::new(LogMailer),
        }
    }

    pub fn with_mailer(store: Arc<dyn UserStore>, mailer: Arc<dyn ActivationMailer>) -> Self {
        Self { store, mailer }
    }

    /// Service wired to the application database
    pub fn from_manager() -> Result<Self, DatabaseError> {
        Ok(Self::new(Arc::new(PgUserStore::new(DatabaseManager::pool()?))))
    }

    /// Create an inactive account and send the activation token. Only the
    /// token's digest is persisted.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserView, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::Validation {
                field: "username",
                message: "Username must not be empty".to_string(),
            });
        }
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthError::Validation {
                field: "email",
                message: "A valid email address is required".to_string(),
            });
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation {
                field: "password",
                message: format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            });
        }

        let password_hash = hash_password(password)?;
        let token = Uuid::new_v4().simple().to_string();
        let digest = auth::activation_digest(&token);

        let user = self
            .store
            .insert(username, email, &password_hash, &digest)
            .await?;

        self.mailer.send_activation(&user.email, &user.username, &token);

        Ok(UserView {
            id: user.id,
            username: user.username,
            email: user.email,
        })
    }

    /// One-shot account activation. A second attempt is refused even with
    /// the original token.
    pub async fn activate(&self, user_id: Uuid, token: &str) -> Result<(), AuthError> {
        let invalid = || AuthError::Validation {
            field: "token",
            message: "Invalid activation data".to_string(),
        };

        let user = self.store.find_by_id(user_id).await?.ok_or_else(invalid)?;
        if user.is_active {
            return Err(AuthError::AlreadyActive);
        }

        let digest = user.activation_digest.ok_or_else(invalid)?;
        if digest != auth::activation_digest(token) {
            return Err(invalid());
        }

        self.store.activate(user.id).await?;
        tracing::info!(user_id = %user.id, "account activated");
        Ok(())
    }

    /// Verify credentials and issue an access + refresh token pair.
    /// Inactive accounts cannot log in.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(auth::issue_token_pair(user.id, &user.username)?)
    }

    /// Exchange a refresh token for a fresh access token. The account must
    /// still exist and be active.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = auth::validate_token(refresh_token, TokenUse::Refresh)
            .map_err(|_| AuthError::Unauthenticated)?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::Unauthenticated)?;

        Ok(auth::issue_token(user.id, &user.username, TokenUse::Access)?)
    }

    /// The calling account's own representation
    pub async fn me(&self, identity: &Identity) -> Result<UserView, AuthError> {
        let auth_user = identity.user().ok_or(AuthError::Unauthenticated)?;

        let user = self
            .store
            .find_by_id(auth_user.user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        Ok(UserView {
            id: user.id,
            username: user.username,
            email: user.email,
        })
    }
}

/// Minimal well-formedness check: local part, one '@', dotted domain
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || email.contains(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hashing)
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
