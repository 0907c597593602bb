use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::User;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError>;

    /// Insert a new inactive account holding the activation token digest
    async fn insert(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        activation_digest: &str,
    ) -> Result<User, UserStoreError>;

    /// Mark the account active and clear the activation digest
    async fn activate(&self, id: Uuid) -> Result<(), UserStoreError>;
}

/// Postgres-backed user store
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_insert_err(e: sqlx::Error) -> UserStoreError {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                // Constraint names are fixed by the migration
                return match db.constraint() {
                    Some("users_email_key") => UserStoreError::DuplicateEmail,
                    _ => UserStoreError::DuplicateUsername,
                };
            }
        }
        UserStoreError::Sqlx(e)
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_active, activation_digest, created_at";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        activation_digest: &str,
    ) -> Result<User, UserStoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_active, activation_digest)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(activation_digest)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_insert_err)
    }

    async fn activate(&self, id: Uuid) -> Result<(), UserStoreError> {
        sqlx::query("UPDATE users SET is_active = TRUE, activation_digest = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    /// In-memory store for service tests, enforcing the same username/email
    /// uniqueness as the Postgres schema.
    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.id == id).cloned())
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.username == username).cloned())
        }

        async fn insert(
            &self,
            username: &str,
            email: &str,
            password_hash: &str,
            activation_digest: &str,
        ) -> Result<User, UserStoreError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.username == username) {
                return Err(UserStoreError::DuplicateUsername);
            }
            if users.iter().any(|u| u.email == email) {
                return Err(UserStoreError::DuplicateEmail);
            }
            let user = User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                is_active: false,
                activation_digest: Some(activation_digest.to_string()),
                created_at: Utc::now(),
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn activate(&self, id: Uuid) -> Result<(), UserStoreError> {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.iter_mut().find(|u| u.id == id) {
                user.is_active = true;
                user.activation_digest = None;
            }
            Ok(())
        }
    }
}
