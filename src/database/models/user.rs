use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    /// SHA-256 hex digest of the outstanding activation token, cleared once
    /// the account is activated.
    pub activation_digest: Option<String>,
    pub created_at: DateTime<Utc>,
}
