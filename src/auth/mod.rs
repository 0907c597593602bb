use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

pub mod service;
pub mod store;

/// Distinguishes access tokens from refresh tokens so one can never be
/// presented where the other is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub token_use: TokenUse,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: Uuid, username: String, token_use: TokenUse) -> Self {
        let now = Utc::now();
        let security = &config::config().security;
        let lifetime = match token_use {
            TokenUse::Access => Duration::minutes(security.access_token_expiry_mins as i64),
            TokenUse::Refresh => Duration::hours(security.refresh_token_expiry_hours as i64),
        };

        Self {
            sub,
            username,
            token_use,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("JWT secret not configured")]
    MissingSecret,
}

/// Access + refresh token pair returned on login
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue_token_pair(user_id: Uuid, username: &str) -> Result<TokenPair, JwtError> {
    Ok(TokenPair {
        access: issue_token(user_id, username, TokenUse::Access)?,
        refresh: issue_token(user_id, username, TokenUse::Refresh)?,
    })
}

pub fn issue_token(user_id: Uuid, username: &str, token_use: TokenUse) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }
    sign_with_secret(&Claims::new(user_id, username.to_string(), token_use), secret)
}

/// Validate a token and check it is of the expected use
pub fn validate_token(token: &str, expected: TokenUse) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }
    validate_with_secret(token, secret, expected)
}

fn sign_with_secret(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

fn validate_with_secret(token: &str, secret: &str, expected: TokenUse) -> Result<Claims, String> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| format!("Invalid token: {}", e))?;

    if token_data.claims.token_use != expected {
        return Err("Token presented for the wrong purpose".to_string());
    }

    Ok(token_data.claims)
}

/// Hex SHA-256 digest of an activation token. Only the digest is persisted;
/// the raw token exists solely in the activation email.
pub fn activation_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
