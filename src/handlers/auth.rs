use axum::extract::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::service::{AuthService, UserView};
use crate::auth::TokenPair;
use crate::middleware::auth::Identity;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivatePayload {
    pub uid: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshPayload {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// POST /auth/register - create an inactive account; the activation token
/// goes out through the mailer, never in the response
pub async fn register(Json(payload): Json<RegisterPayload>) -> ApiResult<UserView> {
    let service = AuthService::from_manager()?;
    let user = service
        .register(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok(ApiResponse::created(user))
}

/// POST /auth/activate - redeem an emailed activation token
pub async fn activate(Json(payload): Json<ActivatePayload>) -> ApiResult<()> {
    let service = AuthService::from_manager()?;
    service.activate(payload.uid, &payload.token).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// POST /auth/login - exchange credentials for an access + refresh pair
pub async fn login(Json(payload): Json<LoginPayload>) -> ApiResult<TokenPair> {
    let service = AuthService::from_manager()?;
    let pair = service.login(&payload.username, &payload.password).await?;
    Ok(ApiResponse::success(pair))
}

/// POST /auth/refresh - exchange a refresh token for a new access token
pub async fn refresh(Json(payload): Json<RefreshPayload>) -> ApiResult<AccessToken> {
    let service = AuthService::from_manager()?;
    let access = service.refresh(&payload.refresh).await?;
    Ok(ApiResponse::success(AccessToken { access }))
}

/// GET /api/auth/whoami - the calling account's own representation
pub async fn whoami(Extension(identity): Extension<Identity>) -> ApiResult<UserView> {
    let service = AuthService::from_manager()?;
    let user = service.me(&identity).await?;
    Ok(ApiResponse::success(user))
}
