use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, Claims, TokenUse};
use crate::error::ApiError;

/// Authenticated user context extracted from an access JWT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
        }
    }
}

/// Caller identity attached to every request.
///
/// Absence of credentials is not an error at this layer: services decide
/// whether an operation requires authentication, so anonymous requests get
/// the same denial whether or not the target resource exists.
#[derive(Clone, Debug)]
pub enum Identity {
    Anonymous,
    User(AuthUser),
}

impl Identity {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Identity::User(user) => Some(user),
            Identity::Anonymous => None,
        }
    }
}

/// Middleware that resolves the caller identity and injects it as a request
/// extension. A missing Authorization header yields `Identity::Anonymous`;
/// a presented but invalid token is rejected outright.
pub async fn identity_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match extract_bearer_token(&headers)? {
        None => Identity::Anonymous,
        Some(token) => {
            let claims = auth::validate_token(&token, TokenUse::Access)
                .map_err(|msg| ApiError::unauthorized(msg))?;
            Identity::User(AuthUser::from(claims))
        }
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header, if one is present
fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let auth_header = match headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
    {
        Some(header) => header,
        None => return Ok(None),
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err(ApiError::unauthorized("Empty bearer token"));
        }
        Ok(Some(token.to_string()))
    } else {
        Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(
            extract_bearer_token(&headers).unwrap(),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let headers = headers_with("Basic dXNlcjpwYXNz");
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn empty_bearer_token_is_rejected() {
        let headers = headers_with("Bearer   ");
        assert!(extract_bearer_token(&headers).is_err());
    }
}
