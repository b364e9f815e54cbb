//! User JWT authentication extractor.
//!
//! Validates bearer tokens issued by the identity service and turns their
//! claims into the [`Actor`] the form services authorize against.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use domain::models::Actor;
use shared::jwt::{extract_user_id, JwtConfig, JwtError};

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated user information from JWT.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// User ID and roles from the token.
    pub actor: Actor,
    /// JWT ID (jti), logged for session tracing.
    pub jti: String,
}

impl UserAuth {
    /// Validates an access token and returns user authentication info.
    pub fn validate(jwt: &JwtConfig, token: &str) -> Result<Self, JwtError> {
        let claims = jwt.validate_access_token(token)?;
        let user_id = extract_user_id(&claims)?;
        Ok(Self {
            actor: Actor::new(user_id, claims.roles),
            jti: claims.jti,
        })
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(auth.clone());
        }

        let token = bearer_token(&parts.headers).ok_or_else(|| {
            ApiError::Unauthorized("Missing or invalid Authorization header".to_string())
        })?;

        let auth = UserAuth::validate(&state.jwt, token).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;
        tracing::debug!(user_id = %auth.actor.user_id, jti = %auth.jti, "Authenticated request");

        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

/// Optional user JWT authentication.
///
/// Requests without a valid bearer token are treated as anonymous rather
/// than rejected.
#[derive(Debug, Clone)]
pub struct OptionalUserAuth(pub Option<UserAuth>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(OptionalUserAuth(Some(auth.clone())));
        }

        let auth = bearer_token(&parts.headers).and_then(|token| {
            UserAuth::validate(&state.jwt, token)
                .map_err(|e| tracing::debug!("Ignoring invalid bearer token: {}", e))
                .ok()
        });

        Ok(OptionalUserAuth(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers_with("bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_optional_user_auth_none() {
        let auth = OptionalUserAuth(None);
        assert!(auth.0.is_none());
    }
}
