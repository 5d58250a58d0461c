//! Caller identity for the message endpoints.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::extract_bearer_token;
use crate::error::AppError;
use crate::server::AppState;

/// Header trusted as the caller's id when no JWT secret is configured
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated user making the request.
///
/// With a JWT secret configured the id comes from a verified bearer token.
/// Otherwise (development mode) it is taken from the `X-User-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl FromRequestParts<AppState> for CallerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(validator) = state.jwt_validator.as_deref() {
            let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
                AppError::Auth("Authorization header missing or invalid".to_string())
            })?;
            return validator.verify_identity(token).map(CallerId);
        }

        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| CallerId(v.to_string()))
            .ok_or_else(|| AppError::Auth("No user context found".to_string()))
    }
}
