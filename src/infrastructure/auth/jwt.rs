use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::config::JwtConfig;
use crate::error::AppError;

use super::Claims;

/// Verifies identity tokens issued by the marketplace login flow.
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Returns `None` when no secret is configured.
    pub fn from_config(config: &JwtConfig) -> Option<Self> {
        if !config.is_enabled() {
            return None;
        }
        config.secret.as_deref().map(|secret| Self::new(secret, config))
    }

    pub fn new(secret: &str, config: &JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::default();

        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = config.audience {
            validation.set_audience(&[audience]);
        }

        Self {
            decoding_key,
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate a token and return the verified user id.
    pub fn verify_identity(&self, token: &str) -> Result<String, AppError> {
        self.validate(token).map(|claims| claims.user_id().to_string())
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-key-for-testing";

    fn create_test_config() -> JwtConfig {
        JwtConfig {
            secret: Some(SECRET.to_string()),
            issuer: None,
            audience: None,
        }
    }

    fn create_test_token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims_for(user_id: &str) -> Claims {
        Claims {
            sub: user_id.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
            user_id: None,
            email: Some("buyer@example.com".to_string()),
        }
    }

    #[test]
    fn test_valid_token() {
        let validator = JwtValidator::from_config(&create_test_config()).unwrap();

        let token = create_test_token(&claims_for("user-123"), SECRET);
        let user_id = validator.verify_identity(&token).unwrap();

        assert_eq!(user_id, "user-123");
    }

    #[test]
    fn test_invalid_token() {
        let validator = JwtValidator::from_config(&create_test_config()).unwrap();

        assert!(validator.validate("invalid-token").is_err());

        let forged = create_test_token(&claims_for("user-123"), "other-secret");
        assert!(validator.validate(&forged).is_err());
    }

    #[test]
    fn test_expired_token() {
        let validator = JwtValidator::from_config(&create_test_config()).unwrap();

        let mut claims = claims_for("user-123");
        claims.exp = chrono::Utc::now().timestamp() - 3600;
        let token = create_test_token(&claims, SECRET);

        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn test_disabled_without_secret() {
        assert!(JwtValidator::from_config(&JwtConfig::default()).is_none());
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def"));
    }
}
