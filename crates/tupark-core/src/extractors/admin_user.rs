use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth;
use crate::config::Config;
use crate::error::TuparkError;

/// Extractor that validates the session token and provides the administrator's username.
///
/// Usage in handlers:
/// ```rust,ignore
/// async fn my_handler(AdminUser(username): AdminUser) -> impl IntoResponse {
///     // username is the signed-in administrator
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AdminUser(pub String);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = TuparkError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| TuparkError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            TuparkError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let config = parts
            .extensions
            .get::<Arc<Config>>()
            .ok_or_else(|| TuparkError::Internal("Config not found in request".to_string()))?;

        let claims = auth::validate_token(token, &config.jwt_secret)?;
        if claims.sub.is_empty() {
            return Err(TuparkError::Unauthorized(
                "Invalid administrator in token".to_string(),
            ));
        }

        Ok(AdminUser(claims.sub))
    }
}
