use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::TuparkError;

/// Session token claims.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    /// Subject (administrator username)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Create a session token for an administrator.
pub fn create_token(username: &str, secret: &str, ttl_minutes: u64) -> Result<String, TuparkError> {
    let now = Utc::now();
    let expires = now + Duration::minutes(ttl_minutes as i64);

    let claims = Claims {
        sub: username.to_string(),
        exp: expires.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TuparkError::Internal(format!("Failed to create token: {}", e)))
}

/// Validate a session token and return the claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, TuparkError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| TuparkError::Unauthorized(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_carries_username() {
        let token = create_token("admin", "secret", 15).unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = create_token("admin", "secret", 15).unwrap();
        assert!(matches!(
            validate_token(&token, "other"),
            Err(TuparkError::Unauthorized(_))
        ));
    }
}
