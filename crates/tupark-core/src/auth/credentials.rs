use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::error::TuparkError;
use crate::models::user::{self, Entity as User};

/// Checks a claimed username and secret against the user store.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(false)` for unknown users, inactive users and wrong passwords alike.
    async fn verify(&self, username: &str, password: &str) -> Result<bool, TuparkError>;
}

/// Verifier backed by the `users` table and Argon2 hashes.
#[derive(Clone)]
pub struct DbCredentialVerifier {
    db: DatabaseConnection,
}

impl DbCredentialVerifier {
    pub fn new(db: DatabaseConnection) -> Self {
        DbCredentialVerifier { db }
    }
}

#[async_trait]
impl CredentialVerifier for DbCredentialVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, TuparkError> {
        if username.is_empty() || password.is_empty() {
            return Ok(false);
        }

        let Some(user_model) = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        if !user_model.is_active {
            return Ok(false);
        }

        matches_stored_hash(password, &user_model.password_hash)
    }
}

/// PHC-encoded Argon2 hash of an administrator secret.
fn hash_secret(secret: &str) -> Result<String, TuparkError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TuparkError::Internal(format!("Failed to hash administrator secret: {}", e)))
}

/// A corrupt stored hash is an error, not a mismatch.
fn matches_stored_hash(secret: &str, stored: &str) -> Result<bool, TuparkError> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        TuparkError::Internal(format!("Stored administrator hash is unreadable: {}", e))
    })?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Create an administrator account.
pub async fn create_admin(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<user::Model, TuparkError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(TuparkError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let existing = User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(TuparkError::Conflict(format!(
            "Administrator '{}' already exists",
            username
        )));
    }

    let new_user = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(hash_secret(password)?),
        is_active: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    Ok(new_user.insert(db).await?)
}
