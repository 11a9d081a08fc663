use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::database::db::users;
use crate::database::models::User;
use crate::error::{ServiceError, ServiceResult};
use crate::messages;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Holds user records and checks passwords against their bcrypt hashes.
#[derive(Clone)]
pub struct CredentialStore {
    pool: Pool<Sqlite>,
    bcrypt_cost: u32,
}

impl CredentialStore {
    pub fn new(pool: Pool<Sqlite>, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }

    /// Exact, case-sensitive username match followed by a bcrypt comparison.
    /// `Ok(None)` means "no such user or wrong password"; the two are not told apart.
    pub async fn verify(&self, username: &str, password: &str) -> ServiceResult<Option<User>> {
        let user = users::find_by_username(&self.pool, username).await?;
        self.check(user, password).await
    }

    /// Like [`verify`](Self::verify) but only matches accounts carrying the admin flag.
    pub async fn verify_admin(
        &self,
        username: &str,
        password: &str,
    ) -> ServiceResult<Option<User>> {
        let user = users::find_admin_by_username(&self.pool, username).await?;
        self.check(user, password).await
    }

    pub async fn register(&self, username: &str, password: &str) -> ServiceResult<i64> {
        self.create(username, password, false).await
    }

    pub async fn register_admin(&self, username: &str, password: &str) -> ServiceResult<i64> {
        self.create(username, password, true).await
    }

    async fn check(&self, user: Option<User>, password: &str) -> ServiceResult<Option<User>> {
        let Some(user) = user else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn create(&self, username: &str, password: &str, is_admin: bool) -> ServiceResult<i64> {
        validate_credentials(username, password)?;

        let password_hash = hash_password(password, self.bcrypt_cost).await?;

        // The UNIQUE constraint is the duplicate check.
        let user_id = users::insert_user(&self.pool, username, &password_hash, is_admin)
            .await
            .map_err(|e| {
                if ServiceError::is_unique_violation(&e) {
                    ServiceError::DuplicateUsername
                } else {
                    ServiceError::Storage(e)
                }
            })?;

        info!(user_id, username, is_admin, "Registered user");
        Ok(user_id)
    }
}

pub fn validate_credentials(username: &str, password: &str) -> ServiceResult<()> {
    if username.is_empty() || password.is_empty() {
        return Err(ServiceError::validation(messages::FIELDS_REQUIRED));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::validation(messages::PASSWORD_TOO_SHORT));
    }
    Ok(())
}

// bcrypt is CPU-bound; keep it off the async workers.
async fn hash_password(password: &str, cost: u32) -> ServiceResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ServiceError::Credential(format!("Task join error: {}", e)))?
        .map_err(|e| ServiceError::Credential(e.to_string()))
}

async fn verify_password(password: &str, hash: &str) -> ServiceResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ServiceError::Credential(format!("Task join error: {}", e)))?
        .map_err(|e| ServiceError::Credential(e.to_string()))
}
