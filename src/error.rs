use thiserror::Error;

use crate::messages;

/// Everything a service can report back to its caller. Raw storage errors are
/// wrapped here and never rendered verbatim.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{}", messages::BUDGET_FORBIDDEN)]
    Forbidden,

    #[error("{}", messages::USER_NOT_FOUND)]
    NotFound,

    #[error("{}", messages::USERNAME_TAKEN)]
    DuplicateUsername,

    #[error("{}", messages::SELF_DELETION)]
    SelfDeletion,

    #[error("{}", messages::GENERIC_FAILURE)]
    Storage(#[from] sqlx::Error),

    #[error("{}", messages::GENERIC_FAILURE)]
    Credential(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Unique-constraint hits on insert are reported by SQLite, not by us.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
    }

    pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("SESSION_SECRET must be at least {min} bytes, got {actual}")]
    SecretTooShort { min: usize, actual: usize },

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
