//! Error types shared across the core crate.

use thiserror::Error;

/// Failures from the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert collided with an existing primary or unique key.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("stored value is malformed: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps unique-constraint violations to [`StoreError::Duplicate`].
    pub(crate) fn from_insert(err: sqlx::Error, key: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(key.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("login must be at least 8 ASCII letters or digits")]
    InvalidLogin,

    #[error("password does not satisfy the password policy")]
    WeakPassword,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Token verification never says why a token was refused.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown filter key `{0}`")]
    UnknownKey(String),

    #[error("filter `{key}` expects true or false, got `{value}`")]
    NotBoolean { key: String, value: String },

    #[error("limit must be a positive integer, got `{0}`")]
    InvalidLimit(String),
}
