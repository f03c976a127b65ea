//! The module contains the error the engine can throw.
//!
//! Access failures are deliberately coarse: [`Forbidden`] is returned both
//! when the caller is not an active member of a household and when their role
//! lacks the required permission.
//!
//!  [`Forbidden`]: EngineError::Forbidden
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Expired: {0}")]
    Expired(String),
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for errors caused by malformed caller input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InvalidName(_)
                | Self::InvalidRole(_)
                | Self::InvalidDate(_)
                | Self::InvalidCursor(_)
                | Self::InvalidSettings(_)
                | Self::InvalidCurrency(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::InvalidDate(a), Self::InvalidDate(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::InvalidSettings(a), Self::InvalidSettings(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::Expired(a), Self::Expired(b)) => a == b,
            (Self::InvalidCurrency(a), Self::InvalidCurrency(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
