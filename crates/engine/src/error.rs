//! The module contains the error the engine can throw.
//!
//! The errors fall into four families:
//!
//! - validation errors, the caller's fault: [`InvalidAmount`],
//!   [`InvalidSplit`], [`InvalidSettlement`], [`NotMember`];
//! - [`InvariantViolation`], an internal bookkeeping bug (e.g. balances that
//!   do not sum to zero);
//! - lookup errors: [`KeyNotFound`], [`ExistingKey`], [`Forbidden`];
//! - store failures wrapped in [`Database`].
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidSplit`]: EngineError::InvalidSplit
//!  [`InvalidSettlement`]: EngineError::InvalidSettlement
//!  [`NotMember`]: EngineError::NotMember
//!  [`InvariantViolation`]: EngineError::InvariantViolation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Invalid settlement: {0}")]
    InvalidSettlement(String),
    #[error("\"{0}\" is not a member of the group")]
    NotMember(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidSplit(a), Self::InvalidSplit(b)) => a == b,
            (Self::InvalidSettlement(a), Self::InvalidSettlement(b)) => a == b,
            (Self::NotMember(a), Self::NotMember(b)) => a == b,
            (Self::InvariantViolation(a), Self::InvariantViolation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
