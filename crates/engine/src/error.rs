//! The module contains the errors the engine can throw.
//!
//! Each variant maps to one class of caller mistake (or store failure):
//!
//! - [`Validation`] for malformed input that must never be retried as-is.
//! - [`Forbidden`] for authenticated callers lacking role or membership.
//! - [`NotFound`] for rows that are absent or not owned by the given parent.
//! - [`Conflict`] for mutations blocked by referential constraints.
//!
//! [`Validation`]: EngineError::Validation
//! [`Forbidden`]: EngineError::Forbidden
//! [`NotFound`]: EngineError::NotFound
//! [`Conflict`]: EngineError::Conflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
