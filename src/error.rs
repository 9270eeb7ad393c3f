//! Error taxonomy shared by the store and every engine.

use crate::model::UserId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// A referenced user, artist, tag or edge is absent.
    #[error("{0} not found")]
    NotFound(String),
    /// Duplicate creation of something keyed uniquely (friendships, tag assignments).
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("user {0} cannot befriend themselves")]
    SelfReference(UserId),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl GraphError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}
