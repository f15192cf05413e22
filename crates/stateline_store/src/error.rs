//! Store error taxonomy.

use thiserror::Error;

use crate::api::ApiError;
use stateline_query::QueryError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by state-entity stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity is validly leased by another runtime.
    #[error("entity '{id}' is exclusively leased by {owner}")]
    LeaseConflict { id: String, owner: String },

    /// No entity with the given id.
    #[error("entity '{0}' not found")]
    NotFound(String),

    /// The query was invalid before any backend I/O.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The backend failed.
    #[error(transparent)]
    Backend(#[from] ApiError),

    /// A stored document could not be decoded.
    #[error("document decode failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn lease_conflict(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::LeaseConflict {
            id: id.into(),
            owner: owner.into(),
        }
    }

    pub fn is_lease_conflict(&self) -> bool {
        matches!(self, Self::LeaseConflict { .. })
    }
}
