//! Document backend abstraction with version-checked writes.

use serde_json::Value;
use thiserror::Error;

use stateline_query::SqlStatement;

/// Opaque version token returned with every read and refreshed on every
/// write. Writers replay it to detect concurrent modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document body plus the version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedDocument {
    pub body: Value,
    pub version: VersionTag,
}

/// Concurrency condition attached to a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// Write regardless of current state.
    Unconditional,
    /// Write only if no document with this id exists yet.
    IfAbsent,
    /// Write only if the stored version still matches.
    IfMatch(VersionTag),
}

/// Backend-level failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A conditional write lost against a concurrent modification.
    #[error("version precondition failed for '{0}'")]
    PreconditionFailed(String),

    /// Transport or service failure, possibly retryable.
    #[error("backend request failed: {0}")]
    Transient(String),

    /// Document exists but cannot be interpreted.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Minimal surface a document service must offer.
///
/// Implementations map these onto their native item operations; the version
/// tag corresponds to whatever optimistic-concurrency token the service
/// uses.
pub trait DocumentApi: Send + Sync {
    /// Read one document by id, `None` when absent.
    fn read_item(&self, id: &str) -> Result<Option<VersionedDocument>, ApiError>;

    /// Write one document under the given condition, returning its new
    /// version.
    fn upsert_item(
        &self,
        id: &str,
        body: Value,
        condition: WriteCondition,
    ) -> Result<VersionTag, ApiError>;

    /// Delete one document. Deleting a missing document is a no-op.
    fn delete_item(&self, id: &str, condition: WriteCondition) -> Result<(), ApiError>;

    /// Execute a parameterized query, returning raw document bodies.
    fn query_items(&self, statement: &SqlStatement) -> Result<Vec<Value>, ApiError>;
}

impl<A: DocumentApi + ?Sized> DocumentApi for std::sync::Arc<A> {
    fn read_item(&self, id: &str) -> Result<Option<VersionedDocument>, ApiError> {
        (**self).read_item(id)
    }

    fn upsert_item(
        &self,
        id: &str,
        body: Value,
        condition: WriteCondition,
    ) -> Result<VersionTag, ApiError> {
        (**self).upsert_item(id, body, condition)
    }

    fn delete_item(&self, id: &str, condition: WriteCondition) -> Result<(), ApiError> {
        (**self).delete_item(id, condition)
    }

    fn query_items(&self, statement: &SqlStatement) -> Result<Vec<Value>, ApiError> {
        (**self).query_items(statement)
    }
}
