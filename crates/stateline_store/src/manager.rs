//! Lease acquisition over a document backend.

use tracing::{debug, trace};

use crate::api::{ApiError, DocumentApi, VersionedDocument, WriteCondition};
use crate::clock::Clock;
use crate::document::lease_of;
use crate::error::{Result, StoreError};
use crate::lease::{Lease, LeaseHolder, LeaseState};

/// Takes exclusive leases via version-checked writes.
///
/// Acquisition reads the document, checks the stored lease, then writes a
/// fresh lease conditioned on the version it read. Losing that write means
/// another runtime touched the document in between; a single retry
/// re-reads and re-checks, and a second loss is reported as a conflict.
pub struct LeaseManager<'a, A: DocumentApi> {
    api: &'a A,
    owner: &'a LeaseHolder,
    clock: &'a dyn Clock,
    lease_duration: i64,
}

impl<'a, A: DocumentApi> LeaseManager<'a, A> {
    pub fn new(
        api: &'a A,
        owner: &'a LeaseHolder,
        clock: &'a dyn Clock,
        lease_duration: i64,
    ) -> Self {
        Self {
            api,
            owner,
            clock,
            lease_duration,
        }
    }

    /// Acquire a lease on `id`, returning the leased document.
    pub fn acquire(&self, id: &str) -> Result<VersionedDocument> {
        retry_once(id, || self.try_acquire(id))
    }

    fn try_acquire(&self, id: &str) -> Result<VersionedDocument> {
        let document = self
            .api
            .read_item(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let lease = lease_of(&document.body)?;
        match LeaseState::evaluate(lease.as_ref(), self.owner, self.clock) {
            LeaseState::HeldByOther { owner } => {
                trace!(id, %owner, "lease held by another runtime");
                return Err(StoreError::lease_conflict(id, owner));
            }
            LeaseState::Available | LeaseState::HeldBySelf => {}
        }

        let fresh = Lease::new(self.owner, self.clock.now_millis(), self.lease_duration);
        let mut body = document.body;
        match body.as_object_mut() {
            Some(map) => {
                map.insert("lease".to_string(), serde_json::to_value(&fresh)?);
            }
            None => {
                return Err(StoreError::Backend(ApiError::Malformed(format!(
                    "document '{id}' is not an object"
                ))))
            }
        }
        let version = self
            .api
            .upsert_item(id, body.clone(), WriteCondition::IfMatch(document.version))?;
        debug!(id, owner = %self.owner, "lease acquired");
        Ok(VersionedDocument { body, version })
    }
}

/// Run `attempt` once more after a lost conditional write; a second loss
/// means persistent contention and is reported as a lease conflict.
pub(crate) fn retry_once<T>(id: &str, attempt: impl Fn() -> Result<T>) -> Result<T> {
    match attempt() {
        Err(StoreError::Backend(ApiError::PreconditionFailed(_))) => {
            trace!(id, "lost conditional write, retrying once");
            attempt().map_err(|err| match err {
                StoreError::Backend(ApiError::PreconditionFailed(_)) => {
                    StoreError::lease_conflict(id, "concurrent writer")
                }
                other => other,
            })
        }
        result => result,
    }
}
