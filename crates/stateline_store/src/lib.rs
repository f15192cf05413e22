//! Stateline state-entity stores.
//!
//! A state entity is a persisted record with an integer state code that
//! multiple runtimes process cooperatively. Stores hand out short exclusive
//! leases so only one runtime advances an entity at a time, and release the
//! lease implicitly on every successful save.
//!
//! Two backends ship here: [`DocumentStateStore`] drives any document API
//! with version-checked writes, and [`InMemoryStateStore`] keeps everything
//! behind a mutex for tests and embedded runtimes.

mod api;
mod clock;
mod document;
mod error;
mod lease;
mod manager;
mod memory;
mod store;

pub use api::{ApiError, DocumentApi, VersionTag, VersionedDocument, WriteCondition};
pub use clock::{Clock, ManualClock, SystemClock};
pub use document::{StateDocument, StateEntity};
pub use error::{Result, StoreError};
pub use lease::{Lease, LeaseHolder, LeaseState, DEFAULT_LEASE_DURATION_MS};
pub use manager::LeaseManager;
pub use memory::InMemoryStateStore;
pub use store::{has_state, DocumentStateStore, StateEntityStore, DOCUMENT_ALIAS};
