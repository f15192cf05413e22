//! Document-backed state-entity store.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, trace};

use stateline_query::{predicate, Criterion, FieldMap, OperatorSet, QuerySpec, SqlStatement};

use crate::api::{ApiError, DocumentApi, VersionedDocument, WriteCondition};
use crate::clock::Clock;
use crate::document::{lease_of, StateDocument, StateEntity};
use crate::error::{Result, StoreError};
use crate::lease::{LeaseHolder, LeaseState, DEFAULT_LEASE_DURATION_MS};
use crate::manager::{retry_once, LeaseManager};

/// Alias documents are addressed through in generated statements.
pub const DOCUMENT_ALIAS: &str = "doc";

/// Filter on the lifted state code.
pub fn has_state(code: i32) -> Criterion {
    Criterion::new("state", "=", code)
}

/// Shared surface of all state-entity stores.
pub trait StateEntityStore<T: StateEntity> {
    /// Fetch one entity by id, `None` when absent.
    fn find_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Persist an entity, releasing any lease this runtime holds on it.
    /// Fails with a lease conflict while another runtime validly holds it.
    fn save(&self, entity: &T) -> Result<()>;

    /// Remove an entity. Removing a missing entity is a no-op; a valid
    /// foreign lease blocks removal.
    fn delete(&self, id: &str) -> Result<()>;

    /// Run a filtered, sorted, paged query.
    fn query_all(&self, spec: &QuerySpec) -> Result<Vec<T>>;

    /// Claim up to `limit` entities matching `criteria` that are not
    /// validly leased, leasing each before returning it.
    fn next_not_leased(&self, limit: usize, criteria: &[Criterion]) -> Result<Vec<T>>;
}

/// State-entity store over any [`DocumentApi`].
///
/// Strict about queries: every filter and sort field must appear in the
/// field map, so unknown properties fail before any backend round trip.
pub struct DocumentStateStore<T, A> {
    api: A,
    owner: LeaseHolder,
    clock: Arc<dyn Clock>,
    lease_duration: i64,
    field_map: FieldMap,
    operators: OperatorSet,
    _marker: PhantomData<fn() -> T>,
}

impl<T: StateEntity, A: DocumentApi> DocumentStateStore<T, A> {
    pub fn new(api: A, owner: LeaseHolder, clock: Arc<dyn Clock>, field_map: FieldMap) -> Self {
        Self {
            api,
            owner,
            clock,
            lease_duration: DEFAULT_LEASE_DURATION_MS,
            field_map,
            operators: OperatorSet::sql_default(),
            _marker: PhantomData,
        }
    }

    pub fn with_lease_duration(mut self, millis: i64) -> Self {
        self.lease_duration = millis;
        self
    }

    pub fn with_operators(mut self, operators: OperatorSet) -> Self {
        self.operators = operators;
        self
    }

    fn statement(&self, spec: &QuerySpec) -> Result<SqlStatement> {
        let rewritten = self.field_map.rewrite(spec)?;
        Ok(SqlStatement::for_documents(
            DOCUMENT_ALIAS,
            &rewritten,
            &self.operators,
        )?)
    }

    fn manager(&self) -> LeaseManager<'_, A> {
        LeaseManager::new(&self.api, &self.owner, &*self.clock, self.lease_duration)
    }

    /// One save attempt conditioned on the version read.
    fn try_save(&self, entity: &T) -> Result<()> {
        let id = entity.id();
        let body = StateDocument::wrap(entity).to_json()?;
        match self.api.read_item(id)? {
            None => {
                self.api.upsert_item(id, body, WriteCondition::IfAbsent)?;
            }
            Some(existing) => {
                self.check_writable(id, &existing.body)?;
                self.api
                    .upsert_item(id, body, WriteCondition::IfMatch(existing.version))?;
            }
        }
        debug!(id, state = entity.state(), "entity saved");
        Ok(())
    }

    fn try_delete(&self, id: &str) -> Result<()> {
        match self.api.read_item(id)? {
            None => Ok(()),
            Some(existing) => {
                self.check_writable(id, &existing.body)?;
                self.api
                    .delete_item(id, WriteCondition::IfMatch(existing.version))?;
                debug!(id, "entity deleted");
                Ok(())
            }
        }
    }

    fn check_writable(&self, id: &str, body: &serde_json::Value) -> Result<()> {
        let lease = lease_of(body)?;
        match LeaseState::evaluate(lease.as_ref(), &self.owner, &*self.clock) {
            LeaseState::HeldByOther { owner } => {
                trace!(id, %owner, "write blocked by foreign lease");
                Err(StoreError::lease_conflict(id, owner))
            }
            LeaseState::Available | LeaseState::HeldBySelf => Ok(()),
        }
    }

    fn still_matches(&self, criteria: &[Criterion], body: &serde_json::Value) -> Result<bool> {
        for criterion in criteria {
            if !predicate::matches(criterion, body, &self.operators)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Hand back a lease this runtime just took. Losing the conditional
    /// write is fine; whoever won owns the document now.
    fn release(&self, id: &str, leased: VersionedDocument) -> Result<()> {
        let mut body = leased.body;
        if let Some(map) = body.as_object_mut() {
            map.remove("lease");
        }
        match self
            .api
            .upsert_item(id, body, WriteCondition::IfMatch(leased.version))
        {
            Ok(_) | Err(ApiError::PreconditionFailed(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn decode(body: &serde_json::Value) -> Result<T> {
        Ok(StateDocument::<T>::from_json(body)?.properties)
    }
}

impl<T: StateEntity, A: DocumentApi> StateEntityStore<T> for DocumentStateStore<T, A> {
    fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        match self.api.read_item(id)? {
            None => Ok(None),
            Some(document) => Ok(Some(Self::decode(&document.body)?)),
        }
    }

    fn save(&self, entity: &T) -> Result<()> {
        retry_once(entity.id(), || self.try_save(entity))
    }

    fn delete(&self, id: &str) -> Result<()> {
        retry_once(id, || self.try_delete(id))
    }

    fn query_all(&self, spec: &QuerySpec) -> Result<Vec<T>> {
        let statement = self.statement(spec)?;
        let bodies = self.api.query_items(&statement)?;
        bodies.iter().map(Self::decode).collect()
    }

    fn next_not_leased(&self, limit: usize, criteria: &[Criterion]) -> Result<Vec<T>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let spec = QuerySpec {
            filter: criteria.to_vec(),
            limit,
            ..QuerySpec::default()
        };
        let rewritten = self.field_map.rewrite(&spec)?;
        let manager = self.manager();

        // Leased candidates must not eat into the claim window, so keep
        // paging through matches until enough acquisitions succeed or the
        // backend runs out of candidates.
        let mut claimed = Vec::new();
        let mut offset = 0;
        loop {
            let page = QuerySpec {
                offset,
                ..rewritten.clone()
            };
            let statement = SqlStatement::for_documents(DOCUMENT_ALIAS, &page, &self.operators)?;
            let candidates = self.api.query_items(&statement)?;
            let exhausted = candidates.len() < limit;
            for body in &candidates {
                if claimed.len() >= limit {
                    break;
                }
                let document = StateDocument::<T>::from_json(body)?;
                let state =
                    LeaseState::evaluate(document.lease.as_ref(), &self.owner, &*self.clock);
                if state != LeaseState::Available {
                    continue;
                }
                match manager.acquire(&document.id) {
                    Ok(leased) => {
                        // A concurrent save may have landed between query
                        // and claim; return the state actually leased, and
                        // hand the entity back if it no longer qualifies.
                        if self.still_matches(&rewritten.filter, &leased.body)? {
                            claimed.push(Self::decode(&leased.body)?);
                        } else {
                            self.release(&document.id, leased)?;
                        }
                    }
                    // Raced by another runtime between query and claim.
                    Err(err) if err.is_lease_conflict() => continue,
                    Err(StoreError::NotFound(_)) => continue,
                    Err(err) => return Err(err),
                }
            }
            if claimed.len() >= limit || exhausted {
                break;
            }
            offset += limit;
        }
        Ok(claimed)
    }
}
