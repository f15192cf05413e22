//! Mutex-guarded in-memory state-entity store.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, trace};

use stateline_query::{predicate, Criterion, OperatorSet, QuerySpec, SortOrder};

use crate::clock::Clock;
use crate::document::{StateDocument, StateEntity};
use crate::error::{Result, StoreError};
use crate::lease::{Lease, LeaseHolder, LeaseState, DEFAULT_LEASE_DURATION_MS};
use crate::store::StateEntityStore;

struct MemoryRecord<T> {
    document: StateDocument<T>,
    version: u64,
}

/// In-memory store for tests and embedded runtimes.
///
/// All state sits behind one mutex, so claim-and-lease is naturally atomic.
/// Queries are lenient: an unknown filter path matches nothing and an
/// unknown sort field falls back to natural id order, but operators outside
/// the allow-list are still rejected.
pub struct InMemoryStateStore<T> {
    records: Arc<Mutex<BTreeMap<String, MemoryRecord<T>>>>,
    owner: LeaseHolder,
    clock: Arc<dyn Clock>,
    lease_duration: i64,
    operators: OperatorSet,
}

impl<T: StateEntity> InMemoryStateStore<T> {
    pub fn new(owner: LeaseHolder, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
            owner,
            clock,
            lease_duration: DEFAULT_LEASE_DURATION_MS,
            operators: OperatorSet::sql_default(),
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

    /// A handle onto the same records under a different holder identity.
    pub fn for_owner(&self, owner: LeaseHolder) -> Self {
        Self {
            records: Arc::clone(&self.records),
            owner,
            clock: Arc::clone(&self.clock),
            lease_duration: self.lease_duration,
            operators: self.operators.clone(),
        }
    }

    /// Current lease on an entity, if any.
    pub fn lease_of(&self, id: &str) -> Option<Lease> {
        self.lock().get(id).and_then(|r| r.document.lease.clone())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MemoryRecord<T>>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self, id: &str, lease: Option<&Lease>) -> Result<()> {
        match LeaseState::evaluate(lease, &self.owner, &*self.clock) {
            LeaseState::HeldByOther { owner } => {
                trace!(id, %owner, "write blocked by foreign lease");
                Err(StoreError::lease_conflict(id, owner))
            }
            LeaseState::Available | LeaseState::HeldBySelf => Ok(()),
        }
    }

    fn matches_all(&self, criteria: &[Criterion], entity: &Value) -> Result<bool> {
        for criterion in criteria {
            if !predicate::matches(criterion, entity, &self.operators)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<T: StateEntity> StateEntityStore<T> for InMemoryStateStore<T> {
    fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        Ok(self.lock().get(id).map(|r| r.document.properties.clone()))
    }

    fn save(&self, entity: &T) -> Result<()> {
        let mut records = self.lock();
        let id = entity.id().to_string();
        let version = match records.get(&id) {
            Some(existing) => {
                self.check_writable(&id, existing.document.lease.as_ref())?;
                existing.version + 1
            }
            None => 0,
        };
        records.insert(
            id.clone(),
            MemoryRecord {
                document: StateDocument::wrap(entity),
                version,
            },
        );
        debug!(%id, state = entity.state(), "entity saved");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.lock();
        if let Some(existing) = records.get(id) {
            self.check_writable(id, existing.document.lease.as_ref())?;
            records.remove(id);
            debug!(id, "entity deleted");
        }
        Ok(())
    }

    fn query_all(&self, spec: &QuerySpec) -> Result<Vec<T>> {
        // Reject invalid criteria even when the store is empty.
        for criterion in &spec.filter {
            self.operators.validate(criterion)?;
        }

        let records = self.lock();
        let mut selected: Vec<(Value, T)> = Vec::new();
        for record in records.values() {
            let json = serde_json::to_value(&record.document.properties)?;
            if self.matches_all(&spec.filter, &json)? {
                selected.push((json, record.document.properties.clone()));
            }
        }
        drop(records);

        if let Some(field) = &spec.sort_field {
            // Entities without the sort field keep their relative order and
            // sort last.
            selected.sort_by(|(a, _), (b, _)| {
                let ordering = match (predicate::lookup(a, field), predicate::lookup(b, field)) {
                    (Some(a), Some(b)) => compare_values(a, b),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match spec.sort_order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        Ok(selected
            .into_iter()
            .map(|(_, entity)| entity)
            .skip(spec.offset)
            .take(spec.limit)
            .collect())
    }

    fn next_not_leased(&self, limit: usize, criteria: &[Criterion]) -> Result<Vec<T>> {
        for criterion in criteria {
            self.operators.validate(criterion)?;
        }

        let mut records = self.lock();
        let now = self.clock.now_millis();
        let mut claimed = Vec::new();
        for record in records.values_mut() {
            if claimed.len() >= limit {
                break;
            }
            let state =
                LeaseState::evaluate(record.document.lease.as_ref(), &self.owner, &*self.clock);
            if state != LeaseState::Available {
                continue;
            }
            let json = serde_json::to_value(&record.document.properties)?;
            if !self.matches_all(criteria, &json)? {
                continue;
            }
            record.document.lease = Some(Lease::new(&self.owner, now, self.lease_duration));
            record.version += 1;
            debug!(id = %record.document.id, owner = %self.owner, "lease acquired");
            claimed.push(record.document.properties.clone());
        }
        Ok(claimed)
    }
}

/// Order two JSON scalars: numbers numerically, strings lexically, booleans
/// false-first, mixed types by type name so the sort stays total.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
