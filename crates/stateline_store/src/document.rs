//! Document envelope wrapping a state entity for storage.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::lease::Lease;

/// Anything a state store can persist.
///
/// Entities carry a stable identifier and an integer state code driving
/// their processing lifecycle.
pub trait StateEntity: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn id(&self) -> &str;
    fn state(&self) -> i32;
}

/// Stored shape of one entity: id and state lifted for querying, the lease
/// slot, and the full entity under `properties`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument<T> {
    pub id: String,
    pub state: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease: Option<Lease>,
    pub properties: T,
}

impl<T: StateEntity> StateDocument<T> {
    /// Wrap an entity for writing. The lease slot is always empty: a saved
    /// entity is never leased.
    pub fn wrap(entity: &T) -> Self {
        Self {
            id: entity.id().to_string(),
            state: entity.state(),
            lease: None,
            properties: entity.clone(),
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// Pull the lease out of a raw document body without decoding the entity.
pub(crate) fn lease_of(body: &Value) -> Result<Option<Lease>> {
    match body.get("lease") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(StoreError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::LeaseHolder;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Sample {
        id: String,
        state: i32,
    }

    impl StateEntity for Sample {
        fn id(&self) -> &str {
            &self.id
        }
        fn state(&self) -> i32 {
            self.state
        }
    }

    #[test]
    fn test_wrap_clears_lease() {
        let entity = Sample {
            id: "s1".into(),
            state: 100,
        };
        let document = StateDocument::wrap(&entity);
        assert_eq!(document.id, "s1");
        assert_eq!(document.state, 100);
        assert!(document.lease.is_none());
    }

    #[test]
    fn test_wrapped_document_omits_null_lease() {
        let entity = Sample {
            id: "s1".into(),
            state: 100,
        };
        let value = StateDocument::wrap(&entity).to_json().unwrap();
        assert!(value.get("lease").is_none());
        assert_eq!(value["properties"]["id"], "s1");
    }

    #[test]
    fn test_lease_of_reads_stored_lease() {
        let holder = LeaseHolder::new("runtime-a");
        let lease = Lease::new(&holder, 0, 60_000);
        let body = serde_json::json!({
            "id": "s1",
            "state": 100,
            "lease": lease,
            "properties": {"id": "s1", "state": 100}
        });
        assert_eq!(lease_of(&body).unwrap(), Some(lease));
        assert_eq!(lease_of(&serde_json::json!({"id": "s1"})).unwrap(), None);
    }
}
