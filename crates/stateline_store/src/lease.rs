//! Exclusive leases over state entities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;

/// Default lease duration in milliseconds.
pub const DEFAULT_LEASE_DURATION_MS: i64 = 60_000;

/// Identity of a runtime that takes leases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseHolder(String);

impl LeaseHolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// A unique holder identity, for runtimes without a configured name.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LeaseHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An exclusive claim on one entity, stored inside its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub leased_by: String,
    /// Acquisition instant, epoch milliseconds.
    pub leased_at: i64,
    /// Validity window in milliseconds from `leased_at`.
    pub lease_duration: i64,
}

impl Lease {
    pub fn new(holder: &LeaseHolder, leased_at: i64, lease_duration: i64) -> Self {
        Self {
            leased_by: holder.as_str().to_string(),
            leased_at,
            lease_duration,
        }
    }

    /// A lease is expired strictly after its window elapses. At exactly
    /// `leased_at + lease_duration` it is still valid.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis - self.leased_at > self.lease_duration
    }
}

/// What a lease means to a prospective writer right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseState {
    /// No lease, or an expired one. Anyone may claim or write.
    Available,
    /// A valid lease held by the asking runtime itself.
    HeldBySelf,
    /// A valid lease held by someone else.
    HeldByOther { owner: String },
}

impl LeaseState {
    pub fn evaluate(lease: Option<&Lease>, holder: &LeaseHolder, clock: &dyn Clock) -> Self {
        match lease {
            None => Self::Available,
            Some(lease) if lease.is_expired(clock.now_millis()) => Self::Available,
            Some(lease) if lease.leased_by == holder.as_str() => Self::HeldBySelf,
            Some(lease) => Self::HeldByOther {
                owner: lease.leased_by.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_lease_valid_at_window_boundary() {
        let holder = LeaseHolder::new("runtime-a");
        let lease = Lease::new(&holder, 1_000, 60_000);
        assert!(!lease.is_expired(61_000));
        assert!(lease.is_expired(61_001));
    }

    #[test]
    fn test_no_lease_is_available() {
        let holder = LeaseHolder::new("runtime-a");
        let clock = ManualClock::new(0);
        assert_eq!(
            LeaseState::evaluate(None, &holder, &clock),
            LeaseState::Available
        );
    }

    #[test]
    fn test_expired_lease_is_available_to_anyone() {
        let owner = LeaseHolder::new("runtime-a");
        let other = LeaseHolder::new("runtime-b");
        let lease = Lease::new(&owner, 0, 60_000);
        let clock = ManualClock::new(60_001);
        assert_eq!(
            LeaseState::evaluate(Some(&lease), &other, &clock),
            LeaseState::Available
        );
    }

    #[test]
    fn test_valid_lease_distinguishes_self_from_other() {
        let owner = LeaseHolder::new("runtime-a");
        let other = LeaseHolder::new("runtime-b");
        let lease = Lease::new(&owner, 0, 60_000);
        let clock = ManualClock::new(30_000);
        assert_eq!(
            LeaseState::evaluate(Some(&lease), &owner, &clock),
            LeaseState::HeldBySelf
        );
        assert_eq!(
            LeaseState::evaluate(Some(&lease), &other, &clock),
            LeaseState::HeldByOther {
                owner: "runtime-a".into()
            }
        );
    }

    #[test]
    fn test_random_holders_are_distinct() {
        assert_ne!(LeaseHolder::random(), LeaseHolder::random());
    }

    #[test]
    fn test_lease_serializes_camel_case() {
        let holder = LeaseHolder::new("runtime-a");
        let lease = Lease::new(&holder, 42, DEFAULT_LEASE_DURATION_MS);
        let value = serde_json::to_value(&lease).unwrap();
        assert_eq!(value["leasedBy"], "runtime-a");
        assert_eq!(value["leasedAt"], 42);
        assert_eq!(value["leaseDuration"], DEFAULT_LEASE_DURATION_MS);
    }
}
