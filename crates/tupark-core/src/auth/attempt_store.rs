//! Storage for per-address login attempt state.
//!
//! The login guard only talks to the [`AttemptStore`] trait, so a shared
//! backend can replace the in-process map without touching the lockout rules.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::identity::Identity;

/// Failure streak tracked for one source identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    /// Failures since the last successful login.
    pub failure_count: u32,
    /// While in the future, attempts from this identity are denied.
    pub locked_until: Option<DateTime<Utc>>,
    /// Time of the most recent failure.
    pub last_failure: DateTime<Utc>,
}

impl AttemptState {
    fn fresh(now: DateTime<Utc>) -> Self {
        AttemptState {
            failure_count: 0,
            locked_until: None,
            last_failure: now,
        }
    }

    /// Whether the lockout is still in force at `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Backend holding [`AttemptState`] per identity.
///
/// `update` must apply the closure atomically with respect to other calls for
/// the same identity.
pub trait AttemptStore: Send + Sync {
    /// Current state for `identity`, if any.
    fn get(&self, identity: &Identity) -> Option<AttemptState>;

    /// Apply `apply` to the state of `identity`, creating a zeroed state first
    /// if none exists. Returns the state after the update.
    fn update(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(&mut AttemptState),
    ) -> AttemptState;

    /// Forget `identity`. Returns whether anything was tracked.
    fn remove(&self, identity: &Identity) -> bool;

    /// Number of identities currently tracked.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process attempt store with a hard cap on tracked identities.
///
/// When a new identity arrives at capacity, the unlocked identity with the
/// oldest failure is evicted. Active lockouts are only evicted when every
/// tracked identity is locked, and then the one expiring soonest goes first.
pub struct BoundedAttemptStore {
    capacity: usize,
    entries: Mutex<HashMap<Identity, AttemptState>>,
}

impl BoundedAttemptStore {
    pub fn new(capacity: usize) -> Self {
        BoundedAttemptStore {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_one(entries: &mut HashMap<Identity, AttemptState>, now: DateTime<Utc>) {
        let victim = entries
            .iter()
            .filter(|(_, state)| !state.is_locked_at(now))
            .min_by_key(|(_, state)| state.last_failure)
            .or_else(|| entries.iter().min_by_key(|(_, state)| state.locked_until))
            .map(|(identity, _)| identity.clone());

        if let Some(identity) = victim {
            entries.remove(&identity);
            tracing::debug!(identity = %identity, "Evicted login attempt state at capacity");
        }
    }
}

impl AttemptStore for BoundedAttemptStore {
    fn get(&self, identity: &Identity) -> Option<AttemptState> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(identity).cloned()
    }

    fn update(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(&mut AttemptState),
    ) -> AttemptState {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(identity) && entries.len() >= self.capacity {
            Self::evict_one(&mut entries, now);
        }

        let state = entries
            .entry(identity.clone())
            .or_insert_with(|| AttemptState::fresh(now));
        apply(state);
        state.clone()
    }

    fn remove(&self, identity: &Identity) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(identity).is_some()
    }

    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn id(raw: &str) -> Identity {
        Identity::parse(raw).unwrap()
    }

    fn fail(store: &BoundedAttemptStore, who: &str, at: DateTime<Utc>) -> AttemptState {
        store.update(&id(who), at, &mut |s| {
            s.failure_count += 1;
            s.last_failure = at;
        })
    }

    #[test]
    fn test_update_creates_and_accumulates() {
        let store = BoundedAttemptStore::new(8);
        let now = Utc::now();

        assert!(store.get(&id("10.0.0.1")).is_none());
        assert_eq!(fail(&store, "10.0.0.1", now).failure_count, 1);
        assert_eq!(fail(&store, "10.0.0.1", now).failure_count, 2);
        assert_eq!(store.len(), 1);

        assert!(store.remove(&id("10.0.0.1")));
        assert!(!store.remove(&id("10.0.0.1")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest_unlocked() {
        let store = BoundedAttemptStore::new(2);
        let t0 = Utc::now();

        fail(&store, "a", t0);
        fail(&store, "b", t0 + TimeDelta::seconds(1));
        fail(&store, "c", t0 + TimeDelta::seconds(2));

        assert_eq!(store.len(), 2);
        assert!(store.get(&id("a")).is_none());
        assert!(store.get(&id("b")).is_some());
        assert!(store.get(&id("c")).is_some());
    }

    #[test]
    fn test_capacity_prefers_keeping_active_lockouts() {
        let store = BoundedAttemptStore::new(2);
        let t0 = Utc::now();

        store.update(&id("locked"), t0, &mut |s| {
            s.failure_count = 3;
            s.locked_until = Some(t0 + TimeDelta::minutes(5));
        });
        fail(&store, "tracking", t0 + TimeDelta::seconds(10));
        fail(&store, "newcomer", t0 + TimeDelta::seconds(20));

        assert!(store.get(&id("locked")).is_some());
        assert!(store.get(&id("tracking")).is_none());
        assert!(store.get(&id("newcomer")).is_some());
    }

    #[test]
    fn test_all_locked_evicts_soonest_expiry() {
        let store = BoundedAttemptStore::new(2);
        let t0 = Utc::now();

        for (who, mins) in [("long", 10), ("short", 1)] {
            store.update(&id(who), t0, &mut |s| {
                s.failure_count = 3;
                s.locked_until = Some(t0 + TimeDelta::minutes(mins));
            });
        }
        fail(&store, "newcomer", t0);

        assert!(store.get(&id("long")).is_some());
        assert!(store.get(&id("short")).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let store = BoundedAttemptStore::new(0);
        assert_eq!(store.capacity(), 1);
        fail(&store, "a", Utc::now());
        assert_eq!(store.len(), 1);
    }
}
