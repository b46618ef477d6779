//! The Subscription Registry (C4, §4.4), owned exclusively by one
//! connection. Mutated only by that connection's reader task; read by the
//! fan-out path via [`SubscriptionRegistry::snapshot`].

use std::collections::HashMap;
use std::sync::RwLock;

use nostr_core::FilterSet;

use crate::error::RelayError;

/// §9 "Backfill-before-live race": a subscription is ineligible for live
/// delivery until its backfill stream (plus `EOSE`) has been fully handed
/// to the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubStatus {
    Backfilling,
    Live,
}

struct Entry {
    filters: FilterSet,
    status: SubStatus,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    subs: RwLock<HashMap<String, Entry>>,
    max_sub: usize,
}

impl SubscriptionRegistry {
    pub fn new(max_sub: usize) -> Self {
        Self {
            subs: RwLock::new(HashMap::new()),
            max_sub,
        }
    }

    /// Insert a new subscription in the `Backfilling` state.
    pub fn add(&self, sub_id: &str, filters: FilterSet) -> Result<(), RelayError> {
        let mut subs = self.subs.write().expect("registry lock poisoned");
        if subs.contains_key(sub_id) {
            return Err(RelayError::DuplicateSub(sub_id.to_string()));
        }
        if subs.len() >= self.max_sub {
            return Err(RelayError::LimitExceeded(sub_id.to_string(), self.max_sub));
        }
        subs.insert(
            sub_id.to_string(),
            Entry {
                filters,
                status: SubStatus::Backfilling,
            },
        );
        Ok(())
    }

    pub fn remove(&self, sub_id: &str) -> Result<(), RelayError> {
        let mut subs = self.subs.write().expect("registry lock poisoned");
        subs.remove(sub_id).map(|_| ()).ok_or(RelayError::UnknownSub)
    }

    /// Called once backfill (and `EOSE`, if enabled) has been fully
    /// enqueued to the connection's writer. No-op if the subscription was
    /// since closed.
    pub fn mark_live(&self, sub_id: &str) {
        let mut subs = self.subs.write().expect("registry lock poisoned");
        if let Some(entry) = subs.get_mut(sub_id) {
            entry.status = SubStatus::Live;
        }
    }

    /// A consistent snapshot of `(sub_id, filters)` for every `Live`
    /// subscription, for use by the fan-out (§4.4, §4.7). May be stale by
    /// one step; acceptable per §5.
    pub fn snapshot(&self) -> Vec<(String, FilterSet)> {
        let subs = self.subs.read().expect("registry lock poisoned");
        subs.iter()
            .filter(|(_, entry)| entry.status == SubStatus::Live)
            .map(|(id, entry)| (id.clone(), entry.filters.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subs.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
