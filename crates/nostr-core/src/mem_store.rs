//! A minimal in-process [`EventStore`] implementation. Not a storage-layer
//! design (that's explicitly out of scope, §1) — just enough to exercise
//! the C1 contract in tests and to give embedders a default.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::event::{is_ephemeral_kind, is_replaceable_kind, single_letter_tag_values, Event};
use crate::filter::FilterSet;
use crate::store::{EventStore, StoreError};

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, Event>,
    /// (pubkey, kind) -> id, for NIP-16 replaceable kinds.
    replaceable: HashMap<(String, u64), String>,
}

pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn add_event(&self, event: Event) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::StorageFault("poisoned lock".into()))?;

        if is_ephemeral_kind(event.kind) {
            // Accepted, never persisted (§4.1).
            return Ok(());
        }

        if inner.by_id.contains_key(&event.id) {
            return Err(StoreError::Duplicate);
        }

        if is_replaceable_kind(event.kind) {
            let key = (event.pubkey.clone(), event.kind);
            if let Some(prev_id) = inner.replaceable.get(&key).cloned() {
                if let Some(prev) = inner.by_id.get(&prev_id) {
                    if prev.created_at > event.created_at {
                        // Stored event is newer; keep it, silently accept
                        // the older one without replacing (common relay
                        // behavior for out-of-order replaceable events).
                        return Ok(());
                    }
                }
                inner.by_id.remove(&prev_id);
            }
            inner.replaceable.insert(key, event.id.clone());
        }

        inner.by_id.insert(event.id.clone(), event);
        Ok(())
    }

    async fn get_filter(&self, filters: &FilterSet) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::StorageFault("poisoned lock".into()))?;

        let mut matched: Vec<Event> = inner.by_id.values().filter(|e| filters.matches(e)).cloned().collect();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        if let Some(limit) = filters.limit() {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    async fn do_delete(&self, event: &Event) -> Result<(), StoreError> {
        if event.kind != 5 {
            return Ok(());
        }

        let mut inner = self.inner.lock().map_err(|_| StoreError::StorageFault("poisoned lock".into()))?;
        let target_ids: Vec<String> = single_letter_tag_values(event, 'e').map(|s| s.to_string()).collect();

        for id in target_ids {
            let matches_author = inner.by_id.get(&id).map(|e| e.pubkey == event.pubkey).unwrap_or(false);
            if matches_author {
                inner.by_id.remove(&id);
            }
        }
        Ok(())
    }

    fn is_nip09(&self) -> bool {
        true
    }

    fn is_nip16(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{finalize_event, generate_secret_key, EventTemplate};
    use crate::filter::Filter;

    fn event(sk: &str, kind: u64, tags: Vec<Vec<String>>, created_at: u64, content: &str) -> Event {
        let template = EventTemplate {
            kind,
            tags,
            content: content.to_string(),
            created_at,
        };
        finalize_event(&template, sk).unwrap()
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected() {
        let store = InMemoryStore::new();
        let sk = generate_secret_key();
        let e = event(&sk, 1, vec![], 100, "hi");
        store.add_event(e.clone()).await.unwrap();
        let err = store.add_event(e).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn replaceable_kind_keeps_latest_only() {
        let store = InMemoryStore::new();
        let sk = generate_secret_key();
        let e1 = event(&sk, 0, vec![], 100, "old profile");
        let e2 = event(&sk, 0, vec![], 200, "new profile");
        store.add_event(e1).await.unwrap();
        store.add_event(e2.clone()).await.unwrap();

        let mut f = Filter::new();
        f.kinds = Some(vec![0]);
        let results = store.get_filter(&FilterSet(vec![f])).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, e2.id);
    }

    #[tokio::test]
    async fn ephemeral_kind_is_not_persisted() {
        let store = InMemoryStore::new();
        let sk = generate_secret_key();
        let e = event(&sk, 20001, vec![], 100, "ping");
        store.add_event(e).await.unwrap();

        let results = store.get_filter(&FilterSet(vec![Filter::new()])).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_event_when_author_matches() {
        let store = InMemoryStore::new();
        let sk = generate_secret_key();
        let e1 = event(&sk, 1, vec![], 100, "to be deleted");
        let delete_tags = vec![vec!["e".to_string(), e1.id.clone()]];
        let e2 = event(&sk, 5, delete_tags, 101, "");

        store.add_event(e1.clone()).await.unwrap();
        store.add_event(e2.clone()).await.unwrap();
        store.do_delete(&e2).await.unwrap();

        let mut f = Filter::new();
        f.ids = Some(vec![e1.id.clone()]);
        let results = store.get_filter(&FilterSet(vec![f])).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn delete_is_noop_when_author_mismatches() {
        let store = InMemoryStore::new();
        let sk_a = generate_secret_key();
        let sk_b = generate_secret_key();
        let e1 = event(&sk_a, 1, vec![], 100, "not deleted by b");
        let delete_tags = vec![vec!["e".to_string(), e1.id.clone()]];
        let e2 = event(&sk_b, 5, delete_tags, 101, "");

        store.add_event(e1.clone()).await.unwrap();
        store.add_event(e2.clone()).await.unwrap();
        store.do_delete(&e2).await.unwrap();

        let mut f = Filter::new();
        f.ids = Some(vec![e1.id.clone()]);
        let results = store.get_filter(&FilterSet(vec![f])).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
