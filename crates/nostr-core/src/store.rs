//! The Event Store Contract (C1, §4.1). The store itself is an external
//! collaborator; this crate only defines the trait the relay core programs
//! against, plus a minimal in-memory implementation for tests and for
//! embedders with no persistence requirement.

use async_trait::async_trait;
use thiserror::Error;

use crate::event::Event;
use crate::filter::FilterSet;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event already exists")]
    Duplicate,
    #[error("storage fault: {0}")]
    StorageFault(String),
}

/// What the relay core demands of a persistence backend (§4.1).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist `event`. Implementations must apply NIP-16 replaceable/
    /// ephemeral semantics and reject exact-id duplicates with
    /// [`StoreError::Duplicate`].
    async fn add_event(&self, event: Event) -> Result<(), StoreError>;

    /// Ordered (newest `created_at` first, ties broken by `id` descending),
    /// `limit`-respecting query across `filters` (§3, §4.1).
    async fn get_filter(&self, filters: &FilterSet) -> Result<Vec<Event>, StoreError>;

    /// NIP-09 deletion: `event.kind == 5`; tombstone/remove each
    /// `e`-tagged event whose author matches `event.pubkey`. Called only
    /// after `add_event` has succeeded for `event`.
    async fn do_delete(&self, event: &Event) -> Result<(), StoreError>;

    /// Whether this store honors NIP-09 deletion requests.
    fn is_nip09(&self) -> bool;

    /// Whether this store honors NIP-16 replaceable/ephemeral semantics.
    fn is_nip16(&self) -> bool;
}
