//! Pure Nostr event/filter primitives (C2) and the event store contract
//! (C1) the relay core is built on.

mod error;
mod event;
mod filter;
mod keys;
mod mem_store;
mod store;

pub use error::{Error, Result};
pub use event::{
    finalize_event, generate_secret_key, is_ephemeral_kind, is_replaceable_kind, is_valid,
    pubkey_from_secret, single_letter_tag_values, Event, EventTemplate,
};
pub use filter::{Filter, FilterSet};
pub use keys::{is_event_id, is_key};
pub use mem_store::InMemoryStore;
pub use store::{EventStore, StoreError};
