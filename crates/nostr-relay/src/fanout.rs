//! Live Fan-Out (C7, §4.7).
//!
//! Invoked after a successful `add_event`. Deliveries to distinct sockets
//! are independent; deliveries to the same socket preserve acceptance
//! order because every send for one connection passes through that
//! connection's single outbound channel (§9 "Concurrent-safe per-socket
//! writes"). Ordering *across* connections for the *same* store-acceptance
//! sequence is the caller's responsibility (the dispatcher serializes
//! `add_event` + fan-out under one lock, see `RelayServer::ingest`).

use nostr_core::Event;

use crate::connection::ConnectionManager;

pub struct FanOut;

impl FanOut {
    /// Test `event` against every live subscription on every connection
    /// and enqueue a `["EVENT", sub_id, event]` frame for each match.
    pub fn deliver(manager: &ConnectionManager, event: &Event) {
        manager.for_each(|conn| {
            for (sub_id, filters) in conn.registry.snapshot() {
                if filters.matches(event) {
                    let frame = serde_json::json!(["EVENT", sub_id, event]).to_string();
                    conn.send(frame);
                }
            }
        });
    }
}
