//! The Nostr relay protocol core: the WebSocket command dispatcher,
//! subscription registry and matcher, live fan-out, connection manager,
//! and NIP-11 info responder. Storage and event/filter primitives live in
//! `nostr-core`; this crate consumes them through that contract.

pub mod accept;
pub mod config;
mod connection;
mod dispatcher;
mod error;
mod fanout;
mod info;
mod registry;
mod server;

pub use accept::{AcceptChain, AcceptPolicy, ConnectionContext, RateLimitPolicy};
pub use config::RelayConfig;
pub use connection::{ConnState, Connection, ConnectionManager};
pub use error::RelayError;
pub use fanout::FanOut;
pub use info::RelayInfo;
pub use registry::{SubStatus, SubscriptionRegistry};
pub use server::{RelayServer, ServerError};
