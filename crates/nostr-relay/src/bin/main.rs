//! Bootstrap binary: loads config, wires the reference in-memory store,
//! starts tracing, and runs the relay to completion. Config parsing and
//! process bootstrap are explicitly outside the protocol core (§1) — this
//! file is the thin wiring layer, not part of it.

use std::path::PathBuf;
use std::sync::Arc;

use nostr_core::InMemoryStore;
use nostr_relay::{AcceptChain, RelayConfig, RelayServer};

fn load_config() -> RelayConfig {
    let path = std::env::args().nth(1).map(PathBuf::from);
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
            serde_json::from_str(&raw).unwrap_or_else(|e| panic!("invalid config {}: {e}", path.display()))
        }
        None => RelayConfig::default(),
    }
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config();
    let store = Arc::new(InMemoryStore::new());
    let server = Arc::new(RelayServer::new(config, store, AcceptChain::new()));

    if let Err(e) = server.start().await {
        tracing::error!("relay failed to start: {e}");
        std::process::exit(1);
    }
}
