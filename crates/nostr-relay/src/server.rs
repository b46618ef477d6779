//! The Listener (C9, §4.9): binds `(host, port)` and routes requests on
//! the configured endpoint to the WebSocket dispatcher (C5/C6) or the
//! NIP-11 info responder (C8).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nostr_core::EventStore;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use warp::Filter;

use crate::accept::AcceptChain;
use crate::config::{ConfigError, RelayConfig};
use crate::connection::ConnectionManager;
use crate::dispatcher::handle_connection;
use crate::info::RelayInfo;

pub struct RelayServer {
    pub config: RelayConfig,
    pub store: Arc<dyn EventStore>,
    pub accept_chain: AcceptChain,
    pub connections: ConnectionManager,
    pub(crate) ingest_lock: AsyncMutex<()>,
    shutdown: AsyncMutex<Option<oneshot::Sender<()>>>,
    started: AtomicBool,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("bind failed: {0}")]
    Bind(String),
}

impl RelayServer {
    pub fn new(config: RelayConfig, store: Arc<dyn EventStore>, accept_chain: AcceptChain) -> Self {
        Self {
            config,
            store,
            accept_chain,
            connections: ConnectionManager::new(),
            ingest_lock: AsyncMutex::new(()),
            shutdown: AsyncMutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// The path the relay listens on (§6 `endpoint`), matched exactly
    /// regardless of whether the request is a WebSocket upgrade.
    fn endpoint_guard(&self) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
        let endpoint = self.config.endpoint.clone();
        warp::path::full()
            .and_then(move |path: warp::path::FullPath| {
                let endpoint = endpoint.clone();
                async move {
                    if path.as_str() == endpoint {
                        Ok(())
                    } else {
                        Err(warp::reject::not_found())
                    }
                }
            })
            .untuple_one()
    }

    fn routes(self: &Arc<Self>) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let server_for_ws = Arc::clone(self);
        let ws_route = self
            .endpoint_guard()
            .and(warp::ws())
            .map(move |ws: warp::ws::Ws| {
                let server = Arc::clone(&server_for_ws);
                ws.on_upgrade(move |socket| handle_connection(server, socket))
            });

        let server_for_info = Arc::clone(self);
        let info_route = self.endpoint_guard().and(warp::get()).map(move || {
            let info = RelayInfo::build(&server_for_info.config, server_for_info.store.as_ref());
            warp::reply::json(&info)
        });

        ws_route.or(info_route)
    }

    /// Binds the listener and serves until [`RelayServer::shutdown`] is
    /// called. Validates configuration first (§4.8: a bad `pubkey` fails
    /// startup).
    pub async fn start(self: Arc<Self>) -> Result<(), ServerError> {
        self.config.validate()?;
        let addr: SocketAddr = self
            .config
            .bind_addr()
            .parse()
            .map_err(|e| ServerError::Bind(format!("{e}")))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown.lock().await = Some(shutdown_tx);
        self.started.store(true, Ordering::SeqCst);

        let routes = self.routes();
        let (bound_addr, serve_future) = warp::serve(routes)
            .bind_with_graceful_shutdown(addr, async {
                let _ = shutdown_rx.await;
            });

        tracing::info!(addr = %bound_addr, "relay listening");
        serve_future.await;
        self.connections.close_all();
        tracing::info!("relay shut down");
        Ok(())
    }

    /// Idempotent: safe to call before `start`, after `start`, or more
    /// than once. Closes the listening socket and all live connections.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown.lock().await.take() {
            let _ = tx.send(());
        }
        self.connections.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr_core::InMemoryStore;

    #[tokio::test]
    async fn shutdown_before_start_is_a_safe_noop() {
        let server = Arc::new(RelayServer::new(
            RelayConfig::default(),
            Arc::new(InMemoryStore::new()),
            AcceptChain::new(),
        ));
        server.shutdown().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn start_fails_fast_on_invalid_pubkey() {
        let config = RelayConfig {
            port: 0,
            pubkey: Some("not-a-key".to_string()),
            ..RelayConfig::default()
        };
        let server = Arc::new(RelayServer::new(config, Arc::new(InMemoryStore::new()), AcceptChain::new()));
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::Config(ConfigError::InvalidPubkey)));
    }
}
