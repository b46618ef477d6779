//! The Connection Manager (C5, §4.5): the set of live WebSocket
//! connections, each owning its own subscription registry and outbound
//! send queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

use crate::registry::SubscriptionRegistry;

/// §4.6 per-connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Open,
    Closing,
    Closed,
}

impl From<u8> for ConnState {
    fn from(v: u8) -> Self {
        match v {
            0 => ConnState::Open,
            1 => ConnState::Closing,
            _ => ConnState::Closed,
        }
    }
}

/// One outbound frame plus an optional completion signal. Backfill/EOSE
/// sends set `ack` so the `REQ` handler can await real transmission before
/// issuing the next one (§4.6 step 4); fan-out sends leave it `None` so the
/// fan-out never blocks on a slow consumer.
pub struct OutboundItem {
    pub frame: String,
    pub ack: Option<oneshot::Sender<()>>,
}

pub struct Connection {
    pub conn_id: u64,
    pub registry: SubscriptionRegistry,
    outbound: mpsc::UnboundedSender<OutboundItem>,
    state: AtomicU8,
    /// Handles to the reader and writer tasks spawned for this socket in
    /// `dispatcher::handle_connection`, set once those tasks exist. Held so
    /// that `close` (and so `ConnectionManager::close_all`/`RelayServer::
    /// shutdown`, §4.9) can actually tear the socket down instead of only
    /// flipping `state` (§5 "Shutdown cancels all connection tasks").
    reader_abort: Mutex<Option<AbortHandle>>,
    writer_abort: Mutex<Option<AbortHandle>>,
}

impl Connection {
    pub fn new(conn_id: u64, max_sub: usize, outbound: mpsc::UnboundedSender<OutboundItem>) -> Self {
        Self {
            conn_id,
            registry: SubscriptionRegistry::new(max_sub),
            outbound,
            state: AtomicU8::new(ConnState::Open as u8),
            reader_abort: Mutex::new(None),
            writer_abort: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnState {
        ConnState::from(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Record the reader task's abort handle, used by `close` to cancel
    /// the read loop on shutdown.
    pub fn set_reader_abort(&self, handle: AbortHandle) {
        *self.reader_abort.lock().expect("connection lock poisoned") = Some(handle);
    }

    /// Record the writer task's abort handle, used by `close` to cancel
    /// any further outbound sends on shutdown.
    pub fn set_writer_abort(&self, handle: AbortHandle) {
        *self.writer_abort.lock().expect("connection lock poisoned") = Some(handle);
    }

    /// Transition to `Closing` and abort the reader/writer tasks so the
    /// underlying socket actually closes (§4.9, §5). Idempotent: aborting
    /// an already-finished or already-aborted task is a no-op.
    pub fn close(&self) {
        self.set_state(ConnState::Closing);
        if let Some(handle) = self.reader_abort.lock().expect("connection lock poisoned").take() {
            handle.abort();
        }
        if let Some(handle) = self.writer_abort.lock().expect("connection lock poisoned").take() {
            handle.abort();
        }
    }

    /// Fire-and-forget enqueue, used by the fan-out (§4.7). Marks the
    /// connection `Closing` if the writer has already gone away.
    pub fn send(&self, frame: String) {
        if self.outbound.send(OutboundItem { frame, ack: None }).is_err() {
            self.set_state(ConnState::Closing);
        }
    }

    /// Enqueue and wait for the writer to have transmitted `frame`, used
    /// by backfill/`NOTICE`/`EOSE` sends that must be ordered against the
    /// next send (§4.6 step 4).
    pub async fn send_and_wait(&self, frame: String) -> Result<(), ()> {
        let (tx, rx) = oneshot::channel();
        if self
            .outbound
            .send(OutboundItem {
                frame,
                ack: Some(tx),
            })
            .is_err()
        {
            self.set_state(ConnState::Closing);
            return Err(());
        }
        rx.await.map_err(|_| ())
    }
}

#[derive(Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<u64, Arc<Connection>>>,
    next_conn_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
        }
    }

    pub fn register(&self, max_sub: usize, outbound: mpsc::UnboundedSender<OutboundItem>) -> Arc<Connection> {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
        let conn = Arc::new(Connection::new(conn_id, max_sub, outbound));
        self.connections.write().expect("connections lock poisoned").insert(conn_id, Arc::clone(&conn));
        conn
    }

    /// Idempotent: removing an already-removed connection is a no-op
    /// (§4.5). All its subscriptions disappear with it, no notice sent.
    pub fn remove(&self, conn_id: u64) {
        self.connections.write().expect("connections lock poisoned").remove(&conn_id);
    }

    pub fn for_each(&self, mut f: impl FnMut(&Arc<Connection>)) {
        let connections = self.connections.read().expect("connections lock poisoned");
        for conn in connections.values() {
            f(conn);
        }
    }

    pub fn len(&self) -> usize {
        self.connections.read().expect("connections lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every live connection's socket (aborting its reader/writer
    /// tasks, §4.9/§5) and empties the connection table. Idempotent: safe
    /// to call repeatedly, or on an already-empty table.
    pub fn close_all(&self) {
        let conns: Vec<Arc<Connection>> = self
            .connections
            .read()
            .expect("connections lock poisoned")
            .values()
            .cloned()
            .collect();
        for conn in &conns {
            conn.close();
        }
        self.connections.write().expect("connections lock poisoned").clear();
    }
}
