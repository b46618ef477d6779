//! The Command Dispatcher (C6, §4.6): per-connection read loop, frame
//! decode, and the `EVENT`/`REQ`/`CLOSE` handlers.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use nostr_core::{Event, Filter, FilterSet, StoreError};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error};
use warp::ws::{Message, WebSocket};

use crate::accept::ConnectionContext;
use crate::connection::{ConnState, Connection};
use crate::fanout::FanOut;
use crate::server::RelayServer;

pub async fn handle_connection(server: Arc<RelayServer>, ws: WebSocket) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let conn = server.connections.register(server.config.max_sub, outbound_tx);
    debug!(conn_id = conn.conn_id, "connection opened");

    let writer = tokio::spawn(async move {
        while let Some(item) = outbound_rx.recv().await {
            let sent = ws_tx.send(Message::text(item.frame)).await.is_ok();
            if let Some(ack) = item.ack {
                let _ = ack.send(());
            }
            if !sent {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });
    conn.set_writer_abort(writer.abort_handle());

    // The read loop runs as its own task so that `Connection::close` (used
    // by shutdown, §4.9/§5) can abort it directly via its `AbortHandle`
    // rather than only flipping a flag the loop might never re-check while
    // parked on `ws_rx.next()`. This outer function keeps running either
    // way and performs teardown once the reader task ends, aborted or not.
    let reader_server = Arc::clone(&server);
    let reader_conn = Arc::clone(&conn);
    let reader = tokio::spawn(async move {
        while let Some(msg) = ws_rx.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    debug!(conn_id = reader_conn.conn_id, "transport error: {e}");
                    break;
                }
            };
            if msg.is_close() {
                break;
            }
            if let Ok(text) = msg.to_str() {
                dispatch(&reader_server, &reader_conn, text).await;
            }
        }
    });
    conn.set_reader_abort(reader.abort_handle());

    let _ = reader.await;

    conn.set_state(ConnState::Closed);
    server.connections.remove(conn.conn_id);
    writer.abort();
    debug!(conn_id = conn.conn_id, "connection closed");
}

async fn dispatch(server: &Arc<RelayServer>, conn: &Arc<Connection>, raw: &str) {
    if conn.state() != ConnState::Open {
        return;
    }

    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return send_notice(conn, "unable to decode command string").await,
    };
    let Some(arr) = value.as_array().filter(|a| !a.is_empty()) else {
        return send_notice(conn, "unable to decode command string").await;
    };
    let Some(verb) = arr[0].as_str() else {
        return send_notice(conn, "unable to decode command string").await;
    };

    match verb {
        "EVENT" => handle_event(server, conn, arr).await,
        "REQ" => handle_req(server, conn, arr).await,
        "CLOSE" => handle_close(conn, arr).await,
        other => send_notice(conn, &format!("unsupported command {other}")).await,
    }
}

async fn handle_event(server: &Arc<RelayServer>, conn: &Arc<Connection>, arr: &[Value]) {
    if arr.len() < 2 {
        return send_notice(conn, "missing event data").await;
    }

    let event: Event = match serde_json::from_value(arr[1].clone()) {
        Ok(e) => e,
        Err(_) => return send_notice(conn, "invalid event, pubkey doesn't match sig").await,
    };

    if !nostr_core::is_valid(&event) {
        return send_notice(conn, "invalid event, pubkey doesn't match sig").await;
    }

    let ctx = ConnectionContext {
        conn_id: conn.conn_id,
        peer_addr: None,
    };
    if let Err(reason) = server.accept_chain.check(&ctx, &event) {
        return send_notice(conn, &reason).await;
    }

    // add_event, do_delete, and the fan-out run as one unit so that, across
    // every connection, enqueue order onto any one socket matches
    // store-acceptance order (§4.7, §8 property 7).
    let add_result = {
        let _guard = server.ingest_lock.lock().await;
        let add_result = server.store.add_event(event.clone()).await;
        if add_result.is_ok() {
            if event.kind == 5 {
                if let Err(e) = server.store.do_delete(&event).await {
                    error!(event_id = %event.id, "do_delete failed: {e}");
                }
            }
            FanOut::deliver(&server.connections, &event);
        }
        add_result
    };

    match add_result {
        Ok(()) => {}
        Err(StoreError::Duplicate) => {
            send_notice(conn, &format!("event already exists: {}", event.id)).await;
        }
        Err(StoreError::StorageFault(msg)) => {
            error!(event_id = %event.id, "storage fault: {msg}");
            send_notice(conn, "storage error").await;
        }
    }
}

async fn handle_req(server: &Arc<RelayServer>, conn: &Arc<Connection>, arr: &[Value]) {
    if arr.len() < 2 {
        return send_notice(conn, "missing sub_id").await;
    }
    let Some(sub_id) = arr[1].as_str() else {
        return send_notice(conn, "missing sub_id").await;
    };
    let sub_id = sub_id.to_string();

    let mut filters = Vec::new();
    for raw_filter in &arr[2..] {
        match serde_json::from_value::<Filter>(raw_filter.clone()) {
            Ok(f) => filters.push(f),
            Err(_) => return send_notice(conn, "invalid filter").await,
        }
    }
    if filters.is_empty() {
        // §4.6 step 2: zero filters is treated as a single match-all filter.
        filters.push(Filter::new());
    }
    let filter_set = FilterSet(filters);

    if let Err(e) = conn.registry.add(&sub_id, filter_set.clone()) {
        return send_notice(conn, &e.to_string()).await;
    }

    let backfill = match server.store.get_filter(&filter_set).await {
        Ok(events) => events,
        Err(e) => {
            error!(%sub_id, "get_filter failed: {e}");
            send_notice(conn, "storage error").await;
            Vec::new()
        }
    };

    for event in &backfill {
        let frame = serde_json::json!(["EVENT", sub_id, event]).to_string();
        if conn.send_and_wait(frame).await.is_err() {
            return;
        }
    }

    if server.config.enable_eose {
        let frame = serde_json::json!(["EOSE", sub_id]).to_string();
        if conn.send_and_wait(frame).await.is_err() {
            return;
        }
    }

    // Only after backfill (and EOSE) have been handed to the writer does
    // the subscription become eligible for live delivery (§4.6 step 6).
    conn.registry.mark_live(&sub_id);
}

async fn handle_close(conn: &Arc<Connection>, arr: &[Value]) {
    if arr.len() < 2 {
        return send_notice(conn, "missing sub_id").await;
    }
    let Some(sub_id) = arr[1].as_str() else {
        return send_notice(conn, "missing sub_id").await;
    };

    match conn.registry.remove(sub_id) {
        Ok(()) => send_notice(conn, &format!("CLOSE sub_id {sub_id} - success")).await,
        Err(_) => send_notice(conn, "not subscribed").await,
    }
}

async fn send_notice(conn: &Arc<Connection>, msg: &str) {
    let frame = serde_json::json!(["NOTICE", msg]).to_string();
    let _ = conn.send_and_wait(frame).await;
}
