//! WebSocket listener transport: accept loop and per-session tasks.
//!
//! This module is responsible for:
//!
//! 1. Accepting TCP connections on the already-bound listener.
//! 2. Upgrading each one to a WebSocket session.
//! 3. Giving the event loop a [`WsListener`] handle for the session
//!    ([`ConnectionEvent::Opened`]) and reporting when it ends
//!    ([`ConnectionEvent::Closed`]).
//! 4. Writing every frame queued on the handle's outbox to the socket.
//!
//! Inbound frames are read only to notice closes; listeners have nothing to
//! say to the server.
//!
//! # Outbox
//!
//! Each session has a bounded outbox of [`OUTBOX_CAPACITY`] frames.  The event
//! loop never waits on a slow listener: a full outbox makes
//! [`WsListener::send`] fail with [`ListenerSendError::Backlogged`] and that
//! frame is dropped for that listener only.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::broadcast::{ConnectionId, ListenerConnection, ListenerSendError};

/// Frames a session may have queued before sends to it start failing.
pub const OUTBOX_CAPACITY: usize = 32;

const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Session lifecycle as seen by the event loop.
#[derive(Debug)]
pub enum ConnectionEvent {
    Opened(WsListener),
    Closed(ConnectionId),
}

/// The event loop's handle on one WebSocket session.
#[derive(Debug, Clone)]
pub struct WsListener {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    outbox: mpsc::Sender<Arc<str>>,
}

impl WsListener {
    pub fn new(id: ConnectionId, peer: Option<SocketAddr>, outbox: mpsc::Sender<Arc<str>>) -> Self {
        Self { id, peer, outbox }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl ListenerConnection for WsListener {
    fn id(&self) -> ConnectionId {
        self.id
    }

    /// Open while the session task still holds the receiving end.
    fn is_open(&self) -> bool {
        !self.outbox.is_closed()
    }

    fn send(&self, frame: Arc<str>) -> Result<(), ListenerSendError> {
        self.outbox.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => ListenerSendError::Backlogged,
            TrySendError::Closed(_) => ListenerSendError::Closed,
        })
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts listener connections until `running` is cleared.
///
/// Each accepted socket gets its own task; the loop never waits on a session.
/// Returns once the flag is observed cleared (checked every 200 ms) or the
/// event loop has gone away.
pub async fn run_accept_loop(
    listener: TcpListener,
    events: mpsc::Sender<ConnectionEvent>,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }
        if events.is_closed() {
            debug!("event loop gone; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new TCP connection from {peer_addr}");
                let events = events.clone();
                tokio::spawn(async move {
                    handle_session(stream, peer_addr, events).await;
                });
            }
            Ok(Err(e)) => back_off_after_accept_error(&e).await,
            Err(_) => {
                // No connection in the last poll window.
            }
        }
    }
}

/// Logs a failed `accept` and waits one poll window before the next attempt.
///
/// Errors such as `EMFILE` persist until a descriptor frees up.
async fn back_off_after_accept_error(e: &std::io::Error) {
    error!("accept error: {e}; retrying in {ACCEPT_POLL:?}");
    tokio::time::sleep(ACCEPT_POLL).await;
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    events: mpsc::Sender<ConnectionEvent>,
) {
    match run_session(stream, peer_addr, events).await {
        Ok(()) => info!("listener {peer_addr} disconnected"),
        Err(e) => warn!("listener {peer_addr} closed with error: {e:#}"),
    }
}

async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    events: mpsc::Sender<ConnectionEvent>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let id = Uuid::new_v4();
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<Arc<str>>(OUTBOX_CAPACITY);
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    if events
        .send(ConnectionEvent::Opened(WsListener::new(
            id,
            Some(peer_addr),
            outbox_tx,
        )))
        .await
        .is_err()
    {
        debug!("listener {peer_addr}: event loop gone before registration");
        return Ok(());
    }
    info!("listener {id} connected from {peer_addr}");

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            frame = outbox_rx.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = ws_tx.send(WsMessage::Text(frame.to_string())).await {
                        break Err(e).context("WebSocket send failed");
                    }
                }
                // Every sender dropped: the service is shutting down.
                None => {
                    let _ = ws_tx.close().await;
                    break Ok(());
                }
            },
            inbound = ws_rx.next() => match inbound {
                Some(Ok(WsMessage::Close(_))) | None => break Ok(()),
                Some(Ok(WsMessage::Text(text))) => {
                    debug!("listener {id}: ignoring inbound text ({} bytes)", text.len());
                }
                Some(Ok(_)) => {}
                Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => break Ok(()),
                Some(Err(e)) => break Err(e).context("WebSocket read failed"),
            },
        }
    };

    // Close the outbox before reporting so broadcasts already see it closed.
    outbox_rx.close();
    drop(outbox_rx);
    let _ = events.send(ConnectionEvent::Closed(id)).await;
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
