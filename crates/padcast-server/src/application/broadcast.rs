//! Fan-out of envelopes to every open listener.
//!
//! The distributor owns a [`ConnectionRegistry`] but not the connections'
//! lifetimes: the transport opens and closes them, and tells the registry via
//! [`ConnectionRegistry::register`] / [`ConnectionRegistry::deregister`].
//! Between those two calls a connection may already be closed on the wire;
//! [`BroadcastDistributor::broadcast`] observes that through
//! [`ListenerConnection::is_open`] and skips it.
//!
//! # Delivery contract
//!
//! - The envelope is serialized exactly once per broadcast.
//! - Each send is independent: a failure on one connection is logged and the
//!   loop moves on.
//! - Nothing is queued or retried here.  A listener that misses a
//!   `controllers` update catches up on the next one, which always carries
//!   the complete state.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::domain::messages::Envelope;

/// Identifies one listener connection for its whole lifetime.
pub type ConnectionId = Uuid;

/// A single listener could not take a frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListenerSendError {
    /// The connection went away between the open check and the send.
    #[error("listener connection closed")]
    Closed,

    /// The connection's outbox is full; this frame is dropped for it.
    #[error("listener outbox full")]
    Backlogged,
}

/// What the distributor needs from a transport connection.
pub trait ListenerConnection {
    fn id(&self) -> ConnectionId;

    /// Whether the transport still considers the connection open.
    fn is_open(&self) -> bool;

    /// Hands one encoded frame to the transport without waiting.
    fn send(&self, frame: Arc<str>) -> Result<(), ListenerSendError>;
}

/// Per-broadcast delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// The set of currently registered listener connections, in registration
/// order.
#[derive(Debug)]
pub struct ConnectionRegistry<C> {
    connections: Vec<C>,
}

impl<C> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            connections: Vec::new(),
        }
    }
}

impl<C: ListenerConnection> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection.  A second registration with the same id replaces
    /// the first.
    pub fn register(&mut self, connection: C) {
        let id = connection.id();
        self.connections.retain(|c| c.id() != id);
        self.connections.push(connection);
    }

    /// Removes a connection; returns `false` if it was not registered.
    pub fn deregister(&mut self, id: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id() != id);
        self.connections.len() != before
    }

    pub fn get(&self, id: ConnectionId) -> Option<&C> {
        self.connections.iter().find(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.connections.iter()
    }
}

// ── Distributor ───────────────────────────────────────────────────────────────

/// Serializes envelopes and pushes them to every open connection.
#[derive(Debug)]
pub struct BroadcastDistributor<C> {
    registry: ConnectionRegistry<C>,
}

impl<C> Default for BroadcastDistributor<C> {
    fn default() -> Self {
        Self {
            registry: ConnectionRegistry::default(),
        }
    }
}

impl<C: ListenerConnection> BroadcastDistributor<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConnectionRegistry<C> {
        &mut self.registry
    }

    /// Delivers `envelope` to every open connection.
    ///
    /// Never fails: per-connection errors are logged and counted in the
    /// returned report.
    pub fn broadcast(&self, envelope: &Envelope) -> BroadcastReport {
        let frame: Arc<str> = match envelope.to_json() {
            Ok(text) => text.into(),
            Err(e) => {
                error!("failed to encode {} envelope: {e}", envelope.kind());
                return BroadcastReport::default();
            }
        };

        trace!("broadcasting: {frame}");

        let mut report = BroadcastReport::default();
        for connection in self.registry.iter() {
            if !connection.is_open() {
                debug!("listener {} not open; skipping", connection.id());
                report.skipped += 1;
                continue;
            }
            match connection.send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("error sending to listener {}: {e}", connection.id());
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Delivers `envelope` to one connection only.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerSendError::Closed`] if the connection is not
    /// registered or not open, or the send error.
    pub fn send_to(&self, id: ConnectionId, envelope: &Envelope) -> Result<(), ListenerSendError> {
        let connection = self
            .registry
            .get(id)
            .filter(|c| c.is_open())
            .ok_or(ListenerSendError::Closed)?;
        match envelope.to_json() {
            Ok(text) => connection.send(text.into()),
            Err(e) => {
                error!("failed to encode {} envelope: {e}", envelope.kind());
                Ok(())
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use padcast_core::InputSnapshot;

    use crate::domain::messages::StatusKind;

    /// In-memory connection recording every frame it accepts.
    #[derive(Clone)]
    struct FakeConnection {
        id: ConnectionId,
        open: Rc<Cell<bool>>,
        fail_with: Option<ListenerSendError>,
        frames: Rc<RefCell<Vec<String>>>,
    }

    impl FakeConnection {
        fn open() -> Self {
            Self {
                id: Uuid::new_v4(),
                open: Rc::new(Cell::new(true)),
                fail_with: None,
                frames: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn closed() -> Self {
            let conn = Self::open();
            conn.open.set(false);
            conn
        }

        fn failing(error: ListenerSendError) -> Self {
            Self {
                fail_with: Some(error),
                ..Self::open()
            }
        }

        fn frames(&self) -> Vec<String> {
            self.frames.borrow().clone()
        }
    }

    impl ListenerConnection for FakeConnection {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn is_open(&self) -> bool {
            self.open.get()
        }

        fn send(&self, frame: Arc<str>) -> Result<(), ListenerSendError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.frames.borrow_mut().push(frame.to_string());
            Ok(())
        }
    }

    fn distributor_with(conns: &[FakeConnection]) -> BroadcastDistributor<FakeConnection> {
        let mut distributor = BroadcastDistributor::new();
        for conn in conns {
            distributor.registry_mut().register(conn.clone());
        }
        distributor
    }

    // ── registry ──────────────────────────────────────────────────────────────

    #[test]
    fn test_register_and_deregister() {
        // Arrange
        let a = FakeConnection::open();
        let b = FakeConnection::open();
        let mut registry = ConnectionRegistry::new();

        // Act
        registry.register(a.clone());
        registry.register(b.clone());
        let removed = registry.deregister(a.id);

        // Assert
        assert!(removed);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(b.id).is_some());
        assert!(registry.get(a.id).is_none());
    }

    #[test]
    fn test_deregister_unknown_id_returns_false() {
        let mut registry: ConnectionRegistry<FakeConnection> = ConnectionRegistry::new();
        assert!(!registry.deregister(Uuid::new_v4()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_same_id_replaces() {
        let a = FakeConnection::open();
        let mut registry = ConnectionRegistry::new();
        registry.register(a.clone());
        registry.register(a.clone());
        assert_eq!(registry.len(), 1);
    }

    // ── broadcast ─────────────────────────────────────────────────────────────

    #[test]
    fn test_broadcast_skips_closed_and_delivers_to_the_rest() {
        // Arrange: three listeners, the middle one already closed.
        let first = FakeConnection::open();
        let closed = FakeConnection::closed();
        let last = FakeConnection::open();
        let distributor = distributor_with(&[first.clone(), closed.clone(), last.clone()]);

        // Act
        let report = distributor.broadcast(&Envelope::test());

        // Assert
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(first.frames().len(), 1);
        assert_eq!(last.frames().len(), 1);
        assert!(closed.frames().is_empty());
    }

    #[test]
    fn test_closed_connection_is_not_removed_by_broadcast() {
        let closed = FakeConnection::closed();
        let distributor = distributor_with(&[closed.clone()]);

        distributor.broadcast(&Envelope::test());

        assert_eq!(distributor.registry().len(), 1);
    }

    #[test]
    fn test_send_failure_does_not_stop_the_loop() {
        // Arrange
        let broken = FakeConnection::failing(ListenerSendError::Backlogged);
        let gone = FakeConnection::failing(ListenerSendError::Closed);
        let healthy = FakeConnection::open();
        let distributor = distributor_with(&[broken, gone, healthy.clone()]);

        // Act
        let report = distributor.broadcast(&Envelope::status(StatusKind::Connected, "ok"));

        // Assert
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(healthy.frames().len(), 1);
    }

    #[test]
    fn test_every_listener_gets_identical_frame() {
        let a = FakeConnection::open();
        let b = FakeConnection::open();
        let distributor = distributor_with(&[a.clone(), b.clone()]);
        let envelope = Envelope::Controllers {
            controllers: vec![Some(InputSnapshot::default()), None],
        };

        distributor.broadcast(&envelope);

        assert_eq!(a.frames(), b.frames());
        assert_eq!(a.frames()[0], envelope.to_json().unwrap());
    }

    #[test]
    fn test_broadcast_with_no_listeners_is_a_no_op() {
        let distributor: BroadcastDistributor<FakeConnection> = BroadcastDistributor::new();
        assert_eq!(
            distributor.broadcast(&Envelope::test()),
            BroadcastReport::default()
        );
    }

    // ── send_to ───────────────────────────────────────────────────────────────

    #[test]
    fn test_send_to_targets_one_listener() {
        let a = FakeConnection::open();
        let b = FakeConnection::open();
        let distributor = distributor_with(&[a.clone(), b.clone()]);

        distributor.send_to(a.id, &Envelope::test()).unwrap();

        assert_eq!(a.frames().len(), 1);
        assert!(b.frames().is_empty());
    }

    #[test]
    fn test_send_to_closed_or_unknown_is_closed_error() {
        let closed = FakeConnection::closed();
        let distributor = distributor_with(&[closed.clone()]);

        assert_eq!(
            distributor.send_to(closed.id, &Envelope::test()),
            Err(ListenerSendError::Closed)
        );
        assert_eq!(
            distributor.send_to(Uuid::new_v4(), &Envelope::test()),
            Err(ListenerSendError::Closed)
        );
    }
}
