//! The service event loop: devices in, envelopes out.
//!
//! [`Service::bind`] claims the WebSocket port; [`Service::run`] attaches the
//! controllers and then multiplexes four sources on one task until the
//! `running` flag is cleared:
//!
//! ```text
//!   reader threads ──DeviceEvent──►┐
//!   calibration ticker ───────────►├─► Pipeline ─► ControllerHub ─► BroadcastDistributor ─► WsListener outboxes
//!   accept loop ─ConnectionEvent──►│
//!   200 ms shutdown poll ─────────►┘
//! ```
//!
//! The hub and the connection registry are owned by the loop and never
//! shared, so nothing here takes a lock.
//!
//! Calibration reads happen inline on the loop: on every tick each device
//! that is still sampling gets exactly one blocking `read_report`.  Once a
//! device calibrates, its source moves to a reader thread and its reports
//! arrive as [`DeviceEvent`]s.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use padcast_core::SampleOutcome;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::application::broadcast::{BroadcastDistributor, ConnectionId, ListenerConnection};
use crate::application::calibration::{calibration_tick, IntervalTicker, Ticker, TickOutcome};
use crate::application::hub::ControllerHub;
use crate::domain::config::ServerConfig;
use crate::domain::messages::{Envelope, StatusKind};
use crate::infrastructure::report_source::{
    spawn_report_stream, DeviceEvent, DeviceProvider, ReportSource, SourceError,
};
use crate::infrastructure::ws_server::{run_accept_loop, ConnectionEvent, WsListener};

/// Bound on queued device reports across all reader threads.
pub const DEVICE_EVENT_CAPACITY: usize = 256;

const CONNECTION_EVENT_CAPACITY: usize = 64;
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Status envelope describing the outcome of device discovery.
///
/// `matched` counts every device that passed the filter; `attached` those
/// that also opened.
pub fn attach_status(matched: usize, attached: usize) -> Envelope {
    if attached > 0 {
        Envelope::status(
            StatusKind::Connected,
            format!("Connected {attached} DualSense controller(s)"),
        )
    } else if matched > 0 {
        Envelope::status(
            StatusKind::Disconnected,
            "No controllers were successfully connected",
        )
    } else {
        Envelope::status(StatusKind::Disconnected, "No controllers found")
    }
}

/// A bound, not yet running, service.
pub struct Service {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Service {
    /// Binds the WebSocket listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (port in use, no
    /// permission).
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.ws_bind_addr)
            .await
            .with_context(|| {
                format!(
                    "failed to bind WebSocket listener on {}",
                    config.ws_bind_addr
                )
            })?;
        let local_addr = listener
            .local_addr()
            .context("failed to read bound WebSocket address")?;
        info!("WebSocket server listening on {local_addr}");
        Ok(Self {
            config,
            listener,
            local_addr,
        })
    }

    /// The bound address (useful with port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Attaches controllers and runs the event loop until `running` is
    /// cleared.
    ///
    /// Device failures never end the loop; they are logged and reported to
    /// listeners as `status` envelopes.
    ///
    /// # Errors
    ///
    /// Currently infallible after [`Service::bind`]; the `Result` leaves room
    /// for startup steps that can fail.
    pub async fn run(
        self,
        provider: Box<dyn DeviceProvider>,
        running: Arc<AtomicBool>,
    ) -> anyhow::Result<()> {
        let (conn_tx, mut conn_rx) = mpsc::channel(CONNECTION_EVENT_CAPACITY);
        let accept_task = tokio::spawn(run_accept_loop(
            self.listener,
            conn_tx,
            Arc::clone(&running),
        ));

        let (device_tx, mut device_rx) = mpsc::channel(DEVICE_EVENT_CAPACITY);
        let mut pipeline = Pipeline::attach(
            provider.as_ref(),
            &self.config,
            device_tx,
            Arc::clone(&running),
        );

        let mut ticker = IntervalTicker::new(self.config.tuning.tick_period);
        let mut shutdown_poll = tokio::time::interval(SHUTDOWN_POLL);

        loop {
            tokio::select! {
                Some(event) = device_rx.recv() => pipeline.on_device_event(event),
                _ = ticker.tick(), if pipeline.hub.any_sampling() => pipeline.on_calibration_tick(),
                Some(event) = conn_rx.recv() => pipeline.on_connection_event(event),
                _ = shutdown_poll.tick() => {
                    if !running.load(Ordering::Relaxed) {
                        info!("shutdown flag set; stopping event loop");
                        break;
                    }
                }
            }
        }

        // Dropping the listener handles ends every session; dropping the
        // receiver unblocks any reader stuck on a full channel.
        let readers = pipeline.shutdown();
        drop(device_rx);
        let joined = tokio::task::spawn_blocking(move || {
            for reader in readers {
                if reader.join().is_err() {
                    error!("a device reader thread panicked");
                }
            }
        })
        .await;
        if let Err(e) = joined {
            warn!("failed to join device readers: {e}");
        }
        if let Err(e) = accept_task.await {
            warn!("accept loop ended abnormally: {e}");
        }
        Ok(())
    }
}

// ── Pipeline state ────────────────────────────────────────────────────────────

/// Everything the event loop mutates.
struct Pipeline {
    hub: ControllerHub,
    /// Sources still owned by the loop (sampling devices).  `None` once moved
    /// to a reader thread, or for devices that failed.
    sources: Vec<Option<Box<dyn ReportSource>>>,
    distributor: BroadcastDistributor<WsListener>,
    last_status: Option<Envelope>,
    device_tx: mpsc::Sender<DeviceEvent>,
    running: Arc<AtomicBool>,
    readers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    fn attach(
        provider: &dyn DeviceProvider,
        config: &ServerConfig,
        device_tx: mpsc::Sender<DeviceEvent>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let (sources, status) = match provider.attach_all() {
            Ok(attached) => {
                let matched = attached.len();
                let sources: Vec<Option<Box<dyn ReportSource>>> = attached
                    .into_iter()
                    .enumerate()
                    .map(|(index, result)| match result {
                        Ok(source) => Some(source),
                        Err(e) => {
                            error!("controller {index}: {e}");
                            None
                        }
                    })
                    .collect();
                let opened = sources.iter().filter(|s| s.is_some()).count();
                info!("{matched} controller(s) matched, {opened} opened");
                (sources, attach_status(matched, opened))
            }
            Err(e) => {
                error!("{e}");
                (Vec::new(), enumeration_status(&e))
            }
        };

        let mut hub = ControllerHub::new(sources.len(), &config.tuning);
        for (index, source) in sources.iter().enumerate() {
            match source {
                Some(source) => info!(
                    "controller {index}: calibrating from {} over ~{:?}; keep the sticks at rest",
                    source.describe(),
                    config.tuning.calibration_duration()
                ),
                None => hub.mark_failed(index),
            }
        }

        let mut pipeline = Self {
            hub,
            sources,
            distributor: BroadcastDistributor::new(),
            last_status: None,
            device_tx,
            running,
            readers: Vec::new(),
        };
        pipeline.publish_status(status);
        pipeline
    }

    fn publish_status(&mut self, status: Envelope) {
        self.distributor.broadcast(&status);
        self.last_status = Some(status);
    }

    fn on_calibration_tick(&mut self) {
        for index in self.hub.sampling_indices() {
            let (Some(Some(source)), Some(state)) =
                (self.sources.get_mut(index), self.hub.calibration_mut(index))
            else {
                self.hub.mark_failed(index);
                continue;
            };
            match calibration_tick(index, &mut **source, state) {
                TickOutcome::Sampled(SampleOutcome::Completed(_)) => self.start_stream(index),
                TickOutcome::ReadFailed(_) => self.sources[index] = None,
                TickOutcome::Sampled(_) | TickOutcome::Finished => {}
            }
        }
    }

    fn start_stream(&mut self, index: usize) {
        let Some(source) = self.sources.get_mut(index).and_then(Option::take) else {
            return;
        };
        match spawn_report_stream(
            index,
            source,
            self.device_tx.clone(),
            Arc::clone(&self.running),
        ) {
            Ok(handle) => self.readers.push(handle),
            Err(e) => error!("controller {index}: failed to start reader thread: {e}"),
        }
    }

    fn on_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Report { index, bytes } => {
                if let Some(envelope) = self.hub.apply_report(index, &bytes) {
                    self.distributor.broadcast(&envelope);
                }
            }
            DeviceEvent::StreamEnded {
                index,
                error: Some(e),
            } => error!("controller {index}: stream ended: {e}"),
            DeviceEvent::StreamEnded { index, error: None } => {
                debug!("controller {index}: reader stopped");
            }
        }
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened(listener) => {
                let id = listener.id();
                self.distributor.registry_mut().register(listener);
                self.greet(id);
                debug!("{} listener(s) connected", self.distributor.registry().len());
            }
            ConnectionEvent::Closed(id) => {
                if self.distributor.registry_mut().deregister(id) {
                    debug!(
                        "listener {id} removed; {} remaining",
                        self.distributor.registry().len()
                    );
                }
            }
        }
    }

    /// Sends the greeting, then the latest status so late joiners see it.
    fn greet(&self, id: ConnectionId) {
        if let Err(e) = self.distributor.send_to(id, &Envelope::test()) {
            warn!("error sending greeting to listener {id}: {e}");
            return;
        }
        if let Some(status) = &self.last_status {
            if let Err(e) = self.distributor.send_to(id, status) {
                warn!("error sending status to listener {id}: {e}");
            }
        }
    }

    /// Releases every listener and source and hands back the reader threads.
    fn shutdown(self) -> Vec<JoinHandle<()>> {
        let Self { readers, .. } = self;
        readers
    }
}

fn enumeration_status(error: &SourceError) -> Envelope {
    let text = match error {
        SourceError::Enumeration(message) => message.clone(),
        other => other.to_string(),
    };
    Envelope::status(StatusKind::Error, text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
