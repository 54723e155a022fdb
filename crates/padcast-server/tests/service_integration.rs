//! End-to-end tests: scripted controllers in, real WebSocket client out.
//!
//! Each test binds the service on an ephemeral loopback port, runs it on the
//! test runtime and talks to it with `tokio_tungstenite::connect_async`.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use padcast_core::{Tuning, REPORT_LEN};
use padcast_server::domain::ServerConfig;
use padcast_server::infrastructure::report_source::{
    ScriptedDeviceProvider, ScriptedReportSource, SourceError, UnavailableDeviceProvider,
};
use padcast_server::infrastructure::{DeviceProvider, Service};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ───────────────────────────────────────────────────────────────────

struct RunningService {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl RunningService {
    async fn start(provider: Box<dyn DeviceProvider>) -> Self {
        let config = ServerConfig {
            ws_bind_addr: "127.0.0.1:0".parse().unwrap(),
            tuning: Tuning {
                sample_target: 3,
                tick_period: Duration::from_millis(1),
                ..Tuning::default()
            },
            ..ServerConfig::default()
        };
        let service = Service::bind(config).await.expect("bind");
        let addr = service.local_addr();
        let running = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(service.run(provider, Arc::clone(&running)));
        Self {
            addr,
            running,
            handle,
        }
    }

    async fn connect(&self) -> Client {
        let (client, _) = connect_async(format!("ws://{}", self.addr))
            .await
            .expect("connect");
        client
    }

    async fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        timeout(WAIT, self.handle)
            .await
            .expect("service should stop promptly")
            .expect("service task panicked")
            .expect("service returned an error");
    }
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let message = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("WebSocket error");
        match message {
            Message::Text(text) => return serde_json::from_str(&text).expect("valid JSON"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Full-length report with the given left-stick x; everything else at rest.
fn report_with_left_x(x: u8) -> Vec<u8> {
    let mut report = vec![0u8; REPORT_LEN];
    report[0] = 0x01;
    report[1..5].copy_from_slice(&[128; 4]);
    report[1] = x;
    report[8] = 0x08;
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_listener_sees_greeting_status_then_calibrated_snapshots() {
    // Arrange: three resting samples at left-x 130, then idle at 128.
    let controller = ScriptedReportSource::new("pad-0")
        .with_repeated(&report_with_left_x(130), 3)
        .idling_with(report_with_left_x(128));
    let service =
        RunningService::start(Box::new(ScriptedDeviceProvider::new().with_device(controller)))
            .await;

    // Act
    let mut client = service.connect().await;

    // Assert: greeting first.
    let greeting = next_json(&mut client).await;
    assert_eq!(greeting["type"], "test");
    assert_eq!(greeting["message"], "WebSocket connection successful");

    // Assert: the startup status is replayed to this late joiner.
    let status = next_json(&mut client).await;
    assert_eq!(status["type"], "status");
    assert_eq!(status["status"], "connected");
    assert_eq!(status["message"], "Connected 1 DualSense controller(s)");

    // Assert: snapshots carry one slot with the calibrated offset applied.
    let update = next_json(&mut client).await;
    assert_eq!(update["type"], "controllers");
    let slots = update["controllers"].as_array().unwrap();
    assert_eq!(slots.len(), 1);
    let x = slots[0]["leftStick"]["x"].as_f64().unwrap();
    assert!((x - -0.00244140625).abs() < 1e-9, "got {x}");
    assert_eq!(slots[0]["dpad"]["up"], false);

    service.stop().await;
}

#[tokio::test]
async fn test_enumeration_failure_reports_error_status() {
    // Arrange
    let service = RunningService::start(Box::new(UnavailableDeviceProvider)).await;

    // Act
    let mut client = service.connect().await;

    // Assert
    assert_eq!(next_json(&mut client).await["type"], "test");
    let status = next_json(&mut client).await;
    assert_eq!(status["status"], "error");
    assert_eq!(status["message"], "built without HID support");

    service.stop().await;
}

#[tokio::test]
async fn test_failed_device_keeps_null_slot_next_to_live_one() {
    // Arrange: slot 0 cannot be opened, slot 1 calibrates and streams.
    let provider = ScriptedDeviceProvider::new()
        .with_unopenable(SourceError::Attach("busy".into()))
        .with_device(
            ScriptedReportSource::new("pad-1")
                .with_repeated(&report_with_left_x(128), 3)
                .idling_with(report_with_left_x(128)),
        );
    let service = RunningService::start(Box::new(provider)).await;

    // Act
    let mut client = service.connect().await;
    next_json(&mut client).await; // test
    next_json(&mut client).await; // status
    let update = next_json(&mut client).await;

    // Assert
    let slots = update["controllers"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert!(slots[0].is_null());
    assert!(slots[1].is_object());

    service.stop().await;
}

#[tokio::test]
async fn test_no_devices_reports_not_found_and_no_snapshots() {
    // Arrange
    let service = RunningService::start(Box::new(ScriptedDeviceProvider::new())).await;

    // Act
    let mut client = service.connect().await;
    next_json(&mut client).await; // test
    let status = next_json(&mut client).await;

    // Assert
    assert_eq!(status["status"], "disconnected");
    assert_eq!(status["message"], "No controllers found");
    assert!(
        timeout(Duration::from_millis(300), client.next()).await.is_err(),
        "nothing else should be sent"
    );

    service.stop().await;
}

#[tokio::test]
async fn test_every_listener_receives_updates() {
    // Arrange
    let controller = ScriptedReportSource::new("pad-0")
        .with_repeated(&report_with_left_x(128), 3)
        .idling_with(report_with_left_x(200));
    let service =
        RunningService::start(Box::new(ScriptedDeviceProvider::new().with_device(controller)))
            .await;

    // Act
    let mut first = service.connect().await;
    let mut second = service.connect().await;

    // Assert: both get the full sequence independently.
    for client in [&mut first, &mut second] {
        assert_eq!(next_json(client).await["type"], "test");
        assert_eq!(next_json(client).await["type"], "status");
        let update = next_json(client).await;
        assert_eq!(update["type"], "controllers");
        assert!(update["controllers"][0]["leftStick"]["x"].as_f64().unwrap() > 0.5);
    }

    // Act: one listener leaves; the other keeps receiving.
    first.close(None).await.unwrap();
    assert_eq!(next_json(&mut second).await["type"], "controllers");

    service.stop().await;
}
