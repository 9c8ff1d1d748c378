//! End-to-end tests for the driver gateway
//!
//! Each test runs:
//! 1. example-driver on a local TCP port
//! 2. a Controller connected to it
//! 3. the HTTP router on a TestServer
//!
//! and talks to the stack through DriverGateClient.
//!
//! Run with: cargo test -p drivergate-tests --test e2e_test

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use drivergate_api::{create_router, AppState};
use drivergate_client::testing::{wait_for, TestServer};
use drivergate_client::CommandResult;
use drivergate_core::{Framing, GatewayConfig};
use drivergate_relay::{ConnectionState, Controller};
use example_driver::{DeviceProfile, DriverHandle, SimulatedDevice};
use pretty_assertions::assert_eq;
use serial_test::serial;

// =============================================================================
// Harness
// =============================================================================

/// Driver, controller and HTTP server for one test
struct TestHarness {
    driver: Option<DriverHandle>,
    controller: Arc<Controller>,
    server: TestServer,
}

fn gateway_config(port: u16, framing: Framing, reply_timeout_ms: u64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.driver.host = "127.0.0.1".to_string();
    config.driver.port = port;
    config.driver.framing = framing;
    config.driver.read_timeout_ms = 20;
    config.driver.reconnect_interval_ms = 50;
    config.gateway.reply_timeout_ms = reply_timeout_ms;
    config
}

async fn spawn_driver(addr: &str, profile: DeviceProfile, framing: Framing) -> DriverHandle {
    example_driver::spawn(addr, Arc::new(SimulatedDevice::new(profile)), framing)
        .await
        .expect("driver should bind")
}

/// A port that nothing listens on (until a test binds it)
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

impl TestHarness {
    async fn new() -> Self {
        Self::with_options(DeviceProfile::default(), Framing::Raw, 2000).await
    }

    async fn with_options(profile: DeviceProfile, framing: Framing, reply_timeout_ms: u64) -> Self {
        let driver = spawn_driver("127.0.0.1:0", profile, framing).await;
        let config = gateway_config(driver.addr().port(), framing, reply_timeout_ms);
        let mut harness = Self::serve(config).await;
        harness.driver = Some(driver);
        assert!(
            harness.wait_connected().await,
            "gateway never connected to the driver"
        );
        harness
    }

    /// Start controller and HTTP server without a driver
    async fn serve(config: GatewayConfig) -> Self {
        let controller = Arc::new(Controller::from_config(&config));
        controller.start().await.unwrap();

        let router = create_router(AppState::new(controller.clone()).with_max_in_flight(4));
        let server = TestServer::start(router).await.unwrap();

        Self {
            driver: None,
            controller,
            server,
        }
    }

    /// Wait until `/_status` reports the driver connection
    async fn wait_connected(&self) -> bool {
        self.server.wait_until_connected(Duration::from_secs(5)).await
    }

    async fn send(&self, command: &str) -> CommandResult {
        self.server.client.send(command).await.unwrap()
    }

    async fn shutdown(mut self) {
        self.controller.stop().await;
        if let Some(driver) = self.driver.take() {
            driver.shutdown().await;
        }
        self.server.shutdown().await;
    }
}

// =============================================================================
// Request / Reply
// =============================================================================

#[tokio::test]
async fn test_ping_pong() {
    let harness = TestHarness::new().await;

    let result = harness.send("ping").await;
    assert_eq!(result.status, 200);
    assert_eq!(result.body, "pong");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_validation_error_is_400() {
    let harness = TestHarness::new().await;

    // get_config is only allowed in the config state
    let result = harness.send("get_config=focus").await;
    assert_eq!(result.status, 400);
    assert_eq!(result.body, "validation_error");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_driver_timeout_sentinel_is_408() {
    let profile = DeviceProfile::default().with_timeout_command("get_frame");
    let harness = TestHarness::with_options(profile, Framing::Raw, 2000).await;

    let result = harness.send("get_frame").await;
    assert_eq!(result.status, 408);
    assert_eq!(result.body, "timeout_error");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_configuration_session() {
    let harness = TestHarness::new().await;

    let expected = [
        ("reset", 200, "reset_ack"),
        ("get_state", 200, "state:idle"),
        ("set_state=config", 200, "state:config"),
        ("get_config=focus", 200, "focus:800"),
        ("set_config=focus:1200", 200, "focus:1200"),
        ("get_config=focus", 200, "focus:1200"),
        ("set_config=focus:1601", 400, "validation_error"),
        ("set_config=gain:-3", 200, "gain:-3"),
        ("set_state=idle", 200, "state:idle"),
    ];

    let commands: Vec<&str> = expected.iter().map(|(command, _, _)| *command).collect();
    let results = harness.server.send_all(&commands).await.unwrap();
    for ((command, status, body), result) in expected.iter().zip(&results) {
        assert_eq!((result.status, result.body.as_str()), (*status, *body), "{command}");
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn test_trigger_and_frame() {
    let profile = DeviceProfile::default().with_inspection_scale(0.0);
    let harness = TestHarness::with_options(profile, Framing::Raw, 2000).await;

    assert_eq!(harness.send("get_frame").await.body, "no_frame");
    assert_eq!(harness.send("trigger").await.body, "trigger_ack");
    assert_eq!(harness.send("get_frame").await.body, "frame:1");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_silent_driver_times_out_then_relay_keeps_working() {
    let harness = TestHarness::with_options(DeviceProfile::default(), Framing::Raw, 300).await;

    // The driver answers nothing to a whitespace-only message
    let result = harness.send(" ").await;
    assert_eq!(result.status, 408);
    assert_eq!(result.body, "timeout");
    assert!(result.elapsed >= Duration::from_millis(300));

    let result = harness.send("ping").await;
    assert_eq!(result.status, 200);
    assert_eq!(result.body, "pong");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_sequential_replies_stay_in_order() {
    let harness = TestHarness::new().await;

    for i in 0..20 {
        let (command, expected) = if i % 2 == 0 {
            ("ping", "pong")
        } else {
            ("get_state", "state:idle")
        };
        assert_eq!(harness.send(command).await.body, expected, "request {i}");
    }

    harness.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_get_their_own_replies() {
    let harness = TestHarness::new().await;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = harness.server.client.clone();
        tasks.push(tokio::spawn(async move {
            let (command, expected) = if i % 2 == 0 {
                ("ping", "pong")
            } else {
                ("get_state", "state:idle")
            };
            let result = client.send(command).await.unwrap();
            (expected, result)
        }));
    }

    for task in tasks {
        let (expected, result) = task.await.unwrap();
        assert_eq!(result.status, 200);
        assert_eq!(result.body, expected);
    }

    harness.shutdown().await;
}

// =============================================================================
// Connection Loss and Recovery
// =============================================================================

#[tokio::test]
#[serial]
async fn test_driver_down_then_up() {
    let port = free_port();
    let harness = TestHarness::serve(gateway_config(port, Framing::Line, 300)).await;

    // Nothing listens yet: the request times out, the relay keeps retrying
    let result = harness.send("ping").await;
    assert_eq!(result.status, 408);
    assert_eq!(result.body, "timeout");
    let status = harness.server.client.status().await.unwrap();
    assert!(status.relay_running);
    assert!(!status.is_connected());

    let driver = spawn_driver(
        &format!("127.0.0.1:{}", port),
        DeviceProfile::default(),
        Framing::Line,
    )
    .await;
    assert!(harness.wait_connected().await);

    // The queued ping from above is delivered on connect; let its reply land
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = harness.send("ping").await;
    assert_eq!(result.status, 200);
    assert_eq!(result.body, "pong");

    harness.controller.stop().await;
    driver.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_reconnects_after_driver_restart() {
    let mut harness = TestHarness::new().await;
    let driver = harness.driver.take().unwrap();
    let addr = driver.addr().to_string();

    assert_eq!(harness.send("ping").await.body, "pong");

    driver.shutdown().await;
    let lost = wait_for(
        || {
            let controller = harness.controller.clone();
            async move { controller.connection_state() != ConnectionState::Connected }
        },
        Duration::from_secs(5),
    )
    .await;
    assert!(lost, "gateway did not notice the driver going away");

    let driver = spawn_driver(&addr, DeviceProfile::default(), Framing::Raw).await;
    assert!(harness.wait_connected().await);

    assert_eq!(harness.send("ping").await.body, "pong");

    harness.driver = Some(driver);
    harness.shutdown().await;
}

// =============================================================================
// Gateway Endpoints and Lifecycle
// =============================================================================

#[tokio::test]
async fn test_health_and_status() {
    let harness = TestHarness::new().await;

    assert_eq!(harness.server.client.health().await.unwrap(), "OK");

    let response = reqwest::get(format!("{}/_status", harness.server.base_url()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["connection"], "connected");
    assert_eq!(json["relay_running"], true);
    let driver_addr = harness.driver.as_ref().unwrap().addr().to_string();
    assert_eq!(json["driver"], driver_addr.as_str());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_stop_before_start_and_twice() {
    let controller = Controller::from_config(&gateway_config(free_port(), Framing::Raw, 100));

    tokio::time::timeout(Duration::from_secs(1), controller.stop())
        .await
        .expect("stop before start should return promptly");

    controller.start().await.unwrap();
    assert!(controller.is_running().await);

    tokio::time::timeout(Duration::from_secs(1), controller.stop())
        .await
        .expect("stop should return promptly while reconnecting");
    tokio::time::timeout(Duration::from_secs(1), controller.stop())
        .await
        .expect("second stop should be a no-op");
    assert!(!controller.is_running().await);
}

#[tokio::test]
async fn test_restart_keeps_serving() {
    let harness = TestHarness::new().await;

    harness.controller.stop().await;
    harness.controller.start().await.unwrap();
    assert!(harness.wait_connected().await);

    assert_eq!(harness.send("ping").await.body, "pong");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_gateway_from_config_file() {
    let driver = spawn_driver("127.0.0.1:0", DeviceProfile::default(), Framing::Line).await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[driver]
host = "127.0.0.1"
port = {}
framing = "line"
read_timeout_ms = 20

[gateway]
reply_timeout_ms = 2000
"#,
        driver.addr().port()
    )
    .unwrap();

    let config = GatewayConfig::load(file.path()).unwrap();
    assert_eq!(config.driver.framing, Framing::Line);

    let mut harness = TestHarness::serve(config).await;
    harness.driver = Some(driver);
    assert!(harness.wait_connected().await);

    assert_eq!(harness.send("ping").await.body, "pong");
    assert_eq!(harness.send("get_state").await.body, "state:idle");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_line_framing_refuses_embedded_newline() {
    let harness = TestHarness::with_options(DeviceProfile::default(), Framing::Line, 2000).await;

    // Would reach the driver as two commands under line framing
    let result = harness.send("set_state=config\nreset").await;
    assert_eq!(result.status, 400);
    assert_eq!(result.body, "validation_error");

    // The device never saw either half
    assert_eq!(harness.send("get_state").await.body, "state:idle");

    harness.shutdown().await;
}
