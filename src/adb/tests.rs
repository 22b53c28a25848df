// Orchestrator flow tests against a scripted fake runner.
// Focus: state-machine transitions, failure taxonomy, idempotency.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::error::{AdbError, AdbResult};
use super::orchestrator::{ConnectionOrchestrator, DEFAULT_TCPIP_PORT};
use super::probe::DeviceStatusProbe;
use super::registry::{DeviceRegistry, resolve_target};
use super::runner::{AdbOutput, AdbRunner};
use super::types::{DeviceRecord, DeviceState, LinkState, PairingSession, ProbedDevice};

/// Scripted stand-in for the `adb` binary: pops one queued response per
/// invocation and records the argument vectors it was called with.
#[derive(Default)]
struct FakeAdb {
    responses: Mutex<VecDeque<AdbResult<AdbOutput>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeAdb {
    fn new() -> Self {
        Self::default()
    }

    fn push_ok(&self, stdout: &str) {
        self.push(Ok(AdbOutput {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }));
    }

    fn push_fail(&self, stderr: &str) {
        self.push(Ok(AdbOutput {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }));
    }

    fn push(&self, response: AdbResult<AdbOutput>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl AdbRunner for &FakeAdb {
    async fn run(&self, args: &[&str], _timeout: Duration) -> AdbResult<AdbOutput> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|s| s.to_string()).collect());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected adb invocation")
    }
}

#[tokio::test]
async fn pair_success_leaves_record_paired() {
    let adb = FakeAdb::new();
    adb.push_ok("Successfully paired to 192.168.1.50:37099 [guid=adb-xyz]");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    let session = PairingSession::new("192.168.1.50:37099", "123456");
    orchestrator.pair(&mut registry, &session).await.unwrap();

    let record = registry.get("192.168.1.50:37099").unwrap();
    assert_eq!(record.link, LinkState::Paired);
    assert!(record.last_seen.is_some());
    assert_eq!(
        adb.calls(),
        vec![vec![
            "pair".to_string(),
            "192.168.1.50:37099".to_string(),
            "123456".to_string()
        ]]
    );
}

#[tokio::test]
async fn pair_wrong_code_reverts_to_unpaired() {
    let adb = FakeAdb::new();
    adb.push_fail("Failed: Wrong password or connection was dropped.");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    let session = PairingSession::new("192.168.1.50:5555", "123456");
    let err = orchestrator.pair(&mut registry, &session).await.unwrap_err();
    assert!(matches!(err, AdbError::PairingFailed { .. }));
    assert_eq!(
        registry.get("192.168.1.50:5555").unwrap().link,
        LinkState::Unpaired
    );
}

#[tokio::test]
async fn pair_timeout_is_a_pairing_failure() {
    let adb = FakeAdb::new();
    adb.push(Err(AdbError::CommandTimeout {
        command: "pair 192.168.1.50:5555 123456".to_string(),
        duration: Duration::from_secs(60),
    }));
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    let session = PairingSession::new("192.168.1.50:5555", "123456");
    let err = orchestrator.pair(&mut registry, &session).await.unwrap_err();
    assert!(matches!(err, AdbError::PairingFailed { .. }));
    assert_eq!(
        registry.get("192.168.1.50:5555").unwrap().link,
        LinkState::Unpaired
    );
}

#[tokio::test]
async fn connect_success_marks_connected_and_online() {
    let adb = FakeAdb::new();
    adb.push_ok("connected to 192.168.1.50:5555");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    orchestrator
        .connect(&mut registry, "192.168.1.50:5555")
        .await
        .unwrap();

    let record = registry.get("192.168.1.50:5555").unwrap();
    assert_eq!(record.link, LinkState::Connected);
    assert_eq!(record.state, DeviceState::Online);
}

#[tokio::test]
async fn connect_rejection_with_zero_exit_is_refused() {
    // Some adb versions print the failure on stdout and still exit 0.
    let adb = FakeAdb::new();
    adb.push_ok("failed to connect to '192.168.1.50:5555': Connection refused");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    let err = orchestrator
        .connect(&mut registry, "192.168.1.50:5555")
        .await
        .unwrap_err();
    assert!(matches!(err, AdbError::ConnectRefused { .. }));
    assert_eq!(
        registry.get("192.168.1.50:5555").unwrap().link,
        LinkState::Disconnected
    );
}

#[tokio::test]
async fn connect_timeout_maps_to_connect_timeout() {
    let adb = FakeAdb::new();
    adb.push(Err(AdbError::CommandTimeout {
        command: "connect 192.168.1.50:5555".to_string(),
        duration: Duration::from_secs(30),
    }));
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    let err = orchestrator
        .connect(&mut registry, "192.168.1.50:5555")
        .await
        .unwrap_err();
    assert!(matches!(err, AdbError::ConnectTimeout { .. }));
    assert_eq!(err.exit_code(), 124);
}

#[tokio::test]
async fn quick_reconnect_requires_a_known_identifier() {
    let adb = FakeAdb::new();
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    let err = orchestrator
        .quick_reconnect(&mut registry, "192.168.1.50:5555")
        .await
        .unwrap_err();
    assert!(matches!(err, AdbError::UnknownDevice { .. }));
    assert!(adb.calls().is_empty(), "no adb call for an unknown device");
}

#[tokio::test]
async fn quick_reconnect_connects_a_paired_identifier() {
    let adb = FakeAdb::new();
    adb.push_ok("Successfully paired to 192.168.1.50:5555");
    adb.push_ok("connected to 192.168.1.50:5555");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    let session = PairingSession::new("192.168.1.50:5555", "123456");
    orchestrator.pair(&mut registry, &session).await.unwrap();
    orchestrator
        .quick_reconnect(&mut registry, "192.168.1.50:5555")
        .await
        .unwrap();
    assert_eq!(
        registry.get("192.168.1.50:5555").unwrap().link,
        LinkState::Connected
    );
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let adb = FakeAdb::new();
    adb.push_ok("connected to 192.168.1.50:5555");
    adb.push_ok("disconnected 192.168.1.50:5555");
    adb.push_fail("error: no such device '192.168.1.50:5555'");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    orchestrator
        .connect(&mut registry, "192.168.1.50:5555")
        .await
        .unwrap();
    orchestrator
        .disconnect(&mut registry, "192.168.1.50:5555")
        .await
        .unwrap();
    assert_eq!(
        registry.get("192.168.1.50:5555").unwrap().link,
        LinkState::Disconnected
    );

    // Second disconnect: the tool complains, we still report success.
    orchestrator
        .disconnect(&mut registry, "192.168.1.50:5555")
        .await
        .unwrap();
    assert_eq!(
        registry.get("192.168.1.50:5555").unwrap().link,
        LinkState::Disconnected
    );
}

#[tokio::test]
async fn restart_server_combines_both_steps() {
    let adb = FakeAdb::new();
    adb.push_ok("");
    adb.push_ok("* daemon started successfully");
    let orchestrator = ConnectionOrchestrator::new(&adb);

    let output = orchestrator.restart_server().await.unwrap();
    assert!(output.contains("daemon started"));
    assert_eq!(adb.calls().len(), 2);
}

#[tokio::test]
async fn probe_surfaces_unavailable_tool() {
    let adb = FakeAdb::new();
    adb.push(Err(AdbError::ProbeUnavailable {
        hint: "'adb' not found".to_string(),
    }));
    let probe = DeviceStatusProbe::new(&adb);

    let err = probe.list_devices().await.unwrap_err();
    assert!(matches!(err, AdbError::ProbeUnavailable { .. }));
    assert_eq!(err.exit_code(), 127);
}

fn online(identifier: &str) -> ProbedDevice {
    ProbedDevice {
        identifier: identifier.to_string(),
        state: DeviceState::Online,
        product: None,
        model: None,
        transport_id: None,
    }
}

#[tokio::test]
async fn device_override_wins_without_touching_active_selection() {
    let adb = FakeAdb::new();
    let probe = DeviceStatusProbe::new(&adb);
    let mut registry = DeviceRegistry::new();
    registry.refresh(vec![online("a1")]);
    registry.set_active("a1").unwrap();

    let target = resolve_target(
        None,
        &Some("192.168.1.60:5555".to_string()),
        &probe,
        &mut registry,
    )
    .await
    .unwrap();
    assert_eq!(target, "192.168.1.60:5555");
    // One-invocation override: the persisted selection stays put and no
    // probe runs.
    assert_eq!(registry.active(), Some("a1"));
    assert!(adb.calls().is_empty());
}

#[tokio::test]
async fn explicit_identifier_beats_the_override() {
    let adb = FakeAdb::new();
    let probe = DeviceStatusProbe::new(&adb);
    let mut registry = DeviceRegistry::new();

    let target = resolve_target(
        Some("c3".to_string()),
        &Some("b2".to_string()),
        &probe,
        &mut registry,
    )
    .await
    .unwrap();
    assert_eq!(target, "c3");
    assert!(adb.calls().is_empty());
}

#[tokio::test]
async fn target_falls_back_to_fresh_auto_detection() {
    let adb = FakeAdb::new();
    adb.push_ok("List of devices attached\naserial device transport_id:1\n");
    let probe = DeviceStatusProbe::new(&adb);
    let mut registry = DeviceRegistry::new();

    let target = resolve_target(None, &None, &probe, &mut registry)
        .await
        .unwrap();
    assert_eq!(target, "aserial");
    assert_eq!(adb.calls().len(), 1);
}

#[tokio::test]
async fn stale_persisted_online_state_does_not_drive_auto_detection() {
    let adb = FakeAdb::new();
    adb.push_ok("List of devices attached\n");
    let probe = DeviceStatusProbe::new(&adb);
    // Persisted as online in a previous run, but nothing is attached now.
    let mut stale = DeviceRecord::new("a1");
    stale.state = DeviceState::Online;
    let mut registry = DeviceRegistry::from_parts(vec![stale], None);

    let err = resolve_target(None, &None, &probe, &mut registry)
        .await
        .unwrap_err();
    assert!(matches!(err, AdbError::NoDeviceSelected { online: 0 }));
}

#[tokio::test]
async fn connect_wifi_switches_usb_device_to_wireless() {
    let adb = FakeAdb::new();
    adb.push_ok("8.8.8.8 via 192.168.1.1 dev wlan0 table 1021 src 192.168.1.23 uid 2000");
    adb.push_ok("restarting in TCP mode port: 5555");
    adb.push_ok("connected to 192.168.1.23:5555");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    orchestrator
        .connect_wifi(&mut registry, "aserial", DEFAULT_TCPIP_PORT)
        .await
        .unwrap();
    assert_eq!(
        registry.get("192.168.1.23:5555").unwrap().link,
        LinkState::Connected
    );
    let calls = adb.calls();
    assert_eq!(calls.len(), 3);
    // Route lookup and tcpip both target the USB serial explicitly.
    assert_eq!(calls[0][0], "-s");
    assert_eq!(calls[0][1], "aserial");
    assert_eq!(calls[1][2], "tcpip");
    assert_eq!(calls[1][3], "5555");
    assert_eq!(calls[2], vec!["connect", "192.168.1.23:5555"]);
}

#[tokio::test]
async fn connect_wifi_falls_back_to_wlan0_address() {
    let adb = FakeAdb::new();
    // Default route goes over mobile data, so the route lookup yields nothing.
    adb.push_ok("8.8.8.8 via 10.12.0.1 dev rmnet0 table 1020 src 10.12.7.3 uid 2000");
    adb.push_ok("12: wlan0    inet 192.168.1.40/24 brd 192.168.1.255 scope global wlan0");
    adb.push_ok("restarting in TCP mode port: 5555");
    adb.push_ok("connected to 192.168.1.40:5555");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    orchestrator
        .connect_wifi(&mut registry, "aserial", DEFAULT_TCPIP_PORT)
        .await
        .unwrap();
    assert!(registry.contains("192.168.1.40:5555"));
}

#[tokio::test]
async fn connect_wifi_without_a_wifi_ip_fails_before_tcpip() {
    let adb = FakeAdb::new();
    adb.push_ok("8.8.8.8 via 10.12.0.1 dev rmnet0 src 10.12.7.3");
    adb.push_ok("12: wlan0    state DOWN");
    let orchestrator = ConnectionOrchestrator::new(&adb);
    let mut registry = DeviceRegistry::new();

    let err = orchestrator
        .connect_wifi(&mut registry, "aserial", DEFAULT_TCPIP_PORT)
        .await
        .unwrap_err();
    assert!(matches!(err, AdbError::CommandFailed { .. }));
    assert_eq!(adb.calls().len(), 2, "no tcpip or connect attempt");
}

#[tokio::test]
async fn probe_then_refresh_tracks_multi_device_scenario() {
    let adb = FakeAdb::new();
    adb.push_ok(
        "List of devices attached\n\
         aserial device product:PhoneA model:Alpha transport_id:1\n\
         bserial offline\n",
    );
    adb.push_ok(
        "List of devices attached\n\
         aserial device product:PhoneA model:Alpha transport_id:1\n\
         bserial offline\n\
         192.168.1.60:5555 device model:Gamma transport_id:4\n",
    );
    let probe = DeviceStatusProbe::new(&adb);
    let mut registry = DeviceRegistry::new();

    registry.refresh(probe.list_devices().await.unwrap());
    assert_eq!(registry.get("aserial").unwrap().state, DeviceState::Online);
    assert_eq!(registry.get("bserial").unwrap().state, DeviceState::Offline);
    assert_eq!(registry.resolve_active().unwrap(), "aserial");

    // A second online device makes auto-detection ambiguous.
    registry.refresh(probe.list_devices().await.unwrap());
    assert!(matches!(
        registry.resolve_active(),
        Err(AdbError::NoDeviceSelected { online: 2 })
    ));
    registry.set_active("192.168.1.60:5555").unwrap();
    assert_eq!(registry.resolve_active().unwrap(), "192.168.1.60:5555");
}
