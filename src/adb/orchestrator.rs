use std::time::Duration;

use chrono::Utc;
use log::{info, warn};

use super::error::{AdbError, AdbResult};
use super::registry::DeviceRegistry;
use super::runner::AdbRunner;
use super::types::{DeviceState, LinkState, PairingSession};

pub const PAIR_TIMEOUT: Duration = Duration::from_secs(60);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const SERVER_TIMEOUT: Duration = Duration::from_secs(10);
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(8);
pub const TCPIP_TIMEOUT: Duration = Duration::from_secs(10);
pub const WIFI_IP_TIMEOUT: Duration = Duration::from_secs(6);

/// Standard wireless-debugging listen port enabled by `adb tcpip`.
pub const DEFAULT_TCPIP_PORT: u16 = 5555;

/// Drives pairing, connect, disconnect and reconnect against the external
/// tool, advancing the per-device link state machine in the registry.
///
/// Every operation is a single bounded attempt; retrying is caller policy,
/// so persistent failures are never masked as transient ones.
pub struct ConnectionOrchestrator<R: AdbRunner> {
    runner: R,
}

impl<R: AdbRunner> ConnectionOrchestrator<R> {
    pub fn new(runner: R) -> Self {
        ConnectionOrchestrator { runner }
    }

    /// First-time wireless authorization: `adb pair HOST:PORT CODE`.
    ///
    /// On success the identifier enters the registry as `Paired`. Wrong
    /// code, timeout and unreachable host all surface as `PairingFailed`,
    /// and the registry entry reverts to `Unpaired`.
    pub async fn pair(
        &self,
        registry: &mut DeviceRegistry,
        session: &PairingSession,
    ) -> AdbResult<String> {
        let address = session.address.as_str();
        registry.set_link(address, LinkState::Pairing);
        let output = match self
            .runner
            .run(&["pair", address, session.code.as_str()], PAIR_TIMEOUT)
            .await
        {
            Ok(output) => output,
            Err(AdbError::CommandTimeout { duration, .. }) => {
                registry.set_link(address, LinkState::Unpaired);
                return Err(AdbError::PairingFailed {
                    address: address.to_string(),
                    output: format!("timed out after {duration:?}"),
                });
            }
            Err(e) => {
                registry.set_link(address, LinkState::Unpaired);
                return Err(e);
            }
        };
        let text = output.combined();
        if !output.success || text.contains("Failed") {
            registry.set_link(address, LinkState::Unpaired);
            return Err(AdbError::PairingFailed {
                address: address.to_string(),
                output: text,
            });
        }
        info!("paired with {address}");
        let record = registry.set_link(address, LinkState::Paired);
        record.last_seen = Some(Utc::now());
        Ok(text)
    }

    /// `adb connect ID`, single attempt with a fixed timeout.
    pub async fn connect(&self, registry: &mut DeviceRegistry, identifier: &str) -> AdbResult<String> {
        registry.set_link(identifier, LinkState::Connecting);
        let output = match self
            .runner
            .run(&["connect", identifier], CONNECT_TIMEOUT)
            .await
        {
            Ok(output) => output,
            Err(AdbError::CommandTimeout { duration, .. }) => {
                registry.set_link(identifier, LinkState::Disconnected);
                return Err(AdbError::ConnectTimeout {
                    identifier: identifier.to_string(),
                    duration,
                });
            }
            Err(e) => {
                registry.set_link(identifier, LinkState::Disconnected);
                return Err(e);
            }
        };
        let text = output.combined();
        // `adb connect` reports rejection on stdout with exit code 0 on some
        // versions, so the output is authoritative either way.
        if !output.success || connect_rejected(&text) {
            warn!("connect to {identifier} rejected: {text}");
            registry.set_link(identifier, LinkState::Disconnected);
            return Err(AdbError::ConnectRefused {
                identifier: identifier.to_string(),
                output: text,
            });
        }
        info!("connected to {identifier}");
        let record = registry.set_link(identifier, LinkState::Connected);
        record.state = DeviceState::Online;
        record.last_seen = Some(Utc::now());
        Ok(text)
    }

    /// Re-connect to a previously known identifier without re-pairing.
    pub async fn quick_reconnect(
        &self,
        registry: &mut DeviceRegistry,
        identifier: &str,
    ) -> AdbResult<String> {
        if !registry.contains(identifier) {
            return Err(AdbError::UnknownDevice {
                identifier: identifier.to_string(),
            });
        }
        self.connect(registry, identifier).await
    }

    /// `adb disconnect ID`. Idempotent: disconnecting a device that is not
    /// connected succeeds with no state change.
    pub async fn disconnect(
        &self,
        registry: &mut DeviceRegistry,
        identifier: &str,
    ) -> AdbResult<String> {
        let output = self
            .runner
            .run(&["disconnect", identifier], DISCONNECT_TIMEOUT)
            .await?;
        let text = output.combined();
        let already_gone =
            text.contains("no such device") || text.contains("not connected");
        if !output.success && !already_gone {
            return Err(AdbError::CommandFailed {
                command: format!("disconnect {identifier}"),
                output: text,
            });
        }
        if registry.contains(identifier) {
            registry.set_link(identifier, LinkState::Disconnected);
        }
        info!("disconnected {identifier}");
        Ok(text)
    }

    /// `adb kill-server` followed by `adb start-server`. Recovery hatch for
    /// a wedged daemon.
    pub async fn restart_server(&self) -> AdbResult<String> {
        let kill = self.runner.run(&["kill-server"], SERVER_TIMEOUT).await?;
        let start = self.runner.run(&["start-server"], SERVER_TIMEOUT).await?;
        if !kill.success || !start.success {
            return Err(AdbError::CommandFailed {
                command: "kill-server/start-server".to_string(),
                output: format!("{}\n{}", kill.combined(), start.combined())
                    .trim()
                    .to_string(),
            });
        }
        Ok(format!("{}\n{}", kill.combined(), start.combined())
            .trim()
            .to_string())
    }

    /// Move a USB-attached device onto Wi-Fi: read its wireless IP, enable
    /// TCP listening with `adb -s ID tcpip PORT`, then connect to `IP:PORT`.
    pub async fn connect_wifi(
        &self,
        registry: &mut DeviceRegistry,
        identifier: &str,
        port: u16,
    ) -> AdbResult<String> {
        let ip = self.wifi_ip(identifier).await?;
        let port_arg = port.to_string();
        let tcpip = self
            .runner
            .run(&["-s", identifier, "tcpip", &port_arg], TCPIP_TIMEOUT)
            .await?;
        if !tcpip.success {
            return Err(AdbError::CommandFailed {
                command: format!("-s {identifier} tcpip {port}"),
                output: tcpip.combined(),
            });
        }
        info!("{identifier} listening on tcp port {port}");
        let address = format!("{ip}:{port}");
        self.connect(registry, &address).await
    }

    /// The device's Wi-Fi IP, preferring the default-route source address
    /// and skipping mobile-data interfaces, with a `wlan0` fallback.
    pub async fn wifi_ip(&self, identifier: &str) -> AdbResult<String> {
        let route = self
            .runner
            .run(
                &["-s", identifier, "shell", "ip", "-4", "route", "get", "8.8.8.8"],
                WIFI_IP_TIMEOUT,
            )
            .await?;
        if route.success
            && let Some(ip) = parse_route_src(&route.stdout)
        {
            return Ok(ip);
        }
        let addr = self
            .runner
            .run(
                &["-s", identifier, "shell", "ip", "-4", "addr", "show", "wlan0"],
                WIFI_IP_TIMEOUT,
            )
            .await?;
        if addr.success
            && let Some(ip) = extract_ipv4(&addr.stdout)
        {
            return Ok(ip);
        }
        Err(AdbError::CommandFailed {
            command: format!("-s {identifier} shell ip route"),
            output: "could not determine the device's Wi-Fi IP".to_string(),
        })
    }

    /// `adb version`, used by the doctor check.
    pub async fn adb_version(&self) -> AdbResult<String> {
        let output = self.runner.run(&["version"], VERSION_TIMEOUT).await?;
        if !output.success {
            return Err(AdbError::ProbeUnavailable {
                hint: output.combined(),
            });
        }
        Ok(output.combined())
    }
}

/// Rejection phrasings observed across adb versions.
fn connect_rejected(text: &str) -> bool {
    text.contains("failed to connect")
        || text.contains("unable to connect")
        || text.contains("cannot connect")
        || text.contains("Connection refused")
}

/// Source address from `ip -4 route get 8.8.8.8` output. Mobile-data
/// interfaces (ccmni*, rmnet*) are not reachable from the host, so their
/// routes are skipped.
fn parse_route_src(text: &str) -> Option<String> {
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let after = |key: &str| {
            fields
                .iter()
                .position(|f| *f == key)
                .and_then(|i| fields.get(i + 1))
                .copied()
        };
        let Some(ip) = after("src") else {
            continue;
        };
        if ip == "0.0.0.0" {
            continue;
        }
        if let Some(iface) = after("dev")
            && (iface.starts_with("ccmni") || iface.starts_with("rmnet"))
        {
            continue;
        }
        return Some(ip.to_string());
    }
    None
}

/// First plausible IPv4 address in `ip -4 addr show` output, stripping the
/// prefix length from `inet A.B.C.D/NN` tokens.
fn extract_ipv4(text: &str) -> Option<String> {
    for token in text.split_whitespace() {
        let candidate = token.split('/').next().unwrap_or(token);
        if candidate == "0.0.0.0" {
            continue;
        }
        let octets: Vec<&str> = candidate.split('.').collect();
        if octets.len() == 4
            && octets
                .iter()
                .all(|o| !o.is_empty() && o.len() <= 3 && o.chars().all(|c| c.is_ascii_digit()))
        {
            return Some(candidate.to_string());
        }
    }
    None
}
