// Core device-management types shared between probe, registry and orchestrator.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection state as reported by `adb devices -l`.
///
/// Tokens the external tool emits that we do not recognize map to `Unknown`
/// instead of failing the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    Online,
    Offline,
    Unauthorized,
    Unknown,
}

impl DeviceState {
    pub fn from_token(token: &str) -> Self {
        match token {
            "device" => DeviceState::Online,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            _ => DeviceState::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceState::Online => "online",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Unknown => "unknown",
        }
    }
}

/// Lifecycle of the wireless-debugging link for one identifier.
///
/// `Unpaired → Pairing → Paired → Connecting → Connected`, dropping back to
/// `Disconnected` on explicit disconnect or a probe-detected drop, and to
/// `Unpaired` when pairing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Unpaired,
    Pairing,
    Paired,
    Connecting,
    Connected,
    Disconnected,
}

impl LinkState {
    pub fn label(&self) -> &'static str {
        match self {
            LinkState::Unpaired => "unpaired",
            LinkState::Pairing => "pairing",
            LinkState::Paired => "paired",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Disconnected => "disconnected",
        }
    }
}

/// One row of `adb devices -l` output: identifier, state token and the
/// key:value annotations the tool appends (product, model, transport_id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedDevice {
    pub identifier: String,
    pub state: DeviceState,
    pub product: Option<String>,
    pub model: Option<String>,
    pub transport_id: Option<String>,
}

/// A known device tracked across invocations. Identifiers are either
/// `ip:port` (wireless) or a hardware serial (wired); equality is exact
/// string match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub identifier: String,
    pub state: DeviceState,
    pub link: LinkState,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub transport_id: Option<String>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    pub fn new(identifier: &str) -> Self {
        DeviceRecord {
            identifier: identifier.to_string(),
            state: DeviceState::Unknown,
            link: LinkState::Unpaired,
            product: None,
            model: None,
            transport_id: None,
            last_seen: None,
        }
    }
}

/// Ephemeral pairing-wizard state: the user-entered endpoint plus the
/// six-digit code shown on the phone. Never persisted.
#[derive(Debug, Clone)]
pub struct PairingSession {
    pub address: String,
    pub code: String,
}

impl PairingSession {
    pub fn new(address: &str, code: &str) -> Self {
        PairingSession {
            address: address.trim().to_string(),
            code: code.trim().to_string(),
        }
    }
}
