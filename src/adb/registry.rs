use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::info;

use super::error::{AdbError, AdbResult};
use super::probe::DeviceStatusProbe;
use super::runner::AdbRunner;
use super::types::{DeviceRecord, DeviceState, LinkState, ProbedDevice};

/// The set of known devices plus the optional active selection.
///
/// At most one device is active at a time, and the active identifier always
/// references a record in the registry; forgetting that record resets the
/// selection back to auto-detection.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, DeviceRecord>,
    active: Option<String>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records. An active identifier without a
    /// matching record is dropped rather than trusted.
    pub fn from_parts(records: Vec<DeviceRecord>, active: Option<String>) -> Self {
        let devices: BTreeMap<String, DeviceRecord> = records
            .into_iter()
            .map(|record| (record.identifier.clone(), record))
            .collect();
        let active = active.filter(|id| devices.contains_key(id));
        DeviceRegistry { devices, active }
    }

    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.values()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&DeviceRecord> {
        self.devices.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.devices.contains_key(identifier)
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Merge live probe rows into the stored records.
    pub fn refresh(&mut self, probed: Vec<ProbedDevice>) {
        self.refresh_at(probed, Utc::now());
    }

    /// As [`refresh`](Self::refresh), with an injectable clock.
    ///
    /// `last_seen` is monotonic per identifier: a stale probe can never move
    /// a timestamp backwards. Known devices absent from the probe go
    /// offline, and an established link drops to disconnected.
    pub fn refresh_at(&mut self, probed: Vec<ProbedDevice>, now: DateTime<Utc>) {
        let mut seen: Vec<String> = Vec::with_capacity(probed.len());
        for row in probed {
            seen.push(row.identifier.clone());
            let record = self
                .devices
                .entry(row.identifier.clone())
                .or_insert_with(|| DeviceRecord::new(&row.identifier));
            record.state = row.state;
            if row.product.is_some() {
                record.product = row.product;
            }
            if row.model.is_some() {
                record.model = row.model;
            }
            record.transport_id = row.transport_id;
            record.last_seen = match record.last_seen {
                Some(previous) => Some(previous.max(now)),
                None => Some(now),
            };
            if row.state == DeviceState::Online {
                // A listed online device has an established adb transport.
                record.link = LinkState::Connected;
            } else if record.link == LinkState::Connected {
                record.link = LinkState::Disconnected;
            }
        }
        for (identifier, record) in self.devices.iter_mut() {
            if seen.iter().any(|s| s == identifier) {
                continue;
            }
            record.state = DeviceState::Offline;
            record.transport_id = None;
            if record.link == LinkState::Connected {
                info!("device {identifier} dropped out of the probe listing");
                record.link = LinkState::Disconnected;
            }
        }
    }

    /// Resolve the device subsequent commands target.
    ///
    /// An explicit selection wins regardless of its connection state.
    /// Otherwise auto-detection requires exactly one online device; zero or
    /// several is an error, never a guess.
    pub fn resolve_active(&self) -> AdbResult<String> {
        if let Some(id) = &self.active {
            return Ok(id.clone());
        }
        let online: Vec<&DeviceRecord> = self
            .devices
            .values()
            .filter(|r| r.state == DeviceState::Online)
            .collect();
        match online.as_slice() {
            [only] => Ok(only.identifier.clone()),
            _ => Err(AdbError::NoDeviceSelected {
                online: online.len(),
            }),
        }
    }

    pub fn set_active(&mut self, identifier: &str) -> AdbResult<()> {
        if !self.devices.contains_key(identifier) {
            return Err(AdbError::UnknownDevice {
                identifier: identifier.to_string(),
            });
        }
        info!("active device set to {identifier}");
        self.active = Some(identifier.to_string());
        Ok(())
    }

    /// Remove a record. Clears the active selection if it pointed there.
    pub fn forget(&mut self, identifier: &str) -> AdbResult<()> {
        if self.devices.remove(identifier).is_none() {
            return Err(AdbError::UnknownDevice {
                identifier: identifier.to_string(),
            });
        }
        if self.active.as_deref() == Some(identifier) {
            self.active = None;
        }
        Ok(())
    }

    /// Get-or-create a record and set its link state. Used by the
    /// orchestrator to drive the per-device state machine.
    pub fn set_link(&mut self, identifier: &str, link: LinkState) -> &mut DeviceRecord {
        let record = self
            .devices
            .entry(identifier.to_string())
            .or_insert_with(|| DeviceRecord::new(identifier));
        record.link = link;
        record
    }
}

/// Target resolution for operations that accept an optional identifier:
/// explicit argument first, then a per-invocation override, then the
/// active-device policy against a fresh probe. Neither the explicit
/// argument nor the override touches the persisted active selection.
pub async fn resolve_target<R: AdbRunner>(
    explicit: Option<String>,
    device_override: &Option<String>,
    probe: &DeviceStatusProbe<R>,
    registry: &mut DeviceRegistry,
) -> AdbResult<String> {
    if let Some(id) = explicit {
        return Ok(id);
    }
    if let Some(id) = device_override {
        return Ok(id.clone());
    }
    registry.refresh(probe.list_devices().await?);
    registry.resolve_active()
}
