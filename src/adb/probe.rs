use std::time::Duration;

use super::error::{AdbError, AdbResult};
use super::runner::AdbRunner;
use super::types::{DeviceState, ProbedDevice};

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(20);

/// Lists currently visible devices by running `adb devices -l`.
///
/// This is the only module that understands the external tool's tabular
/// output; everything above it works with [`ProbedDevice`] rows.
pub struct DeviceStatusProbe<R: AdbRunner> {
    runner: R,
}

impl<R: AdbRunner> DeviceStatusProbe<R> {
    pub fn new(runner: R) -> Self {
        DeviceStatusProbe { runner }
    }

    /// Re-running re-probes live state; nothing is cached across calls.
    pub async fn list_devices(&self) -> AdbResult<Vec<ProbedDevice>> {
        let output = self.runner.run(&["devices", "-l"], PROBE_TIMEOUT).await?;
        if !output.success {
            return Err(AdbError::ProbeUnavailable {
                hint: output.combined(),
            });
        }
        Ok(parse_devices(&output.stdout))
    }
}

/// Parse `adb devices -l` output. One malformed line never invalidates the
/// rest: header, daemon banner and short lines are skipped, unrecognized
/// state tokens become `Unknown`.
pub fn parse_devices(output: &str) -> Vec<ProbedDevice> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let identifier = parts.next()?.to_string();
            let state = DeviceState::from_token(parts.next()?);
            let mut product = None;
            let mut model = None;
            let mut transport_id = None;
            for annotation in parts {
                if let Some((key, value)) = annotation.split_once(':') {
                    match key {
                        "product" => product = Some(value.to_string()),
                        "model" => model = Some(value.to_string()),
                        "transport_id" => transport_id = Some(value.to_string()),
                        _ => {}
                    }
                }
            }
            Some(ProbedDevice {
                identifier,
                state,
                product,
                model,
                transport_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_devices_multiple_with_annotations() {
        let adb_output = "List of devices attached\n1d36d8f1               device usb:1-4 product:OnePlus6 model:ONEPLUS_A6000 device:OnePlus6 transport_id:2\n192.168.1.50:5555      device product:OnePlus6 model:ONEPLUS_A6000 device:OnePlus6 transport_id:3\n";
        let devices = parse_devices(adb_output);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].identifier, "1d36d8f1");
        assert_eq!(devices[0].state, DeviceState::Online);
        assert_eq!(devices[0].model.as_deref(), Some("ONEPLUS_A6000"));
        assert_eq!(devices[0].transport_id.as_deref(), Some("2"));
        assert_eq!(devices[1].identifier, "192.168.1.50:5555");
        assert_eq!(devices[1].product.as_deref(), Some("OnePlus6"));
    }

    #[test]
    fn parse_devices_maps_state_tokens() {
        let adb_output = "List of devices attached\na1 device\nb2 offline\nc3 unauthorized\nd4 sideload\n";
        let devices = parse_devices(adb_output);
        let states: Vec<DeviceState> = devices.iter().map(|d| d.state).collect();
        assert_eq!(
            states,
            vec![
                DeviceState::Online,
                DeviceState::Offline,
                DeviceState::Unauthorized,
                DeviceState::Unknown,
            ]
        );
    }

    #[test]
    fn parse_devices_skips_daemon_banner_and_garbage() {
        let adb_output = "* daemon not running; starting now at tcp:5037\n* daemon started successfully\nList of devices attached\nlonely-token\n1d36d8f1 device transport_id:5\n";
        let devices = parse_devices(adb_output);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].identifier, "1d36d8f1");
        assert_eq!(devices[0].transport_id.as_deref(), Some("5"));
    }

    #[test]
    fn parse_devices_empty_listing() {
        assert!(parse_devices("List of devices attached\n").is_empty());
        assert!(parse_devices("").is_empty());
    }
}
