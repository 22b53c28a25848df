use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::adb::{AdbError, AdbResult, DeviceRecord, DeviceRegistry};

/// On-disk state: the last-known active device plus the known device
/// records, so paired identifiers survive restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub active_device: Option<String>,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

/// Key-value config file with durable writes (temp file + rename in the
/// same directory). A missing file yields defaults; a corrupt one is an
/// explicit error rather than a silent reset.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        ConfigStore { path }
    }

    /// `$ADB_DEVCTL_CONFIG` wins; otherwise the per-user config directory.
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os("ADB_DEVCTL_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("adb-devctl")
            .join("config.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AdbResult<Config> {
        if !self.path.exists() {
            debug!("no config at {:?}, starting empty", self.path);
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|source| AdbError::Config {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AdbError::ConfigParse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, config: &Config) -> AdbResult<()> {
        let io_err = |source| AdbError::Config {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = serde_json::to_string_pretty(config).map_err(|source| AdbError::ConfigParse {
            path: self.path.clone(),
            source,
        })?;
        // Rename within the same directory keeps the write atomic.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!("config written to {:?}", self.path);
        Ok(())
    }

    pub fn load_registry(&self) -> AdbResult<DeviceRegistry> {
        let config = self.load()?;
        Ok(DeviceRegistry::from_parts(
            config.devices,
            config.active_device,
        ))
    }

    pub fn save_registry(&self, registry: &DeviceRegistry) -> AdbResult<()> {
        self.save(&Config {
            active_device: registry.active().map(str::to_string),
            devices: registry.records().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adb::{DeviceState, LinkState, ProbedDevice};

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("config.json"))
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = store_in(&dir).load().unwrap();
        assert!(config.active_device.is_none());
        assert!(config.devices.is_empty());
    }

    #[test]
    fn registry_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut registry = DeviceRegistry::new();
        registry.refresh(vec![ProbedDevice {
            identifier: "192.168.1.50:5555".to_string(),
            state: DeviceState::Online,
            product: None,
            model: Some("Alpha".to_string()),
            transport_id: Some("2".to_string()),
        }]);
        registry.set_active("192.168.1.50:5555").unwrap();
        store.save_registry(&registry).unwrap();

        let restored = store.load_registry().unwrap();
        assert_eq!(restored.active(), Some("192.168.1.50:5555"));
        let record = restored.get("192.168.1.50:5555").unwrap();
        assert_eq!(record.link, LinkState::Connected);
        assert_eq!(record.model.as_deref(), Some("Alpha"));
        assert_eq!(
            record.last_seen,
            registry.get("192.168.1.50:5555").unwrap().last_seen
        );
    }

    #[test]
    fn corrupt_file_is_an_explicit_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(
            store.load(),
            Err(AdbError::ConfigParse { .. })
        ));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("deep").join("config.json"));
        store.save(&Config::default()).unwrap();
        assert!(store.path().exists());
    }
}
