pub mod adb;
pub mod args;
pub mod config;
pub mod menu;

pub use adb::{ConnectionOrchestrator, DeviceRegistry, DeviceStatusProbe, SystemAdb};
pub use config::ConfigStore;
