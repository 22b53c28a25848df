// Device-management core: probing the external `adb` tool, the persistent
// device registry, and connection orchestration with bounded timeouts.

pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod runner;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{AdbError, AdbResult};
pub use orchestrator::ConnectionOrchestrator;
pub use probe::DeviceStatusProbe;
pub use registry::{DeviceRegistry, resolve_target};
pub use runner::{AdbOutput, AdbRunner, SystemAdb};
pub use types::{DeviceRecord, DeviceState, LinkState, PairingSession, ProbedDevice};
