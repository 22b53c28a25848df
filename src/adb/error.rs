use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for device-management operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for all device-management operations.
///
/// Every variant maps to a stable process exit code (see [`AdbError::exit_code`])
/// so that scripts wrapping the CLI can branch on the outcome.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error("'adb' could not be invoked: {hint}")]
    ProbeUnavailable { hint: String },

    #[error(
        "no device selected ({online} online): run --switch-device or pass --device-id to pick one"
    )]
    NoDeviceSelected { online: usize },

    #[error("unknown device '{identifier}': not present in the device registry")]
    UnknownDevice { identifier: String },

    #[error("pairing with {address} failed: {output}")]
    PairingFailed { address: String, output: String },

    #[error("connect to {identifier} timed out after {duration:?}")]
    ConnectTimeout {
        identifier: String,
        duration: Duration,
    },

    #[error("connect to {identifier} was refused: {output}")]
    ConnectRefused { identifier: String, output: String },

    #[error("adb {command} timed out after {duration:?}")]
    CommandTimeout { command: String, duration: Duration },

    #[error("adb {command} failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("config store error at {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path:?} is not valid JSON: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AdbError {
    /// Stable exit code for CLI consumers. Timeout (124) and missing-tool (127)
    /// follow the conventional shell codes.
    pub fn exit_code(&self) -> i32 {
        match self {
            AdbError::NoDeviceSelected { .. } => 2,
            AdbError::UnknownDevice { .. } => 3,
            AdbError::PairingFailed { .. } => 4,
            AdbError::ConnectRefused { .. } => 5,
            AdbError::ConnectTimeout { .. } | AdbError::CommandTimeout { .. } => 124,
            AdbError::ProbeUnavailable { .. } => 127,
            AdbError::CommandFailed { .. }
            | AdbError::Config { .. }
            | AdbError::ConfigParse { .. } => 1,
        }
    }
}
