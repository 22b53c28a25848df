use std::time::Duration;

use log::debug;
use tokio::process::Command;

use super::error::{AdbError, AdbResult};

/// Captured output of one `adb` invocation.
#[derive(Debug, Clone)]
pub struct AdbOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl AdbOutput {
    /// stdout and stderr joined, trimmed. The tool is inconsistent about
    /// which stream diagnostics land on, so callers match against both.
    pub fn combined(&self) -> String {
        let mut text = String::new();
        for part in [&self.stdout, &self.stderr] {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(part);
        }
        text
    }
}

/// Seam over the external `adb` binary. Probe and orchestrator are generic
/// over this so tests never spawn a real process.
#[allow(async_fn_in_trait)]
pub trait AdbRunner {
    async fn run(&self, args: &[&str], timeout: Duration) -> AdbResult<AdbOutput>;
}

/// The real thing: spawns `adb` from PATH with a bounded wait.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAdb;

impl SystemAdb {
    fn not_found_hint() -> String {
        // Termux is the primary deployment target; its package name differs.
        if std::env::var_os("TERMUX_VERSION").is_some() {
            "'adb' not found. Run 'pkg install android-tools' in Termux and retry".to_string()
        } else {
            "'adb' not found in PATH. Install Android Platform Tools (https://developer.android.com/tools/adb)".to_string()
        }
    }
}

impl AdbRunner for SystemAdb {
    async fn run(&self, args: &[&str], timeout: Duration) -> AdbResult<AdbOutput> {
        debug!("running adb {} (timeout {timeout:?})", args.join(" "));
        let spawned = Command::new("adb").args(args).output();
        let output = match tokio::time::timeout(timeout, spawned).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AdbError::ProbeUnavailable {
                    hint: Self::not_found_hint(),
                });
            }
            Ok(Err(e)) => {
                return Err(AdbError::ProbeUnavailable {
                    hint: format!("failed to spawn adb: {e}"),
                });
            }
            Err(_) => {
                return Err(AdbError::CommandTimeout {
                    command: args.join(" "),
                    duration: timeout,
                });
            }
        };
        Ok(AdbOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
