//! Spawn the composed command and wait for it to finish (spec §4.5/§4.6
//! "launch and wait" step).

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use ezmap_core::error::{EzmapError, Result};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Resolve `binary` on `PATH`, erroring with [`EzmapError::ExecutableNotFound`]
/// if it can't be found (spec §4.6 step 1).
pub fn resolve_binary(binary: &str) -> Result<()> {
    which::which(binary)
        .map(|_| ())
        .map_err(|_| EzmapError::ExecutableNotFound { name: binary.to_string() })
}

/// Run `command` under `sh -c`, block until it exits, then poll for
/// `result_path` to appear (up to `timeout` seconds if set). A timeout is
/// logged, not returned as an error: the caller's subsequent
/// `read_result_file` surfaces a `LoadFailure` if the file never appears,
/// which is the one error that should actually be fatal here.
pub fn launch_and_wait(command: &str, result_path: &Path, timeout: Option<u64>) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .map_err(|e| EzmapError::Io { path: command.to_string(), source: e })?;

    if !status.success() {
        return Err(EzmapError::LaunchFailed { status: status.code().unwrap_or(-1) });
    }

    if result_path.exists() {
        return Ok(());
    }

    let deadline = timeout.map(|seconds| Instant::now() + Duration::from_secs(seconds));
    loop {
        if result_path.exists() {
            return Ok(());
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                tracing::warn!(
                    path = %result_path.display(),
                    "result file had not appeared after timeout; continuing to wait for readback"
                );
                return Ok(());
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
