//! Error taxonomy (spec §7), realized as one `thiserror` enum so every
//! fallible operation in this crate and in `ezmap-launch` returns the same
//! type. Binaries convert to `anyhow::Result` at their outer boundary, the
//! way the teacher's `tools` binaries wrap `tools::runner` errors with
//! `anyhow::Context`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EzmapError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("executable `{name}` not found on PATH")]
    ExecutableNotFound { name: String },

    #[error("launch failed: child process exited with status {status}")]
    LaunchFailed { status: i32 },

    #[error("timed out after {seconds}s waiting for result file `{path}`")]
    TimeoutExceeded { seconds: u64, path: String },

    #[error("could not load result file `{path}`: {reason}")]
    LoadFailure { path: String, reason: String },

    #[error("no workers available: P=1 and onall=false")]
    NoWorkersAvailable,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("transport error")]
    Transport(#[from] ezmap_transport::TransportError),

    #[error("I/O error on `{path}`")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("failed to encode payload")]
    Encode(#[source] Box<bincode::ErrorKind>),

    #[error("failed to decode payload")]
    Decode(#[source] Box<bincode::ErrorKind>),

    #[error("unknown task `{key}`: not found in the task registry")]
    UnknownTask { key: String },
}

pub type Result<T> = std::result::Result<T, EzmapError>;
