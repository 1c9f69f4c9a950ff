use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures inside the bridge invoker. These never leave
/// [`crate::BridgeInvoker::invoke`]; they are folded into a JSON error payload.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("core calculation component not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to start calculation component: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to read calculation component output: {0}")]
    Read(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum ResponseError {
    /// The bridge reported a failure through the `error` field.
    #[error("{0}")]
    Application(String),
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("a calculation is already running")]
    Busy,
    #[error("failed to start calculation worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("calculation worker stopped without a result")]
    WorkerLost,
}
