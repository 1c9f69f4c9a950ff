//! Launches the external `bridge` executable and captures its stdout.
//!
//! The invoker never fails towards its caller: a missing executable or any
//! spawn/read problem comes back as a JSON document of the same shape the
//! bridge uses for its own errors, so the renderer only ever sees one format.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::thread;
use std::time::Instant;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::request::CalculationRequest;

pub const BRIDGE_STEM: &str = "bridge";

/// Anything that can turn a request into raw response text.
pub trait CalculationBackend: Send + Sync {
    fn invoke(&self, request: &CalculationRequest) -> String;
}

#[derive(Clone, Debug)]
pub struct BridgeInvoker {
    path: PathBuf,
}

impl BridgeInvoker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `override_path` when it is set and non-blank, otherwise the
    /// sibling of the running executable.
    pub fn resolve(override_path: Option<&str>) -> Self {
        match override_path.map(str::trim).filter(|value| !value.is_empty()) {
            Some(path) => Self::new(path),
            None => Self::beside_current_exe(),
        }
    }

    pub fn beside_current_exe() -> Self {
        let base_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base_dir.join(bridge_file_name()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_available(&self) -> bool {
        self.path.is_file()
    }

    pub fn command(&self, request: &CalculationRequest) -> Command {
        let mut command = Command::new(&self.path);
        command
            .arg(&request.target_item)
            .arg(&request.target_quantity)
            .arg(request.inventory_json());
        command
    }

    /// Display-only rendering of the invocation; arguments are handed to the
    /// process directly, never through a shell.
    pub fn command_line(&self, request: &CalculationRequest) -> String {
        format!(
            "{} {} {} {}",
            quote_arg(&self.path.display().to_string()),
            quote_always(&request.target_item),
            request.target_quantity,
            quote_always(&request.inventory_json()),
        )
    }

    pub fn invoke(&self, request: &CalculationRequest) -> String {
        match self.run(request) {
            Ok(stdout) => stdout,
            Err(err) => {
                warn!(path = %self.path.display(), "bridge invocation failed: {}", err);
                error_response(&err.to_string())
            }
        }
    }

    fn run(&self, request: &CalculationRequest) -> Result<String, BridgeError> {
        if !self.is_available() {
            return Err(BridgeError::NotFound {
                path: self.path.clone(),
            });
        }
        let mut command = self.command(request);
        configure_child_process(&mut command);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        info!("starting bridge: {}", self.command_line(request));
        let started = Instant::now();
        let mut child = command.spawn().map_err(BridgeError::Spawn)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        spawn_reaper(child, stderr, started);

        let mut bytes = Vec::new();
        if let Some(mut stdout) = stdout {
            stdout.read_to_end(&mut bytes).map_err(BridgeError::Read)?;
        }
        debug!(
            stdout_bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bridge stdout closed"
        );
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl CalculationBackend for BridgeInvoker {
    fn invoke(&self, request: &CalculationRequest) -> String {
        BridgeInvoker::invoke(self, request)
    }
}

pub fn bridge_file_name() -> String {
    format!("{}{}", BRIDGE_STEM, std::env::consts::EXE_SUFFIX)
}

/// The payload handed back in place of bridge output when the bridge could
/// not be run.
pub fn error_response(message: &str) -> String {
    json!({ "success": false, "error": message }).to_string()
}

// stderr is drained so a chatty bridge cannot stall on a full pipe, but its
// content is only counted, never shown.
fn spawn_reaper(mut child: Child, stderr: Option<ChildStderr>, started: Instant) {
    let spawned = thread::Builder::new()
        .name("bridge-reaper".to_string())
        .spawn(move || {
            let mut captured = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut captured);
            }
            match child.wait() {
                Ok(status) => debug!(
                    exit_code = ?status.code(),
                    stderr_bytes = captured.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "bridge exited"
                ),
                Err(err) => warn!("bridge wait failed: {}", err),
            }
        });
    if let Err(err) = spawned {
        warn!("bridge reaper thread failed to start: {}", err);
    }
}

fn quote_arg(value: &str) -> String {
    if value.contains(' ') || value.contains('\t') {
        quote_always(value)
    } else {
        value.to_string()
    }
}

fn quote_always(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

#[cfg(windows)]
fn configure_child_process(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x08000000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_child_process(_command: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryRow;
    use serde_json::Value;

    fn sample_request() -> CalculationRequest {
        let rows = vec![InventoryRow::new("Wood", "3")];
        CalculationRequest::encode("Chair", "2", &rows)
    }

    fn error_field(text: &str) -> Option<String> {
        let value: Value = serde_json::from_str(text).expect("response must be JSON");
        value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    #[test]
    fn missing_bridge_yields_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = BridgeInvoker::new(dir.path().join(bridge_file_name()));
        assert!(!invoker.is_available());
        let response = invoker.invoke(&sample_request());
        let message = error_field(&response).expect("error must be set");
        assert!(message.contains("not found"), "{}", message);
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value.get("success"), Some(&Value::Bool(false)));
    }

    #[test]
    fn directory_is_not_a_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = BridgeInvoker::new(dir.path());
        assert!(!invoker.is_available());
        assert!(error_field(&invoker.invoke(&sample_request())).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn unlaunchable_bridge_yields_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(bridge_file_name());
        std::fs::write(&path, b"not an executable").unwrap();
        let invoker = BridgeInvoker::new(&path);
        assert!(invoker.is_available());
        let message = error_field(&invoker.invoke(&sample_request())).expect("error must be set");
        assert!(message.contains("failed to start"), "{}", message);
    }

    #[cfg(unix)]
    #[test]
    fn arguments_reach_the_process_verbatim() {
        let echo = Path::new("/bin/echo");
        if !echo.is_file() {
            return;
        }
        let invoker = BridgeInvoker::new(echo);
        let output = invoker.invoke(&sample_request());
        assert_eq!(output, "Chair 2 {\"Wood\":3.0}\n");
    }

    #[test]
    fn resolve_prefers_override() {
        let invoker = BridgeInvoker::resolve(Some(" /opt/calc/bridge "));
        assert_eq!(invoker.path(), Path::new("/opt/calc/bridge"));
        let fallback = BridgeInvoker::resolve(Some("   "));
        assert_eq!(
            fallback.path().file_name().and_then(|name| name.to_str()),
            Some(bridge_file_name().as_str())
        );
    }

    #[test]
    fn command_line_quotes_item_and_inventory() {
        let invoker = BridgeInvoker::new("bridge");
        let rows = vec![InventoryRow::new("Iron Ingot", "10")];
        let request = CalculationRequest::encode("Oak Chair", "2", &rows);
        assert_eq!(
            invoker.command_line(&request),
            r#"bridge "Oak Chair" 2 "{\"Iron Ingot\":10.0}""#
        );
    }

    #[test]
    fn error_response_escapes_message() {
        let text = error_response("bad \"quote\"");
        assert_eq!(error_field(&text).as_deref(), Some("bad \"quote\""));
    }
}
