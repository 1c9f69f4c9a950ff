//! Headless half of the calculator window: owns the form state, the output
//! panes and the calculation slot. The GUI only draws it and forwards clicks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::bridge::CalculationBackend;
use crate::error::{ResponseError, SlotError};
use crate::inventory::{InventoryStore, RowId};
use crate::request::CalculationRequest;
use crate::response;
use crate::slot::{CalculationSlot, Completion};

pub const WORKING_PLACEHOLDER: &str = "Calculating, please wait...";
pub const ERROR_DIALOG_TITLE: &str = "Error";
pub const FAILURE_DIALOG_TITLE: &str = "Execution failed";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputPanes {
    pub tree: String,
    pub base_materials: String,
    pub level_tasks: String,
}

/// A blocking message the user has to acknowledge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialog {
    pub title: String,
    pub message: String,
}

impl Dialog {
    /// An error reported by the bridge itself; the text is shown as-is.
    pub fn application(message: impl Into<String>) -> Self {
        Self {
            title: ERROR_DIALOG_TITLE.to_string(),
            message: message.into(),
        }
    }

    pub fn failure(detail: impl std::fmt::Display) -> Self {
        Self {
            title: FAILURE_DIALOG_TITLE.to_string(),
            message: format!("Execution failed: {}", detail),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CalculationStatus {
    Idle,
    Running { started: Instant },
    Succeeded { elapsed: Duration },
    Failed { elapsed: Duration, message: String },
}

pub struct CalculatorSession {
    pub target_item: String,
    pub target_quantity: String,
    inventory: InventoryStore,
    panes: OutputPanes,
    dialog: Option<Dialog>,
    status: CalculationStatus,
    slot: CalculationSlot,
    tree_before_dispatch: Option<String>,
}

impl CalculatorSession {
    pub fn new(target_item: impl Into<String>, target_quantity: impl Into<String>) -> Self {
        Self {
            target_item: target_item.into(),
            target_quantity: target_quantity.into(),
            inventory: InventoryStore::new(),
            panes: OutputPanes::default(),
            dialog: None,
            status: CalculationStatus::Idle,
            slot: CalculationSlot::new(),
            tree_before_dispatch: None,
        }
    }

    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut InventoryStore {
        &mut self.inventory
    }

    pub fn add_row(&mut self, name: impl Into<String>, quantity: impl Into<String>) -> RowId {
        self.inventory.add_row(name, quantity)
    }

    pub fn remove_row(&mut self, id: RowId) {
        self.inventory.remove_row(id);
    }

    pub fn panes(&self) -> &OutputPanes {
        &self.panes
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn dismiss_dialog(&mut self) {
        self.dialog = None;
    }

    pub fn status(&self) -> &CalculationStatus {
        &self.status
    }

    pub fn can_calculate(&self) -> bool {
        !self.slot.is_busy()
    }

    pub fn current_request(&self) -> CalculationRequest {
        CalculationRequest::encode(
            &self.target_item,
            &self.target_quantity,
            self.inventory.rows(),
        )
    }

    /// Encodes the form and hands it to a background worker. The result is
    /// picked up by [`CalculatorSession::poll`].
    pub fn calculate(&mut self, backend: Arc<dyn CalculationBackend>) -> Result<(), SlotError> {
        if self.slot.is_busy() {
            return Err(SlotError::Busy);
        }
        let request = self.current_request();
        info!(
            target_item = %request.target_item,
            target_quantity = %request.target_quantity,
            inventory_entries = request.inventory.len(),
            "dispatching calculation"
        );
        let previous_tree =
            std::mem::replace(&mut self.panes.tree, WORKING_PLACEHOLDER.to_string());
        self.tree_before_dispatch = Some(previous_tree);
        let started = Instant::now();
        match self.slot.start(request, backend) {
            Ok(()) => {
                self.status = CalculationStatus::Running { started };
                Ok(())
            }
            Err(err) => {
                error!("calculation dispatch failed: {}", err);
                self.fail(started.elapsed(), Dialog::failure(&err));
                Err(err)
            }
        }
    }

    /// Applies a finished calculation, if any. Returns `true` when one was
    /// handled. The trigger is open again once this returns.
    pub fn poll(&mut self) -> bool {
        match self.slot.poll() {
            None => false,
            Some(Ok(completion)) => {
                self.apply(completion);
                true
            }
            Some(Err(err)) => {
                let elapsed = self.running_elapsed();
                self.fail(elapsed, Dialog::failure(&err));
                true
            }
        }
    }

    /// Blocking variant of [`CalculatorSession::poll`] for callers without a
    /// frame loop.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.slot.wait(timeout) {
            None => false,
            Some(Ok(completion)) => {
                self.apply(completion);
                true
            }
            Some(Err(err)) => {
                let elapsed = self.running_elapsed();
                self.fail(elapsed, Dialog::failure(&err));
                true
            }
        }
    }

    fn apply(&mut self, completion: Completion) {
        let elapsed = completion.elapsed;
        let request = &completion.request;
        match response::render(
            &completion.response,
            &request.target_item,
            &request.target_quantity,
        ) {
            Ok(rendered) => {
                info!(elapsed_ms = elapsed.as_millis() as u64, "calculation rendered");
                self.tree_before_dispatch = None;
                self.panes = OutputPanes {
                    tree: rendered.tree,
                    base_materials: rendered.base_materials,
                    level_tasks: rendered.level_tasks,
                };
                self.status = CalculationStatus::Succeeded { elapsed };
            }
            Err(ResponseError::Application(message)) => {
                warn!("bridge reported an error: {}", message);
                self.fail(elapsed, Dialog::application(message));
            }
            Err(err) => {
                error!("bridge response could not be rendered: {}", err);
                self.fail(elapsed, Dialog::failure(&err));
            }
        }
        drop(completion);
    }

    fn fail(&mut self, elapsed: Duration, dialog: Dialog) {
        if let Some(previous) = self.tree_before_dispatch.take() {
            self.panes.tree = previous;
        }
        self.status = CalculationStatus::Failed {
            elapsed,
            message: dialog.message.clone(),
        };
        self.dialog = Some(dialog);
    }

    fn running_elapsed(&self) -> Duration {
        match self.status {
            CalculationStatus::Running { started } => started.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        response: String,
        seen: Mutex<Vec<CalculationRequest>>,
    }

    impl Recording {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl CalculationBackend for Recording {
        fn invoke(&self, request: &CalculationRequest) -> String {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            self.response.clone()
        }
    }

    struct Panicking;

    impl CalculationBackend for Panicking {
        fn invoke(&self, _request: &CalculationRequest) -> String {
            panic!("bridge thread blew up");
        }
    }

    const CHAIR: &str = r#"{"error": null, "tree_view": "[L0] Chair", "base_materials": "Wood: 6.00",
        "level_stats": {"1": {"Wood": 3}, "2": {"Plank": 1.5}}}"#;

    fn wait(session: &mut CalculatorSession) {
        assert!(session.wait(Duration::from_secs(5)), "calculation did not finish");
    }

    #[test]
    fn successful_calculation_fills_panes() {
        let backend = Recording::new(CHAIR);
        let mut session = CalculatorSession::new("Chair", "2");
        session.add_row("Wood", "3");
        session.add_row("", "9");
        session.calculate(backend.clone()).unwrap();
        assert!(!session.can_calculate());
        wait(&mut session);
        assert!(session.can_calculate());
        assert!(session.dialog().is_none());
        assert_eq!(session.panes().tree, "[L0] Chair");
        assert_eq!(session.panes().base_materials, "Wood: 6.00");
        assert!(session.panes().level_tasks.contains("Plank: 1.50"));
        assert!(matches!(session.status(), CalculationStatus::Succeeded { .. }));
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].inventory.len(), 1);
    }

    #[test]
    fn placeholder_shows_while_running() {
        let backend = Recording::new(CHAIR);
        let mut session = CalculatorSession::new("Chair", "2");
        session.calculate(backend).unwrap();
        assert_eq!(session.panes().tree, WORKING_PLACEHOLDER);
        wait(&mut session);
        assert_ne!(session.panes().tree, WORKING_PLACEHOLDER);
    }

    #[test]
    fn application_error_leaves_panes_untouched() {
        let mut session = CalculatorSession::new("Chair", "2");
        session.calculate(Recording::new(CHAIR)).unwrap();
        wait(&mut session);
        let before = session.panes().clone();

        let failing = Recording::new(r#"{"success": false, "error": "unknown item: Chair"}"#);
        session.calculate(failing).unwrap();
        wait(&mut session);
        assert_eq!(session.panes(), &before);
        assert_eq!(
            session.dialog(),
            Some(&Dialog::application("unknown item: Chair"))
        );
        assert!(session.can_calculate());
    }

    #[test]
    fn malformed_response_raises_failure_dialog() {
        let mut session = CalculatorSession::new("Chair", "2");
        session.calculate(Recording::new("not json")).unwrap();
        wait(&mut session);
        let dialog = session.dialog().cloned().expect("dialog expected");
        assert_eq!(dialog.title, FAILURE_DIALOG_TITLE);
        assert!(dialog.message.starts_with("Execution failed: "));
        assert_eq!(session.panes().tree, "");
        assert!(session.can_calculate());
        session.dismiss_dialog();
        assert!(session.dialog().is_none());
    }

    #[test]
    fn panicking_backend_reenables_trigger() {
        let mut session = CalculatorSession::new("Chair", "2");
        session.calculate(Arc::new(Panicking)).unwrap();
        wait(&mut session);
        assert!(session.can_calculate());
        assert!(session.dialog().is_some());
        assert_ne!(session.panes().tree, WORKING_PLACEHOLDER);
    }

    #[test]
    fn second_calculation_is_rejected_while_in_flight() {
        let mut session = CalculatorSession::new("Chair", "2");
        session.calculate(Recording::new(CHAIR)).unwrap();
        let second = Recording::new(CHAIR);
        assert!(matches!(
            session.calculate(second.clone()),
            Err(SlotError::Busy)
        ));
        wait(&mut session);
        assert!(second.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn header_uses_values_captured_at_dispatch() {
        let mut session = CalculatorSession::new("Chair", "2");
        session.calculate(Recording::new(CHAIR)).unwrap();
        session.target_item = "Table".to_string();
        wait(&mut session);
        let first = session.panes().level_tasks.lines().next().unwrap_or_default();
        assert!(first.contains("Chair x 2"), "{}", first);
    }

    #[test]
    fn missing_bridge_surfaces_as_application_error() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = crate::BridgeInvoker::new(dir.path().join("bridge"));
        let mut session = CalculatorSession::new("Chair", "2");
        session.calculate(Arc::new(bridge)).unwrap();
        wait(&mut session);
        let dialog = session.dialog().cloned().expect("dialog expected");
        assert_eq!(dialog.title, ERROR_DIALOG_TITLE);
        assert!(dialog.message.contains("not found"));
    }
}
