//! Inventory, request encoding, bridge invocation and response rendering for
//! the material calculator front-end.
#![forbid(unsafe_code)]

pub mod bridge;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod request;
pub mod response;
pub mod session;
pub mod slot;

pub use bridge::{BridgeInvoker, CalculationBackend};
pub use error::{BridgeError, ResponseError, SlotError};
pub use inventory::{InventoryRow, InventoryStore, RowId};
pub use request::CalculationRequest;
pub use response::{CalculationResponse, LevelTasks, RenderedOutput};
pub use session::{CalculationStatus, CalculatorSession, Dialog, OutputPanes};
pub use slot::{CalculationSlot, Completion, GateGuard, TriggerGate};
