//! Single-slot background calculation.
//!
//! [`TriggerGate`] is the mutual-exclusion gate behind the calculate button:
//! acquiring it yields a [`GateGuard`] that travels to the worker thread and
//! back inside the [`Completion`]. The gate reopens when the guard drops, which
//! covers normal completion, error responses and a panicking backend alike.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::bridge::CalculationBackend;
use crate::error::SlotError;
use crate::request::CalculationRequest;

#[derive(Clone, Debug, Default)]
pub struct TriggerGate {
    busy: Arc<AtomicBool>,
}

impl TriggerGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }

    pub fn acquire(&self) -> Result<GateGuard, SlotError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SlotError::Busy)?;
        Ok(GateGuard {
            busy: Arc::clone(&self.busy),
        })
    }
}

#[must_use = "the gate reopens as soon as the guard is dropped"]
#[derive(Debug)]
pub struct GateGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Result of one background calculation, delivered to the UI thread.
/// Holding it keeps the gate closed.
#[derive(Debug)]
pub struct Completion {
    pub request: CalculationRequest,
    pub response: String,
    pub elapsed: Duration,
    _guard: GateGuard,
}

#[derive(Debug, Default)]
pub struct CalculationSlot {
    gate: TriggerGate,
    pending: Option<Receiver<Completion>>,
}

impl CalculationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || !self.gate.is_open()
    }

    pub fn start(
        &mut self,
        request: CalculationRequest,
        backend: Arc<dyn CalculationBackend>,
    ) -> Result<(), SlotError> {
        if self.pending.is_some() {
            return Err(SlotError::Busy);
        }
        let guard = self.gate.acquire()?;
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("calculation-worker".to_string())
            .spawn(move || {
                // Declared before the guard so the gate is reopened before the
                // channel disconnects if the backend panics.
                let tx = tx;
                let guard = guard;
                let started = Instant::now();
                let response = backend.invoke(&request);
                let completion = Completion {
                    request,
                    response,
                    elapsed: started.elapsed(),
                    _guard: guard,
                };
                if tx.send(completion).is_err() {
                    debug!("calculation result dropped; slot was discarded");
                }
            })
            .map_err(SlotError::Spawn)?;
        self.pending = Some(rx);
        Ok(())
    }

    /// Non-blocking; returns `None` while idle or still running.
    pub fn poll(&mut self) -> Option<Result<Completion, SlotError>> {
        let rx = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(completion) => {
                self.pending = None;
                Some(Ok(completion))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("calculation worker ended without a result");
                self.pending = None;
                Some(Err(SlotError::WorkerLost))
            }
        }
    }

    pub fn wait(&mut self, timeout: Duration) -> Option<Result<Completion, SlotError>> {
        let rx = self.pending.as_ref()?;
        match rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.pending = None;
                Some(Ok(completion))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.pending = None;
                Some(Err(SlotError::WorkerLost))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryRow;
    use std::sync::Mutex;

    struct Fixed(&'static str);

    impl CalculationBackend for Fixed {
        fn invoke(&self, _request: &CalculationRequest) -> String {
            self.0.to_string()
        }
    }

    struct Panicking;

    impl CalculationBackend for Panicking {
        fn invoke(&self, _request: &CalculationRequest) -> String {
            panic!("backend exploded");
        }
    }

    /// Blocks until the test releases it.
    struct Held(Mutex<Receiver<()>>);

    impl CalculationBackend for Held {
        fn invoke(&self, _request: &CalculationRequest) -> String {
            if let Ok(rx) = self.0.lock() {
                let _ = rx.recv();
            }
            "{}".to_string()
        }
    }

    fn request() -> CalculationRequest {
        CalculationRequest::encode("Chair", "2", std::iter::empty::<&InventoryRow>())
    }

    #[test]
    fn gate_reopens_when_guard_drops() {
        let gate = TriggerGate::new();
        let guard = gate.acquire().unwrap();
        assert!(!gate.is_open());
        assert!(matches!(gate.acquire(), Err(SlotError::Busy)));
        drop(guard);
        assert!(gate.is_open());
        assert!(gate.acquire().is_ok());
    }

    #[test]
    fn completion_holds_gate_until_dropped() {
        let mut slot = CalculationSlot::new();
        slot.start(request(), Arc::new(Fixed("{\"ok\":1}"))).unwrap();
        let completion = slot
            .wait(Duration::from_secs(5))
            .expect("completion expected")
            .unwrap();
        assert_eq!(completion.response, "{\"ok\":1}");
        assert_eq!(completion.request.target_item, "Chair");
        assert!(slot.is_busy());
        drop(completion);
        assert!(!slot.is_busy());
    }

    #[test]
    fn second_start_is_rejected_while_running() {
        let (release, hold) = mpsc::channel();
        let mut slot = CalculationSlot::new();
        slot.start(request(), Arc::new(Held(Mutex::new(hold)))).unwrap();
        assert!(matches!(
            slot.start(request(), Arc::new(Fixed("{}"))),
            Err(SlotError::Busy)
        ));
        release.send(()).unwrap();
        let completion = slot.wait(Duration::from_secs(5)).unwrap().unwrap();
        drop(completion);
        assert!(slot.start(request(), Arc::new(Fixed("{}"))).is_ok());
    }

    #[test]
    fn panicking_backend_releases_gate() {
        let mut slot = CalculationSlot::new();
        slot.start(request(), Arc::new(Panicking)).unwrap();
        assert!(matches!(
            slot.wait(Duration::from_secs(5)),
            Some(Err(SlotError::WorkerLost))
        ));
        assert!(!slot.is_busy());
    }

    #[test]
    fn poll_is_none_when_idle() {
        let mut slot = CalculationSlot::new();
        assert!(slot.poll().is_none());
        assert!(!slot.is_busy());
    }
}
