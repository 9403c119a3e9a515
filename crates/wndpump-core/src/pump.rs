//! The message pump and its cancellation monitor.
//!
//! The pump blocks in native retrieval and can only be woken by something
//! arriving in its own queue. Cancellation therefore works by injecting
//! [`Signal::Shutdown`] into that same queue from a short-lived monitor
//! thread. If retrieval itself never returns, neither does the pump.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use serde::Serialize;

use crate::error::{PumpError, PumpResult};
use crate::handle::WindowHandle;
use crate::native::{NativeService, Retrieved, Signal};
use crate::{log_debug, log_error, log_info, log_warn};

/// Observable state of a window's pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpState {
    /// No pump has run yet.
    Idle,
    /// Blocked in retrieval.
    Running,
    /// Translating and dispatching one message.
    Draining,
    /// The last pump returned.
    Stopped,
}

/// Why the pump loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    QueueClosed,
    RetrievalFailed,
}

/// Everything one `run` produced.
#[derive(Debug)]
pub struct RunReport {
    /// The pump's own result: `Ok` on clean queue closure.
    pub result: PumpResult<()>,
    /// `None` when the pump never started.
    pub exit: Option<ExitReason>,
    /// Messages translated and dispatched.
    pub dispatched: u64,
    /// Whether the cancellation token fired while the pump was running.
    pub cancelled: bool,
    /// Best-effort failure of the shutdown post. Never the pump's error.
    pub cancel_post: Option<PumpError>,
}

impl RunReport {
    pub(crate) fn rejected(error: PumpError) -> Self {
        Self {
            result: Err(error),
            exit: None,
            dispatched: 0,
            cancelled: false,
            cancel_post: None,
        }
    }
}

/// Lock-free cell holding a [`PumpState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(PumpState::Idle as u8))
    }

    pub(crate) fn get(&self) -> PumpState {
        match self.0.load(Ordering::Acquire) {
            1 => PumpState::Running,
            2 => PumpState::Draining,
            3 => PumpState::Stopped,
            _ => PumpState::Idle,
        }
    }

    pub(crate) fn set(&self, state: PumpState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Result of the retrieval loop, produced on the affinity thread.
#[derive(Debug)]
pub(crate) struct PumpOutcome {
    pub(crate) result: PumpResult<()>,
    pub(crate) exit: ExitReason,
    pub(crate) dispatched: u64,
}

/// Retrieves, translates and dispatches until the queue closes or
/// retrieval fails. Must run on the thread that created `handle`.
pub(crate) fn pump<S: NativeService>(
    service: &S,
    handle: WindowHandle,
    state: &StateCell,
) -> PumpOutcome {
    let mut dispatched = 0;

    loop {
        state.set(PumpState::Running);
        match service.retrieve(handle) {
            Ok(Retrieved::Message(message)) => {
                state.set(PumpState::Draining);
                service.translate_and_dispatch(&message);
                dispatched += 1;
            }
            Ok(Retrieved::Closed) => {
                state.set(PumpState::Stopped);
                log_debug!("Pump for {handle} stopped: queue closed after {dispatched} messages");
                return PumpOutcome {
                    result: Ok(()),
                    exit: ExitReason::QueueClosed,
                    dispatched,
                };
            }
            Err(e) => {
                state.set(PumpState::Stopped);
                log_error!("Pump for {handle} stopped: {e}");
                return PumpOutcome {
                    result: Err(PumpError::Retrieval(e)),
                    exit: ExitReason::RetrievalFailed,
                    dispatched,
                };
            }
        }
    }
}

/// What woke the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    Cancelled,
    Finished,
}

/// One-shot rendezvous between the cancellation token, the pump's exit
/// and the monitor. The first trip wins.
#[derive(Debug, Default)]
pub(crate) struct WakeCell {
    slot: Mutex<Option<Wake>>,
    cond: Condvar,
}

impl WakeCell {
    pub(crate) fn trip(&self, wake: Wake) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(wake);
            self.cond.notify_all();
        }
    }

    fn wait(&self) -> Wake {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(wake) = *slot {
                return wake;
            }
            slot = self
                .cond
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// What the monitor did before exiting.
#[derive(Debug, Default)]
pub(crate) struct Watched {
    pub(crate) cancelled: bool,
    pub(crate) post_error: Option<PumpError>,
}

impl Watched {
    /// Whether a shutdown signal actually reached the queue.
    pub(crate) fn posted(&self) -> bool {
        self.cancelled && self.post_error.is_none()
    }
}

/// Monitor body: waits for cancellation or pump exit, and on cancellation
/// posts exactly one shutdown signal into the pump's queue.
pub(crate) fn watch<S: NativeService>(service: &S, handle: WindowHandle, wake: &WakeCell) -> Watched {
    match wake.wait() {
        Wake::Finished => Watched::default(),
        Wake::Cancelled => {
            log_info!("Cancellation requested; posting shutdown to {handle}");
            let post_error = service.post(handle, Signal::Shutdown).err().map(|e| {
                log_warn!("Shutdown post to {handle} failed, pump will not be woken: {e}");
                PumpError::Post(e)
            });
            Watched {
                cancelled: true,
                post_error,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn state_cell_round_trips_every_state() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), PumpState::Idle);

        for state in [PumpState::Running, PumpState::Draining, PumpState::Stopped] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }

    #[test]
    fn first_wake_wins() {
        let cell = WakeCell::default();

        cell.trip(Wake::Finished);
        cell.trip(Wake::Cancelled);

        assert_eq!(cell.wait(), Wake::Finished);
    }

    #[test]
    fn wake_reaches_waiting_thread() {
        let cell = Arc::new(WakeCell::default());
        let waiter = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || cell.wait())
        };

        cell.trip(Wake::Cancelled);

        assert_eq!(waiter.join().expect("waiter panicked"), Wake::Cancelled);
    }
}
