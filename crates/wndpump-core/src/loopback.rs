//! In-process native window service.
//!
//! Behaves like a single-consumer native queue: windows belong to the
//! thread that created them, retrieval blocks on an empty queue and a
//! posted [`Signal::Shutdown`] closes it. Error codes mirror Win32 so the
//! pump sees the same diagnostics on every backend. One-shot fault
//! injection lets tests drive each failure path.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::config::WindowConfig;
use crate::handle::{RetainedProcedure, WindowHandle};
use crate::native::{NativeError, NativeService, Registration, Retrieved, Signal};

/// `ERROR_INVALID_WINDOW_HANDLE`.
pub const ERROR_INVALID_WINDOW_HANDLE: u32 = 1400;
/// `ERROR_CANNOT_FIND_WND_CLASS`.
pub const ERROR_CANNOT_FIND_WND_CLASS: u32 = 1407;
/// `ERROR_CLASS_ALREADY_EXISTS`.
pub const ERROR_CLASS_ALREADY_EXISTS: u32 = 1410;
/// `ERROR_WINDOW_OF_OTHER_THREAD`.
pub const ERROR_WINDOW_OF_OTHER_THREAD: u32 = 1408;

/// First handle value handed out. Spacing mimics real pointer-sized handles.
const FIRST_HANDLE: usize = 0x0001_0000;
const HANDLE_STRIDE: usize = 0x10;

/// A message retrieved from a loopback queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackMessage {
    pub handle: WindowHandle,
    pub code: u32,
    pub wparam: usize,
    pub lparam: isize,
}

/// Faults consumed by the next matching call.
#[derive(Debug, Default)]
struct Faults {
    registration: Option<NativeError>,
    creation: Option<NativeError>,
    retrieval: Option<NativeError>,
    post: Option<NativeError>,
}

struct LoopbackWindow {
    owner: ThreadId,
    procedure: RetainedProcedure,
    queue: VecDeque<Signal>,
}

#[derive(Default)]
struct Tables {
    classes: HashSet<String>,
    windows: HashMap<WindowHandle, LoopbackWindow>,
    next_handle: usize,
    faults: Faults,
}

/// Loopback implementation of [`NativeService`].
#[derive(Default)]
pub struct LoopbackService {
    tables: Mutex<Tables>,
    cond: Condvar,
}

impl LoopbackService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next class registration fail with `error`.
    pub fn fail_next_registration(&self, error: NativeError) {
        self.lock().faults.registration = Some(error);
    }

    /// Makes the next window creation fail with `error`.
    pub fn fail_next_creation(&self, error: NativeError) {
        self.lock().faults.creation = Some(error);
    }

    /// Makes the next retrieval fail with `error`, waking a blocked one.
    pub fn fail_next_retrieval(&self, error: NativeError) {
        self.lock().faults.retrieval = Some(error);
        self.cond.notify_all();
    }

    /// Makes the next post fail with `error`.
    pub fn fail_next_post(&self, error: NativeError) {
        self.lock().faults.post = Some(error);
    }

    /// Returns whether an injected fault has not fired yet.
    pub fn faults_pending(&self) -> bool {
        let faults = &self.lock().faults;
        faults.registration.is_some()
            || faults.creation.is_some()
            || faults.retrieval.is_some()
            || faults.post.is_some()
    }

    /// Number of signals still queued for `handle`.
    pub fn pending(&self, handle: WindowHandle) -> usize {
        self.lock()
            .windows
            .get(&handle)
            .map_or(0, |w| w.queue.len())
    }

    pub fn window_count(&self) -> usize {
        self.lock().windows.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn invalid_handle(handle: WindowHandle) -> NativeError {
    NativeError::new(
        ERROR_INVALID_WINDOW_HANDLE,
        format!("Invalid window handle {handle}."),
    )
}

impl NativeService for LoopbackService {
    type Message = LoopbackMessage;

    fn register_class(&self, config: &WindowConfig) -> Result<Registration, NativeError> {
        let mut tables = self.lock();
        if let Some(error) = tables.faults.registration.take() {
            return Err(error);
        }
        if tables.classes.insert(config.class_name.clone()) {
            Ok(Registration::Registered)
        } else {
            Ok(Registration::AlreadyRegistered(NativeError::new(
                ERROR_CLASS_ALREADY_EXISTS,
                "Class already exists.",
            )))
        }
    }

    fn create_window(
        &self,
        config: &WindowConfig,
        procedure: RetainedProcedure,
    ) -> Result<WindowHandle, NativeError> {
        let mut tables = self.lock();
        if let Some(error) = tables.faults.creation.take() {
            return Err(error);
        }
        if !tables.classes.contains(&config.class_name) {
            return Err(NativeError::new(
                ERROR_CANNOT_FIND_WND_CLASS,
                format!("Cannot find window class {}.", config.class_name),
            ));
        }

        let handle = WindowHandle::from_raw(FIRST_HANDLE + tables.next_handle * HANDLE_STRIDE);
        tables.next_handle += 1;
        tables.windows.insert(
            handle,
            LoopbackWindow {
                owner: thread::current().id(),
                procedure,
                queue: VecDeque::new(),
            },
        );
        Ok(handle)
    }

    fn retrieve(&self, handle: WindowHandle) -> Result<Retrieved<LoopbackMessage>, NativeError> {
        let mut tables = self.lock();
        loop {
            if let Some(error) = tables.faults.retrieval.take() {
                return Err(error);
            }
            let window = tables
                .windows
                .get_mut(&handle)
                .ok_or_else(|| invalid_handle(handle))?;
            if window.owner != thread::current().id() {
                return Err(NativeError::new(
                    ERROR_WINDOW_OF_OTHER_THREAD,
                    format!("Window {handle} belongs to another thread."),
                ));
            }

            match window.queue.pop_front() {
                Some(Signal::Shutdown) => return Ok(Retrieved::Closed),
                Some(Signal::Application {
                    code,
                    wparam,
                    lparam,
                }) => {
                    return Ok(Retrieved::Message(LoopbackMessage {
                        handle,
                        code,
                        wparam,
                        lparam,
                    }));
                }
                None => {
                    tables = self
                        .cond
                        .wait(tables)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn translate_and_dispatch(&self, message: &LoopbackMessage) {
        // Release the lock before calling out: procedures may post.
        let procedure = self
            .lock()
            .windows
            .get(&message.handle)
            .map(|w| w.procedure.clone());
        if let Some(procedure) = procedure {
            procedure.call(message.handle, message.code, message.wparam, message.lparam);
        }
    }

    fn post(&self, handle: WindowHandle, signal: Signal) -> Result<(), NativeError> {
        let mut tables = self.lock();
        if let Some(error) = tables.faults.post.take() {
            return Err(error);
        }
        let window = tables
            .windows
            .get_mut(&handle)
            .ok_or_else(|| invalid_handle(handle))?;
        window.queue.push_back(signal);
        self.cond.notify_all();
        Ok(())
    }

    fn discard_shutdown(&self, handle: WindowHandle) -> Result<bool, NativeError> {
        let mut tables = self.lock();
        let window = tables
            .windows
            .get_mut(&handle)
            .ok_or_else(|| invalid_handle(handle))?;
        let position = window
            .queue
            .iter()
            .position(|signal| matches!(signal, Signal::Shutdown));
        Ok(position.and_then(|at| window.queue.remove(at)).is_some())
    }

    fn default_procedure(&self, _: WindowHandle, _: u32, _: usize, _: isize) -> isize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(service: &LoopbackService) -> WindowHandle {
        let config = WindowConfig::default();
        service.register_class(&config).expect("register");
        service
            .create_window(&config, RetainedProcedure::new(|_, _, _, _| 0))
            .expect("create")
    }

    fn message(code: u32) -> Signal {
        Signal::Application {
            code,
            wparam: 0,
            lparam: 0,
        }
    }

    #[test]
    fn discard_shutdown_removes_only_the_first_shutdown() {
        // Arrange
        let service = LoopbackService::new();
        let handle = window(&service);
        for signal in [message(1), Signal::Shutdown, message(2), Signal::Shutdown] {
            service.post(handle, signal).expect("post");
        }

        // Act
        let removed = service.discard_shutdown(handle);

        // Assert
        assert_eq!(removed, Ok(true));
        assert_eq!(service.pending(handle), 3);
        let queued: Vec<_> = service.lock().windows[&handle].queue.iter().copied().collect();
        assert_eq!(queued, vec![message(1), message(2), Signal::Shutdown]);
    }

    #[test]
    fn discard_shutdown_on_a_queue_without_one_keeps_messages() {
        let service = LoopbackService::new();
        let handle = window(&service);
        service.post(handle, message(1)).expect("post");

        assert_eq!(service.discard_shutdown(handle), Ok(false));
        assert_eq!(service.pending(handle), 1);
    }

    #[test]
    fn discard_shutdown_for_an_unknown_window_is_an_error() {
        let service = LoopbackService::new();

        let result = service.discard_shutdown(WindowHandle::from_raw(0xdead));

        assert_eq!(result.map_err(|e| e.code), Err(ERROR_INVALID_WINDOW_HANDLE));
    }
}
