//! The narrow seam to a native windowing subsystem.
//!
//! Each platform crate (e.g. `wndpump-windows`) provides an implementation;
//! [`crate::loopback`] provides an in-process one.

use std::fmt;

use crate::config::WindowConfig;
use crate::handle::{RetainedProcedure, WindowHandle};

/// A failed native call, carrying the subsystem's own diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Native error code (e.g. a Win32 `GetLastError` value).
    pub code: u32,
    /// Human-readable description from the subsystem.
    pub message: String,
}

impl NativeError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message.trim_end(), self.code)
    }
}

impl std::error::Error for NativeError {}

/// Result of registering a window class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Registered,
    /// The class already existed; carries the native diagnostic so a
    /// strict policy can surface it.
    AlreadyRegistered(NativeError),
}

/// Result of one blocking retrieval.
#[derive(Debug)]
pub enum Retrieved<M> {
    Message(M),
    /// The queue yielded its shutdown signal. The pump never sees that
    /// signal as an ordinary message.
    Closed,
}

/// What can be injected into a window's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Application {
        code: u32,
        wparam: usize,
        lparam: isize,
    },
    /// Makes the next retrieval on the queue report [`Retrieved::Closed`].
    Shutdown,
}

/// Native window service consumed by the pump.
///
/// `register_class`, `create_window` and `retrieve` must be called from
/// one thread per window; [`crate::AffinityThread`] guarantees that.
/// `post` may be called from any thread.
pub trait NativeService: Send + Sync + 'static {
    /// A retrieved message. Never leaves the affinity thread.
    type Message;

    fn register_class(&self, config: &WindowConfig) -> Result<Registration, NativeError>;

    /// Creates a window of an already registered class bound to `procedure`.
    ///
    /// The implementation must keep `procedure` reachable for the window's
    /// whole lifetime.
    fn create_window(
        &self,
        config: &WindowConfig,
        procedure: RetainedProcedure,
    ) -> Result<WindowHandle, NativeError>;

    /// Blocks until the next message for `handle` is available.
    fn retrieve(&self, handle: WindowHandle) -> Result<Retrieved<Self::Message>, NativeError>;

    /// Translates a message and dispatches it to the window procedure.
    fn translate_and_dispatch(&self, message: &Self::Message);

    fn post(&self, handle: WindowHandle, signal: Signal) -> Result<(), NativeError>;

    /// Removes one queued [`Signal::Shutdown`] for `handle`, if any, without
    /// dispatching anything else. Returns whether one was removed. Must be
    /// called on the thread that owns the window.
    fn discard_shutdown(&self, handle: WindowHandle) -> Result<bool, NativeError>;

    /// Baseline behavior for codes the application procedure does not handle.
    fn default_procedure(&self, handle: WindowHandle, code: u32, wparam: usize, lparam: isize)
    -> isize;
}
