use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a native window and its message queue.
///
/// Values are issued by the native service and carry no meaning beyond
/// identity: they are neither sequential nor reusable across services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(usize);

impl WindowHandle {
    /// Wraps a raw pointer-sized value issued by a native service.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw value for handing back to the native service.
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

type Procedure = dyn Fn(WindowHandle, u32, usize, isize) -> isize + Send + Sync;

/// An application window procedure kept alive for the window's lifetime.
///
/// The native side only ever stores an address to the callback, so every
/// backend holds one clone of this for as long as the window exists.
/// The procedure receives `(handle, code, wparam, lparam)` and must route
/// codes it does not handle to the service's default procedure.
#[derive(Clone)]
pub struct RetainedProcedure(Arc<Procedure>);

impl RetainedProcedure {
    pub fn new<F>(procedure: F) -> Self
    where
        F: Fn(WindowHandle, u32, usize, isize) -> isize + Send + Sync + 'static,
    {
        Self(Arc::new(procedure))
    }

    /// Invokes the procedure. Only native dispatch calls this.
    pub fn call(&self, handle: WindowHandle, code: u32, wparam: usize, lparam: isize) -> isize {
        (self.0)(handle, code, wparam, lparam)
    }
}

impl fmt::Debug for RetainedProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetainedProcedure")
            .field("refs", &Arc::strong_count(&self.0))
            .finish()
    }
}
