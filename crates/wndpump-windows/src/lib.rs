//! Win32 implementation of the wndpump native window service.
//!
//! Everything here is Windows-only; on other targets the crate is empty
//! and callers fall back to the loopback service.

/// Ctrl+C bridge into a cancellation token.
#[cfg(windows)]
pub mod ctrl_c;

/// Shared window procedure trampoline.
#[cfg(windows)]
mod trampoline;

/// `NativeService` over user32.
#[cfg(windows)]
pub mod service;

#[cfg(windows)]
pub use service::{Win32Service, default_procedure};
