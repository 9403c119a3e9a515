//! Ctrl+C signal handler using `SetConsoleCtrlHandler`.
//!
//! Fires a [`CancelToken`] so a running pump shuts down cleanly.

use std::sync::OnceLock;

use windows::Win32::Foundation::ERROR_ALREADY_EXISTS;
use windows::Win32::System::Console::{CTRL_BREAK_EVENT, CTRL_C_EVENT, SetConsoleCtrlHandler};

use wndpump_core::{CancelToken, NativeError};

/// Global token, written once by `set_handler`, read by the callback.
static TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Registers a console handler that cancels `token` on Ctrl+C or Ctrl+Break.
///
/// Only one token can be registered per process.
pub fn set_handler(token: CancelToken) -> Result<(), NativeError> {
    TOKEN.set(token).map_err(|_| {
        NativeError::new(
            ERROR_ALREADY_EXISTS.0,
            "Ctrl+C handler already registered.",
        )
    })?;

    unsafe { SetConsoleCtrlHandler(Some(handler), true) }
        .map_err(|e| NativeError::new(e.code().0 as u32, e.message()))
}

unsafe extern "system" fn handler(ctrl_type: u32) -> windows::core::BOOL {
    if (ctrl_type == CTRL_C_EVENT || ctrl_type == CTRL_BREAK_EVENT)
        && let Some(token) = TOKEN.get()
    {
        token.cancel();
        return windows::core::BOOL(1);
    }
    windows::core::BOOL(0)
}
