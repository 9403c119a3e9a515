use std::cell::Cell;
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CREATESTRUCTW, DefWindowProcW, GWLP_USERDATA, GetWindowLongPtrW, SetWindowLongPtrW,
    WM_NCCREATE, WM_NCDESTROY,
};

use wndpump_core::{RetainedProcedure, WindowHandle};

thread_local! {
    // Set when WM_NCCREATE hands the create param to a window on this thread.
    static ADOPTED: Cell<bool> = const { Cell::new(false) };
}

/// Moves `procedure` to the heap for `lpCreateParams`.
///
/// Ownership passes to the window on `WM_NCCREATE` and is reclaimed on
/// `WM_NCDESTROY`. If creation fails before that, the caller must hand
/// the pointer back to [`reclaim`].
pub(crate) fn into_create_param(procedure: RetainedProcedure) -> *mut c_void {
    Box::into_raw(Box::new(procedure)) as *mut c_void
}

/// Resets the adoption flag before `CreateWindowExW`.
pub(crate) fn begin_create() {
    ADOPTED.set(false);
}

/// Returns whether the last creation on this thread reached `WM_NCCREATE`.
pub(crate) fn was_adopted() -> bool {
    ADOPTED.get()
}

/// Frees a pointer produced by [`into_create_param`].
///
/// # Safety
///
/// `param` must come from `into_create_param` and not be owned by a window.
pub(crate) unsafe fn reclaim(param: *mut c_void) {
    drop(unsafe { Box::from_raw(param as *mut RetainedProcedure) });
}

/// WNDPROC shared by every wndpump window class.
///
/// Routes each message to the procedure stored in `GWLP_USERDATA`.
/// Messages that arrive before `WM_NCCREATE` go to `DefWindowProcW`.
pub(crate) unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let procedure = if msg == WM_NCCREATE {
        let create = unsafe { &*(lparam.0 as *const CREATESTRUCTW) };
        let raw = create.lpCreateParams as *mut RetainedProcedure;
        unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, raw as isize) };
        ADOPTED.set(!raw.is_null());
        raw
    } else {
        unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut RetainedProcedure }
    };

    if procedure.is_null() {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    let handle = WindowHandle::from_raw(hwnd.0 as usize);
    // Unwinding across this frame would abort the process.
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let procedure = unsafe { &*procedure };
        LRESULT(procedure.call(handle, msg, wparam.0, lparam.0))
    }))
    .unwrap_or_else(|_| {
        wndpump_core::log_error!("Window procedure for {handle} panicked on message 0x{msg:x}");
        unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
    });

    if msg == WM_NCDESTROY {
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            reclaim(procedure as *mut c_void);
        }
    }
    result
}
