use std::ffi::c_void;

use windows::Win32::Foundation::{
    ERROR_CLASS_ALREADY_EXISTS, GetLastError, HINSTANCE, HWND, LPARAM, WPARAM,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, MSG, PM_REMOVE, PeekMessageW,
    PostMessageW, RegisterClassExW, TranslateMessage, WINDOW_EX_STYLE, WM_QUIT, WNDCLASSEXW,
    WS_OVERLAPPED,
};
use windows::core::{HSTRING, PCWSTR};

use wndpump_core::{
    NativeError, NativeService, Registration, RetainedProcedure, Retrieved, Signal, WindowConfig,
    WindowHandle,
};

use crate::trampoline;

/// Native window service backed by user32.
///
/// Stateless: every window shares one trampoline WNDPROC, and each
/// window's procedure lives in its `GWLP_USERDATA` slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Service;

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.as_raw() as *mut c_void)
}

/// Captures `GetLastError` as a [`NativeError`].
fn last_error() -> NativeError {
    let error = unsafe { GetLastError() };
    let message = windows::core::Error::from(error.to_hresult()).message();
    NativeError::new(error.0, message)
}

/// Converts a `windows` error, unwrapping Win32 codes from their HRESULT.
fn from_windows(error: &windows::core::Error) -> NativeError {
    let hresult = error.code().0 as u32;
    let code = if hresult & 0xFFFF_0000 == 0x8007_0000 {
        hresult & 0xFFFF
    } else {
        hresult
    };
    NativeError::new(code, error.message())
}

fn module_instance() -> Result<HINSTANCE, NativeError> {
    unsafe { GetModuleHandleW(None) }
        .map(HINSTANCE::from)
        .map_err(|e| from_windows(&e))
}

/// `DefWindowProcW` for procedures that do not handle a code themselves.
pub fn default_procedure(handle: WindowHandle, code: u32, wparam: usize, lparam: isize) -> isize {
    unsafe { DefWindowProcW(hwnd(handle), code, WPARAM(wparam), LPARAM(lparam)) }.0
}

impl NativeService for Win32Service {
    type Message = MSG;

    fn register_class(&self, config: &WindowConfig) -> Result<Registration, NativeError> {
        // RegisterClassExW copies the name, so the HSTRING may drop afterwards.
        let class_name = HSTRING::from(config.class_name.as_str());
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(trampoline::window_proc),
            hInstance: module_instance()?,
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };

        if unsafe { RegisterClassExW(&wc) } != 0 {
            return Ok(Registration::Registered);
        }
        let error = last_error();
        if error.code == ERROR_CLASS_ALREADY_EXISTS.0 {
            Ok(Registration::AlreadyRegistered(error))
        } else {
            Err(error)
        }
    }

    fn create_window(
        &self,
        config: &WindowConfig,
        procedure: RetainedProcedure,
    ) -> Result<WindowHandle, NativeError> {
        let class_name = HSTRING::from(config.class_name.as_str());
        let title = HSTRING::from(config.title.as_str());
        let instance = module_instance()?;
        let param = trampoline::into_create_param(procedure);
        trampoline::begin_create();

        // No WS_VISIBLE: the window only exists to own a message queue.
        let created = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                PCWSTR(class_name.as_ptr()),
                PCWSTR(title.as_ptr()),
                WS_OVERLAPPED,
                0,
                0,
                config.width,
                config.height,
                None,
                None,
                Some(instance),
                Some(param as *const c_void),
            )
        };

        match created {
            Ok(h) if !h.is_invalid() => Ok(WindowHandle::from_raw(h.0 as usize)),
            result => {
                // Once adopted, WM_NCDESTROY has already freed the procedure.
                if !trampoline::was_adopted() {
                    unsafe { trampoline::reclaim(param) };
                }
                Err(result
                    .err()
                    .map_or_else(last_error, |e| from_windows(&e)))
            }
        }
    }

    fn retrieve(&self, handle: WindowHandle) -> Result<Retrieved<MSG>, NativeError> {
        let mut msg = MSG::default();
        // GetMessageW handles WM_QUIT itself by returning 0.
        match unsafe { GetMessageW(&mut msg, Some(hwnd(handle)), 0, 0) }.0 {
            -1 => Err(last_error()),
            0 => Ok(Retrieved::Closed),
            _ => Ok(Retrieved::Message(msg)),
        }
    }

    fn translate_and_dispatch(&self, message: &MSG) {
        unsafe {
            let _ = TranslateMessage(message);
            DispatchMessageW(message);
        }
    }

    fn post(&self, handle: WindowHandle, signal: Signal) -> Result<(), NativeError> {
        let (code, wparam, lparam) = match signal {
            Signal::Application {
                code,
                wparam,
                lparam,
            } => (code, wparam, lparam),
            Signal::Shutdown => (WM_QUIT, 0, 0),
        };
        unsafe { PostMessageW(Some(hwnd(handle)), code, WPARAM(wparam), LPARAM(lparam)) }
            .map_err(|e| from_windows(&e))
    }

    fn discard_shutdown(&self, handle: WindowHandle) -> Result<bool, NativeError> {
        let mut msg = MSG::default();
        // The range filter keeps every other message queued.
        let removed =
            unsafe { PeekMessageW(&mut msg, Some(hwnd(handle)), WM_QUIT, WM_QUIT, PM_REMOVE) };
        Ok(removed.as_bool())
    }

    fn default_procedure(
        &self,
        handle: WindowHandle,
        code: u32,
        wparam: usize,
        lparam: isize,
    ) -> isize {
        default_procedure(handle, code, wparam, lparam)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use windows::Win32::UI::WindowsAndMessaging::WM_USER;
    use wndpump_core::{CancelToken, PumpError, RegistrationPolicy, Window};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn config(class_name: &str) -> WindowConfig {
        WindowConfig {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn custom_message_round_trips_through_the_real_queue() {
        // Arrange
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let window = Arc::new(
            Window::create(
                Arc::new(Win32Service),
                &config("WndPumpTestRoundTrip"),
                move |handle, code, wparam, lparam| {
                    if code == WM_USER {
                        let _ = tx.lock().expect("sender lock").send((code, wparam, lparam));
                        return 0;
                    }
                    default_procedure(handle, code, wparam, lparam)
                },
            )
            .expect("create"),
        );
        let cancel = CancelToken::new();
        let (done_tx, done_rx) = mpsc::channel();
        {
            let window = Arc::clone(&window);
            let cancel = cancel.clone();
            thread::spawn(move || {
                let _ = done_tx.send(window.run(&cancel));
            });
        }

        // Act
        window.post(WM_USER, 7, 0).expect("post");
        let seen = rx.recv_timeout(TIMEOUT).expect("message dispatched");
        cancel.cancel();
        let result = done_rx.recv_timeout(TIMEOUT).expect("run returned");

        // Assert
        assert_eq!(seen, (WM_USER, 7, 0));
        assert!(rx.try_recv().is_err());
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn already_cancelled_run_returns_ok() {
        let window = Window::create(
            Arc::new(Win32Service),
            &config("WndPumpTestPreCancelled"),
            default_procedure,
        )
        .expect("create");
        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(window.run(&cancel), Ok(()));
    }

    #[test]
    fn leftover_quit_does_not_end_the_next_run() {
        // Arrange
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let window = Arc::new(
            Window::create(
                Arc::new(Win32Service),
                &config("WndPumpTestLeftoverQuit"),
                move |handle, code, wparam, lparam| {
                    if code == WM_USER {
                        let _ = tx.lock().expect("sender lock").send(wparam);
                        return 0;
                    }
                    default_procedure(handle, code, wparam, lparam)
                },
            )
            .expect("create"),
        );
        window
            .submit(|service, handle| service.post(handle, Signal::Shutdown))
            .expect("submit")
            .expect("queue quit");
        let stale = CancelToken::new();
        stale.cancel();
        let first = window.run_detailed(&stale);

        // Act
        let cancel = CancelToken::new();
        let (done_tx, done_rx) = mpsc::channel();
        {
            let window = Arc::clone(&window);
            let cancel = cancel.clone();
            thread::spawn(move || {
                let _ = done_tx.send(window.run_detailed(&cancel));
            });
        }
        window.post(WM_USER, 3, 0).expect("post");
        let seen = rx.recv_timeout(TIMEOUT).expect("message dispatched");
        cancel.cancel();
        let second = done_rx.recv_timeout(TIMEOUT).expect("run returned");

        // Assert
        assert_eq!(first.result, Ok(()));
        assert_eq!(seen, 3);
        assert_eq!(second.result, Ok(()));
        assert!(second.cancelled);
    }

    #[test]
    fn second_window_reuses_the_registered_class() {
        let service = Arc::new(Win32Service);
        let config = config("WndPumpTestReuse");

        let first = Window::create(Arc::clone(&service), &config, default_procedure);
        let second = Window::create(service, &config, default_procedure);

        assert!(first.is_ok());
        assert!(second.is_ok());
    }

    #[test]
    fn strict_policy_reports_class_already_exists() {
        let service = Arc::new(Win32Service);
        let mut config = config("WndPumpTestStrict");
        config.registration = RegistrationPolicy::Strict;
        let _first = Window::create(Arc::clone(&service), &config, default_procedure)
            .expect("first create");

        let second = Window::create(service, &config, default_procedure);

        let Err(PumpError::Registration(e)) = &second else {
            panic!("expected a registration error, got {second:?}");
        };
        assert_eq!(e.code, ERROR_CLASS_ALREADY_EXISTS.0);
    }
}
