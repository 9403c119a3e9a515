use clap::ValueEnum;
use serde::Serialize;

/// Native window service to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// user32 windows and message queues (Windows only)
    Win32,
    /// In-process queue, available everywhere
    Loopback,
}

impl Backend {
    /// The real windowing backend when there is one.
    pub fn native() -> Self {
        if cfg!(windows) {
            Self::Win32
        } else {
            Self::Loopback
        }
    }
}

/// Binds `$service` to an `Arc` of the service selected by `$backend`
/// and evaluates `$body`, which must produce a `PumpResult`.
macro_rules! with_service {
    ($backend:expr, $service:ident => $body:expr) => {
        match $backend {
            $crate::backend::Backend::Loopback => {
                let $service = std::sync::Arc::new(wndpump_core::LoopbackService::new());
                $body
            }
            #[cfg(windows)]
            $crate::backend::Backend::Win32 => {
                let $service = std::sync::Arc::new(wndpump_windows::Win32Service);
                $body
            }
            #[cfg(not(windows))]
            $crate::backend::Backend::Win32 => Err(wndpump_core::PumpError::Config(
                "the win32 backend is only available on Windows".into(),
            )),
        }
    };
}
