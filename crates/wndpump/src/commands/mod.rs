pub mod demo;
pub mod init;
pub mod run;

use std::sync::Arc;

use wndpump_core::{Config, NativeService, WindowHandle, config};

/// Loads the config file and starts file logging as it asks.
pub(crate) fn load_config() -> Config {
    let config = config::load();
    if let Err(e) = wndpump_core::log::init(&config.logging) {
        eprintln!("Warning: file logging disabled: {e}");
    }
    config
}

/// Routes a message to `service`'s default procedure while it is alive.
///
/// Holds only a weak reference: the loopback service keeps procedures in
/// its window table, and a strong one would form a cycle.
pub(crate) fn fallback<S: NativeService>(
    service: &Arc<S>,
) -> impl Fn(WindowHandle, u32, usize, isize) -> isize + Send + Sync + 'static {
    let service = Arc::downgrade(service);
    move |handle, code, wparam, lparam| {
        service
            .upgrade()
            .map_or(0, |s| s.default_procedure(handle, code, wparam, lparam))
    }
}
