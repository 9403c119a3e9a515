use std::sync::Arc;
use std::thread;
use std::time::Duration;

use wndpump_core::{CancelToken, NativeService, PumpResult, Window, WindowConfig};

use crate::backend::Backend;

#[derive(clap::Args)]
pub struct RunArgs {
    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// Native window service to use
    #[arg(long, value_enum, default_value_t = Backend::native())]
    pub backend: Backend,
}

pub fn execute(args: &RunArgs) {
    let config = super::load_config();

    let cancel = CancelToken::new();
    install_ctrl_c(&cancel);
    if let Some(secs) = args.timeout_secs {
        let timer = cancel.clone();
        thread::spawn(move || {
            if !timer.wait_timeout(Duration::from_secs(secs)) {
                timer.cancel();
            }
        });
    }

    let result = with_service!(args.backend, service => pump(service, &config.window, &cancel));
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn pump<S: NativeService>(
    service: Arc<S>,
    config: &WindowConfig,
    cancel: &CancelToken,
) -> PumpResult<()> {
    let fallback = super::fallback(&service);
    let window = Window::create(service, config, move |handle, code, wparam, lparam| {
        println!("{handle} message 0x{code:04x} wparam={wparam} lparam={lparam}");
        fallback(handle, code, wparam, lparam)
    })?;
    println!(
        "Window {} created; pumping messages (Ctrl+C to stop).",
        window.handle()
    );

    let report = window.run_detailed(cancel);
    if let Some(e) = &report.cancel_post {
        eprintln!("Warning: {e}");
    }
    report.result?;

    println!("Pump stopped after {} messages.", report.dispatched);
    Ok(())
}

#[cfg(windows)]
fn install_ctrl_c(cancel: &CancelToken) {
    if let Err(e) = wndpump_windows::ctrl_c::set_handler(cancel.clone()) {
        eprintln!("Warning: Ctrl+C will not stop the pump: {e}");
    }
}

#[cfg(not(windows))]
fn install_ctrl_c(_: &CancelToken) {}
