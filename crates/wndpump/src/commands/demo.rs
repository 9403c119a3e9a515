use std::sync::{Arc, Mutex};

use serde::Serialize;
use wndpump_core::{CancelToken, ExitReason, NativeService, PumpResult, Window, WindowConfig};

use crate::backend::Backend;

/// First code posted by the demo (`WM_USER`).
const FIRST_CODE: u32 = 0x400;

#[derive(clap::Args)]
pub struct DemoArgs {
    /// Number of custom messages to post before cancelling
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(0..=1000))]
    pub count: u32,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
    /// Native window service to use
    #[arg(long, value_enum, default_value_t = Backend::native())]
    pub backend: Backend,
}

#[derive(Debug, Clone, Serialize)]
struct Dispatched {
    code: u32,
    wparam: usize,
    lparam: isize,
}

#[derive(Debug, Serialize)]
struct DemoReport {
    backend: Backend,
    handle: String,
    posted: u32,
    dispatched: Vec<Dispatched>,
    exit: Option<ExitReason>,
    cancelled: bool,
}

pub fn execute(args: &DemoArgs) {
    let config = super::load_config();

    let result = with_service!(args.backend, service => demo(service, &config.window, args));
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "Window {} ({:?}): posted {}, dispatched {}",
        report.handle,
        report.backend,
        report.posted,
        report.dispatched.len()
    );
    for d in &report.dispatched {
        println!("  0x{:04x} wparam={} lparam={}", d.code, d.wparam, d.lparam);
    }
}

/// Posts `args.count` messages to a fresh window, then pumps it with an
/// already cancelled token so the pump drains them and stops.
fn demo<S: NativeService>(
    service: Arc<S>,
    config: &WindowConfig,
    args: &DemoArgs,
) -> PumpResult<DemoReport> {
    let seen: Arc<Mutex<Vec<Dispatched>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let fallback = super::fallback(&service);
    let codes = FIRST_CODE..FIRST_CODE + args.count;

    let window = Window::create(service, config, move |handle, code, wparam, lparam| {
        if !codes.contains(&code) {
            return fallback(handle, code, wparam, lparam);
        }
        if let Ok(mut seen) = sink.lock() {
            seen.push(Dispatched {
                code,
                wparam,
                lparam,
            });
        }
        0
    })?;

    for i in 0..args.count {
        window.post(FIRST_CODE + i, i as usize, 0)?;
    }

    let cancel = CancelToken::new();
    cancel.cancel();
    let run = window.run_detailed(&cancel);
    run.result?;

    let dispatched = seen.lock().map(|s| s.clone()).unwrap_or_default();
    Ok(DemoReport {
        backend: args.backend,
        handle: window.handle().to_string(),
        posted: args.count,
        dispatched,
        exit: run.exit,
        cancelled: run.cancelled,
    })
}
