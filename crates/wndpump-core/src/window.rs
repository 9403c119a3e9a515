use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::affinity::AffinityThread;
use crate::cancel::CancelToken;
use crate::config::{RegistrationPolicy, WindowConfig};
use crate::error::{PumpError, PumpResult};
use crate::handle::{RetainedProcedure, WindowHandle};
use crate::native::{NativeService, Registration, Signal};
use crate::pump::{self, PumpState, RunReport, StateCell, Wake, WakeCell, Watched};
use crate::{log_debug, log_info, log_warn};

/// A native window bound to its own affinity thread.
///
/// Class registration, window creation and every message pump run on the
/// same dedicated thread. At most one pump runs per window at a time.
pub struct Window<S: NativeService> {
    handle: WindowHandle,
    service: Arc<S>,
    state: Arc<StateCell>,
    running: AtomicBool,
    thread: AffinityThread,
}

impl<S: NativeService> Window<S> {
    /// Registers the window class and creates a window bound to `procedure`.
    ///
    /// Both steps run on a freshly spawned affinity thread. Failures are
    /// returned as [`PumpError::Registration`] or [`PumpError::Creation`]
    /// and are not retried.
    pub fn create<F>(service: Arc<S>, config: &WindowConfig, procedure: F) -> PumpResult<Self>
    where
        F: Fn(WindowHandle, u32, usize, isize) -> isize + Send + Sync + 'static,
    {
        let thread = AffinityThread::spawn(&format!("wndpump-{}", config.class_name))?;
        let procedure = RetainedProcedure::new(procedure);

        let handle = {
            let service = Arc::clone(&service);
            let config = config.clone();
            thread.call(move || construct(&*service, &config, procedure))??
        };
        log_info!("Created window {handle} of class {}", config.class_name);

        Ok(Self {
            handle,
            service,
            state: Arc::new(StateCell::new()),
            running: AtomicBool::new(false),
            thread,
        })
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn state(&self) -> PumpState {
        self.state.get()
    }

    /// Posts an application message into the window's queue. Callable from
    /// any thread, including while the pump is running.
    pub fn post(&self, code: u32, wparam: usize, lparam: isize) -> PumpResult<()> {
        self.service
            .post(
                self.handle,
                Signal::Application {
                    code,
                    wparam,
                    lparam,
                },
            )
            .map_err(PumpError::Post)
    }

    /// Runs `job` on the window's affinity thread and waits for its result.
    ///
    /// Queued behind a running pump, so this blocks until the pump returns.
    pub fn submit<R, F>(&self, job: F) -> PumpResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&S, WindowHandle) -> R + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let handle = self.handle;
        self.thread.call(move || job(&*service, handle))
    }

    /// Pumps messages until the queue closes, retrieval fails or `cancel`
    /// fires. Blocks the calling thread until then.
    ///
    /// Returns `Ok(())` on clean shutdown; only a retrieval fault is an error.
    pub fn run(&self, cancel: &CancelToken) -> PumpResult<()> {
        self.run_detailed(cancel).result
    }

    /// Like [`Window::run`], but also reports how the pump ended and
    /// whether the shutdown post failed.
    pub fn run_detailed(&self, cancel: &CancelToken) -> RunReport {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return RunReport::rejected(PumpError::AlreadyRunning);
        }
        let report = self.pump_with_monitor(cancel);
        self.running.store(false, Ordering::Release);
        report
    }

    fn pump_with_monitor(&self, cancel: &CancelToken) -> RunReport {
        let wake = Arc::new(WakeCell::default());
        let listener = {
            let wake = Arc::clone(&wake);
            cancel.on_cancel(move || wake.trip(Wake::Cancelled))
        };

        // The scope joins the monitor on every exit path, so its shutdown
        // is either consumed by the pump or discarded below before `run`
        // returns.
        let report = thread::scope(|scope| {
            let monitor = scope.spawn(|| pump::watch(&*self.service, self.handle, &wake));

            let outcome = {
                let service = Arc::clone(&self.service);
                let state = Arc::clone(&self.state);
                let handle = self.handle;
                log_debug!("Starting pump for {handle}");
                self.thread
                    .call(move || pump::pump(&*service, handle, &state))
            };

            wake.trip(Wake::Finished);
            let watched = monitor.join().unwrap_or_else(|_| Watched::default());
            if watched.posted() {
                self.discard_leftover_shutdown();
            }

            match outcome {
                Ok(outcome) => RunReport {
                    result: outcome.result,
                    exit: Some(outcome.exit),
                    dispatched: outcome.dispatched,
                    cancelled: watched.cancelled,
                    cancel_post: watched.post_error,
                },
                Err(e) => {
                    self.state.set(PumpState::Stopped);
                    RunReport {
                        cancelled: watched.cancelled,
                        cancel_post: watched.post_error,
                        ..RunReport::rejected(e)
                    }
                }
            }
        });

        drop(listener);
        report
    }

    /// Drops the monitor's shutdown if the pump exited without consuming it,
    /// so the next run starts from a clean queue. When the pump did consume
    /// it, this removes nothing unless another shutdown was also queued.
    fn discard_leftover_shutdown(&self) {
        let service = Arc::clone(&self.service);
        let handle = self.handle;
        match self
            .thread
            .call(move || service.discard_shutdown(handle))
        {
            Ok(Ok(true)) => log_debug!("Discarded unconsumed shutdown for {handle}"),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => log_warn!("Could not clear shutdown queued for {handle}: {e}"),
            Err(e) => log_warn!("Could not clear shutdown queued for {handle}: {e}"),
        }
    }
}

impl<S: NativeService> std::fmt::Debug for Window<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .field("thread", &self.thread)
            .finish()
    }
}

/// Registration and creation; runs on the affinity thread.
fn construct<S: NativeService>(
    service: &S,
    config: &WindowConfig,
    procedure: RetainedProcedure,
) -> PumpResult<WindowHandle> {
    match service.register_class(config) {
        Ok(Registration::Registered) => {
            log_debug!("Registered window class {}", config.class_name);
        }
        Ok(Registration::AlreadyRegistered(e)) => match config.registration {
            RegistrationPolicy::Reuse => {
                log_debug!("Reusing registered window class {}", config.class_name);
            }
            RegistrationPolicy::Strict => return Err(PumpError::Registration(e)),
        },
        Err(e) => return Err(PumpError::Registration(e)),
    }

    service
        .create_window(config, procedure)
        .map_err(PumpError::Creation)
}
