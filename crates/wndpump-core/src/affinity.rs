//! A dedicated OS thread that owns every native call for one window.
//!
//! Native UI subsystems require a window to be created, pumped and torn
//! down from the thread that created it. Instead of pinning whatever thread
//! happens to call us, each window gets its own worker processing a job
//! queue, and callers submit work to it.

use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use crate::error::{PumpError, PumpResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a single-threaded executor reserved for native UI calls.
///
/// Dropping it closes the job queue and joins the thread once queued jobs
/// (including a running message pump) have finished.
pub struct AffinityThread {
    jobs: Mutex<Option<Sender<Job>>>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AffinityThread {
    /// Spawns the worker thread.
    pub fn spawn(name: &str) -> PumpResult<Self> {
        let (tx, rx) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in rx {
                    job();
                }
            })
            .map_err(|_| PumpError::AffinityLost)?;

        Ok(Self {
            jobs: Mutex::new(Some(tx)),
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Runs `job` on the worker and blocks until it returns.
    ///
    /// Jobs run strictly one at a time in submission order. Called from the
    /// worker itself, the job runs inline instead of deadlocking.
    pub fn call<R, F>(&self, job: F) -> PumpResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return Ok(job());
        }

        let (result_tx, result_rx) = mpsc::sync_channel(1);
        let job: Job = Box::new(move || {
            let _ = result_tx.send(job());
        });

        {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            let sender = jobs.as_ref().ok_or(PumpError::AffinityLost)?;
            sender.send(job).map_err(|_| PumpError::AffinityLost)?;
        }

        // A panicking job takes the worker down and drops the result sender.
        result_rx.recv().map_err(|_| PumpError::AffinityLost)
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Returns whether the calling thread is the worker.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for AffinityThread {
    fn drop(&mut self) {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && !self.is_current()
        {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for AffinityThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffinityThread")
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn jobs_run_on_the_worker_thread() {
        let worker = AffinityThread::spawn("affinity-test").expect("spawn");

        let seen = worker.call(|| thread::current().id()).expect("call");

        assert_eq!(seen, worker.thread_id());
        assert_ne!(seen, thread::current().id());
    }

    #[test]
    fn jobs_from_many_callers_share_one_thread() {
        let worker = Arc::new(AffinityThread::spawn("affinity-shared").expect("spawn"));

        let ids: Vec<_> = (0..4)
            .map(|_| {
                let worker = Arc::clone(&worker);
                thread::spawn(move || worker.call(|| thread::current().id()).expect("call"))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().expect("caller panicked"))
            .collect();

        assert!(ids.iter().all(|id| *id == worker.thread_id()));
    }

    #[test]
    fn panicking_job_reports_affinity_lost() {
        let worker = AffinityThread::spawn("affinity-panic").expect("spawn");

        let first = worker.call(|| -> u32 { panic!("boom") });
        let second = worker.call(|| 1);

        assert_eq!(first, Err(PumpError::AffinityLost));
        assert_eq!(second, Err(PumpError::AffinityLost));
    }

    #[test]
    fn worker_thread_carries_its_name() {
        let worker = AffinityThread::spawn("affinity-named").expect("spawn");

        let name = worker
            .call(|| thread::current().name().map(str::to_string))
            .expect("call");

        assert_eq!(name.as_deref(), Some("affinity-named"));
    }
}
