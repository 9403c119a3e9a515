//! Single-shot cancellation signal shared between threads.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// A cloneable cancellation signal with two states: active and cancelled.
///
/// The pump only observes a token; whoever creates it decides when to
/// fire it. Cancelling more than once is a no-op.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    cond: Condvar,
}

#[derive(Default)]
struct State {
    cancelled: bool,
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token, waking waiters and running registered listeners.
    pub fn cancel(&self) {
        let listeners = {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.listeners)
        };
        self.inner.cond.notify_all();

        // Listeners run outside the lock so they may touch the token.
        for (_, listener) in listeners {
            listener();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Blocks until the token is cancelled.
    pub fn wait(&self) {
        let mut state = self.lock();
        while !state.cancelled {
            state = self
                .inner
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks up to `timeout`. Returns `true` if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .inner
            .cond
            .wait_timeout_while(state, timeout, |s| !s.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        state.cancelled
    }

    /// Runs `listener` once when the token fires, or immediately if it
    /// already has. Dropping the returned guard deregisters it.
    pub(crate) fn on_cancel(&self, listener: impl Fn() + Send + Sync + 'static) -> CancelListener {
        let listener: Listener = Arc::new(listener);
        let id = {
            let mut state = self.lock();
            if state.cancelled {
                None
            } else {
                let id = state.next_id;
                state.next_id += 1;
                state.listeners.push((id, Arc::clone(&listener)));
                Some(id)
            }
        };
        if id.is_none() {
            listener();
        }
        CancelListener {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Registration returned by [`CancelToken::on_cancel`].
pub(crate) struct CancelListener {
    inner: Arc<Inner>,
    id: Option<u64>,
}

impl Drop for CancelListener {
    fn drop(&mut self) {
        let Some(id) = self.id else {
            return;
        };
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.listeners.retain(|(other, _)| *other != id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn cancel_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        token.cancel();

        assert!(clone.is_cancelled());
    }

    #[test]
    fn wait_returns_after_cancel_from_other_thread() {
        let token = CancelToken::new();
        let remote = token.clone();

        let waiter = thread::spawn(move || remote.wait());
        token.cancel();

        waiter.join().expect("waiter panicked");
    }

    #[test]
    fn wait_timeout_reports_active_token() {
        let token = CancelToken::new();

        assert!(!token.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn listener_fires_exactly_once() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _guard = token.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel();
        token.cancel();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_on_cancelled_token_fires_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let _guard = token.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_listener_does_not_fire() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let guard = token.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        drop(guard);
        token.cancel();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
