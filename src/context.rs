//! Deadlines and cancellation for a verification call.
//!
//! A [`Context`] carries an optional deadline and an optional cancel token.
//! [`Context::background`] has neither and never expires.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<Arc<CancelState>>,
}

/// Cancels every call sharing the paired [`Context`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Idempotent. Wakes every caller currently waiting on the context.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

impl Context {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().deadline_at(deadline)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        let state = Arc::new(CancelState::default());
        let ctx = Self {
            deadline: None,
            cancel: Some(Arc::clone(&state)),
        };
        (ctx, CancelHandle { state })
    }

    /// Tightens the deadline to `timeout` from now; an earlier deadline wins.
    pub fn timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.deadline_at(deadline),
            None => self,
        }
    }

    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// `true` when the context can never fire.
    pub fn is_background(&self) -> bool {
        self.deadline.is_none() && self.cancel.is_none()
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|state| state.is_cancelled())
        {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Clips `budget` to the time left on the context.
    pub(crate) fn clip(&self, budget: Duration) -> Duration {
        match self.remaining() {
            Some(left) => budget.min(left.max(Duration::from_millis(1))),
            None => budget,
        }
    }

    /// Waits for the first message on `rx`, or for the context to end.
    ///
    /// `tx` must feed `rx`; it is handed to the cancel token so that
    /// cancellation can wake the waiter with `on_cancel`. The waiter never
    /// joins whatever produces the message.
    pub(crate) fn race<T: Send + 'static>(
        &self,
        tx: SyncSender<T>,
        rx: &Receiver<T>,
        on_cancel: T,
    ) -> Result<T, ContextError> {
        let registration = self.cancel.as_ref().map(|state| {
            let id = state.register(Box::new(move || {
                let _ = tx.try_send(on_cancel);
            }));
            Registration {
                state: state.as_ref(),
                id,
            }
        });

        let outcome = match self.deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(left) {
                    Ok(message) => Ok(message),
                    Err(RecvTimeoutError::Timeout) => Err(ContextError::DeadlineExceeded),
                    Err(RecvTimeoutError::Disconnected) => {
                        Err(self.err().unwrap_or(ContextError::Cancelled))
                    }
                }
            }
            None => rx
                .recv()
                .map_err(|_| self.err().unwrap_or(ContextError::Cancelled)),
        };
        drop(registration);
        outcome
    }
}

type Waker = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    wakers: Mutex<Vec<(u64, Waker)>>,
}

impl fmt::Debug for CancelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelState")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl CancelState {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        let wakers = {
            let mut guard = self.wakers.lock().unwrap_or_else(PoisonError::into_inner);
            self.cancelled.store(true, Ordering::SeqCst);
            std::mem::take(&mut *guard)
        };
        for (_, wake) in wakers {
            wake();
        }
    }

    /// Runs `wake` right away when already cancelled.
    fn register(&self, wake: Waker) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.wakers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            drop(guard);
            wake();
        } else {
            guard.push((id, wake));
        }
        id
    }

    fn deregister(&self, id: u64) {
        let mut guard = self.wakers.lock().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|(waker_id, _)| *waker_id != id);
    }
}

struct Registration<'a> {
    state: &'a CancelState,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.state.deregister(self.id);
    }
}
