//! Debouncing for async, single-argument operations.
//!
//! A [`Debouncer`] wraps an async function so that a burst of calls collapses
//! into a single invocation, fired once no new call has arrived for the quiet
//! period. Every superseded call settles as [`Outcome::Cancelled`]. So does a
//! call whose wrapped function was already running when it got superseded: the
//! computation is left to finish, but its result is thrown away.

use std::{
    future::Future,
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::watch,
    time::{self, Instant},
};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Identifies one scheduled call. A later call always has a bigger token.
pub type CallToken = u64;

/// How a scheduled call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T, E> {
    /// The quiet period elapsed and the wrapped function ran to completion.
    Fired(Result<T, E>),
    /// Superseded by a newer call, or the debouncer was disposed.
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    #[inline]
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    #[inline]
    #[must_use]
    pub fn fired(self) -> Option<Result<T, E>> {
        match self {
            Self::Fired(result) => Some(result),
            Self::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U, E> {
        match self {
            Self::Fired(result) => Outcome::Fired(result.map(f)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    /// Waiting for the quiet period to elapse.
    Scheduled,
    /// The wrapped function is running.
    Running,
    Disposed,
}

/// The one outstanding debounce window of a [`Debouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCall {
    token: CallToken,
    fire_at: Instant,
    running: bool,
}

impl PendingCall {
    #[inline]
    #[must_use]
    pub const fn token(&self) -> CallToken {
        self.token
    }

    #[inline]
    #[must_use]
    pub const fn fire_at(&self) -> Instant {
        self.fire_at
    }

    #[inline]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Idle,
    Pending(PendingCall),
    Disposed,
}

impl Slot {
    #[inline]
    fn is_live(&self, token: CallToken) -> bool {
        matches!(self, Self::Pending(call) if call.token == token)
    }
}

/// Debounced wrapper around an async function `Fn(A) -> Future<Output = Result<T, E>>`.
///
/// Only the most recent [`schedule`](Self::schedule) call can ever produce a
/// [`Outcome::Fired`]. Dropping the debouncer disposes it.
pub struct Debouncer<A, F> {
    quiet_period: Duration,
    func: Arc<F>,
    slot: Arc<watch::Sender<Slot>>,
    last_token: AtomicU64,
    _arg: PhantomData<fn(A)>,
}

impl<A, F> Debouncer<A, F> {
    pub fn new(quiet_period: Duration, func: F) -> Self {
        let (slot, _rx) = watch::channel(Slot::Idle);

        Self {
            quiet_period,
            func: Arc::new(func),
            slot: Arc::new(slot),
            last_token: AtomicU64::new(0),
            _arg: PhantomData,
        }
    }

    pub fn with_default_quiet_period(func: F) -> Self {
        Self::new(DEFAULT_QUIET_PERIOD, func)
    }

    #[inline]
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    #[must_use]
    pub fn state(&self) -> CallState {
        match *self.slot.borrow() {
            Slot::Idle => CallState::Idle,
            Slot::Pending(call) if call.running => CallState::Running,
            Slot::Pending(_) => CallState::Scheduled,
            Slot::Disposed => CallState::Disposed,
        }
    }

    #[must_use]
    pub fn pending(&self) -> Option<PendingCall> {
        match *self.slot.borrow() {
            Slot::Pending(call) => Some(call),
            Slot::Idle | Slot::Disposed => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(*self.slot.borrow(), Slot::Disposed)
    }

    /// Settles the outstanding call, if any, as cancelled without scheduling
    /// a new one. Returns whether there was a call to cancel.
    pub fn cancel(&self) -> bool {
        self.slot.send_if_modified(|slot| {
            let Slot::Pending(call) = *slot else {
                return false;
            };

            tracing::trace!(token = call.token, "cancelling pending call");
            *slot = Slot::Idle;
            true
        })
    }

    /// Cancels the outstanding call and refuses every later one.
    ///
    /// Safe to call any number of times.
    pub fn dispose(&self) {
        self.slot.send_if_modified(|slot| {
            let previous = *slot;
            match previous {
                Slot::Disposed => return false,
                Slot::Pending(call) => {
                    tracing::debug!(token = call.token, "disposing debouncer with a pending call");
                }
                Slot::Idle => {}
            }

            *slot = Slot::Disposed;
            true
        });
    }
}

impl<A, F, Fut, T, E> Debouncer<A, F>
where
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    /// Schedules `arg`, cancelling the previous call if it has not settled yet.
    ///
    /// The returned future resolves to [`Outcome::Fired`] with the wrapped
    /// function's result if no other call is scheduled during the quiet period,
    /// and to [`Outcome::Cancelled`] as soon as a newer call (or disposal)
    /// supersedes this one. Dropping the future abandons the call.
    pub fn schedule(&self, arg: A) -> impl Future<Output = Outcome<T, E>> + use<A, F, Fut, T, E> {
        let token = self.last_token.fetch_add(1, Ordering::Relaxed) + 1;
        let fire_at = Instant::now() + self.quiet_period;

        let accepted = self.slot.send_if_modified(|slot| {
            let previous = *slot;
            match previous {
                Slot::Disposed => return false,
                Slot::Pending(call) => {
                    tracing::trace!(superseded = call.token, token, "superseding pending call");
                }
                Slot::Idle => {}
            }

            *slot = Slot::Pending(PendingCall {
                token,
                fire_at,
                running: false,
            });
            true
        });

        if !accepted {
            tracing::debug!(token, "debouncer is disposed, call cancelled");
        }

        // Subscribing after the update marks it as seen, so only later
        // changes wake this call up.
        let rx = self.slot.subscribe();
        let call = Call {
            slot: Arc::clone(&self.slot),
            token,
        };
        let func = Arc::clone(&self.func);

        async move {
            if !accepted {
                return Outcome::Cancelled;
            }

            call.settle(rx, fire_at, func, arg).await
        }
    }
}

impl<A, F> Drop for Debouncer<A, F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// The waiting side of one scheduled call.
///
/// Dropping it releases the slot if the call is still the live one.
struct Call {
    slot: Arc<watch::Sender<Slot>>,
    token: CallToken,
}

impl Call {
    async fn settle<A, F, Fut, T, E>(
        self,
        mut rx: watch::Receiver<Slot>,
        fire_at: Instant,
        func: Arc<F>,
        arg: A,
    ) -> Outcome<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let timer = time::sleep_until(fire_at);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;

                changed = rx.changed() => {
                    if changed.is_err() || !rx.borrow_and_update().is_live(self.token) {
                        return Outcome::Cancelled;
                    }
                }
                () = &mut timer => break,
            }
        }

        if !self.start() {
            return Outcome::Cancelled;
        }

        tracing::debug!(token = self.token, "quiet period elapsed, firing");
        let result = (*func)(arg).await;

        if self.finish() {
            Outcome::Fired(result)
        } else {
            tracing::debug!(token = self.token, "discarding result of a superseded call");
            Outcome::Cancelled
        }
    }

    fn start(&self) -> bool {
        self.slot.send_if_modified(|slot| match slot {
            Slot::Pending(call) if call.token == self.token => {
                call.running = true;
                true
            }
            _ => false,
        })
    }

    fn finish(&self) -> bool {
        self.slot.send_if_modified(|slot| {
            if slot.is_live(self.token) {
                *slot = Slot::Idle;
                true
            } else {
                false
            }
        })
    }
}

impl Drop for Call {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
