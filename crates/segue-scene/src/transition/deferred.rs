//! Single-settlement result handles.
//!
//! A transition exposes three signals (`ready`, `updateCallbackDone`,
//! `finished`). Each is a [`Deferred`]: a handle observers can poll, await, or
//! subscribe to. Settling goes through the paired [`Resolver`], which the
//! lifecycle keeps to itself.
//!
//! A handle settles exactly once. Settling an already-settled handle is a
//! no-op that reports `false`.
//!
//! # Usage
//!
//! ```ignore
//! use segue_scene::transition::{Deferred, SettleStatus};
//!
//! let (signal, resolver) = Deferred::<()>::pending();
//! signal.on_settle(|result| println!("settled: {:?}", result.is_ok()));
//!
//! assert!(resolver.resolve(()));
//! assert!(!resolver.resolve(())); // second settlement is ignored
//! assert_eq!(signal.status(), SettleStatus::Fulfilled);
//! ```

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use super::error::TransitionError;

/// Observable status of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleStatus {
    Pending,
    Fulfilled,
    Rejected,
}

enum Settlement<T> {
    Pending,
    Fulfilled(T),
    Rejected(TransitionError),
}

type Reaction<T> = Box<dyn FnOnce(Result<T, TransitionError>)>;

struct Shared<T> {
    label: &'static str,
    state: Settlement<T>,
    /// Someone polled, subscribed, or explicitly marked the rejection handled.
    handled: bool,
    wakers: Vec<Waker>,
    reactions: Vec<Reaction<T>>,
}

/// Observe side of a single-settlement result.
pub struct Deferred<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

/// Settle side of a [`Deferred`].
pub struct Resolver<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: Clone + 'static> Deferred<T> {
    /// Create a pending handle and its resolver.
    pub fn pending() -> (Self, Resolver<T>) {
        Self::labeled("deferred")
    }

    /// Create a pending handle whose label shows up in traces.
    pub fn labeled(label: &'static str) -> (Self, Resolver<T>) {
        let shared = Rc::new(RefCell::new(Shared {
            label,
            state: Settlement::Pending,
            handled: false,
            wakers: Vec::new(),
            reactions: Vec::new(),
        }));
        (
            Self {
                shared: Rc::clone(&shared),
            },
            Resolver { shared },
        )
    }

    /// A handle that is already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        let (deferred, resolver) = Self::pending();
        resolver.resolve(value);
        deferred
    }

    /// A handle that is already rejected with `reason`.
    pub fn rejected(reason: TransitionError) -> Self {
        let (deferred, resolver) = Self::pending();
        deferred.mark_handled();
        resolver.reject(reason);
        deferred
    }

    pub fn status(&self) -> SettleStatus {
        match self.shared.borrow().state {
            Settlement::Pending => SettleStatus::Pending,
            Settlement::Fulfilled(_) => SettleStatus::Fulfilled,
            Settlement::Rejected(_) => SettleStatus::Rejected,
        }
    }

    /// The settled outcome, or `None` while pending. Marks the handle observed.
    pub fn result(&self) -> Option<Result<T, TransitionError>> {
        let mut shared = self.shared.borrow_mut();
        shared.handled = true;
        match &shared.state {
            Settlement::Pending => None,
            Settlement::Fulfilled(value) => Some(Ok(value.clone())),
            Settlement::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    /// The rejection reason, if rejected.
    pub fn rejection(&self) -> Option<TransitionError> {
        self.result().and_then(Result::err)
    }

    /// Mark a future rejection as handled so it is not traced as unobserved.
    pub fn mark_handled(&self) {
        self.shared.borrow_mut().handled = true;
    }

    pub fn is_handled(&self) -> bool {
        self.shared.borrow().handled
    }

    /// Run `reaction` once this handle settles.
    ///
    /// Reactions registered after settlement run immediately. Reactions run
    /// in registration order, after any wakers have been woken.
    pub fn on_settle(&self, reaction: impl FnOnce(Result<T, TransitionError>) + 'static) {
        let settled = {
            let mut shared = self.shared.borrow_mut();
            shared.handled = true;
            match &shared.state {
                Settlement::Pending => {
                    shared.reactions.push(Box::new(reaction));
                    return;
                }
                Settlement::Fulfilled(value) => Ok(value.clone()),
                Settlement::Rejected(reason) => Err(reason.clone()),
            }
        };
        reaction(settled);
    }

    /// Whether both handles observe the same settlement.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// Fulfill the handle. Returns `false` if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Reject the handle. Returns `false` if it was already settled.
    pub fn reject(&self, reason: TransitionError) -> bool {
        self.settle(Err(reason))
    }

    /// The observe side of this resolver.
    pub fn deferred(&self) -> Deferred<T> {
        Deferred {
            shared: Rc::clone(&self.shared),
        }
    }

    fn settle(&self, outcome: Result<T, TransitionError>) -> bool {
        let (wakers, reactions) = {
            let mut shared = self.shared.borrow_mut();
            if !matches!(shared.state, Settlement::Pending) {
                tracing::trace!(signal = shared.label, "ignoring repeated settlement");
                return false;
            }
            if let Err(reason) = &outcome {
                if !shared.handled {
                    tracing::debug!(signal = shared.label, %reason, "rejected with no observer");
                }
            }
            shared.state = match &outcome {
                Ok(value) => Settlement::Fulfilled(value.clone()),
                Err(reason) => Settlement::Rejected(reason.clone()),
            };
            (
                std::mem::take(&mut shared.wakers),
                std::mem::take(&mut shared.reactions),
            )
        };

        for waker in wakers {
            waker.wake();
        }
        for reaction in reactions {
            reaction(outcome.clone());
        }
        true
    }
}

impl<T: Clone + 'static> Future for Deferred<T> {
    type Output = Result<T, TransitionError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.borrow_mut();
        shared.handled = true;
        match &shared.state {
            Settlement::Fulfilled(value) => Poll::Ready(Ok(value.clone())),
            Settlement::Rejected(reason) => Poll::Ready(Err(reason.clone())),
            Settlement::Pending => {
                if !shared.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    shared.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        let status = match shared.state {
            Settlement::Pending => SettleStatus::Pending,
            Settlement::Fulfilled(_) => SettleStatus::Fulfilled,
            Settlement::Rejected(_) => SettleStatus::Rejected,
        };
        f.debug_struct("Deferred")
            .field("label", &shared.label)
            .field("status", &status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::cell::Cell;

    #[test]
    fn test_settles_once() {
        let (signal, resolver) = Deferred::<u32>::pending();
        assert_eq!(signal.status(), SettleStatus::Pending);

        assert!(resolver.resolve(7));
        assert!(!resolver.resolve(8));
        assert!(!resolver.reject(TransitionError::Aborted));

        assert_eq!(signal.status(), SettleStatus::Fulfilled);
        assert_eq!(signal.result().unwrap().unwrap(), 7);
    }

    #[test]
    fn test_reject_after_fulfill_is_noop() {
        let (signal, resolver) = Deferred::<()>::pending();
        resolver.reject(TransitionError::Aborted);
        resolver.resolve(());
        assert!(signal.rejection().unwrap().is_aborted());
    }

    #[test]
    fn test_reactions_run_in_order() {
        let (signal, resolver) = Deferred::<()>::pending();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = Rc::clone(&log);
            signal.on_settle(move |_| log.borrow_mut().push(i));
        }
        assert!(log.borrow().is_empty());

        resolver.resolve(());
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_late_reaction_runs_immediately() {
        let signal = Deferred::<()>::rejected(TransitionError::Timeout);
        let seen = Rc::new(Cell::new(false));
        let flag = Rc::clone(&seen);
        signal.on_settle(move |result| flag.set(matches!(result, Err(TransitionError::Timeout))));
        assert!(seen.get());
    }

    #[test]
    fn test_poll_through_future_impl() {
        let (signal, resolver) = Deferred::<&'static str>::pending();
        assert!(signal.clone().now_or_never().is_none());

        resolver.resolve("done");
        assert_eq!(signal.now_or_never().unwrap().unwrap(), "done");
    }

    #[test]
    fn test_block_on_settled_handle() {
        let signal = Deferred::resolved(3_u8);
        assert_eq!(futures::executor::block_on(signal).unwrap(), 3);
    }

    #[test]
    fn test_handled_flag() {
        let (signal, resolver) = Deferred::<()>::pending();
        assert!(!signal.is_handled());
        signal.mark_handled();
        assert!(signal.is_handled());
        resolver.reject(TransitionError::Aborted);
        assert_eq!(signal.status(), SettleStatus::Rejected);
    }

    #[test]
    fn test_resolver_observes_same_handle() {
        let (signal, resolver) = Deferred::<()>::pending();
        assert!(resolver.deferred().ptr_eq(&signal));
    }
}
