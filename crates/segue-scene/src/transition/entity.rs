//! The transition entity handed back by `begin`.
//!
//! A [`ViewTransition`] is a cheap, cloneable handle. Callers use it to
//! observe the three signals and to request a skip; the orchestrator uses the
//! crate-internal accessors to drive it through its phases.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use super::deferred::{Deferred, Resolver};
use super::error::TransitionError;
use super::pseudo::PseudoTree;
use super::record::{CapturedElement, NamedElements};
use super::scheduler::TaskQueue;
use super::types::{Phase, Size, TransitionId};

/// What an update callback produced.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Finished synchronously.
    Fulfilled,
    /// Failed synchronously.
    Rejected(TransitionError),
    /// Finishes when the handle settles.
    Pending(Deferred<()>),
}

impl UpdateOutcome {
    pub(crate) fn into_deferred(self) -> Deferred<()> {
        match self {
            Self::Fulfilled => Deferred::resolved(()),
            Self::Rejected(reason) => Deferred::rejected(reason),
            Self::Pending(deferred) => deferred,
        }
    }
}

impl From<()> for UpdateOutcome {
    fn from(_: ()) -> Self {
        Self::Fulfilled
    }
}

impl<E: Into<anyhow::Error>> From<Result<(), E>> for UpdateOutcome {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Fulfilled,
            Err(err) => Self::Rejected(TransitionError::callback(err)),
        }
    }
}

impl From<TransitionError> for UpdateOutcome {
    fn from(reason: TransitionError) -> Self {
        Self::Rejected(reason)
    }
}

impl From<Deferred<()>> for UpdateOutcome {
    fn from(deferred: Deferred<()>) -> Self {
        Self::Pending(deferred)
    }
}

/// The caller's scene mutation, run exactly once per transition.
pub struct UpdateCallback(Box<dyn FnOnce() -> UpdateOutcome>);

impl UpdateCallback {
    pub fn new<F, R>(f: F) -> Self
    where
        F: FnOnce() -> R + 'static,
        R: Into<UpdateOutcome>,
    {
        Self(Box::new(move || f().into()))
    }

    pub(crate) fn invoke(self) -> UpdateOutcome {
        (self.0)()
    }
}

impl fmt::Debug for UpdateCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UpdateCallback")
    }
}

struct Inner {
    id: TransitionId,
    phase: Cell<Phase>,
    named_elements: RefCell<NamedElements>,
    update_callback: RefCell<Option<UpdateCallback>>,
    callback_invoked: Cell<bool>,
    ready: Resolver<()>,
    update_callback_done: Resolver<()>,
    finished: Resolver<()>,
    presentation: RefCell<PseudoTree>,
    presentation_attached: Cell<bool>,
    initial_viewport: Cell<Option<Size>>,
    frames: Cell<u32>,
    skip_requested: Cell<bool>,
    tasks: TaskQueue,
}

/// One run of the transition lifecycle.
#[derive(Clone)]
pub struct ViewTransition {
    inner: Rc<Inner>,
}

impl ViewTransition {
    pub(crate) fn new(update_callback: Option<UpdateCallback>, tasks: TaskQueue) -> Self {
        let (_, ready) = Deferred::labeled("ready");
        let (_, update_callback_done) = Deferred::labeled("update_callback_done");
        let (finished_signal, finished) = Deferred::labeled("finished");
        finished_signal.mark_handled();

        Self {
            inner: Rc::new(Inner {
                id: TransitionId::new(),
                phase: Cell::new(Phase::PendingCapture),
                named_elements: RefCell::new(NamedElements::new()),
                update_callback: RefCell::new(update_callback),
                callback_invoked: Cell::new(false),
                ready,
                update_callback_done,
                finished,
                presentation: RefCell::new(PseudoTree::new()),
                presentation_attached: Cell::new(false),
                initial_viewport: Cell::new(None),
                frames: Cell::new(0),
                skip_requested: Cell::new(false),
                tasks,
            }),
        }
    }

    pub fn id(&self) -> TransitionId {
        self.inner.id
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    pub fn is_done(&self) -> bool {
        self.phase().is_done()
    }

    /// Fulfilled once the presentation is built and animating.
    pub fn ready(&self) -> Deferred<()> {
        self.inner.ready.deferred()
    }

    /// Settles with the outcome of the update callback.
    pub fn update_callback_done(&self) -> Deferred<()> {
        self.inner.update_callback_done.deferred()
    }

    /// Settles once the transition is over.
    pub fn finished(&self) -> Deferred<()> {
        self.inner.finished.deferred()
    }

    /// Skip this transition with [`TransitionError::Aborted`] at the next
    /// microtask checkpoint. Does nothing once the transition is done or a
    /// skip is already pending.
    pub fn request_skip(&self) {
        if self.is_done() || self.inner.skip_requested.replace(true) {
            return;
        }
        tracing::debug!(transition = %self.id(), "skip requested");
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        self.inner.tasks.enqueue(move |orchestrator| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let transition = ViewTransition { inner };
            if !transition.is_done() {
                orchestrator.skip_transition(&transition, TransitionError::Aborted);
            }
        });
    }

    /// Captured transition names in discovery order.
    pub fn transition_names(&self) -> Vec<String> {
        self.inner
            .named_elements
            .borrow()
            .names()
            .map(str::to_string)
            .collect()
    }

    /// A copy of the record captured for `name`.
    pub fn captured_element(&self, name: &str) -> Option<CapturedElement> {
        self.inner.named_elements.borrow().get(name).cloned()
    }

    /// Viewport size frozen by the old-state capture.
    pub fn initial_viewport_size(&self) -> Option<Size> {
        self.inner.initial_viewport.get()
    }

    /// Run `f` against the presentation tree.
    pub fn with_presentation<R>(&self, f: impl FnOnce(&PseudoTree) -> R) -> R {
        f(&self.inner.presentation.borrow())
    }

    /// Whether both handles refer to the same transition.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn set_phase(&self, phase: Phase) -> Phase {
        self.inner.phase.replace(phase)
    }

    pub(crate) fn take_update_callback(&self) -> Option<UpdateCallback> {
        self.inner.update_callback.borrow_mut().take()
    }

    /// Marks the callback invoked; returns whether it already was.
    pub(crate) fn mark_callback_invoked(&self) -> bool {
        self.inner.callback_invoked.replace(true)
    }

    pub(crate) fn ready_resolver(&self) -> &Resolver<()> {
        &self.inner.ready
    }

    pub(crate) fn update_callback_done_resolver(&self) -> &Resolver<()> {
        &self.inner.update_callback_done
    }

    pub(crate) fn finished_resolver(&self) -> &Resolver<()> {
        &self.inner.finished
    }

    pub(crate) fn named_elements(&self) -> Ref<'_, NamedElements> {
        self.inner.named_elements.borrow()
    }

    pub(crate) fn named_elements_mut(&self) -> RefMut<'_, NamedElements> {
        self.inner.named_elements.borrow_mut()
    }

    pub(crate) fn presentation_mut(&self) -> RefMut<'_, PseudoTree> {
        self.inner.presentation.borrow_mut()
    }

    pub(crate) fn set_presentation_attached(&self, attached: bool) -> bool {
        self.inner.presentation_attached.replace(attached)
    }

    pub(crate) fn freeze_viewport(&self, size: Size) {
        self.inner.initial_viewport.set(Some(size));
    }

    /// Count one frame; returns the new total.
    pub(crate) fn count_frame(&self) -> u32 {
        let frames = self.inner.frames.get().saturating_add(1);
        self.inner.frames.set(frames);
        frames
    }
}

impl fmt::Debug for ViewTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewTransition")
            .field("id", &self.id())
            .field("phase", &self.phase())
            .field("names", &self.transition_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::deferred::SettleStatus;

    fn transition(callback: Option<UpdateCallback>) -> ViewTransition {
        ViewTransition::new(callback, TaskQueue::new())
    }

    #[test]
    fn test_new_transition_is_pending_capture() {
        let t = transition(None);
        assert_eq!(t.phase(), Phase::PendingCapture);
        assert_eq!(t.ready().status(), SettleStatus::Pending);
        assert!(t.finished().is_handled());
        assert!(!t.ready().is_handled());
        assert!(t.initial_viewport_size().is_none());
    }

    #[test]
    fn test_request_skip_enqueues_once() {
        let tasks = TaskQueue::new();
        let t = ViewTransition::new(None, tasks.clone());
        t.request_skip();
        t.request_skip();
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_request_skip_after_done_is_ignored() {
        let tasks = TaskQueue::new();
        let t = ViewTransition::new(None, tasks.clone());
        t.set_phase(Phase::Done);
        t.request_skip();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_update_outcome_conversions() {
        assert!(matches!(UpdateOutcome::from(()), UpdateOutcome::Fulfilled));
        assert!(matches!(
            UpdateOutcome::from(Err::<(), _>(anyhow::anyhow!("nope"))),
            UpdateOutcome::Rejected(TransitionError::Callback(_))
        ));
        let (pending, _resolver) = Deferred::<()>::pending();
        assert!(matches!(
            UpdateOutcome::from(pending),
            UpdateOutcome::Pending(_)
        ));
    }

    #[test]
    fn test_callback_runs_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let t = transition(Some(UpdateCallback::new(move || counter.set(counter.get() + 1))));

        assert!(!t.mark_callback_invoked());
        if let Some(callback) = t.take_update_callback() {
            callback.invoke();
        }
        assert!(t.mark_callback_invoked());
        assert!(t.take_update_callback().is_none());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_count_frames() {
        let t = transition(None);
        assert_eq!(t.count_frame(), 1);
        assert_eq!(t.count_frame(), 2);
    }
}
