//! Lifecycle orchestrator.
//!
//! The `Orchestrator` owns the process-wide transition state: the active
//! transition slot, the rendering suppression flag, the update callback
//! queue, the set of nodes captured in a transition, and the generated style
//! layer. It drives each transition through its phases:
//!
//! ```text
//! pending-capture ──setup──▶ (microtask) update callback ──▶ update-callback-called
//!        │                                                         │
//!        │                                            fulfilled ──▶ activate ──▶ animating
//!        │                                            rejected  ──▶ done
//!        ▼                                                         ▼
//!       done ◀──── skip (any phase) ◀──── frame check: no animations / viewport drift
//! ```
//!
//! Every step is a function returning `Result<(), TransitionError>`; a step
//! that fails hands its error to [`Orchestrator::skip_transition`] through one
//! driver, so no failure path can forget to skip.
//!
//! Nothing here runs on its own. The embedder drains microtasks and delivers
//! frame ticks through [`run_microtasks`](Orchestrator::run_microtasks),
//! [`frame`](Orchestrator::frame) or [`run_until_idle`](Orchestrator::run_until_idle).
//!
//! # Usage
//!
//! ```ignore
//! use std::rc::Rc;
//! use segue_scene::HeadlessScene;
//! use segue_scene::transition::{Orchestrator, UpdateCallback};
//!
//! let scene = Rc::new(HeadlessScene::new(Size::new(800.0, 600.0)));
//! let card = scene.add_node(Some("card"), Rect::new(0.0, 0.0, 100.0, 100.0));
//! let mut orchestrator = Orchestrator::new(scene.clone());
//!
//! let handle = Rc::clone(&scene);
//! let transition = orchestrator.begin(Some(UpdateCallback::new(move || {
//!     handle.set_bounds(card, Rect::new(200.0, 0.0, 100.0, 100.0));
//! })));
//!
//! orchestrator.run_until_idle(120);
//! assert!(transition.finished().result().unwrap().is_ok());
//! ```

use std::collections::HashSet;
use std::rc::Rc;

use segue_config::{CaptureConfig, SegueConfig, TransitionConfig};

use super::capture::{capture_new_state, capture_old_state};
use super::entity::{UpdateCallback, ViewTransition};
use super::error::TransitionError;
use super::events::{EventQueue, LifecycleEvent};
use super::host::SceneHost;
use super::keyframes::AnimationPlayState;
use super::pseudo::{setup_transition_pseudo_elements, update_pseudo_element_styles};
use super::scheduler::TaskQueue;
use super::style_layer::StyleLayer;
use super::types::{NodeId, Phase};

type Step = fn(&mut Orchestrator, &ViewTransition) -> Result<(), TransitionError>;

/// Drives view transitions against a [`SceneHost`].
pub struct Orchestrator {
    host: Rc<dyn SceneHost>,
    transitions: TransitionConfig,
    capture: CaptureConfig,

    /// At most one transition is active at a time.
    active: Option<ViewTransition>,

    /// True between the old-state capture and activation.
    rendering_suppressed: bool,

    /// Transitions whose update callback is due at the next flush.
    update_callback_queue: Vec<ViewTransition>,

    /// Nodes currently captured in a view transition.
    captured: HashSet<NodeId>,

    style_layer: StyleLayer,
    tasks: TaskQueue,

    /// A frame tick is due.
    frame_armed: bool,

    /// A pending-operations microtask is already queued.
    pending_ops_queued: bool,

    events: EventQueue,
}

impl Orchestrator {
    pub fn new(host: Rc<dyn SceneHost>) -> Self {
        Self::with_config(host, &SegueConfig::default())
    }

    pub fn with_config(host: Rc<dyn SceneHost>, config: &SegueConfig) -> Self {
        Self {
            host,
            transitions: config.transitions.clone(),
            capture: config.capture.clone(),
            active: None,
            rendering_suppressed: false,
            update_callback_queue: Vec::new(),
            captured: HashSet::new(),
            style_layer: StyleLayer::new(),
            tasks: TaskQueue::new(),
            frame_armed: false,
            pending_ops_queued: false,
            events: EventQueue::new(),
        }
    }

    /// Start a transition.
    ///
    /// In a hidden scene the returned transition is already done and its
    /// `ready` signal rejected. Otherwise any active transition is skipped
    /// with [`TransitionError::Aborted`], the new one becomes active, and its
    /// setup runs at the next microtask checkpoint.
    pub fn begin(&mut self, update_callback: Option<UpdateCallback>) -> ViewTransition {
        let transition = ViewTransition::new(update_callback, self.tasks.clone());
        tracing::debug!(transition = %transition.id(), "begin view transition");
        self.events.push(LifecycleEvent::Started {
            transition: transition.id(),
        });

        if !self.host.is_scene_visible() {
            self.skip(
                &transition,
                TransitionError::invalid_state("scene is not visible"),
            );
            return transition;
        }

        if let Some(previous) = self.active.clone() {
            self.skip(&previous, TransitionError::Aborted);
        }

        self.active = Some(transition.clone());
        self.queue_pending_operations();
        transition
    }

    /// Skip `transition` with `reason` now. Does nothing if it is done.
    pub fn skip_transition(&mut self, transition: &ViewTransition, reason: TransitionError) {
        if transition.is_done() {
            tracing::trace!(transition = %transition.id(), "skip of finished transition ignored");
            return;
        }
        self.skip(transition, reason);
    }

    /// Run queued microtasks until the queue is empty, including tasks queued
    /// while draining.
    pub fn run_microtasks(&mut self) {
        while let Some(task) = self.tasks.pop() {
            task(self);
        }
    }

    /// Render one frame: drain microtasks, run the frame tick if one is due,
    /// then drain microtasks again.
    pub fn frame(&mut self) {
        self.run_microtasks();
        self.host.frame_rendered();
        if std::mem::take(&mut self.frame_armed) {
            self.check_deadline();
            self.perform_pending_operations();
        }
        self.run_microtasks();
    }

    /// Render frames until nothing is active or queued, or `max_frames` have
    /// run. Returns the number of frames rendered.
    pub fn run_until_idle(&mut self, max_frames: u32) -> u32 {
        self.run_microtasks();
        let mut frames = 0;
        while self.has_pending_work() && frames < max_frames {
            self.frame();
            frames += 1;
        }
        frames
    }

    pub fn has_pending_work(&self) -> bool {
        self.active.is_some() || !self.tasks.is_empty()
    }

    pub fn active_transition(&self) -> Option<&ViewTransition> {
        self.active.as_ref()
    }

    pub fn rendering_suppressed(&self) -> bool {
        self.rendering_suppressed
    }

    /// Whether `node` is flagged as captured in a view transition.
    pub fn is_captured(&self, node: NodeId) -> bool {
        self.captured.contains(&node)
    }

    pub fn captured_count(&self) -> usize {
        self.captured.len()
    }

    pub fn style_layer(&self) -> &StyleLayer {
        &self.style_layer
    }

    /// Lifecycle events recorded since the last [`drain_events`](Self::drain_events).
    ///
    /// Every transition appends to this queue and nothing trims it, so a
    /// long-running embedder must drain it regularly.
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Take every recorded event, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        self.events.drain().collect()
    }

    fn is_active(&self, transition: &ViewTransition) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.ptr_eq(transition))
    }

    fn queue_pending_operations(&mut self) {
        if self.pending_ops_queued {
            return;
        }
        self.pending_ops_queued = true;
        self.tasks.enqueue(|orchestrator| {
            orchestrator.pending_ops_queued = false;
            orchestrator.perform_pending_operations();
        });
    }

    /// The per-frame tick.
    fn perform_pending_operations(&mut self) {
        let Some(transition) = self.active.clone() else {
            return;
        };
        if transition.phase() == Phase::PendingCapture {
            self.drive(&transition, Self::setup);
        }
        if transition.phase() == Phase::Animating {
            self.drive(&transition, Self::frame_check);
        }
        if self.active.is_some() {
            self.frame_armed = true;
        }
    }

    /// Run `step`, skipping the transition with the step's error.
    fn drive(&mut self, transition: &ViewTransition, step: Step) {
        if let Err(reason) = step(self, transition) {
            if transition.is_done() {
                tracing::trace!(transition = %transition.id(), %reason, "step failed after done");
            } else {
                self.skip(transition, reason);
            }
        }
    }

    fn set_phase(&mut self, transition: &ViewTransition, phase: Phase) {
        let from = transition.phase();
        if from == phase {
            return;
        }
        if !from.can_advance_to(phase) {
            tracing::warn!(transition = %transition.id(), %from, to = %phase, "refusing to move phase backwards");
            return;
        }
        transition.set_phase(phase);
        tracing::debug!(transition = %transition.id(), %from, to = %phase, "phase changed");
        self.events.push(LifecycleEvent::PhaseChanged {
            transition: transition.id(),
            from,
            to: phase,
        });
    }

    fn check_deadline(&mut self) {
        let Some(transition) = self.active.clone() else {
            return;
        };
        let frames = transition.count_frame();
        let Some(limit) = self.transitions.timeout_frames else {
            return;
        };
        if frames > limit && !transition.is_done() {
            tracing::warn!(transition = %transition.id(), frames, "transition timed out");
            self.skip(&transition, TransitionError::Timeout);
        }
    }

    fn check_viewport(&self, transition: &ViewTransition) -> Result<(), TransitionError> {
        let current = self.host.viewport_size();
        match transition.initial_viewport_size() {
            Some(frozen) if frozen == current => Ok(()),
            frozen => Err(TransitionError::invalid_state(format!(
                "snapshot containing block changed from {frozen:?} to {current:?}"
            ))),
        }
    }

    fn setup(&mut self, transition: &ViewTransition) -> Result<(), TransitionError> {
        tracing::debug!(transition = %transition.id(), "setup");
        self.flush_update_callback_queue();

        let host = Rc::clone(&self.host);
        capture_old_state(transition, host.as_ref(), &mut self.captured, &self.capture)?;
        self.rendering_suppressed = true;

        let transition = transition.clone();
        self.tasks.enqueue(move |orchestrator| {
            if transition.is_done() {
                return;
            }
            orchestrator.schedule_update_callback(&transition);
            orchestrator.flush_update_callback_queue();
        });
        Ok(())
    }

    fn schedule_update_callback(&mut self, transition: &ViewTransition) {
        tracing::trace!(transition = %transition.id(), "schedule update callback");
        self.update_callback_queue.push(transition.clone());
        self.tasks
            .enqueue(|orchestrator| orchestrator.flush_update_callback_queue());
    }

    fn flush_update_callback_queue(&mut self) {
        let queue = std::mem::take(&mut self.update_callback_queue);
        for transition in &queue {
            self.invoke_update_callback(transition);
        }
    }

    fn invoke_update_callback(&mut self, transition: &ViewTransition) {
        let phase = transition.phase();
        if !(phase.is_done() || phase < Phase::UpdateCallbackCalled) {
            tracing::warn!(transition = %transition.id(), %phase, "update callback invoked out of phase");
            return;
        }
        if transition.mark_callback_invoked() {
            tracing::trace!(transition = %transition.id(), "update callback already invoked");
            return;
        }
        if !phase.is_done() {
            self.set_phase(transition, Phase::UpdateCallbackCalled);
        }

        tracing::debug!(transition = %transition.id(), "invoke update callback");
        let outcome = match transition.take_update_callback() {
            Some(callback) => callback.invoke(),
            None => ().into(),
        };

        let tasks = self.tasks.clone();
        let transition = transition.clone();
        outcome.into_deferred().on_settle(move |result| {
            tasks.enqueue(move |orchestrator| {
                orchestrator.update_callback_settled(&transition, result)
            });
        });
    }

    fn update_callback_settled(
        &mut self,
        transition: &ViewTransition,
        result: Result<(), TransitionError>,
    ) {
        match result {
            Ok(()) => {
                transition.update_callback_done_resolver().resolve(());
                self.drive(transition, Self::activate);
            }
            Err(reason) => {
                tracing::debug!(transition = %transition.id(), %reason, "update callback rejected");
                transition
                    .update_callback_done_resolver()
                    .reject(reason.clone());
                if transition.is_done() {
                    return;
                }
                transition.ready().mark_handled();
                self.skip(transition, reason);
            }
        }
    }

    fn activate(&mut self, transition: &ViewTransition) -> Result<(), TransitionError> {
        if transition.is_done() {
            return Ok(());
        }
        tracing::debug!(transition = %transition.id(), "activate");
        self.rendering_suppressed = false;
        self.check_viewport(transition)?;

        let host = Rc::clone(&self.host);
        capture_new_state(transition, host.as_ref())?;

        for (_, record) in transition.named_elements().iter() {
            if let Some(node) = record.new_element {
                self.captured.insert(node);
            }
        }

        {
            let mut named = transition.named_elements_mut();
            let mut tree = transition.presentation_mut();
            setup_transition_pseudo_elements(&mut named, &mut tree, &mut self.style_layer)?;
            update_pseudo_element_styles(&mut named, &mut tree, host.as_ref(), &mut self.style_layer)?;
        }

        if !transition.set_presentation_attached(true) {
            transition.with_presentation(|tree| host.attach_presentation(tree, transition.id()));
        }

        self.set_phase(transition, Phase::Animating);
        transition.ready_resolver().resolve(());
        Ok(())
    }

    fn frame_check(&mut self, transition: &ViewTransition) -> Result<(), TransitionError> {
        let host = Rc::clone(&self.host);
        let has_active_animations = transition.with_presentation(|tree| {
            tree.descendants().into_iter().any(|element| {
                host.animations(element)
                    .into_iter()
                    .any(AnimationPlayState::is_active)
            })
        });

        if !has_active_animations {
            self.set_phase(transition, Phase::Done);
            self.clear(transition);
            transition.finished_resolver().resolve(());
            tracing::debug!(transition = %transition.id(), "transition finished");
            self.events.push(LifecycleEvent::Finished {
                transition: transition.id(),
            });
            return Ok(());
        }

        self.check_viewport(transition)
    }

    fn skip(&mut self, transition: &ViewTransition, reason: TransitionError) {
        if transition.is_done() {
            return;
        }
        tracing::debug!(
            transition = %transition.id(),
            phase = %transition.phase(),
            %reason,
            "skip view transition"
        );

        if transition.phase() < Phase::UpdateCallbackCalled {
            self.schedule_update_callback(transition);
        }
        self.rendering_suppressed = false;
        if self.is_active(transition) {
            self.clear(transition);
        }
        self.set_phase(transition, Phase::Done);
        self.events.push(LifecycleEvent::Skipped {
            transition: transition.id(),
            reason: reason.to_string(),
        });

        transition.ready_resolver().reject(reason);
        transition.update_callback_done_resolver().resolve(());
        match transition.update_callback_done().result() {
            Some(Err(reason)) => transition.finished_resolver().reject(reason),
            _ => transition.finished_resolver().resolve(()),
        };
    }

    fn clear(&mut self, transition: &ViewTransition) {
        if !self.is_active(transition) {
            tracing::warn!(transition = %transition.id(), "clear of inactive transition ignored");
            return;
        }

        let mut released = 0;
        for (_, record) in transition.named_elements_mut().iter_mut() {
            if let Some(node) = record.new_element {
                self.captured.remove(&node);
            }
            released += record.style_definitions.release(&mut self.style_layer);
        }
        if transition.set_presentation_attached(false) {
            self.host.detach_presentation(transition.id());
        }
        self.active = None;
        tracing::debug!(transition = %transition.id(), released, "cleared view transition");
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("active", &self.active.as_ref().map(ViewTransition::id))
            .field("rendering_suppressed", &self.rendering_suppressed)
            .field("captured", &self.captured.len())
            .field("rules", &self.style_layer.len())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}
