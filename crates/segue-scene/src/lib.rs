//! View transition lifecycle engine.
//!
//! A caller asks for a transition between two states of a scene. The engine
//! snapshots the old state, runs the caller's update callback, snapshots the
//! new state, builds a presentation tree with generated animation rules, and
//! reports progress through three signals (`ready`, `update_callback_done`,
//! `finished`).
//!
//! The scene itself is behind [`transition::SceneHost`]; [`HeadlessScene`] is
//! an in-memory implementation for tests and tools.

pub mod headless;
pub mod transition;

pub use headless::HeadlessScene;
pub use transition::{
    Deferred, LifecycleEvent, Orchestrator, Phase, SceneHost, TransitionError, UpdateCallback,
    UpdateOutcome, ViewTransition,
};
