//! View transition lifecycle.
//!
//! This module provides:
//! - **Orchestrator**: the state machine taking a transition from capture to done
//! - **Capture passes**: old-state and new-state snapshots keyed by transition name
//! - **Presentation**: the pseudo-element tree and the generated style layer
//! - **Signals**: `ready`, `updateCallbackDone` and `finished` as single-settlement handles
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   ├── active ViewTransition
//!   │     ├── NamedElements (CapturedElement per name)
//!   │     ├── PseudoTree (presentation nodes)
//!   │     └── Resolver ×3 (ready / update_callback_done / finished)
//!   ├── StyleLayer (generated rules, partitioned by record)
//!   ├── TaskQueue (microtasks)
//!   └── Rc<dyn SceneHost> (visibility, styles, geometry, captures, animations)
//! ```

pub mod capture;
pub mod deferred;
pub mod entity;
pub mod error;
pub mod events;
pub mod host;
pub mod keyframes;
pub mod orchestrator;
pub mod pseudo;
pub mod record;
pub mod scheduler;
pub mod style_layer;
pub mod transform;
pub mod types;

pub use capture::{capture_image, capture_new_state, capture_old_state, capture_region};
pub use deferred::{Deferred, Resolver, SettleStatus};
pub use entity::{UpdateCallback, UpdateOutcome, ViewTransition};
pub use error::{CaptureError, CaptureResult, TransitionError};
pub use events::{EventQueue, LifecycleEvent};
pub use host::{CaptureRegion, CaptureService, SceneHost, Snapshot};
pub use keyframes::{AnimationPlayState, GroupGeometry, GroupKeyframes};
pub use orchestrator::Orchestrator;
pub use pseudo::{
    PseudoElement, PseudoId, PseudoKind, PseudoSelector, PseudoTree,
    setup_transition_pseudo_elements, update_pseudo_element_styles,
};
pub use record::{CapturedElement, NamedElements, StyleDefinitions};
pub use scheduler::{Task, TaskQueue};
pub use style_layer::{RuleId, RuleKind, StyleLayer, StyleRule};
pub use transform::Transform2D;
pub use types::{CapturedStyles, ComputedStyle, NodeId, Phase, Rect, Size, TransitionId};
