//! Lifecycle events.
//!
//! The orchestrator records what happened to each transition in an
//! [`EventQueue`]. Events can be drained after each frame to log, assert on,
//! or react to lifecycle changes without subscribing to the three signals.
//!
//! # Usage
//!
//! ```ignore
//! use segue_scene::transition::{LifecycleEvent, Orchestrator};
//!
//! orchestrator.frame();
//! for event in orchestrator.drain_events() {
//!     if let LifecycleEvent::Skipped { transition, reason } = event {
//!         println!("{transition} skipped: {reason}");
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::types::{Phase, TransitionId};

/// Something that happened to a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// `begin` created the transition.
    Started { transition: TransitionId },
    /// The transition moved to a later phase.
    PhaseChanged {
        transition: TransitionId,
        from: Phase,
        to: Phase,
    },
    /// The transition was skipped.
    Skipped {
        transition: TransitionId,
        /// Display form of the skip reason.
        reason: String,
    },
    /// All presentation animations ended and `finished` was fulfilled.
    Finished { transition: TransitionId },
}

impl LifecycleEvent {
    pub fn transition(&self) -> TransitionId {
        match self {
            Self::Started { transition }
            | Self::PhaseChanged { transition, .. }
            | Self::Skipped { transition, .. }
            | Self::Finished { transition } => *transition,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// FIFO of lifecycle events.
///
/// Unbounded; the owner drains it with [`EventQueue::drain`].
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<LifecycleEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: LifecycleEvent) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn pop(&mut self) -> Option<LifecycleEvent> {
        self.events.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = LifecycleEvent> + '_ {
        self.events.drain(..)
    }

    /// Events recorded for one transition.
    pub fn events_for(&self, transition: TransitionId) -> Vec<&LifecycleEvent> {
        self.events
            .iter()
            .filter(|e| e.transition() == transition)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let id = TransitionId(7);
        let event = LifecycleEvent::Skipped {
            transition: id,
            reason: "transition aborted".to_string(),
        };
        assert_eq!(event.transition(), id);
        assert!(event.is_skipped());
        assert!(!LifecycleEvent::Finished { transition: id }.is_skipped());
    }

    #[test]
    fn test_queue_filters_by_transition() {
        let mut queue = EventQueue::new();
        queue.push(LifecycleEvent::Started {
            transition: TransitionId(1),
        });
        queue.push(LifecycleEvent::Started {
            transition: TransitionId(2),
        });
        queue.push(LifecycleEvent::PhaseChanged {
            transition: TransitionId(1),
            from: Phase::PendingCapture,
            to: Phase::UpdateCallbackCalled,
        });

        assert_eq!(queue.events_for(TransitionId(1)).len(), 2);
        assert_eq!(queue.len(), 3);

        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained.len(), 3);
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_event_serde_tag() {
        let json = serde_json::to_string(&LifecycleEvent::Finished {
            transition: TransitionId(3),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"finished","transition":3}"#);
    }
}
