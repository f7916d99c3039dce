//! Core transition types and data structures.
//!
//! This module defines the fundamental types shared by the lifecycle:
//! - `TransitionId`: Unique identifier for a transition run
//! - `Phase`: Ordered lifecycle phase of a transition
//! - `NodeId`: Handle to a visual node owned by the scene host
//! - `Size` / `Rect`: Viewport and box geometry
//! - `ComputedStyle` / `CapturedStyles`: Style introspection results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a transition instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(pub u64);

impl TransitionId {
    /// Generate a new unique transition ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vt#{}", self.0)
    }
}

/// Lifecycle phase of a transition.
///
/// Phases are ordered; a transition only ever moves forward, except that any
/// phase may jump straight to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Waiting for the old state to be captured.
    #[default]
    PendingCapture,
    /// The update callback has been invoked.
    UpdateCallbackCalled,
    /// Presentation animations are running.
    Animating,
    /// Terminal.
    Done,
}

impl Phase {
    /// Whether moving from `self` to `next` is allowed.
    pub fn can_advance_to(self, next: Phase) -> bool {
        next == Phase::Done || next > self
    }

    /// Whether this is the terminal phase.
    pub fn is_done(self) -> bool {
        self == Phase::Done
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::PendingCapture => "pending-capture",
            Phase::UpdateCallbackCalled => "update-callback-called",
            Phase::Animating => "animating",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Handle to a visual node in the host scene.
///
/// The transition never owns scene nodes; a `NodeId` is a lookup key the host
/// resolves on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rect at the origin covering `size`.
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// The style scalars a capture records for a named element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedStyles {
    pub writing_mode: String,
    pub direction: String,
    pub text_orientation: String,
    pub mix_blend_mode: String,
    pub backdrop_filter: String,
    pub color_scheme: String,
}

impl Default for CapturedStyles {
    /// Initial values of the captured properties.
    fn default() -> Self {
        Self {
            writing_mode: "horizontal-tb".to_string(),
            direction: "ltr".to_string(),
            text_orientation: "mixed".to_string(),
            mix_blend_mode: "normal".to_string(),
            backdrop_filter: "none".to_string(),
            color_scheme: "normal".to_string(),
        }
    }
}

/// Result of style introspection on a scene node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedStyle {
    /// Document-scoped transition name; `None` is `view-transition-name: none`.
    pub transition_name: Option<String>,
    #[serde(flatten)]
    pub captured: CapturedStyles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_ids_are_unique() {
        let a = TransitionId::new();
        let b = TransitionId::new();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_phase_ordering() {
        assert!(Phase::PendingCapture < Phase::UpdateCallbackCalled);
        assert!(Phase::UpdateCallbackCalled < Phase::Animating);
        assert!(Phase::Animating < Phase::Done);
    }

    #[test]
    fn test_phase_advance_rules() {
        assert!(Phase::PendingCapture.can_advance_to(Phase::UpdateCallbackCalled));
        assert!(Phase::PendingCapture.can_advance_to(Phase::Done));
        assert!(Phase::Animating.can_advance_to(Phase::Done));
        assert!(!Phase::Animating.can_advance_to(Phase::UpdateCallbackCalled));
        assert!(!Phase::Animating.can_advance_to(Phase::Animating));
    }

    #[test]
    fn test_phase_serde_names() {
        let json = serde_json::to_string(&Phase::UpdateCallbackCalled).unwrap();
        assert_eq!(json, "\"update-callback-called\"");
        assert_eq!(Phase::PendingCapture.to_string(), "pending-capture");
    }

    #[test]
    fn test_rect_from_size() {
        let rect = Rect::from_size(Size::new(800.0, 600.0));
        assert_eq!(rect, Rect::new(0.0, 0.0, 800.0, 600.0));
        assert_eq!(rect.size(), Size::new(800.0, 600.0));
    }
}
