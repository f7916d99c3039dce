//! Keyframe definitions for transition presentation animations.
//!
//! This module provides:
//! - The user-agent animation names the generated rules refer to
//! - `GroupGeometry`: the size and position block a group animates from
//! - `GroupKeyframes`: the per-name `@keyframes` animating a group from its
//!   old geometry to its current geometry
//! - `AnimationPlayState`: what animation introspection reports per node

use serde::{Deserialize, Serialize};
use std::fmt;

use super::transform::Transform2D;

/// Opacity 0 → 1 on the new image.
pub const FADE_IN: &str = "-ua-view-transition-fade-in";

/// Opacity 1 → 0 on the old image.
pub const FADE_OUT: &str = "-ua-view-transition-fade-out";

/// Holds `mix-blend-mode: plus-lighter` for the animation duration so that
/// identical pixels of the old and new image sum to their original colour.
pub const PLUS_LIGHTER: &str = "-ua-mix-blend-mode-plus-lighter";

const GROUP_ANIMATION_PREFIX: &str = "-ua-view-transition-group-anim-";

/// Name of the group keyframes generated for `transition_name`.
pub fn group_animation_name(transition_name: &str) -> String {
    format!("{GROUP_ANIMATION_PREFIX}{transition_name}")
}

/// Current play state of an animation attached to a presentation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationPlayState {
    /// Not yet started or cancelled.
    Idle,
    /// Animation is running.
    #[default]
    Running,
    /// Animation is paused.
    Paused,
    /// Animation has reached its end.
    Finished,
}

impl AnimationPlayState {
    /// Running and paused animations keep a transition alive.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// Size and position of a group box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupGeometry {
    pub width: f64,
    pub height: f64,
    pub transform: Transform2D,
}

impl GroupGeometry {
    pub fn new(width: f64, height: f64, transform: Transform2D) -> Self {
        Self {
            width,
            height,
            transform,
        }
    }

    /// CSS declarations for this geometry, in `transform, width, height` order.
    pub fn declarations(&self) -> [(&'static str, String); 3] {
        [
            ("transform", self.transform.to_css()),
            ("width", format!("{}px", self.width)),
            ("height", format!("{}px", self.height)),
        ]
    }
}

/// `@keyframes` animating a group from its old geometry.
///
/// Only the `from` keyframe is given; the `to` keyframe is the group's
/// current geometry as set by its group styles rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupKeyframes {
    /// Name of the animation (see [`group_animation_name`]).
    pub name: String,
    /// Geometry at offset 0.
    pub from: GroupGeometry,
}

impl GroupKeyframes {
    pub fn for_transition_name(transition_name: &str, from: GroupGeometry) -> Self {
        Self {
            name: group_animation_name(transition_name),
            from,
        }
    }
}

impl fmt::Display for GroupKeyframes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@keyframes {} {{", self.name)?;
        writeln!(f, "  from {{")?;
        for (property, value) in self.from.declarations() {
            writeln!(f, "    {property}: {value};")?;
        }
        writeln!(f, "  }}")?;
        write!(f, "}}")
    }
}
