//! 2D affine transforms for snapshot geometry.
//!
//! Captured elements record where their border box sits relative to the
//! snapshot containing block origin as a `Transform2D`. Group keyframes and
//! group style rules serialize it as a CSS `matrix(...)`.
//!
//! # Usage
//!
//! ```ignore
//! use segue_scene::transition::transform::Transform2D;
//!
//! let offset = Transform2D::translate(100.0, 50.0);
//! assert_eq!(offset.to_css(), "matrix(1, 0, 0, 1, 100, 50)");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::Rect;

/// A 2D affine transformation matrix.
///
/// Stored as a 3x2 matrix (the bottom row [0, 0, 1] is implicit):
/// ```text
/// | a  c  tx |
/// | b  d  ty |
/// | 0  0  1  |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// Scale X (matrix element a)
    pub a: f64,
    /// Skew Y (matrix element b)
    pub b: f64,
    /// Skew X (matrix element c)
    pub c: f64,
    /// Scale Y (matrix element d)
    pub d: f64,
    /// Translate X (matrix element tx)
    pub tx: f64,
    /// Translate Y (matrix element ty)
    pub ty: f64,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    /// Create an identity transform (no change).
    pub fn identity() -> Self {
        Self::translate(0.0, 0.0)
    }

    /// Create a translation transform.
    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx,
            ty,
        }
    }

    /// Transform mapping a border box from the snapshot containing block
    /// origin to its current visual position.
    pub fn for_border_box(rect: &Rect) -> Self {
        Self::translate(rect.x, rect.y)
    }

    /// Check if this is approximately an identity transform.
    pub fn is_identity(&self, epsilon: f64) -> bool {
        (self.a - 1.0).abs() < epsilon
            && self.b.abs() < epsilon
            && self.c.abs() < epsilon
            && (self.d - 1.0).abs() < epsilon
            && self.tx.abs() < epsilon
            && self.ty.abs() < epsilon
    }

    /// CSS `matrix(a, b, c, d, tx, ty)` serialization.
    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Transform2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "matrix({}, {}, {}, {}, {}, {})",
            self.a, self.b, self.c, self.d, self.tx, self.ty
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_identity() {
        assert!(Transform2D::identity().is_identity(EPSILON));
        assert_eq!(Transform2D::default(), Transform2D::identity());
    }

    #[test]
    fn test_border_box_transform() {
        let t = Transform2D::for_border_box(&Rect::new(12.5, 40.0, 100.0, 80.0));
        assert_eq!(t, Transform2D::translate(12.5, 40.0));
        assert!(!t.is_identity(EPSILON));
    }

    #[test]
    fn test_css_serialization() {
        assert_eq!(
            Transform2D::identity().to_css(),
            "matrix(1, 0, 0, 1, 0, 0)"
        );
        assert_eq!(
            Transform2D::translate(12.5, -4.0).to_css(),
            "matrix(1, 0, 0, 1, 12.5, -4)"
        );
    }
}
