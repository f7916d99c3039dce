//! The scene host boundary.
//!
//! The lifecycle never walks a real scene graph. Everything it needs to know
//! about the scene (visibility, styles, geometry, paint order, running
//! animations) and the one thing it needs done to it (rasterize a node) comes
//! through [`SceneHost`].
//!
//! Host methods take `&self`; hosts that keep mutable state use interior
//! mutability, since update callbacks mutate the scene while the lifecycle
//! holds a shared handle to it.

use image::RgbaImage;
use std::fmt;
use std::rc::Rc;

use super::error::CaptureError;
use super::keyframes::AnimationPlayState;
use super::pseudo::{PseudoElement, PseudoTree};
use super::types::{ComputedStyle, NodeId, Rect, Size, TransitionId};

/// A rasterized capture of a node.
///
/// Cheap to clone; clones share the pixel buffer.
#[derive(Clone)]
pub struct Snapshot(Rc<RgbaImage>);

impl Snapshot {
    pub fn new(image: RgbaImage) -> Self {
        Self(Rc::new(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.0
    }

    /// Whether both handles share one capture.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({}x{})", self.width(), self.height())
    }
}

/// The area of the scene a capture covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureRegion {
    /// The whole snapshot containing block; used for the document element.
    Viewport(Size),
    /// A node's border box in viewport coordinates.
    BorderBox(Rect),
}

impl CaptureRegion {
    pub fn rect(&self) -> Rect {
        match self {
            Self::Viewport(size) => Rect::from_size(*size),
            Self::BorderBox(rect) => *rect,
        }
    }
}

/// Turns a visual node into an image.
pub trait CaptureService {
    fn capture_image(&self, node: NodeId, region: CaptureRegion) -> Result<Snapshot, CaptureError>;
}

/// Everything the lifecycle reads from, or asks of, the host scene.
pub trait SceneHost: CaptureService {
    /// Whether the scene as a whole is visible. Transitions never start in a
    /// hidden scene.
    fn is_scene_visible(&self) -> bool;

    /// Current snapshot containing block size.
    fn viewport_size(&self) -> Size;

    /// Nodes eligible for the old-state capture, top-most first.
    fn old_nodes(&self) -> Vec<NodeId>;

    /// Nodes eligible for the new-state capture, top-most first.
    fn new_nodes(&self) -> Vec<NodeId>;

    fn is_document_element(&self, node: NodeId) -> bool;

    fn is_visible(&self, node: NodeId) -> bool;

    fn computed_style(&self, node: NodeId) -> ComputedStyle;

    /// Border box in viewport coordinates.
    fn bounding_box(&self, node: NodeId) -> Rect;

    /// Play states of the animations currently attached to a presentation node.
    fn animations(&self, element: &PseudoElement) -> Vec<AnimationPlayState>;

    /// Called once per rendered frame, before the lifecycle's frame tick.
    fn frame_rendered(&self) {}

    /// The transition's presentation tree is now shown over the scene.
    fn attach_presentation(&self, _tree: &PseudoTree, _transition: TransitionId) {}

    /// The transition's presentation tree is gone.
    fn detach_presentation(&self, _transition: TransitionId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_snapshot_clones_share_pixels() {
        let snapshot = Snapshot::new(RgbaImage::from_pixel(4, 2, Rgba([1, 2, 3, 255])));
        let copy = snapshot.clone();
        assert!(snapshot.ptr_eq(&copy));
        assert_eq!((copy.width(), copy.height()), (4, 2));
        assert_eq!(format!("{snapshot:?}"), "Snapshot(4x2)");
    }

    #[test]
    fn test_capture_region_rect() {
        assert_eq!(
            CaptureRegion::Viewport(Size::new(800.0, 600.0)).rect(),
            Rect::new(0.0, 0.0, 800.0, 600.0)
        );
        let border_box = Rect::new(5.0, 6.0, 7.0, 8.0);
        assert_eq!(CaptureRegion::BorderBox(border_box).rect(), border_box);
    }
}
