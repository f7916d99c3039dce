//! In-memory scene host.
//!
//! `HeadlessScene` implements [`SceneHost`] without a renderer. Nodes are flat
//! records (transition name, border box, fill colour, visibility, captured
//! style scalars); captures are solid-colour images the size of the capture
//! region; presentation animations run for a configured number of frames
//! after the presentation tree is attached.
//!
//! All mutators take `&self` so an update callback can hold an `Rc` to the
//! scene and change it while the orchestrator also holds one.

use image::{Rgba, RgbaImage};
use std::cell::RefCell;
use std::collections::HashSet;

use segue_config::HeadlessConfig;

use crate::transition::error::CaptureError;
use crate::transition::host::{CaptureRegion, CaptureService, SceneHost, Snapshot};
use crate::transition::keyframes::AnimationPlayState;
use crate::transition::pseudo::{PseudoElement, PseudoKind, PseudoTree};
use crate::transition::types::{CapturedStyles, ComputedStyle, NodeId, Rect, Size, TransitionId};

const DEFAULT_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone)]
struct SceneNode {
    id: NodeId,
    transition_name: Option<String>,
    bounds: Rect,
    fill: Rgba<u8>,
    visible: bool,
    styles: CapturedStyles,
    document_element: bool,
}

#[derive(Debug, Clone, Copy)]
struct Presentation {
    transition: TransitionId,
    attached_at: u64,
}

#[derive(Debug)]
struct SceneState {
    viewport: Size,
    scene_visible: bool,
    nodes: Vec<SceneNode>,
    next_id: u64,
    old_order: Option<Vec<NodeId>>,
    new_order: Option<Vec<NodeId>>,
    failing: HashSet<NodeId>,
    captures: usize,
    frame: u64,
    presentation: Option<Presentation>,
}

impl SceneState {
    fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    fn order(&self, configured: &Option<Vec<NodeId>>) -> Vec<NodeId> {
        match configured {
            Some(order) => order.clone(),
            None => self.nodes.iter().map(|node| node.id).collect(),
        }
    }
}

/// A scene that lives entirely in memory.
#[derive(Debug)]
pub struct HeadlessScene {
    state: RefCell<SceneState>,
    animation_frames: u32,
}

impl HeadlessScene {
    pub fn new(viewport: Size) -> Self {
        Self::with_config(viewport, &HeadlessConfig::default())
    }

    pub fn with_config(viewport: Size, config: &HeadlessConfig) -> Self {
        Self {
            state: RefCell::new(SceneState {
                viewport,
                scene_visible: true,
                nodes: Vec::new(),
                next_id: 0,
                old_order: None,
                new_order: None,
                failing: HashSet::new(),
                captures: 0,
                frame: 0,
                presentation: None,
            }),
            animation_frames: config.animation_frames,
        }
    }

    fn push_node(&self, name: Option<&str>, bounds: Rect, document_element: bool) -> NodeId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = NodeId(state.next_id);
        state.nodes.push(SceneNode {
            id,
            transition_name: name.map(str::to_string),
            bounds,
            fill: DEFAULT_FILL,
            visible: true,
            styles: CapturedStyles::default(),
            document_element,
        });
        id
    }

    /// Add a node. Nodes paint in insertion order unless an explicit order
    /// is set.
    pub fn add_node(&self, name: Option<&str>, bounds: Rect) -> NodeId {
        self.push_node(name, bounds, false)
    }

    /// Add the document element. Its box is always the viewport.
    pub fn add_document_element(&self, name: Option<&str>) -> NodeId {
        let viewport = self.viewport_size();
        self.push_node(name, Rect::from_size(viewport), true)
    }

    pub fn set_transition_name(&self, node: NodeId, name: Option<&str>) {
        if let Some(node) = self.state.borrow_mut().node_mut(node) {
            node.transition_name = name.map(str::to_string);
        }
    }

    pub fn set_bounds(&self, node: NodeId, bounds: Rect) {
        if let Some(node) = self.state.borrow_mut().node_mut(node) {
            node.bounds = bounds;
        }
    }

    pub fn set_fill(&self, node: NodeId, fill: Rgba<u8>) {
        if let Some(node) = self.state.borrow_mut().node_mut(node) {
            node.fill = fill;
        }
    }

    pub fn fill(&self, node: NodeId) -> Option<Rgba<u8>> {
        self.state.borrow().node(node).map(|node| node.fill)
    }

    pub fn set_visible(&self, node: NodeId, visible: bool) {
        if let Some(node) = self.state.borrow_mut().node_mut(node) {
            node.visible = visible;
        }
    }

    pub fn set_styles(&self, node: NodeId, styles: CapturedStyles) {
        if let Some(node) = self.state.borrow_mut().node_mut(node) {
            node.styles = styles;
        }
    }

    /// Paint order walked by the old-state capture, top-most first.
    pub fn set_old_order(&self, order: Vec<NodeId>) {
        self.state.borrow_mut().old_order = Some(order);
    }

    /// Paint order walked by the new-state capture, top-most first.
    pub fn set_new_order(&self, order: Vec<NodeId>) {
        self.state.borrow_mut().new_order = Some(order);
    }

    pub fn set_scene_visible(&self, visible: bool) {
        self.state.borrow_mut().scene_visible = visible;
    }

    pub fn resize_viewport(&self, viewport: Size) {
        tracing::trace!(width = viewport.width, height = viewport.height, "resize viewport");
        self.state.borrow_mut().viewport = viewport;
    }

    /// Make every capture of `node` fail.
    pub fn fail_captures_of(&self, node: NodeId) {
        self.state.borrow_mut().failing.insert(node);
    }

    /// Number of images captured so far.
    pub fn capture_count(&self) -> usize {
        self.state.borrow().captures
    }

    pub fn frames_rendered(&self) -> u64 {
        self.state.borrow().frame
    }

    pub fn presentation_attached(&self) -> bool {
        self.state.borrow().presentation.is_some()
    }

    /// Transition whose presentation tree is attached, if any.
    pub fn presented_transition(&self) -> Option<TransitionId> {
        self.state
            .borrow()
            .presentation
            .map(|presentation| presentation.transition)
    }
}

impl CaptureService for HeadlessScene {
    fn capture_image(&self, node: NodeId, region: CaptureRegion) -> Result<Snapshot, CaptureError> {
        let mut state = self.state.borrow_mut();
        if state.failing.contains(&node) {
            return Err(CaptureError::CaptureFailed {
                node,
                message: "capture failure injected".to_string(),
            });
        }
        let fill = state
            .node(node)
            .map(|node| node.fill)
            .ok_or_else(|| CaptureError::CaptureFailed {
                node,
                message: "unknown node".to_string(),
            })?;
        state.captures += 1;

        let rect = region.rect();
        let width = rect.width.round().max(1.0) as u32;
        let height = rect.height.round().max(1.0) as u32;
        Ok(Snapshot::new(RgbaImage::from_pixel(width, height, fill)))
    }
}

impl SceneHost for HeadlessScene {
    fn is_scene_visible(&self) -> bool {
        self.state.borrow().scene_visible
    }

    fn viewport_size(&self) -> Size {
        self.state.borrow().viewport
    }

    fn old_nodes(&self) -> Vec<NodeId> {
        let state = self.state.borrow();
        state.order(&state.old_order)
    }

    fn new_nodes(&self) -> Vec<NodeId> {
        let state = self.state.borrow();
        state.order(&state.new_order)
    }

    fn is_document_element(&self, node: NodeId) -> bool {
        self.state
            .borrow()
            .node(node)
            .is_some_and(|node| node.document_element)
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.state.borrow().node(node).is_some_and(|node| node.visible)
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        self.state
            .borrow()
            .node(node)
            .map(|node| ComputedStyle {
                transition_name: node.transition_name.clone(),
                captured: node.styles.clone(),
            })
            .unwrap_or_default()
    }

    fn bounding_box(&self, node: NodeId) -> Rect {
        let state = self.state.borrow();
        match state.node(node) {
            Some(node) if node.document_element => Rect::from_size(state.viewport),
            Some(node) => node.bounds,
            None => Rect::default(),
        }
    }

    fn animations(&self, element: &PseudoElement) -> Vec<AnimationPlayState> {
        if !matches!(
            element.kind(),
            PseudoKind::Group | PseudoKind::Old | PseudoKind::New
        ) {
            return Vec::new();
        }
        let state = self.state.borrow();
        let Some(presentation) = state.presentation else {
            return Vec::new();
        };
        let elapsed = state.frame.saturating_sub(presentation.attached_at);
        if elapsed < u64::from(self.animation_frames) {
            vec![AnimationPlayState::Running]
        } else {
            vec![AnimationPlayState::Finished]
        }
    }

    fn frame_rendered(&self) {
        self.state.borrow_mut().frame += 1;
    }

    fn attach_presentation(&self, tree: &PseudoTree, transition: TransitionId) {
        let mut state = self.state.borrow_mut();
        tracing::trace!(%transition, nodes = tree.len(), frame = state.frame, "attach presentation");
        state.presentation = Some(Presentation {
            transition,
            attached_at: state.frame,
        });
    }

    fn detach_presentation(&self, transition: TransitionId) {
        let mut state = self.state.borrow_mut();
        if state
            .presentation
            .is_some_and(|presentation| presentation.transition == transition)
        {
            tracing::trace!(%transition, "detach presentation");
            state.presentation = None;
        }
    }
}
