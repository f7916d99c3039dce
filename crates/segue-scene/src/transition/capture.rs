//! Old-state and new-state capture passes.
//!
//! Both passes walk a host-supplied node list in paint order, skip nodes that
//! are invisible or unnamed, and refuse duplicate transition names. The old
//! pass freezes the viewport and records geometry, styles and an image per
//! name; the new pass attaches the new element and its image to the matching
//! record, creating one for names the old state did not have.
//!
//! `captured` is the set of nodes currently flagged as captured in a
//! transition. The old pass flags nodes only while it records them and clears
//! every flag it set before returning, on success and on failure alike.

use std::collections::HashSet;

use segue_config::CaptureConfig;

use super::entity::ViewTransition;
use super::error::{CaptureError, CaptureResult};
use super::host::{CaptureRegion, SceneHost, Snapshot};
use super::record::CapturedElement;
use super::types::{NodeId, Rect, Size};

/// Region a capture of `node` covers: the whole viewport for the document
/// element, the border box otherwise.
pub fn capture_region(host: &dyn SceneHost, node: NodeId, viewport: Size) -> CaptureRegion {
    if host.is_document_element(node) {
        CaptureRegion::Viewport(viewport)
    } else {
        CaptureRegion::BorderBox(host.bounding_box(node))
    }
}

/// Rasterize `node` through the host's capture service.
pub fn capture_image(host: &dyn SceneHost, node: NodeId, viewport: Size) -> CaptureResult<Snapshot> {
    let region = capture_region(host, node, viewport);
    host.capture_image(node, region)
}

/// Named, visible nodes of `nodes` in order, or the first repeated name.
fn collect_named(host: &dyn SceneHost, nodes: Vec<NodeId>) -> Result<Vec<(String, NodeId)>, String> {
    let mut used = HashSet::new();
    let mut elements: Vec<(String, NodeId)> = Vec::new();
    for node in nodes {
        if !host.is_visible(node) {
            continue;
        }
        let Some(name) = host.computed_style(node).transition_name else {
            continue;
        };
        if !used.insert(name.clone()) {
            return Err(name);
        }
        elements.push((name, node));
    }
    Ok(elements)
}

/// Capture the old state of the scene into `transition`.
pub fn capture_old_state(
    transition: &ViewTransition,
    host: &dyn SceneHost,
    captured: &mut HashSet<NodeId>,
    limits: &CaptureConfig,
) -> CaptureResult<()> {
    let viewport = host.viewport_size();
    if limits.exceeds_limit(viewport.width, viewport.height) {
        tracing::warn!(
            transition = %transition.id(),
            width = viewport.width,
            height = viewport.height,
            "snapshot containing block too large"
        );
        return Err(CaptureError::SnapshotTooLarge {
            width: viewport.width,
            height: viewport.height,
        });
    }
    transition.freeze_viewport(viewport);

    let elements = match collect_named(host, host.old_nodes()) {
        Ok(elements) => elements,
        Err(name) => {
            tracing::warn!(transition = %transition.id(), %name, "duplicate name in old state");
            return Err(CaptureError::DuplicateName(name));
        }
    };
    captured.extend(elements.iter().map(|(_, node)| *node));

    let result = record_old_elements(transition, host, &elements, viewport);

    for (_, node) in &elements {
        captured.remove(node);
    }
    if result.is_ok() {
        tracing::debug!(
            transition = %transition.id(),
            captured = elements.len(),
            "old state captured"
        );
    }
    result
}

fn record_old_elements(
    transition: &ViewTransition,
    host: &dyn SceneHost,
    elements: &[(String, NodeId)],
    viewport: Size,
) -> CaptureResult<()> {
    let mut named = transition.named_elements_mut();
    for (name, node) in elements {
        let image = capture_image(host, *node, viewport)?;
        let rect = if host.is_document_element(*node) {
            Rect::from_size(viewport)
        } else {
            host.bounding_box(*node)
        };
        let styles = host.computed_style(*node).captured;
        named.insert(name.as_str(), CapturedElement::from_old(image, rect, styles));
    }
    Ok(())
}

/// Capture the new state of the scene into `transition`.
pub fn capture_new_state(transition: &ViewTransition, host: &dyn SceneHost) -> CaptureResult<()> {
    let elements = match collect_named(host, host.new_nodes()) {
        Ok(elements) => elements,
        Err(name) => {
            tracing::warn!(transition = %transition.id(), %name, "duplicate name in new state");
            return Err(CaptureError::DuplicateName(name));
        }
    };

    let viewport = host.viewport_size();
    let mut named = transition.named_elements_mut();
    for (name, node) in &elements {
        let image = capture_image(host, *node, viewport)?;
        let record = named.get_or_insert(name);
        record.new_element = Some(*node);
        record.new_image = Some(image);
    }
    tracing::debug!(
        transition = %transition.id(),
        captured = elements.len(),
        names = named.len(),
        "new state captured"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;
    use crate::transition::scheduler::TaskQueue;
    use crate::transition::transform::Transform2D;
    use image::Rgba;

    fn transition() -> ViewTransition {
        ViewTransition::new(None, TaskQueue::new())
    }

    #[test]
    fn test_old_state_records_named_visible_nodes() {
        let scene = HeadlessScene::new(Size::new(800.0, 600.0));
        let hero = scene.add_node(Some("hero"), Rect::new(10.0, 20.0, 100.0, 50.0));
        scene.add_node(None, Rect::new(0.0, 0.0, 5.0, 5.0));
        let hidden = scene.add_node(Some("hidden"), Rect::new(0.0, 0.0, 5.0, 5.0));
        scene.set_visible(hidden, false);

        let t = transition();
        let mut captured = HashSet::new();
        capture_old_state(&t, &scene, &mut captured, &CaptureConfig::default()).unwrap();

        assert_eq!(t.transition_names(), vec!["hero"]);
        assert_eq!(t.initial_viewport_size(), Some(Size::new(800.0, 600.0)));
        let record = t.captured_element("hero").unwrap();
        assert_eq!((record.old_width, record.old_height), (100.0, 50.0));
        assert_eq!(record.old_transform, Transform2D::translate(10.0, 20.0));
        assert_eq!(record.old_image.as_ref().map(|i| i.width()), Some(100));
        assert!(record.new_element.is_none());
        assert!(captured.is_empty());
        assert!(!captured.contains(&hero));
    }

    #[test]
    fn test_duplicate_old_names_fail_and_leave_no_flags() {
        let scene = HeadlessScene::new(Size::new(800.0, 600.0));
        scene.add_node(Some("other"), Rect::new(0.0, 0.0, 5.0, 5.0));
        scene.add_node(Some("twin"), Rect::new(0.0, 0.0, 5.0, 5.0));
        scene.add_node(Some("twin"), Rect::new(10.0, 0.0, 5.0, 5.0));

        let t = transition();
        let mut captured = HashSet::new();
        let result = capture_old_state(&t, &scene, &mut captured, &CaptureConfig::default());

        assert_eq!(result, Err(CaptureError::DuplicateName("twin".to_string())));
        assert!(captured.is_empty());
        assert!(t.transition_names().is_empty());
    }

    #[test]
    fn test_duplicate_old_names_keep_existing_flags() {
        let scene = HeadlessScene::new(Size::new(800.0, 600.0));
        scene.add_node(Some("twin"), Rect::new(0.0, 0.0, 5.0, 5.0));
        scene.add_node(Some("twin"), Rect::new(10.0, 0.0, 5.0, 5.0));

        let elsewhere = NodeId(99);
        let mut captured = HashSet::from([elsewhere]);
        let result = capture_old_state(&transition(), &scene, &mut captured, &CaptureConfig::default());

        assert!(matches!(result, Err(CaptureError::DuplicateName(_))));
        assert_eq!(captured, HashSet::from([elsewhere]));
        assert_eq!(scene.capture_count(), 0);
    }

    #[test]
    fn test_oversized_viewport_fails_before_freezing() {
        let scene = HeadlessScene::new(Size::new(5000.0, 600.0));
        let limits = CaptureConfig {
            max_snapshot_width: Some(4096.0),
            max_snapshot_height: None,
        };
        let t = transition();
        let result = capture_old_state(&t, &scene, &mut HashSet::new(), &limits);
        assert!(matches!(result, Err(CaptureError::SnapshotTooLarge { .. })));
        assert!(t.initial_viewport_size().is_none());
    }

    #[test]
    fn test_capture_failure_clears_flags() {
        let scene = HeadlessScene::new(Size::new(800.0, 600.0));
        let node = scene.add_node(Some("hero"), Rect::new(0.0, 0.0, 5.0, 5.0));
        scene.fail_captures_of(node);

        let mut captured = HashSet::new();
        let result = capture_old_state(&transition(), &scene, &mut captured, &CaptureConfig::default());
        assert!(matches!(result, Err(CaptureError::CaptureFailed { .. })));
        assert!(captured.is_empty());
    }

    #[test]
    fn test_document_element_uses_viewport_rect() {
        let scene = HeadlessScene::new(Size::new(320.0, 240.0));
        let root = scene.add_document_element(Some("root"));
        assert_eq!(
            capture_region(&scene, root, Size::new(320.0, 240.0)),
            CaptureRegion::Viewport(Size::new(320.0, 240.0))
        );

        let t = transition();
        capture_old_state(&t, &scene, &mut HashSet::new(), &CaptureConfig::default()).unwrap();
        let record = t.captured_element("root").unwrap();
        assert_eq!((record.old_width, record.old_height), (320.0, 240.0));
        assert!(record.old_transform.is_identity(1e-9));
    }

    #[test]
    fn test_new_state_pairs_and_appends() {
        let scene = HeadlessScene::new(Size::new(800.0, 600.0));
        let a = scene.add_node(Some("a"), Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = scene.add_node(Some("b"), Rect::new(0.0, 0.0, 10.0, 10.0));

        let t = transition();
        scene.set_old_order(vec![a]);
        capture_old_state(&t, &scene, &mut HashSet::new(), &CaptureConfig::default()).unwrap();

        scene.set_fill(a, Rgba([0, 0, 255, 255]));
        scene.set_new_order(vec![b, a]);
        capture_new_state(&t, &scene).unwrap();

        assert_eq!(t.transition_names(), vec!["a", "b"]);
        let paired = t.captured_element("a").unwrap();
        assert!(paired.has_old_image() && paired.has_new_image());
        assert_eq!(paired.new_element, Some(a));
        let fresh = t.captured_element("b").unwrap();
        assert!(!fresh.has_old_image());
        assert_eq!(fresh.new_element, Some(b));
    }

    #[test]
    fn test_duplicate_new_names_fail() {
        let scene = HeadlessScene::new(Size::new(800.0, 600.0));
        scene.add_node(Some("a"), Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = scene.add_node(Some("b"), Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.set_transition_name(b, Some("a"));

        let t = transition();
        let result = capture_new_state(&t, &scene);
        assert_eq!(result, Err(CaptureError::DuplicateName("a".to_string())));
        assert!(t.captured_element("a").is_none());
    }
}
