//! Presentation pseudo-elements.
//!
//! Each transition owns a [`PseudoTree`] rooted at `::view-transition`. For
//! every captured name the builder adds
//!
//! ```text
//! ::view-transition
//!   └── ::view-transition-group(name)
//!         └── ::view-transition-image-pair(name)
//!               ├── ::view-transition-old(name)   (if there is an old image)
//!               └── ::view-transition-new(name)   (if there is a new image)
//! ```
//!
//! and the generated rules animating it. [`setup_transition_pseudo_elements`]
//! builds the nodes plus the animation rules;
//! [`update_pseudo_element_styles`] writes the group geometry rule and places
//! the new image.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{CaptureError, CaptureResult};
use super::host::{SceneHost, Snapshot};
use super::keyframes::{GroupGeometry, GroupKeyframes, group_animation_name};
use super::record::NamedElements;
use super::style_layer::{StyleLayer, StyleRule};
use super::transform::Transform2D;
use super::types::Rect;

/// Kind of presentation pseudo-element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PseudoKind {
    Root,
    Group,
    ImagePair,
    Old,
    New,
}

impl PseudoKind {
    /// CSS pseudo-element name without the leading `::`.
    pub fn css_name(self) -> &'static str {
        match self {
            Self::Root => "view-transition",
            Self::Group => "view-transition-group",
            Self::ImagePair => "view-transition-image-pair",
            Self::Old => "view-transition-old",
            Self::New => "view-transition-new",
        }
    }
}

/// `::view-transition-<kind>(<name>)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PseudoSelector {
    pub kind: PseudoKind,
    /// Empty for the root.
    pub name: String,
}

impl PseudoSelector {
    pub fn new(kind: PseudoKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn root() -> Self {
        Self::new(PseudoKind::Root, "")
    }

    /// Attribute selector matching the node built for this pseudo-element.
    pub fn attribute_selector(&self) -> String {
        format!(r#"[data-pseudo="{self}"]"#)
    }
}

impl fmt::Display for PseudoSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PseudoKind::Root => write!(f, "::{}", self.kind.css_name()),
            kind => write!(f, "::{}({})", kind.css_name(), self.name),
        }
    }
}

/// Index of a node in a [`PseudoTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PseudoId(pub usize);

/// A presentation node.
#[derive(Debug, Clone)]
pub struct PseudoElement {
    pub selector: PseudoSelector,
    pub parent: Option<PseudoId>,
    pub children: Vec<PseudoId>,
    /// Replaced content of old/new image nodes.
    pub content: Option<Snapshot>,
}

impl PseudoElement {
    pub fn kind(&self) -> PseudoKind {
        self.selector.kind
    }

    pub fn name(&self) -> &str {
        &self.selector.name
    }
}

/// Arena of presentation nodes.
#[derive(Debug, Clone)]
pub struct PseudoTree {
    nodes: Vec<PseudoElement>,
}

impl Default for PseudoTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PseudoTree {
    /// A tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![PseudoElement {
                selector: PseudoSelector::root(),
                parent: None,
                children: Vec::new(),
                content: None,
            }],
        }
    }

    pub fn root(&self) -> PseudoId {
        PseudoId(0)
    }

    /// Append a node under `parent`.
    pub fn append(
        &mut self,
        parent: PseudoId,
        selector: PseudoSelector,
        content: Option<Snapshot>,
    ) -> PseudoId {
        let id = PseudoId(self.nodes.len());
        self.nodes.push(PseudoElement {
            selector,
            parent: Some(parent),
            children: Vec::new(),
            content,
        });
        if let Some(parent) = self.nodes.get_mut(parent.0) {
            parent.children.push(id);
        }
        id
    }

    pub fn get(&self, id: PseudoId) -> Option<&PseudoElement> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: PseudoId) -> Option<&mut PseudoElement> {
        self.nodes.get_mut(id.0)
    }

    pub fn find(&self, kind: PseudoKind, name: &str) -> Option<PseudoId> {
        self.nodes
            .iter()
            .position(|node| node.kind() == kind && node.name() == name)
            .map(PseudoId)
    }

    /// Every node except the root, in document order.
    pub fn descendants(&self) -> Vec<&PseudoElement> {
        let mut out = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        let mut stack: Vec<PseudoId> = self.nodes[0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            out.push(node);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root is present.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

/// Build group, image-pair and image nodes for every record and insert the
/// animation rules.
///
/// Fails with [`CaptureError::EmptyRecord`] if a record has neither an old
/// image nor a new image.
pub fn setup_transition_pseudo_elements(
    named: &mut NamedElements,
    tree: &mut PseudoTree,
    layer: &mut StyleLayer,
) -> CaptureResult<()> {
    let root = tree.root();
    for (name, record) in named.iter_mut() {
        if !record.has_old_image() && !record.has_new_image() {
            return Err(CaptureError::EmptyRecord(name.to_string()));
        }

        let group = tree.append(root, PseudoSelector::new(PseudoKind::Group, name), None);
        let pair = tree.append(
            group,
            PseudoSelector::new(PseudoKind::ImagePair, name),
            None,
        );
        if let Some(image) = &record.old_image {
            tree.append(
                pair,
                PseudoSelector::new(PseudoKind::Old, name),
                Some(image.clone()),
            );
        }
        if let Some(image) = &record.new_image {
            tree.append(
                pair,
                PseudoSelector::new(PseudoKind::New, name),
                Some(image.clone()),
            );
        }

        let defs = &mut record.style_definitions;
        match (record.old_image.is_some(), record.new_image.is_some()) {
            (false, _) => {
                defs.image_animation_name_rule = Some(layer.insert(StyleRule::fade_in(
                    PseudoSelector::new(PseudoKind::New, name),
                )));
            }
            (true, false) => {
                defs.image_animation_name_rule = Some(layer.insert(StyleRule::fade_out(
                    PseudoSelector::new(PseudoKind::Old, name),
                )));
            }
            (true, true) => {
                let from = GroupGeometry::new(
                    record.old_width,
                    record.old_height,
                    record.old_transform,
                );
                defs.group_keyframes = Some(layer.insert(StyleRule::GroupKeyframes(
                    GroupKeyframes::for_transition_name(name, from),
                )));
                defs.group_animation_name_rule = Some(layer.insert(StyleRule::AnimationName {
                    target: PseudoSelector::new(PseudoKind::Group, name),
                    animations: vec![group_animation_name(name)],
                }));
                defs.image_pair_isolation_rule = Some(layer.insert(StyleRule::Isolation {
                    target: PseudoSelector::new(PseudoKind::ImagePair, name),
                }));
                defs.image_animation_name_rule = Some(layer.insert(StyleRule::CrossFade {
                    old: PseudoSelector::new(PseudoKind::Old, name),
                    new: PseudoSelector::new(PseudoKind::New, name),
                }));
            }
        }
        tracing::trace!(transition_name = name, rules = defs.len(), "built presentation nodes");
    }
    Ok(())
}

/// Write each group's current geometry and styles into its group styles
/// rule, and place the new image in its `::view-transition-new` node.
///
/// Records without a new element keep their old geometry. Calling this again
/// replaces the existing group styles rules in place.
pub fn update_pseudo_element_styles(
    named: &mut NamedElements,
    tree: &mut PseudoTree,
    host: &dyn SceneHost,
    layer: &mut StyleLayer,
) -> CaptureResult<()> {
    for (name, record) in named.iter_mut() {
        let (geometry, styles) = match record.new_element {
            None => (
                record.old_geometry(),
                record.old_styles.clone().unwrap_or_default(),
            ),
            Some(node) => {
                if !host.is_visible(node) {
                    return Err(CaptureError::NotRendered(node));
                }
                let rect = if host.is_document_element(node) {
                    Rect::from_size(host.viewport_size())
                } else {
                    host.bounding_box(node)
                };
                (
                    GroupGeometry::new(rect.width, rect.height, Transform2D::for_border_box(&rect)),
                    host.computed_style(node).captured,
                )
            }
        };

        let rule = StyleRule::GroupStyles {
            target: PseudoSelector::new(PseudoKind::Group, name),
            geometry,
            styles,
        };
        let defs = &mut record.style_definitions;
        defs.group_styles_rule = Some(match defs.group_styles_rule {
            Some(id) => layer.replace(id, rule),
            None => layer.insert(rule),
        });

        if let Some(image) = &record.new_image {
            if let Some(new) = tree
                .find(PseudoKind::New, name)
                .and_then(|id| tree.get_mut(id))
            {
                new.content = Some(image.clone());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;
    use crate::transition::record::CapturedElement;
    use crate::transition::style_layer::RuleKind;
    use crate::transition::types::{CapturedStyles, NodeId, Size};
    use image::RgbaImage;

    fn snapshot() -> Snapshot {
        Snapshot::new(RgbaImage::new(1, 1))
    }

    fn old_only(rect: Rect) -> CapturedElement {
        CapturedElement::from_old(snapshot(), rect, CapturedStyles::default())
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(PseudoSelector::root().to_string(), "::view-transition");
        assert_eq!(
            PseudoSelector::new(PseudoKind::ImagePair, "card").to_string(),
            "::view-transition-image-pair(card)"
        );
        assert_eq!(
            PseudoSelector::new(PseudoKind::New, "card").attribute_selector(),
            r#"[data-pseudo="::view-transition-new(card)"]"#
        );
    }

    #[test]
    fn test_tree_descendants_in_document_order() {
        let mut tree = PseudoTree::new();
        let root = tree.root();
        let a = tree.append(root, PseudoSelector::new(PseudoKind::Group, "a"), None);
        tree.append(a, PseudoSelector::new(PseudoKind::ImagePair, "a"), None);
        tree.append(root, PseudoSelector::new(PseudoKind::Group, "b"), None);

        let order: Vec<String> = tree
            .descendants()
            .iter()
            .map(|node| node.selector.to_string())
            .collect();
        assert_eq!(
            order,
            vec![
                "::view-transition-group(a)",
                "::view-transition-image-pair(a)",
                "::view-transition-group(b)",
            ]
        );
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.find(PseudoKind::Group, "b").map(|id| id.0), Some(3));
    }

    #[test]
    fn test_old_only_record_gets_fade_out() {
        let mut named = NamedElements::new();
        named.insert("gone", old_only(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mut tree = PseudoTree::new();
        let mut layer = StyleLayer::new();

        setup_transition_pseudo_elements(&mut named, &mut tree, &mut layer).unwrap();

        assert_eq!(layer.len(), 1);
        assert_eq!(layer.count(RuleKind::GroupKeyframes), 0);
        assert!(layer.to_css().contains("-ua-view-transition-fade-out"));
        assert!(tree.find(PseudoKind::Old, "gone").is_some());
        assert!(tree.find(PseudoKind::New, "gone").is_none());
    }

    #[test]
    fn test_paired_record_gets_cross_fade_rules() {
        let mut named = NamedElements::new();
        let mut record = old_only(Rect::new(0.0, 0.0, 10.0, 10.0));
        record.new_element = Some(NodeId(1));
        record.new_image = Some(snapshot());
        named.insert("hero", record);
        let mut tree = PseudoTree::new();
        let mut layer = StyleLayer::new();

        setup_transition_pseudo_elements(&mut named, &mut tree, &mut layer).unwrap();

        let kinds: Vec<RuleKind> = layer.iter().map(|(_, rule)| rule.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                RuleKind::GroupKeyframes,
                RuleKind::AnimationName,
                RuleKind::Isolation,
                RuleKind::CrossFade,
            ]
        );
        assert_eq!(named.get("hero").unwrap().style_definitions.len(), 4);
        // root, group, pair, old, new
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_empty_record_is_rejected() {
        let mut named = NamedElements::new();
        named.insert("nothing", CapturedElement::default());
        let result =
            setup_transition_pseudo_elements(&mut named, &mut PseudoTree::new(), &mut StyleLayer::new());
        assert_eq!(result, Err(CaptureError::EmptyRecord("nothing".to_string())));
    }

    #[test]
    fn test_update_styles_uses_live_geometry_and_replaces_rule() {
        let scene = HeadlessScene::new(Size::new(400.0, 300.0));
        let node = scene.add_node(Some("hero"), Rect::new(5.0, 6.0, 70.0, 80.0));

        let mut named = NamedElements::new();
        let mut record = old_only(Rect::new(0.0, 0.0, 10.0, 10.0));
        record.new_element = Some(node);
        record.new_image = Some(snapshot());
        named.insert("hero", record);
        let mut tree = PseudoTree::new();
        let mut layer = StyleLayer::new();
        setup_transition_pseudo_elements(&mut named, &mut tree, &mut layer).unwrap();

        update_pseudo_element_styles(&mut named, &mut tree, &scene, &mut layer).unwrap();
        assert_eq!(layer.len(), 5);
        let first = named.get("hero").unwrap().style_definitions.group_styles_rule;
        assert!(layer.to_css().contains("width: 70px;"));

        scene.set_bounds(node, Rect::new(5.0, 6.0, 90.0, 80.0));
        update_pseudo_element_styles(&mut named, &mut tree, &scene, &mut layer).unwrap();
        let second = named.get("hero").unwrap().style_definitions.group_styles_rule;

        assert_eq!(layer.len(), 5);
        assert_ne!(first, second);
        assert!(layer.to_css().contains("width: 90px;"));
        assert!(!layer.to_css().contains("width: 70px;"));
    }

    #[test]
    fn test_update_styles_fails_for_unrendered_new_element() {
        let scene = HeadlessScene::new(Size::new(400.0, 300.0));
        let node = scene.add_node(Some("hero"), Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.set_visible(node, false);

        let mut named = NamedElements::new();
        named.get_or_insert("hero").new_element = Some(node);

        let result = update_pseudo_element_styles(
            &mut named,
            &mut PseudoTree::new(),
            &scene,
            &mut StyleLayer::new(),
        );
        assert_eq!(result, Err(CaptureError::NotRendered(node)));
    }

    #[test]
    fn test_update_styles_places_document_element_at_viewport() {
        let scene = HeadlessScene::new(Size::new(640.0, 480.0));
        let root = scene.add_document_element(Some("root"));

        let mut named = NamedElements::new();
        let record = named.get_or_insert("root");
        record.new_element = Some(root);
        record.new_image = Some(snapshot());

        let mut tree = PseudoTree::new();
        let mut layer = StyleLayer::new();
        setup_transition_pseudo_elements(&mut named, &mut tree, &mut layer).unwrap();
        update_pseudo_element_styles(&mut named, &mut tree, &scene, &mut layer).unwrap();

        let css = layer.to_css();
        assert!(css.contains("width: 640px;"));
        assert!(css.contains("height: 480px;"));
        assert!(css.contains("transform: matrix(1, 0, 0, 1, 0, 0);"));
        let new = tree.find(PseudoKind::New, "root").and_then(|id| tree.get(id));
        assert!(new.and_then(|node| node.content.as_ref()).is_some());
    }
}
