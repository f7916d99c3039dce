//! Captured element records.
//!
//! One [`CapturedElement`] exists per transition name. The old-state capture
//! fills the `old_*` fields once; the new-state capture attaches the new
//! element and its image. [`NamedElements`] keeps the records in discovery
//! order, which is also the order presentation nodes are built in.

use super::host::Snapshot;
use super::keyframes::GroupGeometry;
use super::style_layer::{RuleId, StyleLayer};
use super::transform::Transform2D;
use super::types::{CapturedStyles, NodeId, Rect};

/// Handles to the generated rules a record owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDefinitions {
    pub group_keyframes: Option<RuleId>,
    pub group_animation_name_rule: Option<RuleId>,
    pub group_styles_rule: Option<RuleId>,
    pub image_pair_isolation_rule: Option<RuleId>,
    pub image_animation_name_rule: Option<RuleId>,
}

impl StyleDefinitions {
    /// Number of rules currently held.
    pub fn len(&self) -> usize {
        self.slots().iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every held rule from `layer` and forget the handles.
    ///
    /// Returns how many rules were actually removed; handles already gone from
    /// the layer are skipped.
    pub fn release(&mut self, layer: &mut StyleLayer) -> usize {
        [
            self.group_keyframes.take(),
            self.group_animation_name_rule.take(),
            self.group_styles_rule.take(),
            self.image_pair_isolation_rule.take(),
            self.image_animation_name_rule.take(),
        ]
        .into_iter()
        .flatten()
        .filter(|id| layer.remove(*id).is_some())
        .count()
    }

    fn slots(&self) -> [Option<RuleId>; 5] {
        [
            self.group_keyframes,
            self.group_animation_name_rule,
            self.group_styles_rule,
            self.image_pair_isolation_rule,
            self.image_animation_name_rule,
        ]
    }
}

/// Everything captured for one transition name.
#[derive(Debug, Clone, Default)]
pub struct CapturedElement {
    pub old_image: Option<Snapshot>,
    pub old_width: f64,
    pub old_height: f64,
    pub old_transform: Transform2D,
    /// `None` until the old state is captured.
    pub old_styles: Option<CapturedStyles>,
    pub new_element: Option<NodeId>,
    pub new_image: Option<Snapshot>,
    pub style_definitions: StyleDefinitions,
}

impl CapturedElement {
    /// A record for a node seen in the old state.
    pub fn from_old(image: Snapshot, rect: Rect, styles: CapturedStyles) -> Self {
        Self {
            old_image: Some(image),
            old_width: rect.width,
            old_height: rect.height,
            old_transform: Transform2D::for_border_box(&rect),
            old_styles: Some(styles),
            ..Self::default()
        }
    }

    pub fn has_old_image(&self) -> bool {
        self.old_image.is_some()
    }

    pub fn has_new_image(&self) -> bool {
        self.new_image.is_some()
    }

    /// Old width, height and transform as a group geometry block.
    pub fn old_geometry(&self) -> GroupGeometry {
        GroupGeometry::new(self.old_width, self.old_height, self.old_transform)
    }
}

/// Transition-name keyed records in discovery order.
#[derive(Debug, Clone, Default)]
pub struct NamedElements {
    entries: Vec<(String, CapturedElement)>,
}

impl NamedElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&CapturedElement> {
        self.position(name).map(|index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CapturedElement> {
        self.position(name).map(|index| &mut self.entries[index].1)
    }

    /// Insert or overwrite the record for `name`. A new name is appended.
    pub fn insert(&mut self, name: impl Into<String>, record: CapturedElement) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = record,
            None => self.entries.push((name, record)),
        }
    }

    /// The record for `name`, appending an empty one if there is none.
    pub fn get_or_insert(&mut self, name: &str) -> &mut CapturedElement {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.entries
                    .push((name.to_string(), CapturedElement::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CapturedElement)> {
        self.entries
            .iter()
            .map(|(name, record)| (name.as_str(), record))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut CapturedElement)> {
        self.entries
            .iter_mut()
            .map(|(name, record)| (name.as_str(), record))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(key, _)| key == name)
    }
}
