//! The generated style layer.
//!
//! Rules synthesized for a transition's presentation nodes live in one
//! ordered, process-wide layer. A rule is a plain value ([`StyleRule`]); its
//! membership in the layer is a separate [`RuleId`] handed out on insert.
//! Captured elements keep the ids and give them back at cleanup.
//!
//! Removal is idempotent: removing an id that is no longer in the layer is a
//! no-op.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::keyframes::{FADE_IN, FADE_OUT, GroupGeometry, GroupKeyframes, PLUS_LIGHTER};
use super::pseudo::PseudoSelector;
use super::types::CapturedStyles;

/// Identity of a rule's slot in a [`StyleLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub u64);

/// Discriminant of a [`StyleRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    GroupKeyframes,
    AnimationName,
    GroupStyles,
    Isolation,
    CrossFade,
}

/// A synthesized style rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyleRule {
    /// Group animation from the old geometry.
    GroupKeyframes(GroupKeyframes),
    /// `animation-name` on a single pseudo-element.
    AnimationName {
        target: PseudoSelector,
        animations: Vec<String>,
    },
    /// Current geometry and captured styles of a group.
    GroupStyles {
        target: PseudoSelector,
        geometry: GroupGeometry,
        styles: CapturedStyles,
    },
    /// `isolation: isolate` on an image pair.
    Isolation { target: PseudoSelector },
    /// Fade plus plus-lighter blending on both images of a pair.
    CrossFade {
        old: PseudoSelector,
        new: PseudoSelector,
    },
}

impl StyleRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::GroupKeyframes(_) => RuleKind::GroupKeyframes,
            Self::AnimationName { .. } => RuleKind::AnimationName,
            Self::GroupStyles { .. } => RuleKind::GroupStyles,
            Self::Isolation { .. } => RuleKind::Isolation,
            Self::CrossFade { .. } => RuleKind::CrossFade,
        }
    }

    /// Fade-in on a new image with no old counterpart.
    pub fn fade_in(target: PseudoSelector) -> Self {
        Self::AnimationName {
            target,
            animations: vec![FADE_IN.to_string()],
        }
    }

    /// Fade-out on an old image with no new counterpart.
    pub fn fade_out(target: PseudoSelector) -> Self {
        Self::AnimationName {
            target,
            animations: vec![FADE_OUT.to_string()],
        }
    }
}

fn write_block(
    f: &mut fmt::Formatter<'_>,
    selector: &PseudoSelector,
    declarations: &[(&str, String)],
) -> fmt::Result {
    writeln!(f, "{} {{", selector.attribute_selector())?;
    for (property, value) in declarations {
        writeln!(f, "  {property}: {value};")?;
    }
    write!(f, "}}")
}

impl fmt::Display for StyleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupKeyframes(keyframes) => keyframes.fmt(f),
            Self::AnimationName { target, animations } => {
                write_block(f, target, &[("animation-name", animations.join(", "))])
            }
            Self::GroupStyles {
                target,
                geometry,
                styles,
            } => {
                let [transform, width, height] = geometry.declarations();
                write_block(
                    f,
                    target,
                    &[
                        width,
                        height,
                        transform,
                        ("writing-mode", styles.writing_mode.clone()),
                        ("direction", styles.direction.clone()),
                        ("text-orientation", styles.text_orientation.clone()),
                        ("mix-blend-mode", styles.mix_blend_mode.clone()),
                        ("backdrop-filter", styles.backdrop_filter.clone()),
                        ("color-scheme", styles.color_scheme.clone()),
                    ],
                )
            }
            Self::Isolation { target } => {
                write_block(f, target, &[("isolation", "isolate".to_string())])
            }
            Self::CrossFade { old, new } => {
                write_block(
                    f,
                    old,
                    &[("animation-name", format!("{FADE_OUT}, {PLUS_LIGHTER}"))],
                )?;
                writeln!(f)?;
                write_block(
                    f,
                    new,
                    &[("animation-name", format!("{FADE_IN}, {PLUS_LIGHTER}"))],
                )
            }
        }
    }
}

/// Ordered collection of generated rules.
#[derive(Debug, Default)]
pub struct StyleLayer {
    rules: Vec<(RuleId, StyleRule)>,
    next_id: u64,
}

impl StyleLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> RuleId {
        self.next_id += 1;
        RuleId(self.next_id)
    }

    /// Append a rule to the end of the layer.
    pub fn insert(&mut self, rule: StyleRule) -> RuleId {
        let id = self.allocate();
        tracing::trace!(rule = id.0, kind = ?rule.kind(), "insert generated rule");
        self.rules.push((id, rule));
        id
    }

    pub fn contains(&self, id: RuleId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: RuleId) -> Option<&StyleRule> {
        self.position(id).map(|index| &self.rules[index].1)
    }

    /// Remove a rule. Returns `None` if it is not in the layer.
    pub fn remove(&mut self, id: RuleId) -> Option<StyleRule> {
        let index = self.position(id)?;
        tracing::trace!(rule = id.0, "remove generated rule");
        Some(self.rules.remove(index).1)
    }

    /// Swap the rule held under `id` for `rule`.
    ///
    /// The new rule takes the old one's position and gets a fresh id. If `id`
    /// is no longer in the layer the rule is appended instead.
    pub fn replace(&mut self, id: RuleId, rule: StyleRule) -> RuleId {
        let Some(index) = self.position(id) else {
            return self.insert(rule);
        };
        let new_id = self.allocate();
        tracing::trace!(old = id.0, new = new_id.0, "replace generated rule");
        self.rules[index] = (new_id, rule);
        new_id
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in layer order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &StyleRule)> {
        self.rules.iter().map(|(id, rule)| (*id, rule))
    }

    /// Number of rules of `kind`.
    pub fn count(&self, kind: RuleKind) -> usize {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.kind() == kind)
            .count()
    }

    /// CSS text of the whole layer.
    pub fn to_css(&self) -> String {
        self.rules
            .iter()
            .map(|(_, rule)| rule.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn position(&self, id: RuleId) -> Option<usize> {
        self.rules.iter().position(|(rule_id, _)| *rule_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::pseudo::PseudoKind;
    use crate::transition::transform::Transform2D;

    fn group(name: &str) -> PseudoSelector {
        PseudoSelector::new(PseudoKind::Group, name)
    }

    fn group_styles(name: &str, width: f64) -> StyleRule {
        StyleRule::GroupStyles {
            target: group(name),
            geometry: GroupGeometry::new(width, 10.0, Transform2D::identity()),
            styles: CapturedStyles::default(),
        }
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut layer = StyleLayer::new();
        let a = layer.insert(StyleRule::Isolation { target: group("a") });
        let b = layer.insert(StyleRule::Isolation { target: group("b") });

        let ids: Vec<RuleId> = layer.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(layer.contains(a));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut layer = StyleLayer::new();
        let id = layer.insert(StyleRule::fade_in(PseudoSelector::new(PseudoKind::New, "x")));

        assert!(layer.remove(id).is_some());
        assert!(layer.remove(id).is_none());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut layer = StyleLayer::new();
        let first = layer.insert(group_styles("a", 10.0));
        let second = layer.insert(StyleRule::Isolation { target: group("a") });

        let replaced = layer.replace(first, group_styles("a", 42.0));
        assert_ne!(replaced, first);
        assert!(!layer.contains(first));

        let ids: Vec<RuleId> = layer.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![replaced, second]);
        match layer.get(replaced) {
            Some(StyleRule::GroupStyles { geometry, .. }) => assert_eq!(geometry.width, 42.0),
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn test_replace_missing_appends() {
        let mut layer = StyleLayer::new();
        let stale = layer.insert(group_styles("a", 1.0));
        layer.remove(stale);
        let id = layer.replace(stale, group_styles("a", 2.0));
        assert_eq!(layer.len(), 1);
        assert!(layer.contains(id));
    }

    #[test]
    fn test_count_by_kind() {
        let mut layer = StyleLayer::new();
        layer.insert(StyleRule::fade_out(PseudoSelector::new(PseudoKind::Old, "a")));
        layer.insert(group_styles("a", 1.0));
        layer.insert(group_styles("b", 1.0));
        assert_eq!(layer.count(RuleKind::GroupStyles), 2);
        assert_eq!(layer.count(RuleKind::AnimationName), 1);
        assert_eq!(layer.count(RuleKind::GroupKeyframes), 0);
    }

    #[test]
    fn test_cross_fade_css() {
        let rule = StyleRule::CrossFade {
            old: PseudoSelector::new(PseudoKind::Old, "hero"),
            new: PseudoSelector::new(PseudoKind::New, "hero"),
        };
        let css = rule.to_string();
        assert!(css.contains(r#"[data-pseudo="::view-transition-old(hero)"]"#));
        assert!(css.contains(
            "animation-name: -ua-view-transition-fade-in, -ua-mix-blend-mode-plus-lighter;"
        ));
    }

    #[test]
    fn test_group_styles_css() {
        let css = group_styles("hero", 64.0).to_string();
        assert!(css.starts_with(r#"[data-pseudo="::view-transition-group(hero)"] {"#));
        assert!(css.contains("width: 64px;"));
        assert!(css.contains("writing-mode: horizontal-tb;"));
        assert!(css.contains("color-scheme: normal;"));
    }
}
