//! Cascade resolution for the properties that drive CSS animations.
//!
//! Only `display`, `animation-name`, `animation-duration` and the
//! `animation` shorthand are resolved. Order of precedence (low to high):
//! sheet rules by specificity then source order, the `style` attribute,
//! then `!important` declarations in the same order.

use css::{CssRule, CssValue, Declaration, Specificity, StyleSheet, compute_specificity, parse_declaration_block};
use dom::{Dom, NodeId};

use crate::matching::matches_selector;

/// Shorthand keywords that can never be an animation name.
const ANIMATION_KEYWORDS: &[&str] = &[
    "linear", "ease", "ease-in", "ease-out", "ease-in-out", "step-start", "step-end", "infinite",
    "normal", "reverse", "alternate", "alternate-reverse", "forwards", "backwards", "both",
    "running", "paused",
];

/// A rule that matched an element, annotated with cascade metadata.
#[derive(Debug, Clone)]
pub struct MatchedRule {
    pub specificity: Specificity,
    /// Declarations from the element's `style` attribute.
    pub inline: bool,
    pub source_order: usize,
    pub declarations: Vec<Declaration>,
}

/// Computed values of the animation-related properties.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStyle {
    pub display_none: bool,
    /// `animation-name` list; `None` entries are `none`.
    pub names: Vec<Option<String>>,
    /// `animation-duration` list in milliseconds.
    pub durations_ms: Vec<f64>,
}

impl Default for AnimationStyle {
    fn default() -> Self {
        Self {
            display_none: false,
            names: vec![None],
            durations_ms: vec![0.0],
        }
    }
}

impl AnimationStyle {
    /// Named animations with their durations, cycling the duration list as
    /// CSS does for list-valued properties.
    pub fn animations(&self) -> Vec<(String, f64)> {
        self.names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                let name = name.as_ref()?;
                let duration = self
                    .durations_ms
                    .get(i % self.durations_ms.len().max(1))
                    .copied()
                    .unwrap_or(0.0);
                Some((name.clone(), duration))
            })
            .collect()
    }
}

/// Collect the style rules in `sheets` that match `node_id`, plus its inline
/// style, if any.
pub fn collect_matching_rules(
    dom: &Dom,
    node_id: NodeId,
    sheets: &[&StyleSheet],
    inline_style: Option<&str>,
) -> Vec<MatchedRule> {
    let mut matched = Vec::new();
    let mut source_order = 0usize;

    for sheet in sheets {
        for entry in sheet.rules() {
            let CssRule::Style(rule) = &entry.rule else {
                continue;
            };
            let best = rule
                .selectors
                .iter()
                .filter(|sel| matches_selector(dom, node_id, sel))
                .map(compute_specificity)
                .max();
            if let Some(specificity) = best {
                matched.push(MatchedRule {
                    specificity,
                    inline: false,
                    source_order,
                    declarations: rule.declarations.clone(),
                });
            }
            source_order += 1;
        }
    }

    if let Some(text) = inline_style {
        matched.push(MatchedRule {
            specificity: Specificity::default(),
            inline: true,
            source_order,
            declarations: parse_declaration_block(text),
        });
    }

    matched
}

/// Resolve the animation style of an element from its matched rules.
pub fn resolve_animation_style(
    matched_rules: &[MatchedRule],
    parent: Option<&AnimationStyle>,
) -> AnimationStyle {
    let mut decls: Vec<(&Declaration, &MatchedRule)> = matched_rules
        .iter()
        .flat_map(|rule| rule.declarations.iter().map(move |d| (d, rule)))
        .collect();
    decls.sort_by(|(da, ra), (db, rb)| {
        da.important
            .cmp(&db.important)
            .then(ra.inline.cmp(&rb.inline))
            .then(ra.specificity.cmp(&rb.specificity))
            .then(ra.source_order.cmp(&rb.source_order))
    });

    let mut style = AnimationStyle::default();
    for (decl, _) in decls {
        apply_declaration(&mut style, decl, parent);
    }
    style
}

/// Apply one declaration. Unknown properties and invalid values are ignored.
pub fn apply_declaration(style: &mut AnimationStyle, decl: &Declaration, parent: Option<&AnimationStyle>) {
    let prop = strip_vendor_prefix(&decl.name);
    let initial = AnimationStyle::default();
    let inherited = parent.unwrap_or(&initial);

    match single_keyword(&decl.value) {
        Some("initial" | "unset") => {
            reset_property(style, prop, &initial);
            return;
        }
        Some("inherit") => {
            reset_property(style, prop, inherited);
            return;
        }
        _ => {}
    }

    match prop {
        "display" => {
            if let Some(kw) = single_keyword(&decl.value) {
                style.display_none = kw == "none";
            }
        }
        "animation-name" => {
            if let Some(names) = layers(&decl.value)
                .iter()
                .map(|layer| match layer {
                    [CssValue::Keyword(k)] if k == "none" => Some(None),
                    [CssValue::Keyword(k)] => Some(Some(k.clone())),
                    [CssValue::String(s)] => Some(Some(s.clone())),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
            {
                style.names = names;
            }
        }
        "animation-duration" => {
            if let Some(durations) = layers(&decl.value)
                .iter()
                .map(|layer| match layer {
                    [time] => time.as_time_ms().filter(|ms| *ms >= 0.0),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
            {
                style.durations_ms = durations;
            }
        }
        "animation" => {
            let (names, durations): (Vec<_>, Vec<_>) =
                layers(&decl.value).iter().map(|layer| shorthand_layer(layer)).unzip();
            style.names = names;
            style.durations_ms = durations;
        }
        _ => {}
    }
}

fn reset_property(style: &mut AnimationStyle, prop: &str, from: &AnimationStyle) {
    match prop {
        "display" => style.display_none = from.display_none,
        "animation-name" => style.names = from.names.clone(),
        "animation-duration" => style.durations_ms = from.durations_ms.clone(),
        "animation" => {
            style.names = from.names.clone();
            style.durations_ms = from.durations_ms.clone();
        }
        _ => {}
    }
}

/// One layer of the `animation` shorthand: `(name, duration_ms)`.
fn shorthand_layer(layer: &[CssValue]) -> (Option<String>, f64) {
    let mut name = None;
    let mut duration = None;
    for value in layer {
        match value {
            CssValue::Keyword(k) if k == "none" => {}
            CssValue::Keyword(k) if name.is_none() && !ANIMATION_KEYWORDS.contains(&k.as_str()) => {
                name = Some(k.clone());
            }
            CssValue::String(s) if name.is_none() => name = Some(s.clone()),
            v if duration.is_none() => duration = v.as_time_ms(),
            _ => {}
        }
    }
    (name, duration.unwrap_or(0.0))
}

/// Split a value on top-level commas.
fn layers(values: &[CssValue]) -> Vec<&[CssValue]> {
    values.split(|v| *v == CssValue::Comma).collect()
}

fn single_keyword(values: &[CssValue]) -> Option<&str> {
    match values {
        [CssValue::Keyword(k)] => Some(k.as_str()),
        _ => None,
    }
}

fn strip_vendor_prefix(name: &str) -> &str {
    ["-webkit-", "-moz-", "-ms-", "-o-"]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}
