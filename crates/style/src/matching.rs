//! Selector matching.
//!
//! Complex selectors are matched right-to-left: start with the subject
//! compound, then walk up or sideways through the tree following each
//! combinator. A selector carrying a pseudo-element describes a box that is
//! not an element, so it never matches one.

use css::{AttrOp, Combinator, ComplexSelector, CompoundSelector, PseudoClass, SimpleSelector};
use dom::{Dom, ElementData, NodeData, NodeId};

const FORM_CONTROLS: &[&str] = &[
    "button", "input", "select", "textarea", "optgroup", "option", "fieldset",
];

/// Whether `node` matches any selector in `list`.
pub fn matches_any(dom: &Dom, node: NodeId, list: &[ComplexSelector]) -> bool {
    list.iter().any(|sel| matches_selector(dom, node, sel))
}

/// Whether element `node_id` matches a complex selector. Non-elements never match.
pub fn matches_selector(dom: &Dom, node_id: NodeId, selector: &ComplexSelector) -> bool {
    let Some(((subject, first_combinator), rest)) = selector.parts.split_first() else {
        return false;
    };
    if subject.pseudo_element().is_some() || !matches_compound(dom, node_id, subject) {
        return false;
    }

    let mut current = node_id;
    let mut combinator = *first_combinator;
    for (compound, next_combinator) in rest {
        let next = match combinator {
            Some(Combinator::Child) => dom
                .parent_element(current)
                .filter(|&p| matches_compound(dom, p, compound)),
            Some(Combinator::Descendant) => {
                walk(current, |n| dom.parent_element(n)).find(|&a| matches_compound(dom, a, compound))
            }
            Some(Combinator::NextSibling) => dom
                .prev_element_sibling(current)
                .filter(|&s| matches_compound(dom, s, compound)),
            Some(Combinator::SubsequentSibling) => walk(current, |n| dom.prev_element_sibling(n))
                .find(|&s| matches_compound(dom, s, compound)),
            None => None,
        };
        // First candidate wins; no backtracking.
        match next {
            Some(n) => current = n,
            None => return false,
        }
        combinator = *next_combinator;
    }
    true
}

/// Every simple selector in `compound` must match.
pub fn matches_compound(dom: &Dom, node_id: NodeId, compound: &CompoundSelector) -> bool {
    let Some(elem) = dom.element(node_id) else {
        return false;
    };
    compound
        .simples
        .iter()
        .all(|simple| matches_simple(dom, node_id, elem, simple))
}

fn walk<F>(start: NodeId, step: F) -> impl Iterator<Item = NodeId>
where
    F: Fn(NodeId) -> Option<NodeId>,
{
    std::iter::successors(step(start), move |&n| step(n))
}

fn matches_simple(dom: &Dom, node_id: NodeId, elem: &ElementData, simple: &SimpleSelector) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(tag) => elem.tag_name.eq_ignore_ascii_case(tag),
        SimpleSelector::Id(id) => elem.id.as_deref() == Some(id.as_str()),
        SimpleSelector::Class(cls) => elem.has_class(cls),
        SimpleSelector::Attribute { name, op, value } => {
            matches_attribute(elem, name, *op, value.as_deref())
        }
        SimpleSelector::PseudoClass(pc) => matches_pseudo_class(dom, node_id, elem, pc),
        SimpleSelector::PseudoElement(_) => false,
    }
}

fn matches_attribute(elem: &ElementData, name: &str, op: AttrOp, value: Option<&str>) -> bool {
    let Some(attr_val) = elem.attr(name) else {
        return false;
    };
    let Some(v) = value else {
        return op == AttrOp::Exists;
    };
    match op {
        AttrOp::Exists => true,
        AttrOp::Eq => attr_val == v,
        AttrOp::Includes => attr_val.split_whitespace().any(|word| word == v),
        AttrOp::DashMatch => {
            attr_val == v || attr_val.strip_prefix(v).is_some_and(|r| r.starts_with('-'))
        }
        AttrOp::Prefix => !v.is_empty() && attr_val.starts_with(v),
        AttrOp::Suffix => !v.is_empty() && attr_val.ends_with(v),
        AttrOp::Substring => !v.is_empty() && attr_val.contains(v),
    }
}

fn matches_pseudo_class(dom: &Dom, node_id: NodeId, elem: &ElementData, pc: &PseudoClass) -> bool {
    match pc {
        // No pointer or focus in a headless tree.
        PseudoClass::Hover | PseudoClass::Active | PseudoClass::Focus => false,

        PseudoClass::Checked => {
            matches!(elem.tag_name.as_str(), "input" | "option")
                && (elem.attr("checked").is_some() || elem.attr("selected").is_some())
        }
        PseudoClass::Disabled => {
            FORM_CONTROLS.contains(&elem.tag_name.as_str()) && elem.attr("disabled").is_some()
        }
        PseudoClass::Enabled => {
            FORM_CONTROLS.contains(&elem.tag_name.as_str()) && elem.attr("disabled").is_none()
        }

        PseudoClass::Root => dom
            .parent(node_id)
            .and_then(|p| dom.get(p))
            .is_some_and(|p| matches!(p.data, NodeData::Document)),

        PseudoClass::Empty => dom.children(node_id).into_iter().all(|c| match dom.get(c) {
            Some(n) => match &n.data {
                NodeData::Element(_) => false,
                NodeData::Text { data } => data.is_empty(),
                _ => true,
            },
            None => true,
        }),

        PseudoClass::FirstChild => dom.prev_element_sibling(node_id).is_none() && has_parent(dom, node_id),
        PseudoClass::LastChild => dom.next_element_sibling(node_id).is_none() && has_parent(dom, node_id),
        PseudoClass::OnlyChild => {
            has_parent(dom, node_id)
                && dom.prev_element_sibling(node_id).is_none()
                && dom.next_element_sibling(node_id).is_none()
        }

        PseudoClass::FirstOfType => same_type_position(dom, node_id, elem).is_some_and(|(i, _)| i == 0),
        PseudoClass::LastOfType => {
            same_type_position(dom, node_id, elem).is_some_and(|(i, len)| i + 1 == len)
        }
        PseudoClass::OnlyOfType => same_type_position(dom, node_id, elem).is_some_and(|(_, len)| len == 1),

        PseudoClass::NthChild(a, b) => sibling_position(dom, node_id)
            .is_some_and(|(i, _)| nth_matches(*a, *b, i as i32 + 1)),
        PseudoClass::NthLastChild(a, b) => sibling_position(dom, node_id)
            .is_some_and(|(i, len)| nth_matches(*a, *b, (len - i) as i32)),

        PseudoClass::Not(args) => !args.iter().any(|c| matches_compound(dom, node_id, c)),
    }
}

fn has_parent(dom: &Dom, node_id: NodeId) -> bool {
    dom.parent(node_id).is_some()
}

/// `(index, count)` among the parent's element children.
fn sibling_position(dom: &Dom, node_id: NodeId) -> Option<(usize, usize)> {
    let siblings = dom.element_children(dom.parent(node_id)?);
    let index = siblings.iter().position(|&s| s == node_id)?;
    Some((index, siblings.len()))
}

/// `(index, count)` among element siblings sharing `elem`'s tag.
fn same_type_position(dom: &Dom, node_id: NodeId, elem: &ElementData) -> Option<(usize, usize)> {
    let siblings: Vec<NodeId> = dom
        .element_children(dom.parent(node_id)?)
        .into_iter()
        .filter(|&s| dom.element(s).is_some_and(|e| e.tag_name == elem.tag_name))
        .collect();
    let index = siblings.iter().position(|&s| s == node_id)?;
    Some((index, siblings.len()))
}

/// Whether `a*n + b` equals the 1-based `index` for some `n >= 0`.
fn nth_matches(a: i32, b: i32, index: i32) -> bool {
    if a == 0 {
        return index == b;
    }
    let diff = index - b;
    diff % a == 0 && diff / a >= 0
}
