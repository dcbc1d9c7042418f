//! Running CSS animations per element.
//!
//! An animation starts when its name first appears in an element's computed
//! `animation-name` while a matching `@keyframes` rule exists. It keeps
//! running (and does not restart) for as long as the name stays in the list.

use std::collections::HashMap;

use dom::NodeId;

/// Runtime state of one animation on one element.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub animation_name: String,
    pub duration_ms: f64,
    /// Elapsed time since the animation started, in milliseconds.
    pub elapsed_ms: f64,
}

impl AnimationState {
    pub fn new(animation_name: &str, duration_ms: f64) -> Self {
        Self {
            animation_name: animation_name.to_string(),
            duration_ms,
            elapsed_ms: 0.0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }
}

/// Animations currently associated with each element.
#[derive(Debug, Clone, Default)]
pub struct AnimationTracker {
    running: HashMap<NodeId, Vec<AnimationState>>,
}

impl AnimationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `node`'s animations with `wanted` (name, duration) pairs whose
    /// keyframes are defined. Returns the names that just started, in order.
    pub fn update<F>(&mut self, node: NodeId, wanted: &[(String, f64)], is_defined: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let previous = self.running.remove(&node).unwrap_or_default();
        let mut next: Vec<AnimationState> = Vec::new();
        let mut started = Vec::new();

        for (name, duration_ms) in wanted {
            if next.iter().any(|a| &a.animation_name == name) || !is_defined(name) {
                continue;
            }
            match previous.iter().find(|a| &a.animation_name == name) {
                Some(existing) => next.push(existing.clone()),
                None => {
                    started.push(name.clone());
                    next.push(AnimationState::new(name, *duration_ms));
                }
            }
        }

        if !next.is_empty() {
            self.running.insert(node, next);
        }
        started
    }

    /// Drop every animation on `node`.
    pub fn forget(&mut self, node: NodeId) {
        self.running.remove(&node);
    }

    /// Keep only the elements for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(NodeId) -> bool,
    {
        self.running.retain(|&node, _| keep(node));
    }

    /// Advance every animation by `delta_ms`.
    pub fn tick(&mut self, delta_ms: f64) {
        for anim in self.running.values_mut().flatten() {
            anim.elapsed_ms += delta_ms;
        }
    }

    pub fn running(&self, node: NodeId) -> &[AnimationState] {
        self.running.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn is_running(&self, node: NodeId, name: &str) -> bool {
        self.running(node).iter().any(|a| a.animation_name == name)
    }

    /// Number of animations that have not yet finished.
    pub fn active_count(&self) -> usize {
        self.running
            .values()
            .flatten()
            .filter(|a| !a.is_finished())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::Dom;

    fn wanted(names: &[&str]) -> Vec<(String, f64)> {
        names.iter().map(|n| (n.to_string(), 0.1)).collect()
    }

    fn node() -> NodeId {
        Dom::new().create_html_element("div")
    }

    #[test]
    fn starts_only_new_defined_names() {
        let mut tracker = AnimationTracker::new();
        let n = node();
        let defined = |name: &str| name != "missing";

        assert_eq!(tracker.update(n, &wanted(&["a", "missing", "b"]), defined), vec!["a", "b"]);
        assert!(tracker.update(n, &wanted(&["a", "b"]), defined).is_empty());
        assert_eq!(tracker.update(n, &wanted(&["b", "c"]), defined), vec!["c"]);
        assert!(!tracker.is_running(n, "a"));
    }

    #[test]
    fn removing_a_name_lets_it_restart() {
        let mut tracker = AnimationTracker::new();
        let n = node();
        tracker.update(n, &wanted(&["a"]), |_| true);
        tracker.update(n, &[], |_| true);
        assert!(tracker.running(n).is_empty());
        assert_eq!(tracker.update(n, &wanted(&["a"]), |_| true), vec!["a"]);
    }

    #[test]
    fn duplicate_names_start_once() {
        let mut tracker = AnimationTracker::new();
        let n = node();
        assert_eq!(tracker.update(n, &wanted(&["a", "a"]), |_| true), vec!["a"]);
        assert_eq!(tracker.running(n).len(), 1);
    }

    #[test]
    fn forget_and_retain() {
        let mut tracker = AnimationTracker::new();
        let mut dom = Dom::new();
        let a = dom.create_html_element("a");
        let b = dom.create_html_element("b");
        tracker.update(a, &wanted(&["x"]), |_| true);
        tracker.update(b, &wanted(&["x"]), |_| true);

        tracker.retain(|n| n == a);
        assert!(tracker.running(b).is_empty());
        tracker.forget(a);
        assert_eq!(tracker.update(a, &wanted(&["x"]), |_| true), vec!["x"]);
    }

    #[test]
    fn tick_finishes_short_animations() {
        let mut tracker = AnimationTracker::new();
        let n = node();
        tracker.update(n, &[("long".into(), 1000.0), ("short".into(), 0.1)], |_| true);
        assert_eq!(tracker.active_count(), 2);
        tracker.tick(16.0);
        assert_eq!(tracker.active_count(), 1);
    }
}
