//! The host document seen by the watcher.

use std::rc::Rc;

/// An `AnimationEvent` being dispatched, as seen by the watcher's listener.
pub trait AnimationStart<E> {
    /// `AnimationEvent.animationName`.
    fn animation_name(&self) -> &str;

    /// The element the animation started on.
    fn target(&self) -> Option<E>;

    /// `target.matches(selector)`; `false` for selectors the host cannot parse.
    fn target_matches(&self, selector: &str) -> bool;

    fn stop_immediate_propagation(&mut self);
}

/// The listener body the watcher hands to the host.
pub type AnimationHandler<E> = Rc<dyn Fn(&mut dyn AnimationStart<E>)>;

/// Document and CSSOM operations the watcher needs.
///
/// Methods take `&self`; hosts are shared handles with interior mutability,
/// and may be re-entered from inside a listener.
pub trait Host {
    type Element: Clone + 'static;
    /// Handle to a style sheet created by [`Host::create_style_sheet`].
    type StyleSheet: Clone;
    /// Handle to an installed listener.
    type Listener;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a `<style>` element with the given `id` as the first child of
    /// `<head>` and return its sheet.
    fn create_style_sheet(&self, id: &str) -> Result<Self::StyleSheet, Self::Error>;

    /// Detach the sheet's element; its rules stop applying.
    fn remove_style_sheet(&self, sheet: &Self::StyleSheet) -> Result<(), Self::Error>;

    /// `insertRule`, tagging the new rule with `owner`.
    fn insert_rule(
        &self,
        sheet: &Self::StyleSheet,
        rule: &str,
        index: usize,
        owner: Option<&str>,
    ) -> Result<usize, Self::Error>;

    fn delete_rule(&self, sheet: &Self::StyleSheet, index: usize) -> Result<(), Self::Error>;

    fn rule_count(&self, sheet: &Self::StyleSheet) -> usize;

    fn rule_owner(&self, sheet: &Self::StyleSheet, index: usize) -> Option<String>;

    /// Whether any attached sheet defines `@keyframes name`.
    fn keyframes_defined(&self, name: &str) -> bool;

    /// `Element.matches`; `false` for invalid selectors.
    fn matches_selector(&self, element: &Self::Element, selector: &str) -> bool;

    /// Install a capture-phase listener for `event_type` on the document.
    fn add_animation_listener(
        &self,
        event_type: &str,
        handler: AnimationHandler<Self::Element>,
    ) -> Self::Listener;

    fn remove_animation_listener(&self, listener: Self::Listener);
}
