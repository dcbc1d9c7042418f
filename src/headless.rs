//! [`Host`] implementation for the headless [`Document`].

use document::{DomException, Document, Event, ListenerId, NodeId, WeakDocument};
use tracing::trace;

use crate::host::{AnimationHandler, AnimationStart, Host};

/// An animation event in flight through a headless document.
struct HeadlessAnimationEvent<'a> {
    event: &'a mut Event,
    document: WeakDocument,
}

impl AnimationStart<NodeId> for HeadlessAnimationEvent<'_> {
    fn animation_name(&self) -> &str {
        self.event.animation_name().unwrap_or("")
    }

    fn target(&self) -> Option<NodeId> {
        self.event.target
    }

    fn target_matches(&self, selector: &str) -> bool {
        match (self.event.target, self.document.upgrade()) {
            (Some(target), Some(doc)) => doc.matches_selector(&target, selector),
            _ => false,
        }
    }

    fn stop_immediate_propagation(&mut self) {
        self.event.stop_immediate_propagation();
    }
}

impl Host for Document {
    type Element = NodeId;
    type StyleSheet = NodeId;
    type Listener = ListenerId;
    type Error = DomException;

    fn create_style_sheet(&self, id: &str) -> Result<NodeId, DomException> {
        Ok(self.prepend_style_sheet(id))
    }

    fn remove_style_sheet(&self, sheet: &NodeId) -> Result<(), DomException> {
        Document::remove_style_sheet(self, *sheet)
    }

    fn insert_rule(
        &self,
        sheet: &NodeId,
        rule: &str,
        index: usize,
        owner: Option<&str>,
    ) -> Result<usize, DomException> {
        Document::insert_rule(self, *sheet, rule, index, owner)
    }

    fn delete_rule(&self, sheet: &NodeId, index: usize) -> Result<(), DomException> {
        Document::delete_rule(self, *sheet, index)
    }

    fn rule_count(&self, sheet: &NodeId) -> usize {
        Document::rule_count(self, *sheet)
    }

    fn rule_owner(&self, sheet: &NodeId, index: usize) -> Option<String> {
        Document::rule_owner(self, *sheet, index)
    }

    fn keyframes_defined(&self, name: &str) -> bool {
        Document::keyframes_defined(self, name)
    }

    fn matches_selector(&self, element: &NodeId, selector: &str) -> bool {
        self.matches(*element, selector).unwrap_or(false)
    }

    fn add_animation_listener(
        &self,
        event_type: &str,
        handler: AnimationHandler<NodeId>,
    ) -> ListenerId {
        let document = self.downgrade();
        self.add_event_listener(self.document_node(), event_type, true, move |event| {
            trace!(type_ = %event.type_, "animation listener invoked");
            let mut view = HeadlessAnimationEvent {
                event,
                document: document.clone(),
            };
            handler(&mut view);
        })
    }

    fn remove_animation_listener(&self, listener: ListenerId) {
        self.remove_event_listener(self.document_node(), listener);
    }
}
