//! Headless document: a shared handle over the DOM tree, its `<style>`
//! sheets, its event listeners and the running-animation state.
//!
//! All methods take `&self`; state lives behind `RefCell`s and no borrow is
//! held while listeners run, so callbacks may call back into the document.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use css::{StyleSheet, parse_selector_list};
use dom::{Attr, Dom, Event, EventListener, EventTargetMap, ListenerId, NodeId};
use style::{AnimationStyle, AnimationTracker, collect_matching_rules, matches_any, resolve_animation_style};
use tracing::{debug, trace};

use crate::error::DomException;

/// Event type fired when an animation starts.
pub const ANIMATION_START: &str = "animationstart";

/// User-agent rules that matter to animations: metadata elements never render.
const USER_AGENT_CSS: &str = "head, style, script, title, meta, link, template { display: none }";

struct Inner {
    dom: RefCell<Dom>,
    listeners: RefCell<EventTargetMap>,
    /// Sheet owned by each `<style>` element.
    sheets: RefCell<HashMap<NodeId, StyleSheet>>,
    animations: RefCell<AnimationTracker>,
    user_agent: StyleSheet,
    html: NodeId,
    head: NodeId,
    body: NodeId,
}

/// Cloneable handle to a headless document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<Inner>,
}

/// Non-owning handle; see [`Document::downgrade`].
#[derive(Clone, Default)]
pub struct WeakDocument {
    inner: Weak<Inner>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.inner.dom.borrow().len())
            .field("sheets", &self.inner.sheets.borrow().len())
            .finish()
    }
}

impl Document {
    /// `document > html > (head, body)`.
    pub fn new() -> Self {
        let mut dom = Dom::new();
        let doc = dom.document();
        let html = dom.create_html_element("html");
        let head = dom.create_html_element("head");
        let body = dom.create_html_element("body");
        // Fresh nodes under a fresh root cannot form a cycle.
        let _ = dom.append_child(doc, html);
        let _ = dom.append_child(html, head);
        let _ = dom.append_child(html, body);

        Self {
            inner: Rc::new(Inner {
                dom: RefCell::new(dom),
                listeners: RefCell::new(EventTargetMap::new()),
                sheets: RefCell::new(HashMap::new()),
                animations: RefCell::new(AnimationTracker::new()),
                user_agent: StyleSheet::parse(USER_AGENT_CSS),
                html,
                head,
                body,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn document_node(&self) -> NodeId {
        self.inner.dom.borrow().document()
    }

    pub fn document_element(&self) -> NodeId {
        self.inner.html
    }

    pub fn head(&self) -> NodeId {
        self.inner.head
    }

    pub fn body(&self) -> NodeId {
        self.inner.body
    }

    /// Run `f` against the tree.
    pub fn with_dom<R>(&self, f: impl FnOnce(&Dom) -> R) -> R {
        f(&self.inner.dom.borrow())
    }

    // =======================================================================
    // Nodes
    // =======================================================================

    pub fn create_element(&self, tag_name: &str) -> NodeId {
        self.inner.dom.borrow_mut().create_html_element(tag_name)
    }

    /// Create an element with attributes, e.g. `[("class", "test-div")]`.
    pub fn create_element_with(&self, tag_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs.iter().map(|(n, v)| Attr::new(n, v)).collect();
        self.inner.dom.borrow_mut().create_element(tag_name, attrs)
    }

    pub fn create_text(&self, data: &str) -> NodeId {
        self.inner.dom.borrow_mut().create_text(data)
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomException> {
        self.inner.dom.borrow_mut().append_child(parent, child)?;
        Ok(())
    }

    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomException> {
        self.inner
            .dom
            .borrow_mut()
            .insert_before(parent, child, reference)?;
        Ok(())
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomException> {
        self.inner.dom.borrow_mut().remove_child(parent, child)?;
        Ok(())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.dom.borrow().parent(node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.dom.borrow().children(node)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.inner.dom.borrow().is_connected(node)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.inner
            .dom
            .borrow()
            .element(node)
            .map(|e| e.tag_name.clone())
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .dom
            .borrow()
            .element(node)?
            .attr(name)
            .map(str::to_string)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomException> {
        let mut dom = self.inner.dom.borrow_mut();
        let elem = dom
            .element_mut(node)
            .ok_or_else(|| DomException::NotFound(format!("element {node:?}")))?;
        elem.set_attr(name, value);
        Ok(())
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> bool {
        self.inner
            .dom
            .borrow_mut()
            .element_mut(node)
            .is_some_and(|e| e.remove_attr(name))
    }

    /// `Element.className`; empty for non-elements.
    pub fn class_name(&self, node: NodeId) -> String {
        self.get_attribute(node, "class").unwrap_or_default()
    }

    /// `Element.matches`. A selector that fails to parse is a `SyntaxError`.
    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomException> {
        let list = parse_selector_list(selector)?;
        Ok(matches_any(&self.inner.dom.borrow(), node, &list))
    }

    // =======================================================================
    // Style sheets
    // =======================================================================

    /// Append a `<style>` element holding `css` to `<head>`. Rules that fail
    /// to parse are dropped.
    pub fn add_style_sheet(&self, css: &str) -> NodeId {
        let style_el = self.create_element("style");
        self.inner
            .sheets
            .borrow_mut()
            .insert(style_el, StyleSheet::parse(css));
        // The head is never removed, so appending to it cannot fail.
        let _ = self.append_child(self.inner.head, style_el);
        style_el
    }

    /// Insert an empty `<style id=…>` as the first child of `<head>`.
    pub fn prepend_style_sheet(&self, id: &str) -> NodeId {
        let style_el = self.create_element_with("style", &[("id", id)]);
        self.inner
            .sheets
            .borrow_mut()
            .insert(style_el, StyleSheet::new());
        let first = self.children(self.inner.head).first().copied();
        let _ = self.insert_before(self.inner.head, style_el, first);
        debug!(?style_el, id, "style element inserted");
        style_el
    }

    /// Detach a `<style>` element and discard its sheet.
    pub fn remove_style_sheet(&self, style_el: NodeId) -> Result<(), DomException> {
        if self.inner.sheets.borrow_mut().remove(&style_el).is_none() {
            return Err(DomException::NoStyleSheet(style_el));
        }
        if let Some(parent) = self.parent(style_el) {
            self.remove_child(parent, style_el)?;
        }
        debug!(?style_el, "style element removed");
        Ok(())
    }

    /// Connected `<style>` elements in tree order.
    pub fn style_sheets(&self) -> Vec<NodeId> {
        let dom = self.inner.dom.borrow();
        let sheets = self.inner.sheets.borrow();
        dom.descendants(dom.document())
            .into_iter()
            .filter(|n| sheets.contains_key(n))
            .collect()
    }

    fn with_sheet_mut<R>(
        &self,
        style_el: NodeId,
        f: impl FnOnce(&mut StyleSheet) -> R,
    ) -> Result<R, DomException> {
        let mut sheets = self.inner.sheets.borrow_mut();
        let sheet = sheets
            .get_mut(&style_el)
            .ok_or(DomException::NoStyleSheet(style_el))?;
        Ok(f(sheet))
    }

    /// `CSSStyleSheet.insertRule`, with an optional owner tag on the rule.
    pub fn insert_rule(
        &self,
        style_el: NodeId,
        rule: &str,
        index: usize,
        owner: Option<&str>,
    ) -> Result<usize, DomException> {
        let index = self
            .with_sheet_mut(style_el, |s| s.insert_rule(rule, index, owner.map(str::to_string)))??;
        trace!(?style_el, index, rule, "rule inserted");
        Ok(index)
    }

    pub fn delete_rule(&self, style_el: NodeId, index: usize) -> Result<(), DomException> {
        self.with_sheet_mut(style_el, |s| s.delete_rule(index))??;
        Ok(())
    }

    pub fn rule_count(&self, style_el: NodeId) -> usize {
        self.inner
            .sheets
            .borrow()
            .get(&style_el)
            .map_or(0, StyleSheet::len)
    }

    pub fn rule_owner(&self, style_el: NodeId, index: usize) -> Option<String> {
        self.inner
            .sheets
            .borrow()
            .get(&style_el)?
            .owner(index)
            .map(str::to_string)
    }

    /// Whether a connected sheet defines `@keyframes name`.
    pub fn keyframes_defined(&self, name: &str) -> bool {
        let sheets = self.inner.sheets.borrow();
        self.style_sheets()
            .iter()
            .filter_map(|id| sheets.get(id))
            .any(|s| s.keyframes(name).is_some())
    }

    // =======================================================================
    // Events
    // =======================================================================

    pub fn add_event_listener<F>(&self, node: NodeId, type_: &str, capture: bool, f: F) -> ListenerId
    where
        F: Fn(&mut Event) + 'static,
    {
        self.inner
            .listeners
            .borrow_mut()
            .add_listener(node, EventListener::new(type_, capture, f))
    }

    pub fn remove_event_listener(&self, node: NodeId, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove_listener(node, id)
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.inner.listeners.borrow().listener_count(node)
    }

    /// Dispatch `event` at `target`. Returns `false` if the default action
    /// was prevented.
    pub fn dispatch_event(&self, target: NodeId, event: &mut Event) -> bool {
        let path = {
            let dom = self.inner.dom.borrow();
            let mut path = dom.ancestors(target);
            path.reverse();
            path.push(target);
            path
        };
        let listeners = &self.inner.listeners;
        dom::dispatch_along(
            &path,
            |node, type_| listeners.borrow().matching_listeners(node, type_),
            event,
        )
    }

    // =======================================================================
    // Rendering update
    // =======================================================================

    /// Recompute animation styles and fire `animationstart` for every
    /// animation that started. Returns the number of events fired.
    pub fn update_style(&self) -> usize {
        let started = self.collect_started_animations();
        for (target, name) in &started {
            trace!(?target, name, "animationstart");
            let mut event = Event::animation(ANIMATION_START, name);
            self.dispatch_event(*target, &mut event);
        }
        started.len()
    }

    fn collect_started_animations(&self) -> Vec<(NodeId, String)> {
        let dom = self.inner.dom.borrow();
        let sheet_map = self.inner.sheets.borrow();
        let sheets: Vec<&StyleSheet> = std::iter::once(&self.inner.user_agent)
            .chain(
                dom.descendants(dom.document())
                    .into_iter()
                    .filter_map(|n| sheet_map.get(&n)),
            )
            .collect();
        let is_defined = |name: &str| sheets.iter().any(|s| s.keyframes(name).is_some());

        let mut tracker = self.inner.animations.borrow_mut();
        let mut visited = HashSet::new();
        let mut started = Vec::new();

        // Pre-order walk carrying the parent's style for `inherit`.
        let mut stack: Vec<(NodeId, Option<Rc<AnimationStyle>>)> = dom
            .element_children(dom.document())
            .into_iter()
            .rev()
            .map(|n| (n, None))
            .collect();
        while let Some((node, parent_style)) = stack.pop() {
            let Some(elem) = dom.element(node) else {
                continue;
            };
            let matched = collect_matching_rules(&dom, node, &sheets, elem.attr("style"));
            let style = resolve_animation_style(&matched, parent_style.as_deref());
            if style.display_none {
                continue;
            }
            visited.insert(node);
            for name in tracker.update(node, &style.animations(), is_defined) {
                started.push((node, name));
            }
            let style = Rc::new(style);
            for child in dom.element_children(node).into_iter().rev() {
                stack.push((child, Some(style.clone())));
            }
        }

        tracker.retain(|n| visited.contains(&n));
        started
    }

    /// Names of the animations running on `node`.
    pub fn running_animations(&self, node: NodeId) -> Vec<String> {
        self.inner
            .animations
            .borrow()
            .running(node)
            .iter()
            .map(|a| a.animation_name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn record_starts(doc: &Document) -> Rc<RefCell<Vec<(Option<NodeId>, String)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        doc.add_event_listener(doc.document_node(), ANIMATION_START, true, move |ev| {
            let name = ev.animation_name().unwrap_or_default().to_string();
            l.borrow_mut().push((ev.target, name));
        });
        log
    }

    #[test]
    fn skeleton() {
        let doc = Document::new();
        assert_eq!(doc.children(doc.document_node()), vec![doc.document_element()]);
        assert_eq!(doc.children(doc.document_element()), vec![doc.head(), doc.body()]);
        assert_eq!(doc.tag_name(doc.head()).as_deref(), Some("head"));
    }

    #[test]
    fn inserted_element_fires_once() {
        let doc = Document::new();
        doc.add_style_sheet("@keyframes k { from {} to {} } .x { animation-name: k; animation-duration: 1ms }");
        let log = record_starts(&doc);

        let el = doc.create_element_with("div", &[("class", "x")]);
        assert_eq!(doc.update_style(), 0);
        doc.append_child(doc.body(), el).unwrap();
        assert_eq!(doc.update_style(), 1);
        assert_eq!(doc.update_style(), 0);
        assert_eq!(*log.borrow(), vec![(Some(el), "k".to_string())]);
        assert_eq!(doc.running_animations(el), vec!["k"]);
    }

    #[test]
    fn reinsertion_fires_again() {
        let doc = Document::new();
        doc.add_style_sheet("@keyframes k {} div { animation-name: k }");
        let log = record_starts(&doc);
        let el = doc.create_element("div");

        doc.append_child(doc.body(), el).unwrap();
        doc.update_style();
        doc.remove_child(doc.body(), el).unwrap();
        doc.update_style();
        assert!(doc.running_animations(el).is_empty());
        doc.append_child(doc.body(), el).unwrap();
        doc.update_style();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn undefined_keyframes_do_not_fire() {
        let doc = Document::new();
        let sheet = doc.add_style_sheet(".x { animation-name: later }");
        let el = doc.create_element_with("p", &[("class", "x")]);
        doc.append_child(doc.body(), el).unwrap();
        assert_eq!(doc.update_style(), 0);

        doc.insert_rule(sheet, "@keyframes later{from{}to{}}", 0, None).unwrap();
        assert_eq!(doc.update_style(), 1);
    }

    #[test]
    fn display_none_subtree_is_skipped_but_hidden_is_not() {
        let doc = Document::new();
        doc.add_style_sheet("@keyframes k {} .x { animation-name: k } .gone { display: none }");
        let hidden = doc.create_element_with("div", &[("class", "x"), ("style", "visibility:hidden")]);
        let gone = doc.create_element_with("section", &[("class", "gone")]);
        let inner = doc.create_element_with("div", &[("class", "x")]);
        doc.append_child(gone, inner).unwrap();
        doc.append_child(doc.body(), hidden).unwrap();
        doc.append_child(doc.body(), gone).unwrap();

        assert_eq!(doc.update_style(), 1);
        assert!(doc.running_animations(inner).is_empty());

        doc.set_attribute(gone, "class", "").unwrap();
        assert_eq!(doc.update_style(), 1);
        assert_eq!(doc.running_animations(inner), vec!["k"]);
    }

    #[test]
    fn prepended_sheet_loses_to_later_sheets() {
        let doc = Document::new();
        doc.add_style_sheet("@keyframes author {} .x { animation-name: author }");
        let first = doc.prepend_style_sheet("sentineljs");
        doc.insert_rule(first, "@keyframes mine{}", 0, Some(".x")).unwrap();
        doc.insert_rule(first, ".x{animation-name:mine}", 1, Some(".x")).unwrap();

        assert_eq!(doc.style_sheets()[0], first);
        assert_eq!(doc.get_attribute(first, "id").as_deref(), Some("sentineljs"));
        assert_eq!(doc.rule_owner(first, 1).as_deref(), Some(".x"));

        let el = doc.create_element_with("div", &[("class", "x")]);
        doc.append_child(doc.body(), el).unwrap();
        doc.update_style();
        assert_eq!(doc.running_animations(el), vec!["author"]);
    }

    #[test]
    fn rule_errors_map_to_dom_exceptions() {
        let doc = Document::new();
        let sheet = doc.prepend_style_sheet("s");
        assert!(matches!(
            doc.insert_rule(sheet, "!nope{}", 0, None),
            Err(DomException::Syntax(_))
        ));
        assert_eq!(
            doc.insert_rule(sheet, "a{}", 3, None),
            Err(DomException::IndexSize { index: 3, len: 0 })
        );
        assert_eq!(doc.delete_rule(sheet, 0), Err(DomException::IndexSize { index: 0, len: 0 }));
        let body = doc.body();
        assert_eq!(doc.insert_rule(body, "a{}", 0, None), Err(DomException::NoStyleSheet(body)));
    }

    #[test]
    fn removed_sheet_stops_applying() {
        let doc = Document::new();
        let sheet = doc.prepend_style_sheet("s");
        doc.insert_rule(sheet, "@keyframes k{}", 0, None).unwrap();
        assert!(doc.keyframes_defined("k"));
        doc.remove_style_sheet(sheet).unwrap();
        assert!(!doc.keyframes_defined("k"));
        assert_eq!(doc.rule_count(sheet), 0);
        assert!(doc.remove_style_sheet(sheet).is_err());
    }

    #[test]
    fn matches_reports_syntax_errors() {
        let doc = Document::new();
        let el = doc.create_element_with("div", &[("class", "test-div")]);
        assert_eq!(doc.matches(el, ".test-div"), Ok(true));
        assert_eq!(doc.matches(el, "span"), Ok(false));
        assert!(doc.matches(el, "!node-inserted").is_err());
    }

    #[test]
    fn listeners_may_mutate_the_document() {
        let doc = Document::new();
        doc.add_style_sheet("@keyframes k {} .x { animation-name: k }");
        let weak = doc.downgrade();
        doc.add_event_listener(doc.document_node(), ANIMATION_START, true, move |ev| {
            let (Some(doc), Some(target)) = (weak.upgrade(), ev.target) else {
                return;
            };
            let child = doc.create_element_with("span", &[("class", "x")]);
            if doc.tag_name(target).as_deref() == Some("div") {
                doc.append_child(target, child).unwrap();
            }
        });

        let el = doc.create_element_with("div", &[("class", "x")]);
        doc.append_child(doc.body(), el).unwrap();
        assert_eq!(doc.update_style(), 1);
        // The span appended by the listener is picked up by the next pass.
        assert_eq!(doc.update_style(), 1);
        assert_eq!(doc.children(el).len(), 1);
    }

    #[test]
    fn weak_handle_does_not_keep_document_alive() {
        let doc = Document::new();
        let weak = doc.downgrade();
        assert!(weak.upgrade().is_some_and(|d| d.ptr_eq(&doc)));
        drop(doc);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn metadata_elements_never_animate() {
        let doc = Document::new();
        doc.add_style_sheet("@keyframes k {} * { animation-name: k }");
        // html and body start; head and its style element do not.
        assert_eq!(doc.update_style(), 2);
        assert!(doc.running_animations(doc.head()).is_empty());
        assert_eq!(doc.running_animations(doc.body()), vec!["k"]);
    }
}
