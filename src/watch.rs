//! The public watcher: `on`, `off` and `reset`.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::config::SentinelConfig;
use crate::dispatch;
use crate::error::SentinelError;
use crate::host::Host;
use crate::registry::{Callback, CallbackRegistry};
use crate::rules::RuleStore;
use crate::selector::SelectorList;

/// Everything the watcher mutates; shared with its listener.
pub(crate) struct State<H: Host> {
    pub(crate) rules: RuleStore<H>,
    pub(crate) callbacks: CallbackRegistry<H::Element>,
}

/// Detects elements matching CSS selectors as they are inserted into the
/// host document.
///
/// Nothing touches the document until the first [`on`](Self::on). Each
/// instance owns its own style sheet and listeners, so several watchers may
/// share a document.
///
/// ```ignore
/// let doc = Document::new();
/// let sentinel = Sentinel::new(doc.clone());
/// sentinel.on(".test-div", &Callback::new(|el: &NodeId| println!("{el:?}")))?;
/// ```
#[derive(Clone)]
pub struct Sentinel<H: Host> {
    host: H,
    config: Rc<SentinelConfig>,
    state: Rc<RefCell<State<H>>>,
}

impl<H: Host + 'static> Sentinel<H> {
    pub fn new(host: H) -> Self {
        Self::build(host, SentinelConfig::default())
    }

    pub fn with_config(host: H, config: SentinelConfig) -> Result<Self, SentinelError> {
        config.validate()?;
        Ok(Self::build(host, config))
    }

    fn build(host: H, config: SentinelConfig) -> Self {
        Self {
            host,
            config: Rc::new(config),
            state: Rc::new(RefCell::new(State {
                rules: RuleStore::new(),
                callbacks: CallbackRegistry::new(),
            })),
        }
    }

    /// Call `callback` with every element matching one of `selectors` that
    /// is inserted from now on. A `None` callback does nothing.
    ///
    /// A selector starting with the marker names an existing animation
    /// instead; its elements are reported whenever that animation starts.
    /// If the host rejects a selector, selectors before it in the list stay
    /// registered.
    pub fn on<'a, S>(
        &self,
        selectors: &S,
        callback: impl Into<Option<&'a Callback<H::Element>>>,
    ) -> Result<(), SentinelError>
    where
        S: SelectorList + ?Sized,
    {
        self.register(selectors, callback.into(), None)
    }

    /// Like [`on`](Self::on), also starting `extra_animations` (a CSS
    /// `animation-name` list) on the matched elements.
    pub fn on_with_animations<'a, S>(
        &self,
        selectors: &S,
        callback: impl Into<Option<&'a Callback<H::Element>>>,
        extra_animations: &str,
    ) -> Result<(), SentinelError>
    where
        S: SelectorList + ?Sized,
    {
        self.register(selectors, callback.into(), Some(extra_animations))
    }

    fn register<S>(
        &self,
        selectors: &S,
        callback: Option<&Callback<H::Element>>,
        extra_animations: Option<&str>,
    ) -> Result<(), SentinelError>
    where
        S: SelectorList + ?Sized,
    {
        let Some(callback) = callback else {
            return Ok(());
        };

        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let weak = Rc::downgrade(&self.state);
        let config = Rc::clone(&self.config);
        state
            .rules
            .ensure_initialized(&self.host, &self.config, || dispatch::handler(weak, config))?;

        for raw in selectors.selectors() {
            let id = state
                .rules
                .register(&self.host, &self.config, raw, extra_animations)?;
            state.callbacks.append(&id, callback.clone());
        }
        Ok(())
    }

    /// Stop calling `callback` for `selectors`, or every callback when it is
    /// `None`. A selector left without callbacks has its rules removed.
    /// Unknown selectors are ignored.
    pub fn off<'a, S>(
        &self,
        selectors: &S,
        callback: impl Into<Option<&'a Callback<H::Element>>>,
    ) -> Result<(), SentinelError>
    where
        S: SelectorList + ?Sized,
    {
        let callback = callback.into();
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        for raw in selectors.selectors() {
            let Some(id) = state.rules.animation_id(raw).cloned() else {
                trace!(selector = raw, "off: unknown selector");
                continue;
            };
            if state.callbacks.remove(&id, callback) {
                state.rules.unregister(&self.host, raw)?;
            }
        }
        Ok(())
    }

    /// Remove the style sheet and listeners and forget every registration.
    /// State is cleared even when the host reports an error.
    pub fn reset(&self) -> Result<(), SentinelError> {
        let mut state = self.state.borrow_mut();
        state.callbacks.clear_all();
        state.rules.reset(&self.host)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().rules.is_initialized()
    }

    /// The animation name `selector` is bound to, if registered.
    pub fn animation_id(&self, selector: &str) -> Option<String> {
        self.state
            .borrow()
            .rules
            .animation_id(selector)
            .map(|id| id.to_string())
    }

    pub fn callback_count(&self, selector: &str) -> usize {
        let state = self.state.borrow();
        state
            .rules
            .animation_id(selector)
            .map_or(0, |id| state.callbacks.count(id))
    }

    /// Rules currently in the watcher's style sheet, including any the
    /// caller inserted there.
    pub fn rule_count(&self) -> usize {
        self.state.borrow().rules.rule_count(&self.host)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CallbackFailure, DispatchMode};
    use document::{DomException, Document, Event, NodeId};
    use proptest::prelude::*;
    use std::panic::{self, AssertUnwindSafe};
    use tracing_subscriber::EnvFilter;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn setup() -> (Document, Sentinel<Document>) {
        init_tracing();
        let doc = Document::new();
        let sentinel = Sentinel::new(doc.clone());
        (doc, sentinel)
    }

    type Log<T> = Rc<RefCell<Vec<T>>>;

    fn recorder(log: &Log<NodeId>) -> Callback<NodeId> {
        let log = log.clone();
        Callback::new(move |el: &NodeId| log.borrow_mut().push(*el))
    }

    fn labelled(log: &Log<&'static str>, label: &'static str) -> Callback<NodeId> {
        let log = log.clone();
        Callback::new(move |_: &NodeId| log.borrow_mut().push(label))
    }

    fn insert(doc: &Document, tag: &str, class: &str) -> NodeId {
        let el = doc.create_element_with(tag, &[("class", class)]);
        doc.append_child(doc.body(), el).unwrap();
        el
    }

    #[test]
    fn detects_an_inserted_element_once() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".test-div", &recorder(&log)).unwrap();
        assert!(sentinel.is_initialized());

        let div = insert(&doc, "div", "test-div");
        doc.update_style();
        doc.update_style();
        assert_eq!(*log.borrow(), vec![div]);
    }

    #[test]
    fn nothing_happens_before_first_on() {
        let (doc, sentinel) = setup();
        assert!(!sentinel.is_initialized());
        assert!(doc.style_sheets().is_empty());
        assert_eq!(doc.listener_count(doc.document_node()), 0);
        assert_eq!(sentinel.rule_count(), 0);
    }

    #[test]
    fn style_element_is_first_in_head() {
        let (doc, sentinel) = setup();
        let existing = doc.add_style_sheet(".other { color: red }");
        sentinel.on(".a", &Callback::new(|_: &NodeId| {})).unwrap();
        let sheets = doc.style_sheets();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1], existing);
        assert_eq!(doc.children(doc.head())[0], sheets[0]);
        assert_eq!(doc.get_attribute(sheets[0], "id").as_deref(), Some("sentineljs"));
        assert_eq!(doc.listener_count(doc.document_node()), 3);
    }

    #[test]
    fn registering_twice_keeps_one_rule_pair() {
        let (_doc, sentinel) = setup();
        let cb = Callback::new(|_: &NodeId| {});
        sentinel.on(".test-div", &cb).unwrap();
        let id = sentinel.animation_id(".test-div");
        sentinel.on(".test-div", &cb).unwrap();
        assert_eq!(sentinel.rule_count(), 2);
        assert_eq!(sentinel.animation_id(".test-div"), id);
        assert!(id.is_some_and(|id| id.starts_with("sentinel-")));
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".a", &labelled(&log, "first")).unwrap();
        sentinel.on(".a", &labelled(&log, "second")).unwrap();
        sentinel.on(".a", &labelled(&log, "third")).unwrap();
        insert(&doc, "div", "a");
        doc.update_style();
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn selector_arrays_register_each_selector() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(&[".a", ".b"], &recorder(&log)).unwrap();
        assert_eq!(sentinel.rule_count(), 4);

        let a = insert(&doc, "div", "a");
        let b = insert(&doc, "span", "b");
        insert(&doc, "p", "c");
        doc.update_style();
        assert_eq!(*log.borrow(), vec![a, b]);
    }

    #[test]
    fn custom_animation_name() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on("!node-inserted", &recorder(&log)).unwrap();
        assert_eq!(sentinel.animation_id("!node-inserted").as_deref(), Some("node-inserted"));
        assert_eq!(sentinel.rule_count(), 1);

        let sheet = doc.style_sheets()[0];
        doc.insert_rule(
            sheet,
            ".test-div{animation-duration:0.0001s;animation-name:node-inserted;}",
            0,
            None,
        )
        .unwrap();
        assert_eq!(sentinel.rule_count(), 2);

        let div = insert(&doc, "div", "test-div");
        doc.update_style();
        assert_eq!(*log.borrow(), vec![div]);
    }

    #[test]
    fn custom_animation_keeps_external_keyframes() {
        let (doc, sentinel) = setup();
        doc.add_style_sheet("@keyframes fade { from { opacity: 0 } to { opacity: 1 } } .f { animation: fade 1s }");
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on("!fade", &recorder(&log)).unwrap();
        assert_eq!(sentinel.rule_count(), 0);

        let el = insert(&doc, "div", "f");
        doc.update_style();
        assert_eq!(*log.borrow(), vec![el]);

        sentinel.off("!fade", None).unwrap();
        assert!(doc.keyframes_defined("fade"));
    }

    #[test]
    fn hidden_elements_are_detected() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".a", &recorder(&log)).unwrap();
        let el = doc.create_element_with("div", &[("class", "a"), ("style", "visibility: hidden")]);
        doc.append_child(doc.body(), el).unwrap();
        let gone = doc.create_element_with("div", &[("class", "a"), ("style", "display: none")]);
        doc.append_child(doc.body(), gone).unwrap();
        doc.update_style();
        assert_eq!(*log.borrow(), vec![el]);
    }

    #[test]
    fn off_removes_only_the_given_callback() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let cb1 = labelled(&log, "cb1");
        let cb2 = labelled(&log, "cb2");
        sentinel.on(".test-div", &cb1).unwrap();
        sentinel.on(".test-div", &cb2).unwrap();
        assert_eq!(sentinel.rule_count(), 2);

        sentinel.off(".test-div", &cb1).unwrap();
        assert_eq!(sentinel.rule_count(), 2);
        assert_eq!(sentinel.callback_count(".test-div"), 1);
        insert(&doc, "div", "test-div");
        doc.update_style();
        assert_eq!(*log.borrow(), vec!["cb2"]);

        sentinel.off(".test-div", &cb2).unwrap();
        assert_eq!(sentinel.rule_count(), 0);
        assert_eq!(sentinel.animation_id(".test-div"), None);
    }

    #[test]
    fn off_without_callback_removes_all() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".a", &labelled(&log, "x")).unwrap();
        sentinel.on(".a", &labelled(&log, "y")).unwrap();
        sentinel.off(".a", None).unwrap();
        assert_eq!(sentinel.rule_count(), 0);
        assert_eq!(sentinel.callback_count(".a"), 0);

        insert(&doc, "div", "a");
        doc.update_style();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn off_custom_animation() {
        let (_doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let cb1 = labelled(&log, "cb1");
        let cb2 = labelled(&log, "cb2");
        sentinel.on("!custom", &cb1).unwrap();
        sentinel.on("!custom", &cb2).unwrap();
        assert_eq!(sentinel.rule_count(), 1);
        sentinel.off("!custom", &cb1).unwrap();
        assert_eq!(sentinel.rule_count(), 1);
        sentinel.off("!custom", &cb2).unwrap();
        assert_eq!(sentinel.rule_count(), 0);
    }

    #[test]
    fn reset_starts_fresh() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(&[".a", "!b"], &recorder(&log)).unwrap();
        sentinel.reset().unwrap();

        assert!(!sentinel.is_initialized());
        assert!(doc.style_sheets().is_empty());
        assert_eq!(doc.listener_count(doc.document_node()), 0);
        assert_eq!(sentinel.animation_id(".a"), None);
        assert_eq!(sentinel.callback_count(".a"), 0);
        assert!(!doc.keyframes_defined("b"));

        insert(&doc, "div", "a");
        doc.update_style();
        assert!(log.borrow().is_empty());

        sentinel.on(".c", &recorder(&log)).unwrap();
        assert_eq!(sentinel.rule_count(), 2);
        let c = insert(&doc, "div", "c");
        doc.update_style();
        assert_eq!(*log.borrow(), vec![c]);
    }

    #[test]
    fn reset_before_use_is_a_no_op() {
        let (_doc, sentinel) = setup();
        sentinel.reset().unwrap();
        assert!(!sentinel.is_initialized());
    }

    #[test]
    fn off_inside_a_callback_finishes_the_firing() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = sentinel.clone();
        let first_log = log.clone();
        let first = Callback::new(move |_: &NodeId| {
            first_log.borrow_mut().push("first");
            handle.off(".a", None).unwrap();
        });
        sentinel.on(".a", &first).unwrap();
        sentinel.on(".a", &labelled(&log, "second")).unwrap();

        insert(&doc, "div", "a");
        doc.update_style();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(sentinel.rule_count(), 0);

        insert(&doc, "div", "a");
        doc.update_style();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn on_inside_a_callback() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = sentinel.clone();
        let inner = recorder(&log);
        sentinel
            .on(".outer", &Callback::new(move |_: &NodeId| handle.on(".inner", &inner).unwrap()))
            .unwrap();

        insert(&doc, "div", "outer");
        doc.update_style();
        let el = insert(&doc, "div", "inner");
        doc.update_style();
        assert_eq!(*log.borrow(), vec![el]);
    }

    #[test]
    fn missing_callback_and_unknown_selector_are_ignored() {
        let (_doc, sentinel) = setup();
        sentinel.on(".a", None).unwrap();
        assert!(!sentinel.is_initialized());
        sentinel.off(".nope", None).unwrap();
        sentinel.off(".nope", &Callback::new(|_: &NodeId| {})).unwrap();
        assert_eq!(sentinel.rule_count(), 0);
    }

    #[test]
    fn host_rejection_propagates() {
        let (_doc, sentinel) = setup();
        let cb = Callback::new(|_: &NodeId| {});
        sentinel.on(".ok", &cb).unwrap();

        let err = sentinel.on(&[".fine", "div >", ".never"], &cb).unwrap_err();
        assert!(matches!(err.host_error::<DomException>(), Some(DomException::Syntax(_))));
        // `.fine` stays; the failed selector left no keyframes behind.
        assert_eq!(sentinel.rule_count(), 4);
        assert_eq!(sentinel.animation_id("div >"), None);
        assert_eq!(sentinel.animation_id(".never"), None);
        assert_eq!(sentinel.callback_count(".fine"), 1);
    }

    #[test]
    fn duplicate_callbacks_fire_and_leave_together() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let cb = recorder(&log);
        sentinel.on(".a", &cb).unwrap();
        sentinel.on(".a", &cb).unwrap();
        assert_eq!(sentinel.callback_count(".a"), 2);

        let el = insert(&doc, "div", "a");
        doc.update_style();
        assert_eq!(*log.borrow(), vec![el, el]);

        sentinel.off(".a", &cb).unwrap();
        assert_eq!(sentinel.rule_count(), 0);
    }

    #[test]
    fn extra_animations_co_fire() {
        let (doc, sentinel) = setup();
        doc.add_style_sheet("@keyframes glow { from { opacity: 0 } to { opacity: 1 } }");
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on_with_animations(".a", &recorder(&log), "glow").unwrap();

        let el = insert(&doc, "div", "a");
        doc.update_style();
        assert_eq!(*log.borrow(), vec![el]);
        let running = doc.running_animations(el);
        assert!(running.contains(&"glow".to_string()));
        assert!(running.contains(&sentinel.animation_id(".a").unwrap()));
    }

    #[test]
    fn vendor_prefixed_events_are_handled() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".a", &recorder(&log)).unwrap();
        let id = sentinel.animation_id(".a").unwrap();

        let el = doc.create_element_with("div", &[("class", "a")]);
        doc.append_child(doc.body(), el).unwrap();
        doc.dispatch_event(el, &mut Event::animation("webkitAnimationStart", &id));
        doc.dispatch_event(el, &mut Event::animation("mozAnimationStart", &id));
        doc.dispatch_event(el, &mut Event::animation("webkitAnimationStart", "unrelated"));
        assert_eq!(*log.borrow(), vec![el, el]);
    }

    #[test]
    fn handled_events_stop_propagating() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".a", &recorder(&log)).unwrap();
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        let el = insert(&doc, "div", "a");
        doc.add_event_listener(el, "animationstart", false, move |_: &mut Event| {
            *counter.borrow_mut() += 1;
        });

        doc.update_style();
        assert_eq!(*log.borrow(), vec![el]);
        assert_eq!(*seen.borrow(), 0);

        doc.dispatch_event(el, &mut Event::animation("animationstart", "someone-else"));
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn matching_mode_uses_one_shared_animation() {
        init_tracing();
        let doc = Document::new();
        let config = SentinelConfig {
            dispatch_mode: Some(DispatchMode::Matching),
            ..SentinelConfig::default()
        };
        let sentinel = Sentinel::with_config(doc.clone(), config).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let cb = recorder(&log);
        sentinel.on(".a", &cb).unwrap();
        sentinel.on("div", &cb).unwrap();
        assert_eq!(sentinel.rule_count(), 2);
        assert!(doc.keyframes_defined("sentinel-animation-name"));

        let others = Rc::new(RefCell::new(0));
        let counter = others.clone();
        doc.add_event_listener(doc.document_node(), "animationstart", true, move |_: &mut Event| {
            *counter.borrow_mut() += 1;
        });

        let both = insert(&doc, "div", "a");
        let span = insert(&doc, "span", "a");
        insert(&doc, "p", "b");
        assert_eq!(doc.update_style(), 5);
        // html, body and the <p> are not ours.
        assert_eq!(*others.borrow(), 3);
        assert_eq!(*log.borrow(), vec![both, both, span]);

        sentinel.off(".a", None).unwrap();
        sentinel.off("div", None).unwrap();
        assert_eq!(sentinel.rule_count(), 2);
    }

    #[test]
    fn matching_mode_reports_elements_with_their_own_animation() {
        init_tracing();
        let doc = Document::new();
        let config = SentinelConfig::from_toml_str("dispatch_mode = \"matching\"").unwrap();
        let sentinel = Sentinel::with_config(doc.clone(), config).unwrap();
        doc.add_style_sheet("@keyframes pop { from { opacity: 0 } to { opacity: 1 } } .pop { animation-name: pop }");
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".pop", &recorder(&log)).unwrap();

        let el = insert(&doc, "div", "pop");
        doc.update_style();
        assert_eq!(doc.running_animations(el), vec!["pop".to_string()]);
        assert_eq!(*log.borrow(), vec![el]);
    }

    #[test]
    fn matching_mode_still_resolves_custom_animations() {
        init_tracing();
        let doc = Document::new();
        let config = SentinelConfig::from_toml_str("dispatch_mode = \"matching\"").unwrap();
        let sentinel = Sentinel::with_config(doc.clone(), config).unwrap();
        doc.add_style_sheet("@keyframes pop { from { opacity: 0 } to { opacity: 1 } } .pop { animation-name: pop }");
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on("!pop", &recorder(&log)).unwrap();

        let el = insert(&doc, "div", "pop");
        doc.update_style();
        assert_eq!(*log.borrow(), vec![el]);
    }

    #[test]
    fn panicking_callback_propagates_by_default() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".a", &Callback::new(|_: &NodeId| panic!("callback failed"))).unwrap();
        sentinel.on(".a", &labelled(&log, "after")).unwrap();
        insert(&doc, "div", "a");

        let result = panic::catch_unwind(AssertUnwindSafe(|| doc.update_style()));
        assert!(result.is_err());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn isolated_callback_panic_is_contained() {
        init_tracing();
        let doc = Document::new();
        let config = SentinelConfig {
            callback_failure: Some(CallbackFailure::Isolate),
            ..SentinelConfig::default()
        };
        let sentinel = Sentinel::with_config(doc.clone(), config).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".a", &Callback::new(|_: &NodeId| panic!("callback failed"))).unwrap();
        sentinel.on(".a", &labelled(&log, "after")).unwrap();
        insert(&doc, "div", "a");

        assert_eq!(doc.update_style(), 1);
        assert_eq!(*log.borrow(), vec!["after"]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SentinelConfig {
            animation_prefix: Some("1bad".into()),
            ..SentinelConfig::default()
        };
        assert!(matches!(
            Sentinel::with_config(Document::new(), config),
            Err(SentinelError::Config(_))
        ));
    }

    #[test]
    fn custom_config_shapes_the_rules() {
        init_tracing();
        let doc = Document::new();
        let config = SentinelConfig::from_toml_str(
            r#"
            marker = "@"
            animation_prefix = "watch-"
            style_element_id = "watcher"
            event_types = ["animationstart"]
            "#,
        )
        .unwrap();
        let sentinel = Sentinel::with_config(doc.clone(), config).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(&[".a", "@spin"], &recorder(&log)).unwrap();

        assert!(sentinel.animation_id(".a").is_some_and(|id| id.starts_with("watch-")));
        assert_eq!(sentinel.animation_id("@spin").as_deref(), Some("spin"));
        let sheet = doc.style_sheets()[0];
        assert_eq!(doc.get_attribute(sheet, "id").as_deref(), Some("watcher"));
        assert_eq!(doc.listener_count(doc.document_node()), 1);
    }

    #[test]
    fn independent_watchers_share_a_document() {
        let (doc, first) = setup();
        let second = Sentinel::new(doc.clone());
        let log = Rc::new(RefCell::new(Vec::new()));
        first.on(".a", &labelled(&log, "first")).unwrap();
        second.on(".b", &labelled(&log, "second")).unwrap();
        assert_eq!(doc.style_sheets().len(), 2);

        insert(&doc, "div", "a");
        insert(&doc, "div", "b");
        doc.update_style();
        assert_eq!(*log.borrow(), vec!["first", "second"]);

        first.reset().unwrap();
        assert_eq!(doc.style_sheets().len(), 1);
        assert_eq!(second.rule_count(), 2);
    }

    #[test]
    fn dropped_watcher_leaves_listener_inert() {
        let (doc, sentinel) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        sentinel.on(".a", &recorder(&log)).unwrap();
        drop(sentinel);

        insert(&doc, "div", "a");
        doc.update_style();
        assert!(log.borrow().is_empty());
    }

    proptest! {
        #[test]
        fn repeated_on_is_idempotent(class in "[a-z][a-z0-9-]{0,8}", times in 1usize..6) {
            let doc = Document::new();
            let sentinel = Sentinel::new(doc.clone());
            let cb = Callback::new(|_: &NodeId| {});
            let selector = format!(".{class}");
            for _ in 0..times {
                sentinel.on(selector.as_str(), &cb).unwrap();
            }
            prop_assert_eq!(sentinel.rule_count(), 2);
            prop_assert_eq!(sentinel.callback_count(&selector), times);
        }

        #[test]
        fn callbacks_fire_in_fifo_order(count in 1usize..10) {
            let doc = Document::new();
            let sentinel = Sentinel::new(doc.clone());
            let log = Rc::new(RefCell::new(Vec::new()));
            for i in 0..count {
                let log = log.clone();
                sentinel.on(".x", &Callback::new(move |_: &NodeId| log.borrow_mut().push(i))).unwrap();
            }
            let el = doc.create_element_with("div", &[("class", "x")]);
            doc.append_child(doc.body(), el).unwrap();
            doc.update_style();
            prop_assert_eq!(log.borrow().clone(), (0..count).collect::<Vec<_>>());
        }
    }
}
