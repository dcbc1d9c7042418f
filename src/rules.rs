//! The watcher's style sheet: generated keyframes, selector bindings and
//! the selector-to-animation map.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::{DispatchMode, SentinelConfig};
use crate::error::SentinelError;
use crate::host::{AnimationHandler, Host};
use crate::selector::{AnimationId, Selector};

/// A registered selector and the animation it fires.
#[derive(Debug, Clone)]
pub struct Binding {
    pub selector: Selector,
    pub animation_id: AnimationId,
    /// Whether rules tagged with this selector were inserted.
    pub owns_rules: bool,
}

/// Owns the generated sheet, the installed listeners and the bindings.
pub struct RuleStore<H: Host> {
    sheet: Option<H::StyleSheet>,
    listeners: Vec<H::Listener>,
    bindings: HashMap<String, Binding>,
    /// Registration order of `bindings` keys.
    order: Vec<String>,
}

impl<H: Host> Default for RuleStore<H> {
    fn default() -> Self {
        Self {
            sheet: None,
            listeners: Vec::new(),
            bindings: HashMap::new(),
            order: Vec::new(),
        }
    }
}

fn keyframes_rule(name: &str) -> String {
    format!("@keyframes {name}{{from{{transform:none;}}to{{transform:none;}}}}")
}

impl<H: Host> RuleStore<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.sheet.is_some()
    }

    /// Create the sheet and install the listener on first use. `handler` is
    /// only called when that happens.
    pub fn ensure_initialized(
        &mut self,
        host: &H,
        config: &SentinelConfig,
        handler: impl FnOnce() -> AnimationHandler<H::Element>,
    ) -> Result<(), SentinelError> {
        if self.sheet.is_some() {
            return Ok(());
        }

        let sheet = host
            .create_style_sheet(config.effective_style_element_id())
            .map_err(SentinelError::host)?;
        debug!(id = config.effective_style_element_id(), "style sheet created");

        if config.effective_dispatch_mode() == DispatchMode::Matching {
            let shared = config.shared_animation_name();
            let rules = [format!("*{{animation-name:{shared};}}"), keyframes_rule(&shared)];
            for rule in &rules {
                if let Err(err) = host.insert_rule(&sheet, rule, host.rule_count(&sheet), None) {
                    // Leave nothing half-built behind.
                    if let Err(cleanup) = host.remove_style_sheet(&sheet) {
                        warn!(error = %cleanup, "could not remove partial style sheet");
                    }
                    return Err(SentinelError::host(err));
                }
            }
            debug!(animation = %shared, "shared animation installed");
        }

        let handler = handler();
        for event_type in config.effective_event_types() {
            self.listeners
                .push(host.add_animation_listener(&event_type, handler.clone()));
            debug!(event_type = %event_type, "listener installed");
        }
        self.sheet = Some(sheet);
        Ok(())
    }

    /// Map `raw` to an animation, inserting its rules on first registration.
    /// `extra_animations` is appended to the binding rule's `animation-name`.
    pub fn register(
        &mut self,
        host: &H,
        config: &SentinelConfig,
        raw: &str,
        extra_animations: Option<&str>,
    ) -> Result<AnimationId, SentinelError> {
        if let Some(binding) = self.bindings.get(raw) {
            return Ok(binding.animation_id.clone());
        }
        let Some(sheet) = self.sheet.clone() else {
            return Err(SentinelError::Config("watcher is not initialized".into()));
        };

        let selector = Selector::parse(raw, config.effective_marker());
        let (animation_id, owns_rules) = match &selector {
            Selector::ExternalAnimation(name) => {
                let id = AnimationId::named(name.as_str());
                // Never shadow an animation defined elsewhere.
                let missing = !host.keyframes_defined(name);
                if missing {
                    self.insert(host, &sheet, &keyframes_rule(name), raw)?;
                }
                (id, missing)
            }
            Selector::Plain(_) => {
                let id = self.fresh_id(host, config);
                let direct = config.effective_dispatch_mode() == DispatchMode::Direct;
                if direct {
                    self.insert_binding(host, &sheet, config, raw, &id, extra_animations)?;
                }
                (id, direct)
            }
        };

        debug!(selector = raw, animation = %animation_id, "selector registered");
        self.bindings.insert(
            raw.to_string(),
            Binding {
                selector,
                animation_id: animation_id.clone(),
                owns_rules,
            },
        );
        self.order.push(raw.to_string());
        Ok(animation_id)
    }

    fn fresh_id(&self, host: &H, config: &SentinelConfig) -> AnimationId {
        loop {
            let id = AnimationId::generate(config.effective_animation_prefix());
            let taken = self.bindings.values().any(|b| b.animation_id == id)
                || host.keyframes_defined(id.as_str());
            if !taken {
                return id;
            }
        }
    }

    fn insert_binding(
        &self,
        host: &H,
        sheet: &H::StyleSheet,
        config: &SentinelConfig,
        raw: &str,
        id: &AnimationId,
        extra_animations: Option<&str>,
    ) -> Result<(), SentinelError> {
        let keyframes_index = self.insert(host, sheet, &keyframes_rule(id.as_str()), raw)?;

        let names = match extra_animations.map(str::trim).filter(|e| !e.is_empty()) {
            Some(extra) => format!("{id},{extra}"),
            None => id.to_string(),
        };
        let binding = format!(
            "{raw}{{animation-duration:{};animation-name:{names};}}",
            config.effective_duration()
        );
        if let Err(err) = self.insert(host, sheet, &binding, raw) {
            if let Err(rollback) = host.delete_rule(sheet, keyframes_index) {
                warn!(selector = raw, error = %rollback, "could not roll back keyframes rule");
            }
            return Err(err);
        }
        Ok(())
    }

    fn insert(
        &self,
        host: &H,
        sheet: &H::StyleSheet,
        rule: &str,
        owner: &str,
    ) -> Result<usize, SentinelError> {
        let index = host
            .insert_rule(sheet, rule, host.rule_count(sheet), Some(owner))
            .map_err(SentinelError::host)?;
        debug!(index, rule, "rule inserted");
        Ok(index)
    }

    /// Delete every rule owned by `raw` and forget its binding.
    /// The binding is kept if the host fails to delete a rule, so a later
    /// call can retry.
    pub fn unregister(&mut self, host: &H, raw: &str) -> Result<(), SentinelError> {
        let Some(owns_rules) = self.bindings.get(raw).map(|b| b.owns_rules) else {
            return Ok(());
        };

        let mut removed = 0;
        if let Some(sheet) = &self.sheet {
            for index in (0..host.rule_count(sheet)).rev() {
                if host.rule_owner(sheet, index).as_deref() == Some(raw) {
                    host.delete_rule(sheet, index).map_err(SentinelError::host)?;
                    removed += 1;
                }
            }
        }
        if removed == 0 && owns_rules {
            warn!(selector = raw, "no rules left to remove");
        }

        self.bindings.remove(raw);
        self.order.retain(|s| s != raw);
        debug!(selector = raw, removed, "selector unregistered");
        Ok(())
    }

    /// Remove the listeners and the sheet and forget every binding. The
    /// store is cleared even if the host reports an error.
    pub fn reset(&mut self, host: &H) -> Result<(), SentinelError> {
        self.bindings.clear();
        self.order.clear();
        for listener in self.listeners.drain(..) {
            host.remove_animation_listener(listener);
        }
        match self.sheet.take() {
            Some(sheet) => {
                debug!("style sheet removed");
                host.remove_style_sheet(&sheet).map_err(SentinelError::host)
            }
            None => Ok(()),
        }
    }

    pub fn animation_id(&self, raw: &str) -> Option<&AnimationId> {
        self.bindings.get(raw).map(|b| &b.animation_id)
    }

    /// Bindings in registration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.order
            .iter()
            .filter_map(|raw| Some((raw.as_str(), self.bindings.get(raw)?)))
    }

    pub fn rule_count(&self, host: &H) -> usize {
        self.sheet.as_ref().map_or(0, |s| host.rule_count(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::AnimationStart;
    use document::{DomException, Document, ListenerId, NodeId};
    use std::cell::Cell;
    use std::rc::Rc;

    /// A headless document whose CSSOM calls can be made to fail.
    #[derive(Default)]
    struct FailingHost {
        doc: Document,
        fail_insert: Cell<bool>,
        fail_delete: Cell<bool>,
        fail_remove_sheet: Cell<bool>,
    }

    fn injected(op: &str) -> DomException {
        DomException::NotFound(format!("{op} failed"))
    }

    impl Host for FailingHost {
        type Element = NodeId;
        type StyleSheet = NodeId;
        type Listener = ListenerId;
        type Error = DomException;

        fn create_style_sheet(&self, id: &str) -> Result<NodeId, DomException> {
            self.doc.create_style_sheet(id)
        }

        fn remove_style_sheet(&self, sheet: &NodeId) -> Result<(), DomException> {
            if self.fail_remove_sheet.get() {
                return Err(injected("remove"));
            }
            Host::remove_style_sheet(&self.doc, sheet)
        }

        fn insert_rule(
            &self,
            sheet: &NodeId,
            rule: &str,
            index: usize,
            owner: Option<&str>,
        ) -> Result<usize, DomException> {
            if self.fail_insert.get() {
                return Err(injected("insert"));
            }
            Host::insert_rule(&self.doc, sheet, rule, index, owner)
        }

        fn delete_rule(&self, sheet: &NodeId, index: usize) -> Result<(), DomException> {
            if self.fail_delete.get() {
                return Err(injected("delete"));
            }
            Host::delete_rule(&self.doc, sheet, index)
        }

        fn rule_count(&self, sheet: &NodeId) -> usize {
            Host::rule_count(&self.doc, sheet)
        }

        fn rule_owner(&self, sheet: &NodeId, index: usize) -> Option<String> {
            Host::rule_owner(&self.doc, sheet, index)
        }

        fn keyframes_defined(&self, name: &str) -> bool {
            Host::keyframes_defined(&self.doc, name)
        }

        fn matches_selector(&self, element: &NodeId, selector: &str) -> bool {
            self.doc.matches_selector(element, selector)
        }

        fn add_animation_listener(
            &self,
            event_type: &str,
            handler: AnimationHandler<NodeId>,
        ) -> ListenerId {
            self.doc.add_animation_listener(event_type, handler)
        }

        fn remove_animation_listener(&self, listener: ListenerId) {
            self.doc.remove_animation_listener(listener)
        }
    }

    fn noop_handler() -> AnimationHandler<NodeId> {
        Rc::new(|_: &mut dyn AnimationStart<NodeId>| {})
    }

    fn matching() -> SentinelConfig {
        SentinelConfig {
            dispatch_mode: Some(DispatchMode::Matching),
            ..SentinelConfig::default()
        }
    }

    #[test]
    fn register_writes_keyframes_and_binding() {
        let host = FailingHost::default();
        let config = SentinelConfig::default();
        let mut store = RuleStore::new();
        store.ensure_initialized(&host, &config, noop_handler).unwrap();
        let id = store.register(&host, &config, ".a", None).unwrap();

        assert_eq!(store.rule_count(&host), 2);
        assert!(host.keyframes_defined(id.as_str()));
        let sheet = host.doc.style_sheets()[0];
        assert_eq!(host.rule_owner(&sheet, 0).as_deref(), Some(".a"));
        assert_eq!(host.rule_owner(&sheet, 1).as_deref(), Some(".a"));
    }

    #[test]
    fn failed_shared_setup_removes_the_sheet() {
        let host = FailingHost::default();
        host.fail_insert.set(true);
        let mut store = RuleStore::new();
        let err = store.ensure_initialized(&host, &matching(), noop_handler).unwrap_err();
        assert!(matches!(err.host_error::<DomException>(), Some(DomException::NotFound(_))));
        assert!(!store.is_initialized());
        assert!(host.doc.style_sheets().is_empty());
        assert_eq!(host.doc.listener_count(host.doc.document_node()), 0);
    }

    #[test]
    fn failed_cleanup_still_reports_the_insert_error() {
        let host = FailingHost::default();
        host.fail_insert.set(true);
        host.fail_remove_sheet.set(true);
        let mut store = RuleStore::new();
        let err = store.ensure_initialized(&host, &matching(), noop_handler).unwrap_err();
        assert_eq!(
            err.host_error::<DomException>(),
            Some(&DomException::NotFound("insert failed".into()))
        );
        assert!(!store.is_initialized());
        assert_eq!(host.doc.style_sheets().len(), 1);
    }

    #[test]
    fn failed_delete_keeps_the_binding_for_a_retry() {
        let host = FailingHost::default();
        let config = SentinelConfig::default();
        let mut store = RuleStore::new();
        store.ensure_initialized(&host, &config, noop_handler).unwrap();
        store.register(&host, &config, ".a", None).unwrap();

        host.fail_delete.set(true);
        assert!(store.unregister(&host, ".a").is_err());
        assert!(store.animation_id(".a").is_some());
        assert_eq!(store.bindings().count(), 1);
        assert_eq!(store.rule_count(&host), 2);

        host.fail_delete.set(false);
        store.unregister(&host, ".a").unwrap();
        assert!(store.animation_id(".a").is_none());
        assert_eq!(store.bindings().count(), 0);
        assert_eq!(store.rule_count(&host), 0);
    }

    #[test]
    fn unregister_unknown_selector_is_a_no_op() {
        let host = FailingHost::default();
        let mut store: RuleStore<FailingHost> = RuleStore::new();
        host.fail_delete.set(true);
        store.unregister(&host, ".nope").unwrap();
    }
}
