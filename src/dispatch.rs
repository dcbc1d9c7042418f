//! The animation-start listener: resolves a fired animation to callbacks
//! and invokes them with the event target.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{error, trace, warn};

use crate::config::{CallbackFailure, DispatchMode, SentinelConfig};
use crate::host::{AnimationHandler, AnimationStart, Host};
use crate::registry::Callback;
use crate::watch::State;

/// Build the listener body installed for every configured event type.
///
/// The handler holds the watcher state weakly so an installed listener
/// never keeps a dropped watcher alive.
pub(crate) fn handler<H>(
    state: Weak<RefCell<State<H>>>,
    config: Rc<SentinelConfig>,
) -> AnimationHandler<H::Element>
where
    H: Host + 'static,
{
    Rc::new(move |event: &mut dyn AnimationStart<H::Element>| {
        let Some(state) = state.upgrade() else {
            return;
        };
        let callbacks = match state.try_borrow() {
            Ok(state) => resolve(&state, &config, &*event),
            Err(_) => {
                // Only a host that fires animation events synchronously from
                // inside `insert_rule` or `delete_rule` can land here.
                warn!(animation = event.animation_name(), "watcher busy, event skipped");
                return;
            }
        };
        if callbacks.is_empty() {
            trace!(animation = event.animation_name(), "no callbacks");
            return;
        }

        event.stop_immediate_propagation();
        let Some(target) = event.target() else {
            return;
        };
        trace!(
            animation = event.animation_name(),
            callbacks = callbacks.len(),
            "dispatching"
        );
        invoke(&callbacks, &target, config.effective_callback_failure());
    })
}

/// Callbacks due for `event`, copied out of the registry.
fn resolve<H: Host>(
    state: &State<H>,
    config: &SentinelConfig,
    event: &dyn AnimationStart<H::Element>,
) -> Vec<Callback<H::Element>> {
    let name = event.animation_name();
    let mut callbacks = state.callbacks.snapshot(name);

    if config.effective_dispatch_mode() == DispatchMode::Matching {
        // Every event, whatever its name: an author rule may replace the
        // shared animation on an element. Once per matching selector, in
        // registration order.
        for (raw, binding) in state.rules.bindings() {
            if binding.selector.is_plain() && event.target_matches(raw) {
                callbacks.extend(state.callbacks.snapshot(binding.animation_id.as_str()));
            }
        }
    }
    callbacks
}

fn invoke<E>(callbacks: &[Callback<E>], target: &E, failure: CallbackFailure) {
    match failure {
        CallbackFailure::Propagate => {
            for callback in callbacks {
                callback.call(target);
            }
        }
        CallbackFailure::Isolate => {
            for callback in callbacks {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback.call(target))) {
                    error!(?callback, "callback panicked: {}", panic_message(payload.as_ref()));
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CallbackRegistry;
    use crate::rules::RuleStore;
    use crate::selector::AnimationId;
    use document::{Document, NodeId};

    #[test]
    fn panic_messages() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn isolate_runs_remaining_callbacks() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let log = hits.clone();
        let callbacks = vec![
            Callback::new(|_: &u32| panic!("first")),
            Callback::new(move |n: &u32| log.borrow_mut().push(*n)),
        ];
        invoke(&callbacks, &3, CallbackFailure::Isolate);
        assert_eq!(*hits.borrow(), vec![3]);
    }

    #[test]
    fn propagate_aborts_the_firing() {
        let hits = Rc::new(RefCell::new(0));
        let log = hits.clone();
        let callbacks = vec![
            Callback::new(|_: &u32| panic!("first")),
            Callback::new(move |_: &u32| *log.borrow_mut() += 1),
        ];
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            invoke(&callbacks, &0, CallbackFailure::Propagate)
        }));
        assert!(result.is_err());
        assert_eq!(*hits.borrow(), 0);
    }

    struct FakeEvent {
        name: &'static str,
        target: Option<NodeId>,
        stopped: bool,
    }

    impl AnimationStart<NodeId> for FakeEvent {
        fn animation_name(&self) -> &str {
            self.name
        }

        fn target(&self) -> Option<NodeId> {
            self.target
        }

        fn target_matches(&self, _selector: &str) -> bool {
            false
        }

        fn stop_immediate_propagation(&mut self) {
            self.stopped = true;
        }
    }

    fn state_with_callback(log: &Rc<RefCell<Vec<NodeId>>>) -> Rc<RefCell<State<Document>>> {
        let log = log.clone();
        let mut callbacks = CallbackRegistry::new();
        callbacks.append(
            &AnimationId::named("fade"),
            Callback::new(move |el: &NodeId| log.borrow_mut().push(*el)),
        );
        Rc::new(RefCell::new(State {
            rules: RuleStore::new(),
            callbacks,
        }))
    }

    #[test]
    fn handled_event_stops_propagation() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let state = state_with_callback(&log);
        let handler = handler(Rc::downgrade(&state), Rc::new(SentinelConfig::default()));
        let target = Document::new().body();

        let mut event = FakeEvent { name: "fade", target: Some(target), stopped: false };
        handler(&mut event);
        assert!(event.stopped);
        assert_eq!(*log.borrow(), vec![target]);

        let mut other = FakeEvent { name: "spin", target: Some(target), stopped: false };
        handler(&mut other);
        assert!(!other.stopped);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn event_during_a_registry_update_is_skipped() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let state = state_with_callback(&log);
        let handler = handler(Rc::downgrade(&state), Rc::new(SentinelConfig::default()));
        let target = Document::new().body();

        let busy = state.borrow_mut();
        let mut event = FakeEvent { name: "fade", target: Some(target), stopped: false };
        handler(&mut event);
        drop(busy);

        assert!(!event.stopped);
        assert!(log.borrow().is_empty());
    }
}
