//! DOM event dispatch.
//!
//! Dispatch walks a root-first propagation path: capture listeners from the
//! root down to the target's parent, every listener at the target, then
//! bubble listeners back up when the event bubbles. Listener lists are
//! snapshotted per node, so callbacks may add or remove listeners while an
//! event is in flight; a listener removed before its turn does not run.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::node::NodeId;
use crate::tree::Dom;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPhase {
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// Interface-specific event payload.
#[derive(Clone, Debug, PartialEq)]
pub enum EventDetail {
    None,
    /// `AnimationEvent` fields.
    Animation {
        animation_name: String,
        elapsed_time: f64,
        pseudo_element: String,
    },
}

/// A DOM event that can be dispatched through the tree.
#[derive(Clone, Debug)]
pub struct Event {
    /// Event type name (e.g. `"animationstart"`).
    pub type_: String,
    /// The node the event was dispatched on.
    pub target: Option<NodeId>,
    /// The node whose listeners are currently being invoked.
    pub current_target: Option<NodeId>,
    pub phase: EventPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    pub immediate_propagation_stopped: bool,
    pub detail: EventDetail,
}

impl Event {
    pub fn new(type_: &str, bubbles: bool, cancelable: bool) -> Self {
        Self {
            type_: type_.to_string(),
            target: None,
            current_target: None,
            phase: EventPhase::None,
            bubbles,
            cancelable,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            detail: EventDetail::None,
        }
    }

    /// An `AnimationEvent` as fired when an animation starts: bubbles, not
    /// cancelable, zero elapsed time.
    pub fn animation(type_: &str, animation_name: &str) -> Self {
        Self {
            detail: EventDetail::Animation {
                animation_name: animation_name.to_string(),
                elapsed_time: 0.0,
                pseudo_element: String::new(),
            },
            ..Self::new(type_, true, false)
        }
    }

    pub fn animation_name(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Animation { animation_name, .. } => Some(animation_name),
            EventDetail::None => None,
        }
    }

    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop at the current node once its listeners finish.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop all further processing, including later listeners on this node.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }
}

/// Handle returned when a listener is registered; used to remove it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerCallback = Rc<dyn Fn(&mut Event)>;

/// A single event listener attached to a node.
#[derive(Clone)]
pub struct EventListener {
    pub type_: String,
    /// Fires during capture (and at target) when set; otherwise during
    /// bubble (and at target).
    pub capture: bool,
    callback: ListenerCallback,
    removed: Rc<Cell<bool>>,
}

impl EventListener {
    pub fn new<F>(type_: &str, capture: bool, callback: F) -> Self
    where
        F: Fn(&mut Event) + 'static,
    {
        Self {
            type_: type_.to_string(),
            capture,
            callback: Rc::new(callback),
            removed: Rc::new(Cell::new(false)),
        }
    }

    pub fn invoke(&self, event: &mut Event) {
        (self.callback)(event);
    }

    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListener")
            .field("type_", &self.type_)
            .field("capture", &self.capture)
            .field("removed", &self.removed.get())
            .finish()
    }
}

/// Listeners for every node that has at least one.
#[derive(Debug, Default)]
pub struct EventTargetMap {
    listeners: HashMap<NodeId, Vec<(ListenerId, EventListener)>>,
    next_id: u64,
}

impl EventTargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, node: NodeId, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(node).or_default().push((id, listener));
        id
    }

    /// Remove one listener. Returns `false` if `id` was not registered on `node`.
    pub fn remove_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&node) else {
            return false;
        };
        let Some(pos) = list.iter().position(|(lid, _)| *lid == id) else {
            return false;
        };
        let (_, listener) = list.remove(pos);
        listener.removed.set(true);
        true
    }

    /// Remove every listener of the given type and phase from `node`.
    pub fn remove_listeners(&mut self, node: NodeId, type_: &str, capture: bool) {
        if let Some(list) = self.listeners.get_mut(&node) {
            list.retain(|(_, l)| {
                let hit = l.type_ == type_ && l.capture == capture;
                if hit {
                    l.removed.set(true);
                }
                !hit
            });
        }
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.get(&node).map_or(0, Vec::len)
    }

    /// Snapshot of the listeners on `node` for `type_`, in registration order.
    pub fn matching_listeners(&self, node: NodeId, type_: &str) -> Vec<EventListener> {
        self.listeners
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|(_, l)| l.type_ == type_)
                    .map(|(_, l)| l.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Dispatch `event` along `path` (root first, target last).
///
/// `listeners_for` is queried once per node as the event reaches it. Returns
/// `true` if the default action was not prevented.
pub fn dispatch_along<F>(path: &[NodeId], listeners_for: F, event: &mut Event) -> bool
where
    F: Fn(NodeId, &str) -> Vec<EventListener>,
{
    let Some((&target, ancestors)) = path.split_last() else {
        return !event.default_prevented;
    };
    event.target = Some(target);

    event.phase = EventPhase::Capturing;
    for &node in ancestors {
        if event.propagation_stopped {
            break;
        }
        invoke_listeners(&listeners_for, node, event, Some(true));
    }

    if !event.propagation_stopped {
        event.phase = EventPhase::AtTarget;
        invoke_listeners(&listeners_for, target, event, None);
    }

    if event.bubbles && !event.propagation_stopped {
        event.phase = EventPhase::Bubbling;
        for &node in ancestors.iter().rev() {
            if event.propagation_stopped {
                break;
            }
            invoke_listeners(&listeners_for, node, event, Some(false));
        }
    }

    event.phase = EventPhase::None;
    event.current_target = None;
    !event.default_prevented
}

/// Dispatch `event` at `target` using the listeners in `targets`.
pub fn dispatch_event(
    dom: &Dom,
    targets: &EventTargetMap,
    target: NodeId,
    event: &mut Event,
) -> bool {
    let mut path = dom.ancestors(target);
    path.reverse();
    path.push(target);
    dispatch_along(&path, |node, type_| targets.matching_listeners(node, type_), event)
}

/// `capture` filters by phase; `None` runs every listener (at-target).
fn invoke_listeners<F>(listeners_for: &F, node: NodeId, event: &mut Event, capture: Option<bool>)
where
    F: Fn(NodeId, &str) -> Vec<EventListener>,
{
    event.current_target = Some(node);
    for listener in listeners_for(node, &event.type_) {
        if event.immediate_propagation_stopped {
            break;
        }
        if listener.is_removed() || capture.is_some_and(|c| c != listener.capture) {
            continue;
        }
        listener.invoke(event);
    }
}
