//! Document Object Model: a node tree with event dispatch.

pub mod event;
pub mod node;
pub mod tree;

pub use event::{
    Event, EventDetail, EventListener, EventPhase, EventTargetMap, ListenerId, dispatch_along,
    dispatch_event,
};
pub use node::{Attr, ElementData, Node, NodeData, NodeId};
pub use tree::{Dom, TreeError};
