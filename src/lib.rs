//! Element insertion detection through CSS `animationstart` events.
//!
//! Every watched selector gets a tiny `@keyframes` rule and a rule binding
//! the selector to it. When a matching element enters the document its
//! animation starts, and the single capture-phase listener maps the
//! animation name back to the registered callbacks.
//!
//! The document is abstracted behind [`Host`]; [`Document`] is a headless
//! implementation with its own style pass.

mod config;
mod dispatch;
mod error;
mod headless;
mod host;
mod registry;
mod rules;
mod selector;
mod watch;

pub use config::{CallbackFailure, DispatchMode, SentinelConfig};
pub use error::SentinelError;
pub use host::{AnimationHandler, AnimationStart, Host};
pub use registry::Callback;
pub use selector::{AnimationId, Selector, SelectorList};
pub use watch::Sentinel;

pub use document::{DomException, Document, Event, NodeId};
