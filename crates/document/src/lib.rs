//! Headless host document used to exercise animation-start detection
//! without a browser.

mod document;
mod error;

pub use document::{ANIMATION_START, Document, WeakDocument};
pub use error::DomException;

pub use dom::{Event, EventDetail, ListenerId, NodeId};
