//! Selector keys and the animation names they map to.

use std::borrow::Borrow;
use std::fmt;

use uuid::Uuid;

/// A registration key, classified once when first registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// A CSS selector; gets a generated animation.
    Plain(String),
    /// A marker-prefixed key naming an existing animation; holds the name
    /// without the marker.
    ExternalAnimation(String),
}

impl Selector {
    pub fn parse(raw: &str, marker: char) -> Self {
        match raw.strip_prefix(marker) {
            Some(name) => Selector::ExternalAnimation(name.to_string()),
            None => Selector::Plain(raw.to_string()),
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Selector::Plain(_))
    }
}

/// An animation name bound to exactly one selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(String);

impl AnimationId {
    /// A fresh random name: `prefix` followed by 32 hex digits.
    pub fn generate(prefix: &str) -> Self {
        AnimationId(format!("{prefix}{}", Uuid::new_v4().simple()))
    }

    /// Use `name` verbatim.
    pub fn named(name: impl Into<String>) -> Self {
        AnimationId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AnimationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AnimationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Anything `on`/`off` accept as selectors: one string or a sequence of them.
pub trait SelectorList {
    fn selectors(&self) -> Vec<&str>;
}

impl SelectorList for str {
    fn selectors(&self) -> Vec<&str> {
        vec![self]
    }
}

impl SelectorList for String {
    fn selectors(&self) -> Vec<&str> {
        vec![self.as_str()]
    }
}

impl<T: AsRef<str>> SelectorList for [T] {
    fn selectors(&self) -> Vec<&str> {
        self.iter().map(AsRef::as_ref).collect()
    }
}

impl<T: AsRef<str>, const N: usize> SelectorList for [T; N] {
    fn selectors(&self) -> Vec<&str> {
        self.iter().map(AsRef::as_ref).collect()
    }
}

impl<T: AsRef<str>> SelectorList for Vec<T> {
    fn selectors(&self) -> Vec<&str> {
        self.iter().map(AsRef::as_ref).collect()
    }
}
