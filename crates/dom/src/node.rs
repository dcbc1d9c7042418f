//! DOM node model.
//!
//! Nodes live in a `Vec<Node>` owned by [`Dom`](crate::Dom) and are referenced
//! by [`NodeId`]. Tree structure is encoded via parent/child/sibling links
//! stored directly on each node.

use std::fmt;

/// Index of a node inside its [`Dom`](crate::Dom).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single attribute on an element (e.g. `class="foo"`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            value: value.to_string(),
        }
    }
}

/// Data specific to element nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    /// Lower-cased tag name.
    pub tag_name: String,
    pub attrs: Vec<Attr>,
    /// Cached `id` attribute value.
    pub id: Option<String>,
    /// Cached class list (split from the `class` attribute).
    pub classes: Vec<String>,
}

impl ElementData {
    pub fn new(tag_name: &str, attrs: Vec<Attr>) -> Self {
        let mut data = Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs: Vec::new(),
            id: None,
            classes: Vec::new(),
        };
        for attr in attrs {
            data.set_attr(&attr.name, &attr.value);
        }
        data
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// Set or replace an attribute, refreshing the `id`/`class` caches.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value.to_string(),
            None => self.attrs.push(Attr {
                name: name.clone(),
                value: value.to_string(),
            }),
        }
        match name.as_str() {
            "id" => self.id = Some(value.to_string()),
            "class" => self.classes = value.split_whitespace().map(String::from).collect(),
            _ => {}
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|a| !a.name.eq_ignore_ascii_case(name));
        match name.to_ascii_lowercase().as_str() {
            "id" => self.id = None,
            "class" => self.classes.clear(),
            _ => {}
        }
        self.attrs.len() != before
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// The payload that distinguishes different kinds of DOM nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text { data: String },
    Comment { data: String },
}

/// A single node in the DOM tree.
///
/// Tree links form an intrusive doubly-linked child list.
#[derive(Clone, Debug)]
pub struct Node {
    pub data: NodeData,

    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    /// Create a new detached node.
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text { .. })
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_caches_follow_updates() {
        let mut el = ElementData::new("DIV", vec![Attr::new("class", "a b"), Attr::new("ID", "x")]);
        assert_eq!(el.tag_name, "div");
        assert_eq!(el.id.as_deref(), Some("x"));
        assert!(el.has_class("b"));

        el.set_attr("class", "test-div");
        assert_eq!(el.classes, vec!["test-div".to_string()]);
        assert_eq!(el.attrs.len(), 2);

        assert!(el.remove_attr("id"));
        assert_eq!(el.id, None);
        assert!(!el.remove_attr("id"));
    }
}
