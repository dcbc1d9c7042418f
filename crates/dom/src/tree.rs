//! DOM tree operations.
//!
//! The [`Dom`] struct owns every node and provides tree-manipulation methods
//! that keep the intrusive parent/child/sibling links consistent.

use thiserror::Error;

use crate::node::{Attr, ElementData, Node, NodeData, NodeId};

/// Rejected tree mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0:?} does not exist")]
    NoSuchNode(NodeId),

    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
}

/// The complete DOM tree. Node 0 is always the document.
#[derive(Clone, Debug)]
pub struct Dom {
    nodes: Vec<Node>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create a DOM holding just the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
        }
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id)?.as_element()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id)?.as_element_mut()
    }

    // =======================================================================
    // Node creation
    // =======================================================================

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element. `id` and `class` caches are filled from `attrs`.
    pub fn create_element(&mut self, tag_name: &str, attrs: Vec<Attr>) -> NodeId {
        self.allocate(Node::new(NodeData::Element(ElementData::new(tag_name, attrs))))
    }

    pub fn create_html_element(&mut self, tag_name: &str) -> NodeId {
        self.create_element(tag_name, Vec::new())
    }

    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.allocate(Node::new(NodeData::Text {
            data: data.to_string(),
        }))
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.allocate(Node::new(NodeData::Comment {
            data: data.to_string(),
        }))
    }

    // =======================================================================
    // Tree mutation
    // =======================================================================

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        for id in [parent, child] {
            if self.get(id).is_none() {
                return Err(TreeError::NoSuchNode(id));
            }
        }
        if child == parent || self.ancestors(parent).contains(&child) || child == self.document() {
            return Err(TreeError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already in the tree.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insertion(parent, child)?;
        self.detach(child);

        let old_last = self.nodes[parent.index()].last_child;
        if let Some(old_last_id) = old_last {
            self.nodes[old_last_id.index()].next_sibling = Some(child);
        }

        let child_node = &mut self.nodes[child.index()];
        child_node.parent = Some(parent);
        child_node.prev_sibling = old_last;
        child_node.next_sibling = None;

        let parent_node = &mut self.nodes[parent.index()];
        if parent_node.first_child.is_none() {
            parent_node.first_child = Some(child);
        }
        parent_node.last_child = Some(child);
        Ok(())
    }

    /// Insert `child` under `parent` immediately before `reference`.
    /// A `None` reference appends.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), TreeError> {
        let Some(reference) = reference else {
            return self.append_child(parent, child);
        };
        self.check_insertion(parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(TreeError::NotAChild {
                parent,
                child: reference,
            });
        }
        if reference == child {
            return Ok(());
        }
        self.detach(child);

        let prev_of_ref = self.nodes[reference.index()].prev_sibling;

        let child_node = &mut self.nodes[child.index()];
        child_node.parent = Some(parent);
        child_node.prev_sibling = prev_of_ref;
        child_node.next_sibling = Some(reference);

        self.nodes[reference.index()].prev_sibling = Some(child);

        match prev_of_ref {
            Some(prev_id) => self.nodes[prev_id.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The subtree stays allocated.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.parent(child) != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    fn detach(&mut self, node_id: NodeId) {
        let (parent_id, prev, next) = match self.get(node_id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if let Some(prev_id) = prev {
            self.nodes[prev_id.index()].next_sibling = next;
        }
        if let Some(next_id) = next {
            self.nodes[next_id.index()].prev_sibling = prev;
        }
        if let Some(pid) = parent_id {
            let parent_node = &mut self.nodes[pid.index()];
            if parent_node.first_child == Some(node_id) {
                parent_node.first_child = next;
            }
            if parent_node.last_child == Some(node_id) {
                parent_node.last_child = prev;
            }
        }

        let node = &mut self.nodes[node_id.index()];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    // =======================================================================
    // Traversal
    // =======================================================================

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent
    }

    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&p| self.element(p).is_some())
    }

    /// Immediate children of `parent` in document order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.get(parent).and_then(|n| n.first_child);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.get(id).and_then(|n| n.next_sibling);
        }
        out
    }

    pub fn element_children(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent)
            .into_iter()
            .filter(|&c| self.element(c).is_some())
            .collect()
    }

    pub fn prev_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let mut cursor = self.get(node)?.prev_sibling;
        while let Some(id) = cursor {
            if self.element(id).is_some() {
                return Some(id);
            }
            cursor = self.get(id)?.prev_sibling;
        }
        None
    }

    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let mut cursor = self.get(node)?.next_sibling;
        while let Some(id) = cursor {
            if self.element(id).is_some() {
                return Some(id);
            }
            cursor = self.get(id)?.next_sibling;
        }
        None
    }

    /// Ancestors of `node`, parent first, root last.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(node);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.parent(id);
        }
        out
    }

    /// All descendants of `node` in pre-order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    /// Whether `node` is reachable from the document node.
    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.document() || self.ancestors(node).last() == Some(&self.document())
    }

    // =======================================================================
    // Queries
    // =======================================================================

    /// First element with the given `id` under `root` (inclusive, pre-order).
    pub fn get_element_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .find(|&n| self.element(n).is_some_and(|e| e.id.as_deref() == Some(id)))
    }

    /// Elements with tag name `tag` under `root` (inclusive, pre-order).
    pub fn get_elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|&n| {
                self.element(n)
                    .is_some_and(|e| e.tag_name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }
}
