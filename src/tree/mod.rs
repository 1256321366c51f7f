//! Node arena holding one tree (or one working set of lazily loaded nodes)
//!
//! Nodes are stored by index; every link is a [`NodeIndex`] into the same
//! arena, so parent/child/sibling cycles never own each other.
//! Rows are interned by identity: hydrating the same row twice yields the
//! same index.

mod builder;
mod link;
mod node;
mod traversal;

pub use builder::{BuildMode, LevelBuilder};
pub use link::{Link, LinkKind, LinkValue};
pub use node::{Links, Node, NodeIndex};
pub use traversal::PreOrder;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::store::{NestedRecord, TreeOwner};
use crate::NestedSetError;

/// Arena of nodes belonging to one tree
pub struct NodeArena<R: NestedRecord> {
    /// Nodes in insertion order (ascending `left` for a materialized tree)
    nodes: Vec<Node<R>>,

    /// Identity -> slot
    by_id: HashMap<R::Id, NodeIndex>,

    /// Tree-forming object this tree was loaded for, if any
    owner: Option<Arc<dyn Any + Send + Sync>>,
}

impl<R: NestedRecord> fmt::Debug for NodeArena<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeArena")
            .field("nodes", &self.nodes)
            .field("has_owner", &self.owner.is_some())
            .finish()
    }
}

impl<R: NestedRecord> Default for NodeArena<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: NestedRecord> NodeArena<R> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty arena with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            by_id: HashMap::with_capacity(capacity),
            owner: None,
        }
    }

    /// Add a row, or return the slot of the row with the same identity
    ///
    /// The first hydrated copy of a row is kept.
    pub fn intern(&mut self, record: R) -> NodeIndex {
        let id = record.id();
        if let Some(&index) = self.by_id.get(&id) {
            return index;
        }
        let index = NodeIndex(self.nodes.len());
        self.nodes.push(Node::new(record));
        self.by_id.insert(id, index);
        index
    }

    /// Node at `index`, if it belongs to this arena
    pub fn get(&self, index: NodeIndex) -> Option<&Node<R>> {
        self.nodes.get(index.0)
    }

    /// Node at `index`
    pub fn node(&self, index: NodeIndex) -> Result<&Node<R>, NestedSetError> {
        self.nodes.get(index.0).ok_or(NestedSetError::UnknownNode(index))
    }

    pub(crate) fn links_mut(&mut self, index: NodeIndex) -> Result<&mut Links, NestedSetError> {
        self.nodes
            .get_mut(index.0)
            .map(Node::links_mut)
            .ok_or(NestedSetError::UnknownNode(index))
    }

    /// Slot of the node with identity `id`
    pub fn index_of(&self, id: &R::Id) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    /// Identity of the node at `index`
    pub fn id_of(&self, index: NodeIndex) -> Option<R::Id> {
        self.get(index).map(|node| node.record().id())
    }

    /// Identities of several nodes, skipping unknown indices
    pub fn ids_of(&self, indices: &[NodeIndex]) -> Vec<R::Id> {
        indices.iter().filter_map(|&index| self.id_of(index)).collect()
    }

    /// Human-readable identity used in error messages
    pub(crate) fn describe(&self, index: NodeIndex) -> String {
        match self.get(index) {
            Some(node) => format!("{:?}", node.record().id()),
            None => index.to_string(),
        }
    }

    /// First node in insertion order; for a materialized tree, its root
    pub fn root(&self) -> Option<NodeIndex> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeIndex(0))
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Node<R>)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (NodeIndex(slot), node))
    }

    /// Pre-order walk over resolved children links starting at `start`
    pub fn pre_order(&self, start: NodeIndex) -> PreOrder<'_, R> {
        PreOrder::new(self, start)
    }

    /// Attach the tree-forming object every node of this arena belongs to
    pub fn attach_owner<O>(&mut self, owner: Arc<O>)
    where
        O: TreeOwner<R::TreeId>,
    {
        self.owner = Some(owner);
    }

    /// Tree-forming object, downcast to the requested type
    pub fn owner<O>(&self) -> Option<Arc<O>>
    where
        O: TreeOwner<R::TreeId>,
    {
        self.owner.clone()?.downcast::<O>().ok()
    }

    /// Check whether a tree-forming object is attached
    pub fn has_owner(&self) -> bool {
        self.owner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Row;

    #[derive(Debug)]
    struct Catalog {
        id: u64,
    }

    impl TreeOwner<u64> for Catalog {
        fn tree_id(&self) -> u64 {
            self.id
        }
    }

    #[test]
    fn test_intern_deduplicates_by_identity() {
        let mut arena = NodeArena::new();
        let first = arena.intern(Row::new(5, 1, 1, 4, "root"));
        let second = arena.intern(Row::new(6, 1, 2, 3, "leaf"));
        let again = arena.intern(Row::new(5, 1, 1, 4, "root (re-read)"));

        assert_eq!(first, again);
        assert_ne!(first, second);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.node(again).map(|n| n.record().label.clone()).ok(), Some("root".to_string()));
        assert_eq!(arena.index_of(&6), Some(second));
        assert_eq!(arena.ids_of(&[second, first]), vec![6, 5]);
    }

    #[test]
    fn test_unknown_index() {
        let arena: NodeArena<Row> = NodeArena::new();
        assert!(arena.root().is_none());
        assert!(matches!(
            arena.node(NodeIndex(3)),
            Err(NestedSetError::UnknownNode(NodeIndex(3)))
        ));
    }

    #[test]
    fn test_owner_downcast() {
        let mut arena: NodeArena<Row> = NodeArena::new();
        assert!(arena.owner::<Catalog>().is_none());

        arena.attach_owner(Arc::new(Catalog { id: 42 }));
        let owner = arena.owner::<Catalog>().expect("owner attached");
        assert_eq!(owner.tree_id(), 42);
        assert!(arena.has_owner());
    }
}
