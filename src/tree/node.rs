//! Tree node representation
//!
//! Node = hydrated row + lazily resolved links
//! Descendant count from boundaries: d = (right - left - 1) / 2

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Link;
use crate::store::NestedRecord;
use crate::NestedSetError;

/// Position of a node inside its [`NodeArena`](super::NodeArena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    /// Raw arena slot
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Navigation links of one node
///
/// Every field resolves independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub(crate) parent: Link<Option<NodeIndex>>,
    pub(crate) ancestors: Link<Vec<NodeIndex>>,
    pub(crate) previous: Link<Option<NodeIndex>>,
    pub(crate) next: Link<Option<NodeIndex>>,
    pub(crate) children: Link<Vec<NodeIndex>>,
}

impl Links {
    /// Immediate parent
    pub fn parent(&self) -> Link<Option<NodeIndex>> {
        self.parent
    }

    /// Ancestors, root first
    pub fn ancestors(&self) -> Link<&[NodeIndex]> {
        match &self.ancestors {
            Link::Resolved(nodes) => Link::Resolved(nodes.as_slice()),
            Link::Unresolved => Link::Unresolved,
        }
    }

    /// Previous sibling
    pub fn previous(&self) -> Link<Option<NodeIndex>> {
        self.previous
    }

    /// Next sibling
    pub fn next(&self) -> Link<Option<NodeIndex>> {
        self.next
    }

    /// Children, left to right
    pub fn children(&self) -> Link<&[NodeIndex]> {
        match &self.children {
            Link::Resolved(nodes) => Link::Resolved(nodes.as_slice()),
            Link::Unresolved => Link::Unresolved,
        }
    }

    /// Whether all five links are resolved
    pub fn is_complete(&self) -> bool {
        self.parent.is_resolved()
            && self.ancestors.is_resolved()
            && self.previous.is_resolved()
            && self.next.is_resolved()
            && self.children.is_resolved()
    }

    /// Mark this node as a tree root: no parent, no ancestors, no siblings
    pub(crate) fn seed_root(&mut self) {
        self.ancestors = Link::Resolved(Vec::new());
        self.parent = Link::Resolved(None);
        self.previous = Link::Resolved(None);
        self.next = Link::Resolved(None);
    }
}

/// Tree node: one row of the underlying table plus its links
#[derive(Debug, Clone)]
pub struct Node<R> {
    record: R,
    links: Links,
}

impl<R: NestedRecord> Node<R> {
    pub(crate) fn new(record: R) -> Self {
        Self {
            record,
            links: Links::default(),
        }
    }

    /// Hydrated row
    pub fn record(&self) -> &R {
        &self.record
    }

    /// Navigation links
    pub fn links(&self) -> &Links {
        &self.links
    }

    pub(crate) fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }

    /// Left boundary
    #[inline]
    pub fn left(&self) -> i64 {
        self.record.left()
    }

    /// Right boundary
    #[inline]
    pub fn right(&self) -> i64 {
        self.record.right()
    }

    /// Check if leaf (span of exactly 2)
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.right() - self.left() == 1
    }

    /// Number of descendants encoded by the boundaries
    ///
    /// A negative or fractional result means the boundary data is corrupt.
    pub fn descendant_count(&self) -> Result<usize, NestedSetError> {
        let interior = self.right() - self.left() - 1;
        if interior < 0 || interior % 2 != 0 {
            return Err(NestedSetError::MalformedBoundaries {
                node: format!("{:?}", self.record.id()),
                left: self.left(),
                right: self.right(),
            });
        }
        usize::try_from(interior / 2).map_err(|_| NestedSetError::MalformedBoundaries {
            node: format!("{:?}", self.record.id()),
            left: self.left(),
            right: self.right(),
        })
    }
}
