//! Link resolution state and the closed set of link kinds

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::NodeIndex;
use crate::NestedSetError;

/// Resolution state of one navigation link
///
/// `Resolved(None)` for a single-valued link means "computed, no such node",
/// which is distinct from `Unresolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link<T> {
    /// Not computed yet
    Unresolved,

    /// Computed value
    Resolved(T),
}

impl<T> Default for Link<T> {
    fn default() -> Self {
        Link::Unresolved
    }
}

impl<T> Link<T> {
    /// Check whether the link has been computed
    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Link::Resolved(_))
    }

    /// Computed value, if any
    pub fn resolved(self) -> Option<T> {
        match self {
            Link::Resolved(value) => Some(value),
            Link::Unresolved => None,
        }
    }

    /// Borrow the value
    pub fn as_ref(&self) -> Link<&T> {
        match self {
            Link::Resolved(value) => Link::Resolved(value),
            Link::Unresolved => Link::Unresolved,
        }
    }
}

/// Navigation relation of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinkKind {
    /// Immediate parent
    Parent,

    /// Root-first ancestor chain
    Ancestors,

    /// Previous sibling
    Previous,

    /// Next sibling
    Next,

    /// Immediate children, left to right
    Children,
}

impl LinkKind {
    /// Every relation, in the order they are exposed as extra fields
    pub const ALL: [LinkKind; 5] = [
        LinkKind::Ancestors,
        LinkKind::Parent,
        LinkKind::Previous,
        LinkKind::Next,
        LinkKind::Children,
    ];

    /// Relation name as exposed to callers
    pub fn name(self) -> &'static str {
        match self {
            LinkKind::Parent => "parent",
            LinkKind::Ancestors => "parents",
            LinkKind::Previous => "prev",
            LinkKind::Next => "next",
            LinkKind::Children => "children",
        }
    }

    /// Whether the relation holds at most one node
    pub fn is_single(self) -> bool {
        matches!(self, LinkKind::Parent | LinkKind::Previous | LinkKind::Next)
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LinkKind {
    type Err = NestedSetError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        LinkKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| NestedSetError::InvalidLinkName(name.to_string()))
    }
}

/// Value assigned to a link by `Navigator::populate_link`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkValue {
    /// Parent (`None` for a root); also derives the ancestor chain
    Parent(Option<NodeIndex>),

    /// Root-first ancestors; also derives the parent
    Ancestors(Vec<NodeIndex>),

    /// Previous sibling
    Previous(Option<NodeIndex>),

    /// Next sibling
    Next(Option<NodeIndex>),

    /// Children, left to right
    Children(Vec<NodeIndex>),
}

impl LinkValue {
    /// Relation this value populates
    pub fn kind(&self) -> LinkKind {
        match self {
            LinkValue::Parent(_) => LinkKind::Parent,
            LinkValue::Ancestors(_) => LinkKind::Ancestors,
            LinkValue::Previous(_) => LinkKind::Previous,
            LinkValue::Next(_) => LinkKind::Next,
            LinkValue::Children(_) => LinkKind::Children,
        }
    }

    /// Every node index referenced by the value
    pub fn nodes(&self) -> Vec<NodeIndex> {
        match self {
            LinkValue::Parent(node) | LinkValue::Previous(node) | LinkValue::Next(node) => {
                node.iter().copied().collect()
            }
            LinkValue::Ancestors(nodes) | LinkValue::Children(nodes) => nodes.clone(),
        }
    }
}
