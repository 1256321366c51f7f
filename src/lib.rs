//! # Nested set trees
//!
//! Rebuilds navigable trees from rows encoded with the nested set model
//! (`left`/`right` boundary integers) and deletes subtrees recursively with
//! rollback on partial failure.
//!
//! ## Core Algorithm
//!
//! 1. **Bulk load**: one ordered query per tree, ascending by `left`
//! 2. **Level building**: a single pass links parent, children, siblings
//!    and ancestors using `descendants = (right - left - 1) / 2`
//! 3. **Lazy navigation**: nodes outside a materialized tree resolve their
//!    links on demand with small queries and partial level builds
//! 4. **Recursive delete**: depth-first, aborting on the first rejected row
//!
//! All nodes of a tree live in a [`NodeArena`]; links are [`NodeIndex`]
//! values into it, so the parent/child/sibling graph has no ownership cycles.
//!
//! ## Usage Example
//!
//! ```
//! use nested_sets::{MemoryStore, NestedSetConfig, Row, TreeCache};
//!
//! let store = MemoryStore::new(vec![
//!     Row::new(1, 7, 1, 6, "root"),
//!     Row::new(2, 7, 2, 3, "a"),
//!     Row::new(3, 7, 4, 5, "b"),
//! ]);
//! let mut cache = TreeCache::new(NestedSetConfig::default());
//! let tree = cache.load_tree(&store, &7).unwrap();
//! let root = tree.root().unwrap();
//! assert_eq!(tree.node(root).unwrap().links().children().resolved().map(|c| c.len()), Some(2));
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod cache;      // Process-lifetime cache of materialized trees
pub mod delete;     // Recursive subtree deletion
pub mod navigation; // Lazy per-node link resolution
pub mod store;      // Persistence collaborator contract
pub mod tree;       // Arena, nodes, links and the level builder

// Re-exports for convenience
pub use cache::TreeCache;
pub use delete::{delete_recursively, DeleteOutcome, DeleteReport, DeleteState, RecursiveDeleter};
pub use navigation::Navigator;
pub use store::{Direction, MemoryStore, MemoryStoreError, NestedRecord, NestedStore, Row, StoreError, TreeOwner};
pub use tree::{BuildMode, LevelBuilder, Link, LinkKind, LinkValue, Links, Node, NodeArena, NodeIndex};

use thiserror::Error;

/// Configuration shared by the cache, the resolver and the deleter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedSetConfig {
    /// `left` value that marks the root of a tree
    pub root_left: i64,

    /// Check boundary consistency while building levels
    ///
    /// When disabled, the builder trusts query results the way a plain
    /// nested set implementation does.
    pub validate_levels: bool,
}

impl Default for NestedSetConfig {
    fn default() -> Self {
        Self {
            root_left: 1,
            validate_levels: true,
        }
    }
}

impl NestedSetConfig {
    /// Default configuration: roots start at `left == 1`, validation on
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different root-left convention
    pub fn with_root_left(mut self, root_left: i64) -> Self {
        self.root_left = root_left;
        self
    }

    /// Enable or disable level validation
    pub fn with_level_validation(mut self, enabled: bool) -> Self {
        self.validate_levels = enabled;
        self
    }

    /// Whether a node with this `left` boundary is a tree root
    #[inline]
    pub fn is_root_left(&self, left: i64) -> bool {
        left == self.root_left
    }
}

/// Errors raised while building, navigating or deleting nested set trees
#[derive(Error, Debug)]
pub enum NestedSetError {
    /// Boundaries yield a negative or fractional descendant count
    #[error("malformed nested-set boundaries on node {node}: left={left}, right={right}")]
    MalformedBoundaries {
        /// Identity of the offending node
        node: String,
        /// Its left boundary
        left: i64,
        /// Its right boundary
        right: i64,
    },

    /// A node handed to the builder does not fit under its supposed parent
    #[error("node {child} is not a consistent child of {parent}: {reason}")]
    InconsistentChildren {
        /// Identity of the parent
        parent: String,
        /// Identity of the rejected child
        child: String,
        /// What check failed
        reason: String,
    },

    /// The same identity appeared twice in one ordered load
    #[error("node {0} appears more than once in the ordered load")]
    DuplicateNode(String),

    /// Index does not belong to the arena
    #[error("unknown node index {0}")]
    UnknownNode(NodeIndex),

    /// A link the operation depends on is still unresolved
    #[error("link `{kind}` of node {node} has not been resolved")]
    UnresolvedLink {
        /// Which link
        kind: LinkKind,
        /// Identity of the node
        node: String,
    },

    /// Relation name outside the closed set of link kinds
    #[error("invalid nested relation name: \"{0}\"")]
    InvalidLinkName(String),

    /// The persistence collaborator failed; the source is its error unchanged
    #[error("store operation `{operation}` failed")]
    Store {
        /// Collaborator method that failed
        operation: &'static str,
        /// Error raised by the collaborator
        #[source]
        source: StoreError,
    },
}

impl NestedSetError {
    /// Wrap a collaborator error raised by `operation`
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| NestedSetError::Store { operation, source }
    }

    /// Collaborator error carried by this fault, if any
    pub fn store_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            NestedSetError::Store { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
