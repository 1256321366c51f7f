//! Persistence collaborator contract
//!
//! The tree core never talks to a database directly. It consumes:
//! - ordered bulk loads of one tree
//! - immediate-children, ancestor and sibling lookups for one node
//! - single-row and whole-subtree deletes
//! - an optional transaction boundary for deletes

mod memory;

pub use memory::{MemoryStore, MemoryStoreError, Row};

use std::any::Any;
use std::fmt;
use std::hash::Hash;

/// Error raised by a collaborator; carried unchanged as the error source
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identity type of a store's rows
pub type IdOf<S> = <<S as NestedStore>::Record as NestedRecord>::Id;

/// A row participating in a nested set
pub trait NestedRecord: Clone + fmt::Debug {
    /// Row identity, unique within storage
    type Id: Clone + Eq + Hash + fmt::Debug;

    /// Identifier grouping rows into one tree
    type TreeId: Clone + Eq + Hash + fmt::Debug;

    /// Row identity
    fn id(&self) -> Self::Id;

    /// Tree this row belongs to
    fn tree_id(&self) -> Self::TreeId;

    /// Left boundary
    fn left(&self) -> i64;

    /// Right boundary
    fn right(&self) -> i64;
}

/// Object a tree hangs off (e.g. a catalog row that owns a category tree)
///
/// Loading a tree through its owner cross-links the loaded tree back to it.
pub trait TreeOwner<T>: Any + Send + Sync {
    /// Identifier of the owned tree
    fn tree_id(&self) -> T;
}

/// Sibling direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sibling immediately to the left
    Previous,

    /// Sibling immediately to the right
    Next,
}

/// Persistence layer consumed by the tree core
///
/// All calls are blocking. A delete returning `Ok(false)` is a soft
/// rejection (a guard vetoed it); hard faults must be returned as `Err`.
pub trait NestedStore {
    /// Row type
    type Record: NestedRecord;

    /// All rows of `tree`, ascending by left boundary
    fn query_ordered(&self, tree: &<Self::Record as NestedRecord>::TreeId) -> Result<Vec<Self::Record>, StoreError>;

    /// Immediate children of `node`, ascending by left boundary
    fn query_children(&self, node: &<Self::Record as NestedRecord>::Id) -> Result<Vec<Self::Record>, StoreError>;

    /// All ancestors of `node`, root first
    fn query_ancestors(&self, node: &<Self::Record as NestedRecord>::Id) -> Result<Vec<Self::Record>, StoreError>;

    /// Sibling of `node` immediately before or after it
    fn query_sibling(
        &self,
        node: &<Self::Record as NestedRecord>::Id,
        direction: Direction,
    ) -> Result<Option<Self::Record>, StoreError>;

    /// Delete one row
    fn delete_row(&mut self, node: &<Self::Record as NestedRecord>::Id) -> Result<bool, StoreError>;

    /// Delete `root` together with all of its descendants
    fn delete_subtree_rows(&mut self, root: &<Self::Record as NestedRecord>::Id) -> Result<bool, StoreError>;

    /// Whether deletes for this entity type run inside a transaction
    fn is_delete_transactional(&self) -> bool {
        false
    }

    /// Open a transaction
    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Commit the open transaction
    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Roll back the open transaction
    fn rollback(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
