//! In-memory nested set store
//!
//! Reference collaborator: rows in a `Vec`, boundary queries by linear scan,
//! snapshot transactions. Delete guards (vetoes) and hard faults can be
//! injected per row.

use std::cell::Cell;
use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use super::{Direction, NestedRecord, NestedStore, StoreError};

/// One row of a nested set table
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Row {
    /// Row identity
    pub id: u64,
    /// Tree identifier
    pub tree_id: u64,
    /// Left boundary
    pub left: i64,
    /// Right boundary
    pub right: i64,
    /// Display label
    pub label: String,
}

impl Row {
    /// Create a row
    pub fn new(id: u64, tree_id: u64, left: i64, right: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            tree_id,
            left,
            right,
            label: label.into(),
        }
    }

    /// Check whether `other` lies strictly inside this row's span
    fn contains(&self, other: &Row) -> bool {
        self.tree_id == other.tree_id && self.left < other.left && other.right < self.right
    }
}

impl NestedRecord for Row {
    type Id = u64;
    type TreeId = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn tree_id(&self) -> u64 {
        self.tree_id
    }

    fn left(&self) -> i64 {
        self.left
    }

    fn right(&self) -> i64 {
        self.right
    }
}

/// Faults raised by [`MemoryStore`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// No row with this identity
    #[error("row {0} not found")]
    NotFound(u64),

    /// Fault injected for this row
    #[error("injected fault while deleting row {0}")]
    InjectedFault(u64),

    /// Commit or rollback without an open transaction
    #[error("no open transaction")]
    NoTransaction,

    /// Transactions do not nest
    #[error("a transaction is already open")]
    NestedTransaction,
}

/// Nested set rows held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Vec<Row>,
    /// Rows whose delete guard rejects deletion
    vetoed: HashSet<u64>,
    /// Rows whose delete raises a hard fault
    faults: HashSet<u64>,
    transactional: bool,
    /// Rows as they were when the open transaction began
    snapshot: Option<Vec<Row>>,
    queries: Cell<usize>,
    commits: usize,
    rollbacks: usize,
}

impl MemoryStore {
    /// Create a store holding `rows`; deletes are transactional
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            transactional: true,
            ..Self::default()
        }
    }

    /// Enable or disable transactional deletes
    pub fn with_transactions(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    /// Reject deletion of row `id` (soft failure)
    pub fn veto(&mut self, id: u64) {
        self.vetoed.insert(id);
    }

    /// Make deleting row `id` raise a hard fault
    pub fn inject_fault(&mut self, id: u64) {
        self.faults.insert(id);
    }

    /// Add a row
    pub fn insert(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// All rows in insertion order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row with identity `id`
    pub fn row(&self, id: u64) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Number of query calls issued so far
    pub fn query_count(&self) -> usize {
        self.queries.get()
    }

    /// Reset the query counter
    pub fn reset_query_count(&self) {
        self.queries.set(0);
    }

    /// Number of committed transactions
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of rolled back transactions
    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Check whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn count_query(&self, name: &'static str) {
        self.queries.set(self.queries.get() + 1);
        trace!(query = name, total = self.queries.get(), "memory store query");
    }

    fn find(&self, id: u64) -> Result<&Row, StoreError> {
        self.row(id)
            .ok_or_else(|| Box::new(MemoryStoreError::NotFound(id)) as StoreError)
    }

    /// Rows strictly inside `row`, ascending by left boundary
    fn descendants(&self, row: &Row) -> Vec<Row> {
        let mut inside: Vec<Row> = self
            .rows
            .iter()
            .filter(|candidate| row.contains(candidate))
            .cloned()
            .collect();
        inside.sort_by_key(|candidate| candidate.left);
        inside
    }

    fn check_delete(&self, id: u64) -> Result<bool, StoreError> {
        if self.faults.contains(&id) {
            return Err(Box::new(MemoryStoreError::InjectedFault(id)));
        }
        self.find(id)?;
        Ok(!self.vetoed.contains(&id))
    }
}

impl NestedStore for MemoryStore {
    type Record = Row;

    fn query_ordered(&self, tree: &u64) -> Result<Vec<Row>, StoreError> {
        self.count_query("ordered");
        let mut rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| row.tree_id == *tree)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.left);
        Ok(rows)
    }

    fn query_children(&self, node: &u64) -> Result<Vec<Row>, StoreError> {
        self.count_query("children");
        let parent = self.find(*node)?;

        // Walk descendants in left order, skipping each child's own subtree
        let mut children = Vec::new();
        let mut covered_until = parent.left;
        for row in self.descendants(parent) {
            if row.left > covered_until {
                covered_until = row.right;
                children.push(row);
            }
        }
        Ok(children)
    }

    fn query_ancestors(&self, node: &u64) -> Result<Vec<Row>, StoreError> {
        self.count_query("ancestors");
        let row = self.find(*node)?;
        let mut ancestors: Vec<Row> = self
            .rows
            .iter()
            .filter(|candidate| candidate.contains(row))
            .cloned()
            .collect();
        ancestors.sort_by_key(|ancestor| ancestor.left);
        Ok(ancestors)
    }

    /// Adjacent boundaries identify the sibling (`right == left - 1` or
    /// `left == right + 1`); no parent check is made, so this relies on
    /// contiguous, gap-free boundaries within the tree.
    fn query_sibling(&self, node: &u64, direction: Direction) -> Result<Option<Row>, StoreError> {
        self.count_query("sibling");
        let row = self.find(*node)?;
        let sibling = self.rows.iter().find(|candidate| {
            candidate.tree_id == row.tree_id
                && match direction {
                    Direction::Previous => candidate.right == row.left - 1,
                    Direction::Next => candidate.left == row.right + 1,
                }
        });
        Ok(sibling.cloned())
    }

    fn delete_row(&mut self, node: &u64) -> Result<bool, StoreError> {
        if !self.check_delete(*node)? {
            return Ok(false);
        }
        self.rows.retain(|row| row.id != *node);
        Ok(true)
    }

    fn delete_subtree_rows(&mut self, root: &u64) -> Result<bool, StoreError> {
        if !self.check_delete(*root)? {
            return Ok(false);
        }
        let root_row = self.find(*root)?.clone();
        self.rows
            .retain(|row| row.id != root_row.id && !root_row.contains(row));
        Ok(true)
    }

    fn is_delete_transactional(&self) -> bool {
        self.transactional
    }

    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(Box::new(MemoryStoreError::NestedTransaction));
        }
        self.snapshot = Some(self.rows.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.snapshot
            .take()
            .ok_or_else(|| Box::new(MemoryStoreError::NoTransaction) as StoreError)?;
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.rows = self
            .snapshot
            .take()
            .ok_or_else(|| Box::new(MemoryStoreError::NoTransaction) as StoreError)?;
        self.rollbacks += 1;
        Ok(())
    }
}
