//! Recursive subtree deletion
//!
//! Depth-first, children before their parent. The first rejected delete
//! terminates the walk; remaining siblings are not attempted. The outcome
//! is threaded back up as a value and the top level decides between commit
//! and rollback.

use tracing::{debug, trace, warn};

use crate::navigation::Navigator;
use crate::store::{IdOf, NestedRecord, NestedStore};
use crate::tree::{NodeArena, NodeIndex};
use crate::{NestedSetConfig, NestedSetError};

/// Result of a recursive delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Every row in the subtree was deleted
    Success,

    /// Some delete was rejected by a guard
    Failure,
}

/// Deleter state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    /// Walking the subtree
    Running,

    /// Walk finished with this outcome
    Terminated(DeleteOutcome),
}

/// Summary of one top-level recursive delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport<Id> {
    /// Overall outcome
    pub outcome: DeleteOutcome,

    /// Delete calls the store accepted (a root's subtree delete counts once)
    pub deleted: usize,

    /// Node whose delete was rejected
    pub rejected_by: Option<Id>,

    /// Whether a transaction was rolled back
    pub rolled_back: bool,
}

impl<Id> DeleteReport<Id> {
    /// Check whether the whole subtree was deleted
    pub fn is_success(&self) -> bool {
        self.outcome == DeleteOutcome::Success
    }
}

/// Deletes a node and all of its descendants one row at a time
///
/// Children are resolved through [`Navigator`], so a node from a
/// materialized tree deletes without extra queries and a lone node loads
/// its children level by level. Nodes stay in the arena after deletion;
/// evict cached trees that were affected.
#[derive(Debug)]
pub struct RecursiveDeleter<'a, S: NestedStore> {
    store: &'a mut S,
    arena: &'a mut NodeArena<S::Record>,
    config: NestedSetConfig,
    state: DeleteState,
    deleted: usize,
    rejected_by: Option<IdOf<S>>,
}

impl<'a, S: NestedStore> RecursiveDeleter<'a, S> {
    /// Create a deleter over `arena`
    pub fn new(store: &'a mut S, arena: &'a mut NodeArena<S::Record>, config: NestedSetConfig) -> Self {
        Self {
            store,
            arena,
            config,
            state: DeleteState::Running,
            deleted: 0,
            rejected_by: None,
        }
    }

    /// Current state
    pub fn state(&self) -> DeleteState {
        self.state
    }

    /// Delete `node` and its subtree
    ///
    /// When the store declares deletes transactional the walk runs inside
    /// one transaction: a rejection rolls it back and reports
    /// [`DeleteOutcome::Failure`]. A store fault after the transaction
    /// opened (including one raised by `commit`) rolls it back and is
    /// returned as the error. Any error leaves the deleter in
    /// `Terminated(Failure)`.
    pub fn run(&mut self, node: NodeIndex) -> Result<DeleteReport<IdOf<S>>, NestedSetError> {
        self.arena.node(node)?;
        self.state = DeleteState::Running;
        self.deleted = 0;
        self.rejected_by = None;

        if !self.store.is_delete_transactional() {
            return match self.walk(node) {
                Ok(outcome) => Ok(self.finish(outcome, false)),
                Err(err) => Err(self.fail(err)),
            };
        }

        if let Err(source) = self.store.begin_transaction() {
            return Err(self.fail(NestedSetError::store("begin_transaction")(source)));
        }

        match self.walk(node) {
            Ok(DeleteOutcome::Success) => match self.store.commit() {
                Ok(()) => Ok(self.finish(DeleteOutcome::Success, false)),
                Err(source) => Err(self.abort(NestedSetError::store("commit")(source))),
            },
            Ok(DeleteOutcome::Failure) => match self.store.rollback() {
                Ok(()) => Ok(self.finish(DeleteOutcome::Failure, true)),
                Err(source) => Err(self.fail(NestedSetError::store("rollback")(source))),
            },
            Err(err) => Err(self.abort(err)),
        }
    }

    /// Roll back the open transaction, then terminate with `err`
    fn abort(&mut self, err: NestedSetError) -> NestedSetError {
        if let Err(rollback) = self.store.rollback() {
            warn!(error = %rollback, "rollback after failed recursive delete failed");
        }
        self.fail(err)
    }

    fn fail(&mut self, err: NestedSetError) -> NestedSetError {
        self.state = DeleteState::Terminated(DeleteOutcome::Failure);
        debug!(error = %err, deleted = self.deleted, "recursive delete failed");
        err
    }

    fn walk(&mut self, node: NodeIndex) -> Result<DeleteOutcome, NestedSetError> {
        let children = Navigator::new(&*self.store, &mut *self.arena, self.config)
            .children(node)?
            .to_vec();
        for child in children {
            if self.walk(child)? == DeleteOutcome::Failure {
                return Ok(DeleteOutcome::Failure);
            }
        }

        let (id, is_root) = {
            let current = self.arena.node(node)?;
            (current.record().id(), self.config.is_root_left(current.left()))
        };
        let accepted = if is_root {
            self.store
                .delete_subtree_rows(&id)
                .map_err(NestedSetError::store("delete_subtree_rows"))?
        } else {
            self.store
                .delete_row(&id)
                .map_err(NestedSetError::store("delete_row"))?
        };

        if accepted {
            trace!(node = ?id, "deleted row");
            self.deleted += 1;
            Ok(DeleteOutcome::Success)
        } else {
            debug!(node = ?id, "delete rejected");
            self.rejected_by = Some(id);
            Ok(DeleteOutcome::Failure)
        }
    }

    fn finish(&mut self, outcome: DeleteOutcome, rolled_back: bool) -> DeleteReport<IdOf<S>> {
        self.state = DeleteState::Terminated(outcome);
        debug!(?outcome, deleted = self.deleted, rolled_back, "recursive delete finished");
        DeleteReport {
            outcome,
            deleted: self.deleted,
            rejected_by: self.rejected_by.take(),
            rolled_back,
        }
    }
}

/// Delete `node` and its subtree with a one-off [`RecursiveDeleter`]
pub fn delete_recursively<S: NestedStore>(
    store: &mut S,
    arena: &mut NodeArena<S::Record>,
    node: NodeIndex,
    config: NestedSetConfig,
) -> Result<DeleteReport<IdOf<S>>, NestedSetError> {
    RecursiveDeleter::new(store, arena, config).run(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Row};

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            Row::new(1, 1, 1, 10, "root"),
            Row::new(2, 1, 2, 5, "a"),
            Row::new(3, 1, 3, 4, "c"),
            Row::new(4, 1, 6, 9, "b"),
            Row::new(5, 1, 7, 8, "d"),
        ])
    }

    #[test]
    fn test_delete_leaf() {
        let mut store = store();
        let mut arena = NodeArena::new();
        let c = arena.intern(store.row(3).cloned().unwrap());

        let mut deleter = RecursiveDeleter::new(&mut store, &mut arena, NestedSetConfig::default());
        assert_eq!(deleter.state(), DeleteState::Running);
        let report = deleter.run(c).unwrap();
        assert_eq!(deleter.state(), DeleteState::Terminated(DeleteOutcome::Success));

        assert!(report.is_success());
        assert_eq!(report.deleted, 1);
        assert!(store.row(3).is_none());
        assert_eq!(store.commits(), 1);
        // Leaf: no children query
        assert_eq!(store.query_count(), 0);
    }

    #[test]
    fn test_rejection_aborts_siblings() {
        let mut store = store().with_transactions(false);
        store.veto(3);
        let mut arena = NodeArena::new();
        let root = arena.intern(store.row(1).cloned().unwrap());

        let report = delete_recursively(&mut store, &mut arena, root, NestedSetConfig::default()).unwrap();
        assert_eq!(report.outcome, DeleteOutcome::Failure);
        assert_eq!(report.rejected_by, Some(3));
        assert!(!report.rolled_back);
        // B's subtree was never visited
        assert!(store.row(4).is_some());
        assert!(store.row(5).is_some());
        assert_eq!(store.rows().len(), 5);
    }

    #[test]
    fn test_fault_without_transaction_terminates() {
        let mut store = store().with_transactions(false);
        store.inject_fault(5);
        let mut arena = NodeArena::new();
        let b = arena.intern(store.row(4).cloned().unwrap());

        let mut deleter = RecursiveDeleter::new(&mut store, &mut arena, NestedSetConfig::default());
        let err = deleter.run(b).unwrap_err();
        assert!(matches!(err, NestedSetError::Store { operation: "delete_row", .. }));
        assert_eq!(deleter.state(), DeleteState::Terminated(DeleteOutcome::Failure));
        assert_eq!(store.rollbacks(), 0);
    }

    #[test]
    fn test_unknown_node() {
        let mut store = store();
        let mut arena = NodeArena::new();
        let err = delete_recursively(&mut store, &mut arena, NodeIndex(0), NestedSetConfig::default())
            .unwrap_err();
        assert!(matches!(err, NestedSetError::UnknownNode(_)));
        assert!(!store.in_transaction());
    }
}
