//! Cache of fully materialized trees keyed by tree identifier
//!
//! Entries are built once from a single ordered bulk load and never
//! refreshed implicitly. Callers that need fresh data evict or clear.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::navigation::Navigator;
use crate::store::{NestedRecord, NestedStore, TreeOwner};
use crate::tree::{BuildMode, LevelBuilder, NodeArena, NodeIndex};
use crate::{NestedSetConfig, NestedSetError};

/// Materialized trees, one arena per tree identifier
#[derive(Debug)]
pub struct TreeCache<R: NestedRecord> {
    config: NestedSetConfig,
    trees: HashMap<R::TreeId, NodeArena<R>>,
}

impl<R: NestedRecord> TreeCache<R> {
    /// Create an empty cache
    pub fn new(config: NestedSetConfig) -> Self {
        Self {
            config,
            trees: HashMap::new(),
        }
    }

    /// Configuration used for every build
    pub fn config(&self) -> &NestedSetConfig {
        &self.config
    }

    /// All nodes of `tree`, ascending by left boundary, fully linked
    ///
    /// The first call issues one ordered query; later calls return the same
    /// cached arena without touching the store. An empty tree is cached as
    /// an empty arena.
    pub fn load_tree<S>(&mut self, store: &S, tree: &R::TreeId) -> Result<&NodeArena<R>, NestedSetError>
    where
        S: NestedStore<Record = R>,
    {
        let arena = self.entry_or_load(store, tree.clone())?;
        Ok(&*arena)
    }

    /// Like [`load_tree`](Self::load_tree), taking the identifier from
    /// `owner` and cross-linking the loaded tree back to it
    pub fn load_tree_for<S, O>(&mut self, store: &S, owner: Arc<O>) -> Result<&NodeArena<R>, NestedSetError>
    where
        S: NestedStore<Record = R>,
        O: TreeOwner<R::TreeId>,
    {
        let arena = self.entry_or_load(store, owner.tree_id())?;
        if !arena.is_empty() && !arena.has_owner() {
            arena.attach_owner(owner);
        }
        Ok(&*arena)
    }

    fn entry_or_load<S>(&mut self, store: &S, tree: R::TreeId) -> Result<&mut NodeArena<R>, NestedSetError>
    where
        S: NestedStore<Record = R>,
    {
        let config = self.config;
        match self.trees.entry(tree) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let arena = materialize(store, entry.key(), &config)?;
                Ok(entry.insert(arena))
            }
        }
    }

    /// Cached tree, if loaded
    pub fn get(&self, tree: &R::TreeId) -> Option<&NodeArena<R>> {
        self.trees.get(tree)
    }

    /// Mutable access to a cached tree
    pub fn get_mut(&mut self, tree: &R::TreeId) -> Option<&mut NodeArena<R>> {
        self.trees.get_mut(tree)
    }

    /// Resolver over a cached tree
    ///
    /// Nodes of a materialized tree are fully linked, so accessors answer
    /// from the cache without queries.
    pub fn navigator<'a, S>(&'a mut self, store: &'a S, tree: &R::TreeId) -> Option<Navigator<'a, S>>
    where
        S: NestedStore<Record = R>,
    {
        let config = self.config;
        self.trees
            .get_mut(tree)
            .map(move |arena| Navigator::new(store, arena, config))
    }

    /// Check whether `tree` is cached
    pub fn contains(&self, tree: &R::TreeId) -> bool {
        self.trees.contains_key(tree)
    }

    /// Drop one cached tree, returning it
    pub fn evict(&mut self, tree: &R::TreeId) -> Option<NodeArena<R>> {
        let evicted = self.trees.remove(tree);
        if evicted.is_some() {
            debug!(tree = ?tree, "evicted cached tree");
        }
        evicted
    }

    /// Drop every cached tree
    pub fn clear(&mut self) {
        debug!(trees = self.trees.len(), "clearing tree cache");
        self.trees.clear();
    }

    /// Number of cached trees (including empty ones)
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

/// Bulk-load `tree` and link it in one pass
fn materialize<S>(
    store: &S,
    tree: &<S::Record as NestedRecord>::TreeId,
    config: &NestedSetConfig,
) -> Result<NodeArena<S::Record>, NestedSetError>
where
    S: NestedStore,
{
    let records = store
        .query_ordered(tree)
        .map_err(NestedSetError::store("query_ordered"))?;
    debug!(tree = ?tree, rows = records.len(), "materializing tree");

    let mut arena = NodeArena::with_capacity(records.len());
    let mut order: Vec<NodeIndex> = Vec::with_capacity(records.len());
    for record in records {
        let index = arena.intern(record);
        // Fresh rows land in the next slot; anything else was seen before
        if index.index() != order.len() {
            return Err(NestedSetError::DuplicateNode(arena.describe(index)));
        }
        order.push(index);
    }

    let Some((&root, descendants)) = order.split_first() else {
        return Ok(arena);
    };
    // The root's own boundaries must encode a whole number of descendants
    arena.node(root)?.descendant_count()?;
    arena.links_mut(root)?.seed_root();
    LevelBuilder::new(config).build(&mut arena, root, descendants, BuildMode::FullTree)?;
    Ok(arena)
}
