//! Lazy per-node link resolution
//!
//! Every accessor checks the node's cached link first and only falls back
//! to a collaborator query when the link is still unresolved. Rows returned
//! by queries are interned into the same arena, so a node reached twice is
//! linked once.

use tracing::{debug, trace};

use crate::store::{Direction, NestedRecord, NestedStore};
use crate::tree::{BuildMode, LevelBuilder, Link, LinkKind, LinkValue, NodeArena, NodeIndex};
use crate::{NestedSetConfig, NestedSetError};

/// Resolves links of nodes in one arena against one store
#[derive(Debug)]
pub struct Navigator<'a, S: NestedStore> {
    store: &'a S,
    arena: &'a mut NodeArena<S::Record>,
    config: NestedSetConfig,
}

impl<'a, S: NestedStore> Navigator<'a, S> {
    /// Create a resolver over `arena`
    pub fn new(store: &'a S, arena: &'a mut NodeArena<S::Record>, config: NestedSetConfig) -> Self {
        Self { store, arena, config }
    }

    /// Arena being resolved
    pub fn arena(&self) -> &NodeArena<S::Record> {
        &*self.arena
    }

    /// Hydrate a row into the arena (or find the existing slot)
    pub fn adopt(&mut self, record: S::Record) -> NodeIndex {
        self.arena.intern(record)
    }

    /// Ancestors of `node`, root first
    pub fn ancestors(&mut self, node: NodeIndex) -> Result<&[NodeIndex], NestedSetError> {
        if !self.arena.node(node)?.links().ancestors().is_resolved() {
            self.resolve_ancestors(node)?;
        }
        self.arena
            .node(node)?
            .links()
            .ancestors()
            .resolved()
            .ok_or_else(|| self.unresolved(node, LinkKind::Ancestors))
    }

    /// Immediate parent of `node` (`None` for a root)
    pub fn parent(&mut self, node: NodeIndex) -> Result<Option<NodeIndex>, NestedSetError> {
        if let Link::Resolved(parent) = self.arena.node(node)?.links().parent() {
            return Ok(parent);
        }
        self.resolve_ancestors(node)?;
        self.arena
            .node(node)?
            .links()
            .parent()
            .resolved()
            .ok_or_else(|| self.unresolved(node, LinkKind::Parent))
    }

    /// Immediate children of `node`, left to right
    pub fn children(&mut self, node: NodeIndex) -> Result<&[NodeIndex], NestedSetError> {
        if !self.arena.node(node)?.links().children().is_resolved() {
            self.resolve_children(node)?;
        }
        self.arena
            .node(node)?
            .links()
            .children()
            .resolved()
            .ok_or_else(|| self.unresolved(node, LinkKind::Children))
    }

    /// Sibling immediately before `node`
    pub fn previous(&mut self, node: NodeIndex) -> Result<Option<NodeIndex>, NestedSetError> {
        self.sibling(node, Direction::Previous)
    }

    /// Sibling immediately after `node`
    pub fn next(&mut self, node: NodeIndex) -> Result<Option<NodeIndex>, NestedSetError> {
        self.sibling(node, Direction::Next)
    }

    /// Resolve any link by kind, flattening it to a list
    pub fn resolve(&mut self, node: NodeIndex, kind: LinkKind) -> Result<Vec<NodeIndex>, NestedSetError> {
        Ok(match kind {
            LinkKind::Parent => self.parent(node)?.into_iter().collect(),
            LinkKind::Ancestors => self.ancestors(node)?.to_vec(),
            LinkKind::Previous => self.previous(node)?.into_iter().collect(),
            LinkKind::Next => self.next(node)?.into_iter().collect(),
            LinkKind::Children => self.children(node)?.to_vec(),
        })
    }

    /// Assign a link explicitly
    ///
    /// `Parent` and `Ancestors` keep each other consistent: a parent derives
    /// the chain from the parent's own ancestors (resolving them if needed),
    /// and a chain derives the parent from its last element.
    pub fn populate_link(&mut self, node: NodeIndex, value: LinkValue) -> Result<(), NestedSetError> {
        self.arena.node(node)?;
        for referenced in value.nodes() {
            self.arena.node(referenced)?;
        }
        trace!(node = %node, kind = %value.kind(), "populating link");

        match value {
            LinkValue::Parent(None) => {
                let links = self.arena.links_mut(node)?;
                links.ancestors = Link::Resolved(Vec::new());
                links.parent = Link::Resolved(None);
            }
            LinkValue::Parent(Some(parent)) => {
                let mut chain = self.ancestors(parent)?.to_vec();
                chain.push(parent);
                let links = self.arena.links_mut(node)?;
                links.ancestors = Link::Resolved(chain);
                links.parent = Link::Resolved(Some(parent));
            }
            LinkValue::Ancestors(chain) => {
                let links = self.arena.links_mut(node)?;
                links.parent = Link::Resolved(chain.last().copied());
                links.ancestors = Link::Resolved(chain);
            }
            LinkValue::Previous(previous) => self.arena.links_mut(node)?.previous = Link::Resolved(previous),
            LinkValue::Next(next) => self.arena.links_mut(node)?.next = Link::Resolved(next),
            LinkValue::Children(children) => {
                self.arena.links_mut(node)?.children = Link::Resolved(children)
            }
        }
        Ok(())
    }

    fn resolve_ancestors(&mut self, node: NodeIndex) -> Result<(), NestedSetError> {
        let (left, id) = {
            let current = self.arena.node(node)?;
            (current.left(), current.record().id())
        };

        if self.config.is_root_left(left) {
            let links = self.arena.links_mut(node)?;
            links.ancestors = Link::Resolved(Vec::new());
            links.parent = Link::Resolved(None);
            return Ok(());
        }

        debug!(node = ?id, "querying ancestors");
        let rows = self
            .store
            .query_ancestors(&id)
            .map_err(NestedSetError::store("query_ancestors"))?;
        let chain: Vec<NodeIndex> = rows.into_iter().map(|row| self.arena.intern(row)).collect();

        if chain.is_empty() {
            self.arena.links_mut(node)?.parent = Link::Resolved(None);
        } else {
            // Walk upwards pairing each node with the ancestor above it
            let mut child = node;
            for (depth, &ancestor) in chain.iter().enumerate().rev() {
                self.arena.links_mut(child)?.parent = Link::Resolved(Some(ancestor));
                let above = self.arena.links_mut(ancestor)?;
                if !above.ancestors.is_resolved() {
                    above.ancestors = Link::Resolved(chain[..depth].to_vec());
                }
                child = ancestor;
            }
            self.arena.links_mut(child)?.parent = Link::Resolved(None);
        }

        self.arena.links_mut(node)?.ancestors = Link::Resolved(chain);
        Ok(())
    }

    fn resolve_children(&mut self, node: NodeIndex) -> Result<(), NestedSetError> {
        let (leaf, id) = {
            let current = self.arena.node(node)?;
            (current.is_leaf(), current.record().id())
        };

        if leaf {
            self.arena.links_mut(node)?.children = Link::Resolved(Vec::new());
            return Ok(());
        }

        debug!(node = ?id, "querying children");
        let rows = self
            .store
            .query_children(&id)
            .map_err(NestedSetError::store("query_children"))?;
        let children: Vec<NodeIndex> = rows.into_iter().map(|row| self.arena.intern(row)).collect();
        LevelBuilder::new(&self.config).build(self.arena, node, &children, BuildMode::SingleLevel)
    }

    fn sibling(&mut self, node: NodeIndex, direction: Direction) -> Result<Option<NodeIndex>, NestedSetError> {
        let cached = {
            let links = self.arena.node(node)?.links();
            match direction {
                Direction::Previous => links.previous(),
                Direction::Next => links.next(),
            }
        };
        if let Link::Resolved(sibling) = cached {
            return Ok(sibling);
        }

        let id = self.arena.node(node)?.record().id();
        debug!(node = ?id, ?direction, "querying sibling");
        let sibling = self
            .store
            .query_sibling(&id, direction)
            .map_err(NestedSetError::store("query_sibling"))?
            .map(|row| self.arena.intern(row));

        let links = self.arena.links_mut(node)?;
        match direction {
            Direction::Previous => links.previous = Link::Resolved(sibling),
            Direction::Next => links.next = Link::Resolved(sibling),
        }

        // The sibling's opposite link points back here
        if let Some(sibling) = sibling {
            let back = self.arena.links_mut(sibling)?;
            match direction {
                Direction::Previous if !back.next.is_resolved() => back.next = Link::Resolved(Some(node)),
                Direction::Next if !back.previous.is_resolved() => {
                    back.previous = Link::Resolved(Some(node))
                }
                _ => {}
            }
        }
        Ok(sibling)
    }

    fn unresolved(&self, node: NodeIndex, kind: LinkKind) -> NestedSetError {
        NestedSetError::UnresolvedLink {
            kind,
            node: self.arena.describe(node),
        }
    }
}
