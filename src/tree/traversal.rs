//! Pre-order traversal over resolved children links
//!
//! Never issues queries: unresolved children are treated as "not loaded"
//! and the walk does not descend into them.

use super::{NodeArena, NodeIndex};
use crate::store::NestedRecord;

/// Depth-first, left-to-right walk yielding `(node, depth)` pairs
///
/// Depth is relative to the start node (start = 0).
#[derive(Debug)]
pub struct PreOrder<'a, R: NestedRecord> {
    arena: &'a NodeArena<R>,

    /// Pending nodes, rightmost sibling at the bottom
    stack: Vec<(NodeIndex, usize)>,
}

impl<'a, R: NestedRecord> PreOrder<'a, R> {
    /// Start a walk at `start`; an unknown index yields nothing
    pub fn new(arena: &'a NodeArena<R>, start: NodeIndex) -> Self {
        let stack = if arena.get(start).is_some() {
            vec![(start, 0)]
        } else {
            Vec::new()
        };
        Self { arena, stack }
    }

    /// Current stack depth (pending nodes)
    pub fn pending(&self) -> usize {
        self.stack.len()
    }
}

impl<'a, R: NestedRecord> Iterator for PreOrder<'a, R> {
    type Item = (NodeIndex, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, depth) = self.stack.pop()?;
        if let Some(children) = self
            .arena
            .get(index)
            .and_then(|node| node.links().children().resolved())
        {
            // Push in reverse so the leftmost child pops first
            self.stack
                .extend(children.iter().rev().map(|&child| (child, depth + 1)));
        }
        Some((index, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Row;
    use crate::tree::Link;

    #[test]
    fn test_walk_stops_at_unresolved_children() {
        let mut arena = NodeArena::new();
        let root = arena.intern(Row::new(1, 1, 1, 8, "root"));
        let a = arena.intern(Row::new(2, 1, 2, 5, "a"));
        let b = arena.intern(Row::new(3, 1, 6, 7, "b"));
        let _hidden = arena.intern(Row::new(4, 1, 3, 4, "c"));
        arena.links_mut(root).unwrap().children = Link::Resolved(vec![a, b]);

        let visited: Vec<_> = arena.pre_order(root).collect();
        assert_eq!(visited, vec![(root, 0), (a, 1), (b, 1)]);
    }

    #[test]
    fn test_unknown_start() {
        let arena: NodeArena<Row> = NodeArena::new();
        let walk = arena.pre_order(NodeIndex(0));
        assert_eq!(walk.pending(), 0);
        assert_eq!(walk.count(), 0);
    }
}
