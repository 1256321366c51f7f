//! Level builder: rebuilds links from a boundary-ordered node list
//!
//! Key property: one pass, no queries.
//! For each child `c` of root `R` (in list order):
//!   c.parent = R, c.ancestors = R.ancestors + [R]
//!   c.prev / c.next chain the siblings left to right
//!   d = (c.right - c.left - 1) / 2 following rows are c's subtree

use tracing::{debug, trace, warn};

use super::{Link, NodeArena, NodeIndex};
use crate::store::NestedRecord;
use crate::{NestedSetConfig, NestedSetError};

/// How much of the tree the supplied list covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Every descendant of the root, at all depths
    FullTree,

    /// Exactly the immediate children of the root
    SingleLevel,
}

/// Rebuilds parent/child/sibling/ancestor links for one root
#[derive(Debug, Clone, Copy)]
pub struct LevelBuilder {
    validate: bool,
}

impl LevelBuilder {
    /// Create a builder honoring `config.validate_levels`
    pub fn new(config: &NestedSetConfig) -> Self {
        Self {
            validate: config.validate_levels,
        }
    }

    /// Link `list` under `root`
    ///
    /// In [`BuildMode::FullTree`] the root's ancestor chain must already be
    /// resolved; it seeds the chains of every descendant.
    pub fn build<R: NestedRecord>(
        &self,
        arena: &mut NodeArena<R>,
        root: NodeIndex,
        list: &[NodeIndex],
        mode: BuildMode,
    ) -> Result<(), NestedSetError> {
        trace!(root = %root, rows = list.len(), ?mode, "building tree level");
        match mode {
            BuildMode::FullTree => self.build_full(arena, root, list),
            BuildMode::SingleLevel => self.build_single(arena, root, list),
        }
    }

    fn build_full<R: NestedRecord>(
        &self,
        arena: &mut NodeArena<R>,
        root: NodeIndex,
        list: &[NodeIndex],
    ) -> Result<(), NestedSetError> {
        let (root_left, root_right, mut chain) = {
            let node = arena.node(root)?;
            let chain = match node.links().ancestors() {
                Link::Resolved(ancestors) => ancestors.to_vec(),
                Link::Unresolved => {
                    return Err(NestedSetError::UnresolvedLink {
                        kind: super::LinkKind::Ancestors,
                        node: arena.describe(root),
                    })
                }
            };
            (node.left(), node.right(), chain)
        };
        chain.push(root);

        arena.links_mut(root)?.children = Link::Resolved(Vec::new());
        let mut previous = None;
        // Contiguity: the next child must start right after the previous one
        let mut expected_left = root_left + 1;

        let mut i = 0;
        while i < list.len() {
            let item = list[i];
            let (left, right, descendants) = {
                let node = arena.node(item)?;
                (node.left(), node.right(), node.descendant_count()?)
            };
            if self.validate {
                if left != expected_left {
                    return Err(self.inconsistent(
                        arena,
                        root,
                        item,
                        format!("expected left={expected_left}, found left={left}"),
                    ));
                }
                if right >= root_right {
                    return Err(self.inconsistent(
                        arena,
                        root,
                        item,
                        format!("right={right} escapes parent right={root_right}"),
                    ));
                }
            }

            link_child(arena, root, item, previous)?;
            arena.links_mut(item)?.ancestors = Link::Resolved(chain.clone());
            previous = Some(item);
            expected_left = right + 1;

            if descendants > 0 {
                // A short tail is linked as far as it goes
                let end = (i + 1 + descendants).min(list.len());
                if end - (i + 1) < descendants {
                    warn!(
                        node = %arena.describe(item),
                        needed = descendants,
                        available = end - (i + 1),
                        "subtree has fewer rows than its boundaries encode"
                    );
                }
                self.build_full(arena, item, &list[i + 1..end])?;
                i = end;
            } else {
                arena.links_mut(item)?.children = Link::Resolved(Vec::new());
                i += 1;
            }
        }

        if self.validate && !list.is_empty() && expected_left != root_right {
            return Err(NestedSetError::InconsistentChildren {
                parent: arena.describe(root),
                child: previous.map(|p| arena.describe(p)).unwrap_or_default(),
                reason: format!("children end at {} but parent right is {root_right}", expected_left - 1),
            });
        }

        terminate_chain(arena, previous)
    }

    fn build_single<R: NestedRecord>(
        &self,
        arena: &mut NodeArena<R>,
        root: NodeIndex,
        list: &[NodeIndex],
    ) -> Result<(), NestedSetError> {
        let (root_left, root_right) = {
            let node = arena.node(root)?;
            (node.left(), node.right())
        };

        arena.links_mut(root)?.children = Link::Resolved(Vec::new());
        let mut previous = None;
        let mut last_right = root_left;

        for &item in list {
            if self.validate {
                let (left, right) = {
                    let node = arena.node(item)?;
                    (node.left(), node.right())
                };
                if left <= last_right || right >= root_right || right <= left {
                    return Err(self.inconsistent(
                        arena,
                        root,
                        item,
                        format!(
                            "span [{left}, {right}] is not ordered inside [{root_left}, {root_right}] after {last_right}"
                        ),
                    ));
                }
                last_right = right;
            }

            link_child(arena, root, item, previous)?;
            previous = Some(item);
        }

        terminate_chain(arena, previous)
    }

    fn inconsistent<R: NestedRecord>(
        &self,
        arena: &NodeArena<R>,
        parent: NodeIndex,
        child: NodeIndex,
        reason: String,
    ) -> NestedSetError {
        let err = NestedSetError::InconsistentChildren {
            parent: arena.describe(parent),
            child: arena.describe(child),
            reason,
        };
        debug!(error = %err, "rejected tree level");
        err
    }
}

/// Append `item` to `root`'s children and chain it after `previous`
fn link_child<R: NestedRecord>(
    arena: &mut NodeArena<R>,
    root: NodeIndex,
    item: NodeIndex,
    previous: Option<NodeIndex>,
) -> Result<(), NestedSetError> {
    if let Link::Resolved(children) = &mut arena.links_mut(root)?.children {
        children.push(item);
    }

    let links = arena.links_mut(item)?;
    links.parent = Link::Resolved(Some(root));
    links.previous = Link::Resolved(previous);

    if let Some(prev) = previous {
        arena.links_mut(prev)?.next = Link::Resolved(Some(item));
    }
    Ok(())
}

/// The last child has no next sibling
fn terminate_chain<R: NestedRecord>(
    arena: &mut NodeArena<R>,
    last: Option<NodeIndex>,
) -> Result<(), NestedSetError> {
    if let Some(last) = last {
        arena.links_mut(last)?.next = Link::Resolved(None);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Row;

    /// root(1,10) -> A(2,5) -> C(3,4); root -> B(6,9) -> D(7,8)
    fn sample() -> (NodeArena<Row>, Vec<NodeIndex>) {
        let mut arena = NodeArena::new();
        let order = vec![
            arena.intern(Row::new(1, 1, 1, 10, "root")),
            arena.intern(Row::new(2, 1, 2, 5, "a")),
            arena.intern(Row::new(3, 1, 3, 4, "c")),
            arena.intern(Row::new(4, 1, 6, 9, "b")),
            arena.intern(Row::new(5, 1, 7, 8, "d")),
        ];
        (arena, order)
    }

    fn children(arena: &NodeArena<Row>, node: NodeIndex) -> Vec<u64> {
        let kids = arena.node(node).unwrap().links().children().resolved().unwrap();
        arena.ids_of(kids)
    }

    #[test]
    fn test_full_tree_links() {
        let (mut arena, order) = sample();
        let root = order[0];
        arena.links_mut(root).unwrap().seed_root();

        let builder = LevelBuilder::new(&NestedSetConfig::default());
        builder.build(&mut arena, root, &order[1..], BuildMode::FullTree).unwrap();

        assert_eq!(children(&arena, root), vec![2, 4]);
        assert_eq!(children(&arena, order[1]), vec![3]);
        assert_eq!(children(&arena, order[2]), Vec::<u64>::new());

        let b = arena.node(order[3]).unwrap().links();
        assert_eq!(b.previous(), Link::Resolved(Some(order[1])));
        assert_eq!(b.next(), Link::Resolved(None));
        assert_eq!(b.parent(), Link::Resolved(Some(root)));

        let d = arena.node(order[4]).unwrap().links();
        assert_eq!(d.ancestors(), Link::Resolved(&[root, order[3]][..]));
        assert_eq!(d.previous(), Link::Resolved(None));
        assert!(d.is_complete());
    }

    #[test]
    fn test_full_tree_requires_root_ancestors() {
        let (mut arena, order) = sample();
        let builder = LevelBuilder::new(&NestedSetConfig::default());
        let err = builder
            .build(&mut arena, order[0], &order[1..], BuildMode::FullTree)
            .unwrap_err();
        assert!(matches!(err, NestedSetError::UnresolvedLink { kind: crate::LinkKind::Ancestors, .. }));
    }

    #[test]
    fn test_short_subtree_is_clamped() {
        let (mut arena, order) = sample();
        arena.links_mut(order[0]).unwrap().seed_root();
        let builder = LevelBuilder::new(&NestedSetConfig::default());
        // Drop D: B claims one descendant that is not in the list
        builder
            .build(&mut arena, order[0], &order[1..4], BuildMode::FullTree)
            .unwrap();
        assert_eq!(children(&arena, order[0]), vec![2, 4]);
        assert_eq!(children(&arena, order[3]), Vec::<u64>::new());
        assert_eq!(arena.node(order[3]).unwrap().links().next(), Link::Resolved(None));
    }

    #[test]
    fn test_gap_rejected_when_validating() {
        let mut arena = NodeArena::new();
        let root = arena.intern(Row::new(1, 1, 1, 8, "root"));
        let a = arena.intern(Row::new(2, 1, 2, 3, "a"));
        let b = arena.intern(Row::new(3, 1, 6, 7, "b"));
        arena.links_mut(root).unwrap().seed_root();

        let strict = LevelBuilder::new(&NestedSetConfig::default());
        assert!(matches!(
            strict.build(&mut arena, root, &[a, b], BuildMode::FullTree),
            Err(NestedSetError::InconsistentChildren { .. })
        ));

        let lenient = LevelBuilder::new(&NestedSetConfig::default().with_level_validation(false));
        lenient.build(&mut arena, root, &[a, b], BuildMode::FullTree).unwrap();
        assert_eq!(children(&arena, root), vec![2, 3]);
    }

    #[test]
    fn test_single_level_sets_only_sibling_links() {
        let (mut arena, order) = sample();
        let builder = LevelBuilder::new(&NestedSetConfig::default());
        builder
            .build(&mut arena, order[0], &[order[1], order[3]], BuildMode::SingleLevel)
            .unwrap();

        assert_eq!(children(&arena, order[0]), vec![2, 4]);
        let a = arena.node(order[1]).unwrap().links();
        assert_eq!(a.parent(), Link::Resolved(Some(order[0])));
        assert_eq!(a.next(), Link::Resolved(Some(order[3])));
        assert!(!a.ancestors().is_resolved());
        assert!(!a.children().is_resolved());
    }

    #[test]
    fn test_single_level_rejects_grandchild() {
        let (mut arena, order) = sample();
        let builder = LevelBuilder::new(&NestedSetConfig::default());
        // C lies inside A, so it cannot follow A as a sibling
        let err = builder
            .build(&mut arena, order[0], &[order[1], order[2]], BuildMode::SingleLevel)
            .unwrap_err();
        assert!(matches!(err, NestedSetError::InconsistentChildren { ref child, .. } if child == "3"));
    }

    #[test]
    fn test_empty_list_resolves_empty_children() {
        let (mut arena, order) = sample();
        let builder = LevelBuilder::new(&NestedSetConfig::default());
        builder.build(&mut arena, order[2], &[], BuildMode::SingleLevel).unwrap();
        assert_eq!(children(&arena, order[2]), Vec::<u64>::new());
    }
}
