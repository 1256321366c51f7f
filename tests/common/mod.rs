#![allow(dead_code)]

use nested_sets::{Direction, MemoryStore, NestedStore, NodeArena, NodeIndex, Row, StoreError};

/// Tree identifier used by the fixtures
pub const TREE: u64 = 1;

/// root(1,10) with A(2,5) holding C(3,4), and B(6,9)
///
/// B's boundaries encode one descendant that is not present.
pub fn reference_rows() -> Vec<Row> {
    vec![
        Row::new(1, TREE, 1, 10, "root"),
        Row::new(2, TREE, 2, 5, "A"),
        Row::new(3, TREE, 3, 4, "C"),
        Row::new(4, TREE, 6, 9, "B"),
    ]
}

/// Well-formed catalog tree plus an unrelated single-node tree
///
/// ```text
/// root(1,14)
/// ├── books(2,7)
/// │   ├── novels(3,4)
/// │   └── poetry(5,6)
/// └── music(8,13)
///     └── jazz(9,12)
///         └── bebop(10,11)
/// ```
pub fn catalog_rows() -> Vec<Row> {
    vec![
        Row::new(10, TREE, 1, 14, "root"),
        Row::new(11, TREE, 2, 7, "books"),
        Row::new(12, TREE, 3, 4, "novels"),
        Row::new(13, TREE, 5, 6, "poetry"),
        Row::new(14, TREE, 8, 13, "music"),
        Row::new(15, TREE, 9, 12, "jazz"),
        Row::new(16, TREE, 10, 11, "bebop"),
        Row::new(90, 2, 1, 2, "elsewhere"),
    ]
}

/// Build a valid nested set from a parent-choice vector
///
/// Node `k` (k >= 1) hangs under node `parents[k - 1] % k`; node 0 is the
/// root. Row ids are `k + 1`, labels `n<k>`.
pub fn rows_from_shape(tree: u64, parents: &[usize]) -> Vec<Row> {
    let count = parents.len() + 1;
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (offset, &choice) in parents.iter().enumerate() {
        let node = offset + 1;
        children[choice % node].push(node);
    }

    let mut bounds = vec![(0i64, 0i64); count];
    let mut counter = 1i64;
    // (node, next child position); iterative to keep deep chains off the call stack
    let mut stack = vec![(0usize, 0usize)];
    bounds[0].0 = counter;
    while let Some((node, position)) = stack.pop() {
        if let Some(&child) = children[node].get(position) {
            stack.push((node, position + 1));
            counter += 1;
            bounds[child].0 = counter;
            stack.push((child, 0));
        } else {
            counter += 1;
            bounds[node].1 = counter;
        }
    }

    (0..count)
        .map(|k| Row::new(k as u64 + 1, tree, bounds[k].0, bounds[k].1, format!("n{k}")))
        .collect()
}

/// Slot of the row with identity `id`
pub fn index(arena: &NodeArena<Row>, id: u64) -> NodeIndex {
    arena
        .index_of(&id)
        .unwrap_or_else(|| panic!("row {id} is not in the arena"))
}

/// Labels of several nodes
pub fn labels(arena: &NodeArena<Row>, nodes: &[NodeIndex]) -> Vec<String> {
    nodes
        .iter()
        .map(|&node| arena.node(node).expect("known node").record().label.clone())
        .collect()
}

/// Resolved children labels of `node`
pub fn child_labels(arena: &NodeArena<Row>, node: NodeIndex) -> Vec<String> {
    let children = arena
        .node(node)
        .expect("known node")
        .links()
        .children()
        .resolved()
        .expect("children resolved");
    labels(arena, children)
}

/// Indented outline of the tree below `root`
pub fn outline(arena: &NodeArena<Row>, root: NodeIndex) -> String {
    let mut rendered = String::new();
    for (node, depth) in arena.pre_order(root) {
        let row = arena.node(node).expect("known node").record();
        rendered.push_str(&format!(
            "{:indent$}{} [{}, {}]\n",
            "",
            row.label,
            row.left,
            row.right,
            indent = depth * 2
        ));
    }
    rendered
}

/// Transaction hook that [`FailingHookStore`] breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Begin,
    Commit,
    Rollback,
}

/// [`MemoryStore`] whose chosen transaction hook raises a fault
///
/// Every other call is forwarded unchanged.
#[derive(Debug)]
pub struct FailingHookStore {
    pub inner: MemoryStore,
    pub failing: Hook,
}

impl FailingHookStore {
    pub fn new(rows: Vec<Row>, failing: Hook) -> Self {
        Self {
            inner: MemoryStore::new(rows),
            failing,
        }
    }

    fn hook(&self, hook: Hook, message: &'static str) -> Option<StoreError> {
        (self.failing == hook).then(|| StoreError::from(message))
    }
}

impl NestedStore for FailingHookStore {
    type Record = Row;

    fn query_ordered(&self, tree: &u64) -> Result<Vec<Row>, StoreError> {
        self.inner.query_ordered(tree)
    }

    fn query_children(&self, node: &u64) -> Result<Vec<Row>, StoreError> {
        self.inner.query_children(node)
    }

    fn query_ancestors(&self, node: &u64) -> Result<Vec<Row>, StoreError> {
        self.inner.query_ancestors(node)
    }

    fn query_sibling(&self, node: &u64, direction: Direction) -> Result<Option<Row>, StoreError> {
        self.inner.query_sibling(node, direction)
    }

    fn delete_row(&mut self, node: &u64) -> Result<bool, StoreError> {
        self.inner.delete_row(node)
    }

    fn delete_subtree_rows(&mut self, root: &u64) -> Result<bool, StoreError> {
        self.inner.delete_subtree_rows(root)
    }

    fn is_delete_transactional(&self) -> bool {
        self.inner.is_delete_transactional()
    }

    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        match self.hook(Hook::Begin, "connection lost at begin") {
            Some(fault) => Err(fault),
            None => self.inner.begin_transaction(),
        }
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        match self.hook(Hook::Commit, "deadlock detected at commit") {
            Some(fault) => Err(fault),
            None => self.inner.commit(),
        }
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        match self.hook(Hook::Rollback, "connection lost at rollback") {
            Some(fault) => Err(fault),
            None => self.inner.rollback(),
        }
    }
}
