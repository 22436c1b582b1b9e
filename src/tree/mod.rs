//! This module contains the state tree built during symbolic execution, and
//! the zipper cursor used to navigate it.

pub mod zipper;

use serde::Serialize;

use crate::error::tree::Error;

pub use zipper::{Move, Zipper};

/// The identifier of a node in a [`StateTree`].
///
/// Identifiers are indices into the tree's arena, handed out from a single
/// monotone counter as the tree grows, so they double as a record of
/// allocation order.
pub type NodeId = usize;

/// The shape of a single tree node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Node {
    /// A node with no children: the frontier of execution.
    Leaf,

    /// A node that advanced without branching.
    Trunk { child: NodeId },

    /// A node at which execution split two ways.
    Branch { left: NodeId, right: NodeId },
}

/// The record of one node in the arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
struct Entry {
    /// The node's parent, absent for the root.
    parent: Option<NodeId>,

    /// The node's shape.
    node: Node,
}

/// The tree of execution states.
///
/// The tree grows only at leaves: a leaf either becomes a [`Node::Trunk`]
/// with one fresh leaf child, or a [`Node::Branch`] with two. Nodes are
/// stored in an arena indexed by [`NodeId`]; nothing is ever removed, so
/// identifiers stay stable for the lifetime of the tree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StateTree {
    /// The node arena; the index of an entry is its identifier.
    entries: Vec<Entry>,
}

impl StateTree {
    /// Constructs a tree consisting of a single root leaf with identifier
    /// zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                parent: None,
                node: Node::Leaf,
            }],
        }
    }

    /// Gets the root's identifier.
    #[must_use]
    pub fn root(&self) -> NodeId {
        0
    }

    /// Gets the number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the tree is empty. It never is: the root is created
    /// with the tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Gets the shape of the node identified by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no such node exists.
    pub fn node(&self, id: NodeId) -> Result<Node, Error> {
        self.entries
            .get(id)
            .map(|entry| entry.node)
            .ok_or(Error::NoSuchNode { id })
    }

    /// Gets the parent of the node identified by `id`, or [`None`] for the
    /// root.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if no such node exists.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, Error> {
        self.entries
            .get(id)
            .map(|entry| entry.parent)
            .ok_or(Error::NoSuchNode { id })
    }

    /// Grows the tree at the leaf identified by `id`, converting it into a
    /// trunk with one fresh leaf child, and returns the child's identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `id` does not exist or is not a leaf.
    pub fn extend_one(&mut self, id: NodeId) -> Result<NodeId, Error> {
        self.guard_leaf(id)?;
        let child = self.allocate(id);
        self.entries[id].node = Node::Trunk { child };
        Ok(child)
    }

    /// Grows the tree at the leaf identified by `id`, converting it into a
    /// branch with two fresh leaf children, and returns the children's
    /// identifiers in left-right order.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `id` does not exist or is not a leaf.
    pub fn extend_two(&mut self, id: NodeId) -> Result<(NodeId, NodeId), Error> {
        self.guard_leaf(id)?;
        let left = self.allocate(id);
        let right = self.allocate(id);
        self.entries[id].node = Node::Branch { left, right };
        Ok((left, right))
    }

    /// Gets the identifiers of every node in pre-order.
    #[must_use]
    pub fn keys(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.len());
        self.walk(self.root(), &mut |id, _| ids.push(id));
        ids
    }

    /// Gets the identifiers of the leaves in pre-order.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.walk(self.root(), &mut |id, node| {
            if matches!(node, Node::Leaf) {
                ids.push(id);
            }
        });
        ids
    }

    /// Constructs a zipper focused on the node identified by `id`, or
    /// [`None`] if no such node exists.
    #[must_use]
    pub fn find_loc(&self, id: NodeId) -> Option<Zipper<'_>> {
        Zipper::focused_on(self, id)
    }

    /// Applies `visit` to every node reachable from `id`, parents before
    /// children and left before right.
    fn walk(&self, id: NodeId, visit: &mut impl FnMut(NodeId, Node)) {
        let node = self.entries[id].node;
        visit(id, node);
        match node {
            Node::Leaf => {}
            Node::Trunk { child } => self.walk(child, visit),
            Node::Branch { left, right } => {
                self.walk(left, visit);
                self.walk(right, visit);
            }
        }
    }

    /// Appends a fresh leaf entry parented at `parent`.
    fn allocate(&mut self, parent: NodeId) -> NodeId {
        let id = self.entries.len();
        self.entries.push(Entry {
            parent: Some(parent),
            node: Node::Leaf,
        });
        id
    }

    /// Checks that `id` names an existing leaf.
    fn guard_leaf(&self, id: NodeId) -> Result<(), Error> {
        match self.node(id)? {
            Node::Leaf => Ok(()),
            _ => Err(Error::NotALeaf { id }),
        }
    }
}

impl Default for StateTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use crate::{error::tree::Error, tree::StateTree};

    #[test]
    fn grows_trunks_and_branches_at_leaves() -> anyhow::Result<()> {
        let mut tree = StateTree::new();

        let first = tree.extend_one(tree.root())?;
        assert_eq!(first, 1);

        let (left, right) = tree.extend_two(first)?;
        assert_eq!((left, right), (2, 3));

        // Identifiers continue from the counter, not from the position.
        let deeper = tree.extend_one(left)?;
        assert_eq!(deeper, 4);

        Ok(())
    }

    #[test]
    fn refuses_to_grow_interior_nodes() -> anyhow::Result<()> {
        let mut tree = StateTree::new();
        tree.extend_one(0)?;

        assert_eq!(tree.extend_one(0), Err(Error::NotALeaf { id: 0 }));
        assert_eq!(tree.extend_two(0), Err(Error::NotALeaf { id: 0 }));
        assert_eq!(tree.extend_one(99), Err(Error::NoSuchNode { id: 99 }));

        Ok(())
    }

    #[test]
    fn keys_enumerate_in_pre_order() -> anyhow::Result<()> {
        let mut tree = StateTree::new();
        let trunk_child = tree.extend_one(0)?;
        let (left, right) = tree.extend_two(trunk_child)?;
        let left_child = tree.extend_one(left)?;

        // Pre-order: root, trunk child, left subtree fully, then right.
        assert_eq!(tree.keys(), vec![0, trunk_child, left, left_child, right]);
        assert_eq!(tree.leaves(), vec![left_child, right]);

        Ok(())
    }

    #[test]
    fn node_identifiers_are_unique() -> anyhow::Result<()> {
        let mut tree = StateTree::new();
        let first = tree.extend_one(0)?;
        let (left, right) = tree.extend_two(first)?;
        tree.extend_two(right)?;
        tree.extend_one(left)?;

        let mut keys = tree.keys();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), tree.len());

        Ok(())
    }
}
