//! This module contains the zipper cursor over the state tree.

use crate::tree::{Node, NodeId, StateTree};

/// A movement instruction for a zipper script.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Move {
    /// Move to the parent.
    Up,

    /// Move to the child of a trunk, or to the left child of a branch.
    Down,

    /// Move from the right child of a branch to its sibling.
    Left,

    /// Move from the left child of a branch to its sibling.
    Right,

    /// Move all the way to the root.
    Top,
}

/// One step of the path from the root down to the focus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Crumb {
    /// The focus is the only child of `parent`.
    Child { parent: NodeId },

    /// The focus is the left child of `parent`; `sibling` is the right.
    OnLeft { parent: NodeId, sibling: NodeId },

    /// The focus is the right child of `parent`; `sibling` is the left.
    OnRight { parent: NodeId, sibling: NodeId },
}

/// A cursor into a [`StateTree`] supporting O(1) local movement.
///
/// The cursor carries the focused node and the breadcrumb path back to the
/// root, so its footprint is proportional to the focus depth. Movements that
/// would leave the tree are no-ops, which keeps movement scripts total.
#[derive(Clone, Debug)]
pub struct Zipper<'a> {
    /// The tree being navigated.
    tree: &'a StateTree,

    /// The focused node.
    focus: NodeId,

    /// The path from the root to the focus, root end first.
    path: Vec<Crumb>,
}

impl<'a> Zipper<'a> {
    /// Constructs a zipper focused on the root of `tree`.
    #[must_use]
    pub fn new(tree: &'a StateTree) -> Self {
        Self {
            tree,
            focus: tree.root(),
            path: Vec::new(),
        }
    }

    /// Constructs a zipper focused on the node identified by `id`, or
    /// [`None`] if no such node exists.
    ///
    /// The breadcrumb path is rebuilt by following parent links upwards, so
    /// construction costs the depth of the node.
    #[must_use]
    pub fn focused_on(tree: &'a StateTree, id: NodeId) -> Option<Self> {
        tree.node(id).ok()?;

        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = tree.parent(current).ok()? {
            let crumb = match tree.node(parent).ok()? {
                Node::Trunk { .. } => Crumb::Child { parent },
                Node::Branch { left, right } => {
                    if current == left {
                        Crumb::OnLeft {
                            parent,
                            sibling: right,
                        }
                    } else {
                        Crumb::OnRight {
                            parent,
                            sibling: left,
                        }
                    }
                }
                Node::Leaf => return None,
            };
            path.push(crumb);
            current = parent;
        }
        path.reverse();

        Some(Self {
            tree,
            focus: id,
            path,
        })
    }

    /// Gets the focused node's identifier.
    #[must_use]
    pub fn focus(&self) -> NodeId {
        self.focus
    }

    /// Moves to the parent. A no-op at the root.
    #[must_use]
    pub fn up(mut self) -> Self {
        if let Some(crumb) = self.path.pop() {
            self.focus = match crumb {
                Crumb::Child { parent }
                | Crumb::OnLeft { parent, .. }
                | Crumb::OnRight { parent, .. } => parent,
            };
        }
        self
    }

    /// Moves to a trunk's child or a branch's left child. A no-op at a leaf.
    #[must_use]
    pub fn down(mut self) -> Self {
        match self.tree.node(self.focus) {
            Ok(Node::Trunk { child }) => {
                self.path.push(Crumb::Child { parent: self.focus });
                self.focus = child;
            }
            Ok(Node::Branch { left, right }) => {
                self.path.push(Crumb::OnLeft {
                    parent: self.focus,
                    sibling: right,
                });
                self.focus = left;
            }
            _ => {}
        }
        self
    }

    /// Moves from a branch's right child to its left child. A no-op
    /// anywhere else.
    #[must_use]
    pub fn left(mut self) -> Self {
        if let Some(Crumb::OnRight { parent, sibling }) = self.path.last().copied() {
            self.path.pop();
            self.path.push(Crumb::OnLeft {
                parent,
                sibling: self.focus,
            });
            self.focus = sibling;
        }
        self
    }

    /// Moves from a branch's left child to its right child. A no-op
    /// anywhere else.
    #[must_use]
    pub fn right(mut self) -> Self {
        if let Some(Crumb::OnLeft { parent, sibling }) = self.path.last().copied() {
            self.path.pop();
            self.path.push(Crumb::OnRight {
                parent,
                sibling: self.focus,
            });
            self.focus = sibling;
        }
        self
    }

    /// Moves all the way back to the root.
    #[must_use]
    pub fn top(mut self) -> Self {
        while !self.path.is_empty() {
            self = self.up();
        }
        self
    }

    /// Applies a movement script in order.
    #[must_use]
    pub fn shift(self, script: &[Move]) -> Self {
        script.iter().fold(self, |zipper, movement| match movement {
            Move::Up => zipper.up(),
            Move::Down => zipper.down(),
            Move::Left => zipper.left(),
            Move::Right => zipper.right(),
            Move::Top => zipper.top(),
        })
    }

    /// Applies a movement script and reports the identifier in focus at its
    /// end.
    #[must_use]
    pub fn travel(self, script: &[Move]) -> (Self, NodeId) {
        let zipper = self.shift(script);
        let focus = zipper.focus();
        (zipper, focus)
    }
}
