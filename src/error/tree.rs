//! This module contains errors pertaining to the state tree.

use thiserror::Error;

use crate::tree::NodeId;

/// Errors that occur when growing or navigating the state tree.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("No node with id {id} exists in the tree")]
    NoSuchNode { id: NodeId },

    #[error("Node {id} is not a leaf and cannot be extended")]
    NotALeaf { id: NodeId },
}
