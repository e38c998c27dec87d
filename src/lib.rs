//! Positional red-black tree over an index arena.
//!
//! Applications place every node relative to an existing node, the tree
//! keeps that in-order sequence balanced and recycles deleted nodes.
//!
//! ```
//! use rbtree_index::Tree;
//!
//! let mut tree: Tree<&str> = Tree::new();
//! let b = tree.new_node("b");
//! tree.attach_after(None, b);
//! let a = tree.new_node("a");
//! tree.attach_before(Some(b), a);
//! let c = tree.new_node("c");
//! tree.attach_after(Some(b), c);
//!
//! let items: Vec<&str> = tree.iter().map(|(_, s)| *s).collect();
//! assert_eq!(items, vec!["a", "b", "c"]);
//! assert!(tree.validate());
//! ```

mod depth;
mod error;
mod node;
mod rbtree;

pub use crate::depth::Depth;
pub use crate::error::{Error, Result};
pub use crate::node::Handle;
pub use crate::rbtree::{Iter, Stats, Tree};

#[cfg(test)]
mod depth_test;
