use thiserror::Error;

/// Error enumerates over all possible errors that this package
/// shall return.
///
/// Navigation and mutation APIs treat a bad handle as a programming
/// error and panic with the message of the matching variant. Only
/// [`Tree::order`] and [`Tree::audit`] report failures as values.
///
/// [`Tree::order`]: crate::Tree::order
/// [`Tree::audit`]: crate::Tree::audit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Handle refers to a slot that was recycled, or was never
    /// handed out.
    #[error("stale handle, node was deleted")]
    StaleHandle,
    /// Node is live but not attached to the tree.
    #[error("node is not attached to the tree")]
    NotAttached,
    /// Handle was issued by another tree instance.
    #[error("handle belongs to another tree")]
    DisjointNodes,
    /// Fatal case, root of a non-empty tree must be black.
    #[error("root node is red")]
    RedRoot,
    /// Fatal case, a red node has a red child.
    #[error("consecutive red nodes")]
    ConsecutiveReds,
    /// Fatal case, black depth differs between left and right subtree.
    /// The String component can be used for debugging.
    #[error("unbalanced blacks, {0}")]
    UnbalancedBlacks(String),
    /// Fatal case, parent/child links disagree.
    #[error("broken link, {0}")]
    BrokenLink(String),
    /// Fatal case, pooled nodes are not shaped as a free chain.
    #[error("corrupt free list, {0}")]
    FreeList(String),
}

/// Result type used across this package.
pub type Result<T> = std::result::Result<T, Error>;
