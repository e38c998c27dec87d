use std::fmt;

/// Handle identify a single node in a [`Tree`] instance.
///
/// Handles are cheap to copy and stay valid as long as the node is not
/// deleted. Once deleted, the slot is recycled under a new generation and
/// the old handle is rejected by every API. Handles also carry the id of
/// the issuing tree, a handle passed to another tree is rejected too.
///
/// [`Tree`]: crate::Tree
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    tree: u32,
    index: usize,
    generation: u32,
}

impl Handle {
    #[inline]
    pub(crate) fn new(tree: u32, index: usize, generation: u32) -> Handle {
        Handle {
            tree,
            index,
            generation,
        }
    }

    /// Return the id of the tree that issued this handle.
    #[inline]
    pub fn tree(&self) -> u32 {
        self.tree
    }

    /// Return the arena slot for this handle.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the generation of the slot when this handle was created.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}:{}@{})", self.tree, self.index, self.generation)
    }
}

/// Side of a child link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Node is a single slot in the tree's arena. A slot with no `data` is
/// pooled, chained to the next pooled slot through `next_free`.
#[derive(Clone)]
pub(crate) struct Node<T> {
    pub(crate) data: Option<T>,
    pub(crate) red: bool,
    pub(crate) parent: Option<usize>, // navigation only, not owning
    pub(crate) left: Option<usize>,
    pub(crate) right: Option<usize>,
    pub(crate) generation: u32,
    pub(crate) next_free: Option<usize>,
}

impl<T> Node<T> {
    // CREATE operation
    pub(crate) fn new(data: T) -> Node<T> {
        Node {
            data: Some(data),
            red: true,
            parent: None,
            left: None,
            right: None,
            generation: 0,
            next_free: None,
        }
    }

    // reuse a pooled slot for `data`, links are reset.
    pub(crate) fn reset(&mut self, data: T) {
        self.data = Some(data);
        self.red = true;
        self.parent = None;
        self.left = None;
        self.right = None;
        self.next_free = None;
    }

    // drop links and payload, bump the generation so that outstanding
    // handles go stale.
    pub(crate) fn release(&mut self, next_free: Option<usize>) -> Option<T> {
        self.red = true;
        self.parent = None;
        self.left = None;
        self.right = None;
        self.generation = self.generation.wrapping_add(1);
        self.next_free = next_free;
        self.data.take()
    }

    #[inline]
    pub(crate) fn is_pooled(&self) -> bool {
        self.data.is_none()
    }

    #[inline]
    pub(crate) fn child(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn set_child(&mut self, side: Side, child: Option<usize>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }

    #[inline]
    pub(crate) fn is_black(&self) -> bool {
        !self.red
    }
}
