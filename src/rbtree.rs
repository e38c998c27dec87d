use std::{
    cmp::Ordering,
    mem,
    ops::{Index, IndexMut},
    sync::atomic::{AtomicU32, Ordering::Relaxed},
};

use log::{debug, trace};
use rand::Rng;

use crate::depth::Depth;
use crate::error::{Error, Result};
use crate::node::{Handle, Node, Side};

/// Tree manage a single instance of positional [red-black][rbtree] tree.
///
/// Nodes are not ordered by key. Applications decide the position of every
/// new node relative to an existing one, using [`Tree::attach_before`] and
/// [`Tree::attach_after`], and the tree keeps that in-order sequence while
/// rebalancing. Nodes live in an arena and deleted slots are pooled on a
/// free list for later [`Tree::new_node`] calls.
///
/// Every instance carries a process-wide unique id, stamped into the
/// handles it returns, and handles from another instance are rejected.
/// A clone keeps the id of its source, handles issued before the clone
/// refer to the same positions in both trees.
///
/// [rbtree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
#[derive(Clone)]
pub struct Tree<T> {
    id: u32,
    nodes: Vec<Node<T>>,
    root: Option<usize>,
    free: Option<usize>, // head of the free list.
    n_count: usize,      // number of attached nodes.
    n_free: usize,       // number of pooled nodes.
}

static TREE_ID: AtomicU32 = AtomicU32::new(1);

/// Different ways to construct a new Tree instance.
impl<T> Tree<T> {
    /// Create an empty instance of Tree.
    pub fn new() -> Tree<T> {
        Tree {
            id: TREE_ID.fetch_add(1, Relaxed),
            nodes: Default::default(),
            root: Default::default(),
            free: Default::default(),
            n_count: Default::default(),
            n_free: Default::default(),
        }
    }

    /// Create an empty instance of Tree, with arena space reserved for
    /// `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Tree<T> {
        Tree {
            nodes: Vec::with_capacity(capacity),
            ..Tree::new()
        }
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Tree<T> {
        Tree::new()
    }
}

/// Maintenance API.
impl<T> Tree<T> {
    /// Return the id stamped into handles issued by this instance.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Return number of nodes attached to this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this tree has no attached nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Return the root node, if tree is not empty.
    #[inline]
    pub fn root(&self) -> Option<Handle> {
        self.root.map(|root| self.handle(root))
    }

    /// Check whether `node` refers to a live node, attached or not.
    pub fn contains(&self, node: Handle) -> bool {
        self.lookup(node).is_ok()
    }

    /// Check whether `node` is live and attached to this tree.
    pub fn is_attached(&self, node: Handle) -> bool {
        match self.lookup(node) {
            Ok(index) => self.is_attached_at(index),
            Err(_) => false,
        }
    }

    /// Return quickly with basic statisics, only entries(), pooled(),
    /// allocated() and node_size() are valid with this statistics.
    pub fn stats(&self) -> Stats {
        Stats::new(
            self.n_count,
            self.n_free,
            self.nodes.len(),
            mem::size_of::<Node<T>>(),
        )
    }

    /// Validate red-black rules:
    ///
    /// * No red node has a red child.
    /// * Every path from a node to its leaves cross the same number of
    ///   black nodes.
    pub fn validate(&self) -> bool {
        self.check_red_black_property(self.root) && self.black_depth(self.root).is_some()
    }

    /// Audit the full tree, in addition to the rules checked by
    /// [`Tree::validate`], make sure that:
    ///
    /// * Root is black.
    /// * Parent and child links agree with each other.
    /// * Number of attached nodes match [`Tree::len`].
    /// * Pooled nodes form a clean free list.
    ///
    /// Additionally return full statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn audit(&self) -> Result<Stats> {
        self.do_audit().map_err(|err| {
            debug!("audit failed: {}", err);
            err
        })
    }
}

/// Node lifecycle.
impl<T> Tree<T> {
    /// Return a fresh node holding `data`. Node is reused from the free
    /// list when available, else allocated in the arena. Returned node is
    /// not yet part of the tree, attach it with [`Tree::attach_before`]
    /// or [`Tree::attach_after`].
    pub fn new_node(&mut self, data: T) -> Handle {
        match self.free {
            Some(index) => {
                let node = &mut self.nodes[index];
                self.free = node.next_free;
                self.n_free -= 1;
                node.reset(data);
                trace!("recycled node {}@{}", index, node.generation);
                Handle::new(self.id, index, node.generation)
            }
            None => {
                let index = self.nodes.len();
                self.nodes.push(Node::new(data));
                trace!("allocated node {}", index);
                Handle::new(self.id, index, 0)
            }
        }
    }

    /// Delete `node` from this tree and return its data. An attached node
    /// is detached first, rebalancing the tree. Node's slot is pooled and
    /// `node`, like any other copy of this handle, goes stale.
    pub fn delete_node(&mut self, node: Handle) -> T {
        let index = self.resolve(node);
        if self.is_attached_at(index) {
            self.detach(index);
            self.n_count -= 1;
        }
        trace!("deleted node {:?}", node);
        match self.push_free(index) {
            Some(data) => data,
            None => panic!("delete_node(): pooled slot {}, call the programmer", index),
        }
    }

    /// Detach every node from this tree and pool them, dropping their
    /// data. Fresh nodes, not yet attached, are left as is.
    pub fn clear(&mut self) {
        debug!("clearing {} attached nodes", self.n_count);
        let mut stack: Vec<usize> = self.root.take().into_iter().collect();
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            stack.extend(node.left);
            stack.extend(node.right);
            self.push_free(index);
        }
        self.n_count = 0;
    }

    fn push_free(&mut self, index: usize) -> Option<T> {
        let data = self.nodes[index].release(self.free);
        self.free = Some(index);
        self.n_free += 1;
        data
    }
}

/// Write operations on Tree instance.
impl<T> Tree<T> {
    /// Attach `child` immediately before `parent` in the in-order sequence.
    /// If `parent` is None, `child` is attached at the very end. If tree is
    /// empty `child` becomes the root.
    ///
    /// Panics if `child` is already attached, or if `parent` is not
    /// attached to this tree.
    pub fn attach_before(&mut self, parent: Option<Handle>, child: Handle) {
        let child = self.resolve_fresh(child);
        let root = match self.root {
            Some(root) => root,
            None => return self.attach_root(child),
        };
        match parent.map(|parent| self.resolve_attached(parent)) {
            None => {
                let at = self.back_at(root);
                self.attach_right(at, child)
            }
            Some(parent) => match self.nodes[parent].left {
                Some(left) => {
                    let at = self.back_at(left);
                    self.attach_right(at, child)
                }
                None => self.attach_left(parent, child),
            },
        }
    }

    /// Attach `child` immediately after `parent` in the in-order sequence.
    /// If `parent` is None, `child` is attached at the very beginning. If
    /// tree is empty `child` becomes the root.
    ///
    /// Panics if `child` is already attached, or if `parent` is not
    /// attached to this tree.
    pub fn attach_after(&mut self, parent: Option<Handle>, child: Handle) {
        let child = self.resolve_fresh(child);
        let root = match self.root {
            Some(root) => root,
            None => return self.attach_root(child),
        };
        match parent.map(|parent| self.resolve_attached(parent)) {
            None => {
                let at = self.front_at(root);
                self.attach_left(at, child)
            }
            Some(parent) => match self.nodes[parent].right {
                Some(right) => {
                    let at = self.front_at(right);
                    self.attach_left(at, child)
                }
                None => self.attach_right(parent, child),
            },
        }
    }

    fn attach_root(&mut self, child: usize) {
        self.root = Some(child);
        self.nodes[child].red = true;
        self.n_count += 1;
        self.update(child);
    }

    fn attach_left(&mut self, parent: usize, child: usize) {
        self.attach(parent, Side::Left, child)
    }

    fn attach_right(&mut self, parent: usize, child: usize) {
        self.attach(parent, Side::Right, child)
    }

    fn attach(&mut self, parent: usize, side: Side, child: usize) {
        debug_assert!(self.nodes[parent].child(side).is_none());
        self.nodes[parent].set_child(side, Some(child));
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.red = true;
        self.n_count += 1;
        self.update(child);
    }
}

/// Read operations on Tree instance.
impl<T> Tree<T> {
    /// Get the data for node, None if `node` is stale.
    pub fn get(&self, node: Handle) -> Option<&T> {
        let index = self.lookup(node).ok()?;
        self.nodes[index].data.as_ref()
    }

    /// Get mutable data for node, None if `node` is stale.
    pub fn get_mut(&mut self, node: Handle) -> Option<&mut T> {
        let index = self.lookup(node).ok()?;
        self.nodes[index].data.as_mut()
    }

    /// Return the first node in in-order sequence.
    pub fn front(&self) -> Option<Handle> {
        self.root.map(|root| self.handle(self.front_at(root)))
    }

    /// Return the last node in in-order sequence.
    pub fn back(&self) -> Option<Handle> {
        self.root.map(|root| self.handle(self.back_at(root)))
    }

    /// Return the left-most node in the sub-tree under `node`.
    pub fn front_of(&self, node: Handle) -> Handle {
        self.handle(self.front_at(self.resolve(node)))
    }

    /// Return the right-most node in the sub-tree under `node`.
    pub fn back_of(&self, node: Handle) -> Handle {
        self.handle(self.back_at(self.resolve(node)))
    }

    /// Return the in-order successor of `node`.
    pub fn next(&self, node: Handle) -> Option<Handle> {
        self.next_at(self.resolve(node))
            .map(|index| self.handle(index))
    }

    /// Return the in-order predecessor of `node`.
    pub fn previous(&self, node: Handle) -> Option<Handle> {
        self.previous_at(self.resolve(node))
            .map(|index| self.handle(index))
    }

    /// Compare the in-order position of two attached nodes. Position is
    /// derived from the ancestor path of each node, no per-node rank is
    /// maintained. A handle issued by another tree fails with
    /// [`Error::DisjointNodes`].
    pub fn order(&self, left: Handle, right: Handle) -> Result<Ordering> {
        let (a, b) = (self.lookup(left)?, self.lookup(right)?);
        if !self.is_attached_at(a) || !self.is_attached_at(b) {
            return Err(Error::NotAttached);
        } else if a == b {
            return Ok(Ordering::Equal);
        }

        let (apath, bpath) = (self.ancestors(a), self.ancestors(b));
        debug_assert_eq!(apath.last(), bpath.last());
        // strip the common tail, leaving (i, j) at the shared ancestor.
        let (mut i, mut j) = (apath.len() - 1, bpath.len() - 1);
        while i > 0 && j > 0 && apath[i - 1] == bpath[j - 1] {
            i -= 1;
            j -= 1;
        }
        let shared = &self.nodes[apath[i]];
        let ord = if i == 0 {
            // left is an ancestor of right.
            if shared.left == Some(bpath[j - 1]) {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        } else if shared.left == Some(apath[i - 1]) {
            Ordering::Less
        } else {
            Ordering::Greater
        };
        Ok(ord)
    }

    /// Return a random node from this tree.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<Handle> {
        let mut index = self.root?;

        let mut at_depth = rng.gen::<u8>() % 40;
        loop {
            let next = match rng.gen::<u8>() % 2 {
                0 => self.nodes[index].left,
                _ => self.nodes[index].right,
            };
            match next {
                Some(next) if at_depth > 0 => {
                    at_depth -= 1;
                    index = next;
                }
                _ => break Some(self.handle(index)),
            }
        }
    }

    /// Return an iterator over all attached nodes, in in-order sequence.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            tree: self,
            front: self.root.map(|root| self.front_at(root)),
            back: self.root.map(|root| self.back_at(root)),
            remaining: self.n_count,
        }
    }
}

impl<T> Index<Handle> for Tree<T> {
    type Output = T;

    fn index(&self, node: Handle) -> &T {
        self.data(self.resolve(node))
    }
}

impl<T> IndexMut<Handle> for Tree<T> {
    fn index_mut(&mut self, node: Handle) -> &mut T {
        let index = self.resolve(node);
        match self.nodes[index].data.as_mut() {
            Some(data) => data,
            None => panic!("index_mut(): pooled slot {}, call the programmer", index),
        }
    }
}

impl<'a, T> IntoIterator for &'a Tree<T> {
    type Item = (Handle, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

// handle resolution and raw navigation.
impl<T> Tree<T> {
    fn lookup(&self, node: Handle) -> Result<usize> {
        if node.tree() != self.id {
            return Err(Error::DisjointNodes);
        }
        match self.nodes.get(node.index()) {
            Some(n) if n.generation == node.generation() && !n.is_pooled() => Ok(node.index()),
            _ => Err(Error::StaleHandle),
        }
    }

    fn resolve(&self, node: Handle) -> usize {
        match self.lookup(node) {
            Ok(index) => index,
            Err(err) => panic!("{:?}: {}", node, err),
        }
    }

    fn resolve_attached(&self, node: Handle) -> usize {
        let index = self.resolve(node);
        if !self.is_attached_at(index) {
            panic!("{:?}: {}", node, Error::NotAttached);
        }
        index
    }

    fn resolve_fresh(&self, node: Handle) -> usize {
        let index = self.resolve(node);
        if self.is_attached_at(index) {
            panic!("attach(): {:?} is already attached", node);
        }
        index
    }

    #[inline]
    fn handle(&self, index: usize) -> Handle {
        Handle::new(self.id, index, self.nodes[index].generation)
    }

    #[inline]
    fn data(&self, index: usize) -> &T {
        match self.nodes[index].data.as_ref() {
            Some(data) => data,
            None => panic!("data(): pooled slot {}, call the programmer", index),
        }
    }

    #[inline]
    fn is_attached_at(&self, index: usize) -> bool {
        self.nodes[index].parent.is_some() || self.root == Some(index)
    }

    #[inline]
    fn is_red(&self, index: Option<usize>) -> bool {
        index.map_or(false, |index| self.nodes[index].red)
    }

    #[inline]
    fn side_of(&self, index: usize, parent: usize) -> Side {
        if self.nodes[parent].left == Some(index) {
            Side::Left
        } else {
            Side::Right
        }
    }

    fn front_at(&self, mut index: usize) -> usize {
        while let Some(left) = self.nodes[index].left {
            index = left;
        }
        index
    }

    fn back_at(&self, mut index: usize) -> usize {
        while let Some(right) = self.nodes[index].right {
            index = right;
        }
        index
    }

    fn next_at(&self, index: usize) -> Option<usize> {
        if let Some(right) = self.nodes[index].right {
            return Some(self.front_at(right));
        }
        let mut node = index;
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[parent].left == Some(node) {
                return Some(parent);
            }
            node = parent;
        }
        None
    }

    fn previous_at(&self, index: usize) -> Option<usize> {
        if let Some(left) = self.nodes[index].left {
            return Some(self.back_at(left));
        }
        let mut node = index;
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[parent].right == Some(node) {
                return Some(parent);
            }
            node = parent;
        }
        None
    }

    // path from node up to the root, both inclusive.
    fn ancestors(&self, mut index: usize) -> Vec<usize> {
        let mut path = vec![index];
        while let Some(parent) = self.nodes[index].parent {
            path.push(parent);
            index = parent;
        }
        path
    }
}

// balancing engine.
impl<T> Tree<T> {
    // Fix red-red violation caused by attaching red `node`, walking up
    // towards the root.
    fn update(&mut self, mut node: usize) {
        loop {
            let parent = match self.nodes[node].parent {
                None => {
                    self.nodes[node].red = false;
                    return;
                }
                Some(parent) if self.nodes[parent].is_black() => return,
                Some(parent) => parent,
            };
            let grand = match self.nodes[parent].parent {
                Some(grand) => grand,
                None => panic!("update(): red root, call the programmer"),
            };
            let side = self.side_of(parent, grand);
            match self.nodes[grand].child(side.opposite()) {
                Some(uncle) if self.nodes[uncle].red => {
                    self.nodes[parent].red = false;
                    self.nodes[uncle].red = false;
                    self.nodes[grand].red = true;
                    node = grand;
                }
                _ => {
                    let mut parent = parent;
                    if self.nodes[parent].child(side.opposite()) == Some(node) {
                        // inner grandchild, turn it into the outer case.
                        self.rotate(parent, side);
                        parent = node;
                    }
                    self.rotate(grand, side.opposite());
                    self.nodes[parent].red = false;
                    self.nodes[grand].red = true;
                    return;
                }
            }
        }
    }

    // Unlink `node` from the tree, restoring red-black rules.
    fn detach(&mut self, node: usize) {
        if let Some(right) = self.nodes[node].right {
            let successor = self.front_at(right);
            self.swap_nodes(node, successor);
        }

        let child = self.nodes[node].left.or(self.nodes[node].right);
        if self.nodes[node].is_black() {
            match child {
                Some(child) if self.nodes[child].red => self.nodes[child].red = false,
                _ => self.rebalance(node),
            }
        }

        let parent = self.nodes[node].parent;
        if let Some(child) = child {
            self.nodes[child].parent = parent;
        }
        self.replace_child(parent, node, child);

        let n = &mut self.nodes[node];
        n.parent = None;
        n.left = None;
        n.right = None;
    }

    // `node` is black, has no children and is about to be unlinked.
    // Push the missing black up the tree until it can be absorbed.
    fn rebalance(&mut self, mut node: usize) {
        loop {
            let parent = match self.nodes[node].parent {
                Some(parent) => parent,
                None => return,
            };
            let side = self.side_of(node, parent);

            let mut sibling = self.sibling_at(parent, side);
            if self.nodes[sibling].red {
                self.nodes[sibling].red = false;
                self.nodes[parent].red = true;
                self.rotate(parent, side);
                sibling = self.sibling_at(parent, side);
            }

            let near = self.nodes[sibling].child(side);
            let far = self.nodes[sibling].child(side.opposite());
            if !self.is_red(near) && !self.is_red(far) {
                self.nodes[sibling].red = true;
                if self.nodes[parent].red {
                    self.nodes[parent].red = false;
                    return;
                }
                node = parent;
                continue;
            }

            if !self.is_red(far) {
                if let Some(near) = near {
                    self.nodes[near].red = false;
                }
                self.nodes[sibling].red = true;
                self.rotate(sibling, side.opposite());
                sibling = self.sibling_at(parent, side);
            }

            let red = self.nodes[parent].red;
            self.nodes[sibling].red = red;
            self.nodes[parent].red = false;
            if let Some(far) = self.nodes[sibling].child(side.opposite()) {
                self.nodes[far].red = false;
            }
            self.rotate(parent, side);
            return;
        }
    }

    fn sibling_at(&self, parent: usize, side: Side) -> usize {
        match self.nodes[parent].child(side.opposite()) {
            Some(sibling) => sibling,
            None => panic!("rebalance(): black node without sibling, call the programmer"),
        }
    }

    // Exchange tree position, and color, of `node` with its in-order
    // successor. Data stays with the slot, so handles keep referring to
    // the same data.
    fn swap_nodes(&mut self, node: usize, successor: usize) {
        let (aparent, aleft, aright, ared) = {
            let n = &self.nodes[node];
            (n.parent, n.left, n.right, n.red)
        };
        let (bparent, bleft, bright, bred) = {
            let n = &self.nodes[successor];
            (n.parent, n.left, n.right, n.red)
        };
        debug_assert!(bleft.is_none());

        self.nodes[node].red = bred;
        self.nodes[successor].red = ared;

        self.replace_child(aparent, node, Some(successor));
        self.nodes[successor].parent = aparent;
        self.set_child_at(successor, Side::Left, aleft);

        if aright == Some(successor) {
            self.set_child_at(successor, Side::Right, Some(node));
        } else {
            // bparent is below node, its left link still points to successor.
            self.replace_child(bparent, successor, Some(node));
            self.nodes[node].parent = bparent;
            self.set_child_at(successor, Side::Right, aright);
        }
        self.set_child_at(node, Side::Left, bleft);
        self.set_child_at(node, Side::Right, bright);
    }

    // link `child` under `parent` on `side`, updating the back-reference.
    fn set_child_at(&mut self, parent: usize, side: Side, child: Option<usize>) {
        self.nodes[parent].set_child(side, child);
        if let Some(child) = child {
            self.nodes[child].parent = Some(parent);
        }
    }

    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: Option<usize>) {
        match parent {
            None => {
                debug_assert_eq!(self.root, Some(old));
                self.root = new;
            }
            Some(parent) => {
                let pnode = &mut self.nodes[parent];
                if pnode.left == Some(old) {
                    pnode.left = new;
                } else {
                    debug_assert_eq!(pnode.right, Some(old));
                    pnode.right = new;
                }
            }
        }
    }

    // rotate `node` down towards `side`.
    #[inline]
    fn rotate(&mut self, node: usize, side: Side) {
        match side {
            Side::Left => self.rotate_left(node),
            Side::Right => self.rotate_right(node),
        }
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //          left       x             node      xr
    //                    / \            /  \
    //                  xl   xr       left   xl
    //
    fn rotate_left(&mut self, node: usize) {
        let x = match self.nodes[node].right {
            Some(x) => x,
            None => panic!("rotate_left(): no right child ? Call the programmer"),
        };
        let xl = self.nodes[x].left;
        self.set_child_at(node, Side::Right, xl);

        let parent = self.nodes[node].parent;
        self.replace_child(parent, node, Some(x));
        self.nodes[x].parent = parent;
        self.set_child_at(x, Side::Left, Some(node));
    }

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //          x       right             xl      node
    //         / \                                / \
    //       xl   xr                             xr  right
    //
    fn rotate_right(&mut self, node: usize) {
        let x = match self.nodes[node].left {
            Some(x) => x,
            None => panic!("rotate_right(): no left child ? Call the programmer"),
        };
        let xr = self.nodes[x].right;
        self.set_child_at(node, Side::Left, xr);

        let parent = self.nodes[node].parent;
        self.replace_child(parent, node, Some(x));
        self.nodes[x].parent = parent;
        self.set_child_at(x, Side::Right, Some(node));
    }
}

// validation.
impl<T> Tree<T> {
    fn check_red_black_property(&self, node: Option<usize>) -> bool {
        match node {
            None => true,
            Some(index) => {
                let node = &self.nodes[index];
                if node.red && (self.is_red(node.left) || self.is_red(node.right)) {
                    return false;
                }
                self.check_red_black_property(node.left)
                    && self.check_red_black_property(node.right)
            }
        }
    }

    // None if left and right sub-tree disagree, anywhere below `node`.
    fn black_depth(&self, node: Option<usize>) -> Option<usize> {
        match node {
            None => Some(0),
            Some(index) => {
                let node = &self.nodes[index];
                let lblacks = self.black_depth(node.left)?;
                let rblacks = self.black_depth(node.right)?;
                if lblacks != rblacks {
                    return None;
                }
                Some(lblacks + usize::from(node.is_black()))
            }
        }
    }

    fn do_audit(&self) -> Result<Stats> {
        let mut stats = self.stats();
        stats.set_depths(Depth::new());

        if self.is_red(self.root) {
            return Err(Error::RedRoot);
        }
        if let Some(root) = self.root {
            if let Some(parent) = self.nodes[root].parent {
                let err = format!("root {} has parent {}", root, parent);
                return Err(Error::BrokenLink(err));
            }
        }

        let mut count = 0;
        let blacks = self.audit_tree(self.root, false, 0, 0, &mut stats, &mut count)?;
        if count != self.n_count {
            let err = format!("reached {} nodes, expected {}", count, self.n_count);
            return Err(Error::BrokenLink(err));
        }
        self.audit_free_list()?;

        stats.set_blacks(blacks);
        Ok(stats)
    }

    fn audit_tree(
        &self,
        node: Option<usize>,
        fromred: bool,
        mut nb: usize,
        depth: usize,
        stats: &mut Stats,
        count: &mut usize,
    ) -> Result<usize> {
        let index = match node {
            None => {
                stats.sample_depth(depth);
                return Ok(nb);
            }
            Some(index) => index,
        };
        *count += 1;
        if *count > self.nodes.len() {
            return Err(Error::BrokenLink("cycle in tree".to_string()));
        }

        let node = &self.nodes[index];
        if node.is_pooled() {
            let err = format!("pooled node {} is reachable", index);
            return Err(Error::BrokenLink(err));
        }
        if fromred && node.red {
            return Err(Error::ConsecutiveReds);
        }
        if node.is_black() {
            nb += 1;
        }
        for child in node.left.iter().chain(node.right.iter()) {
            let parent = self.nodes[*child].parent;
            if parent != Some(index) {
                let err = format!("child {} of {} points to {:?}", child, index, parent);
                return Err(Error::BrokenLink(err));
            }
        }

        let (left, right, red) = (node.left, node.right, node.red);
        let lblacks = self.audit_tree(left, red, nb, depth + 1, stats, count)?;
        let rblacks = self.audit_tree(right, red, nb, depth + 1, stats, count)?;
        if lblacks != rblacks {
            let err = format!("node {} left: {} right: {}", index, lblacks, rblacks);
            return Err(Error::UnbalancedBlacks(err));
        }
        Ok(lblacks)
    }

    fn audit_free_list(&self) -> Result<()> {
        let (mut cursor, mut seen) = (self.free, 0);
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            let linked = node.parent.is_some() || node.left.is_some() || node.right.is_some();
            if !node.is_pooled() || linked {
                let err = format!("slot {} is linked or holds data", index);
                return Err(Error::FreeList(err));
            }
            seen += 1;
            if seen > self.nodes.len() {
                return Err(Error::FreeList("cycle in free list".to_string()));
            }
            cursor = node.next_free;
        }
        if seen != self.n_free {
            let err = format!("chained {} slots, expected {}", seen, self.n_free);
            return Err(Error::FreeList(err));
        }
        Ok(())
    }
}

/// Iter walks the attached nodes of a [`Tree`] in in-order sequence,
/// from both ends.
pub struct Iter<'a, T> {
    tree: &'a Tree<T>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.front?;
        self.front = self.tree.next_at(index);
        self.remaining -= 1;
        Some((self.tree.handle(index), self.tree.data(index)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.back?;
        self.back = self.tree.previous_at(index);
        self.remaining -= 1;
        Some((self.tree.handle(index), self.tree.data(index)))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

/// Statistics on [`Tree`]. Serves two purpose:
///
/// * To get partial but quick statistics via [`Tree::stats`] method.
/// * To get full statisics via [`Tree::audit`] method.
#[derive(Default, Debug, Clone)]
pub struct Stats {
    entries: usize, // number of attached nodes.
    pooled: usize,
    allocated: usize,
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, pooled: usize, allocated: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            pooled,
            allocated,
            node_size,
            blacks: Default::default(),
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    #[inline]
    fn sample_depth(&mut self, depth: usize) {
        if let Some(depths) = self.depths.as_mut() {
            depths.sample(depth)
        }
    }

    /// Return number of nodes attached to [`Tree`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return number of nodes pooled on the free list.
    #[inline]
    pub fn pooled(&self) -> usize {
        self.pooled
    }

    /// Return number of slots ever allocated in the arena. Pooled
    /// nodes are reused before the arena grows, so this stays flat
    /// under balanced insert/delete workloads.
    #[inline]
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Return node-size, including over-head for `Tree<T>`. Although
    /// the node overhead is constant, the node size varies based on
    /// data type.
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return number of black nodes from root to leaf.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics.
    pub fn depths(&self) -> Option<Depth> {
        self.depths
            .as_ref()
            .filter(|depths| depths.samples() > 0)
            .cloned()
    }
}
