//! An AA tree: an ordered set kept balanced by Arne Andersson's level rule.
//!
//! An AA tree is a red-black tree in which red links may only lean right. Instead of colors,
//! every node carries a _level_, and the tree is rebalanced with two local rotations:
//!
//! - _skew_ removes a left link between two nodes of equal level.
//! - _split_ removes two consecutive right links between nodes of equal level, promoting the
//!   middle node.
//!
//! ```
//! use aa_tree::{AaTree, TreeError};
//!
//! let mut tree = AaTree::new();
//! tree.add(3).unwrap();
//! tree.add(1).unwrap();
//!
//! assert_eq!(tree.contains(&1), Ok(true));
//! assert_eq!(tree.add(3), Err(TreeError::DuplicateValue));
//!
//! tree.remove(&1).unwrap();
//! assert_eq!(tree.contains(&1), Ok(false));
//! ```

// Conventions used in comments:
// - The level of a node `x` is denoted `lv(x)`; a missing node has level 0.
// - A right link from `x` to `r` is _horizontal_ if `lv(x) == lv(r)`.
// - A _level run_ is a maximal chain of nodes joined by horizontal links.
// - `r` is the _right grandchild_ of `g` if `g.right.right == r`.
//
// The invariants of an AA tree are:
// 1. Every leaf has level 1.
// 2. Every left child is exactly one level below its parent.
// 3. Every right child is at most one level below its parent.
// 4. Every right grandchild is strictly below its grandparent.
//
// Corollary:
// 5. Every node above level 1 has two children.
//
//    Proof: a missing child has level 0, so by (2) and (3) a node missing either child has
//    level 1.

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not,
    ptr::NonNull,
};

use cordyceps::Linked;
use tracing::debug;

mod debug;
mod error;
mod iter;
#[cfg(any(test, feature = "model"))]
pub mod model;
mod rebalance;


pub use error::TreeError;

use iter::Iter;

/// An ordered set of unique values stored in an AA tree.
///
/// Insertion, removal and lookup complete in _O(log(n))_ time.
pub struct AaTree<K: Ord> {
    root: Link<Node<K>>,
    len: usize,
}

#[repr(C)]
struct Node<K> {
    links: Links<Node<K>>,
    value: K,
}

pub(crate) struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    level: u8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<K> Node<K> {
    fn new(value: K) -> Box<Node<K>> {
        Box::new(Node {
            links: Links::new(),
            value,
        })
    }
}

unsafe impl<K> Linked<Links<Node<K>>> for Node<K> {
    type Handle = Box<Node<K>>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Node<K>>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

// SAFETY: the tree exclusively owns every node reachable from `root`, and node pointers never
// escape it.
unsafe impl<K: Ord + Send> Send for AaTree<K> {}

// SAFETY: shared references to the tree only read node links and values.
unsafe impl<K: Ord + Sync> Sync for AaTree<K> {}

impl<K: Ord> AaTree<K> {
    /// Returns a new empty tree.
    pub const fn new() -> AaTree<K> {
        AaTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no values.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of values in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of nodes on the longest path from the root to a leaf.
    pub fn height(&self) -> usize {
        fn height_at<K>(node: Link<Node<K>>) -> usize {
            node.map_or(0, |node| unsafe {
                let links = Node::links(node).as_ref();
                1 + height_at(links.left()).max(height_at(links.right()))
            })
        }

        height_at(self.root)
    }

    /// Returns `true` if the tree contains `value`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::EmptyTree`] if the tree holds no values.
    pub fn contains<Q>(&self, value: &Q) -> Result<bool, TreeError>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.root.is_none() {
            return Err(TreeError::EmptyTree);
        }

        Ok(self.find(value).is_some())
    }

    fn find<Q>(&self, value: &Q) -> Link<Node<K>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match value.cmp(cur.as_ref().value.borrow()) {
                    Ordering::Less => opt_cur = self.links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = self.links(cur).right(),
                }
            }
        }
    }

    /// Adds `value` to the tree.
    ///
    /// This operation completes in _O(log(n))_ time.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::DuplicateValue`] if the tree already contains `value`. The tree is
    /// left unchanged.
    pub fn add(&mut self, value: K) -> Result<(), TreeError> {
        let Some(root) = self.root else {
            // Tree is empty. The new node is the root, and a lone leaf is balanced.
            self.root = Some(Node::into_ptr(Node::new(value)));
            self.len = 1;

            debug!(len = self.len, "added value as root");
            return Ok(());
        };

        // Descend the tree, looking for the missing child that should hold `value`.
        let mut parent = root;
        let dir = loop {
            let dir = match value.cmp(unsafe { &parent.as_ref().value }) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return Err(TreeError::DuplicateValue),
                Ordering::Greater => Dir::Right,
            };

            match unsafe { self.links(parent).child(dir) } {
                Some(child) => parent = child,
                None => break dir,
            }
        };

        let node = Node::into_ptr(Node::new(value));

        unsafe {
            self.links_mut(parent).set_child(dir, Some(node));
            self.links_mut(node).set_parent(Some(parent));

            match dir {
                // `parent` had no left child, so it is at level 1 alongside the new leaf.
                Dir::Left => {
                    self.check_skew(node, true);
                }

                // The new leaf may end a level run of three.
                Dir::Right => {
                    self.check_split(node);
                }
            }

            self.rebalance_inserted(parent);
        }

        self.len += 1;

        debug!(len = self.len, "added value");
        Ok(())
    }

    /// Removes `value` from the tree.
    ///
    /// This operation completes in _O(log(n))_ time.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::EmptyTree`] if the tree holds no values, or
    /// [`TreeError::ValueNotFound`] if it does not contain `value`. In both cases the tree is
    /// left unchanged.
    pub fn remove<Q>(&mut self, value: &Q) -> Result<(), TreeError>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.root.is_none() {
            return Err(TreeError::EmptyTree);
        }

        let node = self.find(value).ok_or(TreeError::ValueNotFound)?;

        // There are three possible cases:
        //
        // 1. `node` is a leaf. It is unlinked directly.
        //
        // 2. `node` has a right child. Its successor[^1] has no left child, so the successor's
        //    value is moved into `node` and the successor is unlinked instead; the successor's
        //    right child (if any) takes its place.
        //
        // 3. `node` has only a left child. This never happens in a balanced tree (see corollary
        //    5), but is handled symmetrically with the predecessor.
        //
        // Either way the unlinked node is at level 1 and the subtree of its parent may now be one
        // level short, which is fixed on the way back up to the root.
        //
        // [^1]: The successor of a node `a` is the least node in `a`'s right subtree.
        unsafe {
            let left = self.links(node).left();
            let right = self.links(node).right();

            let (removed, parent) = match (left, right) {
                (None, None) => (node, self.links(node).parent()),

                (_, Some(right)) => {
                    let (successor, successor_parent) = self.min_in_subtree(right);
                    self.swap_values(node, successor);
                    (successor, Some(successor_parent.unwrap_or(node)))
                }

                (Some(left), None) => {
                    let (predecessor, predecessor_parent) = self.max_in_subtree(left);
                    self.swap_values(node, predecessor);
                    (predecessor, Some(predecessor_parent.unwrap_or(node)))
                }
            };

            // `removed` has at most one child, which is elevated into its place.
            let removed_links = self.links(removed);
            let orphan = removed_links.left().or(removed_links.right());

            self.replace_child_or_set_root(parent, removed, orphan);
            self.maybe_set_parent(orphan, parent);

            // A lone root is simply unlinked; there is nothing above it to rebalance.
            if let Some(parent) = parent {
                self.rebalance_removed(parent);
            }

            self.len -= 1;
            drop(Node::from_ptr(removed));
        }

        debug!(len = self.len, "removed value");
        Ok(())
    }

    /// Removes all values from the tree.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = self.min_in_subtree(cur);
                let parent = parent.or_else(|| self.links(cur).parent());

                let right = self.links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                drop(Node::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    /// Returns an iterator over the values of the tree, in ascending order.
    pub(crate) fn iter(&self) -> Iter<'_, K> {
        Iter::new(self)
    }

    /// Checks the ordering, level and link invariants of every node, panicking on the first
    /// violation.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree must have zero length");
            return;
        };

        unsafe {
            assert_eq!(self.links(root).parent(), None, "root must not have a parent");

            let count = self.assert_invariants_at(root, None, None);
            assert_eq!(count, self.len, "length must match the number of nodes");
        }
    }

    // Returns the number of nodes in the subtree rooted at `node`.
    unsafe fn assert_invariants_at<'a>(
        &'a self,
        node: NonNull<Node<K>>,
        lower: Option<&'a K>,
        upper: Option<&'a K>,
    ) -> usize {
        unsafe {
            let links = self.links(node);
            let value = &node.as_ref().value;
            let level = links.level();

            // Ensure the value lies strictly between its ancestors' bounds.
            if let Some(lower) = lower {
                assert!(lower < value, "values must be in ascending order");
            }
            if let Some(upper) = upper {
                assert!(value < upper, "values must be in ascending order");
            }

            // Ensure all leaves have level 1.
            if links.is_leaf() {
                assert_eq!(level, 1, "leaves must have level 1");
            }

            // Missing children count as level 0, which also rules out unary nodes above level 1.
            let left_level = self.level(links.left());
            assert_eq!(
                left_level + 1,
                level,
                "left child must be exactly one level below its parent"
            );

            let right_level = self.level(links.right());
            assert!(
                right_level == level || right_level + 1 == level,
                "right child must be at most one level below its parent"
            );

            // Ensure no level run passes through three nodes.
            if let Some(right) = links.right() {
                let right_right_level = self.level(self.links(right).right());
                assert!(
                    right_right_level < level,
                    "right grandchild must be below its grandparent"
                );
            }

            let mut count = 1;

            for (child, lower, upper) in [
                (links.left(), lower, Some(value)),
                (links.right(), Some(value), upper),
            ] {
                if let Some(child) = child {
                    // Ensure child's parent link points to this node.
                    assert_eq!(
                        self.links(child).parent(),
                        Some(node),
                        "child's parent pointer not set"
                    );

                    count += self.assert_invariants_at(child, lower, upper);
                }
            }

            count
        }
    }

    // Support methods ========================================================

    // Returns the links of `node`.
    //
    // # Safety
    //
    // `node` must be an element of `self`, and its links must not be mutably borrowed.
    #[inline]
    unsafe fn links<'a>(&self, node: NonNull<Node<K>>) -> &'a Links<Node<K>> {
        unsafe { Node::links(node).as_ref() }
    }

    // Returns the links of `node` for modification.
    //
    // # Safety
    //
    // `node` must be an element of `self`, and its links must not be otherwise borrowed.
    #[inline]
    unsafe fn links_mut<'a>(&mut self, node: NonNull<Node<K>>) -> &'a mut Links<Node<K>> {
        unsafe { Node::links(node).as_mut() }
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<Node<K>>, parent: Link<Node<K>>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { self.links_mut(node).set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<Node<K>>,
        old_child: NonNull<Node<K>>,
        new_child: Link<Node<K>>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<Node<K>>,
        old_child: NonNull<Node<K>>,
        new_child: Link<Node<K>>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert_eq!(
                self.links(parent).child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );
            debug_assert!(
                new_child.is_none() || self.links(parent).child(!dir) != new_child,
                "`new_child` must not be a child of `parent`"
            );

            self.links_mut(parent).set_child(dir, new_child);
        }
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    unsafe fn min_in_subtree(
        &self,
        root: NonNull<Node<K>>,
    ) -> (NonNull<Node<K>>, Option<NonNull<Node<K>>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { self.links(cur).left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    // Returns the maximum node in the subtree.
    //
    // If the subtree root is not the maximum, also returns the maximum node's parent.
    #[inline]
    unsafe fn max_in_subtree(
        &self,
        root: NonNull<Node<K>>,
    ) -> (NonNull<Node<K>>, Option<NonNull<Node<K>>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(right) = unsafe { self.links(cur).right() } {
            parent = Some(cur);
            cur = right;
        }

        (cur, parent)
    }

    // Exchanges the values held by two distinct nodes, leaving their links untouched.
    unsafe fn swap_values(&mut self, mut a: NonNull<Node<K>>, mut b: NonNull<Node<K>>) {
        debug_assert_ne!(a, b);

        unsafe { mem::swap(&mut a.as_mut().value, &mut b.as_mut().value) };
    }

    unsafe fn which_child(&self, parent: NonNull<Node<K>>, child: NonNull<Node<K>>) -> Dir {
        if unsafe { self.links(parent).left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

impl<K: Ord> Default for AaTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for AaTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord> Drop for AaTree<K> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Links<T> {
    /// Returns the links of a detached leaf.
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                level: 1,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn level(&self) -> u8 {
        unsafe { (*self.inner.get()).level }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_level(&mut self, level: u8) {
        self.inner.get_mut().level = level;
    }
}
