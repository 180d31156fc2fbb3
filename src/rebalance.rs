//! Skew, split and the bottom-up fixups built from them.
//!
//! `check_skew` and `check_split` look _upward_ from the node they are given: a skew is needed
//! when a node is a left child at least as high as its parent, and a split is needed when a node
//! is the right grandchild of a node no higher than itself. Comparisons are `<=` so that equal
//! levels trigger the rotation.
//!
//! The fixups walk parent pointers from the change point to the root. At each step the checks
//! are aimed at the subtree rooted at the current node, and positions below it are re-read from
//! whichever node tops that subtree after each rotation.

use core::ptr::NonNull;

use tracing::trace;

use crate::{AaTree, Dir, Link, Node};

// Where a subtree hangs from: either the root of the tree, or a child slot of a parent that the
// subtree's rotations never move.
enum Slot<K> {
    Root,
    Child(NonNull<Node<K>>, Dir),
}

impl<K: Ord> AaTree<K> {
    // Re-establishes the invariants on the path above a newly inserted leaf, starting at the
    // leaf's original parent.
    pub(crate) unsafe fn rebalance_inserted(&mut self, node: NonNull<Node<K>>) {
        let mut opt_cur = Some(node);

        while let Some(cur) = opt_cur {
            unsafe {
                let top = self.fix_inserted_at(cur);
                opt_cur = self.links(top).parent();
            }
        }
    }

    // Re-establishes the invariants on the path above an unlinked node, starting at the unlinked
    // node's parent.
    pub(crate) unsafe fn rebalance_removed(&mut self, node: NonNull<Node<K>>) {
        let mut opt_cur = Some(node);

        while let Some(cur) = opt_cur {
            unsafe {
                let top = self.fix_removed_at(cur);
                opt_cur = self.links(top).parent();
            }
        }
    }

    // Skews then splits the subtree rooted at `node`, returning the node now at its top.
    unsafe fn fix_inserted_at(&mut self, node: NonNull<Node<K>>) -> NonNull<Node<K>> {
        unsafe {
            let slot = self.slot_of(node);

            if let Some(left) = self.links(node).left() {
                self.check_skew(left, true);
            }

            let top = self.occupant(&slot);
            if let Some(right_right) = self.right_grandchild(top) {
                self.check_split(right_right);
            }

            self.occupant(&slot)
        }
    }

    // Lowers `node` if its subtree lost a level, then repairs the level runs around it, returning
    // the node now at the top of its subtree.
    //
    // Every rotation below is confined to the subtree, so the path above `node` is left intact.
    unsafe fn fix_removed_at(&mut self, node: NonNull<Node<K>>) -> NonNull<Node<K>> {
        unsafe {
            let slot = self.slot_of(node);

            if self.has_level_gap(node) {
                self.demote(node);

                let level = self.links(node).level();
                if let Some(right) = self.links(node).right() {
                    // The right child was horizontal and is now above its parent.
                    if self.links(right).level() > level {
                        trace!(level, "clamping right child");
                        self.links_mut(right).set_level(level);
                    }
                }
            }

            // Skew cascade. Splitting here would act on grandparents that a later skew moves.
            if let Some(left) = self.links(node).left() {
                self.check_skew(left, false);
            }

            let top = self.occupant(&slot);

            if let Some(right) = self.links(top).right() {
                if let Some(right_left) = self.links(right).left() {
                    self.check_skew(right_left, false);
                }
            }

            if let Some(right_right) = self.right_grandchild(top) {
                if let Some(right_right_left) = self.links(right_right).left() {
                    self.check_skew(right_right_left, false);
                }
            }

            // Split cascade.
            if let Some(right_right) = self.right_grandchild(top) {
                self.check_split(right_right);
            }

            let top = self.occupant(&slot);

            if let Some(right) = self.links(top).right() {
                if let Some(right_right_right) = self.right_grandchild(right) {
                    self.check_split(right_right_right);
                }
            }

            self.occupant(&slot)
        }
    }

    // Returns `true` if `node` is more than one level above one of its children, counting a
    // missing child as level 0.
    unsafe fn has_level_gap(&self, node: NonNull<Node<K>>) -> bool {
        unsafe {
            let links = self.links(node);
            let level = links.level();

            let left_is_wrong = match links.left() {
                Some(left) => self.links(left).level() < level - 1,
                None => level > 1,
            };

            let right_is_wrong = match links.right() {
                Some(right) => self.links(right).level() < level - 1,
                None => level > 1,
            };

            left_is_wrong || right_is_wrong
        }
    }

    /// Skews `node` into its parent's place if it is a left child at least as high as its
    /// parent.
    ///
    /// If `split_after` is set and the skew leaves a level run of three starting at `node`, the
    /// run is split immediately.
    ///
    /// Returns `true` if a skew was performed.
    pub(crate) unsafe fn check_skew(
        &mut self,
        node: NonNull<Node<K>>,
        split_after: bool,
    ) -> bool {
        unsafe {
            let Some(parent) = self.links(node).parent() else {
                return false;
            };

            if self.links(parent).left() != Some(node)
                || self.links(parent).level() > self.links(node).level()
            {
                return false;
            }

            self.skew(parent, node);

            if !split_after {
                return true;
            }

            // `parent` is now the right child of `node`.
            if let Some(across) = self.links(parent).right() {
                debug_assert!(self.is_right_grandchild(across, node));

                if self.links(node).level() <= self.links(across).level() {
                    self.split(node, parent);
                }
            }

            true
        }
    }

    /// Splits the level run ending at `node` if `node` is the right grandchild of a node no
    /// higher than itself.
    ///
    /// Returns `true` if a split was performed.
    pub(crate) unsafe fn check_split(&mut self, node: NonNull<Node<K>>) -> bool {
        unsafe {
            let Some(parent) = self.links(node).parent() else {
                return false;
            };
            let Some(grandparent) = self.links(parent).parent() else {
                return false;
            };

            if !self.is_right_grandchild(node, grandparent)
                || self.links(grandparent).level() > self.links(node).level()
            {
                return false;
            }

            self.split(grandparent, parent);
            true
        }
    }

    // Rotates `left` up into the place of `parent`, which becomes its right child.
    //
    //       parent          left
    //       /    \         /    \
    //     left    c  =>   a    parent
    //     /  \                 /    \
    //    a    b               b      c
    //
    // Levels are unchanged.
    unsafe fn skew(&mut self, parent: NonNull<Node<K>>, left: NonNull<Node<K>>) {
        debug_assert_eq!(unsafe { self.links(parent).left() }, Some(left));

        trace!(level = unsafe { self.links(left).level() }, "skew");
        self.rotate_at(parent, left);
    }

    // Rotates `parent` up into the place of `grandparent`, which becomes its left child, and
    // promotes `parent` one level.
    //
    //    grandparent                 parent
    //    /    \                     /      \
    //   a    parent     =>    grandparent   c
    //        /    \             /     \
    //       b      c           a       b
    unsafe fn split(&mut self, grandparent: NonNull<Node<K>>, parent: NonNull<Node<K>>) {
        debug_assert_eq!(unsafe { self.links(grandparent).right() }, Some(parent));

        self.rotate_at(grandparent, parent);

        unsafe {
            self.promote(parent);
            trace!(level = self.links(parent).level(), "split");
        }
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // The levels of affected nodes are not updated.
    fn rotate_at(&mut self, down: NonNull<Node<K>>, up: NonNull<Node<K>>) {
        unsafe {
            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let dir = if self.links(down).right() == Some(up) {
                Dir::Left
            } else {
                Dir::Right
            };

            debug_assert_eq!(self.links(up).parent(), Some(down));

            let across = self.links(up).child(dir);
            self.links_mut(down).set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            self.links_mut(up).set_child(dir, Some(down));
            let parent = self.links_mut(down).set_parent(Some(up));
            self.links_mut(up).set_parent(parent);

            match parent {
                Some(parent) => self.replace_child(parent, down, Some(up)),
                None => self.root = Some(up),
            }
        }
    }

    #[inline]
    pub(crate) unsafe fn promote(&mut self, node: NonNull<Node<K>>) {
        unsafe {
            let links = self.links_mut(node);
            let level = links.level().checked_add(1).expect("level overflow");
            links.set_level(level);
        }
    }

    #[inline]
    unsafe fn demote(&mut self, node: NonNull<Node<K>>) {
        unsafe {
            let links = self.links_mut(node);
            let level = links.level();
            debug_assert!(level > 1, "cannot demote a node below level 1");

            trace!(level = level - 1, "demote");
            links.set_level(level - 1);
        }
    }

    /// Returns the level of the pointed-to node, or 0 for a missing node.
    pub(crate) unsafe fn level(&self, node: Link<Node<K>>) -> u8 {
        node.map(|n| unsafe { self.links(n).level() }).unwrap_or(0)
    }

    unsafe fn right_grandchild(&self, node: NonNull<Node<K>>) -> Link<Node<K>> {
        unsafe {
            let right = self.links(node).right()?;
            self.links(right).right()
        }
    }

    unsafe fn is_right_grandchild(
        &self,
        node: NonNull<Node<K>>,
        grandparent: NonNull<Node<K>>,
    ) -> bool {
        unsafe { self.right_grandchild(grandparent) == Some(node) }
    }

    unsafe fn slot_of(&self, node: NonNull<Node<K>>) -> Slot<K> {
        unsafe {
            match self.links(node).parent() {
                Some(parent) => Slot::Child(parent, self.which_child(parent, node)),
                None => Slot::Root,
            }
        }
    }

    unsafe fn occupant(&self, slot: &Slot<K>) -> NonNull<Node<K>> {
        let occupant = match *slot {
            Slot::Root => self.root,
            Slot::Child(parent, dir) => unsafe { self.links(parent).child(dir) },
        };

        occupant.expect("rotations never empty a slot")
    }
}
