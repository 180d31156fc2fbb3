use core::ptr::NonNull;

use crate::{AaTree, Dir, Link, Node};

/// An in-order iterator over the values of an [`AaTree`].
///
/// Each step moves to the in-order successor by following parent links, so no stack is kept.
pub(crate) struct Iter<'tree, K: Ord> {
    tree: &'tree AaTree<K>,
    next: Link<Node<K>>,
    len: usize,
}

impl<'tree, K: Ord> Iter<'tree, K> {
    pub(crate) fn new(tree: &'tree AaTree<K>) -> Self {
        let next = tree.root.map(|root| unsafe { tree.min_in_subtree(root).0 });

        Iter {
            tree,
            next,
            len: tree.len(),
        }
    }

    // The least node greater than `node`: the minimum of its right subtree if it has one,
    // otherwise the first ancestor reached from a left child.
    unsafe fn successor(&self, node: NonNull<Node<K>>) -> Link<Node<K>> {
        unsafe {
            if let Some(right) = self.tree.links(node).right() {
                return Some(self.tree.min_in_subtree(right).0);
            }

            let mut cur = node;
            while let Some(parent) = self.tree.links(cur).parent() {
                if self.tree.which_child(parent, cur) == Dir::Left {
                    return Some(parent);
                }

                cur = parent;
            }

            None
        }
    }
}

impl<'tree, K: Ord> Iterator for Iter<'tree, K> {
    type Item = &'tree K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;

        self.next = unsafe { self.successor(node) };
        self.len -= 1;

        Some(unsafe { &node.as_ref().value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K: Ord> ExactSizeIterator for Iter<'_, K> {}
