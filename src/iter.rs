use std::iter::FusedIterator;

use crate::rbt::{Link, Rbt};

/// Order in which [`Rbt::traverse`] visits the nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Left subtree, node, right subtree. Yields keys in ascending order.
    InOrder,
    /// Node, left subtree, right subtree.
    PreOrder,
    /// Left subtree, right subtree, node.
    PostOrder,
}

/// Iterate over all entries of [`Rbt`] in key order, from both ends.
/// Walks the parent links, no auxiliary stack is kept.
pub struct Iter<'a, K, V> {
    tree: &'a Rbt<K, V>,
    front: Link,
    back: Link,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(tree: &'a Rbt<K, V>, front: Link, back: Link, n: usize) -> Self {
        Iter {
            tree,
            front,
            back,
            remaining: n,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.front?;
        self.remaining -= 1;
        self.front = self.tree.next_index(index);
        let node = self.tree.node(index);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.back?;
        self.remaining -= 1;
        self.back = self.tree.prev_index(index);
        let node = self.tree.node(index);
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

/// Iterate over entries of [`Rbt`] within a key range, from both ends.
/// Created by [`Rbt::range`].
pub struct Range<'a, K, V> {
    tree: &'a Rbt<K, V>,
    front: Link,
    back: Link,
}

impl<'a, K, V> Range<'a, K, V> {
    pub(crate) fn new(tree: &'a Rbt<K, V>, front: Link, back: Link) -> Self {
        Range { tree, front, back }
    }

    // front and back meet on the last entry.
    fn finish_at(&mut self, index: usize) -> bool {
        if self.front == Some(index) && self.back == Some(index) {
            self.front = None;
            self.back = None;
            true
        } else {
            false
        }
    }
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.front?;
        if !self.finish_at(index) {
            self.front = self.tree.next_index(index);
        }
        let node = self.tree.node(index);
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> DoubleEndedIterator for Range<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let index = self.back?;
        if !self.finish_at(index) {
            self.back = self.tree.prev_index(index);
        }
        let node = self.tree.node(index);
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> FusedIterator for Range<'a, K, V> {}

/// Lazy walk over all entries of [`Rbt`] in one of the [`Order`]s.
/// Created by [`Rbt::traverse`], restart by calling it again.
pub struct Traverse<'a, K, V> {
    tree: &'a Rbt<K, V>,
    order: Order,
    next: Link,
    remaining: usize,
}

impl<'a, K, V> Traverse<'a, K, V> {
    pub(crate) fn new(tree: &'a Rbt<K, V>, order: Order, first: Link, n: usize) -> Self {
        Traverse {
            tree,
            order,
            next: first,
            remaining: n,
        }
    }

    /// Return the order of this walk.
    pub fn order(&self) -> Order {
        self.order
    }
}

impl<'a, K, V> Iterator for Traverse<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        self.next = match self.order {
            Order::InOrder => self.tree.next_index(index),
            Order::PreOrder => self.tree.next_preorder(index),
            Order::PostOrder => self.tree.next_postorder(index),
        };
        self.remaining = self.remaining.saturating_sub(1);
        let node = self.tree.node(index);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> ExactSizeIterator for Traverse<'a, K, V> {}

impl<'a, K, V> FusedIterator for Traverse<'a, K, V> {}
