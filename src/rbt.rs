use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt::{self, Debug},
    mem,
    ops::{Bound, RangeBounds},
};

use log::{debug, trace};
use rand::Rng;

use crate::depth::Depth;
use crate::error::RbtError;
use crate::iter::{Iter, Order, Range, Traverse};

// Index into the node arena, None stands for the nil leaf.
pub(crate) type Link = Option<usize>;

/// Color of a node. Nil leaves are treated as black.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Handle to a node in [`Rbt`], returned by insert and lookup APIs.
///
/// Handles are cheap to copy and never keep the tree borrowed. Once the
/// node behind a handle is removed, the handle is stale and every API
/// taking it answers `None`, even if the underlying slot gets reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u32,
}

#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    color: Color,
    parent: Link,
    left: Link,
    right: Link,
}

impl<K, V> Node<K, V> {
    // new nodes are always red.
    fn new(key: K, value: V, parent: Link) -> Node<K, V> {
        Node {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        }
    }

    #[inline]
    fn child(&self, side: Side) -> Link {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

#[derive(Clone)]
struct Slot<K, V> {
    generation: u32,
    node: Option<Node<K, V>>,
}

/// Rbt manage a single instance of in-memory index using
/// [red-black][rbtree] tree.
///
/// Nodes live in an arena owned by the tree and refer to each other by
/// index, parent links are plain indices used for navigation. Keys are
/// unique, inserting an existing key is an error rather than an overwrite.
///
/// [rbtree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
#[derive(Clone)]
pub struct Rbt<K, V> {
    name: String,
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>, // vacant slots, reused by later inserts.
    root: Link,
    n_count: usize, // number of entries in the tree.
}

/// Different ways to construct a new Rbt instance.
impl<K, V> Rbt<K, V> {
    /// Create an empty instance of Rbt, identified by `name`.
    /// Applications can choose unique names.
    pub fn new<S>(name: S) -> Rbt<K, V>
    where
        S: AsRef<str>,
    {
        Rbt::with_capacity(name, 0)
    }

    /// Create an empty instance of Rbt with room for `capacity` entries
    /// before the node arena has to grow.
    pub fn with_capacity<S>(name: S, capacity: usize) -> Rbt<K, V>
    where
        S: AsRef<str>,
    {
        Rbt {
            name: name.as_ref().to_string(),
            slots: Vec::with_capacity(capacity),
            free: Default::default(),
            root: Default::default(),
            n_count: Default::default(),
        }
    }
}

/// Maintenance API.
impl<K, V> Rbt<K, V> {
    /// Identify this instance. Applications can choose unique names while
    /// creating Rbt instances.
    #[inline]
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Remove all entries. Every outstanding handle becomes stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.node.take();
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
        }
        self.root = None;
        self.n_count = 0;
    }

    /// Return quickly with basic statisics, only entries() and node_size()
    /// are valid with this statisics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.n_count, mem::size_of::<Slot<K, V>>())
    }
}

/// Write operations on Rbt instance.
impl<K, V> Rbt<K, V>
where
    K: Ord + Debug,
{
    /// Insert a new {key, value} entry in the index and return a handle
    /// to it. If key is already present, the index is left untouched and
    /// the key is handed back with [`RbtError::DuplicateKey`].
    pub fn insert(&mut self, key: K, value: V) -> Result<Handle, RbtError<K>> {
        let (mut parent, mut side) = (None, Side::Left);
        let mut link = self.root;
        while let Some(index) = link {
            let node = self.node(index);
            parent = link;
            side = match key.cmp(&node.key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => {
                    debug!("{}: insert rejected, duplicate key {:?}", self.name, key);
                    return Err(RbtError::DuplicateKey(key));
                }
            };
            link = node.child(side);
        }

        let index = self.alloc(Node::new(key, value, parent));
        self.replace_child(parent, side, Some(index));
        self.insert_fixup(index);
        self.n_count += 1;
        Ok(self.handle(index))
    }

    /// Remove key from this instance and return its value. If key is
    /// not present, the index is left untouched and
    /// [`RbtError::KeyNotFound`] is returned.
    ///
    /// When the removed key's node has two children, the in-order
    /// successor's entry is moved into that node and the successor's node
    /// is released instead. Handle to the successor becomes stale, while
    /// the handle to the removed key now refers to the successor's entry.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V, RbtError<K>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let z = match self.find(key) {
            Some(z) => z,
            None => {
                debug!("{}: remove missed, key not found", self.name);
                return Err(RbtError::KeyNotFound);
            }
        };

        // y is the node spliced out, x takes its place below x_parent.
        let node = self.node(z);
        let (y, x, x_parent) = match (node.left, node.right) {
            (None, child) | (child, None) => {
                let parent = node.parent;
                self.transplant(z, child);
                (z, child, parent)
            }
            (Some(_), Some(right)) => {
                let y = self.min_index(right);
                let (x, parent) = (self.node(y).right, self.node(y).parent);
                self.transplant(y, x);
                (y, x, parent)
            }
        };

        let y_color = self.node(y).color;
        let mut removed = self.release(y);
        if y != z {
            let node = self.node_mut(z);
            mem::swap(&mut node.key, &mut removed.key);
            mem::swap(&mut node.value, &mut removed.value);
        }
        if y_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }
        self.n_count -= 1;
        Ok(removed.value)
    }

    /// Validate red-black tree with following rules:
    ///
    /// * Root, when present, is black.
    /// * From root to any leaf, no consecutive reds allowed in its path.
    /// * Number of blacks should be same on every path to a nil leaf.
    /// * Make sure keys are in sorted order.
    pub fn validate(&self) -> bool {
        if self.is_red(self.root) {
            return false;
        }
        let mut blacks = None;
        self.validate_tree(self.root, 0, &mut blacks)
            && self.keys().zip(self.keys().skip(1)).all(|(a, b)| a < b)
    }

    // first nil reached fixes the expected black count, others must match.
    fn validate_tree(&self, link: Link, mut nb: usize, blacks: &mut Option<usize>) -> bool {
        let node = match link {
            Some(index) => self.node(index),
            None => match *blacks {
                Some(expected) => return expected == nb,
                None => {
                    *blacks = Some(nb);
                    return true;
                }
            },
        };
        match node.color {
            Color::Red if self.is_red(node.left) || self.is_red(node.right) => return false,
            Color::Red => (),
            Color::Black => nb += 1,
        }
        self.validate_tree(node.left, nb, blacks) && self.validate_tree(node.right, nb, blacks)
    }
}

/// Audit operations on Rbt instance.
impl<K, V> Rbt<K, V>
where
    K: Ord + Clone + Debug,
{
    /// Same rules as [`Rbt::validate`], additionally check parent/child
    /// links and entry count. Return full statistics on the tree, or the
    /// first rule found broken. Refer to [`Stats`] for more information.
    pub fn audit(&self) -> Result<Stats, RbtError<K>> {
        let mut stats = Stats::new(self.n_count, mem::size_of::<Slot<K, V>>());
        stats.set_depths(Depth::new());
        if self.is_red(self.root) {
            return Err(RbtError::RedRoot);
        }
        if let Some(root) = self.root {
            if let Some(parent) = self.node(root).parent {
                let msg = format!("root {} has parent {}", root, parent);
                return Err(RbtError::BrokenLink(msg));
            }
        }
        let mut count = 0;
        let blacks = self.audit_tree(self.root, None, (None, None), 0, &mut count, &mut stats)?;
        if count != self.n_count {
            return Err(RbtError::CountMismatch(self.n_count, count));
        }
        stats.set_blacks(blacks);
        Ok(stats)
    }

    fn audit_tree(
        &self,
        link: Link,
        parent: Link,
        (low, high): (Option<&K>, Option<&K>), // exclusive bounds on keys
        depth: usize,
        count: &mut usize,
        stats: &mut Stats,
    ) -> Result<usize, RbtError<K>> {
        let index = match link {
            None => {
                stats.sample_depth(depth);
                return Ok(0);
            }
            Some(index) => index,
        };
        let node = self.node(index);
        *count += 1;

        if node.parent != parent {
            let msg = format!("node {} parent {:?} expected {:?}", index, node.parent, parent);
            return Err(RbtError::BrokenLink(msg));
        }
        if node.color == Color::Red && (self.is_red(node.left) || self.is_red(node.right)) {
            return Err(RbtError::ConsecutiveReds);
        }
        match (low, high) {
            (Some(low), _) if node.key.le(low) => {
                return Err(RbtError::SortError(node.key.clone(), low.clone()));
            }
            (_, Some(high)) if node.key.ge(high) => {
                return Err(RbtError::SortError(node.key.clone(), high.clone()));
            }
            _ => (),
        }

        let d = depth + 1;
        let lblacks = self.audit_tree(node.left, link, (low, Some(&node.key)), d, count, stats)?;
        let rblacks = self.audit_tree(node.right, link, (Some(&node.key), high), d, count, stats)?;
        if lblacks != rblacks {
            let err = format!("at {:?} left: {} right: {}", node.key, lblacks, rblacks);
            return Err(RbtError::UnbalancedBlacks(err));
        }
        match node.color {
            Color::Black => Ok(lblacks + 1),
            Color::Red => Ok(lblacks),
        }
    }
}

/// Read operations on Rbt instance.
impl<K, V> Rbt<K, V>
where
    K: Ord,
{
    /// Return handle to the node holding key, None if key is missing.
    pub fn search<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|index| self.handle(index))
    }

    /// Get the value for key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|index| &self.node(index).value)
    }

    /// Get mutable reference to the value for key. Values don't take part
    /// in ordering, so they can be updated in place.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let index = self.find(key)?;
        Some(&mut self.node_mut(index).value)
    }

    /// Check whether key is present in this instance.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Range over all entries from low to high.
    pub fn range<Q, R>(&self, range: R) -> Range<K, V>
    where
        K: Borrow<Q>,
        R: RangeBounds<Q>,
        Q: Ord + ?Sized,
    {
        let front = self.lower_bound(range.start_bound());
        let back = self.upper_bound(range.end_bound());
        match (front, back) {
            (Some(f), Some(b)) if self.node(f).key <= self.node(b).key => {
                Range::new(self, front, back)
            }
            _ => Range::new(self, None, None),
        }
    }

    pub(crate) fn find<Q>(&self, key: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut link = self.root;
        while let Some(index) = link {
            let node = self.node(index);
            link = match node.key.borrow().cmp(key) {
                Ordering::Less => node.right,
                Ordering::Greater => node.left,
                Ordering::Equal => return link,
            };
        }
        None
    }

    // smallest node whose key satisfies the start bound.
    fn lower_bound<Q>(&self, bound: Bound<&Q>) -> Link
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (mut link, mut found) = (self.root, None);
        while let Some(index) = link {
            let node = self.node(index);
            let ok = match bound {
                Bound::Included(key) => node.key.borrow() >= key,
                Bound::Excluded(key) => node.key.borrow() > key,
                Bound::Unbounded => true,
            };
            link = if ok {
                found = Some(index);
                node.left
            } else {
                node.right
            };
        }
        found
    }

    // largest node whose key satisfies the end bound.
    fn upper_bound<Q>(&self, bound: Bound<&Q>) -> Link
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (mut link, mut found) = (self.root, None);
        while let Some(index) = link {
            let node = self.node(index);
            let ok = match bound {
                Bound::Included(key) => node.key.borrow() <= key,
                Bound::Excluded(key) => node.key.borrow() < key,
                Bound::Unbounded => true,
            };
            link = if ok {
                found = Some(index);
                node.right
            } else {
                node.left
            };
        }
        found
    }
}

/// Order queries and traversals, in terms of handles.
impl<K, V> Rbt<K, V> {
    /// Return handle to the smallest entry, None if index is empty.
    pub fn minimum(&self) -> Option<Handle> {
        self.root.map(|root| self.handle(self.min_index(root)))
    }

    /// Return handle to the largest entry, None if index is empty.
    pub fn maximum(&self) -> Option<Handle> {
        self.root.map(|root| self.handle(self.max_index(root)))
    }

    /// Return handle to the smallest entry in the subtree under `handle`.
    pub fn subtree_minimum(&self, handle: Handle) -> Option<Handle> {
        let index = self.resolve(handle)?;
        Some(self.handle(self.min_index(index)))
    }

    /// Return handle to the largest entry in the subtree under `handle`.
    pub fn subtree_maximum(&self, handle: Handle) -> Option<Handle> {
        let index = self.resolve(handle)?;
        Some(self.handle(self.max_index(index)))
    }

    /// Return handle to the next entry in key order, None for the largest.
    pub fn successor(&self, handle: Handle) -> Option<Handle> {
        let index = self.next_index(self.resolve(handle)?)?;
        Some(self.handle(index))
    }

    /// Return handle to the previous entry in key order, None for the
    /// smallest.
    pub fn predecessor(&self, handle: Handle) -> Option<Handle> {
        let index = self.prev_index(self.resolve(handle)?)?;
        Some(self.handle(index))
    }

    /// Return handle to the root node.
    pub fn root(&self) -> Option<Handle> {
        self.root.map(|index| self.handle(index))
    }

    /// Return handle to the parent node.
    pub fn parent(&self, handle: Handle) -> Option<Handle> {
        let index = self.node(self.resolve(handle)?).parent?;
        Some(self.handle(index))
    }

    /// Return handle to the left child.
    pub fn left(&self, handle: Handle) -> Option<Handle> {
        let index = self.node(self.resolve(handle)?).left?;
        Some(self.handle(index))
    }

    /// Return handle to the right child.
    pub fn right(&self, handle: Handle) -> Option<Handle> {
        let index = self.node(self.resolve(handle)?).right?;
        Some(self.handle(index))
    }

    /// Return the {key, value} entry behind handle.
    pub fn entry(&self, handle: Handle) -> Option<(&K, &V)> {
        let node = self.node(self.resolve(handle)?);
        Some((&node.key, &node.value))
    }

    pub fn key(&self, handle: Handle) -> Option<&K> {
        self.entry(handle).map(|(key, _)| key)
    }

    pub fn value(&self, handle: Handle) -> Option<&V> {
        self.entry(handle).map(|(_, value)| value)
    }

    pub fn value_mut(&mut self, handle: Handle) -> Option<&mut V> {
        let index = self.resolve(handle)?;
        Some(&mut self.node_mut(index).value)
    }

    /// Return the color of node behind handle.
    pub fn color(&self, handle: Handle) -> Option<Color> {
        Some(self.node(self.resolve(handle)?).color)
    }

    /// Return an iterator over all entries in this instance, in key order.
    pub fn iter(&self) -> Iter<K, V> {
        let front = self.root.map(|root| self.min_index(root));
        let back = self.root.map(|root| self.max_index(root));
        Iter::new(self, front, back, self.n_count)
    }

    /// Return an iterator over all keys, in order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Return an iterator over all values, in key order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Walk all entries lazily in the requested order.
    pub fn traverse(&self, order: Order) -> Traverse<K, V> {
        let first = match order {
            Order::InOrder => self.root.map(|root| self.min_index(root)),
            Order::PreOrder => self.root,
            Order::PostOrder => self.root.map(|root| self.leftmost_leaf(root)),
        };
        Traverse::new(self, order, first, self.n_count)
    }

    /// Return a random entry from this index.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<(&K, &V)> {
        let mut index = self.root?;

        let mut at_depth = rng.gen::<u8>() % 40;
        loop {
            let node = self.node(index);
            let next = match rng.gen::<u8>() % 2 {
                0 => node.left,
                _ => node.right,
            };
            match next {
                Some(next) if at_depth > 0 => index = next,
                _ => break Some((&node.key, &node.value)),
            }
            at_depth -= 1;
        }
    }
}

/// Navigation over arena indices, shared with iterators.
impl<K, V> Rbt<K, V> {
    #[inline]
    pub(crate) fn node(&self, index: usize) -> &Node<K, V> {
        match &self.slots[index].node {
            Some(node) => node,
            None => panic!("node(): vacant slot {}, call the programmer", index),
        }
    }

    #[inline]
    fn node_mut(&mut self, index: usize) -> &mut Node<K, V> {
        match &mut self.slots[index].node {
            Some(node) => node,
            None => panic!("node_mut(): vacant slot {}, call the programmer", index),
        }
    }

    fn min_index(&self, mut index: usize) -> usize {
        while let Some(left) = self.node(index).left {
            index = left;
        }
        index
    }

    fn max_index(&self, mut index: usize) -> usize {
        while let Some(right) = self.node(index).right {
            index = right;
        }
        index
    }

    // descend to the first node visited in post-order.
    fn leftmost_leaf(&self, mut index: usize) -> usize {
        loop {
            let node = self.node(index);
            match node.left.or(node.right) {
                Some(next) => index = next,
                None => break index,
            }
        }
    }

    pub(crate) fn next_index(&self, index: usize) -> Link {
        if let Some(right) = self.node(index).right {
            return Some(self.min_index(right));
        }
        let (mut child, mut parent) = (index, self.node(index).parent);
        while let Some(p) = parent {
            if self.node(p).right != Some(child) {
                break;
            }
            child = p;
            parent = self.node(p).parent;
        }
        parent
    }

    pub(crate) fn prev_index(&self, index: usize) -> Link {
        if let Some(left) = self.node(index).left {
            return Some(self.max_index(left));
        }
        let (mut child, mut parent) = (index, self.node(index).parent);
        while let Some(p) = parent {
            if self.node(p).left != Some(child) {
                break;
            }
            child = p;
            parent = self.node(p).parent;
        }
        parent
    }

    pub(crate) fn next_preorder(&self, index: usize) -> Link {
        let node = self.node(index);
        if let Some(next) = node.left.or(node.right) {
            return Some(next);
        }
        // climb until we come up from a left child whose sibling exists.
        let (mut child, mut parent) = (index, node.parent);
        while let Some(p) = parent {
            let pnode = self.node(p);
            match pnode.right {
                Some(right) if pnode.left == Some(child) => return Some(right),
                _ => (),
            }
            child = p;
            parent = pnode.parent;
        }
        None
    }

    pub(crate) fn next_postorder(&self, index: usize) -> Link {
        let parent = self.node(index).parent?;
        let pnode = self.node(parent);
        match pnode.right {
            Some(right) if pnode.left == Some(index) => Some(self.leftmost_leaf(right)),
            _ => Some(parent),
        }
    }

    #[inline]
    fn is_red(&self, link: Link) -> bool {
        link.map_or(false, |index| self.node(index).color == Color::Red)
    }

    #[inline]
    fn set_color(&mut self, index: usize, color: Color) {
        self.node_mut(index).color = color
    }

    #[inline]
    fn child(&self, index: usize, side: Side) -> Link {
        self.node(index).child(side)
    }

    #[inline]
    fn set_child(&mut self, index: usize, side: Side, child: Link) {
        let node = self.node_mut(index);
        match side {
            Side::Left => node.left = child,
            Side::Right => node.right = child,
        }
    }

    #[inline]
    fn set_parent(&mut self, link: Link, parent: Link) {
        if let Some(index) = link {
            self.node_mut(index).parent = parent;
        }
    }

    // which side of its parent is `index` hanging on.
    #[inline]
    fn side_of(&self, index: usize, parent: usize) -> Side {
        if self.node(parent).left == Some(index) {
            Side::Left
        } else {
            Side::Right
        }
    }

    // point parent's `side` link, or the root, at `child`.
    fn replace_child(&mut self, parent: Link, side: Side, child: Link) {
        match parent {
            None => self.root = child,
            Some(parent) => self.set_child(parent, side, child),
        }
    }

    // replace subtree rooted at `u` with subtree rooted at `v`.
    fn transplant(&mut self, u: usize, v: Link) {
        let parent = self.node(u).parent;
        let side = match parent {
            Some(parent) => self.side_of(u, parent),
            None => Side::Left,
        };
        self.replace_child(parent, side, v);
        self.set_parent(v, parent);
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) -> Node<K, V> {
        let slot = &mut self.slots[index];
        match slot.node.take() {
            Some(node) => {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
                node
            }
            None => panic!("release(): vacant slot {}, call the programmer", index),
        }
    }

    #[inline]
    fn handle(&self, index: usize) -> Handle {
        let generation = self.slots[index].generation;
        Handle { index, generation }
    }

    fn resolve(&self, handle: Handle) -> Link {
        let slot = self.slots.get(handle.index)?;
        match &slot.node {
            Some(_) if slot.generation == handle.generation => Some(handle.index),
            _ => None,
        }
    }
}

/// Rotation and fix-up routines.
impl<K, V> Rbt<K, V> {
    //              (i)                       (i)
    //               |                         |
    //               x                         y
    //              / \                       / \
    //             /   \                     /   \
    //            a     y        ==>        x     c
    //                 / \                 / \
    //                b   c               a   b
    //
    fn rotate_left(&mut self, x: usize) {
        self.rotate(x, Side::Left)
    }

    //              (i)                       (i)
    //               |                         |
    //               x                         y
    //              / \                       / \
    //             /   \                     /   \
    //            y     c        ==>        a     x
    //           / \                             / \
    //          a   b                           b   c
    //
    fn rotate_right(&mut self, x: usize) {
        self.rotate(x, Side::Right)
    }

    // x goes down towards `dir`, its child on the opposite side comes up.
    // Colors are left untouched. No-op when that child is missing.
    fn rotate(&mut self, x: usize, dir: Side) {
        let y = match self.child(x, dir.opposite()) {
            Some(y) => y,
            None => return,
        };
        trace!("{}: rotate {:?} at {}", self.name, dir, x);

        let b = self.child(y, dir);
        self.set_child(x, dir.opposite(), b);
        self.set_parent(b, Some(x));

        let parent = self.node(x).parent;
        let side = match parent {
            Some(parent) => self.side_of(x, parent),
            None => Side::Left,
        };
        self.replace_child(parent, side, Some(y));
        self.set_parent(Some(y), parent);

        self.set_child(y, dir, Some(x));
        self.set_parent(Some(x), Some(y));
    }

    fn insert_fixup(&mut self, mut z: usize) {
        // loop invariant: z is red.
        while let Some(parent) = self.node(z).parent {
            if !self.is_red(Some(parent)) {
                break;
            }
            // red parent is never the root, grandparent is present.
            let grand = match self.node(parent).parent {
                Some(grand) => grand,
                None => break,
            };
            let side = self.side_of(parent, grand);

            if let Some(uncle) = self.child(grand, side.opposite()) {
                if self.is_red(Some(uncle)) {
                    // red uncle, flip colors and push the violation up.
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grand, Color::Red);
                    z = grand;
                    continue;
                }
            }

            let mut parent = parent;
            if self.child(parent, side.opposite()) == Some(z) {
                // inner child, rotate it to the outside first.
                self.rotate(parent, side);
                mem::swap(&mut z, &mut parent);
            }
            self.set_color(parent, Color::Black);
            self.set_color(grand, Color::Red);
            match side {
                Side::Left => self.rotate_right(grand),
                Side::Right => self.rotate_left(grand),
            }
            trace!("{}: insert fixup settled at {}", self.name, parent);
            break;
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    // `x` carries an extra black, `parent` tracks its parent even when x
    // is nil.
    fn delete_fixup(&mut self, mut x: Link, mut parent: Link) {
        while x != self.root && !self.is_red(x) {
            let p = match parent {
                Some(p) => p,
                None => break,
            };
            let side = if self.node(p).left == x {
                Side::Left
            } else {
                Side::Right
            };

            let mut sibling = self.child(p, side.opposite());
            match sibling {
                Some(w) if self.is_red(sibling) => {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate(p, side);
                    sibling = self.child(p, side.opposite());
                }
                _ => (),
            }

            let w = match sibling {
                Some(w) => w,
                None => {
                    // nothing to borrow from, push the deficit up.
                    x = Some(p);
                    parent = self.node(p).parent;
                    continue;
                }
            };
            let (near, far) = (self.child(w, side), self.child(w, side.opposite()));

            if !self.is_red(near) && !self.is_red(far) {
                self.set_color(w, Color::Red);
                x = Some(p);
                parent = self.node(p).parent;
                continue;
            }

            if !self.is_red(far) {
                if let Some(near) = near {
                    self.set_color(near, Color::Black);
                }
                self.set_color(w, Color::Red);
                self.rotate(w, side.opposite());
            }
            if let Some(w) = self.child(p, side.opposite()) {
                let color = self.node(p).color;
                self.set_color(w, color);
                if let Some(far) = self.child(w, side.opposite()) {
                    self.set_color(far, Color::Black);
                }
            }
            self.set_color(p, Color::Black);
            self.rotate(p, side);
            trace!("{}: delete fixup absorbed at {}", self.name, p);
            x = self.root;
        }

        if let Some(x) = x {
            self.set_color(x, Color::Black);
        }
    }
}

impl<K, V> Debug for Rbt<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a Rbt<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// Statistics on [`Rbt`] tree. Serves two purpose:
///
/// * To get partial but quick statistics via [`Rbt::stats`] method.
/// * To get full statisics via [`Rbt::audit`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
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

    fn sample_depth(&mut self, depth: usize) {
        if let Some(depths) = self.depths.as_mut() {
            depths.sample(depth)
        }
    }

    /// Return number entries in [`Rbt`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return arena slot size, including over-head for `Rbt<K,V>`.
    /// The overhead is constant, the slot size varies with key and value
    /// types.
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return black-height of the tree, number of black nodes from root
    /// to any nil leaf.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics, None unless gathered by audit on a
    /// non-empty tree.
    pub fn depths(&self) -> Option<Depth> {
        match &self.depths {
            Some(depths) if depths.samples() > 0 && self.entries > 0 => Some(depths.clone()),
            _ => None,
        }
    }
}
