//! Node storage and the tree algorithms that walk it.
//!
//! Nodes live in a flat arena and refer to their children by index. A node is only ever appended
//! (by insertion); nodes are never removed individually, deletion just flags them. The arena is
//! dropped wholesale when the tree is rebuilt.

use std::fmt::{self, Debug};

use tinyvec::TinyVec;

use crate::kdtree::neighbors::NeighborList;
use crate::kdtree::point::{keys_equal, sq_dist};
use crate::kdtree::rect::HyperRect;
use crate::r#type::CoordNum;

/// A single entry in the tree.
#[derive(Debug, Clone)]
pub(crate) struct Node<N: CoordNum, V> {
    pub(crate) key: Box<[N]>,
    pub(crate) value: V,
    pub(crate) deleted: bool,
    left: Option<usize>,
    right: Option<usize>,
}

impl<N: CoordNum, V> Node<N, V> {
    fn new(key: Box<[N]>, value: V) -> Self {
        Self {
            key,
            value,
            deleted: false,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub(crate) fn is_live(&self) -> bool {
        !self.deleted
    }
}

/// What an insertion did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inserted {
    /// A new node was created.
    Created,
    /// The key matched a soft-deleted node, which is live again with the new value.
    Revived,
    /// The key matched a live node whose value was overwritten.
    Updated,
}

impl Inserted {
    /// Whether the insertion added a logical entry to the tree.
    #[inline]
    pub(crate) fn is_new_entry(self) -> bool {
        !matches!(self, Inserted::Updated)
    }
}

/// Flat storage for the nodes of one tree.
///
/// The split axis of a node is its depth modulo `dims`; it is never stored.
#[derive(Debug, Clone)]
pub(crate) struct Arena<N: CoordNum, V> {
    nodes: Vec<Node<N, V>>,
    root: Option<usize>,
    dims: usize,
}

impl<N: CoordNum, V> Arena<N, V> {
    pub(crate) fn new(dims: usize) -> Self {
        Self {
            nodes: vec![],
            root: None,
            dims,
        }
    }

    /// Physical node count, soft-deleted nodes included.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[inline]
    pub(crate) fn get(&self, id: usize) -> &Node<N, V> {
        &self.nodes[id]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: usize) -> &mut Node<N, V> {
        &mut self.nodes[id]
    }

    #[inline]
    fn next_axis(&self, axis: usize) -> usize {
        (axis + 1) % self.dims
    }

    /// Insert `key`, descending left when the key is strictly less than the node's key on the
    /// split axis and right otherwise. An exact match overwrites the value in place.
    pub(crate) fn insert(&mut self, key: Box<[N]>, value: V) -> Inserted {
        let Some(mut current) = self.root else {
            self.root = Some(self.push(key, value));
            return Inserted::Created;
        };
        let mut axis = 0;

        loop {
            let node = &mut self.nodes[current];
            if keys_equal(&node.key, &key) {
                node.value = value;
                return if std::mem::replace(&mut node.deleted, false) {
                    Inserted::Revived
                } else {
                    Inserted::Updated
                };
            }

            let go_left = key[axis] < node.key[axis];
            let child = if go_left { node.left } else { node.right };
            match child {
                Some(child) => {
                    current = child;
                    axis = self.next_axis(axis);
                }
                None => {
                    let id = self.push(key, value);
                    let parent = &mut self.nodes[current];
                    if go_left {
                        parent.left = Some(id);
                    } else {
                        parent.right = Some(id);
                    }
                    return Inserted::Created;
                }
            }
        }
    }

    fn push(&mut self, key: Box<[N]>, value: V) -> usize {
        self.nodes.push(Node::new(key, value));
        self.nodes.len() - 1
    }

    /// Find the live node whose key is identical to `key`.
    ///
    /// This follows the unique path on which `key` could have been inserted. A soft-deleted node
    /// with a matching key is passed over.
    pub(crate) fn find(&self, key: &[N]) -> Option<usize> {
        let mut current = self.root;
        let mut axis = 0;

        while let Some(id) = current {
            let node = &self.nodes[id];
            if node.is_live() && keys_equal(&node.key, key) {
                return Some(id);
            }
            current = if key[axis] < node.key[axis] {
                node.left
            } else {
                node.right
            };
            axis = self.next_axis(axis);
        }

        None
    }

    /// Ids of the `n` live nodes nearest to `target`, from nearest to farthest.
    ///
    /// The caller guarantees that `n` does not exceed the number of live nodes.
    pub(crate) fn nearest(&self, target: &[N], n: usize) -> Vec<usize> {
        let Some(root) = self.root.filter(|_| n > 0) else {
            return vec![];
        };

        let mut list = NeighborList::new(n);
        // each frame carries the region its subtree can occupy
        let mut stack = vec![(root, 0, HyperRect::infinite(self.dims))];

        while let Some((id, axis, mut rect)) = stack.pop() {
            // the near side is popped before the far side, so by the time a far subtree comes
            // up the list already holds the best candidates from the near side
            if list.is_full() && rect.sq_dist_to(target) >= list.max_dist() {
                continue;
            }

            let node = &self.nodes[id];
            // deleted nodes are never candidates, but their subtrees still are
            if node.is_live() {
                list.offer(id, sq_dist(&node.key, target));
            }

            let split = node.key[axis];
            let next_axis = self.next_axis(axis);
            let target_in_left = target[axis] < split;
            let (near, far) = if target_in_left {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };

            if let Some(far) = far {
                let mut far_rect = rect.clone();
                narrow(&mut far_rect, axis, split, !target_in_left);
                stack.push((far, next_axis, far_rect));
            }
            if let Some(near) = near {
                narrow(&mut rect, axis, split, target_in_left);
                stack.push((near, next_axis, rect));
            }
        }
        debug_assert_eq!(list.len(), n);

        list.into_sorted_ids()
    }

    /// Ids of live nodes with `low[d] <= key[d] <= high[d]` on every axis, in the order left
    /// subtree, node, right subtree.
    pub(crate) fn range(&self, low: &[N], high: &[N]) -> Vec<usize> {
        let mut result = vec![];

        // (id, axis, whether the node's subtrees have already been scheduled)
        let mut stack: TinyVec<[(usize, usize, bool); 32]> = TinyVec::new();
        if let Some(root) = self.root {
            stack.push((root, 0, false));
        }

        while let Some((id, axis, expanded)) = stack.pop() {
            let node = &self.nodes[id];
            if expanded {
                if node.is_live() && in_range(&node.key, low, high) {
                    result.push(id);
                }
                continue;
            }

            let split = node.key[axis];
            let next_axis = self.next_axis(axis);

            // Note: pushed in backwards order to what gets popped
            // the right subtree holds keys at or above the split
            if let Some(right) = node.right.filter(|_| high[axis] >= split) {
                stack.push((right, next_axis, false));
            }
            stack.push((id, axis, true));
            // the left subtree only holds keys strictly below the split
            if let Some(left) = node.left.filter(|_| low[axis] < split) {
                stack.push((left, next_axis, false));
            }
        }

        result
    }

    /// Ids of live nodes in pre-order: each node before its left subtree, then its right subtree.
    pub(crate) fn live_preorder(&self) -> Vec<usize> {
        let mut result = Vec::with_capacity(self.nodes.len());

        // Use TinyVec to avoid heap allocations for shallow trees
        let mut stack: TinyVec<[usize; 32]> = TinyVec::new();
        if let Some(root) = self.root {
            stack.push(root);
        }

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_live() {
                result.push(id);
            }
            // Note: pushed in backwards order to what gets popped
            if let Some(right) = node.right {
                stack.push(right);
            }
            if let Some(left) = node.left {
                stack.push(left);
            }
        }

        result
    }

    /// Consume the arena, handing back every node by id.
    pub(crate) fn into_slots(self) -> Vec<Option<Node<N, V>>> {
        self.nodes.into_iter().map(Some).collect()
    }
}

impl<N: CoordNum, V: Debug> fmt::Display for Arena<N, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(root) = self.root else {
            return f.write_str("empty");
        };

        // (id, depth, side of its parent)
        let mut stack: TinyVec<[(usize, usize, char); 32]> = TinyVec::new();
        stack.push((root, 0, ' '));

        while let Some((id, depth, side)) = stack.pop() {
            if depth > 0 {
                write!(f, "\n{:indent$}{} ", "", side, indent = 2 * depth)?;
            }
            let node = &self.nodes[id];
            write!(f, "{:?}  {:?}", node.key, node.value)?;
            if node.deleted {
                f.write_str("*")?;
            }

            if let Some(right) = node.right {
                stack.push((right, depth + 1, 'R'));
            }
            if let Some(left) = node.left {
                stack.push((left, depth + 1, 'L'));
            }
        }
        Ok(())
    }
}

#[inline]
fn in_range<N: CoordNum>(key: &[N], low: &[N], high: &[N]) -> bool {
    key.iter()
        .zip(low.iter().zip(high))
        .all(|(k, (lo, hi))| lo <= k && k <= hi)
}

/// Shrink `rect` to one side of `split` on `axis`.
#[inline]
fn narrow<N: CoordNum>(rect: &mut HyperRect<N>, axis: usize, split: N, left: bool) {
    if left {
        rect.set_max(axis, split);
    } else {
        rect.set_min(axis, split);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn arena(points: &[[f64; 2]]) -> Arena<f64, usize> {
        let mut arena = Arena::new(2);
        for (i, p) in points.iter().enumerate() {
            arena.insert(p.to_vec().into_boxed_slice(), i);
        }
        arena
    }

    #[test]
    fn splits_cycle_through_axes() {
        // root splits on x, its children on y
        let arena = arena(&[[5.0, 5.0], [2.0, 8.0], [2.0, 1.0], [9.0, 5.0]]);
        let root = arena.get(0);
        assert_eq!(root.left, Some(1));
        assert_eq!(root.right, Some(3));
        // (2, 1) is left of the root on x, then below (2, 8) on y
        assert_eq!(arena.get(1).left, Some(2));
    }

    #[test]
    fn ties_go_right() {
        let arena = arena(&[[5.0, 5.0], [5.0, 0.0]]);
        assert_eq!(arena.get(0).right, Some(1));
        assert_eq!(arena.find(&[5.0, 0.0]), Some(1));
    }

    #[test]
    fn insert_outcomes() {
        let mut arena = arena(&[[1.0, 1.0]]);
        assert_eq!(
            arena.insert(vec![1.0, 1.0].into_boxed_slice(), 7),
            Inserted::Updated
        );
        arena.get_mut(0).deleted = true;
        assert_eq!(arena.find(&[1.0, 1.0]), None);
        assert_eq!(
            arena.insert(vec![1.0, 1.0].into_boxed_slice(), 8),
            Inserted::Revived
        );
        assert_eq!(arena.find(&[1.0, 1.0]), Some(0));
        assert_eq!(arena.get(0).value, 8);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn preorder_is_root_first() {
        let arena = arena(&[[5.0, 5.0], [2.0, 8.0], [2.0, 1.0], [9.0, 5.0]]);
        assert_eq!(arena.live_preorder(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn nearest_passes_through_deleted_nodes() {
        let mut arena = arena(&[[5.0, 5.0], [2.0, 8.0], [2.0, 1.0], [9.0, 5.0]]);
        arena.get_mut(1).deleted = true;
        assert_eq!(arena.nearest(&[2.0, 7.0], 1), vec![0]);
        assert_eq!(arena.nearest(&[2.0, 2.0], 2), vec![2, 0]);
    }

    #[test]
    fn range_is_in_order() {
        let arena = arena(&[[5.0, 5.0], [2.0, 8.0], [2.0, 1.0], [9.0, 5.0]]);
        assert_eq!(
            arena.range(&[f64::NEG_INFINITY; 2], &[f64::INFINITY; 2]),
            vec![2, 1, 0, 3]
        );
        // only the left subtree of the root can hold x < 5
        assert_eq!(arena.range(&[0.0, 0.0], &[4.0, 10.0]), vec![2, 1]);
    }

    #[test]
    fn nearest_prunes_far_subtrees() {
        // a chain where every node is to the right of its parent
        let points: Vec<[f64; 2]> = (0..50).map(|i| [i as f64, i as f64]).collect();
        let arena = arena(&points);
        assert_eq!(arena.nearest(&[-1.0, -1.0], 3), vec![0, 1, 2]);
        assert_eq!(arena.nearest(&[48.9, 49.2], 2), vec![49, 48]);
    }

    #[test]
    fn displays_nested_children() {
        let arena = arena(&[[5.0, 5.0], [2.0, 8.0], [2.0, 1.0], [9.0, 5.0]]);
        assert_eq!(
            arena.to_string(),
            "[5.0, 5.0]  0\n  L [2.0, 8.0]  1\n    L [2.0, 1.0]  2\n  R [9.0, 5.0]  3"
        );
    }

    #[test]
    fn displays_deleted_marker() {
        let mut arena = arena(&[[5.0, 5.0], [2.0, 8.0]]);
        let before = arena.to_string();
        assert_eq!(before, "[5.0, 5.0]  0\n  L [2.0, 8.0]  1");
        arena.get_mut(1).deleted = true;
        assert_eq!(arena.to_string(), "[5.0, 5.0]  0\n  L [2.0, 8.0]  1*");
        assert_eq!(Arena::<f64, u8>::new(2).to_string(), "empty");
    }
}
