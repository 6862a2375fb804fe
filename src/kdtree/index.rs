use std::fmt::{self, Debug};

use geo_traits::{CoordTrait, RectTrait};
use tracing::{debug, trace};

use crate::error::{KDTreeError, Result};
use crate::kdtree::node::{Arena, Inserted};
use crate::kdtree::point::{check_bound, check_key, coord_to_key};
use crate::r#type::CoordNum;

/// A K-dimensional tree mapping floating-point keys to values.
///
/// The splitting axis is chosen naively, by depth modulo K, so the shape of the tree is purely a
/// function of insertion order. Keys are copied into the tree on insertion; values are moved in
/// and can be modified in place through [`search_mut`][KDTree::search_mut].
///
/// Deletion only marks an entry as deleted. The node stays in the tree, still routing searches,
/// until [`optimize`][KDTree::optimize] rebuilds the tree from its live entries.
///
/// ```
/// use kd_index::kdtree::KDTree;
///
/// let mut tree = KDTree::new(3).unwrap();
/// tree.insert(&[1., 2., 3.], "A").unwrap();
/// tree.insert(&[-1., -2., -3.], "B").unwrap();
/// tree.insert(&[15., 10., -3.], "C").unwrap();
/// tree.insert(&[10., 0., 0.], "C").unwrap();
///
/// assert_eq!(tree.size(), 4);
/// assert_eq!(tree.search(&[15., 10., -3.]).unwrap(), Some(&"C"));
/// assert_eq!(tree.nearest_one(&[0., -2., -3.]).unwrap(), &"B");
/// assert_eq!(
///     tree.range(&[0., 0., 0.], &[20., 20., 20.]).unwrap(),
///     vec![&"A", &"C"]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct KDTree<N: CoordNum, V> {
    arena: Arena<N, V>,
    dims: usize,
    count: usize,
}

impl<N: CoordNum, V> KDTree<N, V> {
    /// Create an empty tree whose keys have `dimensions` coordinates.
    ///
    /// Fails with [`KDTreeError::InvalidArgument`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions < 1 {
            return Err(KDTreeError::InvalidArgument(
                "Tree must have at least one dimension.".to_string(),
            ));
        }

        Ok(Self {
            arena: Arena::new(dimensions),
            dims: dimensions,
            count: 0,
        })
    }

    /// Insert a value at `key`. Every coordinate must be finite.
    ///
    /// If a live entry already has this exact key its value is replaced and the size does not
    /// change. If a deleted entry has this key it is brought back with the new value.
    pub fn insert(&mut self, key: &[N], value: V) -> Result<()> {
        check_key(key, self.dims)?;

        let inserted = self.arena.insert(key.into(), value);
        if inserted == Inserted::Revived {
            trace!("revived deleted key {:?}", key);
        }
        if inserted.is_new_entry() {
            self.count += 1;
        }
        Ok(())
    }

    /// Find the value whose key is identical to `key`.
    ///
    /// Returns `None` if there is no live entry with this key.
    pub fn search(&self, key: &[N]) -> Result<Option<&V>> {
        check_key(key, self.dims)?;
        Ok(self.arena.find(key).map(|id| &self.arena.get(id).value))
    }

    /// Mutable access to the value whose key is identical to `key`.
    pub fn search_mut(&mut self, key: &[N]) -> Result<Option<&mut V>> {
        check_key(key, self.dims)?;
        Ok(self
            .arena
            .find(key)
            .map(|id| &mut self.arena.get_mut(id).value))
    }

    /// Mark the entry at `key` as deleted.
    ///
    /// The node is kept, so the tree does not shrink; call [`optimize`][KDTree::optimize] to
    /// discard deleted nodes. Fails with [`KDTreeError::MissingKey`] if no live entry has this
    /// key, including when it was already deleted.
    pub fn delete(&mut self, key: &[N]) -> Result<()> {
        check_key(key, self.dims)?;

        let id = self.arena.find(key).ok_or(KDTreeError::MissingKey)?;
        self.arena.get_mut(id).deleted = true;
        self.count -= 1;
        trace!("deleted key {:?}", key);
        Ok(())
    }

    /// The value whose key is nearest to `key`.
    ///
    /// Equivalent to `nearest(key, 1)`; fails with [`KDTreeError::NeighborsOutOfRange`] if the
    /// tree has no live entries.
    pub fn nearest_one(&self, key: &[N]) -> Result<&V> {
        let ids = self.nearest_ids(key, 1)?;
        Ok(&self.arena.get(ids[0]).value)
    }

    /// The values of the `n` entries nearest to `key`, in ascending order of distance.
    ///
    /// Fails with [`KDTreeError::NeighborsOutOfRange`] if `n` is greater than
    /// [`size`][KDTree::size].
    pub fn nearest(&self, key: &[N], n: usize) -> Result<Vec<&V>> {
        Ok(self
            .nearest_ids(key, n)?
            .into_iter()
            .map(|id| &self.arena.get(id).value)
            .collect())
    }

    /// The keys of the `n` entries nearest to `key`, in ascending order of distance.
    pub fn nearest_keys(&self, key: &[N], n: usize) -> Result<Vec<&[N]>> {
        Ok(self
            .nearest_ids(key, n)?
            .into_iter()
            .map(|id| &*self.arena.get(id).key)
            .collect())
    }

    /// The values of the `n` entries nearest to the given coordinate, in ascending order of
    /// distance.
    ///
    /// The coordinate's dimension must match the tree's.
    pub fn nearest_coord(&self, coord: &impl CoordTrait<T = N>, n: usize) -> Result<Vec<&V>> {
        self.nearest(&coord_to_key(coord), n)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(n = n))]
    fn nearest_ids(&self, key: &[N], n: usize) -> Result<Vec<usize>> {
        check_key(key, self.dims)?;
        if n > self.count {
            return Err(KDTreeError::NeighborsOutOfRange {
                requested: n,
                size: self.count,
            });
        }

        Ok(self.arena.nearest(key, n))
    }

    /// The values of all entries whose keys fall within `[low, high]` on every axis, bounds
    /// inclusive.
    ///
    /// Results are in traversal order: left subtree, node, right subtree. If `low` exceeds
    /// `high` on any axis the result is empty. Bounds may be infinite.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn range(&self, low: &[N], high: &[N]) -> Result<Vec<&V>> {
        if low.len() != high.len() {
            return Err(KDTreeError::InvalidArgument(format!(
                "Range bounds have different sizes: {} and {}.",
                low.len(),
                high.len()
            )));
        }
        check_bound(low, self.dims)?;
        check_bound(high, self.dims)?;

        Ok(self
            .arena
            .range(low, high)
            .into_iter()
            .map(|id| &self.arena.get(id).value)
            .collect())
    }

    /// The values of all entries within the given rectangle, bounds inclusive.
    ///
    /// The rectangle's dimension must match the tree's.
    pub fn range_rect(&self, rect: &impl RectTrait<T = N>) -> Result<Vec<&V>> {
        self.range(&coord_to_key(&rect.min()), &coord_to_key(&rect.max()))
    }

    /// All live entries, ordered top-down and left-to-right: each node comes before its left
    /// subtree, which comes before its right subtree.
    ///
    /// Returns `None` if nothing was ever inserted (or the tree was optimized while empty).
    pub fn to_map(&self) -> Option<Vec<(&[N], &V)>> {
        if self.arena.is_empty() {
            return None;
        }

        Some(
            self.arena
                .live_preorder()
                .into_iter()
                .map(|id| {
                    let node = self.arena.get(id);
                    (&*node.key, &node.value)
                })
                .collect(),
        )
    }

    /// Rebuild the tree from its live entries, inserted from nearest to farthest from `center`.
    ///
    /// Deleted nodes are discarded, and entries close to `center` end up near the root. This
    /// reshapes the tree but does not balance it.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn optimize(&mut self, center: &[N]) -> Result<()> {
        check_key(center, self.dims)?;
        debug!(size = self.count, nodes = self.num_nodes(), "optimizing tree");

        let order = self.arena.nearest(center, self.count);
        let old = std::mem::replace(&mut self.arena, Arena::new(self.dims));
        let mut slots = old.into_slots();
        for id in order {
            if let Some(node) = slots.get_mut(id).and_then(Option::take) {
                self.arena.insert(node.key, node.value);
            }
        }
        debug_assert_eq!(self.arena.len(), self.count);

        debug!(nodes = self.num_nodes(), "optimized tree");
        Ok(())
    }

    /// The number of live entries in this tree.
    pub fn size(&self) -> usize {
        self.count
    }

    /// Returns `true` if the tree has no live entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The number of dimensions of this tree's keys.
    pub fn dimensions(&self) -> usize {
        self.dims
    }

    /// The number of nodes physically held by the tree, deleted ones included.
    pub fn num_nodes(&self) -> usize {
        self.arena.len()
    }
}

/// Renders one line per node in pre-order, marking deleted nodes with `*`.
impl<N: CoordNum, V: Debug> fmt::Display for KDTree<N, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.arena, f)
    }
}
