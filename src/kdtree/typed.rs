//! A typed wrapper around [`KDTree`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Debug};

use tracing::debug;

use crate::error::{KDTreeError, Result};
use crate::kdtree::point::{check_key, key_bits, KeyBits};
use crate::kdtree::KDTree;
use crate::r#type::CoordNum;

/// A type that can be used as a key in a [`TypedKDTree`].
///
/// Implementations must return coordinates of the same length on every call, for every value of
/// the type. Returning `None` marks the key as absent: typed tree operations treat it as a no-op
/// or an empty result.
///
/// ```
/// use std::borrow::Cow;
/// use kd_index::kdtree::KDTreePoint;
///
/// struct Station {
///     name: String,
///     lon_lat: [f64; 2],
/// }
///
/// impl KDTreePoint for Station {
///     type Num = f64;
///
///     fn coordinates(&self) -> Option<Cow<'_, [f64]>> {
///         Some(Cow::Borrowed(&self.lon_lat))
///     }
/// }
/// ```
pub trait KDTreePoint {
    /// The coordinate scalar type
    type Num: CoordNum;

    /// The coordinates of this key, one per dimension.
    fn coordinates(&self) -> Option<Cow<'_, [Self::Num]>>;
}

impl<N: CoordNum, const D: usize> KDTreePoint for [N; D] {
    type Num = N;

    fn coordinates(&self) -> Option<Cow<'_, [N]>> {
        Some(Cow::Borrowed(self))
    }
}

impl<N: CoordNum> KDTreePoint for Vec<N> {
    type Num = N;

    fn coordinates(&self) -> Option<Cow<'_, [N]>> {
        Some(Cow::Borrowed(self))
    }
}

impl<P: KDTreePoint> KDTreePoint for Option<P> {
    type Num = P::Num;

    fn coordinates(&self) -> Option<Cow<'_, [P::Num]>> {
        self.as_ref().and_then(P::coordinates)
    }
}

impl<P: KDTreePoint + ?Sized> KDTreePoint for &P {
    type Num = P::Num;

    fn coordinates(&self) -> Option<Cow<'_, [P::Num]>> {
        (**self).coordinates()
    }
}

/// A key read back out of a tree.
///
/// The tree stores coordinates, not the caller's key objects, so keys returned by
/// [`TypedKDTree::nearest_keys`] and [`TypedKDTree::to_map`] come back as this type.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPoint<N: CoordNum>(Box<[N]>);

impl<N: CoordNum> KeyPoint<N> {
    /// The coordinates of this key.
    pub fn as_slice(&self) -> &[N] {
        &self.0
    }

    /// Consume this key, returning its coordinates.
    pub fn into_inner(self) -> Box<[N]> {
        self.0
    }
}

impl<N: CoordNum> From<&[N]> for KeyPoint<N> {
    fn from(value: &[N]) -> Self {
        Self(value.into())
    }
}

impl<N: CoordNum> KDTreePoint for KeyPoint<N> {
    type Num = N;

    fn coordinates(&self) -> Option<Cow<'_, [N]>> {
        Some(Cow::Borrowed(&self.0))
    }
}

/// A [`KDTree`] keyed by any [`KDTreePoint`] type.
///
/// Differences from the untyped tree:
///
/// - The underlying tree is created lazily by the first insertion, and the length of that first
///   key fixes the tree's dimension from then on. [`initialize`][TypedKDTree::initialize] fixes it
///   up front instead.
/// - An absent key (one whose [`coordinates`][KDTreePoint::coordinates] are `None`) is never an
///   error: mutations skip it and queries return nothing.
/// - The neighbor count passed to [`nearest`][TypedKDTree::nearest] is clamped to the tree size.
/// - Deleting a missing key is a no-op.
/// - Mutations return the tree itself for chaining, and remember what they changed; see
///   [`last_value`][TypedKDTree::last_value] and [`last_values`][TypedKDTree::last_values].
/// - The only error a well-formed call can hit is [`KDTreeError::InconsistentKey`], raised when a
///   key's coordinates do not match the tree's dimension.
///
/// ```
/// use kd_index::kdtree::TypedKDTree;
///
/// let mut tree = TypedKDTree::<[f64; 3], &str>::new();
/// tree.insert([1., 2., 3.], "Yes!")?
///     .insert([-1., -2., -3.], "No!")?;
///
/// let maybe = tree.insert([0., 0., 0.], "Maybe")?.last_value();
/// assert_eq!(maybe, Some(&"Maybe"));
/// assert_eq!(tree.nearest_one(&[0.9, 2., 3.])?, Some(&"Yes!"));
/// # Ok::<(), kd_index::KDTreeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TypedKDTree<K: KDTreePoint, V> {
    tree: Option<KDTree<K::Num, V>>,
    last_values: Vec<(K, V)>,
    // position of each recorded key in `last_values`
    last_index: HashMap<KeyBits, usize>,
    last_key: Option<usize>,
}

impl<K: KDTreePoint, V> Default for TypedKDTree<K, V> {
    fn default() -> Self {
        Self {
            tree: None,
            last_values: vec![],
            last_index: HashMap::new(),
            last_key: None,
        }
    }
}

impl<K: KDTreePoint, V> TypedKDTree<K, V> {
    /// Create an empty tree. Its dimension is fixed by the first insertion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree with a fixed dimension.
    pub fn with_dimensions(dimensions: usize) -> Result<Self> {
        let mut tree = Self::new();
        tree.initialize(dimensions)?;
        Ok(tree)
    }

    /// Fix the dimension of the tree before anything is inserted.
    ///
    /// Fails with [`KDTreeError::InvalidArgument`] if `dimensions` is zero and with
    /// [`KDTreeError::AlreadyInitialized`] if the dimension is already fixed.
    pub fn initialize(&mut self, dimensions: usize) -> Result<()> {
        if dimensions < 1 {
            return Err(KDTreeError::InvalidArgument(
                "Keys must have at least one dimension.".to_string(),
            ));
        }
        if let Some(tree) = &self.tree {
            return Err(KDTreeError::AlreadyInitialized(tree.dimensions()));
        }

        self.tree = Some(KDTree::new(dimensions)?);
        debug!(dimensions, "initialized typed tree");
        Ok(())
    }

    /// Coordinates of `key`, checked against the tree's dimension once it is fixed.
    fn coords_of<'k>(&self, key: &'k K) -> Result<Option<Cow<'k, [K::Num]>>> {
        let Some(coords) = key.coordinates() else {
            return Ok(None);
        };

        if let Some(tree) = &self.tree {
            if coords.len() != tree.dimensions() {
                return Err(KDTreeError::InconsistentKey {
                    expected: tree.dimensions(),
                    found: coords.len(),
                });
            }
        }
        Ok(Some(coords))
    }

    /// The value stored at `key`, or `None` if there is none or `key` is absent.
    pub fn search(&self, key: &K) -> Result<Option<&V>> {
        let (Some(tree), Some(coords)) = (&self.tree, self.coords_of(key)?) else {
            return Ok(None);
        };
        tree.search(&coords)
    }

    /// The value whose key is nearest to `key`, or `None` if the tree is empty or `key` is
    /// absent.
    pub fn nearest_one(&self, key: &K) -> Result<Option<&V>> {
        let (Some(tree), Some(coords)) = (&self.tree, self.coords_of(key)?) else {
            return Ok(None);
        };
        if tree.is_empty() {
            return Ok(None);
        }
        tree.nearest_one(&coords).map(Some)
    }

    /// The values of the `n` entries nearest to `key`, in ascending order of distance.
    ///
    /// Returns every entry if `n` exceeds the tree size, and nothing if `key` is absent.
    pub fn nearest(&self, key: &K, n: usize) -> Result<Vec<&V>> {
        let (Some(tree), Some(coords)) = (&self.tree, self.coords_of(key)?) else {
            return Ok(vec![]);
        };
        tree.nearest(&coords, n.min(tree.size()))
    }

    /// The keys of the `n` entries nearest to `key`, in ascending order of distance.
    ///
    /// Returns every key if `n` exceeds the tree size, and nothing if `key` is absent.
    pub fn nearest_keys(&self, key: &K, n: usize) -> Result<Vec<KeyPoint<K::Num>>> {
        let (Some(tree), Some(coords)) = (&self.tree, self.coords_of(key)?) else {
            return Ok(vec![]);
        };
        Ok(tree
            .nearest_keys(&coords, n.min(tree.size()))?
            .into_iter()
            .map(KeyPoint::from)
            .collect())
    }

    /// The values of all entries within `[low, high]` on every axis, bounds inclusive.
    ///
    /// Returns nothing if either bound is absent.
    pub fn range(&self, low: &K, high: &K) -> Result<Vec<&V>> {
        let (Some(tree), Some(low), Some(high)) =
            (&self.tree, self.coords_of(low)?, self.coords_of(high)?)
        else {
            return Ok(vec![]);
        };
        tree.range(&low, &high)
    }

    /// All live entries, ordered top-down and left-to-right.
    pub fn to_map(&self) -> Vec<(KeyPoint<K::Num>, &V)> {
        self.tree
            .as_ref()
            .and_then(KDTree::to_map)
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (KeyPoint::from(key), value))
            .collect()
    }

    /// The value inserted or deleted by the most recent mutation, or `None` if it changed
    /// nothing.
    pub fn last_value(&self) -> Option<&V> {
        self.last_key
            .and_then(|index| self.last_values.get(index))
            .map(|(_, value)| value)
    }

    /// Every key and value changed by the most recent mutation, in the order they were applied.
    ///
    /// A batch call records all of its entries; any other call replaces the record.
    pub fn last_values(&self) -> &[(K, V)] {
        &self.last_values
    }

    /// The number of live entries, or 0 before the dimension is fixed.
    pub fn size(&self) -> usize {
        self.tree.as_ref().map_or(0, KDTree::size)
    }

    /// Returns `true` if the tree has no live entries.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The number of dimensions, or 0 before it is fixed.
    pub fn dimensions(&self) -> usize {
        self.tree.as_ref().map_or(0, KDTree::dimensions)
    }

    /// The number of nodes physically held by the tree, deleted ones included.
    pub fn num_nodes(&self) -> usize {
        self.tree.as_ref().map_or(0, KDTree::num_nodes)
    }

    fn clear_last(&mut self) {
        self.last_values.clear();
        self.last_index.clear();
        self.last_key = None;
    }

    /// Remember `key`, whose coordinates hash to `bits`, as changed to `value` by the current
    /// call.
    fn record(&mut self, key: K, bits: KeyBits, value: V) {
        let index = match self.last_index.get(&bits) {
            Some(&index) => {
                self.last_values[index].1 = value;
                index
            }
            None => {
                self.last_values.push((key, value));
                let index = self.last_values.len() - 1;
                self.last_index.insert(bits, index);
                index
            }
        };
        self.last_key = Some(index);
    }

    /// Rebuild the tree from its live entries, inserted from nearest to farthest from `center`.
    ///
    /// See [`KDTree::optimize`]. Does nothing before the dimension is fixed. Fails with
    /// [`KDTreeError::InvalidArgument`] if `center` is absent.
    pub fn optimize(&mut self, center: &K) -> Result<()> {
        if self.tree.is_none() {
            return Ok(());
        }
        let Some(coords) = self.coords_of(center)? else {
            return Err(KDTreeError::InvalidArgument(
                "A center point is required to optimize the tree.".to_string(),
            ));
        };

        match self.tree.as_mut() {
            Some(tree) => tree.optimize(&coords),
            None => Ok(()),
        }
    }
}

impl<K: KDTreePoint, V: Clone> TypedKDTree<K, V> {
    /// Insert a value at `key`, fixing the tree's dimension if this is the first insertion.
    ///
    /// Skipped if `key` is absent.
    pub fn insert(&mut self, key: K, value: V) -> Result<&mut Self> {
        self.clear_last();
        self.insert_entry(key, value)?;
        Ok(self)
    }

    /// Insert every key-value pair, recording all of them for
    /// [`last_values`][TypedKDTree::last_values].
    ///
    /// Pairs are applied one at a time: if one fails, the pairs before it stay inserted.
    pub fn insert_many(&mut self, entries: impl IntoIterator<Item = (K, V)>) -> Result<&mut Self> {
        self.clear_last();
        for (key, value) in entries {
            self.insert_entry(key, value)?;
        }
        Ok(self)
    }

    fn insert_entry(&mut self, key: K, value: V) -> Result<()> {
        let bits = {
            let Some(coords) = self.coords_of(&key)? else {
                return Ok(());
            };
            if self.tree.is_none() {
                // only a key the tree accepts may fix the dimension
                check_key(&coords, coords.len())?;
                self.initialize(coords.len())?;
            }
            if let Some(tree) = self.tree.as_mut() {
                tree.insert(&coords, value.clone())?;
            }
            key_bits(&coords)
        };

        self.record(key, bits, value);
        Ok(())
    }
}

impl<K: KDTreePoint + Clone, V: Clone> TypedKDTree<K, V> {
    /// Delete the entry at `key`.
    ///
    /// Skipped if `key` is absent or has no live entry.
    pub fn delete(&mut self, key: &K) -> Result<&mut Self> {
        self.clear_last();
        self.delete_entry(key)?;
        Ok(self)
    }

    /// Delete every key, recording all deleted entries for
    /// [`last_values`][TypedKDTree::last_values].
    ///
    /// Keys are applied one at a time: if one fails, the keys before it stay deleted.
    pub fn delete_many<'a>(&mut self, keys: impl IntoIterator<Item = &'a K>) -> Result<&mut Self>
    where
        K: 'a,
    {
        self.clear_last();
        for key in keys {
            self.delete_entry(key)?;
        }
        Ok(self)
    }

    fn delete_entry(&mut self, key: &K) -> Result<()> {
        let Some(coords) = self.coords_of(key)? else {
            return Ok(());
        };
        let Some(tree) = self.tree.as_mut() else {
            return Ok(());
        };
        let Some(value) = tree.search(&coords)?.cloned() else {
            return Ok(());
        };

        tree.delete(&coords)?;
        let bits = key_bits(&coords);
        self.record(key.clone(), bits, value);
        Ok(())
    }
}

impl<K: KDTreePoint, V: Debug> fmt::Display for TypedKDTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tree {
            Some(tree) => fmt::Display::fmt(tree, f),
            None => f.write_str("empty"),
        }
    }
}
