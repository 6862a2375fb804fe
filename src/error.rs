use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KDTreeError {
    /// A call was made with an argument the tree cannot accept: a key of the wrong length, a key
    /// containing NaN, mismatched range bounds, or a non-positive dimension count.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No live entry matches the key passed to a delete.
    #[error("Key missing from tree.")]
    MissingKey,

    /// More neighbors were requested than there are live entries in the tree.
    #[error("Number of neighbors ({requested}) cannot be greater than number of nodes ({size}).")]
    NeighborsOutOfRange {
        /// The number of neighbors requested
        requested: usize,
        /// The live element count of the tree
        size: usize,
    },

    /// A [`KDTreePoint`][crate::kdtree::KDTreePoint] implementation returned coordinates whose
    /// length differs from the dimension the typed tree was fixed to. This is a bug in the key
    /// type, not a bad call.
    #[error("Key has {found} coordinates but the tree has {expected} dimensions. The KDTreePoint implementation must always return the same length.")]
    InconsistentKey {
        /// Dimensions of the tree
        expected: usize,
        /// Length of the coordinates returned by the key
        found: usize,
    },

    /// A typed tree was explicitly initialized after its dimension was already fixed.
    #[error("The underlying tree has already been initialized with {0} dimensions.")]
    AlreadyInitialized(usize),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, KDTreeError>;
