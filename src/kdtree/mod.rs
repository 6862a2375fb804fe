//! An implementation of a dynamic K-D Tree with soft deletion.

#![warn(missing_docs)]

mod index;
mod neighbors;
mod node;
mod point;
mod rect;
mod typed;

pub use index::KDTree;
pub use typed::{KDTreePoint, KeyPoint, TypedKDTree};
