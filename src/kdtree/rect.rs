//! Axis-aligned hyper-rectangles bounding the region covered by a subtree.

use crate::kdtree::point::axis_dist;
use crate::r#type::CoordNum;

/// Per-dimension `[min, max]` bounds of the region a subtree can occupy.
///
/// A `HyperRect` is only built transiently during neighbor search, starting from the whole space
/// and narrowed at each split as the search descends. Nodes do not store one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HyperRect<N: CoordNum> {
    min: Vec<N>,
    max: Vec<N>,
}

impl<N: CoordNum> HyperRect<N> {
    /// A rectangle covering all of K-dimensional space.
    pub(crate) fn infinite(dims: usize) -> Self {
        Self {
            min: vec![N::neg_infinity(); dims],
            max: vec![N::infinity(); dims],
        }
    }

    /// Squared distance from `point` to the closest point inside this rectangle.
    ///
    /// Zero when `point` is inside.
    pub(crate) fn sq_dist_to(&self, point: &[N]) -> N {
        point
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .fold(N::zero(), |acc, (&k, (&min, &max))| {
                let d = axis_dist(k, min, max);
                acc + d * d
            })
    }

    #[inline]
    pub(crate) fn set_max(&mut self, axis: usize, value: N) {
        self.max[axis] = value;
    }

    #[inline]
    pub(crate) fn set_min(&mut self, axis: usize, value: N) {
        self.min[axis] = value;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn infinite_rect_contains_everything() {
        let rect = HyperRect::<f64>::infinite(3);
        assert_eq!(rect.sq_dist_to(&[1e300, -1e300, 0.0]), 0.0);
    }

    #[test]
    fn narrowed_rect_distance() {
        let mut rect = HyperRect::<f64>::infinite(2);
        rect.set_min(0, 10.0);
        rect.set_max(1, 2.0);
        // closest point is (10, 2)
        assert_eq!(rect.sq_dist_to(&[7.0, 6.0]), 9.0 + 16.0);

        rect.set_min(0, 0.0);
        assert_eq!(rect.sq_dist_to(&[7.0, 6.0]), 16.0);
    }
}
