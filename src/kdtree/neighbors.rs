//! A fixed-capacity list of the best nearest-neighbor candidates seen so far.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::r#type::CoordNum;

/// A node id and its squared distance to the query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate<N: CoordNum> {
    pub(crate) id: usize,
    pub(crate) dist: N,
}

impl<N: CoordNum> Eq for Candidate<N> {}

impl<N: CoordNum> Ord for Candidate<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Keys are validated to be finite, so distances are always comparable.
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
    }
}

impl<N: CoordNum> PartialOrd for Candidate<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Holds at most `capacity` candidates, keeping the closest ones.
///
/// Backed by a max-heap on distance so the current worst candidate is always at the top and can
/// be evicted in `O(log n)`.
#[derive(Debug)]
pub(crate) struct NeighborList<N: CoordNum> {
    capacity: usize,
    heap: BinaryHeap<Candidate<N>>,
}

impl<N: CoordNum> NeighborList<N> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Squared distance of the worst candidate held, or infinity while the list is not full.
    #[inline]
    pub(crate) fn max_dist(&self) -> N {
        match self.heap.peek() {
            Some(worst) if self.is_full() => worst.dist,
            _ => N::infinity(),
        }
    }

    /// Offer a candidate. It is kept if there is room, or if it is closer than the current worst
    /// candidate, which is then evicted.
    pub(crate) fn offer(&mut self, id: usize, dist: N) {
        if self.capacity == 0 {
            return;
        }
        if !self.is_full() {
            self.heap.push(Candidate { id, dist });
        } else if dist < self.max_dist() {
            self.heap.pop();
            self.heap.push(Candidate { id, dist });
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Consume the list, returning node ids ordered from nearest to farthest.
    pub(crate) fn into_sorted_ids(self) -> Vec<usize> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|candidate| candidate.id)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_the_closest_candidates() {
        let mut list = NeighborList::<f64>::new(3);
        assert!(!list.is_full());
        assert_eq!(list.max_dist(), f64::INFINITY);

        list.offer(0, 9.0);
        list.offer(1, 1.0);
        list.offer(2, 25.0);
        assert!(list.is_full());
        assert_eq!(list.max_dist(), 25.0);

        // farther than the worst candidate, ignored
        list.offer(3, 36.0);
        assert_eq!(list.len(), 3);

        // evicts 2
        list.offer(4, 4.0);
        assert_eq!(list.max_dist(), 9.0);

        assert_eq!(list.into_sorted_ids(), vec![1, 4, 0]);
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut list = NeighborList::<f64>::new(0);
        assert!(list.is_full());
        list.offer(0, 1.0);
        assert_eq!(list.len(), 0);
        assert!(list.into_sorted_ids().is_empty());
    }
}
