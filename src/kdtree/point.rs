//! Key helpers: validation, equality and distance over coordinate slices.

use geo_traits::CoordTrait;
use tinyvec::TinyVec;

use crate::error::{KDTreeError, Result};
use crate::r#type::CoordNum;

fn check_len<N: CoordNum>(key: &[N], dims: usize) -> Result<()> {
    if key.len() != dims {
        return Err(KDTreeError::InvalidArgument(format!(
            "Wrong key size: expected {} coordinates, got {}.",
            dims,
            key.len()
        )));
    }
    Ok(())
}

/// Check that `key` has exactly `dims` components, all finite.
///
/// An infinite component would make distances `inf - inf = NaN`, which has no place in the
/// neighbor ordering.
pub(crate) fn check_key<N: CoordNum>(key: &[N], dims: usize) -> Result<()> {
    check_len(key, dims)?;
    if !key.iter().all(|c| c.is_finite()) {
        return Err(KDTreeError::InvalidArgument(
            "Key coordinates must be finite.".to_string(),
        ));
    }
    Ok(())
}

/// Check a range bound. Unlike keys, bounds may be infinite.
pub(crate) fn check_bound<N: CoordNum>(bound: &[N], dims: usize) -> Result<()> {
    check_len(bound, dims)?;
    if bound.iter().any(|c| c.is_nan()) {
        return Err(KDTreeError::InvalidArgument(
            "Range bounds cannot be NaN.".to_string(),
        ));
    }
    Ok(())
}

/// Hashable identity of a key: two keys map to the same bits exactly when [`keys_equal`] holds.
pub(crate) type KeyBits = Vec<(u64, i16, i8)>;

pub(crate) fn key_bits<N: CoordNum>(key: &[N]) -> KeyBits {
    key.iter()
        .map(|&c| {
            // 0.0 == -0.0, so they must share an identity
            if c == N::zero() {
                N::zero().integer_decode()
            } else {
                c.integer_decode()
            }
        })
        .collect()
}

/// Exact per-component equality, no tolerance.
#[inline]
pub(crate) fn keys_equal<N: CoordNum>(a: &[N], b: &[N]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Squared euclidean distance between two keys of equal length.
#[inline]
pub(crate) fn sq_dist<N: CoordNum>(a: &[N], b: &[N]) -> N {
    a.iter().zip(b).fold(N::zero(), |acc, (&x, &y)| {
        let d = x - y;
        acc + d * d
    })
}

/// 1D distance from a value to a range.
#[inline]
pub(crate) fn axis_dist<N: CoordNum>(k: N, min: N, max: N) -> N {
    if k < min {
        min - k
    } else if k <= max {
        N::zero()
    } else {
        k - max
    }
}

/// Copy the components of a `geo-traits` coordinate into a key.
///
/// Coordinates have at most four dimensions, so this never allocates.
pub(crate) fn coord_to_key<N: CoordNum>(coord: &impl CoordTrait<T = N>) -> TinyVec<[N; 4]> {
    (0..coord.dim().size())
        .map(|n| coord.nth_or_panic(n))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn squared_distance_skips_the_root() {
        assert_eq!(sq_dist(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(sq_dist(&[1.0, -2.0, 3.0], &[1.0, -2.0, 3.0]), 0.0);
    }

    #[test]
    fn axis_distance_is_zero_inside_the_range() {
        assert_eq!(axis_dist(5.0, 0.0, 10.0), 0.0);
        assert_eq!(axis_dist(-2.0, 0.0, 10.0), 2.0);
        assert_eq!(axis_dist(13.0, 0.0, 10.0), 3.0);
        assert_eq!(axis_dist(1.0, f64::NEG_INFINITY, f64::INFINITY), 0.0);
    }

    #[test]
    fn keys_equal_is_exact() {
        assert!(keys_equal(&[1.0, 2.0], &[1.0, 2.0]));
        assert!(!keys_equal(&[1.0, 2.0], &[1.0, 2.000_000_1]));
        assert!(!keys_equal(&[1.0, 2.0], &[1.0]));
    }

    #[test]
    fn check_key_rejects_bad_keys() {
        assert!(check_key(&[1.0_f64, 2.0, 3.0], 3).is_ok());
        assert!(matches!(
            check_key(&[1.0_f64, 2.0], 3),
            Err(KDTreeError::InvalidArgument(_))
        ));
        assert!(matches!(
            check_key(&[1.0_f32, f32::NAN], 2),
            Err(KDTreeError::InvalidArgument(_))
        ));
        assert!(matches!(
            check_key(&[1.0_f64, f64::INFINITY], 2),
            Err(KDTreeError::InvalidArgument(_))
        ));
        assert!(matches!(
            check_key(&[f64::NEG_INFINITY], 1),
            Err(KDTreeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn bounds_may_be_infinite() {
        assert!(check_bound(&[f64::NEG_INFINITY, f64::INFINITY], 2).is_ok());
        assert!(check_bound(&[f64::NAN, 0.0], 2).is_err());
        assert!(check_bound(&[0.0], 2).is_err());
    }

    #[test]
    fn key_bits_follow_key_equality() {
        assert_eq!(key_bits(&[0.0_f64, 1.5]), key_bits(&[-0.0, 1.5]));
        assert_ne!(key_bits(&[1.0_f64, 2.0]), key_bits(&[1.0, 2.000_000_1]));
        assert_ne!(key_bits(&[1.0_f32]), key_bits(&[-1.0]));
    }

    #[test]
    fn converts_geo_coords() {
        let coord = geo_0_31::coord! { x: 1.5, y: -2.0 };
        assert_eq!(coord_to_key(&coord).as_slice(), &[1.5, -2.0]);
    }
}
