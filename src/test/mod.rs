use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

mod properties;

/// Four 3D entries, two of them sharing a value.
pub(crate) fn points_3d() -> Vec<([f64; 3], &'static str)> {
    vec![
        ([1., 2., 3.], "A"),
        ([-1., -2., -3.], "B"),
        ([15., 10., -3.], "C"),
        ([10., 0., 0.], "C"),
    ]
}

/// Deterministic pseudo-random points in `[0, 100)²`.
pub(crate) fn scatter_2d() -> Vec<[f64; 2]> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..500)
        .map(|_| [rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)])
        .collect()
}
