use std::fmt::Debug;

use num_traits::Float;

/// A trait for types that can be used as key coordinates.
///
/// This trait is sealed and cannot be implemented for external types. Only `f32` and `f64` are
/// supported: every distance and bound computation relies on IEEE infinities, and keys are
/// compared for exact equality per component.
pub trait CoordNum: private::Sealed + Float + Default + Debug + Send + Sync + 'static {}

impl CoordNum for f32 {}

impl CoordNum for f64 {}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}
