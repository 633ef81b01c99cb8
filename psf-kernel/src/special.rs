//! Bessel functions of the first kind.
//!
//! The Fourier-Bessel basis and the closed-form radial integral need J0 and J1
//! at arguments up to a few hundred, well past where a plain power series stays
//! accurate. Both are delegated to `libm`, whose implementations switch to
//! asymptotic forms for large arguments.

/// Zeroth-order Bessel function of the first kind, J0(x).
#[inline]
pub fn j0(x: f64) -> f64 {
    libm::j0(x)
}

/// First-order Bessel function of the first kind, J1(x).
#[inline]
pub fn j1(x: f64) -> f64 {
    libm::j1(x)
}
