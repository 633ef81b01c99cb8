//! Fourier-Bessel approximation of the sampled pupil phase.
//!
//! The phase on each axial plane is expressed as a linear combination of
//! rescaled zeroth-order Bessel functions,
//!
//! ```text
//! exp(iW(ρ, z)) ≈ Σ_m c_m(z) · J0(s_m ρ),    s_m = NA · (3m - 2) · λ_ref / λ
//! ```
//!
//! The scaling sequence gives successive bases roughly evenly spaced zero
//! crossings across the pupil. Coefficients come from a truncated-SVD least
//! squares solve: the basis is factored once and every plane reuses the same
//! pseudo-inverse, so the per-plane solves are independent and run in parallel.

use crate::errors::{PsfError, PsfResult};
use crate::params::{OpticalParameters, PrecisionParameters};
use crate::phase::PhaseField;
use crate::special::j0;
use log::debug;
use nalgebra::DMatrix;
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;

/// Upper bound on SVD sweeps before the factorization is declared divergent.
const SVD_MAX_ITERATIONS: usize = 10_000;

/// Rescaling factors `s_m` for `m = 1..=basis_count`.
pub fn scaling_factors(optics: &OpticalParameters, precision: &PrecisionParameters) -> Array1<f64> {
    let scale = optics.numerical_aperture * precision.basis_reference_wavelength_um
        / optics.wavelength_um;
    Array1::from_shape_fn(precision.basis_count, |i| {
        let m = (i + 1) as f64;
        scale * (3.0 * m - 2.0)
    })
}

/// Bessel basis evaluated on the pupil grid, indexed by (basis, pupil sample).
#[derive(Debug, Clone, PartialEq)]
pub struct BasisMatrix {
    /// Rescaling factor of each basis function
    pub scaling: Array1<f64>,
    /// `J0(s_m · ρ_j)`
    pub values: Array2<f64>,
}

impl BasisMatrix {
    pub fn build(scaling: Array1<f64>, rho: &Array1<f64>) -> Self {
        let values = Array2::from_shape_fn((scaling.len(), rho.len()), |(m, j)| {
            j0(scaling[m] * rho[j])
        });
        Self { scaling, values }
    }

    pub fn basis_count(&self) -> usize {
        self.values.nrows()
    }

    pub fn sample_count(&self) -> usize {
        self.values.ncols()
    }
}

/// Least-squares Fourier-Bessel coefficients, indexed by (basis, axial plane).
#[derive(Debug, Clone, PartialEq)]
pub struct FourierBesselFit {
    pub coefficients: Array2<Complex64>,
    /// Number of singular values retained by the solve
    pub rank: usize,
    /// Ratio of the largest to the smallest retained singular value
    pub condition_number: f64,
}

impl FourierBesselFit {
    /// Solve `basisᵀ · C = phaseᵀ` for every plane in the least-squares sense.
    ///
    /// Singular values below `σ_max · ε · max(samples, basis)` count as zero.
    ///
    /// # Errors
    /// `PsfError::NumericalDegeneracy` if the SVD fails to converge, any basis
    /// function is linearly dependent on the others within that tolerance (this
    /// includes fewer pupil samples than basis functions), or the solution
    /// contains non-finite values.
    pub fn solve(basis: &BasisMatrix, phase: &PhaseField) -> PsfResult<Self> {
        let samples = basis.sample_count();
        let basis_count = basis.basis_count();
        if phase.samples() != samples {
            return Err(PsfError::NumericalDegeneracy(format!(
                "phase has {} pupil samples but the basis has {samples}",
                phase.samples()
            )));
        }

        let design = DMatrix::from_fn(samples, basis_count, |j, m| basis.values[[m, j]]);
        let svd = design
            .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
            .ok_or_else(|| {
                PsfError::NumericalDegeneracy("SVD of the Bessel basis did not converge".into())
            })?;

        let sigma_max = svd.singular_values.iter().copied().fold(0.0, f64::max);
        if !sigma_max.is_finite() || sigma_max <= 0.0 {
            return Err(PsfError::NumericalDegeneracy(format!(
                "Bessel basis is singular (largest singular value {sigma_max:e})"
            )));
        }

        let tolerance = sigma_max * f64::EPSILON * samples.max(basis_count) as f64;
        let rank = svd.rank(tolerance);
        let sigma_min = svd
            .singular_values
            .iter()
            .copied()
            .filter(|sigma| *sigma > tolerance)
            .fold(f64::INFINITY, f64::min);
        let condition_number = sigma_max / sigma_min;

        if rank < basis_count {
            return Err(PsfError::NumericalDegeneracy(format!(
                "Bessel basis is rank deficient: rank {rank} of {basis_count} with {samples} pupil samples (condition {condition_number:.3e})"
            )));
        }

        let pinv = svd
            .pseudo_inverse(tolerance)
            .map_err(|e| PsfError::NumericalDegeneracy(e.to_string()))?;
        let pinv = Array2::from_shape_fn((pinv.nrows(), pinv.ncols()), |(m, j)| pinv[(m, j)]);

        let mut coefficients = Array2::<Complex64>::zeros((basis_count, phase.planes()));
        coefficients
            .axis_iter_mut(Axis(1))
            .into_par_iter()
            .zip(phase.values.axis_iter(Axis(0)).into_par_iter())
            .for_each(|(mut column, plane_phase)| {
                let re = pinv.dot(&plane_phase.mapv(|c| c.re));
                let im = pinv.dot(&plane_phase.mapv(|c| c.im));
                for (m, value) in column.iter_mut().enumerate() {
                    *value = Complex64::new(re[m], im[m]);
                }
            });

        if coefficients.iter().any(|c| !c.re.is_finite() || !c.im.is_finite()) {
            return Err(PsfError::NumericalDegeneracy(
                "Fourier-Bessel coefficients are not finite".into(),
            ));
        }

        debug!(
            "Fourier-Bessel fit: {basis_count} bases x {} planes, rank {rank}, condition {condition_number:.3e}",
            phase.planes()
        );

        Ok(Self {
            coefficients,
            rank,
            condition_number,
        })
    }

    pub fn planes(&self) -> usize {
        self.coefficients.ncols()
    }

    fn check_plane(&self, plane: usize) -> PsfResult<()> {
        if plane >= self.planes() {
            return Err(PsfError::configuration(
                "plane",
                format!("plane {plane} out of range (0..{})", self.planes()),
            ));
        }
        Ok(())
    }

    /// Fourier-Bessel estimate of the pupil phase on one plane.
    ///
    /// # Errors
    /// `PsfError::Configuration` if `plane` is out of range or `basis` does not
    /// match the fitted coefficients.
    pub fn reconstruct_plane(
        &self,
        basis: &BasisMatrix,
        plane: usize,
    ) -> PsfResult<Array1<Complex64>> {
        self.check_plane(plane)?;
        if basis.basis_count() != self.coefficients.nrows() {
            return Err(PsfError::configuration(
                "basis",
                format!(
                    "{} basis functions but {} fitted coefficients",
                    basis.basis_count(),
                    self.coefficients.nrows()
                ),
            ));
        }
        let column = self.coefficients.column(plane);
        Ok(Array1::from_shape_fn(basis.sample_count(), |j| {
            basis
                .values
                .column(j)
                .iter()
                .zip(column.iter())
                .map(|(b, c)| *c * *b)
                .sum::<Complex64>()
        }))
    }

    /// Root-mean-square distance between the estimate and the sampled phase on one plane.
    ///
    /// # Errors
    /// `PsfError::Configuration` if `plane` is out of range or the basis and
    /// phase disagree with the fit.
    pub fn residual_rms(
        &self,
        basis: &BasisMatrix,
        phase: &PhaseField,
        plane: usize,
    ) -> PsfResult<f64> {
        let estimate = self.reconstruct_plane(basis, plane)?;
        if phase.planes() != self.planes() || phase.samples() != estimate.len() {
            return Err(PsfError::configuration(
                "phase",
                format!(
                    "phase field is {} x {} but the fit expects {} x {}",
                    phase.planes(),
                    phase.samples(),
                    self.planes(),
                    estimate.len()
                ),
            ));
        }
        let sampled = phase.values.row(plane);
        let sum_sq: f64 = estimate
            .iter()
            .zip(sampled.iter())
            .map(|(e, s)| (e - s).norm_sqr())
            .sum();
        Ok((sum_sq / estimate.len() as f64).sqrt())
    }
}
