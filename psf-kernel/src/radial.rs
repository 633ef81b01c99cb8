//! Closed-form radial PSF from Fourier-Bessel coefficients.
//!
//! With the pupil phase written as `Σ c_m J0(s_m ρ)`, the radial field at image
//! radius `r` is a sum of Bessel integrals with a known closed form
//! (Li, Xue and Blu, eq. 5):
//!
//! ```text
//! b      = 2π · r · NA / λ
//! R_m(r) = a · [s_m J1(s_m a) J0(b a) - b J0(s_m a) J1(b a)] / (s_m² - b²)
//! I(r,z) = |Σ_m R_m(r) c_m(z)|²
//! ```
//!
//! No numerical pupil integral is evaluated.

use crate::errors::{PsfError, PsfResult};
use crate::fourier_bessel::FourierBesselFit;
use crate::grid::CoordinateGrids;
use crate::params::OpticalParameters;
use crate::special::{j0, j1};
use log::debug;
use ndarray::{Array1, Array2, Axis};

/// Relative closeness of `s²` and `b²` at which the removable singularity is
/// replaced by its limit.
const SINGULARITY_RELATIVE_TOLERANCE: f64 = 1e-8;

/// `∫₀ᵃ J0(sρ) J0(bρ) ρ dρ` for one basis function at one image-space frequency.
///
/// At `b = s` the closed form is 0/0; the Lommel integral
/// `(a²/2)·[J0(sa)² + J1(sa)²]` is used instead.
pub fn bessel_radial_weight(scaling: f64, frequency: f64, pupil_limit: f64) -> f64 {
    let a = pupil_limit;
    let sa = scaling * a;
    let denom = scaling * scaling - frequency * frequency;

    if denom.abs() <= SINGULARITY_RELATIVE_TOLERANCE * scaling * scaling {
        let (j0_sa, j1_sa) = (j0(sa), j1(sa));
        return 0.5 * a * a * (j0_sa * j0_sa + j1_sa * j1_sa);
    }

    let ba = frequency * a;
    (scaling * j1(sa) * j0(ba) * a - frequency * j0(sa) * j1(ba) * a) / denom
}

/// Normalized radial intensity, indexed by (axial plane, radial sample).
#[derive(Debug, Clone, PartialEq)]
pub struct RadialProfile {
    pub values: Array2<f64>,
}

impl RadialProfile {
    /// Evaluate the radial intensity for every plane and normalize it to a peak of 1.
    ///
    /// # Errors
    /// `PsfError::NumericalDegeneracy` if the profile is identically zero or not finite.
    pub fn evaluate(
        optics: &OpticalParameters,
        grids: &CoordinateGrids,
        scaling: &Array1<f64>,
        fit: &FourierBesselFit,
    ) -> PsfResult<Self> {
        let frequency_scale =
            2.0 * std::f64::consts::PI * optics.numerical_aperture / optics.wavelength_um;

        // Shape is (radial samples, basis functions)
        let weights = Array2::from_shape_fn((grids.r.len(), scaling.len()), |(j, m)| {
            bessel_radial_weight(scaling[m], frequency_scale * grids.r[j], grids.pupil_limit)
        });

        let field_re = weights.dot(&fit.coefficients.mapv(|c| c.re));
        let field_im = weights.dot(&fit.coefficients.mapv(|c| c.im));

        let mut values = Array2::from_shape_fn((fit.planes(), grids.r.len()), |(p, j)| {
            field_re[[j, p]] * field_re[[j, p]] + field_im[[j, p]] * field_im[[j, p]]
        });

        let peak = values.iter().copied().fold(0.0, f64::max);
        if !peak.is_finite() || peak <= 0.0 || values.iter().any(|v| !v.is_finite()) {
            return Err(PsfError::NumericalDegeneracy(format!(
                "radial profile cannot be normalized (peak {peak:e})"
            )));
        }
        values.mapv_inplace(|v| v / peak);

        debug!(
            "Radial profile: {} planes x {} radial samples",
            values.len_of(Axis(0)),
            values.len_of(Axis(1))
        );

        Ok(Self { values })
    }

    pub fn planes(&self) -> usize {
        self.values.nrows()
    }

    /// Plane holding the global maximum, i.e. the best focus.
    pub fn best_focus_plane(&self) -> usize {
        let mut best = (0, f64::NEG_INFINITY);
        for ((plane, _), &value) in self.values.indexed_iter() {
            if value > best.1 {
                best = (plane, value);
            }
        }
        best.0
    }
}
