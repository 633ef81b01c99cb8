//! End-to-end PSF synthesis.
//!
//! [`PsfSynthesizer`] runs the stages in order (grids, pupil phase,
//! Fourier-Bessel fit, radial profile, pixel resampling) and owns nothing
//! beyond its two parameter sets. Every intermediate is created fresh per call.
//!
//! # Examples
//!
//! ```rust
//! use psf_kernel::synthesize_psf;
//!
//! let volume = synthesize_psf(16, Some(4)).unwrap();
//! assert_eq!(volume.dim(), (16, 16, 4));
//! ```

use crate::errors::{PsfError, PsfResult};
use crate::fourier_bessel::{scaling_factors, BasisMatrix, FourierBesselFit};
use crate::grid::CoordinateGrids;
use crate::params::{OpticalParameters, PrecisionParameters};
use crate::phase::PhaseField;
use crate::radial::RadialProfile;
use crate::resample::resample_volume;
use log::info;
use ndarray::Array3;
use std::time::Instant;

/// Volume and every read-only intermediate from one synthesis call.
#[derive(Debug, Clone)]
pub struct PsfSynthesis {
    pub grids: CoordinateGrids,
    pub phase: PhaseField,
    pub basis: BasisMatrix,
    pub fit: FourierBesselFit,
    pub profile: RadialProfile,
    /// Output volume indexed `(row, column, plane)`, maximum exactly 1
    pub volume: Array3<f64>,
}

/// Gibson-Lanni PSF synthesizer for one microscope configuration.
#[derive(Debug, Clone, Default)]
pub struct PsfSynthesizer {
    pub optics: OpticalParameters,
    pub precision: PrecisionParameters,
}

impl PsfSynthesizer {
    pub fn new(optics: OpticalParameters, precision: PrecisionParameters) -> Self {
        Self { optics, precision }
    }

    /// Synthesize the PSF volume only.
    pub fn synthesize(&self) -> PsfResult<Array3<f64>> {
        Ok(self.synthesize_detailed()?.volume)
    }

    /// Synthesize the PSF volume and keep the intermediates for diagnostics.
    ///
    /// # Errors
    /// * `PsfError::Configuration` - Invalid counts or physical parameters
    /// * `PsfError::DomainViolation` - A pupil sample unsupported by a refractive index
    /// * `PsfError::NumericalDegeneracy` - Singular fit or a vanishing profile
    /// * `PsfError::InterpolationDomain` - A pixel radius outside the radial grid
    pub fn synthesize_detailed(&self) -> PsfResult<PsfSynthesis> {
        let start = Instant::now();

        let grids = CoordinateGrids::build(&self.optics, &self.precision)?;
        let phase = PhaseField::synthesize(&self.optics, &grids)?;

        let scaling = scaling_factors(&self.optics, &self.precision);
        let basis = BasisMatrix::build(scaling, &grids.rho);
        let fit = FourierBesselFit::solve(&basis, &phase)?;

        let profile = RadialProfile::evaluate(&self.optics, &grids, &basis.scaling, &fit)?;

        let mut volume = resample_volume(
            &profile,
            &grids,
            self.precision.size,
            self.optics.lateral_pixel_um,
        )?;
        normalize_peak(&mut volume)?;

        info!(
            "Synthesized {:?} PSF volume in {:.2?} (fit rank {}/{}, best focus plane {})",
            volume.dim(),
            start.elapsed(),
            fit.rank,
            basis.basis_count(),
            profile.best_focus_plane()
        );

        Ok(PsfSynthesis {
            grids,
            phase,
            basis,
            fit,
            profile,
            volume,
        })
    }
}

/// Rescale so the brightest voxel is exactly 1.
///
/// For even sizes the array center falls between pixels, so the interpolated
/// peak sits slightly below the radial profile's peak.
fn normalize_peak(volume: &mut Array3<f64>) -> PsfResult<()> {
    let peak = volume.iter().copied().fold(0.0, f64::max);
    if !peak.is_finite() || peak <= 0.0 {
        return Err(PsfError::NumericalDegeneracy(format!(
            "PSF volume cannot be normalized (peak {peak:e})"
        )));
    }
    volume.mapv_inplace(|v| v / peak);
    Ok(())
}

/// Synthesize a `size x size x planes` PSF with the reference microscope.
///
/// # Arguments
/// * `size` - Lateral extent in pixels
/// * `axial_plane_count` - Number of planes, defaults to `size / 2`
///
/// # Errors
/// `PsfError::Configuration` if `size` or the resolved plane count is zero.
pub fn synthesize_psf(size: usize, axial_plane_count: Option<usize>) -> PsfResult<Array3<f64>> {
    let precision = PrecisionParameters::resolve(Some(size), axial_plane_count)?;
    PsfSynthesizer::new(OpticalParameters::default(), precision).synthesize()
}
