//! Pupil phase synthesis from the Gibson-Lanni optical path difference.
//!
//! The optical path difference (OPD) between design and experimental conditions
//! is the sum of three layer contributions, each built from the direction cosine
//! term `sqrt(n² - NA²ρ²)`:
//!
//! ```text
//! OPD_s = pZ · sqrt(ns² - NA²ρ²)
//! OPD_i = (z + ti0) · sqrt(ni² - NA²ρ²) - ti0 · sqrt(ni0² - NA²ρ²)
//! OPD_g = tg · sqrt(ng² - NA²ρ²) - tg0 · sqrt(ng0² - NA²ρ²)
//! W     = 2π/λ · (OPD_s + OPD_i + OPD_g)
//! ```
//!
//! The sampled pupil phase is the unit phasor `exp(iW)`.

use crate::errors::{PsfError, PsfResult};
use crate::grid::CoordinateGrids;
use crate::params::OpticalParameters;
use log::debug;
use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Radicands this far below zero (relative to n²) are rounding noise at ρ = a.
const RADICAND_RELATIVE_TOLERANCE: f64 = 1e-12;

/// `sqrt(n² - NA²ρ²)` for one layer, failing on a genuinely negative radicand.
fn direction_cosine_term(
    index_name: &'static str,
    refractive_index: f64,
    numerical_aperture: f64,
    pupil_radius: f64,
) -> PsfResult<f64> {
    let transverse = numerical_aperture * pupil_radius;
    let radicand = refractive_index * refractive_index - transverse * transverse;

    if radicand >= 0.0 {
        return Ok(radicand.sqrt());
    }

    if radicand >= -RADICAND_RELATIVE_TOLERANCE * refractive_index * refractive_index {
        return Ok(0.0);
    }

    Err(PsfError::DomainViolation {
        index_name,
        refractive_index,
        numerical_aperture,
        pupil_radius,
        radicand,
    })
}

/// Specimen-layer OPD, independent of the stage position.
pub fn specimen_opd(optics: &OpticalParameters, rho: f64) -> PsfResult<f64> {
    let ns = direction_cosine_term(
        "specimen_index",
        optics.specimen_index,
        optics.numerical_aperture,
        rho,
    )?;
    Ok(optics.particle_depth_um * ns)
}

/// Immersion-layer OPD at stage displacement `z`.
pub fn immersion_opd(optics: &OpticalParameters, z: f64, rho: f64) -> PsfResult<f64> {
    let (experimental, design) = immersion_terms(optics, rho)?;
    let ti0 = optics.working_distance_design_um;
    Ok((z + ti0) * experimental - ti0 * design)
}

/// Coverslip-layer OPD, independent of the stage position.
pub fn coverslip_opd(optics: &OpticalParameters, rho: f64) -> PsfResult<f64> {
    let na = optics.numerical_aperture;
    let experimental = direction_cosine_term("coverslip_index", optics.coverslip_index, na, rho)?;
    let design = direction_cosine_term(
        "coverslip_index_design",
        optics.coverslip_index_design,
        na,
        rho,
    )?;
    Ok(optics.coverslip_thickness_um * experimental
        - optics.coverslip_thickness_design_um * design)
}

/// Wavefront aberration `W(ρ, z)` in radians.
pub fn wavefront_aberration(optics: &OpticalParameters, z: f64, rho: f64) -> PsfResult<f64> {
    let opd = specimen_opd(optics, rho)?
        + immersion_opd(optics, z, rho)?
        + coverslip_opd(optics, rho)?;
    Ok(optics.wavenumber() * opd)
}

fn immersion_terms(optics: &OpticalParameters, rho: f64) -> PsfResult<(f64, f64)> {
    let na = optics.numerical_aperture;
    let experimental = direction_cosine_term("immersion_index", optics.immersion_index, na, rho)?;
    let design = direction_cosine_term(
        "immersion_index_design",
        optics.immersion_index_design,
        na,
        rho,
    )?;
    Ok((experimental, design))
}

/// Sampled pupil phase, indexed by (axial plane, pupil-radius sample).
///
/// Every entry is a unit-modulus phasor.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseField {
    pub values: Array2<Complex64>,
}

impl PhaseField {
    /// Sample `exp(iW)` over every (z, ρ) pair of the grids.
    ///
    /// The z-independent part of the OPD is evaluated once per pupil sample; the
    /// immersion layer then adds the only z-dependent term.
    ///
    /// # Errors
    /// `PsfError::DomainViolation` when a pupil sample lies beyond what one of the
    /// configured refractive indices can support at this numerical aperture.
    pub fn synthesize(optics: &OpticalParameters, grids: &CoordinateGrids) -> PsfResult<Self> {
        let samples = grids.rho.len();
        let mut static_opd = Array1::<f64>::zeros(samples);
        let mut immersion_cosine = Array1::<f64>::zeros(samples);

        let ti0 = optics.working_distance_design_um;
        for (j, &rho) in grids.rho.iter().enumerate() {
            let (experimental, design) = immersion_terms(optics, rho)?;
            static_opd[j] = specimen_opd(optics, rho)? + coverslip_opd(optics, rho)?
                + ti0 * experimental
                - ti0 * design;
            immersion_cosine[j] = experimental;
        }

        let k = optics.wavenumber();
        let values = Array2::from_shape_fn((grids.z.len(), samples), |(p, j)| {
            let w = k * (static_opd[j] + grids.z[p] * immersion_cosine[j]);
            Complex64::new(w.cos(), w.sin())
        });

        debug!(
            "Phase field: {} planes x {} pupil samples",
            values.nrows(),
            values.ncols()
        );

        Ok(Self { values })
    }

    pub fn planes(&self) -> usize {
        self.values.nrows()
    }

    pub fn samples(&self) -> usize {
        self.values.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PrecisionParameters;
    use approx::assert_relative_eq;

    fn matched_optics() -> OpticalParameters {
        OpticalParameters {
            particle_depth_um: 0.0,
            ..OpticalParameters::default()
        }
    }

    #[test]
    fn test_matched_conditions_have_no_aberration_at_focus() {
        let optics = matched_optics();
        for rho in [0.0, 0.3, 0.9] {
            let w = wavefront_aberration(&optics, 0.0, rho).unwrap();
            assert_relative_eq!(w, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_coverslip_mismatch_contributes() {
        let optics = OpticalParameters {
            coverslip_thickness_um: 180.0,
            ..matched_optics()
        };
        // 10 um of extra glass on axis
        let opd = coverslip_opd(&optics, 0.0).unwrap();
        assert_relative_eq!(opd, 10.0 * 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_immersion_defocus_term() {
        let optics = matched_optics();
        let opd = immersion_opd(&optics, 2.0, 0.0).unwrap();
        assert_relative_eq!(opd, 2.0 * 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_specimen_term_vanishes_at_pupil_limit() {
        let optics = OpticalParameters::default();
        let a = optics.pupil_limit();
        let opd = specimen_opd(&optics, a).unwrap();
        assert!(opd.abs() < 1e-5);
    }

    #[test]
    fn test_phase_is_unit_modulus() {
        let optics = OpticalParameters::default();
        let precision = PrecisionParameters::resolve(Some(16), Some(6))
            .unwrap()
            .with_sample_count(200);
        let grids = CoordinateGrids::build(&optics, &precision).unwrap();
        let phase = PhaseField::synthesize(&optics, &grids).unwrap();

        assert_eq!(phase.values.dim(), (6, 200));
        for value in phase.values.iter() {
            assert_relative_eq!(value.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_phase_matches_pointwise_aberration() {
        let optics = OpticalParameters::default();
        let precision = PrecisionParameters::resolve(Some(8), Some(3))
            .unwrap()
            .with_sample_count(50);
        let grids = CoordinateGrids::build(&optics, &precision).unwrap();
        let phase = PhaseField::synthesize(&optics, &grids).unwrap();

        let w = wavefront_aberration(&optics, grids.z[2], grids.rho[17]).unwrap();
        let expected = Complex64::new(w.cos(), w.sin());
        assert_relative_eq!(phase.values[[2, 17]].re, expected.re, epsilon = 1e-6);
        assert_relative_eq!(phase.values[[2, 17]].im, expected.im, epsilon = 1e-6);
    }

    #[test]
    fn test_pupil_beyond_index_support_is_domain_violation() {
        // Grids sized for a glass-only path (a = 1) ...
        let glass = OpticalParameters {
            specimen_index: 1.5,
            ..OpticalParameters::default()
        };
        let precision = PrecisionParameters::resolve(Some(8), Some(2))
            .unwrap()
            .with_sample_count(64);
        let grids = CoordinateGrids::build(&glass, &precision).unwrap();

        // ... cannot be used with an aqueous specimen at NA 1.4.
        let result = PhaseField::synthesize(&OpticalParameters::default(), &grids);
        assert!(matches!(
            result,
            Err(PsfError::DomainViolation {
                index_name: "specimen_index",
                ..
            })
        ));
    }
}
