//! Microscope and precision parameters for PSF synthesis.
//!
//! Two value objects fully determine a synthesis call:
//!
//! - [`OpticalParameters`]: objective, immersion medium, coverslip and specimen
//!   properties at design and experimental conditions, plus detector sampling.
//! - [`PrecisionParameters`]: output size and the numerical knobs controlling the
//!   Fourier-Bessel approximation.
//!
//! Both default to the reference wide-field configuration (1.4 NA oil objective,
//! 610 nm emission, 100 nm lateral and 250 nm axial sampling, a particle 2 µm
//! into an aqueous specimen). All lengths are in microns.
//!
//! # Examples
//!
//! ```rust
//! use psf_kernel::params::{OpticalParameters, PrecisionParameters};
//!
//! let optics = OpticalParameters::default();
//! assert!((optics.pupil_limit() - 1.33 / 1.4).abs() < 1e-12);
//!
//! let precision = PrecisionParameters::resolve(Some(64), None).unwrap();
//! assert_eq!(precision.axial_planes, 32);
//! ```

use crate::errors::{PsfError, PsfResult};
use serde::{Deserialize, Serialize};

/// Lateral size of the output volume when none is requested.
pub const DEFAULT_PSF_SIZE: usize = 256;

/// Physical description of the microscope, specimen and detector sampling.
///
/// Design values (`*_design`) describe the conditions the objective was corrected
/// for; the remaining values describe the actual experiment. Any mismatch between
/// the two shows up as aberration in the synthesized PSF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalParameters {
    /// Numerical aperture of the objective
    pub numerical_aperture: f64,
    /// Emission wavelength in microns
    pub wavelength_um: f64,
    /// Objective magnification
    pub magnification: f64,
    /// Specimen refractive index
    pub specimen_index: f64,
    /// Immersion medium refractive index, experimental value
    pub immersion_index: f64,
    /// Immersion medium refractive index, design value
    pub immersion_index_design: f64,
    /// Coverslip refractive index, experimental value
    pub coverslip_index: f64,
    /// Coverslip refractive index, design value
    pub coverslip_index_design: f64,
    /// Working distance (immersion medium thickness), design value, microns
    pub working_distance_design_um: f64,
    /// Coverslip thickness, experimental value, microns
    pub coverslip_thickness_um: f64,
    /// Coverslip thickness, design value, microns
    pub coverslip_thickness_design_um: f64,
    /// Lateral pixel size in object space, microns
    pub lateral_pixel_um: f64,
    /// Axial step between planes, microns
    pub axial_pixel_um: f64,
    /// Distance of the emitter from the coverslip, microns
    pub particle_depth_um: f64,
}

impl Default for OpticalParameters {
    fn default() -> Self {
        Self {
            numerical_aperture: 1.4,
            wavelength_um: 0.610,
            magnification: 100.0,
            specimen_index: 1.33,
            immersion_index: 1.5,
            immersion_index_design: 1.5,
            coverslip_index: 1.5,
            coverslip_index_design: 1.5,
            working_distance_design_um: 150.0,
            coverslip_thickness_um: 170.0,
            coverslip_thickness_design_um: 170.0,
            lateral_pixel_um: 0.1,
            axial_pixel_um: 0.25,
            particle_depth_um: 2.0,
        }
    }
}

impl OpticalParameters {
    /// Named refractive indices of every layer the light crosses.
    pub fn refractive_indices(&self) -> [(&'static str, f64); 5] {
        [
            ("specimen_index", self.specimen_index),
            ("immersion_index", self.immersion_index),
            ("immersion_index_design", self.immersion_index_design),
            ("coverslip_index", self.coverslip_index),
            ("coverslip_index_design", self.coverslip_index_design),
        ]
    }

    /// Largest normalized pupil radius `a = min(NA, ns, ni, ni0, ng, ng0) / NA`.
    ///
    /// Rays beyond `a` would be evanescent in at least one layer, so the pupil
    /// is truncated there and every OPD radicand stays non-negative.
    pub fn pupil_limit(&self) -> f64 {
        let smallest = self
            .refractive_indices()
            .iter()
            .map(|(_, index)| *index)
            .fold(self.numerical_aperture, f64::min);
        smallest / self.numerical_aperture
    }

    /// Load optical parameters from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save to a pretty-printed JSON file.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Wavenumber `2π / λ` in radians per micron.
    pub fn wavenumber(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.wavelength_um
    }

    /// Check that every physical quantity is finite and physically meaningful.
    pub fn validate(&self) -> PsfResult<()> {
        let strictly_positive = [
            ("numerical_aperture", self.numerical_aperture),
            ("wavelength_um", self.wavelength_um),
            ("magnification", self.magnification),
            ("lateral_pixel_um", self.lateral_pixel_um),
            ("axial_pixel_um", self.axial_pixel_um),
        ];
        for (name, value) in strictly_positive
            .into_iter()
            .chain(self.refractive_indices())
        {
            if !value.is_finite() || value <= 0.0 {
                return Err(PsfError::configuration(
                    name,
                    format!("must be a positive finite number, got {value}"),
                ));
            }
        }

        let non_negative = [
            ("working_distance_design_um", self.working_distance_design_um),
            ("coverslip_thickness_um", self.coverslip_thickness_um),
            (
                "coverslip_thickness_design_um",
                self.coverslip_thickness_design_um,
            ),
            ("particle_depth_um", self.particle_depth_um),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(PsfError::configuration(
                    name,
                    format!("must be a non-negative finite number, got {value}"),
                ));
            }
        }

        Ok(())
    }
}

/// Output shape and accuracy controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionParameters {
    /// Lateral size of the output volume in pixels (square)
    pub size: usize,
    /// Number of axial planes
    pub axial_planes: usize,
    /// Number of rescaled Bessel functions approximating the pupil phase
    pub basis_count: usize,
    /// Number of pupil samples along the radial direction
    pub sample_count: usize,
    /// Radial samples per lateral pixel in the image-space grid
    pub oversampling: usize,
    /// Short reference wavelength setting the basis scaling, microns
    pub basis_reference_wavelength_um: f64,
}

impl Default for PrecisionParameters {
    fn default() -> Self {
        Self {
            size: DEFAULT_PSF_SIZE,
            axial_planes: DEFAULT_PSF_SIZE / 2,
            basis_count: 100,
            sample_count: 1000,
            oversampling: 2,
            basis_reference_wavelength_um: 0.436,
        }
    }
}

impl PrecisionParameters {
    /// Resolve requested output dimensions against the defaults.
    ///
    /// # Arguments
    /// * `size` - Lateral size in pixels, defaults to [`DEFAULT_PSF_SIZE`]
    /// * `axial_planes` - Number of planes, defaults to `size / 2`
    ///
    /// # Errors
    /// `PsfError::Configuration` if either value resolves to zero.
    pub fn resolve(size: Option<usize>, axial_planes: Option<usize>) -> PsfResult<Self> {
        let size = size.unwrap_or(DEFAULT_PSF_SIZE);
        let resolved = Self {
            size,
            axial_planes: axial_planes.unwrap_or(size / 2),
            ..Self::default()
        };
        resolved.validate()?;
        Ok(resolved)
    }

    pub fn with_oversampling(mut self, oversampling: usize) -> Self {
        self.oversampling = oversampling;
        self
    }

    pub fn with_basis_count(mut self, basis_count: usize) -> Self {
        self.basis_count = basis_count;
        self
    }

    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Require every count to be a positive integer.
    pub fn validate(&self) -> PsfResult<()> {
        let counts = [
            ("size", self.size),
            ("axial_planes", self.axial_planes),
            ("basis_count", self.basis_count),
            ("sample_count", self.sample_count),
            ("oversampling", self.oversampling),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(PsfError::configuration(name, "must be a positive integer"));
            }
        }

        let reference = self.basis_reference_wavelength_um;
        if !reference.is_finite() || reference <= 0.0 {
            return Err(PsfError::configuration(
                "basis_reference_wavelength_um",
                format!("must be a positive finite number, got {reference}"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_resolve_defaults() {
        let precision = PrecisionParameters::resolve(None, None).unwrap();
        assert_eq!(precision.size, 256);
        assert_eq!(precision.axial_planes, 128);
        assert_eq!(precision.basis_count, 100);
        assert_eq!(precision.sample_count, 1000);
        assert_eq!(precision.oversampling, 2);
    }

    #[test]
    fn test_resolve_plane_count_follows_size() {
        let precision = PrecisionParameters::resolve(Some(33), None).unwrap();
        assert_eq!(precision.axial_planes, 16);

        let explicit = PrecisionParameters::resolve(Some(33), Some(5)).unwrap();
        assert_eq!(explicit.axial_planes, 5);
    }

    #[test]
    fn test_resolve_rejects_zero_size() {
        let result = PrecisionParameters::resolve(Some(0), Some(4));
        assert!(matches!(
            result,
            Err(PsfError::Configuration { name: "size", .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_implicit_zero_planes() {
        // size / 2 == 0 for a single pixel
        let result = PrecisionParameters::resolve(Some(1), None);
        assert!(matches!(
            result,
            Err(PsfError::Configuration {
                name: "axial_planes",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_counts() {
        let base = PrecisionParameters::default();
        assert!(base.clone().with_basis_count(0).validate().is_err());
        assert!(base.clone().with_sample_count(0).validate().is_err());
        assert!(base.with_oversampling(0).validate().is_err());
    }

    #[test]
    fn test_pupil_limit_uses_smallest_index() {
        let optics = OpticalParameters::default();
        assert_relative_eq!(optics.pupil_limit(), 1.33 / 1.4, epsilon = 1e-12);

        let dry = OpticalParameters {
            numerical_aperture: 0.9,
            ..OpticalParameters::default()
        };
        assert_eq!(dry.pupil_limit(), 1.0);
    }

    #[test]
    fn test_optics_validation() {
        assert!(OpticalParameters::default().validate().is_ok());

        let bad_wavelength = OpticalParameters {
            wavelength_um: -0.5,
            ..OpticalParameters::default()
        };
        assert!(matches!(
            bad_wavelength.validate(),
            Err(PsfError::Configuration {
                name: "wavelength_um",
                ..
            })
        ));

        let bad_depth = OpticalParameters {
            particle_depth_um: f64::NAN,
            ..OpticalParameters::default()
        };
        assert!(bad_depth.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let optics: OpticalParameters =
            serde_json::from_str(r#"{ "specimen_index": 1.45 }"#).unwrap();
        assert_eq!(optics.specimen_index, 1.45);
        assert_eq!(optics.numerical_aperture, 1.4);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("optics.json");
        let optics = OpticalParameters {
            coverslip_thickness_um: 175.0,
            ..OpticalParameters::default()
        };

        optics.save_to_file(&path).unwrap();
        assert_eq!(OpticalParameters::load_from_file(&path).unwrap(), optics);
    }

    #[test]
    fn test_malformed_file_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("optics.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = OpticalParameters::load_from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
