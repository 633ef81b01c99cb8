//! Gibson-Lanni point-spread function synthesis
//!
//! This crate computes 3-D PSF volumes for wide-field fluorescence microscopes.
//! The pupil phase produced by refractive-index and thickness mismatches is
//! approximated by a Fourier-Bessel series, which turns the radial PSF into a
//! closed-form sum of Bessel integrals that is then resampled onto a pixel grid.
//!
//! The output of [`synthesize_psf`] is indexed `(row, column, plane)` and
//! normalized to a maximum of 1.

pub mod algo;
pub mod errors;
pub mod fourier_bessel;
pub mod grid;
pub mod params;
pub mod phase;
pub mod radial;
pub mod render;
pub mod resample;
pub mod special;
pub mod synthesis;

pub use errors::{PsfError, PsfResult};
pub use fourier_bessel::{BasisMatrix, FourierBesselFit};
pub use grid::CoordinateGrids;
pub use params::{OpticalParameters, PrecisionParameters, DEFAULT_PSF_SIZE};
pub use phase::PhaseField;
pub use radial::RadialProfile;
pub use render::{render_diagnostics, DiagnosticOptions, RenderError};
pub use synthesis::{synthesize_psf, PsfSynthesis, PsfSynthesizer};
