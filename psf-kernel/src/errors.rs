//! Error taxonomy for PSF synthesis.
//!
//! Every failure is local to one synthesis call. Nothing is persisted before the
//! finished volume is returned, so there is no partial state to roll back.

use crate::algo::interp::InterpError;
use thiserror::Error;

/// Errors raised by the PSF synthesis pipeline.
#[derive(Error, Debug)]
pub enum PsfError {
    /// A size, count or ratio was not a positive integer (or otherwise unusable).
    #[error("Invalid configuration for {name}: {reason}")]
    Configuration { name: &'static str, reason: String },

    /// An optical path difference term would need the square root of a negative number.
    #[error(
        "Refractive index {index_name}={refractive_index} cannot support pupil radius {pupil_radius} at NA {numerical_aperture} (radicand {radicand:e})"
    )]
    DomainViolation {
        index_name: &'static str,
        refractive_index: f64,
        numerical_aperture: f64,
        pupil_radius: f64,
        radicand: f64,
    },

    /// The Fourier-Bessel least-squares system is singular or produced non-finite values.
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// A pixel radius fell outside the sampled radial profile.
    #[error("Pixel radius outside radial profile domain: {0}")]
    InterpolationDomain(#[from] InterpError),
}

impl PsfError {
    pub(crate) fn configuration(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            name,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type PsfResult<T> = Result<T, PsfError>;
