//! Radial, pupil and axial sampling grids.
//!
//! Three 1-D grids drive the whole computation:
//!
//! - `r`: image-space radial distances (microns), oversampled relative to the
//!   lateral pixel size so that linear interpolation onto pixel radii is accurate.
//! - `rho`: normalized pupil radii on `[0, a]`, with `a` the pupil limit.
//! - `z`: stage displacements from best focus (microns), symmetric about zero.
//!
//! The grids are built once and then only read by later stages.

use crate::errors::{PsfError, PsfResult};
use crate::params::{OpticalParameters, PrecisionParameters};
use log::debug;
use ndarray::Array1;

/// Read-only sampling grids shared by every synthesis stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateGrids {
    /// Image-space radial coordinates in microns
    pub r: Array1<f64>,
    /// Normalized pupil radii
    pub rho: Array1<f64>,
    /// Axial offsets from best focus in microns
    pub z: Array1<f64>,
    /// Pixel coordinates of the array center `(x0, y0)`
    pub center: (f64, f64),
    /// Radial extent of `r` in pixels, including the one pixel margin
    pub max_radius: usize,
    /// Upper bound `a` of the pupil radius
    pub pupil_limit: f64,
}

impl CoordinateGrids {
    /// Build all grids for one synthesis call.
    ///
    /// The center sits at `(size - 1) / 2` along each axis so it lands on a pixel
    /// for odd sizes and between four pixels for even sizes. `max_radius` is the
    /// rounded distance from the center to the outer corner of the array plus one
    /// pixel, which keeps every pixel radius strictly inside `r`.
    pub fn build(optics: &OpticalParameters, precision: &PrecisionParameters) -> PsfResult<Self> {
        precision.validate()?;
        optics.validate()?;

        let size = precision.size as f64;
        let x0 = (size - 1.0) / 2.0;
        let y0 = (size - 1.0) / 2.0;

        let corner = ((size - x0).powi(2) + (size - y0).powi(2)).sqrt();
        let max_radius = corner.round() as usize + 1;

        let radial_len = precision.oversampling * max_radius;
        if radial_len < 2 {
            return Err(PsfError::configuration(
                "oversampling",
                format!("radial grid needs at least 2 samples, got {radial_len}"),
            ));
        }

        let oversampling = precision.oversampling as f64;
        let r = Array1::from_shape_fn(radial_len, |j| {
            optics.lateral_pixel_um * j as f64 / oversampling
        });

        let pupil_limit = optics.pupil_limit();
        let rho = Array1::linspace(0.0, pupil_limit, precision.sample_count);

        let planes = precision.axial_planes;
        let half_span = (planes as f64 - 1.0) / 2.0;
        let z = Array1::from_shape_fn(planes, |k| optics.axial_pixel_um * (k as f64 - half_span));

        debug!(
            "Grids: {} radial samples up to {:.3} um, {} pupil samples up to a={:.4}, {} planes over [{:.3}, {:.3}] um",
            r.len(),
            r[r.len() - 1],
            rho.len(),
            pupil_limit,
            z.len(),
            z[0],
            z[z.len() - 1]
        );

        Ok(Self {
            r,
            rho,
            z,
            center: (x0, y0),
            max_radius,
            pupil_limit,
        })
    }

    /// Index of the plane whose axial offset is closest to zero.
    ///
    /// For an even plane count the two central planes are equidistant; the lower
    /// index is returned.
    pub fn nominal_focus_plane(&self) -> usize {
        self.z
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (index, z)| {
                if z.abs() < best.1 {
                    (index, z.abs())
                } else {
                    best
                }
            })
            .0
    }
}
