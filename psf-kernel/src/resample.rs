//! Resampling of radial profiles onto the square pixel grid.
//!
//! The PSF is radially symmetric, so each plane of the output volume is a 1-D
//! interpolation of that plane's radial profile at every pixel's distance from
//! the array center. Pixel radii depend only on the grid, not on the plane, so
//! their interpolation brackets are located once and reused for every plane.

use crate::algo::interp::{Bracket, InterpError, LinearGrid};
use crate::errors::{PsfError, PsfResult};
use crate::grid::CoordinateGrids;
use crate::radial::RadialProfile;
use log::debug;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Array3, Axis};

/// Distance of every pixel from the array center, in microns.
///
/// Indexed `[row, column]`.
pub fn pixel_radii(size: usize, center: (f64, f64), lateral_pixel_um: f64) -> Array2<f64> {
    let (x0, y0) = center;
    Array2::from_shape_fn((size, size), |(row, col)| {
        let dx = col as f64 - x0;
        let dy = row as f64 - y0;
        (dx * dx + dy * dy).sqrt() * lateral_pixel_um
    })
}

/// Interpolate every plane of `profile` onto a `size x size` pixel grid.
///
/// Returns a volume indexed `(row, column, plane)`.
///
/// # Errors
/// `PsfError::InterpolationDomain` if the profile and `grids.r` differ in length
/// or any pixel radius lies outside `grids.r`.
/// Grid sizing guarantees this cannot happen, so an error here means the grid
/// and the requested size disagree.
pub fn resample_volume(
    profile: &RadialProfile,
    grids: &CoordinateGrids,
    size: usize,
    lateral_pixel_um: f64,
) -> PsfResult<Array3<f64>> {
    let r = grids.r.as_slice().ok_or_else(|| {
        PsfError::NumericalDegeneracy("radial grid is not contiguous".into())
    })?;
    let radial = LinearGrid::new(r)?;
    if profile.values.ncols() != r.len() {
        return Err(InterpError::MismatchedLengths.into());
    }

    let radii = pixel_radii(size, grids.center, lateral_pixel_um);
    let brackets = radii
        .iter()
        .map(|&radius| radial.locate(radius))
        .collect::<Result<Vec<Bracket>, _>>()?;
    let brackets = Array2::from_shape_vec((size, size), brackets)
        .map_err(|e| PsfError::NumericalDegeneracy(e.to_string()))?;

    let mut volume = Array3::<f64>::zeros((size, size, profile.planes()));
    volume
        .axis_iter_mut(Axis(2))
        .into_par_iter()
        .zip(profile.values.axis_iter(Axis(0)).into_par_iter())
        .for_each(|(mut plane, row)| {
            // RadialProfile rows are contiguous; fall back to a copy otherwise
            let owned;
            let ys: &[f64] = match row.as_slice() {
                Some(ys) => ys,
                None => {
                    owned = row.to_vec();
                    owned.as_slice()
                }
            };
            for (value, bracket) in plane.iter_mut().zip(brackets.iter()) {
                *value = bracket.apply(ys);
            }
        });

    debug!(
        "Resampled {} planes onto {size}x{size} pixels",
        profile.planes()
    );

    Ok(volume)
}
