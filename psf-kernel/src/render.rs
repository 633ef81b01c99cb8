//! Diagnostic images of a synthesized PSF.
//!
//! Rendering is a read-only consumer of [`PsfSynthesis`]: nothing here feeds
//! back into the volume. Images are log-scaled so the faint rings stay visible
//! next to the central lobe, and are only written when [`DiagnosticOptions`]
//! asks for them.

use crate::synthesis::PsfSynthesis;
use image::{GrayImage, Luma};
use log::info;
use ndarray::{Array2, ArrayView2, Axis};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Plane {plane} is out of range for a volume with {planes} planes")]
    PlaneOutOfRange { plane: usize, planes: usize },
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which diagnostic images to write, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticOptions {
    /// Master switch; nothing is written when false
    pub enabled: bool,
    /// Lateral slice through the volume
    pub slice_png: Option<PathBuf>,
    /// Radial profile as an image with one row per axial plane
    pub rz_png: Option<PathBuf>,
    /// Plane for the lateral slice, best focus when `None`
    pub slice_plane: Option<usize>,
    /// Intensities below `10^-decades` map to black
    pub dynamic_range_decades: f64,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            slice_png: None,
            rz_png: None,
            slice_plane: None,
            dynamic_range_decades: 4.0,
        }
    }
}

/// Map normalized intensities to 8 bits on a logarithmic scale.
///
/// `1.0` maps to 255 and anything at or below `10^-decades` to 0.
pub fn log_scale_to_u8(values: ArrayView2<f64>, decades: f64) -> Array2<u8> {
    let floor = 10f64.powf(-decades);
    values.mapv(|v| {
        if v.is_nan() || v <= floor {
            return 0;
        }
        let level = (v.log10() + decades) / decades;
        (level.clamp(0.0, 1.0) * 255.0).round() as u8
    })
}

/// Converts an ndarray Array2<u8> to an image::GrayImage
///
/// Array indices `[y, x]` map to pixel coordinates `(x, y)`.
pub fn array2_to_gray_image(arr: &Array2<u8>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut img = GrayImage::new(width as u32, height as u32);

    for ((y, x), value) in arr.indexed_iter() {
        img.put_pixel(x as u32, y as u32, Luma([*value]));
    }

    img
}

/// Log-scaled image of one lateral plane of the volume.
pub fn lateral_slice(
    synthesis: &PsfSynthesis,
    plane: usize,
    decades: f64,
) -> Result<GrayImage, RenderError> {
    let planes = synthesis.volume.len_of(Axis(2));
    if plane >= planes {
        return Err(RenderError::PlaneOutOfRange { plane, planes });
    }
    let slice = synthesis.volume.index_axis(Axis(2), plane);
    Ok(array2_to_gray_image(&log_scale_to_u8(slice, decades)))
}

/// Log-scaled r-z map: one row per axial plane, one column per radial sample.
pub fn radial_axial_map(synthesis: &PsfSynthesis, decades: f64) -> GrayImage {
    array2_to_gray_image(&log_scale_to_u8(synthesis.profile.values.view(), decades))
}

fn save_png(img: &GrayImage, path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    img.save(path)?;
    info!(
        "Wrote {}x{} diagnostic image to {}",
        img.width(),
        img.height(),
        path.display()
    );
    Ok(())
}

/// Write every requested diagnostic image and return the written paths.
pub fn render_diagnostics(
    synthesis: &PsfSynthesis,
    options: &DiagnosticOptions,
) -> Result<Vec<PathBuf>, RenderError> {
    let mut written = Vec::new();
    if !options.enabled {
        return Ok(written);
    }

    if let Some(path) = &options.slice_png {
        let plane = options
            .slice_plane
            .unwrap_or_else(|| synthesis.profile.best_focus_plane());
        let img = lateral_slice(synthesis, plane, options.dynamic_range_decades)?;
        save_png(&img, path)?;
        written.push(path.clone());
    }

    if let Some(path) = &options.rz_png {
        let img = radial_axial_map(synthesis, options.dynamic_range_decades);
        save_png(&img, path)?;
        written.push(path.clone());
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{OpticalParameters, PrecisionParameters};
    use crate::synthesis::PsfSynthesizer;
    use ndarray::array;
    use tempfile::tempdir;

    fn small_synthesis() -> PsfSynthesis {
        let precision = PrecisionParameters::resolve(Some(16), Some(4)).unwrap();
        PsfSynthesizer::new(OpticalParameters::default(), precision)
            .synthesize_detailed()
            .unwrap()
    }

    #[test]
    fn test_log_scale_endpoints() {
        let values = array![[1.0, 1e-1], [1e-4, 0.0]];
        let scaled = log_scale_to_u8(values.view(), 4.0);
        assert_eq!(scaled[[0, 0]], 255);
        assert_eq!(scaled[[0, 1]], 191);
        assert_eq!(scaled[[1, 0]], 0);
        assert_eq!(scaled[[1, 1]], 0);
    }

    #[test]
    fn test_array2_to_gray_image_orientation() {
        let arr = array![[1u8, 2, 3], [4, 5, 6]];
        let img = array2_to_gray_image(&arr);
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 0)[0], 3);
        assert_eq!(img.get_pixel(0, 1)[0], 4);
    }

    #[test]
    fn test_disabled_options_write_nothing() {
        let dir = tempdir().unwrap();
        let options = DiagnosticOptions {
            enabled: false,
            slice_png: Some(dir.path().join("slice.png")),
            ..DiagnosticOptions::default()
        };
        let written = render_diagnostics(&small_synthesis(), &options).unwrap();
        assert!(written.is_empty());
        assert!(!dir.path().join("slice.png").exists());
    }

    #[test]
    fn test_writes_requested_images() {
        let dir = tempdir().unwrap();
        let synthesis = small_synthesis();
        let options = DiagnosticOptions {
            enabled: true,
            slice_png: Some(dir.path().join("nested").join("slice.png")),
            rz_png: Some(dir.path().join("rz.png")),
            ..DiagnosticOptions::default()
        };

        let written = render_diagnostics(&synthesis, &options).unwrap();
        assert_eq!(written.len(), 2);

        let slice = image::open(dir.path().join("nested").join("slice.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(slice.dimensions(), (16, 16));

        let rz = image::open(dir.path().join("rz.png")).unwrap().to_luma8();
        assert_eq!(rz.dimensions(), (synthesis.grids.r.len() as u32, 4));
    }

    #[test]
    fn test_slice_plane_out_of_range() {
        let synthesis = small_synthesis();
        assert!(matches!(
            lateral_slice(&synthesis, 4, 4.0),
            Err(RenderError::PlaneOutOfRange { plane: 4, planes: 4 })
        ));
    }
}
