//! Gibson-Lanni PSF synthesis from the command line
//!
//! Synthesizes a PSF volume for the reference wide-field microscope (or an
//! optics file overriding it), prints a summary of the result, and optionally
//! writes log-scaled diagnostic images.
//!
//! ```text
//! psf_kernel --size 128 --planes 64 --slice-png slice.png --rz-png rz.png
//! ```

use clap::Parser;
use log::info;
use ndarray::Axis;
use psf_kernel::{
    render_diagnostics, DiagnosticOptions, OpticalParameters, PrecisionParameters, PsfSynthesizer,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "PSF Kernel",
    about = "Synthesizes a 3-D Gibson-Lanni point-spread function",
    long_about = None
)]
struct Args {
    /// Lateral size of the output volume in pixels
    #[arg(long, default_value_t = psf_kernel::DEFAULT_PSF_SIZE)]
    size: usize,

    /// Number of axial planes (default: size / 2)
    #[arg(long)]
    planes: Option<usize>,

    /// Radial samples per lateral pixel
    #[arg(long)]
    oversampling: Option<usize>,

    /// Number of Bessel functions in the phase approximation
    #[arg(long)]
    basis: Option<usize>,

    /// Number of pupil samples
    #[arg(long)]
    samples: Option<usize>,

    /// JSON file overriding the reference optical parameters
    #[arg(long)]
    optics: Option<PathBuf>,

    /// Write a log-scaled lateral slice to this PNG
    #[arg(long)]
    slice_png: Option<PathBuf>,

    /// Write a log-scaled r-z map of the radial profile to this PNG
    #[arg(long)]
    rz_png: Option<PathBuf>,

    /// Plane for --slice-png (default: best focus)
    #[arg(long)]
    slice_plane: Option<usize>,

    /// Log the Fourier-Bessel phase fit residual at this plane
    #[arg(long)]
    phase_fit_plane: Option<usize>,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Serialize)]
struct ResolvedConfig<'a> {
    optics: &'a OpticalParameters,
    precision: &'a PrecisionParameters,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let optics = match &args.optics {
        Some(path) => {
            info!("Loading optical parameters from {}", path.display());
            OpticalParameters::load_from_file(path)?
        }
        None => OpticalParameters::default(),
    };

    let mut precision = PrecisionParameters::resolve(Some(args.size), args.planes)?;
    if let Some(oversampling) = args.oversampling {
        precision = precision.with_oversampling(oversampling);
    }
    if let Some(basis) = args.basis {
        precision = precision.with_basis_count(basis);
    }
    if let Some(samples) = args.samples {
        precision = precision.with_sample_count(samples);
    }
    precision.validate()?;
    optics.validate()?;

    if args.dump_config {
        let config = ResolvedConfig {
            optics: &optics,
            precision: &precision,
        };
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let synthesizer = PsfSynthesizer::new(optics, precision);
    let result = synthesizer.synthesize_detailed()?;

    if let Some(plane) = args.phase_fit_plane {
        let residual = result
            .fit
            .residual_rms(&result.basis, &result.phase, plane)?;
        info!(
            "Phase fit at plane {plane} (z = {:.3} um): rms residual {residual:.3e}",
            result.grids.z[plane]
        );
    }

    let best_focus = result.profile.best_focus_plane();
    let (rows, cols, planes) = result.volume.dim();
    let in_focus = result.volume.index_axis(Axis(2), best_focus);
    let peak_pixel = in_focus
        .indexed_iter()
        .fold(((0, 0), f64::NEG_INFINITY), |best, (idx, &v)| {
            if v > best.1 {
                (idx, v)
            } else {
                best
            }
        });

    println!("PSF Kernel Synthesis");
    println!("====================");
    println!("Volume:            {rows} x {cols} x {planes}");
    println!(
        "Radial samples:    {} (max radius {} px)",
        result.grids.r.len(),
        result.grids.max_radius
    );
    println!("Pupil limit a:     {:.4}", result.grids.pupil_limit);
    println!(
        "Fit:               rank {}/{}, condition {:.3e}",
        result.fit.rank,
        result.basis.basis_count(),
        result.fit.condition_number
    );
    println!(
        "Best focus:        plane {best_focus} (z = {:.3} um)",
        result.grids.z[best_focus]
    );
    println!(
        "Peak pixel:        ({}, {}) = {:.4}",
        peak_pixel.0 .0, peak_pixel.0 .1, peak_pixel.1
    );

    let options = DiagnosticOptions {
        enabled: args.slice_png.is_some() || args.rz_png.is_some(),
        slice_png: args.slice_png,
        rz_png: args.rz_png,
        slice_plane: args.slice_plane,
        ..DiagnosticOptions::default()
    };
    for path in render_diagnostics(&result, &options)? {
        println!("Wrote:             {}", path.display());
    }

    Ok(())
}
