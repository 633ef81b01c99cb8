use criterion::{black_box, criterion_group, criterion_main, Criterion};
use psf_kernel::fourier_bessel::{scaling_factors, BasisMatrix, FourierBesselFit};
use psf_kernel::{
    synthesize_psf, CoordinateGrids, OpticalParameters, PhaseField, PrecisionParameters,
    RadialProfile,
};

fn bench_synthesize_psf(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize_psf");
    group.sample_size(10);
    group.bench_function("64x64x32", |b| {
        b.iter(|| synthesize_psf(black_box(64), black_box(Some(32))))
    });
    group.bench_function("256x256x128", |b| {
        b.iter(|| synthesize_psf(black_box(256), black_box(Some(128))))
    });
    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let optics = OpticalParameters::default();
    let precision = PrecisionParameters::default();
    let grids = CoordinateGrids::build(&optics, &precision).unwrap();
    let phase = PhaseField::synthesize(&optics, &grids).unwrap();
    let scaling = scaling_factors(&optics, &precision);
    let basis = BasisMatrix::build(scaling.clone(), &grids.rho);
    let fit = FourierBesselFit::solve(&basis, &phase).unwrap();

    let mut group = c.benchmark_group("stages");
    group.bench_function("phase_field", |b| {
        b.iter(|| PhaseField::synthesize(black_box(&optics), black_box(&grids)))
    });
    group.bench_function("fourier_bessel_fit", |b| {
        b.iter(|| FourierBesselFit::solve(black_box(&basis), black_box(&phase)))
    });
    group.bench_function("radial_profile", |b| {
        b.iter(|| {
            RadialProfile::evaluate(
                black_box(&optics),
                black_box(&grids),
                black_box(&scaling),
                black_box(&fit),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, bench_synthesize_psf, bench_stages);
criterion_main!(benches);
