use burnscar::{
    classify::{burnt_mask, BURNT},
    components::GeoTransform,
    footprint::polygonize,
    indices, Grid, SeverityTable,
};
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use std::hint::black_box;

const SIZE: (usize, usize) = (1024, 1024);

fn transform() -> GeoTransform {
    GeoTransform::new(600_000., 4_100_000., 10., -10.)
}

/// Burn ratio field with a few burnt blobs.
fn nbr(shift: f32) -> Grid<f32> {
    Grid::new(
        Array2::from_shape_fn(SIZE, |(row, col)| {
            let (y, x) = (row as f32 / 64., col as f32 / 64.);
            (x.sin() * y.cos() - shift).clamp(-1., 1.)
        }),
        transform(),
    )
}

fn bench_rbr(c: &mut Criterion) {
    let (pre, post) = (nbr(0.), nbr(0.4));
    c.bench_function("rbr", |b| {
        b.iter(|| indices::rbr(black_box(&pre), black_box(&post)).unwrap())
    });
}

fn bench_reclassify(c: &mut Criterion) {
    let rbr = indices::rbr(&nbr(0.), &nbr(0.4)).unwrap();
    let table = SeverityTable::new(0.1).unwrap();
    c.bench_function("reclassify", |b| b.iter(|| table.reclassify(black_box(&rbr))));
}

fn bench_polygonize(c: &mut Criterion) {
    let rbr = indices::rbr(&nbr(0.), &nbr(0.4)).unwrap();
    let mask = burnt_mask(&SeverityTable::new(0.1).unwrap().reclassify(&rbr));
    c.bench_function("polygonize", |b| {
        b.iter(|| polygonize(black_box(&mask), BURNT))
    });
}

criterion_group!(benches, bench_rbr, bench_reclassify, bench_polygonize);
criterion_main!(benches);
