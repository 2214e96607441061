//! Benchmarks for the core mesh operations - neighbor lookup, a full
//! refine/coarsen sweep, and a numerical scheme step - each run against a
//! uniformly-refined mesh of a representative size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use amr_core::mesh::Mesh;
use amr_core::node::Direction;
use amr_core::refinement::Gradient;
use amr_core::scheme::SecondOrderCenteredFiniteDifferences;

const SIZES: [u32; 3] = [16, 32, 64];

fn checkerboard(n: u32, lx: f64, ly: f64) -> Mesh {
  let mut mesh = Mesh::uniform(n, || 0.0, lx, ly, None).unwrap();
  let mut toggle = false;
  mesh
    .inject(|tree, id| {
      if tree.is_leaf(id) {
        tree.set_value(id, if toggle { 1.0 } else { 0.0 });
        toggle = !toggle;
      }
    })
    .unwrap();
  mesh
}

/// Walk every leaf's four cardinal neighbors once.
fn bench_neighbor_lookup(c: &mut Criterion) {
  let mut group = c.benchmark_group("neighbor_lookup");

  for n in SIZES {
    let mesh = checkerboard(n, 8.0, 8.0);
    let leaves = mesh.leafs().unwrap();
    group.throughput(Throughput::Elements((leaves.len() * 4) as u64));

    group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
      b.iter(|| {
        for &leaf in &leaves {
          for &direction in Direction::CARDINAL.iter() {
            black_box(mesh.tree().neighbor(leaf, direction));
          }
        }
      })
    });
  }

  group.finish();
}

/// One `solve` step: a full parallel read pass plus serial commit.
fn bench_scheme_apply(c: &mut Criterion) {
  let mut group = c.benchmark_group("scheme_apply");

  for n in SIZES {
    group.throughput(Throughput::Elements((n * n) as u64));

    let scheme = SecondOrderCenteredFiniteDifferences::new(0.1, 8.0 / n as f64, 8.0 / n as f64);

    group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
      b.iter_batched(
        || checkerboard(n, 8.0, 8.0),
        |mut mesh| {
          black_box(mesh.solve(&scheme).unwrap());
        },
        criterion::BatchSize::SmallInput,
      )
    });
  }

  group.finish();
}

/// One `refine` sweep against a checkerboard field, so roughly half the
/// leaves are flagged and the buffer-zone propagation actually runs.
fn bench_refine_sweep(c: &mut Criterion) {
  let mut group = c.benchmark_group("refine_sweep");

  for n in SIZES {
    group.throughput(Throughput::Elements((n * n) as u64));

    let criterion = Gradient::new(0.01);

    group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
      b.iter_batched(
        || checkerboard(n, 8.0, 8.0),
        |mut mesh| {
          black_box(mesh.refine(&criterion, 1, 6).unwrap());
        },
        criterion::BatchSize::SmallInput,
      )
    });
  }

  group.finish();
}

criterion_group!(mesh, bench_neighbor_lookup, bench_scheme_apply, bench_refine_sweep);
criterion_main!(mesh);
