//! Performance benchmarks for contact-search
//!
//! # Running Benchmarks
//!
//! Run all benchmarks:
//! ```bash
//! cargo bench
//! ```
//!
//! Run specific benchmark group:
//! ```bash
//! cargo bench --bench performance tree_init
//! cargo bench --bench performance tree_search
//! cargo bench --bench performance collision_search
//! cargo bench --bench performance projection
//! cargo bench --bench performance pipeline
//! ```
//!
//! View HTML reports:
//! ```bash
//! open target/criterion/report/index.html
//! ```
//!
//! # Benchmark Groups
//!
//! - **tree_init**: Binary tree construction at different scales
//! - **tree_search**: Tree update plus search, top-down and bottom-up
//! - **collision_search**: Volume-vs-volume search through the communicator interface
//! - **projection**: Newton point-to-curve projection for several curve shapes
//! - **pipeline**: Search, pair evaluation and assembly end to end

use contact_search::config::{
    ContactParameters, ProjectionParameters, SearchParameters, TreeUpdateType, Verbosity,
};
use contact_search::contact::{BeamContactManager, GlobalSystem};
use contact_search::mesh::types::{CurveShape, Discretization};
use contact_search::projection::point_to_curve_projection;
use contact_search::search::{collision_search, BinaryTree, BoundingVolume, SerialCommunicator};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::{DVector, Vector3};

use synthetic_mesh::{calculate_grid_dimensions, generate_beam_grid};

const SPACING: f64 = 1.0;
const OFFSET: f64 = 0.15;
const RADIUS: f64 = 0.1;

/// Benchmark binary tree construction at different scales
fn benchmark_tree_init(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_init");

    let scales = vec![("1K", 1_000), ("10K", 10_000), ("100K", 100_000)];

    for (name, target_elements) in scales {
        let (num_beams, elements_per_beam) = calculate_grid_dimensions(target_elements);
        let grid = generate_beam_grid(num_beams, elements_per_beam, SPACING, OFFSET, RADIUS);

        group.throughput(Throughput::Elements(grid.mesh.num_elements() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &grid, |b, grid| {
            b.iter(|| {
                let mut tree = BinaryTree::new(
                    grid.slave_ids.clone(),
                    grid.master_ids.clone(),
                    SearchParameters::default(),
                )
                .unwrap();
                tree.init(black_box(&grid.mesh)).unwrap();
                black_box(tree);
            });
        });
    }

    group.finish();
}

/// Benchmark tree update and search for both update strategies
fn benchmark_tree_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_search");

    let scales = vec![("1K", 1_000), ("10K", 10_000), ("100K", 100_000)];

    for (name, target_elements) in scales {
        let (num_beams, elements_per_beam) = calculate_grid_dimensions(target_elements);
        let grid = generate_beam_grid(num_beams, elements_per_beam, SPACING, OFFSET, RADIUS);

        for (label, update_type) in [
            ("top_down", TreeUpdateType::TopDown),
            ("bottom_up", TreeUpdateType::BottomUp),
        ] {
            let params = SearchParameters {
                update_type,
                ..Default::default()
            };
            let mut tree =
                BinaryTree::new(grid.slave_ids.clone(), grid.master_ids.clone(), params).unwrap();
            tree.init(&grid.mesh).unwrap();

            group.throughput(Throughput::Elements(grid.mesh.num_elements() as u64));
            group.bench_function(BenchmarkId::new(label, name), |b| {
                b.iter(|| {
                    let pairs = tree.evaluate_search(black_box(&grid.mesh)).unwrap();
                    black_box(pairs.len());
                });
            });
        }
    }

    group.finish();
}

/// Benchmark collision search between element volumes
fn benchmark_collision_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("collision_search");

    let scales = vec![("1K", 1_000), ("10K", 10_000), ("100K", 100_000)];

    for (name, target_elements) in scales {
        let (num_beams, elements_per_beam) = calculate_grid_dimensions(target_elements);
        let grid = generate_beam_grid(num_beams, elements_per_beam, SPACING, OFFSET, RADIUS);
        let params = SearchParameters::default();
        let volumes = |ids: &[usize]| -> Vec<(usize, BoundingVolume)> {
            ids.iter()
                .map(|&gid| {
                    let points = grid.mesh.element_hull_points(gid).unwrap();
                    (gid, BoundingVolume::from_points(params.dop, &points).enlarged(RADIUS))
                })
                .collect()
        };
        let primitives = volumes(&grid.master_ids);
        let predicates = volumes(&grid.slave_ids);

        group.throughput(Throughput::Elements(predicates.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(primitives, predicates),
            |b, (primitives, predicates)| {
                b.iter(|| {
                    let pairs = collision_search(
                        black_box(primitives),
                        black_box(predicates),
                        &SerialCommunicator,
                        Verbosity::Quiet,
                    )
                    .unwrap();
                    black_box(pairs);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the Newton projection onto curves of different order
fn benchmark_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    let params = ProjectionParameters {
        verbosity: Verbosity::Quiet,
        ..Default::default()
    };
    let r_slave = Vector3::new(0.3, 0.4, 0.2);
    let curves = vec![
        (
            CurveShape::Line2,
            DVector::from_vec(vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
        ),
        (
            CurveShape::Line3,
            DVector::from_vec(vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -0.3, 0.0]),
        ),
        (
            CurveShape::Hermite2,
            DVector::from_vec(vec![
                -1.0, 0.0, 0.0, 0.8, -0.6, 0.0, 1.0, 0.0, 0.0, 0.8, 0.6, 0.0,
            ]),
        ),
    ];

    for (shape, dofs) in curves {
        group.bench_with_input(BenchmarkId::from_parameter(shape.name()), &dofs, |b, dofs| {
            b.iter(|| {
                let result = point_to_curve_projection(
                    black_box(&r_slave),
                    0.0,
                    black_box(dofs),
                    shape,
                    2.0,
                    &params,
                )
                .unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

/// Benchmark the complete pipeline (search + evaluation + assembly)
fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    // Reduce sample size for the full pipeline benchmarks as they take longer
    group.sample_size(10);

    let scales = vec![("1K", 1_000), ("10K", 10_000)];

    for (name, target_elements) in scales {
        let (num_beams, elements_per_beam) = calculate_grid_dimensions(target_elements);
        let grid = generate_beam_grid(num_beams, elements_per_beam, SPACING, OFFSET, RADIUS);
        let mut manager = BeamContactManager::new(
            &grid.mesh,
            grid.slave_ids.clone(),
            grid.master_ids.clone(),
            SearchParameters::default(),
            ProjectionParameters::default(),
            ContactParameters::default(),
        )
        .unwrap();

        group.throughput(Throughput::Elements(grid.mesh.num_elements() as u64));
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                let mut system = GlobalSystem::new(grid.mesh.num_dofs());
                let results = manager.evaluate(black_box(&grid.mesh), &mut system).unwrap();
                black_box((results, system));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_tree_init,
    benchmark_tree_search,
    benchmark_collision_search,
    benchmark_projection,
    benchmark_pipeline,
);

criterion_main!(benches);
