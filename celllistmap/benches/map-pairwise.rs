#![allow(clippy::needless_return)]

use celllistmap::{UnitCell, PeriodicBox, CellList, MapOptions, Additive, Vector};
use celllistmap::{map_pairwise_with, map_pairwise_in_place_with};

use criterion::{Criterion, black_box, criterion_group, criterion_main};

const CUTOFF: f64 = 2.5;

/// Quasi-random positions filling the unit cell, generated with the additive
/// recurrence based on the generalized golden ratio
fn positions(unit_cell: &UnitCell<f64, 3>, n_particles: usize) -> Vec<[f64; 3]> {
    let phi = 1.2207440846057596_f64;
    let alpha = [1.0 / phi, 1.0 / (phi * phi), 1.0 / (phi * phi * phi)];

    let mut positions = Vec::with_capacity(n_particles);
    for i in 0..n_particles {
        let fractional = alpha.map(|a| (0.5 + a * i as f64).fract());
        positions.push(unit_cell.cartesian(fractional.into()).into_array());
    }
    return positions;
}

fn setup(n_particles: usize, lcell: usize) -> (PeriodicBox<f64, 3>, CellList<f64, 3>) {
    let length = (n_particles as f64 / 0.1).cbrt();
    let unit_cell = UnitCell::triclinic([
        [length, 0.0, 0.0],
        [0.3 * length, length, 0.0],
        [-0.2 * length, 0.1 * length, length],
    ]).expect("invalid cell");

    let periodic_box = PeriodicBox::with_lcell(unit_cell, CUTOFF, lcell).expect("invalid box");
    let positions = positions(&unit_cell, n_particles);
    let cell_list = CellList::new(&positions, &periodic_box).expect("failed to build cell list");

    return (periodic_box, cell_list);
}

fn options(parallel: bool) -> MapOptions {
    if parallel {
        MapOptions::default()
    } else {
        MapOptions::serial()
    }
}

fn energy(c: &mut Criterion) {
    let mut group = c.benchmark_group("Soft sphere energy");
    group.noise_threshold(0.05);

    for &n_particles in black_box(&[1_000, 10_000, 100_000]) {
        for lcell in [1, 2] {
            let (periodic_box, cell_list) = setup(n_particles, lcell);

            for parallel in [false, true] {
                let name = format!(
                    "{} particles - lcell={} - {}",
                    n_particles, lcell, if parallel { "parallel" } else { "serial" }
                );
                group.bench_function(name, |b| b.iter(|| {
                    let energy = map_pairwise_with(
                        |pair, energy: f64| {
                            let delta = 1.0 - pair.distance() / CUTOFF;
                            energy + delta * delta
                        },
                        0.0, &periodic_box, &cell_list, Additive, options(parallel),
                    ).expect("failed to compute energy");
                    black_box(energy);
                }));
            }
        }
    }
}

fn forces(c: &mut Criterion) {
    let mut group = c.benchmark_group("Soft sphere forces (in place)");
    group.noise_threshold(0.05);

    for &n_particles in black_box(&[1_000, 10_000, 100_000]) {
        let (periodic_box, cell_list) = setup(n_particles, 1);
        let mut forces = vec![Vector::<f64, 3>::zero(); n_particles];

        for parallel in [false, true] {
            let name = format!("{} particles - {}", n_particles, if parallel { "parallel" } else { "serial" });
            group.bench_function(name, |b| b.iter(|| {
                map_pairwise_in_place_with(
                    |pair, forces: &mut Vec<Vector<f64, 3>>| {
                        let distance = pair.distance();
                        let force = pair.displacement() * (2.0 * (1.0 - distance / CUTOFF) / (CUTOFF * distance));
                        forces[pair.first] -= force;
                        forces[pair.second] += force;
                    },
                    &mut forces, &periodic_box, &cell_list, Additive, options(parallel),
                ).expect("failed to compute forces");
            }));
        }
    }
}

criterion_group!(map_pairwise, energy, forces);
criterion_main!(map_pairwise);
