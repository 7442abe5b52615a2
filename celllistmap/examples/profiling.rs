use celllistmap::{UnitCell, PeriodicBox, CellList, Vector};
use celllistmap::{map_pairwise, map_pairwise_in_place};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n_particles = std::env::args().nth(1)
        .map_or(Ok(100_000), |n| n.parse::<usize>())?;

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    // run the calculation
    let (energy, forces) = soft_spheres(n_particles)?;
    let total_force = forces.iter().fold(Vector::zero(), |acc, &f| acc + f);
    println!("energy = {}, total force = {:?}", energy, total_force);

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Energy and forces for soft spheres, in a triclinic cell with a density of
/// 0.1 particles per unit volume
fn soft_spheres(n_particles: usize) -> Result<(f64, Vec<Vector<f64, 3>>), Box<dyn std::error::Error>> {
    const CUTOFF: f64 = 2.5;

    let length = (n_particles as f64 / 0.1).cbrt();
    let unit_cell = UnitCell::triclinic([
        [length, 0.0, 0.0],
        [0.3 * length, length, 0.0],
        [-0.2 * length, 0.1 * length, length],
    ])?;

    let phi = 1.2207440846057596_f64;
    let alpha = [1.0 / phi, 1.0 / (phi * phi), 1.0 / (phi * phi * phi)];
    let positions = (0..n_particles)
        .map(|i| alpha.map(|a| (0.5 + a * i as f64).fract()))
        .map(|fractional| unit_cell.cartesian(fractional.into()).into_array())
        .collect::<Vec<_>>();

    let result = time_graph::spanned!("Full calculation", {
        let periodic_box = PeriodicBox::new(unit_cell, CUTOFF)?;
        let cell_list = CellList::new(&positions, &periodic_box)?;

        let energy = map_pairwise(|pair, energy: f64| {
            let delta = 1.0 - pair.distance() / CUTOFF;
            energy + delta * delta
        }, 0.0, &periodic_box, &cell_list)?;

        let mut forces = vec![Vector::zero(); n_particles];
        map_pairwise_in_place(|pair, forces: &mut Vec<Vector<f64, 3>>| {
            let distance = pair.distance();
            let force = pair.displacement() * (2.0 * (1.0 - distance / CUTOFF) / (CUTOFF * distance));
            forces[pair.first] -= force;
            forces[pair.second] += force;
        }, &mut forces, &periodic_box, &cell_list)?;

        (energy, forces)
    });

    Ok(result)
}
