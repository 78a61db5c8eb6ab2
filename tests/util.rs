#![allow(dead_code)]
use amr_meta::prelude::*;

/// Block of `cells` cells with unit-free `spacing`, no arrays.
pub fn grid(origin: [f64; 3], spacing: f64, cells: [usize; 3]) -> UniformGrid {
    UniformGrid::from_cells(origin, [spacing; 3], cells).unwrap()
}

/// Block carrying a scalar cell array whose value is the flat cell index.
pub fn grid_with_cell_ids(
    origin: [f64; 3],
    spacing: f64,
    cells: [usize; 3],
    name: &str,
) -> UniformGrid {
    let mut g = grid(origin, spacing, cells);
    let n = g.number_of_cells();
    g.add_cell_array(FieldArray::new(name, 1, (0..n).map(|i| i as f64).collect()).unwrap())
        .unwrap();
    g
}

/// Runs `f` on every rank of a fresh thread group; results in rank order.
pub fn run_ranks<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(RayonComm) -> T + Sync,
{
    let comms = RayonComm::group(size);
    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}

/// Boxes of `h` in replica order with their keys.
pub fn box_list<G>(h: &Hierarchy<G>) -> Vec<(BlockKey, AmrBox)> {
    h.all_boxes().map(|(k, b)| (k, *b)).collect()
}
