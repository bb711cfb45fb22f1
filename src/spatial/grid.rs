// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use log::debug;

use super::SpatialIndex;
use crate::Bounds;

/// A uniform-grid spatial index over link bounding boxes.
///
/// The plane is partitioned into square cells of `cell_size`; each link is
/// recorded in every cell its bounding box overlaps. A bound lying exactly
/// on a cell boundary is recorded in the neighboring cell too, so queries
/// at the boundary cannot miss it. Lookups visit only the cells covered by
/// the query radius and de-duplicate links recorded in several of them.
#[derive(Debug, Clone)]
pub struct GridIndex {
    cell_size: f64,
    entries: Vec<(i32, Bounds)>,
    cells: HashMap<(i64, i64), Vec<u32>>,
}

impl GridIndex {
    /// Builds the index from `(link id, bounding box)` pairs.
    ///
    /// `cell_size` should roughly match the typical link extent; see
    /// [DEFAULT_CELL_SIZE](super::DEFAULT_CELL_SIZE).
    pub fn build<I: IntoIterator<Item = (i32, Bounds)>>(items: I, cell_size: f64) -> Self {
        assert!(cell_size > 0.0);

        let entries: Vec<(i32, Bounds)> = items.into_iter().collect();
        let mut cells: HashMap<(i64, i64), Vec<u32>> = HashMap::new();

        for (index, (_, bounds)) in entries.iter().enumerate() {
            let (x0, x1) = cell_range(bounds.min_x, bounds.max_x, cell_size);
            let (y0, y1) = cell_range(bounds.min_y, bounds.max_y, cell_size);
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    cells.entry((cx, cy)).or_default().push(index as u32);
                }
            }
        }

        debug!(
            "grid index: {} links in {} cells of {} m",
            entries.len(),
            cells.len(),
            cell_size
        );
        Self {
            cell_size,
            entries,
            cells,
        }
    }
}

impl SpatialIndex for GridIndex {
    fn query(&self, x: f64, y: f64, radius: f64) -> Vec<i32> {
        let (x0, x1) = cell_range(x - radius, x + radius, self.cell_size);
        let (y0, y1) = cell_range(y - radius, y + radius, self.cell_size);

        let mut candidates: Vec<u32> = Vec::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(indices) = self.cells.get(&(cx, cy)) {
                    candidates.extend_from_slice(indices);
                }
            }
        }

        // A link overlapping several visited cells shows up once per cell.
        candidates.sort_unstable();
        candidates.dedup();

        candidates
            .into_iter()
            .map(|i| &self.entries[i as usize])
            .filter(|(_, bounds)| bounds.contains_within(x, y, radius))
            .map(|&(id, _)| id)
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The inclusive range of cell indices covered by `[lo, hi]`. A bound
/// sitting exactly on a cell boundary widens the range to the cell below
/// it as well.
fn cell_range(lo: f64, hi: f64, cell_size: f64) -> (i64, i64) {
    let mut lo_cell = (lo / cell_size).floor() as i64;
    if lo % cell_size == 0.0 {
        lo_cell -= 1;
    }
    let hi_cell = (hi / cell_size).floor() as i64;
    (lo_cell, hi_cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn bounds(x0: f64, y0: f64, x1: f64, y1: f64) -> Bounds {
        Bounds::of(&[Point::new(x0, y0, 0.0), Point::new(x1, y1, 0.0)])
    }

    #[test]
    fn query_filters_by_inflated_bounds() {
        let index = GridIndex::build(
            vec![
                (1, bounds(0.0, 0.0, 100.0, 10.0)),
                (2, bounds(1000.0, 1000.0, 1100.0, 1010.0)),
            ],
            500.0,
        );

        assert_eq!(index.query(50.0, 5.0, 10.0), vec![1]);
        assert_eq!(index.query(50.0, 45.0, 10.0), Vec::<i32>::new());
        assert_eq!(index.query(50.0, 45.0, 40.0), vec![1]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn large_links_are_found_from_any_overlapped_cell() {
        // A link spanning many cells must be reported exactly once.
        let index = GridIndex::build(vec![(1, bounds(0.0, 0.0, 2400.0, 10.0))], 500.0);
        assert_eq!(index.query(1700.0, 5.0, 1.0), vec![1]);
        assert_eq!(index.query(30.0, 5.0, 1.0), vec![1]);
    }

    #[test]
    fn boundary_aligned_bounds_are_not_missed() {
        // Bounding box sitting exactly on the cell boundary at x = 500.
        let index = GridIndex::build(vec![(1, bounds(500.0, 0.0, 600.0, 10.0))], 500.0);
        // Query from just inside the neighboring cell.
        assert_eq!(index.query(499.0, 5.0, 2.0), vec![1]);
    }

    #[test]
    fn negative_coordinates_work() {
        let index = GridIndex::build(vec![(1, bounds(-700.0, -700.0, -600.0, -650.0))], 500.0);
        assert_eq!(index.query(-650.0, -675.0, 1.0), vec![1]);
        assert_eq!(index.query(650.0, 675.0, 1.0), Vec::<i32>::new());
    }
}
