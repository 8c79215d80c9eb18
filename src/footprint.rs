//! Burnt area aggregation and polygonization of the binary burnt raster.
//!
//! Polygons follow cell edges exactly: regions are 4-connected, holes become
//! interior rings and rings touching at a single corner are split there.

use geo::{orient::Direction, Coord, LineString, Orient, Polygon};
use log::info;
use ndarray::{Array2, ArrayView2};
use std::collections::HashMap;

use crate::{
    classify::ClassCounts,
    components::{raster::Grid, transforms::GeoTransform},
};

const SQUARE_METERS_PER_HECTARE: f64 = 10_000.;

/// Area of the low severity or worse cells of a class raster.
pub fn burnt_area_hectares(classes: &Grid<u8>) -> f64 {
    let cells = ClassCounts::from_grid(classes).burnt();
    cells_to_hectares(cells, classes.cell_width())
}

pub fn cells_to_hectares(cells: usize, cell_width: f64) -> f64 {
    cells as f64 * cell_width * cell_width / SQUARE_METERS_PER_HECTARE
}

/// A connected burnt region.
#[derive(Debug, Clone, PartialEq)]
pub struct BurntRegion {
    /// 1-based, in order of each region's first cell (row-major).
    pub id: usize,
    pub cells: usize,
    pub area_ha: f64,
    pub polygon: Polygon<f64>,
}

/// One polygon per 4-connected region of `value` cells in `mask`.
pub fn polygonize(mask: &Grid<u8>, value: u8) -> Vec<BurntRegion> {
    let (labels, regions) = label_regions(mask.data(), value);
    let regions: Vec<BurntRegion> = regions
        .iter()
        .enumerate()
        .map(|(index, cells)| {
            let label = index + 1;
            let edges = region_edges(&labels, label, cells);
            let rings = trace_rings(&edges)
                .into_iter()
                .map(merge_collinear)
                .collect();
            BurntRegion {
                id: label,
                cells: cells.len(),
                area_ha: cells_to_hectares(cells.len(), mask.cell_width()),
                polygon: to_polygon(rings, mask.transform()),
            }
        })
        .collect();
    info!("{} burnt regions", regions.len());
    regions
}

/// `(col, row)` lattice point between cells.
type Vertex = (i64, i64);
type Edge = (Vertex, Vertex);

/// Labels 4-connected regions of `value`, 0 marking other cells.
fn label_regions(mask: ArrayView2<u8>, value: u8) -> (Array2<usize>, Vec<Vec<(usize, usize)>>) {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::<usize>::zeros((rows, cols));
    let mut regions = Vec::new();
    let mut stack = Vec::new();
    for ((row, col), &cell) in mask.indexed_iter() {
        if cell != value || labels[[row, col]] != 0 {
            continue;
        }
        let label = regions.len() + 1;
        let mut cells = Vec::new();
        labels[[row, col]] = label;
        stack.push((row, col));
        while let Some((row, col)) = stack.pop() {
            cells.push((row, col));
            let neighbours = [
                (row.wrapping_sub(1), col),
                (row + 1, col),
                (row, col.wrapping_sub(1)),
                (row, col + 1),
            ];
            for (row, col) in neighbours {
                if row < rows && col < cols && mask[[row, col]] == value && labels[[row, col]] == 0
                {
                    labels[[row, col]] = label;
                    stack.push((row, col));
                }
            }
        }
        regions.push(cells);
    }
    (labels, regions)
}

/// Directed cell edges separating the region from other cells, oriented
/// with the region on their right (clockwise in raster space).
fn region_edges(labels: &Array2<usize>, label: usize, cells: &[(usize, usize)]) -> Vec<Edge> {
    let inside = |row: i64, col: i64| {
        row >= 0
            && col >= 0
            && labels.get((row as usize, col as usize)) == Some(&label)
    };
    let mut edges = Vec::new();
    for &(row, col) in cells {
        let (r, c) = (row as i64, col as i64);
        if !inside(r - 1, c) {
            edges.push(((c, r), (c + 1, r)));
        }
        if !inside(r, c + 1) {
            edges.push(((c + 1, r), (c + 1, r + 1)));
        }
        if !inside(r + 1, c) {
            edges.push(((c + 1, r + 1), (c, r + 1)));
        }
        if !inside(r, c - 1) {
            edges.push(((c, r + 1), (c, r)));
        }
    }
    edges
}

fn direction((from, to): Edge) -> (i64, i64) {
    ((to.0 - from.0).signum(), (to.1 - from.1).signum())
}

/// Chains edges into closed rings.
///
/// Where two rings meet at a corner the chain turns left, which keeps them apart.
fn trace_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (index, (from, _)) in edges.iter().enumerate() {
        outgoing.entry(*from).or_default().push(index);
    }
    let successor = |index: usize| -> Option<usize> {
        let candidates = outgoing.get(&edges[index].1)?;
        match candidates.as_slice() {
            [only] => Some(*only),
            _ => {
                let (dx, dy) = direction(edges[index]);
                let left = (dy, -dx);
                candidates
                    .iter()
                    .copied()
                    .find(|&next| direction(edges[next]) == left)
            }
        }
    };

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for start in 0..edges.len() {
        let mut ring = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current.filter(|&index| !used[index]) {
            used[index] = true;
            ring.push(edges[index].0);
            current = successor(index);
        }
        if !ring.is_empty() {
            rings.push(ring);
        }
    }
    rings
}

/// Drops vertices in the middle of straight runs.
fn merge_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let count = ring.len();
    (0..count)
        .filter(|&index| {
            let previous = ring[(index + count - 1) % count];
            let next = ring[(index + 1) % count];
            direction((previous, ring[index])) != direction((ring[index], next))
        })
        .map(|index| ring[index])
        .collect()
}

/// Twice the signed area, in cells.
fn signed_area(ring: &[Vertex]) -> i64 {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| a.0 * b.1 - b.0 * a.1)
        .sum()
}

/// Largest ring is the exterior, the others its holes; oriented per RFC 7946.
fn to_polygon(mut rings: Vec<Vec<Vertex>>, transform: &GeoTransform) -> Polygon<f64> {
    let largest = rings
        .iter()
        .enumerate()
        .max_by_key(|(_, ring)| signed_area(ring).abs())
        .map(|(index, _)| index);
    let exterior = largest
        .map(|index| rings.swap_remove(index))
        .unwrap_or_default();
    let to_line = |ring: &Vec<Vertex>| -> LineString<f64> {
        ring.iter()
            .map(|&(col, row)| transform.pixel_to_geo(col as f64, row as f64))
            .collect::<Vec<Coord>>()
            .into()
    };
    Polygon::new(to_line(&exterior), rings.iter().map(to_line).collect())
        .orient(Direction::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{Area, Winding};
    use ndarray::array;
    use rstest::rstest;

    fn grid(data: Array2<u8>) -> Grid<u8> {
        Grid::new(data, GeoTransform::new(500_000., 4_000_000., 10., -10.))
    }

    #[rstest]
    fn area_counts_low_severity_or_worse() {
        let classes = grid(array![[1, 2, 3], [4, 5, 6], [2, 2, 0]]);
        assert_eq!(burnt_area_hectares(&classes), 4. * 100. / 10_000.);
    }

    #[rstest]
    #[case(10., 9, 0.09)]
    #[case(20., 3, 0.12)]
    #[case(30., 0, 0.)]
    fn hectares_from_cells(#[case] cell_width: f64, #[case] cells: usize, #[case] expected: f64) {
        assert_abs_diff_eq!(cells_to_hectares(cells, cell_width), expected, epsilon = 1e-12);
    }

    #[rstest]
    fn single_cell_is_a_square() {
        let regions = polygonize(&grid(array![[0, 0], [0, 1]]), 1);
        assert_eq!(regions.len(), 1);
        let polygon = &regions[0].polygon;
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(polygon.unsigned_area(), 100.);
        assert!(polygon.exterior().is_ccw());
        assert_eq!(regions[0].cells, 1);
    }

    #[rstest]
    fn straight_edges_are_merged() {
        let regions = polygonize(&grid(Array2::from_elem((3, 4), 1)), 1);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].polygon.exterior().0.len(), 5);
        assert_eq!(regions[0].polygon.unsigned_area(), 1200.);
    }

    #[rstest]
    fn holes_become_interior_rings() {
        let regions = polygonize(&grid(array![[1, 1, 1], [1, 0, 1], [1, 1, 1]]), 1);
        assert_eq!(regions.len(), 1);
        let polygon = &regions[0].polygon;
        assert_eq!(polygon.interiors().len(), 1);
        assert!(polygon.interiors()[0].is_cw());
        assert_eq!(polygon.unsigned_area(), 800.);
    }

    #[rstest]
    fn diagonal_cells_are_separate_regions() {
        let regions = polygonize(&grid(array![[1, 0], [0, 1]]), 1);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions.iter().map(|region| region.id).collect::<Vec<_>>(), [1, 2]);
    }

    #[rstest]
    fn corner_touching_hole_is_split_off() {
        let regions = polygonize(&grid(array![[1, 1, 0], [1, 0, 1], [1, 1, 1]]), 1);
        assert_eq!(regions.len(), 1);
        let polygon = &regions[0].polygon;
        assert_eq!(polygon.interiors().len(), 1);
        assert_eq!(polygon.interiors()[0].0.len(), 5);
        assert_eq!(polygon.unsigned_area(), 700.);
    }

    #[rstest]
    fn region_areas_add_up_to_burnt_area() {
        let classes = grid(array![
            [3, 3, 2, 6, 6],
            [2, 4, 2, 2, 6],
            [1, 1, 5, 2, 2],
            [6, 2, 5, 5, 1],
        ]);
        let burnt = crate::classify::burnt_mask(&classes);
        let regions = polygonize(&burnt, 1);
        let polygon_area: f64 = regions.iter().map(|region| region.polygon.unsigned_area()).sum();
        let region_hectares: f64 = regions.iter().map(|region| region.area_ha).sum();
        assert_abs_diff_eq!(polygon_area / 10_000., burnt_area_hectares(&classes), epsilon = 1e-9);
        assert_abs_diff_eq!(region_hectares, burnt_area_hectares(&classes), epsilon = 1e-12);
        assert_eq!(regions.len(), 4);
    }

    #[rstest]
    fn empty_mask_has_no_regions() {
        assert!(polygonize(&grid(Array2::zeros((3, 3))), 1).is_empty());
    }
}
