//! Polygon rasterization with a mode reducer.
//!
//! Each cell is sampled at its centre. A cell covered by several features
//! takes the most frequent value among them; ties go to the value of the
//! earliest feature in input order. Boundaries count as covered, so a centre
//! lying exactly on a shared edge sees both features and the earlier one
//! wins the tie.

use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use habitat_common::GridFrame;
use tracing::debug;

use crate::Grid;

/// Rasterize `features` onto `frame`, assigning each cell the mode value of
/// the features covering its centre. Uncovered cells are unset.
pub fn rasterize_mode<V: Copy + PartialEq>(
    frame: &GridFrame,
    features: &[(V, &MultiPolygon<f64>)],
) -> Grid<V> {
    // Per cell, the indices of covering features in input order.
    let mut hits: Vec<Vec<usize>> = vec![Vec::new(); frame.len()];

    for (index, (_, geometry)) in features.iter().enumerate() {
        let Some(rect) = geometry.bounding_rect() else {
            continue;
        };
        let (min, max) = (rect.min(), rect.max());
        let Some((cols, rows)) = cell_window(frame, min.x, min.y, max.x, max.y) else {
            continue;
        };

        for row in rows {
            for col in cols.clone() {
                let (x, y) = frame.cell_center(col, row);
                if geometry.intersects(&Point::new(x, y)) {
                    hits[frame.index(col, row)].push(index);
                }
            }
        }
    }

    let cells: Vec<Option<V>> = hits
        .iter()
        .map(|covering| mode_of(covering, features))
        .collect();

    let covered = cells.iter().filter(|c| c.is_some()).count();
    debug!(
        features = features.len(),
        covered_cells = covered,
        total_cells = frame.len(),
        "Rasterized polygon features"
    );

    Grid::from_parts(frame.clone(), cells)
}

/// Range of columns and rows whose centres can fall inside the given extent.
fn cell_window(
    frame: &GridFrame,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    if frame.is_empty() {
        return None;
    }
    let clamp = |v: f64, limit: usize| -> usize { v.max(0.0).min(limit as f64) as usize };

    let col_start = clamp(((min_x - frame.origin_x) / frame.cell_width - 0.5).floor(), frame.width);
    let col_end = clamp(((max_x - frame.origin_x) / frame.cell_width + 0.5).ceil(), frame.width);
    let row_start =
        clamp(((frame.origin_y - max_y) / frame.cell_height - 0.5).floor(), frame.height);
    let row_end = clamp(((frame.origin_y - min_y) / frame.cell_height + 0.5).ceil(), frame.height);

    if col_start >= col_end || row_start >= row_end {
        return None;
    }
    Some((col_start..col_end, row_start..row_end))
}

/// Most frequent value among the covering features; earliest feature wins ties.
fn mode_of<V: Copy + PartialEq>(
    covering: &[usize],
    features: &[(V, &MultiPolygon<f64>)],
) -> Option<V> {
    let mut best: Option<(V, usize)> = None;
    for (position, &index) in covering.iter().enumerate() {
        let value = features[index].0;
        // Count each distinct value once, at its first occurrence.
        if covering[..position].iter().any(|&i| features[i].0 == value) {
            continue;
        }
        let count = covering.iter().filter(|&&i| features[i].0 == value).count();
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}
