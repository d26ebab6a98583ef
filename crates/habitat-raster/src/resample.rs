//! Resolution reduction from a fine grid onto a coarser frame.
//!
//! Each coarse cell gathers the fine cells whose centres fall inside it and
//! takes the mean of the set ones, so a 0/1 input yields the covered area
//! fraction. Unset fine cells are ignored rather than counted as zero.

use habitat_common::{GridFrame, HabitatError, HabitatResult};
use rayon::prelude::*;
use tracing::debug;

use crate::Grid;

/// Default cap on fine cells sampled per coarse cell.
pub const DEFAULT_MAX_SUBCELLS: usize = 1024;

/// Reduce `fine` onto `target` by averaging set sub-cells.
///
/// When a coarse cell spans more than `max_subcells` fine cells, the fine
/// cells are sampled on a uniform stride so at most roughly `max_subcells`
/// are read. The result then approximates the full mean.
///
/// A coarse cell with no set sub-cells is unset.
///
/// # Errors
///
/// Returns `HabitatError::Misaligned` when the two frames use different CRS.
pub fn reduce_resolution_mean(
    fine: &Grid<f32>,
    target: &GridFrame,
    max_subcells: usize,
) -> HabitatResult<Grid<f32>> {
    let source = fine.frame();
    if source.crs != target.crs {
        return Err(HabitatError::misaligned(
            "fine",
            "target",
            format!("crs {} != {}", source.crs, target.crs),
        ));
    }
    if target.is_empty() || !source.bbox().intersects(&target.bbox()) {
        debug!(
            target_width = target.width,
            target_height = target.height,
            "Target does not overlap fine grid"
        );
        return Ok(Grid::empty(target.clone()));
    }

    let max_subcells = max_subcells.max(1);
    let mut cells = vec![None; target.len()];

    cells
        .par_chunks_mut(target.width)
        .enumerate()
        .for_each(|(row, out_row)| {
            for (col, out) in out_row.iter_mut().enumerate() {
                *out = mean_of_window(fine, source, target, col, row, max_subcells);
            }
        });

    let result = Grid::from_parts(target.clone(), cells);
    debug!(
        fine_width = source.width,
        fine_height = source.height,
        target_width = target.width,
        target_height = target.height,
        set_cells = result.count_set(),
        "Reduced grid resolution"
    );
    Ok(result)
}

/// Mean of the set fine cells whose centres lie inside one coarse cell.
fn mean_of_window(
    fine: &Grid<f32>,
    source: &GridFrame,
    target: &GridFrame,
    col: usize,
    row: usize,
    max_subcells: usize,
) -> Option<f32> {
    let bbox = target.cell_bbox(col, row);
    let clamp = |v: f64, limit: usize| -> usize { v.max(0.0).min(limit as f64) as usize };

    // Fine column c has its centre in [min_x, max_x) and fine row r has its
    // centre in (min_y, max_y], matching GridFrame::cell_at.
    let first_col =
        |x: f64| clamp(((x - source.origin_x) / source.cell_width - 0.5).ceil(), source.width);
    let first_row =
        |y: f64| clamp(((source.origin_y - y) / source.cell_height - 0.5).ceil(), source.height);
    let col_start = first_col(bbox.min_x);
    let col_end = first_col(bbox.max_x);
    let row_start = first_row(bbox.max_y);
    let row_end = first_row(bbox.min_y);

    if col_start >= col_end || row_start >= row_end {
        return None;
    }

    let span = (col_end - col_start) * (row_end - row_start);
    let stride = if span > max_subcells {
        ((span as f64 / max_subcells as f64).sqrt().ceil() as usize).max(1)
    } else {
        1
    };

    let mut sum = 0.0f64;
    let mut count = 0usize;
    for r in (row_start..row_end).step_by(stride) {
        for c in (col_start..col_end).step_by(stride) {
            if let Some(v) = fine.get(c, r) {
                if !v.is_nan() {
                    sum += v as f64;
                    count += 1;
                }
            }
        }
    }

    if count == 0 {
        None
    } else {
        Some((sum / count as f64) as f32)
    }
}
