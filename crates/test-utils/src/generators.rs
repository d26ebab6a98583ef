//! Test data generators for creating synthetic habitat inputs.
//!
//! These generators create predictable, verifiable patterns that can be
//! used across the test suite.

use geo::{polygon, MultiPolygon};
use serde_json::{json, Map, Value};

/// Creates an elevation ramp in metres.
///
/// Each cell value is calculated as: `base + col * step_x + row * step_y`
///
/// # Returns
///
/// A `Vec<f32>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_elevation_ramp;
///
/// let dem = create_elevation_ramp(3, 2, 100.0, 10.0, 1000.0);
/// assert_eq!(dem.len(), 6);
/// assert_eq!(dem[0], 100.0);  // col=0, row=0
/// assert_eq!(dem[1], 110.0);  // col=1, row=0
/// assert_eq!(dem[3], 1100.0); // col=0, row=1
/// ```
pub fn create_elevation_ramp(
    width: usize,
    height: usize,
    base: f32,
    step_x: f32,
    step_y: f32,
) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(base + col as f32 * step_x + row as f32 * step_y);
        }
    }
    data
}

/// Creates a land-cover grid of vertical stripes cycling through `classes`.
///
/// Column `c` takes `classes[c % classes.len()]` on every row.
pub fn create_class_stripes(width: usize, height: usize, classes: &[i32]) -> Vec<i32> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(classes[col % classes.len()]);
        }
    }
    data
}

/// An axis-aligned rectangle as a single-polygon MultiPolygon.
pub fn rect_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: min_x, y: min_y),
        (x: max_x, y: min_y),
        (x: max_x, y: max_y),
        (x: min_x, y: max_y),
        (x: min_x, y: min_y),
    ]])
}

/// Builds a reclass record in the layout of the lookup tables:
/// `lc_value`, `include_class`, `include_height` and one `elev_zone<N>`
/// column per `(zone, ceiling)` pair.
pub fn reclass_record(
    lc_value: i32,
    include_class: u8,
    include_height: u8,
    ceilings: &[(i32, f64)],
) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("lc_value".to_string(), json!(lc_value));
    record.insert("include_class".to_string(), json!(include_class));
    record.insert("include_height".to_string(), json!(include_height));
    for (zone, ceiling) in ceilings {
        record.insert(format!("elev_zone{}", zone), json!(ceiling));
    }
    record
}
