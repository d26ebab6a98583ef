//! Reference frames for north-up rasters.

use crate::{BoundingBox, HabitatError, HabitatResult};
use serde::{Deserialize, Serialize};

/// Relative tolerance used when comparing origins and cell sizes.
const ALIGN_EPSILON: f64 = 1e-9;

/// Relative tolerance for matching a nominal working scale.
const SCALE_EPSILON: f64 = 1e-6;

/// CRS identifiers whose cell sizes are in degrees.
const GEOGRAPHIC_CRS: &[&str] = &["EPSG:4326", "CRS:84"];

/// Specification of a regular, north-up raster.
///
/// Row 0 is the northern edge; cells are stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFrame {
    /// CRS identifier, e.g. "EPSG:4326".
    pub crs: String,
    /// X coordinate of the western edge.
    pub origin_x: f64,
    /// Y coordinate of the northern edge.
    pub origin_y: f64,
    /// Cell size along X (positive).
    pub cell_width: f64,
    /// Cell size along Y (positive).
    pub cell_height: f64,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl GridFrame {
    /// Create a new frame.
    pub fn new(
        crs: impl Into<String>,
        origin_x: f64,
        origin_y: f64,
        cell_width: f64,
        cell_height: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            crs: crs.into(),
            origin_x,
            origin_y,
            cell_width,
            cell_height,
            width,
            height,
        }
    }

    /// Build a frame covering `bbox` with `width` x `height` cells.
    pub fn from_bbox(
        crs: impl Into<String>,
        bbox: BoundingBox,
        width: usize,
        height: usize,
    ) -> Self {
        Self::new(
            crs,
            bbox.min_x,
            bbox.max_y,
            bbox.width() / width.max(1) as f64,
            bbox.height() / height.max(1) as f64,
            width,
            height,
        )
    }

    /// Extent of the frame.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.origin_y - self.height as f64 * self.cell_height,
            self.origin_x + self.width as f64 * self.cell_width,
            self.origin_y,
        )
    }

    /// Check if cell sizes are angular rather than linear.
    pub fn is_geographic(&self) -> bool {
        GEOGRAPHIC_CRS
            .iter()
            .any(|crs| self.crs.eq_ignore_ascii_case(crs))
    }

    /// Check if both cell sizes equal `size` in CRS units.
    pub fn has_cell_size(&self, size: f64) -> bool {
        close_within(self.cell_width, size, SCALE_EPSILON)
            && close_within(self.cell_height, size, SCALE_EPSILON)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if the frame has no cells.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Flat row-major index of a cell.
    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    /// Centre coordinate of a cell.
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.cell_width,
            self.origin_y - (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// Extent of a single cell.
    pub fn cell_bbox(&self, col: usize, row: usize) -> BoundingBox {
        let min_x = self.origin_x + col as f64 * self.cell_width;
        let max_y = self.origin_y - row as f64 * self.cell_height;
        BoundingBox::new(min_x, max_y - self.cell_height, min_x + self.cell_width, max_y)
    }

    /// Cell containing a coordinate; `None` outside the frame.
    ///
    /// Cells are half-open: western and northern edges belong to the cell.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let fx = (x - self.origin_x) / self.cell_width;
        let fy = (self.origin_y - y) / self.cell_height;
        if fx < 0.0 || fy < 0.0 {
            return None;
        }
        let col = fx.floor() as usize;
        let row = fy.floor() as usize;
        if col < self.width && row < self.height {
            Some((col, row))
        } else {
            None
        }
    }

    /// Check that `other` describes exactly the same cells.
    pub fn check_aligned(&self, other: &GridFrame, left: &str, right: &str) -> HabitatResult<()> {
        if self.crs != other.crs {
            return Err(HabitatError::misaligned(
                left,
                right,
                format!("crs {} != {}", self.crs, other.crs),
            ));
        }
        if self.width != other.width || self.height != other.height {
            return Err(HabitatError::misaligned(
                left,
                right,
                format!(
                    "shape {}x{} != {}x{}",
                    self.width, self.height, other.width, other.height
                ),
            ));
        }
        if !close(self.cell_width, other.cell_width)
            || !close(self.cell_height, other.cell_height)
        {
            return Err(HabitatError::misaligned(
                left,
                right,
                format!(
                    "resolution ({}, {}) != ({}, {})",
                    self.cell_width, self.cell_height, other.cell_width, other.cell_height
                ),
            ));
        }
        if !close(self.origin_x, other.origin_x) || !close(self.origin_y, other.origin_y) {
            return Err(HabitatError::misaligned(
                left,
                right,
                format!(
                    "origin ({}, {}) != ({}, {})",
                    self.origin_x, self.origin_y, other.origin_x, other.origin_y
                ),
            ));
        }
        Ok(())
    }
}

fn close(a: f64, b: f64) -> bool {
    close_within(a, b, ALIGN_EPSILON)
}

fn close_within(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon * a.abs().max(b.abs()).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> GridFrame {
        GridFrame::new("EPSG:4326", 10.0, 50.0, 0.5, 0.5, 4, 2)
    }

    #[test]
    fn test_bbox() {
        let bbox = frame().bbox();
        assert_eq!(bbox.min_x, 10.0);
        assert_eq!(bbox.max_x, 12.0);
        assert_eq!(bbox.min_y, 49.0);
        assert_eq!(bbox.max_y, 50.0);
    }

    #[test]
    fn test_cell_center_and_lookup_agree() {
        let f = frame();
        for row in 0..f.height {
            for col in 0..f.width {
                let (x, y) = f.cell_center(col, row);
                assert_eq!(f.cell_at(x, y), Some((col, row)));
            }
        }
        assert_eq!(f.cell_at(9.9, 49.5), None);
        assert_eq!(f.cell_at(11.0, 48.9), None);
    }

    #[test]
    fn test_from_bbox() {
        let f = GridFrame::from_bbox("EPSG:4326", BoundingBox::new(0.0, 0.0, 4.0, 2.0), 8, 4);
        assert!((f.cell_width - 0.5).abs() < f64::EPSILON);
        assert!((f.cell_height - 0.5).abs() < f64::EPSILON);
        assert_eq!(f.origin_y, 2.0);
    }

    #[test]
    fn test_geographic_and_cell_size() {
        assert!(frame().is_geographic());
        assert!(GridFrame::new("crs:84", 0.0, 0.0, 1.0, 1.0, 1, 1).is_geographic());

        let projected = GridFrame::new("EPSG:3857", 0.0, 600.0, 300.0, 300.0, 2, 2);
        assert!(!projected.is_geographic());
        assert!(projected.has_cell_size(300.0));
        assert!(projected.has_cell_size(300.0 + 1e-5));
        assert!(!projected.has_cell_size(250.0));
    }

    #[test]
    fn test_check_aligned() {
        let f = frame();
        assert!(f.check_aligned(&f.clone(), "a", "b").is_ok());

        let mut other = f.clone();
        other.width = 5;
        let err = f.check_aligned(&other, "land_cover", "elevation").unwrap_err();
        assert!(matches!(err, HabitatError::Misaligned { .. }));

        let mut other = f.clone();
        other.crs = "EPSG:3857".to_string();
        assert!(f.check_aligned(&other, "a", "b").is_err());

        let mut other = f.clone();
        other.origin_x += 0.25;
        assert!(f.check_aligned(&other, "a", "b").is_err());
    }
}
