//! Common test fixtures for habitat tests.
//!
//! This module provides pre-defined values that represent common
//! scenarios in structural habitat derivation.

use habitat_common::GridFrame;

/// Common CRS identifiers.
pub mod crs {
    /// WGS84 geographic
    pub const EPSG_4326: &str = "EPSG:4326";

    /// Web Mercator
    pub const EPSG_3857: &str = "EPSG:3857";
}

/// ESA CCI land-cover classes used across tests.
pub mod classes {
    /// Cropland, rainfed
    pub const CROPLAND: i32 = 10;

    /// Tree cover, broadleaved, evergreen, closed to open (>15%)
    pub const TREE_BROADLEAVED_EVERGREEN: i32 = 50;

    /// Shrubland
    pub const SHRUBLAND: i32 = 120;

    /// Grassland
    pub const GRASSLAND: i32 = 130;

    /// Urban areas
    pub const URBAN: i32 = 190;

    /// Water bodies
    pub const WATER: i32 = 210;
}

/// Common species identifiers.
pub mod species {
    pub const TIGER: &str = "Panthera_tigris";
    pub const JAGUAR: &str = "Panthera_onca";
}

/// A working frame of `width` x `height` unit cells with its north-west
/// corner at (0, height).
pub fn unit_frame(width: usize, height: usize) -> GridFrame {
    GridFrame::new(crs::EPSG_4326, 0.0, height as f64, 1.0, 1.0, width, height)
}

/// A frame over the same extent as [`unit_frame`] with each unit cell split
/// into `factor` x `factor` sub-cells.
pub fn fine_frame(width: usize, height: usize, factor: usize) -> GridFrame {
    let size = 1.0 / factor as f64;
    GridFrame::new(
        crs::EPSG_4326,
        0.0,
        height as f64,
        size,
        size,
        width * factor,
        height * factor,
    )
}
