//! Masked raster grids and raster operations.
//!
//! A [`Grid`] is an immutable 2-D raster over a [`GridFrame`]; every cell is
//! either set or unset ("masked"). Operations never mutate their inputs and
//! always return new grids, which keeps the habitat pipeline a pure,
//! data-parallel transform.
//!
//! # Operations
//!
//! ```text
//! Grid<i32> (land cover) ──remap──► Grid<f32> (ceilings)
//! Grid<f32> (elevation)  ──zip_with(<=)──► Grid<bool>
//!                        ──update_mask(zone == N)──► Grid<bool>
//!                        ──or / self_mask──► Grid<bool>
//! MultiPolygon features  ──rasterize_mode──► Grid<i32>
//! fine Grid<f32>         ──reduce_resolution_mean──► coarse Grid<f32>
//! ```

pub mod grid;
pub mod rasterize;
pub mod resample;

pub use grid::Grid;
pub use habitat_common::{GridFrame, HabitatError, HabitatResult};
pub use rasterize::rasterize_mode;
pub use resample::{reduce_resolution_mean, DEFAULT_MAX_SUBCELLS};
