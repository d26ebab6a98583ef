//! Canopy mask from forest height.
//!
//! Height is restricted to the water mask, thresholded into canopy and
//! non-canopy sub-cells, reduced to the working frame as a canopy fraction,
//! then compared against the species' minimum fraction. The result depends
//! on neither zone nor land-cover class, so one mask serves every zone.

use habitat_common::{GridFrame, HabitatResult};
use habitat_raster::{reduce_resolution_mean, Grid};
use tracing::debug;

use crate::config::HeightThreshold;

/// Canopy fraction and the resulting boolean mask at the working frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightRefinementMask {
    fraction: Grid<f32>,
    mask: Grid<bool>,
}

impl HeightRefinementMask {
    /// Compute the mask.
    ///
    /// `forest_height` and `water_mask` must share a frame (typically the
    /// native height resolution); `working_frame` is the compositor's frame.
    ///
    /// # Errors
    ///
    /// Returns a data-shape error if the height and water grids are not
    /// aligned or the working frame uses a different CRS.
    pub fn compute(
        forest_height: &Grid<f32>,
        water_mask: &Grid<bool>,
        threshold: &HeightThreshold,
        working_frame: &GridFrame,
        max_subcells: usize,
    ) -> HabitatResult<Self> {
        forest_height.check_aligned(water_mask, "forest_height", "water_mask")?;

        let canopy = forest_height
            .update_mask(water_mask)?
            .map(|h| Some(if h >= threshold.min_height { 1.0f32 } else { 0.0 }));

        let fraction = reduce_resolution_mean(&canopy, working_frame, max_subcells)?;
        let mask = fraction.map(|f| Some(f >= threshold.min_canopy_fraction));

        debug!(
            min_height = threshold.min_height,
            min_canopy_fraction = threshold.min_canopy_fraction,
            evaluated_cells = fraction.count_set(),
            canopy_cells = mask.count_true(),
            "Computed height refinement mask"
        );

        Ok(Self { fraction, mask })
    }

    /// Build from a precomputed canopy fraction grid.
    pub fn from_fraction(fraction: Grid<f32>, min_canopy_fraction: f32) -> Self {
        let mask = fraction.map(|f| Some(f >= min_canopy_fraction));
        Self { fraction, mask }
    }

    /// Canopy fraction per working cell; unset where no valid sub-cells.
    pub fn fraction(&self) -> &Grid<f32> {
        &self.fraction
    }

    /// True where the canopy fraction meets the threshold.
    pub fn mask(&self) -> &Grid<bool> {
        &self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitat_raster::DEFAULT_MAX_SUBCELLS;
    use test_utils::{fine_frame, unit_frame};

    fn threshold(min_canopy_fraction: f32) -> HeightThreshold {
        HeightThreshold {
            min_height: 5.0,
            min_canopy_fraction,
        }
    }

    #[test]
    fn test_fraction_and_mask() {
        // 2x1 working cells, each split into 2x2 sub-cells.
        let fine = fine_frame(2, 1, 2);
        #[rustfmt::skip]
        let heights = vec![
            10.0, 10.0,  1.0, 10.0,
            10.0,  1.0,  1.0,  1.0,
        ];
        let height = Grid::from_values(fine.clone(), heights).unwrap();
        let water = Grid::filled(fine, true);

        let refinement = HeightRefinementMask::compute(
            &height,
            &water,
            &threshold(0.5),
            &unit_frame(2, 1),
            DEFAULT_MAX_SUBCELLS,
        )
        .unwrap();

        assert!((refinement.fraction().get(0, 0).unwrap() - 0.75).abs() < 1e-6);
        assert!((refinement.fraction().get(1, 0).unwrap() - 0.25).abs() < 1e-6);
        assert_eq!(refinement.mask().cells(), &[Some(true), Some(false)]);
    }

    #[test]
    fn test_water_mask_limits_denominator() {
        let fine = fine_frame(1, 1, 2);
        let height = Grid::from_values(fine.clone(), vec![10.0, 1.0, 1.0, 1.0]).unwrap();
        // Only the tall sub-cell is water-covered.
        let water = Grid::new(fine, vec![Some(true), Some(false), None, Some(false)]).unwrap();

        let refinement = HeightRefinementMask::compute(
            &height,
            &water,
            &threshold(0.75),
            &unit_frame(1, 1),
            DEFAULT_MAX_SUBCELLS,
        )
        .unwrap();

        assert!((refinement.fraction().get(0, 0).unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(refinement.mask().get(0, 0), Some(true));
    }

    #[test]
    fn test_subcell_cap_samples_on_stride() {
        // 16x16 sub-cells, tall canopy on every third diagonal: 86 of 256.
        let fine = fine_frame(1, 1, 16);
        let heights: Vec<f32> = (0..256)
            .map(|i| if (i % 16 + i / 16) % 3 == 0 { 12.0 } else { 0.0 })
            .collect();
        let height = Grid::from_values(fine.clone(), heights).unwrap();
        let water = Grid::filled(fine, true);
        let working = unit_frame(1, 1);

        let full = HeightRefinementMask::compute(
            &height,
            &water,
            &threshold(0.35),
            &working,
            DEFAULT_MAX_SUBCELLS,
        )
        .unwrap();
        assert!((full.fraction().get(0, 0).unwrap() - 86.0 / 256.0).abs() < 1e-6);
        assert_eq!(full.mask().get(0, 0), Some(false));

        // A cap of 16 reads every fourth row and column: 6 of 16.
        let capped =
            HeightRefinementMask::compute(&height, &water, &threshold(0.35), &working, 16).unwrap();
        assert!((capped.fraction().get(0, 0).unwrap() - 0.375).abs() < 1e-6);
        assert_eq!(capped.mask().get(0, 0), Some(true));
    }

    #[test]
    fn test_no_water_leaves_cell_unset() {
        let fine = fine_frame(1, 1, 2);
        let height = Grid::filled(fine.clone(), 20.0f32);
        let water = Grid::filled(fine, false);

        let refinement = HeightRefinementMask::compute(
            &height,
            &water,
            &threshold(0.1),
            &unit_frame(1, 1),
            DEFAULT_MAX_SUBCELLS,
        )
        .unwrap();

        assert_eq!(refinement.fraction().get(0, 0), None);
        assert_eq!(refinement.mask().count_set(), 0);
    }

    #[test]
    fn test_misaligned_water_mask() {
        let height = Grid::filled(fine_frame(1, 1, 2), 20.0f32);
        let water = Grid::filled(fine_frame(1, 1, 4), true);
        let err = HeightRefinementMask::compute(
            &height,
            &water,
            &threshold(0.1),
            &unit_frame(1, 1),
            DEFAULT_MAX_SUBCELLS,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "DataShapeError");
    }

    #[test]
    fn test_from_fraction() {
        let fraction = Grid::from_values(unit_frame(2, 1), vec![0.40f32, 0.80]).unwrap();
        let refinement = HeightRefinementMask::from_fraction(fraction, 0.75);
        assert_eq!(refinement.mask().cells(), &[Some(false), Some(true)]);
    }
}
