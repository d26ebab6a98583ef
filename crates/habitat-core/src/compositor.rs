//! Zone compositor: per-zone habitat passes and the mosaic merge.
//!
//! ```text
//!   land cover ─remap(base)────► ceiling ─┐
//!                                         ├─ elev <= ceiling ─ ∩ zone ───────────┐
//!   elevation (prefiltered) ──────────────┘                                      ├─ OR ─ self_mask
//!   land cover ─remap(refined)─► ceiling ─ elev <= ceiling ─ ∩ zone ─ ∩ canopy ──┘
//! ```
//!
//! Zone results are merged in ascending zone id. A cell claimed by more than
//! one zone keeps the lowest id and is counted as an overlap.

use std::collections::BTreeMap;

use habitat_common::{ClassValue, GridFrame, HabitatResult, ZoneId};
use habitat_raster::Grid;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::ElevationLimits;
use crate::height::HeightRefinementMask;
use crate::reclass::{ReclassTable, ZoneLookup};
use crate::zones::ZonePartition;

/// Result of merging zone-local habitat grids.
#[derive(Debug, Clone, PartialEq)]
pub struct Mosaic {
    /// True where habitat, unset elsewhere.
    pub habitat: Grid<bool>,
    /// Zone whose result supplied each habitat cell.
    pub owners: Grid<ZoneId>,
    /// Habitat cells owned by each merged zone (zero for zones with none).
    pub zone_cells: BTreeMap<ZoneId, usize>,
    /// Cells where more than one zone produced habitat.
    pub overlapping_cells: usize,
}

/// Combines the reclass table, zone partition and canopy mask over a set of
/// aligned input grids.
pub struct ZoneCompositor<'a> {
    land_cover: &'a Grid<ClassValue>,
    elevation: Grid<f32>,
    zones: &'a ZonePartition,
    table: &'a ReclassTable,
    canopy: Option<&'a Grid<bool>>,
}

impl<'a> ZoneCompositor<'a> {
    /// Prepare a compositor, applying the elevation prefilter if given.
    ///
    /// # Errors
    ///
    /// Fails fast with a data-shape error when any input grid is not
    /// aligned to the land-cover grid.
    pub fn new(
        land_cover: &'a Grid<ClassValue>,
        elevation: &Grid<f32>,
        zones: &'a ZonePartition,
        table: &'a ReclassTable,
        height_mask: Option<&'a HeightRefinementMask>,
        limits: Option<&ElevationLimits>,
    ) -> HabitatResult<Self> {
        land_cover.check_aligned(elevation, "land_cover", "elevation")?;
        land_cover.check_aligned(zones.grid(), "land_cover", "zones")?;
        let canopy = height_mask.map(HeightRefinementMask::mask);
        if let Some(canopy) = canopy {
            land_cover.check_aligned(canopy, "land_cover", "height_mask")?;
        }

        let elevation = match limits {
            Some(limits) => prefilter_elevation(land_cover, elevation, limits)?,
            None => elevation.clone(),
        };

        Ok(Self {
            land_cover,
            elevation,
            zones,
            table,
            canopy,
        })
    }

    pub fn frame(&self) -> &GridFrame {
        self.land_cover.frame()
    }

    /// Habitat for a single zone: true where habitat, unset elsewhere.
    pub fn zone_habitat(&self, zone: ZoneId) -> HabitatResult<Grid<bool>> {
        let in_zone = self.zones.zone_mask(zone);
        let base = self.table.base().lookup(zone);
        let refined = self.table.height_refined().lookup(zone);

        let mut passes = Vec::with_capacity(2);
        if !base.is_empty() {
            passes.push(self.ceiling_pass(&base, &in_zone)?);
        }
        // Without a canopy mask, height-refined classes can never pass.
        if let (false, Some(canopy)) = (refined.is_empty(), self.canopy) {
            passes.push(self.ceiling_pass(&refined, &in_zone)?.update_mask(canopy)?);
        }

        let combined = passes
            .iter()
            .try_fold(Grid::empty(self.frame().clone()), |acc, pass| acc.or(pass))?;
        let habitat = combined.self_mask();

        debug!(
            zone,
            base_classes = base.len(),
            refined_classes = refined.len(),
            habitat_cells = habitat.count_set(),
            "Computed zone habitat"
        );
        Ok(habitat)
    }

    /// Elevation-ceiling test for one class subset within one zone.
    fn ceiling_pass(&self, lookup: &ZoneLookup, in_zone: &Grid<bool>) -> HabitatResult<Grid<bool>> {
        self.land_cover
            .remap(&lookup.to_map())
            .zip_with(&self.elevation, |ceiling, elevation| Some(elevation <= ceiling))?
            .update_mask(in_zone)
    }

    /// Compute every zone and merge the results.
    pub fn compose(&self, parallel: bool) -> HabitatResult<Mosaic> {
        let zone_ids: Vec<ZoneId> = self.zones.zone_ids().iter().copied().collect();

        let results: Vec<(ZoneId, Grid<bool>)> = if parallel {
            zone_ids
                .par_iter()
                .map(|&zone| self.zone_habitat(zone).map(|grid| (zone, grid)))
                .collect::<HabitatResult<_>>()?
        } else {
            zone_ids
                .iter()
                .map(|&zone| self.zone_habitat(zone).map(|grid| (zone, grid)))
                .collect::<HabitatResult<_>>()?
        };

        mosaic(self.frame(), results)
    }
}

/// Unset elevation wherever the admissibility range applies and fails.
fn prefilter_elevation(
    land_cover: &Grid<ClassValue>,
    elevation: &Grid<f32>,
    limits: &ElevationLimits,
) -> HabitatResult<Grid<f32>> {
    let filtered = land_cover.zip_with(elevation, |class, e| {
        if limits.applies_to(class) && !limits.admits(e) {
            None
        } else {
            Some(e)
        }
    })?;
    debug!(
        min = ?limits.min,
        max = ?limits.max,
        scope = ?limits.scope,
        excluded_cells = elevation.count_set() - filtered.count_set(),
        "Applied elevation prefilter"
    );
    Ok(filtered)
}

/// Merge zone-local habitat grids into one.
///
/// Zones are visited in ascending id so the lowest id wins any overlap,
/// independent of the order of `results`.
pub fn mosaic(frame: &GridFrame, mut results: Vec<(ZoneId, Grid<bool>)>) -> HabitatResult<Mosaic> {
    results.sort_by_key(|(zone, _)| *zone);

    let mut habitat = vec![None; frame.len()];
    let mut owners: Vec<Option<ZoneId>> = vec![None; frame.len()];
    let mut overlapped = vec![false; frame.len()];
    let mut zone_cells = BTreeMap::new();

    for (zone, grid) in &results {
        frame.check_aligned(grid.frame(), "mosaic", &format!("zone {}", zone))?;
        let mut owned = 0usize;
        for (index, cell) in grid.cells().iter().enumerate() {
            if *cell != Some(true) {
                continue;
            }
            if owners[index].is_some() {
                overlapped[index] = true;
                continue;
            }
            owners[index] = Some(*zone);
            habitat[index] = Some(true);
            owned += 1;
        }
        *zone_cells.entry(*zone).or_insert(0) += owned;
    }

    let overlapping_cells = overlapped.iter().filter(|o| **o).count();
    if overlapping_cells > 0 {
        warn!(
            overlapping_cells,
            "Zone results overlap; keeping lowest zone id"
        );
    }

    Ok(Mosaic {
        habitat: Grid::new(frame.clone(), habitat)?,
        owners: Grid::new(frame.clone(), owners)?,
        zone_cells,
        overlapping_cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeciesConfig;
    use test_utils::{reclass_record, unit_frame};

    fn zones_grid(cells: Vec<Option<ZoneId>>, width: usize) -> ZonePartition {
        ZonePartition::from_grid(Grid::new(unit_frame(width, 1), cells).unwrap())
    }

    #[test]
    fn test_base_pass_ceiling() {
        let frame = unit_frame(3, 1);
        let land_cover = Grid::from_values(frame.clone(), vec![120, 120, 130]).unwrap();
        let elevation = Grid::from_values(frame, vec![1800.0, 2200.0, 100.0]).unwrap();
        let zones = zones_grid(vec![Some(1), Some(1), Some(1)], 3);
        let table = ReclassTable::from_records(
            &SpeciesConfig::new("Panthera_leo"),
            &[reclass_record(120, 1, 0, &[(1, 2000.0)])],
        )
        .unwrap();

        let compositor =
            ZoneCompositor::new(&land_cover, &elevation, &zones, &table, None, None).unwrap();
        let habitat = compositor.zone_habitat(1).unwrap();
        assert_eq!(habitat.cells(), &[Some(true), None, None]);
    }

    #[test]
    fn test_refined_pass_requires_canopy() {
        let frame = unit_frame(2, 1);
        let land_cover = Grid::from_values(frame.clone(), vec![50, 50]).unwrap();
        let elevation = Grid::filled(frame.clone(), 100.0f32);
        let zones = zones_grid(vec![Some(1), Some(1)], 2);
        let species = SpeciesConfig::new("Panthera_onca").with_height_refinement(5.0, 0.75);
        let records = [reclass_record(50, 1, 1, &[(1, 2000.0)])];
        let table = ReclassTable::from_records(&species, &records).unwrap();
        let fraction = Grid::from_values(frame, vec![0.40f32, 0.90]).unwrap();
        let canopy = HeightRefinementMask::from_fraction(fraction, 0.75);

        let compositor =
            ZoneCompositor::new(&land_cover, &elevation, &zones, &table, Some(&canopy), None)
                .unwrap();
        assert_eq!(compositor.zone_habitat(1).unwrap().cells(), &[None, Some(true)]);

        let without_mask =
            ZoneCompositor::new(&land_cover, &elevation, &zones, &table, None, None).unwrap();
        assert_eq!(without_mask.zone_habitat(1).unwrap().count_set(), 0);
    }

    #[test]
    fn test_prefilter_scope_by_class() {
        let frame = unit_frame(2, 1);
        let land_cover = Grid::from_values(frame.clone(), vec![120, 130]).unwrap();
        let elevation = Grid::filled(frame, 3000.0f32);
        let zones = zones_grid(vec![Some(1), Some(1)], 2);
        let table = ReclassTable::from_records(
            &SpeciesConfig::new("Bison_bison"),
            &[
                reclass_record(120, 1, 0, &[(1, 5000.0)]),
                reclass_record(130, 1, 0, &[(1, 5000.0)]),
            ],
        )
        .unwrap();

        let scoped = ElevationLimits::new(None, Some(2500.0)).for_classes([120]);
        let compositor =
            ZoneCompositor::new(&land_cover, &elevation, &zones, &table, None, Some(&scoped))
                .unwrap();
        assert_eq!(compositor.zone_habitat(1).unwrap().cells(), &[None, Some(true)]);

        let global = ElevationLimits::new(None, Some(2500.0));
        let compositor =
            ZoneCompositor::new(&land_cover, &elevation, &zones, &table, None, Some(&global))
                .unwrap();
        assert_eq!(compositor.zone_habitat(1).unwrap().count_set(), 0);
    }

    #[test]
    fn test_mosaic_lowest_zone_wins() {
        let frame = unit_frame(3, 1);
        let zone_2 = Grid::new(frame.clone(), vec![Some(true), Some(true), None]).unwrap();
        let zone_1 = Grid::new(frame.clone(), vec![None, Some(true), Some(true)]).unwrap();

        let merged = mosaic(&frame, vec![(2, zone_2), (1, zone_1)]).unwrap();
        assert_eq!(merged.habitat.cells(), &[Some(true), Some(true), Some(true)]);
        assert_eq!(merged.owners.cells(), &[Some(2), Some(1), Some(1)]);
        assert_eq!(merged.overlapping_cells, 1);
        assert_eq!(merged.zone_cells[&1], 2);
        assert_eq!(merged.zone_cells[&2], 1);
    }

    #[test]
    fn test_mosaic_rejects_misaligned_zone() {
        let frame = unit_frame(3, 1);
        let zone = Grid::filled(unit_frame(2, 1), true);
        assert!(mosaic(&frame, vec![(1, zone)]).is_err());
    }

    #[test]
    fn test_misaligned_inputs_fail_fast() {
        let land_cover = Grid::filled(unit_frame(3, 1), 120);
        let elevation = Grid::filled(unit_frame(2, 1), 100.0f32);
        let zones = zones_grid(vec![Some(1), Some(1), Some(1)], 3);
        let table = ReclassTable::from_records(&SpeciesConfig::new("Panthera_leo"), &[]).unwrap();

        let err = ZoneCompositor::new(&land_cover, &elevation, &zones, &table, None, None)
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "DataShapeError");
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frame = unit_frame(4, 1);
        let land_cover = Grid::from_values(frame.clone(), vec![120, 120, 130, 130]).unwrap();
        let elevation = Grid::from_values(frame, vec![100.0, 900.0, 100.0, 900.0]).unwrap();
        let zones = zones_grid(vec![Some(1), Some(2), Some(2), Some(3)], 4);
        let table = ReclassTable::from_records(
            &SpeciesConfig::new("Panthera_leo"),
            &[
                reclass_record(120, 1, 0, &[(1, 500.0), (2, 1000.0)]),
                reclass_record(130, 1, 0, &[(2, 500.0), (3, 1000.0)]),
            ],
        )
        .unwrap();

        let compositor =
            ZoneCompositor::new(&land_cover, &elevation, &zones, &table, None, None).unwrap();
        let parallel = compositor.compose(true).unwrap();
        let sequential = compositor.compose(false).unwrap();
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.habitat.count_true(), 4);
        assert_eq!(parallel.overlapping_cells, 0);
    }
}
