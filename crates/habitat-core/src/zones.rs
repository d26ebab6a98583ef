//! Zone partitioning: polygons tagged with a zone id become a zone-id grid.

use std::collections::BTreeSet;

use geo::MultiPolygon;
use habitat_common::{GridFrame, HabitatError, HabitatResult, ZoneId};
use habitat_raster::{rasterize_mode, Grid};
use serde_json::{Map, Value};
use tracing::debug;

/// Attribute carrying the zone id on zone polygons.
pub const BIOME_ZONE_LABEL: &str = "Zone";

/// One zone polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePolygon {
    pub zone: ZoneId,
    pub geometry: MultiPolygon<f64>,
}

impl ZonePolygon {
    pub fn new(zone: ZoneId, geometry: MultiPolygon<f64>) -> Self {
        Self { zone, geometry }
    }

    /// Build from a feature's property map, reading the `Zone` attribute.
    ///
    /// `index` identifies the feature in error messages.
    pub fn from_properties(
        index: usize,
        properties: &Map<String, Value>,
        geometry: MultiPolygon<f64>,
    ) -> HabitatResult<Self> {
        let value = properties
            .get(BIOME_ZONE_LABEL)
            .filter(|v| !v.is_null())
            .ok_or_else(|| HabitatError::missing_field(index, BIOME_ZONE_LABEL))?;

        let zone = value
            .as_i64()
            .or_else(|| value.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64))
            .and_then(|v| ZoneId::try_from(v).ok())
            .ok_or_else(|| {
                HabitatError::invalid_field(
                    index,
                    BIOME_ZONE_LABEL,
                    format!("expected an integer zone id, got {}", value),
                )
            })?;

        Ok(Self::new(zone, geometry))
    }
}

/// Zone-id grid plus the distinct zone ids of the layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePartition {
    grid: Grid<ZoneId>,
    zone_ids: BTreeSet<ZoneId>,
}

impl ZonePartition {
    /// Rasterize `polygons` onto `frame`.
    ///
    /// Each cell takes the most frequent zone among polygons covering its
    /// centre; ties go to the earliest polygon. Zone ids are collected from
    /// every polygon, including ones that cover no cell.
    pub fn from_polygons(polygons: &[ZonePolygon], frame: &GridFrame) -> Self {
        let features: Vec<(ZoneId, &MultiPolygon<f64>)> =
            polygons.iter().map(|p| (p.zone, &p.geometry)).collect();
        let grid = rasterize_mode(frame, &features);
        let zone_ids = polygons.iter().map(|p| p.zone).collect();

        let partition = Self { grid, zone_ids };
        debug!(
            polygons = polygons.len(),
            zones = partition.zone_ids.len(),
            zoned_cells = partition.grid.count_set(),
            "Built zone partition"
        );
        partition
    }

    /// Use an already rasterized zone grid; zone ids are the distinct set values.
    pub fn from_grid(grid: Grid<ZoneId>) -> Self {
        let zone_ids = grid.cells().iter().flatten().copied().collect();
        Self { grid, zone_ids }
    }

    pub fn grid(&self) -> &Grid<ZoneId> {
        &self.grid
    }

    pub fn zone_ids(&self) -> &BTreeSet<ZoneId> {
        &self.zone_ids
    }

    pub fn is_empty(&self) -> bool {
        self.zone_ids.is_empty()
    }

    /// Boolean grid that is true inside `zone` and unset outside any zone.
    pub fn zone_mask(&self, zone: ZoneId) -> Grid<bool> {
        self.grid.eq_mask(zone)
    }
}
