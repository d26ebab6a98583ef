//! The structural habitat entry point.

use habitat_common::{ClassValue, GridFrame, HabitatError, HabitatResult, Provenance, ZoneId};
use habitat_raster::Grid;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::compositor::ZoneCompositor;
use crate::config::{CompositorConfig, SpeciesConfig, SpeciesRegistry};
use crate::height::HeightRefinementMask;
use crate::reclass::{ReclassRecord, ReclassTable};
use crate::warnings::ValidationWarning;
use crate::zones::{ZonePartition, ZonePolygon};

/// Band name of the output grid.
pub const HABITAT_BAND_NAME: &str = "str_hab";

/// A resolved land-cover snapshot.
#[derive(Debug, Clone)]
pub struct LandCover {
    pub grid: Grid<ClassValue>,
    pub provenance: Provenance,
}

impl LandCover {
    pub fn new(grid: Grid<ClassValue>, provenance: Provenance) -> Self {
        Self { grid, provenance }
    }
}

/// Everything one run reads. The land-cover frame is the working frame;
/// elevation must share it. Forest height and water mask share their own
/// (usually finer) frame.
#[derive(Debug, Clone, Copy)]
pub struct HabitatInputs<'a> {
    pub land_cover: &'a LandCover,
    pub elevation: &'a Grid<f32>,
    pub zones: &'a [ZonePolygon],
    pub reclass_records: &'a [ReclassRecord],
    pub forest_height: Option<&'a Grid<f32>>,
    pub water_mask: Option<&'a Grid<bool>>,
}

/// The output habitat raster.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitatGrid {
    pub band: String,
    /// True where habitat; unset elsewhere. Never false.
    pub grid: Grid<bool>,
    /// Provenance of the land-cover snapshot the grid was derived from.
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneSummary {
    pub zone: ZoneId,
    pub habitat_cells: usize,
}

/// Output of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitatReport {
    pub species: String,
    pub habitat: HabitatGrid,
    /// Zone that supplied each habitat cell.
    pub zone_owners: Grid<ZoneId>,
    pub zone_summaries: Vec<ZoneSummary>,
    pub overlapping_cells: usize,
    pub warnings: Vec<ValidationWarning>,
}

impl HabitatReport {
    pub fn habitat_cells(&self) -> usize {
        self.habitat.grid.count_true()
    }
}

/// Look up `species` in `registry` and compute its habitat.
pub fn compute_for_species(
    registry: &SpeciesRegistry,
    species: &str,
    inputs: &HabitatInputs<'_>,
    options: &CompositorConfig,
) -> HabitatResult<HabitatReport> {
    let config = registry.get(species)?;
    compute_structural_habitat(config, inputs, options)
}

/// Derive the structural habitat grid for one species.
///
/// # Errors
///
/// - Configuration errors for an invalid species configuration, or when
///   height refinement is enabled but forest height or water mask is absent.
/// - Validation errors for malformed reclass records.
/// - Data-shape errors when input grids are not aligned, or when a projected
///   land-cover frame does not use the species working scale.
///
/// Reclass rows for zones missing from the zone layer, zones without rules
/// and overlapping zone results are reported as warnings.
#[instrument(skip(species, inputs, options), fields(species = %species.species))]
pub fn compute_structural_habitat(
    species: &SpeciesConfig,
    inputs: &HabitatInputs<'_>,
    options: &CompositorConfig,
) -> HabitatResult<HabitatReport> {
    species.validate()?;
    options
        .validate()
        .map_err(|message| HabitatError::invalid_config(&species.species, message))?;

    let land_cover = &inputs.land_cover.grid;
    let frame = land_cover.frame();
    check_working_scale(species, frame)?;

    let table = ReclassTable::from_records(species, inputs.reclass_records)?;
    let partition = ZonePartition::from_polygons(inputs.zones, frame);

    let mut warnings = table.check_zones(partition.zone_ids());
    for warning in &warnings {
        warn!(%warning, "Reclass table validation");
    }

    let height_mask = match species.height_threshold()? {
        Some(threshold) => {
            let forest_height = inputs
                .forest_height
                .ok_or_else(|| missing_input(species, "forest_height"))?;
            let water_mask = inputs
                .water_mask
                .ok_or_else(|| missing_input(species, "water_mask"))?;
            Some(HeightRefinementMask::compute(
                forest_height,
                water_mask,
                &threshold,
                frame,
                options.max_subcells_per_cell,
            )?)
        }
        None => {
            if inputs.forest_height.is_some() || inputs.water_mask.is_some() {
                debug!("Height refinement disabled; ignoring forest height inputs");
            }
            None
        }
    };

    let compositor = ZoneCompositor::new(
        land_cover,
        inputs.elevation,
        &partition,
        &table,
        height_mask.as_ref(),
        species.elevation_limits.as_ref(),
    )?;
    let mosaic = compositor.compose(options.parallel)?;

    if mosaic.overlapping_cells > 0 {
        warnings.push(ValidationWarning::OverlappingZones {
            cells: mosaic.overlapping_cells,
        });
    }

    let zone_summaries = mosaic
        .zone_cells
        .iter()
        .map(|(&zone, &habitat_cells)| ZoneSummary { zone, habitat_cells })
        .collect();

    let report = HabitatReport {
        species: species.species.clone(),
        habitat: HabitatGrid {
            band: HABITAT_BAND_NAME.to_string(),
            grid: mosaic.habitat,
            provenance: inputs.land_cover.provenance.clone(),
        },
        zone_owners: mosaic.owners,
        zone_summaries,
        overlapping_cells: mosaic.overlapping_cells,
        warnings,
    };

    info!(
        zones = partition.zone_ids().len(),
        habitat_cells = report.habitat_cells(),
        total_cells = frame.len(),
        warnings = report.warnings.len(),
        source_date = %report.habitat.provenance.date(),
        "Computed structural habitat"
    );
    Ok(report)
}

/// Projected land cover must be gridded at `scale_m`. Geographic frames have
/// angular cells and are accepted as given.
fn check_working_scale(species: &SpeciesConfig, frame: &GridFrame) -> HabitatResult<()> {
    if frame.is_geographic() || frame.has_cell_size(species.scale_m) {
        return Ok(());
    }
    Err(HabitatError::misaligned(
        "land_cover",
        "scale_m",
        format!(
            "cell size ({}, {}) != {} m for {}",
            frame.cell_width, frame.cell_height, species.scale_m, species.species
        ),
    ))
}

fn missing_input(species: &SpeciesConfig, input: &str) -> HabitatError {
    HabitatError::MissingInput {
        species: species.species.clone(),
        input: input.to_string(),
    }
}
