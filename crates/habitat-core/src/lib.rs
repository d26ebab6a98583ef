//! Structural habitat derivation.
//!
//! Given a land-cover grid, an elevation grid, zone polygons and a species'
//! reclass table (plus, for species that need it, forest height and a water
//! mask), [`compute_structural_habitat`] produces a boolean grid that is true
//! on habitat cells and unset everywhere else.
//!
//! The run is built from four parts:
//!
//! - [`ZonePartition`]: rasterizes zone polygons with a mode reducer.
//! - [`ReclassTable`]: (class, zone) elevation ceilings split into base and
//!   height-refined subsets.
//! - [`HeightRefinementMask`]: canopy fraction from forest height, computed
//!   once per run.
//! - [`ZoneCompositor`]: per-zone ceiling tests merged into one mosaic.
//!
//! # Example
//!
//! ```ignore
//! let registry = load_species_registry("config/species.yaml")?;
//! let options = CompositorConfig::from_env();
//! let report = compute_for_species(&registry, "Panthera_tigris", &inputs, &options)?;
//! println!("{} habitat cells", report.habitat_cells());
//! ```

pub mod compositor;
pub mod config;
pub mod config_loader;
pub mod height;
pub mod pipeline;
pub mod reclass;
pub mod warnings;
pub mod zones;

pub use compositor::{mosaic, Mosaic, ZoneCompositor};
pub use config::{
    CompositorConfig, ElevationLimits, HeightThreshold, PrefilterScope, SpeciesConfig,
    SpeciesRegistry, DEFAULT_SCALE_M,
};
pub use config_loader::{load_species_registry, parse_species_registry};
pub use height::HeightRefinementMask;
pub use pipeline::{
    compute_for_species, compute_structural_habitat, HabitatGrid, HabitatInputs, HabitatReport,
    LandCover, ZoneSummary, HABITAT_BAND_NAME,
};
pub use reclass::{ClassSubset, ReclassRecord, ReclassRule, ReclassTable, ZoneLookup};
pub use warnings::ValidationWarning;
pub use zones::{ZonePartition, ZonePolygon, BIOME_ZONE_LABEL};

pub use habitat_common::{ErrorKind, HabitatError, HabitatResult, Provenance, ZoneId};
pub use habitat_raster::{Grid, GridFrame};
