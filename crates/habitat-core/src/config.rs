//! Species and run configuration.

use std::collections::{BTreeMap, BTreeSet};

use habitat_common::{ClassValue, HabitatError, HabitatResult};
use habitat_raster::DEFAULT_MAX_SUBCELLS;
use serde::{Deserialize, Serialize};

/// Default working resolution in metres.
pub const DEFAULT_SCALE_M: f64 = 300.0;

/// Canopy test applied to height-refined land-cover classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightThreshold {
    /// Minimum forest height in metres for a sub-cell to count as canopy.
    pub min_height: f32,
    /// Minimum fraction (0..=1) of canopy sub-cells per working cell.
    pub min_canopy_fraction: f32,
}

/// Which land-cover classes the elevation admissibility range applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefilterScope {
    /// Every cell, regardless of land-cover class.
    #[default]
    Global,
    /// Only cells of the listed classes.
    Classes(BTreeSet<ClassValue>),
}

/// Valid elevation range `[min, max]`; either bound may be open.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElevationLimits {
    #[serde(default)]
    pub min: Option<f32>,
    #[serde(default)]
    pub max: Option<f32>,
    /// Written as `scope: global` or `scope: {classes: [50, 120]}`.
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub scope: PrefilterScope,
}

impl ElevationLimits {
    pub fn new(min: Option<f32>, max: Option<f32>) -> Self {
        Self {
            min,
            max,
            scope: PrefilterScope::Global,
        }
    }

    /// Restrict the range to the given classes.
    pub fn for_classes(mut self, classes: impl IntoIterator<Item = ClassValue>) -> Self {
        self.scope = PrefilterScope::Classes(classes.into_iter().collect());
        self
    }

    /// Check if an elevation lies inside the range (bounds inclusive).
    #[inline]
    pub fn admits(&self, elevation: f32) -> bool {
        self.min.map_or(true, |min| elevation >= min)
            && self.max.map_or(true, |max| elevation <= max)
    }

    /// Check if the range applies to cells of `class`.
    #[inline]
    pub fn applies_to(&self, class: ClassValue) -> bool {
        match &self.scope {
            PrefilterScope::Global => true,
            PrefilterScope::Classes(classes) => classes.contains(&class),
        }
    }
}

/// Per-species configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    /// Species identifier, e.g. "Panthera_tigris".
    pub species: String,

    /// Whether height refinement applies to flagged land-cover classes.
    #[serde(default)]
    pub include_height: bool,

    /// Required when `include_height` is set.
    #[serde(default)]
    pub min_height: Option<f32>,

    /// Required when `include_height` is set.
    #[serde(default)]
    pub min_canopy_fraction: Option<f32>,

    /// Optional elevation admissibility prefilter.
    #[serde(default)]
    pub elevation_limits: Option<ElevationLimits>,

    /// Working resolution in metres.
    #[serde(default = "default_scale_m")]
    pub scale_m: f64,
}

fn default_scale_m() -> f64 {
    DEFAULT_SCALE_M
}

impl SpeciesConfig {
    /// A configuration with no height refinement and no elevation prefilter.
    pub fn new(species: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            include_height: false,
            min_height: None,
            min_canopy_fraction: None,
            elevation_limits: None,
            scale_m: DEFAULT_SCALE_M,
        }
    }

    /// Tiger defaults: elevation admissible between 0 and 3350 m.
    pub fn panthera_tigris() -> Self {
        Self::new("Panthera_tigris")
            .with_elevation_limits(ElevationLimits::new(Some(0.0), Some(3350.0)))
    }

    /// Enable height refinement with the given thresholds.
    pub fn with_height_refinement(mut self, min_height: f32, min_canopy_fraction: f32) -> Self {
        self.include_height = true;
        self.min_height = Some(min_height);
        self.min_canopy_fraction = Some(min_canopy_fraction);
        self
    }

    pub fn with_elevation_limits(mut self, limits: ElevationLimits) -> Self {
        self.elevation_limits = Some(limits);
        self
    }

    /// The canopy threshold, or `None` when height refinement is disabled.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error if refinement is enabled but a
    /// threshold is missing or out of range.
    pub fn height_threshold(&self) -> HabitatResult<Option<HeightThreshold>> {
        if !self.include_height {
            return Ok(None);
        }
        let min_height = self
            .min_height
            .ok_or_else(|| HabitatError::missing_threshold(&self.species, "min_height"))?;
        let min_canopy_fraction = self
            .min_canopy_fraction
            .ok_or_else(|| HabitatError::missing_threshold(&self.species, "min_canopy_fraction"))?;

        if !(0.0..=1.0).contains(&min_canopy_fraction) {
            return Err(HabitatError::invalid_config(
                &self.species,
                format!("min_canopy_fraction must be within 0..=1, got {}", min_canopy_fraction),
            ));
        }

        Ok(Some(HeightThreshold {
            min_height,
            min_canopy_fraction,
        }))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> HabitatResult<()> {
        if self.species.is_empty() {
            return Err(HabitatError::invalid_config("", "species identifier cannot be empty"));
        }
        self.height_threshold()?;

        if let Some(limits) = &self.elevation_limits {
            if let (Some(min), Some(max)) = (limits.min, limits.max) {
                if min > max {
                    return Err(HabitatError::invalid_config(
                        &self.species,
                        format!("elevation min {} exceeds max {}", min, max),
                    ));
                }
            }
        }

        if !(self.scale_m > 0.0) {
            return Err(HabitatError::invalid_config(&self.species, "scale_m must be > 0"));
        }

        Ok(())
    }
}

/// Known species configurations, keyed by species identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesRegistry {
    species: BTreeMap<String, SpeciesConfig>,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a species configuration.
    pub fn insert(&mut self, config: SpeciesConfig) {
        self.species.insert(config.species.clone(), config);
    }

    /// Look up a species.
    ///
    /// # Errors
    ///
    /// Returns `HabitatError::UnknownSpecies` if the species is not registered.
    pub fn get(&self, species: &str) -> HabitatResult<&SpeciesConfig> {
        self.species
            .get(species)
            .ok_or_else(|| HabitatError::unknown_species(species))
    }

    /// Registered species identifiers in sorted order.
    pub fn species_ids(&self) -> impl Iterator<Item = &str> {
        self.species.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

impl FromIterator<SpeciesConfig> for SpeciesRegistry {
    fn from_iter<I: IntoIterator<Item = SpeciesConfig>>(iter: I) -> Self {
        let mut registry = Self::new();
        for config in iter {
            registry.insert(config);
        }
        registry
    }
}

/// Run-level settings for the zone compositor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositorConfig {
    /// Compute zones concurrently.
    pub parallel: bool,

    /// Cap on fine sub-cells sampled per working cell during canopy
    /// aggregation.
    pub max_subcells_per_cell: usize,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_subcells_per_cell: DEFAULT_MAX_SUBCELLS,
        }
    }
}

impl CompositorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HABITAT_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("HABITAT_MAX_SUBCELLS") {
            if let Ok(cap) = val.parse() {
                config.max_subcells_per_cell = cap;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_subcells_per_cell == 0 {
            return Err("max_subcells_per_cell must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_compositor_config() {
        let config = CompositorConfig::default();
        assert!(config.parallel);
        assert_eq!(config.max_subcells_per_cell, DEFAULT_MAX_SUBCELLS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compositor_config_from_env() {
        std::env::set_var("HABITAT_PARALLEL", "0");
        std::env::set_var("HABITAT_MAX_SUBCELLS", "64");
        let config = CompositorConfig::from_env();
        assert!(!config.parallel);
        assert_eq!(config.max_subcells_per_cell, 64);

        std::env::set_var("HABITAT_PARALLEL", "TRUE");
        std::env::set_var("HABITAT_MAX_SUBCELLS", "lots");
        let config = CompositorConfig::from_env();
        assert!(config.parallel);
        assert_eq!(config.max_subcells_per_cell, DEFAULT_MAX_SUBCELLS);

        std::env::remove_var("HABITAT_PARALLEL");
        std::env::remove_var("HABITAT_MAX_SUBCELLS");
    }

    #[test]
    fn test_compositor_config_validation() {
        let config = CompositorConfig {
            max_subcells_per_cell: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_height_threshold_disabled() {
        let config = SpeciesConfig::new("Panthera_leo");
        assert_eq!(config.height_threshold().unwrap(), None);
    }

    #[test]
    fn test_height_threshold_missing_field() {
        let mut config = SpeciesConfig::new("Panthera_onca");
        config.include_height = true;
        config.min_height = Some(5.0);

        let err = config.height_threshold().unwrap_err();
        assert_eq!(
            err,
            HabitatError::missing_threshold("Panthera_onca", "min_canopy_fraction")
        );
        assert_eq!(err.error_code(), "ConfigurationError");
    }

    #[test]
    fn test_height_threshold_out_of_range() {
        let config = SpeciesConfig::new("Panthera_onca").with_height_refinement(5.0, 1.5);
        assert!(matches!(
            config.height_threshold(),
            Err(HabitatError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let config = SpeciesConfig::new("Bison_bison")
            .with_elevation_limits(ElevationLimits::new(Some(3000.0), Some(100.0)));
        assert!(config.validate().is_err());
        assert!(SpeciesConfig::panthera_tigris().validate().is_ok());
    }

    #[test]
    fn test_elevation_limits_admits() {
        let limits = ElevationLimits::new(Some(0.0), Some(3350.0));
        assert!(limits.admits(0.0));
        assert!(limits.admits(3350.0));
        assert!(!limits.admits(-1.0));
        assert!(!limits.admits(3350.5));

        let open = ElevationLimits::new(None, Some(100.0));
        assert!(open.admits(-400.0));
    }

    #[test]
    fn test_prefilter_scope() {
        let global = ElevationLimits::new(None, Some(100.0));
        assert!(global.applies_to(10));

        let scoped = ElevationLimits::new(None, Some(100.0)).for_classes([50, 120]);
        assert!(scoped.applies_to(50));
        assert!(!scoped.applies_to(10));
    }

    #[test]
    fn test_registry_unknown_species() {
        let registry: SpeciesRegistry = [SpeciesConfig::panthera_tigris()].into_iter().collect();
        assert!(registry.get("Panthera_tigris").is_ok());
        assert_eq!(
            registry.get("Felis_catus").unwrap_err(),
            HabitatError::unknown_species("Felis_catus")
        );
    }

    #[test]
    fn test_species_config_yaml_defaults() {
        let yaml = "species: Panthera_leo\n";
        let config: SpeciesConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.include_height);
        assert!(config.elevation_limits.is_none());
        assert!((config.scale_m - DEFAULT_SCALE_M).abs() < f64::EPSILON);
    }

    #[test]
    fn test_prefilter_scope_yaml() {
        let yaml = "min: 0\nmax: 2500\nscope:\n  classes: [50, 120]\n";
        let limits: ElevationLimits = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(limits.max, Some(2500.0));
        assert!(limits.applies_to(120));
        assert!(!limits.applies_to(130));

        let yaml = "max: 2500\nscope: global\n";
        let limits: ElevationLimits = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(limits.scope, PrefilterScope::Global);
    }
}
