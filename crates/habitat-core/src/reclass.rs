//! Per-species reclass table: (land-cover class, zone) to elevation ceiling.
//!
//! Records arrive as property maps with the columns `lc_value`,
//! `include_class`, `include_height` and one `elev_zone<N>` ceiling column
//! per zone. Only included classes are kept. They are split into a base
//! subset and a height-refined subset; the latter exists only when the
//! species enables height refinement.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use habitat_common::{ClassValue, HabitatError, HabitatResult, ZoneId};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{SpeciesConfig, SpeciesRegistry};
use crate::warnings::ValidationWarning;

pub const LC_VALUE_FIELD: &str = "lc_value";
pub const INCLUDE_CLASS_FIELD: &str = "include_class";
pub const INCLUDE_HEIGHT_FIELD: &str = "include_height";
/// Prefix of the per-zone ceiling columns, e.g. `elev_zone3`.
pub const ELEV_ZONE_PREFIX: &str = "elev_zone";

/// One raw row of a reclass table.
pub type ReclassRecord = Map<String, Value>;

/// A single parsed rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReclassRule {
    pub class: ClassValue,
    pub zone: ZoneId,
    pub ceiling: f32,
    pub height_refined: bool,
}

/// Class ceilings for one zone as two parallel sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneLookup {
    pub classes: Vec<ClassValue>,
    pub ceilings: Vec<f32>,
}

impl ZoneLookup {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Lookup map for [`habitat_raster::Grid::remap`].
    pub fn to_map(&self) -> HashMap<ClassValue, f32> {
        self.classes
            .iter()
            .copied()
            .zip(self.ceilings.iter().copied())
            .collect()
    }
}

/// Ceilings keyed by zone, then class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassSubset {
    ceilings: BTreeMap<ZoneId, BTreeMap<ClassValue, f32>>,
}

impl ClassSubset {
    fn insert(&mut self, rule: &ReclassRule) -> HabitatResult<()> {
        let zone = self.ceilings.entry(rule.zone).or_default();
        if zone.insert(rule.class, rule.ceiling).is_some() {
            return Err(HabitatError::DuplicateRule {
                class: rule.class,
                zone: rule.zone,
            });
        }
        Ok(())
    }

    /// Classes and ceilings applicable in `zone`, ordered by class value.
    pub fn lookup(&self, zone: ZoneId) -> ZoneLookup {
        let mut lookup = ZoneLookup::default();
        if let Some(classes) = self.ceilings.get(&zone) {
            for (&class, &ceiling) in classes {
                lookup.classes.push(class);
                lookup.ceilings.push(ceiling);
            }
        }
        lookup
    }

    /// Zones that have at least one ceiling.
    pub fn zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.ceilings
            .iter()
            .filter(|(_, classes)| !classes.is_empty())
            .map(|(&zone, _)| zone)
    }

    /// Total number of (class, zone) ceilings.
    pub fn len(&self) -> usize {
        self.ceilings.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parsed reclass table for one species.
#[derive(Debug, Clone, PartialEq)]
pub struct ReclassTable {
    species: String,
    base: ClassSubset,
    height_refined: ClassSubset,
}

impl ReclassTable {
    /// Resolve `species` in `registry` and parse its records.
    pub fn for_species(
        registry: &SpeciesRegistry,
        species: &str,
        records: &[ReclassRecord],
    ) -> HabitatResult<Self> {
        let config = registry.get(species)?;
        Self::from_records(config, records)
    }

    /// Parse records for the given species.
    ///
    /// # Errors
    ///
    /// - `MissingField` when `lc_value` or `include_class` is absent, or when
    ///   `include_height` is absent for a species that uses it.
    /// - `InvalidField` for values of the wrong type, a malformed zone
    ///   column name, or a class flagged inconsistently across records.
    /// - `DuplicateRule` when a (class, zone) pair has two ceilings.
    pub fn from_records(species: &SpeciesConfig, records: &[ReclassRecord]) -> HabitatResult<Self> {
        let mut table = Self {
            species: species.species.clone(),
            base: ClassSubset::default(),
            height_refined: ClassSubset::default(),
        };
        let mut class_flags: HashMap<ClassValue, bool> = HashMap::new();
        let mut skipped = 0usize;

        for (index, record) in records.iter().enumerate() {
            let class = parse_class(index, record)?;
            if !parse_flag(index, record, INCLUDE_CLASS_FIELD)? {
                skipped += 1;
                continue;
            }

            let height_refined = if species.include_height {
                parse_flag(index, record, INCLUDE_HEIGHT_FIELD)?
            } else {
                false
            };
            match class_flags.insert(class, height_refined) {
                Some(previous) if previous != height_refined => {
                    return Err(HabitatError::invalid_field(
                        index,
                        INCLUDE_HEIGHT_FIELD,
                        format!("class {} is flagged inconsistently across records", class),
                    ));
                }
                _ => {}
            }

            for (zone, ceiling) in parse_ceilings(index, record)? {
                let rule = ReclassRule {
                    class,
                    zone,
                    ceiling,
                    height_refined,
                };
                if rule.height_refined {
                    table.height_refined.insert(&rule)?;
                } else {
                    table.base.insert(&rule)?;
                }
            }
        }

        debug!(
            species = %table.species,
            records = records.len(),
            excluded = skipped,
            base_rules = table.base.len(),
            height_rules = table.height_refined.len(),
            "Parsed reclass table"
        );
        Ok(table)
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    /// Rules that pass on elevation alone.
    pub fn base(&self) -> &ClassSubset {
        &self.base
    }

    /// Rules that also require sufficient canopy.
    pub fn height_refined(&self) -> &ClassSubset {
        &self.height_refined
    }

    /// Every zone with at least one ceiling in either subset.
    pub fn referenced_zones(&self) -> BTreeSet<ZoneId> {
        self.base.zones().chain(self.height_refined.zones()).collect()
    }

    /// Compare the table's zones against the zones present in the zone layer.
    pub fn check_zones(&self, zone_ids: &BTreeSet<ZoneId>) -> Vec<ValidationWarning> {
        let referenced = self.referenced_zones();
        let mut warnings: Vec<ValidationWarning> = referenced
            .difference(zone_ids)
            .map(|&zone| ValidationWarning::UnknownZone { zone })
            .collect();
        warnings.extend(
            zone_ids
                .difference(&referenced)
                .map(|&zone| ValidationWarning::ZoneWithoutRules { zone }),
        );
        warnings
    }
}

fn parse_class(index: usize, record: &ReclassRecord) -> HabitatResult<ClassValue> {
    let value = record
        .get(LC_VALUE_FIELD)
        .filter(|v| !v.is_null())
        .ok_or_else(|| HabitatError::missing_field(index, LC_VALUE_FIELD))?;

    as_integer(value)
        .and_then(|v| ClassValue::try_from(v).ok())
        .ok_or_else(|| {
            HabitatError::invalid_field(
                index,
                LC_VALUE_FIELD,
                format!("expected an integer class, got {}", value),
            )
        })
}

/// Read a 0/1 flag. Booleans are accepted as well.
fn parse_flag(index: usize, record: &ReclassRecord, field: &str) -> HabitatResult<bool> {
    let value = record
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| HabitatError::missing_field(index, field))?;

    if let Some(flag) = value.as_bool() {
        return Ok(flag);
    }
    match as_integer(value) {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(HabitatError::invalid_field(
            index,
            field,
            format!("expected 0 or 1, got {}", value),
        )),
    }
}

/// All non-null `elev_zone<N>` columns of a record.
fn parse_ceilings(index: usize, record: &ReclassRecord) -> HabitatResult<Vec<(ZoneId, f32)>> {
    let mut ceilings = Vec::new();
    for (field, value) in record {
        let Some(suffix) = field.strip_prefix(ELEV_ZONE_PREFIX) else {
            continue;
        };
        let zone: ZoneId = suffix.parse().map_err(|_| {
            HabitatError::invalid_field(
                index,
                field.as_str(),
                "zone column suffix is not an integer",
            )
        })?;
        if value.is_null() {
            continue;
        }
        let ceiling = value.as_f64().ok_or_else(|| {
            HabitatError::invalid_field(
                index,
                field.as_str(),
                format!("expected a number, got {}", value),
            )
        })?;
        ceilings.push((zone, ceiling as f32));
    }
    Ok(ceilings)
}

/// Integer value of a JSON number, accepting whole floats such as `120.0`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    value
        .as_f64()
        .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}
