//! Recoverable findings collected during a run.

use std::fmt;

use habitat_common::ZoneId;
use serde::Serialize;

/// A problem that does not stop the run but is reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// The reclass table has ceilings for a zone absent from the zone layer.
    UnknownZone { zone: ZoneId },
    /// A zone in the zone layer has no applicable reclass rules, so it
    /// contributes no habitat.
    ZoneWithoutRules { zone: ZoneId },
    /// Zone results overlapped; cells were resolved to the lowest zone id.
    OverlappingZones { cells: usize },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownZone { zone } => {
                write!(f, "reclass table references zone {} which is not in the zone layer", zone)
            }
            Self::ZoneWithoutRules { zone } => {
                write!(f, "zone {} has no reclass rules and yields no habitat", zone)
            }
            Self::OverlappingZones { cells } => {
                write!(f, "{} cells claimed by more than one zone; lowest zone id kept", cells)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_zone() {
        let warning = ValidationWarning::UnknownZone { zone: 7 };
        assert!(warning.to_string().contains("zone 7"));
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_value(ValidationWarning::OverlappingZones { cells: 3 }).unwrap();
        assert_eq!(json["kind"], "overlapping_zones");
        assert_eq!(json["cells"], 3);
    }
}
