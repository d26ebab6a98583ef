//! Error types for structural habitat computation.

use thiserror::Error;

/// Result type alias using HabitatError.
pub type HabitatResult<T> = Result<T, HabitatError>;

/// Primary error type for habitat runs.
///
/// Every variant names the offending identifier (species, zone or record,
/// grid pair) so a failed run can report exactly what was wrong.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HabitatError {
    // === Configuration Errors ===
    #[error("Unknown species: {0}")]
    UnknownSpecies(String),

    #[error("Species '{species}' enables height refinement but is missing '{field}'")]
    MissingThreshold { species: String, field: String },

    #[error("Invalid configuration for '{species}': {message}")]
    InvalidConfig { species: String, message: String },

    #[error("Species '{species}' enables height refinement but no '{input}' grid was supplied")]
    MissingInput { species: String, input: String },

    // === Validation Errors ===
    #[error("Reclass record {record}: missing required field '{field}'")]
    MissingField { record: usize, field: String },

    #[error("Reclass record {record}: invalid value for '{field}': {message}")]
    InvalidField {
        record: usize,
        field: String,
        message: String,
    },

    #[error("Land-cover class {class} has more than one elevation ceiling for zone {zone}")]
    DuplicateRule { class: i32, zone: i32 },

    // === Data Shape Errors ===
    #[error("Grids '{left}' and '{right}' are not aligned: {message}")]
    Misaligned {
        left: String,
        right: String,
        message: String,
    },

    #[error("Grid '{grid}' has {actual} cells but its frame expects {expected}")]
    CellCount {
        grid: String,
        expected: usize,
        actual: usize,
    },
}

/// Coarse classification of a [`HabitatError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    DataShape,
}

impl HabitatError {
    /// Create an UnknownSpecies error.
    pub fn unknown_species(species: impl Into<String>) -> Self {
        Self::UnknownSpecies(species.into())
    }

    /// Create a MissingThreshold error.
    pub fn missing_threshold(species: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingThreshold {
            species: species.into(),
            field: field.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(species: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            species: species.into(),
            message: message.into(),
        }
    }

    /// Create a MissingField error.
    pub fn missing_field(record: usize, field: impl Into<String>) -> Self {
        Self::MissingField {
            record,
            field: field.into(),
        }
    }

    /// Create an InvalidField error.
    pub fn invalid_field(
        record: usize,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            record,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a Misaligned error for a pair of named grids.
    pub fn misaligned(
        left: impl Into<String>,
        right: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Misaligned {
            left: left.into(),
            right: right.into(),
            message: message.into(),
        }
    }

    /// Which part of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HabitatError::UnknownSpecies(_)
            | HabitatError::MissingThreshold { .. }
            | HabitatError::InvalidConfig { .. }
            | HabitatError::MissingInput { .. } => ErrorKind::Configuration,

            HabitatError::MissingField { .. }
            | HabitatError::InvalidField { .. }
            | HabitatError::DuplicateRule { .. } => ErrorKind::Validation,

            HabitatError::Misaligned { .. } | HabitatError::CellCount { .. } => {
                ErrorKind::DataShape
            }
        }
    }

    /// Stable code string for reporting to callers.
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::DataShape => "DataShapeError",
        }
    }
}
