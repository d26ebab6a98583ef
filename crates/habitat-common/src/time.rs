//! Provenance timestamps for input snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where an input snapshot came from and when it was produced.
///
/// Resolution of the "most recent image" happens upstream; the core only
/// carries the resolved timestamp through to its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source identifier (catalog path, file name, ...).
    pub source: String,
    /// Timestamp of the snapshot.
    pub source_time: DateTime<Utc>,
}

impl Provenance {
    pub fn new(source: impl Into<String>, source_time: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            source_time,
        }
    }

    /// Calendar date of the snapshot.
    pub fn date(&self) -> NaiveDate {
        self.source_time.date_naive()
    }
}
