//! Common types shared across the structural-habitat workspace.

pub mod bbox;
pub mod error;
pub mod frame;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{ErrorKind, HabitatError, HabitatResult};
pub use frame::GridFrame;
pub use time::Provenance;

/// Integer identifier of a biogeographic zone.
pub type ZoneId = i32;

/// Categorical land-cover class value.
pub type ClassValue = i32;
