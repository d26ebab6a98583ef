//! YAML loader for species configuration files.
//!
//! A species file lists one entry per species:
//!
//! ```yaml
//! species:
//!   - species: Panthera_tigris
//!     elevation_limits:
//!       min: 0
//!       max: ${TIGER_ELEVATION_MAX:-3350}
//!   - species: Panthera_onca
//!     include_height: true
//!     min_height: 5.0
//!     min_canopy_fraction: 0.75
//! ```
//!
//! Supports environment variable substitution using `${VAR}` and
//! `${VAR:-default}` syntax.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::{SpeciesConfig, SpeciesRegistry};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpeciesFile {
    species: Vec<SpeciesConfig>,
}

/// Load and parse a species file with environment variable substitution.
pub fn load_species_registry<P: AsRef<Path>>(path: P) -> Result<SpeciesRegistry> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read species config from {:?}", path.as_ref()))?;

    let registry = parse_species_registry(&content)
        .with_context(|| format!("Invalid species config in {:?}", path.as_ref()))?;

    info!(
        path = %path.as_ref().display(),
        species = registry.len(),
        "Loaded species configuration"
    );
    Ok(registry)
}

/// Parse species YAML from a string.
pub fn parse_species_registry(content: &str) -> Result<SpeciesRegistry> {
    let expanded = expand_env_vars(content)?;

    let file: SpeciesFile =
        serde_yaml::from_str(&expanded).with_context(|| "Failed to parse species config YAML")?;

    let mut registry = SpeciesRegistry::new();
    for config in file.species {
        config
            .validate()
            .with_context(|| format!("Species '{}' failed validation", config.species))?;
        anyhow::ensure!(
            registry.get(&config.species).is_err(),
            "Species '{}' is defined more than once",
            config.species
        );
        registry.insert(config);
    }

    Ok(registry)
}

/// Expand environment variables in YAML content.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}
