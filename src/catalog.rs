//! Carrier catalog: built-in defaults and JSON catalog files.
//!
//! A catalog file looks like
//!
//! ```json
//! {
//!   "carriers": [ { "id": "NOSNIK_1", "inner_length_mm": 570, ... } ],
//!   "custom_carriers": [ { "id": "SHELF_A", ... } ]
//! }
//! ```
//!
//! Entries under `carriers` are marked predefined, entries under `custom_carriers`
//! are not. Either list may be omitted.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::model::{CarrierConfig, ValidationError};

/// Failure to load a carrier catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read carrier catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse carrier catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid carrier in catalog: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    carriers: Vec<CarrierConfig>,
    #[serde(default)]
    custom_carriers: Vec<CarrierConfig>,
}

fn predefined(
    id: &str,
    name: &str,
    inner_dims: (f64, f64, f64),
    max_weight_kg: f64,
) -> CarrierConfig {
    CarrierConfig {
        id: id.to_string(),
        name: name.to_string(),
        inner_length_mm: inner_dims.0,
        inner_width_mm: inner_dims.1,
        inner_height_mm: inner_dims.2,
        max_weight_kg,
        loading_constraint: Default::default(),
        priority: None,
        is_predefined: true,
        active: true,
        available_locations: None,
    }
}

/// The three standard Kardex trays used when no catalog file is configured.
pub fn default_carriers() -> Vec<CarrierConfig> {
    vec![
        predefined(
            "NOSNIK_1",
            "Nosnik 1 - 600x400x220",
            (570.0, 370.0, 200.0),
            35.0,
        ),
        predefined(
            "NOSNIK_2",
            "Nosnik 2 - 640x440x238",
            (610.0, 410.0, 210.0),
            35.0,
        ),
        predefined(
            "NOSNIK_3",
            "Nosnik 3 - 3650x864x200",
            (3650.0, 864.0, 200.0),
            440.0,
        ),
    ]
}

/// Parses a JSON catalog and validates every entry.
pub fn parse_catalog(json: &str) -> Result<Vec<CarrierConfig>, CatalogError> {
    let file: CatalogFile = serde_json::from_str(json)?;

    let carriers: Vec<CarrierConfig> = file
        .carriers
        .into_iter()
        .map(|carrier| carrier.predefined())
        .chain(file.custom_carriers.into_iter().map(|mut carrier| {
            carrier.is_predefined = false;
            carrier
        }))
        .collect();

    let mut seen = HashSet::new();
    for carrier in &carriers {
        carrier.validate()?;
        if !seen.insert(carrier.id.as_str()) {
            return Err(ValidationError::DuplicateIdentifier(format!(
                "carrier '{}' is defined more than once",
                carrier.id
            ))
            .into());
        }
    }
    Ok(carriers)
}

/// Reads and parses a JSON catalog file.
pub fn load_catalog(path: &Path) -> Result<Vec<CarrierConfig>, CatalogError> {
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let carriers = parse_catalog(&raw)?;
    info!(
        path = %path.display(),
        carriers = carriers.len(),
        "Loaded carrier catalog"
    );
    Ok(carriers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LoadingConstraint;
    use std::io::Write;

    #[test]
    fn defaults_are_valid_and_predefined() {
        let carriers = default_carriers();
        assert_eq!(carriers.len(), 3);
        for carrier in &carriers {
            assert!(carrier.validate().is_ok());
            assert!(carrier.is_predefined);
            assert!(carrier.active);
            assert_eq!(carrier.priority, None);
        }
        assert_eq!(carriers[0].inner_dims().as_tuple(), (570.0, 370.0, 200.0));
        assert_eq!(carriers[2].max_weight_kg, 440.0);
    }

    #[test]
    fn parses_predefined_and_custom_lists() {
        let json = r#"{
            "carriers": [
                {"id": "T1", "inner_length_mm": 570, "inner_width_mm": 370,
                 "inner_height_mm": 200, "max_weight_kg": 35, "priority": 1}
            ],
            "custom_carriers": [
                {"id": "SHELF", "name": "Shelf bin", "inner_length_mm": 400,
                 "inner_width_mm": 300, "inner_height_mm": 250, "max_weight_kg": 20,
                 "loading_constraint": "UPRIGHT_ONLY", "is_predefined": true}
            ]
        }"#;
        let carriers = parse_catalog(json).unwrap();
        assert_eq!(carriers.len(), 2);
        assert!(carriers[0].is_predefined);
        assert_eq!(carriers[0].priority, Some(1));
        assert!(!carriers[1].is_predefined);
        assert_eq!(carriers[1].loading_constraint, LoadingConstraint::UprightOnly);
    }

    #[test]
    fn missing_lists_yield_empty_catalog() {
        assert!(parse_catalog("{}").unwrap().is_empty());
    }

    #[test]
    fn invalid_entries_are_rejected() {
        let json = r#"{"carriers": [
            {"id": "BAD", "inner_length_mm": 0, "inner_width_mm": 370,
             "inner_height_mm": 200, "max_weight_kg": 35}
        ]}"#;
        assert!(matches!(
            parse_catalog(json),
            Err(CatalogError::Invalid(ValidationError::InvalidDimension(_)))
        ));

        let duplicate = r#"{
            "carriers": [{"id": "X", "inner_length_mm": 1, "inner_width_mm": 1,
                          "inner_height_mm": 1, "max_weight_kg": 1}],
            "custom_carriers": [{"id": "X", "inner_length_mm": 1, "inner_width_mm": 1,
                                 "inner_height_mm": 1, "max_weight_kg": 1}]
        }"#;
        assert!(matches!(
            parse_catalog(duplicate),
            Err(CatalogError::Invalid(ValidationError::DuplicateIdentifier(_)))
        ));

        assert!(matches!(parse_catalog("not json"), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn loads_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"custom_carriers": [{{"id": "BIN", "inner_length_mm": 300,
                "inner_width_mm": 200, "inner_height_mm": 150, "max_weight_kg": 15}}]}}"#
        )
        .unwrap();

        let carriers = load_catalog(file.path()).unwrap();
        assert_eq!(carriers.len(), 1);
        assert_eq!(carriers[0].display_name(), "BIN");
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            load_catalog(&missing),
            Err(CatalogError::Io { .. })
        ));
    }
}
