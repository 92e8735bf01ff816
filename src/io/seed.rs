//! One-time store catalog seeding from a JSON file
//!
//! The file holds an array of `{"name", "lat", "lng"}` objects. Seeding is
//! skipped when the catalog already holds stores.

use crate::domain::error::Result;
use crate::domain::types::Coordinate;
use crate::infra::storage::StoreCatalog;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct StoreSeed {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// Parse a store seed document
pub fn parse_seed(json: &str) -> Result<Vec<StoreSeed>> {
    Ok(serde_json::from_str(json)?)
}

/// Seed the catalog from a file; returns the number of stores inserted
pub fn seed_catalog<P: AsRef<Path>>(catalog: &dyn StoreCatalog, path: P) -> Result<usize> {
    if !catalog.is_empty()? {
        info!("store_catalog_already_initialized");
        return Ok(0);
    }

    let path = path.as_ref();
    info!(file = %path.display(), "store_catalog_seeding");
    let content = fs::read_to_string(path)?;
    seed_from_str(catalog, &content)
}

/// Seed the catalog from an in-memory JSON document
pub fn seed_from_str(catalog: &dyn StoreCatalog, json: &str) -> Result<usize> {
    if !catalog.is_empty()? {
        info!("store_catalog_already_initialized");
        return Ok(0);
    }

    let seeds = parse_seed(json)?;
    // Validate everything up front so a bad row leaves the catalog untouched
    for seed in &seeds {
        Coordinate::checked(seed.lat, seed.lng)?;
    }

    for seed in &seeds {
        let store = catalog.insert(&seed.name, Coordinate::new(seed.lat, seed.lng))?;
        info!(
            store_id = %store.id,
            store = %store.name,
            lat = %store.coordinate.lat,
            lng = %store.coordinate.lng,
            "store_loaded"
        );
    }

    info!(count = %seeds.len(), "store_catalog_seeded");
    Ok(seeds.len())
}
