//! Normalization of raw GBIF records into the canonical schema
//!
//! Loads raw artifacts, maps GBIF field names onto the canonical record
//! shape, and deduplicates by scientific name (first occurrence wins).

use crate::model::Animal;
use crate::write_json_artifact;
use animalia_common::{EtlError, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Normalized-records artifact file name (standalone transform runs).
pub const TRANSFORMED_FILE: &str = "animals_transformed.json";

/// Extract a non-empty string field, mapping absent, null, and empty
/// values to `None`.
fn non_empty(record: &Value, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Flatten raw fetch artifacts into a sequence of entity records.
///
/// A raw document is either a single entity object (detail fetch), an array
/// of entities, or a batch mapping of taxonomic-group name to an array of
/// entities. Anything else contributes nothing.
pub fn flatten_raw(docs: Vec<Value>) -> Vec<Value> {
    let mut records = Vec::new();

    for doc in docs {
        match doc {
            Value::Object(obj) if obj.contains_key("scientificName") => {
                records.push(Value::Object(obj));
            }
            Value::Object(obj) => {
                for (group, entries) in obj {
                    match entries {
                        Value::Array(items) => records.extend(items),
                        _ => warn!(group = %group, "ignoring non-array group entry in batch artifact"),
                    }
                }
            }
            Value::Array(items) => records.extend(items),
            other => warn!(doc = ?other, "ignoring unrecognized raw document"),
        }
    }

    records
}

/// Normalize raw GBIF entities into canonical records.
///
/// Records without a scientific name are dropped; later duplicates of a
/// scientific name are dropped (first occurrence wins). Output order follows
/// input order.
pub fn transform_species(raw: &[Value]) -> Vec<Animal> {
    let mut records = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for item in raw {
        let Some(nom) = non_empty(item, "scientificName") else {
            warn!("record skipped: no scientific name");
            continue;
        };

        if !seen.insert(nom.clone()) {
            debug!(name = %nom, "duplicate skipped");
            continue;
        }

        records.push(Animal {
            nom,
            nom_commun: non_empty(item, "vernacularName"),
            rang: non_empty(item, "rank"),
            // GBIF species records carry no IUCN status; left for enrichment
            statut_uicn: None,
            ordre: non_empty(item, "order"),
            famille: non_empty(item, "family"),
            genre: non_empty(item, "genus"),
            descriptions: non_empty(item, "description"),
            // Not provided by this source
            image_url: None,
        });
    }

    info!(
        transformed = records.len(),
        dropped = raw.len() - records.len(),
        "normalization finished"
    );

    records
}

/// Load every `gbif_*.json` artifact in a directory, sorted by file name
/// for deterministic batch order.
pub fn load_raw_dir(dir: &Path) -> Result<Vec<Value>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("gbif_") && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut docs = Vec::new();
    for path in &paths {
        let content = std::fs::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&content)
            .map_err(|e| EtlError::malformed(path.display().to_string(), e))?;
        docs.push(doc);
    }

    info!(files = docs.len(), dir = %dir.display(), "raw artifacts loaded");
    Ok(docs)
}

/// Write normalized records to a JSON artifact, creating parent directories.
pub fn export_records(records: &[Animal], out_file: &Path) -> Result<()> {
    write_json_artifact(out_file, &records)?;
    info!(records = records.len(), path = %out_file.display(), "normalized records written");
    Ok(())
}
