//! GBIF fetch client
//!
//! Retrieves species records from the GBIF API, either one detail record per
//! scientific name or a paginated batch per taxonomic group, and persists
//! them as raw JSON artifacts for the transform stage.

use crate::retry::RetryPolicy;
use crate::write_json_artifact;
use animalia_common::{EtlError, PipelineConfig, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// Batch fetch artifact file name (taxonomic-group keyed).
pub const FULL_BATCH_FILE: &str = "gbif_full_batch.json";

/// GBIF pages are requested in blocks of at most this many records.
pub const PAGE_SIZE: usize = 100;

/// Default taxonomic classes swept by a batch fetch.
pub const DEFAULT_GROUPS: [&str; 5] = [
    "Mammalia",
    "Aves",
    "Reptilia",
    "Actinopterygii",
    "Amphibia",
];

/// Starter species list used by `animalia fetch` with no arguments.
pub const STARTER_SPECIES: [&str; 10] = [
    "Cervus elaphus",
    "Panthera tigris",
    "Varanus komodoensis",
    "Aquila chrysaetos",
    "Lynx lynx",
    "Python regius",
    "Amphiprion ocellaris",
    "Rana ridibunda",
    "Salmo salar",
    "Bubo bubo",
];

/// Name fragments that disqualify a search hit from the catalog:
/// non-animal clades and unusable nomenclature.
const EXCLUDED_NAME_TERMS: [&str; 8] = [
    "bacter",
    "virus",
    "fung",
    "incertae",
    "unclassified",
    "unidentified",
    "sp.",
    "hybr.",
];

/// Raw artifact path for one species detail fetch.
pub fn raw_artifact_path(raw_dir: &Path, species: &str) -> PathBuf {
    raw_dir.join(format!("gbif_{}.json", species.replace(' ', "_")))
}

/// Content-relevance filter for batch sweeps.
///
/// Rejects entries whose scientific name marks them as bacteria, viruses,
/// fungi, taxonomically unplaced, or incompletely named (`sp.`, hybrids).
pub fn is_legit_species(entry: &Value) -> bool {
    let name = entry
        .get("scientificName")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();

    for term in EXCLUDED_NAME_TERMS {
        if name.contains(term) {
            debug!(name = %name, term, "species filtered out");
            return false;
        }
    }

    true
}

/// HTTP client for the GBIF species API
pub struct GbifClient {
    client: Client,
    base_url: String,
    rate_limit_delay: Duration,
    retry: RetryPolicy,
}

impl GbifClient {
    /// Create a client with the configured timeout and retry policy.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            client,
            base_url: config.gbif_api_url.trim_end_matches('/').to_string(),
            rate_limit_delay: config.rate_limit_delay,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// GET a JSON document, retrying network failures per policy.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let mut attempt = 0;
        loop {
            match self.request_json(url, query).await {
                Err(e) if self.retry.should_retry(&e, attempt) => {
                    self.retry.backoff(attempt, url).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn request_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EtlError::upstream(status.as_u16(), body));
        }

        Ok(response.json().await?)
    }

    /// Fetch the full detail record for one species and persist it.
    ///
    /// Two requests: a name search resolving the usage key, then the detail
    /// lookup by key. Returns the path of the written raw artifact.
    pub async fn fetch_species_detail(&self, species: &str, raw_dir: &Path) -> Result<PathBuf> {
        info!(species, "searching GBIF");

        let search_url = format!("{}/species/search", self.base_url);
        let search = self
            .get_json(
                &search_url,
                &[("q", species.to_string()), ("limit", "1".to_string())],
            )
            .await?;

        let usage_key = search
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|taxon| taxon.get("key"))
            .and_then(Value::as_u64)
            .ok_or_else(|| EtlError::SpeciesNotFound(species.to_string()))?;

        info!(species, usage_key, "species found");

        let detail_url = format!("{}/species/{}", self.base_url, usage_key);
        let detail = self.get_json(&detail_url, &[]).await?;

        let path = raw_artifact_path(raw_dir, species);
        write_json_artifact(&path, &detail)?;
        info!(species, path = %path.display(), "raw details saved");

        Ok(path)
    }

    /// Batch-fetch species for several taxonomic groups into one artifact.
    ///
    /// A failing group is logged and abandoned; the remaining groups are
    /// still swept. Returns the path of the written batch artifact.
    pub async fn fetch_groups(
        &self,
        groups: &[String],
        per_group: usize,
        max_records: usize,
        raw_dir: &Path,
    ) -> Result<PathBuf> {
        let mut by_group = Map::new();

        for group in groups {
            info!(group = %group, per_group, "sweeping taxonomic group");
            let species = self.collect_group(group, per_group, max_records).await;
            info!(group = %group, retained = species.len(), "group swept");
            by_group.insert(group.clone(), Value::Array(species));
        }

        let path = raw_dir.join(FULL_BATCH_FILE);
        write_json_artifact(&path, &Value::Object(by_group))?;
        info!(path = %path.display(), groups = groups.len(), "batch artifact saved");

        Ok(path)
    }

    /// Offset-paginated sweep of one taxonomic class.
    ///
    /// Stops when enough species are collected, `max_records` results have
    /// been scanned, the server runs out of results, or a request fails.
    async fn collect_group(&self, group: &str, per_group: usize, max_records: usize) -> Vec<Value> {
        let url = format!("{}/species/search", self.base_url);
        let mut collected: Vec<Value> = Vec::new();
        let mut offset = 0usize;
        let mut scanned = 0usize;

        while collected.len() < per_group && scanned < max_records {
            let limit = PAGE_SIZE.min(per_group - collected.len());
            let query = [
                ("rank", "species".to_string()),
                ("class", group.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ];

            let page = match self.get_json(&url, &query).await {
                Ok(page) => page,
                Err(e) => {
                    error!(group, offset, error = %e, "page fetch failed, abandoning group");
                    break;
                }
            };

            let results = page
                .get("results")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if results.is_empty() {
                debug!(group, offset, "no further results");
                break;
            }

            scanned += results.len();
            offset += limit;

            let before = collected.len();
            collected.extend(results.into_iter().filter(is_legit_species));
            debug!(
                group,
                kept = collected.len() - before,
                total = collected.len(),
                scanned,
                "page processed"
            );

            // Cooperative pause, not a concurrency primitive
            tokio::time::sleep(self.rate_limit_delay).await;
        }

        collected.truncate(per_group);
        collected
    }
}
