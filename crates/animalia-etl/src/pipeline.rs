//! Pipeline orchestration
//!
//! Sequences Fetch → Transform → Validate → Send for one species. Each
//! stage transition requires the previous stage's postcondition to hold;
//! any violation moves the run into the absorbing failed state, reported as
//! a [`StageFailure`] naming the stage. There are no retries between stages
//! and no resume: re-running restarts from Fetching.

use crate::gbif::GbifClient;
use crate::model::Animal;
use crate::send::{self, SendReport, TargetClient};
use crate::transform;
use crate::validate;
use animalia_common::{EtlError, PipelineConfig, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Species processed when the combined entry point gets no argument.
pub const DEFAULT_SPECIES: &str = "Cervus elaphus";

/// The four working states of a pipeline run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Transforming,
    Validating,
    Sending,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetching => write!(f, "fetch"),
            Stage::Transforming => write!(f, "transform"),
            Stage::Validating => write!(f, "validate"),
            Stage::Sending => write!(f, "send"),
        }
    }
}

/// The absorbing failure state: which stage failed, and why
#[derive(Debug, Error)]
#[error("pipeline failed at stage '{stage}': {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

/// Summary of a successful run
#[derive(Debug)]
pub struct PipelineReport {
    pub species: String,
    pub transformed: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub sent: usize,
    pub send_failures: usize,
}

/// The strict sequential orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    gbif: GbifClient,
    target: TargetClient,
}

impl Pipeline {
    /// Build the orchestrator and its stage clients from configuration.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            gbif: GbifClient::new(config)?,
            target: TargetClient::new(config)?,
            config: config.clone(),
        })
    }

    /// Run the full pipeline for one species.
    ///
    /// Partial send failure is tolerated and reported; every other stage
    /// shortfall (missing raw artifact, zero transformed records, zero
    /// accepted records) fails the run at that stage.
    pub async fn run(&self, species: &str) -> std::result::Result<PipelineReport, StageFailure> {
        info!(species, "pipeline starting");

        let raw_path = self
            .fetch(species)
            .await
            .map_err(fail_at(Stage::Fetching))?;

        let (transformed_path, transformed) = self
            .transform(species, &raw_path)
            .map_err(fail_at(Stage::Transforming))?;

        let report = self
            .validate(&transformed_path)
            .map_err(fail_at(Stage::Validating))?;

        let send_report = self
            .send(&report.accepted)
            .await
            .map_err(fail_at(Stage::Sending))?;

        let report = PipelineReport {
            species: species.to_string(),
            transformed,
            accepted: report.accepted.len(),
            rejected: report.rejected.len(),
            sent: send_report.sent,
            send_failures: send_report.failures.len(),
        };

        info!(
            species = %report.species,
            transformed = report.transformed,
            accepted = report.accepted,
            rejected = report.rejected,
            sent = report.sent,
            send_failures = report.send_failures,
            "pipeline finished"
        );

        Ok(report)
    }

    /// Fetch stage. Postcondition: the raw artifact exists and is non-empty.
    async fn fetch(&self, species: &str) -> Result<PathBuf> {
        info!(stage = %Stage::Fetching, "stage starting");

        let raw_path = self
            .gbif
            .fetch_species_detail(species, &self.config.raw_data_dir)
            .await?;

        if std::fs::metadata(&raw_path)?.len() == 0 {
            return Err(EtlError::empty(format!(
                "raw artifact '{}' is empty",
                raw_path.display()
            )));
        }

        Ok(raw_path)
    }

    /// Transform stage. Postcondition: at least one normalized record.
    fn transform(&self, species: &str, raw_path: &Path) -> Result<(PathBuf, usize)> {
        info!(stage = %Stage::Transforming, "stage starting");

        let content = std::fs::read_to_string(raw_path)?;
        let doc: Value = serde_json::from_str(&content)
            .map_err(|e| EtlError::malformed(raw_path.display().to_string(), e))?;

        let records = transform::transform_species(&transform::flatten_raw(vec![doc]));
        if records.is_empty() {
            return Err(EtlError::empty(format!(
                "no normalized records for species '{species}'"
            )));
        }

        let out_path = self
            .config
            .processed_data_dir
            .join(format!("{}_transformed.json", species.replace(' ', "_")));
        transform::export_records(&records, &out_path)?;

        Ok((out_path, records.len()))
    }

    /// Validate stage. Postcondition: at least one accepted record —
    /// the validator tolerates an empty result, the strict orchestrator
    /// does not, since there would be nothing to send.
    fn validate(&self, transformed_path: &Path) -> Result<validate::ValidationReport> {
        info!(stage = %Stage::Validating, "stage starting");

        let report = validate::validate_file(transformed_path, &self.config.processed_data_dir)?;
        if report.accepted.is_empty() {
            return Err(EtlError::empty("no records passed validation"));
        }

        Ok(report)
    }

    /// Send stage. One attempt per accepted record; partial failure is
    /// reported through the send-errors artifact, not a stage failure.
    async fn send(&self, accepted: &[Animal]) -> Result<SendReport> {
        info!(stage = %Stage::Sending, "stage starting");

        let report = self.target.send_animals(accepted).await;
        send::write_failure_artifact(&report, &self.config.processed_data_dir)?;

        Ok(report)
    }
}

/// Wrap a stage error into the absorbing failure state, logging it.
fn fail_at(stage: Stage) -> impl FnOnce(EtlError) -> StageFailure {
    move |source| {
        error!(stage = %stage, error = %source, "stage failed");
        StageFailure { stage, source }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_names() {
        assert_eq!(Stage::Fetching.to_string(), "fetch");
        assert_eq!(Stage::Transforming.to_string(), "transform");
        assert_eq!(Stage::Validating.to_string(), "validate");
        assert_eq!(Stage::Sending.to_string(), "send");
    }

    #[test]
    fn test_stage_failure_names_the_stage() {
        let failure = fail_at(Stage::Transforming)(EtlError::empty("no records"));
        assert_eq!(failure.stage, Stage::Transforming);
        assert!(failure.to_string().contains("transform"));
        assert!(failure.to_string().contains("no records"));
    }
}
