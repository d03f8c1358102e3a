//! Animalia ETL Library
//!
//! A four-stage batch pipeline feeding a species catalog API from GBIF:
//!
//! - **Fetch** ([`gbif`]): retrieve raw taxonomy records from the GBIF API
//! - **Transform** ([`transform`]): normalize raw records into the canonical
//!   schema, deduplicated by scientific name
//! - **Validate** ([`validate`]): enforce the schema and partition records
//!   into accepted and rejected sets with structured error context
//! - **Send** ([`send`]): push each validated record to the target API
//!
//! [`pipeline`] sequences the four stages with strict postconditions; data
//! flows forward through JSON artifacts on disk, never backwards.
//!
//! # Example
//!
//! ```no_run
//! use animalia_common::PipelineConfig;
//! use animalia_etl::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let report = Pipeline::new(&config)?.run("Cervus elaphus").await?;
//!     println!("sent {} records", report.sent);
//!     Ok(())
//! }
//! ```

pub mod gbif;
pub mod model;
pub mod pipeline;
pub mod retry;
pub mod send;
pub mod transform;
pub mod validate;

// Re-export commonly used types
pub use model::{Animal, IucnStatus};
pub use pipeline::{Pipeline, PipelineReport, Stage, StageFailure};

use std::path::Path;

/// Write a JSON artifact with pretty formatting, creating parent
/// directories as needed.
pub(crate) fn write_json_artifact<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> animalia_common::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
