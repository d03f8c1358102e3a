//! Animalia Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging, and configuration for the Animalia
//! species-catalog ETL pipeline.
//!
//! # Overview
//!
//! - **Error Handling**: the [`EtlError`] type and [`Result`] alias used by
//!   every stage
//! - **Logging**: tracing subscriber setup driven by environment variables
//! - **Configuration**: the [`config::PipelineConfig`] value object built once
//!   at process start and passed into each stage

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{EtlError, Result};
