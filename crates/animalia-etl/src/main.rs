//! Animalia ETL - command-line entry point

use animalia_common::logging::{init_logging, LogConfig, LogLevel};
use animalia_common::PipelineConfig;
use animalia_etl::{gbif, pipeline, send, transform, validate};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "animalia")]
#[command(author, version, about = "Species taxonomy ETL pipeline (GBIF to catalog API)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch raw GBIF detail records for one or more species
    Fetch {
        /// Scientific names (defaults to the starter list)
        species: Vec<String>,
    },

    /// Batch-fetch species for whole taxonomic classes
    FetchAll {
        /// Taxonomic class to sweep (repeatable; defaults to the standard five)
        #[arg(long = "group")]
        groups: Vec<String>,

        /// Species cap per group (defaults to MAX_ANIMALS_PER_FAMILY)
        #[arg(long)]
        per_group: Option<usize>,

        /// Records scanned per group before abort (defaults to MAX_RECORDS_LIMIT)
        #[arg(long)]
        max_records: Option<usize>,
    },

    /// Normalize raw artifacts into the canonical schema
    Transform,

    /// Validate normalized records against the catalog schema
    Validate {
        /// Input artifact (defaults to the standard transformed artifact)
        input: Option<PathBuf>,
    },

    /// Send validated records to the target API
    Send {
        /// Input artifact (defaults to the standard validated artifact)
        input: Option<PathBuf>,
    },

    /// Run the full pipeline for one species
    Run {
        /// Scientific name of the target species
        #[arg(default_value = pipeline::DEFAULT_SPECIES)]
        species: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::from_env().unwrap_or_default();
    let log_config = if cli.verbose {
        log_config.with_level(LogLevel::Debug)
    } else {
        log_config
    };

    // The pipeline should still run if logging cannot be initialized
    let _ = init_logging(&log_config);

    if let Err(e) = execute(&cli).await {
        error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn execute(cli: &Cli) -> Result<()> {
    let config = PipelineConfig::from_env()?;
    if !config.production_mode {
        config.log_summary();
    }

    match &cli.command {
        Commands::Fetch { species } => {
            let client = gbif::GbifClient::new(&config)?;
            let names: Vec<String> = if species.is_empty() {
                gbif::STARTER_SPECIES.iter().map(|s| s.to_string()).collect()
            } else {
                species.clone()
            };

            info!(count = names.len(), "fetching species details");
            for name in &names {
                // One failed species does not stop the others
                match client.fetch_species_detail(name, &config.raw_data_dir).await {
                    Ok(path) => info!(species = %name, path = %path.display(), "fetched"),
                    Err(e) => error!(species = %name, error = %e, "fetch failed"),
                }
            }
            Ok(())
        }

        Commands::FetchAll {
            groups,
            per_group,
            max_records,
        } => {
            let client = gbif::GbifClient::new(&config)?;
            let groups: Vec<String> = if groups.is_empty() {
                gbif::DEFAULT_GROUPS.iter().map(|s| s.to_string()).collect()
            } else {
                groups.clone()
            };

            client
                .fetch_groups(
                    &groups,
                    per_group.unwrap_or(config.max_animals_per_group),
                    max_records.unwrap_or(config.max_records_limit),
                    &config.raw_data_dir,
                )
                .await?;
            Ok(())
        }

        Commands::Transform => {
            let docs = transform::load_raw_dir(&config.raw_data_dir)?;
            if docs.is_empty() {
                warn!(dir = %config.raw_data_dir.display(), "no raw artifacts to transform");
                return Ok(());
            }

            let records = transform::transform_species(&transform::flatten_raw(docs));
            let out_path = config.processed_data_dir.join(transform::TRANSFORMED_FILE);
            transform::export_records(&records, &out_path)?;
            Ok(())
        }

        Commands::Validate { input } => {
            let input = input
                .clone()
                .unwrap_or_else(|| config.processed_data_dir.join(transform::TRANSFORMED_FILE));
            validate::validate_file(&input, &config.processed_data_dir)?;
            Ok(())
        }

        Commands::Send { input } => {
            let input = input
                .clone()
                .unwrap_or_else(|| config.processed_data_dir.join(validate::VALIDATED_FILE));
            let client = send::TargetClient::new(&config)?;
            send::send_file(&input, &config.processed_data_dir, &client).await?;
            Ok(())
        }

        Commands::Run { species } => {
            let report = pipeline::Pipeline::new(&config)?.run(species).await?;
            info!(
                species = %report.species,
                sent = report.sent,
                send_failures = report.send_failures,
                "run complete"
            );
            Ok(())
        }
    }
}
