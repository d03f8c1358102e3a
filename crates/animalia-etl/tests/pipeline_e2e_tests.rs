//! End-to-end tests for the pipeline orchestrator
//!
//! These tests run the real stage implementations against mocked GBIF and
//! target APIs, validating:
//! - The happy path through all four stages and its artifacts
//! - The halt law: a failing stage stops the run and Send is never invoked
//! - Partial send failure being reported, not fatal
//! - Batch fetch pagination and filtering

use animalia_common::PipelineConfig;
use animalia_etl::pipeline::{Pipeline, Stage};
use animalia_etl::send::{TargetClient, SEND_ERRORS_FILE};
use animalia_etl::validate::{VALIDATED_FILE, VALIDATION_ERRORS_FILE};
use animalia_etl::{gbif, transform, Animal};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Pipeline configuration pointing at mock servers and a temp workspace
fn test_config(gbif_uri: &str, target_uri: &str, dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.gbif_api_url = gbif_uri.to_string();
    config.api_url = format!("{}/animaux", target_uri);
    config.raw_data_dir = dir.join("raw");
    config.processed_data_dir = dir.join("processed");
    config.rate_limit_delay = Duration::ZERO;
    config.enable_retry = false;
    config
}

/// Mount the GBIF search + detail mocks for one species
async fn mount_gbif_species(server: &MockServer, species: &str, key: u64, detail: Value) {
    Mock::given(method("GET"))
        .and(path("/species/search"))
        .and(query_param("q", species))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"key": key, "scientificName": species}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/species/{key}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail))
        .mount(server)
        .await;
}

fn cervus_detail() -> Value {
    json!({
        "key": 2440902,
        "scientificName": "Cervus elaphus",
        "vernacularName": "Cerf élaphe",
        "rank": "species",
        "order": "Artiodactyla",
        "family": "Cervidae",
        "genus": "Cervus",
        "description": "Grand mammifère européen."
    })
}

#[tokio::test]
async fn test_full_pipeline_success() {
    let gbif_server = MockServer::start().await;
    let target_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_gbif_species(&gbif_server, "Cervus elaphus", 2440902, cervus_detail()).await;

    Mock::given(method("POST"))
        .and(path("/animaux"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&target_server)
        .await;

    let config = test_config(&gbif_server.uri(), &target_server.uri(), dir.path());
    let report = Pipeline::new(&config)
        .unwrap()
        .run("Cervus elaphus")
        .await
        .unwrap();

    assert_eq!(report.transformed, 1);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 0);
    assert_eq!(report.sent, 1);
    assert_eq!(report.send_failures, 0);

    // Every stage left its artifact behind
    assert!(dir.path().join("raw/gbif_Cervus_elaphus.json").exists());
    assert!(dir
        .path()
        .join("processed/Cervus_elaphus_transformed.json")
        .exists());

    let validated: Vec<Value> = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("processed").join(VALIDATED_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(validated.len(), 1);
    assert_eq!(validated[0]["nom"], "Cervus elaphus");
    assert_eq!(validated[0]["nom_commun"], "Cerf élaphe");
    assert!(validated[0]["statutUICN"].is_null());

    // No rejections, no send failures: neither errors artifact exists
    assert!(!dir
        .path()
        .join("processed")
        .join(VALIDATION_ERRORS_FILE)
        .exists());
    assert!(!dir.path().join("processed").join(SEND_ERRORS_FILE).exists());
}

#[tokio::test]
async fn test_unknown_species_fails_at_fetch_and_never_sends() {
    let gbif_server = MockServer::start().await;
    let target_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/species/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&gbif_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/animaux"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&target_server)
        .await;

    let config = test_config(&gbif_server.uri(), &target_server.uri(), dir.path());
    let failure = Pipeline::new(&config)
        .unwrap()
        .run("Nullius species")
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Fetching);
    assert!(failure.to_string().contains("Nullius species"));
}

#[tokio::test]
async fn test_zero_transformed_records_halts_before_send() {
    let gbif_server = MockServer::start().await;
    let target_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Detail record with no scientific name: the normalizer drops it
    mount_gbif_species(&gbif_server, "Anonymous", 7, json!({"key": 7})).await;

    Mock::given(method("POST"))
        .and(path("/animaux"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&target_server)
        .await;

    let config = test_config(&gbif_server.uri(), &target_server.uri(), dir.path());
    let failure = Pipeline::new(&config)
        .unwrap()
        .run("Anonymous")
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Transforming);
}

#[tokio::test]
async fn test_upstream_error_during_fetch_fails_the_run() {
    let gbif_server = MockServer::start().await;
    let target_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/species/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&gbif_server)
        .await;

    let config = test_config(&gbif_server.uri(), &target_server.uri(), dir.path());
    let failure = Pipeline::new(&config)
        .unwrap()
        .run("Cervus elaphus")
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Fetching);
    assert!(failure.to_string().contains("503"));
}

#[tokio::test]
async fn test_send_failures_are_reported_not_fatal() {
    let gbif_server = MockServer::start().await;
    let target_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_gbif_species(&gbif_server, "Cervus elaphus", 2440902, cervus_detail()).await;

    Mock::given(method("POST"))
        .and(path("/animaux"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .expect(1)
        .mount(&target_server)
        .await;

    let config = test_config(&gbif_server.uri(), &target_server.uri(), dir.path());
    let report = Pipeline::new(&config)
        .unwrap()
        .run("Cervus elaphus")
        .await
        .unwrap();

    // The run completes: one attempt per record is the postcondition
    assert_eq!(report.sent, 0);
    assert_eq!(report.send_failures, 1);

    let errors: Vec<Value> = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("processed").join(SEND_ERRORS_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["error_type"], "HTTP_ERROR");
    assert_eq!(errors[0]["status_code"], 500);
    assert_eq!(errors[0]["response"], "database down");
}

#[tokio::test]
async fn test_send_partial_success() {
    let target_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/animaux"))
        .and(body_partial_json(json!({"nom": "Lynx lynx"})))
        .respond_with(ResponseTemplate::new(201))
        .mount(&target_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/animaux"))
        .and(body_partial_json(json!({"nom": "Bubo bubo"})))
        .respond_with(ResponseTemplate::new(422).set_body_string("duplicate"))
        .mount(&target_server)
        .await;

    let config = test_config("http://unused.invalid", &target_server.uri(), dir.path());
    let client = TargetClient::new(&config).unwrap();

    let animals = vec![Animal::named("Lynx lynx"), Animal::named("Bubo bubo")];
    let report = client.send_animals(&animals).await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].status_code, Some(422));
}

#[tokio::test]
async fn test_fetch_groups_paginates_and_filters() {
    let gbif_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // First page: three results, one filtered out by the relevance filter
    Mock::given(method("GET"))
        .and(path("/species/search"))
        .and(query_param("class", "Mammalia"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"scientificName": "Lynx lynx"},
                {"scientificName": "Bacteria sp."},
                {"scientificName": "Cervus elaphus"}
            ]
        })))
        .mount(&gbif_server)
        .await;

    // Second page: no further results, pagination stops
    Mock::given(method("GET"))
        .and(path("/species/search"))
        .and(query_param("class", "Mammalia"))
        .and(query_param("offset", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&gbif_server)
        .await;

    let config = test_config(&gbif_server.uri(), "http://unused.invalid", dir.path());
    let client = gbif::GbifClient::new(&config).unwrap();

    let batch_path = client
        .fetch_groups(&["Mammalia".to_string()], 5, 100, &config.raw_data_dir)
        .await
        .unwrap();

    let batch: Value =
        serde_json::from_str(&std::fs::read_to_string(&batch_path).unwrap()).unwrap();
    let mammals = batch["Mammalia"].as_array().unwrap();
    assert_eq!(mammals.len(), 2);
    assert_eq!(mammals[0]["scientificName"], "Lynx lynx");
    assert_eq!(mammals[1]["scientificName"], "Cervus elaphus");

    // The batch artifact feeds straight into the normalizer
    let docs = transform::load_raw_dir(&config.raw_data_dir).unwrap();
    let records = transform::transform_species(&transform::flatten_raw(docs));
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_failing_group_does_not_abort_siblings() {
    let gbif_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/species/search"))
        .and(query_param("class", "Mammalia"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&gbif_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/species/search"))
        .and(query_param("class", "Aves"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"scientificName": "Bubo bubo"}]
        })))
        .mount(&gbif_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/species/search"))
        .and(query_param("class", "Aves"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&gbif_server)
        .await;

    let config = test_config(&gbif_server.uri(), "http://unused.invalid", dir.path());
    let client = gbif::GbifClient::new(&config).unwrap();

    let batch_path = client
        .fetch_groups(
            &["Mammalia".to_string(), "Aves".to_string()],
            2,
            100,
            &config.raw_data_dir,
        )
        .await
        .unwrap();

    let batch: Value =
        serde_json::from_str(&std::fs::read_to_string(&batch_path).unwrap()).unwrap();
    assert_eq!(batch["Mammalia"].as_array().unwrap().len(), 0);
    assert_eq!(batch["Aves"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_network_failure_surfaces_as_error() {
    let dir = TempDir::new().unwrap();

    // Unroutable target: connection refused immediately, no retries
    let config = test_config("http://127.0.0.1:1", "http://127.0.0.1:1", dir.path());
    let client = gbif::GbifClient::new(&config).unwrap();

    let result = client
        .fetch_species_detail("Cervus elaphus", &config.raw_data_dir)
        .await;
    assert!(matches!(
        result,
        Err(animalia_common::EtlError::Network(_))
    ));
}
