//! End-to-end pipeline tests against a mock catalog archive.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skyband::config::Config;
use skyband::{Band, HttpSource, Pipeline, declination_bands};

const HEADER: &str = "solution_id,source_id,ra,dec,ref_epoch,pmra,pmdec,\
phot_g_mean_mag,phot_bp_mean_mag,phot_rp_mean_mag,bp_rp";

/// Build a gzip-compressed partition body from (id, ra, dec, g_mag) rows.
///
/// BP-RP is zero, so derived Vmag is g_mag + 0.02704.
fn partition_body(rows: &[(u64, f64, f64, f64)]) -> Vec<u8> {
    let mut csv = format!("{HEADER}\n");
    for &(id, ra, dec, g_mag) in rows {
        csv.push_str(&format!(
            "12345,{id},{ra},{dec},2016.0,1.5,-2.5,{g_mag},{g},{g},0.0\n",
            g = g_mag
        ));
    }
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(csv.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn index_page(names: &[&str]) -> String {
    let links: String = names
        .iter()
        .map(|n| format!("<a href=\"{n}\">{n}</a>\n"))
        .collect();
    format!("<html><body>\n<a href=\"../\">Parent</a>\n{links}</body></html>")
}

async fn mock_archive(server: &MockServer, partitions: &[(&str, Vec<u8>)]) {
    let names: Vec<&str> = partitions.iter().map(|(n, _)| *n).collect();
    Mock::given(method("GET"))
        .and(path("/gaia_source/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&names)))
        .mount(server)
        .await;
    for (name, body) in partitions {
        Mock::given(method("GET"))
            .and(path(format!("/gaia_source/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(server)
            .await;
    }
}

fn test_config(server: &MockServer, working_dir: &Path) -> Config {
    let mut config = Config::default();
    config.catalog.url = format!("{}/gaia_source", server.uri());
    config.working_dir = working_dir.to_path_buf();
    config
}

fn pipeline(config: &Config) -> Pipeline {
    let source = HttpSource::new(&config.catalog.url, Duration::from_secs(5)).unwrap();
    Pipeline::new(config.clone(), Arc::new(source))
}

fn band_records(band: &Band, dir: &Path) -> Vec<skyband::CatalogRecord> {
    skyband::table::read_records(&band.path(dir)).unwrap()
}

#[tokio::test]
async fn test_scenario_filters_then_routes_single_survivor() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // id=2 fails the declination filter, id=3 fails the magnitude filter.
    let body = partition_body(&[
        (1, 120.0, 10.0, 5.0),
        (2, 121.0, -50.0, 5.0),
        (3, 122.0, 10.0, 20.0),
    ]);
    mock_archive(&server, &[("GaiaSource_p1.csv.gz", body)]).await;

    let config = test_config(&server, dir.path());
    let stats = pipeline(&config).run().await.unwrap();

    assert_eq!(stats.listed, 1);
    assert_eq!(stats.reduced, 1);

    let reduced = skyband::table::read_records(&dir.path().join("GaiaSource_p1.parquet")).unwrap();
    assert_eq!(reduced.len(), 1);
    assert_eq!(reduced[0].source_id, 1);
    assert!((reduced[0].vmag - 5.02704).abs() < 1e-4);

    let bands = declination_bands(&config.bands);
    for band in &bands {
        let records = band_records(band, dir.path());
        if band.contains(10.0) {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].source_id, 1);
            assert_eq!(band.file_name(), "band_dec+10+20.parquet");
        } else {
            assert!(records.is_empty());
        }
    }
}

#[tokio::test]
async fn test_scenario_empty_partition_commits_placeholder() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Every row fails one of the filters.
    let body = partition_body(&[(1, 10.0, -60.0, 5.0), (2, 20.0, 30.0, 25.0)]);
    mock_archive(&server, &[("GaiaSource_p1.csv.gz", body)]).await;

    let config = test_config(&server, dir.path());
    let stats = pipeline(&config).run().await.unwrap();
    assert_eq!(stats.empty, 1);

    let placeholder = dir.path().join("GaiaSource_p1.parquet");
    assert!(placeholder.exists());
    assert_eq!(std::fs::metadata(&placeholder).unwrap().len(), 0);

    // All bands are valid empty tables.
    let bands = declination_bands(&config.bands);
    for band in &bands {
        assert!(band_records(band, dir.path()).is_empty());
    }

    // Re-running treats the placeholder as "already processed".
    let stats = pipeline(&config).run().await.unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.empty, 0);
}

#[tokio::test]
async fn test_scenario_two_partitions_merge_sorted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let p1 = partition_body(&[(10, 300.0, 15.0, 8.0)]);
    let p2 = partition_body(&[(20, 50.0, 15.0, 9.0)]);
    mock_archive(
        &server,
        &[("GaiaSource_p1.csv.gz", p1), ("GaiaSource_p2.csv.gz", p2)],
    )
    .await;

    let config = test_config(&server, dir.path());
    pipeline(&config).run().await.unwrap();

    let band = Band {
        lo: 10.0,
        hi: 20.0,
        closed: false,
    };
    let records = band_records(&band, dir.path());
    assert_eq!(records.len(), 2);
    // Sorted together by ascension despite arriving from separate partitions.
    assert_eq!(records[0].source_id, 20);
    assert_eq!(records[1].source_id, 10);
}

#[tokio::test]
async fn test_rerun_performs_no_downloads() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let body = partition_body(&[(1, 120.0, 10.0, 5.0)]);
    mock_archive(&server, &[("GaiaSource_p1.csv.gz", body)]).await;

    let config = test_config(&server, dir.path());
    pipeline(&config).run().await.unwrap();
    let stats = pipeline(&config).run().await.unwrap();
    assert_eq!(stats.skipped, 1);

    // Exactly one partition download across both runs; the second run only
    // fetched the listing.
    let requests = server.received_requests().await.unwrap();
    let partition_fetches = requests
        .iter()
        .filter(|r| r.url.path().ends_with(".csv.gz"))
        .count();
    assert_eq!(partition_fetches, 1);
}

#[tokio::test]
async fn test_test_one_flag_stops_after_first_partition() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let p1 = partition_body(&[(1, 10.0, 5.0, 5.0)]);
    let p2 = partition_body(&[(2, 20.0, 5.0, 5.0)]);
    mock_archive(
        &server,
        &[("GaiaSource_p1.csv.gz", p1), ("GaiaSource_p2.csv.gz", p2)],
    )
    .await;

    let mut config = test_config(&server, dir.path());
    config.reduce.test_one = true;
    let stats = pipeline(&config).run().await.unwrap();

    assert_eq!(stats.listed, 2);
    assert_eq!(stats.processed, 1);
    assert!(dir.path().join("GaiaSource_p1.parquet").exists());
    assert!(!dir.path().join("GaiaSource_p2.parquet").exists());
}

#[tokio::test]
async fn test_discard_raw_removes_partition_after_reduce() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let body = partition_body(&[(1, 10.0, 5.0, 5.0)]);
    mock_archive(&server, &[("GaiaSource_p1.csv.gz", body)]).await;

    let mut config = test_config(&server, dir.path());
    config.reduce.use_existing = false;
    pipeline(&config).run().await.unwrap();

    assert!(!dir.path().join("GaiaSource_p1.csv.gz").exists());
    assert!(dir.path().join("GaiaSource_p1.parquet").exists());
}

#[tokio::test]
async fn test_keep_raw_reuses_local_copy() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let body = partition_body(&[(1, 10.0, 5.0, 5.0)]);
    mock_archive(&server, &[("GaiaSource_p1.csv.gz", body.clone())]).await;

    // Pre-seed the raw file; with use_existing the pipeline must not fetch it.
    std::fs::write(dir.path().join("GaiaSource_p1.csv.gz"), &body).unwrap();

    let config = test_config(&server, dir.path());
    pipeline(&config).run().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let partition_fetches = requests
        .iter()
        .filter(|r| r.url.path().ends_with(".csv.gz"))
        .count();
    assert_eq!(partition_fetches, 0);
    assert!(dir.path().join("GaiaSource_p1.csv.gz").exists());
}

#[tokio::test]
async fn test_malformed_partition_surfaces_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"source_id,ra\n1,10.0\n").unwrap();
    let body = encoder.finish().unwrap();
    mock_archive(&server, &[("GaiaSource_bad.csv.gz", body)]).await;

    let config = test_config(&server, dir.path());
    let result = pipeline(&config).run().await;
    assert!(matches!(
        result,
        Err(skyband::PipelineError::Reduce { .. })
    ));
    // No half-written reduced table may masquerade as a progress marker.
    assert!(!dir.path().join("GaiaSource_bad.parquet").exists());
}
