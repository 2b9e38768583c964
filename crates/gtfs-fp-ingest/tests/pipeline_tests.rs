//! End-to-end pipeline runs against a mock landing server and an in-memory store

use gtfs_fp_common::FeedError;
use gtfs_fp_ingest::error::{ArchiveError, IngestError, PublishError, ResolveError};
use gtfs_fp_ingest::storage::memory::{MemoryStore, StoreOp};
use gtfs_fp_ingest::{IngestOutcome, IngestPipeline, PipelineConfig};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

const LANDING_PATH: &str = "/permalink/timetable";
const ARCHIVE_PATH: &str = "/dataset/gtfs_fp_2025.zip";

const STOPS: &str = "\
stop_id,stop_name,stop_lat,stop_lon,location_type,parent_station,platform_code
Parent8507000,Bern,46.949,7.439,1,,
8507000:0:5,Bern,46.949,7.439,,Parent8507000,5
";
const ROUTES: &str = "\
route_id,agency_id,route_short_name,route_long_name,route_type
R1,11,IC8,,102
";
const TRIPS: &str = "\
route_id,service_id,trip_id,trip_headsign,block_id,original_trip_id,hints
R1,S1,T1,Brig,,,
";
const STOP_TIMES: &str = "\
trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,07:00:00,07:04:00,8507000:0:5,1
";

fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn feed_archive() -> Vec<u8> {
    build_zip(&[
        ("agency.txt", "agency_id,agency_name\n11,SBB\n"),
        ("stops.txt", STOPS),
        ("routes.txt", ROUTES),
        ("trips.txt", TRIPS),
        ("stop_times.txt", STOP_TIMES),
        ("calendar.txt", "service_id,monday\nS1,1\n"),
    ])
}

struct Harness {
    server: MockServer,
    store: Arc<MemoryStore>,
    dir: TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            store: Arc::new(MemoryStore::new("gtfs-fp")),
            dir: TempDir::new().unwrap(),
        }
    }

    fn with_store(mut self, store: MemoryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    async fn redirect_to(&self, location: &str, expected: u64) {
        Mock::given(method("GET"))
            .and(path(LANDING_PATH))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    async fn serve_archive(&self, body: Vec<u8>, expected: u64) {
        Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    fn scratch_dir(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    fn pipeline(&self) -> IngestPipeline {
        let config = PipelineConfig {
            landing_url: format!("{}{}", self.server.uri(), LANDING_PATH).parse().unwrap(),
            scratch_dir: self.scratch_dir(),
            output_dir: self.dir.path().to_path_buf(),
        };
        IngestPipeline::new(config, self.store.clone()).unwrap()
    }
}

fn open_published(store: &MemoryStore, dir: &Path) -> duckdb::Connection {
    let bytes = store.object("2025_feed.db").unwrap();
    let copy = dir.join("downloaded.db");
    std::fs::write(&copy, bytes).unwrap();
    duckdb::Connection::open(copy).unwrap()
}

#[tokio::test]
async fn test_fresh_version_is_published() {
    let h = Harness::new().await;
    let archive = feed_archive();
    h.redirect_to(ARCHIVE_PATH, 1).await;
    h.serve_archive(archive.clone(), 1).await;

    let outcome = h.pipeline().run().await.unwrap();

    let IngestOutcome::Published {
        version,
        keys,
        resumed,
        tables,
        database,
    } = outcome
    else {
        panic!("expected a published outcome");
    };
    assert_eq!(version.as_str(), "2025");
    assert_eq!(keys.archive, "2025_feed.zip");
    assert_eq!(keys.database, "2025_feed.db");
    assert!(!resumed);
    assert_eq!(tables.len(), 4);
    assert_eq!(database.key, "2025_feed.db");

    // Raw archive is stored byte for byte
    assert_eq!(h.store.object("2025_feed.zip").unwrap(), archive);
    assert_eq!(
        h.store.calls_of(StoreOp::Put),
        vec!["2025_feed.zip".to_string(), "2025_feed.db".to_string()]
    );

    assert!(!h.scratch_dir().exists());

    let conn = open_published(&h.store, h.dir.path());
    let stations: i64 = conn
        .query_row("SELECT count(*) FROM stops", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stations, 1);
    let empty_names: i64 = conn
        .query_row(
            "SELECT count(*) FROM routes WHERE route_long_name = ''",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(empty_names, 1);
}

#[tokio::test]
async fn test_absolute_redirect_location() {
    let h = Harness::new().await;
    let location = format!("{}{}", h.server.uri(), ARCHIVE_PATH);
    h.redirect_to(&location, 1).await;
    h.serve_archive(feed_archive(), 1).await;

    let outcome = h.pipeline().run().await.unwrap();
    assert_eq!(outcome.version().as_str(), "2025");
}

#[tokio::test]
async fn test_landing_without_redirect_fails_before_storage() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path(LANDING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.pipeline().run().await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::RedirectResolution(ResolveError::UnexpectedStatus(200))
    ));
    assert_eq!(err.stage(), "resolve");
    assert!(h.store.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_file_name_fails_before_storage() {
    let h = Harness::new().await;
    h.redirect_to("/dataset/feed_2025.zip", 1).await;

    let err = h.pipeline().run().await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::RedirectResolution(ResolveError::Feed(FeedError::MalformedFeedFilename(ref name)))
            if name == "feed_2025.zip"
    ));
    assert!(h.store.calls().is_empty());
}

#[tokio::test]
async fn test_published_version_is_skipped() {
    let h = Harness::new().await.with_store(
        MemoryStore::new("gtfs-fp")
            .with_object("2025_feed.zip", b"zip".to_vec())
            .with_object("2025_feed.db", b"db".to_vec()),
    );
    h.redirect_to(ARCHIVE_PATH, 1).await;
    h.serve_archive(feed_archive(), 0).await;

    let outcome = h.pipeline().run().await.unwrap();

    assert!(matches!(
        outcome,
        IngestOutcome::AlreadyProcessed { ref version } if version.as_str() == "2025"
    ));
    assert_eq!(h.store.calls().len(), 1);
    assert!(!h.scratch_dir().exists());
    assert!(!h.dir.path().join("2025_feed.db").exists());
}

#[tokio::test]
async fn test_stored_archive_is_resumed() {
    let archive = feed_archive();
    let h = Harness::new()
        .await
        .with_store(MemoryStore::new("gtfs-fp").with_object("2025_feed.zip", archive.clone()));
    h.redirect_to(ARCHIVE_PATH, 1).await;
    h.serve_archive(archive.clone(), 0).await;

    let outcome = h.pipeline().run().await.unwrap();

    assert!(matches!(outcome, IngestOutcome::Published { resumed: true, .. }));
    assert_eq!(h.store.calls_of(StoreOp::Get), vec!["2025_feed.zip".to_string()]);
    assert_eq!(h.store.calls_of(StoreOp::Put), vec!["2025_feed.db".to_string()]);
    assert_eq!(h.store.object("2025_feed.zip").unwrap(), archive);
    assert!(h.store.object("2025_feed.db").is_some());
}

#[tokio::test]
async fn test_existence_check_failure_aborts() {
    let h = Harness::new().await;
    h.store.fail_on(StoreOp::Exists, "2025_feed.db");
    h.redirect_to(ARCHIVE_PATH, 1).await;
    h.serve_archive(feed_archive(), 0).await;

    let err = h.pipeline().run().await.unwrap_err();

    assert!(matches!(err, IngestError::Storage(_)));
    assert_eq!(err.stage(), "storage");
    assert!(h.store.calls_of(StoreOp::Put).is_empty());
}

#[tokio::test]
async fn test_missing_member_fails_after_archive_is_published() {
    let h = Harness::new().await;
    let archive = build_zip(&[
        ("stops.txt", STOPS),
        ("routes.txt", ROUTES),
        ("trips.txt", TRIPS),
    ]);
    h.redirect_to(ARCHIVE_PATH, 1).await;
    h.serve_archive(archive.clone(), 1).await;

    let err = h.pipeline().run().await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::Archive(ArchiveError::MissingMembers(ref missing))
            if missing == &vec!["stop_times.txt".to_string()]
    ));
    assert_eq!(h.store.object("2025_feed.zip").unwrap(), archive);
    assert!(h.store.object("2025_feed.db").is_none());
    assert!(!h.scratch_dir().exists());
}

#[tokio::test]
async fn test_failed_download_stores_nothing() {
    let h = Harness::new().await;
    h.redirect_to(ARCHIVE_PATH, 1).await;
    Mock::given(method("GET"))
        .and(path(ARCHIVE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.pipeline().run().await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::Archive(ArchiveError::DownloadStatus { status: 503, .. })
    ));
    assert!(h.store.calls_of(StoreOp::Put).is_empty());
}

#[tokio::test]
async fn test_rerun_after_failed_database_upload_resumes() {
    let h = Harness::new().await;
    h.redirect_to(ARCHIVE_PATH, 2).await;
    h.serve_archive(feed_archive(), 1).await;
    h.store.fail_on(StoreOp::Put, "2025_feed.db");

    let err = h.pipeline().run().await.unwrap_err();
    assert!(matches!(err, IngestError::Publish(PublishError::Upload(_))));
    assert!(h.store.object("2025_feed.zip").is_some());
    assert!(!h.scratch_dir().exists());

    h.store.clear_failures();
    h.store.reset_calls();

    let outcome = h.pipeline().run().await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Published { resumed: true, .. }));
    assert!(h.store.object("2025_feed.db").is_some());
    assert_eq!(h.store.calls_of(StoreOp::Put), vec!["2025_feed.db".to_string()]);
}

#[tokio::test]
async fn test_leftover_scratch_and_database_are_replaced() {
    let h = Harness::new().await;
    std::fs::create_dir_all(h.scratch_dir()).unwrap();
    std::fs::write(h.scratch_dir().join("agency.txt"), "stale").unwrap();
    std::fs::write(h.dir.path().join("2025_feed.db"), b"not a database").unwrap();
    h.redirect_to(ARCHIVE_PATH, 1).await;
    h.serve_archive(feed_archive(), 1).await;

    let outcome = h.pipeline().run().await.unwrap();

    assert!(matches!(outcome, IngestOutcome::Published { resumed: false, .. }));
    assert!(!h.scratch_dir().exists());
}

#[tokio::test]
async fn test_scratch_dir_overlapping_output_dir_is_refused() {
    let h = Harness::new().await;
    let work = h.dir.path().join("work");
    std::fs::create_dir_all(&work).unwrap();
    std::fs::write(work.join("precious.txt"), "keep me").unwrap();
    h.redirect_to(ARCHIVE_PATH, 0).await;

    for scratch_dir in [work.clone(), h.dir.path().to_path_buf()] {
        let config = PipelineConfig {
            landing_url: format!("{}{}", h.server.uri(), LANDING_PATH).parse().unwrap(),
            scratch_dir,
            output_dir: work.clone(),
        };

        let Err(err) = IngestPipeline::new(config, h.store.clone()) else {
            panic!("overlapping scratch directory was accepted");
        };
        assert!(matches!(err, IngestError::Config(_)));
    }

    assert_eq!(std::fs::read_to_string(work.join("precious.txt")).unwrap(), "keep me");
    assert!(h.store.calls().is_empty());
}
