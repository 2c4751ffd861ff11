use realty_insights::cache::SessionCache;
use realty_insights::listings::PropertyDomain;
use realty_insights::loader::worker::WorkerReply;
use realty_insights::loader::{ConcurrentLoader, ExecutionBackend, ProcessPool};
use realty_insights::source::{CsvDirectorySource, InMemorySource};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::Arc;

const BIN: &str = env!("CARGO_BIN_EXE_realty-insights-api");

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../crates/realty-insights/tests/fixtures")
}

fn worker_reply(source_dir: &Path, domain: &str) -> (ExitStatus, WorkerReply) {
    let output = Command::new(BIN)
        .args(["worker", "--domain", domain])
        .env("LISTINGS_SOURCE_DIR", source_dir)
        .env("LOADER_BACKEND", "tasks")
        .output()
        .expect("spawn worker");
    let reply = serde_json::from_slice(&output.stdout).expect("worker prints one json reply");
    (output.status, reply)
}

#[test]
fn worker_prints_a_loaded_table() {
    let (status, reply) = worker_reply(&fixtures_dir(), "apartments");
    assert!(status.success());

    let table = reply
        .into_result(PropertyDomain::Apartments)
        .expect("apartments load");
    assert_eq!(table.len(), 2);
}

#[test]
fn worker_reports_pipeline_failures_in_its_reply() {
    let empty = tempfile::tempdir().expect("tempdir");
    let (status, reply) = worker_reply(empty.path(), "lands");

    assert!(status.success());
    assert!(!reply.is_loaded());
    let err = reply
        .into_result(PropertyDomain::Lands)
        .expect_err("missing source file");
    assert_eq!(err.domain(), PropertyDomain::Lands);
}

fn process_pool(source_dir: &Path) -> ProcessPool {
    ProcessPool::new(BIN, ["worker"])
        .with_env("LISTINGS_SOURCE_DIR", source_dir)
        .with_env("LOADER_BACKEND", "tasks")
}

#[tokio::test]
async fn process_backend_fills_the_cache() {
    let loader = ConcurrentLoader::new(
        Arc::new(InMemorySource::new()),
        ExecutionBackend::Processes(process_pool(&fixtures_dir())),
    );
    let cache = SessionCache::new();

    let report = cache.reload(&loader).await.expect("all domains load");
    assert!(report.is_complete());
    assert_eq!(
        cache.get(PropertyDomain::Lands).map(|table| table.len()),
        Some(4)
    );
    assert_eq!(
        cache.get(PropertyDomain::Houses).map(|table| table.len()),
        Some(2)
    );
}

#[tokio::test]
async fn task_and_process_backends_cache_identical_tables() {
    let in_process = ConcurrentLoader::new(
        Arc::new(CsvDirectorySource::new(fixtures_dir())),
        ExecutionBackend::Tasks,
    );
    let out_of_process = ConcurrentLoader::new(
        Arc::new(InMemorySource::new()),
        ExecutionBackend::Processes(process_pool(&fixtures_dir())),
    );

    let from_tasks = SessionCache::new();
    let from_processes = SessionCache::new();
    from_tasks.reload(&in_process).await.expect("tasks load");
    from_processes
        .reload(&out_of_process)
        .await
        .expect("processes load");

    for domain in PropertyDomain::ordered() {
        let expected = from_tasks.get(domain).expect("loaded by tasks");
        let actual = from_processes.get(domain).expect("loaded by processes");
        assert_eq!(*expected, *actual, "{domain} differs between backends");
    }
}
