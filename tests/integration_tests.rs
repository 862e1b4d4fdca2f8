//! Integration tests for varsieve
//!
//! The HTTP tests serve a temporary data directory seeded from tests/data/.

use axum::http::StatusCode;
use axum_test::TestServer;
use noodles::bgzf;
use noodles::core::Position;
use noodles::csi::binning_index::index::{header, reference_sequence::bin::Chunk};
use noodles::tabix;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use varsieve::{
    FilterOptions, IntervalList, MalformedPolicy, VariantInput,
    filter::filter_input,
    handlers::{AppState, create_router},
    sink::{ResultSink, output_name},
    storage::LocalStorage,
};

const HEADER: &str = "##fileformat=VCFv4.2\n##contig=<ID=chr1>\n##contig=<ID=chr2>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

fn test_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

/// Compress `vcf` with BGZF into `<dir>/<name>.vcf.gz` and write its tabix
/// index as `<dir>/<name>.vcf.gz.tbi`.
fn write_indexed(dir: &Path, name: &str, vcf: &Path) {
    let text = std::fs::read_to_string(vcf).unwrap();
    let file = std::fs::File::create(dir.join(format!("{}.vcf.gz", name))).unwrap();
    let mut writer = bgzf::Writer::new(file);
    let mut indexer = tabix::index::Indexer::default();
    indexer.set_header(header::Builder::vcf().build());

    for line in text.lines() {
        let start = writer.virtual_position();
        writeln!(writer, "{}", line).unwrap();
        let end = writer.virtual_position();
        if line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let pos = Position::try_from(fields[1].parse::<usize>().unwrap()).unwrap();
        indexer
            .add_record(fields[0], pos, pos, Chunk::new(start, end))
            .unwrap();
    }

    writer.finish().unwrap();
    tabix::write(
        dir.join(format!("{}.vcf.gz.tbi", name)),
        &indexer.build(),
    )
    .unwrap();
}

fn seeded_data_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let sample = test_data_dir().join("sample.vcf");
    std::fs::copy(&sample, dir.path().join("sample.vcf")).unwrap();
    write_indexed(dir.path(), "indexed", &sample);
    // Compressed dataset without its index.
    std::fs::write(dir.path().join("orphan.vcf.gz"), b"").unwrap();
    dir
}

fn create_test_server(data_dir: &Path, max_payload: usize) -> TestServer {
    let storage = Arc::new(LocalStorage::new(data_dir.to_path_buf()));
    let state = AppState {
        storage,
        options: FilterOptions {
            region_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        },
        max_payload,
    };
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_service_info() {
    let dir = seeded_data_dir();
    let server = create_test_server(dir.path(), 1024 * 1024);

    let response = server.get("/service-info").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["name"], "varsieve");
    assert_eq!(body["varsieve"]["outputSuffix"], "filtered.vcf");
    assert_eq!(body["varsieve"]["strategies"][0], "plain");
    assert_eq!(body["varsieve"]["regionTimeoutSecs"], 5);
    assert_eq!(body["varsieve"]["queryConcurrency"], 64);
}

#[tokio::test]
async fn test_filter_plain_dataset() {
    let dir = seeded_data_dir();
    let server = create_test_server(dir.path(), 1024 * 1024);

    let response = server
        .post("/filter/sample")
        .text("chr1\t100\t200\tpeak1\nchr2\t100\t300\tpeak2\n")
        .await;
    response.assert_status_ok();

    let disposition = response.header("content-disposition");
    assert_eq!(
        disposition.to_str().unwrap(),
        "attachment; filename=\"sample.vcf.filtered.vcf\""
    );
    assert_eq!(response.header("x-varsieve-emitted").to_str().unwrap(), "3");
    assert_eq!(response.header("x-varsieve-warnings").to_str().unwrap(), "0");

    let expected = format!(
        "{HEADER}chr1\t100\trs2\tC\tT\t.\tPASS\t.\n\
         chr1\t150\trs3\tG\tA\t.\tPASS\t.\n\
         chr2\t150\trs5\tA\tC\t.\tPASS\t.\n"
    );
    assert_eq!(response.text(), expected);
}

#[tokio::test]
async fn test_filter_indexed_dataset_matches_plain() {
    let dir = seeded_data_dir();
    let server = create_test_server(dir.path(), 1024 * 1024);
    let intervals = "chr1\t100\t200\tpeak1\nchr2\t100\t300\tpeak2\nchr7\t1\t10\n";

    let indexed = server.post("/filter/indexed").text(intervals).await;
    indexed.assert_status_ok();
    assert_eq!(
        indexed.header("content-disposition").to_str().unwrap(),
        "attachment; filename=\"indexed.vcf.gz.filtered.vcf\""
    );
    assert_eq!(indexed.header("x-varsieve-emitted").to_str().unwrap(), "3");

    let plain = server.post("/filter/sample").text(intervals).await;
    plain.assert_status_ok();
    assert_eq!(indexed.text(), plain.text());
}

#[tokio::test]
async fn test_filter_empty_interval_list_returns_headers() {
    let dir = seeded_data_dir();
    let server = create_test_server(dir.path(), 1024 * 1024);

    let response = server.post("/filter/sample").text("").await;
    response.assert_status_ok();
    assert_eq!(response.text(), HEADER);
}

#[tokio::test]
async fn test_filter_malformed_interval_skip_and_halt() {
    let dir = seeded_data_dir();
    let server = create_test_server(dir.path(), 1024 * 1024);
    let intervals = "chr1\t100\t200\nchr1\t300\nchr2\t100\t300\n";

    let response = server.post("/filter/sample").text(intervals).await;
    response.assert_status_ok();
    assert_eq!(response.header("x-varsieve-warnings").to_str().unwrap(), "1");
    assert_eq!(response.header("x-varsieve-emitted").to_str().unwrap(), "3");

    let response = server
        .post("/filter/sample")
        .add_query_param("on_malformed", "halt")
        .text(intervals)
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["varsieve"]["error"], "MalformedInterval");
}

#[tokio::test]
async fn test_filter_unsorted_intervals_rejected_when_checked() {
    let dir = seeded_data_dir();
    let server = create_test_server(dir.path(), 1024 * 1024);

    let response = server
        .post("/filter/sample")
        .add_query_param("check_sorted", "true")
        .text("chr2\t100\t300\nchr1\t100\t200\n")
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["varsieve"]["error"], "Unsorted");
}

#[tokio::test]
async fn test_filter_dataset_not_found() {
    let dir = seeded_data_dir();
    let server = create_test_server(dir.path(), 1024 * 1024);

    let response = server.post("/filter/nonexistent").text("1\t1\t2\n").await;
    response.assert_status_not_found();

    let body: Value = response.json();
    assert_eq!(body["varsieve"]["error"], "NotFound");
}

#[tokio::test]
async fn test_filter_compressed_without_index() {
    let dir = seeded_data_dir();
    let server = create_test_server(dir.path(), 1024 * 1024);

    let response = server.post("/filter/orphan").text("1\t1\t2\n").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["varsieve"]["error"], "InvalidSelection");
}

#[tokio::test]
async fn test_filter_output_too_large() {
    let dir = seeded_data_dir();
    // Enough for the request body, not for the headers plus records.
    let server = create_test_server(dir.path(), 128);

    let response = server.post("/filter/sample").text("chr1\t1\t1000\n").await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = response.json();
    assert_eq!(body["varsieve"]["error"], "FileTooLarge");
}

#[tokio::test]
async fn test_filter_input_writes_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let intervals_path = dir.path().join("last.bed");
    std::fs::write(&intervals_path, "chr1\t140\t160\nchrX\t900\t1100\n").unwrap();

    let input = VariantInput::from_selection(&[test_data_dir().join("sample.vcf")]).unwrap();
    let intervals = IntervalList::load(intervals_path.to_str().unwrap(), None)
        .await
        .unwrap();

    let output_path = dir.path().join(output_name(&input.display_name()));
    let sink = ResultSink::new(std::fs::File::create(&output_path).unwrap());
    let options = FilterOptions {
        on_malformed: MalformedPolicy::Halt,
        check_sorted: true,
        ..Default::default()
    };
    let (report, sink) = filter_input(&input, Arc::new(intervals), &options, None, sink)
        .await
        .unwrap();
    sink.finish().unwrap();

    assert_eq!(report.headers, 4);
    assert_eq!(report.emitted, 2);
    assert!(report.warnings.is_empty());

    let written = std::fs::read_to_string(&output_path).unwrap();
    assert_eq!(
        written,
        format!(
            "{HEADER}chr1\t150\trs3\tG\tA\t.\tPASS\t.\n\
             chrX\t1000\trs7\tC\tG\t.\tPASS\t.\n"
        )
    );
    assert!(output_path.ends_with("sample.vcf.filtered.vcf"));
}

#[tokio::test]
async fn test_filtered_output_is_stable_under_refiltering() {
    let dir = tempfile::tempdir().unwrap();
    let intervals = Arc::new(IntervalList::parse("chr1\t100\t151\nchr2\t0\t1000\n"));

    let first_path = dir.path().join("first.vcf");
    let input = VariantInput::from_selection(&[test_data_dir().join("sample.vcf")]).unwrap();
    let sink = ResultSink::new(std::fs::File::create(&first_path).unwrap());
    let (_, sink) = filter_input(&input, intervals.clone(), &FilterOptions::default(), None, sink)
        .await
        .unwrap();
    sink.finish().unwrap();

    let input = VariantInput::from_selection(&[first_path.clone()]).unwrap();
    let (_, sink) = filter_input(
        &input,
        intervals,
        &FilterOptions::default(),
        None,
        ResultSink::new(Vec::new()),
    )
    .await
    .unwrap();

    let second = String::from_utf8(sink.finish().unwrap()).unwrap();
    assert_eq!(second, std::fs::read_to_string(&first_path).unwrap());
}
