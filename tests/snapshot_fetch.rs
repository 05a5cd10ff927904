// tests/snapshot_fetch.rs
//
// Snapshot CSV fetchers against local files (no sockets):
// - inclusive [start, end] window filtering
// - comma-decimal tolerance and bad-row dropping
// - Big Mac Brazil filter + month-start forward fill
// - empty-file failure surfaces as an Err, not a panic

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use comparador_indicadores::fetch::snapshot::{BigMacFetcher, SnapshotFetcher, SnapshotSource};
use comparador_indicadores::fetch::SourceFetcher;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn write_file(content: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("tempfile");
    f.write_all(content.as_bytes()).expect("write fixture");
    f
}

#[tokio::test]
async fn snapshot_rows_are_filtered_to_the_inclusive_window() {
    let f = write_file(
        "data,valor\n\
         2023-12-01,770.00\n\
         2024-01-01,777.90\n\
         2024-02-01,\"781,45\"\n\
         2024-03-01,790.10\n\
         2024-04-01,795.00\n",
    );
    let fetcher = SnapshotFetcher::new("cesta", SnapshotSource::Path(f.path().to_path_buf()));

    let obs = fetcher
        .fetch(d(2024, 1, 1), d(2024, 3, 1))
        .await
        .expect("snapshot fetch");

    assert_eq!(obs.len(), 3, "window boundaries are inclusive");
    assert_eq!(obs[0].date, d(2024, 1, 1));
    assert_eq!(obs[1].value, 781.45, "comma-decimal valor normalized");
    assert_eq!(obs[2].date, d(2024, 3, 1));
}

#[tokio::test]
async fn malformed_rows_are_dropped_not_fatal() {
    let f = write_file(
        "data,valor\n\
         2024-01-01,5.89\n\
         oops,9.99\n\
         2024-02-01,not-a-number\n\
         2024-03-01,6.05\n",
    );
    let fetcher = SnapshotFetcher::new("gasolina", SnapshotSource::Path(f.path().to_path_buf()));

    let obs = fetcher
        .fetch(d(2024, 1, 1), d(2024, 12, 31))
        .await
        .expect("snapshot fetch");

    assert_eq!(obs.len(), 2);
    assert_eq!(obs[0].value, 5.89);
    assert_eq!(obs[1].value, 6.05);
}

#[tokio::test]
async fn bigmac_fills_the_missing_middle_month_with_the_prior_value() {
    let f = write_file(
        "date,iso_a3,currency_code,local_price\n\
         2024-01-01,BRA,BRL,24.90\n\
         2024-01-01,USA,USD,5.69\n\
         2024-03-01,BRA,BRL,25.90\n",
    );
    let fetcher = BigMacFetcher::new(SnapshotSource::Path(f.path().to_path_buf()));

    let obs = fetcher
        .fetch(d(2024, 1, 1), d(2024, 3, 31))
        .await
        .expect("bigmac fetch");

    assert_eq!(obs.len(), 3);
    assert_eq!(obs[0].date, d(2024, 1, 1));
    assert_eq!(obs[0].value, 24.90);
    assert_eq!(obs[1].date, d(2024, 2, 1));
    assert_eq!(obs[1].value, 24.90, "gap month carries January forward");
    assert_eq!(obs[2].date, d(2024, 3, 1));
    assert_eq!(obs[2].value, 25.90);
}

#[tokio::test]
async fn empty_snapshot_is_an_error_for_the_processor_to_absorb() {
    let f = write_file("   \n");
    let fetcher = SnapshotFetcher::new("fipezap", SnapshotSource::Path(f.path().to_path_buf()));
    assert!(fetcher.fetch(d(2024, 1, 1), d(2024, 12, 31)).await.is_err());
}

#[tokio::test]
async fn missing_snapshot_file_is_an_error() {
    let fetcher = SnapshotFetcher::new(
        "energia",
        SnapshotSource::Path(PathBuf::from("/nonexistent/energia.csv")),
    );
    assert!(fetcher.fetch(d(2024, 1, 1), d(2024, 12, 31)).await.is_err());
}
