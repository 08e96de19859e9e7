use std::fs::{self, File};
use std::path::Path;

use arrow_array::cast::AsArray;
use arrow_array::types::{Date32Type, Int32Type};
use arrow_array::Array;
use chrono::NaiveDate;
use harvester_core::{Accumulator, ArticleRecord, Provenance, RawArticle};
use harvester_engine::{
    audit, build_rows, consolidate, ConsolidateOptions, COLUMNS,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn article(url: &str, seendate: &str, language: &str, domain: &str) -> RawArticle {
    RawArticle {
        url: Some(url.to_string()),
        title: Some(format!("Title, with \"quotes\" for {url}")),
        seendate: Some(seendate.to_string()),
        language: Some(language.to_string()),
        domain: Some(domain.to_string()),
        ..RawArticle::default()
    }
}

fn records() -> Vec<ArticleRecord> {
    let mut acc = Accumulator::new();
    acc.merge(
        vec![
            article("https://x/a", "20170214T101500Z", "Spanish", "larepublica.pe"),
            article("https://x/b", "20181101T000000Z", "English", "reuters.com"),
        ],
        &Provenance {
            query: "flood peru".into(),
            window: "2017Q1".into(),
        },
    );
    acc.merge(
        vec![
            article("https://x/c", "garbage", "Spanish", "larepublica.pe"),
            article("https://x/d", "20180705T120000Z", "Spanish", "rpp.pe"),
        ],
        &Provenance {
            query: "frost peru".into(),
            window: "2018Q3".into(),
        },
    );
    acc.into_records()
}

fn options(dir: &Path) -> ConsolidateOptions {
    ConsolidateOptions {
        output_dir: dir.to_path_buf(),
        file_stem: "gdelt_news_20260221".into(),
        focus_language: Some("Spanish".into()),
    }
}

fn csv_rows(path: &Path) -> Vec<Vec<String>> {
    let bytes = fs::read(path).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let mut reader = csv::Reader::from_reader(&bytes[3..]);
    let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_owned).collect();
    assert_eq!(header, COLUMNS.to_vec());
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_owned).collect())
        .collect()
}

fn parquet_rows(path: &Path) -> Vec<Vec<String>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.unwrap();
        for row in 0..batch.num_rows() {
            let mut cells = Vec::new();
            for col in 0..10 {
                let column = batch.column(col).as_string::<i32>();
                cells.push(if column.is_null(row) {
                    String::new()
                } else {
                    column.value(row).to_string()
                });
            }
            let dates = batch.column(10).as_primitive::<Date32Type>();
            cells.push(
                dates
                    .value_as_date(row)
                    .filter(|_| !dates.is_null(row))
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            );
            for col in 11..14 {
                let column = batch.column(col).as_primitive::<Int32Type>();
                cells.push(if column.is_null(row) {
                    String::new()
                } else {
                    column.value(row).to_string()
                });
            }
            rows.push(cells);
        }
    }
    rows
}

#[test]
fn calendar_fields_are_derived_and_bad_dates_kept_as_null() {
    let rows = build_rows(&records());

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2017, 2, 14));
    assert_eq!(rows[0].year, Some(2017));
    assert_eq!(rows[0].month, Some(2));
    assert_eq!(rows[0].quarter, Some(1));
    assert_eq!(rows[1].quarter, Some(4));

    let bad = &rows[2];
    assert_eq!(bad.url, "https://x/c");
    assert_eq!(bad.date, None);
    assert_eq!(bad.year, None);
    assert_eq!(bad.month, None);
    assert_eq!(bad.quarter, None);
    assert_eq!(bad.query, "frost peru");
    assert_eq!(bad.window, "2018Q3");
}

#[test]
fn both_encodings_hold_identical_rows() {
    let temp = TempDir::new().unwrap();
    let summary = consolidate(&records(), &options(temp.path())).unwrap();

    assert_eq!(summary.rows, 4);
    let csv_path = summary.csv_path.unwrap();
    let parquet_path = summary.parquet_path.unwrap();
    assert_eq!(csv_path.file_name().unwrap(), "gdelt_news_20260221.csv");
    assert_eq!(
        parquet_path.file_name().unwrap(),
        "gdelt_news_20260221.parquet"
    );

    let from_csv = csv_rows(&csv_path);
    let from_parquet = parquet_rows(&parquet_path);
    assert_eq!(from_csv, from_parquet);
    assert_eq!(from_csv[0][0], "https://x/a");
    assert_eq!(from_csv[0][10], "2017-02-14");
    assert_eq!(from_csv[2][10], "");
    assert_eq!(from_csv[3][13], "3");
}

#[test]
fn consolidation_is_idempotent() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let records = records();

    let a = consolidate(&records, &options(first.path())).unwrap();
    let b = consolidate(&records, &options(second.path())).unwrap();
    // Re-running into the same directory replaces the files in place.
    let c = consolidate(&records, &options(first.path())).unwrap();

    let csv_a = fs::read(a.csv_path.as_ref().unwrap()).unwrap();
    assert_eq!(csv_a, fs::read(b.csv_path.as_ref().unwrap()).unwrap());
    assert_eq!(csv_a, fs::read(c.csv_path.as_ref().unwrap()).unwrap());
    assert_eq!(
        parquet_rows(a.parquet_path.as_ref().unwrap()),
        parquet_rows(b.parquet_path.as_ref().unwrap())
    );
    assert_eq!(a.audit, b.audit);
}

#[test]
fn empty_collection_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let summary = consolidate(&[], &options(temp.path())).unwrap();

    assert_eq!(summary.rows, 0);
    assert_eq!(summary.csv_path, None);
    assert_eq!(summary.parquet_path, None);
    assert!(!temp.path().join("gdelt_news_20260221.csv").exists());
}

#[test]
fn audit_counts_languages_domains_years_and_queries() {
    let rows = build_rows(&records());
    let report = audit(&rows, Some("Spanish"));

    assert_eq!(report.rows, 4);
    assert_eq!(
        report.date_range,
        Some((
            NaiveDate::from_ymd_opt(2017, 2, 14).unwrap(),
            NaiveDate::from_ymd_opt(2018, 11, 1).unwrap()
        ))
    );
    assert_eq!(
        report.by_language,
        vec![("Spanish".to_string(), 3), ("English".to_string(), 1)]
    );
    assert_eq!(report.by_domain[0], ("larepublica.pe".to_string(), 2));
    assert_eq!(report.by_year, vec![(2017, 1), (2018, 2)]);
    assert_eq!(
        report.by_query,
        vec![("flood peru".to_string(), 2), ("frost peru".to_string(), 2)]
    );

    let focus = report.focus.unwrap();
    assert_eq!(focus.records, 3);
    assert_eq!(focus.by_year, vec![(2017, 1), (2018, 1)]);
    assert_eq!(
        focus.by_domain,
        vec![("larepublica.pe".to_string(), 2), ("rpp.pe".to_string(), 1)]
    );
}
