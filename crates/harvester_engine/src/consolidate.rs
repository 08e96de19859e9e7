//! Post-harvest consolidation: calendar enrichment, dataset encodings, audit counts.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use arrow_array::{ArrayRef, Date32Array, Int32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use chrono::{Datelike, NaiveDate};
use engine_logging::engine_info;
use harvester_core::{quarter_of, ArticleRecord};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::persist::{AtomicFileWriter, PersistError};

/// Column order shared by both encodings.
pub const COLUMNS: [&str; 14] = [
    "url",
    "url_mobile",
    "title",
    "seendate",
    "socialimage",
    "domain",
    "language",
    "sourcecountry",
    "query",
    "window",
    "date",
    "year",
    "month",
    "quarter",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, thiserror::Error)]
pub enum ConsolidateError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    pub output_dir: PathBuf,
    /// Output files are `{file_stem}.parquet` and `{file_stem}.csv`.
    pub file_stem: String,
    pub focus_language: Option<String>,
}

/// One consolidated row: the record as delivered plus provenance and calendar fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub url: String,
    pub url_mobile: Option<String>,
    pub title: Option<String>,
    pub seendate: Option<String>,
    pub socialimage: Option<String>,
    pub domain: Option<String>,
    pub language: Option<String>,
    pub sourcecountry: Option<String>,
    pub query: String,
    pub window: String,
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub quarter: Option<u32>,
}

impl DatasetRow {
    pub fn from_record(record: &ArticleRecord) -> Self {
        let article = &record.article;
        let date = article.seendate.as_deref().and_then(parse_seen_date);
        Self {
            url: record.url.clone(),
            url_mobile: article.url_mobile.clone(),
            title: article.title.clone(),
            seendate: article.seendate.clone(),
            socialimage: article.socialimage.clone(),
            domain: article.domain.clone(),
            language: article.language.clone(),
            sourcecountry: article.sourcecountry.clone(),
            query: record.provenance.query.clone(),
            window: record.provenance.window.clone(),
            date,
            year: date.map(|d| d.year()),
            month: date.map(|d| d.month()),
            quarter: date.map(|d| quarter_of(d.month())),
        }
    }

    /// Text cells in [`COLUMNS`] order; missing values are empty.
    pub fn to_cells(&self) -> Vec<String> {
        let opt = |value: &Option<String>| value.clone().unwrap_or_default();
        let num = |value: Option<String>| value.unwrap_or_default();
        vec![
            self.url.clone(),
            opt(&self.url_mobile),
            opt(&self.title),
            opt(&self.seendate),
            opt(&self.socialimage),
            opt(&self.domain),
            opt(&self.language),
            opt(&self.sourcecountry),
            self.query.clone(),
            self.window.clone(),
            num(self.date.map(|d| d.format("%Y-%m-%d").to_string())),
            num(self.year.map(|v| v.to_string())),
            num(self.month.map(|v| v.to_string())),
            num(self.quarter.map(|v| v.to_string())),
        ]
    }
}

/// Parse the date part (`YYYYMMDD`) of a `seendate` such as `20240115T123000Z`.
pub fn parse_seen_date(seendate: &str) -> Option<NaiveDate> {
    let day = seendate.get(..8)?;
    NaiveDate::parse_from_str(day, "%Y%m%d").ok()
}

/// Rows in insertion order.
pub fn build_rows(records: &[ArticleRecord]) -> Vec<DatasetRow> {
    records.iter().map(DatasetRow::from_record).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusAudit {
    pub language: String,
    pub records: usize,
    pub by_domain: Vec<(String, usize)>,
    pub by_year: Vec<(i32, usize)>,
}

/// Logged aggregates over the consolidated rows. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub rows: usize,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub by_language: Vec<(String, usize)>,
    pub by_domain: Vec<(String, usize)>,
    pub by_year: Vec<(i32, usize)>,
    pub by_query: Vec<(String, usize)>,
    pub focus: Option<FocusAudit>,
}

pub fn audit(rows: &[DatasetRow], focus_language: Option<&str>) -> AuditReport {
    let dates = rows.iter().filter_map(|r| r.date);
    let date_range = dates
        .clone()
        .min()
        .zip(dates.max());

    let focus = focus_language.map(|language| {
        let subset: Vec<&DatasetRow> = rows
            .iter()
            .filter(|r| r.language.as_deref() == Some(language))
            .collect();
        FocusAudit {
            language: language.to_string(),
            records: subset.len(),
            by_domain: top_counts(subset.iter().filter_map(|r| r.domain.as_deref()), 15),
            by_year: year_counts(subset.iter().copied()),
        }
    });

    AuditReport {
        rows: rows.len(),
        date_range,
        by_language: top_counts(rows.iter().filter_map(|r| r.language.as_deref()), 10),
        by_domain: top_counts(rows.iter().filter_map(|r| r.domain.as_deref()), 20),
        by_year: year_counts(rows.iter()),
        by_query: top_counts(rows.iter().map(|r| r.query.as_str()), 20),
        focus,
    }
}

/// Counts sorted by frequency, ties broken alphabetically, truncated to `limit`.
fn top_counts<'a>(values: impl Iterator<Item = &'a str>, limit: usize) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(limit);
    sorted
}

fn year_counts<'a>(rows: impl Iterator<Item = &'a DatasetRow>) -> Vec<(i32, usize)> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in rows.filter_map(|r| r.year) {
        *counts.entry(year).or_default() += 1;
    }
    counts.into_iter().collect()
}

fn log_audit(report: &AuditReport) {
    if let Some((min, max)) = report.date_range {
        engine_info!("Date range: {min} -> {max}");
    }
    engine_info!("Languages:");
    for (language, count) in &report.by_language {
        engine_info!("  {language:30} {count}");
    }
    engine_info!("Top sources:");
    for (domain, count) in &report.by_domain {
        engine_info!("  {domain:30} {count}");
    }
    engine_info!("Articles per year:");
    for (year, count) in &report.by_year {
        engine_info!("  {year} {count}");
    }
    engine_info!("Articles per query:");
    for (query, count) in &report.by_query {
        engine_info!("  {query:30} {count}");
    }
    if let Some(focus) = &report.focus {
        engine_info!("--- {} articles only: {} ---", focus.language, focus.records);
        for (domain, count) in &focus.by_domain {
            engine_info!("  {domain:30} {count}");
        }
        for (year, count) in &focus.by_year {
            engine_info!("  {year} {count}");
        }
    }
}

/// CSV encoding (UTF-8 with BOM, header row).
pub fn encode_csv(rows: &[DatasetRow]) -> Result<Vec<u8>, ConsolidateError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row.to_cells())?;
    }
    writer.into_inner().map_err(|err| ConsolidateError::Io(err.into_error()))
}

pub fn dataset_schema() -> Schema {
    Schema::new(vec![
        Field::new("url", DataType::Utf8, false),
        Field::new("url_mobile", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("seendate", DataType::Utf8, true),
        Field::new("socialimage", DataType::Utf8, true),
        Field::new("domain", DataType::Utf8, true),
        Field::new("language", DataType::Utf8, true),
        Field::new("sourcecountry", DataType::Utf8, true),
        Field::new("query", DataType::Utf8, false),
        Field::new("window", DataType::Utf8, false),
        Field::new("date", DataType::Date32, true),
        Field::new("year", DataType::Int32, true),
        Field::new("month", DataType::Int32, true),
        Field::new("quarter", DataType::Int32, true),
    ])
}

fn utf8_column<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(StringArray::from(values.collect::<Vec<_>>()))
}

fn int_column(values: impl Iterator<Item = Option<i32>>) -> ArrayRef {
    Arc::new(Int32Array::from(values.collect::<Vec<_>>()))
}

/// Parquet encoding, one snappy-compressed row group.
pub fn encode_parquet(rows: &[DatasetRow]) -> Result<Vec<u8>, ConsolidateError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let dates = Date32Array::from(
        rows.iter()
            .map(|r| r.date.map(|d| (d - epoch).num_days() as i32))
            .collect::<Vec<_>>(),
    );

    let columns: Vec<ArrayRef> = vec![
        utf8_column(rows.iter().map(|r| Some(r.url.as_str()))),
        utf8_column(rows.iter().map(|r| r.url_mobile.as_deref())),
        utf8_column(rows.iter().map(|r| r.title.as_deref())),
        utf8_column(rows.iter().map(|r| r.seendate.as_deref())),
        utf8_column(rows.iter().map(|r| r.socialimage.as_deref())),
        utf8_column(rows.iter().map(|r| r.domain.as_deref())),
        utf8_column(rows.iter().map(|r| r.language.as_deref())),
        utf8_column(rows.iter().map(|r| r.sourcecountry.as_deref())),
        utf8_column(rows.iter().map(|r| Some(r.query.as_str()))),
        utf8_column(rows.iter().map(|r| Some(r.window.as_str()))),
        Arc::new(dates),
        int_column(rows.iter().map(|r| r.year)),
        int_column(rows.iter().map(|r| r.month.map(|m| m as i32))),
        int_column(rows.iter().map(|r| r.quarter.map(|q| q as i32))),
    ];
    let schema = Arc::new(dataset_schema());
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props))?;
    writer.write(&batch)?;
    Ok(writer.into_inner()?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidateSummary {
    pub rows: usize,
    pub parquet_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
    pub audit: AuditReport,
}

/// Enrich, write both encodings, and log the audit. Deterministic for a given input.
pub fn consolidate(
    records: &[ArticleRecord],
    options: &ConsolidateOptions,
) -> Result<ConsolidateSummary, ConsolidateError> {
    let rows = build_rows(records);
    if rows.is_empty() {
        engine_info!("No records to write.");
        return Ok(ConsolidateSummary {
            rows: 0,
            parquet_path: None,
            csv_path: None,
            audit: AuditReport::default(),
        });
    }

    let writer = AtomicFileWriter::new(options.output_dir.clone());
    let parquet_path = writer.write_bytes(
        &format!("{}.parquet", options.file_stem),
        &encode_parquet(&rows)?,
    )?;
    engine_info!("Saved: {:?}", parquet_path);
    let csv_path = writer.write_bytes(&format!("{}.csv", options.file_stem), &encode_csv(&rows)?)?;
    engine_info!("Saved: {:?}", csv_path);
    engine_info!("Columns: {:?}", COLUMNS);

    let report = audit(&rows, options.focus_language.as_deref());
    log_audit(&report);

    Ok(ConsolidateSummary {
        rows: rows.len(),
        parquet_path: Some(parquet_path),
        csv_path: Some(csv_path),
        audit: report,
    })
}
