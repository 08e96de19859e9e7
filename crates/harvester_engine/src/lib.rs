//! Harvester engine: fetching, checkpointing, orchestration, and consolidation.
mod cache;
mod consolidate;
mod engine;
mod fetch;
mod filename;
mod persist;
mod progress;
mod types;

pub use cache::{CacheError, UnitCache};
pub use consolidate::{
    audit, build_rows, consolidate, dataset_schema, encode_csv, encode_parquet, parse_seen_date,
    AuditReport, ConsolidateError, ConsolidateOptions, ConsolidateSummary, DatasetRow, FocusAudit,
    COLUMNS,
};
pub use engine::{HarvestError, HarvestOutcome, HarvestSettings, Harvester};
pub use fetch::{FetchSettings, ReqwestSearchClient, SearchClient, DEFAULT_BASE_URL};
pub use filename::checkpoint_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::{estimated_duration, LogProgressSink, ProgressSink};
pub use types::{FailureKind, FetchError, HarvestEvent};
