use crate::{UnitOrigin, UnitStage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Check the checkpoint store for the unit and answer with `CacheHit` or `CacheMiss`.
    ResolveUnit { index: usize },
    /// Read the unit's stored result.
    LoadCheckpoint { index: usize },
    /// Fetch the unit and store the result before it is merged.
    FetchUnit { index: usize },
    /// The unit entered a new stage.
    StageChanged { index: usize, stage: UnitStage },
    /// Emit a progress line for a merged unit.
    Report(UnitReport),
    /// The last window of a query was merged.
    QueryFinished(QuerySummary),
    /// Wait the fixed inter-unit pause.
    Pause,
    /// All units merged; hand the records to the consolidator.
    Consolidate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    /// 1-based position in the plan.
    pub position: usize,
    pub total: usize,
    pub query: String,
    pub window: String,
    pub origin: UnitOrigin,
    pub received: usize,
    pub added: usize,
    pub focus_matches: usize,
    pub degraded: Option<String>,
    pub unique_total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySummary {
    pub query: String,
    pub received: usize,
    pub added: usize,
    pub focus_matches: usize,
}
