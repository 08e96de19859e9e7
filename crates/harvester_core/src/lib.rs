//! Harvester core: work planning, deduplication, and the pure per-unit state machine.
mod accumulator;
mod article;
mod effect;
mod msg;
mod plan;
mod state;
mod summary;
mod update;

pub use accumulator::Accumulator;
pub use article::{ArticleRecord, FetchResult, Provenance, RawArticle};
pub use effect::{Effect, QuerySummary, UnitReport};
pub use msg::Msg;
pub use plan::{plan, quarter_of, quarterly_windows, PlanError, TimeWindow, WorkUnit};
pub use state::{HarvestState, UnitOrigin, UnitStage};
pub use summary::HarvestSummary;
pub use update::update;
