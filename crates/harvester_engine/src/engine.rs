use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_error, engine_info};
use harvester_core::{update, Accumulator, Effect, HarvestState, HarvestSummary, Msg, WorkUnit};

use crate::cache::{CacheError, UnitCache};
use crate::consolidate::{consolidate, ConsolidateError, ConsolidateOptions, ConsolidateSummary};
use crate::fetch::SearchClient;
use crate::progress::ProgressSink;
use crate::HarvestEvent;

/// Run-level failures. Remote problems never show up here.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("checkpoint failure: {0}")]
    Cache(#[from] CacheError),
    #[error("consolidation failure: {0}")]
    Consolidate(#[from] ConsolidateError),
}

#[derive(Debug, Clone)]
pub struct HarvestSettings {
    /// Unconditional wait between units, cached or not.
    pub inter_unit_pause: Duration,
    pub focus_language: Option<String>,
    /// When set, the merged records are consolidated at the end of the run.
    pub consolidate: Option<ConsolidateOptions>,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            inter_unit_pause: Duration::from_secs(10),
            focus_language: None,
            consolidate: None,
        }
    }
}

#[derive(Debug)]
pub struct HarvestOutcome {
    pub summary: HarvestSummary,
    pub accumulator: Accumulator,
    pub consolidated: Option<ConsolidateSummary>,
}

/// Executes the effects of the per-unit state machine: checkpoint lookup, load or
/// fetch-and-store, merge, pace. Each stage is entered before its IO starts.
///
/// Units are processed strictly one at a time.
pub struct Harvester {
    client: Arc<dyn SearchClient>,
    cache: UnitCache,
    sink: Arc<dyn ProgressSink>,
    settings: HarvestSettings,
}

impl Harvester {
    pub fn new(
        client: Arc<dyn SearchClient>,
        cache: UnitCache,
        sink: Arc<dyn ProgressSink>,
        settings: HarvestSettings,
    ) -> Self {
        Self {
            client,
            cache,
            sink,
            settings,
        }
    }

    pub fn cache(&self) -> &UnitCache {
        &self.cache
    }

    pub async fn run(&self, units: Vec<WorkUnit>) -> Result<HarvestOutcome, HarvestError> {
        self.sink.emit(run_started(&units, self.settings.inter_unit_pause));

        let mut state = HarvestState::new(units);
        if let Some(language) = &self.settings.focus_language {
            state = state.with_focus_language(language.clone());
        }

        let mut pending = VecDeque::new();
        let mut state = apply(state, Msg::Start, &mut pending);
        let mut consolidated = None;

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::ResolveUnit { index } => {
                    let msg = match state.unit(index) {
                        Some(unit) if self.cache.has(unit) => Msg::CacheHit { index },
                        Some(_) => Msg::CacheMiss { index },
                        None => continue,
                    };
                    state = apply(state, msg, &mut pending);
                }
                Effect::LoadCheckpoint { index } => {
                    let Some(unit) = state.unit(index).cloned() else {
                        continue;
                    };
                    let result = self.cache.load(&unit).inspect_err(|err| {
                        engine_error!("Halting at unit {unit}: {err}");
                    })?;
                    state = apply(state, Msg::UnitResolved { index, result }, &mut pending);
                }
                Effect::FetchUnit { index } => {
                    let Some(unit) = state.unit(index).cloned() else {
                        continue;
                    };
                    let result = self
                        .cache
                        .fetch_and_store(&unit, self.client.as_ref())
                        .await
                        .inspect_err(|err| {
                            engine_error!("Halting at unit {unit}: {err}");
                        })?;
                    state = apply(state, Msg::UnitResolved { index, result }, &mut pending);
                }
                Effect::StageChanged { index, stage } => {
                    self.sink.emit(HarvestEvent::StageChanged { index, stage })
                }
                Effect::Report(report) => self.sink.emit(HarvestEvent::UnitMerged(report)),
                Effect::QueryFinished(summary) => {
                    self.sink.emit(HarvestEvent::QueryFinished(summary))
                }
                Effect::Pause => tokio::time::sleep(self.settings.inter_unit_pause).await,
                Effect::Consolidate => {
                    let summary = state.summary();
                    self.sink.emit(HarvestEvent::RunFinished(summary));
                    if let Some(options) = &self.settings.consolidate {
                        engine_info!("Consolidating {} records", state.accumulator().len());
                        consolidated = Some(consolidate(state.accumulator().records(), options)?);
                    }
                }
            }
        }

        Ok(HarvestOutcome {
            summary: state.summary(),
            accumulator: state.into_accumulator(),
            consolidated,
        })
    }
}

/// Apply one message and queue the effects it produces, in order.
fn apply(state: HarvestState, msg: Msg, pending: &mut VecDeque<Effect>) -> HarvestState {
    let (next, effects) = update(state, msg);
    pending.extend(effects);
    next
}

fn run_started(units: &[WorkUnit], pause: Duration) -> HarvestEvent {
    let queries: HashSet<&str> = units.iter().map(|u| u.query.as_str()).collect();
    let windows: HashSet<&str> = units.iter().map(|u| u.label()).collect();
    HarvestEvent::RunStarted {
        units: units.len(),
        queries: queries.len(),
        windows: windows.len(),
        pause,
    }
}
