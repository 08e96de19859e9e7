use crate::{Accumulator, RawArticle, WorkUnit};

/// Where a unit's result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOrigin {
    Cache,
    Network,
}

/// Per-unit lifecycle: `Pending -> (Cached | Fetching) -> Merged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStage {
    Pending,
    Cached,
    Fetching,
    Merged(UnitOrigin),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct QueryTally {
    pub(crate) received: usize,
    pub(crate) added: usize,
    pub(crate) focus_matches: usize,
}

/// Harvest state for one run: the plan, each unit's stage, and the accumulated records.
#[derive(Debug, Clone)]
pub struct HarvestState {
    pub(crate) units: Vec<WorkUnit>,
    pub(crate) stages: Vec<UnitStage>,
    pub(crate) accumulator: Accumulator,
    pub(crate) focus_language: Option<String>,
    pub(crate) tally: QueryTally,
    pub(crate) received: usize,
    pub(crate) degraded: usize,
}

impl HarvestState {
    pub fn new(units: Vec<WorkUnit>) -> Self {
        let stages = vec![UnitStage::Pending; units.len()];
        Self {
            units,
            stages,
            accumulator: Accumulator::new(),
            focus_language: None,
            tally: QueryTally::default(),
            received: 0,
            degraded: 0,
        }
    }

    /// Count records in this language separately in progress reports.
    pub fn with_focus_language(mut self, language: impl Into<String>) -> Self {
        self.focus_language = Some(language.into());
        self
    }

    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    pub fn unit(&self, index: usize) -> Option<&WorkUnit> {
        self.units.get(index)
    }

    pub fn stage(&self, index: usize) -> Option<UnitStage> {
        self.stages.get(index).copied()
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn into_accumulator(self) -> Accumulator {
        self.accumulator
    }

    pub fn is_finished(&self) -> bool {
        self.stages
            .iter()
            .all(|stage| matches!(stage, UnitStage::Merged(_)))
    }

    pub(crate) fn set_stage(&mut self, index: usize, stage: UnitStage) {
        if let Some(slot) = self.stages.get_mut(index) {
            *slot = stage;
        }
    }

    pub(crate) fn count_focus(&self, articles: &[RawArticle]) -> usize {
        match self.focus_language.as_deref() {
            Some(language) => articles
                .iter()
                .filter(|article| article.language.as_deref() == Some(language))
                .count(),
            None => 0,
        }
    }

    pub(crate) fn take_tally(&mut self) -> QueryTally {
        std::mem::take(&mut self.tally)
    }
}
