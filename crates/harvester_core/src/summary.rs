use crate::{HarvestState, UnitOrigin, UnitStage};

/// End-of-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub units: usize,
    pub pending: usize,
    pub from_cache: usize,
    pub from_network: usize,
    pub degraded: usize,
    pub received: usize,
    pub unique_records: usize,
    pub duplicates: usize,
    pub missing_url: usize,
}

impl HarvestState {
    pub fn summary(&self) -> HarvestSummary {
        let mut summary = HarvestSummary {
            units: self.units.len(),
            degraded: self.degraded,
            received: self.received,
            unique_records: self.accumulator.len(),
            duplicates: self.accumulator.duplicates(),
            missing_url: self.accumulator.missing_url(),
            ..HarvestSummary::default()
        };
        for stage in &self.stages {
            match stage {
                UnitStage::Merged(UnitOrigin::Cache) => summary.from_cache += 1,
                UnitStage::Merged(UnitOrigin::Network) => summary.from_network += 1,
                UnitStage::Pending | UnitStage::Cached | UnitStage::Fetching => {
                    summary.pending += 1
                }
            }
        }
        summary
    }
}
