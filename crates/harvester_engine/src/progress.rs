use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use harvester_core::UnitOrigin;

use crate::HarvestEvent;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Writes harvest events to the progress log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgressSink;

/// Rough wall-clock estimate: each unit costs the pause plus ~2s of request time.
pub fn estimated_duration(units: usize, pause: Duration) -> Duration {
    (pause + Duration::from_secs(2)).saturating_mul(units as u32)
}

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::RunStarted {
                units,
                queries,
                windows,
                pause,
            } => {
                engine_info!("{}", "=".repeat(70));
                engine_info!("HARVEST: {queries} queries x {windows} windows = {units} units");
                engine_info!("Pause between units: {}s", pause.as_secs());
                engine_info!(
                    "Estimated time: {} minutes",
                    estimated_duration(units, pause).as_secs() / 60
                );
                engine_info!("{}", "=".repeat(70));
            }
            HarvestEvent::StageChanged { index, stage } => {
                engine_trace!("unit {} -> {:?}", index + 1, stage);
            }
            HarvestEvent::UnitMerged(report) => {
                let origin = match report.origin {
                    UnitOrigin::Cache => "cache",
                    UnitOrigin::Network => "net",
                };
                if let Some(reason) = &report.degraded {
                    engine_warn!(
                        "  [{}/{}] {:30} {}: degraded, 0 arts ({reason})",
                        report.position,
                        report.total,
                        report.query,
                        report.window
                    );
                } else if report.received > 0 {
                    engine_info!(
                        "  [{}/{}] {:30} {}: {:3} arts ({} new, {} focus) [{origin}] total {}",
                        report.position,
                        report.total,
                        report.query,
                        report.window,
                        report.received,
                        report.added,
                        report.focus_matches,
                        report.unique_total
                    );
                } else {
                    engine_debug!(
                        "  [{}/{}] {} {}: no articles [{origin}]",
                        report.position,
                        report.total,
                        report.query,
                        report.window
                    );
                }
            }
            HarvestEvent::QueryFinished(summary) => {
                engine_info!(
                    "  >>> {}: {} total, {} new unique",
                    summary.query,
                    summary.received,
                    summary.added
                );
            }
            HarvestEvent::RunFinished(summary) => {
                engine_info!("{}", "=".repeat(70));
                engine_info!("HARVEST COMPLETE");
                engine_info!("  Unique articles: {}", summary.unique_records);
                engine_info!(
                    "  Units: {} from network, {} from cache, {} degraded",
                    summary.from_network,
                    summary.from_cache,
                    summary.degraded
                );
                engine_info!(
                    "  Discarded: {} duplicates, {} without url",
                    summary.duplicates,
                    summary.missing_url
                );
                engine_info!("{}", "=".repeat(70));
            }
        }
    }
}
