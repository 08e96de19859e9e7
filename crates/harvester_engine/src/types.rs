use std::fmt;
use std::time::Duration;

use harvester_core::{HarvestSummary, QuerySummary, UnitReport, UnitStage};

/// Classification of a single failed attempt against the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    RateLimited,
    MalformedBody,
    HttpStatus(u16),
    Timeout,
    Network,
    RetriesExhausted { attempts: u32 },
}

impl FailureKind {
    /// Transient failures are retried; everything else ends the unit.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::RateLimited
                | FailureKind::MalformedBody
                | FailureKind::Timeout
                | FailureKind::Network
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::RateLimited => write!(f, "rate limited (429)"),
            FailureKind::MalformedBody => write!(f, "malformed response body"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::RetriesExhausted { attempts } => {
                write!(f, "retries exhausted after {attempts} attempts")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Structured progress published by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    RunStarted {
        units: usize,
        queries: usize,
        windows: usize,
        pause: Duration,
    },
    /// Published before the load or fetch of a unit starts, and again once it is merged.
    StageChanged { index: usize, stage: UnitStage },
    UnitMerged(UnitReport),
    QueryFinished(QuerySummary),
    RunFinished(HarvestSummary),
}
