use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::Provenance;

/// Errors raised while building the work plan. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("query list is empty")]
    EmptyQueries,
    #[error("query at position {index} is blank")]
    BlankQuery { index: usize },
    #[error("query {0:?} is listed more than once")]
    DuplicateQuery(String),
    #[error("epoch start {epoch} is after the planning boundary {now}")]
    EpochAfterNow {
        epoch: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error("calendar year {0} is out of range")]
    OutOfRange(i32),
}

/// One calendar quarter, possibly clipped at either end.
///
/// Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A single (query, window) pair. Units are immutable once planned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkUnit {
    pub query: String,
    pub window: TimeWindow,
}

impl WorkUnit {
    pub fn label(&self) -> &str {
        &self.window.label
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            query: self.query.clone(),
            window: self.window.label.clone(),
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.query, self.window.label)
    }
}

/// Calendar quarter (1..=4) of a month (1..=12).
pub fn quarter_of(month: u32) -> u32 {
    (month.clamp(1, 12) - 1) / 3 + 1
}

fn quarter_bounds(year: i32, quarter: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), PlanError> {
    let start = quarter_start(year, quarter).ok_or(PlanError::OutOfRange(year))?;
    let next = if quarter == 4 {
        quarter_start(year + 1, 1)
    } else {
        quarter_start(year, quarter + 1)
    }
    .ok_or(PlanError::OutOfRange(year + 1))?;
    Ok((start, next - Duration::seconds(1)))
}

fn quarter_start(year: i32, quarter: u32) -> Option<DateTime<Utc>> {
    let month = (quarter - 1) * 3 + 1;
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

/// Contiguous quarterly windows from `epoch_start` through the quarter containing `now`.
///
/// The first window starts at `epoch_start` and the last one is clipped to end at `now`.
pub fn quarterly_windows(
    epoch_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<TimeWindow>, PlanError> {
    if epoch_start > now {
        return Err(PlanError::EpochAfterNow {
            epoch: epoch_start,
            now,
        });
    }

    let mut windows = Vec::new();
    let mut year = epoch_start.year();
    let mut quarter = quarter_of(epoch_start.month());
    loop {
        let (q_start, q_end) = quarter_bounds(year, quarter)?;
        let start = q_start.max(epoch_start);
        if start > now {
            break;
        }
        windows.push(TimeWindow {
            label: format!("{year}Q{quarter}"),
            start,
            end: q_end.min(now),
        });
        if quarter == 4 {
            year += 1;
            quarter = 1;
        } else {
            quarter += 1;
        }
    }
    Ok(windows)
}

/// Build the ordered work plan: queries outer, windows inner.
pub fn plan<S: AsRef<str>>(
    queries: &[S],
    epoch_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<WorkUnit>, PlanError> {
    if queries.is_empty() {
        return Err(PlanError::EmptyQueries);
    }
    let mut seen = HashSet::new();
    for (index, query) in queries.iter().enumerate() {
        let query = query.as_ref();
        if query.trim().is_empty() {
            return Err(PlanError::BlankQuery { index });
        }
        if !seen.insert(query) {
            return Err(PlanError::DuplicateQuery(query.to_string()));
        }
    }

    let windows = quarterly_windows(epoch_start, now)?;
    let units = queries
        .iter()
        .flat_map(|query| {
            windows.iter().map(move |window| WorkUnit {
                query: query.as_ref().to_string(),
                window: window.clone(),
            })
        })
        .collect();
    Ok(units)
}
