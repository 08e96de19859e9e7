use crate::FetchResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin processing the plan from its first unit.
    Start,
    /// A checkpoint exists for the unit; it moves to `Cached` and its result is loaded.
    CacheHit { index: usize },
    /// No checkpoint exists; the unit moves to `Fetching` and a fetch is requested.
    CacheMiss { index: usize },
    /// The unit's result is available and durably stored.
    UnitResolved { index: usize, result: FetchResult },
}
