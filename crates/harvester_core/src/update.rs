use crate::{Effect, FetchResult, HarvestState, Msg, QuerySummary, UnitOrigin, UnitReport, UnitStage};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not match the unit's current stage are ignored.
pub fn update(mut state: HarvestState, msg: Msg) -> (HarvestState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => {
            if state.units.is_empty() {
                vec![Effect::Consolidate]
            } else if state.stage(0) == Some(UnitStage::Pending) {
                vec![Effect::ResolveUnit { index: 0 }]
            } else {
                Vec::new()
            }
        }
        Msg::CacheHit { index } => enter(&mut state, index, UnitStage::Cached)
            .map(|changed| vec![changed, Effect::LoadCheckpoint { index }])
            .unwrap_or_default(),
        Msg::CacheMiss { index } => enter(&mut state, index, UnitStage::Fetching)
            .map(|changed| vec![changed, Effect::FetchUnit { index }])
            .unwrap_or_default(),
        Msg::UnitResolved { index, result } => match state.stage(index) {
            Some(UnitStage::Cached) => merge_unit(&mut state, index, UnitOrigin::Cache, result),
            Some(UnitStage::Fetching) => {
                merge_unit(&mut state, index, UnitOrigin::Network, result)
            }
            _ => Vec::new(),
        },
    };

    (state, effects)
}

/// Move a pending unit into `stage`. Any other current stage leaves the state untouched.
fn enter(state: &mut HarvestState, index: usize, stage: UnitStage) -> Option<Effect> {
    if state.stage(index) != Some(UnitStage::Pending) {
        return None;
    }
    state.set_stage(index, stage);
    Some(Effect::StageChanged { index, stage })
}

fn merge_unit(
    state: &mut HarvestState,
    index: usize,
    origin: UnitOrigin,
    result: FetchResult,
) -> Vec<Effect> {
    let unit = state.units[index].clone();
    let degraded = result.degraded_reason().map(str::to_owned);
    let articles = result.into_articles();
    let received = articles.len();
    let focus_matches = state.count_focus(&articles);
    let added = state.accumulator.merge(articles, &unit.provenance());

    state.set_stage(index, UnitStage::Merged(origin));
    state.received += received;
    if degraded.is_some() {
        state.degraded += 1;
    }
    state.tally.received += received;
    state.tally.added += added;
    state.tally.focus_matches += focus_matches;

    let total = state.units.len();
    let mut effects = vec![
        Effect::StageChanged {
            index,
            stage: UnitStage::Merged(origin),
        },
        Effect::Report(UnitReport {
            position: index + 1,
            total,
            query: unit.query.clone(),
            window: unit.window.label.clone(),
            origin,
            received,
            added,
            focus_matches,
            degraded,
            unique_total: state.accumulator.len(),
        }),
    ];

    let next = index + 1;
    let query_done = state
        .units
        .get(next)
        .map_or(true, |next_unit| next_unit.query != unit.query);
    if query_done {
        let tally = state.take_tally();
        effects.push(Effect::QueryFinished(QuerySummary {
            query: unit.query,
            received: tally.received,
            added: tally.added,
            focus_matches: tally.focus_matches,
        }));
    }

    if next < total {
        effects.push(Effect::Pause);
        effects.push(Effect::ResolveUnit { index: next });
    } else {
        effects.push(Effect::Consolidate);
    }
    effects
}
