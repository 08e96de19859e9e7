use chrono::{TimeZone, Utc};
use harvester_core::{
    plan, update, Effect, FetchResult, HarvestState, Msg, RawArticle, UnitOrigin, UnitStage,
};

fn state() -> HarvestState {
    let units = plan(
        &["flood peru", "frost peru"],
        Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2017, 5, 1, 0, 0, 0).unwrap(),
    )
    .unwrap();
    HarvestState::new(units).with_focus_language("Spanish")
}

fn article(url: &str, language: &str) -> RawArticle {
    RawArticle {
        url: Some(url.to_string()),
        language: Some(language.to_string()),
        ..RawArticle::default()
    }
}

#[test]
fn start_resolves_first_unit() {
    let (state, effects) = update(state(), Msg::Start);
    assert_eq!(effects, vec![Effect::ResolveUnit { index: 0 }]);
    assert_eq!(state.stage(0), Some(UnitStage::Pending));
}

#[test]
fn fetched_unit_is_merged_reported_and_paced() {
    let (state, _) = update(state(), Msg::Start);
    let (state, effects) = update(state, Msg::CacheMiss { index: 0 });
    assert_eq!(
        effects,
        vec![
            Effect::StageChanged {
                index: 0,
                stage: UnitStage::Fetching
            },
            Effect::FetchUnit { index: 0 },
        ]
    );
    assert_eq!(state.stage(0), Some(UnitStage::Fetching));

    let result = FetchResult::complete(vec![
        article("https://x/a", "Spanish"),
        article("https://x/b", "English"),
    ]);
    let (state, effects) = update(state, Msg::UnitResolved { index: 0, result });

    assert_eq!(state.stage(0), Some(UnitStage::Merged(UnitOrigin::Network)));
    assert_eq!(effects.len(), 4);
    assert_eq!(
        effects[0],
        Effect::StageChanged {
            index: 0,
            stage: UnitStage::Merged(UnitOrigin::Network)
        }
    );
    match &effects[1] {
        Effect::Report(report) => {
            assert_eq!(report.position, 1);
            assert_eq!(report.total, 4);
            assert_eq!(report.window, "2017Q1");
            assert_eq!(report.received, 2);
            assert_eq!(report.added, 2);
            assert_eq!(report.focus_matches, 1);
            assert_eq!(report.unique_total, 2);
            assert_eq!(report.degraded, None);
        }
        other => panic!("expected report, got {other:?}"),
    }
    assert_eq!(effects[2], Effect::Pause);
    assert_eq!(effects[3], Effect::ResolveUnit { index: 1 });
}

#[test]
fn cached_unit_passes_through_cached_stage_and_still_pauses() {
    let (state, _) = update(state(), Msg::Start);
    let (state, effects) = update(state, Msg::CacheHit { index: 0 });
    assert_eq!(state.stage(0), Some(UnitStage::Cached));
    assert_eq!(effects[1], Effect::LoadCheckpoint { index: 0 });

    let (state, effects) = update(
        state,
        Msg::UnitResolved {
            index: 0,
            result: FetchResult::complete(Vec::new()),
        },
    );
    assert_eq!(state.stage(0), Some(UnitStage::Merged(UnitOrigin::Cache)));
    assert!(effects.contains(&Effect::Pause));
}

#[test]
fn stage_entry_only_happens_from_pending() {
    let (state, _) = update(state(), Msg::Start);
    let (state, _) = update(state, Msg::CacheMiss { index: 0 });

    // A late cache answer for a unit already being fetched changes nothing.
    let (state, effects) = update(state, Msg::CacheHit { index: 0 });
    assert!(effects.is_empty());
    assert_eq!(state.stage(0), Some(UnitStage::Fetching));

    let (state, effects) = update(state, Msg::CacheMiss { index: 9 });
    assert!(effects.is_empty());
    assert_eq!(state.summary().pending, 4);
}

#[test]
fn result_for_pending_unit_is_ignored() {
    let (state, effects) = update(
        state(),
        Msg::UnitResolved {
            index: 0,
            result: FetchResult::complete(vec![article("https://x/a", "Spanish")]),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.stage(0), Some(UnitStage::Pending));
    assert!(state.accumulator().is_empty());
}

#[test]
fn full_run_emits_query_summaries_and_consolidates_last() {
    let mut state = state();
    let mut effects;
    (state, effects) = update(state, Msg::Start);
    let mut all = Vec::new();

    while let Some(Effect::ResolveUnit { index }) = effects
        .iter()
        .find(|e| matches!(e, Effect::ResolveUnit { .. }))
        .cloned()
    {
        (state, effects) = update(state, Msg::CacheMiss { index });
        assert!(effects.contains(&Effect::FetchUnit { index }));
        let result = if index == 2 {
            FetchResult::degraded("http status 500")
        } else {
            FetchResult::complete(vec![article("https://x/shared", "Spanish")])
        };
        (state, effects) = update(state, Msg::UnitResolved { index, result });
        all.extend(effects.clone());
    }

    assert!(state.is_finished());
    assert_eq!(all.last(), Some(&Effect::Consolidate));
    let summaries: Vec<_> = all
        .iter()
        .filter_map(|e| match e {
            Effect::QueryFinished(s) => Some((s.query.clone(), s.received, s.added)),
            _ => None,
        })
        .collect();
    assert_eq!(
        summaries,
        vec![
            ("flood peru".to_string(), 2, 1),
            ("frost peru".to_string(), 1, 0),
        ]
    );
    let pauses = all.iter().filter(|e| **e == Effect::Pause).count();
    assert_eq!(pauses, 3);

    let summary = state.summary();
    assert_eq!(summary.units, 4);
    assert_eq!(summary.from_network, 4);
    assert_eq!(summary.degraded, 1);
    assert_eq!(summary.unique_records, 1);
    assert_eq!(summary.duplicates, 2);
    assert_eq!(summary.pending, 0);
}
