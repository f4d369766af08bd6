//! Integration tests: the default selector over a small simulated batch.

use approx::assert_relative_eq;
use hcp_core::{AnalysisConfig, Error};
use hcp_events::EventBatch;
use hcp_selection::{
    EVENT_MASK, SelectionContext, SelectionStats, Selector, SelectorChain, StepOutcome,
    default_selector,
};

fn tt_events() -> EventBatch {
    EventBatch::from_json_str(
        r#"{
            "event": [1, 2, 3, 4, 5, 6],
            "n_lep": [1, 2, 1, 1, 2, 1],
            "mc_weight": [1.0, 0.5, -1.0, 2.0, 1.0, 1.5],
            "HLT.IsoMu24": [true, true, false, true, false, true],
            "Jet.pt": [[70.0, 40.0], [55.0], [90.0, 30.0], [45.0, 44.0, 20.0], [], [65.0]],
            "Jet.eta": [[0.1, 0.2], [1.0], [0.0, -0.5], [2.0, 1.0, -1.0], [], [0.3]],
            "Jet.phi": [[0.0, 1.0], [2.0], [3.0, -3.0], [0.5, 1.5, 2.5], [], [-1.0]]
        }"#,
    )
    .unwrap()
}

/// Extra step rejecting events without jets.
struct AtLeastOneJet;

impl Selector for AtLeastOneJet {
    fn name(&self) -> &str {
        "at_least_one_jet"
    }
    fn uses(&self) -> Vec<String> {
        vec!["n_jet".into()]
    }
    fn produces(&self) -> Vec<String> {
        Vec::new()
    }
    fn call(
        &self,
        events: &mut EventBatch,
        _ctx: &SelectionContext<'_>,
    ) -> hcp_core::Result<StepOutcome> {
        let mask = events.scalar("n_jet")?.iter().map(|&n| n >= 1.0).collect();
        Ok(StepOutcome::mask("jet", mask))
    }
}

fn chain_with_jet_step() -> SelectorChain {
    let mut chain = default_selector();
    chain.push(Box::new(AtLeastOneJet));
    chain
}

#[test]
fn combined_mask_is_and_of_steps() {
    let cfg = AnalysisConfig::example();
    let ctx = SelectionContext::new(&cfg, cfg.get_dataset("tt_powheg").unwrap());
    let mut stats = SelectionStats::new();
    let out = chain_with_jet_step().run(tt_events(), &ctx, &mut stats).unwrap();

    let r = &out.result;
    assert_eq!(r.step_names(), vec!["trigger", "jet"]);
    assert_eq!(r.main[EVENT_MASK], vec![true, true, false, true, false, true]);
    assert_eq!(r.aux["trigger_IsoMu24"], vec![1.0, 1.0, 0.0, 1.0, 0.0, 1.0]);

    // produced columns
    assert_eq!(out.events.scalar("process_id").unwrap()[..2], [1210.0, 1220.0]);
    assert_eq!(out.events.scalar("n_jet").unwrap(), &[2.0, 1.0, 2.0, 3.0, 0.0, 1.0]);
    assert_eq!(out.events.jagged("category_ids").unwrap().row(0), &[12.0]);
    assert!(out.events.has("Jet.energy"));
    assert!(out.events.has("cutflow.jet1_pt"));
}

#[test]
fn removing_a_step_never_removes_events() {
    let cfg = AnalysisConfig::example();
    let ctx = SelectionContext::new(&cfg, cfg.get_dataset("tt_powheg").unwrap());

    let mut full = SelectionStats::new();
    let with = chain_with_jet_step().run(tt_events(), &ctx, &mut full).unwrap();
    let mut chain = chain_with_jet_step();
    assert!(chain.remove("at_least_one_jet"));
    let mut reduced = SelectionStats::new();
    let without = chain.run(tt_events(), &ctx, &mut reduced).unwrap();

    let a = with.result.event_mask().unwrap();
    let b = without.result.event_mask().unwrap();
    assert!(a.iter().zip(b).all(|(x, y)| !x || *y));
    assert!(reduced.get("num_events_selected") >= full.get("num_events_selected"));
}

#[test]
fn stats_count_events_and_weights() {
    let cfg = AnalysisConfig::example();
    let ctx = SelectionContext::new(&cfg, cfg.get_dataset("tt_powheg").unwrap());
    let mut stats = SelectionStats::new();
    let out = default_selector().run(tt_events(), &ctx, &mut stats).unwrap();

    assert_relative_eq!(stats.get("num_events"), 6.0);
    assert_relative_eq!(stats.get("num_events_selected"), out.result.n_selected() as f64);
    assert_relative_eq!(stats.get("num_events_selected"), 4.0);
    assert_relative_eq!(stats.get("sum_mc_weight"), 5.0);
    assert_relative_eq!(stats.get("sum_mc_weight_selected"), 5.0);
    assert_relative_eq!(stats.get_group("num_events", "process", 1210), 4.0);
    assert_relative_eq!(stats.get_group("num_events", "process", 1220), 2.0);
    assert_relative_eq!(stats.get_group("sum_mc_weight_selected", "process", 1220), 0.5);

    // a second batch accumulates into the same stats
    default_selector().run(tt_events(), &ctx, &mut stats).unwrap();
    assert_relative_eq!(stats.get("num_events"), 12.0);
}

#[test]
fn chunked_run_matches_single_pass() {
    let cfg = AnalysisConfig::example();
    let ctx = SelectionContext::new(&cfg, cfg.get_dataset("tt_powheg").unwrap());
    let chain = default_selector();

    let mut single = SelectionStats::new();
    chain.run(tt_events(), &ctx, &mut single).unwrap();
    let (outputs, chunked) = chain.run_chunked(&tt_events(), &ctx, 4).unwrap();

    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].events.len() + outputs[1].events.len(), 6);
    assert_eq!(chunked, single);
}

#[test]
fn empty_batch_passes_the_selection() {
    let cfg = AnalysisConfig::example();
    let ctx = SelectionContext::new(&cfg, cfg.get_dataset("tt_powheg").unwrap());
    let events = EventBatch::from_json_str(
        r#"{
            "event": [],
            "n_lep": [],
            "mc_weight": [],
            "HLT.IsoMu24": [],
            "Jet.pt": [],
            "Jet.eta": [],
            "Jet.phi": []
        }"#,
    )
    .unwrap();
    let mut stats = SelectionStats::new();
    let out = default_selector().run(events, &ctx, &mut stats).unwrap();

    assert!(out.events.is_empty());
    assert_eq!(out.result.event_mask(), Some(&[][..]));
    assert!(out.events.scalar("process_id").unwrap().is_empty());
    assert_eq!(out.events.jagged("category_ids").unwrap().n_entries(), 0);
    assert_eq!(stats.totals.get("num_events"), Some(&0.0));
    assert_eq!(stats.totals.get("sum_mc_weight"), Some(&0.0));
}

#[test]
fn data_dataset_uses_unit_process() {
    let cfg = AnalysisConfig::example();
    let ctx = SelectionContext::new(&cfg, cfg.get_dataset("data_mu_a").unwrap());
    let mut events = tt_events();
    events.insert("mc_weight", vec![1.0; 6]).unwrap();
    let mut stats = SelectionStats::new();
    let out = default_selector().run(events, &ctx, &mut stats).unwrap();
    assert_eq!(out.events.scalar("process_id").unwrap(), &[1.0; 6]);
    assert_relative_eq!(stats.get_group("num_events", "process", 1), 6.0);
}

#[test]
fn step_failure_aborts_the_batch() {
    let cfg = AnalysisConfig::example();
    let ctx = SelectionContext::new(&cfg, cfg.get_dataset("tt_powheg").unwrap());
    let mut events = tt_events();
    events.insert("n_lep", vec![0.0; 6]).unwrap();
    let mut stats = SelectionStats::new();
    let err = default_selector().run(events, &ctx, &mut stats).unwrap_err();
    assert!(matches!(err, Error::Selection { ref step, .. } if step == "process_ids"));
    assert_eq!(stats, SelectionStats::new());
}
