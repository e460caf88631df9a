use pn_synth::analysis::{ReachabilityConfig, reachability_lts};
use pn_synth::cancel::CancellationToken;
use pn_synth::lts::{Lts, LtsDescription};
use pn_synth::net::io;
use pn_synth::region::RegionUtility;
use pn_synth::separation::{
    PnProperties, Separation, SeparationStrategy, disables_event, separates_states,
};
use pn_synth::solver::SolverConfig;
use pn_synth::synthesize::{SynthesisConfig, SynthesisOutcome, Synthesizer};

fn cycle() -> Lts {
    let mut lts = Lts::new("cycle", "s0");
    let s0 = lts.initial();
    let s1 = lts.add_state("s1");
    let s2 = lts.add_state("s2");
    lts.add_arc(s0, "a", s1);
    lts.add_arc(s1, "b", s2);
    lts.add_arc(s2, "c", s0);
    lts
}

fn mutex() -> Lts {
    let mut lts = Lts::new("mutex", "s0");
    let s0 = lts.initial();
    let s1 = lts.add_state("s1");
    lts.add_arc(s0, "a", s1);
    lts.add_arc(s1, "b", s0);
    lts
}

fn step() -> Lts {
    let mut lts = Lts::new("step", "s0");
    let s1 = lts.add_state("s1");
    lts.add_arc(lts.initial(), "a", s1);
    lts
}

/// Two independent events, interleaved as a diamond.
fn diamond() -> Lts {
    let mut lts = Lts::new("diamond", "s0");
    let s0 = lts.initial();
    let s1 = lts.add_state("s1");
    let s2 = lts.add_state("s2");
    let s3 = lts.add_state("s3");
    lts.add_arc(s0, "a", s1);
    lts.add_arc(s0, "b", s2);
    lts.add_arc(s1, "b", s3);
    lts.add_arc(s2, "a", s3);
    lts
}

fn properties(props: &str) -> PnProperties {
    props.parse().unwrap()
}

fn synthesize(lts: &Lts, props: &str) -> SynthesisOutcome {
    Synthesizer::new(
        lts,
        properties(props),
        SynthesisConfig::default(),
        CancellationToken::new(),
    )
    .synthesize()
    .unwrap()
}

#[test]
fn pure_regions_separate_cycle_states() {
    let lts = cycle();
    let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
    let mut strategy = SeparationStrategy::create(
        &utility,
        &properties("pure"),
        CancellationToken::new(),
        SolverConfig::default(),
    );
    let s0 = lts.initial();
    let s1 = lts.state_by_name("s1").unwrap();

    let region = strategy
        .calculate_separating_region_for_states(s0, s1)
        .unwrap()
        .unwrap();
    assert!(region.is_pure());
    assert!(region.is_valid_for(&utility));
    assert!(separates_states(&utility, &region, s0, s1));
}

#[test]
fn event_is_disabled_after_its_only_occurrence() {
    let lts = step();
    let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
    let mut strategy = SeparationStrategy::create(
        &utility,
        &PnProperties::new(),
        CancellationToken::new(),
        SolverConfig::default(),
    );
    let s1 = lts.state_by_name("s1").unwrap();

    let region = strategy
        .calculate_separating_region_for_event(s1, "a")
        .unwrap()
        .unwrap();
    assert!(region.is_valid_for(&utility));
    let a = utility.event_index("a").unwrap();
    assert!(disables_event(&utility, &region, s1, a));
}

#[test]
fn mutex_place_starts_marked() {
    let lts = mutex();
    let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
    let mut strategy = SeparationStrategy::create(
        &utility,
        &properties("pure"),
        CancellationToken::new(),
        SolverConfig::default(),
    );
    let s0 = lts.initial();
    let s1 = lts.state_by_name("s1").unwrap();

    let region = strategy
        .calculate_separating_region_for_event(s1, "a")
        .unwrap()
        .unwrap();
    assert_eq!(region.marking_for_state(&utility, s0), Ok(1));
    assert_eq!(region.marking_for_state(&utility, s1), Ok(0));
}

#[test]
fn synthesized_nets_reproduce_the_lts() {
    let cases = [
        (cycle(), ""),
        (cycle(), "pure"),
        (cycle(), "pure,plain"),
        (cycle(), "safe"),
        (cycle(), "tnet"),
        (mutex(), "pure"),
        (mutex(), "pure,conflict-free"),
        (step(), ""),
        (diamond(), ""),
        (diamond(), "pure,plain"),
    ];
    for (lts, props) in cases {
        let outcome = synthesize(&lts, props);
        assert!(outcome.is_success(), "{} as {}", lts.name(), props);

        let net = outcome.to_net(lts.name());
        let graph = reachability_lts(&net, &ReachabilityConfig::default());
        assert!(!graph.truncated);
        assert_eq!(graph.lts.state_count(), lts.state_count(), "{} as {}", lts.name(), props);
        assert_eq!(graph.lts.arc_count(), lts.arc_count(), "{} as {}", lts.name(), props);
    }
}

#[test]
fn pure_plain_nets_have_unit_arcs() {
    let lts = diamond();
    let net = synthesize(&lts, "pure,plain").to_net("diamond");
    assert!(net.is_pure());
    assert!(net.is_plain());
}

#[test]
fn descriptions_are_read_from_json() {
    let description: LtsDescription = io::from_json_str(
        r#"{
            "name": "mutex",
            "initial": "idle",
            "states": ["idle", "busy"],
            "arcs": [
                { "source": "idle", "label": "lock", "target": "busy" },
                { "source": "busy", "label": "unlock", "target": "idle" }
            ]
        }"#,
    )
    .unwrap();
    let lts = Lts::from_description(&description).unwrap();
    assert_eq!(lts.state_name(lts.initial()), "idle");

    let outcome = synthesize(&lts, "pure");
    assert!(outcome.is_success());
    assert_eq!(outcome.events, vec!["lock".to_string(), "unlock".to_string()]);
}

#[test]
fn cancelled_synthesis_is_reported() {
    let lts = diamond();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let error = Synthesizer::new(&lts, properties("2-bounded"), SynthesisConfig::default(), cancel)
        .synthesize()
        .unwrap_err();
    assert!(error.is_cancelled());
}
