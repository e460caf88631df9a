//! 综合驱动: 对所有状态对求解 SSP, 对所有 (状态, 未使能事件) 求解 ESSP,
//! 收集得到的区域作为库所. 所有分离问题均可解时 LTS 可综合.
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::{CancellationToken, Cancelled};
use crate::linear::EliminationError;
use crate::lts::Lts;
use crate::net::ids::StateId;
use crate::net::{Net, Place, Transition};
use crate::region::{Region, RegionUtility};
use crate::separation::{
    PnProperties, Separation, SeparationStrategy, disables_event, separates_states,
};
use crate::solver::{SolverConfig, SolverError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Elimination(#[from] EliminationError),
}

impl SynthesisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SynthesisError::Cancelled(_)
                | SynthesisError::Solver(SolverError::Cancelled)
                | SynthesisError::Elimination(EliminationError::Cancelled(_))
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Stop at the first separation problem without a solution.
    #[serde(default)]
    pub quick_fail: bool,
    /// Drop regions that other regions make redundant.
    #[serde(default)]
    pub minimize: bool,
    #[serde(default)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub regions: Vec<Region>,
    pub failed_state_separation: Vec<(StateId, StateId)>,
    pub failed_event_separation: Vec<(StateId, String)>,
    /// Event labels, indexed like region weights.
    pub events: Vec<String>,
}

impl SynthesisOutcome {
    pub fn is_success(&self) -> bool {
        self.failed_state_separation.is_empty() && self.failed_event_separation.is_empty()
    }

    /// One place per region, one transition per event.
    pub fn to_net(&self, name: impl Into<String>) -> Net {
        let mut net = Net::named(name);
        let transitions: Vec<_> = self
            .events
            .iter()
            .map(|event| net.add_transition(Transition::new(event.clone())))
            .collect();
        for (idx, region) in self.regions.iter().enumerate() {
            let tokens = u64::try_from(region.initial_marking()).unwrap_or_default();
            let place = net.add_place(Place::new(format!("p{}", idx), tokens));
            for (event, transition) in transitions.iter().enumerate() {
                let weight = |w: i64| u64::try_from(w).unwrap_or_default();
                net.set_input_weight(place, *transition, weight(region.backward_weight(event)));
                net.set_output_weight(place, *transition, weight(region.forward_weight(event)));
            }
        }
        net
    }
}

pub struct Synthesizer<'a> {
    lts: &'a Lts,
    properties: PnProperties,
    config: SynthesisConfig,
    cancel: CancellationToken,
}

enum Problem<'e> {
    States(StateId, StateId),
    Event(StateId, usize, &'e str),
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        lts: &'a Lts,
        properties: PnProperties,
        config: SynthesisConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            lts,
            properties,
            config,
            cancel,
        }
    }

    pub fn synthesize(&self) -> Result<SynthesisOutcome, SynthesisError> {
        let utility = RegionUtility::new(self.lts, &self.cancel)?;
        let mut strategy = SeparationStrategy::create(
            &utility,
            &self.properties,
            self.cancel.clone(),
            self.config.solver,
        );
        log::info!(
            "synthesizing `{}` ({} states, {} events) as a net that is {} with {}",
            self.lts.name(),
            utility.reachable_states().len(),
            utility.number_of_events(),
            self.properties,
            strategy.name()
        );

        let mut outcome = SynthesisOutcome {
            regions: Vec::new(),
            failed_state_separation: Vec::new(),
            failed_event_separation: Vec::new(),
            events: utility.events().to_vec(),
        };
        for problem in separation_problems(&utility) {
            self.cancel.check()?;
            if is_solved(&utility, &outcome.regions, &problem) {
                continue;
            }
            let region = match problem {
                Problem::States(state, other) => {
                    let region = strategy.calculate_separating_region_for_states(state, other)?;
                    if region.is_none() {
                        log::warn!(
                            "states {} and {} cannot be separated",
                            self.lts.state_name(state),
                            self.lts.state_name(other)
                        );
                        outcome.failed_state_separation.push((state, other));
                    }
                    region
                }
                Problem::Event(state, _, label) => {
                    let region = strategy.calculate_separating_region_for_event(state, label)?;
                    if region.is_none() {
                        log::warn!(
                            "event {} cannot be disabled at {}",
                            label,
                            self.lts.state_name(state)
                        );
                        outcome.failed_event_separation.push((state, label.to_string()));
                    }
                    region
                }
            };
            match region {
                Some(region) => {
                    log::debug!("accepted region {}", region);
                    if !outcome.regions.contains(&region) {
                        outcome.regions.push(region);
                    }
                }
                None if self.config.quick_fail => break,
                None => {}
            }
        }

        if self.config.minimize && outcome.is_success() {
            let before = outcome.regions.len();
            outcome.regions = minimize(&utility, outcome.regions);
            log::info!("minimized {} regions to {}", before, outcome.regions.len());
        }
        log::info!(
            "synthesis of `{}` {} with {} regions",
            self.lts.name(),
            if outcome.is_success() {
                "succeeded"
            } else {
                "failed"
            },
            outcome.regions.len()
        );
        Ok(outcome)
    }
}

/// SSP for every unordered pair of reachable states, then ESSP for every
/// reachable state and every event not enabled there.
fn separation_problems<'e>(utility: &'e RegionUtility<'_>) -> Vec<Problem<'e>> {
    let states = utility.reachable_states();
    let mut problems: Vec<_> = states
        .iter()
        .array_combinations::<2>()
        .map(|[state, other]| Problem::States(*state, *other))
        .collect();
    for state in states {
        for (event, label) in utility.events().iter().enumerate() {
            if !utility.lts().is_enabled(*state, label) {
                problems.push(Problem::Event(*state, event, label));
            }
        }
    }
    problems
}

fn is_solved(utility: &RegionUtility<'_>, regions: &[Region], problem: &Problem<'_>) -> bool {
    regions.iter().any(|region| match problem {
        Problem::States(state, other) => separates_states(utility, region, *state, *other),
        Problem::Event(state, event, _) => disables_event(utility, region, *state, *event),
    })
}

/// Greedy pass from the last region to the first.
fn minimize(utility: &RegionUtility<'_>, regions: Vec<Region>) -> Vec<Region> {
    let problems = separation_problems(utility);
    let mut kept = regions;
    for idx in (0..kept.len()).rev() {
        let candidate: Vec<Region> = kept
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != idx)
            .map(|(_, region)| region.clone())
            .collect();
        if problems
            .iter()
            .all(|problem| is_solved(utility, &candidate, problem))
        {
            kept = candidate;
        }
    }
    kept
}
