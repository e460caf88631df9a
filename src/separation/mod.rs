//! 分离问题求解策略.
//!
//! 状态分离 (SSP): 找一个区域使两个可达状态的标识不同.
//! 事件/状态分离 (ESSP): 找一个区域使事件在某状态下不可发生
//! (`backward(e) > marking(s)`), 同时所有可达标识保持非负.
//! 不同网类对应不同策略, 由 [`SeparationStrategy::create`] 按性质集合选择.
use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::linear::{Comparator, InequalitySystem};
use crate::net::ids::StateId;
use crate::region::{Region, RegionUtility};
use crate::solver::{SolverConfig, SolverError};

pub mod basic_impure;
pub mod basic_pure;
pub mod inequality_system;
pub mod plain_pure;
pub mod properties;

pub use basic_impure::BasicImpureSeparation;
pub use basic_pure::BasicPureSeparation;
pub use inequality_system::InequalitySystemSeparation;
pub use plain_pure::PlainPureSeparation;
pub use properties::{PnFlags, PnProperties, PropertyParseError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{strategy} cannot produce regions for a net that is {properties}")]
pub struct UnsupportedPropertiesError {
    pub strategy: &'static str,
    pub properties: String,
}

impl UnsupportedPropertiesError {
    pub(crate) fn new(strategy: &'static str, properties: &PnProperties) -> Self {
        Self {
            strategy,
            properties: properties.to_string(),
        }
    }
}

/// `Ok(None)` means the pair cannot be separated in the requested net class.
pub trait Separation {
    fn calculate_separating_region_for_states(
        &mut self,
        state: StateId,
        other: StateId,
    ) -> Result<Option<Region>, SolverError>;

    fn calculate_separating_region_for_event(
        &mut self,
        state: StateId,
        event: &str,
    ) -> Result<Option<Region>, SolverError>;
}

pub enum SeparationStrategy<'a> {
    BasicPure(BasicPureSeparation<'a>),
    BasicImpure(BasicImpureSeparation<'a>),
    PlainPure(PlainPureSeparation<'a>),
    InequalitySystem(InequalitySystemSeparation<'a>),
}

impl<'a> SeparationStrategy<'a> {
    /// Picks the most specific strategy for `properties`, falling back to the
    /// general constraint system.
    pub fn create(
        utility: &'a RegionUtility<'a>,
        properties: &PnProperties,
        cancel: CancellationToken,
        config: SolverConfig,
    ) -> Self {
        let specific = if !properties.has_only_flags() {
            None
        } else if properties.flags().is_empty() {
            BasicImpureSeparation::new(utility, properties, cancel.clone(), config)
                .ok()
                .map(Self::BasicImpure)
        } else if properties.flags() == PnFlags::PURE {
            BasicPureSeparation::new(utility, properties, cancel.clone(), config)
                .ok()
                .map(Self::BasicPure)
        } else if properties.flags() == PnFlags::PURE | PnFlags::PLAIN {
            PlainPureSeparation::new(utility, properties, cancel.clone(), config)
                .ok()
                .map(Self::PlainPure)
        } else {
            None
        };
        let strategy = specific.unwrap_or_else(|| {
            Self::InequalitySystem(InequalitySystemSeparation::new(
                utility, properties, cancel, config,
            ))
        });
        log::debug!(
            "using {} for a net that is {}",
            strategy.name(),
            properties
        );
        strategy
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BasicPure(_) => BasicPureSeparation::NAME,
            Self::BasicImpure(_) => BasicImpureSeparation::NAME,
            Self::PlainPure(_) => PlainPureSeparation::NAME,
            Self::InequalitySystem(_) => InequalitySystemSeparation::NAME,
        }
    }
}

impl Separation for SeparationStrategy<'_> {
    fn calculate_separating_region_for_states(
        &mut self,
        state: StateId,
        other: StateId,
    ) -> Result<Option<Region>, SolverError> {
        match self {
            Self::BasicPure(inner) => inner.calculate_separating_region_for_states(state, other),
            Self::BasicImpure(inner) => inner.calculate_separating_region_for_states(state, other),
            Self::PlainPure(inner) => inner.calculate_separating_region_for_states(state, other),
            Self::InequalitySystem(inner) => {
                inner.calculate_separating_region_for_states(state, other)
            }
        }
    }

    fn calculate_separating_region_for_event(
        &mut self,
        state: StateId,
        event: &str,
    ) -> Result<Option<Region>, SolverError> {
        match self {
            Self::BasicPure(inner) => inner.calculate_separating_region_for_event(state, event),
            Self::BasicImpure(inner) => inner.calculate_separating_region_for_event(state, event),
            Self::PlainPure(inner) => inner.calculate_separating_region_for_event(state, event),
            Self::InequalitySystem(inner) => {
                inner.calculate_separating_region_for_event(state, event)
            }
        }
    }
}

pub fn separates_states(
    utility: &RegionUtility<'_>,
    region: &Region,
    state: StateId,
    other: StateId,
) -> bool {
    match (
        region.marking_for_state(utility, state),
        region.marking_for_state(utility, other),
    ) {
        (Ok(a), Ok(b)) => a != b,
        _ => false,
    }
}

pub fn disables_event(
    utility: &RegionUtility<'_>,
    region: &Region,
    state: StateId,
    event: usize,
) -> bool {
    region
        .marking_for_state(utility, state)
        .is_ok_and(|marking| marking < region.backward_weight(event))
}

/// `parikh(state) - parikh(other)`, if both are reachable.
pub(crate) fn parikh_difference(
    utility: &RegionUtility<'_>,
    state: StateId,
    other: StateId,
) -> Option<Vec<i64>> {
    let a = utility.parikh_vector(state)?;
    let b = utility.parikh_vector(other)?;
    Some(a.iter().zip(b).map(|(x, y)| x - y).collect())
}

/// Evaluates every basis region on `vector`; a row over basis coefficients.
pub(crate) fn basis_row(utility: &RegionUtility<'_>, vector: &[i64]) -> Vec<i64> {
    utility
        .region_basis()
        .iter()
        .map(|region| region.evaluate_parikh_vector(vector))
        .collect()
}

/// `Σ coefficients[j] · basis[j]`.
pub(crate) fn combine_basis(utility: &RegionUtility<'_>, coefficients: &[i64]) -> Region {
    utility
        .region_basis()
        .iter()
        .zip(coefficients)
        .filter(|(_, factor)| **factor != 0)
        .fold(
            Region::create_trivial_region(utility.number_of_events()),
            |sum, (region, factor)| sum.add_region_with_factor(region, *factor),
        )
}

/// First basis region whose marking differs between the two states.
pub(crate) fn find_separating_basis_region(
    utility: &RegionUtility<'_>,
    state: StateId,
    other: StateId,
) -> Option<Region> {
    let difference = parikh_difference(utility, state, other)?;
    utility
        .region_basis()
        .iter()
        .find(|region| region.evaluate_parikh_vector(&difference) != 0)
        .map(|region| region.make_pure().with_normal_region_marking(utility))
}

/// Pure regions disabling `event` at `state`: for every reachable `t`,
/// `0 < Σ λ_j · basis_j(parikh(t) - parikh(state) - unit(event))`.
pub(crate) fn pure_event_system(
    utility: &RegionUtility<'_>,
    state: StateId,
    event: usize,
) -> Option<InequalitySystem> {
    let mut system = InequalitySystem::new();
    for other in utility.reachable_states() {
        let mut difference = parikh_difference(utility, *other, state)?;
        difference[event] -= 1;
        system.add_inequality(
            0,
            Comparator::Less,
            basis_row(utility, &difference),
            format!(
                "{} disables {} at {}",
                utility.lts().state_name(*other),
                utility.event_label(event),
                utility.lts().state_name(state)
            ),
        );
    }
    Some(system)
}

/// `-1 <= weight(e) <= 1` for every event, over basis coefficients.
pub(crate) fn plain_weight_bounds(utility: &RegionUtility<'_>) -> InequalitySystem {
    let mut system = InequalitySystem::new();
    for event in 0..utility.number_of_events() {
        let row: Vec<i64> = utility
            .region_basis()
            .iter()
            .map(|region| region.weight(event))
            .collect();
        let label = utility.event_label(event);
        system.add_inequality(
            -1,
            Comparator::LessEqual,
            row.clone(),
            format!("plain lower bound for {}", label),
        );
        system.add_inequality(
            1,
            Comparator::GreaterEqual,
            row,
            format!("plain upper bound for {}", label),
        );
    }
    system
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lts::Lts;

    /// `s0 -a-> s1 -b-> s2 -c-> s0`.
    pub fn cycle() -> Lts {
        let mut lts = Lts::new("cycle", "s0");
        let s0 = lts.initial();
        let s1 = lts.add_state("s1");
        let s2 = lts.add_state("s2");
        lts.add_arc(s0, "a", s1);
        lts.add_arc(s1, "b", s2);
        lts.add_arc(s2, "c", s0);
        lts
    }

    /// `s0 -a-> s1 -b-> s0`.
    pub fn mutex() -> Lts {
        let mut lts = Lts::new("mutex", "s0");
        let s0 = lts.initial();
        let s1 = lts.add_state("s1");
        lts.add_arc(s0, "a", s1);
        lts.add_arc(s1, "b", s0);
        lts
    }

    /// `s0 -a-> s1` and an unreachable `island`.
    pub fn single_step() -> Lts {
        let mut lts = Lts::new("step", "s0");
        let s0 = lts.initial();
        let s1 = lts.add_state("s1");
        lts.add_arc(s0, "a", s1);
        lts.add_state("island");
        lts
    }

    fn strategies<'a>(utility: &'a RegionUtility<'a>) -> Vec<SeparationStrategy<'a>> {
        ["", "pure", "pure,plain", "2-bounded", "pure,cf", "tnet"]
            .into_iter()
            .map(|text| {
                let properties: PnProperties = text.parse().unwrap();
                SeparationStrategy::create(
                    utility,
                    &properties,
                    CancellationToken::new(),
                    SolverConfig::default(),
                )
            })
            .collect()
    }

    #[test]
    fn factory_picks_the_most_specific_strategy() {
        let lts = mutex();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let names: Vec<_> = strategies(&utility).iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                BasicImpureSeparation::NAME,
                BasicPureSeparation::NAME,
                PlainPureSeparation::NAME,
                InequalitySystemSeparation::NAME,
                InequalitySystemSeparation::NAME,
                InequalitySystemSeparation::NAME,
            ]
        );
    }

    #[test]
    fn unreachable_states_are_never_separated() {
        let lts = single_step();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let s0 = lts.initial();
        let island = lts.state_by_name("island").unwrap();
        for mut strategy in strategies(&utility) {
            assert_eq!(
                strategy
                    .calculate_separating_region_for_states(s0, island)
                    .unwrap(),
                None,
                "{}",
                strategy.name()
            );
            assert_eq!(
                strategy
                    .calculate_separating_region_for_states(island, s0)
                    .unwrap(),
                None
            );
            assert_eq!(
                strategy
                    .calculate_separating_region_for_event(island, "a")
                    .unwrap(),
                None
            );
        }
    }

    #[test]
    fn every_strategy_separates_the_mutex_states() {
        let lts = mutex();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let s0 = lts.initial();
        let s1 = lts.state_by_name("s1").unwrap();
        for mut strategy in strategies(&utility) {
            let region = strategy
                .calculate_separating_region_for_states(s0, s1)
                .unwrap()
                .unwrap_or_else(|| panic!("{} found no region", strategy.name()));
            assert!(region.is_valid_for(&utility));
            assert!(separates_states(&utility, &region, s0, s1));

            let a = utility.event_index("a").unwrap();
            let region = strategy
                .calculate_separating_region_for_event(s1, "a")
                .unwrap()
                .unwrap();
            assert!(region.is_valid_for(&utility));
            assert!(disables_event(&utility, &region, s1, a));
        }
    }

    #[test]
    fn unknown_events_cannot_be_disabled() {
        let lts = mutex();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        for mut strategy in strategies(&utility) {
            assert_eq!(
                strategy
                    .calculate_separating_region_for_event(lts.initial(), "zzz")
                    .unwrap(),
                None
            );
        }
    }
}
