use crate::cancel::CancellationToken;
use crate::linear::{Comparator, InequalitySystem};
use crate::net::ids::StateId;
use crate::region::{Region, RegionUtility};
use crate::separation::{
    basis_row, combine_basis, disables_event, find_separating_basis_region, parikh_difference,
    PnProperties, Separation, UnsupportedPropertiesError,
};
use crate::solver::{SolverConfig, SolverError};

/// Regions with side conditions: a state-separating combination is turned
/// into an event-disabling one by adding a self-loop on the event.
pub struct BasicImpureSeparation<'a> {
    utility: &'a RegionUtility<'a>,
    cancel: CancellationToken,
    config: SolverConfig,
}

impl<'a> BasicImpureSeparation<'a> {
    pub const NAME: &'static str = "BasicImpureSeparation";

    pub fn new(
        utility: &'a RegionUtility<'a>,
        properties: &PnProperties,
        cancel: CancellationToken,
        config: SolverConfig,
    ) -> Result<Self, UnsupportedPropertiesError> {
        if !properties.is_unrestricted() {
            return Err(UnsupportedPropertiesError::new(Self::NAME, properties));
        }
        Ok(Self {
            utility,
            cancel,
            config,
        })
    }
}

impl Separation for BasicImpureSeparation<'_> {
    fn calculate_separating_region_for_states(
        &mut self,
        state: StateId,
        other: StateId,
    ) -> Result<Option<Region>, SolverError> {
        self.cancel.check()?;
        Ok(find_separating_basis_region(self.utility, state, other))
    }

    fn calculate_separating_region_for_event(
        &mut self,
        state: StateId,
        event: &str,
    ) -> Result<Option<Region>, SolverError> {
        let utility = self.utility;
        let Some(event) = utility.event_index(event) else {
            return Ok(None);
        };
        if !utility.is_reachable(state) {
            return Ok(None);
        }
        self.cancel.check()?;

        let enabling = utility.states_enabling(event);
        if enabling.is_empty() {
            // Dead event: one token in a self-loop disables it everywhere.
            let region =
                Region::create_trivial_region(utility.number_of_events()).with_self_loop(event, 1);
            return Ok(Some(region));
        }
        if enabling.contains(&state) || utility.region_basis().is_empty() {
            return Ok(None);
        }

        // The marking at `state` must lie strictly below every enabling marking.
        let mut system = InequalitySystem::new();
        for other in &enabling {
            let Some(difference) = parikh_difference(utility, *other, state) else {
                return Ok(None);
            };
            system.add_inequality(
                0,
                Comparator::Less,
                basis_row(utility, &difference),
                format!(
                    "{} below {}",
                    utility.lts().state_name(state),
                    utility.lts().state_name(*other)
                ),
            );
        }
        let Some(coefficients) = system.find_solution_with(&self.cancel, self.config)? else {
            return Ok(None);
        };
        let region = combine_basis(utility, &coefficients)
            .make_pure()
            .with_normal_region_marking(utility);

        let mut minimum = i64::MAX;
        for other in &enabling {
            match region.marking_for_state(utility, *other) {
                Ok(marking) => minimum = minimum.min(marking),
                Err(_) => return Ok(None),
            }
        }
        let missing = minimum - region.backward_weight(event);
        let region = if missing > 0 {
            region.with_self_loop(event, missing)
        } else {
            region
        };
        debug_assert!(region.is_valid_for(utility));
        debug_assert!(disables_event(utility, &region, state, event));
        Ok(Some(region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lts::Lts;
    use crate::separation::tests::mutex;

    fn strategy<'a>(utility: &'a RegionUtility<'a>) -> BasicImpureSeparation<'a> {
        BasicImpureSeparation::new(
            utility,
            &PnProperties::new(),
            CancellationToken::new(),
            SolverConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn only_unrestricted_nets_are_supported() {
        let lts = mutex();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let result = BasicImpureSeparation::new(
            &utility,
            &"pure".parse().unwrap(),
            CancellationToken::new(),
            SolverConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn dead_event_gets_a_marked_self_loop() {
        let mut lts = mutex();
        let island = lts.add_state("island");
        lts.add_arc(island, "c", island);
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let c = utility.event_index("c").unwrap();
        let region = strategy(&utility)
            .calculate_separating_region_for_event(lts.initial(), "c")
            .unwrap()
            .unwrap();
        assert_eq!(region.forward_weight(c), 1);
        assert_eq!(region.backward_weight(c), 1);
        assert!(region.is_valid_for(&utility));
        assert!(disables_event(&utility, &region, lts.initial(), c));
    }

    #[test]
    fn self_loop_lifts_backward_weight_to_the_enabling_marking() {
        // s0 -a-> s1 -a-> s2 -b-> s0 with `b` tested at s0.
        let mut lts = Lts::new("loop", "s0");
        let s0 = lts.initial();
        let s1 = lts.add_state("s1");
        let s2 = lts.add_state("s2");
        lts.add_arc(s0, "a", s1);
        lts.add_arc(s1, "a", s2);
        lts.add_arc(s2, "b", s0);
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let b = utility.event_index("b").unwrap();
        let region = strategy(&utility)
            .calculate_separating_region_for_event(s0, "b")
            .unwrap()
            .unwrap();
        assert!(region.is_valid_for(&utility));
        assert!(disables_event(&utility, &region, s0, b));
        let at_s2 = region.marking_for_state(&utility, s2).unwrap();
        assert!(region.backward_weight(b) <= at_s2);
    }

    #[test]
    fn enabled_events_are_never_disabled() {
        let lts = mutex();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        assert_eq!(
            strategy(&utility)
                .calculate_separating_region_for_event(lts.initial(), "a")
                .unwrap(),
            None
        );
    }
}
