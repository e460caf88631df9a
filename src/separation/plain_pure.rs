use crate::cancel::CancellationToken;
use crate::linear::{Comparator, InequalitySystem};
use crate::net::ids::StateId;
use crate::region::{Region, RegionUtility};
use crate::separation::{
    basis_row, combine_basis, disables_event, parikh_difference, plain_weight_bounds,
    pure_event_system, PnFlags, PnProperties, Separation, UnsupportedPropertiesError,
};
use crate::solver::{SolverConfig, SolverError};

/// Pure regions whose arcs all carry weight one.
pub struct PlainPureSeparation<'a> {
    utility: &'a RegionUtility<'a>,
    cancel: CancellationToken,
    config: SolverConfig,
    bounds: InequalitySystem,
}

impl<'a> PlainPureSeparation<'a> {
    pub const NAME: &'static str = "PlainPureSeparation";

    pub fn new(
        utility: &'a RegionUtility<'a>,
        properties: &PnProperties,
        cancel: CancellationToken,
        config: SolverConfig,
    ) -> Result<Self, UnsupportedPropertiesError> {
        if !properties.has_only_flags() || properties.flags() != PnFlags::PURE | PnFlags::PLAIN {
            return Err(UnsupportedPropertiesError::new(Self::NAME, properties));
        }
        Ok(Self {
            utility,
            cancel,
            config,
            bounds: plain_weight_bounds(utility),
        })
    }

    fn solve(&self, mut system: InequalitySystem) -> Result<Option<Region>, SolverError> {
        system.extend(&self.bounds);
        let Some(coefficients) = system.find_solution_with(&self.cancel, self.config)? else {
            return Ok(None);
        };
        let region = combine_basis(self.utility, &coefficients)
            .make_pure()
            .with_normal_region_marking(self.utility);
        debug_assert!(is_plain(&region));
        Ok(Some(region))
    }
}

fn is_plain(region: &Region) -> bool {
    (0..region.number_of_events()).all(|event| {
        region.forward_weight(event) <= 1 && region.backward_weight(event) <= 1
    })
}

impl Separation for PlainPureSeparation<'_> {
    fn calculate_separating_region_for_states(
        &mut self,
        state: StateId,
        other: StateId,
    ) -> Result<Option<Region>, SolverError> {
        let utility = self.utility;
        let Some(difference) = parikh_difference(utility, state, other) else {
            return Ok(None);
        };
        if utility.region_basis().is_empty() {
            return Ok(None);
        }
        self.cancel.check()?;

        if let Some(region) = utility
            .region_basis()
            .iter()
            .filter(|region| is_plain(region))
            .find(|region| region.evaluate_parikh_vector(&difference) != 0)
        {
            return Ok(Some(region.make_pure().with_normal_region_marking(utility)));
        }

        // Negating a solution flips the sign, so one direction suffices.
        let mut system = InequalitySystem::new();
        system.add_inequality(
            0,
            Comparator::Less,
            basis_row(utility, &difference),
            format!(
                "separate {} from {}",
                utility.lts().state_name(state),
                utility.lts().state_name(other)
            ),
        );
        self.solve(system)
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
        if !utility.is_reachable(state) || utility.region_basis().is_empty() {
            return Ok(None);
        }
        self.cancel.check()?;

        let Some(system) = pure_event_system(utility, state, event) else {
            return Ok(None);
        };
        let region = self.solve(system)?;
        debug_assert!(
            region
                .as_ref()
                .is_none_or(|region| disables_event(utility, region, state, event))
        );
        Ok(region)
    }
}
