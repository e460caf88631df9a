use crate::cancel::CancellationToken;
use crate::net::ids::StateId;
use crate::region::{Region, RegionUtility};
use crate::separation::{
    combine_basis, disables_event, find_separating_basis_region, pure_event_system, PnFlags,
    PnProperties, Separation, UnsupportedPropertiesError,
};
use crate::solver::{SolverConfig, SolverError};

/// Pure regions without further restrictions, searched over basis
/// coefficients.
pub struct BasicPureSeparation<'a> {
    utility: &'a RegionUtility<'a>,
    cancel: CancellationToken,
    config: SolverConfig,
}

impl<'a> BasicPureSeparation<'a> {
    pub const NAME: &'static str = "BasicPureSeparation";

    pub fn new(
        utility: &'a RegionUtility<'a>,
        properties: &PnProperties,
        cancel: CancellationToken,
        config: SolverConfig,
    ) -> Result<Self, UnsupportedPropertiesError> {
        if !properties.has_only_flags() || properties.flags() != PnFlags::PURE {
            return Err(UnsupportedPropertiesError::new(Self::NAME, properties));
        }
        Ok(Self {
            utility,
            cancel,
            config,
        })
    }

    fn candidates(&self, event: usize) -> impl Iterator<Item = Region> + '_ {
        let events = self.utility.number_of_events();
        self.utility
            .region_basis()
            .iter()
            .flat_map(move |region| {
                [
                    region.clone(),
                    Region::create_trivial_region(events).add_region_with_factor(region, -1),
                ]
            })
            .map(|region| region.make_pure().with_normal_region_marking(self.utility))
            .filter(move |region| region.backward_weight(event) > 0)
    }
}

impl Separation for BasicPureSeparation<'_> {
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
        if !utility.is_reachable(state) || utility.region_basis().is_empty() {
            return Ok(None);
        }
        self.cancel.check()?;

        if let Some(region) = self
            .candidates(event)
            .find(|region| disables_event(utility, region, state, event))
        {
            return Ok(Some(region));
        }

        let Some(system) = pure_event_system(utility, state, event) else {
            return Ok(None);
        };
        let Some(coefficients) = system.find_solution_with(&self.cancel, self.config)? else {
            log::trace!(
                "no pure region disables {} at {}",
                utility.event_label(event),
                utility.lts().state_name(state)
            );
            return Ok(None);
        };
        let region = combine_basis(utility, &coefficients)
            .make_pure()
            .with_normal_region_marking(utility);
        debug_assert!(region.is_valid_for(utility));
        debug_assert!(disables_event(utility, &region, state, event));
        Ok(Some(region))
    }
}
