//! 通用分离策略: 将网类性质编码为整数线性约束, 交给 [`ConstraintSolver`] 求解.
//!
//! 变量布局 (事件数 `n`, 区域基大小 `k`):
//!
//! ```text
//! [ w_0 .. w_n | λ_0 .. λ_k | f_0 .. f_n | b_0 .. b_n | m ]
//! ```
//!
//! `w` 为带符号权重, `λ` 为区域基系数, `f`/`b` 为前向/后向权重, `m` 为初始标识.
use std::collections::BTreeSet;

use crate::cancel::CancellationToken;
use crate::linear::{Comparator, InequalitySystem};
use crate::net::ids::StateId;
use crate::region::{Region, RegionUtility};
use crate::separation::{PnProperties, Separation};
use crate::solver::{ConstraintSolver, SolverConfig, SolverError};

#[derive(Debug, Clone, Copy)]
struct Layout {
    events: usize,
    basis: usize,
}

impl Layout {
    fn weight(&self, event: usize) -> usize {
        event
    }

    fn coefficient(&self, index: usize) -> usize {
        self.events + index
    }

    fn forward(&self, event: usize) -> usize {
        self.events + self.basis + event
    }

    fn backward(&self, event: usize) -> usize {
        2 * self.events + self.basis + event
    }

    fn marking(&self) -> usize {
        3 * self.events + self.basis
    }

    fn len(&self) -> usize {
        self.marking() + 1
    }

    fn zero(&self) -> Vec<i64> {
        vec![0; self.len()]
    }

    fn unit(&self, variable: usize) -> Vec<i64> {
        let mut row = self.zero();
        row[variable] = 1;
        row
    }

    /// `m + Σ w_e · parikh[e]`, the marking of a state.
    fn marking_row(&self, parikh: &[i64]) -> Vec<i64> {
        let mut row = self.unit(self.marking());
        for (event, count) in parikh.iter().enumerate() {
            row[self.weight(event)] = *count;
        }
        row
    }

    fn sum(&self, variables: impl Iterator<Item = usize>) -> Vec<i64> {
        let mut row = self.zero();
        for variable in variables {
            row[variable] += 1;
        }
        row
    }
}

fn minus(a: &[i64], b: &[i64]) -> Vec<i64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

fn single(lhs: i64, comparator: Comparator, row: Vec<i64>, comment: String) -> InequalitySystem {
    let mut system = InequalitySystem::new();
    system.add_inequality(lhs, comparator, row, comment);
    system
}

pub struct InequalitySystemSeparation<'a> {
    utility: &'a RegionUtility<'a>,
    properties: PnProperties,
    layout: Layout,
    solver: ConstraintSolver,
}

impl<'a> InequalitySystemSeparation<'a> {
    pub const NAME: &'static str = "InequalitySystemSeparation";

    /// Every property combination can be expressed here.
    pub fn new(
        utility: &'a RegionUtility<'a>,
        properties: &PnProperties,
        cancel: CancellationToken,
        config: SolverConfig,
    ) -> Self {
        let layout = Layout {
            events: utility.number_of_events(),
            basis: utility.region_basis().len(),
        };
        let mut solver = ConstraintSolver::with_config(cancel, config);
        solver.assert_conjunction(Self::fixed_constraints(utility, properties, layout));
        if properties.is_pure() {
            for event in 0..layout.events {
                let label = utility.event_label(event);
                solver.assert_disjunction([
                    single(
                        0,
                        Comparator::Equal,
                        layout.unit(layout.forward(event)),
                        format!("{} does not produce", label),
                    ),
                    single(
                        0,
                        Comparator::Equal,
                        layout.unit(layout.backward(event)),
                        format!("{} does not consume", label),
                    ),
                ]);
            }
        }
        log::debug!(
            "{} over {} variables for a net that is {}",
            Self::NAME,
            layout.len(),
            properties
        );
        Self {
            utility,
            properties: properties.clone(),
            layout,
            solver,
        }
    }

    fn fixed_constraints(
        utility: &RegionUtility<'_>,
        properties: &PnProperties,
        layout: Layout,
    ) -> InequalitySystem {
        let mut system = InequalitySystem::new();

        for event in 0..layout.events {
            let label = utility.event_label(event);
            let mut row = layout.zero();
            row[layout.weight(event)] = -1;
            for (index, region) in utility.region_basis().iter().enumerate() {
                row[layout.coefficient(index)] = region.weight(event);
            }
            system.add_inequality(
                0,
                Comparator::Equal,
                row,
                format!("weight of {} spanned by the basis", label),
            );

            let mut row = layout.unit(layout.weight(event));
            row[layout.forward(event)] = -1;
            row[layout.backward(event)] = 1;
            system.add_inequality(
                0,
                Comparator::Equal,
                row,
                format!("weight of {} is forward minus backward", label),
            );

            system.add_inequality(
                0,
                Comparator::LessEqual,
                layout.unit(layout.forward(event)),
                format!("forward weight of {}", label),
            );
            system.add_inequality(
                0,
                Comparator::LessEqual,
                layout.unit(layout.backward(event)),
                format!("backward weight of {}", label),
            );
            if properties.is_plain() {
                system.add_inequality(
                    1,
                    Comparator::GreaterEqual,
                    layout.unit(layout.forward(event)),
                    format!("plain forward arc of {}", label),
                );
                system.add_inequality(
                    1,
                    Comparator::GreaterEqual,
                    layout.unit(layout.backward(event)),
                    format!("plain backward arc of {}", label),
                );
            }
        }
        system.add_inequality(
            0,
            Comparator::LessEqual,
            layout.unit(layout.marking()),
            "initial marking",
        );

        for state in utility.reachable_states() {
            let Some(parikh) = utility.parikh_vector(*state) else {
                continue;
            };
            let name = utility.lts().state_name(*state);
            let marking = layout.marking_row(parikh);
            system.add_inequality(
                0,
                Comparator::LessEqual,
                marking.clone(),
                format!("marking of {}", name),
            );
            if let Some(k) = properties.k_bounded() {
                system.add_inequality(
                    i64::try_from(k).unwrap_or(i64::MAX),
                    Comparator::GreaterEqual,
                    marking.clone(),
                    format!("{}-bounded at {}", k, name),
                );
            }
            let labels: BTreeSet<&str> = utility.lts().enabled_events(*state);
            for label in labels {
                let Some(event) = utility.event_index(label) else {
                    continue;
                };
                system.add_inequality(
                    0,
                    Comparator::LessEqual,
                    minus(&marking, &layout.unit(layout.backward(event))),
                    format!("{} enabled at {}", label, name),
                );
            }
        }

        if properties.is_t_net() {
            system.add_inequality(
                1,
                Comparator::GreaterEqual,
                layout.sum((0..layout.events).map(|e| layout.forward(e))),
                "at most one producer",
            );
        }
        if properties.is_output_nonbranching() {
            system.add_inequality(
                1,
                Comparator::GreaterEqual,
                layout.sum((0..layout.events).map(|e| layout.backward(e))),
                "at most one consumer",
            );
        }
        system
    }

    /// Consumers restricted to events at `location`; unlocated events are
    /// allowed everywhere.
    fn location_system(&self, location: &str) -> InequalitySystem {
        let mut system = InequalitySystem::new();
        for event in 0..self.layout.events {
            let label = self.utility.event_label(event);
            if self
                .properties
                .location_of(label)
                .is_some_and(|other| other != location)
            {
                system.add_inequality(
                    0,
                    Comparator::Equal,
                    self.layout.unit(self.layout.backward(event)),
                    format!("{} is not at {}", label, location),
                );
            }
        }
        system
    }

    /// Runs `body` between a push and its matching pop.
    fn scoped<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, SolverError>,
    ) -> Result<T, SolverError> {
        self.solver.push();
        let result = body(self);
        self.solver.pop();
        result
    }

    fn solve(&mut self) -> Result<Option<Region>, SolverError> {
        if !self.properties.is_conflict_free() {
            return self.find_region();
        }
        let layout = self.layout;
        let region = self.scoped(|this| {
            this.solver.assert_conjunction(single(
                1,
                Comparator::GreaterEqual,
                layout.sum((0..layout.events).map(|e| layout.backward(e))),
                "conflict-free: at most one consumer".to_string(),
            ));
            this.find_region()
        })?;
        if region.is_some() {
            return Ok(region);
        }
        self.scoped(|this| {
            for event in 0..layout.events {
                let label = this.utility.event_label(event).to_string();
                this.solver.assert_disjunction([
                    single(
                        0,
                        Comparator::Equal,
                        layout.unit(layout.backward(event)),
                        format!("conflict-free: {} does not consume", label),
                    ),
                    single(
                        1,
                        Comparator::LessEqual,
                        layout.unit(layout.forward(event)),
                        format!("conflict-free: {} gives back", label),
                    ),
                ]);
            }
            this.find_region()
        })
    }

    fn find_region(&self) -> Result<Option<Region>, SolverError> {
        let Some(model) = self.solver.find_solution()? else {
            return Ok(None);
        };
        let layout = self.layout;
        let forward = (0..layout.events).map(|e| model[layout.forward(e)]).collect();
        let backward = (0..layout.events).map(|e| model[layout.backward(e)]).collect();
        let region = Region::new(forward, backward, model[layout.marking()]);
        debug_assert!(region.is_valid_for(self.utility));
        Ok(Some(region))
    }
}

impl Separation for InequalitySystemSeparation<'_> {
    fn calculate_separating_region_for_states(
        &mut self,
        state: StateId,
        other: StateId,
    ) -> Result<Option<Region>, SolverError> {
        let utility = self.utility;
        let (Some(parikh), Some(other_parikh)) =
            (utility.parikh_vector(state), utility.parikh_vector(other))
        else {
            return Ok(None);
        };
        let layout = self.layout;
        let a = layout.marking_row(parikh);
        let b = layout.marking_row(other_parikh);
        let name = utility.lts().state_name(state);
        let other_name = utility.lts().state_name(other);

        self.scoped(|this| {
            this.solver.assert_disjunction([
                single(
                    0,
                    Comparator::Less,
                    minus(&b, &a),
                    format!("{} below {}", name, other_name),
                ),
                single(
                    0,
                    Comparator::Less,
                    minus(&a, &b),
                    format!("{} below {}", other_name, name),
                ),
            ]);
            if let Some(locations) = this.properties.locations() {
                let distinct: BTreeSet<&str> = locations.values().map(String::as_str).collect();
                if !distinct.is_empty() {
                    let systems: Vec<_> = distinct
                        .into_iter()
                        .map(|location| this.location_system(location))
                        .collect();
                    this.solver.assert_disjunction(systems);
                }
            }
            this.solve()
        })
    }

    fn calculate_separating_region_for_event(
        &mut self,
        state: StateId,
        event: &str,
    ) -> Result<Option<Region>, SolverError> {
        let utility = self.utility;
        let (Some(parikh), Some(index)) = (utility.parikh_vector(state), utility.event_index(event))
        else {
            return Ok(None);
        };
        let layout = self.layout;
        let marking = layout.marking_row(parikh);
        let comment = format!("{} disabled at {}", event, utility.lts().state_name(state));

        self.scoped(|this| {
            this.solver.assert_conjunction(single(
                0,
                Comparator::Less,
                minus(&layout.unit(layout.backward(index)), &marking),
                comment,
            ));
            if let Some(location) = this.properties.location_of(event) {
                let system = this.location_system(location);
                this.solver.assert_conjunction(system);
            }
            this.solve()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::lts::Lts;
    use crate::separation::tests::{cycle, mutex};
    use crate::separation::{disables_event, separates_states};

    fn strategy<'a>(
        utility: &'a RegionUtility<'a>,
        properties: &PnProperties,
    ) -> InequalitySystemSeparation<'a> {
        InequalitySystemSeparation::new(
            utility,
            properties,
            CancellationToken::new(),
            SolverConfig::default(),
        )
    }

    /// Two counters: `s0 -a-> s1 -a-> s2` with `b` going back one step.
    fn counter() -> Lts {
        let mut lts = Lts::new("counter", "s0");
        let s0 = lts.initial();
        let s1 = lts.add_state("s1");
        let s2 = lts.add_state("s2");
        lts.add_arc(s0, "a", s1);
        lts.add_arc(s1, "a", s2);
        lts.add_arc(s1, "b", s0);
        lts.add_arc(s2, "b", s1);
        lts
    }

    #[test]
    fn bounded_regions_stay_within_k() {
        let lts = counter();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let s0 = lts.initial();
        let s2 = lts.state_by_name("s2").unwrap();
        let region = strategy(&utility, &"2-bounded".parse().unwrap())
            .calculate_separating_region_for_event(s2, "a")
            .unwrap()
            .unwrap();
        assert!(region.is_valid_for(&utility));
        for state in utility.reachable_states() {
            assert!(region.marking_for_state(&utility, *state).unwrap() <= 2);
        }
        assert!(disables_event(&utility, &region, s2, 0));

        // A one-bounded place can not count to two.
        let mut safe = strategy(&utility, &"safe".parse().unwrap());
        assert_eq!(
            safe.calculate_separating_region_for_states(s0, s2).unwrap(),
            None
        );
    }

    #[test]
    fn pure_and_plain_results_hold() {
        let lts = cycle();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let s0 = lts.initial();
        let s1 = lts.state_by_name("s1").unwrap();
        let mut strategy = strategy(&utility, &"pure,plain,safe".parse().unwrap());
        let region = strategy
            .calculate_separating_region_for_states(s0, s1)
            .unwrap()
            .unwrap();
        assert!(region.is_pure());
        assert!(separates_states(&utility, &region, s0, s1));
        for event in 0..region.number_of_events() {
            assert!(region.forward_weight(event) <= 1);
            assert!(region.backward_weight(event) <= 1);
        }
    }

    /// `a` and `b` both lead from s0 to s1, so every region weighs them equally.
    fn choice() -> Lts {
        let mut lts = Lts::new("choice", "s0");
        let s0 = lts.initial();
        let s1 = lts.add_state("s1");
        lts.add_arc(s0, "a", s1);
        lts.add_arc(s0, "b", s1);
        lts
    }

    #[test]
    fn output_nonbranching_forbids_a_shared_input_place() {
        let lts = choice();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let s1 = lts.state_by_name("s1").unwrap();

        let region = strategy(&utility, &PnProperties::new())
            .calculate_separating_region_for_event(s1, "a")
            .unwrap()
            .unwrap();
        assert!(region.is_valid_for(&utility));
        assert!(region.backward_weight(0) > 0 && region.backward_weight(1) > 0);

        let mut restricted = strategy(&utility, &"on".parse().unwrap());
        assert_eq!(
            restricted
                .calculate_separating_region_for_event(s1, "a")
                .unwrap(),
            None
        );
    }

    #[test]
    fn conflict_free_falls_back_to_side_conditions() {
        let lts = choice();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let s1 = lts.state_by_name("s1").unwrap();
        let mut strategy = strategy(&utility, &"cf".parse().unwrap());
        let region = strategy
            .calculate_separating_region_for_event(s1, "a")
            .unwrap()
            .unwrap();
        assert!(region.is_valid_for(&utility));
        assert!(disables_event(&utility, &region, s1, 0));
        for event in 0..2 {
            if region.backward_weight(event) > 0 {
                assert!(region.forward_weight(event) >= 1);
            }
        }
        assert_eq!(strategy.solver.depth(), 0);
    }

    #[test]
    fn distributable_consumers_share_the_location() {
        let lts = mutex();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let s0 = lts.initial();
        let s1 = lts.state_by_name("s1").unwrap();
        let locations = BTreeMap::from([
            ("a".to_string(), "left".to_string()),
            ("b".to_string(), "right".to_string()),
        ]);
        let properties = PnProperties::new().with_locations(locations);
        let mut strategy = strategy(&utility, &properties);

        let a = utility.event_index("a").unwrap();
        let b = utility.event_index("b").unwrap();
        let region = strategy
            .calculate_separating_region_for_event(s1, "a")
            .unwrap()
            .unwrap();
        assert_eq!(region.backward_weight(b), 0);
        assert!(disables_event(&utility, &region, s1, a));

        let region = strategy
            .calculate_separating_region_for_states(s0, s1)
            .unwrap()
            .unwrap();
        assert!(region.backward_weight(a) == 0 || region.backward_weight(b) == 0);
    }

    #[test]
    fn scopes_are_balanced_after_every_query() {
        let lts = cycle();
        let utility = RegionUtility::new(&lts, &CancellationToken::new()).unwrap();
        let mut strategy = strategy(&utility, &"pure,cf".parse().unwrap());
        for state in utility.reachable_states() {
            strategy
                .calculate_separating_region_for_event(*state, "b")
                .unwrap();
            assert_eq!(strategy.solver.depth(), 0);
        }
    }
}
