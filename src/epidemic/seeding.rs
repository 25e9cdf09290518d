use crate::epidemic::{CompartmentTable, RateLedger, StageLayout, SUSCEPTIBLE};
use crate::error::{Result, SimError};
use crate::geo::haversine;
use crate::population::Population;
use crate::prelude::{Age, AgentId, Real, Stage};
use log::debug;
use rand::prelude::*;

/// Kernel strength of the clustered outbreak variant.
const SEED_RHO: Real = 100.0;
const SEED_RHO_SCALE: Real = 1000.0;

/// How the initial exposed agents are chosen.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SeedStrategy {
    /// Uniform without replacement over the eligible age buckets.
    Uniform,
    /// One outbreak point plus distance-weighted neighbors.
    Cluster,
}

/// Place the initial infections. Seeds always land in a uniformly
/// random non-infectious exposed sub-stage so no infection can fire
/// at t = 0; the ledger picks up the corresponding progression mass.
pub fn seed_infections<R: Rng>(
    n_init: usize,
    seed_ages: Option<&[Age]>,
    strategy: SeedStrategy,
    population: &Population,
    layout: &StageLayout,
    states: &mut [Stage],
    compartments: &mut CompartmentTable,
    ledger: &mut RateLedger,
    rng: &mut R,
) -> Result<()> {
    if n_init == 0 {
        return Ok(());
    }

    let chosen = match strategy {
        SeedStrategy::Uniform => choose_uniform(n_init, seed_ages, population, rng)?,
        SeedStrategy::Cluster => choose_cluster(n_init, population, rng)?,
    };

    for &agent in &chosen {
        debug_assert_eq!(states[agent as usize], SUSCEPTIBLE);
        let stage = rng.gen_range(0..layout.n_exposed()) as Stage;
        states[agent as usize] = stage;
        compartments.insert(agent, stage);
        ledger.enroll(stage);
    }
    debug!("seeded {} agents across exposed sub-stages", chosen.len());
    return Ok(());
}

fn choose_uniform<R: Rng>(
    n_init: usize,
    seed_ages: Option<&[Age]>,
    population: &Population,
    rng: &mut R,
) -> Result<Vec<AgentId>> {
    let mut pool: Vec<AgentId> = Vec::new();
    match seed_ages {
        Some(ages) => {
            for &age in ages {
                pool.extend_from_slice(&population.age_groups()[age as usize]);
            }
        }
        None => pool.extend(0..population.len() as AgentId),
    }
    if pool.len() < n_init {
        return Err(SimError::InvalidDistribution(
            "seed count exceeds the eligible agents",
        ));
    }
    return Ok(pool.choose_multiple(rng, n_init).copied().collect());
}

/// Local outbreak: one uniformly random index case, then candidates
/// accepted in proportion to their distance kernel around it.
fn choose_cluster<R: Rng>(
    n_init: usize,
    population: &Population,
    rng: &mut R,
) -> Result<Vec<AgentId>> {
    let n_tot = population.len();
    if n_tot < n_init {
        return Err(SimError::InvalidDistribution(
            "seed count exceeds the eligible agents",
        ));
    }

    let outbreak = rng.gen_range(0..n_tot) as AgentId;
    let origin = population.coord(outbreak);
    let mut chosen = vec![outbreak];

    while chosen.len() < n_init {
        let candidate = rng.gen_range(0..n_tot) as AgentId;
        if chosen.contains(&candidate) {
            continue;
        }
        let r = haversine(origin, population.coord(candidate));
        if (-r * SEED_RHO / SEED_RHO_SCALE).exp() > rng.gen::<Real>() {
            chosen.push(candidate);
        }
    }
    return Ok(chosen);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{AgentWeights, HouseholdModel};
    use crate::prelude::Coord;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn setup(n: usize) -> (Population, StageLayout, Vec<Stage>, CompartmentTable, RateLedger) {
        let model = HouseholdModel::single_age(&[0.0, 1.0]).unwrap();
        let coords: Vec<_> = (0..n).map(|i| Coord::new(55.0 + i as f32 * 0.01, 12.0)).collect();
        let weights = AgentWeights {
            sigma_mu: 0.0,
            sigma_beta: 0.0,
            beta: 0.01,
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let placed = model.place(n, &coords, &weights, &mut rng).unwrap();

        let layout = StageLayout::new(4, 4, 1.0, 1.0);
        let states = vec![SUSCEPTIBLE; n];
        let compartments = CompartmentTable::new(layout.n_states(), n);
        let ledger = RateLedger::new(layout.move_rates().to_vec(), n);
        return (placed.population, layout, states, compartments, ledger);
    }

    #[test]
    fn seeds_are_distinct_exposed_agents() {
        let (pop, layout, mut states, mut compartments, mut ledger) = setup(50);
        let mut rng = SmallRng::seed_from_u64(42);
        seed_infections(
            10,
            None,
            SeedStrategy::Uniform,
            &pop,
            &layout,
            &mut states,
            &mut compartments,
            &mut ledger,
            &mut rng,
        )
        .unwrap();

        let seeded: Vec<_> = states.iter().filter(|&&s| s != SUSCEPTIBLE).collect();
        assert_eq!(seeded.len(), 10);
        assert!(seeded.iter().all(|&&s| layout.is_exposed(s)));
        assert_eq!(compartments.total(), 10);
        // All exposed stages share one exit rate here.
        assert!((ledger.total_move() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn age_restriction_is_honored() {
        let (pop, layout, mut states, mut compartments, mut ledger) = setup(40);
        let mut rng = SmallRng::seed_from_u64(9);
        seed_infections(
            5,
            Some(&[0]),
            SeedStrategy::Uniform,
            &pop,
            &layout,
            &mut states,
            &mut compartments,
            &mut ledger,
            &mut rng,
        )
        .unwrap();
        for (agent, &stage) in states.iter().enumerate() {
            if stage != SUSCEPTIBLE {
                assert_eq!(pop.age(agent as AgentId), 0);
            }
        }
    }

    #[test]
    fn oversized_seed_request_fails() {
        let (pop, layout, mut states, mut compartments, mut ledger) = setup(5);
        let mut rng = SmallRng::seed_from_u64(3);
        let res = seed_infections(
            6,
            None,
            SeedStrategy::Uniform,
            &pop,
            &layout,
            &mut states,
            &mut compartments,
            &mut ledger,
            &mut rng,
        );
        assert!(matches!(res, Err(SimError::InvalidDistribution(_))));
    }

    #[test]
    fn cluster_variant_seeds_distinct_agents() {
        let (pop, layout, mut states, mut compartments, mut ledger) = setup(60);
        let mut rng = SmallRng::seed_from_u64(17);
        seed_infections(
            8,
            None,
            SeedStrategy::Cluster,
            &pop,
            &layout,
            &mut states,
            &mut compartments,
            &mut ledger,
            &mut rng,
        )
        .unwrap();
        assert_eq!(states.iter().filter(|&&s| s != SUSCEPTIBLE).count(), 8);
        assert_eq!(compartments.total(), 8);
    }
}
