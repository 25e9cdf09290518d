use crate::error::{Result, SimError};
use crate::geo::Coord;
use crate::network::{ContactNetwork, EdgeKind};
use crate::population::Population;
use crate::prelude::{Age, AgentId, Real};
use crate::sampler::CumulativeDist;
use log::debug;
use ndarray::prelude::*;
use rand::prelude::*;

/// Joint household distribution: a size histogram and, per size, a
/// conditional age distribution. Index k of the histogram stands for
/// size k + 1.
#[derive(Debug, Clone)]
pub struct HouseholdModel {
    size_dist: CumulativeDist,
    age_dists: Vec<Option<CumulativeDist>>,
    n_ages: usize,
}

/// Result of household placement: the populated attribute arrays and
/// the network seeded with household cliques.
#[derive(Debug, Clone)]
pub struct PlacedPopulation {
    pub population: Population,
    pub network: ContactNetwork,
}

impl HouseholdModel {
    /// Validate and compile the joint distribution. Every size with
    /// positive probability must have a normalizable age row.
    pub fn new(size_weights: &[Real], age_by_size: &Array2<Real>) -> Result<Self> {
        if age_by_size.nrows() != size_weights.len() {
            return Err(SimError::InvalidDistribution(
                "age matrix must have one row per household size",
            ));
        }
        let size_dist = CumulativeDist::new(size_weights)?;

        let mut age_dists = Vec::with_capacity(size_weights.len());
        for (k, row) in age_by_size.rows().into_iter().enumerate() {
            if size_weights[k] > 0.0 {
                let weights = row.to_vec();
                age_dists.push(Some(CumulativeDist::new(&weights)?));
            } else {
                age_dists.push(None);
            }
        }
        return Ok(HouseholdModel {
            size_dist,
            age_dists,
            n_ages: age_by_size.ncols(),
        });
    }

    /// A single-bucket population of uniformly sized households.
    pub fn single_age(size_weights: &[Real]) -> Result<Self> {
        let ages = Array2::from_elem((size_weights.len(), 1), 1.0);
        Self::new(size_weights, &ages)
    }

    /// Draw households until exactly `n_tot` agents exist, truncating
    /// the final one. Each household occupies the next coordinate,
    /// and its members form a clique of household edges at rate zero.
    pub fn place<R: Rng>(
        &self,
        n_tot: usize,
        coords: &[Coord],
        weights: &AgentWeights,
        rng: &mut R,
    ) -> Result<PlacedPopulation> {
        if coords.len() < n_tot {
            return Err(SimError::InsufficientCoordinates {
                requested: n_tot,
                available: coords.len(),
            });
        }

        let mut population = Population::with_capacity(n_tot, self.n_ages);
        let mut network = ContactNetwork::new(n_tot);

        let mut agent = 0usize;
        let mut house = 0usize;
        while agent < n_tot {
            let size_idx = self.size_dist.sample(rng);
            let mut size = size_idx + 1;
            if agent + size >= n_tot {
                size = n_tot - agent;
            }

            // The age row of the drawn size, even when truncated.
            let age_dist = self.age_dists[size_idx]
                .as_ref()
                .ok_or(SimError::InvalidDistribution("unreachable household size"))?;

            let first = agent as AgentId;
            let coord = coords[house];
            for _ in 0..size {
                let age = age_dist.sample(rng) as Age;
                let (cw, iw) = weights.draw(rng);
                population.push_agent(age, coord, cw, iw);
                agent += 1;
            }
            population.push_household(first, size as u32);

            for a in first..first + size as AgentId {
                for b in (a + 1)..first + size as AgentId {
                    network.push_pair(a, b, EdgeKind::Household);
                }
            }
            house += 1;
        }

        debug!(
            "placed {} agents in {} households ({} household edges)",
            n_tot,
            house,
            network.edge_count()
        );
        return Ok(PlacedPopulation { population, network });
    }
}

/// Per-agent weight sampling: a fraction sigma of agents draw from a
/// heavy-tailed distribution, the rest take the baseline value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AgentWeights {
    pub sigma_mu: Real,
    pub sigma_beta: Real,
    pub beta: Real,
}

impl AgentWeights {
    fn draw<R: Rng>(&self, rng: &mut R) -> (f32, f32) {
        let connection = if rng.gen::<Real>() < self.sigma_mu {
            0.1 - ln_unit(rng)
        } else {
            1.1
        };
        let infection = if rng.gen::<Real>() < self.sigma_beta {
            -ln_unit(rng) * self.beta
        } else {
            self.beta
        };
        return (connection as f32, infection as f32);
    }
}

/// ln of a uniform draw on (0, 1], finite by construction.
#[inline]
fn ln_unit<R: Rng>(rng: &mut R) -> Real {
    (1.0 - rng.gen::<Real>()).ln()
}
