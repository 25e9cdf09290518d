use crate::error::{Result, SimError};
use crate::geo::haversine;
use crate::network::{ContactNetwork, EdgeKind};
use crate::population::Population;
use crate::prelude::Real;
use crate::sampler::{random_member, JointDist};
use log::debug;
use ndarray::prelude::*;
use rand::prelude::*;

/// Shrink factor applied to the work kernel after every rejected
/// candidate, concentrating work edges around the first draw.
const WORK_RHO_SHRINK: Real = 0.9995;

/// Lower bound keeping the shrinking kernel away from underflow.
const RHO_FLOOR: Real = 1e-12;

/// Consecutive fruitless placement attempts tolerated before the
/// target mean degree is declared infeasible.
const RETRY_BUDGET: u32 = 10_000;

/// Knobs of the non-household edge generator.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MixingConfig {
    /// Target mean degree over the whole network.
    pub mean_degree: Real,
    /// Fraction of placement attempts using the work algorithm.
    pub work_other_ratio: Real,
    /// Distance-decay strength.
    pub rho: Real,
    /// Characteristic kernel length in km.
    pub rho_scale: Real,
    /// Fraction of attempts that skip the distance kernel entirely.
    pub epsilon_rho: Real,
}

/// Age-pair selection matrices for the two edge algorithms, masked by
/// bucket occupancy so an empty bucket is never drawn.
#[derive(Debug, Clone)]
pub struct AgeMixing {
    work: JointDist,
    other: JointDist,
}

impl AgeMixing {
    pub fn new(work: &Array2<Real>, other: &Array2<Real>, census: &[u32]) -> Result<Self> {
        return Ok(AgeMixing {
            work: JointDist::new(&mask_by_occupancy(work, census)?)?,
            other: JointDist::new(&mask_by_occupancy(other, census)?)?,
        });
    }

    /// The default when no empirical matrices are configured: both
    /// algorithms pick age pairs proportionally to the census product.
    pub fn census_proportional(census: &[u32]) -> Result<Self> {
        let n = census.len();
        let mut m = Array2::<Real>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                m[(i, j)] = census[i] as Real * census[j] as Real;
            }
        }
        let dist = JointDist::new(&m)?;
        return Ok(AgeMixing {
            work: dist.clone(),
            other: dist,
        });
    }
}

fn mask_by_occupancy(matrix: &Array2<Real>, census: &[u32]) -> Result<Array2<Real>> {
    if matrix.nrows() != census.len() || matrix.ncols() != census.len() {
        return Err(SimError::InvalidDistribution(
            "age matrix does not match the census dimension",
        ));
    }
    let mut masked = matrix.clone();
    for i in 0..census.len() {
        if census[i] == 0 {
            masked.row_mut(i).fill(0.0);
            masked.column_mut(i).fill(0.0);
        }
    }
    return Ok(masked);
}

/// Add work/other edges until the network carries ceil(mu * N / 2)
/// edges in total. Only edges actually inserted count toward the
/// target; attempts that land on an existing pair burn retry budget.
pub fn connect_work_and_others<R: Rng>(
    population: &Population,
    network: &mut ContactNetwork,
    mixing: &AgeMixing,
    cfg: &MixingConfig,
    rng: &mut R,
) -> Result<()> {
    let n_tot = population.len();
    let target = (cfg.mean_degree * n_tot as Real / 2.0).ceil() as usize;
    let groups = population.age_groups();
    let mut stalled = 0u32;

    debug!(
        "connecting work/other edges: {} household, target {}",
        network.edge_count(),
        target
    );

    while network.edge_count() < target {
        if stalled >= RETRY_BUDGET {
            return Err(SimError::NetworkSaturation { attempts: stalled });
        }

        let work = rng.gen::<Real>() < cfg.work_other_ratio;
        let (age1, age2) = if work {
            mixing.work.sample(rng)
        } else {
            mixing.other.sample(rng)
        };

        // One kernel-skip draw per attempt, taken whether or not rho
        // is active, to keep the random stream independent of rho.
        let rho_eff = if rng.gen::<Real>() > cfg.epsilon_rho {
            cfg.rho
        } else {
            0.0
        };

        let added = if work {
            place_work_edge(population, network, &groups[age1], &groups[age2], rho_eff, cfg, rng)?
        } else {
            place_other_edge(population, network, &groups[age1], &groups[age2], rho_eff, cfg, rng)?
        };

        if added {
            stalled = 0;
        } else {
            stalled += 1;
        }
    }

    debug!(
        "work/other placement done: {} edges, degree sum {}",
        network.edge_count(),
        network.degree_sum()
    );
    return Ok(());
}

/// Work algorithm: anchor one endpoint, then redraw the other while
/// shrinking the kernel until a candidate is accepted. Acceptance is
/// eventually certain, which concentrates the edge near the anchor.
fn place_work_edge<R: Rng>(
    population: &Population,
    network: &mut ContactNetwork,
    group1: &[u32],
    group2: &[u32],
    rho_eff: Real,
    cfg: &MixingConfig,
    rng: &mut R,
) -> Result<bool> {
    let a = *random_member(group1, rng).ok_or_else(|| SimError::no_candidate("age bucket"))?;
    let mut rho_eff = rho_eff;

    for _ in 0..RETRY_BUDGET {
        let b = *random_member(group2, rng).ok_or_else(|| SimError::no_candidate("age bucket"))?;
        rho_eff *= WORK_RHO_SHRINK;
        if rho_eff > 0.0 && rho_eff < RHO_FLOOR {
            rho_eff = RHO_FLOOR;
        }

        if a == b {
            continue;
        }
        if !kernel_accepts(population, a, b, rho_eff, cfg.rho_scale, rng) {
            continue;
        }
        if network.contains(a, b) {
            return Ok(false);
        }
        network.push_pair(a, b, EdgeKind::Work);
        return Ok(true);
    }
    return Err(SimError::NetworkSaturation { attempts: RETRY_BUDGET });
}

/// Other algorithm: memoryless redraw of both endpoints with a fixed
/// kernel, modeling errands and one-off social contacts.
fn place_other_edge<R: Rng>(
    population: &Population,
    network: &mut ContactNetwork,
    group1: &[u32],
    group2: &[u32],
    rho_eff: Real,
    cfg: &MixingConfig,
    rng: &mut R,
) -> Result<bool> {
    for _ in 0..RETRY_BUDGET {
        let a = *random_member(group1, rng).ok_or_else(|| SimError::no_candidate("age bucket"))?;
        let b = *random_member(group2, rng).ok_or_else(|| SimError::no_candidate("age bucket"))?;

        if a == b {
            continue;
        }
        if !kernel_accepts(population, a, b, rho_eff, cfg.rho_scale, rng) {
            continue;
        }
        if network.contains(a, b) {
            return Ok(false);
        }
        network.push_pair(a, b, EdgeKind::Other);
        return Ok(true);
    }
    return Err(SimError::NetworkSaturation { attempts: RETRY_BUDGET });
}

#[inline]
fn kernel_accepts<R: Rng>(
    population: &Population,
    a: u32,
    b: u32,
    rho_eff: Real,
    rho_scale: Real,
    rng: &mut R,
) -> bool {
    if rho_eff == 0.0 {
        return true;
    }
    let r = haversine(population.coord(a), population.coord(b));
    return (-r * rho_eff / rho_scale).exp() > rng.gen::<Real>();
}
