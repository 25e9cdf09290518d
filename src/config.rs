use crate::epidemic::{SeedStrategy, StageLayout};
use crate::error::{Result, SimError};
use crate::network::{AgeMixing, AgentWeights, MixingConfig};
use crate::prelude::{Age, Real};
use getset::{CopyGetters, Getters, Setters};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/// Recognized options of a simulation run. All fields have defaults,
/// so a TOML file only needs to spell out what it changes.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Setters, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Population size.
    #[getset(get_copy = "pub", set = "pub")]
    n_tot: usize,
    /// Number of initially exposed agents.
    #[getset(get_copy = "pub", set = "pub")]
    n_init: usize,
    /// Target mean degree of the contact network.
    #[getset(get_copy = "pub", set = "pub")]
    mu: Real,
    /// Fraction of agents drawing a heavy-tailed connection weight.
    #[getset(get_copy = "pub", set = "pub")]
    sigma_mu: Real,
    /// Baseline per-edge infection rate.
    #[getset(get_copy = "pub", set = "pub")]
    beta: Real,
    /// Fraction of agents drawing a heavy-tailed infection weight.
    #[getset(get_copy = "pub", set = "pub")]
    sigma_beta: Real,
    /// Distance-decay strength of the edge placement kernel.
    #[getset(get_copy = "pub", set = "pub")]
    rho: Real,
    /// Fraction of edge attempts that skip the distance kernel.
    #[getset(get_copy = "pub", set = "pub")]
    epsilon_rho: Real,
    /// Exit rate of the exposed sub-stages, per day.
    #[getset(get_copy = "pub", set = "pub")]
    lambda_e: Real,
    /// Exit rate of the infectious sub-stages, per day.
    #[getset(get_copy = "pub", set = "pub")]
    lambda_i: Real,
    #[getset(get_copy = "pub", set = "pub")]
    n_exposed_substages: usize,
    #[getset(get_copy = "pub", set = "pub")]
    n_infectious_substages: usize,
    /// Fraction of placement attempts using the work algorithm.
    #[getset(get_copy = "pub", set = "pub")]
    work_other_ratio: Real,
    /// Age-pair matrix for work edges; census-proportional if absent.
    #[getset(get = "pub", set = "pub")]
    matrix_work: Option<Array2<Real>>,
    /// Age-pair matrix for other edges; census-proportional if absent.
    #[getset(get = "pub", set = "pub")]
    matrix_other: Option<Array2<Real>>,
    /// Characteristic kernel length in km.
    #[getset(get_copy = "pub", set = "pub")]
    rho_scale: Real,
    /// Run identifier; fully determines the random stream.
    #[getset(get_copy = "pub", set = "pub")]
    seed: u64,
    /// Emission interval in simulated days.
    #[getset(get_copy = "pub", set = "pub")]
    nts: Real,
    /// Optional cap on simulated time, in days.
    #[getset(get_copy = "pub", set = "pub")]
    day_max: Option<Real>,
    /// Age buckets eligible for seeding; all buckets if absent.
    #[getset(get = "pub", set = "pub")]
    seed_ages: Option<Vec<Age>>,
    /// Seed around a single outbreak point instead of uniformly.
    #[getset(get_copy = "pub", set = "pub")]
    clustered_seeding: bool,
    /// Uniform test draws per simulated day; 0 disables testing.
    #[getset(get_copy = "pub", set = "pub")]
    daily_tests: usize,
    /// Probability that testing an infectious agent detects it.
    #[getset(get_copy = "pub", set = "pub")]
    detect_prob: Real,
    /// Emit per-agent state snapshots every tenth tick.
    #[getset(get_copy = "pub", set = "pub")]
    snapshots: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            n_tot: 58_000,
            n_init: 100,
            mu: 40.0,
            sigma_mu: 0.0,
            beta: 0.01,
            sigma_beta: 0.0,
            rho: 0.0,
            epsilon_rho: 0.01,
            lambda_e: 1.0,
            lambda_i: 1.0,
            n_exposed_substages: 4,
            n_infectious_substages: 4,
            work_other_ratio: 0.5,
            matrix_work: None,
            matrix_other: None,
            rho_scale: 1000.0,
            seed: 0,
            nts: 0.1,
            day_max: None,
            seed_ages: None,
            clustered_seeding: false,
            daily_tests: 0,
            detect_prob: 0.8,
            snapshots: true,
        }
    }
}

impl SimConfig {
    /// Reject configurations the simulator cannot honor. Called once
    /// before any preparation work.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, what: &'static str) -> Result<()> {
            if ok {
                return Ok(());
            }
            return Err(SimError::InvalidDistribution(what));
        }

        check(self.n_tot > 0, "n_tot must be positive")?;
        check(self.n_init <= self.n_tot, "n_init cannot exceed n_tot")?;
        check(self.mu >= 0.0, "mu must be nonnegative")?;
        check(self.beta >= 0.0, "beta must be nonnegative")?;
        check(self.rho >= 0.0, "rho must be nonnegative")?;
        check(self.rho_scale > 0.0, "rho_scale must be positive")?;
        check(self.lambda_e >= 0.0, "lambda_e must be nonnegative")?;
        check(self.lambda_i >= 0.0, "lambda_i must be nonnegative")?;
        check(self.nts > 0.0, "nts must be positive")?;
        check(
            self.n_exposed_substages >= 1 && self.n_infectious_substages >= 1,
            "sub-stage counts must be at least one",
        )?;
        for (value, what) in [
            (self.sigma_mu, "sigma_mu must lie in [0, 1]"),
            (self.sigma_beta, "sigma_beta must lie in [0, 1]"),
            (self.epsilon_rho, "epsilon_rho must lie in [0, 1]"),
            (self.work_other_ratio, "work_other_ratio must lie in [0, 1]"),
            (self.detect_prob, "detect_prob must lie in [0, 1]"),
        ] {
            check((0.0..=1.0).contains(&value), what)?;
        }
        return Ok(());
    }

    pub fn layout(&self) -> StageLayout {
        StageLayout::new(
            self.n_exposed_substages,
            self.n_infectious_substages,
            self.lambda_e,
            self.lambda_i,
        )
    }

    pub fn agent_weights(&self) -> AgentWeights {
        AgentWeights {
            sigma_mu: self.sigma_mu,
            sigma_beta: self.sigma_beta,
            beta: self.beta,
        }
    }

    pub fn mixing_config(&self) -> MixingConfig {
        MixingConfig {
            mean_degree: self.mu,
            work_other_ratio: self.work_other_ratio,
            rho: self.rho,
            rho_scale: self.rho_scale,
            epsilon_rho: self.epsilon_rho,
        }
    }

    /// Resolve the age-pair matrices against the placed census.
    pub fn age_mixing(&self, census: &[u32]) -> Result<AgeMixing> {
        match (&self.matrix_work, &self.matrix_other) {
            (Some(work), Some(other)) => AgeMixing::new(work, other, census),
            (None, None) => AgeMixing::census_proportional(census),
            _ => Err(SimError::InvalidDistribution(
                "matrix_work and matrix_other must be given together",
            )),
        }
    }

    pub fn seed_strategy(&self) -> SeedStrategy {
        if self.clustered_seeding {
            return SeedStrategy::Cluster;
        }
        return SeedStrategy::Uniform;
    }
}
