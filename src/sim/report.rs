//! Condensed views of a finished run and of a constructed network,
//! for logging and quick inspection of batch results.

use crate::epidemic::{StageLayout, SUSCEPTIBLE};
use crate::error::Outcome;
use crate::network::{ContactNetwork, EdgeKind};
use crate::prelude::Real;
use crate::sim::engine::RunOutput;
use crate::utils::{Stats, StatsAcc};
use serde::{Deserialize, Serialize};

/// Headline numbers of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Simulated time of the last emitted record, in days.
    pub duration: Real,
    /// Fraction of the population ever infected.
    pub attack_rate: Real,
    /// Largest simultaneous occupancy of the infectious block.
    pub peak_infectious: u32,
    pub peak_time: Real,
    pub total_events: u64,
    pub infections: u64,
    pub positive_tests: u32,
}

impl RunReport {
    pub fn new(output: &RunOutput, layout: &StageLayout) -> Self {
        let n_tot = output.final_states.len().max(1);
        let ever_infected = output
            .final_states
            .iter()
            .filter(|&&s| s != SUSCEPTIBLE)
            .count();

        let infectious_range =
            layout.first_infectious() as usize..layout.recovered() as usize;
        let mut peak_infectious = 0u32;
        let mut peak_time = 0.0;
        for row in output.series.rows() {
            let infectious: u32 = row.states[infectious_range.clone()].iter().sum();
            if infectious > peak_infectious {
                peak_infectious = infectious;
                peak_time = row.time;
            }
        }

        RunReport {
            outcome: output.outcome,
            duration: output.series.rows().last().map(|r| r.time).unwrap_or(0.0),
            attack_rate: ever_infected as Real / n_tot as Real,
            peak_infectious,
            peak_time,
            total_events: output.stats.steps,
            infections: output.stats.infections,
            positive_tests: output.stats.positive_tests.iter().sum(),
        }
    }

    pub fn render_toml(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

/// Degree statistics and per-kind edge counts of a contact network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    pub n_agents: usize,
    pub n_edges: usize,
    pub household_edges: usize,
    pub work_edges: usize,
    pub other_edges: usize,
    pub mean_degree: Real,
    pub std_degree: Real,
    pub max_degree: usize,
}

impl NetworkReport {
    pub fn new(network: &ContactNetwork) -> Self {
        let mut degrees = StatsAcc::new();
        let mut by_kind = [0usize; 3];
        for agent in 0..network.len() as u32 {
            degrees.add(network.degree(agent) as Real);
            for contact in network.contacts(agent) {
                by_kind[contact.kind as usize] += 1;
            }
        }
        // Each undirected edge was seen from both ends.
        NetworkReport {
            n_agents: network.len(),
            n_edges: network.edge_count(),
            household_edges: by_kind[EdgeKind::Household as usize] / 2,
            work_edges: by_kind[EdgeKind::Work as usize] / 2,
            other_edges: by_kind[EdgeKind::Other as usize] / 2,
            mean_degree: degrees.mean(),
            std_degree: degrees.std(),
            max_degree: degrees.max() as usize,
        }
    }
}
