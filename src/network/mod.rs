//! Ragged adjacency store for the contact graph. Rows are owned
//! per-agent; the engine addresses entries by (agent, slot) so that
//! two rows can be touched inside a single event without aliasing.

mod households;
mod mixing;

pub use households::{AgentWeights, HouseholdModel, PlacedPopulation};
pub use mixing::{connect_work_and_others, AgeMixing, MixingConfig};

use crate::prelude::AgentId;
use serde::{Deserialize, Serialize};

/// How an edge came to exist. Interventions may treat the kinds
/// differently; the infection dynamics do not.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EdgeKind {
    Household = 0,
    Work = 1,
    Other = 2,
}

/// One directed half of an undirected contact. The rate is the
/// current infection pressure along this half: the owner's infection
/// weight while the owner is infectious and the peer susceptible,
/// zero otherwise.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Contact {
    pub peer: AgentId,
    pub rate: f32,
    pub kind: EdgeKind,
}

/// Per-agent variable-length neighbor lists. Edges are created during
/// network construction and never physically removed afterwards;
/// neutralization sets the rate to zero instead, preserving O(1)
/// slot lookup during the run.
#[derive(Debug, Clone, Default)]
pub struct ContactNetwork {
    rows: Vec<Vec<Contact>>,
    edge_count: usize,
}

impl ContactNetwork {
    pub fn new(n_agents: usize) -> Self {
        ContactNetwork {
            rows: vec![Vec::new(); n_agents],
            edge_count: 0,
        }
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn degree(&self, agent: AgentId) -> usize {
        self.rows[agent as usize].len()
    }

    /// Sum of all row lengths; equals twice the edge count.
    pub fn degree_sum(&self) -> usize {
        self.rows.iter().map(|row| row.len()).sum()
    }

    pub fn contacts(&self, agent: AgentId) -> &[Contact] {
        &self.rows[agent as usize]
    }

    #[inline]
    pub fn contact(&self, agent: AgentId, slot: usize) -> Contact {
        self.rows[agent as usize][slot]
    }

    #[inline]
    pub fn set_rate(&mut self, agent: AgentId, slot: usize, rate: f32) {
        self.rows[agent as usize][slot].rate = rate;
    }

    /// Whether an edge between the two agents already exists. Edges
    /// are kept symmetric, so one row scan suffices.
    pub fn contains(&self, a: AgentId, b: AgentId) -> bool {
        self.rows[a as usize].iter().any(|c| c.peer == b)
    }

    /// Insert the undirected edge (a, b) with the given kind and a
    /// zeroed rate. Callers reject self-loops and duplicates first.
    pub fn push_pair(&mut self, a: AgentId, b: AgentId, kind: EdgeKind) {
        debug_assert!(a != b);
        debug_assert!(!self.contains(a, b));
        self.rows[a as usize].push(Contact { peer: b, rate: 0.0, kind });
        self.rows[b as usize].push(Contact { peer: a, rate: 0.0, kind });
        self.edge_count += 1;
    }

    /// Zero the rate of the half-edge from `agent` to `peer`,
    /// returning the displaced rate (0.0 when no such edge exists or
    /// it was already neutral).
    pub fn zero_rate_to(&mut self, agent: AgentId, peer: AgentId) -> f32 {
        for contact in self.rows[agent as usize].iter_mut() {
            if contact.peer == peer {
                let rate = contact.rate;
                contact.rate = 0.0;
                return rate;
            }
        }
        return 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pair_is_symmetric_and_counts_once() {
        let mut net = ContactNetwork::new(4);
        net.push_pair(0, 1, EdgeKind::Household);
        net.push_pair(0, 2, EdgeKind::Work);
        assert_eq!(net.edge_count(), 2);
        assert_eq!(net.degree_sum(), 4);
        assert!(net.contains(1, 0));
        assert!(net.contains(2, 0));
        assert!(!net.contains(1, 2));
        assert_eq!(net.contact(1, 0).kind, EdgeKind::Household);
        assert_eq!(net.contact(2, 0).kind, EdgeKind::Work);
    }

    #[test]
    fn rates_start_neutral() {
        let mut net = ContactNetwork::new(2);
        net.push_pair(0, 1, EdgeKind::Other);
        assert_eq!(net.contact(0, 0).rate, 0.0);
        assert_eq!(net.contact(1, 0).rate, 0.0);
    }

    #[test]
    fn zero_rate_to_returns_displaced_rate() {
        let mut net = ContactNetwork::new(3);
        net.push_pair(0, 1, EdgeKind::Work);
        net.push_pair(0, 2, EdgeKind::Other);
        net.set_rate(0, 1, 0.25);

        assert_eq!(net.zero_rate_to(0, 2), 0.25);
        assert_eq!(net.contact(0, 1).rate, 0.0);
        // Second call is a no-op.
        assert_eq!(net.zero_rate_to(0, 2), 0.0);
        // Missing edge reports no displaced rate.
        assert_eq!(net.zero_rate_to(1, 2), 0.0);
    }

}
