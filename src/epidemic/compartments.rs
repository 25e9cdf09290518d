use crate::prelude::{AgentId, Stage};
use crate::sampler::random_member;
use rand::Rng;

/// Per-state membership: a count and the list of occupying agents.
/// Removal is swap-with-last through an agent-to-slot inverse map, so
/// both insert and remove are O(1). List order is not observable.
#[derive(Debug, Clone, Default)]
pub struct CompartmentTable {
    counts: Vec<u32>,
    members: Vec<Vec<AgentId>>,
    slots: Vec<u32>,
}

impl CompartmentTable {
    pub fn new(n_states: usize, n_agents: usize) -> Self {
        CompartmentTable {
            counts: vec![0; n_states],
            members: vec![Vec::new(); n_states],
            slots: vec![0; n_agents],
        }
    }

    #[inline]
    pub fn count(&self, stage: Stage) -> u32 {
        self.counts[stage as usize]
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Total number of non-susceptible agents.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn members(&self, stage: Stage) -> &[AgentId] {
        &self.members[stage as usize]
    }

    /// Uniformly random occupant of a state, None when empty.
    pub fn random_member<R: Rng>(&self, stage: Stage, rng: &mut R) -> Option<AgentId> {
        random_member(&self.members[stage as usize], rng).copied()
    }

    pub fn insert(&mut self, agent: AgentId, stage: Stage) {
        let list = &mut self.members[stage as usize];
        self.slots[agent as usize] = list.len() as u32;
        list.push(agent);
        self.counts[stage as usize] += 1;
    }

    pub fn remove(&mut self, agent: AgentId, stage: Stage) {
        let list = &mut self.members[stage as usize];
        let slot = self.slots[agent as usize] as usize;
        debug_assert_eq!(list[slot], agent);
        list.swap_remove(slot);
        if let Some(&moved) = list.get(slot) {
            self.slots[moved as usize] = slot as u32;
        }
        self.counts[stage as usize] -= 1;
    }

    /// Move an agent one stage forward.
    pub fn advance(&mut self, agent: AgentId, from: Stage) {
        self.remove(agent, from);
        self.insert(agent, from + 1);
    }
}
