use crate::geo::Coord;
use crate::prelude::{Age, AgentId};
use getset::Getters;

/// Immutable per-agent attributes, struct-of-arrays. Agents are
/// created once by household placement and never destroyed; age and
/// coordinate do not change afterwards.
#[derive(Debug, Clone, Default, Getters)]
pub struct Population {
    /// Age bucket per agent.
    #[getset(get = "pub")]
    ages: Vec<Age>,
    /// Household location per agent; members share one coordinate.
    #[getset(get = "pub")]
    coords: Vec<Coord>,
    /// Extroversion bias, sampled once at creation.
    #[getset(get = "pub")]
    connection_weight: Vec<f32>,
    /// Per-agent emission rate while infectious.
    #[getset(get = "pub")]
    infection_weight: Vec<f32>,
    /// (first member, size) per household; members are consecutive.
    #[getset(get = "pub")]
    households: Vec<(AgentId, u32)>,
    /// Census: number of agents per age bucket.
    #[getset(get = "pub")]
    age_census: Vec<u32>,
    /// Agent indices per age bucket.
    #[getset(get = "pub")]
    age_groups: Vec<Vec<AgentId>>,
}

impl Population {
    pub(crate) fn with_capacity(n_agents: usize, n_ages: usize) -> Self {
        Population {
            ages: Vec::with_capacity(n_agents),
            coords: Vec::with_capacity(n_agents),
            connection_weight: Vec::with_capacity(n_agents),
            infection_weight: Vec::with_capacity(n_agents),
            households: Vec::new(),
            age_census: vec![0; n_ages],
            age_groups: vec![Vec::new(); n_ages],
        }
    }

    pub fn len(&self) -> usize {
        self.ages.len()
    }

    #[inline]
    pub fn age(&self, agent: AgentId) -> Age {
        self.ages[agent as usize]
    }

    #[inline]
    pub fn coord(&self, agent: AgentId) -> Coord {
        self.coords[agent as usize]
    }

    #[inline]
    pub fn infection_weight_of(&self, agent: AgentId) -> f32 {
        self.infection_weight[agent as usize]
    }

    /// Register one agent; returns its dense index.
    pub(crate) fn push_agent(
        &mut self,
        age: Age,
        coord: Coord,
        connection_weight: f32,
        infection_weight: f32,
    ) -> AgentId {
        let id = self.ages.len() as AgentId;
        self.ages.push(age);
        self.coords.push(coord);
        self.connection_weight.push(connection_weight);
        self.infection_weight.push(infection_weight);
        self.age_census[age as usize] += 1;
        self.age_groups[age as usize].push(id);
        return id;
    }

    pub(crate) fn push_household(&mut self, first: AgentId, size: u32) {
        self.households.push((first, size));
    }
}
