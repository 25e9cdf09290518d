use crate::config::SimConfig;
use crate::epidemic::{
    seed_infections, CompartmentTable, RateLedger, StageLayout, SUSCEPTIBLE,
};
use crate::error::{Outcome, Result, SimError};
use crate::geo::CoordinateCatalog;
use crate::network::{connect_work_and_others, ContactNetwork, HouseholdModel};
use crate::population::Population;
use crate::prelude::{AgentId, Real, Stage};
use crate::sampler::search_cumulative;
use crate::sim::sentinel::run_daily_tests;
use crate::sim::tracker::TimeSeries;
use getset::{CopyGetters, Getters};
use log::{debug, trace};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Runaway guard on the event counter.
const MAX_STEPS: u64 = 100_000_000;

/// Below this total rate the run is declared extinct.
const LAMBDA_FLOOR: Real = 1e-4;

/// Emitted ticks between per-agent snapshots (and daily test rounds,
/// which coincide at the default nts of 0.1 days).
const TICKS_PER_SNAPSHOT: u32 = 10;

/// Event counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub steps: u64,
    pub progressions: u64,
    pub infections: u64,
    /// Positive test count per completed day, when testing is on.
    pub positive_tests: Vec<u32>,
}

/// Everything a completed run hands back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub outcome: Outcome,
    pub series: TimeSeries,
    pub final_states: Vec<Stage>,
    pub stats: RunStats,
}

/// The continuous-time event loop and the state it owns. One value
/// of this struct is the single mutator of all rate bookkeeping for
/// the lifetime of a run; there are no process-wide mutables.
#[derive(Getters, CopyGetters)]
pub struct Gillespie {
    config: SimConfig,
    #[getset(get = "pub")]
    layout: StageLayout,
    #[getset(get = "pub")]
    population: Population,
    #[getset(get = "pub")]
    network: ContactNetwork,
    #[getset(get = "pub")]
    states: Vec<Stage>,
    #[getset(get = "pub")]
    compartments: CompartmentTable,
    #[getset(get = "pub")]
    ledger: RateLedger,
    rng: SmallRng,

    #[getset(get_copy = "pub")]
    time: Real,
    clicks: u64,
    snapshot_counter: u32,
    series: TimeSeries,
    stats: RunStats,
}

impl Gillespie {
    /// Build the network, seed the infections and return an engine
    /// ready to run. Fails before any record is emitted when the
    /// configuration or the inputs cannot be honored.
    pub fn prepare(
        config: SimConfig,
        catalog: &CoordinateCatalog,
        households: &HouseholdModel,
    ) -> Result<Self> {
        config.validate()?;
        let mut rng = SmallRng::seed_from_u64(config.seed());
        let layout = config.layout();
        let n_tot = config.n_tot();

        let coords = catalog.sample(n_tot, &mut rng)?;
        let placed = households.place(n_tot, &coords, &config.agent_weights(), &mut rng)?;
        let mut network = placed.network;
        let population = placed.population;

        let mixing = config.age_mixing(population.age_census())?;
        connect_work_and_others(&population, &mut network, &mixing, &config.mixing_config(), &mut rng)?;

        let mut states = vec![SUSCEPTIBLE; n_tot];
        let mut compartments = CompartmentTable::new(layout.n_states(), n_tot);
        let mut ledger = RateLedger::new(layout.move_rates().to_vec(), n_tot);

        seed_infections(
            config.n_init(),
            config.seed_ages().as_deref(),
            config.seed_strategy(),
            &population,
            &layout,
            &mut states,
            &mut compartments,
            &mut ledger,
            &mut rng,
        )?;

        return Ok(Gillespie {
            config,
            layout,
            population,
            network,
            states,
            compartments,
            ledger,
            rng,
            time: 0.0,
            clicks: 0,
            snapshot_counter: 0,
            series: TimeSeries::new(),
            stats: RunStats::default(),
        });
    }

    /// Force one susceptible agent into an arbitrary sub-stage before
    /// the loop starts, activating its emission if the stage is
    /// infectious. Complements the exposed-only seeding of a normal
    /// configuration.
    pub fn seed_agent_at(&mut self, agent: AgentId, stage: Stage) -> Result<()> {
        if self.states[agent as usize] != SUSCEPTIBLE {
            return Err(SimError::InvariantViolation(format!(
                "agent {} is already seeded",
                agent
            )));
        }
        if stage < 0 || stage >= self.layout.recovered() {
            return Err(SimError::InvariantViolation(format!(
                "stage {} is not seedable",
                stage
            )));
        }
        self.states[agent as usize] = stage;
        self.compartments.insert(agent, stage);
        self.ledger.enroll(stage);
        if self.layout.is_infectious(stage) {
            self.activate_emissions(agent, stage);
        }
        return Ok(());
    }

    /// Drive the loop to termination and hand back the emitted
    /// records, the final state vector and the event statistics.
    pub fn run(mut self) -> Result<RunOutput> {
        let outcome = loop {
            if let Some(outcome) = self.step()? {
                break outcome;
            }
        };
        debug!(
            "run finished: {:?} at t = {:.2} after {} steps ({} progressions, {} infections)",
            outcome, self.time, self.stats.steps, self.stats.progressions, self.stats.infections
        );
        return Ok(RunOutput {
            outcome,
            series: self.series,
            final_states: self.states,
            stats: self.stats,
        });
    }

    /// One Gillespie iteration: check termination, advance time,
    /// apply a single event, repair the rate sums and emit any due
    /// sample. Returns the outcome once a termination condition
    /// holds; the caller may abort between calls at any time.
    pub fn step(&mut self) -> Result<Option<Outcome>> {
        let lambda = self.ledger.lambda();
        if let Some(outcome) = self.termination(lambda) {
            return Ok(Some(outcome));
        }
        self.stats.steps += 1;

        let dt = -(1.0 - self.rng.gen::<Real>()).ln() / lambda;
        self.time += dt;

        let point = self.rng.gen::<Real>() * lambda;
        if point < self.ledger.total_move() {
            self.progression_event(point)?;
            self.stats.progressions += 1;
        } else {
            self.infection_event(point - self.ledger.total_move())?;
            self.stats.infections += 1;
        }
        self.ledger.settle()?;
        self.emit_due_sample()?;
        return Ok(None);
    }

    fn termination(&self, lambda: Real) -> Option<Outcome> {
        if self.stats.steps >= MAX_STEPS {
            return Some(Outcome::Timeout);
        }
        if let Some(day_max) = self.config.day_max() {
            if self.time >= day_max {
                return Some(Outcome::Timeout);
            }
        }
        let recovered = self.compartments.count(self.layout.recovered()) as i64;
        if recovered > 0 && recovered > self.config.n_tot() as i64 - 10 {
            return Some(Outcome::Completed);
        }
        if lambda.abs() < LAMBDA_FLOOR {
            return Some(Outcome::Extinct);
        }
        return None;
    }

    /// Move one agent a stage forward, chosen proportionally to the
    /// per-stage progression mass.
    fn progression_event(&mut self, point: Real) -> Result<()> {
        let stage = search_cumulative(self.ledger.cum_move(), point)
            .ok_or_else(|| SimError::no_candidate("progression stage"))? as Stage;
        let agent = self
            .compartments
            .random_member(stage, &mut self.rng)
            .ok_or_else(|| SimError::no_candidate("progression agent"))?;

        self.compartments.advance(agent, stage);
        self.states[agent as usize] = stage + 1;
        self.ledger.progress(agent, stage);

        let next = stage + 1;
        trace!(target: "gillespie", "t={:.4} progress agent {} to stage {}", self.time, agent, next);
        if next == self.layout.first_infectious() {
            self.activate_emissions(agent, next);
        } else if next == self.layout.recovered() {
            self.silence_emissions(agent, next);
        }
        return Ok(());
    }

    /// An agent crossing into infectiousness starts emitting along
    /// every edge whose far endpoint is still susceptible.
    fn activate_emissions(&mut self, agent: AgentId, stage: Stage) {
        let weight = self.population.infection_weight_of(agent);
        for slot in 0..self.network.degree(agent) {
            let contact = self.network.contact(agent, slot);
            if self.states[contact.peer as usize] == SUSCEPTIBLE {
                self.network.set_rate(agent, slot, weight);
                self.ledger.activate(agent, stage, weight as Real);
            }
        }
    }

    /// A recovering agent withdraws whatever it still emits.
    fn silence_emissions(&mut self, agent: AgentId, stage: Stage) {
        for slot in 0..self.network.degree(agent) {
            let contact = self.network.contact(agent, slot);
            if contact.rate != 0.0 {
                self.ledger.deactivate(agent, stage, contact.rate as Real);
                self.network.set_rate(agent, slot, 0.0);
            }
        }
    }

    /// Infect one susceptible agent, chosen by walking the cumulative
    /// infection mass down to a single edge: stage, then emitting
    /// agent within the stage, then neighbor within the agent's row.
    fn infection_event(&mut self, target: Real) -> Result<()> {
        let cum_inf = self.ledger.cum_inf();
        let stage = search_cumulative(cum_inf, target)
            .ok_or_else(|| SimError::no_candidate("infection stage"))? as Stage;
        let mut acc = if stage > 0 {
            cum_inf[stage as usize - 1]
        } else {
            0.0
        };

        let mut source = None;
        for &agent in self.compartments.members(stage) {
            let share = self.ledger.agent_inf(agent);
            if acc + share > target {
                source = Some(agent);
                break;
            }
            acc += share;
        }
        let source = source.ok_or_else(|| SimError::no_candidate("infecting agent"))?;

        let mut victim = None;
        for contact in self.network.contacts(source) {
            if contact.rate != 0.0 {
                acc += contact.rate as Real;
                if acc > target {
                    victim = Some(contact.peer);
                    break;
                }
            }
        }
        let victim = victim.ok_or_else(|| SimError::no_candidate("infected neighbor"))?;
        debug_assert_eq!(self.states[victim as usize], SUSCEPTIBLE);
        trace!(target: "gillespie", "t={:.4} agent {} infects {}", self.time, source, victim);

        self.states[victim as usize] = 0;
        self.compartments.insert(victim, 0);
        self.ledger.enroll(0);

        // The newly infected agent can no longer be infected: every
        // reciprocal half-edge pointing at it goes quiet, and any
        // infectious holder gives the rate back to the ledger.
        for slot in 0..self.network.degree(victim) {
            let peer = self.network.contact(victim, slot).peer;
            let displaced = self.network.zero_rate_to(peer, victim);
            if displaced != 0.0 {
                let peer_stage = self.states[peer as usize];
                debug_assert!(self.layout.is_infectious(peer_stage));
                self.ledger.deactivate(peer, peer_stage, displaced as Real);
            }
        }
        return Ok(());
    }

    /// Emit at most one sample per iteration once the clock crosses
    /// the next emission tick; every tenth tick also captures a
    /// snapshot and runs the daily test round.
    fn emit_due_sample(&mut self) -> Result<()> {
        if self.config.nts() * self.clicks as Real >= self.time {
            return Ok(());
        }
        let susceptible = self.config.n_tot() as u32 - self.compartments.total();
        self.series
            .record(self.time, susceptible, self.compartments.counts());
        // Catch up past any ticks the time increment skipped, so
        // consecutive records land on distinct ticks.
        self.clicks = (self.time / self.config.nts()).floor() as u64 + 1;
        self.snapshot_counter += 1;

        if self.snapshot_counter >= TICKS_PER_SNAPSHOT {
            self.snapshot_counter = 0;
            if self.config.snapshots() {
                self.series.snapshot(self.time, &self.states);
            }
            if self.config.daily_tests() > 0 {
                let positives = run_daily_tests(
                    self.config.daily_tests(),
                    self.config.detect_prob(),
                    &self.states,
                    &self.layout,
                    &mut self.network,
                    &mut self.ledger,
                    &mut self.rng,
                );
                self.stats.positive_tests.push(positives);
                self.ledger.settle()?;
            }
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coord;
    use crate::network::EdgeKind;

    fn grid_catalog(n: usize) -> CoordinateCatalog {
        let coords = (0..n)
            .map(|i| Coord::new(55.0 + (i / 100) as f32 * 0.01, 12.0 + (i % 100) as f32 * 0.01))
            .collect();
        return CoordinateCatalog::new(coords);
    }

    /// Households of exactly one member: no household edges.
    fn singles() -> HouseholdModel {
        HouseholdModel::single_age(&[1.0]).unwrap()
    }

    /// Households of exactly `k` members.
    fn households_of(k: usize) -> HouseholdModel {
        let mut weights = vec![0.0; k];
        weights[k - 1] = 1.0;
        return HouseholdModel::single_age(&weights).unwrap();
    }

    fn base_cfg(n_tot: usize) -> SimConfig {
        let mut cfg = SimConfig::default();
        cfg.set_n_tot(n_tot);
        cfg.set_n_init(0);
        cfg.set_mu(20.0);
        cfg.set_rho(0.0);
        cfg.set_sigma_mu(0.0);
        cfg.set_sigma_beta(0.0);
        cfg.set_beta(0.01);
        cfg.set_lambda_e(1.0);
        cfg.set_lambda_i(1.0);
        cfg.set_seed(1);
        cfg.set_snapshots(false);
        return cfg;
    }

    #[test]
    fn unseeded_run_is_extinct_at_time_zero() {
        let cfg = base_cfg(1000);
        let engine = Gillespie::prepare(cfg, &grid_catalog(1000), &singles()).unwrap();
        let out = engine.run().unwrap();

        assert_eq!(out.outcome, Outcome::Extinct);
        assert_eq!(out.stats.steps, 0);
        assert!(out.series.is_empty());
        assert!(out.final_states.iter().all(|&s| s == SUSCEPTIBLE));
    }

    #[test]
    fn seeded_run_conserves_population_and_recovers_seeds() {
        let mut cfg = base_cfg(1000);
        cfg.set_n_init(10);
        cfg.set_seed(42);
        let engine = Gillespie::prepare(cfg, &grid_catalog(1000), &singles()).unwrap();
        let layout = engine.layout().clone();
        let out = engine.run().unwrap();

        assert!(out.outcome != Outcome::Timeout);
        assert!(!out.series.is_empty());
        for row in out.series.rows() {
            let total: u32 = row.susceptible + row.states.iter().sum::<u32>();
            assert_eq!(total, 1000);
        }
        let recovered = out
            .final_states
            .iter()
            .filter(|&&s| s == layout.recovered())
            .count();
        assert!(recovered >= 10, "recovered = {}", recovered);
    }

    #[test]
    fn emissions_are_ordered_on_the_tick_grid() {
        let mut cfg = base_cfg(500);
        cfg.set_n_init(10);
        cfg.set_beta(0.05);
        cfg.set_seed(5);
        let engine = Gillespie::prepare(cfg.clone(), &grid_catalog(500), &singles()).unwrap();
        let out = engine.run().unwrap();

        let rows = out.series.rows();
        assert!(rows.len() > 1);
        for pair in rows.windows(2) {
            assert!(pair[1].time > pair[0].time);
            let tick = |t: Real| (t / cfg.nts()).floor() as i64;
            assert!(tick(pair[1].time) >= tick(pair[0].time) + 1);
        }
    }

    #[test]
    fn one_household_burns_through_quickly() {
        // A single fully connected household with fast transitions:
        // nearly everyone is recovered within five simulated days.
        let mut cfg = base_cfg(100);
        cfg.set_n_init(1);
        cfg.set_mu(0.0);
        cfg.set_beta(1.0);
        cfg.set_lambda_e(10.0);
        cfg.set_lambda_i(10.0);
        cfg.set_seed(3);
        let engine = Gillespie::prepare(cfg, &grid_catalog(100), &households_of(100)).unwrap();
        let layout = engine.layout().clone();
        let out = engine.run().unwrap();

        assert_eq!(out.outcome, Outcome::Completed);
        let last = out.series.rows().last().unwrap();
        assert!(last.time <= 5.0, "took {} days", last.time);
        let recovered = out
            .final_states
            .iter()
            .filter(|&&s| s == layout.recovered())
            .count();
        assert!(recovered >= 90);
    }

    #[test]
    fn forced_infectious_seed_passes_the_infection_on() {
        // Two agents, one edge, no recovery: the infection crosses
        // the edge in finite time, then every rate is quiet.
        let mut cfg = base_cfg(2);
        cfg.set_mu(0.0);
        cfg.set_beta(1.0);
        cfg.set_lambda_e(1.0);
        cfg.set_lambda_i(0.0);
        cfg.set_seed(9);
        let mut engine = Gillespie::prepare(cfg, &grid_catalog(2), &households_of(2)).unwrap();
        engine.seed_agent_at(0, engine.layout().first_infectious()).unwrap();
        let out = engine.run().unwrap();

        assert_eq!(out.outcome, Outcome::Extinct);
        assert!(out.final_states[1] != SUSCEPTIBLE);
        assert_eq!(out.stats.infections, 1);
    }

    #[test]
    fn identical_runs_replay_identically() {
        let mut cfg = base_cfg(300);
        cfg.set_n_init(5);
        cfg.set_mu(10.0);
        cfg.set_beta(0.05);
        cfg.set_seed(7);
        cfg.set_day_max(Some(30.0));

        let first = Gillespie::prepare(cfg.clone(), &grid_catalog(300), &singles())
            .unwrap()
            .run()
            .unwrap();
        let second = Gillespie::prepare(cfg, &grid_catalog(300), &singles())
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(first.series.rows(), second.series.rows());
        assert_eq!(first.final_states, second.final_states);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn network_construction_is_deterministic_and_exact() {
        let mut cfg = base_cfg(400);
        cfg.set_mu(12.0);
        cfg.set_seed(13);
        let first = Gillespie::prepare(cfg.clone(), &grid_catalog(400), &singles()).unwrap();
        let second = Gillespie::prepare(cfg, &grid_catalog(400), &singles()).unwrap();

        // ceil(12 * 400 / 2) = 2400 undirected edges.
        assert_eq!(first.network().edge_count(), 2400);
        assert_eq!(first.network().degree_sum(), 4800);
        for agent in 0..400 {
            assert_eq!(first.network().contacts(agent), second.network().contacts(agent));
        }
    }

    #[test]
    fn rate_sums_and_memberships_stay_consistent_while_stepping() {
        let mut cfg = base_cfg(200);
        cfg.set_n_init(10);
        cfg.set_mu(8.0);
        cfg.set_beta(0.2);
        cfg.set_seed(11);
        let mut engine = Gillespie::prepare(cfg, &grid_catalog(200), &singles()).unwrap();

        let mut prev_susceptible = u32::MAX;
        let mut prev_recovered = 0u32;
        for _ in 0..400 {
            if engine.step().unwrap().is_some() {
                break;
            }

            // Count conservation.
            let susceptible =
                engine.states().iter().filter(|&&s| s == SUSCEPTIBLE).count() as u32;
            assert_eq!(susceptible + engine.compartments().total(), 200);

            // Monotone compartments.
            let recovered = engine.compartments().count(engine.layout().recovered());
            assert!(susceptible <= prev_susceptible);
            assert!(recovered >= prev_recovered);
            prev_susceptible = susceptible;
            prev_recovered = recovered;

            // Recomputed progression mass matches the ledger.
            let lambda = engine.ledger().lambda();
            let expected: Real = engine
                .compartments()
                .counts()
                .iter()
                .zip(engine.ledger().move_rates())
                .map(|(&n, &rate)| n as Real * rate)
                .sum();
            let tolerance = 1e-6 * lambda.max(1.0);
            assert!((expected - engine.ledger().total_move()).abs() < tolerance);

            // Recomputed infection mass matches the ledger.
            let mut total_inf = 0.0;
            for agent in 0..200u32 {
                let row: Real = engine
                    .network()
                    .contacts(agent)
                    .iter()
                    .map(|c| c.rate as Real)
                    .sum();
                let maintained = engine.ledger().agent_inf(agent);
                assert!((row - maintained).abs() < 1e-9, "agent {} emission drifted", agent);
                total_inf += row;
            }
            assert!((total_inf - engine.ledger().total_inf()).abs() < tolerance);

            // Every non-susceptible agent is unreachable by infection.
            for victim in 0..200u32 {
                if engine.states()[victim as usize] != SUSCEPTIBLE {
                    for contact in engine.network().contacts(victim) {
                        let back = engine
                            .network()
                            .contacts(contact.peer)
                            .iter()
                            .find(|c| c.peer == victim)
                            .unwrap();
                        assert_eq!(back.rate, 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn day_max_caps_the_run() {
        let mut cfg = base_cfg(300);
        cfg.set_n_init(10);
        cfg.set_beta(0.2);
        cfg.set_day_max(Some(1.0));
        cfg.set_seed(21);
        let out = Gillespie::prepare(cfg, &grid_catalog(300), &singles())
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(out.outcome, Outcome::Timeout);
    }

    #[test]
    fn daily_testing_reports_positive_counts() {
        let mut cfg = base_cfg(300);
        cfg.set_n_init(20);
        cfg.set_mu(10.0);
        cfg.set_beta(0.2);
        cfg.set_daily_tests(100);
        cfg.set_detect_prob(1.0);
        cfg.set_day_max(Some(20.0));
        cfg.set_seed(17);
        let out = Gillespie::prepare(cfg, &grid_catalog(300), &singles())
            .unwrap()
            .run()
            .unwrap();

        assert!(!out.stats.positive_tests.is_empty());
        assert!(out.stats.positive_tests.iter().sum::<u32>() > 0);
    }

    #[test]
    fn snapshots_land_on_every_tenth_tick() {
        let mut cfg = base_cfg(300);
        cfg.set_n_init(10);
        cfg.set_beta(0.1);
        cfg.set_snapshots(true);
        cfg.set_day_max(Some(10.0));
        cfg.set_seed(19);
        let out = Gillespie::prepare(cfg, &grid_catalog(300), &singles())
            .unwrap()
            .run()
            .unwrap();

        let rows = out.series.rows();
        let snapshots = out.series.snapshots();
        assert_eq!(snapshots.len(), rows.len() / 10);
        for (i, snap) in snapshots.iter().enumerate() {
            assert_eq!(snap.time, rows[(i + 1) * 10 - 1].time);
            assert_eq!(snap.states.len(), 300);
        }
    }

    #[test]
    fn household_edges_stay_tagged_through_preparation() {
        let mut cfg = base_cfg(60);
        cfg.set_mu(6.0);
        cfg.set_seed(23);
        let engine = Gillespie::prepare(cfg, &grid_catalog(60), &households_of(3)).unwrap();

        for &(first, size) in engine.population().households() {
            for a in first..first + size {
                for b in first..first + size {
                    if a != b {
                        let found = engine
                            .network()
                            .contacts(a)
                            .iter()
                            .find(|c| c.peer == b)
                            .unwrap();
                        assert_eq!(found.kind, EdgeKind::Household);
                    }
                }
            }
        }
    }
}
