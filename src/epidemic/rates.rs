use crate::error::{Result, SimError};
use crate::prelude::{AgentId, Real, Stage};

/// Negative drift tolerated on the two totals before the run aborts.
const DRIFT_WINDOW: Real = 1e-3;

/// Cumulative-rate bookkeeping for the event loop. Every mutation of
/// disease state or edge rate goes through this struct before the
/// next event is sampled, so the prefix tables always agree with the
/// per-agent data:
///
/// - `total_move` is the sum over agents of their stage exit rate;
/// - `total_inf` is the sum over infectious agents of their current
///   outgoing edge rates;
/// - `cum_move[s]` / `cum_inf[s]` hold those sums restricted to
///   stages `<= s`, used to locate the source stage of an event;
/// - `agent_inf[a]` is agent a's share of `total_inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLedger {
    total_move: Real,
    total_inf: Real,
    cum_move: Vec<Real>,
    cum_inf: Vec<Real>,
    agent_inf: Vec<Real>,
    move_rates: Vec<Real>,
}

impl RateLedger {
    pub fn new(move_rates: Vec<Real>, n_agents: usize) -> Self {
        let n_states = move_rates.len();
        RateLedger {
            total_move: 0.0,
            total_inf: 0.0,
            cum_move: vec![0.0; n_states],
            cum_inf: vec![0.0; n_states],
            agent_inf: vec![0.0; n_agents],
            move_rates,
        }
    }

    pub fn total_move(&self) -> Real {
        self.total_move
    }

    pub fn total_inf(&self) -> Real {
        self.total_inf
    }

    /// Total event rate.
    pub fn lambda(&self) -> Real {
        self.total_move + self.total_inf
    }

    pub fn cum_move(&self) -> &[Real] {
        &self.cum_move
    }

    pub fn cum_inf(&self) -> &[Real] {
        &self.cum_inf
    }

    #[inline]
    pub fn agent_inf(&self, agent: AgentId) -> Real {
        self.agent_inf[agent as usize]
    }

    pub fn move_rates(&self) -> &[Real] {
        &self.move_rates
    }

    /// An agent enters `stage` from susceptible (seeding or a fresh
    /// infection).
    pub fn enroll(&mut self, stage: Stage) {
        let rate = self.move_rates[stage as usize];
        self.total_move += rate;
        for entry in self.cum_move[stage as usize..].iter_mut() {
            *entry += rate;
        }
    }

    /// An agent progresses from `from` to `from + 1`. Its infection
    /// emission, if any, moves one stage bucket up.
    pub fn progress(&mut self, agent: AgentId, from: Stage) {
        let outgoing = self.move_rates[from as usize];
        let incoming = self.move_rates[from as usize + 1];

        self.total_move += incoming - outgoing;
        self.cum_move[from as usize] -= outgoing;
        for entry in self.cum_move[from as usize + 1..].iter_mut() {
            *entry += incoming - outgoing;
        }
        self.cum_inf[from as usize] -= self.agent_inf[agent as usize];
    }

    /// A new outgoing edge rate becomes active for an infectious
    /// agent currently in `stage`.
    pub fn activate(&mut self, agent: AgentId, stage: Stage, rate: Real) {
        self.total_inf += rate;
        self.agent_inf[agent as usize] += rate;
        for entry in self.cum_inf[stage as usize..].iter_mut() {
            *entry += rate;
        }
    }

    /// An active edge rate of an agent in `stage` is withdrawn
    /// (neutralization, recovery, or a positive test).
    pub fn deactivate(&mut self, agent: AgentId, stage: Stage, rate: Real) {
        self.total_inf -= rate;
        self.agent_inf[agent as usize] -= rate;
        for entry in self.cum_inf[stage as usize..].iter_mut() {
            *entry -= rate;
        }
    }

    /// Clamp rounding drift on the totals. Noise inside the window is
    /// zeroed silently; anything below it means the bookkeeping has
    /// diverged and the run must abort.
    pub fn settle(&mut self) -> Result<()> {
        if self.total_move < 0.0 {
            if self.total_move <= -DRIFT_WINDOW {
                return Err(SimError::InvariantViolation(format!(
                    "total progression rate diverged: {}",
                    self.total_move
                )));
            }
            self.total_move = 0.0;
        }
        if self.total_inf < 0.0 {
            if self.total_inf <= -DRIFT_WINDOW {
                return Err(SimError::InvariantViolation(format!(
                    "total infection rate diverged: {}",
                    self.total_inf
                )));
            }
            self.total_inf = 0.0;
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn ledger() -> RateLedger {
        // Two exposed stages at rate 1.0, two infectious at 0.5.
        RateLedger::new(vec![1.0, 1.0, 0.5, 0.5, 0.0], 4)
    }

    #[test]
    fn enroll_accumulates_move_mass() {
        let mut led = ledger();
        led.enroll(0);
        led.enroll(0);
        led.enroll(1);
        assert_approx_eq!(led.total_move(), 3.0, 1e-12);
        assert_approx_eq!(led.cum_move()[0], 2.0, 1e-12);
        assert_approx_eq!(led.cum_move()[1], 3.0, 1e-12);
        assert_approx_eq!(led.cum_move()[4], 3.0, 1e-12);
    }

    #[test]
    fn progress_shifts_mass_between_blocks() {
        let mut led = ledger();
        led.enroll(1);
        led.progress(0, 1);
        // Stage 1 (rate 1.0) emptied into stage 2 (rate 0.5).
        assert_approx_eq!(led.total_move(), 0.5, 1e-12);
        assert_approx_eq!(led.cum_move()[0], 0.0, 1e-12);
        assert_approx_eq!(led.cum_move()[1], 0.0, 1e-12);
        assert_approx_eq!(led.cum_move()[2], 0.5, 1e-12);
    }

    #[test]
    fn activate_deactivate_roundtrip() {
        let mut led = ledger();
        led.activate(2, 2, 0.25);
        led.activate(2, 2, 0.25);
        assert_approx_eq!(led.total_inf(), 0.5, 1e-12);
        assert_approx_eq!(led.agent_inf(2), 0.5, 1e-12);
        assert_approx_eq!(led.cum_inf()[1], 0.0, 1e-12);
        assert_approx_eq!(led.cum_inf()[2], 0.5, 1e-12);
        assert_approx_eq!(led.cum_inf()[4], 0.5, 1e-12);

        led.deactivate(2, 2, 0.5);
        assert_approx_eq!(led.total_inf(), 0.0, 1e-12);
        assert_approx_eq!(led.agent_inf(2), 0.0, 1e-12);
        assert_approx_eq!(led.cum_inf()[4], 0.0, 1e-12);
    }

    #[test]
    fn emission_bucket_follows_progression() {
        let mut led = ledger();
        led.enroll(2);
        led.activate(1, 2, 0.4);
        led.progress(1, 2);
        // The emission moved from bucket 2 to bucket 3.
        assert_approx_eq!(led.cum_inf()[2], 0.0, 1e-12);
        assert_approx_eq!(led.cum_inf()[3], 0.4, 1e-12);
        assert_approx_eq!(led.total_inf(), 0.4, 1e-12);
    }

    #[test]
    fn settle_clamps_small_drift_only() {
        let mut led = ledger();
        led.total_move = -1e-6;
        led.total_inf = -1e-9;
        led.settle().unwrap();
        assert_eq!(led.total_move(), 0.0);
        assert_eq!(led.total_inf(), 0.0);

        led.total_inf = -0.01;
        match led.settle() {
            Err(SimError::InvariantViolation(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
