use crate::prelude::{Real, Stage};

/// Susceptible agents sit outside the staged compartments.
pub const SUSCEPTIBLE: Stage = -1;

/// Staged compartment layout: E non-infectious exposed sub-stages,
/// then I infectious sub-stages, then the terminal recovered state.
/// Progression is strictly forward; the exit rate of a stage depends
/// only on which block it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StageLayout {
    n_exposed: usize,
    n_infectious: usize,
    move_rates: Vec<Real>,
}

impl StageLayout {
    pub fn new(n_exposed: usize, n_infectious: usize, lambda_e: Real, lambda_i: Real) -> Self {
        debug_assert!(n_exposed >= 1 && n_infectious >= 1);
        let mut move_rates = vec![lambda_e; n_exposed];
        move_rates.extend(std::iter::repeat(lambda_i).take(n_infectious));
        move_rates.push(0.0);
        StageLayout {
            n_exposed,
            n_infectious,
            move_rates,
        }
    }

    /// Number of staged compartments, recovered included.
    pub fn n_states(&self) -> usize {
        self.n_exposed + self.n_infectious + 1
    }

    pub fn n_exposed(&self) -> usize {
        self.n_exposed
    }

    pub fn n_infectious(&self) -> usize {
        self.n_infectious
    }

    /// First infectious stage; crossing into it activates outgoing
    /// edge rates.
    pub fn first_infectious(&self) -> Stage {
        self.n_exposed as Stage
    }

    /// Terminal stage.
    pub fn recovered(&self) -> Stage {
        (self.n_exposed + self.n_infectious) as Stage
    }

    pub fn is_exposed(&self, stage: Stage) -> bool {
        stage >= 0 && stage < self.first_infectious()
    }

    pub fn is_infectious(&self, stage: Stage) -> bool {
        stage >= self.first_infectious() && stage < self.recovered()
    }

    /// Exit rate of a stage: lambda_E in the exposed block, lambda_I
    /// in the infectious block, zero for recovered.
    #[inline]
    pub fn move_rate(&self, stage: Stage) -> Real {
        self.move_rates[stage as usize]
    }

    pub fn move_rates(&self) -> &[Real] {
        &self.move_rates
    }
}
