use crate::epidemic::StageLayout;
use crate::prelude::{Real, Stage};
use serde::{Deserialize, Serialize};

/// One emitted record: simulated time, the susceptible count and the
/// occupancy of every staged compartment. The susceptible column is
/// carried explicitly so each row sums to the population size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub time: Real,
    pub susceptible: u32,
    pub states: Vec<u32>,
}

/// Full per-agent state vector captured at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub time: Real,
    pub states: Vec<Stage>,
}

/// Compartment counts sampled on the emission grid, plus the coarser
/// per-agent snapshots used for animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    rows: Vec<SampleRow>,
    snapshots: Vec<StateSnapshot>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[SampleRow] {
        &self.rows
    }

    pub fn snapshots(&self) -> &[StateSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn record(&mut self, time: Real, susceptible: u32, states: &[u32]) {
        self.rows.push(SampleRow {
            time,
            susceptible,
            states: states.to_vec(),
        });
    }

    pub fn snapshot(&mut self, time: Real, states: &[Stage]) {
        self.snapshots.push(StateSnapshot {
            time,
            states: states.to_vec(),
        });
    }

    /// Column header matching `render_csv`: one column per exposed
    /// and infectious sub-stage, plus susceptible and recovered.
    pub fn csv_header(layout: &StageLayout) -> String {
        let mut head = String::from("time,S");
        for i in 1..=layout.n_exposed() {
            head.push_str(&format!(",E{}", i));
        }
        for i in 1..=layout.n_infectious() {
            head.push_str(&format!(",I{}", i));
        }
        head.push_str(",R");
        return head;
    }

    /// Render the emitted rows as CSV.
    pub fn render_csv(&self, layout: &StageLayout) -> String {
        let mut data = Self::csv_header(layout);
        for row in &self.rows {
            data.push('\n');
            data.push_str(&format!("{},{}", row.time, row.susceptible));
            for &count in &row.states {
                data.push_str(&format!(",{}", count));
            }
        }
        return data;
    }
}
