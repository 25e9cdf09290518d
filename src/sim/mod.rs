mod engine;
mod report;
mod sentinel;
mod tracker;

pub use engine::{Gillespie, RunOutput, RunStats};
pub use report::{NetworkReport, RunReport};
pub use sentinel::run_daily_tests;
pub use tracker::{SampleRow, StateSnapshot, TimeSeries};
