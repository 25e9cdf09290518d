mod stats;

pub use stats::{Stats, StatsAcc};
