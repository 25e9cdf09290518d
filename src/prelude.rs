pub use crate::config::SimConfig;
pub use crate::epidemic::{CompartmentTable, RateLedger, StageLayout, SUSCEPTIBLE};
pub use crate::error::{Outcome, Result, SimError};
pub use crate::geo::{haversine, Coord, CoordinateCatalog};
pub use crate::network::{ContactNetwork, EdgeKind};
pub use crate::population::Population;
pub use crate::sim::{Gillespie, NetworkReport, RunOutput, RunReport};

/// Scalar used for all rate arithmetic.
pub type Real = f64;
/// Dense agent handle, 0..N-1.
pub type AgentId = u32;
/// Age-bucket index.
pub type Age = u8;
/// Disease state: -1 is susceptible, 0.. are the staged compartments.
pub type Stage = i8;
