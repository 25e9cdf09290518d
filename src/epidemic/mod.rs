mod compartments;
mod rates;
mod seeding;
mod stages;

pub use compartments::CompartmentTable;
pub use rates::RateLedger;
pub use seeding::{seed_infections, SeedStrategy};
pub use stages::{StageLayout, SUSCEPTIBLE};
