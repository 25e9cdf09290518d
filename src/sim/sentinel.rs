use crate::epidemic::{RateLedger, StageLayout};
use crate::network::{ContactNetwork, EdgeKind};
use crate::prelude::{AgentId, Real, Stage};
use rand::Rng;

/// One day's worth of random testing. Agents are drawn uniformly
/// with replacement; an infectious draw is detected with probability
/// `detect_prob`, and a detected agent has every active non-household
/// outgoing rate withdrawn through the usual neutralization path.
/// Returns the number of positive tests.
pub fn run_daily_tests<R: Rng>(
    n_tests: usize,
    detect_prob: Real,
    states: &[Stage],
    layout: &StageLayout,
    network: &mut ContactNetwork,
    ledger: &mut RateLedger,
    rng: &mut R,
) -> u32 {
    let n_tot = states.len();
    let mut positives = 0u32;

    for _ in 0..n_tests {
        let agent = rng.gen_range(0..n_tot) as AgentId;
        let stage = states[agent as usize];
        if !layout.is_infectious(stage) || rng.gen::<Real>() >= detect_prob {
            continue;
        }
        positives += 1;

        for slot in 0..network.degree(agent) {
            let contact = network.contact(agent, slot);
            if contact.kind != EdgeKind::Household && contact.rate != 0.0 {
                ledger.deactivate(agent, stage, contact.rate as Real);
                network.set_rate(agent, slot, 0.0);
            }
        }
    }
    return positives;
}
