use std::collections::HashSet;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::EndpointConfig;

/// Picks a reachable endpoint out of a candidate set.
///
/// Policy: choose uniformly at random among *all* configs first, for load
/// spreading; if the chosen one is already marked unavailable, fall back
/// to a linear scan for the first available config, which guarantees
/// progress where random-with-rejection could spin. Returns `None` when
/// every config is unavailable.
///
/// The selector has no side effects; marking endpoints unavailable is the
/// connection's job.
pub struct EndpointSelector {
    rng: SmallRng,
}

impl EndpointSelector {
    /// Creates a selector seeded from system entropy.
    pub fn new() -> Self {
        EndpointSelector {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Creates a selector with a fixed seed, for deterministic tests.
    pub fn with_seed(seed: u64) -> Self {
        EndpointSelector {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Picks the index of an available config, or `None` if all are
    /// unavailable.
    pub fn pick(
        &mut self,
        configs: &[EndpointConfig],
        unavailable: &HashSet<usize>,
    ) -> Option<usize> {
        if configs.is_empty() {
            return None;
        }

        let candidate = self.rng.gen_range(0..configs.len());
        if !unavailable.contains(&candidate) {
            return Some(candidate);
        }

        (0..configs.len()).find(|index| !unavailable.contains(index))
    }
}

impl Default for EndpointSelector {
    fn default() -> Self {
        Self::new()
    }
}
