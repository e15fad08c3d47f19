// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Probabilistic sampler.
//!
//! The RNG is a component owned by each processor instance rather than a
//! process-wide global, so tests can seed it for reproducible verdicts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Keep/drop coin flipper over a configured rate.
pub struct Sampler {
    rng: Mutex<StdRng>,
}

impl Sampler {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sampler for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Keep with probability `rate` (0.0 never, 1.0 always).
    pub fn sample(&self, rate: f64) -> bool {
        if rate >= 1.0 {
            return true;
        }
        if rate <= 0.0 {
            return false;
        }
        self.rng.lock().unwrap().gen::<f64>() < rate
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}
