//! Injected randomness for pacing jitter and identity rotation
//!
//! One `RandomSource` is shared (cloned) by the components of a service.
//! Seeding it makes jitter and identity choices reproducible in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Cloneable handle to a seedable random generator
#[derive(Clone)]
pub struct RandomSource {
    rng: Arc<Mutex<StdRng>>,
}

impl RandomSource {
    /// Deterministic source for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Source seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Seeded when a seed is configured, entropy otherwise
    pub fn from_config(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Uniform value in `0..=max`
    pub fn up_to(&self, max: u64) -> u64 {
        self.with_rng(|rng| rng.gen_range(0..=max))
    }

    /// Uniform index in `0..len`; `len` must be non-zero
    pub fn index(&self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.with_rng(|rng| rng.gen_range(0..len.max(1)))
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A panic while holding the lock cannot leave StdRng in an invalid state
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}
