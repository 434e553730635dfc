//! Seedable random source shared by the pipelines (discovery sampling, synthetic receipt ids).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Mutex;

/// Thread-safe wrapper around a ChaCha8 generator. Seed it for reproducible runs.
pub struct RandomSource {
    inner: Mutex<ChaCha8Rng>,
}

impl RandomSource {
    /// Deterministic source: the same seed yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Source seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }

    /// True with probability `p` (clamped to 0..=1). `p <= 0` never draws, `p >= 1` always accepts.
    pub fn chance(&self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.with_rng(|rng| rng.gen::<f64>() < p)
    }

    /// Uniform integer in `low..=high`.
    pub fn between(&self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.with_rng(|rng| rng.gen_range(low..=high))
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        // a poisoned lock still holds a usable generator
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard)
    }
}

impl std::fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomSource").finish_non_exhaustive()
    }
}
