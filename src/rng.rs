//! Simulation randomness.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// The scheduler's random source.
///
/// Reseeded from the OS once per frame unless constructed with a fixed seed,
/// in which case reseeding is skipped and runs are reproducible. Only the
/// pin conflict resolver and the dynamic-reorder pass draw from it;
/// primitive evaluators never do.
#[derive(Debug, Clone)]
pub struct FrameRng {
    rng: Xoshiro256StarStar,
    deterministic: bool,
}

impl FrameRng {
    /// An OS-seeded source that reseeds every frame.
    pub fn from_entropy() -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(rand::random()),
            deterministic: false,
        }
    }

    /// A fixed-seed source for reproducible runs; [`FrameRng::reseed`]
    /// becomes a no-op.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            deterministic: true,
        }
    }

    /// Per-frame reseed from the OS; skipped in deterministic mode.
    pub fn reseed(&mut self) {
        if !self.deterministic {
            self.rng = Xoshiro256StarStar::seed_from_u64(rand::random());
        }
    }

    /// A uniform random bool.
    pub fn coin(&mut self) -> bool {
        self.rng.gen()
    }

    /// A uniform index in `[0, n)`.
    pub fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// A uniform 32-bit word.
    pub fn word(&mut self) -> u32 {
        self.rng.gen()
    }
}
