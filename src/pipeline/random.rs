use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the probabilistic choices made along the reply pipeline.
///
/// Production code uses [`ThreadRandom`]; tests thread a [`SeededRandom`] or a
/// [`FixedRandom`] through the same seams to get reproducible output.
pub trait RandomSource: Send {
    /// Uniform sample in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Uniform index in `0..len`; `len` must be non-zero.
    fn below(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }

    /// Uniform jitter in `0..=range_ms`.
    fn jitter_ms(&mut self, range_ms: u64) -> u64 {
        if range_ms == 0 {
            return 0;
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jitter = (self.next_f64() * (range_ms + 1) as f64) as u64;
        jitter.min(range_ms)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Always yields the same sample. `FixedRandom(0.99)` fails every gate below
/// 99%, `FixedRandom(0.0)` passes every non-zero gate and picks first items.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_f64(&mut self) -> f64 {
        self.0.clamp(0.0, 0.999_999)
    }
}
