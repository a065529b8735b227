//! Injectable randomness
//!
//! Every random decision in the engine goes through [`RandomSource`], so a fixed seed
//! or a scripted sequence reproduces a session exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform floats in `[0, 1)`
pub trait RandomSource {
    /// Next uniform value in `[0, 1)`
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `0..len`; `len` must be non-zero
    fn pick_index(&mut self, len: usize) -> usize {
        let index = (self.next_f64() * len as f64) as usize;
        index.min(len.saturating_sub(1))
    }
}

/// Fisher-Yates shuffle in place
pub fn shuffle<T, R: RandomSource + ?Sized>(random: &mut R, values: &mut [T]) {
    for upper in (1..values.len()).rev() {
        let j = random.pick_index(upper + 1);
        values.swap(upper, j);
    }
}

/// `StdRng` backed source
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Reproducible sequence from a seed
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Seeded from the operating system
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays a fixed list of values, cycling when it runs out
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    /// Values outside `[0, 1)` are clamped into range
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let values: Vec<f64> =
            values.into_iter().map(|v| v.clamp(0.0, 1.0 - f64::EPSILON)).collect();
        Self { values, cursor: 0 }
    }

    /// Always returns the same value
    pub fn constant(value: f64) -> Self {
        Self::new([value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}
