#![forbid(unsafe_code)]

//! Deterministic random source for constructing case inputs.
//!
//! Every generator built from the same seed yields the same stream on every
//! platform, so registries built from it regenerate identical corpora.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

pub const DEFAULT_SEED: u64 = 91_825_479_412;

pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RandomError {
    #[error("bound must be positive")]
    ZeroBound,
    #[error("charset must not be empty")]
    EmptyCharset,
}

#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `0..bound`.
    pub fn next_int(&mut self, bound: usize) -> Result<usize, RandomError> {
        if bound == 0 {
            return Err(RandomError::ZeroBound);
        }
        Ok(self.rng.gen_range(0..bound))
    }

    /// Uniform integer in `low..=high`, with the bounds swapped if needed.
    pub fn int_in(&mut self, low: i64, high: i64) -> i64 {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.rng.gen_range(low..=high)
    }

    pub fn random_string(&mut self, length: usize, charset: &str) -> Result<String, RandomError> {
        let chars: Vec<char> = charset.chars().collect();
        if chars.is_empty() {
            return Err(RandomError::EmptyCharset);
        }
        Ok((0..length)
            .map(|_| chars[self.rng.gen_range(0..chars.len())])
            .collect())
    }

    /// Lowercase ASCII string of `length` characters.
    pub fn string(&mut self, length: usize) -> String {
        let charset = LOWERCASE.as_bytes();
        (0..length)
            .map(|_| char::from(charset[self.rng.gen_range(0..charset.len())]))
            .collect()
    }

    /// Fisher-Yates over `length` positions, reporting each swap.
    pub fn shuffle(&mut self, length: usize, mut swap: impl FnMut(usize, usize)) {
        for i in (1..length).rev() {
            let j = self.rng.gen_range(0..=i);
            swap(i, j);
        }
    }

    pub fn shuffle_slice<T>(&mut self, items: &mut [T]) {
        let len = items.len();
        self.shuffle(len, |i, j| items.swap(i, j));
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}
