// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Random number sources
//!
//! Generators receive their randomness explicitly so a run can be replayed
//! from a seed.

use std::sync::{Arc, Mutex};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Uniform integer draws
pub trait RandomSource: Send {
    /// Draw uniformly from `lower..=upper`; reversed bounds are swapped
    fn draw(&mut self, lower: i64, upper: i64) -> i64;
}

fn ordered(lower: i64, upper: i64) -> (i64, i64) {
    if lower <= upper {
        (lower, upper)
    } else {
        (upper, lower)
    }
}

/// Random source shared between a runner and the generators it builds
pub type SharedRandom = Arc<Mutex<Box<dyn RandomSource>>>;

/// Wrap a source for sharing
pub fn shared<R: RandomSource + 'static>(source: R) -> SharedRandom {
    let boxed: Box<dyn RandomSource> = Box::new(source);
    Arc::new(Mutex::new(boxed))
}

/// Draw from a shared source
pub fn draw(source: &SharedRandom, lower: i64, upper: i64) -> i64 {
    let mut guard = source.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.draw(lower, upper)
}

/// Reproducible source backed by ChaCha8
pub struct SeededRandom {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn draw(&mut self, lower: i64, upper: i64) -> i64 {
        let (lower, upper) = ordered(lower, upper);
        self.rng.random_range(lower..=upper)
    }
}

/// Unseeded source using the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&mut self, lower: i64, upper: i64) -> i64 {
        let (lower, upper) = ordered(lower, upper);
        rand::rng().random_range(lower..=upper)
    }
}

/// Replays a fixed list of values, cycling when it runs out
///
/// Values are clamped into the requested range.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<i64>,
    position: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<i64>) -> Self {
        Self {
            values,
            position: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn draw(&mut self, lower: i64, upper: i64) -> i64 {
        if self.values.is_empty() {
            return lower;
        }
        let (lower, upper) = ordered(lower, upper);
        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value.clamp(lower, upper)
    }
}
