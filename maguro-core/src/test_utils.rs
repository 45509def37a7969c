//! Shared helpers for in-crate tests.

use std::collections::HashSet;

use rand::{RngCore, SeedableRng, rngs::SmallRng};

use crate::keysource::KeySource;

/// An in-memory key source.
pub(crate) struct VecKeys {
    name: String,
    keys: Vec<u32>,
}

impl VecKeys {
    pub(crate) fn new(name: &str, keys: Vec<u32>) -> Self {
        Self {
            name: name.to_owned(),
            keys,
        }
    }
}

impl KeySource for VecKeys {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self) -> &[u32] {
        &self.keys
    }
}

/// Generates `count` distinct keys deterministically from `seed`.
pub(crate) fn unique_keys(seed: u64, count: usize) -> Vec<u32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(count);
    let mut keys = Vec::with_capacity(count);
    while keys.len() < count {
        let key = rng.next_u32();
        if seen.insert(key) {
            keys.push(key);
        }
    }
    keys
}
