//! Benchmark support for the maguro builder.

use maguro_core::KeySource;
use maguro_test_support::unique_keys;

/// A deterministic in-memory key corpus for benchmarking.
pub struct BenchKeys {
    name: String,
    keys: Vec<u32>,
}

impl BenchKeys {
    /// Generates `count` distinct keys from a fixed seed so runs compare
    /// like for like.
    #[must_use]
    pub fn generate(name: &str, count: usize) -> Self {
        Self {
            name: name.to_owned(),
            keys: unique_keys(0xB0A7_5EED, count),
        }
    }
}

impl KeySource for BenchKeys {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self) -> &[u32] {
        &self.keys
    }
}
