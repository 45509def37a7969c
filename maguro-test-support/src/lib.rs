//! Shared test utilities used across maguro crates.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use rand::{RngCore, SeedableRng, rngs::SmallRng};

/// Generates `count` distinct 32-bit keys deterministically from `seed`.
///
/// # Examples
/// ```
/// use maguro_test_support::unique_keys;
///
/// let keys = unique_keys(7, 100);
/// assert_eq!(keys.len(), 100);
/// assert_eq!(keys, unique_keys(7, 100));
/// ```
#[must_use]
pub fn unique_keys(seed: u64, count: usize) -> Vec<u32> {
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

/// Writes `keys` to `path` as a raw little-endian u32 key file.
///
/// # Errors
/// Propagates any I/O error from creating or writing the file.
pub fn write_key_file(path: &Path, keys: &[u32]) -> io::Result<()> {
    let mut file = File::create(path)?;
    for key in keys {
        file.write_all(&key.to_le_bytes())?;
    }
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn generated_keys_are_distinct() {
        let keys = unique_keys(42, 10_000);
        let set: HashSet<u32> = keys.iter().copied().collect();
        assert_eq!(set.len(), keys.len());
    }

    #[test]
    fn key_files_hold_little_endian_words() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("keys.bin");
        write_key_file(&path, &[0x0102_0304, 5]).expect("write keys");

        let bytes = std::fs::read(&path).expect("read back");
        assert_eq!(bytes, vec![0x04, 0x03, 0x02, 0x01, 0x05, 0x00, 0x00, 0x00]);
    }
}
