//! Memory-mapped key-file provider.
//!
//! A key file is a raw array of little-endian 32-bit integers with no
//! header. On little-endian hosts the file is memory-mapped and exposed
//! to the solver zero-copy; big-endian hosts decode into an owned buffer
//! instead, so [`KeySource::keys`] always observes native-order values.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use maguro_core::KeySource;
use memmap2::Mmap;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a key file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeysProviderError {
    /// Opening or mapping the file failed.
    #[error("failed to open key file `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The file length is not a whole number of 32-bit keys.
    #[error("key file `{path}` holds {bytes} bytes, which is not a multiple of 4")]
    InvalidLength {
        /// Path of the malformed file.
        path: PathBuf,
        /// Observed file length.
        bytes: u64,
    },
}

#[derive(Debug)]
enum Storage {
    /// Zero-copy mapping; only constructed on little-endian hosts where
    /// the on-disk layout matches native order.
    Mapped(Mmap),
    /// Decoded copy for big-endian hosts (and empty files).
    Owned(Vec<u32>),
}

/// A key file exposed as a [`KeySource`].
///
/// # Examples
/// ```no_run
/// use maguro_core::KeySource;
/// use maguro_providers_keys::MappedKeys;
///
/// let keys = MappedKeys::try_from_path("corpus", "corpus.keys".as_ref())?;
/// println!("{} keys from {}", keys.len(), keys.name());
/// # Ok::<(), maguro_providers_keys::KeysProviderError>(())
/// ```
#[derive(Debug)]
pub struct MappedKeys {
    name: String,
    storage: Storage,
}

impl MappedKeys {
    /// Maps the key file at `path`.
    ///
    /// # Errors
    /// Returns [`KeysProviderError::Io`] when the file cannot be opened
    /// or mapped and [`KeysProviderError::InvalidLength`] when its length
    /// is not a multiple of four bytes.
    pub fn try_from_path(
        name: impl Into<String>,
        path: &Path,
    ) -> Result<Self, KeysProviderError> {
        let file = File::open(path).map_err(|source| KeysProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bytes = file
            .metadata()
            .map_err(|source| KeysProviderError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if bytes % 4 != 0 {
            return Err(KeysProviderError::InvalidLength {
                path: path.to_path_buf(),
                bytes,
            });
        }

        let name = name.into();
        if bytes == 0 {
            return Ok(Self {
                name,
                storage: Storage::Owned(Vec::new()),
            });
        }

        // SAFETY: the mapping is read-only and lives as long as `self`;
        // concurrent truncation of the underlying file is the caller's
        // responsibility, as with any mapped input.
        let mapping = unsafe { Mmap::map(&file) }.map_err(|source| KeysProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes, "key file mapped");

        let storage = if cfg!(target_endian = "little") {
            Storage::Mapped(mapping)
        } else {
            let decoded = mapping
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();
            Storage::Owned(decoded)
        };

        Ok(Self { name, storage })
    }
}

impl KeySource for MappedKeys {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self) -> &[u32] {
        match &self.storage {
            Storage::Mapped(mapping) => {
                // SAFETY: the mapping is page-aligned (so u32-aligned),
                // its length is a verified multiple of four, and this arm
                // is only reachable on little-endian hosts where the
                // on-disk layout equals native order.
                unsafe {
                    std::slice::from_raw_parts(mapping.as_ptr().cast::<u32>(), mapping.len() / 4)
                }
            }
            Storage::Owned(keys) => keys,
        }
    }
}
