//! Loading and querying persisted tables.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::hashing::HashFunction;
use crate::masking::{MaskFunction, MaskPlan};
use crate::persist::header::{ALGORITHM_CHM, HeaderError, KEY_SIZE_IN_BYTES, TableInfoHeader};
use crate::persist::info_sidecar_path;
use crate::seeds::Seeds;

/// Stable codes describing [`LoadError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum LoadErrorCode {
    /// File I/O failed.
    Io,
    /// The metadata record is malformed.
    Header,
    /// The record describes an algorithm this build does not implement.
    UnsupportedAlgorithm,
    /// The record names an unknown hash function.
    UnknownHashFunction,
    /// The record names an unknown mask function.
    UnknownMaskFunction,
    /// The record declares an unsupported key width.
    UnsupportedKeySize,
    /// The table file length disagrees with the record.
    TableSizeMismatch,
}

impl LoadErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "LOAD_IO",
            Self::Header => "LOAD_HEADER",
            Self::UnsupportedAlgorithm => "LOAD_UNSUPPORTED_ALGORITHM",
            Self::UnknownHashFunction => "LOAD_UNKNOWN_HASH_FUNCTION",
            Self::UnknownMaskFunction => "LOAD_UNKNOWN_MASK_FUNCTION",
            Self::UnsupportedKeySize => "LOAD_UNSUPPORTED_KEY_SIZE",
            Self::TableSizeMismatch => "LOAD_TABLE_SIZE_MISMATCH",
        }
    }
}

impl fmt::Display for LoadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while loading a persisted table.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// File I/O failed.
    #[error("failed to read `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The metadata record is malformed.
    #[error(transparent)]
    Header(#[from] HeaderError),
    /// The record describes an algorithm this build does not implement.
    #[error("unsupported algorithm id {algorithm_id}")]
    UnsupportedAlgorithm {
        /// Identifier found in the record.
        algorithm_id: u32,
    },
    /// The record names an unknown hash function.
    #[error("unknown hash function id {id}")]
    UnknownHashFunction {
        /// Identifier found in the record.
        id: u32,
    },
    /// The record names an unknown mask function.
    #[error("unknown mask function id {id}")]
    UnknownMaskFunction {
        /// Identifier found in the record.
        id: u32,
    },
    /// The record declares an unsupported key width.
    #[error("unsupported key size of {bytes} bytes")]
    UnsupportedKeySize {
        /// Key width found in the record.
        bytes: u32,
    },
    /// The table file length disagrees with the record.
    #[error("table file holds {actual_bytes} bytes but the record expects {expected_bytes}")]
    TableSizeMismatch {
        /// Bytes the record implies.
        expected_bytes: u64,
        /// Bytes actually on disk.
        actual_bytes: u64,
    },
}

impl LoadError {
    /// Retrieve the stable [`LoadErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> LoadErrorCode {
        match self {
            Self::Io { .. } => LoadErrorCode::Io,
            Self::Header(_) => LoadErrorCode::Header,
            Self::UnsupportedAlgorithm { .. } => LoadErrorCode::UnsupportedAlgorithm,
            Self::UnknownHashFunction { .. } => LoadErrorCode::UnknownHashFunction,
            Self::UnknownMaskFunction { .. } => LoadErrorCode::UnknownMaskFunction,
            Self::UnsupportedKeySize { .. } => LoadErrorCode::UnsupportedKeySize,
            Self::TableSizeMismatch { .. } => LoadErrorCode::TableSizeMismatch,
        }
    }
}

/// A loaded perfect-hash table.
///
/// Reconstructs the exact index computation from the metadata record and
/// exposes an [`index`](Self::index) lookup plus a value store sized by
/// the index space, mirroring the insert/lookup surface of the original
/// on-disk consumer.
#[derive(Debug, Clone)]
pub struct PerfectHashTable {
    header: TableInfoHeader,
    hash: HashFunction,
    plan: MaskPlan,
    seeds: Seeds,
    assigned: Vec<u32>,
    values: Vec<u32>,
}

impl PerfectHashTable {
    /// Loads a table and its metadata sidecar from `table_path`.
    ///
    /// # Errors
    /// Returns [`LoadError`] when either artefact is missing, malformed,
    /// or inconsistent with the other.
    pub fn load(table_path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let table_path = table_path.as_ref();
        let info_path = info_sidecar_path(table_path);

        let info_file = File::open(&info_path).map_err(|source| LoadError::Io {
            path: info_path.clone(),
            source,
        })?;
        let header = TableInfoHeader::read_from(&mut BufReader::new(info_file))?;

        if header.algorithm_id != ALGORITHM_CHM {
            return Err(LoadError::UnsupportedAlgorithm {
                algorithm_id: header.algorithm_id,
            });
        }
        let hash = HashFunction::from_id(header.hash_function_id).ok_or(
            LoadError::UnknownHashFunction {
                id: header.hash_function_id,
            },
        )?;
        let mask = MaskFunction::from_id(header.mask_function_id).ok_or(
            LoadError::UnknownMaskFunction {
                id: header.mask_function_id,
            },
        )?;
        if header.key_size_in_bytes != KEY_SIZE_IN_BYTES {
            return Err(LoadError::UnsupportedKeySize {
                bytes: header.key_size_in_bytes,
            });
        }

        let expected_bytes =
            header.number_of_table_elements * u64::from(KEY_SIZE_IN_BYTES);
        let bytes = std::fs::read(table_path).map_err(|source| LoadError::Io {
            path: table_path.to_path_buf(),
            source,
        })?;
        if bytes.len() as u64 != expected_bytes {
            return Err(LoadError::TableSizeMismatch {
                expected_bytes,
                actual_bytes: bytes.len() as u64,
            });
        }

        let assigned = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        // The mask parameters come straight from the record rather than
        // being re-derived, so byte-compatible builds agree exactly.
        let plan = MaskPlan {
            function: mask,
            hash_size: header.hash_size,
            index_size: header.index_size,
            hash_shift: header.hash_shift,
            index_shift: header.index_shift,
            hash_mask: header.hash_mask,
            index_mask: header.index_mask,
            hash_fold: header.hash_fold,
            index_fold: header.index_fold,
            hash_modulus: header.hash_modulus,
            index_modulus: header.index_modulus,
        };
        let seeds = Seeds::new(header.seed1, header.seed2, header.seed3, header.seed4);
        let values = vec![0; header.index_size as usize];

        Ok(Self {
            header,
            hash,
            plan,
            seeds,
            assigned,
            values,
        })
    }

    /// The metadata record the table was loaded with.
    #[must_use]
    pub fn header(&self) -> &TableInfoHeader {
        &self.header
    }

    /// Number of slots in the index space.
    #[must_use]
    pub fn index_size(&self) -> u32 {
        self.plan.index_size
    }

    /// Computes the table index for `key`.
    ///
    /// The result is unique across the key set the table was built from;
    /// other keys map to arbitrary indexes.
    #[must_use]
    pub fn index(&self, key: u32) -> u32 {
        let (low, high) = self.hash.hash(key, self.seeds);
        let vertex1 = self.assigned[self.plan.mask_hash(low) as usize];
        let vertex2 = self.assigned[self.plan.mask_hash(high) as usize];
        self.plan.mask_index(i64::from(vertex1) + i64::from(vertex2))
    }

    /// Stores `value` in the slot addressed by `key`.
    pub fn insert(&mut self, key: u32, value: u32) {
        let index = self.index(key);
        self.values[index as usize] = value;
    }

    /// Returns the value stored for `key`.
    #[must_use]
    pub fn lookup(&self, key: u32) -> u32 {
        self.values[self.index(key) as usize]
    }
}
