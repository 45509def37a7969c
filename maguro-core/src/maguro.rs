//! Build orchestration entry point.
//!
//! Provides the [`Maguro`] runtime handle: input validation, worker-width
//! resolution, and the hand-off into the parallel solver.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::{
    Result,
    error::MaguroError,
    hashing::HashFunction,
    keysource::KeySource,
    masking::{MAXIMUM_KEYS, MaskFunction},
    result::BuildReport,
    solver::{self, BuildRequest},
};

/// Entry point for building perfect-hash tables.
///
/// # Examples
/// ```no_run
/// use maguro_core::{KeySource, MaguroBuilder};
///
/// struct Inline(Vec<u32>);
/// impl KeySource for Inline {
///     fn name(&self) -> &str { "inline" }
///     fn keys(&self) -> &[u32] { &self.0 }
/// }
///
/// let maguro = MaguroBuilder::new().build()?;
/// let report = maguro.build(&Inline(vec![1, 2, 3]), "keys.pht")?;
/// assert_eq!(report.solutions_found(), 1);
/// # Ok::<(), maguro_core::MaguroError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Maguro {
    hash_function: HashFunction,
    mask_function: MaskFunction,
    requested_table_elements: Option<u32>,
    max_concurrency: Option<NonZeroUsize>,
    resize_threshold: u64,
    resize_limit: u32,
}

impl Maguro {
    pub(crate) fn new(
        hash_function: HashFunction,
        mask_function: MaskFunction,
        requested_table_elements: Option<u32>,
        max_concurrency: Option<NonZeroUsize>,
        resize_threshold: u64,
        resize_limit: u32,
    ) -> Self {
        Self {
            hash_function,
            mask_function,
            requested_table_elements,
            max_concurrency,
            resize_threshold,
            resize_limit,
        }
    }

    /// Returns the configured hash function.
    #[must_use]
    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// Returns the configured masking strategy.
    #[must_use]
    pub fn mask_function(&self) -> MaskFunction {
        self.mask_function
    }

    /// Returns the requested initial vertex count, if any.
    #[must_use]
    pub fn requested_table_elements(&self) -> Option<u32> {
        self.requested_table_elements
    }

    /// Returns the resize threshold in attempts.
    #[must_use]
    pub fn resize_threshold(&self) -> u64 {
        self.resize_threshold
    }

    /// Returns the resize limit.
    #[must_use]
    pub fn resize_limit(&self) -> u32 {
        self.resize_limit
    }

    /// Resolves the worker width used for a build.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.map_or_else(
            || {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            },
            NonZeroUsize::get,
        )
    }

    /// Builds a perfect-hash table for `source`, persisting the table to
    /// `table_path` and the metadata record to the `.info` sidecar.
    ///
    /// # Errors
    /// Returns [`MaguroError::EmptySource`] for an empty key set,
    /// [`MaguroError::TooManyKeys`] beyond the addressable edge space,
    /// resource errors from buffer or file handling, and
    /// [`MaguroError::ResizeLimitExhausted`] when the resize budget runs
    /// out without a solution.
    pub fn build<K>(&self, source: &K, table_path: impl AsRef<Path>) -> Result<BuildReport>
    where
        K: KeySource + Sync,
    {
        self.build_at(source, table_path.as_ref())
    }

    #[instrument(
        name = "core.build",
        err,
        skip(self, source),
        fields(
            key_source = %source.name(),
            keys = source.len(),
            table = %table_path.display(),
        ),
    )]
    fn build_at<K>(&self, source: &K, table_path: &Path) -> Result<BuildReport>
    where
        K: KeySource + Sync,
    {
        let keys = source.keys();
        if keys.is_empty() {
            warn!(key_source = source.name(), "key source is empty");
            return Err(MaguroError::EmptySource {
                key_source: Arc::from(source.name()),
            });
        }
        if keys.len() > MAXIMUM_KEYS {
            return Err(MaguroError::TooManyKeys {
                key_source: Arc::from(source.name()),
                keys: keys.len(),
                maximum: MAXIMUM_KEYS,
            });
        }

        let request = BuildRequest {
            keys,
            key_source: Arc::from(source.name()),
            table_path,
            hash_function: self.hash_function,
            mask_function: self.mask_function,
            requested_table_elements: self.requested_table_elements,
            worker_count: self.concurrency(),
            resize_threshold: self.resize_threshold,
            resize_limit: self.resize_limit,
        };
        solver::run_build(&request)
    }
}
