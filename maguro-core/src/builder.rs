//! Builder utilities for configuring table construction.
//!
//! Exposes the tuning surface (hash function, masking, table sizing,
//! concurrency, resize policy) and the validation applied before
//! constructing [`Maguro`] instances.

use std::num::NonZeroUsize;

use crate::{
    Result,
    error::MaguroError,
    hashing::HashFunction,
    maguro::Maguro,
    masking::MaskFunction,
};

/// Attempts before a worker requests a larger table.
pub const DEFAULT_RESIZE_THRESHOLD: u64 = 2048;

/// Resize events permitted per build.
pub const DEFAULT_RESIZE_LIMIT: u32 = 5;

/// Configures and constructs [`Maguro`] instances.
///
/// # Examples
/// ```
/// use maguro_core::{MaguroBuilder, MaskFunction};
///
/// let maguro = MaguroBuilder::new()
///     .with_mask_function(MaskFunction::And)
///     .with_resize_threshold(512)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(maguro.mask_function(), MaskFunction::And);
/// ```
#[derive(Debug, Clone)]
pub struct MaguroBuilder {
    hash_function: HashFunction,
    mask_function: MaskFunction,
    requested_table_elements: Option<u32>,
    max_concurrency: Option<NonZeroUsize>,
    resize_threshold: u64,
    resize_limit: u32,
}

impl Default for MaguroBuilder {
    fn default() -> Self {
        Self {
            hash_function: HashFunction::MultiplyRotate,
            mask_function: MaskFunction::And,
            requested_table_elements: None,
            max_concurrency: None,
            resize_threshold: DEFAULT_RESIZE_THRESHOLD,
            resize_limit: DEFAULT_RESIZE_LIMIT,
        }
    }
}

impl MaguroBuilder {
    /// Creates a builder populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the seeded hash function.
    #[must_use]
    pub fn with_hash_function(mut self, function: HashFunction) -> Self {
        self.hash_function = function;
        self
    }

    /// Returns the configured hash function.
    #[must_use]
    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// Selects the masking strategy.
    #[must_use]
    pub fn with_mask_function(mut self, function: MaskFunction) -> Self {
        self.mask_function = function;
        self
    }

    /// Returns the configured masking strategy.
    #[must_use]
    pub fn mask_function(&self) -> MaskFunction {
        self.mask_function
    }

    /// Pre-selects the initial vertex count instead of the heuristic.
    ///
    /// Non-modulus masking rounds the value up to a power of two.
    #[must_use]
    pub fn with_requested_table_elements(mut self, elements: u32) -> Self {
        self.requested_table_elements = Some(elements);
        self
    }

    /// Returns the requested initial vertex count, if any.
    #[must_use]
    pub fn requested_table_elements(&self) -> Option<u32> {
        self.requested_table_elements
    }

    /// Caps the solver worker width; defaults to the machine parallelism.
    #[must_use]
    pub fn with_max_concurrency(mut self, workers: NonZeroUsize) -> Self {
        self.max_concurrency = Some(workers);
        self
    }

    /// Returns the configured worker cap, if any.
    #[must_use]
    pub fn max_concurrency(&self) -> Option<NonZeroUsize> {
        self.max_concurrency
    }

    /// Sets the attempt count that triggers a table resize.
    #[must_use]
    pub fn with_resize_threshold(mut self, attempts: u64) -> Self {
        self.resize_threshold = attempts;
        self
    }

    /// Returns the configured resize threshold.
    #[must_use]
    pub fn resize_threshold(&self) -> u64 {
        self.resize_threshold
    }

    /// Bounds how many times the table may be doubled. Zero disables
    /// resizing entirely; the build then fails *exhausted* once the
    /// threshold is crossed.
    #[must_use]
    pub fn with_resize_limit(mut self, resizes: u32) -> Self {
        self.resize_limit = resizes;
        self
    }

    /// Returns the configured resize limit.
    #[must_use]
    pub fn resize_limit(&self) -> u32 {
        self.resize_limit
    }

    /// Validates the configuration and constructs a [`Maguro`] instance.
    ///
    /// # Errors
    /// Returns [`MaguroError::InvalidResizeThreshold`] when the threshold
    /// is zero and [`MaguroError::InvalidTableSize`] when a requested
    /// table size of zero is supplied.
    pub fn build(self) -> Result<Maguro> {
        if self.resize_threshold == 0 {
            return Err(MaguroError::InvalidResizeThreshold { got: 0 });
        }
        if self.requested_table_elements == Some(0) {
            return Err(MaguroError::InvalidTableSize {
                requested: 0,
                minimum: 1,
            });
        }

        Ok(Maguro::new(
            self.hash_function,
            self.mask_function,
            self.requested_table_elements,
            self.max_concurrency,
            self.resize_threshold,
            self.resize_limit,
        ))
    }
}
