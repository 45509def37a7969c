//! Result types for table builds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::seeds::Seeds;
use crate::timers::TimerSnapshot;

/// Per-phase timings of one build.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BuildTimings {
    /// From controller entry until a winning attempt finished assignment.
    pub solve: TimerSnapshot,
    /// Verification of the winning assignment.
    pub verify: TimerSnapshot,
    /// Output-file preparation (extend and map).
    pub prepare: TimerSnapshot,
    /// Copy, flush and truncate of the table file.
    pub save: TimerSnapshot,
}

/// Summary of a successful build.
///
/// Carries everything the metadata record persists, plus the artefact
/// paths, so callers can log or render the outcome without re-reading the
/// sidecar.
#[derive(Clone, Debug)]
pub struct BuildReport {
    pub(crate) key_source: Arc<str>,
    pub(crate) table_path: PathBuf,
    pub(crate) info_path: PathBuf,
    pub(crate) number_of_keys: u64,
    pub(crate) table_elements: u32,
    pub(crate) index_size: u32,
    pub(crate) seeds: Seeds,
    pub(crate) attempts: u64,
    pub(crate) failed_attempts: u64,
    pub(crate) solutions_found: u64,
    pub(crate) resize_events: u32,
    pub(crate) traversal_collisions: u64,
    pub(crate) maximum_traversal_depth: u32,
    pub(crate) timings: BuildTimings,
}

impl BuildReport {
    /// Name reported by the key source.
    #[must_use]
    pub fn key_source(&self) -> &str {
        &self.key_source
    }

    /// Path of the persisted table file.
    #[must_use]
    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    /// Path of the metadata sidecar.
    #[must_use]
    pub fn info_path(&self) -> &Path {
        &self.info_path
    }

    /// Keys in the input set.
    #[must_use]
    #[rustfmt::skip]
    pub fn number_of_keys(&self) -> u64 { self.number_of_keys }

    /// Final vertex count; the table file holds this many values.
    #[must_use]
    #[rustfmt::skip]
    pub fn table_elements(&self) -> u32 { self.table_elements }

    /// Index space size the table maps keys into.
    #[must_use]
    #[rustfmt::skip]
    pub fn index_size(&self) -> u32 { self.index_size }

    /// The winning seed quartet.
    #[must_use]
    #[rustfmt::skip]
    pub fn seeds(&self) -> Seeds { self.seeds }

    /// Attempts made at the final table size.
    #[must_use]
    #[rustfmt::skip]
    pub fn attempts(&self) -> u64 { self.attempts }

    /// Failed attempts at the final table size.
    #[must_use]
    #[rustfmt::skip]
    pub fn failed_attempts(&self) -> u64 { self.failed_attempts }

    /// Solutions found; exactly one for a successful build.
    #[must_use]
    #[rustfmt::skip]
    pub fn solutions_found(&self) -> u64 { self.solutions_found }

    /// Resize events consumed before the solution was found.
    #[must_use]
    #[rustfmt::skip]
    pub fn resize_events(&self) -> u32 { self.resize_events }

    /// Diagnostic index collisions recorded during traversal.
    #[must_use]
    #[rustfmt::skip]
    pub fn traversal_collisions(&self) -> u64 { self.traversal_collisions }

    /// Deepest traversal stack observed during assignment.
    #[must_use]
    #[rustfmt::skip]
    pub fn maximum_traversal_depth(&self) -> u32 { self.maximum_traversal_depth }

    /// Per-phase timings.
    #[must_use]
    #[rustfmt::skip]
    pub fn timings(&self) -> BuildTimings { self.timings }
}
