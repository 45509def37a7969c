//! Maguro core library.
//!
//! A parallel CHM-style perfect-hash-function builder over 32-bit keys.
//! Each solve attempt hashes every key into a random 2-uniform hypergraph
//! and peels it; the first attempt whose hypergraph is acyclic wins, and
//! its assignment vector is persisted as the lookup table alongside a
//! fixed-layout metadata record.
//!
//! # Metrics
//!
//! When the `metrics` feature is enabled the solver emits:
//!
//! - `maguro_attempts_total` (counter)
//! - `maguro_failed_attempts_total` (counter)
//! - `maguro_table_resizes_total` (counter)
//! - `maguro_solutions_total` (counter)
//!
//! These metric names are stable for downstream crates.

mod arena;
mod builder;
mod error;
mod event;
mod graph;
mod hashing;
mod keysource;
mod maguro;
mod masking;
mod memory;
mod persist;
mod result;
mod seeds;
mod solver;
mod table;
mod timers;
mod verify;

pub use crate::{
    builder::{DEFAULT_RESIZE_LIMIT, DEFAULT_RESIZE_THRESHOLD, MaguroBuilder},
    error::{MaguroError, MaguroErrorCode, Result},
    hashing::HashFunction,
    keysource::KeySource,
    maguro::Maguro,
    masking::{MAXIMUM_KEYS, MaskFunction},
    memory::{estimate_peak_bytes, format_bytes},
    persist::header::{HeaderError, TABLE_INFO_MAGIC, TABLE_INFO_SIZE, TableInfoHeader},
    persist::info_sidecar_path,
    result::{BuildReport, BuildTimings},
    seeds::{NUMBER_OF_SEEDS, Seeds},
    table::{LoadError, LoadErrorCode, PerfectHashTable},
    timers::TimerSnapshot,
};

#[cfg(test)]
pub(crate) mod test_utils;
