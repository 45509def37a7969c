//! Shared control context for one build size.
//!
//! The context is the only cross-worker state: outcome flags guarded by a
//! mutex/condvar pair (the controller's multi-wait), an advisory shutdown
//! flag, monotonic atomic counters, and the lock-free finished stack. A
//! fresh context is created for every resize iteration so the flags and
//! counters restart from a clean slate while the aggregate metadata lives
//! with the controller.

use std::sync::{
    Condvar, Mutex, OnceLock,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

use tracing::debug;

use crate::seeds::Seeds;
use crate::solver::finished::FinishedStack;

/// Snapshot of the terminal outcome flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct OutcomeFlags {
    /// An attempt found and assigned an acyclic graph.
    pub succeeded: bool,
    /// A fatal condition was reported.
    pub failed: bool,
    /// Every worker exited without a solution.
    pub completed: bool,
    /// The attempt threshold fired with resize budget remaining.
    pub try_larger_table: bool,
    /// The attempt threshold fired with no resize budget left.
    pub exhausted: bool,
}

impl OutcomeFlags {
    pub(crate) fn any(self) -> bool {
        self.succeeded || self.failed || self.completed || self.try_larger_table || self.exhausted
    }
}

/// Diagnostics captured by the winning attempt alongside its buffer slot.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SolutionMeta {
    pub seeds: Seeds,
    pub attempt: u64,
    pub worker_attempt: u64,
    pub collisions: u64,
    pub maximum_depth: u32,
}

pub(crate) struct SolveContext {
    shutdown: AtomicBool,
    outcomes: Mutex<OutcomeFlags>,
    condvar: Condvar,

    pub(crate) attempts: AtomicU64,
    pub(crate) failed_attempts: AtomicU64,
    pub(crate) finished_count: AtomicU64,
    pub(crate) highest_deleted_edges: AtomicU64,

    pub(crate) finished: FinishedStack,
    solutions: Vec<OnceLock<SolutionMeta>>,
    active_workers: AtomicUsize,

    resize_threshold: u64,
    can_resize: bool,
}

impl SolveContext {
    pub(crate) fn new(
        worker_count: usize,
        resize_threshold: u64,
        can_resize: bool,
    ) -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            outcomes: Mutex::new(OutcomeFlags::default()),
            condvar: Condvar::new(),
            attempts: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
            finished_count: AtomicU64::new(0),
            highest_deleted_edges: AtomicU64::new(0),
            finished: FinishedStack::new(worker_count),
            solutions: (0..worker_count).map(|_| OnceLock::new()).collect(),
            active_workers: AtomicUsize::new(worker_count),
            resize_threshold,
            can_resize,
        }
    }

    /// Whether a worker should start another attempt: no terminal outcome,
    /// no shutdown, and nobody has finished yet.
    pub(crate) fn should_continue(&self) -> bool {
        if self.shutdown.load(Ordering::Acquire) {
            return false;
        }
        if self.finished_count.load(Ordering::Acquire) > 0 {
            return false;
        }
        !self.flags().any()
    }

    /// Registers a new attempt, firing the resize (or exhaustion) signal
    /// on the attempt that crosses the threshold.
    pub(crate) fn begin_attempt(&self) -> u64 {
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        #[cfg(feature = "metrics")]
        metrics::counter!("maguro_attempts_total").increment(1);

        if attempt == self.resize_threshold {
            if self.can_resize {
                debug!(attempt, "attempt threshold crossed, requesting larger table");
                self.signal(|flags| flags.try_larger_table = true);
            } else {
                debug!(attempt, "attempt threshold crossed with no resizes left");
                self.signal(|flags| flags.exhausted = true);
            }
        }
        attempt
    }

    /// Records a failed attempt.
    pub(crate) fn record_failure(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("maguro_failed_attempts_total").increment(1);
    }

    /// Monotonically raises the highest observed deleted-edge count.
    pub(crate) fn record_deleted_edges(&self, deleted: u64) {
        let mut current = self.highest_deleted_edges.load(Ordering::Relaxed);
        while deleted > current {
            match self.highest_deleted_edges.compare_exchange_weak(
                current,
                deleted,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Stores the winning attempt's diagnostics for `slot`.
    pub(crate) fn store_solution(&self, slot: usize, meta: SolutionMeta) {
        #[cfg(feature = "metrics")]
        metrics::counter!("maguro_solutions_total").increment(1);
        let _ = self.solutions[slot].set(meta);
    }

    /// Reads the diagnostics the winner stored for `slot`.
    pub(crate) fn solution_meta(&self, slot: usize) -> Option<SolutionMeta> {
        self.solutions.get(slot).and_then(|cell| cell.get()).copied()
    }

    pub(crate) fn signal_succeeded(&self) {
        self.signal(|flags| flags.succeeded = true);
    }

    /// Called by each worker on exit (panic-safe via a drop guard); the
    /// last worker out with no solution marks the context completed.
    pub(crate) fn worker_exited(&self) {
        if self.active_workers.fetch_sub(1, Ordering::AcqRel) == 1
            && self.finished_count.load(Ordering::Acquire) == 0
            && !self.flags().any()
        {
            self.signal(|flags| flags.completed = true);
        }
    }

    /// Requests cooperative shutdown; workers observe it on their next
    /// poll and return their buffers without further writes.
    pub(crate) fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Blocks until any outcome flag is raised.
    pub(crate) fn wait_for_outcome(&self) -> OutcomeFlags {
        let mut flags = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
        while !flags.any() {
            flags = self
                .condvar
                .wait(flags)
                .unwrap_or_else(|e| e.into_inner());
        }
        *flags
    }

    /// Current outcome snapshot without blocking.
    pub(crate) fn flags(&self) -> OutcomeFlags {
        *self.outcomes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn signal(&self, raise: impl FnOnce(&mut OutcomeFlags)) {
        let mut flags = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
        raise(&mut flags);
        drop(flags);
        self.condvar.notify_all();
    }
}

/// Decrements the active-worker count even when an attempt panics.
pub(crate) struct WorkerExitGuard<'a>(pub(crate) &'a SolveContext);

impl Drop for WorkerExitGuard<'_> {
    fn drop(&mut self) {
        self.0.worker_exited();
    }
}
