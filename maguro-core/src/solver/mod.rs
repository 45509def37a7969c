//! Build controller and resize loop.
//!
//! The controller drives one build end to end: derive dimensions, reserve
//! the guard-paged buffer region, queue output-file preparation, start one
//! solver worker per buffer, and wait on the outcome set. When the attempt
//! threshold fires with resize budget left it drains the workers, folds
//! the attempt statistics into the persisted metadata, doubles the vertex
//! count and goes again. A winner is popped off the lock-free finished
//! stack, saved through the file worker and verified concurrently.

pub(crate) mod attempt;
pub(crate) mod context;
pub(crate) mod finished;
pub(crate) mod worker;


use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{info, instrument};

use crate::arena::{GraphArena, align_up, allocation_granularity};
use crate::error::{MaguroError, Result};
use crate::graph::Graph;
use crate::graph::layout::GraphLayout;
use crate::hashing::HashFunction;
use crate::masking::{GraphDimensions, MaskFunction, MaskPlan, derive_dimensions};
use crate::persist::FileWorker;
use crate::persist::header::{ALGORITHM_CHM, KEY_SIZE_IN_BYTES, TableInfoHeader};
use crate::result::{BuildReport, BuildTimings};
use crate::seeds::NUMBER_OF_SEEDS;
use crate::solver::context::SolveContext;
use crate::solver::worker::{WorkerConfig, worker_loop};
use crate::timers::IntervalTimer;
use crate::verify;

/// Everything the controller needs for one build.
pub(crate) struct BuildRequest<'a> {
    pub keys: &'a [u32],
    pub key_source: Arc<str>,
    pub table_path: &'a Path,
    pub hash_function: HashFunction,
    pub mask_function: MaskFunction,
    pub requested_table_elements: Option<u32>,
    pub worker_count: usize,
    pub resize_threshold: u64,
    pub resize_limit: u32,
}

/// Aggregate metadata that survives resize iterations.
#[derive(Clone, Copy, Debug, Default)]
struct ResizeHistory {
    events: u32,
    attempts_under_smaller_sizes: u64,
    closest_approach: u64,
    initial_table_size: u64,
}

#[instrument(
    name = "solver.run_build",
    err,
    skip_all,
    fields(
        key_source = %request.key_source,
        keys = request.keys.len(),
        workers = request.worker_count,
    ),
)]
pub(crate) fn run_build(request: &BuildRequest<'_>) -> Result<BuildReport> {
    debug_assert!(!request.keys.is_empty());
    debug_assert!(request.worker_count > 0);
    let number_of_keys = request.keys.len() as u32;

    let file_worker = FileWorker::spawn(request.table_path)?;
    let solve_timer = IntervalTimer::start();

    let mut requested = request.requested_table_elements;
    let mut history = ResizeHistory::default();

    let (ctx, dims, plan, layout, mut arena, flags) = loop {
        let dims = derive_dimensions(number_of_keys, requested, request.mask_function)?;
        let plan = MaskPlan::new(dims, request.mask_function);
        let layout = GraphLayout::new(&dims);
        let can_resize = history.events < request.resize_limit;
        let ctx = SolveContext::new(request.worker_count, request.resize_threshold, can_resize);
        let mut arena = GraphArena::allocate(request.worker_count, layout.total_bytes)?;
        debug_assert!(arena.guard_pages_verified());
        debug_assert!(arena.usable_bytes_per_region() >= layout.total_bytes);

        let mapped_len = align_up(
            u64::from(dims.number_of_vertices) * u64::from(KEY_SIZE_IN_BYTES),
            allocation_granularity() as u64,
        );
        file_worker.submit_prepare(mapped_len, header_template(request, &dims, &plan, history))?;

        info!(
            vertices = dims.number_of_vertices,
            edges = dims.number_of_edges,
            resize_events = history.events,
            "starting solve attempts"
        );

        let (flags, panicked) = {
            let mut regions = arena.regions();
            let config = WorkerConfig {
                layout,
                dims,
                plan,
                hash: request.hash_function,
            };
            std::thread::scope(|scope| {
                let config = &config;
                let ctx = &ctx;
                let keys = request.keys;
                let handles: Vec<_> = regions
                    .iter_mut()
                    .enumerate()
                    .map(|(slot, region)| {
                        scope.spawn(move || worker_loop(slot, region, config, keys, ctx))
                    })
                    .collect();

                let flags = ctx.wait_for_outcome();
                ctx.request_shutdown();

                let mut panicked = None;
                for (slot, handle) in handles.into_iter().enumerate() {
                    if handle.join().is_err() {
                        panicked = Some(slot);
                    }
                }
                (flags, panicked)
            })
        };
        if let Some(worker) = panicked {
            return Err(MaguroError::WorkerPanicked { worker });
        }

        let finished = ctx.finished_count.load(Ordering::Acquire);
        if flags.try_larger_table && finished == 0 {
            // The prepare step must have settled before the mapping is
            // discarded and the file re-extended for the next size.
            file_worker.wait_prepared()?;
            history = fold_resize(&ctx, &dims, history);
            #[cfg(feature = "metrics")]
            metrics::counter!("maguro_table_resizes_total").increment(1);

            let doubled = dims
                .number_of_vertices
                .checked_mul(2)
                .ok_or(MaguroError::TableSizeOverflow {
                    last: dims.number_of_vertices,
                })?;
            requested = Some(doubled);
            info!(
                vertices = doubled,
                resize_events = history.events,
                "attempt threshold crossed, doubling the table"
            );
            continue;
        }

        break (ctx, dims, plan, layout, arena, flags);
    };

    let finished = ctx.finished_count.load(Ordering::Acquire);
    if finished == 0 {
        let attempts = history
            .attempts_under_smaller_sizes
            .saturating_add(ctx.attempts.load(Ordering::Relaxed));
        let highest = ctx.highest_deleted_edges.load(Ordering::Relaxed);
        let closest_here = u64::from(dims.number_of_edges).saturating_sub(highest);
        let closest_approach = if history.closest_approach == 0 {
            closest_here
        } else {
            history.closest_approach.min(closest_here)
        };

        // Persist the exhaustion metrics so callers can inspect the best
        // approach even when no table was produced.
        let mut header = header_template(request, &dims, &plan, history);
        header.total_attempts = ctx.attempts.load(Ordering::Relaxed);
        header.failed_attempts = ctx.failed_attempts.load(Ordering::Relaxed);
        header.closest_approach_under_smaller_sizes = closest_approach;
        let _ = file_worker.wait_prepared();
        if file_worker.submit_finalize(header).is_ok() {
            let _ = file_worker.wait_saved();
        }

        if flags.exhausted {
            return Err(MaguroError::ResizeLimitExhausted {
                attempts,
                resize_events: history.events,
                closest_approach,
            });
        }
        return Err(MaguroError::Cancelled);
    }

    let Some(slot) = ctx.finished.pop() else {
        return Err(MaguroError::Cancelled);
    };
    let Some(meta) = ctx.solution_meta(slot) else {
        return Err(MaguroError::Cancelled);
    };
    let solve_snapshot = solve_timer.snapshot();

    let mut regions = arena.regions();
    let mut graph = Graph::attach(
        &mut regions[slot],
        &layout,
        dims,
        plan,
        meta.seeds,
        meta.attempt,
        meta.worker_attempt,
    );

    let mut header = header_template(request, &dims, &plan, history);
    header.seed1 = meta.seeds.seed1;
    header.seed2 = meta.seeds.seed2;
    header.seed3 = meta.seeds.seed3;
    header.seed4 = meta.seeds.seed4;
    header.total_attempts = ctx.attempts.load(Ordering::Relaxed);
    header.failed_attempts = ctx.failed_attempts.load(Ordering::Relaxed);
    header.solutions_found = finished;
    header.solve_timer = solve_snapshot;

    file_worker.wait_prepared()?;
    file_worker.submit_save(graph.assigned.to_vec(), header)?;

    // Verification runs here while the file worker copies and flushes.
    let verify_timer = IntervalTimer::start();
    let verify_result = verify::verify_solved(&mut graph, request.keys, request.hash_function);
    file_worker.complete_verification(verify_timer.snapshot(), verify_result.is_ok());

    let save_result = file_worker.wait_saved();
    verify_result?;
    save_result?;

    let (prepare_snapshot, save_snapshot) = file_worker.timings();
    info!(
        attempts = header.total_attempts,
        winning_attempt = meta.attempt,
        table_elements = dims.number_of_vertices,
        "table built and verified"
    );

    Ok(BuildReport {
        key_source: Arc::clone(&request.key_source),
        table_path: file_worker.table_path().to_path_buf(),
        info_path: file_worker.info_path().to_path_buf(),
        number_of_keys: u64::from(number_of_keys),
        table_elements: dims.number_of_vertices,
        index_size: dims.number_of_edges,
        seeds: meta.seeds,
        attempts: header.total_attempts,
        failed_attempts: header.failed_attempts,
        solutions_found: finished,
        resize_events: history.events,
        traversal_collisions: meta.collisions,
        maximum_traversal_depth: meta.maximum_depth,
        timings: BuildTimings {
            solve: solve_snapshot,
            verify: header.verify_timer,
            prepare: prepare_snapshot,
            save: save_snapshot,
        },
    })
}

/// Accumulates one abandoned size into the resize history.
fn fold_resize(ctx: &SolveContext, dims: &GraphDimensions, mut history: ResizeHistory) -> ResizeHistory {
    history.events += 1;
    history.attempts_under_smaller_sizes = history
        .attempts_under_smaller_sizes
        .saturating_add(ctx.attempts.load(Ordering::Relaxed));

    let highest = ctx.highest_deleted_edges.load(Ordering::Relaxed);
    let closest = u64::from(dims.number_of_edges).saturating_sub(highest);
    if history.closest_approach == 0 || closest < history.closest_approach {
        history.closest_approach = closest;
    }
    if history.initial_table_size == 0 {
        history.initial_table_size = u64::from(dims.number_of_vertices);
    }
    history
}

fn header_template(
    request: &BuildRequest<'_>,
    dims: &GraphDimensions,
    plan: &MaskPlan,
    history: ResizeHistory,
) -> TableInfoHeader {
    TableInfoHeader {
        flags: 0,
        algorithm_id: ALGORITHM_CHM,
        hash_function_id: request.hash_function.id(),
        mask_function_id: plan.function.id(),
        key_size_in_bytes: KEY_SIZE_IN_BYTES,
        number_of_keys: request.keys.len() as u64,
        number_of_table_elements: u64::from(dims.number_of_vertices),
        hash_size: plan.hash_size,
        index_size: plan.index_size,
        hash_shift: plan.hash_shift,
        index_shift: plan.index_shift,
        hash_mask: plan.hash_mask,
        index_mask: plan.index_mask,
        hash_fold: plan.hash_fold,
        index_fold: plan.index_fold,
        hash_modulus: plan.hash_modulus,
        index_modulus: plan.index_modulus,
        number_of_seeds: NUMBER_OF_SEEDS,
        number_of_table_resize_events: history.events,
        attempts_under_smaller_sizes: history.attempts_under_smaller_sizes,
        closest_approach_under_smaller_sizes: history.closest_approach,
        initial_table_size: history.initial_table_size,
        ..TableInfoHeader::default()
    }
}
