//! Solver worker loop.
//!
//! Each worker owns one guard-paged buffer region for the lifetime of a
//! build size and loops: draw fresh seeds, reinitialize the graph, run one
//! attempt, and on failure scrub the region and go again. The loop ends
//! when this worker wins, another worker wins, or the controller signals
//! an outcome.

use tracing::{debug, trace};

use crate::arena::GraphRegion;
use crate::graph::Graph;
use crate::graph::layout::GraphLayout;
use crate::hashing::HashFunction;
use crate::masking::{GraphDimensions, MaskPlan};
use crate::seeds::Seeds;
use crate::solver::attempt::{self, AttemptOutcome};
use crate::solver::context::{SolveContext, SolutionMeta, WorkerExitGuard};

pub(crate) struct WorkerConfig {
    pub layout: GraphLayout,
    pub dims: GraphDimensions,
    pub plan: MaskPlan,
    pub hash: HashFunction,
}

pub(crate) fn worker_loop(
    slot: usize,
    region: &mut GraphRegion<'_>,
    config: &WorkerConfig,
    keys: &[u32],
    ctx: &SolveContext,
) {
    let _exit_guard = WorkerExitGuard(ctx);
    let mut worker_attempt: u64 = 0;

    while ctx.should_continue() {
        let seeds = Seeds::random();
        let attempt = ctx.begin_attempt();
        if !ctx.should_continue() {
            break;
        }
        worker_attempt += 1;

        let mut graph = Graph::initialize(
            region,
            &config.layout,
            config.dims,
            config.plan,
            seeds,
            attempt,
            worker_attempt,
        );

        match attempt::solve(&mut graph, keys, config.hash, ctx) {
            AttemptOutcome::Won => {
                let meta = SolutionMeta {
                    seeds,
                    attempt,
                    worker_attempt,
                    collisions: graph.collisions,
                    maximum_depth: graph.maximum_depth,
                };
                drop(graph);
                debug!(
                    slot,
                    attempt,
                    worker_attempt,
                    maximum_depth = meta.maximum_depth,
                    "attempt solved the graph"
                );
                ctx.store_solution(slot, meta);
                ctx.finished.push(slot);
                ctx.signal_succeeded();
                return;
            }
            AttemptOutcome::AlreadySolved | AttemptOutcome::Abandoned => return,
            outcome @ (AttemptOutcome::DegenerateKey | AttemptOutcome::Cyclic) => {
                trace!(slot, attempt, ?outcome, "attempt failed, reseeding");
                ctx.record_failure();
                drop(graph);
                region.scrub();
            }
        }
    }
}
