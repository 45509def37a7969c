//! One solve attempt over a freshly initialized graph.

use std::sync::atomic::Ordering;

use crate::graph::Graph;
use crate::hashing::HashFunction;
use crate::solver::context::SolveContext;

/// How often the key-insertion loop polls for an existing winner.
const TERMINATION_POLL_INTERVAL: u32 = 1024;

/// Result of one attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum AttemptOutcome {
    /// This attempt observed the 0→1 finished transition and assigned the
    /// graph; the caller must publish it.
    Won,
    /// The graph was acyclic but another attempt won the race.
    AlreadySolved,
    /// A key hashed both halves onto the same vertex; retry with new
    /// seeds.
    DegenerateKey,
    /// Peeling left edges behind; retry with new seeds.
    Cyclic,
    /// Another worker finished while keys were still being inserted.
    Abandoned,
}

/// Hashes every key into the graph, peels it, and races for the win.
pub(crate) fn solve(
    graph: &mut Graph<'_>,
    keys: &[u32],
    hash: HashFunction,
    ctx: &SolveContext,
) -> AttemptOutcome {
    let mut poll = TERMINATION_POLL_INTERVAL;

    for (edge, &key) in keys.iter().enumerate() {
        let (low, high) = hash.hash(key, graph.seeds);
        if low == high {
            return AttemptOutcome::DegenerateKey;
        }

        let vertex1 = graph.plan.mask_hash(low);
        let vertex2 = graph.plan.mask_hash(high);
        if vertex1 == vertex2 {
            return AttemptOutcome::DegenerateKey;
        }

        graph.add_edge(edge as u32, vertex1, vertex2);

        poll -= 1;
        if poll == 0 {
            if ctx.finished_count.load(Ordering::Acquire) > 0 {
                return AttemptOutcome::Abandoned;
            }
            poll = TERMINATION_POLL_INTERVAL;
        }
    }

    if !graph.is_acyclic() {
        ctx.record_deleted_edges(graph.deleted_count);
        return AttemptOutcome::Cyclic;
    }

    // Exactly one attempt observes the transition from zero and performs
    // the assignment; everyone else discards their work.
    if ctx.finished_count.fetch_add(1, Ordering::AcqRel) != 0 {
        return AttemptOutcome::AlreadySolved;
    }

    graph.assign();
    AttemptOutcome::Won
}
