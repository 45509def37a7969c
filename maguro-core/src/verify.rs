//! Solved-graph verification.
//!
//! Recomputes every key's index from the winning assignment and confirms
//! no two keys land on the same slot. Index recomputation is
//! embarrassingly parallel and runs on the rayon pool; the collision scan
//! that follows is sequential so the first offending pair is reported
//! deterministically. Any collision is a fatal consistency bug in the
//! hash/mask composition, never something to persist past.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{MaguroError, Result};
use crate::graph::Graph;
use crate::hashing::HashFunction;

/// Verifies the winning graph against the original key set.
///
/// On success every key produced a distinct index and the graph's
/// `assigned_bitmap` popcount equals the key count. On the first
/// collision the previous key is recovered from the graph's `values`
/// array and reported.
pub(crate) fn verify_solved(graph: &mut Graph<'_>, keys: &[u32], hash: HashFunction) -> Result<()> {
    debug_assert_eq!(graph.assigned_bitmap.count_ones(), 0);

    let plan = graph.plan;
    let seeds = graph.seeds;
    let indexes: Vec<u32> = {
        let assigned: &[u32] = &*graph.assigned;
        keys.par_iter()
            .map(|&key| {
                let (low, high) = hash.hash(key, seeds);
                let vertex1 = assigned[plan.mask_hash(low) as usize];
                let vertex2 = assigned[plan.mask_hash(high) as usize];
                plan.mask_index(i64::from(vertex1) + i64::from(vertex2))
            })
            .collect()
    };

    for (&key, &index) in keys.iter().zip(&indexes) {
        let bit = u64::from(index) + 1;
        if graph.assigned_bitmap.test(bit) {
            let previous_key = graph.values[index as usize];
            warn!(
                index,
                key = format_args!("{key:#010x}"),
                previous_key = format_args!("{previous_key:#010x}"),
                "verification found an index collision"
            );
            return Err(MaguroError::IndexCollision {
                index,
                key,
                previous_key,
            });
        }
        graph.assigned_bitmap.set(bit);
        graph.values[index as usize] = key;
    }

    let assignments = graph.assigned_bitmap.count_ones();
    debug_assert_eq!(assignments, keys.len() as u64);
    debug!(
        keys = keys.len(),
        assignments,
        attempt = graph.attempt,
        worker_attempt = graph.worker_attempt,
        "verification passed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::GraphArena;
    use crate::error::MaguroError;
    use crate::graph::layout::GraphLayout;
    use crate::masking::{MaskFunction, MaskPlan, derive_dimensions};
    use crate::seeds::Seeds;
    use crate::solver::attempt::{self, AttemptOutcome};
    use crate::solver::context::SolveContext;

    #[test]
    fn a_solved_graph_verifies_cleanly() {
        let keys = [0xDEAD_BEEF_u32, 0xCAFE_BABE, 0xFEED_FACE, 0x8BAD_F00D];
        let dims = derive_dimensions(4, None, MaskFunction::And).expect("dims");
        let plan = MaskPlan::new(dims, MaskFunction::And);
        let layout = GraphLayout::new(&dims);
        let mut arena = GraphArena::allocate(1, layout.total_bytes).expect("arena");
        let mut regions = arena.regions();
        let ctx = SolveContext::new(1, u64::MAX, false);
        let hash = HashFunction::MultiplyRotate;

        for counter in 1_u32..10_000 {
            let seeds = Seeds::new(
                counter,
                counter.wrapping_mul(7),
                counter.wrapping_mul(13),
                counter.wrapping_mul(31),
            );
            let attempt_number = ctx.begin_attempt();
            let mut graph = Graph::initialize(
                &mut regions[0],
                &layout,
                dims,
                plan,
                seeds,
                attempt_number,
                u64::from(counter),
            );
            match attempt::solve(&mut graph, &keys, hash, &ctx) {
                AttemptOutcome::Won => {
                    verify_solved(&mut graph, &keys, hash).expect("winner must verify");
                    return;
                }
                _ => {
                    drop(graph);
                    regions[0].scrub();
                }
            }
        }
        panic!("no acyclic graph found within the seed budget");
    }

    #[test]
    fn an_all_zero_assignment_collides_on_the_second_key() {
        let keys = [111_u32, 222];
        let dims = derive_dimensions(2, None, MaskFunction::And).expect("dims");
        let plan = MaskPlan::new(dims, MaskFunction::And);
        let layout = GraphLayout::new(&dims);
        let mut arena = GraphArena::allocate(1, layout.total_bytes).expect("arena");
        let mut regions = arena.regions();

        let mut graph = Graph::initialize(
            &mut regions[0],
            &layout,
            dims,
            plan,
            Seeds::default(),
            1,
            1,
        );
        let err = verify_solved(&mut graph, &keys, HashFunction::MultiplyRotate)
            .expect_err("zero assignment must collide");
        match err {
            MaguroError::IndexCollision {
                index,
                key,
                previous_key,
            } => {
                assert_eq!(index, 0);
                assert_eq!(key, 222);
                assert_eq!(previous_key, 111);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

