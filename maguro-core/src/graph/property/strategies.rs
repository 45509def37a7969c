//! Strategy builders for graph property tests.
//!
//! Fixtures are generated from a seeded [`SmallRng`] so proptest shrinks
//! over a compact `(shape, seed)` space instead of raw edge lists.

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Vertex bound for generated graphs.
const MAX_VERTICES: u32 = 64;

/// A generated multigraph with endpoints below `vertices`.
#[derive(Clone, Debug)]
pub(in crate::graph) struct GraphFixture {
    pub vertices: u32,
    pub edges: Vec<(u32, u32)>,
}

/// Random forests: every edge attaches a fresh vertex to an earlier one,
/// so the result is acyclic by construction.
pub(in crate::graph) fn forest_graph() -> impl Strategy<Value = GraphFixture> {
    (4_u32..MAX_VERTICES, any::<u64>()).prop_map(|(vertices, seed)| {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut edges = Vec::new();
        for vertex in 1..vertices {
            if rng.gen_bool(0.7) {
                let parent = rng.gen_range(0..vertex);
                edges.push((parent, vertex));
            }
        }
        GraphFixture { vertices, edges }
    })
}

/// Arbitrary multigraphs, cyclic or not; parallel edges permitted.
pub(in crate::graph) fn arbitrary_graph() -> impl Strategy<Value = GraphFixture> {
    (2_u32..MAX_VERTICES, 0_usize..96, any::<u64>()).prop_map(|(vertices, edge_count, seed)| {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut edges = Vec::with_capacity(edge_count);
        while edges.len() < edge_count {
            let left = rng.gen_range(0..vertices);
            let right = rng.gen_range(0..vertices);
            if left != right {
                edges.push((left, right));
            }
        }
        GraphFixture { vertices, edges }
    })
}
