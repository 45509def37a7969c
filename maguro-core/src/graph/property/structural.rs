//! Structural invariants checked over generated graphs.

use proptest::prelude::*;

use super::{GraphFixture, arbitrary_graph, forest_graph, is_forest};
use crate::arena::GraphArena;
use crate::graph::layout::GraphLayout;
use crate::graph::{EMPTY, Graph};
use crate::masking::{GraphDimensions, MaskFunction, MaskPlan};
use crate::seeds::Seeds;

fn fixture_dims(fixture: &GraphFixture) -> GraphDimensions {
    let keys = fixture.edges.len() as u32;
    let capacity = keys.next_power_of_two().max(1);
    let vertices = fixture
        .vertices
        .next_power_of_two()
        .max(capacity * 2);
    GraphDimensions {
        number_of_keys: keys,
        number_of_edges: capacity,
        total_edges: capacity * 2,
        number_of_vertices: vertices,
    }
}

fn with_fixture_graph<R, F: FnOnce(&mut Graph<'_>, &GraphFixture) -> R>(
    fixture: &GraphFixture,
    f: F,
) -> R {
    let dims = fixture_dims(fixture);
    let plan = MaskPlan::new(dims, MaskFunction::And);
    let layout = GraphLayout::new(&dims);
    let mut arena = GraphArena::allocate(1, layout.total_bytes).expect("arena allocation");
    let mut regions = arena.regions();
    let mut graph = Graph::initialize(&mut regions[0], &layout, dims, plan, Seeds::default(), 1, 1);
    for (edge, &(left, right)) in fixture.edges.iter().enumerate() {
        graph.add_edge(edge as u32, left, right);
    }
    f(&mut graph, fixture)
}

fn slots_of(graph: &Graph<'_>, vertex: u32) -> Vec<u32> {
    let mut slots = Vec::new();
    let mut edge = graph.first[vertex as usize];
    while edge != EMPTY {
        slots.push(edge);
        edge = graph.next[edge as usize];
    }
    slots
}

proptest! {
    /// After any sequence of insertions, both oriented slots of every
    /// edge are reachable from their owners' list heads.
    #[test]
    fn edge_lists_stay_consistent(fixture in arbitrary_graph()) {
        with_fixture_graph(&fixture, |graph, fixture| {
            let capacity = graph.dims.number_of_edges;
            for (edge, &(left, right)) in fixture.edges.iter().enumerate() {
                let edge = edge as u32;
                prop_assert!(slots_of(graph, left).contains(&edge));
                prop_assert!(slots_of(graph, right).contains(&(edge + capacity)));
                prop_assert_eq!(graph.edges[edge as usize], right);
                prop_assert_eq!(graph.edges[(edge + capacity) as usize], left);
            }
            Ok(())
        })?;
    }

    /// The peel agrees with an independent union-find forest check, and
    /// the deleted counter always equals the bitmap population.
    #[test]
    fn peel_matches_the_union_find_oracle(fixture in arbitrary_graph()) {
        with_fixture_graph(&fixture, |graph, fixture| {
            let acyclic = graph.is_acyclic();
            prop_assert_eq!(acyclic, is_forest(fixture.vertices, &fixture.edges));
            prop_assert_eq!(graph.deleted_count, graph.deleted_edges.count_ones());
            if acyclic {
                prop_assert_eq!(graph.deleted_count, fixture.edges.len() as u64);
            }
            Ok(())
        })?;
    }

    /// Forests always peel completely, and assignment then reaches every
    /// vertex and separates every edge's recombined index.
    #[test]
    fn forests_assign_totally_and_uniquely(fixture in forest_graph()) {
        with_fixture_graph(&fixture, |graph, fixture| {
            prop_assert!(graph.is_acyclic());
            graph.assign();

            prop_assert_eq!(graph.visited_count, u64::from(graph.dims.number_of_vertices));
            for vertex in 0..u64::from(graph.dims.number_of_vertices) {
                prop_assert!(graph.visited_vertices.test(vertex));
            }

            let mut seen = std::collections::HashSet::new();
            for &(left, right) in &fixture.edges {
                let sum = i64::from(graph.assigned[left as usize])
                    + i64::from(graph.assigned[right as usize]);
                prop_assert!(seen.insert(graph.plan.mask_index(sum)));
            }
            Ok(())
        })?;
    }
}
