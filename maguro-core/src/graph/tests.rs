use crate::arena::GraphArena;
use crate::graph::layout::GraphLayout;
use crate::graph::{EMPTY, Graph};
use crate::masking::{GraphDimensions, MaskFunction, MaskPlan};
use crate::seeds::Seeds;

/// Runs `f` over a freshly initialized graph with explicit dimensions.
fn with_graph<F: FnOnce(&mut Graph<'_>)>(dims: GraphDimensions, mask: MaskFunction, f: F) {
    let plan = MaskPlan::new(dims, mask);
    let layout = GraphLayout::new(&dims);
    let mut arena = GraphArena::allocate(1, layout.total_bytes).expect("arena allocation");
    let mut regions = arena.regions();
    let mut graph = Graph::initialize(&mut regions[0], &layout, dims, plan, Seeds::default(), 1, 1);
    f(&mut graph);
}

fn dims(keys: u32, edges: u32, vertices: u32) -> GraphDimensions {
    GraphDimensions {
        number_of_keys: keys,
        number_of_edges: edges,
        total_edges: edges * 2,
        number_of_vertices: vertices,
    }
}

/// Collects the oriented slots reachable from `vertex`'s list head.
fn list_slots(graph: &Graph<'_>, vertex: u32) -> Vec<u32> {
    let mut slots = Vec::new();
    let mut edge = graph.first[vertex as usize];
    while edge != EMPTY {
        slots.push(edge);
        edge = graph.next[edge as usize];
    }
    slots
}

#[test]
fn add_edge_heads_both_incidence_lists() {
    with_graph(dims(3, 4, 8), MaskFunction::And, |graph| {
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 1, 2);
        graph.add_edge(2, 2, 3);

        // Vertex 1 carries the mirror slot of edge 0 and the canonical
        // slot of edge 1, most recent first.
        assert_eq!(list_slots(graph, 0), vec![0]);
        assert_eq!(list_slots(graph, 1), vec![1, 4]);
        assert_eq!(list_slots(graph, 2), vec![2, 5]);
        assert_eq!(list_slots(graph, 3), vec![6]);

        // Slot pairs store the opposite endpoints.
        assert_eq!(graph.edges[0], 1);
        assert_eq!(graph.edges[4], 0);
        assert_eq!(graph.edges[1], 2);
        assert_eq!(graph.edges[5], 1);
    });
}

#[test]
fn every_occupied_slot_is_reachable_from_its_owner() {
    with_graph(dims(4, 4, 8), MaskFunction::And, |graph| {
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 0, 2);
        graph.add_edge(2, 0, 3);
        graph.add_edge(3, 2, 3);

        for edge in 0..4_u32 {
            let owner_canonical = graph.edges[(edge + 4) as usize];
            let owner_mirror = graph.edges[edge as usize];
            assert!(list_slots(graph, owner_canonical).contains(&edge));
            assert!(list_slots(graph, owner_mirror).contains(&(edge + 4)));
        }
    });
}

#[test]
fn delete_edge_unlinks_in_constant_time() {
    with_graph(dims(3, 4, 8), MaskFunction::And, |graph| {
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 0, 2);
        graph.add_edge(2, 0, 3);
        assert_eq!(list_slots(graph, 0), vec![2, 1, 0]);

        // Middle of the list.
        graph.delete_edge(1);
        assert_eq!(list_slots(graph, 0), vec![2, 0]);

        // Head of the list.
        graph.delete_edge(2);
        assert_eq!(list_slots(graph, 0), vec![0]);

        // Last remaining slot.
        graph.delete_edge(0);
        assert_eq!(list_slots(graph, 0), Vec::<u32>::new());
    });
}

#[test]
fn find_degree1_edge_counts_live_edges_only() {
    with_graph(dims(2, 4, 8), MaskFunction::And, |graph| {
        // Path 0 - 1 - 2.
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 1, 2);

        assert_eq!(graph.find_degree1_edge(0), Some(0));
        assert_eq!(graph.find_degree1_edge(1), None);
        assert_eq!(graph.find_degree1_edge(2), Some(5));
        assert_eq!(graph.find_degree1_edge(7), None);
    });
}

#[test]
fn peeling_a_path_deletes_every_edge() {
    with_graph(dims(3, 4, 8), MaskFunction::And, |graph| {
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 1, 2);
        graph.add_edge(2, 2, 3);

        assert!(graph.is_acyclic());
        assert_eq!(graph.deleted_count, 3);
        assert!(graph.acyclic);
        for edge in 0..3 {
            assert!(graph.deleted_edges.test(edge));
        }
    });
}

#[test]
fn a_triangle_does_not_peel() {
    with_graph(dims(3, 4, 8), MaskFunction::And, |graph| {
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 1, 2);
        graph.add_edge(2, 2, 0);

        assert!(!graph.is_acyclic());
        assert_eq!(graph.deleted_count, 0);
        assert!(!graph.acyclic);
    });
}

#[test]
fn a_cycle_with_a_tail_peels_only_the_tail() {
    with_graph(dims(4, 4, 8), MaskFunction::And, |graph| {
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 1, 2);
        graph.add_edge(2, 2, 0);
        graph.add_edge(3, 2, 3);

        assert!(!graph.is_acyclic());
        assert_eq!(graph.deleted_count, 1);
        assert!(graph.deleted_edges.test(3));
    });
}

#[test]
fn neighbor_iteration_sees_both_orientations() {
    with_graph(dims(3, 4, 8), MaskFunction::And, |graph| {
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 1, 2);
        graph.add_edge(2, 3, 1);

        let mut iter = graph.neighbors(1);
        let mut neighbors = Vec::new();
        while let Some(vertex) = graph.next_neighbor(&mut iter) {
            neighbors.push(vertex);
        }
        neighbors.sort_unstable();
        assert_eq!(neighbors, vec![0, 2, 3]);
    });
}

#[test]
fn edge_id_returns_the_oriented_slot() {
    with_graph(dims(2, 4, 8), MaskFunction::And, |graph| {
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 1, 2);

        // Queried from the first endpoint the canonical slot comes back;
        // from the second endpoint the mirror slot does. The raw slot is
        // the edge's identity during assignment.
        assert_eq!(graph.edge_id(0, 1), 0);
        assert_eq!(graph.edge_id(1, 0), 4);
        assert_eq!(graph.edge_id(1, 2), 1);
        assert_eq!(graph.edge_id(2, 1), 5);
    });
}

#[test]
fn assignment_visits_every_vertex_and_separates_indexes() {
    with_graph(dims(3, 4, 8), MaskFunction::And, |graph| {
        let inserted = [(0_u32, 0_u32, 1_u32), (1, 1, 2), (2, 1, 3)];
        for (edge, v1, v2) in inserted {
            graph.add_edge(edge, v1, v2);
        }

        assert!(graph.is_acyclic());
        graph.assign();

        assert_eq!(graph.visited_count, 8);
        for vertex in 0..8 {
            assert!(graph.visited_vertices.test(vertex));
        }

        // The oriented slot is congruent to the canonical edge index mod
        // the index mask, so each key recombines to its own edge index.
        for (edge, v1, v2) in inserted {
            let sum = i64::from(graph.assigned[v1 as usize])
                + i64::from(graph.assigned[v2 as usize]);
            assert_eq!(graph.plan.mask_index(sum), edge);
        }
    });
}

#[test]
fn attach_preserves_a_previous_carve() {
    let dims = dims(2, 4, 8);
    let plan = MaskPlan::new(dims, MaskFunction::And);
    let layout = GraphLayout::new(&dims);
    let mut arena = GraphArena::allocate(1, layout.total_bytes).expect("arena allocation");
    let mut regions = arena.regions();

    {
        let mut graph =
            Graph::initialize(&mut regions[0], &layout, dims, plan, Seeds::default(), 1, 1);
        graph.add_edge(0, 0, 1);
        graph.add_edge(1, 1, 2);
        assert!(graph.is_acyclic());
        graph.assign();
    }

    let graph = Graph::attach(&mut regions[0], &layout, dims, plan, Seeds::default(), 1, 1);
    assert_eq!(graph.edges[0], 1);
    assert_eq!(graph.edges[4], 0);
    assert!(graph.deleted_edges.test(0));
    assert!(graph.deleted_edges.test(1));
    assert!(graph.visited_vertices.test(2));
}

#[test]
#[should_panic(expected = "undersized")]
fn undersized_regions_are_rejected() {
    let small = dims(2, 4, 8);
    let large = dims(1024, 1024, 2048);
    let plan = MaskPlan::new(small, MaskFunction::And);
    let small_layout = GraphLayout::new(&small);
    let large_layout = GraphLayout::new(&large);
    let mut arena = GraphArena::allocate(1, small_layout.total_bytes).expect("arena allocation");
    let mut regions = arena.regions();
    let _ = Graph::attach(
        &mut regions[0],
        &large_layout,
        large,
        plan,
        Seeds::default(),
        1,
        1,
    );
}
