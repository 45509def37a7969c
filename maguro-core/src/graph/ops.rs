//! Graph construction and peeling operations.

use super::{EMPTY, Graph};

/// Iteration state over a vertex's neighbours.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NeighborIter {
    pub(crate) vertex: u32,
    pub(crate) edge: u32,
}

impl Graph<'_> {
    /// Inserts undirected edge `edge` between `vertex1` and `vertex2` at
    /// the head of both incidence lists.
    pub(crate) fn add_edge(&mut self, edge: u32, vertex1: u32, vertex2: u32) {
        debug_assert!(!self.shrinking);
        debug_assert!(edge < self.dims.number_of_edges);
        debug_assert!(vertex1 < self.dims.number_of_vertices);
        debug_assert!(vertex2 < self.dims.number_of_vertices);

        let edge1 = edge;
        let edge2 = edge + self.dims.number_of_edges;

        let head1 = self.first[vertex1 as usize];
        if head1 != EMPTY {
            self.prev[head1 as usize] = edge1;
        }
        self.next[edge1 as usize] = head1;
        self.first[vertex1 as usize] = edge1;
        self.edges[edge1 as usize] = vertex2;
        self.prev[edge1 as usize] = EMPTY;

        let head2 = self.first[vertex2 as usize];
        if head2 != EMPTY {
            self.prev[head2 as usize] = edge2;
        }
        self.next[edge2 as usize] = head2;
        self.first[vertex2 as usize] = edge2;
        self.edges[edge2 as usize] = vertex1;
        self.prev[edge2 as usize] = EMPTY;
    }

    /// Unlinks one oriented slot from its owner's incidence list in O(1)
    /// via the `prev` chain.
    pub(crate) fn delete_edge(&mut self, edge: u32) {
        let owner = self.edges[self.paired_slot(edge) as usize];
        let previous = self.prev[edge as usize];
        let following = self.next[edge as usize];

        if previous == EMPTY {
            self.first[owner as usize] = following;
        } else {
            self.next[previous as usize] = following;
        }
        if following != EMPTY {
            self.prev[following as usize] = previous;
        }
    }

    /// Maps an oriented slot to its canonical edge slot in `[0, E)`.
    #[inline]
    pub(crate) fn absolute_edge(&self, edge: u32) -> u32 {
        if edge >= self.dims.number_of_edges {
            edge - self.dims.number_of_edges
        } else {
            edge
        }
    }

    /// Maps an oriented slot to its mirror slot at the other endpoint.
    #[inline]
    pub(crate) fn paired_slot(&self, edge: u32) -> u32 {
        if edge >= self.dims.number_of_edges {
            edge - self.dims.number_of_edges
        } else {
            edge + self.dims.number_of_edges
        }
    }

    /// Whether the canonical slot of `edge` has been peeled.
    #[inline]
    pub(crate) fn is_deleted(&self, edge: u32) -> bool {
        self.deleted_edges.test(u64::from(self.absolute_edge(edge)))
    }

    fn mark_deleted(&mut self, absolute_edge: u32) {
        debug_assert!(!self.deleted_edges.test(u64::from(absolute_edge)));
        self.deleted_edges.set(u64::from(absolute_edge));
        self.deleted_count += 1;
    }

    /// Walks `vertex`'s incidence list skipping peeled edges. Returns the
    /// single live oriented slot when the vertex has degree one, `None`
    /// when it has zero or two-plus live edges.
    pub(crate) fn find_degree1_edge(&self, vertex: u32) -> Option<u32> {
        let mut edge = self.first[vertex as usize];
        let mut found = None;

        while edge != EMPTY {
            if !self.is_deleted(edge) {
                if found.is_some() {
                    return None;
                }
                found = Some(edge);
            }
            edge = self.next[edge as usize];
        }

        found
    }

    /// The iterative peel step: while the current vertex has degree one,
    /// delete its live edge and follow it to the other endpoint.
    pub(crate) fn cyclic_delete_edge(&mut self, vertex: u32) {
        let Some(mut edge) = self.find_degree1_edge(vertex) else {
            return;
        };
        let mut current = vertex;

        loop {
            let absolute = self.absolute_edge(edge);
            self.mark_deleted(absolute);

            let mut other = self.edges[absolute as usize];
            if other == current {
                other = self.edges[(absolute + self.dims.number_of_edges) as usize];
            }
            if other == EMPTY {
                break;
            }

            match self.find_degree1_edge(other) {
                Some(next_edge) => {
                    debug_assert_ne!(next_edge, edge);
                    edge = next_edge;
                    current = other;
                }
                None => break,
            }
        }
    }

    /// Peels every degree-1 chain in the graph. The graph is acyclic iff
    /// every inserted edge was deleted.
    pub(crate) fn is_acyclic(&mut self) -> bool {
        debug_assert!(!self.shrinking);
        self.shrinking = true;

        for vertex in 0..self.dims.number_of_vertices {
            self.cyclic_delete_edge(vertex);
        }

        debug_assert_eq!(self.deleted_count, self.deleted_edges.count_ones());
        let acyclic = self.deleted_count == u64::from(self.dims.number_of_keys);
        if acyclic {
            self.acyclic = true;
        }
        acyclic
    }

    /// Starts neighbour iteration for `vertex`.
    pub(crate) fn neighbors(&self, vertex: u32) -> NeighborIter {
        NeighborIter {
            vertex,
            edge: self.first[vertex as usize],
        }
    }

    /// Advances `iter`, returning the next neighbouring vertex.
    pub(crate) fn next_neighbor(&self, iter: &mut NeighborIter) -> Option<u32> {
        if iter.edge == EMPTY {
            return None;
        }
        let edge = iter.edge;
        let stored = self.edges[edge as usize];
        let neighbor = if stored == iter.vertex {
            self.edges[self.paired_slot(edge) as usize]
        } else {
            stored
        };
        iter.edge = self.next[edge as usize];
        Some(neighbor)
    }

    /// Returns the slot identifying the edge between `vertex1` and
    /// `vertex2`, scanning `vertex1`'s incidence list.
    ///
    /// The raw oriented slot is the edge's identity here; index masking
    /// reduces it into index space during assignment.
    pub(crate) fn edge_id(&self, vertex1: u32, vertex2: u32) -> u32 {
        let mut edge = self.first[vertex1 as usize];
        debug_assert_ne!(edge, EMPTY);

        while edge != EMPTY {
            if self.edges[edge as usize] == vertex2 {
                return edge;
            }
            edge = self.next[edge as usize];
        }

        unreachable!("edge ({vertex1}, {vertex2}) queried during assignment must exist");
    }
}

// ============================================================================
// Kani Formal Verification
// ============================================================================

#[cfg(kani)]
mod kani_proofs {
    //! Bounded proof that peeling a tiny arbitrary graph never deletes an
    //! edge twice and equates acyclicity with full deletion.

    use crate::arena::GraphRegion;
    use crate::graph::Graph;
    use crate::graph::layout::GraphLayout;
    use crate::masking::{GraphDimensions, MaskFunction, MaskPlan};
    use crate::seeds::Seeds;

    #[kani::proof]
    #[kani::unwind(20)]
    fn peel_counts_match_bitmap_on_four_vertices() {
        let dims = GraphDimensions {
            number_of_keys: 3,
            number_of_edges: 4,
            total_edges: 8,
            number_of_vertices: 8,
        };
        let layout = GraphLayout::new(&dims);
        let plan = MaskPlan::new(dims, MaskFunction::And);
        let mut backing = vec![0_u64; layout.total_bytes.div_ceil(8)];
        let mut region = GraphRegion::from_words(&mut backing);

        let mut graph = Graph::initialize(
            &mut region,
            &layout,
            dims,
            plan,
            Seeds::default(),
            1,
            1,
        );

        for edge in 0..3_u32 {
            let v1: u32 = kani::any();
            let v2: u32 = kani::any();
            kani::assume(v1 < 8 && v2 < 8 && v1 != v2);
            graph.add_edge(edge, v1, v2);
        }

        let acyclic = graph.is_acyclic();
        assert_eq!(graph.deleted_count, graph.deleted_edges.count_ones());
        assert_eq!(acyclic, graph.deleted_count == 3);
    }
}
