//! Assignment traversal over an acyclic graph.
//!
//! Walks every component depth-first with an explicit stack (stack use is
//! bounded by the component size, not the thread stack) and derives each
//! vertex's assignment so that for every tree edge
//! `mask_index(assigned[v] + assigned[u]) == mask_index(edge_id(v, u))`.

use super::Graph;
use crate::graph::NeighborIter;

impl Graph<'_> {
    /// Assigns every vertex, including isolated ones, by walking each
    /// unvisited component from a zero-assigned root.
    pub(crate) fn assign(&mut self) {
        debug_assert!(self.acyclic);

        for vertex in 0..self.dims.number_of_vertices {
            if !self.visited_vertices.test(u64::from(vertex)) {
                self.assigned[vertex as usize] = 0;
                self.traverse(vertex);
            }
        }

        debug_assert_eq!(self.visited_count, u64::from(self.dims.number_of_vertices));
        debug_assert_eq!(self.visited_count, self.visited_vertices.count_ones());
    }

    fn traverse(&mut self, root: u32) {
        let mut stack: Vec<NeighborIter> = Vec::new();
        self.visit(root);
        stack.push(self.neighbors(root));
        self.note_depth(stack.len());

        loop {
            let Some(frame_index) = stack.len().checked_sub(1) else {
                break;
            };
            let (vertex, neighbor) = {
                let frame = &mut stack[frame_index];
                (frame.vertex, self.next_neighbor(frame))
            };
            let Some(neighbor) = neighbor else {
                stack.pop();
                continue;
            };
            if self.visited_vertices.test(u64::from(neighbor)) {
                continue;
            }

            let edge_id = self.edge_id(vertex, neighbor);
            let existing = i64::from(self.assigned[vertex as usize]);
            let delta = self.plan.mask_index(i64::from(edge_id) - existing);
            let combined = self.plan.mask_index(i64::from(edge_id) + existing);

            // Diagnostic only; the verifier is the authoritative gate.
            let bit = u64::from(combined) + 1;
            if self.index_bitmap.test(bit) {
                self.collisions += 1;
            } else {
                self.index_bitmap.set(bit);
            }

            self.assigned[neighbor as usize] = delta;
            self.visit(neighbor);
            stack.push(self.neighbors(neighbor));
            self.note_depth(stack.len());
        }
    }

    fn visit(&mut self, vertex: u32) {
        self.visited_vertices.set(u64::from(vertex));
        self.visited_count += 1;
    }

    fn note_depth(&mut self, depth: usize) {
        let depth = u32::try_from(depth).unwrap_or(u32::MAX);
        if depth > self.maximum_depth {
            self.maximum_depth = depth;
        }
    }
}
