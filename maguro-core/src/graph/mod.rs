//! Attempt-local hypergraph model.
//!
//! Each solve attempt owns one [`Graph`]: a 2-uniform hypergraph whose
//! arrays and bitmaps are carved from the worker's guard-paged buffer
//! region. Undirected edges are stored twice — slot `e` in `[0, E)` holds
//! the view from the first endpoint, slot `e + E` the view from the
//! second — and every vertex heads a doubly-linked incidence list threaded
//! through `next`/`prev`.

pub(crate) mod bitmap;
pub(crate) mod layout;
mod ops;

mod assign;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod property;

use crate::arena::GraphRegion;
use crate::graph::bitmap::Bitmap;
use crate::graph::layout::GraphLayout;
use crate::masking::{GraphDimensions, MaskPlan};
use crate::seeds::Seeds;

pub(crate) use ops::NeighborIter;

/// Sentinel marking an unused slot or the end of an incidence list.
pub(crate) const EMPTY: u32 = u32::MAX;

/// One attempt's hypergraph, borrowing its storage from a buffer region.
pub(crate) struct Graph<'a> {
    /// Dimensions this graph was carved for.
    pub dims: GraphDimensions,
    /// Resolved masking parameters.
    pub plan: MaskPlan,
    /// This attempt's seed quartet.
    pub seeds: Seeds,
    /// Global attempt number that produced this graph.
    pub attempt: u64,
    /// Attempt number local to the owning worker.
    pub worker_attempt: u64,

    /// Head of each vertex's incidence list (`EMPTY` if none).
    pub first: &'a mut [u32],
    /// Other endpoint stored per edge slot.
    pub edges: &'a mut [u32],
    /// Next edge slot in the same incidence list.
    pub next: &'a mut [u32],
    /// Previous edge slot in the same incidence list.
    pub prev: &'a mut [u32],
    /// Assignment vector; valid after a successful traversal.
    pub assigned: &'a mut [u32],
    /// Verifier-only: key that last produced each index.
    pub values: &'a mut [u32],

    /// Peeled edges, one bit per canonical edge slot.
    pub deleted_edges: Bitmap<'a>,
    /// Vertices reached by the assignment traversal.
    pub visited_vertices: Bitmap<'a>,
    /// Verifier-only: indexes already produced (1-based).
    pub assigned_bitmap: Bitmap<'a>,
    /// Traversal-only: diagnostic collision tracking (1-based).
    pub index_bitmap: Bitmap<'a>,

    /// Count of peeled edges; equals the set bits in `deleted_edges`.
    pub deleted_count: u64,
    /// Count of visited vertices.
    pub visited_count: u64,
    /// Diagnostic collisions observed during traversal.
    pub collisions: u64,
    /// Deepest traversal stack observed.
    pub maximum_depth: u32,

    /// Set once peeling starts; edge insertion is illegal afterwards.
    pub shrinking: bool,
    /// Set when peeling deleted every inserted edge.
    pub acyclic: bool,
}

impl<'a> Graph<'a> {
    /// Carves a fresh graph out of `region` and empties every slot.
    ///
    /// The region must be scrubbed (all zero); the carve only rewrites the
    /// array blocks with the `EMPTY` sentinel and leaves the bitmap words
    /// zeroed.
    pub(crate) fn initialize(
        region: &'a mut GraphRegion<'_>,
        layout: &GraphLayout,
        dims: GraphDimensions,
        plan: MaskPlan,
        seeds: Seeds,
        attempt: u64,
        worker_attempt: u64,
    ) -> Self {
        let mut graph = Self::attach(region, layout, dims, plan, seeds, attempt, worker_attempt);
        graph.first.fill(EMPTY);
        graph.edges.fill(EMPTY);
        graph.next.fill(EMPTY);
        graph.prev.fill(EMPTY);
        graph
    }

    /// Re-derives a graph view over a region whose contents were produced
    /// by an earlier [`Graph::initialize`] carve. Used by the controller
    /// to verify the winning attempt without disturbing its state.
    pub(crate) fn attach(
        region: &'a mut GraphRegion<'_>,
        layout: &GraphLayout,
        dims: GraphDimensions,
        plan: MaskPlan,
        seeds: Seeds,
        attempt: u64,
        worker_attempt: u64,
    ) -> Self {
        assert!(
            region.len() >= layout.total_bytes,
            "graph buffer of {} bytes is undersized for a {}-byte layout",
            region.len(),
            layout.total_bytes,
        );

        let mut carver = Carver::new(region.as_mut_slice());
        let edges = carver.take_u32(layout.edge_slots, layout.edge_array_bytes());
        let next = carver.take_u32(layout.edge_slots, layout.edge_array_bytes());
        let first = carver.take_u32(layout.vertex_slots, layout.vertex_array_bytes());
        let prev = carver.take_u32(layout.edge_slots, layout.edge_array_bytes());
        let assigned = carver.take_u32(layout.vertex_slots, layout.vertex_array_bytes());
        let values = carver.take_u32(layout.vertex_slots, layout.vertex_array_bytes());

        let deleted_words =
            carver.take_u64(layout.deleted_edge_words, layout.deleted_bitmap_bytes());
        let visited_words =
            carver.take_u64(layout.vertex_bitmap_words, layout.vertex_bitmap_bytes());
        let assigned_words =
            carver.take_u64(layout.vertex_bitmap_words, layout.vertex_bitmap_bytes());
        let index_words =
            carver.take_u64(layout.vertex_bitmap_words, layout.vertex_bitmap_bytes());
        debug_assert_eq!(carver.consumed(), layout.total_bytes);

        let edge_bits = u64::from(dims.total_edges) + 1;
        let vertex_bits = u64::from(dims.number_of_vertices) + 1;

        Self {
            dims,
            plan,
            seeds,
            attempt,
            worker_attempt,
            first,
            edges,
            next,
            prev,
            assigned,
            values,
            deleted_edges: Bitmap::new(deleted_words, edge_bits),
            visited_vertices: Bitmap::new(visited_words, vertex_bits),
            assigned_bitmap: Bitmap::new(assigned_words, vertex_bits),
            index_bitmap: Bitmap::new(index_words, vertex_bits),
            deleted_count: 0,
            visited_count: 0,
            collisions: 0,
            maximum_depth: 0,
            shrinking: false,
            acyclic: false,
        }
    }
}

/// Sequentially splits a byte slice into aligned typed blocks.
struct Carver<'a> {
    rest: &'a mut [u8],
    consumed: usize,
}

impl<'a> Carver<'a> {
    fn new(bytes: &'a mut [u8]) -> Self {
        debug_assert_eq!(bytes.as_ptr().align_offset(align_of::<u64>()), 0);
        Self {
            rest: bytes,
            consumed: 0,
        }
    }

    fn consumed(&self) -> usize {
        self.consumed
    }

    fn take_u32(&mut self, elements: usize, block_bytes: usize) -> &'a mut [u32] {
        let head = self.take_block(elements * size_of::<u32>(), block_bytes);
        // SAFETY: the block starts at a 16-byte-aligned offset of a
        // page-aligned region and spans `elements` properly-initialized
        // u32 slots, exclusively borrowed via the split above.
        unsafe { std::slice::from_raw_parts_mut(head.as_mut_ptr().cast::<u32>(), elements) }
    }

    fn take_u64(&mut self, elements: usize, block_bytes: usize) -> &'a mut [u64] {
        let head = self.take_block(elements * size_of::<u64>(), block_bytes);
        // SAFETY: as in `take_u32`, with eight-byte alignment guaranteed
        // by the sixteen-byte block alignment.
        unsafe { std::slice::from_raw_parts_mut(head.as_mut_ptr().cast::<u64>(), elements) }
    }

    fn take_block(&mut self, used_bytes: usize, block_bytes: usize) -> &'a mut [u8] {
        debug_assert!(used_bytes <= block_bytes);
        let (head, tail) = std::mem::take(&mut self.rest).split_at_mut(block_bytes);
        self.rest = tail;
        self.consumed += block_bytes;
        head
    }
}
