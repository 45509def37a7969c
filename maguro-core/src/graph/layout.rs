//! Byte layout of a graph buffer.
//!
//! A worker's buffer is carved in a fixed order — the three edge-slot
//! arrays, the three vertex arrays, then the four bitmaps — with every
//! block aligned up to sixteen bytes so the carve can hand out `u32` and
//! `u64` views without repacking. The sizes are computed once per build
//! size and shared by every worker.

use crate::graph::bitmap::words_for;
use crate::masking::GraphDimensions;

const BLOCK_ALIGNMENT: usize = 16;

const fn align_block(bytes: usize) -> usize {
    (bytes + BLOCK_ALIGNMENT - 1) & !(BLOCK_ALIGNMENT - 1)
}

/// Element and word counts for each carved block, plus the total byte
/// requirement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct GraphLayout {
    /// Elements in `edges`, `next` and `prev` (`2·E`).
    pub edge_slots: usize,
    /// Elements in `first`, `assigned` and `values` (`V`).
    pub vertex_slots: usize,
    /// Words in the deleted-edges bitmap (`2·E + 1` bits).
    pub deleted_edge_words: usize,
    /// Words in each vertex-sized bitmap (`V + 1` bits).
    pub vertex_bitmap_words: usize,
    /// Total bytes a region must provide.
    pub total_bytes: usize,
}

impl GraphLayout {
    pub(crate) fn new(dimensions: &GraphDimensions) -> Self {
        let edge_slots = dimensions.total_edges as usize;
        let vertex_slots = dimensions.number_of_vertices as usize;
        let deleted_edge_words = words_for(u64::from(dimensions.total_edges) + 1);
        let vertex_bitmap_words = words_for(u64::from(dimensions.number_of_vertices) + 1);

        let edge_array_bytes = align_block(edge_slots * size_of::<u32>());
        let vertex_array_bytes = align_block(vertex_slots * size_of::<u32>());
        let deleted_bitmap_bytes = align_block(deleted_edge_words * size_of::<u64>());
        let vertex_bitmap_bytes = align_block(vertex_bitmap_words * size_of::<u64>());

        let total_bytes = 3 * edge_array_bytes
            + 3 * vertex_array_bytes
            + deleted_bitmap_bytes
            + 3 * vertex_bitmap_bytes;

        Self {
            edge_slots,
            vertex_slots,
            deleted_edge_words,
            vertex_bitmap_words,
            total_bytes,
        }
    }

    /// Aligned byte size of one edge-slot array.
    pub(crate) fn edge_array_bytes(&self) -> usize {
        align_block(self.edge_slots * size_of::<u32>())
    }

    /// Aligned byte size of one vertex array.
    pub(crate) fn vertex_array_bytes(&self) -> usize {
        align_block(self.vertex_slots * size_of::<u32>())
    }

    /// Aligned byte size of the deleted-edges bitmap.
    pub(crate) fn deleted_bitmap_bytes(&self) -> usize {
        align_block(self.deleted_edge_words * size_of::<u64>())
    }

    /// Aligned byte size of one vertex-sized bitmap.
    pub(crate) fn vertex_bitmap_bytes(&self) -> usize {
        align_block(self.vertex_bitmap_words * size_of::<u64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::{MaskFunction, derive_dimensions};

    #[test]
    fn blocks_are_sixteen_byte_aligned() {
        let dims = derive_dimensions(100, None, MaskFunction::Modulus).expect("dims");
        let layout = GraphLayout::new(&dims);
        assert_eq!(layout.edge_array_bytes() % 16, 0);
        assert_eq!(layout.vertex_array_bytes() % 16, 0);
        assert_eq!(layout.deleted_bitmap_bytes() % 16, 0);
        assert_eq!(layout.vertex_bitmap_bytes() % 16, 0);
        assert_eq!(layout.total_bytes % 16, 0);
    }

    #[test]
    fn totals_sum_the_carved_blocks() {
        let dims = derive_dimensions(8, None, MaskFunction::And).expect("dims");
        let layout = GraphLayout::new(&dims);
        let expected = 3 * layout.edge_array_bytes()
            + 3 * layout.vertex_array_bytes()
            + layout.deleted_bitmap_bytes()
            + 3 * layout.vertex_bitmap_bytes();
        assert_eq!(layout.total_bytes, expected);
        assert_eq!(layout.edge_slots, 16);
        assert_eq!(layout.vertex_slots, 16);
    }

    #[test]
    fn bitmap_words_cover_the_extra_slot() {
        // 64 total edge slots need 65 bits, which spills into a second word.
        let dims = derive_dimensions(32, None, MaskFunction::And).expect("dims");
        let layout = GraphLayout::new(&dims);
        assert_eq!(layout.deleted_edge_words, 2);
    }
}
