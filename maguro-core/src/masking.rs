//! Hash and index masking.
//!
//! A build hashes keys into *vertex* space (size `V`) while the final table
//! indexes live in *edge* space (size `E ≤ V`), so two masks exist side by
//! side: `mask_hash` reduces a raw hash half to a vertex, `mask_index`
//! reduces an assigned sum to a table index. Depending on the configured
//! [`MaskFunction`] the reduction is a modulus, a power-of-two AND, or an
//! xor-fold of the upper bits followed by an AND.

use crate::error::{MaguroError, Result};

/// Largest supported key count; keeps `2 * next_power_of_two(n)` inside
/// the 32-bit edge slot space.
pub const MAXIMUM_KEYS: usize = 1 << 30;

/// Identifies the masking strategy used by a build.
///
/// The discriminants are persisted in the table metadata record.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u32)]
pub enum MaskFunction {
    /// Remainder by the vertex/index count. The only strategy that
    /// supports non-power-of-two table sizes.
    Modulus = 1,
    /// Power-of-two AND mask.
    And = 2,
    /// Pick a fold depth from the mask width at build time.
    FoldAuto = 3,
    /// Fold the upper half once, then AND.
    FoldOnce = 4,
    /// Fold twice (16 then 8 bits), then AND.
    FoldTwice = 5,
    /// Fold three times (16, 8 then 4 bits), then AND.
    FoldThrice = 6,
}

impl MaskFunction {
    /// Returns the persisted identifier for this function.
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Resolves a persisted identifier back to a function.
    #[must_use]
    pub const fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::Modulus),
            2 => Some(Self::And),
            3 => Some(Self::FoldAuto),
            4 => Some(Self::FoldOnce),
            5 => Some(Self::FoldTwice),
            6 => Some(Self::FoldThrice),
            _ => None,
        }
    }

    /// Whether this strategy keeps exact (non-power-of-two) table sizes.
    #[must_use]
    pub const fn is_modulus(self) -> bool {
        matches!(self, Self::Modulus)
    }
}

/// Graph dimensions derived once per attempt size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GraphDimensions {
    /// Number of keys in the input set.
    pub number_of_keys: u32,
    /// Edge capacity `E` (the key count, rounded up to a power of two for
    /// non-modulus masking).
    pub number_of_edges: u32,
    /// `2·E`; each undirected edge occupies two slots.
    pub total_edges: u32,
    /// Vertex count `V`, strictly greater than `E`.
    pub number_of_vertices: u32,
}

/// Derives the graph dimensions for a key count, an optional requested
/// table size, and the configured masking strategy.
///
/// With modulus masking the heuristic vertex count is `2.25·E` (shift
/// arithmetic, no floating point); otherwise the edge count is rounded up
/// to a power of two and the vertex count is the next power of two above
/// it.
///
/// # Errors
/// Returns [`MaguroError::InvalidTableSize`] when a requested size cannot
/// hold the key set, and [`MaguroError::TableSizeOverflow`] when rounding
/// leaves the 32-bit vertex space.
pub fn derive_dimensions(
    number_of_keys: u32,
    requested_table_elements: Option<u32>,
    function: MaskFunction,
) -> Result<GraphDimensions> {
    let (edges, vertices) = if function.is_modulus() {
        let edges = number_of_keys;
        let vertices = match requested_table_elements {
            Some(requested) => requested,
            None => (edges << 1).wrapping_add(edges >> 2),
        };
        (edges, vertices)
    } else {
        let edges = number_of_keys
            .checked_next_power_of_two()
            .ok_or(MaguroError::TableSizeOverflow {
                last: number_of_keys,
            })?;
        let vertices = match requested_table_elements {
            Some(requested) => {
                requested
                    .checked_next_power_of_two()
                    .ok_or(MaguroError::TableSizeOverflow { last: requested })?
            }
            None => edges
                .checked_mul(2)
                .ok_or(MaguroError::TableSizeOverflow { last: edges })?,
        };
        (edges, vertices)
    };

    if vertices <= edges {
        return Err(MaguroError::InvalidTableSize {
            requested: vertices,
            minimum: edges,
        });
    }

    let total_edges = edges
        .checked_mul(2)
        .ok_or(MaguroError::TableSizeOverflow { last: edges })?;

    Ok(GraphDimensions {
        number_of_keys,
        number_of_edges: edges,
        total_edges,
        number_of_vertices: vertices,
    })
}

/// The fully-resolved masking parameters of one build size.
///
/// Everything here is persisted in the metadata record so a loaded table
/// can reproduce the exact index computation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MaskPlan {
    /// Resolved masking strategy (never [`MaskFunction::FoldAuto`]).
    pub function: MaskFunction,
    /// Vertex space size (`V`).
    pub hash_size: u32,
    /// Index space size (`E`).
    pub index_size: u32,
    /// Trailing-zero count of `hash_size`.
    pub hash_shift: u32,
    /// Trailing-zero count of `index_size`.
    pub index_shift: u32,
    /// `hash_size - 1`.
    pub hash_mask: u32,
    /// `index_size - 1`.
    pub index_mask: u32,
    /// `hash_shift / 8`, the byte-granular fold depth input.
    pub hash_fold: u32,
    /// `index_shift / 8`.
    pub index_fold: u32,
    /// `hash_size`, the modulus for vertex reduction.
    pub hash_modulus: u32,
    /// `index_size`, the modulus for index reduction.
    pub index_modulus: u32,
}

impl MaskPlan {
    /// Builds the plan for the given dimensions, resolving
    /// [`MaskFunction::FoldAuto`] to a concrete fold depth from the mask
    /// width (`hash_shift / 8`: 2–4 → once, 1 → twice, 0 → thrice).
    #[must_use]
    pub fn new(dimensions: GraphDimensions, function: MaskFunction) -> Self {
        let hash_size = dimensions.number_of_vertices;
        let index_size = dimensions.number_of_edges;
        let hash_shift = hash_size.trailing_zeros();
        let index_shift = index_size.trailing_zeros();
        let hash_fold = hash_shift >> 3;
        let index_fold = index_shift >> 3;

        let function = match function {
            MaskFunction::FoldAuto => match hash_fold {
                2..=4 => MaskFunction::FoldOnce,
                1 => MaskFunction::FoldTwice,
                _ => MaskFunction::FoldThrice,
            },
            other => other,
        };

        Self {
            function,
            hash_size,
            index_size,
            hash_shift,
            index_shift,
            hash_mask: hash_size.wrapping_sub(1),
            index_mask: index_size.wrapping_sub(1),
            hash_fold,
            index_fold,
            hash_modulus: hash_size,
            index_modulus: index_size,
        }
    }

    /// Reduces a raw hash half to a vertex in `[0, hash_size)`.
    #[inline]
    #[must_use]
    pub fn mask_hash(&self, hash: u32) -> u32 {
        match self.function {
            MaskFunction::Modulus => hash % self.hash_modulus,
            MaskFunction::And => hash & self.hash_mask,
            MaskFunction::FoldOnce => fold(hash, 1) & self.hash_mask,
            MaskFunction::FoldTwice => fold(hash, 2) & self.hash_mask,
            MaskFunction::FoldThrice | MaskFunction::FoldAuto => fold(hash, 3) & self.hash_mask,
        }
    }

    /// Reduces a (possibly negative) assigned sum or difference to an
    /// index in `[0, index_size)`.
    ///
    /// The modulus path uses the Euclidean remainder so
    /// `edge_id − assigned[v]` stays well-defined below zero; the AND path
    /// relies on two's-complement masking being congruent mod `2^k`.
    #[inline]
    #[must_use]
    pub fn mask_index(&self, value: i64) -> u32 {
        match self.function {
            MaskFunction::Modulus => {
                let modulus = i64::from(self.index_modulus);
                (value.rem_euclid(modulus)) as u32
            }
            MaskFunction::And => (value & i64::from(self.index_mask)) as u32,
            MaskFunction::FoldOnce => fold(value as u32, 1) & self.index_mask,
            MaskFunction::FoldTwice => fold(value as u32, 2) & self.index_mask,
            MaskFunction::FoldThrice | MaskFunction::FoldAuto => {
                fold(value as u32, 3) & self.index_mask
            }
        }
    }
}

/// Xor-folds the upper bits into the lower span, one halving per depth
/// step (16, then 8, then 4 bits).
#[inline]
const fn fold(mut value: u32, depth: u32) -> u32 {
    value ^= value >> 16;
    if depth >= 2 {
        value ^= value >> 8;
    }
    if depth >= 3 {
        value ^= value >> 4;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn modulus_heuristic_is_two_and_a_quarter() {
        let dims = derive_dimensions(100, None, MaskFunction::Modulus).expect("dims must derive");
        assert_eq!(dims.number_of_edges, 100);
        assert_eq!(dims.number_of_vertices, 225);
        assert_eq!(dims.total_edges, 200);
    }

    #[test]
    fn power_of_two_rounding_for_and_masking() {
        let dims = derive_dimensions(8, None, MaskFunction::And).expect("dims must derive");
        assert_eq!(dims.number_of_edges, 8);
        assert_eq!(dims.number_of_vertices, 16);

        let dims = derive_dimensions(9, None, MaskFunction::And).expect("dims must derive");
        assert_eq!(dims.number_of_edges, 16);
        assert_eq!(dims.number_of_vertices, 32);
    }

    #[test]
    fn single_key_builds_a_two_vertex_graph() {
        let dims = derive_dimensions(1, None, MaskFunction::And).expect("dims must derive");
        assert_eq!(dims.number_of_edges, 1);
        assert_eq!(dims.number_of_vertices, 2);
    }

    #[test]
    fn requested_size_must_exceed_edge_count() {
        let err = derive_dimensions(100, Some(100), MaskFunction::Modulus)
            .expect_err("too-small request must fail");
        assert!(matches!(err, MaguroError::InvalidTableSize { .. }));
    }

    #[rstest]
    #[case(1 << 16, MaskFunction::FoldOnce)] // hash_shift 17 -> fold 2
    #[case(1 << 7, MaskFunction::FoldTwice)] // hash_shift 8 -> fold 1
    #[case(1 << 3, MaskFunction::FoldThrice)] // hash_shift 4 -> fold 0
    fn auto_fold_resolves_from_mask_width(
        #[case] keys: u32,
        #[case] expected: MaskFunction,
    ) {
        let dims = derive_dimensions(keys, None, MaskFunction::FoldAuto).expect("dims");
        let plan = MaskPlan::new(dims, MaskFunction::FoldAuto);
        assert_eq!(plan.function, expected);
    }

    #[test]
    fn and_masking_reduces_into_range() {
        let dims = derive_dimensions(8, None, MaskFunction::And).expect("dims");
        let plan = MaskPlan::new(dims, MaskFunction::And);
        assert_eq!(plan.mask_hash(0xFFFF_FFFF), 15);
        assert_eq!(plan.mask_index(7), 7);
        assert_eq!(plan.mask_index(8), 0);
    }

    #[test]
    fn negative_differences_mask_to_congruent_values() {
        let dims = derive_dimensions(100, None, MaskFunction::Modulus).expect("dims");
        let plan = MaskPlan::new(dims, MaskFunction::Modulus);
        assert_eq!(plan.mask_index(-1), 99);
        assert_eq!(plan.mask_index(-100), 0);

        let dims = derive_dimensions(8, None, MaskFunction::And).expect("dims");
        let plan = MaskPlan::new(dims, MaskFunction::And);
        assert_eq!(plan.mask_index(-1), 7);
        // AND masking is congruent mod 2^k, so sums recombine exactly.
        let edge_id = 5_i64;
        let assigned = 11_i64;
        let delta = i64::from(plan.mask_index(edge_id - assigned));
        assert_eq!(plan.mask_index(delta + assigned), plan.mask_index(edge_id));
    }

    #[test]
    fn ids_round_trip() {
        for function in [
            MaskFunction::Modulus,
            MaskFunction::And,
            MaskFunction::FoldAuto,
            MaskFunction::FoldOnce,
            MaskFunction::FoldTwice,
            MaskFunction::FoldThrice,
        ] {
            assert_eq!(MaskFunction::from_id(function.id()), Some(function));
        }
        assert_eq!(MaskFunction::from_id(0), None);
    }
}
