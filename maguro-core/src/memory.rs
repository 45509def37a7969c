//! Pre-flight memory estimation for the parallel solver.
//!
//! Provides a conservative estimate of peak memory consumption so callers
//! can budget the per-worker graph buffers before any allocation occurs.
//! The estimate is intentionally pessimistic: it assumes power-of-two
//! rounding of the edge space (the worst case across masking strategies)
//! and pads each buffer to whole pages plus a guard page, mirroring the
//! allocation the controller will actually perform.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bytes per array element; every graph array stores 32-bit values.
const ELEMENT_BYTES: u64 = 4;

/// Page size assumed by the estimate. The arena queries the real value at
/// allocation time; 4 KiB is correct on the platforms we target and only
/// affects the padding term here.
const ASSUMED_PAGE_BYTES: u64 = 4096;

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Returns a conservative estimate of peak memory (in bytes) required to
/// build a table for `key_count` keys with `worker_count` parallel solver
/// buffers.
///
/// The estimate covers, per worker:
///
/// - the `first` and `assigned` arrays (`V` elements each),
/// - the verifier `values` array (`V` elements),
/// - the `edges`, `next` and `prev` arrays (`2·E` elements each),
/// - the four bitmaps (`2·E + 3·V` bits, rounded up),
/// - page rounding plus one guard page,
///
/// with `E = next_power_of_two(key_count)` and `V = 2·E`, plus the
/// writable output mapping (`V` elements).
///
/// # Examples
///
/// ```
/// use maguro_core::estimate_peak_bytes;
///
/// let bytes = estimate_peak_bytes(10_000, 8);
/// assert!(bytes > 0);
///
/// assert_eq!(estimate_peak_bytes(0, 8), 0);
/// ```
#[must_use]
pub fn estimate_peak_bytes(key_count: usize, worker_count: usize) -> u64 {
    if key_count == 0 || worker_count == 0 {
        return 0;
    }

    let edges = (key_count as u64)
        .checked_next_power_of_two()
        .unwrap_or(u64::MAX);
    let vertices = edges.saturating_mul(2);
    let total_edges = edges.saturating_mul(2);

    // first + assigned + values.
    let vertex_arrays = vertices.saturating_mul(3).saturating_mul(ELEMENT_BYTES);
    // edges + next + prev.
    let edge_arrays = total_edges.saturating_mul(3).saturating_mul(ELEMENT_BYTES);
    // deleted-edges bitmap plus three vertex-sized bitmaps, bits to bytes.
    let bitmap_bits = total_edges.saturating_add(vertices.saturating_mul(3));
    let bitmaps = bitmap_bits.saturating_add(7).saturating_div(8);

    let per_graph = vertex_arrays
        .saturating_add(edge_arrays)
        .saturating_add(bitmaps);
    let per_graph_padded = per_graph
        .saturating_add(ASSUMED_PAGE_BYTES.saturating_sub(1))
        .saturating_div(ASSUMED_PAGE_BYTES)
        .saturating_mul(ASSUMED_PAGE_BYTES)
        .saturating_add(ASSUMED_PAGE_BYTES); // guard page

    let output_mapping = vertices.saturating_mul(ELEMENT_BYTES);

    per_graph_padded
        .saturating_mul(worker_count as u64)
        .saturating_add(output_mapping)
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Formats a byte count as a human-readable string using binary units.
///
/// Returns values like `"0 B"`, `"1.0 KiB"`, `"2.4 GiB"`, with one decimal
/// place for values ≥ 1 KiB.
///
/// # Examples
///
/// ```
/// use maguro_core::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    if bytes >= TIB {
        format!("{:.1} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::one_worker(10_000, 1)]
    #[case::four_workers(10_000, 4)]
    #[case::many_keys(1_000_000, 8)]
    fn estimate_returns_positive_for_non_empty(
        #[case] key_count: usize,
        #[case] worker_count: usize,
    ) {
        assert!(estimate_peak_bytes(key_count, worker_count) > 0);
    }

    #[test]
    fn estimate_grows_with_worker_count() {
        let one = estimate_peak_bytes(100_000, 1);
        let eight = estimate_peak_bytes(100_000, 8);
        assert!(eight > one);
    }

    #[test]
    fn estimate_zero_inputs_return_zero() {
        assert_eq!(estimate_peak_bytes(0, 8), 0);
        assert_eq!(estimate_peak_bytes(100, 0), 0);
    }

    #[test]
    fn estimate_huge_key_count_does_not_panic() {
        assert!(estimate_peak_bytes(usize::MAX, 64) > 0);
    }

    #[rstest]
    #[case::zero(0, "0 B")]
    #[case::just_below_kib(1023, "1023 B")]
    #[case::one_kib(1024, "1.0 KiB")]
    #[case::one_mib(1_048_576, "1.0 MiB")]
    #[case::two_point_four_gib(2_576_980_378, "2.4 GiB")]
    fn format_bytes_produces_expected_output(#[case] input: u64, #[case] expected: &str) {
        assert_eq!(format_bytes(input), expected);
    }
}
