//! Guard-paged graph buffer arena.
//!
//! The controller reserves one contiguous region of
//! `workers · pages_per_graph + workers` pages and hands each solver worker
//! an exclusive page-granular slice, immediately followed by a guard page
//! whose protection is revoked. A runaway write past a graph's declared
//! size therefore faults instead of corrupting the neighbouring worker's
//! buffer. The whole region is released when the arena drops, between
//! resize iterations or at controller exit.

use std::marker::PhantomData;

use crate::error::{MaguroError, Result};

/// Returns the system page size in bytes.
pub(crate) fn page_size() -> usize {
    sys::page_size()
}

/// Returns the allocation granularity used to align file mappings.
///
/// On Unix this equals the page size; Windows mappings must align to the
/// (typically 64 KiB) system allocation granularity.
pub(crate) fn allocation_granularity() -> usize {
    sys::allocation_granularity()
}

/// Rounds `value` up to the next multiple of `granularity`.
pub(crate) fn align_up(value: u64, granularity: u64) -> u64 {
    debug_assert!(granularity > 0);
    value.div_ceil(granularity).saturating_mul(granularity)
}

/// A contiguous reservation carved into per-worker guard-paged regions.
pub(crate) struct GraphArena {
    base: *mut u8,
    total_bytes: usize,
    usable_bytes_per_region: usize,
    stride: usize,
    region_count: usize,
    guard_pages_verified: bool,
}

// SAFETY: the arena owns its reservation exclusively; the raw base pointer
// is only dereferenced through `GraphRegion` views that partition it into
// disjoint ranges.
unsafe impl Send for GraphArena {}

impl GraphArena {
    /// Reserves buffers for `region_count` workers of `bytes_per_graph`
    /// usable bytes each, rounded up to whole pages, and revokes access to
    /// every trailing guard page.
    ///
    /// # Errors
    /// Returns [`MaguroError::BufferAllocation`] when the reservation
    /// fails and [`MaguroError::GuardProtection`] when a guard page cannot
    /// be protected.
    pub(crate) fn allocate(region_count: usize, bytes_per_graph: usize) -> Result<Self> {
        debug_assert!(region_count > 0);
        let page = page_size();
        let usable = bytes_per_graph.div_ceil(page).saturating_mul(page);
        let stride = usable + page;
        let total = stride
            .checked_mul(region_count)
            .ok_or(MaguroError::BufferAllocation { bytes: usize::MAX })?;

        // SAFETY: total is non-zero and page-rounded.
        let base = unsafe { sys::reserve_pages(total) }
            .ok_or(MaguroError::BufferAllocation { bytes: total })?;

        for region in 0..region_count {
            let guard_offset = region * stride + usable;
            // SAFETY: guard_offset + page <= total; the pointer stays
            // within the reservation made above.
            let protected =
                unsafe { sys::revoke_page_access(base.add(guard_offset), page) };
            if !protected {
                // SAFETY: base/total exactly describe the reservation.
                unsafe { sys::release_pages(base, total) };
                return Err(MaguroError::GuardProtection {
                    offset: guard_offset,
                });
            }
        }

        Ok(Self {
            base,
            total_bytes: total,
            usable_bytes_per_region: usable,
            stride,
            region_count,
            guard_pages_verified: true,
        })
    }

    /// Whether every guard page was successfully protected.
    pub(crate) fn guard_pages_verified(&self) -> bool {
        self.guard_pages_verified
    }

    /// Usable bytes in each worker region.
    pub(crate) fn usable_bytes_per_region(&self) -> usize {
        self.usable_bytes_per_region
    }

    /// Splits the arena into its disjoint per-worker regions.
    pub(crate) fn regions(&mut self) -> Vec<GraphRegion<'_>> {
        (0..self.region_count)
            .map(|index| GraphRegion {
                // SAFETY: index < region_count, so the offset stays inside
                // the reservation; regions never overlap (stride apart).
                base: unsafe { self.base.add(index * self.stride) },
                len: self.usable_bytes_per_region,
                _arena: PhantomData,
            })
            .collect()
    }
}

impl Drop for GraphArena {
    fn drop(&mut self) {
        // SAFETY: base/total_bytes describe the reservation made in
        // `allocate`, released exactly once.
        unsafe { sys::release_pages(self.base, self.total_bytes) };
    }
}

/// An exclusive view of one worker's usable buffer bytes.
pub(crate) struct GraphRegion<'arena> {
    base: *mut u8,
    len: usize,
    _arena: PhantomData<&'arena mut GraphArena>,
}

// SAFETY: regions partition the arena into disjoint ranges and each region
// is owned by exactly one worker at a time.
unsafe impl Send for GraphRegion<'_> {}

#[cfg(kani)]
impl<'arena> GraphRegion<'arena> {
    /// Word-backed region for verification harnesses, where the mapping
    /// syscalls are out of scope.
    pub(crate) fn from_words(words: &'arena mut [u64]) -> Self {
        Self {
            base: words.as_mut_ptr().cast(),
            len: words.len() * size_of::<u64>(),
            _arena: PhantomData,
        }
    }
}

impl GraphRegion<'_> {
    /// Usable length in bytes.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// The region as a mutable byte slice.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: base/len describe exclusively-owned, mapped memory.
        unsafe { std::slice::from_raw_parts_mut(self.base, self.len) }
    }

    /// Zeroes every byte, returning the region to its post-allocation
    /// state between attempts.
    pub(crate) fn scrub(&mut self) {
        self.as_mut_slice().fill(0);
    }
}

#[cfg(unix)]
mod sys {
    use std::sync::OnceLock;

    pub(super) fn page_size() -> usize {
        static PAGE: OnceLock<usize> = OnceLock::new();
        *PAGE.get_or_init(|| {
            // SAFETY: sysconf has no preconditions.
            let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            usize::try_from(value).unwrap_or(4096).max(1)
        })
    }

    pub(super) fn allocation_granularity() -> usize {
        page_size()
    }

    /// # Safety
    /// `len` must be non-zero.
    pub(super) unsafe fn reserve_pages(len: usize) -> Option<*mut u8> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            None
        } else {
            Some(ptr.cast())
        }
    }

    /// # Safety
    /// `ptr..ptr+len` must lie within a live reservation and be
    /// page-aligned.
    pub(super) unsafe fn revoke_page_access(ptr: *mut u8, len: usize) -> bool {
        unsafe { libc::mprotect(ptr.cast(), len, libc::PROT_NONE) == 0 }
    }

    /// # Safety
    /// `ptr`/`len` must describe a reservation made by `reserve_pages`.
    pub(super) unsafe fn release_pages(ptr: *mut u8, len: usize) {
        unsafe {
            libc::munmap(ptr.cast(), len);
        }
    }
}

#[cfg(windows)]
mod sys {
    use std::sync::OnceLock;

    use windows_sys::Win32::System::Memory::{
        MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE, VirtualAlloc,
        VirtualFree, VirtualProtect,
    };
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    fn system_info() -> &'static SYSTEM_INFO {
        static INFO: OnceLock<SYSTEM_INFO> = OnceLock::new();
        INFO.get_or_init(|| {
            let mut info = unsafe { std::mem::zeroed::<SYSTEM_INFO>() };
            // SAFETY: GetSystemInfo fills the supplied struct.
            unsafe { GetSystemInfo(&mut info) };
            info
        })
    }

    pub(super) fn page_size() -> usize {
        usize::try_from(system_info().dwPageSize).unwrap_or(4096).max(1)
    }

    pub(super) fn allocation_granularity() -> usize {
        usize::try_from(system_info().dwAllocationGranularity)
            .unwrap_or(65536)
            .max(1)
    }

    /// # Safety
    /// `len` must be non-zero.
    pub(super) unsafe fn reserve_pages(len: usize) -> Option<*mut u8> {
        let ptr = unsafe {
            VirtualAlloc(
                std::ptr::null(),
                len,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_READWRITE,
            )
        };
        if ptr.is_null() { None } else { Some(ptr.cast()) }
    }

    /// # Safety
    /// `ptr..ptr+len` must lie within a live reservation and be
    /// page-aligned.
    pub(super) unsafe fn revoke_page_access(ptr: *mut u8, len: usize) -> bool {
        let mut previous = 0;
        unsafe { VirtualProtect(ptr.cast(), len, PAGE_NOACCESS, &mut previous) != 0 }
    }

    /// # Safety
    /// `ptr` must be the base of a reservation made by `reserve_pages`.
    pub(super) unsafe fn release_pages(ptr: *mut u8, _len: usize) {
        // MEM_RELEASE frees the whole reservation; the size must be zero.
        unsafe {
            VirtualFree(ptr.cast(), 0, MEM_RELEASE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_disjoint_and_page_granular() {
        let mut arena = GraphArena::allocate(3, 1000).expect("allocation must succeed");
        assert!(arena.guard_pages_verified());
        assert_eq!(arena.usable_bytes_per_region() % page_size(), 0);

        let mut regions = arena.regions();
        assert_eq!(regions.len(), 3);
        let mut ranges: Vec<(usize, usize)> = regions
            .iter_mut()
            .map(|region| {
                let slice = region.as_mut_slice();
                (slice.as_ptr() as usize, slice.len())
            })
            .collect();
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            let (start_a, len_a) = pair[0];
            let (start_b, _) = pair[1];
            // Exactly one guard page separates consecutive regions.
            assert_eq!(start_b - (start_a + len_a), page_size());
        }
    }

    #[test]
    fn scrub_zeroes_previous_contents() {
        let mut arena = GraphArena::allocate(1, 64).expect("allocation must succeed");
        let mut regions = arena.regions();
        let region = &mut regions[0];
        region.as_mut_slice()[0] = 0xAB;
        region.as_mut_slice()[63] = 0xCD;
        region.scrub();
        assert!(region.as_mut_slice().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn alignment_helper_rounds_up() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_up(4097, 4096), 8192);
    }
}
