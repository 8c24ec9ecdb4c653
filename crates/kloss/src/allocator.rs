//! The polymorphic allocator handle and the fallback-chain router.

use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::header::{
    self, blocks_for, payload_bytes, AllocationHeader, BLOCK, HEADER_BLOCKS, HEADER_BYTES,
    MAX_BYTES, SYSTEM_TAG,
};
use crate::region::Region;
use crate::system;
use crate::tracked::Tracked;

/// A pluggable allocator handle.
///
/// Each handle selects one of four strategies and optionally carries a
/// fallback handle consulted when its own strategy cannot satisfy a
/// request. All strategies stamp the same in-band header in front of each
/// payload, so any handle on a chain can recognise, resize, and release
/// allocations made anywhere along it.
///
/// All returned pointers are aligned by at least [`BLOCK`](crate::BLOCK).
///
/// # Examples
///
/// ```
/// use kloss::Allocator;
///
/// let mut alloc = Allocator::growing(4096);
///
/// let p = alloc.alloc(100).expect("allocation failed");
///
/// // SAFETY: `p` is live and was allocated through this handle.
/// unsafe {
///     let p = alloc.resize(Some(p), 200).expect("resize failed");
///     alloc.free(Some(p));
/// }
/// ```
///
/// Spilling a bounded region into the OS heap:
///
/// ```
/// use kloss::{Allocator, RegionBuffer};
///
/// let mut buf = RegionBuffer::<256>::new();
/// let mut alloc = Allocator::fixed(&mut buf).with_fallback(Allocator::tracked());
///
/// // More than the buffer can hold; the excess lands in the fallback.
/// let mut held = Vec::new();
///
/// for _ in 0..32 {
///     held.push(alloc.alloc(64).expect("allocation failed"));
/// }
///
/// for p in held {
///     // SAFETY: Every held pointer is live and came from this chain.
///     unsafe {
///         alloc.free(Some(p));
///     }
/// }
/// ```
pub struct Allocator<'a> {
    kind: Kind,
    fallback: Option<Box<Allocator<'a>>>,
    // Covers buffers borrowed by fixed regions.
    _marker: PhantomData<&'a mut [MaybeUninit<u8>]>,
}

enum Kind {
    System,
    Tracked(Tracked),
    Fixed(Region),
    Growing {
        regions: Vec<Region>,
        region_size: usize,
    },
}

impl<'a> Allocator<'a> {
    /// An untracked passthrough to the OS heap.
    ///
    /// The handle is stateless; its identity is structural and dropping it
    /// releases nothing. Blocks made through it stay alive until freed
    /// through a chain that reaches a system-direct handle.
    pub const fn system() -> Self {
        Self::with_kind(Kind::System)
    }

    /// An OS-heap strategy that records ownership of each live block, so
    /// dropping the handle releases everything it still holds.
    pub const fn tracked() -> Self {
        Self::with_kind(Kind::Tracked(Tracked::new()))
    }

    /// A single non-growing region over a caller-provided buffer.
    ///
    /// The buffer is borrowed for the lifetime of the handle and is not
    /// released on teardown. [`RegionBuffer`](crate::RegionBuffer) provides
    /// correctly aligned storage.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not aligned by [`BLOCK`](crate::BLOCK), is
    /// larger than [`MAX_BYTES`](crate::MAX_BYTES), or is too small to hold
    /// the region's reserved sentinel slot.
    pub fn fixed(buffer: &'a mut [MaybeUninit<u8>]) -> Self {
        Self::with_kind(Kind::Fixed(Region::over(buffer)))
    }

    /// A single non-growing region over `bytes` of heap memory owned and
    /// released by the handle. The size is rounded up to whole blocks.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` exceeds [`MAX_BYTES`](crate::MAX_BYTES).
    pub fn fixed_owned(bytes: usize) -> Self {
        assert!(bytes <= MAX_BYTES, "Region too large 0-{MAX_BYTES}");
        Self::with_kind(Kind::Fixed(Region::owned(blocks_for(bytes) + HEADER_BLOCKS)))
    }

    /// A growing sequence of regions, each with `region_size` bytes of
    /// payload capacity. A fresh region is added whenever no existing one
    /// can serve a request; requests over `region_size` are rejected so a
    /// fallback can take them.
    ///
    /// # Panics
    ///
    /// Panics if `region_size` cannot hold a single smallest allocation or
    /// exceeds [`MAX_BYTES`](crate::MAX_BYTES).
    pub fn growing(region_size: usize) -> Self {
        assert!(
            region_size >= HEADER_BYTES + BLOCK,
            "Region size must hold at least one allocation"
        );
        assert!(region_size <= MAX_BYTES, "Region too large 0-{MAX_BYTES}");

        Self::with_kind(Kind::Growing {
            regions: Vec::new(),
            region_size,
        })
    }

    const fn with_kind(kind: Kind) -> Self {
        Self {
            kind,
            fallback: None,
            _marker: PhantomData,
        }
    }

    /// Chain a fallback handle consulted when this handle cannot satisfy a
    /// request. The handle owns its fallback; teardown releases the chain
    /// back to front.
    ///
    /// # Examples
    ///
    /// ```
    /// use kloss::Allocator;
    ///
    /// let mut alloc = Allocator::growing(256).with_fallback(Allocator::system());
    ///
    /// // Too large for any region; served by the fallback.
    /// let p = alloc.alloc(4096).expect("allocation failed");
    ///
    /// // SAFETY: `p` is live and was allocated through this chain.
    /// unsafe {
    ///     alloc.free(Some(p));
    /// }
    /// ```
    pub fn with_fallback(mut self, fallback: Allocator<'a>) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Allocate `size` bytes.
    ///
    /// Tries this handle's strategy first and walks the fallback chain on
    /// failure. Returns `None` when the whole chain is exhausted, and for
    /// `size == 0` or sizes over [`MAX_BYTES`](crate::MAX_BYTES).
    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 || size > MAX_BYTES {
            return None;
        }

        let header = self.chain_make(size)?;

        // SAFETY: The header fronts a fresh payload of at least `size`
        // bytes.
        Some(unsafe { header::user_of(header) })
    }

    /// Allocate `count * size` zeroed bytes.
    pub fn alloc_zeroed(&mut self, count: usize, size: usize) -> Option<NonNull<u8>> {
        let bytes = count.checked_mul(size)?;
        let ptr = self.alloc(bytes)?;

        // SAFETY: `alloc` returned at least `bytes` addressable bytes.
        unsafe {
            ptr::write_bytes(ptr.as_ptr(), 0, bytes);
        }

        Some(ptr)
    }

    /// Allocate a copy of `source`. Returns `None` for an empty source or
    /// when the chain is exhausted.
    pub fn copy_of(&mut self, source: &[u8]) -> Option<NonNull<u8>> {
        let ptr = self.alloc(source.len())?;

        // SAFETY: The allocation holds at least `source.len()` bytes and
        // cannot overlap a live borrow.
        unsafe {
            ptr::copy_nonoverlapping(source.as_ptr(), ptr.as_ptr(), source.len());
        }

        Some(ptr)
    }

    /// Resize an allocation to `size` bytes, preserving the leading
    /// `min(old, new)` payload bytes.
    ///
    /// The owning handle first attempts an in-place resize, then a
    /// relocation within its own strategy. If both fail the allocation
    /// migrates: a fresh block is taken from the root of the chain, the
    /// payload is copied over, and the original is freed. On `None` the
    /// original allocation is left untouched.
    ///
    /// `resize(None, size)` behaves as [`alloc`](Self::alloc);
    /// `resize(ptr, 0)` behaves as [`free`](Self::free) and returns `None`.
    ///
    /// # Safety
    ///
    /// `ptr` must be `None` or a live allocation made through an
    /// [`Allocator`], so that its in-band header is readable.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is not owned by any handle on the chain.
    pub unsafe fn resize(&mut self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
        let Some(ptr) = ptr else {
            return self.alloc(size);
        };

        if size == 0 {
            self.free(Some(ptr));
            return None;
        }

        if size > MAX_BYTES {
            return None;
        }

        let header = header::header_of(ptr);

        let Some(owner) = self.owner_mut(header) else {
            panic!("resized pointer {ptr:?} is not owned by any allocator in the chain");
        };

        if let Some(moved) = owner.kind.resize(header, size) {
            return Some(header::user_of(moved));
        }

        // The owner could not serve the resize; migrate to a fresh
        // allocation from the root of the chain.
        let new_ptr = self.alloc(size)?;
        let moved = header::header_of(new_ptr);

        ptr::copy_nonoverlapping(
            ptr.as_ptr(),
            new_ptr.as_ptr(),
            payload_bytes(header).min(payload_bytes(moved)),
        );

        self.free(Some(ptr));
        Some(new_ptr)
    }

    /// Free an allocation. `free(None)` is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be `None` or a live allocation made through an
    /// [`Allocator`], so that its in-band header is readable.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is not owned by any handle on the chain.
    pub unsafe fn free(&mut self, ptr: Option<NonNull<u8>>) {
        let Some(ptr) = ptr else {
            return;
        };

        let header = header::header_of(ptr);

        let Some(owner) = self.owner_mut(header) else {
            panic!("freed pointer {ptr:?} is not owned by any allocator in the chain");
        };

        owner.kind.release(header);
    }

    fn chain_make(&mut self, size: usize) -> Option<NonNull<AllocationHeader>> {
        let mut node = Some(self);

        while let Some(handle) = node.take() {
            // SAFETY: Size has been bounds-checked by the caller.
            if let Some(header) = unsafe { handle.kind.make(size) } {
                return Some(header);
            }

            node = handle.fallback.as_deref_mut();
        }

        None
    }

    /// Walk the chain for the handle owning `header`.
    fn owner_mut(&mut self, header: NonNull<AllocationHeader>) -> Option<&mut Allocator<'a>> {
        let mut node = Some(self);

        while let Some(handle) = node.take() {
            // SAFETY: The header is readable; per-variant predicates only
            // inspect it and their own state.
            if unsafe { handle.kind.owns(header) } {
                return Some(handle);
            }

            node = handle.fallback.as_deref_mut();
        }

        None
    }
}

impl Default for Allocator<'_> {
    #[inline]
    fn default() -> Self {
        Self::system()
    }
}

impl Drop for Allocator<'_> {
    fn drop(&mut self) {
        // Tear down the fallback chain first.
        self.fallback = None;

        if let Kind::Tracked(tracked) = &mut self.kind {
            // SAFETY: Every ledger entry is a live heap block made by this
            // handle.
            unsafe {
                tracked.release_all();
            }
        }
    }
}

impl Kind {
    unsafe fn make(&mut self, size: usize) -> Option<NonNull<AllocationHeader>> {
        match self {
            Kind::System => system::make(size),
            Kind::Tracked(tracked) => tracked.make(size),
            Kind::Fixed(region) => region.make(size),
            Kind::Growing {
                regions,
                region_size,
            } => growing_make(regions, *region_size, size),
        }
    }

    unsafe fn owns(&self, header: NonNull<AllocationHeader>) -> bool {
        match self {
            Kind::System => header.as_ref().freelist_tag == SYSTEM_TAG,
            Kind::Tracked(tracked) => tracked.owns(header),
            Kind::Fixed(region) => region.contains(header),
            Kind::Growing { regions, .. } => regions.iter().any(|region| region.contains(header)),
        }
    }

    unsafe fn release(&mut self, header: NonNull<AllocationHeader>) {
        match self {
            Kind::System => system::release(header),
            Kind::Tracked(tracked) => tracked.release(header),
            Kind::Fixed(region) => region.release(header),
            Kind::Growing { regions, .. } => {
                for region in regions.iter_mut() {
                    if region.contains(header) {
                        region.release(header);
                        return;
                    }
                }

                debug_assert!(false, "growing strategy lost track of a header");
            }
        }
    }

    /// Strategy-local resize: in place where possible, relocating within
    /// the strategy where not. `None` defers to chain-level migration.
    unsafe fn resize(
        &mut self,
        header: NonNull<AllocationHeader>,
        size: usize,
    ) -> Option<NonNull<AllocationHeader>> {
        match self {
            Kind::System => system::resize(header, size),
            Kind::Tracked(tracked) => tracked.resize(header, size),
            Kind::Fixed(region) => region.resize_in_place(header, size).then_some(header),
            Kind::Growing {
                regions,
                region_size,
            } => {
                if size > *region_size {
                    return None;
                }

                let at = regions.iter().position(|region| region.contains(header))?;

                if regions[at].resize_in_place(header, size) {
                    return Some(header);
                }

                // Relocate into whichever region can take it, adding a
                // fresh one if needed, then drop the original blocks.
                let moved = growing_make(regions, *region_size, size)?;

                ptr::copy_nonoverlapping(
                    header::user_of(header).as_ptr(),
                    header::user_of(moved).as_ptr(),
                    payload_bytes(header).min(payload_bytes(moved)),
                );

                regions[at].release(header);
                Some(moved)
            }
        }
    }
}

/// Allocate from the first region able to serve, appending a fresh region
/// when none can. Requests over `region_size` are rejected outright.
unsafe fn growing_make(
    regions: &mut Vec<Region>,
    region_size: usize,
    size: usize,
) -> Option<NonNull<AllocationHeader>> {
    if size > region_size {
        return None;
    }

    for region in regions.iter_mut() {
        if let Some(header) = region.make(size) {
            return Some(header);
        }
    }

    // Payload capacity plus its header plus the sentinel slot, so any
    // request that passed the size gate fits in a fresh region.
    let mut region = Region::owned(blocks_for(region_size) + 2 * HEADER_BLOCKS);
    let header = region.make(size);
    debug_assert!(header.is_some(), "fresh region rejected an in-range request");
    regions.push(region);
    header
}
