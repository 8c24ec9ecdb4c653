//! Passthrough to the OS heap.
//!
//! Blocks made here carry the same in-band header as region allocations,
//! which is what lets any strategy on a fallback chain recognise, resize,
//! and release them. The raw helpers are shared with the tracked-system
//! strategy, which stamps its own ownership tags.

use core::alloc::Layout;
use core::ptr::NonNull;

use alloc::alloc;

use crate::header::{blocks_for, total_bytes, AllocationHeader, BLOCK, HEADER_BYTES, SYSTEM_TAG};

/// The layout a heap block was made with, reconstructed from its header.
///
/// # Safety
///
/// `header` must front a live heap block made by this module.
#[inline]
unsafe fn layout_of(header: NonNull<AllocationHeader>) -> Layout {
    let bytes = HEADER_BYTES + header.as_ref().block_count as usize * BLOCK;

    // SAFETY: The layout was validated when the block was made.
    Layout::from_size_align_unchecked(bytes, BLOCK)
}

/// Heap-allocate a block for `size` bytes of payload, tag left clear.
pub(crate) unsafe fn raw_make(size: usize) -> Option<NonNull<AllocationHeader>> {
    let Ok(layout) = Layout::from_size_align(total_bytes(size), BLOCK) else {
        return None;
    };

    let header = NonNull::new(alloc::alloc(layout))?.cast::<AllocationHeader>();

    header.as_ptr().write(AllocationHeader {
        block_count: blocks_for(size),
        freelist_tag: 0,
    });

    Some(header)
}

/// Release a heap block.
///
/// # Safety
///
/// `header` must front a live heap block made by this module.
pub(crate) unsafe fn raw_release(header: NonNull<AllocationHeader>) {
    alloc::dealloc(header.as_ptr().cast(), layout_of(header));
}

/// Resize a heap block, which may move it. The header's tag travels with
/// the bytes; only the block count is rewritten.
///
/// # Safety
///
/// `header` must front a live heap block made by this module.
pub(crate) unsafe fn raw_resize(
    header: NonNull<AllocationHeader>,
    size: usize,
) -> Option<NonNull<AllocationHeader>> {
    let mut moved = NonNull::new(alloc::realloc(
        header.as_ptr().cast(),
        layout_of(header),
        total_bytes(size),
    ))?
    .cast::<AllocationHeader>();

    moved.as_mut().block_count = blocks_for(size);
    Some(moved)
}

pub(crate) unsafe fn make(size: usize) -> Option<NonNull<AllocationHeader>> {
    let mut header = raw_make(size)?;
    header.as_mut().freelist_tag = SYSTEM_TAG;
    Some(header)
}

pub(crate) unsafe fn release(header: NonNull<AllocationHeader>) {
    debug_assert_eq!(header.as_ref().freelist_tag, SYSTEM_TAG);
    raw_release(header);
}

pub(crate) unsafe fn resize(
    header: NonNull<AllocationHeader>,
    size: usize,
) -> Option<NonNull<AllocationHeader>> {
    raw_resize(header, size)
}
