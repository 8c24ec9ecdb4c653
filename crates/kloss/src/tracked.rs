//! OS-heap strategy that records ownership of each live block.
//!
//! The ledger reuses [`FreeList`] purely as a membership set: entries are
//! live blocks rather than free ones, and no coalescing semantics apply.
//! Each block's tag indexes its ledger slot, which makes the ownership test
//! O(1) and lets teardown release every outstanding block.

use core::ptr::NonNull;

use crate::free_list::FreeList;
use crate::header::AllocationHeader;
use crate::system;

pub(crate) struct Tracked {
    ledger: FreeList,
}

impl Tracked {
    pub(crate) const fn new() -> Self {
        Self {
            ledger: FreeList::new(),
        }
    }

    /// Ownership predicate for routing.
    ///
    /// # Safety
    ///
    /// `header` must point at a readable allocation header.
    #[inline]
    pub(crate) unsafe fn owns(&self, header: NonNull<AllocationHeader>) -> bool {
        self.ledger.contains(header)
    }

    pub(crate) unsafe fn make(&mut self, size: usize) -> Option<NonNull<AllocationHeader>> {
        let header = system::raw_make(size)?;
        self.ledger.append(header);
        Some(header)
    }

    /// # Safety
    ///
    /// `header` must be owned by this ledger.
    pub(crate) unsafe fn release(&mut self, header: NonNull<AllocationHeader>) {
        self.ledger.remove(header);
        system::raw_release(header);
    }

    /// # Safety
    ///
    /// `header` must be owned by this ledger.
    pub(crate) unsafe fn resize(
        &mut self,
        header: NonNull<AllocationHeader>,
        size: usize,
    ) -> Option<NonNull<AllocationHeader>> {
        let tag = header.as_ref().freelist_tag;
        let moved = system::raw_resize(header, size)?;

        // The tag travelled with the block; point the ledger slot at the
        // possibly moved header.
        self.ledger.update(tag, moved);
        Some(moved)
    }

    /// Release every block still in the ledger.
    pub(crate) unsafe fn release_all(&mut self) {
        while let Some(header) = self.ledger.last() {
            self.ledger.remove(header);
            system::raw_release(header);
        }
    }
}
