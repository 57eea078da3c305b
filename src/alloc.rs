use {
    crate::AllocError,
    std::{
        alloc::Layout,
        ptr::{self, NonNull},
    },
};

/// Allocation policy used for callables which do not fit in a [`Function`]'s inline buffer.
///
/// A copy of the allocator is stored next to every heap-resident callable,
/// so that the block is always freed, and cloned, by the allocator which produced it.
///
/// # Safety
///
/// Implementations must return blocks valid for reads and writes of `layout.size()` bytes,
/// aligned to `layout.align()`, until passed back to [`deallocate`].
/// Blocks allocated by one instance must be deallocatable by any clone of it.
///
/// [`Function`]: struct.Function.html
/// [`deallocate`]: #tymethod.deallocate
pub unsafe trait Allocator: Clone {
    /// Returns a block for `layout`, or an [`AllocError`] if the request cannot be satisfied.
    ///
    /// Never returns a null pointer.
    ///
    /// [`AllocError`]: struct.AllocError.html
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`allocate`] of this allocator (or a clone of it)
    /// for the same `layout`, and must not have been deallocated since.
    ///
    /// [`allocate`]: #tymethod.allocate
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl Allocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            // Zero-sized blocks never touch the heap; any aligned non-null address will do.
            let dangling = ptr::without_provenance_mut::<u8>(layout.align());
            return NonNull::new(dangling).ok_or(AllocError::new(layout));
        }

        let ptr = unsafe { std::alloc::alloc(layout) };

        NonNull::new(ptr).ok_or(AllocError::new(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            std::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}
