use {
    crate::{AllocError, Allocator, Callable, Signature},
    static_assertions::{assert_eq_size, const_assert, const_assert_eq},
    std::{
        alloc::Layout,
        mem::{align_of, size_of, MaybeUninit},
        ptr::{self, NonNull},
    },
};

/// Footprint of a dispatch table reference, a function pointer and a data pointer.
#[allow(dead_code)]
#[repr(C)]
struct InlineFootprint {
    vtable: &'static (),
    func: fn(),
    data: *const (),
}

assert_eq_size!(InlineFootprint, [usize; 3]);

/// Number of bytes available for a callable (and its allocator) stored inline in a [`Function`].
///
/// x86: 12b
/// x64: 24b
///
/// Enough for a bare function pointer or a closure capturing two or three words.
///
/// [`Function`]: struct.Function.html
pub const INLINE_CAPACITY: usize = size_of::<InlineFootprint>();

/// Alignment of the inline buffer of a [`Function`].
///
/// [`Function`]: struct.Function.html
pub const INLINE_ALIGN: usize = align_of::<InlineBuffer>();

/// Raw byte buffer used to store the callable, if it fits in `INLINE_CAPACITY` bytes.
#[repr(C, align(16))]
pub(crate) struct InlineBuffer(MaybeUninit<[u8; INLINE_CAPACITY]>);

const_assert!(INLINE_CAPACITY >= size_of::<fn()>() + size_of::<*const ()>());
const_assert_eq!(INLINE_ALIGN, 16);
const_assert!(INLINE_ALIGN >= align_of::<u64>());

impl InlineBuffer {
    pub(crate) fn uninit() -> Self {
        Self(MaybeUninit::uninit())
    }

    pub(crate) fn as_ptr(&self) -> NonNull<u8> {
        NonNull::from(&self.0).cast()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> NonNull<u8> {
        NonNull::from(&mut self.0).cast()
    }
}

/// Dispatch table for one `ConcreteCallable<F, A>` instantiation.
/// A static reference to this is stored next to the callable in the [`Function`].
///
/// All pointers passed to the table functions point at a live `ConcreteCallable<F, A>`,
/// except the destination of `clone_into`, which points at uninitialized inline storage.
///
/// [`Function`]: struct.Function.html
pub(crate) struct VTable<S: Signature> {
    pub(crate) call: unsafe fn(NonNull<u8>, S::Args) -> S::Output,
    /// Size and alignment of the `ConcreteCallable<F, A>`.
    pub(crate) layout: Layout,
    /// Clones the callable into inline storage.
    pub(crate) clone_into: unsafe fn(NonNull<u8>, NonNull<u8>),
    /// Clones the callable into a block from the callable's own allocator.
    pub(crate) clone_boxed: unsafe fn(NonNull<u8>) -> Result<NonNull<u8>, AllocError>,
    /// Drops an inline callable.
    pub(crate) drop_in_place: unsafe fn(NonNull<u8>),
    /// Drops a heap-resident callable and frees its block via its own allocator.
    pub(crate) destroy_and_free: unsafe fn(NonNull<u8>),
}

/// A wrapped callable together with the allocator used for its heap block, if any.
pub(crate) struct ConcreteCallable<F, A> {
    value: F,
    alloc: A,
}

impl<F, A: Allocator> ConcreteCallable<F, A> {
    pub(crate) const LAYOUT: Layout = Layout::new::<Self>();

    /// Decided per instantiation; the heap path is never taken for callables which fit.
    pub(crate) const FITS_INLINE: bool =
        size_of::<Self>() <= INLINE_CAPACITY && align_of::<Self>() <= INLINE_ALIGN;

    pub(crate) fn new(value: F, alloc: A) -> Self {
        Self { value, alloc }
    }

    fn allocate_via_self(&self) -> Result<NonNull<u8>, AllocError> {
        self.alloc.allocate(Self::LAYOUT)
    }

    /// Moves the callable into a block from its own allocator.
    /// On failure the callable is dropped.
    pub(crate) fn into_boxed(self) -> Result<NonNull<Self>, AllocError> {
        let ptr = self.allocate_via_self()?.cast::<Self>();

        unsafe {
            ptr.as_ptr().write(self);
        }

        Ok(ptr)
    }

    /// # Safety
    ///
    /// `this` must have been returned by [`into_boxed`] and not freed since.
    ///
    /// [`into_boxed`]: #method.into_boxed
    unsafe fn destroy_and_free_self(this: NonNull<Self>) {
        let Self { value, alloc } = ptr::read(this.as_ptr());

        // Frees the block even if dropping the value panics.
        let _block = Block {
            alloc: &alloc,
            ptr: this.cast(),
            layout: Self::LAYOUT,
        };

        drop(value);
    }
}

impl<F: Clone, A: Allocator> ConcreteCallable<F, A> {
    fn clone_callable(&self) -> Self {
        Self {
            value: self.value.clone(),
            alloc: self.alloc.clone(),
        }
    }
}

struct Block<'a, A: Allocator> {
    alloc: &'a A,
    ptr: NonNull<u8>,
    layout: Layout,
}

impl<'a, A: Allocator> Drop for Block<'a, A> {
    fn drop(&mut self) {
        unsafe {
            self.alloc.deallocate(self.ptr, self.layout);
        }
    }
}

trait Erased<S: Signature> {
    const VTABLE: VTable<S>;
}

impl<S, F, A> Erased<S> for ConcreteCallable<F, A>
where
    S: Signature,
    F: Callable<S> + Clone,
    A: Allocator,
{
    const VTABLE: VTable<S> = VTable {
        call: call::<S, F, A>,
        layout: Self::LAYOUT,
        clone_into: clone_into::<F, A>,
        clone_boxed: clone_boxed::<F, A>,
        drop_in_place: drop_in_place::<F, A>,
        destroy_and_free: destroy_and_free::<F, A>,
    };
}

/// Returns the dispatch table for `ConcreteCallable<F, A>` called with signature `S`.
pub(crate) fn vtable<S, F, A>() -> &'static VTable<S>
where
    S: Signature + 'static,
    F: Callable<S> + Clone,
    A: Allocator,
{
    &<ConcreteCallable<F, A> as Erased<S>>::VTABLE
}

unsafe fn concrete<'a, F, A>(ptr: NonNull<u8>) -> &'a mut ConcreteCallable<F, A> {
    &mut *ptr.cast::<ConcreteCallable<F, A>>().as_ptr()
}

/// Shared access only; `ptr` may come from a `&InlineBuffer`.
unsafe fn concrete_ref<'a, F, A>(ptr: NonNull<u8>) -> &'a ConcreteCallable<F, A> {
    &*ptr.cast::<ConcreteCallable<F, A>>().as_ptr()
}

unsafe fn call<S, F, A>(this: NonNull<u8>, args: S::Args) -> S::Output
where
    S: Signature,
    F: Callable<S>,
{
    concrete::<F, A>(this).value.invoke(args)
}

unsafe fn clone_into<F: Clone, A: Allocator>(src: NonNull<u8>, dst: NonNull<u8>) {
    let copy = concrete_ref::<F, A>(src).clone_callable();

    dst.cast::<ConcreteCallable<F, A>>().as_ptr().write(copy);
}

unsafe fn clone_boxed<F: Clone, A: Allocator>(src: NonNull<u8>) -> Result<NonNull<u8>, AllocError> {
    log::trace!(
        "cloning a heap-resident callable ({} bytes) via its own allocator",
        ConcreteCallable::<F, A>::LAYOUT.size()
    );

    let copy = concrete_ref::<F, A>(src).clone_callable();

    copy.into_boxed().map(NonNull::cast)
}

unsafe fn drop_in_place<F, A>(this: NonNull<u8>) {
    ptr::drop_in_place(this.cast::<ConcreteCallable<F, A>>().as_ptr());
}

unsafe fn destroy_and_free<F, A: Allocator>(this: NonNull<u8>) {
    ConcreteCallable::<F, A>::destroy_and_free_self(this.cast());
}
