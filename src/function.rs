use {
    crate::{
        erased::{self, ConcreteCallable, InlineBuffer, VTable},
        AllocError, Allocator, Callable, Error, Global, Signature,
    },
    std::{fmt, marker::PhantomData, mem, ptr::NonNull},
};

/// Owning, type-erased wrapper for a callable with signature `S`, e.g. `Function<fn(i32) -> i32>`.
///
/// Internally uses the small function optimization: callables (together with their allocator)
/// of up to [`INLINE_CAPACITY`] bytes and up to [`INLINE_ALIGN`] alignment are stored in the object.
/// Larger callables are stored in a block obtained from an [`Allocator`].
/// The allocator is stored next to the callable, and the block is cloned and freed through it.
///
/// `A` is the allocator used by [`new`] \ [`try_new`] \ [`set`] \ [`try_set`];
/// [`new_in`] \ [`try_new_in`] \ [`set_in`] \ [`try_set_in`] accept any allocator.
///
/// Copies are made with [`try_clone`] / [`Clone`], moves are plain Rust moves;
/// [`take`] moves the callable out and leaves an empty `Function` behind.
///
/// [`INLINE_CAPACITY`]: constant.INLINE_CAPACITY.html
/// [`INLINE_ALIGN`]: constant.INLINE_ALIGN.html
/// [`Allocator`]: trait.Allocator.html
/// [`new`]: #method.new
/// [`try_new`]: #method.try_new
/// [`set`]: #method.set
/// [`try_set`]: #method.try_set
/// [`new_in`]: #method.new_in
/// [`try_new_in`]: #method.try_new_in
/// [`set_in`]: #method.set_in
/// [`try_set_in`]: #method.try_set_in
/// [`try_clone`]: #method.try_clone
/// [`take`]: #method.take
pub struct Function<S: Signature + 'static, A: Allocator = Global> {
    storage: Storage<S>,
    _alloc: PhantomData<fn() -> A>,
}

enum Storage<S: Signature + 'static> {
    Empty,
    Inline {
        vtable: &'static VTable<S>,
        buf: InlineBuffer,
    },
    Heap {
        vtable: &'static VTable<S>,
        ptr: NonNull<u8>,
    },
}

impl<S: Signature + 'static> Drop for Storage<S> {
    fn drop(&mut self) {
        match self {
            Storage::Empty => {}
            Storage::Inline { vtable, buf } => unsafe {
                (vtable.drop_in_place)(buf.as_mut_ptr());
            },
            Storage::Heap { vtable, ptr } => {
                log::trace!(
                    "releasing a heap-resident callable ({} bytes)",
                    vtable.layout.size()
                );

                unsafe {
                    (vtable.destroy_and_free)(*ptr);
                }
            }
        }
    }
}

impl<S: Signature + 'static, A: Allocator> Function<S, A> {
    /// Creates an empty [`Function`].
    ///
    /// [`Function`]: struct.Function.html
    pub const fn empty() -> Self {
        Self {
            storage: Storage::Empty,
            _alloc: PhantomData,
        }
    }

    /// Creates a [`Function`] which contains the callable `f`,
    /// heap-allocating with `A::default()` if it does not fit inline.
    ///
    /// Allocation failure is reported via [`handle_alloc_error`].
    ///
    /// [`Function`]: struct.Function.html
    /// [`handle_alloc_error`]: https://doc.rust-lang.org/std/alloc/fn.handle_alloc_error.html
    pub fn new<F>(f: F) -> Self
    where
        F: Callable<S> + Clone + 'static,
        A: Default + 'static,
    {
        Self::new_in(f, A::default())
    }

    /// Like [`new`], but returns an [`AllocError`] on allocation failure.
    /// `f` is dropped in that case.
    ///
    /// [`new`]: #method.new
    /// [`AllocError`]: struct.AllocError.html
    pub fn try_new<F>(f: F) -> Result<Self, AllocError>
    where
        F: Callable<S> + Clone + 'static,
        A: Default + 'static,
    {
        Self::try_new_in(f, A::default())
    }

    /// Creates a [`Function`] which contains the callable `f`,
    /// heap-allocating with `alloc` if it does not fit inline.
    ///
    /// `alloc` is stored with the callable either way, so it counts towards the inline capacity.
    ///
    /// Allocation failure is reported via [`handle_alloc_error`].
    ///
    /// [`Function`]: struct.Function.html
    /// [`handle_alloc_error`]: https://doc.rust-lang.org/std/alloc/fn.handle_alloc_error.html
    pub fn new_in<F, B>(f: F, alloc: B) -> Self
    where
        F: Callable<S> + Clone + 'static,
        B: Allocator + 'static,
    {
        match Self::try_new_in(f, alloc) {
            Ok(function) => function,
            Err(err) => std::alloc::handle_alloc_error(err.layout),
        }
    }

    /// Like [`new_in`], but returns an [`AllocError`] on allocation failure.
    /// `f` and `alloc` are dropped in that case.
    ///
    /// [`new_in`]: #method.new_in
    /// [`AllocError`]: struct.AllocError.html
    pub fn try_new_in<F, B>(f: F, alloc: B) -> Result<Self, AllocError>
    where
        F: Callable<S> + Clone + 'static,
        B: Allocator + 'static,
    {
        let vtable = erased::vtable::<S, F, B>();
        let concrete = ConcreteCallable::new(f, alloc);

        let storage = if ConcreteCallable::<F, B>::FITS_INLINE {
            let mut buf = InlineBuffer::uninit();

            unsafe {
                buf.as_mut_ptr()
                    .cast::<ConcreteCallable<F, B>>()
                    .as_ptr()
                    .write(concrete);
            }

            Storage::Inline { vtable, buf }
        } else {
            log::trace!(
                "callable does not fit inline ({} bytes, align {}), allocating",
                vtable.layout.size(),
                vtable.layout.align()
            );

            let ptr = concrete.into_boxed().map_err(|err| {
                log::debug!("failed to allocate a heap-resident callable: {}", err);
                err
            })?;

            Storage::Heap {
                vtable,
                ptr: ptr.cast(),
            }
        };

        Ok(Self {
            storage,
            _alloc: PhantomData,
        })
    }

    /// Replaces the stored callable, if any, with `f`. See [`new`].
    ///
    /// [`new`]: #method.new
    pub fn set<F>(&mut self, f: F)
    where
        F: Callable<S> + Clone + 'static,
        A: Default + 'static,
    {
        *self = Self::new(f);
    }

    /// Replaces the stored callable, if any, with `f`. See [`try_new`].
    ///
    /// On failure the previously stored callable is kept.
    ///
    /// [`try_new`]: #method.try_new
    pub fn try_set<F>(&mut self, f: F) -> Result<(), AllocError>
    where
        F: Callable<S> + Clone + 'static,
        A: Default + 'static,
    {
        *self = Self::try_new(f)?;
        Ok(())
    }

    /// Replaces the stored callable, if any, with `f`. See [`new_in`].
    ///
    /// [`new_in`]: #method.new_in
    pub fn set_in<F, B>(&mut self, f: F, alloc: B)
    where
        F: Callable<S> + Clone + 'static,
        B: Allocator + 'static,
    {
        *self = Self::new_in(f, alloc);
    }

    /// Replaces the stored callable, if any, with `f`. See [`try_new_in`].
    ///
    /// On failure the previously stored callable is kept.
    ///
    /// [`try_new_in`]: #method.try_new_in
    pub fn try_set_in<F, B>(&mut self, f: F, alloc: B) -> Result<(), AllocError>
    where
        F: Callable<S> + Clone + 'static,
        B: Allocator + 'static,
    {
        *self = Self::try_new_in(f, alloc)?;
        Ok(())
    }

    /// Copies the stored callable.
    ///
    /// Inline callables are copied inline; heap-resident callables are copied
    /// into a new block from the allocator they were stored with.
    /// On failure `self` is unchanged.
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        let storage = match &self.storage {
            Storage::Empty => Storage::Empty,
            Storage::Inline { vtable, buf } => {
                let mut copy = InlineBuffer::uninit();

                unsafe {
                    (vtable.clone_into)(buf.as_ptr(), copy.as_mut_ptr());
                }

                Storage::Inline {
                    vtable: *vtable,
                    buf: copy,
                }
            }
            Storage::Heap { vtable, ptr } => Storage::Heap {
                vtable: *vtable,
                ptr: unsafe { (vtable.clone_boxed)(*ptr)? },
            },
        };

        Ok(Self {
            storage,
            _alloc: PhantomData,
        })
    }

    /// Replaces the stored callable, if any, with a copy of `source`'s. See [`try_clone`].
    ///
    /// On failure `self` is unchanged.
    ///
    /// [`try_clone`]: #method.try_clone
    pub fn try_clone_from(&mut self, source: &Self) -> Result<(), AllocError> {
        *self = source.try_clone()?;
        Ok(())
    }

    /// Moves the stored callable, if any, out into a new [`Function`], leaving `self` empty.
    ///
    /// Heap-resident callables are not touched; only their pointer is transferred.
    ///
    /// [`Function`]: struct.Function.html
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::empty())
    }

    /// Drops the stored callable, if any; frees its heap block, if necessary.
    pub fn clear(&mut self) {
        self.storage = Storage::Empty;
    }

    /// Calls the stored callable with a tuple of arguments.
    ///
    /// # Panics
    ///
    /// Panics if the [`Function`] is empty.
    ///
    /// [`Function`]: struct.Function.html
    pub fn call_with(&mut self, args: S::Args) -> S::Output {
        match self.try_call_with(args) {
            Ok(output) => output,
            Err(err) => panic!("{}", err),
        }
    }

    /// Calls the stored callable with a tuple of arguments,
    /// or returns [`Error::EmptyCallableInvoked`] if there is none.
    ///
    /// [`Error::EmptyCallableInvoked`]: enum.Error.html#variant.EmptyCallableInvoked
    pub fn try_call_with(&mut self, args: S::Args) -> Result<S::Output, Error> {
        let (vtable, ptr) = match &mut self.storage {
            Storage::Empty => return Err(Error::EmptyCallableInvoked),
            Storage::Inline { vtable, buf } => (*vtable, buf.as_mut_ptr()),
            Storage::Heap { vtable, ptr } => (*vtable, *ptr),
        };

        Ok(unsafe { (vtable.call)(ptr, args) })
    }

    /// If the [`Function`] is empty, returns `true`; otherwise returns `false`.
    ///
    /// [`Function`]: struct.Function.html
    pub fn is_none(&self) -> bool {
        matches!(self.storage, Storage::Empty)
    }

    /// If the [`Function`] contains a callable, returns `true`; otherwise returns `false`.
    ///
    /// [`Function`]: struct.Function.html
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Returns `true` if the stored callable lives in a heap block.
    pub fn was_allocated(&self) -> bool {
        matches!(self.storage, Storage::Heap { .. })
    }

    /// Returns `true` if the stored callable lives in the inline buffer.
    pub fn is_inline(&self) -> bool {
        matches!(self.storage, Storage::Inline { .. })
    }
}

impl<S: Signature + 'static, A: Allocator> Default for Function<S, A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Signature + 'static, A: Allocator> Clone for Function<S, A> {
    /// # Panics
    ///
    /// Allocation failure is reported via [`handle_alloc_error`].
    ///
    /// [`handle_alloc_error`]: https://doc.rust-lang.org/std/alloc/fn.handle_alloc_error.html
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(function) => function,
            Err(err) => std::alloc::handle_alloc_error(err.layout),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if let Err(err) = self.try_clone_from(source) {
            std::alloc::handle_alloc_error(err.layout);
        }
    }
}

impl<S: Signature + 'static, A: Allocator> fmt::Debug for Function<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match self.storage {
            Storage::Empty => "empty",
            Storage::Inline { .. } => "inline",
            Storage::Heap { .. } => "heap",
        };

        f.debug_struct("Function").field("storage", &storage).finish()
    }
}
