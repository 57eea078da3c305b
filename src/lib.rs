//! Owning, type-erased callable wrapper with small function optimization.
//!
//! [`Function<S, A>`] stores any `FnMut + Clone` matching the signature `S`
//! (written as a fn pointer type, e.g. `Function<fn(i32, i32) -> i32>`).
//! Callables of up to [`INLINE_CAPACITY`] bytes are stored in the object;
//! larger ones are stored in a block from an [`Allocator`] (by default the process heap, [`Global`]).
//!
//! ```
//! use smallfn::Function;
//!
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! let mut f = Function::<fn(i64, i64) -> i64>::new(add);
//! assert!(!f.was_allocated());
//! assert_eq!(f.call(2, 3), 5);
//!
//! let (a, b, c, d) = (1i64, 2i64, 3i64, 4i64);
//! f.set(move |x: i64, y: i64| a + b + c + d + x + y);
//! assert!(f.was_allocated());
//! assert_eq!(f.call(2, 3), 15);
//!
//! let mut g = f.take();
//! assert!(f.is_none());
//! assert_eq!(g.call(0, 0), 10);
//! ```
//!
//! [`Function<S, A>`]: struct.Function.html
//! [`INLINE_CAPACITY`]: constant.INLINE_CAPACITY.html
//! [`Allocator`]: trait.Allocator.html
//! [`Global`]: struct.Global.html

mod alloc;
mod erased;
mod error;
mod function;
mod signature;

pub use {
    alloc::{Allocator, Global},
    erased::{INLINE_ALIGN, INLINE_CAPACITY},
    error::{AllocError, Error},
    function::Function,
    signature::{Callable, Signature},
};
