use std::alloc::Layout;

use thiserror::Error;

/// Returned by an [`Allocator`] which could not satisfy a request.
///
/// [`Allocator`]: trait.Allocator.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("memory allocation of {} bytes (align {}) failed", .layout.size(), .layout.align())]
pub struct AllocError {
    pub layout: Layout,
}

impl AllocError {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
}

/// Failures surfaced by the fallible [`Function`] entry points.
///
/// Errors produced by the wrapped callable itself are never wrapped in this type;
/// they are part of the callable's own return value.
///
/// [`Function`]: struct.Function.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    OutOfMemory(#[from] AllocError),

    #[error("tried to call an empty `Function`")]
    EmptyCallableInvoked,
}
