use crate::{Allocator, Error, Function};

/// A call signature, named by the matching fn pointer type, e.g. `fn(i32, i32) -> i32`.
///
/// The fn pointer type is a marker only; nothing of that type is ever stored.
pub trait Signature {
    /// Parameter types, as a tuple.
    type Args;
    type Output;
}

/// Callables invocable with signature `S`.
///
/// Implemented for every `FnMut` with the matching parameter and return types.
pub trait Callable<S: Signature> {
    fn invoke(&mut self, args: S::Args) -> S::Output;
}

macro_rules! impl_signature {
    ($($arg:ident: $ty:ident),*) => {
        impl<R, $($ty,)*> Signature for fn($($ty),*) -> R {
            type Args = ($($ty,)*);
            type Output = R;
        }

        impl<F, R, $($ty,)*> Callable<fn($($ty),*) -> R> for F
        where
            F: FnMut($($ty),*) -> R,
        {
            #[inline]
            fn invoke(&mut self, ($($arg,)*): ($($ty,)*)) -> R {
                (*self)($($arg),*)
            }
        }

        impl<R, $($ty,)* A> Function<fn($($ty),*) -> R, A>
        where
            R: 'static,
            $($ty: 'static,)*
            A: Allocator,
        {
            /// Calls the stored callable.
            ///
            /// # Panics
            ///
            /// Panics if the [`Function`] is empty.
            ///
            /// [`Function`]: struct.Function.html
            #[inline]
            pub fn call(&mut self, $($arg: $ty),*) -> R {
                self.call_with(($($arg,)*))
            }

            /// Calls the stored callable, or returns [`Error::EmptyCallableInvoked`] if there is none.
            ///
            /// [`Error::EmptyCallableInvoked`]: enum.Error.html#variant.EmptyCallableInvoked
            #[inline]
            pub fn try_call(&mut self, $($arg: $ty),*) -> Result<R, Error> {
                self.try_call_with(($($arg,)*))
            }
        }
    };
}

impl_signature!();
impl_signature!(a0: A0);
impl_signature!(a0: A0, a1: A1);
impl_signature!(a0: A0, a1: A1, a2: A2);
impl_signature!(a0: A0, a1: A1, a2: A2, a3: A3);
impl_signature!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4);
impl_signature!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_signature!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
impl_signature!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);

#[cfg(test)]
mod tests {
    use super::*;

    fn invoke<S: Signature, F: Callable<S>>(mut f: F, args: S::Args) -> S::Output {
        f.invoke(args)
    }

    #[test]
    fn arities() {
        assert_eq!(invoke::<fn() -> u8, _>(|| 7u8, ()), 7);
        assert_eq!(invoke::<fn(u8) -> u8, _>(|a: u8| a + 1, (1,)), 2);
        assert_eq!(invoke::<fn(u8, u8) -> u8, _>(|a: u8, b: u8| a + b, (1, 2)), 3);
        assert_eq!(
            invoke::<fn(u8, u8, u8, u8, u8, u8, u8, u8) -> u8, _>(
                |a: u8, b: u8, c: u8, d: u8, e: u8, f: u8, g: u8, h: u8| a + b + c + d + e + f + g + h,
                (1, 2, 3, 4, 5, 6, 7, 8)
            ),
            36
        );
    }

    #[test]
    fn mutable_state() {
        let mut total = 0;
        let mut add = |x: i32| {
            total += x;
            total
        };

        assert_eq!(Callable::<fn(i32) -> i32>::invoke(&mut add, (2,)), 2);
        assert_eq!(Callable::<fn(i32) -> i32>::invoke(&mut add, (3,)), 5);
    }
}
