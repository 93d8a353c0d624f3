//! Invocation adapters
//!
//! Bridges statically typed Rust callables into the uniform [`Invoker`]
//! shape the registry stores. Each adapter captures its own parameter and
//! return types, checks the argument count, coerces every argument
//! positionally through [`FromValue`], calls, and converts the result with
//! [`IntoValue`].
//!
//! Two families are implemented for arities 0 through 8:
//!
//! - [`Function`] for free functions and closures, `Fn(A0, A1, ..) -> R`
//! - [`Method`] for methods on a backing instance, either
//!   `Fn(&T, A0, ..) -> R` ([`Shared`]) or `Fn(&mut T, A0, ..) -> R`
//!   ([`Exclusive`])
//!
//! Panics raised by the callable are caught and reported as
//! [`Error::Panic`], leaving the registry usable for the next call.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::convert::{FromValue, IntoValue, NativeType};
use crate::error::{Error, Result};
use crate::value::Value;

/// Uniform invoker: ordered argument list in, one value (or `Void`) out.
pub type Invoker = Box<dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync>;

/// Backing instance of bound methods, locked for the duration of each call.
pub type Handle<T> = Arc<Mutex<T>>;

/// Wrap `value` as a backing instance handle
pub fn handle<T>(value: T) -> Handle<T> {
    Arc::new(Mutex::new(value))
}

/// Declared parameter and return type labels of a callable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    /// Parameter type labels, receiver excluded
    pub params: Vec<String>,
    /// Return type label
    pub ret: String,
}

impl Signature {
    /// Signature with explicit labels
    pub fn new(params: Vec<String>, ret: impl Into<String>) -> Self {
        Signature {
            params,
            ret: ret.into(),
        }
    }

    /// Declared parameter count
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Marker for methods taking `&T`
pub enum Shared {}

/// Marker for methods taking `&mut T`
pub enum Exclusive {}

/// A free callable that can be adapted into an [`Invoker`].
///
/// `Args` is the tuple of parameter types; it only exists to keep the
/// per-arity implementations apart and is always inferred.
pub trait Function<Args>: Send + Sync + 'static {
    /// Parameter and return type labels
    fn signature() -> Signature;

    /// Erase into a uniform invoker
    fn into_invoker(self) -> Invoker;
}

/// A method on `T` that can be bound to a backing instance.
///
/// `Marker` is `(Shared | Exclusive, A0, A1, ..)` and is always inferred.
pub trait Method<T, Marker>: Send + Sync + 'static {
    /// Parameter and return type labels, receiver excluded
    fn signature() -> Signature;

    /// Bind to `instance`, erasing into a uniform invoker
    fn bind(self, instance: Handle<T>) -> Invoker;
}

/// Fail unless exactly `expected` arguments were supplied.
pub fn check_arity(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ArityMismatch { expected, actual })
    }
}

/// Coerce the argument at `position`.
fn arg<A: FromValue>(position: usize, value: Value) -> Result<A> {
    A::from_value(value).map_err(|mismatch| mismatch.at(position))
}

/// Move the argument list into a fixed-size array, enforcing arity.
fn unpack<const N: usize>(args: Vec<Value>) -> Result<[Value; N]> {
    args.try_into()
        .map_err(|args: Vec<Value>| Error::ArityMismatch {
            expected: N,
            actual: args.len(),
        })
}

/// Run `call`, turning a panic into [`Error::Panic`].
fn catch<R>(call: impl FnOnce() -> R) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| Error::Panic(panic_message(&*payload)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Per-arity implementations
// ============================================================================

macro_rules! impl_adapters {
    ($count:literal; $($idx:literal $arg:ident: $A:ident),*) => {
        impl<F, R, $($A,)*> Function<($($A,)*)> for F
        where
            F: Fn($($A),*) -> R + Send + Sync + 'static,
            R: IntoValue,
            $($A: FromValue,)*
        {
            fn signature() -> Signature {
                Signature {
                    params: vec![$(<$A as NativeType>::type_name().into_owned()),*],
                    ret: R::type_name().into_owned(),
                }
            }

            fn into_invoker(self) -> Invoker {
                Box::new(move |args: Vec<Value>| {
                    let [$($arg),*] = unpack::<$count>(args)?;
                    $(let $arg = arg::<$A>($idx, $arg)?;)*
                    catch(|| (self)($($arg),*)).map(IntoValue::into_value)
                })
            }
        }

        impl<T, F, R, $($A,)*> Method<T, (Shared, $($A,)*)> for F
        where
            T: Send + 'static,
            F: Fn(&T, $($A),*) -> R + Send + Sync + 'static,
            R: IntoValue,
            $($A: FromValue,)*
        {
            fn signature() -> Signature {
                Signature {
                    params: vec![$(<$A as NativeType>::type_name().into_owned()),*],
                    ret: R::type_name().into_owned(),
                }
            }

            fn bind(self, instance: Handle<T>) -> Invoker {
                Box::new(move |args: Vec<Value>| {
                    let [$($arg),*] = unpack::<$count>(args)?;
                    $(let $arg = arg::<$A>($idx, $arg)?;)*
                    catch(|| {
                        let guard = instance.lock();
                        (self)(&*guard, $($arg),*)
                    })
                    .map(IntoValue::into_value)
                })
            }
        }

        impl<T, F, R, $($A,)*> Method<T, (Exclusive, $($A,)*)> for F
        where
            T: Send + 'static,
            F: Fn(&mut T, $($A),*) -> R + Send + Sync + 'static,
            R: IntoValue,
            $($A: FromValue,)*
        {
            fn signature() -> Signature {
                Signature {
                    params: vec![$(<$A as NativeType>::type_name().into_owned()),*],
                    ret: R::type_name().into_owned(),
                }
            }

            fn bind(self, instance: Handle<T>) -> Invoker {
                Box::new(move |args: Vec<Value>| {
                    let [$($arg),*] = unpack::<$count>(args)?;
                    $(let $arg = arg::<$A>($idx, $arg)?;)*
                    catch(|| {
                        let mut guard = instance.lock();
                        (self)(&mut *guard, $($arg),*)
                    })
                    .map(IntoValue::into_value)
                })
            }
        }
    };
}

impl_adapters!(0;);
impl_adapters!(1; 0 a0: A0);
impl_adapters!(2; 0 a0: A0, 1 a1: A1);
impl_adapters!(3; 0 a0: A0, 1 a1: A1, 2 a2: A2);
impl_adapters!(4; 0 a0: A0, 1 a1: A1, 2 a2: A2, 3 a3: A3);
impl_adapters!(5; 0 a0: A0, 1 a1: A1, 2 a2: A2, 3 a3: A3, 4 a4: A4);
impl_adapters!(6; 0 a0: A0, 1 a1: A1, 2 a2: A2, 3 a3: A3, 4 a4: A4, 5 a5: A5);
impl_adapters!(7; 0 a0: A0, 1 a1: A1, 2 a2: A2, 3 a3: A3, 4 a4: A4, 5 a5: A5, 6 a6: A6);
impl_adapters!(8; 0 a0: A0, 1 a1: A1, 2 a2: A2, 3 a3: A3, 4 a4: A4, 5 a5: A5, 6 a6: A6, 7 a7: A7);
