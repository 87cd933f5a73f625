//! Basic signal constructors
//!
//! The leaves of a signal expression: constants, empty signals, direct views
//! of cells, and lambda-backed custom signals.

use std::cell::RefCell;
use std::marker::PhantomData;

use weft_identity::Id;

use crate::direction::{Duplex, ReadOnly};
use crate::signal::{PlainValue, ReadCache, Signal, WriteResult};

/// A signal that never has a value.
///
/// Types as duplex so it composes anywhere, but it never reads and is never
/// ready to write.
#[derive(Clone, Copy, Debug, Default)]
pub struct Empty<V> {
    _marker: PhantomData<V>,
}

/// Create a signal that never has a value.
pub fn empty<V: Clone + 'static>() -> Empty<V> {
    Empty {
        _marker: PhantomData,
    }
}

impl<V: Clone + 'static> Signal for Empty<V> {
    type Value = V;
    type Dir = Duplex;
    // Everything stays at the defaults: no value, null identity, not ready.
}

/// A read-only signal carrying a constant value.
#[derive(Clone, Copy, Debug)]
pub struct Value<V> {
    value: V,
}

/// Create a read-only signal carrying `v`.
pub fn value<V: PlainValue>(v: V) -> Value<V> {
    Value { value: v }
}

impl<V: PlainValue> Signal for Value<V> {
    type Value = V;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> Id {
        Id::of(self.value.clone())
    }

    fn read(&self) -> V {
        self.value.clone()
    }
}

/// A read-only `String` signal backed by a static string.
///
/// The identity is [`Id::Unit`]: a literal only ever has the one value, so
/// there is nothing to distinguish. The owned `String` is built on first
/// read.
#[derive(Clone, Debug)]
pub struct Literal {
    text: &'static str,
    cache: ReadCache<String>,
}

/// Create a signal from a string literal.
pub fn literal(text: &'static str) -> Literal {
    Literal {
        text,
        cache: ReadCache::new(),
    }
}

impl Signal for Literal {
    type Value = String;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> Id {
        Id::Unit
    }

    fn read(&self) -> String {
        self.cache.read(|| self.text.to_string())
    }
}

/// A duplex view of a borrowed cell.
#[derive(Debug)]
pub struct Direct<'a, V> {
    cell: &'a RefCell<V>,
}

/// Create a duplex signal directly exposing the value in `cell`.
pub fn direct<V>(cell: &RefCell<V>) -> Direct<'_, V> {
    Direct { cell }
}

impl<V> Clone for Direct<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Direct<'_, V> {}

impl<V: PlainValue> Signal for Direct<'_, V> {
    type Value = V;
    type Dir = Duplex;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> Id {
        Id::of(self.cell.borrow().clone())
    }

    fn read(&self) -> V {
        self.cell.borrow().clone()
    }

    fn ready_to_write(&self) -> bool {
        true
    }

    fn write(&self, value: V) -> WriteResult {
        *self.cell.borrow_mut() = value;
        Ok(())
    }
}

/// A read-only view of a borrowed value.
#[derive(Debug)]
pub struct DirectConst<'a, V> {
    value: &'a V,
}

/// Create a read-only signal directly exposing `value`.
pub fn direct_const<V>(value: &V) -> DirectConst<'_, V> {
    DirectConst { value }
}

impl<V> Clone for DirectConst<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for DirectConst<'_, V> {}

impl<V: PlainValue> Signal for DirectConst<'_, V> {
    type Value = V;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> Id {
        Id::of(self.value.clone())
    }

    fn read(&self) -> V {
        self.value.clone()
    }
}

/// A read-only signal whose value comes from a closure; always has a value.
#[derive(Clone)]
pub struct LambdaReader<F> {
    read: F,
}

/// Create a read-only signal that computes its value by calling `read`.
pub fn lambda_reader<V, F>(read: F) -> LambdaReader<F>
where
    V: PlainValue,
    F: Fn() -> V,
{
    LambdaReader { read }
}

impl<V, F> Signal for LambdaReader<F>
where
    V: PlainValue,
    F: Fn() -> V,
{
    type Value = V;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> Id {
        Id::of((self.read)())
    }

    fn read(&self) -> V {
        (self.read)()
    }
}

/// A read-only lambda signal with a separate presence test.
#[derive(Clone)]
pub struct LambdaReaderOpt<H, F> {
    has_value: H,
    read: F,
}

/// Create a read-only signal with presence determined by `has_value`.
pub fn lambda_reader_opt<V, H, F>(has_value: H, read: F) -> LambdaReaderOpt<H, F>
where
    V: PlainValue,
    H: Fn() -> bool,
    F: Fn() -> V,
{
    LambdaReaderOpt { has_value, read }
}

impl<V, H, F> Signal for LambdaReaderOpt<H, F>
where
    V: PlainValue,
    H: Fn() -> bool,
    F: Fn() -> V,
{
    type Value = V;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        (self.has_value)()
    }

    fn value_id(&self) -> Id {
        if self.has_value() {
            Id::of((self.read)())
        } else {
            Id::Null
        }
    }

    fn read(&self) -> V {
        (self.read)()
    }
}

/// A duplex signal assembled from four closures.
#[derive(Clone)]
pub struct LambdaDuplex<H, F, R, W> {
    has_value: H,
    read: F,
    ready_to_write: R,
    write: W,
}

/// Create a duplex signal from presence/read/readiness/write closures.
///
/// The write closure may reject the value with a validation error.
pub fn lambda_duplex<V, H, F, R, W>(
    has_value: H,
    read: F,
    ready_to_write: R,
    write: W,
) -> LambdaDuplex<H, F, R, W>
where
    V: PlainValue,
    H: Fn() -> bool,
    F: Fn() -> V,
    R: Fn() -> bool,
    W: Fn(V) -> WriteResult,
{
    LambdaDuplex {
        has_value,
        read,
        ready_to_write,
        write,
    }
}

impl<V, H, F, R, W> Signal for LambdaDuplex<H, F, R, W>
where
    V: PlainValue,
    H: Fn() -> bool,
    F: Fn() -> V,
    R: Fn() -> bool,
    W: Fn(V) -> WriteResult,
{
    type Value = V;
    type Dir = Duplex;

    fn has_value(&self) -> bool {
        (self.has_value)()
    }

    fn value_id(&self) -> Id {
        if self.has_value() {
            Id::of((self.read)())
        } else {
            Id::Null
        }
    }

    fn read(&self) -> V {
        (self.read)()
    }

    fn ready_to_write(&self) -> bool {
        (self.ready_to_write)()
    }

    fn write(&self, value: V) -> WriteResult {
        (self.write)(value)
    }
}
