//! The core signal interface
//!
//! A signal is a value that changes over time, paired with an identity that
//! changes exactly when the value does. Signals are created at the call site,
//! copied freely, and live only for the traversal that created them; anything
//! that must survive a traversal stores a [`CapturedId`] or a boxed signal.
//!
//! [`CapturedId`]: weft_identity::CapturedId

use std::cell::RefCell;
use std::marker::PhantomData;

use thiserror::Error;
use weft_identity::Id;

use crate::direction::{CanRead, CanWrite, CompatibleWith, Direction, Duplex, ReadOnly, WriteOnly};

/// Error returned when a writer rejects a value.
///
/// Writes are allowed to validate: a text view refusing to parse, a cast
/// refusing an out-of-range value. A rejected write leaves the signal
/// unchanged; the caller decides whether to surface the message.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of writing through a signal.
pub type WriteResult = Result<(), ValidationError>;

/// A reactive value with a capability direction.
///
/// The defaults implement the absent side of a one-way signal: a read-only
/// signal inherits `ready_to_write() == false` and a panicking `write`, a
/// write-only signal inherits `has_value() == false`, a null identity, and a
/// panicking `read`. Implementations override exactly the side their
/// direction grants.
///
/// # Identity contract
///
/// If `has_value()` is true, `value_id()` returns an identity that is equal
/// across two calls iff the value has not changed in between. A signal that
/// cannot identify its value yet returns [`Id::Null`].
pub trait Signal {
    type Value: Clone + 'static;
    type Dir: Direction;

    /// Can the signal currently be read?
    fn has_value(&self) -> bool {
        false
    }

    /// The identity of the current value.
    fn value_id(&self) -> Id {
        Id::Null
    }

    /// Read the current value. Only defined when `has_value()` is true.
    fn read(&self) -> Self::Value {
        panic!("read() called on a signal without a readable value")
    }

    /// Can the signal currently accept a write?
    fn ready_to_write(&self) -> bool {
        false
    }

    /// Write a value. Only defined when `ready_to_write()` is true.
    fn write(&self, value: Self::Value) -> WriteResult {
        let _ = value;
        panic!("write() called on a signal that is not writable")
    }
}

/// Does the signal currently have a value?
///
/// Unlike calling `has_value()` directly, this fails to compile for signal
/// types without read capability.
pub fn signal_has_value<S>(signal: &S) -> bool
where
    S: Signal,
    S::Dir: CanRead,
{
    signal.has_value()
}

/// Read a signal's value, asserting that one is present.
pub fn read_signal<S>(signal: &S) -> S::Value
where
    S: Signal,
    S::Dir: CanRead,
{
    assert!(signal.has_value(), "read_signal() on a signal with no value");
    signal.read()
}

/// Is the signal ready to accept a write?
pub fn signal_ready_to_write<S>(signal: &S) -> bool
where
    S: Signal,
    S::Dir: CanWrite,
{
    signal.ready_to_write()
}

/// Write a value through a signal. A no-op when the signal isn't ready.
pub fn write_signal<S>(signal: &S, value: S::Value) -> WriteResult
where
    S: Signal,
    S::Dir: CanWrite,
{
    if signal.ready_to_write() {
        signal.write(value)
    } else {
        Ok(())
    }
}

/// Values that can serve as their own identity.
///
/// Small comparable values use themselves as identity, which eliminates
/// spurious identity changes; composite signals fall back to structural
/// identities built from their operands.
pub trait PlainValue: Clone + PartialEq + PartialOrd + std::fmt::Debug + 'static {}
impl<T: Clone + PartialEq + PartialOrd + std::fmt::Debug + 'static> PlainValue for T {}

/// One-shot storage for a lazily computed signal value.
///
/// Guarantees the generator runs at most once per signal lifetime; later
/// reads return the stored value.
#[derive(Clone, Debug, Default)]
pub struct ReadCache<V> {
    slot: RefCell<Option<V>>,
}

impl<V: Clone> ReadCache<V> {
    pub fn new() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }

    pub fn read(&self, generate: impl FnOnce() -> V) -> V {
        self.slot.borrow_mut().get_or_insert_with(generate).clone()
    }
}

/// Marker selecting the signal-to-signal conversion.
pub struct AsSignalMarker;
/// Marker selecting the plain-value-to-signal conversion.
pub struct AsValueMarker;

/// Anything convertible into a readable signal of `V`.
///
/// Readable signals convert to themselves; plain values wrap into a constant
/// [`Value`] signal. The marker parameter keeps the two blanket impls
/// coherent; inference picks the only one that applies.
///
/// [`Value`]: crate::basic::Value
pub trait IntoReadSignal<V: Clone + 'static, Marker> {
    type Signal: Signal<Value = V>;

    fn into_read_signal(self) -> Self::Signal;
}

impl<S> IntoReadSignal<S::Value, AsSignalMarker> for S
where
    S: Signal,
    S::Dir: CanRead,
{
    type Signal = S;

    fn into_read_signal(self) -> S {
        self
    }
}

impl<V> IntoReadSignal<V, AsValueMarker> for V
where
    V: PlainValue,
{
    type Signal = crate::basic::Value<V>;

    fn into_read_signal(self) -> crate::basic::Value<V> {
        crate::basic::value(self)
    }
}

/// Object-safe mirror of [`Signal`], used behind erased handles.
pub trait ErasedSignal<V> {
    fn erased_has_value(&self) -> bool;
    fn erased_value_id(&self) -> Id;
    fn erased_read(&self) -> V;
    fn erased_ready_to_write(&self) -> bool;
    fn erased_write(&self, value: V) -> WriteResult;
}

impl<S: Signal> ErasedSignal<S::Value> for S {
    fn erased_has_value(&self) -> bool {
        self.has_value()
    }

    fn erased_value_id(&self) -> Id {
        self.value_id()
    }

    fn erased_read(&self) -> S::Value {
        self.read()
    }

    fn erased_ready_to_write(&self) -> bool {
        self.ready_to_write()
    }

    fn erased_write(&self, value: S::Value) -> WriteResult {
        self.write(value)
    }
}

/// A borrowed, type-erased signal reference.
///
/// Constructing a handle checks direction compatibility at compile time, so
/// a `Readable<i32>` parameter accepts any readable `i32` signal while the
/// callee stays a plain function instead of a generic one.
pub struct SignalHandle<'a, V, D> {
    inner: &'a dyn ErasedSignal<V>,
    _dir: PhantomData<D>,
}

impl<'a, V: Clone + 'static, D: Direction> SignalHandle<'a, V, D> {
    pub fn new<S>(signal: &'a S) -> Self
    where
        S: Signal<Value = V>,
        S::Dir: CompatibleWith<D>,
    {
        Self {
            inner: signal,
            _dir: PhantomData,
        }
    }
}

impl<V, D> Clone for SignalHandle<'_, V, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, D> Copy for SignalHandle<'_, V, D> {}

impl<V: Clone + 'static, D: Direction> Signal for SignalHandle<'_, V, D> {
    type Value = V;
    type Dir = D;

    fn has_value(&self) -> bool {
        self.inner.erased_has_value()
    }

    fn value_id(&self) -> Id {
        self.inner.erased_value_id()
    }

    fn read(&self) -> V {
        self.inner.erased_read()
    }

    fn ready_to_write(&self) -> bool {
        self.inner.erased_ready_to_write()
    }

    fn write(&self, value: V) -> WriteResult {
        self.inner.erased_write(value)
    }
}

/// A borrowed handle to a readable signal of `V`.
pub type Readable<'a, V> = SignalHandle<'a, V, ReadOnly>;
/// A borrowed handle to a writable signal of `V`.
pub type Writable<'a, V> = SignalHandle<'a, V, WriteOnly>;
/// A borrowed handle to a duplex signal of `V`.
pub type Bidirectional<'a, V> = SignalHandle<'a, V, Duplex>;

/// An owned, boxed signal for long-lived storage.
pub struct BoxedSignal<V, D> {
    inner: Box<dyn ErasedSignal<V>>,
    _dir: PhantomData<D>,
}

impl<V: Clone + 'static, D: Direction> BoxedSignal<V, D> {
    pub fn new<S>(signal: S) -> Self
    where
        S: Signal<Value = V> + 'static,
        S::Dir: CompatibleWith<D>,
    {
        Self {
            inner: Box::new(signal),
            _dir: PhantomData,
        }
    }
}

impl<V: Clone + 'static, D: Direction> Signal for BoxedSignal<V, D> {
    type Value = V;
    type Dir = D;

    fn has_value(&self) -> bool {
        self.inner.erased_has_value()
    }

    fn value_id(&self) -> Id {
        self.inner.erased_value_id()
    }

    fn read(&self) -> V {
        self.inner.erased_read()
    }

    fn ready_to_write(&self) -> bool {
        self.inner.erased_ready_to_write()
    }

    fn write(&self, value: V) -> WriteResult {
        self.inner.erased_write(value)
    }
}
