//! Numeric signal adaptors
//!
//! Views of numeric signals under a unit change, with write paths that apply
//! the inverse transform so the underlying signal stays in its own unit.

use weft_identity::Id;

use crate::direction::CanRead;
use crate::signal::{IntoReadSignal, PlainValue, Signal, WriteResult};

/// A scaled view of a numeric signal. Writes divide by the factor.
#[derive(Clone, Debug)]
pub struct Scale<N, F> {
    n: N,
    factor: F,
}

/// Present `n` multiplied by `factor`.
pub fn scale<N, O, M>(n: N, factor: O) -> Scale<N, O::Signal>
where
    N: Signal,
    O: IntoReadSignal<N::Value, M>,
{
    Scale {
        n,
        factor: factor.into_read_signal(),
    }
}

impl<N, F> Signal for Scale<N, F>
where
    N: Signal,
    N::Value: PlainValue
        + std::ops::Mul<Output = N::Value>
        + std::ops::Div<Output = N::Value>,
    F: Signal<Value = N::Value>,
    F::Dir: CanRead,
{
    type Value = N::Value;
    type Dir = N::Dir;

    fn has_value(&self) -> bool {
        self.n.has_value() && self.factor.has_value()
    }

    fn value_id(&self) -> Id {
        if self.has_value() {
            Id::of(self.read())
        } else {
            Id::Null
        }
    }

    fn read(&self) -> N::Value {
        self.n.read() * self.factor.read()
    }

    fn ready_to_write(&self) -> bool {
        self.n.ready_to_write() && self.factor.has_value()
    }

    fn write(&self, value: N::Value) -> WriteResult {
        self.n.write(value / self.factor.read())
    }
}

/// An offset view of a numeric signal. Writes subtract the offset.
#[derive(Clone, Debug)]
pub struct Offset<N, O> {
    n: N,
    offset: O,
}

/// Present `n` shifted by `offset`.
pub fn offset<N, O, M>(n: N, amount: O) -> Offset<N, O::Signal>
where
    N: Signal,
    O: IntoReadSignal<N::Value, M>,
{
    Offset {
        n,
        offset: amount.into_read_signal(),
    }
}

impl<N, O> Signal for Offset<N, O>
where
    N: Signal,
    N::Value: PlainValue
        + std::ops::Add<Output = N::Value>
        + std::ops::Sub<Output = N::Value>,
    O: Signal<Value = N::Value>,
    O::Dir: CanRead,
{
    type Value = N::Value;
    type Dir = N::Dir;

    fn has_value(&self) -> bool {
        self.n.has_value() && self.offset.has_value()
    }

    fn value_id(&self) -> Id {
        if self.has_value() {
            Id::of(self.read())
        } else {
            Id::Null
        }
    }

    fn read(&self) -> N::Value {
        self.n.read() + self.offset.read()
    }

    fn ready_to_write(&self) -> bool {
        self.n.ready_to_write() && self.offset.has_value()
    }

    fn write(&self, value: N::Value) -> WriteResult {
        self.n.write(value - self.offset.read())
    }
}

/// Values that can be rounded to a step size.
pub trait Roundable: Copy {
    fn round_to(self, step: Self) -> Self;
}

impl Roundable for f32 {
    fn round_to(self, step: f32) -> f32 {
        (self / step).round() * step
    }
}

impl Roundable for f64 {
    fn round_to(self, step: f64) -> f64 {
        (self / step).round() * step
    }
}

/// A pass-through view that rounds written values to a step.
///
/// Reads are untouched; only the write path quantizes. Useful for inputs
/// that should snap while display stays exact.
#[derive(Clone, Debug)]
pub struct RoundWrites<N, S> {
    n: N,
    step: S,
}

/// Round values written through `n` to multiples of `step`.
pub fn round_writes<N, O, M>(n: N, step: O) -> RoundWrites<N, O::Signal>
where
    N: Signal,
    O: IntoReadSignal<N::Value, M>,
{
    RoundWrites {
        n,
        step: step.into_read_signal(),
    }
}

impl<N, S> Signal for RoundWrites<N, S>
where
    N: Signal,
    N::Value: PlainValue + Roundable,
    S: Signal<Value = N::Value>,
    S::Dir: CanRead,
{
    type Value = N::Value;
    type Dir = N::Dir;

    fn has_value(&self) -> bool {
        self.n.has_value()
    }

    fn value_id(&self) -> Id {
        self.n.value_id()
    }

    fn read(&self) -> N::Value {
        self.n.read()
    }

    fn ready_to_write(&self) -> bool {
        self.n.ready_to_write() && self.step.has_value()
    }

    fn write(&self, value: N::Value) -> WriteResult {
        self.n.write(value.round_to(self.step.read()))
    }
}
