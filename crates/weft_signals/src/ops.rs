//! Lifted operators and the combinator extension trait
//!
//! [`SignalExt`] lifts the familiar value operators into signal space: the
//! arithmetic, comparison, shift, and bitwise families become lazy
//! applications over their operands, and one operand may be a plain value
//! (it is wrapped with `value()` automatically). Logical `and`/`or` get
//! dedicated implementations because their value presence short-circuits.

use weft_identity::Id;

use crate::adapt::{self, Cast, Fallback, Mask, SimplifyId};
use crate::combine::{lazy_apply, lens, subscript, IndexedValue, LazyApply, Lens, Subscript};
use crate::direction::{CanRead, CompatibleWith, Direction, ReadOnly};
use crate::signal::{BoxedSignal, IntoReadSignal, PlainValue, Signal};

macro_rules! lifted_binary_op {
    ($(#[$meta:meta])* $method:ident, $op_trait:ident, $op_method:ident) => {
        $(#[$meta])*
        fn $method<O, M>(
            self,
            other: O,
        ) -> LazyApply<fn((Self::Value, Self::Value)) -> Self::Value, (Self, O::Signal), Self::Value>
        where
            Self::Dir: CanRead,
            Self::Value: std::ops::$op_trait<Output = Self::Value>,
            O: IntoReadSignal<Self::Value, M>,
            <O::Signal as Signal>::Dir: CanRead,
        {
            fn combine<V: std::ops::$op_trait<Output = V>>(args: (V, V)) -> V {
                std::ops::$op_trait::$op_method(args.0, args.1)
            }
            lazy_apply(
                combine::<Self::Value> as fn((Self::Value, Self::Value)) -> Self::Value,
                (self, other.into_read_signal()),
            )
        }
    };
}

macro_rules! lifted_compare_op {
    ($(#[$meta:meta])* $method:ident, |$a:ident, $b:ident| $body:expr) => {
        $(#[$meta])*
        fn $method<O, M>(
            self,
            other: O,
        ) -> LazyApply<fn((Self::Value, Self::Value)) -> bool, (Self, O::Signal), bool>
        where
            Self::Dir: CanRead,
            Self::Value: PartialOrd,
            O: IntoReadSignal<Self::Value, M>,
            <O::Signal as Signal>::Dir: CanRead,
        {
            fn compare<V: PartialOrd>(($a, $b): (V, V)) -> bool {
                $body
            }
            lazy_apply(
                compare::<Self::Value> as fn((Self::Value, Self::Value)) -> bool,
                (self, other.into_read_signal()),
            )
        }
    };
}

/// Combinator methods available on every signal.
pub trait SignalExt: Signal + Sized {
    lifted_binary_op!(
        /// Elementwise addition of two signals.
        add, Add, add
    );
    lifted_binary_op!(
        /// Elementwise subtraction of two signals.
        sub, Sub, sub
    );
    lifted_binary_op!(
        /// Elementwise multiplication of two signals.
        mul, Mul, mul
    );
    lifted_binary_op!(
        /// Elementwise division of two signals.
        div, Div, div
    );
    lifted_binary_op!(
        /// Elementwise remainder of two signals.
        rem, Rem, rem
    );
    lifted_binary_op!(
        /// Elementwise bitwise and of two signals.
        bit_and, BitAnd, bitand
    );
    lifted_binary_op!(
        /// Elementwise bitwise or of two signals.
        bit_or, BitOr, bitor
    );
    lifted_binary_op!(
        /// Elementwise bitwise xor of two signals.
        bit_xor, BitXor, bitxor
    );
    lifted_binary_op!(
        /// Elementwise left shift.
        shl, Shl, shl
    );
    lifted_binary_op!(
        /// Elementwise right shift.
        shr, Shr, shr
    );

    lifted_compare_op!(
        /// Elementwise equality comparison.
        eq_to, |a, b| a == b
    );
    lifted_compare_op!(
        /// Elementwise inequality comparison.
        ne_to, |a, b| a != b
    );
    lifted_compare_op!(
        /// Elementwise `<` comparison.
        less_than, |a, b| a < b
    );
    lifted_compare_op!(
        /// Elementwise `<=` comparison.
        at_most, |a, b| a <= b
    );
    lifted_compare_op!(
        /// Elementwise `>` comparison.
        greater_than, |a, b| a > b
    );
    lifted_compare_op!(
        /// Elementwise `>=` comparison.
        at_least, |a, b| a >= b
    );

    /// Logical negation.
    fn not(self) -> LazyApply<fn((Self::Value,)) -> Self::Value, (Self,), Self::Value>
    where
        Self::Dir: CanRead,
        Self::Value: std::ops::Not<Output = Self::Value>,
    {
        fn invert<V: std::ops::Not<Output = V>>(args: (V,)) -> V {
            !args.0
        }
        lazy_apply(
            invert::<Self::Value> as fn((Self::Value,)) -> Self::Value,
            (self,),
        )
    }

    /// Arithmetic negation.
    fn neg(self) -> LazyApply<fn((Self::Value,)) -> Self::Value, (Self,), Self::Value>
    where
        Self::Dir: CanRead,
        Self::Value: std::ops::Neg<Output = Self::Value>,
    {
        fn negate<V: std::ops::Neg<Output = V>>(args: (V,)) -> V {
            -args.0
        }
        lazy_apply(
            negate::<Self::Value> as fn((Self::Value,)) -> Self::Value,
            (self,),
        )
    }

    /// Short-circuiting logical and.
    fn and<O, M>(self, other: O) -> LogicalAnd<Self, O::Signal>
    where
        Self: Signal<Value = bool>,
        Self::Dir: CanRead,
        O: IntoReadSignal<bool, M>,
    {
        LogicalAnd {
            a: self,
            b: other.into_read_signal(),
        }
    }

    /// Short-circuiting logical or.
    fn or<O, M>(self, other: O) -> LogicalOr<Self, O::Signal>
    where
        Self: Signal<Value = bool>,
        Self::Dir: CanRead,
        O: IntoReadSignal<bool, M>,
    {
        LogicalOr {
            a: self,
            b: other.into_read_signal(),
        }
    }

    /// Substitute `fallback` when this signal has no value.
    fn fallback<O, M>(self, fallback: O) -> Fallback<Self, O::Signal>
    where
        O: IntoReadSignal<Self::Value, M>,
    {
        adapt::add_fallback(self, fallback)
    }

    /// Gate this signal behind a boolean condition.
    fn mask<O, M>(self, condition: O) -> Mask<Self, O::Signal>
    where
        O: IntoReadSignal<bool, M>,
    {
        adapt::mask(self, condition)
    }

    /// View this signal through another value type.
    fn cast<U>(self) -> Cast<Self, U>
    where
        U: Clone + 'static,
    {
        adapt::cast(self)
    }

    /// Use the signal's own value as its identity.
    fn simplify_id(self) -> SimplifyId<Self>
    where
        Self::Value: PlainValue,
    {
        adapt::simplify_id(self)
    }

    /// Project a field out of this signal.
    fn lens<G, P, V>(self, getter: G, putter: P) -> Lens<Self, G, P, V>
    where
        G: Fn(&Self::Value) -> V + 'static,
        P: Fn(&mut Self::Value, V) + 'static,
        V: Clone + 'static,
    {
        lens(self, getter, putter)
    }

    /// Project the element at `index` out of this container signal.
    fn at<O, M, Ix>(self, index: O) -> Subscript<Self, O::Signal>
    where
        Ix: Clone + 'static,
        Self::Value: IndexedValue<Ix>,
        O: IntoReadSignal<Ix, M>,
        <O::Signal as Signal>::Dir: CanRead,
    {
        subscript(self, index.into_read_signal())
    }

    /// Erase this signal into an owned box for long-lived storage.
    fn boxed<D>(self) -> BoxedSignal<Self::Value, D>
    where
        Self: 'static,
        D: Direction,
        Self::Dir: CompatibleWith<D>,
    {
        BoxedSignal::new(self)
    }
}

impl<S: Signal + Sized> SignalExt for S {}

/// Short-circuiting logical and over two boolean signals.
///
/// Has a value when both operands do, or when either operand has the value
/// `false` (which decides the result on its own).
#[derive(Clone, Debug)]
pub struct LogicalAnd<A, B> {
    a: A,
    b: B,
}

impl<A, B> Signal for LogicalAnd<A, B>
where
    A: Signal<Value = bool>,
    A::Dir: CanRead,
    B: Signal<Value = bool>,
    B::Dir: CanRead,
{
    type Value = bool;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        (self.a.has_value() && self.b.has_value())
            || (self.a.has_value() && !self.a.read())
            || (self.b.has_value() && !self.b.read())
    }

    fn value_id(&self) -> Id {
        Id::pair(self.a.value_id(), self.b.value_id())
    }

    fn read(&self) -> bool {
        !((self.a.has_value() && !self.a.read()) || (self.b.has_value() && !self.b.read()))
    }
}

/// Short-circuiting logical or over two boolean signals.
///
/// Has a value when both operands do, or when either operand has the value
/// `true` (which decides the result on its own).
#[derive(Clone, Debug)]
pub struct LogicalOr<A, B> {
    a: A,
    b: B,
}

impl<A, B> Signal for LogicalOr<A, B>
where
    A: Signal<Value = bool>,
    A::Dir: CanRead,
    B: Signal<Value = bool>,
    B::Dir: CanRead,
{
    type Value = bool;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        (self.a.has_value() && self.b.has_value())
            || (self.a.has_value() && self.a.read())
            || (self.b.has_value() && self.b.read())
    }

    fn value_id(&self) -> Id {
        Id::pair(self.a.value_id(), self.b.value_id())
    }

    fn read(&self) -> bool {
        (self.a.has_value() && self.a.read()) || (self.b.has_value() && self.b.read())
    }
}
