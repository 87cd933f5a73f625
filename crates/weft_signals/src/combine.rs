//! Signal combinators
//!
//! Lazy function application over argument tuples, conditional multiplexing,
//! and structural projection (field lenses and subscripts). Combinators hold
//! their operands by value and borrow nothing, so building them allocates
//! nothing; work happens on read.

use std::marker::PhantomData;

use smallvec::SmallVec;
use weft_identity::Id;

use crate::direction::{CanRead, Intersect, ReadOnly};
use crate::signal::{IntoReadSignal, ReadCache, Signal, WriteResult};

/// A tuple of readable signals used as a combinator argument list.
///
/// Implemented for tuples of one through four signals.
pub trait SignalTuple {
    type Values: Clone + 'static;

    /// True iff every signal in the tuple has a value.
    fn all_have_values(&self) -> bool;

    /// The structural combination of every argument's identity.
    fn combined_id(&self) -> Id;

    /// Read every signal. Only defined when `all_have_values()` is true.
    fn read_all(&self) -> Self::Values;

    /// Visit each argument's (presence, identity) in order.
    fn visit_ids(&self, visit: &mut dyn FnMut(bool, Id));
}

macro_rules! impl_signal_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name),+> SignalTuple for ($($name,)+)
        where
            $($name: Signal, $name::Dir: CanRead,)+
        {
            type Values = ($($name::Value,)+);

            fn all_have_values(&self) -> bool {
                $(self.$idx.has_value())&&+
            }

            fn combined_id(&self) -> Id {
                let mut ids: SmallVec<[Id; 4]> = SmallVec::new();
                $(ids.push(self.$idx.value_id());)+
                Id::combine(ids)
            }

            fn read_all(&self) -> Self::Values {
                ($(self.$idx.read(),)+)
            }

            fn visit_ids(&self, visit: &mut dyn FnMut(bool, Id)) {
                $(visit(self.$idx.has_value(), self.$idx.value_id());)+
            }
        }
    };
}

impl_signal_tuple!(A: 0);
impl_signal_tuple!(A: 0, B: 1);
impl_signal_tuple!(A: 0, B: 1, C: 2);
impl_signal_tuple!(A: 0, B: 1, C: 2, D: 3);

/// The signal produced by [`lazy_apply`].
///
/// Read-only; its identity is the structural combination of the argument
/// identities, and the function runs at most once per signal lifetime.
#[derive(Clone)]
pub struct LazyApply<F, A, R> {
    f: F,
    args: A,
    cache: ReadCache<R>,
}

/// Lazily apply `f` to the values of the signals in `args`.
pub fn lazy_apply<F, A, R>(f: F, args: A) -> LazyApply<F, A, R>
where
    A: SignalTuple,
    F: Fn(A::Values) -> R,
    R: Clone + 'static,
{
    LazyApply {
        f,
        args,
        cache: ReadCache::new(),
    }
}

impl<F, A, R> Signal for LazyApply<F, A, R>
where
    A: SignalTuple,
    F: Fn(A::Values) -> R,
    R: Clone + 'static,
{
    type Value = R;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        self.args.all_have_values()
    }

    fn value_id(&self) -> Id {
        self.args.combined_id()
    }

    fn read(&self) -> R {
        self.cache.read(|| (self.f)(self.args.read_all()))
    }
}

/// The signal-space ternary operator.
///
/// Reads and writes dispatch on the condition's value; the direction is the
/// intersection of the two branches' directions. Both branches are fully
/// constructed, but only the selected one is ever read or written.
#[derive(Clone, Debug)]
pub struct Conditional<C, T, F> {
    condition: C,
    on_true: T,
    on_false: F,
}

impl<C, T, F> Conditional<C, T, F> {
    pub fn new(condition: C, on_true: T, on_false: F) -> Self {
        Self {
            condition,
            on_true,
            on_false,
        }
    }
}

/// Build a conditional signal, wrapping plain values as needed.
pub fn conditional<V, C, CM, T, TM, F, FM>(
    condition: C,
    on_true: T,
    on_false: F,
) -> Conditional<C::Signal, T::Signal, F::Signal>
where
    V: Clone + 'static,
    C: IntoReadSignal<bool, CM>,
    T: IntoReadSignal<V, TM>,
    F: IntoReadSignal<V, FM>,
{
    Conditional::new(
        condition.into_read_signal(),
        on_true.into_read_signal(),
        on_false.into_read_signal(),
    )
}

impl<C, T, F> Signal for Conditional<C, T, F>
where
    C: Signal<Value = bool>,
    C::Dir: CanRead,
    T: Signal,
    F: Signal<Value = T::Value>,
    T::Dir: Intersect<F::Dir>,
{
    type Value = T::Value;
    type Dir = <T::Dir as Intersect<F::Dir>>::Output;

    fn has_value(&self) -> bool {
        self.condition.has_value()
            && if self.condition.read() {
                self.on_true.has_value()
            } else {
                self.on_false.has_value()
            }
    }

    fn value_id(&self) -> Id {
        if !self.condition.has_value() {
            return Id::Null;
        }
        let taken = self.condition.read();
        let inner = if taken {
            self.on_true.value_id()
        } else {
            self.on_false.value_id()
        };
        Id::pair(Id::of(taken), inner)
    }

    fn read(&self) -> T::Value {
        if self.condition.read() {
            self.on_true.read()
        } else {
            self.on_false.read()
        }
    }

    fn ready_to_write(&self) -> bool {
        self.condition.has_value()
            && if self.condition.read() {
                self.on_true.ready_to_write()
            } else {
                self.on_false.ready_to_write()
            }
    }

    fn write(&self, value: T::Value) -> WriteResult {
        if self.condition.read() {
            self.on_true.write(value)
        } else {
            self.on_false.write(value)
        }
    }
}

/// A projection of one field out of a structured signal.
///
/// The write path is read-modify-write: the whole parent value is read, the
/// field is replaced, and the parent is written back. Updates to the parent
/// between the read and the write-back are lost.
#[derive(Clone)]
pub struct Lens<S, G, P, V> {
    base: S,
    getter: G,
    putter: P,
    _value: PhantomData<V>,
}

/// Project a field out of `base` with a getter/putter pair.
pub fn lens<S, G, P, V>(base: S, getter: G, putter: P) -> Lens<S, G, P, V>
where
    S: Signal,
    G: Fn(&S::Value) -> V + 'static,
    P: Fn(&mut S::Value, V) + 'static,
    V: Clone + 'static,
{
    Lens {
        base,
        getter,
        putter,
        _value: PhantomData,
    }
}

impl<S, G, P, V> Signal for Lens<S, G, P, V>
where
    S: Signal,
    G: Fn(&S::Value) -> V + 'static,
    P: Fn(&mut S::Value, V) + 'static,
    V: Clone + 'static,
{
    type Value = V;
    type Dir = S::Dir;

    fn has_value(&self) -> bool {
        self.base.has_value()
    }

    fn value_id(&self) -> Id {
        // The getter's type is unique per call site, which distinguishes
        // projections of different fields out of the same parent.
        Id::pair(self.base.value_id(), Id::of(std::any::TypeId::of::<G>()))
    }

    fn read(&self) -> V {
        (self.getter)(&self.base.read())
    }

    fn ready_to_write(&self) -> bool {
        self.base.has_value() && self.base.ready_to_write()
    }

    fn write(&self, value: V) -> WriteResult {
        let mut parent = self.base.read();
        (self.putter)(&mut parent, value);
        self.base.write(parent)
    }
}

/// Container values addressable by an index for subscript signals.
pub trait IndexedValue<I>: Clone + 'static {
    type Item: Clone + 'static;

    fn item_at(&self, index: &I) -> Option<Self::Item>;
    fn put_item(&mut self, index: &I, item: Self::Item);
    fn item_count(&self) -> usize;
}

impl<T: Clone + 'static> IndexedValue<usize> for Vec<T> {
    type Item = T;

    fn item_at(&self, index: &usize) -> Option<T> {
        self.get(*index).cloned()
    }

    fn put_item(&mut self, index: &usize, item: T) {
        if let Some(slot) = self.get_mut(*index) {
            *slot = item;
        }
    }

    fn item_count(&self) -> usize {
        self.len()
    }
}

impl<K, V> IndexedValue<K> for std::collections::BTreeMap<K, V>
where
    K: Ord + Clone + 'static,
    V: Clone + 'static,
{
    type Item = V;

    fn item_at(&self, index: &K) -> Option<V> {
        self.get(index).cloned()
    }

    fn put_item(&mut self, index: &K, item: V) {
        self.insert(index.clone(), item);
    }

    fn item_count(&self) -> usize {
        self.len()
    }
}

impl<K, V> IndexedValue<K> for std::collections::HashMap<K, V>
where
    K: std::hash::Hash + Eq + Clone + 'static,
    V: Clone + 'static,
{
    type Item = V;

    fn item_at(&self, index: &K) -> Option<V> {
        self.get(index).cloned()
    }

    fn put_item(&mut self, index: &K, item: V) {
        self.insert(index.clone(), item);
    }

    fn item_count(&self) -> usize {
        self.len()
    }
}

/// A projection of one element out of a container signal.
///
/// Shares the read-modify-write caveat of [`Lens`].
#[derive(Clone, Debug)]
pub struct Subscript<S, I> {
    container: S,
    index: I,
}

/// Project the element of `container` at `index`.
pub fn subscript<S, I>(container: S, index: I) -> Subscript<S, I>
where
    S: Signal,
    I: Signal,
    I::Dir: CanRead,
    S::Value: IndexedValue<I::Value>,
{
    Subscript { container, index }
}

impl<S, I> Signal for Subscript<S, I>
where
    S: Signal,
    I: Signal,
    I::Dir: CanRead,
    S::Value: IndexedValue<I::Value>,
{
    type Value = <S::Value as IndexedValue<I::Value>>::Item;
    type Dir = S::Dir;

    fn has_value(&self) -> bool {
        self.container.has_value() && self.index.has_value()
    }

    fn value_id(&self) -> Id {
        Id::pair(self.container.value_id(), self.index.value_id())
    }

    fn read(&self) -> Self::Value {
        self.container
            .read()
            .item_at(&self.index.read())
            .expect("subscript index out of range")
    }

    fn ready_to_write(&self) -> bool {
        self.container.has_value() && self.index.has_value() && self.container.ready_to_write()
    }

    fn write(&self, item: Self::Value) -> WriteResult {
        let mut container = self.container.read();
        container.put_item(&self.index.read(), item);
        self.container.write(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{direct, empty, value};
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_lazy_apply_is_lazy_and_cached() {
        let calls = Cell::new(0);
        let doubled = lazy_apply(
            |(n,): (i32,)| {
                calls.set(calls.get() + 1);
                n * 2
            },
            (value(21),),
        );
        assert!(doubled.has_value());
        assert_eq!(calls.get(), 0);
        assert_eq!(doubled.read(), 42);
        assert_eq!(doubled.read(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_lazy_apply_id_combines_args() {
        let sum = lazy_apply(|(a, b): (i32, i32)| a + b, (value(1), value(2)));
        assert_eq!(sum.value_id(), Id::pair(Id::of(1), Id::of(2)));

        let missing = lazy_apply(|(a, b): (i32, i32)| a + b, (value(1), empty::<i32>()));
        assert!(!missing.has_value());
    }

    #[test]
    fn test_conditional_dispatches_reads_and_writes() {
        let on = conditional(true, value(1), value(2));
        assert_eq!(on.read(), 1);
        let off = conditional(false, value(1), value(2));
        assert_eq!(off.read(), 2);

        // The identity of the untaken branch must not leak into the result.
        assert_ne!(on.value_id(), off.value_id());

        let t = RefCell::new(0);
        let f = RefCell::new(0);
        let mux = Conditional::new(value(false), direct(&t), direct(&f));
        mux.write(9).unwrap();
        assert_eq!(*t.borrow(), 0);
        assert_eq!(*f.borrow(), 9);
    }

    #[test]
    fn test_conditional_without_condition_value() {
        let mux = conditional(empty::<bool>(), value(1), value(2));
        assert!(!mux.has_value());
        assert!(mux.value_id().is_null());
    }

    #[test]
    fn test_lens_reads_and_writes_through() {
        #[derive(Clone, Debug, PartialEq, PartialOrd)]
        struct Point {
            x: i32,
            y: i32,
        }

        let cell = RefCell::new(Point { x: 1, y: 2 });
        let point = direct(&cell);
        let x = lens(point, |p: &Point| p.x, |p: &mut Point, v| p.x = v);
        assert_eq!(x.read(), 1);
        x.write(10).unwrap();
        assert_eq!(*cell.borrow(), Point { x: 10, y: 2 });

        // Different fields of the same parent get different identities.
        let y = lens(point, |p: &Point| p.y, |p: &mut Point, v| p.y = v);
        assert_ne!(x.value_id(), y.value_id());
    }

    #[test]
    fn test_subscript_vector() {
        let cell = RefCell::new(vec![10, 20, 30]);
        let items = direct(&cell);
        let second = subscript(items, value(1usize));
        assert!(second.has_value());
        assert_eq!(second.read(), 20);

        second.write(25).unwrap();
        assert_eq!(*cell.borrow(), vec![10, 25, 30]);
    }

    #[test]
    fn test_subscript_map() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1);
        let cell = RefCell::new(map);
        let entry = subscript(direct(&cell), value("a".to_string()));
        assert_eq!(entry.read(), 1);
        entry.write(2).unwrap();
        assert_eq!(cell.borrow()["a"], 2);
    }
}
