//! Signal adaptors
//!
//! Wrappers that change how a signal presents itself without touching the
//! underlying source: capability fakes, static casts, presence observers,
//! fallbacks, identity simplification, and masking.

use weft_identity::Id;

use crate::direction::{CanRead, ReadOnly, UnionDir, WriteOnly};
use crate::signal::{
    IntoReadSignal, PlainValue, ReadCache, Signal, ValidationError, WriteResult,
};

/// Wrapper that type-checks as readable but never has a value.
///
/// Useful for passing a write-only signal where the type system expects read
/// capability that will never actually be exercised.
#[derive(Clone, Debug)]
pub struct FakeReadability<S> {
    wrapped: S,
}

/// Pretend `signal` is readable. It will never actually have a value.
pub fn fake_readability<S: Signal>(signal: S) -> FakeReadability<S> {
    FakeReadability { wrapped: signal }
}

impl<S> Signal for FakeReadability<S>
where
    S: Signal,
    ReadOnly: UnionDir<S::Dir>,
{
    type Value = S::Value;
    type Dir = <ReadOnly as UnionDir<S::Dir>>::Output;

    // has_value/value_id/read stay at the defaults: no value, ever.

    fn ready_to_write(&self) -> bool {
        self.wrapped.ready_to_write()
    }

    fn write(&self, value: S::Value) -> WriteResult {
        self.wrapped.write(value)
    }
}

/// Wrapper that type-checks as writable but is never ready to write.
#[derive(Clone, Debug)]
pub struct FakeWritability<S> {
    wrapped: S,
}

/// Pretend `signal` is writable. It will never actually accept a write.
pub fn fake_writability<S: Signal>(signal: S) -> FakeWritability<S> {
    FakeWritability { wrapped: signal }
}

impl<S> Signal for FakeWritability<S>
where
    S: Signal,
    WriteOnly: UnionDir<S::Dir>,
{
    type Value = S::Value;
    type Dir = <WriteOnly as UnionDir<S::Dir>>::Output;

    fn has_value(&self) -> bool {
        self.wrapped.has_value()
    }

    fn value_id(&self) -> Id {
        self.wrapped.value_id()
    }

    fn read(&self) -> S::Value {
        self.wrapped.read()
    }

    // ready_to_write/write stay at the defaults: never ready.
}

/// A value-type conversion view over another signal.
///
/// Reads convert losslessly via `From`; writes convert back via `TryFrom`
/// and reject values the source type cannot represent.
#[derive(Clone, Debug)]
pub struct Cast<S, U> {
    wrapped: S,
    cache: ReadCache<U>,
}

/// View `signal` through the value type `U`.
pub fn cast<U, S>(signal: S) -> Cast<S, U>
where
    S: Signal,
    U: Clone + 'static,
{
    Cast {
        wrapped: signal,
        cache: ReadCache::new(),
    }
}

impl<S, U> Signal for Cast<S, U>
where
    S: Signal,
    U: PlainValue + From<S::Value>,
    S::Value: TryFrom<U>,
    <S::Value as TryFrom<U>>::Error: std::fmt::Display,
{
    type Value = U;
    type Dir = S::Dir;

    fn has_value(&self) -> bool {
        self.wrapped.has_value()
    }

    fn value_id(&self) -> Id {
        if self.has_value() {
            Id::of(self.read())
        } else {
            Id::Null
        }
    }

    fn read(&self) -> U {
        self.cache.read(|| U::from(self.wrapped.read()))
    }

    fn ready_to_write(&self) -> bool {
        self.wrapped.ready_to_write()
    }

    fn write(&self, value: U) -> WriteResult {
        match <S::Value>::try_from(value) {
            Ok(converted) => self.wrapped.write(converted),
            Err(err) => Err(ValidationError::new(format!(
                "value not representable: {err}"
            ))),
        }
    }
}

/// Boolean observer of another signal's value presence. Always has a value.
#[derive(Clone, Debug)]
pub struct ValuePresence<S> {
    wrapped: S,
}

/// A signal reporting whether `signal` currently has a value.
pub fn has_value<S: Signal>(signal: S) -> ValuePresence<S> {
    ValuePresence { wrapped: signal }
}

impl<S: Signal> Signal for ValuePresence<S> {
    type Value = bool;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> Id {
        Id::of(self.wrapped.has_value())
    }

    fn read(&self) -> bool {
        self.wrapped.has_value()
    }
}

/// Boolean observer of another signal's write readiness. Always has a value.
#[derive(Clone, Debug)]
pub struct WriteReadiness<S> {
    wrapped: S,
}

/// A signal reporting whether `signal` is currently ready to write.
pub fn ready_to_write<S: Signal>(signal: S) -> WriteReadiness<S> {
    WriteReadiness { wrapped: signal }
}

impl<S: Signal> Signal for WriteReadiness<S> {
    type Value = bool;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        true
    }

    fn value_id(&self) -> Id {
        Id::of(self.wrapped.ready_to_write())
    }

    fn read(&self) -> bool {
        self.wrapped.ready_to_write()
    }
}

/// A signal that substitutes a fallback value when the primary is empty.
///
/// All writes go to the primary.
#[derive(Clone, Debug)]
pub struct Fallback<P, F> {
    primary: P,
    fallback: F,
}

/// Yield `primary`'s value when it has one, `fallback`'s otherwise.
pub fn add_fallback<P, O, M>(primary: P, fallback: O) -> Fallback<P, O::Signal>
where
    P: Signal,
    O: IntoReadSignal<P::Value, M>,
{
    Fallback {
        primary,
        fallback: fallback.into_read_signal(),
    }
}

impl<P, F> Signal for Fallback<P, F>
where
    P: Signal,
    F: Signal<Value = P::Value>,
    F::Dir: CanRead,
{
    type Value = P::Value;
    type Dir = P::Dir;

    fn has_value(&self) -> bool {
        self.primary.has_value() || self.fallback.has_value()
    }

    fn value_id(&self) -> Id {
        // Which side supplied the value is part of the identity, so flipping
        // between equal-valued sides still registers as a change in source.
        let primary_has_value = self.primary.has_value();
        let inner = if primary_has_value {
            self.primary.value_id()
        } else {
            self.fallback.value_id()
        };
        Id::pair(Id::of(primary_has_value), inner)
    }

    fn read(&self) -> P::Value {
        if self.primary.has_value() {
            self.primary.read()
        } else {
            self.fallback.read()
        }
    }

    fn ready_to_write(&self) -> bool {
        self.primary.ready_to_write()
    }

    fn write(&self, value: P::Value) -> WriteResult {
        self.primary.write(value)
    }
}

/// Wrapper replacing a composite identity with the value itself.
///
/// Useful when a small value was projected out of a large structure and
/// inherited a structural identity that changes more often than the value.
#[derive(Clone, Debug)]
pub struct SimplifyId<S> {
    wrapped: S,
}

/// Use the signal's own value as its identity.
pub fn simplify_id<S>(signal: S) -> SimplifyId<S>
where
    S: Signal,
    S::Value: PlainValue,
{
    SimplifyId { wrapped: signal }
}

impl<S> Signal for SimplifyId<S>
where
    S: Signal,
    S::Value: PlainValue,
{
    type Value = S::Value;
    type Dir = S::Dir;

    fn has_value(&self) -> bool {
        self.wrapped.has_value()
    }

    fn value_id(&self) -> Id {
        if self.wrapped.has_value() {
            Id::of(self.wrapped.read())
        } else {
            Id::Null
        }
    }

    fn read(&self) -> S::Value {
        self.wrapped.read()
    }

    fn ready_to_write(&self) -> bool {
        self.wrapped.ready_to_write()
    }

    fn write(&self, value: S::Value) -> WriteResult {
        self.wrapped.write(value)
    }
}

/// A signal gated by a boolean condition.
///
/// While the condition has the value `true`, this is identical to the
/// primary; otherwise it has no value and is not ready to write.
#[derive(Clone, Debug)]
pub struct Mask<P, M> {
    primary: P,
    condition: M,
}

/// Gate `signal` behind `condition`.
pub fn mask<P, O, MK>(signal: P, condition: O) -> Mask<P, O::Signal>
where
    P: Signal,
    O: IntoReadSignal<bool, MK>,
{
    Mask {
        primary: signal,
        condition: condition.into_read_signal(),
    }
}

impl<P, M> Signal for Mask<P, M>
where
    P: Signal,
    M: Signal<Value = bool>,
    M::Dir: CanRead,
{
    type Value = P::Value;
    type Dir = P::Dir;

    fn has_value(&self) -> bool {
        self.condition.has_value() && self.condition.read() && self.primary.has_value()
    }

    fn value_id(&self) -> Id {
        if self.condition.has_value() && self.condition.read() {
            self.primary.value_id()
        } else {
            Id::Null
        }
    }

    fn read(&self) -> P::Value {
        self.primary.read()
    }

    fn ready_to_write(&self) -> bool {
        self.condition.has_value() && self.condition.read() && self.primary.ready_to_write()
    }

    fn write(&self, value: P::Value) -> WriteResult {
        self.primary.write(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{direct, empty, value};
    use std::cell::RefCell;

    #[test]
    fn test_fake_readability_never_reads() {
        let cell = RefCell::new(4);
        let faked = fake_readability(direct(&cell));
        assert!(!faked.has_value());
        assert!(faked.value_id().is_null());
        assert!(faked.ready_to_write());
        faked.write(6).unwrap();
        assert_eq!(*cell.borrow(), 6);
    }

    #[test]
    fn test_fake_writability_never_writes() {
        let faked = fake_writability(value(9));
        assert!(faked.has_value());
        assert_eq!(faked.read(), 9);
        assert!(!faked.ready_to_write());
    }

    #[test]
    fn test_cast_reads_and_validates_writes() {
        let cell = RefCell::new(200u8);
        let wide = cast::<u32, _>(direct(&cell));
        assert_eq!(wide.read(), 200u32);
        wide.write(100).unwrap();
        assert_eq!(*cell.borrow(), 100u8);
        // 300 does not fit in a u8; the write is rejected, not truncated.
        assert!(wide.write(300).is_err());
        assert_eq!(*cell.borrow(), 100u8);
    }

    #[test]
    fn test_presence_observers_always_have_values() {
        let present = has_value(value(1));
        assert!(present.has_value());
        assert!(present.read());

        let absent = has_value(empty::<i32>());
        assert!(absent.has_value());
        assert!(!absent.read());

        let readiness = ready_to_write(empty::<i32>());
        assert!(readiness.has_value());
        assert!(!readiness.read());
    }

    #[test]
    fn test_fallback_prefers_primary() {
        let with_fallback = add_fallback(empty::<i32>(), 7);
        assert!(with_fallback.has_value());
        assert_eq!(with_fallback.read(), 7);

        let cell = RefCell::new(3);
        let primary = add_fallback(direct(&cell), 7);
        assert_eq!(primary.read(), 3);
        primary.write(5).unwrap();
        assert_eq!(*cell.borrow(), 5);
    }

    #[test]
    fn test_fallback_id_tracks_source() {
        let cell = RefCell::new(7);
        let through_primary = add_fallback(direct(&cell), 7);
        let through_fallback = add_fallback(empty::<i32>(), 7);
        // Same value, different supplier: the identities must differ.
        assert_ne!(through_primary.value_id(), through_fallback.value_id());
    }

    #[test]
    fn test_mask_blocks_when_false() {
        let masked = mask(value(5), false);
        assert!(!masked.has_value());
        assert!(masked.value_id().is_null());

        let open = mask(value(5), true);
        assert!(open.has_value());
        assert_eq!(open.read(), 5);

        let cell = RefCell::new(1);
        let gated = mask(direct(&cell), false);
        assert!(!gated.ready_to_write());
    }

    #[test]
    fn test_simplify_id_uses_value() {
        let signal = simplify_id(value(11));
        assert_eq!(signal.value_id(), Id::of(11));
    }
}
