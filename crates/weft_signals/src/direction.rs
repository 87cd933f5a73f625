//! Capability directions for signals
//!
//! Every signal type carries a direction in its type: read-only, write-only,
//! or duplex. Capability checks happen at compile time through the
//! [`CanRead`]/[`CanWrite`] bounds; combining signals narrows or widens the
//! direction through the [`Intersect`] and [`UnionDir`] type operators.

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::ReadOnly {}
    impl Sealed for super::WriteOnly {}
    impl Sealed for super::Duplex {}
}

/// A signal direction marker type.
pub trait Direction: sealed::Sealed + Copy + 'static {}

/// The signal can only be read.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOnly;

/// The signal can only be written.
#[derive(Clone, Copy, Debug, Default)]
pub struct WriteOnly;

/// The signal can be read and written.
#[derive(Clone, Copy, Debug, Default)]
pub struct Duplex;

impl Direction for ReadOnly {}
impl Direction for WriteOnly {}
impl Direction for Duplex {}

/// Directions that include the read capability.
pub trait CanRead: Direction {}
impl CanRead for ReadOnly {}
impl CanRead for Duplex {}

/// Directions that include the write capability.
pub trait CanWrite: Direction {}
impl CanWrite for WriteOnly {}
impl CanWrite for Duplex {}

/// A signal with this direction can stand in where `Expected` is required.
///
/// Duplex is compatible with everything; the one-way directions are only
/// compatible with themselves.
pub trait CompatibleWith<Expected: Direction>: Direction {}
impl CompatibleWith<ReadOnly> for ReadOnly {}
impl CompatibleWith<WriteOnly> for WriteOnly {}
impl CompatibleWith<Duplex> for Duplex {}
impl CompatibleWith<ReadOnly> for Duplex {}
impl CompatibleWith<WriteOnly> for Duplex {}

/// Narrow two directions to the capabilities they share.
///
/// There is deliberately no `ReadOnly` x `WriteOnly` case: signals with no
/// common capability cannot be combined, and the missing impl turns that
/// mistake into a compile error.
pub trait Intersect<Other: Direction>: Direction {
    type Output: Direction;
}
impl Intersect<ReadOnly> for ReadOnly {
    type Output = ReadOnly;
}
impl Intersect<Duplex> for ReadOnly {
    type Output = ReadOnly;
}
impl Intersect<WriteOnly> for WriteOnly {
    type Output = WriteOnly;
}
impl Intersect<Duplex> for WriteOnly {
    type Output = WriteOnly;
}
impl Intersect<ReadOnly> for Duplex {
    type Output = ReadOnly;
}
impl Intersect<WriteOnly> for Duplex {
    type Output = WriteOnly;
}
impl Intersect<Duplex> for Duplex {
    type Output = Duplex;
}

/// Widen two directions to the union of their capabilities.
pub trait UnionDir<Other: Direction>: Direction {
    type Output: Direction;
}
impl UnionDir<ReadOnly> for ReadOnly {
    type Output = ReadOnly;
}
impl UnionDir<WriteOnly> for ReadOnly {
    type Output = Duplex;
}
impl UnionDir<Duplex> for ReadOnly {
    type Output = Duplex;
}
impl UnionDir<ReadOnly> for WriteOnly {
    type Output = Duplex;
}
impl UnionDir<WriteOnly> for WriteOnly {
    type Output = WriteOnly;
}
impl UnionDir<Duplex> for WriteOnly {
    type Output = Duplex;
}
impl UnionDir<ReadOnly> for Duplex {
    type Output = Duplex;
}
impl UnionDir<WriteOnly> for Duplex {
    type Output = Duplex;
}
impl UnionDir<Duplex> for Duplex {
    type Output = Duplex;
}
