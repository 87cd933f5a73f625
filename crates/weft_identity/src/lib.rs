//! Value identity for reactive values
//!
//! A reactive value carries an *identity* besides its payload. Two equal
//! identities mean "this is still the same value"; a changed identity is the
//! one and only trigger the runtime uses to invalidate caches built on top of
//! that value. This crate provides:
//!
//! - [`Id`]: an identity token: null/unit sentinels, dynamically typed
//!   values, and lexicographically ordered pairs
//! - [`CapturedId`]: a nullable, owned identity kept across traversals
//!
//! Identities form a total order so they can key ordered maps. Values of
//! different dynamic types are ordered by their type, then by payload, which
//! keeps the order well-defined across arbitrary mixes of identity kinds.
//!
//! # Example
//!
//! ```rust
//! use weft_identity::{CapturedId, Id};
//!
//! let name = Id::of("row-7".to_string());
//! let version = Id::of(3u64);
//! let combined = Id::pair(name.clone(), version);
//!
//! let mut captured = CapturedId::default();
//! assert!(!captured.matches(&combined));
//! captured.capture(&combined);
//! assert!(captured.matches(&Id::pair(name, Id::of(3u64))));
//! ```

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// A payload that can serve as an identity.
///
/// Implemented for every `'static` type that is comparable for equality and
/// ordering. Equality across different dynamic types is always false; ordering
/// across different dynamic types falls back to the type itself.
///
/// The order must agree with equality: `a == b` exactly when neither value is
/// less than the other. Types with incomparable values (e.g. float NaN) break
/// that contract and make identity comparisons unreliable.
pub trait IdValue: fmt::Debug + 'static {
    fn as_any(&self) -> &dyn Any;

    /// True iff `other` has the same dynamic type and an equal payload.
    fn eq_value(&self, other: &dyn IdValue) -> bool;

    /// Strict ordering; different dynamic types order by type identity.
    fn lt_value(&self, other: &dyn IdValue) -> bool;
}

impl<T> IdValue for T
where
    T: PartialEq + PartialOrd + fmt::Debug + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn IdValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn lt_value(&self, other: &dyn IdValue) -> bool {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => matches!(self.partial_cmp(other), Some(Ordering::Less)),
            None => self.as_any().type_id() < other.as_any().type_id(),
        }
    }
}

/// An identity token for a reactive value.
///
/// `Id` has value semantics: clones are cheap (shared payload) and compare by
/// content. The variants cover the identity kinds the runtime needs:
///
/// - [`Id::Null`]: no value to identify
/// - [`Id::Unit`]: the single identity of a value that never changes
/// - [`Id::Value`]: identity carried by a comparable payload
/// - [`Id::Pair`]: structural combination, ordered lexicographically
#[derive(Clone, Debug)]
pub enum Id {
    Null,
    Unit,
    Value(Rc<dyn IdValue>),
    Pair(Rc<(Id, Id)>),
}

impl Id {
    /// Create an identity from a comparable value.
    pub fn of<T>(value: T) -> Id
    where
        T: PartialEq + PartialOrd + fmt::Debug + 'static,
    {
        Id::Value(Rc::new(value))
    }

    /// Combine two identities into one, ordered lexicographically.
    pub fn pair(first: Id, second: Id) -> Id {
        Id::Pair(Rc::new((first, second)))
    }

    /// Combine any number of identities into nested pairs.
    ///
    /// An empty sequence yields [`Id::Null`]; a single identity is returned
    /// unchanged.
    pub fn combine<I>(ids: I) -> Id
    where
        I: IntoIterator<Item = Id>,
    {
        let mut ids = ids.into_iter();
        match ids.next() {
            Some(first) => ids.fold(first, Id::pair),
            None => Id::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Id::Null)
    }

    fn rank(&self) -> u8 {
        match self {
            Id::Null => 0,
            Id::Unit => 1,
            Id::Value(_) => 2,
            Id::Pair(_) => 3,
        }
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Id) -> bool {
        match (self, other) {
            (Id::Null, Id::Null) | (Id::Unit, Id::Unit) => true,
            (Id::Value(a), Id::Value(b)) => a.eq_value(b.as_ref()),
            (Id::Pair(a), Id::Pair(b)) => a.0 == b.0 && a.1 == b.1,
            _ => false,
        }
    }
}

impl Eq for Id {}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Id) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Id) -> Ordering {
        match (self, other) {
            (Id::Value(a), Id::Value(b)) => {
                if a.eq_value(b.as_ref()) {
                    Ordering::Equal
                } else if a.lt_value(b.as_ref()) {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (Id::Pair(a), Id::Pair(b)) => a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// An identity captured for storage beyond the traversal that produced it.
///
/// Starts out empty; [`CapturedId::matches`] is false until something has
/// been captured.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CapturedId {
    id: Option<Id>,
}

impl CapturedId {
    pub fn new(id: &Id) -> Self {
        Self {
            id: Some(id.clone()),
        }
    }

    /// Take an owning copy of `id`, replacing any previous capture.
    pub fn capture(&mut self, id: &Id) {
        self.id = Some(id.clone());
    }

    pub fn clear(&mut self) {
        self.id = None;
    }

    pub fn is_captured(&self) -> bool {
        self.id.is_some()
    }

    pub fn get(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// True iff something has been captured and it equals `id`.
    pub fn matches(&self, id: &Id) -> bool {
        self.id.as_ref().map_or(false, |captured| captured == id)
    }
}
