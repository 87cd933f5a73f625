//! Weft signal algebra
//!
//! This crate provides the reactive-value layer of the weft runtime:
//!
//! - **Signals**: values that change over time, carrying a stable identity
//!   and a compile-time capability direction (read, write, or both)
//! - **Combinators**: lazy, allocation-free composition (function
//!   application, conditionals, lenses, subscripts, lifted operators)
//! - **Actions**: deferred, readiness-gated effects with latched
//!   read-then-write semantics
//!
//! Signals borrow their sources and live for a single traversal; they are
//! cheap to copy and compose at the call site.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use weft_signals::prelude::*;
//!
//! let count = RefCell::new(2);
//! let doubled = direct(&count).mul(2);
//! assert_eq!(doubled.read(), 4);
//!
//! // Actions capture their reads before any write happens.
//! let bump = add_to(direct(&count), 1);
//! perform_action(&bump, ());
//! assert_eq!(*count.borrow(), 3);
//! ```

pub mod action;
pub mod adapt;
pub mod basic;
pub mod combine;
pub mod direction;
pub mod numeric;
pub mod ops;
pub mod signal;

pub use action::{
    action_fn, add_to, assign, bind, callback, perform_action, push_back, toggle, Action,
    ActionExt, Assign, Bound, FnAction, PushBack, PushTarget, Seq,
};
pub use adapt::{
    add_fallback, cast, fake_readability, fake_writability, has_value, mask, ready_to_write,
    simplify_id, Cast, Fallback, FakeReadability, FakeWritability, Mask, SimplifyId,
    ValuePresence, WriteReadiness,
};
pub use basic::{
    direct, direct_const, empty, lambda_duplex, lambda_reader, lambda_reader_opt, literal, value,
    Direct, DirectConst, Empty, LambdaDuplex, LambdaReader, LambdaReaderOpt, Literal, Value,
};
pub use combine::{
    conditional, lazy_apply, lens, subscript, Conditional, IndexedValue, LazyApply, Lens,
    SignalTuple, Subscript,
};
pub use direction::{
    CanRead, CanWrite, CompatibleWith, Direction, Duplex, Intersect, ReadOnly, UnionDir,
    WriteOnly,
};
pub use numeric::{offset, round_writes, scale, Offset, RoundWrites, Roundable, Scale};
pub use ops::{LogicalAnd, LogicalOr, SignalExt};
pub use signal::{
    read_signal, signal_has_value, signal_ready_to_write, write_signal, Bidirectional,
    BoxedSignal, ErasedSignal, IntoReadSignal, PlainValue, ReadCache, Readable, Signal,
    SignalHandle, ValidationError, Writable, WriteResult,
};

/// The common imports for signal-heavy code.
pub mod prelude {
    pub use crate::action::{
        action_fn, add_to, assign, bind, callback, perform_action, push_back, toggle, Action,
        ActionExt,
    };
    pub use crate::adapt::{add_fallback, has_value, mask, ready_to_write};
    pub use crate::basic::{direct, direct_const, empty, lambda_reader, literal, value};
    pub use crate::combine::{conditional, lazy_apply, lens, subscript};
    pub use crate::direction::{CanRead, CanWrite, Duplex, ReadOnly, WriteOnly};
    pub use crate::ops::SignalExt;
    pub use crate::signal::{
        read_signal, signal_has_value, signal_ready_to_write, write_signal, Bidirectional,
        Readable, Signal, Writable,
    };
}
