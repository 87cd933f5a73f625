//! Actions: deferred, readiness-gated effects
//!
//! An action is the response half of an event binding: it reports whether it
//! can fire, and performing it runs with latch semantics: every source
//! signal is read before the `intermediary` callback runs, and every sink
//! write happens after. Sequencing actions therefore lets a whole
//! composition capture its inputs before any of its outputs change.
//!
//! Like signals, actions are built at the call site, borrow their operand
//! signals by value, and live only for the current traversal.

use crate::combine::LazyApply;
use crate::direction::{CanRead, CanWrite};
use crate::ops::SignalExt;
use crate::signal::{IntoReadSignal, Signal};

/// A deferred effect taking an argument tuple `Args`.
pub trait Action<Args = ()> {
    /// Can the action currently fire?
    fn is_ready(&self) -> bool;

    /// Perform the action.
    ///
    /// `intermediary` must be invoked exactly once, after all upstream reads
    /// and before any writes this action performs.
    fn perform(&self, intermediary: &mut dyn FnMut(), args: Args);
}

/// Perform `action` if it is ready; otherwise do nothing.
pub fn perform_action<Args, A: Action<Args>>(action: &A, args: Args) {
    if action.is_ready() {
        action.perform(&mut || {}, args);
    }
}

/// Composition methods available on every action.
pub trait ActionExt<Args>: Action<Args> + Sized {
    /// Run this action, then `second`, with both sets of writes latched.
    fn then<B: Action<Args>>(self, second: B) -> Seq<Self, B> {
        Seq {
            first: self,
            second,
        }
    }
}

impl<Args, A: Action<Args>> ActionExt<Args> for A {}

/// Two actions performed in sequence as one.
///
/// Ready iff both are ready. The latch nesting makes both actions' reads
/// happen before either action's writes, so the pair looks atomic from the
/// outside.
#[derive(Clone, Debug)]
pub struct Seq<A, B> {
    first: A,
    second: B,
}

impl<Args, A, B> Action<Args> for Seq<A, B>
where
    Args: Clone,
    A: Action<Args>,
    B: Action<Args>,
{
    fn is_ready(&self) -> bool {
        self.first.is_ready() && self.second.is_ready()
    }

    fn perform(&self, intermediary: &mut dyn FnMut(), args: Args) {
        let first_args = args.clone();
        let mut chained = || self.first.perform(&mut *intermediary, first_args.clone());
        self.second.perform(&mut chained, args);
    }
}

/// An action with its leftmost parameter bound to a signal.
///
/// Ready iff the action is ready and the signal has a value.
#[derive(Clone, Debug)]
pub struct Bound<A, S> {
    action: A,
    signal: S,
}

/// Bind the leftmost parameter of `action` to a readable source.
pub fn bind<A, O, M, V>(action: A, source: O) -> Bound<A, O::Signal>
where
    V: Clone + 'static,
    O: IntoReadSignal<V, M>,
{
    Bound {
        action,
        signal: source.into_read_signal(),
    }
}

impl<A, S> Action<()> for Bound<A, S>
where
    S: Signal,
    S::Dir: CanRead,
    A: Action<(S::Value,)>,
{
    fn is_ready(&self) -> bool {
        self.action.is_ready() && self.signal.has_value()
    }

    fn perform(&self, intermediary: &mut dyn FnMut(), _args: ()) {
        self.action.perform(intermediary, (self.signal.read(),));
    }
}

impl<A, S, T1> Action<(T1,)> for Bound<A, S>
where
    S: Signal,
    S::Dir: CanRead,
    A: Action<(S::Value, T1)>,
{
    fn is_ready(&self) -> bool {
        self.action.is_ready() && self.signal.has_value()
    }

    fn perform(&self, intermediary: &mut dyn FnMut(), args: (T1,)) {
        self.action
            .perform(intermediary, (self.signal.read(), args.0));
    }
}

/// The action that copies a source signal's value into a sink.
///
/// Ready iff the source has a value and the sink is ready to write. The read
/// happens before the intermediary, the write after.
#[derive(Clone, Debug)]
pub struct Assign<Sink, Src> {
    sink: Sink,
    source: Src,
}

/// Create an action that writes `source`'s value into `sink` when performed.
pub fn assign<Sink, O, M>(sink: Sink, source: O) -> Assign<Sink, O::Signal>
where
    Sink: Signal,
    Sink::Dir: CanWrite,
    O: IntoReadSignal<Sink::Value, M>,
{
    Assign {
        sink,
        source: source.into_read_signal(),
    }
}

impl<Sink, Src> Action<()> for Assign<Sink, Src>
where
    Sink: Signal,
    Sink::Dir: CanWrite,
    Src: Signal<Value = Sink::Value>,
    Src::Dir: CanRead,
{
    fn is_ready(&self) -> bool {
        self.source.has_value() && self.sink.ready_to_write()
    }

    fn perform(&self, intermediary: &mut dyn FnMut(), _args: ()) {
        let captured = self.source.read();
        intermediary();
        if let Err(rejected) = self.sink.write(captured) {
            tracing::warn!(error = %rejected, "assignment rejected by sink");
        }
    }
}

/// The compound update `signal = signal + amount` as an action.
pub fn add_to<S, O, M>(
    signal: S,
    amount: O,
) -> Assign<S, LazyApply<fn((S::Value, S::Value)) -> S::Value, (S, O::Signal), S::Value>>
where
    S: Signal + Clone,
    S::Dir: CanRead + CanWrite,
    S::Value: std::ops::Add<Output = S::Value>,
    O: IntoReadSignal<S::Value, M>,
    <O::Signal as Signal>::Dir: CanRead,
{
    assign(signal.clone(), signal.add(amount))
}

/// An action that flips a boolean signal.
pub fn toggle<S>(flag: S) -> Assign<S, LazyApply<fn((bool,)) -> bool, (S,), bool>>
where
    S: Signal<Value = bool> + Clone,
    S::Dir: CanRead + CanWrite,
{
    assign(flag.clone(), flag.not())
}

/// Container values that accept appended items.
pub trait PushTarget: Clone + 'static {
    type Item: Clone + 'static;

    fn push_item(&mut self, item: Self::Item);
}

impl<T: Clone + 'static> PushTarget for Vec<T> {
    type Item = T;

    fn push_item(&mut self, item: T) {
        self.push(item);
    }
}

impl PushTarget for String {
    type Item = char;

    fn push_item(&mut self, item: char) {
        self.push(item);
    }
}

/// The action that appends its argument to a container signal.
#[derive(Clone, Debug)]
pub struct PushBack<C> {
    container: C,
}

/// Create an action taking one item and pushing it onto `container`.
pub fn push_back<C>(container: C) -> PushBack<C>
where
    C: Signal,
    C::Dir: CanRead + CanWrite,
    C::Value: PushTarget,
{
    PushBack { container }
}

impl<C> Action<(<C::Value as PushTarget>::Item,)> for PushBack<C>
where
    C: Signal,
    C::Dir: CanRead + CanWrite,
    C::Value: PushTarget,
{
    fn is_ready(&self) -> bool {
        self.container.has_value() && self.container.ready_to_write()
    }

    fn perform(
        &self,
        intermediary: &mut dyn FnMut(),
        args: (<C::Value as PushTarget>::Item,),
    ) {
        let mut updated = self.container.read();
        updated.push_item(args.0);
        intermediary();
        if let Err(rejected) = self.container.write(updated) {
            tracing::warn!(error = %rejected, "push rejected by container signal");
        }
    }
}

/// An action whose readiness and effect are defined by closures.
#[derive(Clone, Debug)]
pub struct FnAction<R, P> {
    ready: R,
    run: P,
}

/// Create an action from a readiness predicate and an effect.
pub fn action_fn<R, P>(ready: R, run: P) -> FnAction<R, P>
where
    R: Fn() -> bool,
{
    FnAction { ready, run }
}

fn always_ready() -> bool {
    true
}

/// Create an always-ready action from an effect.
pub fn callback<P>(run: P) -> FnAction<fn() -> bool, P> {
    FnAction {
        ready: always_ready,
        run,
    }
}

impl<R, P> Action<()> for FnAction<R, P>
where
    R: Fn() -> bool,
    P: Fn(),
{
    fn is_ready(&self) -> bool {
        (self.ready)()
    }

    fn perform(&self, intermediary: &mut dyn FnMut(), _args: ()) {
        intermediary();
        (self.run)();
    }
}

impl<R, P, T1> Action<(T1,)> for FnAction<R, P>
where
    R: Fn() -> bool,
    P: Fn(T1),
{
    fn is_ready(&self) -> bool {
        (self.ready)()
    }

    fn perform(&self, intermediary: &mut dyn FnMut(), args: (T1,)) {
        intermediary();
        (self.run)(args.0);
    }
}

impl<R, P, T1, T2> Action<(T1, T2)> for FnAction<R, P>
where
    R: Fn() -> bool,
    P: Fn(T1, T2),
{
    fn is_ready(&self) -> bool {
        (self.ready)()
    }

    fn perform(&self, intermediary: &mut dyn FnMut(), args: (T1, T2)) {
        intermediary();
        (self.run)(args.0, args.1);
    }
}
