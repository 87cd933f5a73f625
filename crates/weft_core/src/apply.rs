//! Eager memoized application and asynchronous operations
//!
//! [`apply`] is the eager counterpart of `lazy_apply`: the function runs
//! during refresh passes, its result is cached in the data graph, and it
//! only re-runs when an argument's identity changes. Failures latch into
//! the signal's status instead of propagating.
//!
//! [`launch_async`] has the same memoization shape but hands the work to a
//! launcher along with a reporter; the result arrives on a later pass.
//! Argument changes bump a version, and stale reports are discarded by
//! version check.

use std::cell::Cell;

use weft_identity::{CapturedId, Id};
use weft_signals::{ReadOnly, Signal, SignalTuple};

use crate::context::{Context, DatalessContext};
use crate::cursor::{get_cached_data, DataSlot};
use crate::events::is_refresh_event;
use crate::system::System;

/// Where an [`apply`] computation stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyStatus {
    Uncomputed,
    Ready,
    Failed,
}

pub struct ApplyData<V> {
    version: u64,
    status: ApplyStatus,
    value: Option<V>,
    error: Option<String>,
}

impl<V> Default for ApplyData<V> {
    fn default() -> Self {
        Self {
            version: 0,
            status: ApplyStatus::Uncomputed,
            value: None,
            error: None,
        }
    }
}

fn reset_apply<V>(data: &mut ApplyData<V>) {
    if data.status != ApplyStatus::Uncomputed {
        data.version += 1;
        data.status = ApplyStatus::Uncomputed;
        data.value = None;
        data.error = None;
    }
}

/// The read-only signal carrying an [`apply`] result.
///
/// Its identity is an internal version counter, bumped whenever the inputs
/// move on, so downstream caches see exactly one change per recomputation.
pub struct ApplySignal<V> {
    slot: DataSlot<ApplyData<V>>,
}

impl<V> Clone for ApplySignal<V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<V> ApplySignal<V> {
    pub fn status(&self) -> ApplyStatus {
        self.slot.borrow().status
    }

    /// The latched failure message, if the computation failed.
    pub fn error(&self) -> Option<String> {
        self.slot.borrow().error.clone()
    }
}

impl<V: Clone + 'static> Signal for ApplySignal<V> {
    type Value = V;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        self.slot.borrow().status == ApplyStatus::Ready
    }

    fn value_id(&self) -> Id {
        Id::of(self.slot.borrow().version)
    }

    fn read(&self) -> V {
        self.slot
            .borrow()
            .value
            .clone()
            .expect("apply result read before it was computed")
    }
}

/// Walk the argument tuple, capturing each argument's identity in its own
/// cached slot and calling `reset` whenever one has changed or gone
/// missing. Returns whether every argument has a value.
fn track_arguments<A: SignalTuple>(
    ctx: &mut Context,
    refresh: bool,
    args: &A,
    mut reset: impl FnMut(),
) -> bool {
    let args_ready = Cell::new(true);
    let mut visit = |has: bool, id: Id| {
        let (captured, _) = get_cached_data::<CapturedId>(ctx);
        if refresh {
            if !has {
                reset();
                args_ready.set(false);
            } else if !captured.borrow().matches(&id) {
                reset();
                captured.borrow_mut().capture(&id);
            }
        }
    };
    args.visit_ids(&mut visit);
    args_ready.get()
}

/// Eagerly apply `f` to the argument signals, memoized in the data graph.
///
/// `f` runs during a refresh pass when all arguments have values and any
/// argument's identity has changed since the last run.
pub fn apply<V, A, F>(ctx: &mut Context, mut f: F, args: A) -> ApplySignal<V>
where
    V: Clone + 'static,
    A: SignalTuple,
    F: FnMut(A::Values) -> V,
{
    try_apply(ctx, move |values| Ok(f(values)), args)
}

/// [`apply`] for fallible functions: an error latches the FAILED status
/// (and its message) into the signal instead of propagating.
pub fn try_apply<V, A, F>(ctx: &mut Context, mut f: F, args: A) -> ApplySignal<V>
where
    V: Clone + 'static,
    A: SignalTuple,
    F: FnMut(A::Values) -> anyhow::Result<V>,
{
    let (slot, _) = get_cached_data::<ApplyData<V>>(ctx);
    let refresh = is_refresh_event(ctx);
    let args_ready = {
        let slot = slot.clone();
        track_arguments(ctx, refresh, &args, move || {
            reset_apply(&mut slot.borrow_mut())
        })
    };

    if refresh {
        let should_run = slot.borrow().status == ApplyStatus::Uncomputed && args_ready;
        if should_run {
            match f(args.read_all()) {
                Ok(value) => {
                    let mut data = slot.borrow_mut();
                    data.value = Some(value);
                    data.status = ApplyStatus::Ready;
                }
                Err(error) => {
                    tracing::warn!(%error, "apply computation failed");
                    let mut data = slot.borrow_mut();
                    data.status = ApplyStatus::Failed;
                    data.error = Some(error.to_string());
                }
            }
        }
    }

    ApplySignal { slot }
}

/// Where an asynchronous operation stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AsyncStatus {
    Unready,
    Launched,
    Complete,
    Failed,
}

pub struct AsyncData<V> {
    version: u64,
    status: AsyncStatus,
    value: Option<V>,
    error: Option<String>,
}

impl<V> Default for AsyncData<V> {
    fn default() -> Self {
        Self {
            version: 0,
            status: AsyncStatus::Unready,
            value: None,
            error: None,
        }
    }
}

fn reset_async<V>(data: &mut AsyncData<V>) {
    if data.status != AsyncStatus::Unready {
        data.version += 1;
        data.status = AsyncStatus::Unready;
        data.value = None;
        data.error = None;
    }
}

/// The read-only signal carrying an asynchronous result.
pub struct AsyncSignal<V> {
    slot: DataSlot<AsyncData<V>>,
}

impl<V> Clone for AsyncSignal<V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<V> AsyncSignal<V> {
    pub fn status(&self) -> AsyncStatus {
        self.slot.borrow().status
    }

    pub fn error(&self) -> Option<String> {
        self.slot.borrow().error.clone()
    }
}

impl<V: Clone + 'static> Signal for AsyncSignal<V> {
    type Value = V;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        self.slot.borrow().status == AsyncStatus::Complete
    }

    fn value_id(&self) -> Id {
        Id::of(self.slot.borrow().version)
    }

    fn read(&self) -> V {
        self.slot
            .borrow()
            .value
            .clone()
            .expect("async result read before completion")
    }
}

/// Delivers an asynchronous result back into the graph.
///
/// Deliberately not `Send`: results must come back on the thread running
/// the system. Work running elsewhere posts its result to this thread (via
/// the host's external interface) and reports from there.
pub struct AsyncReporter<V> {
    system: System,
    slot: DataSlot<AsyncData<V>>,
    version: u64,
}

impl<V> Clone for AsyncReporter<V> {
    fn clone(&self) -> Self {
        Self {
            system: self.system.clone(),
            slot: self.slot.clone(),
            version: self.version,
        }
    }
}

impl<V: Clone + 'static> AsyncReporter<V> {
    /// Deliver the operation's result and schedule a refresh.
    ///
    /// A report from an operation whose inputs have since changed is
    /// discarded; the refresh still runs so the relaunch can happen.
    pub fn report(&self, value: V) {
        let fresh = {
            let mut data = self.slot.borrow_mut();
            if data.version == self.version {
                data.value = Some(value);
                data.status = AsyncStatus::Complete;
                true
            } else {
                false
            }
        };
        if !fresh {
            tracing::debug!("stale async result discarded");
        }
        self.system.refresh();
    }
}

/// Launch an asynchronous operation over the argument signals.
///
/// During a refresh pass with all arguments present and the operation
/// unready, `launcher` is invoked with a reporter and the argument values;
/// the status moves to LAUNCHED (or FAILED if the launcher errors). A later
/// [`AsyncReporter::report`] completes it. Any argument identity change
/// resets the operation and discards in-flight results.
pub fn launch_async<'a, V, A, L>(ctx: &mut Context<'a>, launcher: L, args: A) -> AsyncSignal<V>
where
    V: Clone + 'static,
    A: SignalTuple,
    L: FnOnce(&mut DatalessContext<'a>, AsyncReporter<V>, A::Values) -> anyhow::Result<()>,
{
    let (slot, _) = get_cached_data::<AsyncData<V>>(ctx);
    let refresh = is_refresh_event(ctx);
    let args_ready = {
        let slot = slot.clone();
        track_arguments(ctx, refresh, &args, move || {
            reset_async(&mut slot.borrow_mut())
        })
    };

    if refresh {
        let should_launch = slot.borrow().status == AsyncStatus::Unready && args_ready;
        if should_launch {
            let version = slot.borrow().version;
            slot.borrow_mut().status = AsyncStatus::Launched;
            let reporter = AsyncReporter {
                system: ctx.system().clone(),
                slot: slot.clone(),
                version,
            };
            let values = args.read_all();
            if let Err(error) = launcher(ctx, reporter, values) {
                tracing::warn!(%error, "async launcher failed");
                let mut data = slot.borrow_mut();
                data.status = AsyncStatus::Failed;
                data.error = Some(error.to_string());
            }
        }
    }

    AsyncSignal { slot }
}
