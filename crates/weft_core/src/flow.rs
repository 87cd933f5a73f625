//! Control-flow annotations
//!
//! The traversal's branches and loops must be annotated so the data graph
//! can give every code path its own storage. Each helper here allocates a
//! child block at its call site, activates it when its branch is taken, and
//! clears the block's recomputable caches when it is not.
//!
//! Conditions may be plain booleans or readable boolean signals; a signal
//! condition with no value takes neither branch.

use weft_signals::{CanRead, Signal};

use crate::context::Context;
use crate::cursor::{clear_block_if_enabled, enter_block, get_data, named_block_manual, with_naming};
use crate::graph::{clear_data_block, BlockCell, DataBlock};

/// The three-valued result of evaluating a branch condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CondState {
    True,
    False,
    /// A signal condition with no value: neither branch runs.
    Unknown,
}

/// Marker selecting the plain-boolean condition conversion.
pub struct BoolCondMarker;
/// Marker selecting the signal condition conversion.
pub struct SignalCondMarker;

/// Anything usable as a branch condition.
pub trait IntoCondition<Marker> {
    fn eval(&self) -> CondState;
}

impl IntoCondition<BoolCondMarker> for bool {
    fn eval(&self) -> CondState {
        if *self {
            CondState::True
        } else {
            CondState::False
        }
    }
}

impl<S> IntoCondition<SignalCondMarker> for S
where
    S: Signal<Value = bool>,
    S::Dir: CanRead,
{
    fn eval(&self) -> CondState {
        if !self.has_value() {
            CondState::Unknown
        } else if self.read() {
            CondState::True
        } else {
            CondState::False
        }
    }
}

fn branch_arm<'a>(ctx: &mut Context<'a>, taken: bool, body: impl FnOnce(&mut Context<'a>)) {
    let (slot, _) = get_data::<DataBlock>(ctx);
    let block: BlockCell = slot.cell().clone();
    if taken {
        enter_block(ctx, &block, body);
    } else {
        clear_block_if_enabled(ctx.data(), &block);
    }
}

/// Run `body` in its own data block when `condition` holds.
pub fn branch<'a, M, C>(ctx: &mut Context<'a>, condition: C, body: impl FnOnce(&mut Context<'a>))
where
    C: IntoCondition<M>,
{
    branch_arm(ctx, condition.eval() == CondState::True, body);
}

/// Two-armed [`branch`]. A condition with no value runs neither arm and
/// clears the caches of both.
pub fn branch_else<'a, M, C>(
    ctx: &mut Context<'a>,
    condition: C,
    then_body: impl FnOnce(&mut Context<'a>),
    else_body: impl FnOnce(&mut Context<'a>),
) where
    C: IntoCondition<M>,
{
    let state = condition.eval();
    branch_arm(ctx, state == CondState::True, then_body);
    branch_arm(ctx, state == CondState::False, else_body);
}

/// Run `body` in a data block selected by `key`.
///
/// Each key value gets its own persistent block inside a naming scope at
/// this call site, so switching between cases preserves every case's state.
/// Case blocks are manually owned: falling out of use clears their caches
/// but keeps their persistent data for the next time the key returns.
pub fn keyed<'a, K>(ctx: &mut Context<'a>, key: K, body: impl FnOnce(&mut Context<'a>))
where
    K: PartialEq + PartialOrd + std::fmt::Debug + 'static,
{
    with_naming(ctx, move |ctx, _map| {
        named_block_manual(ctx, weft_identity::Id::of(key), body)
    })
}

/// Run `body` once per item, each iteration in its own data block.
///
/// Iteration blocks are chained positionally: state sticks to the
/// iteration's position, not the item. Use [`crate::sequence::for_each_keyed`]
/// when items reorder. On exit the block reserved for the iteration that
/// never ran is cleared, so shrinking loops don't strand state.
pub fn iterate<'a, I>(
    ctx: &mut Context<'a>,
    items: I,
    mut body: impl FnMut(&mut Context<'a>, I::Item),
) where
    I: IntoIterator,
{
    let (first, _) = get_data::<DataBlock>(ctx);
    let mut next_block: BlockCell = first.cell().clone();
    for item in items {
        let block = next_block.clone();
        next_block = enter_block(ctx, &block, |ctx| {
            // The first node of each iteration's block holds the next
            // iteration's block, forming a chain.
            let (slot, _) = get_data::<DataBlock>(ctx);
            let upcoming = slot.cell().clone();
            body(ctx, item);
            upcoming
        });
    }
    if !ctx.data().aborted() {
        clear_data_block(&next_block);
    }
}

/// Run `body` without data-graph access.
///
/// For control flow that is not annotated: the body receives the dataless
/// context, so any attempt to fetch data inside fails to compile instead of
/// corrupting slot positions.
pub fn untracked<'a, R>(
    ctx: &mut Context<'a>,
    body: impl FnOnce(&mut crate::context::DatalessContext<'a>) -> R,
) -> R {
    body(ctx)
}
