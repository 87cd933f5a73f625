//! Container traversal utilities
//!
//! Helpers for declaring one node per container element. Elements get named
//! blocks so their state follows them when the container reorders, and each
//! element is presented to the body as a subscript signal that reads and
//! writes through the container.

use std::cell::Cell;

use weft_identity::{CapturedId, Id};
use weft_signals::{
    read_signal, signal_has_value, subscript, value, CanRead, IndexedValue, ReadOnly, Signal,
    Subscript, Value,
};

use crate::context::Context;
use crate::cursor::{get_cached_data, named_block, with_naming, DataSlot};
use crate::flow::branch;

/// The element signal handed to sequence bodies.
pub type ElementSignal<S> = Subscript<S, Value<usize>>;

/// Visit every element of a vector-like container signal, keyed by index.
pub fn for_each<'a, S, F>(ctx: &mut Context<'a>, container: &S, mut body: F)
where
    S: Signal + Clone,
    S::Dir: CanRead,
    S::Value: IndexedValue<usize>,
    F: FnMut(&mut Context<'a>, ElementSignal<S>),
{
    let present = signal_has_value(container);
    branch(ctx, present, |ctx| {
        let count = read_signal(container).item_count();
        with_naming(ctx, |ctx, _map| {
            for index in 0..count {
                named_block(ctx, Id::of(index), |ctx| {
                    body(ctx, subscript(container.clone(), value(index)));
                });
            }
        });
    });
}

/// Visit every element, naming each block with `key_of(element)`.
///
/// Reordering the container moves each element's persistent state along
/// with it, as long as the keys stay stable.
pub fn for_each_keyed<'a, S, K, F>(ctx: &mut Context<'a>, container: &S, key_of: K, mut body: F)
where
    S: Signal + Clone,
    S::Dir: CanRead,
    S::Value: IndexedValue<usize>,
    K: Fn(&<S::Value as IndexedValue<usize>>::Item) -> Id,
    F: FnMut(&mut Context<'a>, ElementSignal<S>),
{
    let present = signal_has_value(container);
    branch(ctx, present, |ctx| {
        let items = read_signal(container);
        let count = items.item_count();
        with_naming(ctx, |ctx, _map| {
            for index in 0..count {
                let key = items
                    .item_at(&index)
                    .map(|item| key_of(&item))
                    .unwrap_or(Id::Null);
                let key = if key.is_null() { Id::of(index) } else { key };
                named_block(ctx, key, |ctx| {
                    body(ctx, subscript(container.clone(), value(index)));
                });
            }
        });
    });
}

pub(crate) struct MappedData<V> {
    input_id: CapturedId,
    items: Vec<V>,
    item_ids: Vec<CapturedId>,
    version: u64,
}

impl<V> Default for MappedData<V> {
    fn default() -> Self {
        Self {
            input_id: CapturedId::default(),
            items: Vec::new(),
            item_ids: Vec::new(),
            version: 0,
        }
    }
}

/// The signal produced by [`transform`].
///
/// Has a value once every element maps successfully; the identity is an
/// output version that bumps whenever any mapped element changes.
pub struct MappedSignal<V> {
    slot: DataSlot<MappedData<V>>,
    all_present: bool,
}

impl<V> Clone for MappedSignal<V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            all_present: self.all_present,
        }
    }
}

impl<V: Clone + 'static> Signal for MappedSignal<V> {
    type Value = Vec<V>;
    type Dir = ReadOnly;

    fn has_value(&self) -> bool {
        self.all_present
    }

    fn value_id(&self) -> Id {
        Id::of(self.slot.borrow().version)
    }

    fn read(&self) -> Vec<V> {
        self.slot.borrow().items.clone()
    }
}

/// Map every element of a container signal through a signal-producing
/// function, caching results per element.
///
/// This is the signal-space `map`: the mapping function is itself a
/// traversal function, so it may attach state and participate in events.
/// Elements re-map only when their mapped signal's identity changes, and
/// the result keeps flowing as elements keep changing.
pub fn transform<'a, S, F, MS, V>(
    ctx: &mut Context<'a>,
    container: &S,
    mut map_fn: F,
) -> MappedSignal<V>
where
    S: Signal + Clone,
    S::Dir: CanRead,
    S::Value: IndexedValue<usize>,
    F: FnMut(&mut Context<'a>, ElementSignal<S>) -> MS,
    MS: Signal<Value = V>,
    MS::Dir: CanRead,
    V: Clone + Default + 'static,
{
    let (slot, _) = get_cached_data::<MappedData<V>>(ctx);
    let all_present = Cell::new(false);

    let present = signal_has_value(container);
    branch(ctx, present, |ctx| {
        let count = read_signal(container).item_count();
        {
            let mut data = slot.borrow_mut();
            if !data.input_id.matches(&container.value_id()) {
                data.items.resize_with(count, V::default);
                data.item_ids.resize_with(count, CapturedId::default);
                data.version += 1;
                let input_id = container.value_id();
                data.input_id.capture(&input_id);
            }
        }

        let valid = Cell::new(0usize);
        with_naming(ctx, |ctx, _map| {
            for index in 0..count {
                named_block(ctx, Id::of(index), |ctx| {
                    let mapped = map_fn(ctx, subscript(container.clone(), value(index)));
                    if signal_has_value(&mapped) {
                        let mapped_id = mapped.value_id();
                        let mut data = slot.borrow_mut();
                        if !data.item_ids[index].matches(&mapped_id) {
                            data.items[index] = read_signal(&mapped);
                            data.item_ids[index].capture(&mapped_id);
                            data.version += 1;
                        }
                        valid.set(valid.get() + 1);
                    }
                });
            }
        });
        all_present.set(valid.get() == count);
    });

    MappedSignal {
        slot,
        all_present: all_present.get(),
    }
}
