//! Persistent local state
//!
//! [`StateCell`] is version-tracked storage meant to live in the data graph
//! (or anywhere else application state lives); its signal reports the
//! version as identity, so consumers see exactly one identity change per
//! mutation.

use weft_identity::Id;
use weft_signals::{
    signal_has_value, CanRead, Duplex, IntoReadSignal, Signal, WriteResult,
};

use crate::context::Context;
use crate::cursor::{get_data, DataSlot};

/// A versioned state holder. Version 0 means uninitialized.
pub struct StateCell<V> {
    value: Option<V>,
    version: u64,
}

impl<V> Default for StateCell<V> {
    fn default() -> Self {
        Self {
            value: None,
            version: 0,
        }
    }
}

impl<V> StateCell<V> {
    pub fn new(value: V) -> Self {
        Self {
            value: Some(value),
            version: 1,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.version != 0
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set(&mut self, value: V) {
        self.value = Some(value);
        self.version += 1;
    }

    /// Mutate the value in place.
    ///
    /// Counts as a change whether or not the closure touched anything, so
    /// make the call only when an update is intended.
    pub fn update(&mut self, mutate: impl FnOnce(&mut V)) {
        if let Some(value) = &mut self.value {
            mutate(value);
            self.version += 1;
        }
    }
}

/// The duplex signal over a [`StateCell`] slot in the data graph.
pub struct StateSignal<V> {
    slot: DataSlot<StateCell<V>>,
}

impl<V> Clone for StateSignal<V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<V: Clone + 'static> Signal for StateSignal<V> {
    type Value = V;
    type Dir = Duplex;

    fn has_value(&self) -> bool {
        self.slot.borrow().is_initialized()
    }

    fn value_id(&self) -> Id {
        Id::of(self.slot.borrow().version())
    }

    fn read(&self) -> V {
        self.slot
            .borrow()
            .value()
            .cloned()
            .expect("state read before initialization")
    }

    fn ready_to_write(&self) -> bool {
        true
    }

    fn write(&self, value: V) -> WriteResult {
        self.slot.borrow_mut().set(value);
        Ok(())
    }
}

/// Attach persistent state to the current node.
///
/// The state initializes from `initial` as soon as it has a value, and
/// keeps its own value from then on: later changes to `initial` are
/// ignored. The returned signal has no value until one of the two happens.
pub fn get_state<V, O, M>(ctx: &mut Context, initial: O) -> StateSignal<V>
where
    V: Clone + 'static,
    O: IntoReadSignal<V, M>,
    <O::Signal as Signal>::Dir: CanRead,
{
    let initial = initial.into_read_signal();
    let (slot, _) = get_data::<StateCell<V>>(ctx);
    {
        let mut cell = slot.borrow_mut();
        if !cell.is_initialized() && signal_has_value(&initial) {
            cell.set(initial.read());
        }
    }
    StateSignal { slot }
}
