//! The traversal cursor
//!
//! A [`DataTraversal`] walks the data graph alongside one invocation of the
//! controller. It tracks the active block, the position of the next data
//! node within it, the active naming map, and the predicted/used
//! named-block reference lists that drive garbage collection.
//!
//! All cursor state lives behind a shared cell so scope guards can save and
//! restore it on drop without borrowing the context they were opened from.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use weft_identity::{CapturedId, Id};
use weft_signals::{Duplex, Signal, WriteResult};

use crate::context::Context;
use crate::graph::{
    clear_cached_data, BlockCell, CacheHolder, DataGraph, MapCell, NamedBlockNode, NamedBlockRef,
    NamingMap,
};

/// A shared handle to one typed slot in the data graph.
///
/// Slots outlive the borrow that fetched them; signals hold slot handles and
/// read or write through them for the rest of the traversal.
pub struct DataSlot<T> {
    cell: Rc<RefCell<T>>,
}

impl<T> Clone for DataSlot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> DataSlot<T> {
    pub fn borrow(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.cell.borrow_mut()
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.borrow().clone()
    }

    pub(crate) fn cell(&self) -> &Rc<RefCell<T>> {
        &self.cell
    }

    #[cfg(test)]
    pub(crate) fn from_value(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }
}

struct Cursor {
    block: BlockCell,
    next_index: usize,
    map: Option<MapCell>,
    predicted: VecDeque<NamedBlockRef>,
    used: Vec<NamedBlockRef>,
    gc_enabled: bool,
    cache_clearing_enabled: bool,
}

/// The state of one traversal of a data graph.
///
/// Cheap to clone; clones share the same cursor.
#[derive(Clone)]
pub struct DataTraversal {
    graph: Rc<DataGraph>,
    cursor: Rc<RefCell<Cursor>>,
    aborted: Rc<Cell<bool>>,
}

impl DataTraversal {
    /// Create a traversal positioned at the graph root.
    ///
    /// Garbage collection and cache clearing are enabled only for
    /// collecting (refresh) passes; other events must see the graph exactly
    /// as the last refresh left it.
    pub fn new(graph: Rc<DataGraph>, aborted: Rc<Cell<bool>>, collecting: bool) -> Self {
        let root = graph.root().clone();
        Self {
            graph,
            cursor: Rc::new(RefCell::new(Cursor {
                block: root,
                next_index: 0,
                map: None,
                predicted: VecDeque::new(),
                used: Vec::new(),
                gc_enabled: collecting,
                cache_clearing_enabled: collecting,
            })),
            aborted,
        }
    }

    pub fn graph(&self) -> &Rc<DataGraph> {
        &self.graph
    }

    pub fn gc_enabled(&self) -> bool {
        self.cursor.borrow().gc_enabled
    }

    pub fn cache_clearing_enabled(&self) -> bool {
        self.cursor.borrow().cache_clearing_enabled
    }

    pub fn aborted(&self) -> bool {
        self.aborted.get()
    }

    fn fetch<T: 'static>(&self, init: impl FnOnce() -> T) -> (DataSlot<T>, bool) {
        let mut cursor = self.cursor.borrow_mut();
        let index = cursor.next_index;
        cursor.next_index += 1;
        let block = cursor.block.clone();
        drop(cursor);

        let mut inner = block.borrow_mut();
        if index < inner.nodes.len() {
            let node = inner.nodes[index].clone();
            drop(inner);
            let cell = node.downcast::<RefCell<T>>().unwrap_or_else(|_| {
                panic!(
                    "data slot {} holds a different type than the requested {}; \
                     a traversal's control flow must be annotated so every slot \
                     sees the same type on every pass",
                    index,
                    std::any::type_name::<T>()
                )
            });
            (DataSlot { cell }, false)
        } else {
            debug_assert_eq!(index, inner.nodes.len());
            let cell = Rc::new(RefCell::new(init()));
            inner.nodes.push(cell.clone() as Rc<dyn Any>);
            (DataSlot { cell }, true)
        }
    }

    fn find_named_block(&self, id: &Id, manual_delete: bool) -> BlockCell {
        let mut cursor = self.cursor.borrow_mut();
        let map = cursor
            .map
            .clone()
            .expect("named blocks require an active naming scope");

        // Hot path: when the sequence of named blocks matches the last
        // pass, the next reference in the block's list is the one.
        let predicted_matches = cursor
            .predicted
            .front()
            .map_or(false, |front| front.node().id == *id && front.node().belongs_to(&map));
        if predicted_matches {
            let reference = cursor.predicted.pop_front().expect("predicted reference");
            if cursor.gc_enabled {
                reference.activate();
            }
            let block = reference.node().block().clone();
            cursor.used.push(reference);
            return block;
        }

        if !cursor.gc_enabled {
            panic!(
                "named block {id:?} visited out of order while garbage \
                 collection is disabled"
            );
        }

        // Slow path: look the block up in the map, creating it on first use.
        let node = {
            let mut map_inner = map.borrow_mut();
            match map_inner.blocks.get(id) {
                Some(existing) => Rc::clone(existing),
                None => {
                    let node = NamedBlockNode::new(id.clone(), &map, manual_delete);
                    map_inner.blocks.insert(id.clone(), Rc::clone(&node));
                    tracing::trace!(?id, "named block created");
                    node
                }
            }
        };
        let reference = NamedBlockRef::new(Rc::clone(&node));
        reference.activate();
        let block = node.block().clone();
        cursor.used.push(reference);
        block
    }
}

/// Guard that makes `block` the cursor's active block for its lifetime.
///
/// On a normal collecting exit the block's reference list becomes the list
/// of references used in this scope and the stale remainder is released. On
/// an interrupted exit (abort or panic) the remainder is parked on the
/// graph's holding list instead; on non-collecting passes the original list
/// is reassembled in order.
pub(crate) struct ScopedBlock {
    traversal: DataTraversal,
    saved: Option<SavedCursor>,
}

struct SavedCursor {
    block: BlockCell,
    next_index: usize,
    predicted: VecDeque<NamedBlockRef>,
    used: Vec<NamedBlockRef>,
}

impl ScopedBlock {
    pub(crate) fn enter(traversal: &DataTraversal, block: &BlockCell) -> Self {
        let mut cursor = traversal.cursor.borrow_mut();
        let saved = SavedCursor {
            block: std::mem::replace(&mut cursor.block, block.clone()),
            next_index: std::mem::replace(&mut cursor.next_index, 0),
            predicted: std::mem::take(&mut cursor.predicted),
            used: std::mem::take(&mut cursor.used),
        };
        {
            let mut inner = block.borrow_mut();
            cursor.predicted = VecDeque::from(std::mem::take(&mut inner.named_refs));
            inner.cache_clear = false;
        }
        drop(cursor);
        Self {
            traversal: traversal.clone(),
            saved: Some(saved),
        }
    }
}

impl Drop for ScopedBlock {
    fn drop(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        let traversal = &self.traversal;
        let mut cursor = traversal.cursor.borrow_mut();
        let block = std::mem::replace(&mut cursor.block, saved.block);
        cursor.next_index = saved.next_index;
        let predicted = std::mem::replace(&mut cursor.predicted, saved.predicted);
        let used = std::mem::replace(&mut cursor.used, saved.used);
        let collecting = cursor.gc_enabled;
        drop(cursor);

        let interrupted = traversal.aborted.get() || std::thread::panicking();
        let mut inner = block.borrow_mut();
        if collecting && !interrupted {
            inner.named_refs = used;
            drop(inner);
            // References predicted but never used this pass: release them.
            drop(predicted);
        } else if collecting {
            inner.named_refs = used;
            drop(inner);
            traversal.graph.hold_refs(predicted);
        } else {
            // Non-collecting passes consume strictly in order, so used plus
            // the unconsumed remainder is the original list.
            let mut refs = used;
            refs.extend(predicted);
            inner.named_refs = refs;
        }
    }
}

/// Guard restoring the cursor's active naming map.
pub(crate) struct MapScope {
    traversal: DataTraversal,
    previous: Option<Option<MapCell>>,
}

impl MapScope {
    pub(crate) fn enter(traversal: &DataTraversal, map: MapCell) -> Self {
        let previous = std::mem::replace(&mut traversal.cursor.borrow_mut().map, Some(map));
        Self {
            traversal: traversal.clone(),
            previous: Some(previous),
        }
    }
}

impl Drop for MapScope {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.traversal.cursor.borrow_mut().map = previous;
        }
    }
}

/// The node payload that anchors a naming map in the graph.
pub(crate) struct NamingMapSlot {
    pub(crate) map: MapCell,
}

impl Default for NamingMapSlot {
    fn default() -> Self {
        Self {
            map: Rc::new(RefCell::new(NamingMap::default())),
        }
    }
}

/// Guard pair entering the graph root: the root block scope plus the root
/// naming map.
pub(crate) struct RootScope {
    _map: MapScope,
    _block: ScopedBlock,
}

impl RootScope {
    pub(crate) fn enter(traversal: &DataTraversal) -> Self {
        let root = traversal.graph.root().clone();
        let block = ScopedBlock::enter(traversal, &root);
        let (slot, is_new) = traversal.fetch(NamingMapSlot::default);
        let map = slot.borrow().map.clone();
        if is_new {
            traversal.graph.register_map(&map);
        }
        let map_scope = MapScope::enter(traversal, map);
        Self {
            _map: map_scope,
            _block: block,
        }
    }
}

/// Fetch the data node at the current traversal position.
///
/// Returns the slot and whether it was just created. Every call site that
/// runs in the same block in the same order gets the same slot on every
/// pass; a slot observed with two different types is a hard failure.
pub fn get_data<T: Default + 'static>(ctx: &mut Context) -> (DataSlot<T>, bool) {
    get_data_with(ctx, T::default)
}

/// [`get_data`] with an explicit initializer for the first pass.
pub fn get_data_with<T: 'static>(
    ctx: &mut Context,
    init: impl FnOnce() -> T,
) -> (DataSlot<T>, bool) {
    ctx.data().clone().fetch(init)
}

/// Fetch a cached data node: storage the runtime may release whenever the
/// enclosing block falls inactive, on the understanding that the
/// application can regenerate it.
pub fn get_cached_data<T: Default + 'static>(ctx: &mut Context) -> (DataSlot<T>, bool) {
    get_cached_data_with(ctx, T::default)
}

/// [`get_cached_data`] with an explicit initializer.
pub fn get_cached_data_with<T: 'static>(
    ctx: &mut Context,
    init: impl FnOnce() -> T,
) -> (DataSlot<T>, bool) {
    let (holder, _) = get_data::<CacheHolder>(ctx);
    let mut inner = holder.borrow_mut();
    if let Some(existing) = &inner.cell {
        let cell = Rc::clone(existing).downcast::<RefCell<T>>().unwrap_or_else(|_| {
            panic!(
                "cached slot holds a different type than the requested {}",
                std::any::type_name::<T>()
            )
        });
        (DataSlot { cell }, false)
    } else {
        let cell = Rc::new(RefCell::new(init()));
        inner.cell = Some(cell.clone() as Rc<dyn Any>);
        (DataSlot { cell }, true)
    }
}

/// Cached storage invalidated by a change of key.
pub struct KeyedData<T> {
    key: CapturedId,
    value: Option<T>,
}

impl<T> Default for KeyedData<T> {
    fn default() -> Self {
        Self {
            key: CapturedId::default(),
            value: None,
        }
    }
}

/// A duplex signal over a keyed cache cell.
///
/// Its identity is the captured key, so consumers see a change exactly when
/// the key moves on.
pub struct KeyedSignal<T> {
    slot: DataSlot<KeyedData<T>>,
}

impl<T> Clone for KeyedSignal<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: Clone + 'static> Signal for KeyedSignal<T> {
    type Value = T;
    type Dir = Duplex;

    fn has_value(&self) -> bool {
        self.slot.borrow().value.is_some()
    }

    fn value_id(&self) -> Id {
        self.slot
            .borrow()
            .key
            .get()
            .cloned()
            .unwrap_or(Id::Null)
    }

    fn read(&self) -> T {
        self.slot
            .borrow()
            .value
            .clone()
            .expect("keyed data read before it was computed")
    }

    fn ready_to_write(&self) -> bool {
        true
    }

    fn write(&self, value: T) -> WriteResult {
        self.slot.borrow_mut().value = Some(value);
        Ok(())
    }
}

/// Fetch keyed cached data. When the presented key differs from the
/// captured one, the cell is invalidated and the key re-captured.
///
/// Returns the signal and whether the value must be recomputed.
pub fn get_keyed_data<T: Clone + 'static>(
    ctx: &mut Context,
    key: &Id,
) -> (KeyedSignal<T>, bool) {
    let (slot, _) = get_cached_data::<KeyedData<T>>(ctx);
    let needs_update = {
        let mut data = slot.borrow_mut();
        if !data.key.matches(key) {
            data.value = None;
            data.key.capture(key);
        }
        data.value.is_none()
    };
    (KeyedSignal { slot }, needs_update)
}

/// A handle to a naming map, used to open named blocks within it.
pub type NamingHandle = MapCell;

/// Open a naming scope: named blocks inside `body` resolve their identities
/// against this scope's map. Identities are scoped to the map, so different
/// naming scopes can reuse the same identities without conflict.
pub fn with_naming<'a, R>(
    ctx: &mut Context<'a>,
    body: impl FnOnce(&mut Context<'a>, NamingHandle) -> R,
) -> R {
    let (slot, is_new) = get_data::<NamingMapSlot>(ctx);
    let map = slot.borrow().map.clone();
    if is_new {
        ctx.data().graph().register_map(&map);
    }
    let traversal = ctx.data().clone();
    let _scope = MapScope::enter(&traversal, map.clone());
    body(ctx, map)
}

/// Run `body` inside the data block named `id` within the active naming
/// scope. The block keeps its state wherever the name moves between passes.
pub fn named_block<'a, R>(
    ctx: &mut Context<'a>,
    id: Id,
    body: impl FnOnce(&mut Context<'a>) -> R,
) -> R {
    named_scope(ctx, id, false, body)
}

/// [`named_block`], but the block survives losing all references (with its
/// caches cleared) until deleted explicitly or its map is destroyed.
pub fn named_block_manual<'a, R>(
    ctx: &mut Context<'a>,
    id: Id,
    body: impl FnOnce(&mut Context<'a>) -> R,
) -> R {
    named_scope(ctx, id, true, body)
}

fn named_scope<'a, R>(
    ctx: &mut Context<'a>,
    id: Id,
    manual_delete: bool,
    body: impl FnOnce(&mut Context<'a>) -> R,
) -> R {
    let traversal = ctx.data().clone();
    let block = traversal.find_named_block(&id, manual_delete);
    let _scope = ScopedBlock::enter(&traversal, &block);
    body(ctx)
}

/// Disable garbage collection for the remainder of this traversal.
///
/// Used when the pass will not visit the entire active graph. Named blocks
/// must then be visited in the same order as the last collecting pass
/// (though the sequence may stop early); violations are a hard failure.
pub fn disable_gc(ctx: &mut Context) {
    let traversal = ctx.data();
    traversal.cursor.borrow_mut().gc_enabled = false;
}

/// Suspend cache clearing for inactive blocks within `body`.
pub fn with_cache_clearing_disabled<'a, R>(
    ctx: &mut Context<'a>,
    body: impl FnOnce(&mut Context<'a>) -> R,
) -> R {
    struct ClearingScope {
        traversal: DataTraversal,
        previous: bool,
    }
    impl Drop for ClearingScope {
        fn drop(&mut self) {
            self.traversal.cursor.borrow_mut().cache_clearing_enabled = self.previous;
        }
    }

    let traversal = ctx.data().clone();
    let previous = {
        let mut cursor = traversal.cursor.borrow_mut();
        std::mem::replace(&mut cursor.cache_clearing_enabled, false)
    };
    let _scope = ClearingScope {
        traversal,
        previous,
    };
    body(ctx)
}

/// Clear the cached data of `block` if cache clearing is active.
pub(crate) fn clear_block_if_enabled(traversal: &DataTraversal, block: &BlockCell) {
    if traversal.cache_clearing_enabled() && !traversal.aborted() {
        clear_cached_data(block);
    }
}

/// Enter `block` for the duration of `body`.
pub(crate) fn enter_block<'a, R>(
    ctx: &mut Context<'a>,
    block: &BlockCell,
    body: impl FnOnce(&mut Context<'a>) -> R,
) -> R {
    let traversal = ctx.data().clone();
    let _scope = ScopedBlock::enter(&traversal, block);
    body(ctx)
}
