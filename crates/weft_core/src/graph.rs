//! The data graph
//!
//! Persistent storage keyed by the control-flow path of a traversal. The
//! graph only knows about the nodes an application actually visits: data
//! slots are created lazily as the traversal first reaches them, and the
//! annotated branch points (blocks) give every slot a stable position across
//! passes.
//!
//! Two storage regimes coexist:
//!
//! - **Positional**: data nodes inside a [`DataBlock`], addressed by visit
//!   order. Stable as long as the traversal's control-flow skeleton is.
//! - **Named**: blocks addressed by value identity inside a [`NamingMap`],
//!   free to reorder between passes. Named blocks are reference-counted by
//!   the block slots that mention them and garbage-collected when a
//!   complete refresh no longer reaches them.
//!
//! Cached (recomputable) data is cleared whenever its enclosing block falls
//! inactive; persistent data lives as long as its block.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use weft_identity::Id;

/// A type-erased data node: concretely an `Rc<RefCell<T>>`.
pub(crate) type NodeCell = Rc<dyn Any>;

/// A shared handle to a data block.
pub type BlockCell = Rc<RefCell<DataBlock>>;

/// A shared handle to a naming map.
pub type MapCell = Rc<RefCell<NamingMap>>;

/// An ordered store of data nodes plus the named-block references that
/// appeared under it during the last collecting pass.
pub struct DataBlock {
    pub(crate) nodes: Vec<NodeCell>,
    /// True once the block's recomputable caches have been released.
    pub(crate) cache_clear: bool,
    pub(crate) named_refs: Vec<NamedBlockRef>,
}

impl Default for DataBlock {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            cache_clear: true,
            named_refs: Vec::new(),
        }
    }
}

/// The node payload holding one cached (recomputable) cell.
///
/// Kept behind its own wrapper so cache clearing can recognize these nodes
/// when it walks a block.
#[derive(Default)]
pub(crate) struct CacheHolder {
    pub(crate) cell: Option<Rc<dyn Any>>,
}

/// Release all cached data within `block`, recursing into child blocks and
/// deactivating the block's named-block references. Idempotent.
pub fn clear_cached_data(block: &BlockCell) {
    {
        let mut inner = block.borrow_mut();
        if inner.cache_clear {
            return;
        }
        inner.cache_clear = true;
    }
    let inner = block.borrow();
    for node in &inner.nodes {
        if let Some(holder) = node.downcast_ref::<RefCell<CacheHolder>>() {
            holder.borrow_mut().cell = None;
        } else if let Ok(child) = Rc::clone(node).downcast::<RefCell<DataBlock>>() {
            clear_cached_data(&child);
        }
    }
    for reference in &inner.named_refs {
        reference.deactivate();
    }
}

/// Destroy all data within `block`: nodes, child blocks, and named-block
/// references (releasing their share of the named blocks).
pub fn clear_data_block(block: &BlockCell) {
    let (nodes, refs) = {
        let mut inner = block.borrow_mut();
        inner.cache_clear = true;
        (
            std::mem::take(&mut inner.nodes),
            std::mem::take(&mut inner.named_refs),
        )
    };
    // Dropped outside the borrow: tearing down child blocks runs nested
    // reference destructors that may touch naming maps.
    drop(nodes);
    drop(refs);
}

/// A data block addressed by identity within a naming map.
pub struct NamedBlockNode {
    block: BlockCell,
    pub(crate) id: Id,
    /// How many block slots currently hold a reference to this block.
    reference_count: Cell<u32>,
    /// How many of those references are active this pass.
    active_count: Cell<u32>,
    /// Manually-owned blocks survive a zero reference count with caches
    /// cleared; they die only through [`delete_named_block`] or with their
    /// map.
    manual_delete: Cell<bool>,
    map: RefCell<Weak<RefCell<NamingMap>>>,
}

impl NamedBlockNode {
    pub(crate) fn new(id: Id, map: &MapCell, manual_delete: bool) -> Rc<Self> {
        Rc::new(Self {
            block: Rc::new(RefCell::new(DataBlock::default())),
            id,
            reference_count: Cell::new(0),
            active_count: Cell::new(0),
            manual_delete: Cell::new(manual_delete),
            map: RefCell::new(Rc::downgrade(map)),
        })
    }

    pub(crate) fn block(&self) -> &BlockCell {
        &self.block
    }

    pub(crate) fn belongs_to(&self, map: &MapCell) -> bool {
        self.map
            .borrow()
            .upgrade()
            .map_or(false, |owner| Rc::ptr_eq(&owner, map))
    }

    #[cfg(test)]
    pub(crate) fn reference_count(&self) -> u32 {
        self.reference_count.get()
    }
}

/// One block slot's share of a named block.
///
/// Dropping the last reference destroys the block (or, for manually-owned
/// blocks, clears its caches and leaves it in the map). Teardown order is
/// deterministic: deactivate, then release the count, then unlink.
pub struct NamedBlockRef {
    node: Rc<NamedBlockNode>,
    active: Cell<bool>,
}

impl NamedBlockRef {
    pub(crate) fn new(node: Rc<NamedBlockNode>) -> Self {
        node.reference_count.set(node.reference_count.get() + 1);
        Self {
            node,
            active: Cell::new(false),
        }
    }

    pub(crate) fn node(&self) -> &Rc<NamedBlockNode> {
        &self.node
    }

    /// Count this reference toward the block's active uses.
    pub(crate) fn activate(&self) {
        if !self.active.get() {
            self.node.active_count.set(self.node.active_count.get() + 1);
            self.active.set(true);
        }
    }

    /// Withdraw this reference's active use; the last withdrawal clears the
    /// block's recomputable caches (persistent state survives).
    pub(crate) fn deactivate(&self) {
        if self.active.get() {
            let remaining = self.node.active_count.get() - 1;
            self.node.active_count.set(remaining);
            if remaining == 0 {
                clear_cached_data(&self.node.block);
            }
            self.active.set(false);
        }
    }
}

impl Drop for NamedBlockRef {
    fn drop(&mut self) {
        self.deactivate();
        let remaining = self.node.reference_count.get() - 1;
        self.node.reference_count.set(remaining);
        if remaining == 0 {
            let map = self.node.map.borrow().upgrade();
            if let Some(map) = map {
                if self.node.manual_delete.get() {
                    clear_cached_data(&self.node.block);
                } else {
                    let removed = map.borrow_mut().blocks.remove(&self.node.id);
                    // The node's storage goes away with our own handle, after
                    // the map borrow above has been released.
                    drop(removed);
                    tracing::trace!(id = ?self.node.id, "named block collected");
                }
            }
        }
    }
}

/// A mapping from identity to named block.
///
/// Identities used within one map can be reused within another without
/// conflict. The map holds its blocks strongly; destruction of unreferenced
/// blocks goes through explicit reference counting, not `Rc` liveness.
#[derive(Default)]
pub struct NamingMap {
    pub(crate) blocks: BTreeMap<Id, Rc<NamedBlockNode>>,
}

/// The root of one controller's persistent storage.
pub struct DataGraph {
    root: BlockCell,
    maps: RefCell<Vec<Weak<RefCell<NamingMap>>>>,
    /// Named-block references that disappeared from an interrupted pass.
    /// They keep their blocks alive until the next complete refresh can
    /// re-reference them, then get released.
    pending_refs: RefCell<Vec<NamedBlockRef>>,
    node_ids: Cell<u64>,
}

impl Default for DataGraph {
    fn default() -> Self {
        Self {
            root: Rc::new(RefCell::new(DataBlock::default())),
            maps: RefCell::new(Vec::new()),
            pending_refs: RefCell::new(Vec::new()),
            node_ids: Cell::new(0),
        }
    }
}

impl DataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn root(&self) -> &BlockCell {
        &self.root
    }

    pub(crate) fn register_map(&self, map: &MapCell) {
        self.maps.borrow_mut().push(Rc::downgrade(map));
    }

    pub(crate) fn hold_refs(&self, refs: impl IntoIterator<Item = NamedBlockRef>) {
        self.pending_refs.borrow_mut().extend(refs);
    }

    /// Release references parked by interrupted passes and prune dead map
    /// registrations. Called after a refresh runs to completion.
    pub(crate) fn collect_pending(&self) {
        let held = std::mem::take(&mut *self.pending_refs.borrow_mut());
        if !held.is_empty() {
            tracing::debug!(count = held.len(), "releasing held named-block references");
        }
        drop(held);
        self.maps.borrow_mut().retain(|map| map.strong_count() > 0);
    }

    pub(crate) fn next_node_id(&self) -> u64 {
        let id = self.node_ids.get() + 1;
        self.node_ids.set(id);
        id
    }
}

/// Delete the named block registered under `id`, in every map of the graph.
///
/// A block still referenced by the graph merely loses its manual-delete
/// protection (so normal collection can reap it); an unreferenced block is
/// destroyed outright.
pub fn delete_named_block(graph: &DataGraph, id: &Id) {
    let maps: Vec<MapCell> = graph
        .maps
        .borrow()
        .iter()
        .filter_map(Weak::upgrade)
        .collect();
    for map in maps {
        let node = map.borrow().blocks.get(id).cloned();
        if let Some(node) = node {
            if node.reference_count.get() != 0 {
                node.manual_delete.set(false);
            } else {
                let removed = map.borrow_mut().blocks.remove(id);
                drop(removed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_node(map: &MapCell, id: i32) -> Rc<NamedBlockNode> {
        let node = NamedBlockNode::new(Id::of(id), map, false);
        map.borrow_mut()
            .blocks
            .insert(Id::of(id), Rc::clone(&node));
        node
    }

    #[test]
    fn test_reference_counting_destroys_unreferenced_blocks() {
        let map: MapCell = Rc::new(RefCell::new(NamingMap::default()));
        let node = named_node(&map, 1);

        let first = NamedBlockRef::new(Rc::clone(&node));
        let second = NamedBlockRef::new(Rc::clone(&node));
        assert_eq!(node.reference_count(), 2);

        drop(first);
        assert_eq!(node.reference_count(), 1);
        assert!(map.borrow().blocks.contains_key(&Id::of(1)));

        drop(second);
        assert!(!map.borrow().blocks.contains_key(&Id::of(1)));
    }

    #[test]
    fn test_manual_delete_survives_with_cleared_caches() {
        let map: MapCell = Rc::new(RefCell::new(NamingMap::default()));
        let node = NamedBlockNode::new(Id::of(7), &map, true);
        map.borrow_mut().blocks.insert(Id::of(7), Rc::clone(&node));

        node.block().borrow_mut().cache_clear = false;
        drop(NamedBlockRef::new(Rc::clone(&node)));

        assert!(map.borrow().blocks.contains_key(&Id::of(7)));
        assert!(node.block().borrow().cache_clear);
    }

    #[test]
    fn test_deactivation_clears_caches_at_zero() {
        let map: MapCell = Rc::new(RefCell::new(NamingMap::default()));
        let node = named_node(&map, 3);
        node.block().borrow_mut().cache_clear = false;

        let a = NamedBlockRef::new(Rc::clone(&node));
        let b = NamedBlockRef::new(Rc::clone(&node));
        a.activate();
        b.activate();

        a.deactivate();
        assert!(!node.block().borrow().cache_clear);
        b.deactivate();
        assert!(node.block().borrow().cache_clear);
    }

    #[test]
    fn test_delete_named_block() {
        let graph = DataGraph::new();
        let map: MapCell = Rc::new(RefCell::new(NamingMap::default()));
        graph.register_map(&map);

        // Unreferenced: destroyed outright.
        let _ = named_node(&map, 1);
        delete_named_block(&graph, &Id::of(1));
        assert!(!map.borrow().blocks.contains_key(&Id::of(1)));

        // Referenced: only loses manual-delete protection.
        let node = NamedBlockNode::new(Id::of(2), &map, true);
        map.borrow_mut().blocks.insert(Id::of(2), Rc::clone(&node));
        let reference = NamedBlockRef::new(Rc::clone(&node));
        delete_named_block(&graph, &Id::of(2));
        assert!(map.borrow().blocks.contains_key(&Id::of(2)));
        // Now that manual-delete is gone, the last reference reaps it.
        drop(reference);
        assert!(!map.borrow().blocks.contains_key(&Id::of(2)));
    }

    #[test]
    fn test_clear_data_block_resets_everything() {
        let block: BlockCell = Rc::new(RefCell::new(DataBlock::default()));
        block
            .borrow_mut()
            .nodes
            .push(Rc::new(RefCell::new(5i32)) as NodeCell);
        block.borrow_mut().cache_clear = false;

        clear_data_block(&block);
        assert!(block.borrow().nodes.is_empty());
        assert!(block.borrow().cache_clear);
    }
}
