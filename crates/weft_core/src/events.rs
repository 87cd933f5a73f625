//! Event dispatch and routing
//!
//! Events are delivered by re-running the controller. Handlers opt in by
//! event type; targeted events additionally carry a node identity and are
//! routed along a precomputed path of routing regions, pruning every
//! sibling subtree on the way.
//!
//! Aborting a traversal is cooperative: a shared flag that region guards,
//! handlers, and the data traversal's collector all observe. Handlers that
//! have already run keep their effects; nothing after the abort executes.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::context::{Context, DatalessContext};
use crate::cursor::{get_cached_data, get_data};

/// A node in the per-traversal routing tree.
#[derive(Default)]
pub struct RoutingRegion {
    pub(crate) parent: RefCell<Option<Rc<RoutingRegion>>>,
}

pub(crate) struct EventState {
    active_region: Option<Rc<RoutingRegion>>,
    /// Root-first path to the target region of a targeted dispatch.
    path: Vec<Rc<RoutingRegion>>,
    path_pos: usize,
}

/// The state of one event dispatch.
pub struct EventTraversal {
    event_type: TypeId,
    payload: RefCell<Option<Box<dyn Any>>>,
    targeted: bool,
    state: RefCell<EventState>,
    aborted: Rc<Cell<bool>>,
}

impl EventTraversal {
    pub(crate) fn new(
        event_type: TypeId,
        payload: Box<dyn Any>,
        targeted: bool,
        path: Vec<Rc<RoutingRegion>>,
        aborted: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            event_type,
            payload: RefCell::new(Some(payload)),
            targeted,
            state: RefCell::new(EventState {
                active_region: None,
                path,
                path_pos: 0,
            }),
            aborted,
        }
    }

    pub(crate) fn into_payload(self) -> Box<dyn Any> {
        self.payload
            .into_inner()
            .expect("event payload present after dispatch")
    }

    /// Is the event being dispatched of type `E`?
    pub fn is<E: 'static>(&self) -> bool {
        self.event_type == TypeId::of::<E>()
    }

    /// Is this a targeted dispatch?
    pub fn targeted(&self) -> bool {
        self.targeted
    }

    /// Has the traversal been aborted?
    pub fn aborted(&self) -> bool {
        self.aborted.get()
    }

    pub(crate) fn request_abort(&self) {
        self.aborted.set(true);
    }

    /// The innermost routing region currently open.
    pub fn active_region(&self) -> Option<Rc<RoutingRegion>> {
        self.state.borrow().active_region.clone()
    }
}

/// The event type driving refresh passes.
pub struct RefreshEvent;

/// Is the current event a refresh?
pub fn is_refresh_event(ctx: &DatalessContext) -> bool {
    ctx.event().is::<RefreshEvent>()
}

/// Invoke `body` only during a refresh pass.
pub fn on_refresh<'a>(ctx: &mut Context<'a>, body: impl FnOnce(&mut DatalessContext<'a>)) {
    let event = ctx.event();
    if event.is::<RefreshEvent>() && !event.aborted() {
        body(ctx);
    }
}

/// Invoke `body` with the event payload if the current event is an `E`.
pub fn on_event<'a, E: 'static>(
    ctx: &mut Context<'a>,
    body: impl FnOnce(&mut DatalessContext<'a>, &mut E),
) {
    let event = ctx.event();
    if event.aborted() || !event.is::<E>() {
        return;
    }
    // Take the payload out for the duration of the handler; a nested
    // handler on the same traversal then simply sees no event.
    let Some(mut payload) = event.payload.borrow_mut().take() else {
        return;
    };
    {
        let typed = payload
            .downcast_mut::<E>()
            .expect("event payload matches its type discriminator");
        body(ctx, typed);
    }
    *event.payload.borrow_mut() = Some(payload);
}

/// The identity of one logical node, minted from the data graph.
///
/// Backed by cached data: a node that falls out of the active graph and
/// returns later gets a fresh identity, so stale targets can't alias it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub const NONE: NodeId = NodeId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

#[derive(Default)]
struct NodeIdentity {
    id: u64,
}

/// The identity of the node at the current traversal position.
pub fn get_node_id(ctx: &mut Context) -> NodeId {
    let graph = ctx.data().graph().clone();
    let (slot, _) = get_cached_data::<NodeIdentity>(ctx);
    let mut identity = slot.borrow_mut();
    if identity.id == 0 {
        identity.id = graph.next_node_id();
    }
    NodeId(identity.id)
}

/// A node identity packaged with enough routing information to deliver an
/// event to it.
#[derive(Clone, Default)]
pub struct RoutableNodeId {
    pub id: NodeId,
    pub region: Option<Rc<RoutingRegion>>,
}

impl RoutableNodeId {
    pub fn null() -> Self {
        Self {
            id: NodeId::NONE,
            region: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }
}

/// Package the node identity with the active routing region.
pub fn make_routable_node_id(ctx: &mut Context, id: NodeId) -> RoutableNodeId {
    RoutableNodeId {
        id,
        region: ctx.event().active_region(),
    }
}

/// Events that can be delivered to a single node.
pub trait TargetedEvent: 'static {
    fn target(&self) -> NodeId;
    fn set_target(&mut self, target: NodeId);
}

/// Invoke `body` if the current event is an `E` targeted at `node`, then
/// abort the traversal (the event has found its destination).
pub fn on_targeted_event<'a, E: TargetedEvent>(
    ctx: &mut Context<'a>,
    node: NodeId,
    body: impl FnOnce(&mut DatalessContext<'a>, &mut E),
) {
    let event = ctx.event();
    if event.aborted() || !event.is::<E>() {
        return;
    }
    let Some(mut payload) = event.payload.borrow_mut().take() else {
        return;
    };
    let mut fired = false;
    {
        let typed = payload
            .downcast_mut::<E>()
            .expect("event payload matches its type discriminator");
        if typed.target() == node {
            body(ctx, typed);
            fired = true;
        }
    }
    *event.payload.borrow_mut() = Some(payload);
    if fired {
        abort_traversal(ctx);
    }
}

/// Unwind the rest of this traversal.
///
/// Handlers and region guards downstream observe the flag and skip. The
/// data traversal shares the flag: its scope guards stop collecting, so
/// in-flight named-block references are parked for the next complete
/// refresh instead of being reaped.
pub fn abort_traversal(ctx: &mut DatalessContext) {
    tracing::trace!("traversal aborted");
    ctx.event().request_abort();
}

#[derive(Default)]
struct RegionSlot {
    region: Option<Rc<RoutingRegion>>,
}

struct RegionScope<'a> {
    event: &'a EventTraversal,
    parent: Option<Rc<RoutingRegion>>,
}

impl Drop for RegionScope<'_> {
    fn drop(&mut self) {
        self.event.state.borrow_mut().active_region = self.parent.take();
    }
}

/// Open a routing region around `body`.
///
/// The `relevant` flag passed to the body says whether this region's
/// children should execute: always true for untargeted dispatch, and true
/// for targeted dispatch only while the region lies on the path to the
/// target. Callers skip the subtree when it is false.
///
/// The body runs inside the region's own data block, so a pruned region's
/// skipped data requests cannot shift the slots of its siblings.
pub fn region<'a, R>(
    ctx: &mut Context<'a>,
    body: impl FnOnce(&mut Context<'a>, bool) -> R,
) -> R {
    let (slot, _) = get_data::<RegionSlot>(ctx);
    let current = {
        let mut inner = slot.borrow_mut();
        inner
            .region
            .get_or_insert_with(|| Rc::new(RoutingRegion::default()))
            .clone()
    };
    let (block, _) = get_data::<crate::graph::DataBlock>(ctx);

    let event = ctx.event();
    let (parent, relevant) = {
        let mut state = event.state.borrow_mut();
        let parent = std::mem::replace(&mut state.active_region, Some(current.clone()));
        let relevant = if event.targeted() {
            let on_path = state.path_pos < state.path.len()
                && Rc::ptr_eq(&state.path[state.path_pos], &current);
            if on_path {
                state.path_pos += 1;
            }
            on_path
        } else {
            true
        };
        (parent, relevant)
    };
    *current.parent.borrow_mut() = parent.clone();

    let _scope = RegionScope { event, parent };
    let relevant = relevant && !event.aborted();
    crate::cursor::enter_block(ctx, block.cell(), |ctx| body(ctx, relevant))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_type_discrimination() {
        struct Click;
        let traversal = EventTraversal::new(
            TypeId::of::<Click>(),
            Box::new(Click),
            false,
            Vec::new(),
            Rc::new(Cell::new(false)),
        );
        assert!(traversal.is::<Click>());
        assert!(!traversal.is::<RefreshEvent>());
        assert!(!traversal.targeted());
        assert!(!traversal.aborted());
    }

    #[test]
    fn test_node_id_validity() {
        assert!(!NodeId::NONE.is_valid());
        assert!(!RoutableNodeId::null().is_valid());
    }
}
