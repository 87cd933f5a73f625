//! The system and its event pump
//!
//! A [`System`] owns a data graph, the application's controller function,
//! the refresh-needed flag, and an optional external interface. Dispatching
//! an event re-runs the controller under a fresh traversal of the graph;
//! only refresh passes enable garbage collection and cache clearing.
//!
//! The system is a cheap-clone handle, single-threaded by construction.
//! Dispatch is re-entrant in principle: a handler may dispatch further
//! events through the same system, but nested refreshes should be
//! coalesced through the refresh-needed flag rather than issued eagerly.

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::context::{Context, Environment};
use crate::cursor::{DataTraversal, RootScope};
use crate::events::{EventTraversal, RefreshEvent, RoutableNodeId, RoutingRegion, TargetedEvent};
use crate::graph::DataGraph;
use crate::timing::{default_tick_count, Millis, Timing};

/// Host hooks the runtime calls out through.
pub trait ExternalInterface {
    /// Called once per batch when an animation needs another frame.
    fn request_animation_refresh(&self) {}

    /// The current monotonic millisecond counter. Free to wrap.
    fn tick_count(&self) -> Millis {
        default_tick_count()
    }
}

type Controller = Rc<dyn for<'a> Fn(&mut Context<'a>)>;

struct SystemInner {
    graph: Rc<DataGraph>,
    controller: RefCell<Option<Controller>>,
    refresh_needed: Cell<bool>,
    external: RefCell<Option<Rc<dyn ExternalInterface>>>,
}

/// A handle to one running weft system.
#[derive(Clone)]
pub struct System {
    inner: Rc<SystemInner>,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SystemInner {
                graph: Rc::new(DataGraph::new()),
                controller: RefCell::new(None),
                refresh_needed: Cell::new(false),
                external: RefCell::new(None),
            }),
        }
    }

    /// Create a system with its controller in place.
    pub fn with_controller<F>(controller: F) -> Self
    where
        F: for<'a> Fn(&mut Context<'a>) + 'static,
    {
        let system = Self::new();
        system.set_controller(controller);
        system
    }

    /// Install the controller: the traversal function invoked once per
    /// event. It must be deterministic with respect to its control-flow
    /// annotations; side effects belong in actions.
    pub fn set_controller<F>(&self, controller: F)
    where
        F: for<'a> Fn(&mut Context<'a>) + 'static,
    {
        *self.inner.controller.borrow_mut() = Some(Rc::new(controller));
    }

    /// Install the host's external interface.
    pub fn set_external<E: ExternalInterface + 'static>(&self, external: E) {
        *self.inner.external.borrow_mut() = Some(Rc::new(external));
    }

    pub(crate) fn graph(&self) -> &Rc<DataGraph> {
        &self.inner.graph
    }

    /// Has an animation refresh been requested since the last refresh?
    pub fn needs_refresh(&self) -> bool {
        self.inner.refresh_needed.get()
    }

    pub(crate) fn request_animation_refresh(&self) {
        if !self.inner.refresh_needed.get() {
            if let Some(external) = &*self.inner.external.borrow() {
                external.request_animation_refresh();
            }
            self.inner.refresh_needed.set(true);
        }
    }

    pub(crate) fn tick_count(&self) -> Millis {
        match &*self.inner.external.borrow() {
            Some(external) => external.tick_count(),
            None => default_tick_count(),
        }
    }

    /// Run a refresh pass: the one event type with garbage collection and
    /// cache clearing enabled.
    pub fn refresh(&self) {
        self.inner.refresh_needed.set(false);
        let (_, completed) = self.route(RefreshEvent, false, None);
        if completed {
            // Only a refresh that ran to completion proves which named
            // blocks are still referenced.
            self.inner.graph.collect_pending();
        }
    }

    /// Dispatch an event to every region of the scene, then refresh so
    /// whatever the handlers changed propagates.
    ///
    /// The event is returned so callers can read results out of it.
    pub fn dispatch_event<E: 'static>(&self, event: E) -> E {
        let (event, _) = self.route(event, false, None);
        self.refresh();
        event
    }

    /// Dispatch an event to the single node identified by `target`,
    /// pruning every region not on the path to it, then refresh.
    pub fn dispatch_targeted_event<E: TargetedEvent>(
        &self,
        mut event: E,
        target: &RoutableNodeId,
    ) -> E {
        event.set_target(target.id);
        let (event, _) = self.route(event, true, target.region.clone());
        self.refresh();
        event
    }

    fn route<E: 'static>(
        &self,
        event: E,
        targeted: bool,
        region: Option<Rc<RoutingRegion>>,
    ) -> (E, bool) {
        // The path to the target: walk the parent chain, then flip it so
        // the traversal can consume it root-first.
        let mut path = Vec::new();
        let mut walk = region;
        while let Some(current) = walk {
            walk = current.parent.borrow().clone();
            path.push(current);
        }
        path.reverse();

        let aborted = Rc::new(Cell::new(false));
        let traversal = EventTraversal::new(
            TypeId::of::<E>(),
            Box::new(event),
            targeted,
            path,
            Rc::clone(&aborted),
        );
        self.invoke_controller(&traversal, Rc::clone(&aborted));
        let completed = !aborted.get();
        let event = *traversal
            .into_payload()
            .downcast::<E>()
            .expect("dispatch returns the payload it was given");
        (event, completed)
    }

    fn invoke_controller(&self, events: &EventTraversal, aborted: Rc<Cell<bool>>) {
        let controller = self.inner.controller.borrow().clone();
        let Some(controller) = controller else {
            return;
        };
        // Only refresh passes decide when data is no longer needed.
        let collecting = events.is::<RefreshEvent>();
        tracing::trace!(
            refresh = collecting,
            targeted = events.targeted(),
            "invoking controller"
        );
        let data = DataTraversal::new(Rc::clone(&self.inner.graph), aborted, collecting);
        let _root = RootScope::enter(&data);
        let timing = Timing {
            tick: self.tick_count(),
        };
        let mut ctx = Context::new(
            self.clone(),
            events,
            data.clone(),
            timing,
            Environment::default(),
        );
        controller(&mut ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_refresh_runs_controller() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let system = System::with_controller(move |_ctx| {
            counter.set(counter.get() + 1);
        });

        system.refresh();
        assert_eq!(runs.get(), 1);

        // Dispatching any event also refreshes afterward.
        struct Ping;
        system.dispatch_event(Ping);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn test_animation_refresh_batches() {
        struct CountingHooks {
            calls: Rc<Cell<u32>>,
        }
        impl ExternalInterface for CountingHooks {
            fn request_animation_refresh(&self) {
                self.calls.set(self.calls.get() + 1);
            }
        }

        let calls = Rc::new(Cell::new(0));
        let system = System::new();
        system.set_external(CountingHooks {
            calls: Rc::clone(&calls),
        });

        assert!(!system.needs_refresh());
        system.request_animation_refresh();
        system.request_animation_refresh();
        system.request_animation_refresh();
        assert!(system.needs_refresh());
        // One hook call per batch, no matter how many requests.
        assert_eq!(calls.get(), 1);

        system.refresh();
        assert!(!system.needs_refresh());
        system.request_animation_refresh();
        assert_eq!(calls.get(), 2);
    }
}
