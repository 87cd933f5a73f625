//! The traversal context
//!
//! A context is the bag of components threaded through every call in a
//! traversal. The hot components (system handle, event traversal, data
//! traversal, timing) are direct fields; everything else lives in an
//! [`Environment`] chain keyed by type.
//!
//! [`Context`] derefs to [`DatalessContext`], which is the same storage
//! minus the data traversal: converting to the smaller component set is a
//! pointer copy, and code that must not touch the data graph (event
//! handlers running outside the tracked control flow) takes the dataless
//! form so the type system enforces it.

use std::any::{Any, TypeId};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::cursor::DataTraversal;
use crate::error::CoreError;
use crate::events::EventTraversal;
use crate::system::System;
use crate::timing::Timing;

/// An immutable chain of host-provided components, keyed by type.
///
/// Extending the environment builds a new frame pointing at the old chain,
/// so extension is scoped naturally: inner code sees the added component,
/// outer code never does.
#[derive(Clone, Default)]
pub struct Environment {
    frame: Option<Rc<EnvFrame>>,
}

struct EnvFrame {
    slots: FxHashMap<TypeId, Rc<dyn Any>>,
    parent: Option<Rc<EnvFrame>>,
}

impl Environment {
    fn extended<T: 'static>(&self, component: Rc<T>) -> Environment {
        let mut slots: FxHashMap<TypeId, Rc<dyn Any>> = FxHashMap::default();
        slots.insert(TypeId::of::<T>(), component as Rc<dyn Any>);
        Environment {
            frame: Some(Rc::new(EnvFrame {
                slots,
                parent: self.frame.clone(),
            })),
        }
    }

    fn lookup<T: 'static>(&self) -> Option<Rc<T>> {
        let mut frame = self.frame.as_ref();
        while let Some(current) = frame {
            if let Some(slot) = current.slots.get(&TypeId::of::<T>()) {
                let component = Rc::clone(slot)
                    .downcast::<T>()
                    .expect("environment slot type matches its key");
                return Some(component);
            }
            frame = current.parent.as_ref();
        }
        None
    }
}

/// The context components available to all event handling, without data
/// graph access.
pub struct DatalessContext<'a> {
    pub(crate) sys: System,
    pub(crate) event: &'a EventTraversal,
    pub(crate) timing: Timing,
    pub(crate) env: Environment,
}

impl<'a> DatalessContext<'a> {
    /// The system driving this traversal.
    pub fn system(&self) -> &System {
        &self.sys
    }

    /// The event being dispatched.
    pub fn event(&self) -> &'a EventTraversal {
        self.event
    }

    /// The timing component for this traversal.
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Fetch a host-provided component, failing if no enclosing scope
    /// provided one. This is the dynamically-checked access path; hosts
    /// that want static checking wrap the context in their own type and
    /// carry the component as a field.
    pub fn component<T: 'static>(&self) -> Result<Rc<T>, CoreError> {
        self.env
            .lookup::<T>()
            .ok_or(CoreError::ComponentNotFound(std::any::type_name::<T>()))
    }

    /// Is a host-provided component of this type available?
    pub fn has_component<T: 'static>(&self) -> bool {
        self.env.lookup::<T>().is_some()
    }
}

/// The full traversal context: everything in [`DatalessContext`] plus the
/// data traversal.
pub struct Context<'a> {
    base: DatalessContext<'a>,
    data: DataTraversal,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        sys: System,
        event: &'a EventTraversal,
        data: DataTraversal,
        timing: Timing,
        env: Environment,
    ) -> Self {
        Self {
            base: DatalessContext {
                sys,
                event,
                timing,
                env,
            },
            data,
        }
    }

    /// The data traversal threading this context.
    pub fn data(&self) -> &DataTraversal {
        &self.data
    }
}

impl<'a> Deref for Context<'a> {
    type Target = DatalessContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for Context<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

/// Run `body` with `component` added to the context's environment.
///
/// The extension is scoped: code outside `body` never observes it.
pub fn with_component<'a, T: 'static, R>(
    ctx: &mut Context<'a>,
    component: Rc<T>,
    body: impl FnOnce(&mut Context<'a>) -> R,
) -> R {
    let mut child = Context {
        base: DatalessContext {
            sys: ctx.base.sys.clone(),
            event: ctx.base.event,
            timing: ctx.base.timing,
            env: ctx.base.env.extended(component),
        },
        data: ctx.data.clone(),
    };
    body(&mut child)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_chain() {
        let root = Environment::default();
        assert!(root.lookup::<i32>().is_none());

        let extended = root.extended(Rc::new(5i32));
        assert_eq!(*extended.lookup::<i32>().unwrap(), 5);
        assert!(extended.lookup::<String>().is_none());

        // Shadowing: the inner frame wins, the outer chain is untouched.
        let shadowed = extended.extended(Rc::new(6i32));
        assert_eq!(*shadowed.lookup::<i32>().unwrap(), 6);
        assert_eq!(*extended.lookup::<i32>().unwrap(), 5);
    }
}
