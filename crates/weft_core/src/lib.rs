//! Weft core runtime
//!
//! The runtime half of weft: a declarative immediate-mode engine that runs
//! an application's traversal function once per event and transparently
//! attaches persistent state, cached values, and event delivery to each
//! logical node the traversal visits.
//!
//! - **Data graph**: per-path storage built lazily from the traversal's
//!   annotated control flow, with identity-addressed named blocks and
//!   garbage collection of whatever a refresh no longer reaches
//! - **Context**: the statically-typed component bag threaded through every
//!   call, with a dynamically-checked extension bag for hosts
//! - **Events & routing**: typed dispatch, targeted delivery through a
//!   pruned region tree, cooperative abort
//! - **System**: the refresh loop, time source, and external hooks
//!
//! # Example
//!
//! ```rust
//! use weft_core::prelude::*;
//! use weft_signals::prelude::*;
//!
//! struct Click;
//!
//! let system = System::with_controller(|ctx| {
//!     let count = get_state(ctx, 0i32);
//!     on_event::<Click>(ctx, |_ctx, _click| {
//!         perform_action(&add_to(count.clone(), 1), ());
//!     });
//! });
//!
//! system.refresh();
//! system.dispatch_event(Click);
//! system.dispatch_event(Click);
//! ```

pub mod apply;
pub mod context;
pub mod cursor;
pub mod error;
pub mod events;
pub mod flow;
pub mod graph;
pub mod sequence;
pub mod state;
pub mod system;
pub mod text;
pub mod timing;

pub use apply::{
    apply, launch_async, try_apply, ApplySignal, ApplyStatus, AsyncReporter, AsyncSignal,
    AsyncStatus,
};
pub use context::{with_component, Context, DatalessContext, Environment};
pub use cursor::{
    disable_gc, get_cached_data, get_cached_data_with, get_data, get_data_with, get_keyed_data,
    named_block, named_block_manual, with_cache_clearing_disabled, with_naming, DataSlot,
    DataTraversal, KeyedSignal, NamingHandle,
};
pub use error::CoreError;
pub use events::{
    abort_traversal, get_node_id, is_refresh_event, make_routable_node_id, on_event, on_refresh,
    on_targeted_event, region, EventTraversal, NodeId, RefreshEvent, RoutableNodeId,
    RoutingRegion, TargetedEvent,
};
pub use flow::{branch, branch_else, iterate, keyed, untracked, CondState, IntoCondition};
pub use graph::{clear_cached_data, clear_data_block, delete_named_block, DataGraph};
pub use sequence::{for_each, for_each_keyed, transform, ElementSignal, MappedSignal};
pub use state::{get_state, StateCell, StateSignal};
pub use system::{ExternalInterface, System};
pub use text::{as_text, TextValue, TextView};
pub use timing::{
    animation_tick, animation_tick_signal, default_tick_count, request_animation_refresh,
    ticks_left_until, Millis, Timing,
};

/// The common imports for controller code.
pub mod prelude {
    pub use crate::apply::{apply, launch_async, try_apply, ApplyStatus, AsyncStatus};
    pub use crate::context::{with_component, Context, DatalessContext};
    pub use crate::cursor::{
        get_cached_data, get_data, get_keyed_data, named_block, named_block_manual, with_naming,
    };
    pub use crate::events::{
        abort_traversal, get_node_id, is_refresh_event, make_routable_node_id, on_event,
        on_refresh, on_targeted_event, region, NodeId, RefreshEvent, RoutableNodeId,
        TargetedEvent,
    };
    pub use crate::flow::{branch, branch_else, iterate, keyed, untracked};
    pub use crate::sequence::{for_each, for_each_keyed, transform};
    pub use crate::state::get_state;
    pub use crate::system::{ExternalInterface, System};
    pub use crate::text::as_text;
    pub use crate::timing::{animation_tick, request_animation_refresh, ticks_left_until};
}
