//! Time
//!
//! The runtime's one notion of time is a monotonically increasing
//! millisecond counter with an arbitrary start point. It wraps; consumers
//! compute deltas with wrapping arithmetic and interpret them as signed.

use std::sync::OnceLock;
use std::time::Instant;

use weft_signals::{value, Value};

use crate::context::DatalessContext;
use crate::events::is_refresh_event;

/// Monotonic milliseconds. Wraps around; compare by wrapping subtraction.
pub type Millis = u32;

/// The timing component carried by every traversal's context.
///
/// The tick counter is sampled once per pass, so it reads consistently
/// within a frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timing {
    pub tick: Millis,
}

/// The default monotonic clock, measured from first use.
pub fn default_tick_count() -> Millis {
    static START: OnceLock<Instant> = OnceLock::new();
    let start = *START.get_or_init(Instant::now);
    Instant::now().duration_since(start).as_millis() as Millis
}

/// Request that the system refresh again soon enough for smooth animation.
///
/// Idempotent per batch: the external hook fires once, further requests
/// before the next refresh are absorbed by the refresh-needed flag.
pub fn request_animation_refresh(ctx: &mut DatalessContext) {
    ctx.system().request_animation_refresh();
}

/// The current animation tick. Calling this means something is animating,
/// so it also requests a refresh.
pub fn animation_tick(ctx: &mut DatalessContext) -> Millis {
    request_animation_refresh(ctx);
    ctx.timing().tick
}

/// [`animation_tick`] as a signal.
pub fn animation_tick_signal(ctx: &mut DatalessContext) -> Value<Millis> {
    value(animation_tick(ctx))
}

/// Milliseconds remaining until `end_tick`, or 0 if it has passed.
///
/// While time remains, refresh passes keep requesting further refreshes,
/// so the system animates until the end time is reached.
pub fn ticks_left_until(ctx: &mut DatalessContext, end_tick: Millis) -> Millis {
    let remaining = end_tick.wrapping_sub(ctx.timing().tick) as i32;
    if remaining > 0 {
        if is_refresh_event(ctx) {
            request_animation_refresh(ctx);
        }
        remaining as Millis
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tick_is_monotonic() {
        let a = default_tick_count();
        let b = default_tick_count();
        assert!(b.wrapping_sub(a) as i32 >= 0);
    }
}
