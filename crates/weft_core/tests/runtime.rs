//! End-to-end tests for the runtime: data graph + signals + events + system
//!
//! These drive whole systems through refreshes and event dispatches and
//! verify the load-bearing guarantees:
//! - data slots stay stable while the control-flow skeleton does
//! - named blocks keep their state when the traversal reorders
//! - memoized application recomputes exactly when an input identity changes
//! - targeted events reach their node and prune every sibling region
//! - interrupted traversals lose no named-block state

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use weft_core::prelude::*;
use weft_core::{
    get_cached_data, get_data_with, with_cache_clearing_disabled, with_component, Millis, NodeId,
    RoutableNodeId, StateSignal,
};
use weft_identity::Id;
use weft_signals::prelude::*;

struct Click;
struct Poke;

#[test]
fn test_counter_accumulates_clicks() {
    let per_refresh = Rc::new(RefCell::new(Vec::<(i32, Id)>::new()));

    let log = Rc::clone(&per_refresh);
    let system = System::with_controller(move |ctx| {
        let count = get_state(ctx, 0i32);
        let target = count.clone();
        on_event::<Click>(ctx, move |_ctx, _click| {
            perform_action(&add_to(target.clone(), 1), ());
        });
        on_refresh(ctx, |_ctx| {
            log.borrow_mut()
                .push((read_signal(&count), count.value_id()));
        });
    });

    system.refresh();
    for _ in 0..5 {
        system.dispatch_event(Click);
    }

    let log = per_refresh.borrow();
    assert_eq!(log.len(), 6, "initial refresh plus one per click");
    assert_eq!(log.last().unwrap().0, 5);
    // The state's identity moved on at every refresh.
    for window in log.windows(2) {
        assert_ne!(window[0].1, window[1].1);
    }
}

#[test]
fn test_apply_recomputes_only_on_identity_change() {
    let calls = Rc::new(Cell::new(0u32));
    let latest = Rc::new(RefCell::new(None::<(i32, Id)>));
    let input = Rc::new(RefCell::new(None::<StateSignal<i32>>));

    let call_counter = Rc::clone(&calls);
    let result_log = Rc::clone(&latest);
    let input_handle = Rc::clone(&input);
    let system = System::with_controller(move |ctx| {
        let n = get_state(ctx, 3i32);
        *input_handle.borrow_mut() = Some(n.clone());

        let counter = Rc::clone(&call_counter);
        let squared = apply(
            ctx,
            move |(v,): (i32,)| {
                counter.set(counter.get() + 1);
                v * v
            },
            (n,),
        );
        if signal_has_value(&squared) {
            *result_log.borrow_mut() = Some((read_signal(&squared), squared.value_id()));
        }
    });

    system.refresh();
    assert_eq!(calls.get(), 1);
    let (first_result, first_id) = latest.borrow().clone().unwrap();
    assert_eq!(first_result, 9);

    // An event that doesn't touch the input leaves everything be.
    system.dispatch_event(Poke);
    assert_eq!(calls.get(), 1, "untouched inputs must not recompute");
    let (result, id) = latest.borrow().clone().unwrap();
    assert_eq!(result, 9);
    assert_eq!(id, first_id, "result version must not move");

    // Changing the input recomputes exactly once.
    input.borrow().as_ref().unwrap().write(4).unwrap();
    system.refresh();
    assert_eq!(calls.get(), 2);
    let (result, id) = latest.borrow().clone().unwrap();
    assert_eq!(result, 16);
    assert_ne!(id, first_id);
}

#[test]
fn test_apply_failure_latches() {
    let status_log = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&status_log);
    let system = System::with_controller(move |ctx| {
        let doomed = try_apply(
            ctx,
            |(n,): (i32,)| -> anyhow::Result<i32> { anyhow::bail!("cannot process {n}") },
            (value(1),),
        );
        log.borrow_mut()
            .push((doomed.status(), doomed.error(), signal_has_value(&doomed)));
    });

    system.refresh();
    system.refresh();

    let log = status_log.borrow();
    assert_eq!(log[0].0, ApplyStatus::Failed);
    assert!(log[0].1.as_deref().unwrap().contains("cannot process"));
    assert!(!log[0].2);
    // The failure is latched: the function is not retried while the inputs
    // stand still.
    assert_eq!(log[1].0, ApplyStatus::Failed);
}

#[test]
fn test_named_blocks_keep_state_across_reorder() {
    let order = Rc::new(RefCell::new(vec!["a", "b", "c"]));
    let snapshot = Rc::new(RefCell::new(BTreeMap::<String, i32>::new()));

    let names = Rc::clone(&order);
    let seen = Rc::clone(&snapshot);
    let system = System::with_controller(move |ctx| {
        seen.borrow_mut().clear();
        let current = names.borrow().clone();
        with_naming(ctx, |ctx, _map| {
            for (index, name) in current.iter().enumerate() {
                named_block(ctx, Id::of(name.to_string()), |ctx| {
                    let state = get_state(ctx, empty::<i32>());
                    if !signal_has_value(&state) {
                        state.write((index as i32 + 1) * 10).unwrap();
                    }
                    seen.borrow_mut()
                        .insert(name.to_string(), read_signal(&state));
                });
            }
        });
    });

    system.refresh();
    assert_eq!(snapshot.borrow()["a"], 10);
    assert_eq!(snapshot.borrow()["b"], 20);
    assert_eq!(snapshot.borrow()["c"], 30);

    // Reordering moves each block's state along with its name.
    *order.borrow_mut() = vec!["c", "a", "b"];
    system.refresh();
    assert_eq!(snapshot.borrow()["a"], 10);
    assert_eq!(snapshot.borrow()["b"], 20);
    assert_eq!(snapshot.borrow()["c"], 30);

    // Dropping a name collects its block; bringing it back starts fresh.
    *order.borrow_mut() = vec!["c", "a"];
    system.refresh();
    assert!(!snapshot.borrow().contains_key("b"));

    *order.borrow_mut() = vec!["c", "a", "b"];
    system.refresh();
    assert_eq!(snapshot.borrow()["b"], 30, "index 2 initializer, not old state");
    assert_eq!(snapshot.borrow()["a"], 10);
    assert_eq!(snapshot.borrow()["c"], 30);
}

#[derive(Default)]
struct Ping {
    target: NodeId,
    hits: u32,
}

impl TargetedEvent for Ping {
    fn target(&self) -> NodeId {
        self.target
    }

    fn set_target(&mut self, target: NodeId) {
        self.target = target;
    }
}

#[test]
fn test_targeted_event_prunes_sibling_regions() {
    let handles = Rc::new(RefCell::new(Vec::<RoutableNodeId>::new()));
    let ping_relevance = Rc::new(RefCell::new(Vec::<(usize, bool)>::new()));
    let fired = Rc::new(RefCell::new(Vec::<usize>::new()));

    let routables = Rc::clone(&handles);
    let relevance = Rc::clone(&ping_relevance);
    let hits = Rc::clone(&fired);
    let system = System::with_controller(move |ctx| {
        iterate(ctx, 0..3usize, |ctx, index| {
            region(ctx, |ctx, relevant| {
                if ctx.event().is::<Ping>() {
                    relevance.borrow_mut().push((index, relevant));
                }
                if relevant {
                    let node = get_node_id(ctx);
                    if is_refresh_event(ctx) {
                        let routable = make_routable_node_id(ctx, node);
                        let mut routables = routables.borrow_mut();
                        if routables.len() <= index {
                            routables.push(routable);
                        } else {
                            routables[index] = routable;
                        }
                    }
                    let hits = Rc::clone(&hits);
                    on_targeted_event::<Ping>(ctx, node, move |_ctx, ping| {
                        ping.hits += 1;
                        hits.borrow_mut().push(index);
                    });
                }
            });
        });
    });

    system.refresh();
    assert_eq!(handles.borrow().len(), 3);
    assert!(handles.borrow().iter().all(RoutableNodeId::is_valid));

    let target = handles.borrow()[1].clone();
    let ping = system.dispatch_targeted_event(Ping::default(), &target);

    // Exactly the targeted handler fired, exactly once.
    assert_eq!(ping.hits, 1);
    assert_eq!(*fired.borrow(), vec![1]);
    // Sibling regions were pruned, and the region after the hit was cut off
    // by the abort.
    assert_eq!(
        *ping_relevance.borrow(),
        vec![(0, false), (1, true), (2, false)]
    );
}

#[test]
fn test_async_operation_latch() {
    type Pending = Rc<RefCell<Vec<(weft_core::AsyncReporter<String>, String)>>>;
    let pending: Pending = Rc::new(RefCell::new(Vec::new()));
    let observed = Rc::new(RefCell::new(Vec::<(AsyncStatus, Option<String>)>::new()));
    let input = Rc::new(RefCell::new(None::<StateSignal<String>>));

    let launch_queue = Rc::clone(&pending);
    let log = Rc::clone(&observed);
    let input_handle = Rc::clone(&input);
    let system = System::with_controller(move |ctx| {
        let query = get_state(ctx, "a".to_string());
        *input_handle.borrow_mut() = Some(query.clone());

        let queue = Rc::clone(&launch_queue);
        let result = launch_async(
            ctx,
            move |_ctx, reporter, (query,): (String,)| {
                queue.borrow_mut().push((reporter, format!("done-{query}")));
                Ok(())
            },
            (query,),
        );
        if is_refresh_event(ctx) {
            let value = signal_has_value(&result).then(|| read_signal(&result));
            log.borrow_mut().push((result.status(), value));
        }
    });

    // Refresh 1: the operation launches but has no value yet.
    system.refresh();
    assert_eq!(observed.borrow().last().unwrap().0, AsyncStatus::Launched);
    assert_eq!(observed.borrow().last().unwrap().1, None);

    // The external completion arrives and refreshes the system.
    let (reporter, payload) = pending.borrow_mut().pop().unwrap();
    reporter.report(payload);
    assert_eq!(observed.borrow().last().unwrap().0, AsyncStatus::Complete);
    assert_eq!(
        observed.borrow().last().unwrap().1.as_deref(),
        Some("done-a")
    );

    // Changing the input resets the operation and relaunches.
    input.borrow().as_ref().unwrap().write("b".into()).unwrap();
    system.refresh();
    assert_eq!(observed.borrow().last().unwrap().0, AsyncStatus::Launched);
    assert_eq!(observed.borrow().last().unwrap().1, None);
    let (stale_reporter, stale_payload) = pending.borrow_mut().pop().unwrap();

    // Change the input again before the b-result lands: the b-report is
    // stale and must be discarded.
    input.borrow().as_ref().unwrap().write("c".into()).unwrap();
    system.refresh();
    let (fresh_reporter, fresh_payload) = pending.borrow_mut().pop().unwrap();

    stale_reporter.report(stale_payload);
    assert_eq!(observed.borrow().last().unwrap().0, AsyncStatus::Launched);

    fresh_reporter.report(fresh_payload);
    assert_eq!(observed.borrow().last().unwrap().0, AsyncStatus::Complete);
    assert_eq!(
        observed.borrow().last().unwrap().1.as_deref(),
        Some("done-c")
    );
}

#[test]
fn test_slot_stability_and_idempotent_refresh() {
    let inits = Rc::new(Cell::new(0u32));
    let values = Rc::new(RefCell::new(Vec::<i32>::new()));

    let init_counter = Rc::clone(&inits);
    let log = Rc::clone(&values);
    let system = System::with_controller(move |ctx| {
        branch(ctx, true, |ctx| {
            let counter = Rc::clone(&init_counter);
            let (slot, _) = get_data_with(ctx, move || {
                counter.set(counter.get() + 1);
                7i32
            });
            log.borrow_mut().push(slot.get());
        });
        iterate(ctx, 0..2, |ctx, index| {
            let counter = Rc::clone(&init_counter);
            let (slot, _) = get_data_with(ctx, move || {
                counter.set(counter.get() + 1);
                index
            });
            log.borrow_mut().push(slot.get());
        });
    });

    for _ in 0..3 {
        system.refresh();
    }

    // Three slots, each initialized exactly once across three refreshes.
    assert_eq!(inits.get(), 3);
    assert_eq!(*values.borrow(), vec![7, 0, 1, 7, 0, 1, 7, 0, 1]);
}

#[test]
#[should_panic(expected = "holds a different type")]
fn test_slot_type_mismatch_is_fatal() {
    let first_pass = Rc::new(Cell::new(true));

    let flag = Rc::clone(&first_pass);
    let system = System::with_controller(move |ctx| {
        // An unannotated branch: both arms land on the same slot.
        if flag.get() {
            let (_slot, _) = weft_core::get_data::<i32>(ctx);
        } else {
            let (_slot, _) = weft_core::get_data::<String>(ctx);
        }
    });

    system.refresh();
    first_pass.set(false);
    system.refresh();
}

#[test]
#[should_panic(expected = "out of order")]
fn test_named_block_out_of_order_without_gc_is_fatal() {
    let reversed = Rc::new(Cell::new(false));

    let flip = Rc::clone(&reversed);
    let system = System::with_controller(move |ctx| {
        let names = if flip.get() { ["b", "a"] } else { ["a", "b"] };
        with_naming(ctx, |ctx, _map| {
            for name in names {
                named_block(ctx, Id::of(name.to_string()), |_ctx| {});
            }
        });
    });

    system.refresh();
    reversed.set(true);
    // Plain events run with garbage collection disabled, so the reordering
    // cannot be resolved.
    system.dispatch_event(Poke);
}

#[test]
fn test_keyed_blocks_persist_inactive_cases() {
    let case = Rc::new(RefCell::new("alpha".to_string()));
    let seen = Rc::new(RefCell::new(Vec::<(String, u32)>::new()));

    let selector = Rc::clone(&case);
    let log = Rc::clone(&seen);
    let system = System::with_controller(move |ctx| {
        let current = selector.borrow().clone();
        let log = Rc::clone(&log);
        keyed(ctx, current.clone(), move |ctx| {
            let visits = get_state(ctx, 0u32);
            perform_action(&add_to(visits.clone(), 1), ());
            log.borrow_mut().push((current, read_signal(&visits)));
        });
    });

    system.refresh();
    *case.borrow_mut() = "beta".to_string();
    system.refresh();
    *case.borrow_mut() = "alpha".to_string();
    system.refresh();

    let log = seen.borrow();
    assert_eq!(log[0], ("alpha".to_string(), 1));
    assert_eq!(log[1], ("beta".to_string(), 1));
    // Alpha's persistent state survived while the case was switched away.
    assert_eq!(log[2], ("alpha".to_string(), 2));
}

#[test]
fn test_branch_clears_caches_but_keeps_state() {
    let show = Rc::new(Cell::new(true));
    let cache_inits = Rc::new(Cell::new(0u32));
    let state_inits = Rc::new(Cell::new(0u32));

    let condition = Rc::clone(&show);
    let caches = Rc::clone(&cache_inits);
    let states = Rc::clone(&state_inits);
    let system = System::with_controller(move |ctx| {
        branch(ctx, condition.get(), |ctx| {
            let (_cache, cache_fresh) = get_cached_data::<i32>(ctx);
            if cache_fresh {
                caches.set(caches.get() + 1);
            }
            let (_state, state_fresh) = weft_core::get_data::<i32>(ctx);
            if state_fresh {
                states.set(states.get() + 1);
            }
        });
    });

    system.refresh();
    system.refresh();
    assert_eq!(cache_inits.get(), 1);
    assert_eq!(state_inits.get(), 1);

    // Hide the branch: its caches are cleared, its persistent data is not.
    show.set(false);
    system.refresh();
    show.set(true);
    system.refresh();
    assert_eq!(cache_inits.get(), 2, "cache must be rebuilt after clearing");
    assert_eq!(state_inits.get(), 1, "persistent state must survive");
}

#[test]
fn test_cache_clearing_can_be_suspended() {
    let show = Rc::new(Cell::new(true));
    let cache_inits = Rc::new(Cell::new(0u32));

    let condition = Rc::clone(&show);
    let caches = Rc::clone(&cache_inits);
    let system = System::with_controller(move |ctx| {
        with_cache_clearing_disabled(ctx, |ctx| {
            branch(ctx, condition.get(), |ctx| {
                let (_cache, fresh) = get_cached_data::<i32>(ctx);
                if fresh {
                    caches.set(caches.get() + 1);
                }
            });
        });
    });

    system.refresh();
    show.set(false);
    system.refresh();
    show.set(true);
    system.refresh();
    assert_eq!(cache_inits.get(), 1, "suspended clearing must keep the cache");
}

#[test]
fn test_aborted_refresh_preserves_unvisited_named_blocks() {
    let abort_between = Rc::new(Cell::new(false));
    let y_value = Rc::new(RefCell::new(None::<i32>));

    let interrupt = Rc::clone(&abort_between);
    let observed = Rc::clone(&y_value);
    let system = System::with_controller(move |ctx| {
        with_naming(ctx, |ctx, _map| {
            named_block(ctx, Id::of("x"), |_ctx| {});
            let interrupt = Rc::clone(&interrupt);
            on_refresh(ctx, move |ctx| {
                if interrupt.get() {
                    abort_traversal(ctx);
                }
            });
            // Named blocks consume reference slots, not data slots, so an
            // abort-guarded visit stays aligned.
            if !ctx.event().aborted() {
                named_block(ctx, Id::of("y"), |ctx| {
                    let state = get_state(ctx, 7i32);
                    *observed.borrow_mut() = Some(read_signal(&state));
                });
            }
        });
    });

    system.refresh();
    assert_eq!(*y_value.borrow(), Some(7));

    // The interrupted refresh never reaches y; its reference is parked on
    // the graph's holding list instead of being collected.
    *y_value.borrow_mut() = None;
    abort_between.set(true);
    system.refresh();
    assert_eq!(*y_value.borrow(), None);

    // The next complete refresh re-references the block with its state
    // intact.
    abort_between.set(false);
    system.refresh();
    assert_eq!(*y_value.borrow(), Some(7));
}

#[test]
fn test_for_each_keyed_moves_state_with_items() {
    let items = Rc::new(RefCell::new(vec!["red".to_string(), "blue".to_string()]));
    let snapshot = Rc::new(RefCell::new(Vec::<(String, i32)>::new()));

    let list = Rc::clone(&items);
    let seen = Rc::clone(&snapshot);
    let system = System::with_controller(move |ctx| {
        seen.borrow_mut().clear();
        let list = list.borrow().clone();
        let container = value(list);
        let seen = Rc::clone(&seen);
        for_each_keyed(
            ctx,
            &container,
            |item| Id::of(item.clone()),
            move |ctx, element| {
                let name = read_signal(&element);
                let state = get_state(ctx, empty::<i32>());
                if !signal_has_value(&state) {
                    state.write(name.len() as i32).unwrap();
                }
                seen.borrow_mut().push((name, read_signal(&state)));
            },
        );
    });

    system.refresh();
    assert_eq!(
        *snapshot.borrow(),
        vec![("red".to_string(), 3), ("blue".to_string(), 4)]
    );

    // Reorder: each element keeps its own state.
    *items.borrow_mut() = vec!["blue".to_string(), "red".to_string()];
    system.refresh();
    assert_eq!(
        *snapshot.borrow(),
        vec![("blue".to_string(), 4), ("red".to_string(), 3)]
    );
}

#[test]
fn test_for_each_elements_write_through() {
    let items = Rc::new(RefCell::new(vec![1, 2, 3]));
    let bump_first = Rc::new(Cell::new(false));

    let cells = Rc::clone(&items);
    let bump = Rc::clone(&bump_first);
    let system = System::with_controller(move |ctx| {
        let storage = Rc::clone(&cells);
        let container = direct(&*storage);
        let bump = Rc::clone(&bump);
        for_each(ctx, &container, move |_ctx, element| {
            if bump.get() && element.has_value() {
                let current = read_signal(&element);
                if current == 1 {
                    element.write(10).unwrap();
                }
            }
        });
    });

    system.refresh();
    assert_eq!(*items.borrow(), vec![1, 2, 3]);

    bump_first.set(true);
    system.refresh();
    assert_eq!(*items.borrow(), vec![10, 2, 3]);
}

#[test]
fn test_transform_caches_per_element() {
    let items = Rc::new(RefCell::new(vec![1, 2, 3]));
    let calls = Rc::new(Cell::new(0u32));
    let output = Rc::new(RefCell::new(None::<(Vec<i32>, Id)>));

    let storage = Rc::clone(&items);
    let counter = Rc::clone(&calls);
    let log = Rc::clone(&output);
    let system = System::with_controller(move |ctx| {
        let storage = Rc::clone(&storage);
        let container = direct(&*storage);
        let counter = Rc::clone(&counter);
        let doubled = transform(ctx, &container, move |ctx, element| {
            let counter = Rc::clone(&counter);
            apply(
                ctx,
                move |(v,): (i32,)| {
                    counter.set(counter.get() + 1);
                    v * 2
                },
                (element,),
            )
        });
        if signal_has_value(&doubled) {
            *log.borrow_mut() = Some((read_signal(&doubled), doubled.value_id()));
        }
    });

    system.refresh();
    assert_eq!(calls.get(), 3);
    let (first_values, first_id) = output.borrow().clone().unwrap();
    assert_eq!(first_values, vec![2, 4, 6]);

    // An unchanged container maps nothing and keeps the output version.
    system.refresh();
    assert_eq!(calls.get(), 3);
    assert_eq!(output.borrow().clone().unwrap().1, first_id);

    // Changing the container re-maps (element identities derive from the
    // container's identity, so every element reapplies) and bumps the
    // output version.
    items.borrow_mut()[0] = 10;
    system.refresh();
    assert_eq!(calls.get(), 6);
    let (values, id) = output.borrow().clone().unwrap();
    assert_eq!(values, vec![20, 4, 6]);
    assert_ne!(id, first_id);
}

#[test]
fn test_text_view_round_trip() {
    let rendered = Rc::new(RefCell::new(String::new()));
    let view = Rc::new(RefCell::new(None::<weft_core::TextView<StateSignal<i32>>>));

    let text_log = Rc::clone(&rendered);
    let export = Rc::clone(&view);
    let system = System::with_controller(move |ctx| {
        let n = get_state(ctx, 41i32);
        let text = as_text(ctx, n);
        if text.has_value() {
            *text_log.borrow_mut() = text.read();
        }
        *export.borrow_mut() = Some(text);
    });

    system.refresh();
    assert_eq!(*rendered.borrow(), "41");

    // Writing parses back into the source.
    view.borrow().as_ref().unwrap().write("42".into()).unwrap();
    system.refresh();
    assert_eq!(*rendered.borrow(), "42");

    // A bad parse is a validation error and leaves the value alone.
    let error = view
        .borrow()
        .as_ref()
        .unwrap()
        .write("forty-two".into())
        .unwrap_err();
    assert!(error.message().contains("not a valid"));
    system.refresh();
    assert_eq!(*rendered.borrow(), "42");
}

#[test]
fn test_context_components_are_scoped() {
    struct Theme {
        accent: &'static str,
    }

    let inner_accent = Rc::new(RefCell::new(String::new()));
    let outer_present = Rc::new(Cell::new(true));

    let accent = Rc::clone(&inner_accent);
    let present = Rc::clone(&outer_present);
    let system = System::with_controller(move |ctx| {
        present.set(ctx.has_component::<Theme>());
        let accent = Rc::clone(&accent);
        with_component(ctx, Rc::new(Theme { accent: "teal" }), move |ctx| {
            let theme = ctx.component::<Theme>().unwrap();
            *accent.borrow_mut() = theme.accent.to_string();
        });
        assert!(ctx.component::<Theme>().is_err());
    });

    system.refresh();
    assert!(!outer_present.get());
    assert_eq!(*inner_accent.borrow(), "teal");
}

#[test]
fn test_animation_ticks_drive_refresh_requests() {
    struct FixedClock {
        now: Rc<Cell<Millis>>,
    }
    impl ExternalInterface for FixedClock {
        fn tick_count(&self) -> Millis {
            self.now.get()
        }
    }

    let now = Rc::new(Cell::new(400u32));
    let remaining = Rc::new(Cell::new(0u32));

    let left = Rc::clone(&remaining);
    let system = System::with_controller(move |ctx| {
        let ms = ticks_left_until(ctx, 500);
        left.set(ms);
    });
    system.set_external(FixedClock {
        now: Rc::clone(&now),
    });

    system.refresh();
    assert_eq!(remaining.get(), 100);
    assert!(
        system.needs_refresh(),
        "an unfinished animation keeps requesting refreshes"
    );

    now.set(600);
    system.refresh();
    assert_eq!(remaining.get(), 0);
    assert!(!system.needs_refresh());
}

#[test]
fn test_ticks_left_tolerates_counter_wrap() {
    struct FixedClock {
        now: Millis,
    }
    impl ExternalInterface for FixedClock {
        fn tick_count(&self) -> Millis {
            self.now
        }
    }

    let remaining = Rc::new(Cell::new(0u32));
    let left = Rc::clone(&remaining);
    let system = System::with_controller(move |ctx| {
        left.set(ticks_left_until(ctx, 100));
    });
    system.set_external(FixedClock {
        now: Millis::MAX - 50,
    });

    system.refresh();
    assert_eq!(remaining.get(), 151, "deltas are computed with wrapping");
}
