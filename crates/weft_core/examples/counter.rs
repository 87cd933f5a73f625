//! A headless counter: the whole runtime loop without a widget toolkit.
//!
//! The controller declares a counter with persistent state and an
//! increment action behind a click handler; the host loop plays the part
//! of a UI by dispatching click events and printing what a refresh sees.

use std::cell::RefCell;
use std::rc::Rc;

use weft_core::prelude::*;
use weft_signals::prelude::*;

struct Click;

fn main() {
    let display = Rc::new(RefCell::new(String::new()));

    let screen = Rc::clone(&display);
    let system = System::with_controller(move |ctx| {
        let count = get_state(ctx, 0i32);
        let label = as_text(ctx, count.clone());

        let target = count.clone();
        on_event::<Click>(ctx, move |_ctx, _click| {
            perform_action(&add_to(target.clone(), 1), ());
        });

        on_refresh(ctx, |_ctx| {
            if label.has_value() {
                *screen.borrow_mut() = format!("count = {}", label.read());
            }
        });
    });

    system.refresh();
    println!("{}", display.borrow());

    for _ in 0..3 {
        system.dispatch_event(Click);
        println!("{}", display.borrow());
    }
}
