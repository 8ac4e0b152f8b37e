//! Traffic Light State Machine
//!
//! This example drives a cyclic machine through its public API.
//!
//! Key concepts:
//! - Cyclic graph declared with enter/leave sets
//! - `onEnter` hook that schedules the next phase from inside a hook
//! - Declared rejections reported through `on_rejected`
//! - Debug log and state diagram inspection
//!
//! Run with: cargo run --example traffic_light

use reactive_fsm::graph::{StateConfig, TransitionGraph};
use reactive_fsm::machine::Machine;
use reactive_fsm::state_enum;
use std::cell::Cell;
use std::rc::Rc;

state_enum! {
    enum TrafficLight {
        Red,
        Green { seconds: u32 },
        Yellow,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .without_time()
        .init();

    println!("=== Traffic Light State Machine ===\n");

    let cycles = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&cycles);

    let graph = TransitionGraph::<TrafficLight>::builder()
        .state(
            "Red",
            StateConfig::new()
                .enter_from_init()
                .enter_from("Yellow")
                .leave_to("Green")
                .on_enter(move |machine, _| {
                    counter.set(counter.get() + 1);
                    if counter.get() < 3 {
                        // queued; runs once Red is committed
                        machine.submit_change(TrafficLight::Green { seconds: 30 });
                    }
                    Ok(true)
                }),
        )
        .state(
            "Green",
            StateConfig::new()
                .enter_from("Red")
                .leave_to("Yellow")
                .on_update(|_, args| Ok(args.update.data != Some(TrafficLight::Green { seconds: 0 }))),
        )
        .state(
            "Yellow",
            StateConfig::new()
                .enter_from("Green")
                .leave_to("Red")
                .leave_to_terminate(),
        )
        .build()
        .unwrap();

    let machine = Machine::builder(graph)
        .on_rejected(|_, rejection| println!("  rejected: {} ({})", rejection.reason, rejection.message))
        .build()
        .unwrap();
    let mut changes = machine.state_changes();

    machine.submit_change(TrafficLight::Red);
    println!("After the first Red: {}", machine.current_state().state);

    machine.submit_update(TrafficLight::Green { seconds: 10 });
    machine.submit_update(TrafficLight::Green { seconds: 10 });
    machine.submit_update(TrafficLight::Green { seconds: 0 });
    machine.submit_change(TrafficLight::Red);

    machine.submit_change(TrafficLight::Yellow);
    machine.submit_change(TrafficLight::Red);
    machine.submit_change(TrafficLight::Yellow);
    machine.submit_change(TrafficLight::Red);
    machine.submit_change(TrafficLight::Yellow);
    machine.submit_terminate();

    println!("\nCommitted sequence:");
    for commit in changes.drain() {
        println!("  {:<7} {:?}", commit.kind.to_string(), commit.value);
    }
    println!("Red entered {} times", cycles.get());
    println!("Destroyed: {}", machine.is_destroyed());

    println!("\nDebug log:");
    for entry in machine.debug_log() {
        println!("  {} {} {:?}", entry.kind, entry.state, entry.result);
    }

    println!("\nDiagram:\n{}", machine.state_diagram_definition(Some("Yellow")));

    println!("\n=== Example Complete ===");
}
