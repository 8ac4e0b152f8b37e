//! reactive-fsm: a reactive finite-state-machine runtime
//!
//! States are the variants of an application enum. A transition graph
//! declares, per state, where it may be entered from and where it may
//! leave to, plus optional lifecycle hooks. The machine validates every
//! request against the graph, runs the hooks, commits accepted values and
//! publishes them on observable streams.
//!
//! # Core Concepts
//!
//! - **Requests**: `submit_change` moves to another state, `submit_update`
//!   refreshes the payload of the current one. Both are fire-and-forget;
//!   refusals are reported through the `on_rejected` hook and the debug log.
//! - **Hooks**: `onLeave`, `onEnter` and `onUpdate` answer `Ok(true)` to
//!   accept or `Ok(false)` to reject. Errors and panics are unknown errors:
//!   the machine stays where it was and restarts its pipeline.
//! - **Re-entrancy**: a hook may submit further requests. They run strictly
//!   after the transition that issued them has settled.
//! - **Overrides**: in dev mode the current state can be forced, skipping
//!   validation and hooks.
//!
//! # Example
//!
//! ```rust
//! use reactive_fsm::core::{Label, RejectReason};
//! use reactive_fsm::graph::{StateConfig, TransitionGraph};
//! use reactive_fsm::machine::Machine;
//! use reactive_fsm::state_enum;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! state_enum! {
//!     enum Order {
//!         Placed { items: u32 },
//!         Shipped,
//!     }
//! }
//!
//! let graph = TransitionGraph::<Order>::builder()
//!     .state("Placed", StateConfig::new().enter_from_init().leave_to("Shipped"))
//!     .state("Shipped", StateConfig::new().enter_from("Placed").leave_to_terminate())
//!     .build()
//!     .unwrap();
//!
//! let rejected = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&rejected);
//! let machine = Machine::builder(graph)
//!     .on_rejected(move |_, rejection| sink.borrow_mut().push(rejection.reason))
//!     .build()
//!     .unwrap();
//!
//! machine.submit_change(Order::Placed { items: 1 });
//! machine.submit_update(Order::Placed { items: 3 });
//! machine.submit_change(Order::Placed { items: 4 });
//! machine.submit_change(Order::Shipped);
//!
//! assert_eq!(machine.current_state().state, Label::from("Shipped"));
//! assert_eq!(*rejected.borrow(), vec![RejectReason::IllegalChangeSameState]);
//!
//! machine.submit_terminate();
//! assert!(machine.is_destroyed());
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod graph;
pub mod machine;

// Re-export commonly used types
pub use crate::builder::{BuildError, GraphBuilder, MachineBuilder};
pub use crate::config::{Direction, MachineConfig};
pub use crate::core::{Label, RejectReason, State, StateInfo, StateValue, TransitionKind};
pub use crate::graph::{StateConfig, TransitionGraph};
pub use crate::machine::{Machine, Rejection, StateOverride, Subscription, UnknownError};
