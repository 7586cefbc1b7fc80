//! Application services
//!
//! Services own the connection state machines and the acquisition loop.
//! They depend only on ports, never on concrete adapters.

pub mod broker;
pub mod link;
pub mod scheduler;

pub use broker::{BrokerClient, BrokerState};
pub use link::{LinkManager, LinkState};
pub use scheduler::{Absent, CycleOutcome, Scheduler, TickReport};
