//! Deterministic simulation harness for chat session testing.
//!
//! Virtual-time implementations of the Environment and Driver traits plus an
//! in-memory STOMP broker, for reproducible tests of session clients under
//! reconnects, broker failures and concurrent traffic.
//!
//! # Room Simulation
//!
//! [`SimRoom`] wires several session clients to one [`SimBroker`] and drives
//! them directly. [`SimDriver`] plugs the same broker under the full
//! [`chatsync_app::Runtime`].
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the checks
//! that hold at every step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_broker;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_room;

pub use invariants::{
    AppendOnlyLog, AttributionMatchesAuthor, ClientSnapshot, ContentConvergence, Invariant,
    InvariantRegistry, InvariantResult, SharedOrdering, SystemSnapshot, TornDownIsEmpty,
    UniqueServerIds, Violation,
};
pub use sim_broker::{SessionId, SimBroker};
pub use sim_driver::{SharedBroker, SimDriver, SimDriverError, shared_broker};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_room::SimRoom;
