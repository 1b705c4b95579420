//! The administrative lifecycle controller of a Silo cluster: it moves
//! datanodes between service, decommission and maintenance states, and holds
//! them in the transient draining states until both drain gates agree that
//! the node is safe to let go.

#[macro_use]
extern crate tracing;

pub mod controller;
pub mod error;
pub mod gates;
pub mod metrics;
pub mod resolve;
pub mod state;
