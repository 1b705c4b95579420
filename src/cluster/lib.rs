//! Crate containing the cluster data model of Silo: datanode identities,
//! operational states, pipelines, and the event bus tying them together

#[macro_use]
extern crate tracing;

pub mod bus;
pub mod error;
pub mod node;
pub mod pipeline;
pub mod registry;
pub mod report;
