//! Pictura service: wires configuration, stores and the queue consumer into a
//! long-running process with a liveness endpoint.

pub mod health;
pub mod setup;
pub mod telemetry;
