//! The consumer registry: the shared, thread-safe lookup table that
//! demultiplexes inbound row batches onto local consumer nodes.
//!
//! This crate is transport-agnostic — it knows nothing about gRPC, h2, or
//! wire bytes. It is invoked concurrently from an RPC server's stream
//! handlers (one task per active stream, routing batches and lifecycle
//! transitions) and from the query executor (registering consumers, reading
//! stats snapshots, and deleting queries). See [`ConsumerRegistry`] for the
//! full operation set and locking discipline.

mod consumer;
mod registry;
mod slot;

pub use consumer::{wake_fn, Consumer, WakeFn};
pub use registry::ConsumerRegistry;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(test)]
mod tests;
