//! gRPC surface for the result-chunk router: wire envelope decoding, the
//! per-stream handler, and the `ResultSinkService` tonic server.
//!
//! Everything that actually demultiplexes batches onto consumer nodes lives
//! in `router-core`; this crate only translates between wire bytes and that
//! crate's transport-agnostic API.

pub mod envelope;
pub mod pb;
pub mod service;
pub mod stream_handler;

pub use pb::resultrouter::v1::result_sink_service_server::ResultSinkServiceServer;
pub use service::ResultSink;
