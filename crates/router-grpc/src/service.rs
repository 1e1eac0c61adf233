//! The `ResultSinkService` tonic server implementation: one bidirectional
//! stream per inbound RPC, handed off to [`crate::stream_handler`].

use crate::pb::resultrouter::v1::result_sink_service_server::{
    ResultSinkService, ResultSinkServiceServer,
};
use crate::pb::resultrouter::v1::{TransferResultChunkRequest, TransferResultChunkResponse};
use crate::stream_handler::handle_stream;
use router_core::ConsumerRegistry;
use std::sync::Arc;
use tonic::{Request, Response, Status, Streaming};

/// Thin adapter wiring the generated gRPC service trait to the
/// transport-agnostic [`ConsumerRegistry`].
///
/// One instance is shared (via `Arc`, cheap to `Clone`) across every
/// concurrent inbound RPC stream handled by the server's thread pool.
#[derive(Clone)]
pub struct ResultSink {
    registry: Arc<ConsumerRegistry>,
}

impl ResultSink {
    /// Builds a service backed by the given registry.
    #[must_use]
    pub fn new(registry: Arc<ConsumerRegistry>) -> Self {
        Self { registry }
    }

    /// Wraps this service for registration with a `tonic::transport::Server`.
    #[must_use]
    pub fn into_server(self) -> ResultSinkServiceServer<Self> {
        ResultSinkServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl ResultSinkService for ResultSink {
    async fn transfer_result_chunk(
        &self,
        request: Request<Streaming<TransferResultChunkRequest>>,
    ) -> Result<Response<TransferResultChunkResponse>, Status> {
        let inbound = request.into_inner();
        match handle_stream(Arc::clone(&self.registry), inbound).await {
            Ok(response) => Ok(Response::new(response)),
            Err(status) => Err(status),
        }
    }
}
