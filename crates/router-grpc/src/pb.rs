//! Generated client/server stubs for `ResultSinkService`, compiled from
//! `proto/result_chunk_router.proto` by `build.rs`.
#![allow(missing_docs)]
#![allow(clippy::all)]

pub mod resultrouter {
    pub mod v1 {
        tonic::include_proto!("resultrouter.v1");
    }
}
