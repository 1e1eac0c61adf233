//! Generates the `ResultSinkService` client and server stubs from
//! `proto/result_chunk_router.proto`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_client(false)
        .compile_protos(&["proto/result_chunk_router.proto"], &["proto"])?;
    Ok(())
}
