//! Compiles the provider protocol definition.
//!
//! The generated types land in `OUT_DIR` and are pulled in by `src/proto.rs`
//! via `tonic::include_proto!`. Only the server half is generated; the
//! provider never dials the host.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_client(false)
        .compile_protos(&["proto/provider.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}
