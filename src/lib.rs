//! Hemmer provider for Azure Resource Manager.
//!
//! This crate implements a Hemmer provider plugin speaking the gRPC provider
//! protocol, managing Azure resources through the ARM REST API. It follows
//! the pattern established by
//! [terraform-plugin-go](https://github.com/hashicorp/terraform-plugin-go)
//! on the protocol side and the AzureRM provider on the resource side.
//!
//! # Overview
//!
//! - **[`AzureProvider`]**: the [`ProviderService`] implementation wiring
//!   resources and data sources to the protocol
//! - **[`arm`]**: the ARM client layer — authentication, typed resource IDs,
//!   long-running-operation polling, provider registration, locations, tags
//! - **[`resources`]**: resource and data source implementations
//!   (`azurerm_resource_group`, consumption budgets, template deployments,
//!   `azurerm_subscription`)
//! - **[`schema`]** / **[`validation`]**: schema declaration and config
//!   validation shared by every resource
//! - **[`server`]**: gRPC serving with the stdout handshake protocol
//! - **[`testing`]**: a gRPC-free test harness and an in-memory ARM mock
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_provider_azurerm::{init_logging, serve, AzureProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(AzureProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it prints a handshake line to
//! stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`. The host spawns
//! the provider as a subprocess, reads the line, and connects over gRPC.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arm;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod proto;

// Re-export main types at crate root
pub use error::ProviderError;
pub use logging::{init_logging, try_init_logging};
pub use provider::AzureProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tonic;
pub use tracing;
