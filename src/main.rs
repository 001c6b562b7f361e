//! Provider plugin entry point.

use hemmer_provider_azurerm::{init_logging, serve, AzureProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!("starting azurerm provider");
    serve(AzureProvider::new()).await
}
