//! The traits concrete resources and data sources implement.
//!
//! The provider owns the plugin protocol, plan diffing, and timeouts;
//! resources only describe their schema and perform CRUD against ARM
//! through the [`ResourceContext`] they are handed.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::arm::ArmApi;
use crate::error::ProviderError;
use crate::schema::Schema;

/// Everything a resource operation needs from the configured provider.
pub struct ResourceContext<'a> {
    /// The ARM REST seam.
    pub api: &'a dyn ArmApi,
    /// The subscription all paths are scoped to.
    pub subscription_id: &'a str,
}

/// Per-operation deadlines.
///
/// Each CRUD call runs under its timeout; blowing it surfaces as a
/// deadline-exceeded diagnostic rather than hanging the plugin.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Deadline for create, including any wait for provisioning.
    pub create: Duration,
    /// Deadline for read.
    pub read: Duration,
    /// Deadline for update.
    pub update: Duration,
    /// Deadline for delete, including any wait for teardown.
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(90 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(90 * 60),
            delete: Duration::from_secs(90 * 60),
        }
    }
}

/// A managed resource: schema plus CRUD against ARM.
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// The resource type name, e.g. `azurerm_resource_group`.
    fn type_name(&self) -> &'static str;

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Operation deadlines; the defaults suit most ARM resources.
    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Create the resource from its planned state and return the new state.
    ///
    /// The returned state must carry a non-empty `id`.
    async fn create(
        &self,
        ctx: &ResourceContext<'_>,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Refresh state from ARM. `Ok(None)` means the resource is gone and
    /// its state should be cleared.
    async fn read(
        &self,
        ctx: &ResourceContext<'_>,
        current: Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Apply an in-place update and return the new state.
    async fn update(
        &self,
        ctx: &ResourceContext<'_>,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the resource.
    async fn delete(&self, ctx: &ResourceContext<'_>, current: Value) -> Result<(), ProviderError>;

    /// Build state for an imported resource from its ARM ID.
    async fn import(&self, ctx: &ResourceContext<'_>, id: &str) -> Result<Value, ProviderError> {
        let _ = (ctx, id);
        Err(ProviderError::Unsupported(format!(
            "{} does not support import",
            self.type_name()
        )))
    }
}

/// A read-only data source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The data source type name, e.g. `azurerm_subscription`.
    fn type_name(&self) -> &'static str;

    /// The data source schema.
    fn schema(&self) -> Schema;

    /// Resolve the configured lookup into a state value.
    async fn read(&self, ctx: &ResourceContext<'_>, config: Value) -> Result<Value, ProviderError>;
}
