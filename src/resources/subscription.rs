//! The `azurerm_subscription` data source.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::resource::{DataSource, ResourceContext};
use crate::schema::{Attribute, Schema};

const API_VERSION: &str = "2020-01-01";

/// `azurerm_subscription`.
///
/// Looks up the configured subscription by default, or any other one the
/// credential can see when `subscription_id` is set.
pub struct SubscriptionDataSource;

#[async_trait]
impl DataSource for SubscriptionDataSource {
    fn type_name(&self) -> &'static str {
        "azurerm_subscription"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::string().computed())
            .with_attribute("subscription_id", Attribute::string().optional_computed())
            .with_attribute("display_name", Attribute::string().computed())
            .with_attribute("state", Attribute::string().computed())
            .with_attribute("tenant_id", Attribute::string().computed())
    }

    async fn read(&self, ctx: &ResourceContext<'_>, config: Value) -> Result<Value, ProviderError> {
        let subscription_id = config
            .get("subscription_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(ctx.subscription_id);

        let path = format!("/subscriptions/{}", subscription_id);
        let response = match ctx.api.get(&path, API_VERSION).await {
            Ok(response) => response,
            Err(err) if err.is_not_found() => {
                return Err(ProviderError::NotFound(format!(
                    "subscription {:?} was not found",
                    subscription_id
                )));
            },
            Err(err) => return Err(err.into()),
        };

        Ok(json!({
            "id": response.body.get("id").cloned().unwrap_or_else(|| json!(path)),
            "subscription_id": subscription_id,
            "display_name": response.body.get("displayName").cloned().unwrap_or_default(),
            "state": response.body.get("state").cloned().unwrap_or_default(),
            "tenant_id": response.body.get("tenantId").cloned().unwrap_or_default(),
        }))
    }
}
