//! The `azurerm_resource_group` resource and data source.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::arm::id::ResourceGroupId;
use crate::arm::location::normalize_location;
use crate::arm::poll::wait_for_operation;
use crate::arm::tags::{expand_tags, flatten_tags, validate_tags};
use crate::error::ProviderError;
use crate::resource::{DataSource, ManagedResource, ResourceContext};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::expect_nonempty_string;

const API_VERSION: &str = "2020-06-01";

/// ARM's naming rules for resource groups.
fn validate_name(value: &Value, path: &str) -> Vec<Diagnostic> {
    let name = match value.as_str() {
        Some(s) => s,
        None => {
            return vec![
                Diagnostic::error(format!("{} must be a string", path)).with_attribute(path),
            ];
        },
    };
    let mut diags = Vec::new();
    if name.is_empty() || name.len() > 90 {
        diags.push(
            Diagnostic::error(format!("{} must be between 1 and 90 characters", path))
                .with_attribute(path),
        );
    }
    if name.ends_with('.') {
        diags.push(
            Diagnostic::error(format!("{} must not end with a period", path)).with_attribute(path),
        );
    }
    if name
        .chars()
        .any(|c| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '(' | ')')))
    {
        diags.push(
            Diagnostic::error(format!(
                "{} may only contain alphanumerics, underscores, parentheses, hyphens and periods",
                path
            ))
            .with_attribute(path),
        );
    }
    diags
}

fn require_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, ProviderError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("{} must be a non-empty string", key)))
}

fn flatten(id: &ResourceGroupId, body: &Value) -> Value {
    json!({
        "id": id.to_string(),
        "name": id.name,
        "location": body
            .get("location")
            .and_then(Value::as_str)
            .map(normalize_location)
            .unwrap_or_default(),
        "tags": flatten_tags(body.get("tags")),
    })
}

/// `azurerm_resource_group`.
pub struct ResourceGroupResource;

#[async_trait]
impl ManagedResource for ResourceGroupResource {
    fn type_name(&self) -> &'static str {
        "azurerm_resource_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::string().computed())
            .with_attribute(
                "name",
                Attribute::string()
                    .required()
                    .force_new()
                    .with_validator(validate_name)
                    .describe("Name of the resource group."),
            )
            .with_attribute(
                "location",
                Attribute::string()
                    .required()
                    .force_new()
                    .describe("Azure location the group's metadata is stored in."),
            )
            .with_attribute(
                "tags",
                Attribute::string_map().optional().with_validator(validate_tags),
            )
    }

    async fn create(
        &self,
        ctx: &ResourceContext<'_>,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let name = require_str(&planned, "name")?;
        let location = require_str(&planned, "location")?;
        let id = ResourceGroupId::new(ctx.subscription_id, name);

        info!(name, location, "creating resource group");
        let body = json!({
            "location": location,
            "tags": expand_tags(planned.get("tags")),
        });
        let response = ctx.api.put(&id.to_string(), API_VERSION, body).await?;
        wait_for_operation(ctx.api, &response, "resource group create", self.timeouts().create)
            .await?;

        let current = ctx.api.get(&id.to_string(), API_VERSION).await?;
        Ok(flatten(&id, &current.body))
    }

    async fn read(
        &self,
        ctx: &ResourceContext<'_>,
        current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let id = ResourceGroupId::parse(require_str(&current, "id")?)?;
        match ctx.api.get(&id.to_string(), API_VERSION).await {
            Ok(response) => Ok(Some(flatten(&id, &response.body))),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(
        &self,
        ctx: &ResourceContext<'_>,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        // Only tags can change without forcing replacement.
        let id = ResourceGroupId::parse(require_str(&prior, "id")?)?;
        let location = require_str(&planned, "location")?;

        let body = json!({
            "location": location,
            "tags": expand_tags(planned.get("tags")),
        });
        let response = ctx.api.put(&id.to_string(), API_VERSION, body).await?;
        Ok(flatten(&id, &response.body))
    }

    async fn delete(&self, ctx: &ResourceContext<'_>, current: Value) -> Result<(), ProviderError> {
        let id = ResourceGroupId::parse(require_str(&current, "id")?)?;
        info!(name = %id.name, "deleting resource group");
        let response = ctx.api.delete(&id.to_string(), API_VERSION).await?;
        wait_for_operation(ctx.api, &response, "resource group delete", self.timeouts().delete)
            .await?;
        Ok(())
    }

    async fn import(&self, ctx: &ResourceContext<'_>, id: &str) -> Result<Value, ProviderError> {
        let id = ResourceGroupId::parse(id)?;
        let response = ctx.api.get(&id.to_string(), API_VERSION).await?;
        Ok(flatten(&id, &response.body))
    }
}

/// `azurerm_resource_group` as a data source.
pub struct ResourceGroupDataSource;

#[async_trait]
impl DataSource for ResourceGroupDataSource {
    fn type_name(&self) -> &'static str {
        "azurerm_resource_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::string().computed())
            .with_attribute(
                "name",
                Attribute::string()
                    .required()
                    .with_validator(expect_nonempty_string),
            )
            .with_attribute("location", Attribute::string().computed())
            .with_attribute("tags", Attribute::string_map().computed())
    }

    async fn read(&self, ctx: &ResourceContext<'_>, config: Value) -> Result<Value, ProviderError> {
        let name = require_str(&config, "name")?;
        let id = ResourceGroupId::new(ctx.subscription_id, name);
        match ctx.api.get(&id.to_string(), API_VERSION).await {
            Ok(response) => Ok(flatten(&id, &response.body)),
            Err(err) if err.is_not_found() => Err(ProviderError::NotFound(format!(
                "resource group {:?} was not found",
                name
            ))),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert!(validate_name(&json!("example-rg_1.0(prod)"), "name").is_empty());
        assert!(!validate_name(&json!(""), "name").is_empty());
        assert!(!validate_name(&json!("ends-with."), "name").is_empty());
        assert!(!validate_name(&json!("no/slashes"), "name").is_empty());
        assert!(!validate_name(&json!("x".repeat(91)), "name").is_empty());
    }

    #[test]
    fn schema_marks_replacement_attributes() {
        let schema = ResourceGroupResource.schema();
        assert!(schema.forces_new("name"));
        assert!(schema.forces_new("location"));
        assert!(!schema.forces_new("tags"));
    }

    #[test]
    fn flatten_normalizes_location() {
        let id = ResourceGroupId::new("sub-1", "example");
        let state = flatten(&id, &json!({"location": "West Europe", "tags": {"env": "prod"}}));
        assert_eq!(state["location"], "westeurope");
        assert_eq!(state["id"], "/subscriptions/sub-1/resourceGroups/example");
        assert_eq!(state["tags"]["env"], "prod");
    }
}
