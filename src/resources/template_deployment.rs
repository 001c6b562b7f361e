//! The `azurerm_template_deployment` resource.
//!
//! Deployments are peculiar: deleting the deployment object only removes its
//! history, not the resources the template created. Delete therefore records
//! the deployment's output resources first and then removes each of them,
//! best effort, after the deployment itself is gone.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::arm::id::{DeploymentId, ResourceId};
use crate::arm::poll::{wait_for_operation, StateWaiter};
use crate::arm::ArmApi;
use crate::error::ProviderError;
use crate::resource::{ManagedResource, ResourceContext};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::{expect_json_string, expect_one_of};

const API_VERSION: &str = "2020-06-01";
const PROVIDERS_API_VERSION: &str = "2020-06-01";

fn validate_deployment_mode(value: &Value, path: &str) -> Vec<Diagnostic> {
    expect_one_of(value, path, &["Complete", "Incremental"])
}

fn require_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, ProviderError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("{} must be a non-empty string", key)))
}

/// Wrap configured parameters in the `{"value": ...}` envelope ARM expects.
fn expand_parameters(config: &Value) -> Value {
    let mut out = Map::new();
    if let Some(Value::Object(params)) = config.get("parameters") {
        for (key, value) in params {
            out.insert(key.clone(), json!({ "value": value }));
        }
    }
    Value::Object(out)
}

/// Deployment outputs come back typed; state stores them as strings.
fn flatten_outputs(properties: &Value) -> Value {
    let mut out = Map::new();
    if let Some(Value::Object(outputs)) = properties.get("outputs") {
        for (key, output) in outputs {
            let value = match output.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            out.insert(key.clone(), Value::String(value));
        }
    }
    Value::Object(out)
}

fn flatten(id: &DeploymentId, config: &Value, body: &Value) -> Value {
    let properties = body.get("properties").cloned().unwrap_or(Value::Null);
    json!({
        "id": id.to_string(),
        "name": id.name,
        "resource_group_name": id.resource_group,
        "deployment_mode": config.get("deployment_mode").cloned().unwrap_or_default(),
        "template_body": config.get("template_body").cloned().unwrap_or_default(),
        "parameters": config.get("parameters").cloned().unwrap_or_else(|| json!({})),
        "outputs": flatten_outputs(&properties),
    })
}

/// Resolve a usable api-version for an arbitrary resource ID by asking the
/// resource provider which versions it supports for that type.
async fn api_version_for(api: &dyn ArmApi, id: &ResourceId) -> Result<String, ProviderError> {
    let namespace = id.provider.as_deref().ok_or_else(|| {
        ProviderError::Validation("the resource ID has no provider namespace".to_string())
    })?;
    let response = api
        .get(&format!("/providers/{}", namespace), PROVIDERS_API_VERSION)
        .await?;

    let resource_type = id
        .type_path()
        .ok_or_else(|| ProviderError::Validation("the resource ID has no type".to_string()))?;

    response
        .body
        .get("resourceTypes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|t| {
            t.get("resourceType")
                .and_then(Value::as_str)
                .map(|rt| rt.eq_ignore_ascii_case(&resource_type))
                .unwrap_or(false)
        })
        .and_then(|t| t.get("apiVersions").and_then(Value::as_array))
        .and_then(|versions| versions.first())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::Validation(format!(
                "no api-version found for {}/{}",
                namespace, resource_type
            ))
        })
}

/// `azurerm_template_deployment`.
pub struct TemplateDeploymentResource;

impl TemplateDeploymentResource {
    async fn deploy(
        &self,
        ctx: &ResourceContext<'_>,
        config: &Value,
        timeout: Duration,
    ) -> Result<Value, ProviderError> {
        let id = DeploymentId::new(
            ctx.subscription_id,
            require_str(config, "resource_group_name")?,
            require_str(config, "name")?,
        );
        let template: Value = serde_json::from_str(require_str(config, "template_body")?)?;
        let mode = require_str(config, "deployment_mode")?;

        let body = json!({
            "properties": {
                "template": template,
                "parameters": expand_parameters(config),
                "mode": mode,
            }
        });
        info!(deployment = %id, mode, "starting template deployment");
        ctx.api.put(&id.to_string(), API_VERSION, body).await?;

        let waiter = StateWaiter::new(
            &["Accepted", "Creating", "Running", "Updating"],
            &["Succeeded"],
        )
        .delay(Duration::from_secs(10))
        .timeout(timeout);
        let api = ctx.api;
        let path = id.to_string();
        let final_body = waiter
            .wait("template deployment", || {
                let path = path.clone();
                async move {
                    let response = api.get(&path, API_VERSION).await?;
                    let state = response.provisioning_state().unwrap_or("").to_string();
                    Ok((response.body, state))
                }
            })
            .await?;

        Ok(flatten(&id, config, &final_body))
    }
}

#[async_trait]
impl ManagedResource for TemplateDeploymentResource {
    fn type_name(&self) -> &'static str {
        "azurerm_template_deployment"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::string().computed())
            .with_attribute("name", Attribute::string().required().force_new())
            .with_attribute(
                "resource_group_name",
                Attribute::string().required().force_new(),
            )
            .with_attribute(
                "deployment_mode",
                Attribute::string()
                    .required()
                    .with_validator(validate_deployment_mode)
                    .describe("Complete removes resources outside the template; Incremental leaves them."),
            )
            .with_attribute(
                "template_body",
                Attribute::string().required().with_validator(expect_json_string),
            )
            .with_attribute("parameters", Attribute::string_map().optional())
            .with_attribute("outputs", Attribute::string_map().computed())
    }

    async fn create(
        &self,
        ctx: &ResourceContext<'_>,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.deploy(ctx, &planned, self.timeouts().create).await
    }

    async fn read(
        &self,
        ctx: &ResourceContext<'_>,
        current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let id = DeploymentId::parse(require_str(&current, "id")?)?;
        match ctx.api.get(&id.to_string(), API_VERSION).await {
            Ok(response) => Ok(Some(flatten(&id, &current, &response.body))),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(
        &self,
        ctx: &ResourceContext<'_>,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        // Redeploying the same name replaces the deployment in place.
        self.deploy(ctx, &planned, self.timeouts().update).await
    }

    async fn delete(&self, ctx: &ResourceContext<'_>, current: Value) -> Result<(), ProviderError> {
        let id = DeploymentId::parse(require_str(&current, "id")?)?;

        // Snapshot what the template created before the history disappears.
        let output_resources: Vec<String> = match ctx.api.get(&id.to_string(), API_VERSION).await {
            Ok(response) => response
                .body
                .pointer("/properties/outputResources")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|r| r.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        info!(deployment = %id, resources = output_resources.len(), "deleting template deployment");
        let response = ctx.api.delete(&id.to_string(), API_VERSION).await?;
        wait_for_operation(ctx.api, &response, "deployment delete", self.timeouts().delete).await?;

        for resource in output_resources {
            if let Err(err) = self.delete_output_resource(ctx, &resource).await {
                // Dependency ordering between template resources is unknown
                // here; a failed delete is reported, not fatal.
                warn!(resource = %resource, error = %err, "failed to delete deployment resource");
            }
        }
        Ok(())
    }
}

impl TemplateDeploymentResource {
    async fn delete_output_resource(
        &self,
        ctx: &ResourceContext<'_>,
        resource: &str,
    ) -> Result<(), ProviderError> {
        let id = ResourceId::parse(resource)?;
        let api_version = api_version_for(ctx.api, &id).await?;
        match ctx.api.delete(resource, &api_version).await {
            Ok(response) => {
                wait_for_operation(ctx.api, &response, "resource delete", self.timeouts().delete)
                    .await?;
                Ok(())
            },
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_gain_the_value_envelope() {
        let config = json!({"parameters": {"size": "Standard_B1s", "count": "2"}});
        let expanded = expand_parameters(&config);
        assert_eq!(expanded["size"], json!({"value": "Standard_B1s"}));
        assert_eq!(expanded["count"], json!({"value": "2"}));

        assert_eq!(expand_parameters(&json!({})), json!({}));
    }

    #[test]
    fn outputs_are_flattened_to_strings() {
        let properties = json!({
            "outputs": {
                "hostname": {"type": "String", "value": "example.azure.com"},
                "count": {"type": "Int", "value": 3},
            }
        });
        let outputs = flatten_outputs(&properties);
        assert_eq!(outputs["hostname"], "example.azure.com");
        assert_eq!(outputs["count"], "3");
    }

    #[test]
    fn deployment_mode_values() {
        assert!(validate_deployment_mode(&json!("Complete"), "deployment_mode").is_empty());
        assert!(validate_deployment_mode(&json!("Incremental"), "deployment_mode").is_empty());
        assert!(!validate_deployment_mode(&json!("Partial"), "deployment_mode").is_empty());
    }

    #[test]
    fn schema_requires_valid_template_json() {
        let schema = TemplateDeploymentResource.schema();
        let attr = schema.attribute("template_body").unwrap();
        let validator = attr.validator.unwrap();
        assert!(validator(&json!("{}"), "template_body").is_empty());
        assert!(!validator(&json!("{oops"), "template_body").is_empty());
    }
}
