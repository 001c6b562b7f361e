//! The AzureRM provider: wires the resource registry to the plugin protocol.
//!
//! The provider owns everything resources share: the configured ARM client,
//! the generic plan diff, per-operation timeouts, enhanced location
//! validation, and the rule that a create must produce a non-empty `id`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::arm::auth::ClientSecretCredential;
use crate::arm::location::{fetch_locations, validate_location};
use crate::arm::registration::{ensure_registered, REQUIRED_RESOURCE_PROVIDERS};
use crate::arm::{ArmApi, ArmClient, Environment};
use crate::error::ProviderError;
use crate::resource::{DataSource, ManagedResource, ResourceContext};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, NestingMode, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation;

fn validate_environment(value: &Value, path: &str) -> Vec<Diagnostic> {
    validation::expect_one_of(value, path, &["public", "usgovernment", "china"])
}

/// Partner IDs are GUIDs issued for usage attribution.
fn validate_partner_id(value: &Value, path: &str) -> Vec<Diagnostic> {
    let guid = match value.as_str() {
        Some(s) => s,
        None => {
            return vec![
                Diagnostic::error(format!("{} must be a string", path)).with_attribute(path),
            ];
        },
    };
    let groups: Vec<&str> = guid.split('-').collect();
    let well_formed = groups.len() == 5
        && groups
            .iter()
            .zip([8usize, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()));
    if well_formed {
        Vec::new()
    } else {
        vec![
            Diagnostic::error(format!("{:?} is not a valid GUID", guid)).with_attribute(path),
        ]
    }
}

/// Decoded provider configuration block.
#[derive(Debug, Deserialize)]
struct ProviderConfig {
    subscription_id: String,
    #[serde(default)]
    tenant_id: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    partner_id: Option<String>,
    #[serde(default = "default_environment")]
    environment: String,
    #[serde(default)]
    skip_provider_registration: bool,
    #[serde(default)]
    enhanced_validation: bool,
}

fn default_environment() -> String {
    "public".to_string()
}

/// State established by a successful Configure.
struct Session {
    api: Arc<dyn ArmApi>,
    subscription_id: String,
    /// Normalized location catalog, present when enhanced validation is on.
    locations: Option<Vec<String>>,
}

/// The Azure Resource Manager provider.
pub struct AzureProvider {
    resources: BTreeMap<&'static str, Box<dyn ManagedResource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
    session: RwLock<Option<Arc<Session>>>,
    /// Test seam: when set, Configure uses this instead of a live client.
    injected_api: Option<Arc<dyn ArmApi>>,
}

impl AzureProvider {
    /// A provider with the full resource registry.
    pub fn new() -> Self {
        Self {
            resources: crate::resources::all_resources()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: crate::resources::all_data_sources()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
            session: RwLock::new(None),
            injected_api: None,
        }
    }

    /// A provider whose Configure talks to the given API instead of Azure.
    pub fn with_api(api: Arc<dyn ArmApi>) -> Self {
        Self {
            injected_api: Some(api),
            ..Self::new()
        }
    }

    fn provider_config_schema() -> Schema {
        Schema::v0()
            .with_attribute("subscription_id", Attribute::string().required())
            .with_attribute("tenant_id", Attribute::string().optional())
            .with_attribute("client_id", Attribute::string().optional())
            .with_attribute("client_secret", Attribute::string().optional().sensitive())
            .with_attribute(
                "partner_id",
                Attribute::string().optional().with_validator(validate_partner_id),
            )
            .with_attribute(
                "environment",
                Attribute::string()
                    .optional()
                    .with_default(Value::String("public".to_string()))
                    .with_validator(validate_environment),
            )
            .with_attribute(
                "skip_provider_registration",
                Attribute::bool().optional(),
            )
            .with_attribute("enhanced_validation", Attribute::bool().optional())
    }

    async fn session(&self) -> Result<Arc<Session>, ProviderError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| {
                ProviderError::Configuration("the provider has not been configured".to_string())
            })
    }

    fn resource(&self, type_name: &str) -> Result<&dyn ManagedResource, ProviderError> {
        self.resources
            .get(type_name)
            .map(AsRef::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(type_name)
            .map(AsRef::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    async fn with_deadline<T, F>(
        &self,
        what: &str,
        deadline: Duration,
        fut: F,
    ) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::DeadlineExceeded(format!(
                "{} did not finish within {}s",
                what,
                deadline.as_secs()
            ))),
        }
    }
}

impl Default for AzureProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill schema defaults into a proposed configuration.
fn apply_defaults(schema: &Schema, value: &mut Value) {
    let obj = match value.as_object_mut() {
        Some(obj) => obj,
        None => return,
    };
    for (name, attr) in &schema.block.attributes {
        if let Some(default) = &attr.default {
            let missing = matches!(obj.get(name), None | Some(Value::Null));
            if missing {
                obj.insert(name.clone(), default.clone());
            }
        }
    }
}

/// Project the force-new portion of a block value for comparison.
///
/// Only force-new attributes (and nested blocks that contain them) survive
/// the projection; two values plan an in-place update exactly when their
/// projections are equal.
fn force_new_projection(block: &Block, value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let projected: Vec<Value> = items
                .iter()
                .map(|item| force_new_projection(block, item))
                .filter(|p| !p.is_null())
                .collect();
            if projected.is_empty() {
                Value::Null
            } else {
                Value::Array(projected)
            }
        },
        Value::Object(obj) => {
            let mut out = serde_json::Map::new();
            for (name, attr) in &block.attributes {
                if attr.force_new {
                    if let Some(v) = obj.get(name).filter(|v| !v.is_null()) {
                        out.insert(name.clone(), v.clone());
                    }
                }
            }
            for (name, nested) in &block.blocks {
                if let Some(v) = obj.get(name) {
                    let p = force_new_projection(&nested.block, v);
                    if !p.is_null() {
                        out.insert(name.clone(), p);
                    }
                }
            }
            if out.is_empty() {
                Value::Null
            } else {
                Value::Object(out)
            }
        },
        _ => Value::Null,
    }
}

fn nested_force_new_changed(
    nested: &NestedBlock,
    before: Option<&Value>,
    after: Option<&Value>,
) -> bool {
    let project = |value: Option<&Value>| match (nested.mode, value) {
        (_, None) => Value::Null,
        // Map keys are user-chosen labels, not attribute names.
        (NestingMode::Map, Some(Value::Object(entries))) => {
            let mut out = serde_json::Map::new();
            for (key, entry) in entries {
                let p = force_new_projection(&nested.block, entry);
                if !p.is_null() {
                    out.insert(key.clone(), p);
                }
            }
            if out.is_empty() {
                Value::Null
            } else {
                Value::Object(out)
            }
        },
        (_, Some(value)) => force_new_projection(&nested.block, value),
    };
    project(before) != project(after)
}

/// Diff two top-level states against a schema.
///
/// Computed attributes absent from the proposal carry their prior value
/// forward; a change to any force-new attribute, top-level or inside a
/// nested block, marks the plan as requiring replacement.
fn diff_states(schema: &Schema, prior: &Value, proposed: &mut Value) -> (Vec<AttributeChange>, bool) {
    let mut changes = Vec::new();
    let mut requires_replace = false;

    let prior_obj = prior.as_object().cloned().unwrap_or_default();
    let proposed_obj = match proposed.as_object_mut() {
        Some(obj) => obj,
        None => return (changes, requires_replace),
    };

    // Computed values the config cannot express are not changes.
    for (name, attr) in &schema.block.attributes {
        if attr.computed && !proposed_obj.contains_key(name) {
            if let Some(prior_value) = prior_obj.get(name) {
                proposed_obj.insert(name.clone(), prior_value.clone());
            }
        }
    }

    let mut keys: Vec<String> = prior_obj.keys().cloned().collect();
    for key in proposed_obj.keys() {
        if !prior_obj.contains_key(key) {
            keys.push(key.clone());
        }
    }

    for key in keys {
        let is_computed_only = schema
            .attribute(&key)
            .map(|a| a.computed && !a.required && !a.optional)
            .unwrap_or(false);
        if is_computed_only {
            continue;
        }

        let before = prior_obj.get(&key);
        let after = proposed_obj.get(&key).filter(|v| !v.is_null());
        match (before, after) {
            (None, Some(after)) => {
                changes.push(AttributeChange::added(&key, after.clone()));
            },
            (Some(before), None) => {
                changes.push(AttributeChange::removed(&key, before.clone()));
            },
            (Some(before), Some(after)) if before != after => {
                changes.push(AttributeChange::modified(&key, before.clone(), after.clone()));
            },
            _ => continue,
        }
        if schema.forces_new(&key) {
            requires_replace = true;
        } else if let Some(nested) = schema.block.blocks.get(&key) {
            if nested_force_new_changed(nested, before, after) {
                requires_replace = true;
            }
        }
    }

    (changes, requires_replace)
}

#[async_trait::async_trait]
impl ProviderService for AzureProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(Self::provider_config_schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, data_source) in &self.data_sources {
            schema = schema.with_data_source(*name, data_source.schema());
        }
        schema
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&Self::provider_config_schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validation::validate(&Self::provider_config_schema(), &config);
        if crate::schema::has_errors(&diagnostics) {
            return Ok(diagnostics);
        }
        let config: ProviderConfig = serde_json::from_value(config)?;

        let api: Arc<dyn ArmApi> = match &self.injected_api {
            Some(api) => Arc::clone(api),
            None => {
                let environment = Environment::from_name(&config.environment).ok_or_else(|| {
                    ProviderError::Configuration(format!(
                        "unknown environment {:?}",
                        config.environment
                    ))
                })?;
                let (tenant_id, client_id, client_secret) =
                    match (&config.tenant_id, &config.client_id, &config.client_secret) {
                        (Some(t), Some(c), Some(s)) => (t.clone(), c.clone(), s.clone()),
                        _ => {
                            return Err(ProviderError::Configuration(
                                "tenant_id, client_id and client_secret are required".to_string(),
                            ));
                        },
                    };
                let credential = Arc::new(ClientSecretCredential::new(
                    tenant_id,
                    client_id,
                    client_secret,
                    environment,
                ));
                let mut client = ArmClient::new(credential, environment);
                if let Some(partner_id) = &config.partner_id {
                    client = client.with_partner_id(partner_id);
                }
                Arc::new(client)
            },
        };

        if config.skip_provider_registration {
            info!("skipping resource provider registration");
        } else {
            ensure_registered(
                api.as_ref(),
                &config.subscription_id,
                REQUIRED_RESOURCE_PROVIDERS,
            )
            .await?;
        }

        let locations = if config.enhanced_validation {
            match fetch_locations(api.as_ref(), &config.subscription_id).await {
                Ok(locations) => {
                    info!(count = locations.len(), "cached subscription locations");
                    Some(locations)
                },
                Err(err) => {
                    // Enhanced validation degrades to the basic checks.
                    warn!(error = %err, "failed to fetch the location catalog");
                    None
                },
            }
        } else {
            None
        };

        let session = Session {
            api,
            subscription_id: config.subscription_id,
            locations,
        };
        *self.session.write().await = Some(Arc::new(session));
        Ok(Vec::new())
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        *self.session.write().await = None;
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.resource(resource_type)?.schema();
        let mut diagnostics = validation::validate(&schema, &config);

        // Location membership is only checkable after Configure cached the
        // catalog; before that the schema validators already ran.
        if let Some(session) = self.session.read().await.clone() {
            if let (Some(locations), Some(location)) =
                (&session.locations, config.get("location").filter(|v| !v.is_null()))
            {
                diagnostics.extend(validate_location(location, "location", Some(locations)));
            }
        }
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let _ = config;
        let schema = self.resource(resource_type)?.schema();
        let mut proposed = proposed_state;

        match prior_state {
            None => {
                // Create: defaults apply, every configured attribute is new.
                apply_defaults(&schema, &mut proposed);
                let changes = proposed
                    .as_object()
                    .map(|obj| {
                        obj.iter()
                            .filter(|(_, v)| !v.is_null())
                            .map(|(k, v)| AttributeChange::added(k, v.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(PlanResult::with_changes(proposed, changes, false))
            },
            Some(prior) if proposed.is_null() => {
                // Destroy: everything goes away.
                let changes = prior
                    .as_object()
                    .map(|obj| {
                        obj.iter()
                            .map(|(k, v)| AttributeChange::removed(k, v.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(PlanResult::with_changes(Value::Null, changes, false))
            },
            Some(prior) => {
                apply_defaults(&schema, &mut proposed);
                let (changes, requires_replace) = diff_states(&schema, &prior, &mut proposed);
                if changes.is_empty() {
                    Ok(PlanResult::no_change(prior))
                } else {
                    Ok(PlanResult::with_changes(proposed, changes, requires_replace))
                }
            },
        }
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let session = self.session().await?;
        let ctx = ResourceContext {
            api: session.api.as_ref(),
            subscription_id: &session.subscription_id,
        };

        let state = self
            .with_deadline("create", resource.timeouts().create, resource.create(&ctx, planned_state))
            .await?;

        let id_is_set = state
            .get("id")
            .and_then(Value::as_str)
            .map(|id| !id.is_empty())
            .unwrap_or(false);
        if !id_is_set {
            return Err(ProviderError::Api(crate::arm::ArmError::OperationFailed(
                format!("{} create produced a state without an id", resource_type),
            )));
        }
        Ok(state)
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let session = self.session().await?;
        let ctx = ResourceContext {
            api: session.api.as_ref(),
            subscription_id: &session.subscription_id,
        };

        let state = self
            .with_deadline("read", resource.timeouts().read, resource.read(&ctx, current_state))
            .await?;
        match state {
            Some(state) => Ok(state),
            None => {
                info!(resource_type, "resource no longer exists, clearing state");
                Ok(Value::Null)
            },
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let session = self.session().await?;
        let ctx = ResourceContext {
            api: session.api.as_ref(),
            subscription_id: &session.subscription_id,
        };

        self.with_deadline(
            "update",
            resource.timeouts().update,
            resource.update(&ctx, prior_state, planned_state),
        )
        .await
    }

    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let session = self.session().await?;
        let ctx = ResourceContext {
            api: session.api.as_ref(),
            subscription_id: &session.subscription_id,
        };

        self.with_deadline(
            "delete",
            resource.timeouts().delete,
            resource.delete(&ctx, current_state),
        )
        .await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let session = self.session().await?;
        let ctx = ResourceContext {
            api: session.api.as_ref(),
            subscription_id: &session.subscription_id,
        };

        let state = self
            .with_deadline("import", resource.timeouts().read, resource.import(&ctx, id))
            .await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.data_source(data_source_type)?.schema();
        Ok(validation::validate(&schema, &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let session = self.session().await?;
        let ctx = ResourceContext {
            api: session.api.as_ref(),
            subscription_id: &session.subscription_id,
        };
        data_source.read(&ctx, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rg_schema() -> Schema {
        crate::resources::resource_group::ResourceGroupResource.schema()
    }

    #[tokio::test]
    async fn plan_for_create_lists_added_attributes() {
        let provider = AzureProvider::new();
        let plan = provider
            .plan(
                "azurerm_resource_group",
                None,
                json!({"name": "example", "location": "westeurope"}),
                Value::Null,
            )
            .await
            .unwrap();

        assert_eq!(plan.changes.len(), 2);
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["name"], "example");
    }

    #[tokio::test]
    async fn plan_with_no_difference_reports_no_change() {
        let provider = AzureProvider::new();
        let state = json!({
            "id": "/subscriptions/sub-1/resourceGroups/example",
            "name": "example",
            "location": "westeurope",
            "tags": {"env": "prod"},
        });
        let proposed = json!({
            "name": "example",
            "location": "westeurope",
            "tags": {"env": "prod"},
        });
        let plan = provider
            .plan("azurerm_resource_group", Some(state.clone()), proposed, Value::Null)
            .await
            .unwrap();

        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state, state);
    }

    #[tokio::test]
    async fn plan_carries_computed_id_forward() {
        let provider = AzureProvider::new();
        let prior = json!({
            "id": "/subscriptions/sub-1/resourceGroups/example",
            "name": "example",
            "location": "westeurope",
            "tags": {},
        });
        let proposed = json!({
            "name": "example",
            "location": "westeurope",
            "tags": {"env": "prod"},
        });
        let plan = provider
            .plan("azurerm_resource_group", Some(prior), proposed, Value::Null)
            .await
            .unwrap();

        assert_eq!(plan.planned_state["id"], "/subscriptions/sub-1/resourceGroups/example");
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "tags");
        assert!(!plan.requires_replace);
    }

    #[tokio::test]
    async fn changing_a_force_new_attribute_requires_replacement() {
        let provider = AzureProvider::new();
        let prior = json!({
            "id": "/subscriptions/sub-1/resourceGroups/example",
            "name": "example",
            "location": "westeurope",
        });
        let proposed = json!({"name": "example", "location": "eastus"});
        let plan = provider
            .plan("azurerm_resource_group", Some(prior), proposed, Value::Null)
            .await
            .unwrap();

        assert!(plan.requires_replace);
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "location");
    }

    #[tokio::test]
    async fn changing_a_force_new_nested_attribute_requires_replacement() {
        let provider = AzureProvider::new();
        let prior = json!({
            "id": "/subscriptions/sub-1/providers/Microsoft.Consumption/budgets/monthly",
            "name": "monthly",
            "amount": 500.0,
            "time_grain": "Monthly",
            "time_period": {"start_date": "2026-09-01T00:00:00Z", "end_date": null},
            "notification": [{"operator": "GreaterThan", "threshold": 90.0}],
        });
        let proposed = json!({
            "name": "monthly",
            "amount": 500.0,
            "time_period": {"start_date": "2026-10-01T00:00:00Z"},
            "notification": [{"operator": "GreaterThan", "threshold": 90.0}],
        });
        let plan = provider
            .plan(
                "azurerm_consumption_budget_subscription",
                Some(prior),
                proposed,
                Value::Null,
            )
            .await
            .unwrap();

        assert!(plan.requires_replace);
        assert!(plan.changes.iter().any(|c| c.path == "time_period"));
    }

    #[tokio::test]
    async fn changing_only_an_updatable_nested_attribute_updates_in_place() {
        let provider = AzureProvider::new();
        let prior = json!({
            "id": "/subscriptions/sub-1/providers/Microsoft.Consumption/budgets/monthly",
            "name": "monthly",
            "amount": 500.0,
            "time_grain": "Monthly",
            "time_period": {"start_date": "2026-09-01T00:00:00Z", "end_date": "2026-12-01T00:00:00Z"},
            "notification": [{"operator": "GreaterThan", "threshold": 90.0}],
        });
        let proposed = json!({
            "name": "monthly",
            "amount": 500.0,
            "time_period": {"start_date": "2026-09-01T00:00:00Z", "end_date": "2027-06-01T00:00:00Z"},
            "notification": [{"operator": "GreaterThan", "threshold": 90.0}],
        });
        let plan = provider
            .plan(
                "azurerm_consumption_budget_subscription",
                Some(prior),
                proposed,
                Value::Null,
            )
            .await
            .unwrap();

        assert!(!plan.requires_replace);
        assert!(plan.changes.iter().any(|c| c.path == "time_period"));
    }

    #[tokio::test]
    async fn partner_id_must_be_a_guid() {
        let provider = AzureProvider::new();
        let diags = provider
            .validate_provider_config(json!({
                "subscription_id": "sub-1",
                "partner_id": "6d3ac68c-5f28-4f66-8a0f-a86b1e94a274",
            }))
            .await
            .unwrap();
        assert!(diags.is_empty());

        let diags = provider
            .validate_provider_config(json!({
                "subscription_id": "sub-1",
                "partner_id": "not-a-guid",
            }))
            .await
            .unwrap();
        assert!(crate::schema::has_errors(&diags));
    }

    #[tokio::test]
    async fn destroy_plan_removes_everything() {
        let provider = AzureProvider::new();
        let prior = json!({
            "id": "/subscriptions/sub-1/resourceGroups/example",
            "name": "example",
            "location": "westeurope",
        });
        let plan = provider
            .plan("azurerm_resource_group", Some(prior), Value::Null, Value::Null)
            .await
            .unwrap();

        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes.len(), 3);
    }

    #[tokio::test]
    async fn plan_applies_schema_defaults() {
        let provider = AzureProvider::new();
        let plan = provider
            .plan(
                "azurerm_consumption_budget_subscription",
                None,
                json!({
                    "name": "monthly",
                    "amount": 500.0,
                    "time_period": {"start_date": "2026-09-01T00:00:00Z"},
                    "notification": [{"operator": "GreaterThan", "threshold": 90.0}],
                }),
                Value::Null,
            )
            .await
            .unwrap();
        assert_eq!(plan.planned_state["time_grain"], "Monthly");
    }

    #[tokio::test]
    async fn unknown_resource_type_is_rejected() {
        let provider = AzureProvider::new();
        let err = provider
            .plan("azurerm_widget", None, json!({}), Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn operations_before_configure_fail() {
        let provider = AzureProvider::new();
        let err = provider
            .read("azurerm_resource_group", json!({"id": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn defaults_fill_missing_values_only() {
        let schema = rg_schema().with_attribute(
            "kind",
            Attribute::string().optional().with_default(json!("standard")),
        );
        let mut value = json!({"name": "example", "location": "westeurope"});
        apply_defaults(&schema, &mut value);
        assert_eq!(value["kind"], "standard");

        let mut value = json!({"kind": "premium"});
        apply_defaults(&schema, &mut value);
        assert_eq!(value["kind"], "premium");
    }
}
