//! The consumption budget resources, at subscription and resource group scope.
//!
//! Both scopes share one schema and one wire shape; only the ARM scope the
//! budget is attached to differs. Notifications are sent to ARM as a map
//! keyed `<operator>-<threshold>`, which keeps the key stable for a given
//! notification block across updates.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::arm::id::BudgetId;
use crate::arm::ArmApi;
use crate::error::ProviderError;
use crate::resource::{ManagedResource, ResourceContext};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};
use crate::validation::{expect_float_between, expect_one_of};

const API_VERSION: &str = "2019-10-01";

const TIME_GRAINS: &[&str] = &[
    "Monthly",
    "Quarterly",
    "Annually",
    "BillingMonth",
    "BillingQuarter",
    "BillingAnnual",
];
const OPERATORS: &[&str] = &["EqualTo", "GreaterThan", "GreaterThanOrEqualTo"];
const THRESHOLD_TYPES: &[&str] = &["Actual", "Forecasted"];

fn validate_time_grain(value: &Value, path: &str) -> Vec<Diagnostic> {
    expect_one_of(value, path, TIME_GRAINS)
}

fn validate_operator(value: &Value, path: &str) -> Vec<Diagnostic> {
    expect_one_of(value, path, OPERATORS)
}

fn validate_threshold(value: &Value, path: &str) -> Vec<Diagnostic> {
    expect_float_between(value, path, 0.0, 1000.0)
}

fn validate_threshold_type(value: &Value, path: &str) -> Vec<Diagnostic> {
    expect_one_of(value, path, THRESHOLD_TYPES)
}

/// Budget periods start on the first of a month.
fn validate_start_date(value: &Value, path: &str) -> Vec<Diagnostic> {
    let raw = match value.as_str() {
        Some(s) => s,
        None => {
            return vec![
                Diagnostic::error(format!("{} must be a string", path)).with_attribute(path),
            ];
        },
    };
    let parsed: DateTime<FixedOffset> = match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            return vec![Diagnostic::error(format!(
                "{} must be an RFC3339 timestamp",
                path
            ))
            .with_detail(err.to_string())
            .with_attribute(path)];
        },
    };
    if parsed.day() != 1 {
        return vec![Diagnostic::error(format!(
            "{} must be the first day of a month",
            path
        ))
        .with_attribute(path)];
    }
    Vec::new()
}

fn budget_schema(group_scoped: bool) -> Schema {
    let notification = Block::new()
        .with_attribute(
            "enabled",
            Attribute::bool().optional().with_default(json!(true)),
        )
        .with_attribute(
            "operator",
            Attribute::string().required().with_validator(validate_operator),
        )
        .with_attribute(
            "threshold",
            Attribute::float().required().with_validator(validate_threshold),
        )
        .with_attribute(
            "threshold_type",
            Attribute::string()
                .optional()
                .with_default(json!("Actual"))
                .with_validator(validate_threshold_type),
        )
        .with_attribute("contact_emails", Attribute::string_list().optional())
        .with_attribute("contact_groups", Attribute::string_list().optional())
        .with_attribute("contact_roles", Attribute::string_list().optional());

    let filter_clause = |value_key: &str| {
        Block::new()
            .with_attribute("name", Attribute::string().required())
            .with_attribute(
                "operator",
                Attribute::string().optional().with_default(json!("In")),
            )
            .with_attribute(value_key, Attribute::string_list().required())
    };

    let filter = Block::new()
        .with_block("dimension", NestedBlock::set(filter_clause("values")))
        .with_block("tag", NestedBlock::set(filter_clause("values")));

    let time_period = Block::new()
        .with_attribute(
            "start_date",
            Attribute::string()
                .required()
                .force_new()
                .with_validator(validate_start_date),
        )
        .with_attribute("end_date", Attribute::string().optional_computed());

    let mut schema = Schema::v0()
        .with_attribute("id", Attribute::string().computed())
        .with_attribute("name", Attribute::string().required().force_new())
        .with_attribute("amount", Attribute::float().required())
        .with_attribute(
            "time_grain",
            Attribute::string()
                .optional()
                .force_new()
                .with_default(json!("Monthly"))
                .with_validator(validate_time_grain),
        )
        .with_block(
            "time_period",
            NestedBlock::single(time_period).min_items(1),
        )
        .with_block("filter", NestedBlock::single(filter))
        .with_block(
            "notification",
            NestedBlock::set(notification).min_items(1).max_items(5),
        );

    if group_scoped {
        schema = schema.with_attribute(
            "resource_group_name",
            Attribute::string().required().force_new(),
        );
    }
    schema
}

fn require_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, ProviderError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("{} must be a non-empty string", key)))
}

fn expand_time_period(config: &Value) -> Result<Value, ProviderError> {
    let period = config
        .get("time_period")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ProviderError::Validation("time_period block is required".to_string()))?;
    let mut out = Map::new();
    out.insert(
        "startDate".to_string(),
        Value::String(require_str(period, "start_date")?.to_string()),
    );
    if let Some(end) = period.get("end_date").and_then(Value::as_str) {
        out.insert("endDate".to_string(), Value::String(end.to_string()));
    }
    Ok(Value::Object(out))
}

fn expand_filter_clause(block: &Value, kind: &str) -> Value {
    json!({
        kind: {
            "name": block.get("name").and_then(Value::as_str).unwrap_or_default(),
            "operator": block.get("operator").and_then(Value::as_str).unwrap_or("In"),
            "values": block.get("values").cloned().unwrap_or_else(|| json!([])),
        }
    })
}

/// One clause goes inline; several are combined with `and`, which is the
/// only logical operator the Consumption API accepts.
fn expand_filter(config: &Value) -> Option<Value> {
    let filter = config.get("filter").filter(|v| v.is_object())?;
    let mut clauses = Vec::new();
    for (key, kind) in [("dimension", "dimensions"), ("tag", "tags")] {
        if let Some(blocks) = filter.get(key).and_then(Value::as_array) {
            for block in blocks {
                clauses.push(expand_filter_clause(block, kind));
            }
        }
    }
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "and": clauses })),
    }
}

fn notification_key(notification: &Value) -> String {
    let operator = notification
        .get("operator")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let threshold = notification
        .get("threshold")
        .and_then(Value::as_f64)
        .unwrap_or_default();
    format!("{}-{}", operator, threshold)
}

fn expand_notifications(config: &Value) -> Result<Value, ProviderError> {
    let blocks = config
        .get("notification")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ProviderError::Validation("at least one notification block is required".to_string())
        })?;

    let mut out = Map::new();
    for block in blocks {
        let mut notification = Map::new();
        notification.insert(
            "enabled".to_string(),
            block.get("enabled").cloned().unwrap_or(Value::Bool(true)),
        );
        notification.insert(
            "operator".to_string(),
            Value::String(require_str(block, "operator")?.to_string()),
        );
        notification.insert(
            "threshold".to_string(),
            block.get("threshold").cloned().unwrap_or(json!(0.0)),
        );
        notification.insert(
            "thresholdType".to_string(),
            block
                .get("threshold_type")
                .cloned()
                .unwrap_or_else(|| json!("Actual")),
        );
        for (config_key, wire_key) in [
            ("contact_emails", "contactEmails"),
            ("contact_groups", "contactGroups"),
            ("contact_roles", "contactRoles"),
        ] {
            notification.insert(
                wire_key.to_string(),
                block.get(config_key).cloned().unwrap_or_else(|| json!([])),
            );
        }
        out.insert(notification_key(block), Value::Object(notification));
    }
    Ok(Value::Object(out))
}

fn expand_budget(config: &Value) -> Result<Value, ProviderError> {
    let amount = config
        .get("amount")
        .and_then(Value::as_f64)
        .ok_or_else(|| ProviderError::Validation("amount must be a number".to_string()))?;
    let time_grain = config
        .get("time_grain")
        .and_then(Value::as_str)
        .unwrap_or("Monthly");

    let mut properties = Map::new();
    properties.insert("category".to_string(), json!("Cost"));
    properties.insert("amount".to_string(), json!(amount));
    properties.insert("timeGrain".to_string(), json!(time_grain));
    properties.insert("timePeriod".to_string(), expand_time_period(config)?);
    if let Some(filter) = expand_filter(config) {
        properties.insert("filter".to_string(), filter);
    }
    properties.insert("notifications".to_string(), expand_notifications(config)?);

    Ok(json!({ "properties": Value::Object(properties) }))
}

fn flatten_filter_clause(clause: &Value, dimensions: &mut Vec<Value>, tags: &mut Vec<Value>) {
    for (wire_key, out) in [("dimensions", &mut *dimensions), ("tags", &mut *tags)] {
        if let Some(body) = clause.get(wire_key) {
            out.push(json!({
                "name": body.get("name").cloned().unwrap_or_default(),
                "operator": body.get("operator").cloned().unwrap_or_else(|| json!("In")),
                "values": body.get("values").cloned().unwrap_or_else(|| json!([])),
            }));
        }
    }
}

fn flatten_filter(filter: Option<&Value>) -> Option<Value> {
    let filter = filter.filter(|v| v.is_object())?;
    let mut dimensions = Vec::new();
    let mut tags = Vec::new();

    match filter.get("and").and_then(Value::as_array) {
        Some(clauses) => {
            for clause in clauses {
                flatten_filter_clause(clause, &mut dimensions, &mut tags);
            }
        },
        None => flatten_filter_clause(filter, &mut dimensions, &mut tags),
    }

    if dimensions.is_empty() && tags.is_empty() {
        return None;
    }
    Some(json!({ "dimension": dimensions, "tag": tags }))
}

fn flatten_notifications(notifications: Option<&Value>) -> Value {
    let mut out = Vec::new();
    if let Some(Value::Object(map)) = notifications {
        // BTree-ordered keys keep the flattened set deterministic.
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            let n = &map[key];
            out.push(json!({
                "enabled": n.get("enabled").cloned().unwrap_or(Value::Bool(true)),
                "operator": n.get("operator").cloned().unwrap_or_default(),
                "threshold": n.get("threshold").cloned().unwrap_or_default(),
                "threshold_type": n.get("thresholdType").cloned().unwrap_or_else(|| json!("Actual")),
                "contact_emails": n.get("contactEmails").cloned().unwrap_or_else(|| json!([])),
                "contact_groups": n.get("contactGroups").cloned().unwrap_or_else(|| json!([])),
                "contact_roles": n.get("contactRoles").cloned().unwrap_or_else(|| json!([])),
            }));
        }
    }
    Value::Array(out)
}

fn flatten_budget(id: &BudgetId, body: &Value) -> Value {
    let properties = body.get("properties").cloned().unwrap_or(Value::Null);
    let time_period = properties.get("timePeriod").cloned().unwrap_or(Value::Null);

    let mut state = Map::new();
    state.insert("id".to_string(), json!(id.to_string()));
    state.insert("name".to_string(), json!(id.name));
    if let Some(rg) = &id.resource_group {
        state.insert("resource_group_name".to_string(), json!(rg));
    }
    state.insert(
        "amount".to_string(),
        properties.get("amount").cloned().unwrap_or_default(),
    );
    state.insert(
        "time_grain".to_string(),
        properties
            .get("timeGrain")
            .cloned()
            .unwrap_or_else(|| json!("Monthly")),
    );
    state.insert(
        "time_period".to_string(),
        json!({
            "start_date": time_period.get("startDate").cloned().unwrap_or_default(),
            "end_date": time_period.get("endDate").cloned().unwrap_or_default(),
        }),
    );
    if let Some(filter) = flatten_filter(properties.get("filter")) {
        state.insert("filter".to_string(), filter);
    }
    state.insert(
        "notification".to_string(),
        flatten_notifications(properties.get("notifications")),
    );
    Value::Object(state)
}

async fn upsert_budget(
    api: &dyn ArmApi,
    id: &BudgetId,
    config: &Value,
) -> Result<Value, ProviderError> {
    let body = expand_budget(config)?;
    info!(budget = %id, "writing consumption budget");
    let response = api.put(&id.to_string(), API_VERSION, body).await?;
    Ok(flatten_budget(id, &response.body))
}

async fn read_budget(api: &dyn ArmApi, id: &BudgetId) -> Result<Option<Value>, ProviderError> {
    match api.get(&id.to_string(), API_VERSION).await {
        Ok(response) => Ok(Some(flatten_budget(id, &response.body))),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn delete_budget(api: &dyn ArmApi, id: &BudgetId) -> Result<(), ProviderError> {
    info!(budget = %id, "deleting consumption budget");
    api.delete(&id.to_string(), API_VERSION).await?;
    Ok(())
}

/// `azurerm_consumption_budget_resource_group`.
pub struct ResourceGroupBudgetResource;

impl ResourceGroupBudgetResource {
    fn id_from(&self, ctx: &ResourceContext<'_>, config: &Value) -> Result<BudgetId, ProviderError> {
        Ok(BudgetId::resource_group(
            ctx.subscription_id,
            require_str(config, "resource_group_name")?,
            require_str(config, "name")?,
        ))
    }
}

#[async_trait]
impl ManagedResource for ResourceGroupBudgetResource {
    fn type_name(&self) -> &'static str {
        "azurerm_consumption_budget_resource_group"
    }

    fn schema(&self) -> Schema {
        budget_schema(true)
    }

    async fn create(
        &self,
        ctx: &ResourceContext<'_>,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let id = self.id_from(ctx, &planned)?;
        upsert_budget(ctx.api, &id, &planned).await
    }

    async fn read(
        &self,
        ctx: &ResourceContext<'_>,
        current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let id = BudgetId::parse(require_str(&current, "id")?)?;
        read_budget(ctx.api, &id).await
    }

    async fn update(
        &self,
        ctx: &ResourceContext<'_>,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let id = BudgetId::parse(require_str(&prior, "id")?)?;
        upsert_budget(ctx.api, &id, &planned).await
    }

    async fn delete(&self, ctx: &ResourceContext<'_>, current: Value) -> Result<(), ProviderError> {
        let id = BudgetId::parse(require_str(&current, "id")?)?;
        delete_budget(ctx.api, &id).await
    }

    async fn import(&self, ctx: &ResourceContext<'_>, id: &str) -> Result<Value, ProviderError> {
        let id = BudgetId::parse(id)?;
        if id.resource_group.is_none() {
            return Err(ProviderError::Validation(
                "the ID is a subscription-scoped budget; import it as \
                 azurerm_consumption_budget_subscription"
                    .to_string(),
            ));
        }
        read_budget(ctx.api, &id).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("budget {:?} was not found", id.to_string()))
        })
    }
}

/// `azurerm_consumption_budget_subscription`.
pub struct SubscriptionBudgetResource;

#[async_trait]
impl ManagedResource for SubscriptionBudgetResource {
    fn type_name(&self) -> &'static str {
        "azurerm_consumption_budget_subscription"
    }

    fn schema(&self) -> Schema {
        budget_schema(false)
    }

    async fn create(
        &self,
        ctx: &ResourceContext<'_>,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let id = BudgetId::subscription(ctx.subscription_id, require_str(&planned, "name")?);
        upsert_budget(ctx.api, &id, &planned).await
    }

    async fn read(
        &self,
        ctx: &ResourceContext<'_>,
        current: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let id = BudgetId::parse(require_str(&current, "id")?)?;
        read_budget(ctx.api, &id).await
    }

    async fn update(
        &self,
        ctx: &ResourceContext<'_>,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let id = BudgetId::parse(require_str(&prior, "id")?)?;
        upsert_budget(ctx.api, &id, &planned).await
    }

    async fn delete(&self, ctx: &ResourceContext<'_>, current: Value) -> Result<(), ProviderError> {
        let id = BudgetId::parse(require_str(&current, "id")?)?;
        delete_budget(ctx.api, &id).await
    }

    async fn import(&self, ctx: &ResourceContext<'_>, id: &str) -> Result<Value, ProviderError> {
        let id = BudgetId::parse(id)?;
        if id.resource_group.is_some() {
            return Err(ProviderError::Validation(
                "the ID is a resource-group-scoped budget; import it as \
                 azurerm_consumption_budget_resource_group"
                    .to_string(),
            ));
        }
        read_budget(ctx.api, &id).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("budget {:?} was not found", id.to_string()))
        })
    }
}
