//! End-to-end provider lifecycles against an in-memory ARM control plane.

use std::sync::Arc;

use serde_json::json;

use hemmer_provider_azurerm::error::ProviderError;
use hemmer_provider_azurerm::testing::{
    assert_error_contains, assert_plan_changes_attribute, assert_plan_replaces,
    assert_plan_updates_in_place, MockArm, ProviderTester, TestError,
};
use hemmer_provider_azurerm::AzureProvider;

fn tester(mock: Arc<MockArm>) -> ProviderTester<AzureProvider> {
    ProviderTester::new(AzureProvider::with_api(mock))
}

async fn configured_tester(mock: Arc<MockArm>) -> ProviderTester<AzureProvider> {
    let tester = tester(mock);
    tester
        .configure(json!({
            "subscription_id": "sub-1",
            "skip_provider_registration": true,
        }))
        .await
        .unwrap();
    tester
}

#[tokio::test]
async fn provider_config_requires_a_subscription() {
    let tester = tester(Arc::new(MockArm::new()));
    let err = tester
        .validate_provider_config(json!({"environment": "public"}))
        .await
        .unwrap_err();
    match err {
        TestError::Diagnostics(diags) => assert_error_contains(&diags, "subscription_id"),
        other => panic!("expected diagnostics, got {}", other),
    }
}

#[tokio::test]
async fn configure_rejects_unknown_environments() {
    let tester = tester(Arc::new(MockArm::new()));
    let err = tester
        .configure(json!({"subscription_id": "sub-1", "environment": "mars"}))
        .await
        .unwrap_err();
    match err {
        TestError::Diagnostics(diags) => assert_error_contains(&diags, "environment"),
        other => panic!("expected diagnostics, got {}", other),
    }
}

#[tokio::test]
async fn schema_covers_the_full_registry() {
    let tester = tester(Arc::new(MockArm::new()));
    let schema = tester.schema();
    for resource in [
        "azurerm_resource_group",
        "azurerm_consumption_budget_resource_group",
        "azurerm_consumption_budget_subscription",
        "azurerm_template_deployment",
    ] {
        assert!(schema.resources.contains_key(resource), "missing {}", resource);
    }
    for data_source in ["azurerm_resource_group", "azurerm_subscription"] {
        assert!(
            schema.data_sources.contains_key(data_source),
            "missing data source {}",
            data_source
        );
    }
}

#[tokio::test]
async fn resource_group_full_lifecycle() {
    let mock = Arc::new(MockArm::new());
    let tester = configured_tester(mock.clone()).await;

    let state = tester
        .lifecycle_create(
            "azurerm_resource_group",
            json!({
                "name": "example",
                "location": "westeurope",
                "tags": {"env": "prod"},
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "/subscriptions/sub-1/resourceGroups/example");
    assert_eq!(state["location"], "westeurope");
    assert_eq!(state["tags"]["env"], "prod");
    assert!(mock.contains("/subscriptions/sub-1/resourceGroups/example"));

    // Tag changes update in place.
    let mut proposed = state.clone();
    proposed["tags"] = json!({"env": "prod", "owner": "ops"});
    let plan = tester
        .plan_update("azurerm_resource_group", state.clone(), proposed)
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "tags");

    let updated = tester
        .update("azurerm_resource_group", state, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(updated["tags"]["owner"], "ops");

    tester
        .lifecycle_delete("azurerm_resource_group", updated.clone())
        .await
        .unwrap();
    assert!(!mock.contains("/subscriptions/sub-1/resourceGroups/example"));

    // A read after the delete clears the state.
    let cleared = tester
        .read("azurerm_resource_group", updated)
        .await
        .unwrap();
    assert!(cleared.is_null());
}

#[tokio::test]
async fn resource_group_location_change_forces_replacement() {
    let tester = configured_tester(Arc::new(MockArm::new())).await;
    let state = tester
        .lifecycle_create(
            "azurerm_resource_group",
            json!({"name": "example", "location": "westeurope"}),
        )
        .await
        .unwrap();

    let mut proposed = state.clone();
    proposed["location"] = json!("eastus");
    let plan = tester
        .plan_update("azurerm_resource_group", state, proposed)
        .await
        .unwrap();
    assert_plan_replaces(&plan);
}

#[tokio::test]
async fn resource_group_budget_lifecycle() {
    let mock = Arc::new(MockArm::new());
    let tester = configured_tester(mock.clone()).await;

    let config = json!({
        "name": "monthly",
        "resource_group_name": "example",
        "amount": 1000.0,
        "time_period": {"start_date": "2026-09-01T00:00:00Z"},
        "notification": [{
            "operator": "GreaterThan",
            "threshold": 90.0,
            "contact_emails": ["ops@example.com"],
        }],
    });
    tester
        .validate_resource_config("azurerm_consumption_budget_resource_group", config.clone())
        .await
        .unwrap();

    let state = tester
        .lifecycle_create("azurerm_consumption_budget_resource_group", config)
        .await
        .unwrap();
    assert_eq!(
        state["id"],
        "/subscriptions/sub-1/resourceGroups/example/providers/Microsoft.Consumption/budgets/monthly"
    );
    // The time grain default applied during planning.
    assert_eq!(state["time_grain"], "Monthly");
    assert_eq!(state["notification"][0]["operator"], "GreaterThan");
    assert_eq!(state["notification"][0]["threshold_type"], "Actual");

    tester
        .lifecycle_delete("azurerm_consumption_budget_resource_group", state)
        .await
        .unwrap();
    assert!(!mock.contains(
        "/subscriptions/sub-1/resourceGroups/example/providers/Microsoft.Consumption/budgets/monthly"
    ));
}

#[tokio::test]
async fn subscription_budget_lifecycle() {
    let tester = configured_tester(Arc::new(MockArm::new())).await;

    let state = tester
        .lifecycle_create(
            "azurerm_consumption_budget_subscription",
            json!({
                "name": "quarterly",
                "amount": 5000.0,
                "time_grain": "Quarterly",
                "time_period": {"start_date": "2026-10-01T00:00:00Z"},
                "notification": [{"operator": "EqualTo", "threshold": 100.0}],
            }),
        )
        .await
        .unwrap();
    assert_eq!(
        state["id"],
        "/subscriptions/sub-1/providers/Microsoft.Consumption/budgets/quarterly"
    );
    assert_eq!(state["time_grain"], "Quarterly");
    assert!(state.get("resource_group_name").is_none());
}

#[tokio::test]
async fn budget_amount_change_updates_in_place() {
    let tester = configured_tester(Arc::new(MockArm::new())).await;
    let state = tester
        .lifecycle_create(
            "azurerm_consumption_budget_subscription",
            json!({
                "name": "monthly",
                "amount": 500.0,
                "time_period": {"start_date": "2026-09-01T00:00:00Z"},
                "notification": [{"operator": "GreaterThan", "threshold": 80.0}],
            }),
        )
        .await
        .unwrap();

    let mut proposed = state.clone();
    proposed["amount"] = json!(750.0);
    let plan = tester
        .plan_update("azurerm_consumption_budget_subscription", state.clone(), proposed)
        .await
        .unwrap();
    assert_plan_updates_in_place(&plan);
    assert_plan_changes_attribute(&plan, "amount");

    let updated = tester
        .update("azurerm_consumption_budget_subscription", state, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(updated["amount"], 750.0);
}

#[tokio::test]
async fn budget_start_date_change_forces_replacement() {
    let tester = configured_tester(Arc::new(MockArm::new())).await;
    let state = tester
        .lifecycle_create(
            "azurerm_consumption_budget_subscription",
            json!({
                "name": "monthly",
                "amount": 500.0,
                "time_period": {"start_date": "2026-09-01T00:00:00Z"},
                "notification": [{"operator": "GreaterThan", "threshold": 80.0}],
            }),
        )
        .await
        .unwrap();

    let mut proposed = state.clone();
    proposed["time_period"]["start_date"] = json!("2026-10-01T00:00:00Z");
    let plan = tester
        .plan_update("azurerm_consumption_budget_subscription", state, proposed)
        .await
        .unwrap();
    assert_plan_replaces(&plan);
    assert_plan_changes_attribute(&plan, "time_period");
}

#[tokio::test]
async fn budget_import_round_trips() {
    let tester = configured_tester(Arc::new(MockArm::new())).await;
    let created = tester
        .lifecycle_create(
            "azurerm_consumption_budget_resource_group",
            json!({
                "name": "monthly",
                "resource_group_name": "example",
                "amount": 1000.0,
                "time_period": {"start_date": "2026-09-01T00:00:00Z"},
                "notification": [{"operator": "GreaterThan", "threshold": 90.0}],
            }),
        )
        .await
        .unwrap();

    let imported = tester
        .import_resource(
            "azurerm_consumption_budget_resource_group",
            created["id"].as_str().unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].state["name"], "monthly");
    assert_eq!(imported[0].state["resource_group_name"], "example");
}

#[tokio::test]
async fn budget_import_rejects_the_wrong_scope() {
    let tester = configured_tester(Arc::new(MockArm::new())).await;
    let err = tester
        .import_resource(
            "azurerm_consumption_budget_subscription",
            "/subscriptions/sub-1/resourceGroups/example/providers/Microsoft.Consumption/budgets/monthly",
        )
        .await
        .unwrap_err();
    match err {
        ProviderError::Validation(message) => {
            assert!(message.contains("azurerm_consumption_budget_resource_group"));
        },
        other => panic!("expected a validation error, got {}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn template_deployment_lifecycle_cleans_up_created_resources() {
    let mock = Arc::new(MockArm::new());
    let tester = configured_tester(mock.clone()).await;

    let storage_id =
        "/subscriptions/sub-1/resourceGroups/example/providers/Microsoft.Storage/storageAccounts/acct1";
    let deployment_id =
        "/subscriptions/sub-1/resourceGroups/example/providers/Microsoft.Resources/deployments/deploy-1";

    // What the "deployed" template produced, staged ahead of the PUT.
    mock.insert(
        deployment_id,
        json!({
            "properties": {
                "outputs": {"hostname": {"type": "String", "value": "acct1.blob.core.windows.net"}},
                "outputResources": [{"id": storage_id}],
            }
        }),
    );
    mock.insert(storage_id, json!({"location": "westeurope"}));
    mock.insert(
        "/providers/Microsoft.Storage",
        json!({
            "resourceTypes": [
                {"resourceType": "storageAccounts", "apiVersions": ["2021-09-01", "2021-08-01"]},
            ]
        }),
    );

    let state = tester
        .lifecycle_create(
            "azurerm_template_deployment",
            json!({
                "name": "deploy-1",
                "resource_group_name": "example",
                "deployment_mode": "Incremental",
                "template_body": "{\"resources\": []}",
                "parameters": {"accountName": "acct1"},
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], deployment_id);
    assert_eq!(state["outputs"]["hostname"], "acct1.blob.core.windows.net");
    assert_eq!(state["deployment_mode"], "Incremental");

    tester
        .lifecycle_delete("azurerm_template_deployment", state)
        .await
        .unwrap();
    assert!(!mock.contains(deployment_id));
    // Deleting the deployment also removed what the template created.
    assert!(!mock.contains(storage_id));
}

#[tokio::test]
async fn template_deployment_requires_valid_template_json() {
    let tester = configured_tester(Arc::new(MockArm::new())).await;
    let diags = tester
        .resource_diagnostics(
            "azurerm_template_deployment",
            json!({
                "name": "deploy-1",
                "resource_group_name": "example",
                "deployment_mode": "Incremental",
                "template_body": "{not json",
            }),
        )
        .await
        .unwrap();
    assert_error_contains(&diags, "template_body");
}

#[tokio::test]
async fn resource_group_data_source_reads_existing_groups() {
    let tester = configured_tester(Arc::new(MockArm::new())).await;
    tester
        .lifecycle_create(
            "azurerm_resource_group",
            json!({"name": "example", "location": "westeurope", "tags": {"env": "prod"}}),
        )
        .await
        .unwrap();

    let state = tester
        .read_data_source("azurerm_resource_group", json!({"name": "example"}))
        .await
        .unwrap();
    assert_eq!(state["location"], "westeurope");
    assert_eq!(state["tags"]["env"], "prod");

    let err = tester
        .read_data_source("azurerm_resource_group", json!({"name": "missing"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

#[tokio::test]
async fn subscription_data_source_reads_the_configured_subscription() {
    let mock = Arc::new(MockArm::new());
    mock.insert(
        "/subscriptions/sub-1",
        json!({
            "id": "/subscriptions/sub-1",
            "displayName": "Example Subscription",
            "state": "Enabled",
            "tenantId": "tenant-1",
        }),
    );
    let tester = configured_tester(mock).await;

    let state = tester
        .read_data_source("azurerm_subscription", json!({}))
        .await
        .unwrap();
    assert_eq!(state["subscription_id"], "sub-1");
    assert_eq!(state["display_name"], "Example Subscription");
    assert_eq!(state["tenant_id"], "tenant-1");
}

#[tokio::test]
async fn enhanced_validation_checks_the_location_catalog() {
    let mock = Arc::new(MockArm::new());
    mock.insert(
        "/subscriptions/sub-1/locations",
        json!({"value": [{"name": "West Europe"}, {"name": "UK South"}]}),
    );
    let tester = tester(mock);
    tester
        .configure(json!({
            "subscription_id": "sub-1",
            "skip_provider_registration": true,
            "enhanced_validation": true,
        }))
        .await
        .unwrap();

    // Display-form casing still matches the catalog.
    tester
        .validate_resource_config(
            "azurerm_resource_group",
            json!({"name": "example", "location": "West Europe"}),
        )
        .await
        .unwrap();

    let diags = tester
        .resource_diagnostics(
            "azurerm_resource_group",
            json!({"name": "example", "location": "mars-north"}),
        )
        .await
        .unwrap();
    assert_error_contains(&diags, "not a valid location");
}

#[tokio::test]
async fn configure_registers_missing_resource_providers() {
    let mock = Arc::new(MockArm::new());
    mock.insert(
        "/subscriptions/sub-1/providers",
        json!({
            "value": [
                {"namespace": "Microsoft.Resources", "registrationState": "Registered"},
                {"namespace": "Microsoft.Consumption", "registrationState": "NotRegistered"},
            ]
        }),
    );
    let tester = tester(mock);
    tester
        .configure(json!({"subscription_id": "sub-1"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn operations_fail_before_configure() {
    let tester = tester(Arc::new(MockArm::new()));
    let err = tester
        .read("azurerm_resource_group", json!({"id": "x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Configuration(_)));
}

#[tokio::test]
async fn crud_helper_runs_the_whole_cycle() {
    let mock = Arc::new(MockArm::new());
    let tester = configured_tester(mock.clone()).await;

    let updated = tester
        .lifecycle_crud(
            "azurerm_resource_group",
            json!({"name": "cycle", "location": "uksouth", "tags": {"env": "dev"}}),
            json!({"name": "cycle", "location": "uksouth", "tags": {"env": "staging"}}),
        )
        .await
        .unwrap();
    assert_eq!(updated["tags"]["env"], "staging");
    assert!(!mock.contains("/subscriptions/sub-1/resourceGroups/cycle"));
}
