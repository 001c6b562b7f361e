//! Test harness for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] directly, without a gRPC
//! server in between. [`MockArm`] is an in-memory [`ArmApi`] so full CRUD
//! lifecycles run deterministically against a fake control plane.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::arm::{ArmApi, ArmError, ArmResponse};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Drives provider operations in tests.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Registered resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Registered data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Validate provider configuration, failing on error diagnostics.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.validate_provider_config(config).await?)
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Validate a resource configuration, failing on error diagnostics.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Raw diagnostics from resource validation.
    pub async fn resource_diagnostics(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider
            .validate_resource_config(resource_type, config)
            .await
    }

    /// Plan a create (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan an update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a destroy.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import a resource by remote ID.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read_data_source(data_source_type, config).await
    }

    /// Plan, create, then read back. Returns the post-read state.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the post-read state.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Plan a destroy, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let _ = self.plan_delete(resource_type, current_state.clone()).await?;
        self.delete(resource_type, current_state).await
    }

    /// Create, update, delete. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Failure of a test operation that reports diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation returned error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed outright.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(Diagnostic::is_error)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that a plan reports no changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "expected no changes, got {:?}",
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(plan.requires_replace, "expected the plan to require replacement");
}

/// Assert that a plan updates in place.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "expected an in-place update, got a replacement"
    );
}

/// Assert that a plan changes the given attribute path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "expected a change to {:?}, changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that no diagnostic is an error.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();
    assert!(
        errors.is_empty(),
        "expected no errors, got: {:?}",
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that some error diagnostic contains the substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "expected an error containing {:?}, errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

/// In-memory [`ArmApi`] keyed by lowercased resource path.
///
/// PUT stores the body (injecting `properties.provisioningState: Succeeded`
/// when the body has a properties object without one), GET serves
/// stored-or-404, DELETE removes. Values seeded with [`MockArm::insert`]
/// keep their `outputs` and `outputResources` across a PUT to the same
/// path, so tests can stage what a deployment "produced".
#[derive(Default)]
pub struct MockArm {
    store: Mutex<HashMap<String, Value>>,
}

impl MockArm {
    /// An empty control plane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource at the given path.
    pub fn insert(&self, path: &str, value: Value) {
        if let Ok(mut store) = self.store.lock() {
            store.insert(path.to_ascii_lowercase(), value);
        }
    }

    /// Whether a resource exists at the given path.
    pub fn contains(&self, path: &str) -> bool {
        self.store
            .lock()
            .map(|store| store.contains_key(&path.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    fn not_found(path: &str) -> ArmError {
        ArmError::api(404, "ResourceNotFound", format!("{} does not exist", path))
    }
}

#[async_trait::async_trait]
impl ArmApi for MockArm {
    async fn get(&self, path: &str, _api_version: &str) -> Result<ArmResponse, ArmError> {
        let store = self.store.lock().map_err(|_| Self::not_found(path))?;
        match store.get(&path.to_ascii_lowercase()) {
            Some(value) => Ok(ArmResponse::ok(value.clone())),
            None => Err(Self::not_found(path)),
        }
    }

    async fn put(
        &self,
        path: &str,
        _api_version: &str,
        body: Value,
    ) -> Result<ArmResponse, ArmError> {
        let mut body = body;
        if let Some(properties) = body.get_mut("properties").and_then(Value::as_object_mut) {
            properties
                .entry("provisioningState")
                .or_insert_with(|| json!("Succeeded"));
        }

        let mut store = self.store.lock().map_err(|_| Self::not_found(path))?;
        let key = path.to_ascii_lowercase();
        if let Some(existing) = store.get(&key) {
            for staged in ["outputs", "outputResources"] {
                if let Some(value) = existing.pointer(&format!("/properties/{}", staged)).cloned() {
                    if let Some(properties) =
                        body.get_mut("properties").and_then(Value::as_object_mut)
                    {
                        properties.insert(staged.to_string(), value);
                    }
                }
            }
        }
        store.insert(key, body.clone());
        Ok(ArmResponse::ok(body))
    }

    async fn post(
        &self,
        _path: &str,
        _api_version: &str,
        _body: Option<Value>,
    ) -> Result<ArmResponse, ArmError> {
        Ok(ArmResponse::ok(Value::Null))
    }

    async fn delete(&self, path: &str, _api_version: &str) -> Result<ArmResponse, ArmError> {
        let mut store = self.store.lock().map_err(|_| Self::not_found(path))?;
        store.remove(&path.to_ascii_lowercase());
        Ok(ArmResponse::ok(Value::Null))
    }

    async fn get_url(&self, _url: &str) -> Result<ArmResponse, ArmError> {
        Ok(ArmResponse::ok(json!({"status": "Succeeded"})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_serves_what_was_put() {
        let mock = MockArm::new();
        let path = "/subscriptions/sub-1/resourceGroups/Example";
        mock.put(path, "2020-06-01", json!({"location": "westeurope"}))
            .await
            .unwrap();

        // Path lookup ignores casing, like ARM itself.
        let got = mock
            .get("/subscriptions/sub-1/resourcegroups/example", "2020-06-01")
            .await
            .unwrap();
        assert_eq!(got.body["location"], "westeurope");

        mock.delete(path, "2020-06-01").await.unwrap();
        let err = mock.get(path, "2020-06-01").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn mock_injects_a_succeeded_provisioning_state() {
        let mock = MockArm::new();
        let response = mock
            .put("/x", "v", json!({"properties": {"mode": "Incremental"}}))
            .await
            .unwrap();
        assert_eq!(response.provisioning_state(), Some("Succeeded"));
    }

    #[tokio::test]
    async fn mock_preserves_staged_outputs_across_put() {
        let mock = MockArm::new();
        mock.insert(
            "/deploy",
            json!({"properties": {"outputs": {"host": {"value": "example"}}}}),
        );
        let response = mock
            .put("/deploy", "v", json!({"properties": {"mode": "Complete"}}))
            .await
            .unwrap();
        assert_eq!(
            response.body.pointer("/properties/outputs/host/value"),
            Some(&json!("example"))
        );
    }
}
