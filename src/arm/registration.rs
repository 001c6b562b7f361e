//! Resource provider registration.
//!
//! Azure subscriptions start with most resource providers unregistered, and
//! requests against an unregistered namespace fail with a confusing error.
//! During configure the provider registers every namespace it manages
//! resources for, unless the practitioner opts out.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{info, warn};

use crate::arm::client::{ArmApi, ArmError};

/// Namespaces the bundled resources talk to.
pub const REQUIRED_RESOURCE_PROVIDERS: &[&str] = &["Microsoft.Consumption", "Microsoft.Resources"];

const PROVIDERS_API_VERSION: &str = "2020-06-01";

/// Kick off registration for every namespace in `required` that the
/// subscription does not already have registered.
///
/// Registration is asynchronous on Azure's side and can take minutes; this
/// only starts it and does not wait, matching what a provider can usefully
/// do at configure time.
pub async fn ensure_registered(
    api: &dyn ArmApi,
    subscription_id: &str,
    required: &[&str],
) -> Result<(), ArmError> {
    let listing = api
        .get(
            &format!("/subscriptions/{}/providers", subscription_id),
            PROVIDERS_API_VERSION,
        )
        .await?;

    let registered: HashSet<String> = listing
        .body
        .get("value")
        .and_then(Value::as_array)
        .map(|providers| {
            providers
                .iter()
                .filter(|p| {
                    p.get("registrationState").and_then(Value::as_str) == Some("Registered")
                })
                .filter_map(|p| p.get("namespace").and_then(Value::as_str))
                .map(str::to_ascii_lowercase)
                .collect()
        })
        .unwrap_or_default();

    for namespace in required {
        if registered.contains(&namespace.to_ascii_lowercase()) {
            continue;
        }
        info!(namespace, "registering resource provider");
        let result = api
            .post(
                &format!(
                    "/subscriptions/{}/providers/{}/register",
                    subscription_id, namespace
                ),
                PROVIDERS_API_VERSION,
                None,
            )
            .await;
        if let Err(err) = result {
            // Registration needs elevated permissions some principals lack.
            // The failure surfaces later, on the first request against the
            // namespace, if it actually matters.
            warn!(namespace, error = %err, "resource provider registration failed");
        }
    }

    Ok(())
}
